//! spansync core library: domain types, record stores, markup tree, marker scanner.
//!
//! Public API surface:
//! - [`types`]: newtypes and domain structs
//! - [`error`]: [`StoreError`]
//! - [`store`]: [`RecordStore`] trait, [`MemoryStore`], [`FileStore`]
//! - [`collection`]: YAML load / save / init under `~/.spansync/`
//! - [`markup`]: parse / mutate / serialize one field's markup
//! - [`scanner`]: top-level sync marker discovery

pub mod collection;
pub mod error;
pub mod markup;
pub mod scanner;
pub mod store;
pub mod types;

pub use error::StoreError;
pub use markup::{Element, Fragment, Node};
pub use scanner::Marker;
pub use store::{FileStore, MemoryStore, RecordStore, SearchQuery};
pub use types::{Collection, Record, RecordId, RecordType, Sid, TypeName};
