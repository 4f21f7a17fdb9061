pub mod diff;
pub mod init;
pub mod record;
pub mod sync;

use std::path::Path;

use clap::ValueEnum;

use spansync_core::collection;
use spansync_renderer::TemplateEngine;
use spansync_sync::{Resolution, SyncContext};

/// How to settle an incoherent peer group without asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Prefer {
    /// Push the synced record's content to every peer.
    Upload,
    /// Take a peer's content.
    Download,
}

impl From<Prefer> for Resolution {
    fn from(p: Prefer) -> Self {
        match p {
            Prefer::Upload => Resolution::Upload,
            Prefer::Download => Resolution::Download,
        }
    }
}

/// Engine with the user's `templates/` overrides layered over the defaults.
pub fn sync_context(home: &Path) -> SyncContext {
    let templates = collection::templates_dir_at(home);
    SyncContext::new(TemplateEngine::with_overrides(Some(&templates)))
}
