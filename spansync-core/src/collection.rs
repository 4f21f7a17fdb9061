//! YAML collection persistence.
//!
//! # Storage layout
//!
//! ```text
//! ~/.spansync/                  (mode 0700)
//!   collection.yaml             (record types and records, mode 0600)
//!   templates/
//!     <RecordType>.html         (optional template overrides)
//! ```
//!
//! # API pattern
//!
//! Every function has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.

use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::types::Collection;

const ROOT_DIR: &str = ".spansync";
const COLLECTION_FILE: &str = "collection.yaml";
const TEMPLATES_DIR: &str = "templates";

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.spansync/`: pure, no I/O.
pub fn root_at(home: &Path) -> PathBuf {
    home.join(ROOT_DIR)
}

/// `<home>/.spansync/collection.yaml`: pure, no I/O.
pub fn collection_path_at(home: &Path) -> PathBuf {
    root_at(home).join(COLLECTION_FILE)
}

/// `<home>/.spansync/templates/`: pure, no I/O.
pub fn templates_dir_at(home: &Path) -> PathBuf {
    root_at(home).join(TEMPLATES_DIR)
}

/// `templates_dir_at` convenience wrapper.
pub fn templates_dir() -> Result<PathBuf, StoreError> {
    Ok(templates_dir_at(&home()?))
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load the collection from `<home>/.spansync/collection.yaml`.
///
/// Returns `StoreError::CollectionNotFound` if absent,
/// `StoreError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(home: &Path) -> Result<Collection, StoreError> {
    let path = collection_path_at(home);
    if !path.exists() {
        return Err(StoreError::CollectionNotFound { path });
    }
    let contents = std::fs::read_to_string(&path)?;
    serde_yaml::from_str(&contents).map_err(|e| StoreError::Parse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Collection, StoreError> {
    load_at(&home()?)
}

// ---------------------------------------------------------------------------
// 3. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save the collection to `<home>/.spansync/collection.yaml`.
///
/// Write flow: serialize → `collection.yaml.tmp` sibling → `chmod 0600` → `rename`.
/// `.tmp` is always in the same directory as the target (same filesystem: no EXDEV on macOS).
pub fn save_at(home: &Path, collection: &Collection) -> Result<(), StoreError> {
    ensure_root(home)?;
    let path = collection_path_at(home);
    let tmp_path = path.with_file_name(format!("{COLLECTION_FILE}.tmp"));

    let yaml = serde_yaml::to_string(collection)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(())
}

/// `save_at` convenience wrapper.
pub fn save(collection: &Collection) -> Result<(), StoreError> {
    save_at(&home()?, collection)
}

// ---------------------------------------------------------------------------
// 4. Init
// ---------------------------------------------------------------------------

/// Create `<home>/.spansync/collection.yaml` seeded with the default record
/// types, plus an empty `templates/` directory.
///
/// Idempotent: if the collection already exists, loads and returns it unchanged.
pub fn init_at(home: &Path) -> Result<Collection, StoreError> {
    if collection_path_at(home).exists() {
        return load_at(home);
    }
    let collection = Collection::with_default_types();
    save_at(home, &collection)?;
    let templates = templates_dir_at(home);
    std::fs::create_dir_all(&templates)?;
    set_dir_permissions(&templates)?;
    Ok(collection)
}

/// `init_at` convenience wrapper.
pub fn init() -> Result<Collection, StoreError> {
    init_at(&home()?)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, StoreError> {
    dirs::home_dir().ok_or(StoreError::HomeNotFound)
}

fn ensure_root(home: &Path) -> Result<(), StoreError> {
    let dir = root_at(home);
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
        set_dir_permissions(&dir)?;
    }
    Ok(())
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
