//! Shared helpers for bridge integration tests
//!
//! Every integration test runs against the reference model zoo, built as a
//! cdylib by the `gantry-models` dev-dependency. These helpers locate that
//! artifact next to the test binary and open it.

use gantry::{Model, ModelData, ModelLibrary};
use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

// Re-export testing utilities
#[allow(unused_imports)]
pub use pretty_assertions::{assert_eq, assert_ne};

/// Locates the zoo cdylib.
///
/// Test binaries live in `target/<profile>/deps`. Cargo places the cdylib
/// either there (possibly with a metadata hash in the name) or uplifted
/// into `target/<profile>`; try the unhashed names first and fall back to
/// the newest hashed artifact.
pub fn zoo_path() -> PathBuf {
    let exe = std::env::current_exe().expect("test binary path");
    let deps = exe.parent().expect("deps dir").to_path_buf();
    let file = format!("{DLL_PREFIX}gantry_models{DLL_SUFFIX}");

    let in_deps = deps.join(&file);
    if in_deps.exists() {
        return in_deps;
    }
    if let Some(profile) = deps.parent() {
        let uplifted = profile.join(&file);
        if uplifted.exists() {
            return uplifted;
        }
    }

    let hashed_prefix = format!("{DLL_PREFIX}gantry_models-");
    let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
    if let Ok(entries) = std::fs::read_dir(&deps) {
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(&hashed_prefix) || !name.ends_with(DLL_SUFFIX) {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|meta| meta.modified())
                .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
            if newest.as_ref().map_or(true, |(seen, _)| modified > *seen) {
                newest = Some((modified, entry.path()));
            }
        }
    }
    newest
        .map(|(_, path)| path)
        .unwrap_or_else(|| panic!("zoo cdylib not found near {}", deps.display()))
}

/// Opens the zoo once per test binary and shares the handle.
pub fn shared_zoo() -> Arc<ModelLibrary> {
    static ZOO: OnceLock<Arc<ModelLibrary>> = OnceLock::new();
    ZOO.get_or_init(|| Arc::new(ModelLibrary::open(zoo_path()).expect("open zoo cdylib")))
        .clone()
}

/// Constructs a zoo model from an inline payload (empty selects
/// `stdnormal`).
pub fn zoo_model(payload: &str) -> Model {
    let lib = shared_zoo();
    let data = if payload.trim().is_empty() {
        ModelData::Empty
    } else {
        ModelData::Inline(payload.to_string())
    };
    Model::new(&lib, data, 42).expect("construct zoo model")
}
