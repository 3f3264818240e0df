//! Fixture loading helpers for the frozen API contracts under `contracts/`.

use std::path::PathBuf;

use serde_json::Value;

/// Root of the `contracts/` directory.
pub fn contracts_dir() -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../../contracts"))
}

/// Reads a contract file as raw text. `name` is relative to `contracts/`.
///
/// # Panics
/// Panics when the file is missing; fixtures are part of the repository.
pub fn read_contract(name: &str) -> String {
    let path = contracts_dir().join(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|error| panic!("{} should be readable: {error}", path.display()))
}

/// Reads a contract file as JSON.
///
/// # Panics
/// Panics when the file is missing or is not JSON.
pub fn load_contract(name: &str) -> Value {
    serde_json::from_str(&read_contract(name))
        .unwrap_or_else(|error| panic!("{name} should be valid json: {error}"))
}
