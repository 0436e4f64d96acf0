//! Marker-file record storage
//!
//! Every entity (body, element, checkout) is a directory holding one marker
//! file. The marker's presence is what makes the directory an entity; its
//! content is a flat key-value record. All reads and writes of marker files
//! go through the [`RecordStore`] trait so the backing format can change
//! without touching entity logic.

mod toml_store;

pub use toml_store::TomlFileStore;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Marker file name for body directories
pub const BODY_MARKER: &str = ".body";
/// Marker file name for element directories
pub const ELEMENT_MARKER: &str = ".element";
/// Marker file name for per-user checkout directories
pub const CHECKOUT_MARKER: &str = ".checkout";

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Record not found: {0}")]
    Missing(PathBuf),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Record does not match schema: {0}")]
    Schema(String),
}

/// A raw record: field name to value
pub type Record = toml::Table;

/// A storage backend for marker records
pub trait RecordStore: Send + Sync {
    /// Whether a record exists at the given marker path
    fn exists(&self, marker: &Path) -> bool;

    /// Load the raw record at the given marker path
    fn load(&self, marker: &Path) -> Result<Record, RecordError>;

    /// Create or replace the record at the given marker path
    fn save(&self, marker: &Path, record: &Record) -> Result<(), RecordError>;
}

/// Load a record and decode it into a typed schema.
pub fn load_record<T: DeserializeOwned>(
    store: &dyn RecordStore,
    marker: &Path,
) -> Result<T, RecordError> {
    let record = store.load(marker)?;
    from_record(record)
}

/// Encode a typed schema and save it as a record.
pub fn save_record<T: Serialize>(
    store: &dyn RecordStore,
    marker: &Path,
    value: &T,
) -> Result<(), RecordError> {
    let record = to_record(value)?;
    store.save(marker, &record)
}

/// Convert a typed value into a raw record.
pub fn to_record<T: Serialize>(value: &T) -> Result<Record, RecordError> {
    match toml::Value::try_from(value)? {
        toml::Value::Table(table) => Ok(table),
        other => Err(RecordError::Schema(format!(
            "expected a table, got {}",
            other.type_str()
        ))),
    }
}

/// Convert a raw record into a typed value.
pub fn from_record<T: DeserializeOwned>(record: Record) -> Result<T, RecordError> {
    toml::Value::Table(record)
        .try_into()
        .map_err(|e: toml::de::Error| RecordError::Schema(e.to_string()))
}
