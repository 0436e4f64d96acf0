use super::{Record, RecordError, RecordStore};
use log::debug;
use std::path::{Path, PathBuf};

/// Stores each record as a TOML document at its marker path.
///
/// Writes go to a sibling temporary file which is then renamed over the
/// marker, so a reader never observes a half-written record.
#[derive(Debug, Default, Clone)]
pub struct TomlFileStore;

impl TomlFileStore {
    pub fn new() -> Self {
        Self
    }
}

impl RecordStore for TomlFileStore {
    fn exists(&self, marker: &Path) -> bool {
        marker.is_file()
    }

    fn load(&self, marker: &Path) -> Result<Record, RecordError> {
        if !self.exists(marker) {
            return Err(RecordError::Missing(marker.to_path_buf()));
        }
        let content = std::fs::read_to_string(marker)?;
        let record: Record = toml::from_str(&content)?;
        Ok(record)
    }

    fn save(&self, marker: &Path, record: &Record) -> Result<(), RecordError> {
        let content = toml::to_string_pretty(record)?;
        let tmp = temp_path(marker);
        debug!("Writing record {:?} via {:?}", marker, tmp);
        std::fs::write(&tmp, content)?;
        if let Err(e) = std::fs::rename(&tmp, marker) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

fn temp_path(marker: &Path) -> PathBuf {
    let mut name = marker
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    marker.with_file_name(name)
}
