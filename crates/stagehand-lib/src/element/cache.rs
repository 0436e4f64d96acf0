use super::{Element, CACHE_DIR};
use crate::{fsutil, PipelineError, Result};
use log::info;
use std::path::{Path, PathBuf};

impl Element {
    /// Directory holding this element's cache slot
    pub fn cache_dir(&self) -> PathBuf {
        self.dir.join(CACHE_DIR)
    }

    /// Replace this element's cache with `src`
    ///
    /// By default `src` (a file or a directory) is copied into the cache
    /// directory and the copy becomes the cache. With `by_reference` a
    /// symbolic link to `src` is placed in the cache directory instead and
    /// `src` itself is recorded; `src` must then lie inside the project
    /// directory. Whatever previously occupied the slot under the same name
    /// is replaced, but only once the new copy or link is complete.
    /// Returns the recorded cache path.
    ///
    /// The project containment check is lexical: a symlink inside the
    /// project that points elsewhere still counts as inside.
    pub fn update_cache(&mut self, src: &Path, by_reference: bool) -> Result<PathBuf> {
        if !src.exists() {
            return Err(PipelineError::SourceMissing(src.to_path_buf()));
        }
        let src_abs = fsutil::normalize_path(src)?;
        let Some(file_name) = src_abs.file_name().map(|n| n.to_os_string()) else {
            return Err(PipelineError::InvalidName(src.display().to_string()));
        };

        let cache_dir = self.cache_dir();
        if by_reference {
            if !fsutil::is_within(&src_abs, self.ctx.env().project_dir())? {
                return Err(PipelineError::InvalidReference(src_abs));
            }
        } else if fsutil::is_within(&cache_dir, &src_abs)? {
            return Err(PipelineError::CopyIntoSelf(src_abs));
        }

        fsutil::mkdir(&cache_dir)?;
        let slot = cache_dir.join(&file_name);
        let in_place = fsutil::same_path(&src_abs, &slot)?;

        let recorded = if by_reference {
            if !in_place {
                fsutil::replace_with(&slot, |staging| fsutil::symlink(&src_abs, staging))?;
            }
            src_abs
        } else {
            if !in_place {
                fsutil::replace_path(&src_abs, &slot)?;
            }
            slot
        };

        let cache_filepath = recorded.display().to_string();
        self.update(|r| r.cache_filepath = cache_filepath)?;
        info!(
            "Updated cache of {} to {:?}{}",
            self.long_name(),
            recorded,
            if by_reference { " (reference)" } else { "" }
        );
        Ok(recorded)
    }

    /// Entries currently in the cache directory, sorted
    pub fn list_cache_files(&self) -> Result<Vec<String>> {
        let cache_dir = self.cache_dir();
        if !cache_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = std::fs::read_dir(&cache_dir)?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<std::io::Result<Vec<_>>>()?;
        files.sort();
        Ok(files)
    }
}
