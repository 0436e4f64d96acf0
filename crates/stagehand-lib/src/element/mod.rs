//! Elements: versioned, department-scoped deliverables of a body
//!
//! An element lives in `{body}/{department}/{name}/` next to its `.element`
//! marker record. Each publish lands in a fresh `.vNNNN` directory and is
//! mirrored to the element's canonical current file:
//!
//! ```text
//! {body}/{department}/{name}/
//! ├── .element
//! ├── {body}_{name}{ext}      <- current file
//! ├── .v0000/{body}{ext}      <- version 0
//! ├── .v0001/{body}{ext}      <- version 1
//! ├── cache/                  <- single-slot cache (lazy)
//! └── render/                 <- render output (lazy)
//! ```
//!
//! Publishing is in [`publish`](self::Element::publish), working copies in
//! [`checkout`](self::Element::checkout) and the cache slot in
//! [`update_cache`](self::Element::update_cache).

mod cache;
mod checkout;
mod publish;

pub use checkout::{Checkout, CheckoutRecord};

use crate::environment::Context;
use crate::record::{self, ELEMENT_MARKER};
use crate::{fsutil, PipelineError, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Name given to the element created by default in each department
pub const DEFAULT_NAME: &str = "main";
/// Subdirectory holding the cache slot
pub const CACHE_DIR: &str = "cache";
/// Subdirectory holding render output
pub const RENDER_DIR: &str = "render";

/// One entry of an element's publish history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PublishRepr")]
pub struct Publish {
    pub user: String,
    pub timestamp: String,
    pub comment: String,
    /// Canonical current file written by this publish
    pub filepath: String,
}

/// Accepted on-disk forms of a publish entry
#[derive(Deserialize)]
#[serde(untagged)]
enum PublishRepr {
    Fields {
        user: String,
        timestamp: String,
        comment: String,
        filepath: String,
    },
    /// Older records stored `[user, timestamp, comment, filepath]`
    Tuple(String, String, String, String),
}

impl From<PublishRepr> for Publish {
    fn from(repr: PublishRepr) -> Self {
        match repr {
            PublishRepr::Fields {
                user,
                timestamp,
                comment,
                filepath,
            }
            | PublishRepr::Tuple(user, timestamp, comment, filepath) => Self {
                user,
                timestamp,
                comment,
                filepath,
            },
        }
    }
}

/// Persisted fields of an element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    pub name: String,
    #[serde(default)]
    pub parent: String,
    #[serde(default)]
    pub department: String,
    #[serde(default = "no_version")]
    pub latest_version: i64,
    #[serde(default)]
    pub checkout_users: BTreeSet<String>,
    #[serde(default)]
    pub app_ext: String,
    #[serde(default)]
    pub cache_ext: String,
    #[serde(default)]
    pub cache_filepath: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_user: Option<String>,
    /// Free-text production notes, oldest first
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default)]
    pub publishes: Vec<Publish>,
}

fn no_version() -> i64 {
    -1
}

impl ElementRecord {
    /// Default record for a freshly created element
    pub fn new(name: &str, department: &str, parent: &str) -> Self {
        Self {
            name: name.to_string(),
            parent: parent.to_string(),
            department: department.to_string(),
            latest_version: no_version(),
            checkout_users: BTreeSet::new(),
            app_ext: String::new(),
            cache_ext: String::new(),
            cache_filepath: String::new(),
            assigned_user: None,
            notes: Vec::new(),
            start_date: None,
            end_date: None,
            publishes: Vec::new(),
        }
    }

    /// Fill fields older records lack and restore the history invariant
    fn migrate(&mut self, dir: &Path) {
        if self.department.is_empty() {
            if let Some(department) = dir
                .parent()
                .and_then(Path::file_name)
                .map(|n| n.to_string_lossy().into_owned())
            {
                self.department = department;
            }
        }

        let committed = self.publishes.len() as i64 - 1;
        if self.latest_version != committed {
            warn!(
                "Element {:?} records latest_version {} with {} publishes; using {}",
                dir,
                self.latest_version,
                self.publishes.len(),
                committed
            );
            self.latest_version = committed;
        }
    }
}

/// An element loaded from its directory
#[derive(Clone)]
pub struct Element {
    ctx: Context,
    dir: PathBuf,
    marker: PathBuf,
    record: ElementRecord,
}

impl Element {
    /// Load the element stored in `dir`
    pub fn open(ctx: &Context, dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let marker = dir.join(ELEMENT_MARKER);
        if !ctx.store().exists(&marker) {
            return Err(PipelineError::NotFound {
                kind: "element",
                path: marker,
            });
        }
        let mut record: ElementRecord = record::load_record(ctx.store(), &marker)?;
        record.migrate(&dir);
        Ok(Self {
            ctx: ctx.clone(),
            dir,
            marker,
            record,
        })
    }

    /// Write a new element record into an existing directory
    pub(crate) fn init(ctx: &Context, dir: PathBuf, record: ElementRecord) -> Result<Self> {
        let marker = dir.join(ELEMENT_MARKER);
        record::save_record(ctx.store(), &marker, &record)?;
        Ok(Self {
            ctx: ctx.clone(),
            dir,
            marker,
            record,
        })
    }

    /// Apply a change to a copy of the record, persist it, then adopt it
    fn update(&mut self, change: impl FnOnce(&mut ElementRecord)) -> Result<()> {
        let mut record = self.record.clone();
        change(&mut record);
        record::save_record(self.ctx.store(), &self.marker, &record)?;
        self.record = record;
        Ok(())
    }

    pub fn record(&self) -> &ElementRecord {
        &self.record
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    /// Name of the owning body
    pub fn parent(&self) -> &str {
        &self.record.parent
    }

    pub fn department(&self) -> &str {
        &self.record.department
    }

    /// Directory all data for this element is stored in
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `{parent}_{department}_{name}`, unique across the project
    pub fn long_name(&self) -> String {
        format!("{}_{}_{}", self.parent(), self.department(), self.name())
    }

    /// `{parent}_{name}`
    pub fn short_name(&self) -> String {
        format!("{}_{}", self.parent(), self.name())
    }

    pub fn assigned_user(&self) -> Option<&str> {
        self.record
            .assigned_user
            .as_deref()
            .filter(|user| !user.is_empty())
    }

    pub fn is_assigned(&self) -> bool {
        self.assigned_user().is_some()
    }

    pub fn update_assigned_user(&mut self, username: &str) -> Result<()> {
        if self.assigned_user() == Some(username) {
            return Ok(());
        }
        self.update(|r| r.assigned_user = Some(username.to_string()))?;
        info!("Assigned {} to {}", self.long_name(), username);
        Ok(())
    }

    /// Append a production note
    pub fn update_notes(&mut self, note: &str) -> Result<()> {
        self.update(|r| r.notes.push(note.to_string()))
    }

    pub fn list_notes(&self) -> &[String] {
        &self.record.notes
    }

    /// Most recent note, or `""` when there are none
    pub fn last_note(&self) -> &str {
        self.record.notes.last().map(String::as_str).unwrap_or("")
    }

    pub fn start_date(&self) -> Option<&str> {
        self.record.start_date.as_deref().filter(|d| !d.is_empty())
    }

    pub fn update_start_date(&mut self, date: &str) -> Result<()> {
        self.update(|r| r.start_date = Some(date.to_string()))
    }

    pub fn end_date(&self) -> Option<&str> {
        self.record.end_date.as_deref().filter(|d| !d.is_empty())
    }

    pub fn update_end_date(&mut self, date: &str) -> Result<()> {
        self.update(|r| r.end_date = Some(date.to_string()))
    }

    /// Index of the most recent publish; -1 when nothing has been published
    pub fn last_version(&self) -> i64 {
        self.record.latest_version
    }

    pub fn last_publish(&self) -> Option<&Publish> {
        usize::try_from(self.record.latest_version)
            .ok()
            .and_then(|version| self.record.publishes.get(version))
    }

    /// Every publish, oldest first; index i is version i
    pub fn list_publishes(&self) -> &[Publish] {
        &self.record.publishes
    }

    /// Extension of the primary authored file, including the period
    pub fn app_ext(&self) -> &str {
        &self.record.app_ext
    }

    pub fn update_app_ext(&mut self, extension: &str) -> Result<()> {
        self.update(|r| r.app_ext = extension.to_string())
    }

    /// Extension of cache files, including the period
    pub fn cache_ext(&self) -> &str {
        &self.record.cache_ext
    }

    pub fn update_cache_ext(&mut self, extension: &str) -> Result<()> {
        self.update(|r| r.cache_ext = extension.to_string())
    }

    /// Base name of the canonical current file
    pub fn app_filename(&self) -> String {
        format!("{}{}", self.short_name(), self.app_ext())
    }

    /// Absolute path of the canonical current file
    pub fn app_filepath(&self) -> PathBuf {
        self.dir.join(self.app_filename())
    }

    /// Directory holding the file committed as `version`
    pub fn version_dir(&self, version: i64) -> PathBuf {
        self.dir.join(format!(".v{:04}", version))
    }

    /// Path of the current cache, if one has been set
    pub fn cache_filepath(&self) -> Option<&str> {
        Some(self.record.cache_filepath.as_str()).filter(|path| !path.is_empty())
    }

    /// Directory holding render output, created on first access
    pub fn render_dir(&self) -> Result<PathBuf> {
        let render_dir = self.dir.join(RENDER_DIR);
        fsutil::mkdir(&render_dir)?;
        Ok(render_dir)
    }

    /// Users who have ever checked this element out
    pub fn list_checkout_users(&self) -> Vec<&str> {
        self.record.checkout_users.iter().map(String::as_str).collect()
    }

    fn update_checkout_users(&mut self, username: &str) -> Result<()> {
        if self.record.checkout_users.contains(username) {
            return Ok(());
        }
        self.update(|r| {
            r.checkout_users.insert(username.to_string());
        })
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("dir", &self.dir)
            .field("name", &self.record.name)
            .field("parent", &self.record.parent)
            .field("department", &self.record.department)
            .field("latest_version", &self.record.latest_version)
            .finish()
    }
}
