//! Bodies: the named production entities of a project
//!
//! A body is a directory holding a `.body` marker record. It owns one
//! subdirectory per department, each holding the elements produced for it,
//! and keeps name-based references to other bodies.
//!
//! ```text
//! {collection root}/{body}/
//! ├── .body
//! └── {department}/
//!     └── {element}/
//!         └── .element
//! ```

pub mod department;
mod kind;

pub use kind::{BodyKind, Capabilities, Collection};

use crate::element::{Element, ElementRecord, DEFAULT_NAME};
use crate::environment::{validate_name, Context};
use crate::record::{self, BODY_MARKER, ELEMENT_MARKER};
use crate::resolver::ReferenceResolver;
use crate::{fsutil, PipelineError, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};

/// Persisted fields of a body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyRecord {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: BodyKind,
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub frame_range: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_number: Option<i64>,
}

impl BodyRecord {
    /// Default record for a freshly provisioned body of `kind`
    pub fn new(name: &str, kind: BodyKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            references: Vec::new(),
            description: String::new(),
            frame_range: 0,
            camera_number: None,
        }
    }
}

/// Result of asking a body to create an element
#[derive(Debug)]
pub enum ElementCreation {
    Created(Element),
    /// A marker already exists at this element directory; nothing was written
    AlreadyExists(PathBuf),
}

impl ElementCreation {
    pub fn is_created(&self) -> bool {
        matches!(self, ElementCreation::Created(_))
    }

    pub fn into_element(self) -> Option<Element> {
        match self {
            ElementCreation::Created(element) => Some(element),
            ElementCreation::AlreadyExists(_) => None,
        }
    }
}

/// Comparison applied by [`Body::has_relation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// List membership, or substring for strings
    Contains,
}

impl Relation {
    /// Evaluate `field <relation> value`
    pub fn holds(self, field: &toml::Value, value: &toml::Value) -> bool {
        match self {
            Relation::Eq => field == value,
            Relation::Ne => field != value,
            Relation::Lt => compare(field, value) == Some(Ordering::Less),
            Relation::Le => matches!(
                compare(field, value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Relation::Gt => compare(field, value) == Some(Ordering::Greater),
            Relation::Ge => matches!(
                compare(field, value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Relation::Contains => match (field, value) {
                (toml::Value::Array(items), _) => items.contains(value),
                (toml::Value::String(haystack), toml::Value::String(needle)) => {
                    haystack.contains(needle.as_str())
                }
                _ => false,
            },
        }
    }
}

impl std::str::FromStr for Relation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "==" | "eq" => Ok(Relation::Eq),
            "!=" | "ne" => Ok(Relation::Ne),
            "<" | "lt" => Ok(Relation::Lt),
            "<=" | "le" => Ok(Relation::Le),
            ">" | "gt" => Ok(Relation::Gt),
            ">=" | "ge" => Ok(Relation::Ge),
            "contains" | "in" => Ok(Relation::Contains),
            other => Err(format!("unknown relation: {}", other)),
        }
    }
}

fn compare(a: &toml::Value, b: &toml::Value) -> Option<Ordering> {
    use toml::Value::*;
    match (a, b) {
        (Integer(x), Integer(y)) => Some(x.cmp(y)),
        (Float(x), Float(y)) => x.partial_cmp(y),
        (Integer(x), Float(y)) => (*x as f64).partial_cmp(y),
        (Float(x), Integer(y)) => x.partial_cmp(&(*y as f64)),
        (String(x), String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// A body loaded from its directory
#[derive(Clone)]
pub struct Body {
    ctx: Context,
    dir: PathBuf,
    marker: PathBuf,
    record: BodyRecord,
}

impl Body {
    /// Load the body stored in `dir`
    ///
    /// Fails with [`PipelineError::NotFound`] when `dir` has no `.body` marker.
    pub fn open(ctx: &Context, dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let marker = dir.join(BODY_MARKER);
        if !ctx.store().exists(&marker) {
            return Err(PipelineError::NotFound {
                kind: "body",
                path: marker,
            });
        }
        let record = record::load_record(ctx.store(), &marker)?;
        Ok(Self {
            ctx: ctx.clone(),
            dir,
            marker,
            record,
        })
    }

    /// Provision a new body of `kind` under its collection root
    pub fn create(ctx: &Context, kind: BodyKind, name: &str) -> Result<Self> {
        Self::create_with_record(ctx, BodyRecord::new(name, kind))
    }

    /// Provision a new body from a prepared record
    pub fn create_with_record(ctx: &Context, record: BodyRecord) -> Result<Self> {
        validate_name(&record.name)?;
        let dir = record.kind.root(ctx.env()).join(&record.name);
        let marker = dir.join(BODY_MARKER);
        if ctx.store().exists(&marker) {
            return Err(PipelineError::BodyExists(dir));
        }

        fsutil::mkdir(&dir)?;
        record::save_record(ctx.store(), &marker, &record)?;
        info!("Created {} body {:?} at {:?}", record.kind, record.name, dir);

        Ok(Self {
            ctx: ctx.clone(),
            dir,
            marker,
            record,
        })
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    /// Directory this body is stored in
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn record(&self) -> &BodyRecord {
        &self.record
    }

    pub fn kind(&self) -> BodyKind {
        self.record.kind
    }

    pub fn is_shot(&self) -> bool {
        self.kind().capabilities().shot
    }

    pub fn is_set(&self) -> bool {
        self.kind().capabilities().set
    }

    pub fn is_asset(&self) -> bool {
        self.kind().capabilities().asset
    }

    pub fn is_tool(&self) -> bool {
        self.kind().capabilities().tool
    }

    pub fn is_crowd_cycle(&self) -> bool {
        self.kind().capabilities().crowd_cycle
    }

    pub fn description(&self) -> &str {
        &self.record.description
    }

    pub fn frame_range(&self) -> i64 {
        self.record.frame_range
    }

    pub fn camera_number(&self) -> Option<i64> {
        self.record.camera_number
    }

    pub fn references(&self) -> &[String] {
        &self.record.references
    }

    pub fn update_description(&mut self, description: &str) -> Result<()> {
        self.update(|r| r.description = description.to_string())
    }

    pub fn update_type(&mut self, kind: BodyKind) -> Result<()> {
        self.update(|r| r.kind = kind)
    }

    pub fn update_frame_range(&mut self, frame_range: i64) -> Result<()> {
        self.update(|r| r.frame_range = frame_range)
    }

    pub fn update_camera_number(&mut self, camera_number: i64) -> Result<()> {
        self.update(|r| r.camera_number = Some(camera_number))
    }

    /// Apply a change to a copy of the record, persist it, then adopt it
    fn update(&mut self, change: impl FnOnce(&mut BodyRecord)) -> Result<()> {
        let mut record = self.record.clone();
        change(&mut record);
        record::save_record(self.ctx.store(), &self.marker, &record)?;
        self.record = record;
        Ok(())
    }

    /// Directory of the element `name` in `department`
    pub fn element_dir(&self, department: &str, name: &str) -> PathBuf {
        self.dir.join(department).join(name)
    }

    /// Get an element of this body
    ///
    /// If no element exists and `force_create` is set, one is created with
    /// the department's default primary extension.
    pub fn get_element(&self, department: &str, name: &str, force_create: bool) -> Result<Element> {
        validate_name(department)?;
        validate_name(name)?;
        let dir = self.element_dir(department, name);
        debug!("Looking for element {:?} in {:?}", name, dir);

        if self.ctx.store().exists(&dir.join(ELEMENT_MARKER)) {
            return Element::open(&self.ctx, dir);
        }
        if !force_create {
            return Err(PipelineError::NotFound {
                kind: "element",
                path: dir.join(ELEMENT_MARKER),
            });
        }

        match self.create_element(department, name)? {
            ElementCreation::Created(element) => Ok(element),
            ElementCreation::AlreadyExists(dir) => Element::open(&self.ctx, dir),
        }
    }

    /// Get the default element of `department`, creating it if needed
    pub fn main_element(&self, department: &str) -> Result<Element> {
        self.get_element(department, DEFAULT_NAME, true)
    }

    /// Create an element of this body
    ///
    /// Returns [`ElementCreation::AlreadyExists`] without touching anything if
    /// the element's marker is already present.
    pub fn create_element(&self, department: &str, name: &str) -> Result<ElementCreation> {
        validate_name(department)?;
        validate_name(name)?;
        let dir = self.element_dir(department, name);
        if self.ctx.store().exists(&dir.join(ELEMENT_MARKER)) {
            warn!("Element already exists: {:?}", dir);
            return Ok(ElementCreation::AlreadyExists(dir));
        }

        let mut record = ElementRecord::new(name, department, self.name());
        if let Some(ext) = department::default_app_ext(department) {
            record.app_ext = ext.to_string();
        }

        fsutil::mkdir(&dir)?;
        let element = Element::init(&self.ctx, dir, record)?;
        info!(
            "Created element {:?} in {}/{}",
            name,
            self.name(),
            department
        );
        Ok(ElementCreation::Created(element))
    }

    /// Names of every element of `department`, sorted
    pub fn list_elements(&self, department: &str) -> Result<Vec<String>> {
        validate_name(department)?;
        let subdir = self.dir.join(department);
        if !subdir.is_dir() {
            return Ok(Vec::new());
        }

        let mut elements = Vec::new();
        for entry in std::fs::read_dir(&subdir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if self.ctx.store().exists(&entry.path().join(ELEMENT_MARKER)) {
                elements.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        elements.sort();
        Ok(elements)
    }

    /// Add a reference to another body
    ///
    /// `reference` must name a body in the asset, shot or crowd collection.
    /// Adding a reference that is already present is a no-op. Returns whether
    /// the reference list changed.
    pub fn add_reference(&mut self, reference: &str) -> Result<bool> {
        let resolver = ReferenceResolver::new(self.ctx.clone());
        if resolver.resolve(reference).is_none() {
            return Err(PipelineError::BodyNotFound(reference.to_string()));
        }
        if self.record.references.iter().any(|r| r == reference) {
            debug!("{} already references {}", self.name(), reference);
            return Ok(false);
        }

        self.update(|r| r.references.push(reference.to_string()))?;
        info!("{} now references {}", self.name(), reference);
        Ok(true)
    }

    /// Remove a reference, returning whether one was removed
    pub fn remove_reference(&mut self, reference: &str) -> Result<bool> {
        let Some(index) = self.record.references.iter().position(|r| r == reference) else {
            return Ok(false);
        };

        self.update(|r| {
            r.references.remove(index);
        })?;
        info!("{} no longer references {}", self.name(), reference);
        Ok(true)
    }

    /// Whether `attribute` exists in this body's record and stands in
    /// `relation` to `value`
    pub fn has_relation(
        &self,
        attribute: &str,
        relation: Relation,
        value: &toml::Value,
    ) -> Result<bool> {
        self.has_relation_with(attribute, |field| relation.holds(field, value))
    }

    /// Like [`Body::has_relation`] with an arbitrary predicate
    pub fn has_relation_with(
        &self,
        attribute: &str,
        predicate: impl FnOnce(&toml::Value) -> bool,
    ) -> Result<bool> {
        let table = record::to_record(&self.record)?;
        Ok(table.get(attribute).map(predicate).unwrap_or(false))
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Body of type {} named {} at {}>",
            self.kind(),
            self.name(),
            self.dir.display()
        )
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body")
            .field("dir", &self.dir)
            .field("record", &self.record)
            .finish()
    }
}
