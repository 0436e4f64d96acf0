//! Project façade over the body collections
//!
//! [`Project`] provisions, finds and lists bodies in each collection root.
//! Import tools and listing UIs work through it rather than through paths.

use crate::body::{Body, BodyKind, Relation};
use crate::environment::{validate_name, Context, Environment};
use crate::record::{RecordStore, BODY_MARKER};
use crate::resolver::ReferenceResolver;
use crate::{PipelineError, Result};
use log::{debug, info};
use std::path::Path;
use std::sync::Arc;

/// A production project rooted at one directory
#[derive(Clone)]
pub struct Project {
    ctx: Context,
}

impl Project {
    /// Open a project backed by TOML marker files, creating its layout
    pub fn open(env: Environment) -> Result<Self> {
        Self::from_context(Context::new(env))
    }

    /// Open a project with a custom record store
    pub fn with_store(env: Environment, store: Arc<dyn RecordStore>) -> Result<Self> {
        Self::from_context(Context::with_store(env, store))
    }

    fn from_context(ctx: Context) -> Result<Self> {
        ctx.env().ensure_layout()?;
        info!("Opened project at {:?}", ctx.env().project_dir());
        Ok(Self { ctx })
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn env(&self) -> &Environment {
        self.ctx.env()
    }

    pub fn project_dir(&self) -> &Path {
        self.env().project_dir()
    }

    pub fn resolver(&self) -> ReferenceResolver {
        ReferenceResolver::new(self.ctx.clone())
    }

    /// Provision a new body of `kind`
    pub fn create_body(&self, kind: BodyKind, name: &str) -> Result<Body> {
        Body::create(&self.ctx, kind, name)
    }

    /// Get a body of `kind` by name, or `None` if it does not exist
    pub fn get_body(&self, kind: BodyKind, name: &str) -> Result<Option<Body>> {
        validate_name(name)?;
        let dir = kind.root(self.env()).join(name);
        if !self.ctx.store().exists(&dir.join(BODY_MARKER)) {
            return Ok(None);
        }
        Body::open(&self.ctx, dir).map(Some)
    }

    /// Get a body of `kind`, provisioning it first if needed
    pub fn get_or_create_body(&self, kind: BodyKind, name: &str) -> Result<Body> {
        match self.get_body(kind, name)? {
            Some(body) => Ok(body),
            None => self.create_body(kind, name),
        }
    }

    /// Find a body by name in any collection
    pub fn find_body(&self, name: &str) -> Result<Body> {
        let dir = self
            .resolver()
            .resolve_any(name)
            .ok_or_else(|| PipelineError::BodyNotFound(name.to_string()))?;
        Body::open(&self.ctx, dir)
    }

    /// Names of every body of `kind`, sorted
    pub fn list_bodies(&self, kind: BodyKind) -> Result<Vec<String>> {
        let root = kind.root(self.env());
        if !root.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if self.ctx.store().exists(&entry.path().join(BODY_MARKER)) {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        debug!("Found {} {} bodies", names.len(), kind);
        Ok(names)
    }

    /// Names of bodies of `kind` whose `attribute` stands in `relation` to `value`
    pub fn list_bodies_with_relation(
        &self,
        kind: BodyKind,
        attribute: &str,
        relation: Relation,
        value: &toml::Value,
    ) -> Result<Vec<String>> {
        let mut matching = Vec::new();
        for name in self.list_bodies(kind)? {
            let body = Body::open(&self.ctx, kind.root(self.env()).join(&name))?;
            if body.has_relation(attribute, relation, value)? {
                matching.push(name);
            }
        }
        Ok(matching)
    }
}

impl std::fmt::Debug for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Project")
            .field("project_dir", &self.project_dir())
            .finish()
    }
}
