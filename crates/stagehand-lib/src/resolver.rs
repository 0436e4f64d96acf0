//! Name-based lookup of bodies across collection roots.

use crate::body::Collection;
use crate::environment::Context;
use crate::record::BODY_MARKER;
use log::debug;
use std::path::PathBuf;

/// Collections a body may reference
pub const REFERENCE_ROOTS: [Collection; 3] =
    [Collection::Assets, Collection::Shots, Collection::Crowds];

/// Resolves body names to body directories
#[derive(Debug, Clone)]
pub struct ReferenceResolver {
    ctx: Context,
}

impl ReferenceResolver {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Resolve `name` against the referenceable roots (assets, shots, crowds)
    ///
    /// Returns the body directory of the first root holding a body with that
    /// name, or `None` if no root does.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        self.resolve_in(name, &REFERENCE_ROOTS)
    }

    /// Resolve `name` against every collection root
    pub fn resolve_any(&self, name: &str) -> Option<PathBuf> {
        self.resolve_in(name, &Collection::ALL)
    }

    fn resolve_in(&self, name: &str, roots: &[Collection]) -> Option<PathBuf> {
        if crate::environment::validate_name(name).is_err() {
            return None;
        }
        roots.iter().find_map(|collection| {
            let dir = collection.root(self.ctx.env()).join(name);
            let found = self.ctx.store().exists(&dir.join(BODY_MARKER));
            debug!("Resolving {:?} in {:?}: {}", name, collection, found);
            found.then_some(dir)
        })
    }
}
