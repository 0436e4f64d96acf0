//! Common test utilities for Stagehand
//!
//! Builds throwaway projects in temporary directories so scenario tests
//! only describe the production steps they care about.

#![allow(dead_code)]

use stagehand_lib::{Body, BodyKind, Element, Environment, Project};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

/// A project rooted in a temporary directory, plus a scratch area outside it
pub struct ProjectHarness {
    temp: TempDir,
    project: Project,
}

impl ProjectHarness {
    /// Create an empty project under `<temp>/project`
    pub fn new() -> io::Result<Self> {
        let temp = tempdir()?;
        let env = Environment::from_project_dir(temp.path().join("project"));
        let project = Project::open(env).map_err(io::Error::other)?;
        fs::create_dir_all(temp.path().join("scratch"))?;
        Ok(Self { temp, project })
    }

    /// Provision a body and return self for chaining
    pub fn with_body(self, kind: BodyKind, name: &str) -> io::Result<Self> {
        self.project
            .create_body(kind, name)
            .map_err(io::Error::other)?;
        Ok(self)
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn project_dir(&self) -> &Path {
        self.project.project_dir()
    }

    /// Directory outside the project for source files
    pub fn scratch_dir(&self) -> PathBuf {
        self.temp.path().join("scratch")
    }

    /// Write `contents` to `name` in the scratch area
    pub fn scratch_file(&self, name: &str, contents: &str) -> io::Result<PathBuf> {
        let path = self.scratch_dir().join(name);
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn body(&self, kind: BodyKind, name: &str) -> Body {
        self.project
            .get_body(kind, name)
            .unwrap()
            .unwrap_or_else(|| panic!("no {} named {}", kind, name))
    }

    pub fn element(&self, kind: BodyKind, body: &str, department: &str) -> Element {
        self.body(kind, body).main_element(department).unwrap()
    }

    /// Run `test_fn` against the project and the scratch directory
    pub fn run<F, R>(&self, test_fn: F) -> R
    where
        F: FnOnce(&Project, &Path) -> R,
    {
        test_fn(&self.project, &self.scratch_dir())
    }
}

pub mod assertions {
    use std::path::Path;

    pub fn assert_file_contents(path: &Path, expected: &str) {
        let actual = std::fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("could not read {:?}: {}", path, e));
        assert_eq!(actual, expected, "unexpected contents in {:?}", path);
    }

    #[cfg(unix)]
    pub fn assert_mode(path: &Path, mode: u32) {
        use std::os::unix::fs::PermissionsExt;
        let actual = std::fs::metadata(path).unwrap().permissions().mode() & 0o777;
        assert_eq!(actual, mode, "unexpected mode {:o} on {:?}", actual, path);
    }
}
