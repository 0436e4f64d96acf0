//! Project environment configuration
//!
//! An [`Environment`] knows where the project lives on disk and where each
//! body collection is rooted. The defaults can be overridden by a
//! `stagehand.toml` file at the project root:
//!
//! ```toml
//! [layout]
//! assets = "assets"
//! shots = "shots"
//! sequences = "sequences"
//! layouts = "layouts"
//! tools = "tools"
//! crowds = "crowds"
//! users = "users"
//! ```

use crate::record::{RecordStore, TomlFileStore};
use crate::{PipelineError, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name of the optional project configuration file
pub const CONFIG_FILE: &str = "stagehand.toml";

/// Environment variable naming the project root
pub const PROJECT_DIR_VAR: &str = "STAGEHAND_PROJECT_DIR";

/// Environment variable overriding the acting user
pub const USER_VAR: &str = "STAGEHAND_USER";

/// Resolved project directories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    project_dir: PathBuf,
    assets_dir: PathBuf,
    shots_dir: PathBuf,
    sequences_dir: PathBuf,
    layouts_dir: PathBuf,
    tools_dir: PathBuf,
    crowds_dir: PathBuf,
    users_dir: PathBuf,
}

/// Contents of `stagehand.toml`
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct ProjectConfig {
    #[serde(default)]
    pub layout: LayoutSection,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct LayoutSection {
    pub assets: String,
    pub shots: String,
    pub sequences: String,
    pub layouts: String,
    pub tools: String,
    pub crowds: String,
    pub users: String,
}

impl Default for LayoutSection {
    fn default() -> Self {
        Self {
            assets: "assets".to_string(),
            shots: "shots".to_string(),
            sequences: "sequences".to_string(),
            layouts: "layouts".to_string(),
            tools: "tools".to_string(),
            crowds: "crowds".to_string(),
            users: "users".to_string(),
        }
    }
}

impl Environment {
    /// Build an environment with the default directory layout
    pub fn from_project_dir(project_dir: impl Into<PathBuf>) -> Self {
        Self::with_layout(project_dir.into(), &LayoutSection::default())
    }

    /// Build an environment, honoring `stagehand.toml` if present
    pub fn load(project_dir: impl Into<PathBuf>) -> Result<Self> {
        let project_dir = project_dir.into();
        let config_path = project_dir.join(CONFIG_FILE);

        let config = if config_path.is_file() {
            debug!("Reading project config {:?}", config_path);
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<ProjectConfig>(&content).map_err(crate::RecordError::from)?
        } else {
            ProjectConfig::default()
        };

        Ok(Self::with_layout(project_dir, &config.layout))
    }

    /// Build an environment from `STAGEHAND_PROJECT_DIR`
    ///
    /// Falls back to `stagehand/project` under the local data directory
    /// (e.g. `~/.local/share/stagehand/project`).
    pub fn from_env() -> Result<Self> {
        let project_dir = match std::env::var_os(PROJECT_DIR_VAR) {
            Some(dir) => PathBuf::from(dir),
            None => default_project_dir(),
        };
        Self::load(project_dir)
    }

    fn with_layout(project_dir: PathBuf, layout: &LayoutSection) -> Self {
        Self {
            assets_dir: project_dir.join(&layout.assets),
            shots_dir: project_dir.join(&layout.shots),
            sequences_dir: project_dir.join(&layout.sequences),
            layouts_dir: project_dir.join(&layout.layouts),
            tools_dir: project_dir.join(&layout.tools),
            crowds_dir: project_dir.join(&layout.crowds),
            users_dir: project_dir.join(&layout.users),
            project_dir,
        }
    }

    /// Create the project root and every collection root
    pub fn ensure_layout(&self) -> Result<()> {
        for dir in [
            &self.project_dir,
            &self.assets_dir,
            &self.shots_dir,
            &self.sequences_dir,
            &self.layouts_dir,
            &self.tools_dir,
            &self.crowds_dir,
            &self.users_dir,
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    pub fn shots_dir(&self) -> &Path {
        &self.shots_dir
    }

    pub fn sequences_dir(&self) -> &Path {
        &self.sequences_dir
    }

    /// Root of set (layout) bodies
    pub fn layouts_dir(&self) -> &Path {
        &self.layouts_dir
    }

    pub fn tools_dir(&self) -> &Path {
        &self.tools_dir
    }

    pub fn crowds_dir(&self) -> &Path {
        &self.crowds_dir
    }

    /// Root of the per-user working areas
    pub fn users_dir(&self) -> &Path {
        &self.users_dir
    }
}

fn default_project_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stagehand")
        .join("project")
}

/// The name of the user acting on the pipeline
///
/// Checks `STAGEHAND_USER`, then `USER`, then the passwd entry of the
/// effective uid.
pub fn current_username() -> Option<String> {
    for var in [USER_VAR, "USER"] {
        if let Ok(name) = std::env::var(var) {
            if !name.is_empty() {
                return Some(name);
            }
        }
    }
    nix::unistd::User::from_uid(nix::unistd::geteuid())
        .ok()
        .flatten()
        .map(|user| user.name)
}

/// Shared handles carried by every entity
#[derive(Clone)]
pub struct Context {
    env: Arc<Environment>,
    store: Arc<dyn RecordStore>,
}

impl Context {
    /// Context backed by TOML marker files
    pub fn new(env: Environment) -> Self {
        Self::with_store(env, Arc::new(TomlFileStore::new()))
    }

    pub fn with_store(env: Environment, store: Arc<dyn RecordStore>) -> Self {
        Self {
            env: Arc::new(env),
            store,
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("project_dir", &self.env.project_dir)
            .finish()
    }
}

/// Reject names that would escape their parent directory
pub(crate) fn validate_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
    {
        return Err(PipelineError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_default_layout() {
        let env = Environment::from_project_dir("/proj");

        assert_eq!(env.project_dir(), Path::new("/proj"));
        assert_eq!(env.assets_dir(), Path::new("/proj/assets"));
        assert_eq!(env.shots_dir(), Path::new("/proj/shots"));
        assert_eq!(env.layouts_dir(), Path::new("/proj/layouts"));
        assert_eq!(env.crowds_dir(), Path::new("/proj/crowds"));
        assert_eq!(env.users_dir(), Path::new("/proj/users"));
    }

    #[test]
    fn test_load_with_config_overrides() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(CONFIG_FILE),
            "[layout]\nassets = \"production/assets\"\nusers = \"work\"\n",
        )
        .unwrap();

        let env = Environment::load(temp.path()).unwrap();
        assert_eq!(env.assets_dir(), temp.path().join("production/assets"));
        assert_eq!(env.users_dir(), temp.path().join("work"));
        // untouched entries keep their defaults
        assert_eq!(env.shots_dir(), temp.path().join("shots"));
    }

    #[test]
    fn test_load_without_config() {
        let temp = TempDir::new().unwrap();
        let env = Environment::load(temp.path()).unwrap();
        assert_eq!(env, Environment::from_project_dir(temp.path()));
    }

    #[test]
    fn test_ensure_layout() {
        let temp = TempDir::new().unwrap();
        let env = Environment::from_project_dir(temp.path().join("show"));
        env.ensure_layout().unwrap();

        assert!(env.assets_dir().is_dir());
        assert!(env.sequences_dir().is_dir());
        assert!(env.tools_dir().is_dir());
        assert!(env.users_dir().is_dir());
    }

    #[test]
    #[serial]
    fn test_from_env() {
        let temp = TempDir::new().unwrap();
        std::env::set_var(PROJECT_DIR_VAR, temp.path());
        let env = Environment::from_env().unwrap();
        std::env::remove_var(PROJECT_DIR_VAR);

        assert_eq!(env.project_dir(), temp.path());
    }

    #[test]
    #[serial]
    fn test_current_username_override() {
        std::env::set_var(USER_VAR, "alice");
        let name = current_username();
        std::env::remove_var(USER_VAR);

        assert_eq!(name.as_deref(), Some("alice"));
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("hero").is_ok());
        assert!(validate_name("hero_v2.1").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("a/b").is_err());
    }
}
