use super::Element;
use crate::environment::{validate_name, Context};
use crate::record::{self, CHECKOUT_MARKER};
use crate::{fsutil, PipelineError, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Persisted ledger of checkouts into one working directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutRecord {
    pub user: String,
    pub body_name: String,
    #[serde(default)]
    pub department: String,
    pub element_name: String,
    /// Files written by each checkout, oldest first
    #[serde(default)]
    pub files: Vec<String>,
    /// Timestamp of each checkout, parallel to `files`
    #[serde(default)]
    pub times: Vec<String>,
}

impl CheckoutRecord {
    pub fn new(user: &str, body_name: &str, department: &str, element_name: &str) -> Self {
        Self {
            user: user.to_string(),
            body_name: body_name.to_string(),
            department: department.to_string(),
            element_name: element_name.to_string(),
            files: Vec::new(),
            times: Vec::new(),
        }
    }
}

/// A user's working directory for one element
pub struct Checkout {
    ctx: Context,
    dir: PathBuf,
    marker: PathBuf,
    record: CheckoutRecord,
}

impl Checkout {
    /// Load the checkout ledger in `dir`
    pub fn open(ctx: &Context, dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let marker = dir.join(CHECKOUT_MARKER);
        if !ctx.store().exists(&marker) {
            return Err(PipelineError::NotFound {
                kind: "checkout directory",
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

    fn create(ctx: &Context, dir: PathBuf, record: CheckoutRecord) -> Result<Self> {
        fsutil::mkdir(&dir)?;
        let marker = dir.join(CHECKOUT_MARKER);
        record::save_record(ctx.store(), &marker, &record)?;
        Ok(Self {
            ctx: ctx.clone(),
            dir,
            marker,
            record,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn user(&self) -> &str {
        &self.record.user
    }

    pub fn body_name(&self) -> &str {
        &self.record.body_name
    }

    pub fn department(&self) -> &str {
        &self.record.department
    }

    pub fn element_name(&self) -> &str {
        &self.record.element_name
    }

    /// Every file created here by a checkout
    pub fn list_files(&self) -> &[String] {
        &self.record.files
    }

    /// Timestamps of every checkout performed here
    pub fn list_times(&self) -> &[String] {
        &self.record.times
    }

    /// Record that a checkout wrote `filepath`
    pub fn add_operation(&mut self, filepath: &Path) -> Result<()> {
        let mut record = self.record.clone();
        record.files.push(filepath.display().to_string());
        record.times.push(fsutil::timestamp());
        record::save_record(self.ctx.store(), &self.marker, &record)?;
        self.record = record;
        Ok(())
    }
}

impl std::fmt::Debug for Checkout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checkout")
            .field("dir", &self.dir)
            .field("user", &self.record.user)
            .field("body_name", &self.record.body_name)
            .field("department", &self.record.department)
            .field("element_name", &self.record.element_name)
            .field("operations", &self.record.files.len())
            .finish()
    }
}

impl Element {
    /// Working directory this element is checked out to for `username`
    pub fn checkout_dir(&self, username: &str) -> PathBuf {
        self.ctx
            .env()
            .users_dir()
            .join(username)
            .join(self.long_name())
    }

    /// Copy the current file into `username`'s working directory
    ///
    /// Each call writes a new `{long name}_vNNN{ext}` file and appends it to
    /// the directory's checkout ledger. When nothing has been published yet
    /// the returned path does not exist and no operation is recorded.
    pub fn checkout(&mut self, username: &str) -> Result<PathBuf> {
        validate_name(username)?;
        let checkout_dir = self.checkout_dir(username);

        let mut checkout = if self.ctx.store().exists(&checkout_dir.join(CHECKOUT_MARKER)) {
            Checkout::open(&self.ctx, &checkout_dir)?
        } else {
            let record =
                CheckoutRecord::new(username, self.parent(), self.department(), self.name());
            Checkout::create(&self.ctx, checkout_dir.clone(), record)?
        };

        let app_file = self.app_filepath();
        let checkout_file = fsutil::version_file(
            &checkout_dir.join(format!("{}{}", self.long_name(), self.app_ext())),
        );
        if app_file.exists() {
            std::fs::copy(&app_file, &checkout_file)?;
            fsutil::set_permissions(&checkout_file)?;
            checkout.add_operation(&checkout_file)?;
            info!("{} checked out {:?}", username, checkout_file);
        } else {
            debug!("Nothing to check out at {:?}", app_file);
        }

        self.update_checkout_users(username)?;
        Ok(checkout_file)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::setup;
    use super::*;
    use crate::body::department;
    use more_asserts::assert_gt;

    #[test]
    fn test_checkout_copies_current_file() {
        let (temp, ctx, body) = setup();
        let mut element = body.main_element(department::GEO).unwrap();
        let source = temp.path().join("geo.obj");
        std::fs::write(&source, "mesh").unwrap();
        element.publish("alice", &source, "first", "hero").unwrap();

        let file = element.checkout("bob").unwrap();

        let expected_dir = ctx.env().users_dir().join("bob").join("hero_geo_main");
        assert_eq!(file, expected_dir.join("hero_geo_main_v000.obj"));
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "mesh");
        assert_eq!(element.list_checkout_users(), vec!["bob"]);

        let checkout = Checkout::open(&ctx, &expected_dir).unwrap();
        assert_eq!(checkout.user(), "bob");
        assert_eq!(checkout.body_name(), "hero");
        assert_eq!(checkout.department(), department::GEO);
        assert_eq!(checkout.element_name(), "main");
        assert_eq!(checkout.list_files(), [file.display().to_string()]);
        assert_eq!(checkout.list_times().len(), 1);
    }

    #[test]
    fn test_repeat_checkout_appends_to_same_ledger() {
        let (temp, ctx, body) = setup();
        let mut element = body.main_element(department::GEO).unwrap();
        let source = temp.path().join("geo.obj");
        std::fs::write(&source, "mesh").unwrap();
        element.publish("alice", &source, "first", "hero").unwrap();

        let first = element.checkout("bob").unwrap();
        let before = Checkout::open(&ctx, element.checkout_dir("bob"))
            .unwrap()
            .list_files()
            .len();
        let second = element.checkout("bob").unwrap();
        let after = Checkout::open(&ctx, element.checkout_dir("bob")).unwrap();

        assert_ne!(first, second);
        assert!(first.exists());
        assert!(second.exists());
        assert_gt!(after.list_files().len(), before);
        assert_eq!(after.list_files().len(), after.list_times().len());
        assert_eq!(element.list_checkout_users(), vec!["bob"]);
    }

    #[test]
    fn test_checkout_without_publish() {
        let (_temp, ctx, body) = setup();
        let mut element = body.main_element(department::RIG).unwrap();

        let file = element.checkout("dave").unwrap();

        assert!(!file.exists());
        let checkout = Checkout::open(&ctx, element.checkout_dir("dave")).unwrap();
        assert!(checkout.list_files().is_empty());

        let reopened = Element::open(&ctx, element.dir()).unwrap();
        assert_eq!(reopened.list_checkout_users(), vec!["dave"]);
    }

    #[test]
    fn test_debug_summary() {
        let (_temp, ctx, body) = setup();
        let mut element = body.main_element(department::GEO).unwrap();
        element.checkout("bob").unwrap();

        let checkout = Checkout::open(&ctx, element.checkout_dir("bob")).unwrap();
        let shown = format!("{:?}", checkout);
        assert!(shown.starts_with("Checkout {"));
        assert!(shown.contains("user: \"bob\""));
        assert!(shown.contains("operations: 0"));
    }

    #[test]
    fn test_open_requires_marker() {
        let (temp, ctx, _body) = setup();
        let result = Checkout::open(&ctx, temp.path());
        assert!(matches!(result, Err(PipelineError::NotFound { .. })));
    }
}
