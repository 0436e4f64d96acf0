use super::{Element, Publish};
use crate::environment::validate_name;
use crate::{fsutil, PipelineError, Result};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

impl Element {
    /// Canonical current file a publish under `body_name` writes
    pub fn current_filepath(&self, body_name: &str) -> PathBuf {
        self.dir
            .join(format!("{}_{}{}", body_name, self.name(), self.app_ext()))
    }

    /// File committed as `version` under `body_name`
    pub fn version_filepath(&self, version: i64, body_name: &str) -> PathBuf {
        self.version_dir(version)
            .join(format!("{}{}", body_name, self.app_ext()))
    }

    /// Commit `source` (a file or a directory) as the next version
    ///
    /// The source ends up both at the canonical current location and in a
    /// new `.vNNNN` directory. When `source` is neither of those it is copied
    /// to both and then removed, unless it lives inside this element (an
    /// older version being republished, say), in which case it stays. When
    /// it already is one of them only the other copy is written. The history
    /// entry is appended and the record persisted only after both copies
    /// exist.
    pub fn publish(
        &mut self,
        username: &str,
        source: &Path,
        comment: &str,
        body_name: &str,
    ) -> Result<Publish> {
        validate_name(body_name)?;
        if !source.exists() {
            return Err(PipelineError::SourceMissing(source.to_path_buf()));
        }

        let new_version = self.last_version() + 1;
        let current = self.current_filepath(body_name);
        let version_dir = self.version_dir(new_version);
        let versioned = self.version_filepath(new_version, body_name);
        debug!(
            "Publishing {:?} as version {} ({:?}, {:?})",
            source, new_version, current, versioned
        );

        let is_current = fsutil::same_path(source, &current)?;
        let is_versioned = fsutil::same_path(source, &versioned)?;
        if (!is_current && fsutil::is_within(&current, source)?)
            || (!is_versioned && fsutil::is_within(&versioned, source)?)
        {
            return Err(PipelineError::CopyIntoSelf(source.to_path_buf()));
        }
        let remove_source =
            !is_current && !is_versioned && !fsutil::is_within(source, &self.dir)?;

        let created_version_dir = !version_dir.exists();
        fsutil::mkdir(&version_dir)?;

        let copied = if is_current {
            fsutil::replace_path(source, &versioned)
        } else if is_versioned {
            fsutil::replace_path(source, &current)
        } else {
            fsutil::replace_path(source, &current)
                .and_then(|_| fsutil::replace_path(source, &versioned))
        };
        if let Err(e) = copied {
            if created_version_dir {
                let _ = fsutil::remove_path(&version_dir);
            }
            return Err(e.into());
        }

        let publish = Publish {
            user: username.to_string(),
            timestamp: fsutil::timestamp(),
            comment: comment.to_string(),
            filepath: current.display().to_string(),
        };
        let entry = publish.clone();
        self.update(move |r| {
            r.publishes.push(entry);
            r.latest_version = new_version;
        })?;

        if remove_source {
            if let Err(e) = fsutil::remove_path(source) {
                warn!("Published {:?} but could not remove it: {}", source, e);
            }
        }

        info!(
            "{} published {} version {}",
            username,
            self.long_name(),
            new_version
        );
        Ok(publish)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::setup;
    use crate::body::department;
    use crate::element::Element;
    use crate::PipelineError;
    use proptest::prelude::*;

    #[test]
    fn test_first_publish_moves_source() {
        let (temp, ctx, body) = setup();
        let mut element = body.main_element(department::GEO).unwrap();
        let source = temp.path().join("geo.obj");
        std::fs::write(&source, "v 0 0 0").unwrap();

        let publish = element
            .publish("alice", &source, "first pass", "hero")
            .unwrap();

        let current = element.dir().join("hero_main.obj");
        let versioned = element.dir().join(".v0000").join("hero.obj");
        assert_eq!(element.last_version(), 0);
        assert_eq!(publish.user, "alice");
        assert_eq!(publish.comment, "first pass");
        assert_eq!(publish.filepath, current.display().to_string());
        assert_eq!(element.last_publish(), Some(&publish));
        assert_eq!(std::fs::read_to_string(&current).unwrap(), "v 0 0 0");
        assert_eq!(std::fs::read_to_string(&versioned).unwrap(), "v 0 0 0");
        assert!(!source.exists());

        let reopened = Element::open(&ctx, element.dir()).unwrap();
        assert_eq!(reopened.list_publishes(), &[publish]);
    }

    #[test]
    fn test_publish_from_current_location() {
        let (_temp, _ctx, body) = setup();
        let mut element = body.main_element(department::GEO).unwrap();
        let current = element.current_filepath("hero");
        std::fs::write(&current, "authored in place").unwrap();

        element
            .publish("alice", &current, "in place", "hero")
            .unwrap();

        assert!(current.exists());
        let versioned = element.version_filepath(0, "hero");
        assert_eq!(
            std::fs::read_to_string(versioned).unwrap(),
            "authored in place"
        );
    }

    #[test]
    fn test_publish_from_version_location() {
        let (_temp, _ctx, body) = setup();
        let mut element = body.main_element(department::RIG).unwrap();
        let versioned = element.version_filepath(0, "hero");
        std::fs::create_dir_all(versioned.parent().unwrap()).unwrap();
        std::fs::write(&versioned, "exported rig").unwrap();

        element.publish("bob", &versioned, "export", "hero").unwrap();

        assert!(versioned.exists());
        let current = element.current_filepath("hero");
        assert_eq!(current, element.dir().join("hero_main.mb"));
        assert_eq!(std::fs::read_to_string(current).unwrap(), "exported rig");
    }

    #[test]
    fn test_missing_source_leaves_record_untouched() {
        let (temp, _ctx, body) = setup();
        let mut element = body.main_element(department::GEO).unwrap();

        let result = element.publish("alice", &temp.path().join("nope.obj"), "x", "hero");
        assert!(matches!(result, Err(PipelineError::SourceMissing(_))));
        assert_eq!(element.last_version(), -1);
        assert!(element.list_publishes().is_empty());
        assert!(!element.version_dir(0).exists());
    }

    #[test]
    fn test_republish_old_version_keeps_it() {
        let (temp, _ctx, body) = setup();
        let mut element = body.main_element(department::GEO).unwrap();
        let first = temp.path().join("a.obj");
        std::fs::write(&first, "original").unwrap();
        element.publish("alice", &first, "first", "hero").unwrap();
        let second = temp.path().join("b.obj");
        std::fs::write(&second, "rework").unwrap();
        element.publish("alice", &second, "second", "hero").unwrap();

        let old = element.version_filepath(0, "hero");
        element
            .publish("alice", &old, "revert to v0", "hero")
            .unwrap();

        assert_eq!(element.last_version(), 2);
        assert_eq!(std::fs::read_to_string(&old).unwrap(), "original");
        assert_eq!(
            std::fs::read_to_string(element.version_filepath(2, "hero")).unwrap(),
            "original"
        );
        assert_eq!(
            std::fs::read_to_string(element.current_filepath("hero")).unwrap(),
            "original"
        );
    }

    #[test]
    fn test_publish_directory() {
        let (temp, ctx, body) = setup();
        let mut element = body.main_element(department::TEXTURES).unwrap();
        let source = temp.path().join("tex");
        std::fs::create_dir_all(&source).unwrap();
        std::fs::write(source.join("diffuse.png"), "pixels").unwrap();

        element.publish("erin", &source, "textures", "hero").unwrap();

        for dir in [
            element.current_filepath("hero"),
            element.version_filepath(0, "hero"),
        ] {
            assert!(dir.is_dir());
            assert_eq!(
                std::fs::read_to_string(dir.join("diffuse.png")).unwrap(),
                "pixels"
            );
        }
        assert!(!source.exists());

        // republishing replaces the current directory instead of merging into it
        std::fs::create_dir_all(&source).unwrap();
        std::fs::write(source.join("normal.png"), "bumps").unwrap();
        element.publish("erin", &source, "swap", "hero").unwrap();

        let current = element.current_filepath("hero");
        assert!(!current.join("diffuse.png").exists());
        assert!(current.join("normal.png").exists());
        assert!(element.version_filepath(0, "hero").join("diffuse.png").exists());
        assert_eq!(Element::open(&ctx, element.dir()).unwrap().last_version(), 1);
    }

    #[test]
    fn test_publish_own_directory_fails_cleanly() {
        let (_temp, _ctx, body) = setup();
        let mut element = body.main_element(department::GEO).unwrap();
        let own_dir = element.dir().to_path_buf();

        let result = element.publish("alice", &own_dir, "oops", "hero");

        assert!(matches!(result, Err(PipelineError::CopyIntoSelf(_))));
        assert!(!element.version_dir(0).exists());
        assert!(!element.current_filepath("hero").exists());
        assert_eq!(element.last_version(), -1);
    }

    #[test]
    fn test_history_is_append_only() {
        let (temp, _ctx, body) = setup();
        let mut element = body.main_element(department::GEO).unwrap();

        let mut seen = Vec::new();
        for i in 0..3 {
            let source = temp.path().join(format!("pass{}.obj", i));
            std::fs::write(&source, format!("pass {}", i)).unwrap();
            seen.push(
                element
                    .publish("alice", &source, &format!("pass {}", i), "hero")
                    .unwrap(),
            );
            assert_eq!(&element.list_publishes()[..seen.len()], seen.as_slice());
        }

        assert_eq!(element.last_version(), 2);
        for i in 0..3 {
            let versioned = element.version_filepath(i, "hero");
            assert_eq!(
                std::fs::read_to_string(versioned).unwrap(),
                format!("pass {}", i)
            );
        }
        let current = element.current_filepath("hero");
        assert_eq!(std::fs::read_to_string(current).unwrap(), "pass 2");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_versions_track_publish_count(count in 1usize..6) {
            let (temp, ctx, body) = setup();
            let mut element = body.main_element(department::ANIMATION).unwrap();

            for i in 0..count {
                let source = temp.path().join(format!("anim{}.abc", i));
                std::fs::write(&source, i.to_string()).unwrap();
                element.publish("carol", &source, "", "hero").unwrap();
            }

            let reopened = Element::open(&ctx, element.dir()).unwrap();
            prop_assert_eq!(reopened.last_version(), count as i64 - 1);
            prop_assert_eq!(reopened.list_publishes().len(), count);
            prop_assert_eq!(reopened.list_publishes(), element.list_publishes());
        }
    }
}
