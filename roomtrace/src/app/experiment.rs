//! Experiment output directories.
//!
//! Every run writes into its own timestamped directory under the output
//! root; a `latest` symlink is repointed at the newest one.

use crate::error::Error;
use std::path::{Path, PathBuf};

const LATEST_LINK: &str = "latest";

/// A created experiment directory.
#[derive(Debug, Clone)]
pub struct ExperimentDir {
    path: PathBuf,
}

impl ExperimentDir {
    /// Creates `root/<YYYYMMDD-HHMMSS>-<NNN>` (the counter disambiguates
    /// same-second runs) and repoints the `latest` symlink at it.
    pub fn create(root: &Path) -> Result<Self, Error> {
        std::fs::create_dir_all(root)?;
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();

        let mut path = None;
        for counter in 0..1000u32 {
            let candidate = root.join(format!("{stamp}-{counter:03}"));
            match std::fs::create_dir(&candidate) {
                Ok(()) => {
                    path = Some(candidate);
                    break;
                }
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(err.into()),
            }
        }
        let path = path.ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "exhausted experiment directory counters for this second",
            ))
        })?;

        let dir = Self { path };
        dir.update_latest_link(root);
        log::info!("experiment directory: {}", dir.path.display());
        Ok(dir)
    }

    /// The directory path.
    pub fn path(&self) -> &Path { &self.path }

    /// Path of a file inside the experiment directory.
    pub fn file_path(&self, name: &str) -> PathBuf { self.path.join(name) }

    /// Copies the experiment config into the directory verbatim.
    pub fn copy_config(&self, config_path: &Path) -> Result<(), Error> {
        let name = config_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "config.yaml".to_string());
        std::fs::copy(config_path, self.file_path(&name))?;
        Ok(())
    }

    /// Best-effort repointing of `root/latest`; failure only logs.
    fn update_latest_link(&self, root: &Path) {
        let link = root.join(LATEST_LINK);
        #[cfg(unix)]
        {
            let _ = std::fs::remove_file(&link);
            if let Err(err) = std::os::unix::fs::symlink(&self.path, &link) {
                log::warn!("could not update {} symlink: {err}", link.display());
            }
        }
        #[cfg(not(unix))]
        {
            log::debug!("skipping {} symlink on this platform", link.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_unique_directories_and_latest_link() {
        let root = std::env::temp_dir().join(format!(
            "roomtrace_experiment_test_{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&root);

        let first = ExperimentDir::create(&root).unwrap();
        let second = ExperimentDir::create(&root).unwrap();
        assert_ne!(first.path(), second.path());
        assert!(first.path().is_dir());
        assert!(second.path().is_dir());

        #[cfg(unix)]
        {
            let latest = std::fs::read_link(root.join(LATEST_LINK)).unwrap();
            assert_eq!(latest, second.path());
        }

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn copies_config_file() {
        let root = std::env::temp_dir().join(format!(
            "roomtrace_experiment_copy_test_{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(&root).unwrap();

        let config = root.join("exp.yaml");
        std::fs::write(&config, "a: 1\n").unwrap();

        let dir = ExperimentDir::create(&root).unwrap();
        dir.copy_config(&config).unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.file_path("exp.yaml")).unwrap(),
            "a: 1\n"
        );

        std::fs::remove_dir_all(&root).unwrap();
    }
}
