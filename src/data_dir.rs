use std::{
    ffi::OsString,
    path::{
        Path,
        PathBuf,
    },
};

use serde::Serialize;
use tracing::debug;

use crate::error::{
    Error,
    Result,
};

/// Environment variable that overrides the XDG data directory.
pub const DATA_DIR_ENV: &str = "SNAPDEX_DATA_DIR";

/// Which setting picked the data directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Flag,
    Env,
    Xdg,
}

impl Origin {
    /// The setting as a user would name it.
    pub fn describe(self) -> &'static str {
        match self {
            Origin::Flag => "--data-dir",
            Origin::Env => DATA_DIR_ENV,
            Origin::Xdg => "XDG data home",
        }
    }
}

/// Root directory holding the index and its optional config file.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
    origin: Origin,
}

impl DataDir {
    /// Use `explicit` (from `--data-dir`), then [`DATA_DIR_ENV`] if set and
    /// non-empty, then `$XDG_DATA_HOME/snapdex`. The directory is created
    /// if missing.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        Self::resolve_with(explicit, std::env::var_os(DATA_DIR_ENV))
    }

    fn resolve_with(explicit: Option<&Path>, env: Option<OsString>) -> Result<Self> {
        let (root, origin) = match choose(explicit, env) {
            Some(chosen) => chosen,
            None => {
                let home = xdg::BaseDirectories::with_prefix("snapdex")
                    .get_data_home()
                    .ok_or_else(|| {
                        Error::Config(
                            "could not determine XDG data home directory".into(),
                        )
                    })?;
                (home, Origin::Xdg)
            }
        };

        let unusable = |path: &Path, e: std::io::Error| Error::StorageOpen {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };
        // Relative paths would change meaning if the process moves.
        let root = std::path::absolute(&root).map_err(|e| unusable(&root, e))?;
        std::fs::create_dir_all(&root).map_err(|e| unusable(&root, e))?;

        debug!(root = %root.display(), ?origin, "resolved data directory");
        Ok(Self { root, origin })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Optional JSON file overriding the default [`crate::ServiceConfig`].
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.json")
    }

    pub fn index_dir(&self) -> PathBuf {
        self.root.join("index")
    }

    /// Whether an index has been created here before.
    pub fn has_index(&self) -> bool {
        self.index_dir().join("meta.json").is_file()
    }
}

/// `None` means fall back to XDG.
fn choose(explicit: Option<&Path>, env: Option<OsString>) -> Option<(PathBuf, Origin)> {
    match (explicit, env) {
        (Some(path), _) => Some((path.to_path_buf(), Origin::Flag)),
        (None, Some(val)) if !val.is_empty() => Some((PathBuf::from(val), Origin::Env)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins_over_env() {
        let tmp = tempfile::tempdir().unwrap();
        let other = tmp.path().join("from-env");
        let dir =
            DataDir::resolve_with(Some(tmp.path()), Some(other.clone().into()))
                .unwrap();

        assert_eq!(dir.root(), tmp.path());
        assert_eq!(dir.origin(), Origin::Flag);
        assert_eq!(dir.config_file(), tmp.path().join("config.json"));
        assert_eq!(dir.index_dir(), tmp.path().join("index"));
        assert!(!other.exists());
    }

    #[test]
    fn env_path_is_created() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a/b");
        let dir = DataDir::resolve_with(None, Some(nested.clone().into())).unwrap();

        assert_eq!(dir.origin(), Origin::Env);
        assert_eq!(dir.root(), nested);
        assert!(dir.root().is_dir());
    }

    #[test]
    fn empty_env_falls_back_to_xdg() {
        assert_eq!(choose(None, Some(OsString::new())), None);
        assert_eq!(choose(None, None), None);
        assert_eq!(
            choose(None, Some("/srv/snapdex".into())),
            Some((PathBuf::from("/srv/snapdex"), Origin::Env))
        );
    }

    #[test]
    fn relative_paths_are_made_absolute() {
        let relative = Path::new("target/snapdex-relative-test");
        let dir = DataDir::resolve_with(Some(relative), None).unwrap();
        let root = dir.root().to_path_buf();
        std::fs::remove_dir(&root).unwrap();

        assert!(root.is_absolute());
        assert!(root.ends_with(relative));
    }

    #[test]
    fn has_index_once_opened() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = DataDir::resolve(Some(tmp.path())).unwrap();
        assert!(!dir.has_index());

        let config = crate::ServiceConfig::default();
        let service = crate::IndexService::open(&dir.index_dir(), &config).unwrap();
        drop(service);
        assert!(dir.has_index());
    }
}
