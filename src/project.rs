//! Project layer: manifest discovery, typed manifest, and lockfile.
//!
//! One stable surface for both; callers never reach around it. The
//! manifest filename is the `jac.toml` convention; root discovery walks
//! upward from a starting directory until it finds one.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const MANIFEST_NAME: &str = "jac.toml";
pub const LOCKFILE_NAME: &str = "jac.lock";

/// Walk upward from `start` to the first directory containing the project
/// manifest. `None` when no manifest is found; callers then fall back to
/// the working directory.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut dir = if start.is_dir() {
        start.to_path_buf()
    } else {
        start.parent()?.to_path_buf()
    };
    loop {
        if dir.join(MANIFEST_NAME).is_file() {
            return Some(dir);
        }
        dir = dir.parent()?.to_path_buf();
    }
}

#[derive(Debug)]
pub enum ProjectError {
    Io(PathBuf, String),
    Parse(PathBuf, String),
    Serialize(String),
}

impl std::fmt::Display for ProjectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectError::Io(path, msg) => write!(f, "cannot read {}: {}", path.display(), msg),
            ProjectError::Parse(path, msg) => {
                write!(f, "cannot parse {}: {}", path.display(), msg)
            }
            ProjectError::Serialize(msg) => write!(f, "cannot serialize: {}", msg),
        }
    }
}

impl std::error::Error for ProjectError {}

/// The project manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub package: Package,
    #[serde(default)]
    pub dependencies: BTreeMap<String, DependencySpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_entry")]
    pub entry: String,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn default_entry() -> String {
    "main.jac".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum DependencySpec {
    /// Plain version requirement: `"1.0.0"`.
    Simple(String),
    /// Detailed form: `{ version = "1.0", path = "../foo" }`.
    Detailed(DependencyDetail),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DependencyDetail {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub git: Option<String>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Manifest, ProjectError> {
        let text = fs::read_to_string(path)
            .map_err(|e| ProjectError::Io(path.to_path_buf(), e.to_string()))?;
        toml::from_str(&text).map_err(|e| ProjectError::Parse(path.to_path_buf(), e.to_string()))
    }

    pub fn load_from_root(root: &Path) -> Result<Manifest, ProjectError> {
        Manifest::load(&root.join(MANIFEST_NAME))
    }

    pub fn save(&self, path: &Path) -> Result<(), ProjectError> {
        let text =
            toml::to_string_pretty(self).map_err(|e| ProjectError::Serialize(e.to_string()))?;
        fs::write(path, text).map_err(|e| ProjectError::Io(path.to_path_buf(), e.to_string()))
    }
}

/// The lockfile: resolved versions pinned next to the manifest.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Lockfile {
    #[serde(default = "default_lock_version")]
    pub version: u32,
    #[serde(default)]
    pub packages: Vec<LockedPackage>,
}

fn default_lock_version() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LockedPackage {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub checksum: Option<String>,
}

impl Lockfile {
    pub fn load_from_root(root: &Path) -> Result<Option<Lockfile>, ProjectError> {
        let path = root.join(LOCKFILE_NAME);
        if !path.is_file() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)
            .map_err(|e| ProjectError::Io(path.clone(), e.to_string()))?;
        toml::from_str(&text)
            .map(Some)
            .map_err(|e| ProjectError::Parse(path, e.to_string()))
    }

    pub fn save_to_root(&self, root: &Path) -> Result<(), ProjectError> {
        let path = root.join(LOCKFILE_NAME);
        let text =
            toml::to_string_pretty(self).map_err(|e| ProjectError::Serialize(e.to_string()))?;
        fs::write(&path, text).map_err(|e| ProjectError::Io(path, e.to_string()))
    }

    pub fn pinned(&self, name: &str) -> Option<&LockedPackage> {
        self.packages.iter().find(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_discovery_walks_upward() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join(MANIFEST_NAME),
            "[package]\nname = \"demo\"\n",
        )
        .unwrap();
        let nested = tmp.path().join("src/deep");
        fs::create_dir_all(&nested).unwrap();

        let root = find_project_root(&nested).unwrap();
        assert_eq!(
            root.canonicalize().unwrap(),
            tmp.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn no_manifest_means_no_root() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(find_project_root(tmp.path()), None);
    }

    #[test]
    fn manifest_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let manifest = Manifest {
            package: Package {
                name: "demo".into(),
                version: "0.2.0".into(),
                description: Some("a demo".into()),
                entry: "app.jac".into(),
            },
            dependencies: BTreeMap::from([(
                "http".to_string(),
                DependencySpec::Simple("1.0".to_string()),
            )]),
        };
        let path = tmp.path().join(MANIFEST_NAME);
        manifest.save(&path).unwrap();
        let loaded = Manifest::load(&path).unwrap();
        assert_eq!(loaded.package.name, "demo");
        assert_eq!(loaded.package.entry, "app.jac");
        assert_eq!(
            loaded.dependencies["http"],
            DependencySpec::Simple("1.0".to_string())
        );
    }

    #[test]
    fn manifest_defaults_fill_in() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(MANIFEST_NAME);
        fs::write(&path, "[package]\nname = \"bare\"\n").unwrap();
        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.package.version, "0.1.0");
        assert_eq!(manifest.package.entry, "main.jac");
        assert!(manifest.dependencies.is_empty());
    }

    #[test]
    fn lockfile_round_trips_and_pins() {
        let tmp = tempfile::tempdir().unwrap();
        let lock = Lockfile {
            version: 1,
            packages: vec![LockedPackage {
                name: "http".into(),
                version: "1.0.3".into(),
                source: Some("registry".into()),
                checksum: Some("abc123".into()),
            }],
        };
        lock.save_to_root(tmp.path()).unwrap();
        let loaded = Lockfile::load_from_root(tmp.path()).unwrap().unwrap();
        assert_eq!(loaded.pinned("http").unwrap().version, "1.0.3");
        assert!(loaded.pinned("missing").is_none());
    }

    #[test]
    fn missing_lockfile_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(Lockfile::load_from_root(tmp.path()).unwrap().is_none());
    }
}
