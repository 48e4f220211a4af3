//! Extension packages on disk.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A temporary directory of extension packages, one sub-directory each.
///
/// # Example
///
/// ```rust,no_run
/// use shell_test_utils::PackageDir;
///
/// let packages = PackageDir::new();
/// packages.add("drv.x", "2.0", "instrument");
/// packages.add_raw("broken", "extension.toml", "[extension]\nid = \"\"");
/// ```
pub struct PackageDir {
    temp_dir: TempDir,
}

impl Default for PackageDir {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageDir {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write a package named `<id>-<version>` with an `extension.toml` and
    /// a payload file.
    pub fn add(&self, id: &str, version: &str, extension_type: &str) -> PathBuf {
        self.add_named(&format!("{id}-{version}"), id, version, extension_type)
    }

    pub fn add_named(&self, dir: &str, id: &str, version: &str, extension_type: &str) -> PathBuf {
        let manifest = format!(
            "[extension]\nid = \"{id}\"\nversion = \"{version}\"\ntype = \"{extension_type}\"\n"
        );
        let path = self.add_raw(dir, "extension.toml", &manifest);
        fs::write(path.join("main.js"), format!("// {id} {version}\n")).unwrap();
        path
    }

    /// Write a package described by a `package.json`.
    pub fn add_package_json(&self, dir: &str, name: &str, version: &str, extension_type: &str) -> PathBuf {
        let manifest = format!(
            "{{\"name\": \"{name}\", \"version\": \"{version}\", \"studio-extension\": {{\"type\": \"{extension_type}\"}}}}"
        );
        self.add_raw(dir, "package.json", &manifest)
    }

    /// Write a single manifest file with arbitrary content.
    pub fn add_raw(&self, dir: &str, file_name: &str, content: &str) -> PathBuf {
        let path = self.root().join(dir);
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join(file_name), content).unwrap();
        path
    }
}
