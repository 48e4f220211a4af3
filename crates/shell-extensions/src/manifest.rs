//! Extension manifest parsing.
//!
//! A package is a directory carrying a manifest that can be read without
//! loading anything else from the package. Two layouts are accepted:
//!
//! - [`MANIFEST_FILENAME`] (`extension.toml`), preferred:
//!
//! ```toml
//! [extension]
//! id = "drv.x"
//! version = "2.0"
//! type = "instrument"
//! name = "X Series PSU"
//! description = "Driver for X series power supplies"
//! ```
//!
//! - [`PACKAGE_JSON_FILENAME`] (`package.json`), for npm-style packages:
//!
//! ```json
//! {
//!   "name": "drv.x",
//!   "version": "2.0",
//!   "studio-extension": { "type": "instrument" }
//! }
//! ```

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::version::Version;

/// The preferred manifest filename inside a package directory.
pub const MANIFEST_FILENAME: &str = "extension.toml";

/// Fallback manifest for npm-style packages.
pub const PACKAGE_JSON_FILENAME: &str = "package.json";

/// What an extension contributes to the shell.
///
/// Serialized as a plain string; anything other than `"instrument"` is kept
/// verbatim in [`ExtensionType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ExtensionType {
    /// An instrument driver; installing it provisions an instrument object.
    Instrument,
    /// Any other extension kind.
    Other(String),
}

impl ExtensionType {
    pub fn is_instrument(&self) -> bool {
        matches!(self, ExtensionType::Instrument)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ExtensionType::Instrument => "instrument",
            ExtensionType::Other(other) => other,
        }
    }
}

impl From<String> for ExtensionType {
    fn from(value: String) -> Self {
        if value.eq_ignore_ascii_case("instrument") {
            ExtensionType::Instrument
        } else {
            ExtensionType::Other(value)
        }
    }
}

impl From<&str> for ExtensionType {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<ExtensionType> for String {
    fn from(value: ExtensionType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ExtensionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of an extension package.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExtensionManifest {
    /// Unique extension id (e.g., "drv.x").
    pub id: String,
    /// Dotted numeric version string.
    pub version: String,
    /// Extension kind.
    #[serde(rename = "type")]
    pub extension_type: ExtensionType,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Deserialize, Serialize)]
struct ManifestDocument {
    extension: ExtensionManifest,
}

#[derive(Deserialize)]
struct PackageJson {
    name: String,
    version: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "studio-extension")]
    extension: PackageJsonExtension,
}

#[derive(Deserialize)]
struct PackageJsonExtension {
    #[serde(rename = "type")]
    extension_type: ExtensionType,
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "displayName")]
    display_name: Option<String>,
}

impl ExtensionManifest {
    /// Build a manifest in code.
    pub fn new(
        id: impl Into<String>,
        version: impl Into<String>,
        extension_type: impl Into<ExtensionType>,
    ) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            extension_type: extension_type.into(),
            name: None,
            description: None,
        }
    }

    /// Parse an `extension.toml` document.
    pub fn from_toml(content: &str) -> Result<Self> {
        Self::from_toml_at(content, "<inline>")
    }

    /// Parse a `package.json` document.
    pub fn from_json(content: &str) -> Result<Self> {
        Self::from_json_at(content, "<inline>")
    }

    /// Read and parse a manifest file; the format follows the file name.
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::ManifestNotFound(path.to_path_buf()));
        }
        let content = shell_fs::io::read_text(path)?;
        let origin = path.display().to_string();
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_at(&content, &origin)
        } else {
            Self::from_toml_at(&content, &origin)
        }
    }

    /// Read the manifest of a package directory.
    ///
    /// `extension.toml` wins over `package.json` when both are present.
    pub fn from_package(package_dir: &Path) -> Result<Self> {
        let toml_path = package_dir.join(MANIFEST_FILENAME);
        if toml_path.is_file() {
            return Self::from_path(&toml_path);
        }
        let json_path = package_dir.join(PACKAGE_JSON_FILENAME);
        if json_path.is_file() {
            return Self::from_path(&json_path);
        }
        Err(Error::ManifestNotFound(package_dir.to_path_buf()))
    }

    /// Serialize the manifest as an `extension.toml` document.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(&ManifestDocument {
            extension: self.clone(),
        })
        .map_err(|e| Error::malformed(&self.id, e.to_string()))
    }

    /// Parsed version.
    pub fn parsed_version(&self) -> Result<Version> {
        Version::parse(&self.version)
    }

    /// Display name, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    fn from_toml_at(content: &str, origin: &str) -> Result<Self> {
        let document: ManifestDocument =
            toml::from_str(content).map_err(|e| Error::malformed(origin, e.message()))?;
        let manifest = document.extension;
        manifest.validate(origin)?;
        Ok(manifest)
    }

    fn from_json_at(content: &str, origin: &str) -> Result<Self> {
        let package: PackageJson =
            serde_json::from_str(content).map_err(|e| Error::malformed(origin, e.to_string()))?;
        let manifest = Self {
            id: package.extension.id.unwrap_or(package.name),
            version: package.version,
            extension_type: package.extension.extension_type,
            name: package.extension.display_name,
            description: package.description,
        };
        manifest.validate(origin)?;
        Ok(manifest)
    }

    /// Validate the manifest fields.
    fn validate(&self, origin: &str) -> Result<()> {
        let id = &self.id;
        if id.is_empty() {
            return Err(Error::malformed(origin, "extension id must not be empty"));
        }
        if id.starts_with('.') {
            return Err(Error::malformed(
                origin,
                format!("extension id '{id}' must not start with '.'"),
            ));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(Error::malformed(
                origin,
                format!(
                    "extension id '{id}' must contain only alphanumeric characters, dots, hyphens, or underscores"
                ),
            ));
        }
        if let ExtensionType::Other(kind) = &self.extension_type {
            if kind.trim().is_empty() {
                return Err(Error::malformed(origin, "extension type must not be empty"));
            }
        }

        self.parsed_version()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const INSTRUMENT_TOML: &str = r#"
[extension]
id = "drv.x"
version = "2.0"
type = "instrument"
name = "X Series PSU"
description = "Driver for X series power supplies"
"#;

    #[test]
    fn test_parse_toml_manifest() {
        let manifest = ExtensionManifest::from_toml(INSTRUMENT_TOML).unwrap();
        assert_eq!(manifest.id, "drv.x");
        assert_eq!(manifest.version, "2.0");
        assert_eq!(manifest.extension_type, ExtensionType::Instrument);
        assert_eq!(manifest.display_name(), "X Series PSU");
        assert!(manifest.extension_type.is_instrument());
    }

    #[test]
    fn test_parse_other_type_kept_verbatim() {
        let manifest = ExtensionManifest::from_toml(
            r#"
[extension]
id = "theme.dark"
version = "1"
type = "theme"
"#,
        )
        .unwrap();
        assert_eq!(
            manifest.extension_type,
            ExtensionType::Other("theme".to_string())
        );
        assert_eq!(manifest.display_name(), "theme.dark");
    }

    #[test]
    fn test_instrument_type_is_case_insensitive() {
        assert_eq!(ExtensionType::from("Instrument"), ExtensionType::Instrument);
    }

    #[test]
    fn test_parse_package_json() {
        let manifest = ExtensionManifest::from_json(
            r#"{
                "name": "drv.y",
                "version": "1.5",
                "description": "Y driver",
                "studio-extension": { "type": "instrument", "displayName": "Y" }
            }"#,
        )
        .unwrap();
        assert_eq!(manifest.id, "drv.y");
        assert_eq!(manifest.version, "1.5");
        assert_eq!(manifest.name.as_deref(), Some("Y"));
        assert_eq!(manifest.description.as_deref(), Some("Y driver"));
    }

    #[test]
    fn test_package_json_explicit_id_wins() {
        let manifest = ExtensionManifest::from_json(
            r#"{"name": "npm-name", "version": "1", "studio-extension": {"type": "instrument", "id": "drv.z"}}"#,
        )
        .unwrap();
        assert_eq!(manifest.id, "drv.z");
    }

    #[test]
    fn test_missing_fields_are_malformed() {
        let err = ExtensionManifest::from_toml("[extension]\nid = \"a\"\n").unwrap_err();
        assert!(matches!(err, Error::MalformedManifest { .. }), "{err:?}");
    }

    #[test]
    fn test_unknown_field_is_malformed() {
        let err = ExtensionManifest::from_toml(
            "[extension]\nid = \"a\"\nversion = \"1\"\ntype = \"x\"\nbogus = 1\n",
        )
        .unwrap_err();
        assert!(matches!(err, Error::MalformedManifest { .. }), "{err:?}");
    }

    #[test]
    fn test_bad_version_is_malformed_version() {
        let err = ExtensionManifest::from_toml(
            "[extension]\nid = \"a\"\nversion = \"1.x\"\ntype = \"instrument\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, Error::MalformedVersion { .. }), "{err:?}");
    }

    #[test]
    fn test_invalid_ids_rejected() {
        for id in ["", ".hidden", "a/b", "a b", "../escape"] {
            let manifest = ExtensionManifest::new(id, "1.0", "instrument");
            let err = manifest.validate("<test>").unwrap_err();
            assert!(
                matches!(err, Error::MalformedManifest { .. }),
                "expected MalformedManifest for {id:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn test_to_toml_reparses() {
        let manifest = ExtensionManifest::from_toml(INSTRUMENT_TOML).unwrap();
        let text = manifest.to_toml().unwrap();
        assert!(text.contains("[extension]"));
        assert_eq!(ExtensionManifest::from_toml(&text).unwrap(), manifest);
    }

    #[test]
    fn test_from_package_prefers_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILENAME), INSTRUMENT_TOML).unwrap();
        std::fs::write(
            dir.path().join(PACKAGE_JSON_FILENAME),
            r#"{"name": "other", "version": "9", "studio-extension": {"type": "instrument"}}"#,
        )
        .unwrap();

        let manifest = ExtensionManifest::from_package(dir.path()).unwrap();
        assert_eq!(manifest.id, "drv.x");
    }

    #[test]
    fn test_from_package_without_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let err = ExtensionManifest::from_package(dir.path()).unwrap_err();
        assert!(matches!(err, Error::ManifestNotFound(_)));
    }
}
