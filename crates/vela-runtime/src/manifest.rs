//! Project manifest parsing (vela.toml)
//!
//! The manifest is optional; the launcher only consults it for extra
//! module search paths. Discovery walks upward from the working directory
//! so running from a subdirectory of a project still finds it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Manifest file name.
pub const MANIFEST_FILE: &str = "vela.toml";

/// Errors that can occur during manifest parsing.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Failed to read manifest file
    #[error("failed to read manifest file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("failed to parse manifest: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Project manifest (vela.toml).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProjectManifest {
    /// Package metadata (informational).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<PackageInfo>,

    /// Module resolution settings.
    #[serde(default)]
    pub modules: ModulesSection,
}

/// Package information.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackageInfo {
    /// Package name.
    pub name: String,

    /// Optional version string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// `[modules]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModulesSection {
    /// Extra module search paths, relative to the manifest's directory.
    #[serde(default)]
    pub paths: Vec<PathBuf>,
}

impl ProjectManifest {
    /// Read and parse a manifest file.
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}

/// Find the nearest `vela.toml` at or above `start`.
pub fn find_manifest(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(MANIFEST_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
