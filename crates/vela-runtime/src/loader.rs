//! Module resolution over search paths.
//!
//! Dotted module names map to relative paths (`pkg.mod` → `pkg/mod.vela`).
//! Standard modules (`tables`, and the engine-provided `profiler`) shadow
//! files of the same name.
//!
//! Search order for an import from a file:
//! 1. The importing file's own directory
//! 2. The launcher's working directory
//! 3. `vela_modules/` under the working directory
//! 4. `[modules].paths` from the nearest `vela.toml`
//! 5. `~/.vela/modules/` global directory
//!
//! Entry-point resolution (`-m` on the launcher) uses the same order minus
//! the importer directory.

use crate::error::LaunchError;
use crate::manifest::{self, ProjectManifest};
use std::path::{Path, PathBuf};
use vela_engine::{ModuleResolver, ResolveError, ResolvedModule};

/// Source file extension for Vela modules.
pub const SOURCE_EXTENSION: &str = "vela";

/// Resolves dotted module names to source files.
pub struct ModuleLoader {
    search_paths: Vec<PathBuf>,
}

impl ModuleLoader {
    /// Create a loader with an explicit search path list.
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    /// Create a loader rooted at `dir` (normally the working directory),
    /// honoring the nearest manifest's `[modules].paths`.
    pub fn from_dir(dir: &Path) -> Result<Self, LaunchError> {
        let mut search_paths = vec![dir.to_path_buf(), dir.join("vela_modules")];

        if let Some(manifest_path) = manifest::find_manifest(dir) {
            let manifest = ProjectManifest::from_file(&manifest_path)?;
            let base = manifest_path.parent().unwrap_or(dir);
            for path in manifest.modules.paths {
                search_paths.push(base.join(path));
            }
        }

        if let Some(home) = dirs::home_dir() {
            search_paths.push(home.join(".vela").join("modules"));
        }

        Ok(Self { search_paths })
    }

    /// The configured search paths, in order.
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Resolve the entry module for module-mode runs (`-m NAME`).
    pub fn resolve_entry(&self, name: &str) -> Result<PathBuf, LaunchError> {
        self.find_source(name, None).map_err(LaunchError::Resolve)
    }

    fn find_source(&self, name: &str, importer_dir: Option<&Path>) -> Result<PathBuf, ResolveError> {
        let relative = module_relative_path(name);

        let mut candidates = Vec::new();
        if let Some(dir) = importer_dir {
            candidates.push(dir.join(&relative));
        }
        for base in &self.search_paths {
            candidates.push(base.join(&relative));
        }

        for candidate in &candidates {
            if candidate.is_file() {
                return Ok(candidate.clone());
            }
        }

        let searched = candidates
            .iter()
            .map(|p| format!("  {}", p.display()))
            .collect::<Vec<_>>()
            .join("\n");
        Err(ResolveError::NotFound {
            name: name.to_string(),
            searched,
        })
    }
}

impl ModuleResolver for ModuleLoader {
    fn resolve(&self, name: &str, importer_dir: &Path) -> Result<ResolvedModule, ResolveError> {
        if let Some(native) = crate::accel::std_module(name) {
            return Ok(ResolvedModule::Native(native));
        }

        let path = self.find_source(name, Some(importer_dir))?;
        let source = std::fs::read_to_string(&path).map_err(|source| ResolveError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(ResolvedModule::Source { path, source })
    }
}

/// Map a dotted module name onto a relative source path.
fn module_relative_path(name: &str) -> PathBuf {
    let mut path: PathBuf = name.split('.').collect();
    path.set_extension(SOURCE_EXTENSION);
    path
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn write_module(dir: &Path, relative: &str, source: &str) -> PathBuf {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create_dir_all failed");
        }
        std::fs::write(&path, source).expect("write failed");
        path
    }

    #[test]
    fn test_dotted_names_map_to_paths() {
        assert_eq!(module_relative_path("util"), PathBuf::from("util.vela"));
        assert_eq!(
            module_relative_path("pkg.mod"),
            PathBuf::from("pkg/mod.vela")
        );
    }

    #[test]
    fn test_entry_resolution_in_working_dir() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        let expected = write_module(dir.path(), "pkg/mod.vela", "print(1)");

        let loader = ModuleLoader::new(vec![dir.path().to_path_buf()]);
        let found = loader.resolve_entry("pkg.mod").expect("resolve failed");
        assert_eq!(found, expected);
    }

    #[test]
    fn test_importer_dir_takes_precedence() {
        let search = tempfile::tempdir().expect("tempdir failed");
        let importer = tempfile::tempdir().expect("tempdir failed");
        write_module(search.path(), "util.vela", "let origin = \"search\"");
        let local = write_module(importer.path(), "util.vela", "let origin = \"local\"");

        let loader = ModuleLoader::new(vec![search.path().to_path_buf()]);
        match loader.resolve("util", importer.path()).expect("resolve failed") {
            ResolvedModule::Source { path, source } => {
                assert_eq!(path, local);
                assert!(source.contains("local"));
            }
            ResolvedModule::Native(_) => panic!("expected a source module"),
        }
    }

    #[test]
    fn test_missing_module_lists_candidates() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        let loader = ModuleLoader::new(vec![dir.path().to_path_buf()]);
        let err = loader.resolve_entry("absent").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("cannot find module 'absent'"));
        assert!(message.contains("absent.vela"));
    }

    #[test]
    fn test_manifest_paths_are_searched() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        std::fs::write(
            dir.path().join("vela.toml"),
            "[modules]\npaths = [\"lib\"]\n",
        )
        .expect("write failed");
        let expected = write_module(dir.path(), "lib/extra.vela", "print(1)");

        let loader = ModuleLoader::from_dir(dir.path()).expect("from_dir failed");
        let found = loader.resolve_entry("extra").expect("resolve failed");
        assert_eq!(found, expected);
    }
}
