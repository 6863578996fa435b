//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::schema::EdgeConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::manifest::{ManifestError, ManifestSet};

const BUILD_MANIFEST: &str = "manifest.json";
const PRERENDER_MANIFEST: &str = "prerender-manifest.json";
const ROUTES_MANIFEST: &str = "routes-manifest.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Routes(#[from] ManifestError),

    #[error("validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<EdgeConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: EdgeConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load the build manifests from `dir`.
///
/// `manifest.json` is required; the prerender and routes manifests default
/// to empty when absent.
pub fn load_manifests(dir: &Path) -> Result<ManifestSet, ConfigError> {
    let build = read_json(&dir.join(BUILD_MANIFEST))?;
    let prerender = read_optional_json(&dir.join(PRERENDER_MANIFEST))?.unwrap_or_default();
    let routes = read_optional_json(&dir.join(ROUTES_MANIFEST))?.unwrap_or_default();

    Ok(ManifestSet::new(build, prerender, routes)?)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Manifest {
        path: path.to_path_buf(),
        source,
    })
}

fn read_optional_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, ConfigError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "Optional manifest absent, using defaults");
        return Ok(None);
    }
    read_json(path).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edge.toml");
        fs::write(&path, "[listener]\nbind_address = \"nope\"\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
        assert!(err.to_string().contains("listener.bind_address"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_manifests_with_optional_files_absent() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(BUILD_MANIFEST),
            r#"{ "buildId": "abc", "pages": { "ssr": { "nonDynamic": { "/": "pages/index.js" } } } }"#,
        )
        .unwrap();

        let set = load_manifests(dir.path()).unwrap();
        assert_eq!(set.build.build_id, "abc");
        assert_eq!(set.base_path(), "");
        assert!(set.routes.i18n.is_none());
    }

    #[test]
    fn test_load_manifests_reports_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(BUILD_MANIFEST), "{ not json").unwrap();

        let err = load_manifests(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Manifest { .. }));
    }
}
