//! Discovery of the LocalDB instance API library.
//!
//! The installer records each engine version as a subkey of
//! [`RegistryConfig::INSTALLED_VERSIONS_KEY`], each holding the path of that
//! version's instance API library. The locator lists those subkeys, keeps the
//! ones that parse as an [`EngineVersion`], picks one according to
//! [`VersionSelection`] and reads its library path.

use crate::config::{LocatorConfig, RegistryConfig, VersionSelection};
use crate::error::{LocalDbError, Result};
use crate::version::EngineVersion;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Read access to the installed-versions registry namespace.
pub trait VersionRegistry {
    /// Names of the subkeys under the installed-versions key, or `None` if the
    /// key itself does not exist.
    fn version_keys(&self) -> Result<Option<Vec<String>>>;

    /// The `InstanceAPIPath` value of one version subkey, or `None` if the
    /// subkey or value is missing.
    fn instance_api_path(&self, version_key: &str) -> Result<Option<PathBuf>>;
}

/// The outcome of a successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedLibrary {
    /// The registry subkey name of the selected version, recorded as the
    /// bound API version.
    pub api_version: String,
    pub version: EngineVersion,
    /// Library path; `None` when the version key has no path value, which the
    /// loader reports as a load failure.
    pub path: Option<PathBuf>,
}

/// Locate the instance API library through `registry`.
pub fn locate(registry: &dyn VersionRegistry, config: &LocatorConfig) -> Result<LocatedLibrary> {
    let keys = registry
        .version_keys()?
        .ok_or_else(|| LocalDbError::NotInstalled {
            reason: format!("registry key {} not found", RegistryConfig::INSTALLED_VERSIONS_KEY),
        })?;

    let (key, version) =
        select_version(&keys, config.selection).ok_or_else(|| LocalDbError::NotInstalled {
            reason: "no installed version key could be parsed".to_string(),
        })?;

    let path = registry.instance_api_path(key)?;
    match &path {
        Some(p) => info!("Using LocalDB {} instance API at {}", key, p.display()),
        None => warn!(
            "LocalDB {} has no {} value",
            key,
            RegistryConfig::INSTANCE_API_PATH_VALUE
        ),
    }

    Ok(LocatedLibrary {
        api_version: key.to_string(),
        version,
        path,
    })
}

/// Pick one version key out of `keys`.
///
/// Keys that do not parse as a dotted version are skipped. Among the rest the
/// keys are ordered ascending by version (stable for equal versions) and the
/// first or last is taken depending on `selection`.
pub fn select_version(keys: &[String], selection: VersionSelection) -> Option<(&str, EngineVersion)> {
    let mut parsed: Vec<(&str, EngineVersion)> = keys
        .iter()
        .filter_map(|key| match key.parse::<EngineVersion>() {
            Ok(version) => {
                debug!("Found installed LocalDB version key {}", key);
                Some((key.as_str(), version))
            }
            Err(e) => {
                warn!("Skipping registry key {:?}: {}", key, e);
                None
            }
        })
        .collect();

    parsed.sort_by(|a, b| a.1.cmp(&b.1));

    match selection {
        VersionSelection::Lowest => parsed.first().copied(),
        VersionSelection::Highest => parsed.last().copied(),
    }
}

/// An in-memory [`VersionRegistry`], for hosts that discover installations
/// some other way and for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    versions: Option<HashMap<String, Option<PathBuf>>>,
}

impl MemoryRegistry {
    /// A registry without the installed-versions key.
    pub fn absent() -> Self {
        Self { versions: None }
    }

    /// A registry with an empty installed-versions key.
    pub fn empty() -> Self {
        Self {
            versions: Some(HashMap::new()),
        }
    }

    /// Add a version subkey with an optional library path.
    pub fn with_version(mut self, key: impl Into<String>, path: Option<impl Into<PathBuf>>) -> Self {
        self.versions
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), path.map(Into::into));
        self
    }
}

impl VersionRegistry for MemoryRegistry {
    fn version_keys(&self) -> Result<Option<Vec<String>>> {
        Ok(self.versions.as_ref().map(|v| {
            let mut keys: Vec<String> = v.keys().cloned().collect();
            keys.sort();
            keys
        }))
    }

    fn instance_api_path(&self, version_key: &str) -> Result<Option<PathBuf>> {
        Ok(self
            .versions
            .as_ref()
            .and_then(|v| v.get(version_key).cloned())
            .flatten())
    }
}
