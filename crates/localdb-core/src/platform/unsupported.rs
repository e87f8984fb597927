//! Registry fallback for platforms without LocalDB.

use crate::config::RegistryView;
use crate::error::Result;
use crate::locator::VersionRegistry;
use std::path::PathBuf;
use tracing::debug;

/// Registry reader; there is no registry, so nothing is installed.
#[derive(Debug, Clone, Copy)]
pub struct SystemRegistry {
    view: RegistryView,
}

impl SystemRegistry {
    pub fn new(view: RegistryView) -> Self {
        Self { view }
    }
}

impl VersionRegistry for SystemRegistry {
    fn version_keys(&self) -> Result<Option<Vec<String>>> {
        debug!("No registry on this platform ({:?} view)", self.view);
        Ok(None)
    }

    fn instance_api_path(&self, _version_key: &str) -> Result<Option<PathBuf>> {
        Ok(None)
    }
}
