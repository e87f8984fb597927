//! Centralized configuration for the LocalDB binding.
//!
//! This module provides the registry locations, fixed buffer capacities and
//! the runtime options that steer library discovery.

/// Registry locations written by the LocalDB installer.
pub struct RegistryConfig;

impl RegistryConfig {
    /// Per-machine key holding one subkey per installed engine version.
    pub const INSTALLED_VERSIONS_KEY: &'static str =
        r"SOFTWARE\Microsoft\Microsoft SQL Server Local DB\Installed Versions";
    /// Value under each version subkey naming the instance API library.
    pub const INSTANCE_API_PATH_VALUE: &'static str = "InstanceAPIPath";
}

/// Fixed capacities (UTF-16 code units, terminator included) of the native
/// text buffers.
pub struct LocalDbLimits;

impl LocalDbLimits {
    /// Instance names (`MAX_LOCALDB_INSTANCE_NAME_LENGTH + 1`).
    pub const MAX_NAME: usize = 129;
    /// Connection strings and paths (`LOCALDB_MAX_SQLCONNECTION_BUFFER_SIZE`).
    pub const MAX_PATH: usize = 260;
    /// Textual owner SIDs (`MAX_STRING_SID_LENGTH + 1`).
    pub const MAX_SID: usize = 187;
    /// Engine version names (`MAX_LOCALDB_VERSION_LENGTH + 1`).
    pub const MAX_VERSION: usize = 44;
}

/// How the locator picks one of several installed engine versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionSelection {
    /// First entry under ascending version order, i.e. the lowest installed
    /// version. This is the historical behavior of the binding.
    #[default]
    Lowest,
    /// Last entry under ascending version order.
    Highest,
}

/// Which registry view the locator reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryView {
    /// The view native to the process.
    Default,
    /// The 32-bit (WOW64) view.
    Registry32,
}

impl RegistryView {
    /// The view the binding has always used.
    ///
    /// The 32-bit view is requested only when the OS architecture is x64 and
    /// x86 at the same time, which never holds, so this is always
    /// [`RegistryView::Default`].
    pub fn historical() -> Self {
        let arch = std::env::consts::ARCH;
        let is_wow64_process = arch == "x86_64" && arch == "x86";
        if is_wow64_process {
            RegistryView::Registry32
        } else {
            RegistryView::Default
        }
    }
}

/// Options for locating the instance API library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatorConfig {
    pub selection: VersionSelection,
    pub view: RegistryView,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            selection: VersionSelection::default(),
            view: RegistryView::historical(),
        }
    }
}
