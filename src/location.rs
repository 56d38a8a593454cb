//! Default directory policy for stores opened without an explicit directory.

use std::path::PathBuf;

/// Strategy for finding the directory that holds the preferences file.
///
/// Injected through [`StoreOptions::resolver`](crate::StoreOptions::resolver) so
/// the store itself never inspects the environment.
pub type DirectoryResolver = fn() -> Option<PathBuf>;

/// Per-user application data on Windows, `~/Library/Preferences` on macOS,
/// `/var/local` everywhere else.
pub fn platform_default_directory() -> Option<PathBuf> {
    if cfg!(target_os = "windows") {
        directories::BaseDirs::new().map(|dirs| dirs.data_dir().to_path_buf())
    } else if cfg!(target_os = "macos") {
        directories::BaseDirs::new().map(|dirs| dirs.home_dir().join("Library/Preferences"))
    } else {
        Some(PathBuf::from("/var/local"))
    }
}

/// Resolver for callers that always pass a directory explicitly.
pub fn no_default_directory() -> Option<PathBuf> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_default_is_absolute() {
        if let Some(dir) = platform_default_directory() {
            assert!(dir.is_absolute(), "Path must be absolute: '{}'", dir.display());
        }
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    #[test]
    fn unix_default_is_var_local() {
        assert_eq!(platform_default_directory(), Some(PathBuf::from("/var/local")));
    }
}
