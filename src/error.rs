use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by [`PreferenceStore`](crate::PreferenceStore).
///
/// Only argument errors and directory resolution reach the caller of a regular
/// operation. I/O failures during a mutation are reported through the save-error
/// observer and [`last_save_error`](crate::PreferenceStore::last_save_error).
#[derive(Debug, Error)]
pub enum PrefsError {
    /// Keys must be non-empty strings.
    #[error("expected `key` to be a non-empty string")]
    EmptyKey,

    /// A value was absent. Removing a key is what `delete` is for.
    #[error("missing value for `{0}`: use the `delete()` method to clear values")]
    MissingValue(String),

    /// The value could not be represented as JSON.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Reading or writing the backing file failed.
    #[error("storage error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No directory was given and none could be resolved for this platform.
    #[error("could not resolve a default preferences directory")]
    NoDirectory,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_value_points_at_delete() {
        let msg = PrefsError::MissingValue("theme".into()).to_string();
        assert!(msg.contains("theme"));
        assert!(msg.contains("delete()"));
    }

    #[test]
    fn io_error_display_includes_path() {
        let err = PrefsError::Io {
            path: PathBuf::from("/nowhere/prefs.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test error"),
        };
        let display = err.to_string();
        assert!(display.contains("storage error"));
        assert!(display.contains("/nowhere/prefs.json"));
        assert!(display.contains("test error"));
    }
}
