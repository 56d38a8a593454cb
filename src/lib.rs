//! # json_prefs
//!
//! A small persistent key-value preferences store backed by a single JSON file.
//!
//! Nested defaults are flattened into dotted keys (`window.width`), the backing
//! file is read once when the store is opened, and the whole state is written
//! back synchronously on every mutation.
//!
//! **Note:** This library is NOT intended to store large quantities of data. All data is cached in memory,
//! and the entire file is rewritten on each save. There is no locking: two stores pointed at the same
//! file will overwrite each other's changes.
//!
//! **Error Handling:** Loading never fails because of the file. A missing or corrupt file means the
//! store starts from its defaults. Write failures are logged through `tracing`, passed to an optional
//! observer and kept in [`PreferenceStore::last_save_error`]; they do not turn `set` into an error.
//!
//! ## Example
//!
//! ```rust,no_run
//! use json_prefs::{PreferenceStore, StoreOptions};
//! use serde_json::json;
//!
//! let mut prefs = PreferenceStore::open(
//!     StoreOptions::new()
//!         .directory("/tmp/my-app")
//!         .defaults(json!({"theme": "dark", "window": {"width": 800, "height": 600}})),
//! )
//! .expect("directory given explicitly");
//!
//! assert_eq!(prefs.get("window.width"), Some(json!(800)));
//! prefs.set("window.width", 1024).unwrap();
//! assert_eq!(prefs.get("window"), Some(json!({"width": 1024, "height": 600})));
//! ```

pub mod error;
pub mod flatten;
pub mod location;
pub mod storage;
pub mod store;

pub use error::PrefsError;
pub use flatten::{flatten_object, unflatten_object, DEFAULT_SEPARATOR};
pub use location::{no_default_directory, platform_default_directory, DirectoryResolver};
pub use store::{
    parse_data_file, EditGuard, PreferenceStore, SaveErrorHandler, StoreOptions, DEFAULT_FILE_NAME,
};

// Re-exported so callers can build values without adding serde_json themselves.
pub use serde_json;
