use crate::error::PrefsError;
use crate::flatten::{flatten_map, flatten_object, DEFAULT_SEPARATOR};
use crate::location::{platform_default_directory, DirectoryResolver};
use crate::storage::{create_storage, Storage};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// File name used when none is configured. The `.json` extension is appended.
pub const DEFAULT_FILE_NAME: &str = "prefs";

/// Callback invoked whenever a write triggered by a mutation fails.
pub type SaveErrorHandler = Box<dyn Fn(&PrefsError) + Send + Sync>;

/// Options for [`PreferenceStore::open`].
pub struct StoreOptions {
    directory: Option<PathBuf>,
    file_name: String,
    defaults: Value,
    separator: String,
    resolver: DirectoryResolver,
    storage: Option<Box<dyn Storage>>,
    on_save_error: Option<SaveErrorHandler>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            directory: None,
            file_name: DEFAULT_FILE_NAME.to_string(),
            defaults: Value::Object(Map::new()),
            separator: DEFAULT_SEPARATOR.to_string(),
            resolver: platform_default_directory,
            storage: None,
            on_save_error: None,
        }
    }
}

impl StoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory holding the preferences file. Skips the resolver when set.
    pub fn directory(mut self, directory: impl AsRef<Path>) -> Self {
        self.directory = Some(directory.as_ref().to_path_buf());
        self
    }

    /// Base name of the preferences file, without extension.
    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Baseline values, possibly nested. Anything but an object counts as `{}`.
    pub fn defaults(mut self, defaults: Value) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Strategy used to pick a directory when [`directory`](Self::directory) is not set.
    pub fn resolver(mut self, resolver: DirectoryResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Custom backend. Takes precedence over `directory` and the resolver.
    pub fn storage(mut self, storage: Box<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn on_save_error(mut self, handler: impl Fn(&PrefsError) + Send + Sync + 'static) -> Self {
        self.on_save_error = Some(Box::new(handler));
        self
    }
}

impl std::fmt::Debug for StoreOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreOptions")
            .field("directory", &self.directory)
            .field("file_name", &self.file_name)
            .field("defaults", &self.defaults)
            .field("separator", &self.separator)
            .field("storage", &self.storage)
            .finish_non_exhaustive()
    }
}

/// A persistent map from dotted keys to JSON values, mirrored to a single JSON file.
///
/// Every mutation rewrites the whole file before returning. Write failures never
/// propagate out of `set`, `delete` or `clear`; they are logged, handed to the
/// save-error observer and kept in [`last_save_error`](Self::last_save_error).
/// The in-memory state stays authoritative either way.
///
/// Mutations take `&mut self`. Wrap the store in a `Mutex` to share it between threads.
pub struct PreferenceStore {
    path: PathBuf,
    document: String,
    defaults: Value,
    separator: String,
    entries: Map<String, Value>,
    storage: Box<dyn Storage>,
    on_save_error: Option<SaveErrorHandler>,
    last_save_error: Option<PrefsError>,
    temp_dir: Option<tempfile::TempDir>,
}

impl PreferenceStore {
    /// Opens the store described by `options`, reading the backing file if present.
    ///
    /// A missing or unreadable file is not an error: the store starts from the
    /// defaults. Nothing is written until the first mutation. Fails only when no
    /// directory was given and the resolver cannot supply one.
    pub fn open(options: StoreOptions) -> Result<Self, PrefsError> {
        let StoreOptions {
            directory,
            file_name,
            defaults,
            separator,
            resolver,
            storage,
            on_save_error,
        } = options;

        let storage = match storage {
            Some(storage) => storage,
            None => {
                let directory = directory.or_else(resolver).ok_or(PrefsError::NoDirectory)?;
                create_storage(directory)
            }
        };
        let file_name = if file_name.is_empty() {
            DEFAULT_FILE_NAME.to_string()
        } else {
            file_name
        };
        let document = format!("{file_name}.json");
        let path = storage.path(&document);
        let defaults = match defaults {
            Value::Object(_) => defaults,
            _ => Value::Object(Map::new()),
        };

        let mut entries = flatten_object(&defaults, &separator);
        if let Some(loaded) = decode_document(storage.read(&document), &path) {
            entries.extend(flatten_map(loaded, &separator));
        }
        debug!(path = %path.display(), entries = entries.len(), "opened preferences");

        Ok(Self {
            path,
            document,
            defaults,
            separator,
            entries,
            storage,
            on_save_error,
            last_save_error: None,
            temp_dir: None,
        })
    }

    /// Opens a store inside a fresh temporary directory that lives as long as the store.
    pub fn open_testing(defaults: Value) -> Result<Self, PrefsError> {
        let temp_dir = tempfile::Builder::new()
            .prefix("json_prefs")
            .tempdir()
            .map_err(|source| PrefsError::Io {
                path: std::env::temp_dir(),
                source,
            })?;
        let mut store =
            Self::open(StoreOptions::new().directory(temp_dir.path()).defaults(defaults))?;
        store.temp_dir = Some(temp_dir);
        Ok(store)
    }

    /// Full path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The defaults given at construction, as supplied (not flattened).
    pub fn defaults(&self) -> &Value {
        &self.defaults
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// The most recent failure of a write triggered by a mutation or a dropped
    /// [`EditGuard`], cleared by the next successful write.
    ///
    /// A failing explicit [`save`](Self::save) returns its error to the caller
    /// instead and leaves this untouched.
    pub fn last_save_error(&self) -> Option<&PrefsError> {
        self.last_save_error.as_ref()
    }

    /// Number of entries. Same as [`len`](Self::len).
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A copy of every entry.
    pub fn get_all(&self) -> Map<String, Value> {
        self.entries.clone()
    }

    /// Looks up `key`.
    ///
    /// An exact match returns its value. Otherwise every entry under `key` followed
    /// by the separator is collected into an object keyed by the remaining suffix,
    /// so with `net.host` and `net.port` stored, `get("net")` returns
    /// `{"host": .., "port": ..}`. Returns `None` when nothing matches. An empty
    /// key returns the whole map.
    pub fn get(&self, key: &str) -> Option<Value> {
        if key.is_empty() {
            return Some(Value::Object(self.get_all()));
        }
        if let Some(value) = self.entries.get(key) {
            return Some(value.clone());
        }

        let prefix = format!("{key}{}", self.separator);
        let found: Map<String, Value> = self
            .entries
            .iter()
            .filter_map(|(k, v)| k.strip_prefix(&prefix).map(|rest| (rest.to_string(), v.clone())))
            .collect();
        (!found.is_empty()).then_some(Value::Object(found))
    }

    /// [`get`](Self::get), deserialized into `T`. Values of the wrong shape yield `None`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        match serde_json::from_value(value) {
            Ok(out) => Some(out),
            Err(e) => {
                debug!(key, error = %e, "preference has unexpected shape");
                None
            }
        }
    }

    /// Stores `value` under `key` and saves.
    ///
    /// Nested objects are flattened into dotted keys when written. `null` is a
    /// regular value; use [`delete`](Self::delete) to remove a key.
    pub fn set<V: Serialize>(&mut self, key: &str, value: V) -> Result<&mut Self, PrefsError> {
        // Checked before serializing so an empty key is reported even for unserializable values.
        validate_key(key)?;
        let value = serde_json::to_value(value)?;
        self.put(key, Some(value))
    }

    /// Like [`set`](Self::set) for values that may be absent. `None` is rejected
    /// with [`PrefsError::MissingValue`].
    pub fn put(&mut self, key: &str, value: Option<Value>) -> Result<&mut Self, PrefsError> {
        self.assign(key, value)?;
        Ok(self.persist())
    }

    /// Removes `key` (exact match only) and saves, even if it was absent.
    pub fn delete(&mut self, key: &str) -> &mut Self {
        self.entries.shift_remove(key);
        self.persist()
    }

    /// Removes every entry and saves.
    pub fn clear(&mut self) -> &mut Self {
        self.entries = Map::new();
        self.persist()
    }

    /// Whether `key` is stored exactly. No prefix matching.
    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn entries(&self) -> Vec<(String, Value)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.entries.values().cloned().collect()
    }

    /// Calls `f(value, key, index)` for each entry of a snapshot taken up front.
    pub fn for_each<F>(&self, mut f: F) -> &Self
    where
        F: FnMut(&Value, &str, usize),
    {
        for (index, (key, value)) in self.entries().iter().enumerate() {
            f(value, key.as_str(), index);
        }
        self
    }

    /// Returns an edit guard for batching changes, saved once on drop.
    pub fn edit(&mut self) -> EditGuard<'_> {
        EditGuard {
            store: self,
            modified: false,
        }
    }

    /// Flattens and writes the current state, returning any failure.
    ///
    /// Mutators call this for you and swallow its error; call it directly to
    /// check whether the file is in sync.
    pub fn save(&mut self) -> Result<(), PrefsError> {
        let entries = std::mem::take(&mut self.entries);
        self.entries = flatten_map(entries, &self.separator);

        let data = serde_json::to_string(&self.entries)?;
        self.storage
            .write(&self.document, &data)
            .map_err(|source| PrefsError::Io {
                path: self.path.clone(),
                source,
            })?;
        self.last_save_error = None;
        trace!(path = %self.path.display(), entries = self.entries.len(), "saved preferences");
        Ok(())
    }

    fn persist(&mut self) -> &mut Self {
        if let Err(err) = self.save() {
            warn!(path = %self.path.display(), error = %err, "failed to save preferences");
            if let Some(handler) = &self.on_save_error {
                handler(&err);
            }
            self.last_save_error = Some(err);
        }
        self
    }

    fn assign(&mut self, key: &str, value: Option<Value>) -> Result<(), PrefsError> {
        validate_key(key)?;
        let value = value.ok_or_else(|| PrefsError::MissingValue(key.to_string()))?;
        if value.is_object() {
            // Move to the end so the flattened branch wins over older dotted keys.
            self.entries.shift_remove(key);
        }
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

impl std::fmt::Debug for PreferenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferenceStore")
            .field("path", &self.path)
            .field("entries", &self.entries)
            .field("storage", &self.storage)
            .field("last_save_error", &self.last_save_error)
            .finish_non_exhaustive()
    }
}

/// Guard for batching changes to a [`PreferenceStore`], saved on drop if modified.
///
/// Nested objects set through the guard are flattened only when it is dropped.
/// Until then `get("net")` returns the object as set and `get("net.host")` is `None`.
pub struct EditGuard<'a> {
    store: &'a mut PreferenceStore,
    modified: bool,
}

impl<'a> EditGuard<'a> {
    /// Sets a value without saving.
    pub fn set<V: Serialize>(&mut self, key: &str, value: V) -> Result<&mut Self, PrefsError> {
        // Checked before serializing so an empty key is reported even for unserializable values.
        validate_key(key)?;
        let value = serde_json::to_value(value)?;
        self.put(key, Some(value))
    }

    pub fn put(&mut self, key: &str, value: Option<Value>) -> Result<&mut Self, PrefsError> {
        self.store.assign(key, value)?;
        self.modified = true;
        Ok(self)
    }

    pub fn delete(&mut self, key: &str) -> &mut Self {
        if self.store.entries.shift_remove(key).is_some() {
            self.modified = true;
        }
        self
    }

    pub fn clear(&mut self) -> &mut Self {
        if !self.store.entries.is_empty() {
            self.store.entries = Map::new();
            self.modified = true;
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.store.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.store.has(key)
    }
}

impl<'a> Drop for EditGuard<'a> {
    fn drop(&mut self) {
        if self.modified {
            self.store.persist();
        }
    }
}

/// Reads the JSON object at `path` and merges it over `defaults`.
///
/// The merge is shallow: top-level keys from the file win. On any read or parse
/// failure the result is a copy of `defaults`, or `{}` if `defaults` is not an object.
pub fn parse_data_file(path: impl AsRef<Path>, defaults: &Value) -> Map<String, Value> {
    let path = path.as_ref();
    let mut merged = match defaults {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    let read = match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    };
    if let Some(loaded) = decode_document(read, path) {
        merged.extend(loaded);
    }
    merged
}

fn decode_document(
    read: Result<Option<String>, std::io::Error>,
    path: &Path,
) -> Option<Map<String, Value>> {
    let contents = match read {
        Ok(Some(contents)) => contents,
        Ok(None) => {
            debug!(path = %path.display(), "no preferences file, using defaults");
            return None;
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read preferences, using defaults");
            return None;
        }
    };
    match serde_json::from_str(&contents) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => {
            warn!(path = %path.display(), "preferences file is not a JSON object, using defaults");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to parse preferences, using defaults");
            None
        }
    }
}

fn validate_key(key: &str) -> Result<(), PrefsError> {
    if key.is_empty() {
        Err(PrefsError::EmptyKey)
    } else {
        Ok(())
    }
}
