use std::fmt::Debug;
use std::path::PathBuf;

/// Storage abstraction for the backing document of a preference store.
pub trait Storage: Send + Sync + Debug {
    /// Read the named document. Returns `Ok(None)` when it does not exist.
    fn read(&self, name: &str) -> Result<Option<String>, std::io::Error>;

    /// Overwrite the named document with `data`.
    fn write(&self, name: &str, data: &str) -> Result<(), std::io::Error>;

    /// Full location of the named document, used for reporting.
    fn path(&self, name: &str) -> PathBuf;
}

pub mod native {
    use super::Storage;
    use std::io::Read;
    use std::path::{Path, PathBuf};

    /// Documents stored as files inside one directory.
    #[derive(Debug)]
    pub struct FileStorage {
        base_dir: PathBuf,
    }

    impl FileStorage {
        pub fn new(directory: impl AsRef<Path>) -> Self {
            Self {
                base_dir: directory.as_ref().to_path_buf(),
            }
        }

        pub fn base_dir(&self) -> &Path {
            &self.base_dir
        }
    }

    impl Storage for FileStorage {
        fn read(&self, name: &str) -> Result<Option<String>, std::io::Error> {
            let path = self.base_dir.join(name);

            let mut file = match std::fs::File::open(&path) {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
                Err(e) => return Err(e),
            };
            let mut contents = String::new();
            file.read_to_string(&mut contents)?;
            Ok(Some(contents))
        }

        fn write(&self, name: &str, data: &str) -> Result<(), std::io::Error> {
            let path = self.base_dir.join(name);

            // Ensure parent directory exists
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            // Overwritten in place. Concurrent writers race; last one wins.
            std::fs::write(&path, data)
        }

        fn path(&self, name: &str) -> PathBuf {
            self.base_dir.join(name)
        }
    }
}

/// Storage rooted at `directory` on the local file system.
pub fn create_storage(directory: impl AsRef<std::path::Path>) -> Box<dyn Storage> {
    Box::new(native::FileStorage::new(directory))
}
