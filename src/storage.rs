use crate::error::StorageError;
use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Key-value string persistence.
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Copies the stored value of `from` to `to` unchanged. A missing `from`
    /// is not an error.
    fn copy(&mut self, from: &str, to: &str) -> Result<(), StorageError> {
        match self.get(from)? {
            Some(raw) => self.set(to, &raw),
            None => Ok(()),
        }
    }
}

/// One JSON file per key inside `root`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let name: String = key
            .trim()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        if name.is_empty() {
            return Err(StorageError::EmptyKey);
        }
        Ok(self.root.join(format!("{name}.json")))
    }
}

impl Storage for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root).map_err(io_err(&self.root))?;
        let temp = path.with_extension("json.tmp");
        fs::write(&temp, value).map_err(io_err(&temp))?;
        fs::rename(&temp, &path).map_err(io_err(&path))?;
        Ok(())
    }

    // Byte copy, so content that is not valid UTF-8 survives too.
    fn copy(&mut self, from: &str, to: &str) -> Result<(), StorageError> {
        let source = self.path_for(from)?;
        let target = self.path_for(to)?;
        let temp = target.with_extension("json.tmp");
        match fs::copy(&source, &temp) {
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(StorageError::Io { path: temp, source: err }),
        }
        fs::rename(&temp, &target).map_err(io_err(&target))?;
        Ok(())
    }
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> StorageError {
    let path = path.to_path_buf();
    move |source| StorageError::Io { path, source }
}

#[cfg(test)]
pub(crate) mod memory {
    use super::Storage;
    use crate::error::StorageError;
    use std::{collections::HashMap, io, path::PathBuf};

    #[derive(Debug, Default)]
    pub struct MemoryStore {
        pub entries: HashMap<String, String>,
        pub fail_reads: bool,
        pub fail_writes: bool,
        pub writes: usize,
    }

    fn failure(key: &str) -> StorageError {
        StorageError::Io {
            path: PathBuf::from(key),
            source: io::Error::new(io::ErrorKind::Other, "quota exceeded"),
        }
    }

    impl Storage for MemoryStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            if self.fail_reads {
                return Err(failure(key));
            }
            Ok(self.entries.get(key).cloned())
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
            if self.fail_writes {
                return Err(failure(key));
            }
            self.writes += 1;
            self.entries.insert(key.to_string(), value.to_string());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("state"));
        assert_eq!(store.get("dokkan_checklist_v1").unwrap(), None);
    }

    #[test]
    fn set_then_get_round_trips_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path().join("state"));
        store.set("dokkan_checklist_v1", r#"{"a":{}}"#).unwrap();
        store.set("dokkan_checklist_v1", r#"{"b":{}}"#).unwrap();
        assert_eq!(
            store.get("dokkan_checklist_v1").unwrap().as_deref(),
            Some(r#"{"b":{}}"#)
        );
        let names: Vec<String> = fs::read_dir(store.root())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["dokkan_checklist_v1.json".to_string()]);
    }

    #[test]
    fn copy_keeps_raw_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path());
        let raw = [b'{', 0xff, 0xfe, b'}'];
        fs::write(store.path_for("live").unwrap(), raw).unwrap();
        store.copy("live", "live.corrupt").unwrap();
        assert_eq!(fs::read(store.path_for("live.corrupt").unwrap()).unwrap(), raw);
        assert!(store.get("live").is_err());
    }

    #[test]
    fn copy_of_missing_key_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path().join("state"));
        store.copy("absent", "absent.corrupt").unwrap();
        assert_eq!(store.get("absent.corrupt").unwrap(), None);
    }

    #[test]
    fn keys_are_sanitized() {
        let store = FileStore::new("/tmp/x");
        assert_eq!(
            store.path_for("../evil key").unwrap(),
            PathBuf::from("/tmp/x/.._evil_key.json")
        );
        assert!(matches!(store.path_for("  "), Err(StorageError::EmptyKey)));
    }
}
