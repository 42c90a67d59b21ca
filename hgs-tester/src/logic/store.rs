use hgs_game::ConfigStore;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Stores each configuration document as `<key>.json` in a directory.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ConfigStore for DirStore {
    type Error = std::io::Error;

    fn read(&self, key: &str) -> Result<Option<String>, Self::Error> {
        match fs::read_to_string(self.path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn write(&self, key: &str, contents: &str) -> Result<(), Self::Error> {
        fs::create_dir_all(&self.root)?;
        fs::write(self.path(key), contents)
    }

    fn remove(&self, key: &str) -> Result<(), Self::Error> {
        match fs::remove_file(self.path(key)) {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }
}

/// Store used when no state directory is configured; nothing is kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

impl ConfigStore for NullStore {
    type Error = std::convert::Infallible;

    fn read(&self, _key: &str) -> Result<Option<String>, Self::Error> {
        Ok(None)
    }

    fn write(&self, _key: &str, _contents: &str) -> Result<(), Self::Error> {
        Ok(())
    }

    fn remove(&self, _key: &str) -> Result<(), Self::Error> {
        Ok(())
    }
}
