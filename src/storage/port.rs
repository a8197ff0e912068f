use std::{
    cell::{Cell, RefCell},
    future::Future,
    io::ErrorKind,
    ops::Deref,
    path::{Path, PathBuf},
};

use fs4::tokio::AsyncFileExt;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::ser::PrettyFormatter;
use tokio::fs::File;
use tracing::{debug, instrument, trace};

use crate::error::{Result, TrckrError};

/// Interface for reading and writing a whole document. There is no partial update, a write
/// replaces everything.
pub trait DocumentPort {
    /// Reads the document. A document that doesn't exist yet is `default`, not an error.
    fn read<T: DeserializeOwned>(&self, default: T) -> impl Future<Output = Result<T>>;

    /// Overwrites the document.
    fn write<T: Serialize>(&self, document: &T) -> impl Future<Output = Result<()>>;
}

impl<T: Deref> DocumentPort for T
where
    T::Target: DocumentPort,
{
    fn read<D: DeserializeOwned>(&self, default: D) -> impl Future<Output = Result<D>> {
        self.deref().read(default)
    }

    fn write<D: Serialize>(&self, document: &D) -> impl Future<Output = Result<()>> {
        self.deref().write(document)
    }
}

/// Serializes a document the same way every time: sorted keys, 4 space indentation.
pub fn to_canonical_json<T: Serialize>(document: &T) -> serde_json::Result<Vec<u8>> {
    // Without `preserve_order` serde_json keeps object keys in a BTreeMap, so going through
    // a Value sorts them.
    let value = serde_json::to_value(document)?;
    let mut buffer = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut serializer)?;
    Ok(buffer)
}

/// The main realization of [DocumentPort], a JSON file on disk.
pub struct JsonFile {
    path: PathBuf,
    // Held for the lifetime of the port, dropping the handle releases the lock.
    _lock: Option<File>,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _lock: None,
        }
    }

    /// Same as [JsonFile::new], but waits for an exclusive advisory lock on `<path>.lock` first.
    /// Only other trckr processes that also ask for the lock are kept out.
    #[instrument(skip_all, fields(path = ?path.as_ref()))]
    pub async fn with_advisory_lock(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let lock_path = lock_path_for(&path);
        create_parent_dir(&lock_path).await?;

        let lock = File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .await
            .map_err(|e| TrckrError::io(&lock_path, e))?;
        lock.lock_exclusive()
            .map_err(|e| TrckrError::io(&lock_path, e))?;
        debug!("Acquired {lock_path:?}");

        Ok(Self {
            path,
            _lock: Some(lock),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentPort for JsonFile {
    async fn read<T: DeserializeOwned>(&self, default: T) -> Result<T> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{:?} doesn't exist, using default", self.path);
                return Ok(default);
            }
            Err(e) => return Err(TrckrError::io(&self.path, e)),
        };
        trace!("Read {} bytes from {:?}", bytes.len(), self.path);

        serde_json::from_slice(&bytes).map_err(|source| TrckrError::Document {
            path: self.path.clone(),
            source,
        })
    }

    async fn write<T: Serialize>(&self, document: &T) -> Result<()> {
        let buffer = to_canonical_json(document).map_err(|source| TrckrError::Document {
            path: self.path.clone(),
            source,
        })?;
        create_parent_dir(&self.path).await?;
        tokio::fs::write(&self.path, &buffer)
            .await
            .map_err(|e| TrckrError::io(&self.path, e))?;
        trace!("Wrote {} bytes to {:?}", buffer.len(), self.path);
        Ok(())
    }
}

fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

async fn create_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| TrckrError::io(parent, e)),
        _ => Ok(()),
    }
}

/// Keeps the document in memory, in the same canonical form [JsonFile] writes. Writes can be made
/// to fail on purpose.
#[derive(Default)]
pub struct MemoryDocument {
    contents: RefCell<Option<Vec<u8>>>,
    failing: Cell<bool>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(contents: impl Into<Vec<u8>>) -> Self {
        Self {
            contents: RefCell::new(Some(contents.into())),
            failing: Cell::new(false),
        }
    }

    pub fn contents(&self) -> Option<Vec<u8>> {
        self.contents.borrow().clone()
    }

    /// Makes every following write fail with an IO error until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }
}

impl DocumentPort for MemoryDocument {
    async fn read<T: DeserializeOwned>(&self, default: T) -> Result<T> {
        match self.contents.borrow().as_deref() {
            Some(bytes) => {
                serde_json::from_slice(bytes).map_err(|source| TrckrError::Document {
                    path: PathBuf::from("<memory>"),
                    source,
                })
            }
            None => Ok(default),
        }
    }

    async fn write<T: Serialize>(&self, document: &T) -> Result<()> {
        if self.failing.get() {
            return Err(TrckrError::io(
                "<memory>",
                std::io::Error::other("writes are switched off"),
            ));
        }
        let buffer = to_canonical_json(document).map_err(|source| TrckrError::Document {
            path: PathBuf::from("<memory>"),
            source,
        })?;
        *self.contents.borrow_mut() = Some(buffer);
        Ok(())
    }
}
