//! Local file system key-value backend

use crate::storage::kv::KvStore;
use crate::utils::error::{BatchError, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

const ENTRY_EXTENSION: &str = ".entry";
const PREFIX_MARKER: &str = ".prefix";
const BUCKET_NAME_LEN: usize = 32;

/// Local file storage
///
/// Keys are grouped into buckets by their parent (everything before the
/// last `/`). A bucket is a directory named after a hash of the parent and
/// holds a `.prefix` marker with the parent itself. Each entry is a file
/// named after the sha256 of its key, so names stay fixed-length whatever
/// the key. The file starts with the hex-encoded key on its own line,
/// followed by the value.
///
/// Writes go to a temporary sibling, are synced, then renamed over the
/// target, so a crash leaves either the old value or the new one.
#[derive(Debug, Clone)]
pub struct FileKvStore {
    base_path: PathBuf,
}

fn digest(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Split a key into its parent and leaf at the last `/`
fn parent_of(key: &str) -> &str {
    key.rfind('/').map(|i| &key[..i]).unwrap_or("")
}

fn encode_entry(key: &str, value: &[u8]) -> Vec<u8> {
    let mut content = hex::encode(key.as_bytes()).into_bytes();
    content.push(b'\n');
    content.extend_from_slice(value);
    content
}

fn decode_entry(content: &[u8]) -> Option<(String, &[u8])> {
    let newline = content.iter().position(|b| *b == b'\n')?;
    let key = String::from_utf8(hex::decode(&content[..newline]).ok()?).ok()?;
    Some((key, &content[newline + 1..]))
}

/// Write `bytes` to `target` through a synced temporary file
async fn write_atomic(target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let temp = target.with_file_name(format!(
        ".{}.tmp-{:016x}",
        file_name,
        rand::random::<u64>()
    ));

    let write = async {
        let mut file = fs::File::create(&temp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&temp, target).await
    };

    let result = write.await;
    if result.is_err() {
        let _ = fs::remove_file(&temp).await;
    }
    result
}

impl FileKvStore {
    /// Create a new local storage instance
    pub async fn new(base_path: impl AsRef<Path>) -> Result<Self> {
        let path = base_path.as_ref().to_path_buf();

        fs::create_dir_all(&path).await.map_err(|e| {
            BatchError::storage(format!(
                "Failed to create storage directory {}: {}",
                path.display(),
                e
            ))
        })?;

        info!("Local file storage initialized at: {}", path.display());
        Ok(Self { base_path: path })
    }

    /// Storage root
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn bucket_dir(&self, parent: &str) -> PathBuf {
        self.base_path.join(&digest(parent)[..BUCKET_NAME_LEN])
    }

    /// Get file path for a given key
    fn entry_path(&self, key: &str) -> PathBuf {
        self.bucket_dir(parent_of(key))
            .join(format!("{}{}", digest(key), ENTRY_EXTENSION))
    }

    /// Create the bucket for `parent` and its marker if missing
    async fn ensure_bucket(&self, parent: &str) -> std::io::Result<()> {
        let dir = self.bucket_dir(parent);
        let marker = dir.join(PREFIX_MARKER);
        if fs::try_exists(&marker).await.unwrap_or(false) {
            return Ok(());
        }
        fs::create_dir_all(&dir).await?;
        write_atomic(&marker, parent.as_bytes()).await
    }

    /// Read only the key line of an entry file
    async fn read_entry_key(path: &Path) -> std::io::Result<Option<String>> {
        let file = fs::File::open(path).await?;
        let mut line = Vec::new();
        BufReader::new(file).read_until(b'\n', &mut line).await?;
        if line.last() != Some(&b'\n') {
            return Ok(None);
        }
        line.pop();
        Ok(hex::decode(&line)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok()))
    }

    /// Health check: the directory exists and is writable
    pub async fn health_check(&self) -> Result<()> {
        let test_file = self.base_path.join(".health_check");
        fs::write(&test_file, b"health_check")
            .await
            .map_err(|e| BatchError::storage(format!("Storage not writable: {}", e)))?;

        let _ = fs::remove_file(&test_file).await;
        Ok(())
    }
}

#[async_trait]
impl KvStore for FileKvStore {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let content = match fs::read(self.entry_path(key)).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(BatchError::storage(format!(
                    "Failed to read key '{}': {}",
                    key, e
                )));
            }
        };

        match decode_entry(&content) {
            Some((stored, value)) if stored == key => Ok(Some(value.to_vec())),
            _ => Err(BatchError::storage(format!(
                "Entry file for key '{}' is corrupt",
                key
            ))),
        }
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let write = async {
            self.ensure_bucket(parent_of(key)).await?;
            write_atomic(&self.entry_path(key), &encode_entry(key, &value)).await
        };

        write.await.map_err(|e| {
            BatchError::storage(format!("Failed to write key '{}': {}", key, e))
        })?;

        debug!(key = %key, bytes = value.len(), "Stored entry");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.entry_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BatchError::storage(format!(
                "Failed to delete key '{}': {}",
                key, e
            ))),
        }
    }

    async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let list_err = |e: std::io::Error| BatchError::storage(format!("Failed to list keys: {}", e));
        let mut keys = Vec::new();
        let mut buckets = fs::read_dir(&self.base_path).await.map_err(list_err)?;

        while let Some(bucket) = buckets.next_entry().await.map_err(list_err)? {
            if !bucket.file_type().await.map_err(list_err)?.is_dir() {
                continue;
            }

            // Directories without a marker were not created by this store
            let parent = match fs::read(bucket.path().join(PREFIX_MARKER)).await {
                Ok(bytes) => match String::from_utf8(bytes) {
                    Ok(parent) => parent,
                    Err(_) => continue,
                },
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(list_err(e)),
            };

            let base = if parent.is_empty() {
                String::new()
            } else {
                format!("{}/", parent)
            };
            let whole_bucket = base.starts_with(prefix);
            if !whole_bucket && !prefix.starts_with(&base) {
                continue;
            }

            let mut entries = fs::read_dir(bucket.path()).await.map_err(list_err)?;
            while let Some(entry) = entries.next_entry().await.map_err(list_err)? {
                let file_name = entry.file_name().to_string_lossy().to_string();
                // Skips the marker and temp files
                if file_name.starts_with('.') || !file_name.ends_with(ENTRY_EXTENSION) {
                    continue;
                }

                let key = match Self::read_entry_key(&entry.path()).await {
                    Ok(Some(key)) => key,
                    Ok(None) => continue,
                    // Removed between listing and reading
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                    Err(e) => return Err(list_err(e)),
                };
                if whole_bucket || key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}
