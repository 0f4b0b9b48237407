use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncReadExt as _, AsyncSeekExt as _};
use url::Url;

use super::{
    Bucket, BucketInfo, ByteRange, Driver, Error, ObjectInfo, ObjectReader, Result, Storage,
    paginate, validate_key,
};

/// `file:///root/dir`: one directory per bucket, one file per object.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalDriver;

#[async_trait]
impl Driver for LocalDriver {
    async fn open(&self, dsn: &Url) -> Result<Arc<dyn Storage>> {
        let root = dsn
            .to_file_path()
            .map_err(|()| Error::InvalidDsn(dsn.to_string()))?;
        tokio::fs::create_dir_all(&root).await?;
        Ok(Arc::new(LocalStorage { root }))
    }
}

#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

fn not_found(err: std::io::Error, what: &str) -> Error {
    if err.kind() == std::io::ErrorKind::NotFound {
        Error::NotFound(what.to_string())
    } else {
        Error::Io(err)
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn list_buckets(&self, limit: usize) -> Result<Vec<BucketInfo>> {
        let mut names = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = dir.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(paginate(names, limit, 0)
            .into_iter()
            .map(|name| BucketInfo { name })
            .collect())
    }

    async fn create_bucket(&self, name: &str) -> Result<()> {
        validate_key(name)?;
        match tokio::fs::create_dir(self.root.join(name)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(Error::AlreadyExists(name.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn delete_bucket(&self, name: &str) -> Result<()> {
        validate_key(name)?;
        tokio::fs::remove_dir_all(self.root.join(name))
            .await
            .map_err(|e| not_found(e, name))
    }

    fn bucket(&self, name: &str) -> Arc<dyn Bucket> {
        Arc::new(LocalBucket {
            name: name.to_string(),
            root: self.root.clone(),
            dir: self.root.join(name),
        })
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

struct LocalBucket {
    name: String,
    root: PathBuf,
    dir: PathBuf,
}

impl LocalBucket {
    fn path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(key))
    }

    fn info(&self, key: &str, size: u64) -> ObjectInfo {
        ObjectInfo {
            bucket: self.name.clone(),
            key: key.to_string(),
            size,
            content_type: None,
        }
    }

    /// Every file below the bucket directory as `(key, size)`.
    async fn walk(&self) -> Result<Vec<(String, u64)>> {
        let mut out = Vec::new();
        let mut stack = vec![self.dir.clone()];
        while let Some(dir) = stack.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(v) => v,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let meta = entry.metadata().await?;
                let path = entry.path();
                if meta.is_dir() {
                    stack.push(path);
                } else if let Some(key) = key_for(&self.dir, &path) {
                    out.push((key, meta.len()));
                }
            }
        }
        Ok(out)
    }
}

fn key_for(dir: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(dir).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}

#[async_trait]
impl Bucket for LocalBucket {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&self, key: &str, body: Bytes, _content_type: &str) -> Result<ObjectInfo> {
        let path = self.path(key)?;
        ensure_parent(&path).await?;
        tokio::fs::write(&path, &body).await?;
        Ok(self.info(key, body.len() as u64))
    }

    async fn open(&self, key: &str, range: Option<ByteRange>) -> Result<ObjectReader> {
        let path = self.path(key)?;
        let mut file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| not_found(e, key))?;

        match range {
            Some(r) => {
                let size = file.metadata().await?.len();
                let (start, end) = r.clamp(size);
                file.seek(SeekFrom::Start(start)).await?;
                Ok(Box::new(file.take(end - start)))
            }
            None => Ok(Box::new(file)),
        }
    }

    async fn stat(&self, key: &str) -> Result<ObjectInfo> {
        let path = self.path(key)?;
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| not_found(e, key))?;
        if meta.is_dir() {
            return Err(Error::NotFound(key.to_string()));
        }
        Ok(self.info(key, meta.len()))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path(key)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| not_found(e, key))
    }

    async fn copy(&self, dst_key: &str, src_bucket: &str, src_key: &str) -> Result<ObjectInfo> {
        validate_key(src_bucket)?;
        validate_key(src_key)?;
        let src = self.root.join(src_bucket).join(src_key);
        let dst = self.path(dst_key)?;
        ensure_parent(&dst).await?;
        let size = tokio::fs::copy(&src, &dst)
            .await
            .map_err(|e| not_found(e, src_key))?;
        Ok(self.info(dst_key, size))
    }

    async fn list(&self, prefix: &str, limit: usize, offset: usize) -> Result<Vec<ObjectInfo>> {
        let mut matching: Vec<(String, u64)> = self
            .walk()
            .await?
            .into_iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .collect();
        matching.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(paginate(matching, limit, offset)
            .into_iter()
            .map(|(k, size)| self.info(&k, size))
            .collect())
    }
}
