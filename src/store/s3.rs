//! S3-compatible store through opendal, driven from synchronous code by a
//! private current-thread runtime.

use super::credentials::Credentials;
use super::{ObjectMeta, ObjectStore, StoreError};
use crate::config::ObjectStoreTarget;
use crate::util::atomic;
use futures::TryStreamExt;
use opendal::layers::TimeoutLayer;
use opendal::services::S3;
use opendal::{ErrorKind, Metakey, Operator};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::debug;

const DEFAULT_REGION: &str = "us-east-1";
const OP_TIMEOUT_SECS: u64 = 60;
const IO_TIMEOUT_SECS: u64 = 300;
const DOWNLOAD_CHUNK: u64 = 8 * 1024 * 1024;

pub struct S3Store {
    operator: Operator,
    runtime: Runtime,
    name: String,
}

impl S3Store {
    pub fn new(target: &ObjectStoreTarget, credentials: &Credentials) -> Result<Self, StoreError> {
        let region = target.region.as_deref().unwrap_or(DEFAULT_REGION);

        let mut builder = S3::default()
            .bucket(&target.bucket)
            .region(region)
            .access_key_id(&credentials.access_key_id)
            .secret_access_key(&credentials.secret_access_key);

        if let Some(token) = &credentials.session_token {
            builder = builder.session_token(token);
        }
        if let Some(endpoint) = &target.endpoint {
            builder = builder.endpoint(endpoint);
        }

        let operator = Operator::new(builder)?
            .layer(
                TimeoutLayer::default()
                    .with_timeout(Duration::from_secs(OP_TIMEOUT_SECS))
                    .with_io_timeout(Duration::from_secs(IO_TIMEOUT_SECS)),
            )
            .finish();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        Ok(Self {
            operator,
            runtime,
            name: format!("s3://{}/{}", target.bucket, target.key_prefix),
        })
    }

    fn to_meta(key: &str, meta: &opendal::Metadata) -> ObjectMeta {
        ObjectMeta {
            key: key.to_string(),
            size: meta.content_length(),
            etag: meta.etag().map(str::to_string),
        }
    }
}

impl ObjectStore for S3Store {
    fn head(&self, key: &str) -> Result<Option<ObjectMeta>, StoreError> {
        self.runtime.block_on(async {
            match self.operator.stat(key).await {
                Ok(meta) => Ok(Some(Self::to_meta(key, &meta))),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(StoreError::from(e)),
            }
        })
    }

    fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, StoreError> {
        self.runtime.block_on(async {
            let mut objects = Vec::new();
            let mut lister = match self
                .operator
                .lister_with(prefix)
                .recursive(true)
                .metakey(Metakey::ContentLength | Metakey::Etag | Metakey::Mode)
                .await
            {
                Ok(lister) => lister,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(objects),
                Err(e) => return Err(StoreError::from(e)),
            };

            while let Some(entry) = lister.try_next().await? {
                let key = entry.path().trim_start_matches('/');
                if key.is_empty() || key.ends_with('/') || entry.metadata().is_dir() {
                    continue;
                }
                objects.push(Self::to_meta(key, entry.metadata()));
            }
            Ok::<_, StoreError>(objects)
        })
    }

    fn put(&self, key: &str, source: &Path) -> Result<(), StoreError> {
        let data = std::fs::read(source)?;
        debug!("PUT {} ({} bytes)", key, data.len());
        self.runtime.block_on(async {
            self.operator.write(key, data).await?;
            Ok::<_, StoreError>(())
        })
    }

    fn put_multipart(&self, key: &str, source: &Path, part_size: u64) -> Result<(), StoreError> {
        let part_size = usize::try_from(part_size).unwrap_or(usize::MAX);
        let mut file = File::open(source)?;
        debug!("Multipart PUT {} in parts of {} bytes", key, part_size);

        self.runtime.block_on(async {
            let mut writer = self.operator.writer_with(key).chunk(part_size).await?;
            let mut buffer = vec![0u8; part_size];

            let outcome: Result<(), StoreError> = async {
                loop {
                    let filled = read_full(&mut file, &mut buffer)?;
                    if filled == 0 {
                        break;
                    }
                    writer.write(buffer[..filled].to_vec()).await?;
                }
                writer.close().await?;
                Ok(())
            }
            .await;

            if outcome.is_err() {
                let _ = writer.abort().await;
            }
            outcome
        })
    }

    fn get(&self, key: &str, dest: &Path) -> Result<u64, StoreError> {
        let size = self
            .head(key)?
            .map(|m| m.size)
            .ok_or_else(|| {
                StoreError::Remote(opendal::Error::new(ErrorKind::NotFound, key.to_string()))
            })?;

        let mut offset = 0u64;
        let written = atomic::write_chunks(dest, || {
            if offset >= size {
                return Ok(None);
            }
            let start = offset;
            let end = (start + DOWNLOAD_CHUNK).min(size);
            let chunk = self
                .runtime
                .block_on(async { self.operator.read_with(key).range(start..end).await })
                .map_err(std::io::Error::other)?;
            offset = end;
            Ok(Some(chunk.to_vec()))
        })?;
        Ok(written)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.runtime.block_on(async {
            self.operator.delete(key).await?;
            Ok::<_, StoreError>(())
        })
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

/// Fills `buffer` as far as the reader allows. Returns the number of bytes
/// read, short only at end of file.
fn read_full(reader: &mut impl Read, buffer: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        let n = reader.read(&mut buffer[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
