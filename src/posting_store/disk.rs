//! The disk-backed [`PostingStore`], implementing the file format in spec
//! §3/§6.3 byte-for-byte: a 4-byte header, a fixed bucket table using
//! quadratic-probe open addressing, and a bump-allocated node area.
//!
//! A single [`tokio::fs::File`] descriptor is cached per store (spec §5) and
//! guarded by a `tokio::sync::Mutex` so each logical operation — which may
//! need several seeks — runs as one uninterrupted critical section.

use std::convert::TryInto;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt, SeekFrom};
use tokio::sync::Mutex;

use crate::error::StoreError;

use super::{PayloadIter, PostingStore};

const HEADER_SIZE: u64 = 4;

struct Bucket {
    key: Vec<u8>,
    head: u32,
    tail: u32,
}

impl Bucket {
    fn vacant(&self) -> bool {
        self.head == 0
    }
}

enum Located {
    Present(usize, Bucket),
    Absent(usize),
}

struct Inner {
    file: Mutex<File>,
    path: PathBuf,
    key_size: usize,
    hash_rows: usize,
    node_payload_size: usize,
}

/// A disk-backed posting-store. Cheap to clone (an `Arc` around the shared
/// file handle and parameters), which is what lets [`DiskPostingStore::iter`]
/// hand out an iterator that owns its own reference to the store.
#[derive(Clone)]
pub struct DiskPostingStore(Arc<Inner>);

impl DiskPostingStore {
    /// Open (creating if missing) a posting-store file at `path` with the
    /// given `(key_size, hash_rows, node_size_payload)` parameters.
    ///
    /// Reopening an existing file does not re-validate these parameters
    /// against what created the file — spec §6.3's compatibility
    /// requirement is about producing identical bytes for identical
    /// parameters, not about runtime parameter negotiation.
    pub async fn open<P: AsRef<Path>>(
        path: P,
        key_size: usize,
        hash_rows: usize,
        node_size_payload: usize,
    ) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .await
            .map_err(|source| io_err(&path, source))?;

        let len = file
            .metadata()
            .await
            .map_err(|source| io_err(&path, source))?
            .len();

        let row_size = (key_size + 8) as u64;
        let bucket_area = row_size * hash_rows as u64;
        let initial_free = HEADER_SIZE + bucket_area;

        if len == 0 {
            let mut buf = Vec::with_capacity(initial_free as usize);
            buf.extend_from_slice(&(initial_free as u32).to_be_bytes());
            buf.resize(initial_free as usize, 0);
            file.seek(SeekFrom::Start(0))
                .await
                .map_err(|source| io_err(&path, source))?;
            file.write_all(&buf)
                .await
                .map_err(|source| io_err(&path, source))?;
            file.flush().await.map_err(|source| io_err(&path, source))?;
        }

        tracing::debug!(path = %path.display(), key_size, hash_rows, node_size_payload, "posting-store opened");

        Ok(DiskPostingStore(Arc::new(Inner {
            file: Mutex::new(file),
            path,
            key_size,
            hash_rows,
            node_payload_size: node_size_payload,
        })))
    }

    fn row_size(&self) -> u64 {
        (self.0.key_size + 8) as u64
    }

    fn node_size(&self) -> u64 {
        (self.0.node_payload_size + 4) as u64
    }

    fn bucket_offset(&self, idx: usize) -> u64 {
        HEADER_SIZE + idx as u64 * self.row_size()
    }

    fn pad_key(&self, key: &[u8]) -> Result<Vec<u8>, StoreError> {
        if key.len() > self.0.key_size {
            return Err(StoreError::KeyTooLong(key.to_vec()));
        }
        let mut padded = key.to_vec();
        padded.resize(self.0.key_size, 0);
        Ok(padded)
    }

    fn pad_payload(&self, payload: &[u8]) -> Result<Vec<u8>, StoreError> {
        if payload.len() > self.0.node_payload_size {
            return Err(StoreError::PayloadTooLarge {
                len: payload.len(),
                max: self.0.node_payload_size,
            });
        }
        let mut padded = payload.to_vec();
        padded.resize(self.0.node_payload_size, 0);
        Ok(padded)
    }

    async fn raw_read(&self, file: &mut File, offset: u64, len: usize) -> Result<Vec<u8>, StoreError> {
        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(|source| io_err(&self.0.path, source))?;
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf)
            .await
            .map_err(|source| io_err(&self.0.path, source))?;
        Ok(buf)
    }

    async fn raw_write(&self, file: &mut File, offset: u64, data: &[u8]) -> Result<(), StoreError> {
        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(|source| io_err(&self.0.path, source))?;
        file.write_all(data)
            .await
            .map_err(|source| io_err(&self.0.path, source))?;
        Ok(())
    }

    async fn read_header(&self, file: &mut File) -> Result<u32, StoreError> {
        let bytes = self.raw_read(file, 0, HEADER_SIZE as usize).await?;
        Ok(u32::from_be_bytes(bytes.try_into().unwrap()))
    }

    async fn write_header(&self, file: &mut File, free_ptr: u32) -> Result<(), StoreError> {
        self.raw_write(file, 0, &free_ptr.to_be_bytes()).await
    }

    async fn read_bucket(&self, file: &mut File, idx: usize) -> Result<Bucket, StoreError> {
        let bytes = self
            .raw_read(file, self.bucket_offset(idx), self.0.key_size + 8)
            .await?;
        let (key, rest) = bytes.split_at(self.0.key_size);
        let head = u32::from_be_bytes(rest[0..4].try_into().unwrap());
        let tail = u32::from_be_bytes(rest[4..8].try_into().unwrap());
        Ok(Bucket {
            key: key.to_vec(),
            head,
            tail,
        })
    }

    async fn write_bucket(&self, file: &mut File, idx: usize, bucket: &Bucket) -> Result<(), StoreError> {
        let mut buf = Vec::with_capacity(self.0.key_size + 8);
        buf.extend_from_slice(&bucket.key);
        buf.extend_from_slice(&bucket.head.to_be_bytes());
        buf.extend_from_slice(&bucket.tail.to_be_bytes());
        self.raw_write(file, self.bucket_offset(idx), &buf).await
    }

    async fn read_node(&self, file: &mut File, offset: u32) -> Result<(Vec<u8>, u32), StoreError> {
        let bytes = self
            .raw_read(file, offset as u64, self.0.node_payload_size + 4)
            .await?;
        let (payload, next) = bytes.split_at(self.0.node_payload_size);
        Ok((payload.to_vec(), u32::from_be_bytes(next.try_into().unwrap())))
    }

    async fn write_node(
        &self,
        file: &mut File,
        offset: u32,
        payload: &[u8],
        next: u32,
    ) -> Result<(), StoreError> {
        let mut buf = Vec::with_capacity(self.0.node_payload_size + 4);
        buf.extend_from_slice(payload);
        buf.extend_from_slice(&next.to_be_bytes());
        self.raw_write(file, offset as u64, &buf).await
    }

    async fn alloc_node(&self, file: &mut File, payload: &[u8], next: u32) -> Result<u32, StoreError> {
        let free_ptr = self.read_header(file).await?;
        self.write_node(file, free_ptr, payload, next).await?;
        let new_free = free_ptr
            .checked_add(self.node_size() as u32)
            .ok_or_else(|| StoreError::Corrupt("free pointer overflowed u32".to_string()))?;
        self.write_header(file, new_free).await?;
        Ok(free_ptr)
    }

    /// Quadratic-probe lookup (spec §4.1): `b = (h + c^2) mod hash_rows`.
    async fn locate(&self, file: &mut File, key: &[u8]) -> Result<Located, StoreError> {
        let padded = self.pad_key(key)?;
        let h = (crate::codec::fnv1a_32(key) as u64 % self.0.hash_rows as u64) as usize;
        for c in 0..self.0.hash_rows {
            let b = (h + c * c) % self.0.hash_rows;
            let bucket = self.read_bucket(file, b).await?;
            if bucket.vacant() {
                tracing::trace!(probes = c + 1, bucket = b, "posting-store slot found vacant");
                return Ok(Located::Absent(b));
            }
            if bucket.key == padded {
                tracing::trace!(probes = c + 1, bucket = b, "posting-store key located");
                return Ok(Located::Present(b, bucket));
            }
        }
        tracing::warn!(path = %self.0.path.display(), "posting-store bucket table full");
        Err(StoreError::BucketFull(key.to_vec()))
    }

    /// Collect a key's full payload list (used by `find_sorted_position`;
    /// posting lists are expected to be short enough that a linear disk
    /// walk is the right trade-off, matching spec §4.1's rationale).
    async fn collect(&self, file: &mut File, bucket: &Bucket) -> Result<Vec<Vec<u8>>, StoreError> {
        let mut out = Vec::new();
        let mut offset = bucket.head;
        while offset != 0 {
            let (payload, next) = self.read_node(file, offset).await?;
            out.push(payload);
            offset = next;
        }
        Ok(out)
    }
}

fn io_err(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl PostingStore for DiskPostingStore {
    async fn set(&self, key: &[u8], initial_payload: Option<&[u8]>) -> Result<(), StoreError> {
        let mut file = self.0.file.lock().await;
        let payload = self.pad_payload(initial_payload.unwrap_or(&[]))?;
        match self.locate(&mut file, key).await? {
            Located::Absent(idx) => {
                let offset = self.alloc_node(&mut file, &payload, 0).await?;
                let bucket = Bucket {
                    key: self.pad_key(key)?,
                    head: offset,
                    tail: offset,
                };
                self.write_bucket(&mut file, idx, &bucket).await?;
            }
            Located::Present(_, bucket) => {
                let (_, next) = self.read_node(&mut file, bucket.head).await?;
                self.write_node(&mut file, bucket.head, &payload, next).await?;
            }
        }
        Ok(())
    }

    async fn insert_at(&self, key: &[u8], i: usize, payload: &[u8]) -> Result<(), StoreError> {
        let mut file = self.0.file.lock().await;
        let (idx, bucket) = match self.locate(&mut file, key).await? {
            Located::Present(idx, bucket) => (idx, bucket),
            Located::Absent(_) => return Err(StoreError::KeyMissing(key.to_vec())),
        };
        let payload = self.pad_payload(payload)?;

        if i == 0 {
            let new_offset = self.alloc_node(&mut file, &payload, bucket.head).await?;
            let updated = Bucket {
                key: bucket.key,
                head: new_offset,
                tail: bucket.tail,
            };
            self.write_bucket(&mut file, idx, &updated).await?;
            return Ok(());
        }

        let mut prev_offset = bucket.head;
        for _ in 0..i - 1 {
            let (_, next) = self.read_node(&mut file, prev_offset).await?;
            if next == 0 {
                break;
            }
            prev_offset = next;
        }
        let (prev_payload, curr) = self.read_node(&mut file, prev_offset).await?;
        let new_offset = self.alloc_node(&mut file, &payload, curr).await?;
        self.write_node(&mut file, prev_offset, &prev_payload, new_offset)
            .await?;
        if curr == 0 {
            let updated = Bucket {
                key: bucket.key,
                head: bucket.head,
                tail: new_offset,
            };
            self.write_bucket(&mut file, idx, &updated).await?;
        }
        Ok(())
    }

    async fn append(&self, key: &[u8], payload: &[u8]) -> Result<(), StoreError> {
        let mut file = self.0.file.lock().await;
        let (idx, bucket) = match self.locate(&mut file, key).await? {
            Located::Present(idx, bucket) => (idx, bucket),
            Located::Absent(_) => return Err(StoreError::KeyMissing(key.to_vec())),
        };
        let payload = self.pad_payload(payload)?;
        let new_offset = self.alloc_node(&mut file, &payload, 0).await?;
        let (tail_payload, _) = self.read_node(&mut file, bucket.tail).await?;
        self.write_node(&mut file, bucket.tail, &tail_payload, new_offset)
            .await?;
        let updated = Bucket {
            key: bucket.key,
            head: bucket.head,
            tail: new_offset,
        };
        self.write_bucket(&mut file, idx, &updated).await?;
        Ok(())
    }

    async fn find_sorted_position(&self, key: &[u8], payload: &[u8]) -> Result<usize, StoreError> {
        let mut file = self.0.file.lock().await;
        match self.locate(&mut file, key).await? {
            Located::Absent(_) => Ok(0),
            Located::Present(_, bucket) => {
                let padded = self.pad_payload(payload)?;
                let list = self.collect(&mut file, &bucket).await?;
                Ok(super::sorted_position(
                    list.iter().map(|p| p.as_slice()),
                    &padded,
                ))
            }
        }
    }

    async fn contains_key(&self, key: &[u8]) -> Result<bool, StoreError> {
        let mut file = self.0.file.lock().await;
        Ok(matches!(self.locate(&mut file, key).await?, Located::Present(..)))
    }

    async fn get_one(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let mut file = self.0.file.lock().await;
        match self.locate(&mut file, key).await? {
            Located::Absent(_) => Ok(None),
            Located::Present(_, bucket) => {
                let (payload, _) = self.read_node(&mut file, bucket.head).await?;
                Ok(Some(payload))
            }
        }
    }

    async fn key_count(&self) -> Result<u64, StoreError> {
        let mut file = self.0.file.lock().await;
        let mut count = 0u64;
        for idx in 0..self.0.hash_rows {
            let bucket = self.read_bucket(&mut file, idx).await?;
            if !bucket.vacant() {
                count += 1;
            }
        }
        Ok(count)
    }

    fn iter(&self, key: &[u8]) -> Box<dyn PayloadIter> {
        Box::new(DiskPayloadIter {
            store: self.clone(),
            key: key.to_vec(),
            state: IterState::NotStarted,
        })
    }
}

enum IterState {
    NotStarted,
    At(u32),
    Done,
}

struct DiskPayloadIter {
    store: DiskPostingStore,
    key: Vec<u8>,
    state: IterState,
}

#[async_trait]
impl PayloadIter for DiskPayloadIter {
    async fn next(&mut self) -> Result<Option<Vec<u8>>, StoreError> {
        let mut file = self.store.0.file.lock().await;
        let offset = match self.state {
            IterState::Done => return Ok(None),
            IterState::At(offset) => offset,
            IterState::NotStarted => match self.store.locate(&mut file, &self.key).await? {
                Located::Absent(_) => {
                    self.state = IterState::Done;
                    return Ok(None);
                }
                Located::Present(_, bucket) => bucket.head,
            },
        };
        if offset == 0 {
            self.state = IterState::Done;
            return Ok(None);
        }
        let (payload, next) = self.store.read_node(&mut file, offset).await?;
        self.state = if next == 0 { IterState::Done } else { IterState::At(next) };
        Ok(Some(payload))
    }
}
