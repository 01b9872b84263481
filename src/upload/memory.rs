// In-memory stores for local runs and tests

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::sync::Mutex;

use crate::upload::error::{UploadError, UploadResult};
use crate::upload::id::ContentId;
use crate::upload::store::{ContentMetadataStore, MultipartObjectStore, PendingUploadStore};
use crate::upload::types::{ContentRecord, PartReceipt, PendingUploadRecord};

#[derive(Debug, Default)]
struct ObjectState {
    next_upload: u64,
    /// Unfinished uploads: upload id -> (key, parts)
    uploads: HashMap<String, (String, BTreeMap<u32, Bytes>)>,
    objects: HashMap<String, Bytes>,
}

/// Multipart object storage held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryObjectStore {
    state: Arc<Mutex<ObjectState>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn object(&self, key: &str) -> Option<Bytes> {
        self.state.lock().await.objects.get(key).cloned()
    }

    pub async fn object_count(&self) -> usize {
        self.state.lock().await.objects.len()
    }

    /// Number of uploads begun but neither completed nor aborted
    pub async fn open_uploads(&self) -> usize {
        self.state.lock().await.uploads.len()
    }

    /// Sizes of the parts received so far for an unfinished upload
    pub async fn part_sizes(&self, upload_id: &str) -> Option<Vec<(u32, usize)>> {
        let state = self.state.lock().await;
        let (_, parts) = state.uploads.get(upload_id)?;
        Some(parts.iter().map(|(n, body)| (*n, body.len())).collect())
    }
}

fn etag(upload_id: &str, part_number: u32, len: usize) -> String {
    format!("{upload_id}-{part_number}-{len}")
}

#[async_trait]
impl MultipartObjectStore for MemoryObjectStore {
    async fn create_multipart(&self, key: &str, _content_type: &str) -> UploadResult<String> {
        let mut state = self.state.lock().await;
        state.next_upload += 1;
        let upload_id = format!("mpu-{}", state.next_upload);
        state
            .uploads
            .insert(upload_id.clone(), (key.to_string(), BTreeMap::new()));
        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: u32,
        body: Bytes,
    ) -> UploadResult<PartReceipt> {
        let mut state = self.state.lock().await;
        let (upload_key, parts) = state
            .uploads
            .get_mut(upload_id)
            .ok_or_else(|| UploadError::invalid_state(format!("unknown multipart upload {upload_id}")))?;
        if upload_key.as_str() != key {
            return Err(UploadError::invalid_state(format!(
                "upload {upload_id} belongs to {upload_key}, not {key}"
            )));
        }

        let tag = etag(upload_id, part_number, body.len());
        parts.insert(part_number, body);
        Ok(PartReceipt::new(part_number, Some(tag)))
    }

    async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[PartReceipt],
    ) -> UploadResult<()> {
        let mut state = self.state.lock().await;
        let (_, stored) = state
            .uploads
            .get(upload_id)
            .ok_or_else(|| UploadError::invalid_state(format!("unknown multipart upload {upload_id}")))?;

        let mut object = BytesMut::new();
        for receipt in parts {
            let body = stored
                .get(&receipt.part_number)
                .ok_or(UploadError::MissingPart {
                    part_number: receipt.part_number,
                })?;
            if let Some(tag) = &receipt.etag {
                if *tag != etag(upload_id, receipt.part_number, body.len()) {
                    return Err(UploadError::invalid_state(format!(
                        "etag mismatch for part {}",
                        receipt.part_number
                    )));
                }
            }
            object.extend_from_slice(body);
        }

        state.uploads.remove(upload_id);
        state.objects.insert(key.to_string(), object.freeze());
        Ok(())
    }

    async fn abort_multipart(&self, _key: &str, upload_id: &str) -> UploadResult<()> {
        self.state.lock().await.uploads.remove(upload_id);
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> UploadResult<()> {
        self.state.lock().await.objects.remove(key);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct PendingState {
    last_id: u32,
    records: HashMap<ContentId, PendingUploadRecord>,
}

/// Pending upload records held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryPendingStore {
    state: Arc<Mutex<PendingState>>,
}

impl MemoryPendingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl PendingUploadStore for MemoryPendingStore {
    async fn allocate_id(&self) -> UploadResult<ContentId> {
        let mut state = self.state.lock().await;
        state.last_id = state
            .last_id
            .checked_add(1)
            .ok_or_else(|| UploadError::invalid_state("content ids exhausted"))?;
        Ok(ContentId(state.last_id))
    }

    async fn insert(&self, record: PendingUploadRecord) -> UploadResult<()> {
        let mut state = self.state.lock().await;
        if state.records.contains_key(&record.content_id) {
            return Err(UploadError::SessionExists {
                id: record.content_id.to_string(),
            });
        }
        state.records.insert(record.content_id, record);
        Ok(())
    }

    async fn get(&self, id: ContentId) -> UploadResult<Option<PendingUploadRecord>> {
        Ok(self.state.lock().await.records.get(&id).cloned())
    }

    async fn record_part(&self, id: ContentId, receipt: PartReceipt) -> UploadResult<()> {
        let mut state = self.state.lock().await;
        let record = state
            .records
            .get_mut(&id)
            .ok_or_else(|| UploadError::no_such_session(id.to_string()))?;
        record.parts.insert(receipt.part_number, receipt);
        Ok(())
    }

    async fn take(&self, id: ContentId) -> UploadResult<Option<PendingUploadRecord>> {
        Ok(self.state.lock().await.records.remove(&id))
    }
}

/// Content metadata rows held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryMetadataStore {
    rows: Arc<Mutex<HashMap<ContentId, ContentRecord>>>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ContentMetadataStore for MemoryMetadataStore {
    async fn insert(&self, record: ContentRecord) -> UploadResult<()> {
        self.rows.lock().await.insert(record.content_id, record);
        Ok(())
    }

    async fn get(&self, id: ContentId) -> UploadResult<Option<ContentRecord>> {
        Ok(self.rows.lock().await.get(&id).cloned())
    }
}
