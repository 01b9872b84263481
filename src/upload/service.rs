use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use log::{debug, info};

use crate::config::{ConfigError, IngestConfig};
use crate::reversible::ReversibleOperation;
use crate::upload::client::UploadTransport;
use crate::upload::error::{UploadError, UploadResult};
use crate::upload::id::{ContentId, ContentIdObfuscator, ExternalContentId};
use crate::upload::store::{ContentMetadataStore, MultipartObjectStore, PendingUploadStore};
use crate::upload::types::{
    CompleteRequest, ContentRecord, PartReceipt, PendingUploadRecord, MAX_PARTS,
};

/// Server side of the multipart upload protocol.
///
/// Every operation that touches more than one store registers an undo
/// action for each completed step, so a failure part way through leaves
/// the stores as they were before the call.
pub struct UploadService {
    objects: Arc<dyn MultipartObjectStore>,
    pending: Arc<dyn PendingUploadStore>,
    metadata: Arc<dyn ContentMetadataStore>,
    ids: Arc<dyn ContentIdObfuscator>,
    key_prefix: String,
}

impl UploadService {
    pub fn new<O, P, M, I>(objects: O, pending: P, metadata: M, ids: I) -> Self
    where
        O: MultipartObjectStore + 'static,
        P: PendingUploadStore + 'static,
        M: ContentMetadataStore + 'static,
        I: ContentIdObfuscator + 'static,
    {
        Self {
            objects: Arc::new(objects),
            pending: Arc::new(pending),
            metadata: Arc::new(metadata),
            ids: Arc::new(ids),
            key_prefix: "content/".to_string(),
        }
    }

    /// Build a service whose id key and object key prefix come from settings
    pub fn from_config<O, P, M>(
        config: &IngestConfig,
        objects: O,
        pending: P,
        metadata: M,
    ) -> Result<Self, ConfigError>
    where
        O: MultipartObjectStore + 'static,
        P: PendingUploadStore + 'static,
        M: ContentMetadataStore + 'static,
    {
        let ids = config.id_obfuscator()?;
        Ok(Self::new(objects, pending, metadata, ids).with_key_prefix(config.key_prefix.clone()))
    }

    /// Set the prefix of object storage keys
    pub fn with_key_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn storage_key(&self, id: ContentId) -> String {
        format!("{}{}", self.key_prefix, id)
    }

    /// Open a session: reserve a content id, start the storage upload and
    /// store the pending record. Returns the external id used as the
    /// session handle.
    pub async fn begin(&self, content_type: Option<&str>) -> UploadResult<ExternalContentId> {
        let content_type = content_type
            .map(str::trim)
            .filter(|ct| !ct.is_empty())
            .ok_or(UploadError::MissingContentType)?;

        let content_id = self.pending.allocate_id().await?;
        let storage_key = self.storage_key(content_id);
        let storage_upload_id = self.objects.create_multipart(&storage_key, content_type).await?;

        let started = {
            let objects = self.objects.clone();
            let key = storage_key.clone();
            let upload_id = storage_upload_id.clone();
            ReversibleOperation::new((), move || async move {
                objects.abort_multipart(&key, &upload_id).await
            })
        };

        let record = PendingUploadRecord {
            content_id,
            storage_key,
            storage_upload_id,
            content_type: content_type.to_string(),
            parts: Default::default(),
            created_at: Utc::now(),
        };
        if let Err(e) = self.pending.insert(record).await {
            return Err(started.unwind("begin", e).await);
        }
        started.confirm();

        let external = self.ids.obfuscate(content_id);
        info!("began upload {} ({})", external, content_type);
        Ok(external)
    }

    /// Store one part of an open session
    pub async fn upload_part(
        &self,
        id: ExternalContentId,
        part_number: u32,
        body: Bytes,
    ) -> UploadResult<PartReceipt> {
        if part_number == 0 || part_number > MAX_PARTS {
            return Err(UploadError::InvalidPartNumber { part_number });
        }

        let content_id = self.ids.reveal(id);
        let record = self
            .pending
            .get(content_id)
            .await?
            .ok_or_else(|| UploadError::no_such_session(id.to_string()))?;

        let size = body.len();
        let receipt = self
            .objects
            .upload_part(&record.storage_key, &record.storage_upload_id, part_number, body)
            .await?;
        self.pending.record_part(content_id, receipt.clone()).await?;

        debug!("upload {} part {} stored ({} bytes)", id, part_number, size);
        Ok(receipt)
    }

    /// Finalize the stored object and write its metadata row, consuming the
    /// pending record.
    ///
    /// Taking the pending record is the serialization point: of two
    /// concurrent calls for the same session, the second fails with
    /// `NoSuchSession`.
    pub async fn complete(
        &self,
        id: ExternalContentId,
        request: CompleteRequest,
    ) -> UploadResult<ExternalContentId> {
        request.details.validate()?;

        let content_id = self.ids.reveal(id);
        let snapshot = self
            .pending
            .get(content_id)
            .await?
            .ok_or_else(|| UploadError::no_such_session(id.to_string()))?;
        let parts = resolve_parts(&request.parts, &snapshot)?;

        let record = self
            .pending
            .take(content_id)
            .await?
            .ok_or_else(|| UploadError::no_such_session(id.to_string()))?;
        let taken = {
            let pending = self.pending.clone();
            let restored = record.clone();
            ReversibleOperation::new(record, move || async move { pending.insert(restored).await })
        };

        let storage_key = taken.value().storage_key.clone();
        let storage_upload_id = taken.value().storage_upload_id.clone();
        if let Err(e) = self
            .objects
            .complete_multipart(&storage_key, &storage_upload_id, &parts)
            .await
        {
            return Err(taken.unwind("finalize storage", e).await);
        }
        let finalized = {
            let objects = self.objects.clone();
            let key = storage_key.clone();
            ReversibleOperation::new((), move || async move { objects.delete_object(&key).await })
        };
        let committed = taken.combine(finalized);

        let row = ContentRecord {
            content_id,
            storage_key,
            content_type: committed.value().0.content_type.clone(),
            details: request.details,
            completed_at: Utc::now(),
        };
        if let Err(e) = self.metadata.insert(row).await {
            return Err(committed.unwind("insert metadata", e).await);
        }

        committed.confirm();
        info!("completed upload {} with {} part(s)", id, parts.len());
        Ok(id)
    }

    /// Drop an open session and discard the stored parts
    pub async fn abort(&self, id: ExternalContentId) -> UploadResult<()> {
        let content_id = self.ids.reveal(id);
        let record = self
            .pending
            .take(content_id)
            .await?
            .ok_or_else(|| UploadError::no_such_session(id.to_string()))?;

        let key = record.storage_key.clone();
        let upload_id = record.storage_upload_id.clone();
        let taken = {
            let pending = self.pending.clone();
            ReversibleOperation::new((), move || async move { pending.insert(record).await })
        };

        if let Err(e) = self.objects.abort_multipart(&key, &upload_id).await {
            return Err(taken.unwind("abort storage upload", e).await);
        }

        taken.confirm();
        info!("aborted upload {}", id);
        Ok(())
    }

    /// Metadata row of completed content
    pub async fn content(&self, id: ExternalContentId) -> UploadResult<Option<ContentRecord>> {
        self.metadata.get(self.ids.reveal(id)).await
    }
}

/// Pick the receipts to finalize with: the client's list when it sent one,
/// else the receipts recorded as parts arrived. Part numbers must run
/// 1..N without gaps or duplicates.
fn resolve_parts(
    client: &[PartReceipt],
    record: &PendingUploadRecord,
) -> UploadResult<Vec<PartReceipt>> {
    let mut parts: Vec<PartReceipt> = if client.is_empty() {
        record.receipts()
    } else {
        client
            .iter()
            .map(|receipt| match (&receipt.etag, record.parts.get(&receipt.part_number)) {
                (None, Some(recorded)) => recorded.clone(),
                _ => receipt.clone(),
            })
            .collect()
    };
    parts.sort_by_key(|p| p.part_number);

    if parts.is_empty() {
        return Err(UploadError::MissingPart { part_number: 1 });
    }

    for (index, part) in parts.iter().enumerate() {
        let expected = index as u32 + 1;
        if part.part_number < expected {
            return Err(UploadError::InvalidPartNumber {
                part_number: part.part_number,
            });
        }
        if part.part_number > expected {
            return Err(UploadError::MissingPart {
                part_number: expected,
            });
        }
    }

    Ok(parts)
}

#[async_trait]
impl UploadTransport for UploadService {
    async fn begin(&self, content_type: &str) -> UploadResult<ExternalContentId> {
        UploadService::begin(self, Some(content_type)).await
    }

    async fn upload_part(
        &self,
        id: ExternalContentId,
        part_number: u32,
        body: Bytes,
    ) -> UploadResult<PartReceipt> {
        UploadService::upload_part(self, id, part_number, body).await
    }

    async fn complete(
        &self,
        id: ExternalContentId,
        request: &CompleteRequest,
    ) -> UploadResult<ExternalContentId> {
        UploadService::complete(self, id, request.clone()).await
    }

    async fn abort(&self, id: ExternalContentId) -> UploadResult<()> {
        UploadService::abort(self, id).await
    }
}
