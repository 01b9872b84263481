use async_trait::async_trait;
use bytes::Bytes;

use crate::upload::error::UploadResult;
use crate::upload::id::ContentId;
use crate::upload::types::{ContentRecord, PartReceipt, PendingUploadRecord};

/// Object storage that assembles one object from numbered parts
#[async_trait]
pub trait MultipartObjectStore: Send + Sync {
    /// Start a multipart upload for `key`; returns the provider's upload id
    async fn create_multipart(&self, key: &str, content_type: &str) -> UploadResult<String>;

    /// Store one part
    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: u32,
        body: Bytes,
    ) -> UploadResult<PartReceipt>;

    /// Assemble the parts into the final object
    async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[PartReceipt],
    ) -> UploadResult<()>;

    /// Discard an unfinished upload and its parts
    async fn abort_multipart(&self, key: &str, upload_id: &str) -> UploadResult<()>;

    /// Delete a finished object
    async fn delete_object(&self, key: &str) -> UploadResult<()>;
}

/// Records of begun but not yet completed uploads
#[async_trait]
pub trait PendingUploadStore: Send + Sync {
    /// Reserve a fresh content id
    async fn allocate_id(&self) -> UploadResult<ContentId>;

    /// Fails with `SessionExists` if a record for the id is already present
    async fn insert(&self, record: PendingUploadRecord) -> UploadResult<()>;

    async fn get(&self, id: ContentId) -> UploadResult<Option<PendingUploadRecord>>;

    /// Remember the receipt of a part; fails with `NoSuchSession` if the
    /// record is gone
    async fn record_part(&self, id: ContentId, receipt: PartReceipt) -> UploadResult<()>;

    /// Remove and return the record. Only one caller can take a given
    /// record; every later caller gets `None`.
    async fn take(&self, id: ContentId) -> UploadResult<Option<PendingUploadRecord>>;
}

/// Metadata rows of completed content
#[async_trait]
pub trait ContentMetadataStore: Send + Sync {
    /// Written as the last step of `complete`
    async fn insert(&self, record: ContentRecord) -> UploadResult<()>;

    async fn get(&self, id: ContentId) -> UploadResult<Option<ContentRecord>>;
}
