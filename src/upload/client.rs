use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::upload::error::{UploadError, UploadResult};
use crate::upload::id::ExternalContentId;
use crate::upload::types::{
    fit_part_size, plan_parts, CompleteRequest, ContentDetails, PartReceipt, UploadState,
    DEFAULT_PART_SIZE,
};

/// The four calls of the upload protocol, however they reach the server
#[async_trait]
pub trait UploadTransport: Send + Sync {
    async fn begin(&self, content_type: &str) -> UploadResult<ExternalContentId>;

    async fn upload_part(
        &self,
        id: ExternalContentId,
        part_number: u32,
        body: Bytes,
    ) -> UploadResult<PartReceipt>;

    async fn complete(
        &self,
        id: ExternalContentId,
        request: &CompleteRequest,
    ) -> UploadResult<ExternalContentId>;

    async fn abort(&self, id: ExternalContentId) -> UploadResult<()>;
}

/// Client view of one session. Parts are numbered from 1 in the order
/// they are sent, and each must be acknowledged before the next is sent.
pub struct PendingUpload<'t> {
    transport: &'t dyn UploadTransport,
    id: ExternalContentId,
    state: UploadState,
    receipts: Vec<PartReceipt>,
}

impl<'t> PendingUpload<'t> {
    pub async fn begin(transport: &'t dyn UploadTransport, content_type: &str) -> UploadResult<Self> {
        let id = transport.begin(content_type).await?;
        Ok(Self {
            transport,
            id,
            state: UploadState::Begun,
            receipts: Vec::new(),
        })
    }

    pub fn id(&self) -> ExternalContentId {
        self.id
    }

    pub fn state(&self) -> UploadState {
        self.state
    }

    pub fn receipts(&self) -> &[PartReceipt] {
        &self.receipts
    }

    pub fn next_part_number(&self) -> u32 {
        self.receipts.len() as u32 + 1
    }

    /// Send the next part and keep its receipt
    pub async fn upload_part(&mut self, body: Bytes) -> UploadResult<&PartReceipt> {
        if self.state.is_terminal() {
            return Err(UploadError::invalid_state(format!(
                "upload {} is already {:?}",
                self.id, self.state
            )));
        }

        let part_number = self.next_part_number();
        self.state = UploadState::PartsUploading;
        let mut receipt = self.transport.upload_part(self.id, part_number, body).await?;
        // Transports that return no body still acknowledge the part number
        receipt.part_number = part_number;

        self.receipts.push(receipt);
        Ok(&self.receipts[self.receipts.len() - 1])
    }

    /// Finalize with every receipt collected so far
    pub async fn complete(&mut self, details: ContentDetails) -> UploadResult<ExternalContentId> {
        if self.state != UploadState::PartsUploading {
            return Err(UploadError::invalid_state(format!(
                "cannot complete upload {} in state {:?}",
                self.id, self.state
            )));
        }

        let request = CompleteRequest {
            details,
            parts: self.receipts.clone(),
        };
        let id = self.transport.complete(self.id, &request).await?;
        self.state = UploadState::Completed;
        Ok(id)
    }

    pub async fn abort(&mut self) -> UploadResult<()> {
        if self.state.is_terminal() {
            return Ok(());
        }
        self.transport.abort(self.id).await?;
        self.state = UploadState::Aborted;
        Ok(())
    }
}

/// Uploads whole files by slicing them into fixed-size parts
pub struct MultipartUploader {
    transport: Arc<dyn UploadTransport>,
    part_size: u64,
}

impl MultipartUploader {
    pub fn new<T: UploadTransport + 'static>(transport: T) -> Self {
        Self::from_arc(Arc::new(transport))
    }

    pub fn from_arc(transport: Arc<dyn UploadTransport>) -> Self {
        Self {
            transport,
            part_size: DEFAULT_PART_SIZE,
        }
    }

    /// Set the part size; zero is ignored
    pub fn with_part_size(mut self, bytes: u64) -> Self {
        if bytes > 0 {
            self.part_size = bytes;
        }
        self
    }

    pub fn part_size(&self) -> u64 {
        self.part_size
    }

    /// Upload `content` and complete it with `details`.
    ///
    /// `progress` receives the number of bytes handed to the transport:
    /// `0` first, then the start offset of each part as it is sent, and
    /// finally the total length just before completing. Parts are sent one
    /// at a time, and the part size grows past the configured one when the
    /// content would otherwise need more than `MAX_PARTS` parts. On failure,
    /// including a failed completion, or on cancellation the session is
    /// aborted on a best-effort basis and the original error returned.
    pub async fn upload<F>(
        &self,
        content: Bytes,
        content_type: &str,
        details: ContentDetails,
        mut progress: F,
        cancel: &CancellationToken,
    ) -> UploadResult<ExternalContentId>
    where
        F: FnMut(u64) + Send,
    {
        if content.is_empty() {
            return Err(UploadError::EmptyContent);
        }

        progress(0);
        let mut session = PendingUpload::begin(self.transport.as_ref(), content_type).await?;
        info!("uploading {} bytes as {}", content.len(), session.id());

        if let Err(e) = self.send_parts(&mut session, &content, &mut progress, cancel).await {
            abort_quietly(&mut session).await;
            return Err(e);
        }

        progress(content.len() as u64);
        match session.complete(details).await {
            Ok(id) => Ok(id),
            Err(e) => {
                abort_quietly(&mut session).await;
                Err(e)
            }
        }
    }

    async fn send_parts<F>(
        &self,
        session: &mut PendingUpload<'_>,
        content: &Bytes,
        progress: &mut F,
        cancel: &CancellationToken,
    ) -> UploadResult<()>
    where
        F: FnMut(u64) + Send,
    {
        let total = content.len() as u64;
        let part_size = fit_part_size(total, self.part_size);
        if part_size != self.part_size {
            debug!("raising part size to {} bytes for {} bytes of content", part_size, total);
        }

        for span in plan_parts(total, part_size) {
            if cancel.is_cancelled() {
                return Err(UploadError::Cancelled);
            }

            let body = content.slice(span.start as usize..span.end as usize);
            progress(span.start);
            debug!("sending part {} ({} bytes)", span.number, span.len());

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(UploadError::Cancelled),
                sent = session.upload_part(body) => { sent?; }
            }
        }
        Ok(())
    }
}

async fn abort_quietly(session: &mut PendingUpload<'_>) {
    if let Err(e) = session.abort().await {
        warn!("failed to abort upload {}: {}", session.id(), e);
    }
}
