//! Upload protocol end to end: MultipartUploader -> UploadService -> in-memory stores.
//!
//! Failure cases wrap the in-memory stores so that one call fails after the
//! others have succeeded.

use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use soundscape_ingest::upload::{
    CompleteRequest, ContentDetails, ContentId, ContentMetadataStore, ContentRecord,
    ExternalContentId, Skip32Obfuscator, MemoryMetadataStore, MemoryObjectStore,
    MemoryPendingStore, MultipartObjectStore, MultipartUploader, PartReceipt, PendingUploadStore,
    UploadError, UploadResult, UploadService, UploadTransport, DEFAULT_PART_SIZE,
};
use tokio_util::sync::CancellationToken;

const MIB: usize = 1024 * 1024;

fn details() -> ContentDetails {
    ContentDetails {
        title: "Harbour at dawn".to_string(),
        artist: "Field Recordist".to_string(),
        genre: "Ambient".to_string(),
        year: 2024,
        month: 3,
        day: 9,
        min_bpm: 60,
        max_bpm: 72,
        comment: "gulls, rigging".to_string(),
        license_type: 2,
        license_text: String::new(),
    }
}

fn content(len: usize) -> Bytes {
    Bytes::from((0..len).map(|i| (i % 251) as u8).collect::<Vec<u8>>())
}

fn ids() -> Skip32Obfuscator {
    Skip32Obfuscator::new(*b"flow-tests")
}

struct Stores {
    objects: MemoryObjectStore,
    pending: MemoryPendingStore,
    metadata: MemoryMetadataStore,
}

impl Stores {
    fn new() -> Self {
        Self {
            objects: MemoryObjectStore::new(),
            pending: MemoryPendingStore::new(),
            metadata: MemoryMetadataStore::new(),
        }
    }

    fn service(&self) -> UploadService {
        UploadService::new(
            self.objects.clone(),
            self.pending.clone(),
            self.metadata.clone(),
            ids(),
        )
    }
}

/// Forwards to a service and records the calls the client made
struct RecordingTransport {
    inner: Arc<UploadService>,
    parts: Mutex<Vec<(u32, usize)>>,
    completions: Mutex<Vec<Vec<PartReceipt>>>,
    cancel_on_part: Option<(u32, CancellationToken)>,
}

impl RecordingTransport {
    fn new(inner: Arc<UploadService>) -> Self {
        Self {
            inner,
            parts: Mutex::new(Vec::new()),
            completions: Mutex::new(Vec::new()),
            cancel_on_part: None,
        }
    }
}

#[async_trait]
impl UploadTransport for RecordingTransport {
    async fn begin(&self, content_type: &str) -> UploadResult<ExternalContentId> {
        UploadTransport::begin(self.inner.as_ref(), content_type).await
    }

    async fn upload_part(
        &self,
        id: ExternalContentId,
        part_number: u32,
        body: Bytes,
    ) -> UploadResult<PartReceipt> {
        self.parts.lock().unwrap().push((part_number, body.len()));
        if let Some((n, token)) = &self.cancel_on_part {
            if *n == part_number {
                token.cancel();
            }
        }
        UploadTransport::upload_part(self.inner.as_ref(), id, part_number, body).await
    }

    async fn complete(
        &self,
        id: ExternalContentId,
        request: &CompleteRequest,
    ) -> UploadResult<ExternalContentId> {
        self.completions.lock().unwrap().push(request.parts.clone());
        UploadTransport::complete(self.inner.as_ref(), id, request).await
    }

    async fn abort(&self, id: ExternalContentId) -> UploadResult<()> {
        UploadTransport::abort(self.inner.as_ref(), id).await
    }
}

/// Metadata store whose inserts always fail
struct FailingMetadataStore(MemoryMetadataStore);

#[async_trait]
impl ContentMetadataStore for FailingMetadataStore {
    async fn insert(&self, _record: ContentRecord) -> UploadResult<()> {
        Err(UploadError::metadata(io::Error::other("database unavailable")))
    }

    async fn get(&self, id: ContentId) -> UploadResult<Option<ContentRecord>> {
        self.0.get(id).await
    }
}

/// Object store whose aborts always fail
struct FailingAbortStore(MemoryObjectStore);

#[async_trait]
impl MultipartObjectStore for FailingAbortStore {
    async fn create_multipart(&self, key: &str, content_type: &str) -> UploadResult<String> {
        self.0.create_multipart(key, content_type).await
    }

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: u32,
        body: Bytes,
    ) -> UploadResult<PartReceipt> {
        self.0.upload_part(key, upload_id, part_number, body).await
    }

    async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[PartReceipt],
    ) -> UploadResult<()> {
        self.0.complete_multipart(key, upload_id, parts).await
    }

    async fn abort_multipart(&self, _key: &str, _upload_id: &str) -> UploadResult<()> {
        Err(UploadError::storage(io::Error::other("storage unreachable")))
    }

    async fn delete_object(&self, key: &str) -> UploadResult<()> {
        self.0.delete_object(key).await
    }
}

#[tokio::test]
async fn uploads_twenty_mib_in_three_parts() {
    let stores = Stores::new();
    let service = Arc::new(stores.service());
    let transport = Arc::new(RecordingTransport::new(service.clone()));
    let uploader = MultipartUploader::from_arc(transport.clone());
    assert_eq!(uploader.part_size(), DEFAULT_PART_SIZE);

    let body = content(20 * MIB);
    let mut progress = Vec::new();
    let id = uploader
        .upload(
            body.clone(),
            "audio/wav",
            details(),
            |sent| progress.push(sent),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(
        *transport.parts.lock().unwrap(),
        vec![(1, 8 * MIB), (2, 8 * MIB), (3, 4 * MIB)]
    );
    let completions = transport.completions.lock().unwrap().clone();
    assert_eq!(completions.len(), 1);
    let numbers: Vec<u32> = completions[0].iter().map(|p| p.part_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);

    let mib = MIB as u64;
    assert_eq!(progress, vec![0, 0, 8 * mib, 16 * mib, 20 * mib]);

    let record = service.content(id).await.unwrap().expect("metadata row");
    assert_eq!(record.details, details());
    assert_eq!(record.content_type, "audio/wav");
    assert_eq!(stores.objects.object(&record.storage_key).await.unwrap(), body);
    assert!(stores.pending.is_empty().await);
    assert_eq!(stores.objects.open_uploads().await, 0);
}

#[tokio::test]
async fn exact_multiple_sends_no_trailing_part() {
    let stores = Stores::new();
    let transport = Arc::new(RecordingTransport::new(Arc::new(stores.service())));
    let uploader = MultipartUploader::from_arc(transport.clone());

    uploader
        .upload(content(16 * MIB), "audio/wav", details(), |_| {}, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(*transport.parts.lock().unwrap(), vec![(1, 8 * MIB), (2, 8 * MIB)]);
}

#[tokio::test]
async fn session_handle_is_not_the_row_id() {
    let stores = Stores::new();
    let service = stores.service();

    let id = service.begin(Some("audio/mpeg")).await.unwrap();
    assert_ne!(id.value(), 1);

    service.upload_part(id, 1, content(10)).await.unwrap();
    service
        .complete(id, CompleteRequest { details: details(), parts: vec![] })
        .await
        .unwrap();
    assert!(stores.metadata.get(ContentId(1)).await.unwrap().is_some());
}

#[tokio::test]
async fn metadata_failure_rolls_back_commit() {
    let stores = Stores::new();
    let service = UploadService::new(
        stores.objects.clone(),
        stores.pending.clone(),
        FailingMetadataStore(stores.metadata.clone()),
        ids(),
    );

    let id = service.begin(Some("audio/wav")).await.unwrap();
    let first = service.upload_part(id, 1, content(MIB)).await.unwrap();
    let second = service.upload_part(id, 2, content(10)).await.unwrap();
    let before = stores.pending.get(ContentId(1)).await.unwrap().unwrap();

    let err = service
        .complete(
            id,
            CompleteRequest {
                details: details(),
                parts: vec![first, second],
            },
        )
        .await
        .unwrap_err();

    match err {
        UploadError::Commit {
            step,
            source,
            rollback_failures,
        } => {
            assert_eq!(step, "insert metadata");
            assert!(matches!(*source, UploadError::Metadata { .. }));
            assert!(rollback_failures.is_empty());
        }
        other => panic!("expected commit error, got {other:?}"),
    }

    let after = stores.pending.get(ContentId(1)).await.unwrap();
    assert_eq!(after, Some(before));
    assert!(stores.metadata.is_empty().await);
    assert_eq!(stores.objects.object_count().await, 0);
}

#[tokio::test]
async fn second_complete_finds_no_session() {
    let stores = Stores::new();
    let service = stores.service();

    let id = service.begin(Some("audio/wav")).await.unwrap();
    service.upload_part(id, 1, content(10)).await.unwrap();

    let request = CompleteRequest { details: details(), parts: vec![] };
    service.complete(id, request.clone()).await.unwrap();

    let err = service.complete(id, request).await.unwrap_err();
    assert!(matches!(err, UploadError::NoSuchSession { .. }));
    assert_eq!(stores.metadata.len().await, 1);
}

#[tokio::test]
async fn concurrent_completes_commit_once() {
    let stores = Stores::new();
    let service = stores.service();

    let id = service.begin(Some("audio/wav")).await.unwrap();
    service.upload_part(id, 1, content(10)).await.unwrap();

    let request = CompleteRequest { details: details(), parts: vec![] };
    let (a, b) = tokio::join!(
        service.complete(id, request.clone()),
        service.complete(id, request.clone())
    );

    let results = [a, b];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(UploadError::NoSuchSession { .. }))));
    assert_eq!(stores.metadata.len().await, 1);
}

#[tokio::test]
async fn begin_without_content_type_is_rejected() {
    let stores = Stores::new();
    let service = Arc::new(stores.service());

    assert!(matches!(
        service.begin(None).await,
        Err(UploadError::MissingContentType)
    ));

    let uploader = MultipartUploader::from_arc(service);
    let err = uploader
        .upload(content(10), "", details(), |_| {}, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, UploadError::MissingContentType));
    assert!(stores.pending.is_empty().await);
    assert_eq!(stores.objects.open_uploads().await, 0);
}

#[tokio::test]
async fn abort_discards_session() {
    let stores = Stores::new();
    let service = stores.service();

    let id = service.begin(Some("audio/wav")).await.unwrap();
    service.upload_part(id, 1, content(10)).await.unwrap();
    service.abort(id).await.unwrap();

    assert!(stores.pending.is_empty().await);
    assert_eq!(stores.objects.open_uploads().await, 0);
    assert!(matches!(
        service.upload_part(id, 2, content(10)).await,
        Err(UploadError::NoSuchSession { .. })
    ));
}

#[tokio::test]
async fn failed_storage_abort_restores_pending_record() {
    let stores = Stores::new();
    let service = UploadService::new(
        FailingAbortStore(stores.objects.clone()),
        stores.pending.clone(),
        stores.metadata.clone(),
        ids(),
    );

    let id = service.begin(Some("audio/wav")).await.unwrap();
    service.upload_part(id, 1, content(10)).await.unwrap();

    let err = service.abort(id).await.unwrap_err();
    assert!(matches!(err, UploadError::Commit { step: "abort storage upload", .. }));

    // The session is still usable
    assert_eq!(stores.pending.len().await, 1);
    service.upload_part(id, 2, content(10)).await.unwrap();
    service
        .complete(id, CompleteRequest { details: details(), parts: vec![] })
        .await
        .unwrap();
}

#[tokio::test]
async fn cancellation_stops_between_parts_and_aborts() {
    let stores = Stores::new();
    let cancel = CancellationToken::new();
    let mut transport = RecordingTransport::new(Arc::new(stores.service()));
    transport.cancel_on_part = Some((2, cancel.clone()));
    let transport = Arc::new(transport);

    let uploader = MultipartUploader::from_arc(transport.clone()).with_part_size(4 * MIB as u64);
    let err = uploader
        .upload(content(16 * MIB), "audio/wav", details(), |_| {}, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::Cancelled));
    let sent: Vec<u32> = transport.parts.lock().unwrap().iter().map(|(n, _)| *n).collect();
    assert!(sent.len() < 4, "sent parts {sent:?}");
    assert!(transport.completions.lock().unwrap().is_empty());

    assert!(stores.pending.is_empty().await);
    assert_eq!(stores.objects.open_uploads().await, 0);
    assert!(stores.metadata.is_empty().await);
}

#[tokio::test]
async fn failed_commit_through_client_leaves_nothing_behind() {
    let stores = Stores::new();
    let service = UploadService::new(
        stores.objects.clone(),
        stores.pending.clone(),
        FailingMetadataStore(stores.metadata.clone()),
        ids(),
    );
    let uploader = MultipartUploader::new(service).with_part_size(4 * MIB as u64);

    let err = uploader
        .upload(content(10 * MIB), "audio/wav", details(), |_| {}, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::Commit { step: "insert metadata", .. }));
    assert!(stores.pending.is_empty().await);
    assert_eq!(stores.objects.open_uploads().await, 0);
    assert_eq!(stores.objects.object_count().await, 0);
    assert!(stores.metadata.is_empty().await);
}
