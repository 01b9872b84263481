// Multipart upload protocol: client, transports and server side
pub mod client;
pub mod error;
pub mod http;
pub mod id;
pub mod memory;
pub mod service;
pub mod store;
pub mod types;

pub use client::{MultipartUploader, PendingUpload, UploadTransport};
pub use error::{UploadError, UploadResult};
pub use http::HttpTransport;
pub use id::{ContentId, ContentIdObfuscator, ExternalContentId, Skip32Obfuscator};
pub use memory::{MemoryMetadataStore, MemoryObjectStore, MemoryPendingStore};
pub use service::UploadService;
pub use store::{ContentMetadataStore, MultipartObjectStore, PendingUploadStore};
pub use types::{
    fit_part_size, plan_parts, CompleteRequest, ContentDetails, ContentRecord, License,
    PartReceipt, PartSpan, PendingUploadRecord, UploadState, DEFAULT_PART_SIZE, MAX_PARTS,
};
