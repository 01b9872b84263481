//! Soundscape ingest: audio tag extraction and multipart content upload.
//!
//! The tag readers work on an in-memory buffer and report fields through
//! handler traits:
//!
//! - RIFF/WAVE `LIST`/`INFO` chunks ([`riff`])
//! - the ID3v1 trailer and ID3v2 header tags ([`id3`])
//!
//! [`metadata::extract_metadata`] runs every reader in a fixed order.
//!
//! The [`upload`] module implements the multipart upload protocol: a client
//! that slices content into parts and sends them through an
//! [`upload::UploadTransport`], and an [`upload::UploadService`] that
//! stores parts and commits the finished object together with its metadata
//! row using [`reversible::ReversibleOperation`] compensation.

pub mod config;
pub mod error;
pub mod field_mapping;
pub mod id3;
pub mod metadata;
pub mod reversible;
pub mod riff;
pub mod upload;
pub mod utils;

pub use config::IngestConfig;
pub use error::{ParseError, ParseResult};
pub use metadata::{
    detect_tags, extract_metadata, extract_metadata_from_file, ContentMetadataHandler,
    MetadataFields, TagKind, PROBE_ORDER,
};
pub use reversible::ReversibleOperation;
