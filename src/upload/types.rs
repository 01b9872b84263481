use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::upload::error::{UploadError, UploadResult};
use crate::upload::id::ContentId;

/// Size of every part except possibly the last
pub const DEFAULT_PART_SIZE: u64 = 8 * 1024 * 1024; // 8MB

/// Highest part number accepted, matching common object storage limits
pub const MAX_PARTS: u32 = 10_000;

/// Token returned by object storage for one uploaded part
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartReceipt {
    pub part_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

impl PartReceipt {
    pub fn new(part_number: u32, etag: Option<String>) -> Self {
        Self { part_number, etag }
    }
}

/// Lifecycle of an upload session as seen by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadState {
    NotStarted,
    Begun,
    PartsUploading,
    Completed,
    Aborted,
}

impl UploadState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadState::Completed | UploadState::Aborted)
    }
}

/// Server-side record of a begun but not yet completed upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingUploadRecord {
    pub content_id: ContentId,
    pub storage_key: String,
    pub storage_upload_id: String,
    pub content_type: String,
    /// Receipts of the parts received so far, keyed by part number
    pub parts: BTreeMap<u32, PartReceipt>,
    pub created_at: DateTime<Utc>,
}

impl PendingUploadRecord {
    /// Recorded receipts in part order
    pub fn receipts(&self) -> Vec<PartReceipt> {
        self.parts.values().cloned().collect()
    }
}

/// Licensing terms attached to a piece of content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum License {
    PublicDomain,
    CreativeCommonsBy,
    CreativeCommonsBySa,
    CreativeCommonsByNc,
    CreativeCommonsByNcSa,
    CreativeCommonsByNd,
    CreativeCommonsByNcNd,
    Custom(String),
}

impl License {
    /// Wire value selecting [`License::Custom`]
    pub const CUSTOM_TYPE: u32 = 999;

    /// Decode the `licenseType`/`licenseText` pair of a request body
    pub fn from_wire(license_type: u32, license_text: &str) -> Option<Self> {
        Some(match license_type {
            0 => License::PublicDomain,
            1 => License::CreativeCommonsBy,
            2 => License::CreativeCommonsBySa,
            3 => License::CreativeCommonsByNc,
            4 => License::CreativeCommonsByNcSa,
            5 => License::CreativeCommonsByNd,
            6 => License::CreativeCommonsByNcNd,
            Self::CUSTOM_TYPE => License::Custom(license_text.to_string()),
            _ => return None,
        })
    }

    /// `licenseText` value sent alongside [`license_type`](Self::license_type)
    pub fn license_text(&self) -> &str {
        match self {
            License::Custom(text) => text,
            _ => "",
        }
    }

    pub fn license_type(&self) -> u32 {
        match self {
            License::PublicDomain => 0,
            License::CreativeCommonsBy => 1,
            License::CreativeCommonsBySa => 2,
            License::CreativeCommonsByNc => 3,
            License::CreativeCommonsByNcSa => 4,
            License::CreativeCommonsByNd => 5,
            License::CreativeCommonsByNcNd => 6,
            License::Custom(_) => Self::CUSTOM_TYPE,
        }
    }
}

impl FromStr for License {
    type Err = Infallible;

    /// Short names such as `cc0` or `cc-by-nc-sa`; any other text is a
    /// custom license
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "cc0" | "public-domain" => License::PublicDomain,
            "cc-by" => License::CreativeCommonsBy,
            "cc-by-sa" => License::CreativeCommonsBySa,
            "cc-by-nc" => License::CreativeCommonsByNc,
            "cc-by-nc-sa" => License::CreativeCommonsByNcSa,
            "cc-by-nd" => License::CreativeCommonsByNd,
            "cc-by-nc-nd" => License::CreativeCommonsByNcNd,
            _ => License::Custom(s.to_string()),
        })
    }
}

impl fmt::Display for License {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            License::PublicDomain => f.write_str("CC0 (Public Domain)"),
            License::CreativeCommonsBy => f.write_str("Creative Commons BY"),
            License::CreativeCommonsBySa => f.write_str("Creative Commons BY-SA"),
            License::CreativeCommonsByNc => f.write_str("Creative Commons BY-NC"),
            License::CreativeCommonsByNcSa => f.write_str("Creative Commons BY-NC-SA"),
            License::CreativeCommonsByNd => f.write_str("Creative Commons BY-ND"),
            License::CreativeCommonsByNcNd => f.write_str("Creative Commons BY-NC-ND"),
            License::Custom(text) => f.write_str(text),
        }
    }
}

/// Descriptive fields submitted when an upload is completed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDetails {
    pub title: String,
    pub artist: String,
    pub genre: String,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    #[serde(rename = "minBPM")]
    pub min_bpm: u32,
    #[serde(rename = "maxBPM")]
    pub max_bpm: u32,
    pub comment: String,
    pub license_type: u32,
    #[serde(default)]
    pub license_text: String,
}

impl ContentDetails {
    /// Details with a title and everything else left blank
    pub fn titled<S: Into<String>>(title: S) -> Self {
        let today = Utc::now().date_naive();
        Self {
            title: title.into(),
            artist: String::new(),
            genre: String::new(),
            year: today.year(),
            month: today.month(),
            day: today.day(),
            min_bpm: 0,
            max_bpm: 0,
            comment: String::new(),
            license_type: 0,
            license_text: String::new(),
        }
    }

    pub fn release_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }

    pub fn license(&self) -> Option<License> {
        License::from_wire(self.license_type, &self.license_text)
    }

    /// Reject details the metadata store could not hold
    pub fn validate(&self) -> UploadResult<()> {
        if self.release_date().is_none() {
            return Err(UploadError::invalid_details(format!(
                "invalid date {}-{}-{}",
                self.year, self.month, self.day
            )));
        }
        if self.min_bpm > self.max_bpm {
            return Err(UploadError::invalid_details(format!(
                "BPM range {}..{} is inverted",
                self.min_bpm, self.max_bpm
            )));
        }
        if self.license().is_none() {
            return Err(UploadError::invalid_details(format!(
                "invalid license type {}",
                self.license_type
            )));
        }
        Ok(())
    }
}

/// Body of `POST /upload/{id}/complete`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteRequest {
    #[serde(flatten)]
    pub details: ContentDetails,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<PartReceipt>,
}

/// Body returned by `begin` and `complete`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdResponse {
    pub id: u32,
}

/// Metadata row written when an upload completes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub content_id: ContentId,
    pub storage_key: String,
    pub content_type: String,
    pub details: ContentDetails,
    pub completed_at: DateTime<Utc>,
}

/// Byte range of one part; `start..end`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartSpan {
    pub number: u32,
    pub start: u64,
    pub end: u64,
}

impl PartSpan {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Split `total` bytes into consecutive parts numbered from 1.
///
/// Every part is `part_size` bytes except the last, which holds the
/// remainder. No empty trailing part is produced when `total` is an exact
/// multiple of `part_size`.
pub fn plan_parts(total: u64, part_size: u64) -> Vec<PartSpan> {
    if part_size == 0 {
        return Vec::new();
    }

    (0..total.div_ceil(part_size))
        .map(|i| PartSpan {
            number: (i + 1) as u32,
            start: i * part_size,
            end: ((i + 1) * part_size).min(total),
        })
        .collect()
}

/// Smallest part size, at least `preferred`, that splits `total` bytes
/// into no more than [`MAX_PARTS`] parts
pub fn fit_part_size(total: u64, preferred: u64) -> u64 {
    preferred.max(total.div_ceil(u64::from(MAX_PARTS))).max(1)
}
