// CLI command implementations
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use chrono::{DateTime, Datelike, Utc};
use mime_guess::mime::APPLICATION_OCTET_STREAM;
use serde_json::json;
use soundscape_ingest::upload::{ContentDetails, HttpTransport, MultipartUploader};
use soundscape_ingest::{detect_tags, IngestConfig, MetadataFields};
use tokio_util::sync::CancellationToken;

use crate::cli::config::UploadArgs;
use crate::cli::output::{OutputFormatter, ProgressBar};

/// Expand glob patterns; plain paths are passed through unchanged
pub fn expand_patterns(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for pattern in patterns {
        if !pattern.contains(['*', '?', '[']) {
            paths.push(PathBuf::from(pattern));
            continue;
        }

        let before = paths.len();
        for entry in glob::glob(pattern).with_context(|| format!("invalid pattern {pattern}"))? {
            paths.push(entry?);
        }
        if paths.len() == before {
            log::warn!("pattern {} matched no files", pattern);
        }
    }
    Ok(paths)
}

/// Read metadata from files
pub fn command_read(files: &[String], output: Option<&Path>, formatter: &OutputFormatter) -> Result<()> {
    let paths = expand_patterns(files)?;
    if paths.is_empty() {
        bail!("No files matched");
    }

    let mut writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(std::io::stdout()),
    };
    let mut progress = ProgressBar::new(paths.len() as u64, output.is_some() && !formatter.is_quiet());
    progress.set_prefix("reading".to_string());

    let mut failures = 0;
    for path in &paths {
        match MetadataFields::from_file(path) {
            Ok(fields) => {
                let mut record = serde_json::to_value(&fields)?;
                record["file"] = json!(path.display().to_string());
                formatter.output_record(&record, &mut *writer)?;
            }
            Err(e) => {
                formatter.print_error(&format!("{}: {}", path.display(), e));
                failures += 1;
            }
        }
        progress.increment();
    }
    writer.flush()?;

    if failures > 0 {
        bail!("{} of {} files could not be read", failures, paths.len());
    }
    Ok(())
}

/// List the tag formats in files
pub fn command_detect(files: &[String], formatter: &OutputFormatter) -> Result<()> {
    let paths = expand_patterns(files)?;
    if paths.is_empty() {
        bail!("No files matched");
    }

    let mut stdout = std::io::stdout();
    for path in &paths {
        let content = match fs::read(path) {
            Ok(content) => content,
            Err(e) => {
                formatter.print_error(&format!("{}: {}", path.display(), e));
                continue;
            }
        };

        let tags: Vec<String> = detect_tags(&content).iter().map(ToString::to_string).collect();
        let record = json!({ "file": path.display().to_string(), "tags": tags });
        formatter.output_record(&record, &mut stdout)?;
    }
    Ok(())
}

/// MIME type from a file extension
pub fn guess_content_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or(APPLICATION_OCTET_STREAM)
        .to_string()
}

/// Build the details from flags, falling back to the file's own tags
pub fn details_from_args(args: &UploadArgs, fields: &MetadataFields) -> Result<ContentDetails> {
    if let Some(path) = &args.details {
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let details: ContentDetails =
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
        details.validate()?;
        return Ok(details);
    }

    let title = match args.title.clone().or_else(|| fields.title.clone()) {
        Some(title) => title,
        None => args
            .file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .context("title is not specified")?,
    };
    let artist = args
        .artist
        .clone()
        .or_else(|| fields.artist.clone())
        .context("artist is not specified and the file has no artist tag")?;
    let genre = args
        .genre
        .clone()
        .or_else(|| fields.genre.clone())
        .context("genre is not specified and the file has no genre tag")?;
    let date = args
        .date
        .or_else(|| fields.last_modified.map(|t| t.date_naive()))
        .context("release date is not specified")?;

    let details = ContentDetails {
        title,
        artist,
        genre,
        year: date.year(),
        month: date.month(),
        day: date.day(),
        min_bpm: args.min_bpm,
        max_bpm: args.max_bpm,
        comment: args.comment.clone(),
        license_type: args.license.license_type(),
        license_text: args.license.license_text().to_string(),
    };
    details.validate()?;
    Ok(details)
}

/// Upload a file and register its details
pub async fn command_upload(args: UploadArgs, settings: IngestConfig, formatter: &OutputFormatter) -> Result<()> {
    let settings = args.apply_overrides(settings)?;

    let metadata = tokio::fs::metadata(&args.file)
        .await
        .with_context(|| format!("reading {}", args.file.display()))?;
    let content = Bytes::from(tokio::fs::read(&args.file).await?);
    let last_modified: DateTime<Utc> = metadata.modified()?.into();
    let fields = MetadataFields::from_content(&content, last_modified);

    let details = details_from_args(&args, &fields)?;
    let content_type = args
        .content_type
        .clone()
        .unwrap_or_else(|| guess_content_type(&args.file));

    formatter.print_info(&format!("Title: {}", details.title));
    formatter.print_info(&format!("Artist: {}", details.artist));
    formatter.print_info(&format!("Genre: {}", details.genre));
    formatter.print_info(&format!("Release date: {}-{:02}-{:02}", details.year, details.month, details.day));
    formatter.print_info(&format!("License: {}", args.license));
    formatter.print_info(&format!("Content-Type: {}", content_type));
    formatter.print_info(&format!("Size: {} bytes", content.len()));

    if !args.no_dry_run {
        formatter.print_info("This run is a dry run. To upload, pass `-n`");
        return Ok(());
    }

    let endpoint = settings
        .endpoint
        .clone()
        .context("no endpoint configured; pass --endpoint or set it in the settings file")?;
    let transport = HttpTransport::with_timeout(endpoint, settings.request_timeout())?;
    let uploader = MultipartUploader::new(transport).with_part_size(settings.part_size);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let mut progress = ProgressBar::new(content.len() as u64, !formatter.is_quiet());
    progress.set_prefix("uploading".to_string());

    let id = uploader
        .upload(
            content,
            &content_type,
            details,
            move |sent| progress.set_position(sent),
            &cancel,
        )
        .await
        .context("upload failed")?;

    formatter.print_success(&format!("Uploaded {} as content {}", args.file.display(), id));
    Ok(())
}
