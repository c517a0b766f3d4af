//! Uploads a run's output directory to S3.

use anyhow::Result;
use aws_sdk_s3::primitives::ByteStream;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// Body, object key and content type for one output file.
#[derive(Debug)]
pub struct Upload {
    pub key: String,
    pub body: Vec<u8>,
    pub content_type: &'static str,
}

/// Builds the upload for `file_name`, gzip-compressing CSVs when asked.
/// The manifest is never compressed so it stays directly readable.
pub fn prepare_upload(prefix: &str, file_name: &str, contents: Vec<u8>, gzip: bool) -> Result<Upload> {
    let prefix = prefix.trim_end_matches('/');
    let key_for = |name: &str| {
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}/{name}")
        }
    };

    if file_name.ends_with(".json") {
        return Ok(Upload {
            key: key_for(file_name),
            body: contents,
            content_type: "application/json",
        });
    }

    if gzip {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&contents)?;
        Ok(Upload {
            key: key_for(&format!("{file_name}.gz")),
            body: encoder.finish()?,
            content_type: "application/gzip",
        })
    } else {
        Ok(Upload {
            key: key_for(file_name),
            body: contents,
            content_type: "text/csv",
        })
    }
}

/// Uploads every CSV and JSON file in `output_dir` under `prefix`.
#[tracing::instrument(skip(client), fields(bucket, prefix, output_dir = %output_dir.display(), gzip))]
pub async fn publish_outputs(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    prefix: &str,
    output_dir: &Path,
    gzip: bool,
) -> Result<usize> {
    let mut upload_count = 0;

    let mut entries: Vec<_> = std::fs::read_dir(output_dir)?.collect::<std::io::Result<_>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !matches!(path.extension().and_then(|e| e.to_str()), Some("csv" | "json")) {
            continue;
        }

        let upload = prepare_upload(prefix, file_name, std::fs::read(&path)?, gzip)?;
        debug!(key = %upload.key, bytes = upload.body.len(), "Uploading");

        client
            .put_object()
            .bucket(bucket)
            .key(&upload.key)
            .content_type(upload.content_type)
            .body(ByteStream::from(upload.body))
            .send()
            .await?;

        upload_count += 1;
    }

    info!(upload_count, "S3 upload complete");
    Ok(upload_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    #[test]
    fn test_csv_is_gzipped_when_requested() {
        let upload = prepare_upload("runs/2026", "presidential.csv", b"fips\n01001\n".to_vec(), true)
            .unwrap();

        assert_eq!(upload.key, "runs/2026/presidential.csv.gz");
        assert_eq!(upload.content_type, "application/gzip");

        let mut decoded = String::new();
        GzDecoder::new(upload.body.as_slice())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, "fips\n01001\n");
    }

    #[test]
    fn test_manifest_is_never_compressed() {
        let upload = prepare_upload("", "manifest.json", b"{}".to_vec(), true).unwrap();

        assert_eq!(upload.key, "manifest.json");
        assert_eq!(upload.content_type, "application/json");
        assert_eq!(upload.body, b"{}");
    }

    #[test]
    fn test_plain_csv_key() {
        let upload = prepare_upload("out/", "urbanicity.csv", Vec::new(), false).unwrap();
        assert_eq!(upload.key, "out/urbanicity.csv");
        assert_eq!(upload.content_type, "text/csv");
    }
}
