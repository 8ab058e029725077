use std::path::{Path, PathBuf};

use aws_config::BehaviorVersion;
use aws_sdk_s3::primitives::ByteStream;
use tracing::info;
use walkdir::WalkDir;

use crate::constants::store::TMP_EXTENSION;
use crate::constants::upload::{DEFAULT_BUCKET, DEFAULT_PREFIX, OS_ARTIFACTS};
use crate::errors::BotError;
use crate::types::ProfileName;

/// Mirrors a bot's output files to object storage.
pub trait Uploader {
    /// Upload every eligible file under `dir` to the `slug` namespace.
    fn upload_dir(&self, dir: &Path, slug: &str) -> Result<UploadSummary, BotError>;
}

/// Remote keys written by one upload pass.
#[derive(Clone, Debug, Default)]
pub struct UploadSummary {
    /// Destination keys, in upload order.
    pub keys: Vec<String>,
}

/// S3 uploader with profile-aware credentials.
///
/// Copies every file in the output directory to
/// `s3://<bucket>/<prefix>/<slug>/<filename>`, skipping OS artifact files
/// and in-flight `.tmp` siblings. Re-uploads overwrite, so a retried run
/// can re-upload without re-fetching.
#[derive(Clone, Debug)]
pub struct S3Uploader {
    bucket: String,
    prefix: String,
    profile: Option<ProfileName>,
}

impl Default for S3Uploader {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
            prefix: DEFAULT_PREFIX.to_string(),
            profile: None,
        }
    }
}

impl S3Uploader {
    /// Uploader for the default bucket and prefix, ambient credentials.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the destination bucket.
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    /// Override the key prefix ahead of the slug (may be empty).
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Use a named credential profile instead of ambient credentials.
    pub fn with_profile(mut self, profile: Option<ProfileName>) -> Self {
        self.profile = profile;
        self
    }

    fn remote_key(&self, slug: &str, filename: &str) -> String {
        if self.prefix.is_empty() {
            format!("{slug}/{filename}")
        } else {
            format!("{}/{slug}/{filename}", self.prefix)
        }
    }
}

impl Uploader for S3Uploader {
    fn upload_dir(&self, dir: &Path, slug: &str) -> Result<UploadSummary, BotError> {
        let files: Vec<PathBuf> = WalkDir::new(dir)
            .min_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.path().to_path_buf())
            .filter(|path| is_uploadable(path))
            .collect();

        // The SDK is async-only; bot runs are synchronous, so each upload
        // pass drives it on a throwaway current-thread runtime.
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(async {
            let mut loader = aws_config::defaults(BehaviorVersion::latest());
            if let Some(profile) = &self.profile {
                loader = loader.profile_name(profile);
            }
            let shared = loader.load().await;
            let client = aws_sdk_s3::Client::new(&shared);

            let mut summary = UploadSummary::default();
            for path in files {
                let Some(filename) = path.file_name().and_then(|name| name.to_str()) else {
                    continue;
                };
                let key = self.remote_key(slug, filename);
                let destination = format!("{}/{}", self.bucket, key);
                let body = ByteStream::from_path(&path).await.map_err(|err| {
                    BotError::Upload {
                        destination: destination.clone(),
                        reason: err.to_string(),
                    }
                })?;
                client
                    .put_object()
                    .bucket(&self.bucket)
                    .key(&key)
                    .body(body)
                    .send()
                    .await
                    .map_err(|err| BotError::Upload {
                        destination,
                        reason: err.to_string(),
                    })?;
                info!(bucket = %self.bucket, key = %key, "uploaded");
                summary.keys.push(key);
            }
            Ok(summary)
        })
    }
}

/// True for files worth mirroring: not an OS artifact, not an in-flight
/// temporary.
pub fn is_uploadable(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    if OS_ARTIFACTS.contains(&name) {
        return false;
    }
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| !ext.eq_ignore_ascii_case(TMP_EXTENSION))
        .unwrap_or(true)
}
