//! KYC document storage.
//!
//! Uploaded identity evidence is written under `<upload_root>/kyc/` with a
//! random prefix so two uploads with the same client file name never collide.
//! Only the relative path is persisted on the KYC application.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use strum::{EnumString, IntoStaticStr};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

const KYC_DIR: &str = "kyc";

/// Size below which an upload is logged as likely too low quality.
/// Uploads are advised to be at least 1 MB and 300 dpi; neither is enforced.
pub const RECOMMENDED_MIN_BYTES: usize = 1024 * 1024;

/// A file received from the applicant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Client-provided file name
    pub file_name: String,
    /// Raw file content
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Wraps a client file name and its content.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// The four evidence slots of a KYC application
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DocumentKind {
    /// Bank/credit card statement or utility bill
    ProofOfAddress,
    /// Front of the photo ID
    PhotoId,
    /// Back of the photo ID
    PhotoIdBack,
    /// Selfie holding the ID
    SelfieWithId,
}

impl DocumentKind {
    /// Short name used in stored file names and URLs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Inverse of [`DocumentKind::as_str`].
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        name.parse().ok()
    }
}

/// Filesystem-backed store for uploaded KYC documents
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    /// Creates a store rooted at `root`. The directory is created lazily on first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Upload root of this store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persists an upload and returns its path relative to the upload root.
    ///
    /// # Errors
    /// Returns an error if the upload is empty or the file cannot be written.
    #[instrument(skip(self, file), fields(file_name = %file.file_name, size = file.bytes.len()))]
    pub async fn save(&self, kind: DocumentKind, file: &UploadedFile) -> Result<String> {
        if file.bytes.is_empty() {
            return Err(Error::validation(format!(
                "Uploaded {} document '{}' is empty",
                kind.as_str(),
                file.file_name
            )));
        }

        if file.bytes.len() < RECOMMENDED_MIN_BYTES {
            warn!(
                "{} upload '{}' is {} bytes, below the recommended 1 MB",
                kind.as_str(),
                file.file_name,
                file.bytes.len()
            );
        }

        let dir = self.root.join(KYC_DIR);
        tokio::fs::create_dir_all(&dir).await?;

        let stored_name = format!(
            "{}-{}-{}",
            Uuid::new_v4().simple(),
            kind.as_str(),
            sanitize_file_name(&file.file_name)
        );
        tokio::fs::write(dir.join(&stored_name), &file.bytes).await?;

        let relative = format!("{KYC_DIR}/{stored_name}");
        debug!("Stored {} document at {}", kind.as_str(), relative);
        Ok(relative)
    }

    /// Reads back a document previously returned by [`DocumentStore::save`].
    ///
    /// # Errors
    /// Returns `NotFound` for paths outside the KYC directory or missing files.
    pub async fn read(&self, relative: &str) -> Result<Vec<u8>> {
        let Some(name) = relative.strip_prefix(&format!("{KYC_DIR}/")) else {
            return Err(Error::not_found("Document", relative));
        };
        if name.is_empty() || name != sanitize_file_name(name) {
            return Err(Error::not_found("Document", relative));
        }

        match tokio::fs::read(self.resolve(relative)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::not_found("Document", relative))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Removes previously saved documents. Failures are logged, not returned.
    pub async fn discard<I, S>(&self, paths: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for relative in paths {
            let relative = relative.as_ref();
            match tokio::fs::remove_file(self.resolve(relative)).await {
                Ok(()) => debug!("Removed stored document {}", relative),
                Err(e) => warn!("Could not remove stored document {}: {}", relative, e),
            }
        }
    }

    /// Absolute location of a stored document.
    #[must_use]
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }
}

/// Reduces a client file name to its last path component made of
/// `[A-Za-z0-9._-]`, replacing anything else with `_`.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}
