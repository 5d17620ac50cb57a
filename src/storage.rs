use async_trait::async_trait;
use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use thiserror::Error;
use uuid::Uuid;

/// Largest accepted upload, in bytes.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// UploadKind
///
/// The three upload slots the admin panel exposes. Each one fixes the multipart field
/// name, the accepted extensions and the public subdirectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    CourseImage,
    ContactImage,
    RegulationPdf,
}

impl UploadKind {
    pub fn field_name(&self) -> &'static str {
        match self {
            UploadKind::CourseImage | UploadKind::ContactImage => "image",
            UploadKind::RegulationPdf => "pdf",
        }
    }

    pub fn directory(&self) -> &'static str {
        match self {
            UploadKind::CourseImage => "courses",
            UploadKind::ContactImage => "contact",
            UploadKind::RegulationPdf => "regulation",
        }
    }

    pub fn allowed_extensions(&self) -> &'static [&'static str] {
        match self {
            UploadKind::CourseImage | UploadKind::ContactImage => &["jpg", "jpeg", "png", "webp"],
            UploadKind::RegulationPdf => &["pdf"],
        }
    }

    /// validate
    ///
    /// Checks the client filename's extension and the payload size. Returns the
    /// lowercased extension to store the file under.
    pub fn validate(&self, filename: &str, size: usize) -> Result<String, StorageError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        if !self.allowed_extensions().contains(&extension.as_str()) {
            return Err(StorageError::UnsupportedType(
                self.allowed_extensions().join(", "),
            ));
        }
        if size == 0 {
            return Err(StorageError::Empty);
        }
        if size > MAX_UPLOAD_BYTES {
            return Err(StorageError::TooLarge(MAX_UPLOAD_BYTES / (1024 * 1024)));
        }
        Ok(extension)
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Only these file types are allowed: {0}")]
    UnsupportedType(String),
    #[error("The uploaded file is empty")]
    Empty,
    #[error("The file exceeds the {0} MB limit")]
    TooLarge(usize),
    #[error("could not write upload: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Client mistakes, as opposed to failures on our side.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, StorageError::Io(_))
    }
}

impl From<StorageError> for crate::error::ApiError {
    fn from(err: StorageError) -> Self {
        if err.is_rejection() {
            crate::error::ApiError::Validation(err.to_string())
        } else {
            crate::error::ApiError::Storage(err.to_string())
        }
    }
}

/// StorageService
///
/// Contract for persisting uploaded files. Implementations return the public URL
/// path the file is served from (`/uploads/<dir>/<file>`).
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the upload directories if needed. Called once at startup.
    async fn ensure_root(&self) -> Result<(), StorageError>;

    /// Stores `bytes` under a fresh random name with the given extension.
    async fn store(
        &self,
        kind: UploadKind,
        extension: &str,
        bytes: &[u8],
    ) -> Result<String, StorageError>;

    /// Deletes a file previously returned by `store`.
    async fn remove(&self, url: &str) -> Result<(), StorageError>;
}

/// LocalStorage
///
/// Writes uploads below a root directory that is also served statically at `/uploads`.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Random 32-hex-digit name, so client filenames never reach the filesystem.
fn random_filename(extension: &str) -> String {
    format!("{}.{}", Uuid::new_v4().simple(), sanitize_key(extension))
}

#[async_trait]
impl StorageService for LocalStorage {
    async fn ensure_root(&self) -> Result<(), StorageError> {
        for kind in [
            UploadKind::CourseImage,
            UploadKind::ContactImage,
            UploadKind::RegulationPdf,
        ] {
            tokio::fs::create_dir_all(self.root.join(kind.directory())).await?;
        }
        Ok(())
    }

    async fn store(
        &self,
        kind: UploadKind,
        extension: &str,
        bytes: &[u8],
    ) -> Result<String, StorageError> {
        let directory = self.root.join(kind.directory());
        tokio::fs::create_dir_all(&directory).await?;

        let filename = random_filename(extension);
        tokio::fs::write(directory.join(&filename), bytes)
            .await
            .inspect_err(|e| tracing::error!("upload write error: {:?}", e))?;

        tracing::info!(kind = ?kind, file = %filename, size = bytes.len(), "upload stored");
        Ok(format!("/uploads/{}/{}", kind.directory(), filename))
    }

    async fn remove(&self, url: &str) -> Result<(), StorageError> {
        let path = url
            .strip_prefix("/uploads/")
            .unwrap_or(url)
            .split('/')
            .map(sanitize_key)
            .filter(|segment| !segment.is_empty())
            .fold(self.root.clone(), |path, segment| path.join(segment));

        tokio::fs::remove_file(&path).await?;
        tracing::info!(file = %path.display(), "upload removed");
        Ok(())
    }
}

/// sanitize_key
///
/// Strips path separators and dot segments from a name fragment so it cannot
/// escape the upload directory.
fn sanitize_key(key: &str) -> String {
    key.split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("")
}

/// MockStorageService
///
/// Records stored files in memory instead of touching the disk. Used by the tests.
#[derive(Default)]
pub struct MockStorageService {
    /// When true, every store fails as if the disk were unavailable.
    pub should_fail: bool,
    stored: Mutex<Vec<(UploadKind, String, usize)>>,
    removed: Mutex<Vec<String>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// `(kind, public path, size)` of every successful store, in order.
    pub fn stored(&self) -> Vec<(UploadKind, String, usize)> {
        self.stored
            .lock()
            .map(|stored| stored.clone())
            .unwrap_or_default()
    }

    /// Public paths passed to `remove`, in order.
    pub fn removed(&self) -> Vec<String> {
        self.removed
            .lock()
            .map(|removed| removed.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_root(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn store(
        &self,
        kind: UploadKind,
        extension: &str,
        bytes: &[u8],
    ) -> Result<String, StorageError> {
        if self.should_fail {
            return Err(StorageError::Io(std::io::Error::other(
                "Mock Storage Error: Simulation requested",
            )));
        }

        let path = format!("/uploads/{}/{}", kind.directory(), random_filename(extension));
        if let Ok(mut stored) = self.stored.lock() {
            stored.push((kind, path.clone(), bytes.len()));
        }
        Ok(path)
    }

    async fn remove(&self, url: &str) -> Result<(), StorageError> {
        if let Ok(mut stored) = self.stored.lock() {
            stored.retain(|(_, path, _)| path != url);
        }
        if let Ok(mut removed) = self.removed.lock() {
            removed.push(url.to_string());
        }
        Ok(())
    }
}

/// StorageState
///
/// The concrete type used to share the storage service across the application state.
pub type StorageState = Arc<dyn StorageService>;
