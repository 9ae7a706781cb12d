use std::path::{Path, PathBuf};

use async_trait::async_trait;
use media_core::ports::BlobStore;
use media_core::ServiceError;
use tokio_util::sync::CancellationToken;

/// Filesystem-backed [`BlobStore`] (spec.md §6's "opaque blob storage...
/// keyed by server-generated filename"). `filename` is joined onto a fixed
/// base directory; callers never pass a client-controlled path, so this
/// does not need to defend against traversal beyond rejecting path
/// separators outright.
pub struct LocalBlobStore {
	base_dir: PathBuf,
}

impl LocalBlobStore {
	#[must_use]
	pub fn new(base_dir: impl Into<PathBuf>) -> Self {
		Self { base_dir: base_dir.into() }
	}

	fn resolve(&self, filename: &str) -> Result<PathBuf, ServiceError> {
		if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
			return Err(ServiceError::Validation("invalid filename".to_string()));
		}
		Ok(self.base_dir.join(filename))
	}
}

#[async_trait]
impl BlobStore for LocalBlobStore {
	async fn read(&self, ct: &CancellationToken, filename: &str) -> Result<Vec<u8>, ServiceError> {
		let path = self.resolve(filename)?;
		tokio::select! {
			biased;
			() = ct.cancelled() => Err(ServiceError::Internal("cancelled".to_string())),
			result = tokio::fs::read(path) => result.map_err(|e| ServiceError::Internal(e.to_string())),
		}
	}

	async fn write(&self, ct: &CancellationToken, filename: &str, bytes: Vec<u8>) -> Result<(), ServiceError> {
		let path = self.resolve(filename)?;
		tokio::select! {
			biased;
			() = ct.cancelled() => Err(ServiceError::Internal("cancelled".to_string())),
			result = write_file(&self.base_dir, path, bytes) => result,
		}
	}
}

async fn write_file(base_dir: &Path, path: PathBuf, bytes: Vec<u8>) -> Result<(), ServiceError> {
	tokio::fs::create_dir_all(base_dir).await.map_err(|e| ServiceError::Internal(e.to_string()))?;
	tokio::fs::write(path, bytes).await.map_err(|e| ServiceError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	fn ct() -> CancellationToken {
		CancellationToken::new()
	}

	#[tokio::test]
	async fn reads_existing_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("clip.wav");
		std::fs::File::create(&path).unwrap().write_all(b"fake-audio-bytes").unwrap();

		let store = LocalBlobStore::new(dir.path());
		let bytes = store.read(&ct(), "clip.wav").await.unwrap();
		assert_eq!(bytes, b"fake-audio-bytes");
	}

	#[tokio::test]
	async fn rejects_path_traversal() {
		let dir = tempfile::tempdir().unwrap();
		let store = LocalBlobStore::new(dir.path());
		let result = store.read(&ct(), "../escape.wav").await;
		assert!(matches!(result, Err(ServiceError::Validation(_))));
	}

	#[tokio::test]
	async fn missing_file_is_internal_error() {
		let dir = tempfile::tempdir().unwrap();
		let store = LocalBlobStore::new(dir.path());
		let result = store.read(&ct(), "nope.wav").await;
		assert!(result.is_err());
	}

	#[tokio::test]
	async fn write_then_read_round_trips() {
		let dir = tempfile::tempdir().unwrap();
		let store = LocalBlobStore::new(dir.path().join("nested"));
		store.write(&ct(), "clip.wav", b"uploaded-bytes".to_vec()).await.unwrap();
		let bytes = store.read(&ct(), "clip.wav").await.unwrap();
		assert_eq!(bytes, b"uploaded-bytes");
	}

	#[tokio::test]
	async fn write_rejects_path_traversal() {
		let dir = tempfile::tempdir().unwrap();
		let store = LocalBlobStore::new(dir.path());
		let result = store.write(&ct(), "../escape.wav", b"x".to_vec()).await;
		assert!(matches!(result, Err(ServiceError::Validation(_))));
	}
}
