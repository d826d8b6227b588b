//! Reads a converted artifact back into memory.

use bytes::Bytes;
use std::path::Path;

use super::error::ReadError;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Response payload produced from a converted artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultPayload {
    pub bytes: Bytes,
    pub content_type: &'static str,
}

/// Reads the whole file at `path`.
pub async fn read_result(path: &Path) -> Result<ResultPayload, ReadError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(ResultPayload {
            bytes: Bytes::from(bytes),
            content_type: JSON_CONTENT_TYPE,
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ReadError::NotFound {
            path: path.to_path_buf(),
        }),
        Err(source) => Err(ReadError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_existing_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("out.json");
        tokio::fs::write(&path, br#"{"entities":[]}"#).await.unwrap();

        let payload = read_result(&path).await.unwrap();
        assert_eq!(payload.bytes.as_ref(), br#"{"entities":[]}"#);
        assert_eq!(payload.content_type, JSON_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("missing.json");
        let err = read_result(&path).await.unwrap_err();
        assert!(matches!(err, ReadError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_read_directory_is_io_error() {
        let temp = tempfile::tempdir().unwrap();
        let err = read_result(temp.path()).await.unwrap_err();
        assert!(matches!(err, ReadError::Io { .. }));
    }
}
