use async_trait::async_trait;
use uuid::Uuid;

pub const PAYMENT_PROOFS_FOLDER: &str = "payment-proofs";
pub const EQUIPMENT_FOLDER: &str = "equipment";
pub const SITE_FOLDER: &str = "site";

/// A file received from a client, not yet stored.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// `<folder>/<uuid>-<sanitized name>`, unique per call.
    pub fn object_key(&self, folder: &str) -> String {
        let name: String = self
            .file_name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
            .collect();
        let name = if name.trim_matches('_').is_empty() { "file".to_string() } else { name };
        format!("{}/{}-{}", folder.trim_matches('/'), Uuid::new_v4().simple(), name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("upload failed: {0}")]
    Upload(String),
    #[error("delete failed: {0}")]
    Delete(String),
    #[error("not a stored object url: {0}")]
    UnknownUrl(String),
}

/// External blob store: accepts a file, returns its public URL.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, upload: Upload, folder: &str) -> Result<String, StorageError>;

    async fn delete(&self, url: &str) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_sanitizes_name() {
        let upload = Upload::new("comprobante de pago.pdf", "application/pdf", vec![1]);
        let key = upload.object_key("payment-proofs");
        assert!(key.starts_with("payment-proofs/"));
        assert!(key.ends_with("-comprobante_de_pago.pdf"));
        assert_ne!(key, upload.object_key("payment-proofs"));
    }

    #[test]
    fn test_object_key_falls_back_for_empty_names() {
        let upload = Upload::new("???", "image/png", vec![1]);
        assert!(upload.object_key("/site/").starts_with("site/"));
        assert!(upload.object_key("site").ends_with("-file"));
    }
}
