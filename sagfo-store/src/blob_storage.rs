use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use sagfo_core::storage::{ObjectStorage, StorageError, Upload};
use std::time::Duration;
use tracing::{debug, error};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Object storage behind a bucket-style HTTP API: `POST <base>/<key>` to
/// store, `DELETE <base>/<key>` to remove, public reads under
/// `<public base>/<key>`.
#[derive(Clone)]
pub struct HttpObjectStorage {
    client: Client,
    base_url: String,
    public_base_url: String,
    token: Option<String>,
}

impl HttpObjectStorage {
    /// Fails when the HTTP client cannot be built, e.g. when no TLS backend
    /// is available.
    pub fn new(
        base_url: &str,
        public_base_url: Option<&str>,
        token: Option<String>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let base_url = base_url.trim_end_matches('/').to_string();
        let public_base_url = public_base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| base_url.clone());
        Ok(Self { client, base_url, public_base_url, token })
    }

    /// Object key for a URL this store handed out.
    pub fn key_for(&self, url: &str) -> Option<String> {
        url.strip_prefix(&self.public_base_url)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|key| !key.is_empty())
            .map(str::to_string)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl ObjectStorage for HttpObjectStorage {
    async fn upload(&self, upload: Upload, folder: &str) -> Result<String, StorageError> {
        let key = upload.object_key(folder);
        let request = self
            .client
            .post(format!("{}/{}", self.base_url, key))
            .header(reqwest::header::CONTENT_TYPE, upload.content_type)
            .body(upload.bytes);

        let response = self.authorize(request).send().await.map_err(|e| {
            error!(key = %key, error = %e, "Object upload failed");
            StorageError::Upload(e.to_string())
        })?;
        if !response.status().is_success() {
            error!(key = %key, status = %response.status(), "Object upload rejected");
            return Err(StorageError::Upload(format!("status {}", response.status())));
        }

        debug!(key = %key, "Object uploaded");
        Ok(format!("{}/{}", self.public_base_url, key))
    }

    async fn delete(&self, url: &str) -> Result<(), StorageError> {
        let key = self
            .key_for(url)
            .ok_or_else(|| StorageError::UnknownUrl(url.to_string()))?;
        let request = self.client.delete(format!("{}/{}", self.base_url, key));

        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| StorageError::Delete(e.to_string()))?;
        match response.status() {
            s if s.is_success() || s == StatusCode::NOT_FOUND => {
                debug!(key = %key, "Object deleted");
                Ok(())
            }
            s => Err(StorageError::Delete(format!("status {s}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_for_public_urls() {
        let storage = HttpObjectStorage::new(
            "https://files.example.com/object/sagfo/",
            Some("https://files.example.com/object/public/sagfo"),
            None,
        )
        .unwrap();
        assert_eq!(
            storage.key_for("https://files.example.com/object/public/sagfo/equipment/abc-foto.jpg"),
            Some("equipment/abc-foto.jpg".to_string())
        );
        assert_eq!(storage.key_for("https://elsewhere.com/equipment/abc.jpg"), None);
        assert_eq!(storage.key_for("https://files.example.com/object/public/sagfo/"), None);
    }

    #[test]
    fn test_public_base_defaults_to_base() {
        let storage = HttpObjectStorage::new("https://files.example.com/bucket", None, None).unwrap();
        assert_eq!(
            storage.key_for("https://files.example.com/bucket/site/x.png"),
            Some("site/x.png".to_string())
        );
    }

    #[test]
    fn test_new_builds_client_with_token() {
        let storage = HttpObjectStorage::new(
            "https://files.example.com/bucket",
            None,
            Some("service-key".to_string()),
        )
        .unwrap();
        assert_eq!(storage.token.as_deref(), Some("service-key"));
        let request = storage.authorize(storage.client.delete("https://files.example.com/bucket/a.png"));
        let request = request.build().unwrap();
        assert_eq!(request.headers()[reqwest::header::AUTHORIZATION], "Bearer service-key");
    }
}
