use axum::extract::Multipart;
use sagfo_core::Upload;
use std::collections::HashMap;

use crate::error::AppError;

/// A fully read multipart body: file parts become [`Upload`]s, the rest text.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, Upload>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = MultipartForm::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let bytes = field.bytes().await?;
                    form.files
                        .insert(name, Upload::new(file_name, content_type, bytes.to_vec()));
                }
                None => {
                    form.fields.insert(name, field.text().await?);
                }
            }
        }
        Ok(form)
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        self.files.remove(name).filter(|u| !u.bytes.is_empty())
    }

    /// Parses a text part as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self, name: &str) -> Result<T, AppError> {
        let raw = self
            .field(name)
            .ok_or_else(|| AppError::Validation(format!("missing '{name}' part")))?;
        serde_json::from_str(raw).map_err(|e| AppError::Validation(format!("invalid '{name}' part: {e}")))
    }
}
