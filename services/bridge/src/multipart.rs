use std::collections::HashMap;

use axum::extract::Multipart;
use bytes::Bytes;

use crate::error::ApiError;

/// A file part of a multipart upload.
#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: String,
    /// As sent by the client; `None` when the part had no content type.
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl UploadedFile {
    /// The client's content type, or a guess from the file extension.
    pub fn content_type(&self) -> String {
        self.content_type
            .clone()
            .filter(|ct| !ct.is_empty() && ct != "application/octet-stream")
            .unwrap_or_else(|| {
                mime_guess::from_path(&self.file_name)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string()
            })
    }
}

/// A fully read multipart form: file parts under `file_field`, text parts by name.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub files: Vec<UploadedFile>,
    pub values: HashMap<String, Vec<String>>,
}

impl UploadForm {
    pub async fn read(mut mp: Multipart, file_field: &str) -> Result<Self, ApiError> {
        let mut form = UploadForm::default();

        while let Some(field) = mp.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            if name == file_field {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .filter(|f| !f.is_empty())
                    .ok_or_else(|| ApiError::bad_request(format!("part {file_field:?} has no file name")))?;
                let content_type = field.content_type().map(str::to_string);
                let body = field.bytes().await?;
                form.files.push(UploadedFile {
                    file_name,
                    content_type,
                    body,
                });
            } else {
                let text = field.text().await?;
                form.values.entry(name).or_default().push(text);
            }
        }
        Ok(form)
    }

    /// All values sent for `name`, in form order.
    pub fn values(&self, name: &str) -> &[String] {
        self.values.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First non-blank value for `name`, trimmed; 400 when absent.
    pub fn required(&self, name: &str) -> Result<String, ApiError> {
        self.values(name)
            .first()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::bad_request(format!("{name} is required")))
    }
}
