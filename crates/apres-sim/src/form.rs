//! Request body extractor for device POSTs
//!
//! The device accepts both `application/x-www-form-urlencoded` and
//! `multipart/form-data` bodies. Either way the `apikey` field must carry
//! the configured key.

use axum::extract::{Form, FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use bytes::Bytes;

use apres_core::paths::API_KEY_FIELD;

use crate::error::ApiError;

/// File part of a multipart body
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: String,
    pub content: Bytes,
}

/// Decoded form fields and uploaded files
#[derive(Debug, Clone, Default)]
pub struct DeviceForm {
    fields: Vec<(String, String)>,
    files: Vec<UploadedFile>,
}

impl DeviceForm {
    pub fn new(fields: Vec<(String, String)>) -> Self {
        Self {
            fields,
            files: Vec::new(),
        }
    }

    /// First value of a field, matched exactly
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// First uploaded file, if any
    pub fn file(&self) -> Option<&UploadedFile> {
        self.files.first()
    }

    /// Check the `apikey` field
    pub fn authenticate(&self, api_key: &str) -> Result<(), ApiError> {
        match self.get(API_KEY_FIELD) {
            Some(key) if key == api_key => Ok(()),
            _ => {
                tracing::warn!("Rejected request with missing or invalid API key");
                Err(ApiError::Unauthorized)
            }
        }
    }
}

impl<S> FromRequest<S> for DeviceForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let mut multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;

            let mut form = DeviceForm::default();
            while let Some(field) = multipart
                .next_field()
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?
            {
                let name = field.name().unwrap_or_default().to_string();
                let file_name = field.file_name().map(String::from);
                let content = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;

                match file_name {
                    Some(file_name) => form.files.push(UploadedFile {
                        field: name,
                        file_name,
                        content,
                    }),
                    None => form
                        .fields
                        .push((name, String::from_utf8_lossy(&content).into_owned())),
                }
            }
            Ok(form)
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(fields) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            Ok(DeviceForm::new(fields))
        } else {
            // Unsupported bodies carry no key and fail authentication
            Ok(DeviceForm::default())
        }
    }
}
