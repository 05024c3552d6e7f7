use reqwest::Client as HttpClient;
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

use crate::api::models::{Contact, GeneratedMessage, Template, UploadOutcome};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("could not reach server: {0}")]
    Transport(String),
    #[error("{message}")]
    Server { status: u16, message: String },
    #[error("unexpected response from server: {0}")]
    Decode(String),
    #[error("could not read file: {0}")]
    File(String),
}

pub struct ApiClient {
    pub http: HttpClient,
    pub base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: HttpClient::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn server_error(status: u16, body: &Value, fallback: &str) -> ApiError {
        let message = body
            .get("error")
            .and_then(|v| v.as_str())
            .unwrap_or(fallback)
            .to_string();
        ApiError::Server { status, message }
    }

    /// Upload a contact file for parsing. A non-2xx reply that still carries
    /// `partial_data` is treated as a recoverable partial success.
    pub async fn upload(&self, path: &Path) -> Result<UploadOutcome, ApiError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| ApiError::File(e.to_string()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename);
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp = self
            .http
            .post(self.endpoint("/upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = resp.status();
        let json: Value = resp.json().await.map_err(|e| ApiError::Decode(e.to_string()))?;

        if !status.is_success() {
            // Recovery mode: the parser crashed midway but salvaged some rows.
            if let Some(partial) = json.get("partial_data").and_then(|v| v.as_array()) {
                if !partial.is_empty() {
                    let contacts: Vec<Contact> =
                        serde_json::from_value(Value::Array(partial.clone()))
                            .map_err(|e| ApiError::Decode(e.to_string()))?;
                    let error = json.get("error").and_then(|v| v.as_str()).unwrap_or("parse error");
                    let warning = format!("{}. {} contacts recovered.", error, contacts.len());
                    return Ok(UploadOutcome { contacts, warning: Some(warning) });
                }
            }
            return Err(Self::server_error(status.as_u16(), &json, "Failed to process file"));
        }

        let contacts: Vec<Contact> = json
            .get("data")
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| ApiError::Decode(e.to_string()))?
            .unwrap_or_default();
        Ok(UploadOutcome { contacts, warning: None })
    }

    /// Generate one personalized message per contact from the selected
    /// template, with optional custom subject/body overrides.
    pub async fn generate(
        &self,
        contacts: &[Contact],
        template_id: &str,
        custom_subject: &str,
        custom_body: &str,
    ) -> Result<Vec<GeneratedMessage>, ApiError> {
        let body = serde_json::json!({
            "volunteers": contacts,
            "template_id": template_id,
            "custom_subject": custom_subject,
            "custom_body": custom_body,
        });
        let resp = self
            .http
            .post(self.endpoint("/generate"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = resp.status();
        let json: Value = resp.json().await.map_err(|e| ApiError::Decode(e.to_string()))?;
        if !status.is_success() {
            return Err(Self::server_error(status.as_u16(), &json, "Failed to generate messages"));
        }
        let messages = json
            .get("messages")
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| ApiError::Decode(e.to_string()))?
            .unwrap_or_default();
        Ok(messages)
    }

    /// Fetch the template catalog for the picker.
    pub async fn templates(&self) -> Result<Vec<Template>, ApiError> {
        let resp = self
            .http
            .get(self.endpoint("/templates"))
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = resp.status();
        let json: Value = resp.json().await.map_err(|e| ApiError::Decode(e.to_string()))?;
        if !status.is_success() {
            return Err(Self::server_error(status.as_u16(), &json, "Failed to load templates"));
        }
        let templates = json
            .get("templates")
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| ApiError::Decode(e.to_string()))?
            .unwrap_or_default();
        Ok(templates)
    }

    pub async fn download_csv(&self, messages: &[GeneratedMessage]) -> Result<Vec<u8>, ApiError> {
        self.download("/download/csv", messages).await
    }

    pub async fn download_zip(&self, messages: &[GeneratedMessage]) -> Result<Vec<u8>, ApiError> {
        self.download("/download/zip", messages).await
    }

    async fn download(&self, path: &str, messages: &[GeneratedMessage]) -> Result<Vec<u8>, ApiError> {
        let body = serde_json::json!({ "messages": messages });
        let resp = self
            .http
            .post(self.endpoint(path))
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let json: Value = resp.json().await.unwrap_or(Value::Null);
            return Err(Self::server_error(status.as_u16(), &json, "Download failed"));
        }
        let bytes = resp.bytes().await.map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
