//! HTTP transport shared by all resources

use bytes::Bytes;
use parking_lot::RwLock;
use reqwest::header::{HeaderName, CONTENT_TYPE, LOCATION};
use reqwest::multipart::Form;
use reqwest::{redirect, Client, RequestBuilder, StatusCode};
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use apres_core::paths::{API_KEY_FIELD, API_PREFIX};

use crate::error::{ApresError, Result};
use crate::settings::ClientSettings;
use crate::validate;

/// Buffered response from the device
#[derive(Debug, Clone)]
pub struct DeviceResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub location: Option<String>,
    pub body: Bytes,
}

impl DeviceResponse {
    /// Whether the response declares a JSON body
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(|essence| essence.trim().eq_ignore_ascii_case("application/json"))
            .unwrap_or(false)
    }

    /// Decode the body as JSON
    pub fn json(&self) -> Result<Value> {
        serde_json::from_slice(&self.body)
            .map_err(|e| ApresError::malformed(format!("Response is not valid JSON: {}", e)))
    }

    /// Decode the body as a JSON object
    pub fn json_object(&self) -> Result<Map<String, Value>> {
        match self.json()? {
            Value::Object(map) => Ok(map),
            other => Err(ApresError::malformed(format!(
                "Expected a JSON object, got {}",
                other
            ))),
        }
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Message to report for a status the caller did not expect
    pub fn message(&self) -> String {
        if self.is_json() {
            if let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(&self.body) {
                if let Some(msg) = map.get("errorMessage").and_then(Value::as_str) {
                    return msg.to_string();
                }
            }
        }
        let text = self.text();
        if text.trim().is_empty() {
            format!("HTTP {}", self.status)
        } else {
            text
        }
    }

    pub(crate) fn unexpected(&self) -> ApresError {
        ApresError::unexpected_status(self.status.as_u16(), self.message())
    }
}

fn header_value(response: &reqwest::Response, name: HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

/// Normalise a device root: trim, default to `http://`, drop trailing slashes
pub fn normalize_root(root: &str) -> Result<Url> {
    let trimmed = root.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ApresError::InvalidArgument(
            "Root URL should not be empty, e.g. http://radar.localnet".into(),
        ));
    }
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };
    // Trailing slash so `join` appends below any root path
    Ok(Url::parse(&format!("{}/", with_scheme))?)
}

/// Sends requests to `<root>/api/<path>`, attaching the API key to POSTs
#[derive(Debug)]
pub struct Transport {
    client: Client,
    root: Url,
    api_key: RwLock<String>,
    settings: ClientSettings,
}

impl Transport {
    pub fn new(settings: ClientSettings) -> Result<Self> {
        let root = normalize_root(&settings.root)?;
        let client = Client::builder()
            .timeout(settings.timeouts.request())
            .connect_timeout(settings.timeouts.connect())
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            root,
            api_key: RwLock::new(settings.api_key.clone()),
            settings,
        })
    }

    pub fn root(&self) -> &Url {
        &self.root
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn api_key(&self) -> String {
        self.api_key.read().clone()
    }

    pub fn set_api_key(&self, key: &str) -> Result<()> {
        if key.trim().is_empty() {
            return Err(ApresError::InvalidArgument("API key should not be empty".into()));
        }
        *self.api_key.write() = key.to_string();
        Ok(())
    }

    /// Absolute URL of an endpoint path such as `radar/config`
    pub fn endpoint_url(&self, path: &str) -> Result<Url> {
        let relative = format!("{}/{}", API_PREFIX.trim_start_matches('/'), path);
        Ok(self.root.join(&relative)?)
    }

    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<DeviceResponse> {
        let url = self.endpoint_url(path)?;
        debug!("GET {}", url);

        let mut request = self.client.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }
        self.send(request).await
    }

    /// POST a urlencoded form; the instance key is added unless `fields` has one
    pub async fn post_form(
        &self,
        path: &str,
        mut fields: Vec<(String, String)>,
    ) -> Result<DeviceResponse> {
        let url = self.endpoint_url(path)?;
        debug!("POST {} ({} fields)", url, fields.len());

        if !fields.iter().any(|(k, _)| k == API_KEY_FIELD) {
            fields.push((API_KEY_FIELD.to_string(), self.api_key()));
        }
        self.send(self.client.post(url).form(&fields)).await
    }

    /// POST a multipart form with the instance key attached
    pub async fn post_multipart(&self, path: &str, form: Form) -> Result<DeviceResponse> {
        let url = self.endpoint_url(path)?;
        debug!("POST {} (multipart)", url);

        let form = form.text(API_KEY_FIELD, self.api_key());
        self.send(self.client.post(url).multipart(form)).await
    }

    async fn send(&self, request: RequestBuilder) -> Result<DeviceResponse> {
        let response = request.send().await?;
        let status = response.status();
        let content_type = header_value(&response, CONTENT_TYPE);
        let location = header_value(&response, LOCATION);
        let body = response.bytes().await?;
        debug!(status = %status, bytes = body.len(), "Device response");

        let response = DeviceResponse {
            status,
            content_type,
            location,
            body,
        };
        validate::check_response(&response)?;
        Ok(response)
    }
}
