// src/wordpost/image.rs
//! Image synthesis through a hosted Gradio Space.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};

use crate::notify::Image;

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Image>;
    fn name(&self) -> &'static str;
}

/// `POST {base}/run/predict` on a Hugging Face Space.
pub struct GradioSpaceImage {
    client: reqwest::Client,
    base_url: String,
}

impl GradioSpaceImage {
    /// `space` is the Space subdomain, e.g. `someone-x-bot-image`.
    pub fn new(client: reqwest::Client, space: &str) -> Self {
        Self {
            client,
            base_url: format!("https://{}.hf.space", space.trim()),
        }
    }

    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base_url = base.into().trim_end_matches('/').to_string();
        self
    }

    async fn download(&self, url: &str) -> Result<Image> {
        let rsp = self
            .client
            .get(url)
            .send()
            .await
            .context("gradio file download")?
            .error_for_status()
            .context("gradio file download non-2xx")?;
        let mime = rsp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .filter(|m| m.starts_with("image/"))
            .unwrap_or_else(|| "image/png".to_string());
        let bytes = rsp.bytes().await.context("gradio file body")?;
        Ok(Image {
            bytes: bytes.to_vec(),
            mime,
        })
    }
}

#[async_trait]
impl ImageGenerator for GradioSpaceImage {
    async fn generate(&self, prompt: &str) -> Result<Image> {
        let body: Value = self
            .client
            .post(format!("{}/run/predict", self.base_url))
            .json(&json!({ "data": [prompt] }))
            .send()
            .await
            .context("gradio predict")?
            .error_for_status()
            .context("gradio predict non-2xx")?
            .json()
            .await
            .context("gradio predict json")?;

        let first = body
            .get("data")
            .and_then(Value::as_array)
            .and_then(|d| d.first())
            .ok_or_else(|| anyhow!("gradio reply has no data"))?;

        match first {
            Value::String(s) => decode_image_payload(s),
            Value::Array(items) => match items.first() {
                Some(Value::String(s)) => decode_image_payload(s),
                _ => bail!("unexpected gradio output: {first}"),
            },
            Value::Object(obj) => {
                let url = obj
                    .get("url")
                    .and_then(Value::as_str)
                    .ok_or_else(|| anyhow!("gradio file object has no url"))?;
                self.download(url).await
            }
            other => bail!("unexpected gradio output: {other}"),
        }
    }

    fn name(&self) -> &'static str {
        "gradio"
    }
}

/// Decode `data:image/png;base64,...` or a bare base64 string.
/// Missing `=` padding is repaired before decoding.
pub fn decode_image_payload(s: &str) -> Result<Image> {
    let (mime, b64) = match s.strip_prefix("data:") {
        Some(rest) => {
            let (header, data) = rest
                .split_once(',')
                .ok_or_else(|| anyhow!("data URI without payload"))?;
            let mime = header.split(';').next().unwrap_or_default();
            let mime = if mime.is_empty() { "image/png" } else { mime };
            (mime.to_string(), data)
        }
        None => ("image/png".to_string(), s),
    };

    let mut cleaned: String = b64.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        bail!("empty image payload");
    }
    let pad = (4 - cleaned.len() % 4) % 4;
    cleaned.extend(std::iter::repeat('=').take(pad));

    let bytes = STANDARD.decode(&cleaned).context("image payload is not base64")?;
    Ok(Image { bytes, mime })
}
