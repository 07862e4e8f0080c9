//! Hosted KV backend over its REST API
//!
//! Speaks the Upstash REST dialect used by Vercel KV:
//! - `GET  {url}/get/{key}`      → `{"result": "<json text>" | null}`
//! - `POST {url}/set/{key}`      body is the JSON text of the value
//! - `POST {url}/del/{key}`      → `{"result": <count>}`
//! - `GET  {url}/keys/{pattern}` → `{"result": ["key", ...]}`
//!
//! Every request carries `Authorization: Bearer <token>`. A reply carrying
//! `{"error": ...}` or a non-2xx status is a transport error. A 404 reads as
//! an absent key on `get` only; on writes and listings it is an error.

use super::KvBackend;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Reply envelope of the REST API
#[derive(Debug, Deserialize)]
struct RestReply<T> {
    result: Option<T>,
    error: Option<String>,
}

/// REST key-value client
pub struct RestKv {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for RestKv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestKv")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl RestKv {
    /// Create a client for the given endpoint
    ///
    /// `timeout` bounds every request; it is the only timeout on the article
    /// store's backend calls.
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create KV HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            client,
        })
    }

    /// Issue one command and unwrap the reply envelope
    ///
    /// `absent_on_404` turns a 404 into `Ok(None)` instead of an error.
    async fn command<T: DeserializeOwned>(
        &self,
        method: Method,
        command: &str,
        argument: &str,
        body: Option<String>,
        absent_on_404: bool,
    ) -> Result<Option<T>> {
        let url = format!(
            "{}/{}/{}",
            self.base_url,
            command,
            urlencoding::encode(argument)
        );

        let mut request = self.client.request(method, &url).bearer_auth(&self.token);
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("KV {} request for '{}' failed", command, argument))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            if absent_on_404 {
                return Ok(None);
            }
            bail!("KV {} for '{}' returned HTTP {}", command, argument, status);
        }

        let text = response
            .text()
            .await
            .with_context(|| format!("Failed to read KV {} reply", command))?;

        let reply: RestReply<T> = match serde_json::from_str(&text) {
            Ok(reply) => reply,
            Err(_) if !status.is_success() => {
                bail!("KV {} for '{}' returned HTTP {}", command, argument, status)
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Malformed KV {} reply", command));
            }
        };

        if let Some(error) = reply.error {
            bail!("KV {} for '{}' failed: {}", command, argument, error);
        }
        if !status.is_success() {
            bail!("KV {} for '{}' returned HTTP {}", command, argument, status);
        }

        Ok(reply.result)
    }
}

/// Values are stored as JSON text; anything that does not parse is kept as a
/// plain string.
fn decode_stored(value: Value) -> Value {
    match value {
        Value::String(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
        other => other,
    }
}

#[async_trait]
impl KvBackend for RestKv {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let value: Option<Value> = self.command(Method::GET, "get", key, None, true).await?;
        Ok(value.map(decode_stored))
    }

    async fn set(&self, key: &str, value: &Value) -> Result<()> {
        let body = serde_json::to_string(value).context("Failed to serialize KV value")?;
        let _: Option<Value> = self.command(Method::POST, "set", key, Some(body), false).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let _: Option<Value> = self.command(Method::POST, "del", key, None, false).await?;
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let keys: Option<Vec<String>> = self
            .command(Method::GET, "keys", pattern, None, false)
            .await?;
        Ok(keys.unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "rest"
    }
}
