//! The gateway client and its per-call option types.

use futures_util::StreamExt;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use ring_types::{DomainId, DomainView, MembershipView, OperationResultList, Queried};

use crate::error::GatewayError;

/// Pause between put resubmissions.
const RETRY_PAUSE: Duration = Duration::from_secs(1);

/// Gateway client configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL for the monitoring gateway.
    pub base_url: String,
}

impl GatewayConfig {
    /// Configuration for a gateway reachable at `host` (e.g. `localhost:15000`).
    pub fn for_host(host: &str) -> Self {
        Self {
            base_url: format!("http://{host}"),
        }
    }
}

/// Options for domain creation.
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    /// Use the alternate key-cache strategy for this domain.
    pub keycache: bool,
    /// Implementation-specific flags, forwarded verbatim as query params.
    pub extra: Vec<(String, String)>,
}

impl CreateOptions {
    /// Enable the alternate key-cache strategy.
    pub fn keycache(mut self) -> Self {
        self.keycache = true;
        self
    }

    /// Forward an implementation-specific flag verbatim.
    pub fn flag(mut self, key: &str, value: &str) -> Self {
        self.extra.push((key.into(), value.into()));
        self
    }
}

/// Options for a put.
#[derive(Debug, Clone, Copy, Default)]
pub struct PutOptions {
    /// Bounded resubmit count on transient failure.
    pub retries: u32,
    /// Log the reply at debug level. No behavioral effect.
    pub verbose: bool,
}

impl PutOptions {
    /// Allow up to `n` resubmissions on transient failure.
    pub fn retries(n: u32) -> Self {
        Self {
            retries: n,
            verbose: false,
        }
    }
}

/// Options for a get.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetOptions {
    /// Expect exactly one value; anything else is an error.
    pub single: bool,
}

/// Client for the ring monitoring gateway.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    config: GatewayConfig,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct CreateReply {
    node: String,
    id: String,
}

impl GatewayClient {
    /// Create a new gateway client.
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn create_path(name: &str, nrepl: usize, options: &CreateOptions) -> String {
        let mut path = format!("/mon/data/{name}?create&nrepl={nrepl}");
        if options.keycache {
            path.push_str("&keycache");
        }
        for (key, value) in &options.extra {
            path.push_str(&format!("&{key}={value}"));
        }
        path
    }

    fn domain_path(id: &DomainId) -> String {
        format!("/mon/domains/domain?id=0x{id}")
    }

    // ========================================================================
    // Generic call
    // ========================================================================

    /// Issue a generic gateway call: GET without a body, POST with one.
    ///
    /// Returns the raw status code and payload; the typed methods below are
    /// built on this.
    pub async fn request(
        &self,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<(u16, String), GatewayError> {
        let url = self.url(path);
        let response = match body {
            Some(bytes) => self.http.post(&url).body(bytes).send().await?,
            None => self.http.get(&url).send().await?,
        };
        let code = response.status().as_u16();
        let payload = response.text().await.unwrap_or_default();
        Ok((code, payload))
    }

    // ========================================================================
    // Monitoring surface
    // ========================================================================

    /// Clear the ring membership registry.
    pub async fn reset_ring(&self) -> Result<(), GatewayError> {
        self.reset("/mon/ring/reset").await
    }

    /// Clear the domain registry.
    pub async fn reset_domains(&self) -> Result<(), GatewayError> {
        self.reset("/mon/domains/reset").await
    }

    async fn reset(&self, path: &str) -> Result<(), GatewayError> {
        let (code, payload) = self.request(path, Some(Vec::new())).await?;
        if !success(code) {
            return Err(GatewayError::Protocol { code, payload });
        }
        Ok(())
    }

    /// List ring membership.
    pub async fn membership(&self) -> Result<Queried<MembershipView>, GatewayError> {
        self.query("/mon/ring/nodes").await
    }

    /// Look up the status of one domain by id.
    pub async fn domain_status(
        &self,
        id: &DomainId,
    ) -> Result<Queried<DomainView>, GatewayError> {
        self.query(&Self::domain_path(id)).await
    }

    /// Issue a generic operation and interpret the reply as per-node results.
    pub async fn operation_results(
        &self,
        path: &str,
    ) -> Result<Queried<OperationResultList>, GatewayError> {
        self.query(path).await
    }

    async fn query<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Queried<T>, GatewayError> {
        let (code, payload) = self.request(path, None).await?;
        if !success(code) {
            return Ok(Queried::Unavailable(code));
        }
        let view = serde_json::from_str(&payload)
            .map_err(|e| GatewayError::UnexpectedPayload(format!("{path}: {e}")))?;
        Ok(Queried::Ready(view))
    }

    // ========================================================================
    // Data path
    // ========================================================================

    /// Create a domain with the given replication factor.
    ///
    /// Returns the owner node ref and the domain id.
    pub async fn create(
        &self,
        name: &str,
        nrepl: usize,
        options: &CreateOptions,
    ) -> Result<(String, DomainId), GatewayError> {
        let path = Self::create_path(name, nrepl, options);
        let (code, payload) = self.request(&path, Some(Vec::new())).await?;
        if !success(code) {
            return Err(GatewayError::Protocol { code, payload });
        }
        let reply: CreateReply = serde_json::from_str(&payload)
            .map_err(|e| GatewayError::UnexpectedPayload(format!("create {name}: {e}")))?;
        let id: DomainId = reply
            .id
            .parse()
            .map_err(|e| GatewayError::UnexpectedPayload(format!("create {name}: {e}")))?;
        debug!(domain = name, id = %id, owner = %reply.node, "domain created");
        Ok((reply.node, id))
    }

    /// Put one value under `key` in `domain`.
    ///
    /// The ring appends: putting an existing key again adds another value.
    /// With `options.retries`, transient failures are resubmitted at a fixed
    /// cadence up to the bound.
    pub async fn put(
        &self,
        domain: &str,
        key: &str,
        value: &[u8],
        options: &PutOptions,
    ) -> Result<(), GatewayError> {
        let path = format!("/mon/data/{domain}/{key}");
        let mut attempt = 0u32;
        loop {
            match self.request(&path, Some(value.to_vec())).await {
                Ok((code, payload)) if success(code) => {
                    if options.verbose {
                        debug!(domain, key, code, payload = %payload, "put acknowledged");
                    }
                    return Ok(());
                }
                Ok((code, payload)) if attempt >= options.retries => {
                    return Err(GatewayError::Protocol { code, payload });
                }
                Err(e) if attempt >= options.retries || !e.is_transient() => return Err(e),
                other => {
                    attempt += 1;
                    debug!(domain, key, attempt, ?other, "put retrying");
                    tokio::time::sleep(RETRY_PAUSE).await;
                }
            }
        }
    }

    /// Get every value stored under `key` in `domain`.
    ///
    /// Values arrive newline-delimited, in put order. With `options.single`,
    /// exactly one value is expected.
    pub async fn get(
        &self,
        domain: &str,
        key: &str,
        options: &GetOptions,
    ) -> Result<Vec<String>, GatewayError> {
        let path = format!("/mon/data/{domain}/{key}");
        let (code, payload) = self.request(&path, None).await?;
        if !success(code) {
            return Err(GatewayError::Protocol { code, payload });
        }
        let values: Vec<String> = payload.lines().map(str::to_owned).collect();
        if options.single && values.len() != 1 {
            return Err(GatewayError::SingleValueExpected {
                found: values.len(),
            });
        }
        Ok(values)
    }

    /// Stream every value stored under `key` in `domain` through `each`,
    /// without materializing the full list.
    ///
    /// Returns the number of values consumed.
    pub async fn get_each<F>(
        &self,
        domain: &str,
        key: &str,
        mut each: F,
    ) -> Result<u64, GatewayError>
    where
        F: FnMut(String),
    {
        let url = self.url(&format!("/mon/data/{domain}/{key}"));
        let response = self.http.get(&url).send().await?;
        let code = response.status().as_u16();
        if !success(code) {
            let payload = response.text().await.unwrap_or_default();
            return Err(GatewayError::Protocol { code, payload });
        }

        let mut lines = LineBuffer::default();
        let mut count = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            lines.push(&chunk?, |value| {
                each(value);
                count += 1;
            });
        }
        lines.finish(|value| {
            each(value);
            count += 1;
        });
        Ok(count)
    }
}

fn success(code: u16) -> bool {
    (200..300).contains(&code)
}

/// Reassembles newline-delimited values from arbitrary chunk boundaries.
#[derive(Default)]
struct LineBuffer {
    partial: Vec<u8>,
}

impl LineBuffer {
    fn push<F: FnMut(String)>(&mut self, chunk: &[u8], mut emit: F) {
        self.partial.extend_from_slice(chunk);
        while let Some(pos) = self.partial.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.partial.drain(..=pos).collect();
            let line = &line[..line.len() - 1];
            if !line.is_empty() {
                emit(String::from_utf8_lossy(line).into_owned());
            }
        }
    }

    fn finish<F: FnMut(String)>(&mut self, mut emit: F) {
        if !self.partial.is_empty() {
            emit(String::from_utf8_lossy(&self.partial).into_owned());
            self.partial.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builds_base_url() {
        let config = GatewayConfig::for_host("localhost:15000");
        assert_eq!(config.base_url, "http://localhost:15000");
    }

    #[test]
    fn create_path_plain() {
        let path = GatewayClient::create_path("accounts", 5, &CreateOptions::default());
        assert_eq!(path, "/mon/data/accounts?create&nrepl=5");
    }

    #[test]
    fn create_path_with_options() {
        let options = CreateOptions::default().keycache().flag("chunk", "0");
        let path = GatewayClient::create_path("accounts", 2, &options);
        assert_eq!(path, "/mon/data/accounts?create&nrepl=2&keycache&chunk=0");
    }

    #[test]
    fn domain_path_is_hex_prefixed() {
        let id = DomainId::derive("accounts", 0);
        let path = GatewayClient::domain_path(&id);
        assert_eq!(path, format!("/mon/domains/domain?id=0x{id}"));
    }

    #[test]
    fn line_buffer_reassembles_split_chunks() {
        let mut lines = LineBuffer::default();
        let mut seen = Vec::new();
        lines.push(b"value-0\nval", |v| seen.push(v));
        lines.push(b"ue-1\nvalue-2", |v| seen.push(v));
        lines.finish(|v| seen.push(v));
        assert_eq!(seen, vec!["value-0", "value-1", "value-2"]);
    }

    #[test]
    fn line_buffer_skips_blank_lines() {
        let mut lines = LineBuffer::default();
        let mut seen = Vec::new();
        lines.push(b"a\n\nb\n", |v| seen.push(v));
        lines.finish(|v| seen.push(v));
        assert_eq!(seen, vec!["a", "b"]);
    }

    #[test]
    fn client_is_cheap_to_clone() {
        let client = GatewayClient::new(GatewayConfig::for_host("localhost:15000"));
        let cloned = client.clone();
        assert_eq!(client.base_url(), cloned.base_url());
    }
}
