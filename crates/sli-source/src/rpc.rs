use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sli_meta::{LedgerCloseMeta, LedgerMetaCodec};
use sli_types::Sequence;
use tracing::debug;

use crate::error::{SourceError, SourceResult};
use crate::traits::LedgerSource;

/// Public testnet endpoint used when no URL is configured.
///
/// Stock RPC servers return raw XDR in `metadataXdr`, which [`RpcSource`]
/// rejects as a protocol error. Point `rpc.url` at an endpoint that serves
/// `SLCM` frames, or ingest exported ledgers from a directory instead.
pub const DEFAULT_RPC_URL: &str = "https://soroban-testnet.stellar.org";

const JSONRPC_VERSION: &str = "2.0";
const INVALID_REQUEST: i64 = -32600;
const INVALID_PARAMS: i64 = -32602;
const INTERNAL_ERROR: i64 = -32603;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    pub url: String,
    /// Whole-request timeout applied by the HTTP client.
    pub request_timeout_ms: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_RPC_URL.into(),
            request_timeout_ms: 30_000,
        }
    }
}

#[derive(Serialize)]
struct RpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

#[derive(Deserialize)]
struct RpcResponse<R> {
    result: Option<R>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct LatestLedgerResult {
    sequence: Sequence,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GetLedgersParams {
    start_ledger: Sequence,
    pagination: Pagination,
}

#[derive(Serialize)]
struct Pagination {
    limit: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetLedgersResult {
    ledgers: Vec<LedgerInfo>,
    latest_ledger: Sequence,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LedgerInfo {
    sequence: Sequence,
    metadata_xdr: String,
}

/// JSON-RPC ledger source.
///
/// Speaks `getLatestLedger` and `getLedgers`; ledger metadata travels as a
/// base64-encoded `SLCM` frame in the `metadataXdr` field. Any other payload,
/// including the raw XDR a stock server sends, is a protocol error. The inner HTTP
/// client is a pooled handle, so one client can serve many sources.
pub struct RpcSource {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcSource {
    pub fn new(config: &RpcConfig) -> SourceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| SourceError::Unavailable(format!("http client: {e}")))?;
        Ok(Self::with_client(client, config.url.clone()))
    }

    /// Build on an existing client, sharing its connection pool.
    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<P, R>(&self, method: &str, params: P) -> SourceResult<Result<R, RpcErrorObject>>
    where
        P: Serialize + Send,
        R: DeserializeOwned + Send,
    {
        let request = RpcRequest {
            jsonrpc: JSONRPC_VERSION,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SourceError::Unavailable(format!("{method}: {e}")))?;

        let status = response.status();
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SourceError::Unavailable(format!("{method}: http status {status}")));
        }
        if !status.is_success() {
            return Err(SourceError::Protocol(format!("{method}: http status {status}")));
        }

        let body: RpcResponse<R> = response.json().await.map_err(|e| {
            if e.is_decode() {
                SourceError::Protocol(format!("{method}: malformed response: {e}"))
            } else {
                SourceError::Unavailable(format!("{method}: {e}"))
            }
        })?;

        match (body.result, body.error) {
            (_, Some(error)) => Ok(Err(error)),
            (Some(result), None) => Ok(Ok(result)),
            (None, None) => Err(SourceError::Protocol(format!(
                "{method}: response has neither result nor error"
            ))),
        }
    }

    fn decode_ledger(seq: Sequence, info: LedgerInfo) -> SourceResult<LedgerCloseMeta> {
        if info.sequence != seq {
            return Err(SourceError::Protocol(format!(
                "requested ledger {seq}, received {}",
                info.sequence
            )));
        }
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(info.metadata_xdr.as_bytes())
            .map_err(|e| SourceError::Protocol(format!("ledger {seq}: bad base64: {e}")))?;
        let meta = LedgerMetaCodec::decode(&bytes)?;
        if meta.sequence() != seq {
            return Err(SourceError::Protocol(format!(
                "ledger {seq}: metadata claims sequence {}",
                meta.sequence()
            )));
        }
        Ok(meta)
    }
}

#[async_trait]
impl LedgerSource for RpcSource {
    async fn latest_sequence(&self) -> SourceResult<Sequence> {
        match self
            .call::<_, LatestLedgerResult>("getLatestLedger", serde_json::json!({}))
            .await?
        {
            Ok(result) => Ok(result.sequence),
            Err(error) if error.code == INTERNAL_ERROR => Err(SourceError::Unavailable(format!(
                "getLatestLedger: {}",
                error.message
            ))),
            Err(error) => Err(SourceError::Protocol(format!(
                "getLatestLedger: code {}: {}",
                error.code, error.message
            ))),
        }
    }

    async fn fetch_by_sequence(&self, seq: Sequence) -> SourceResult<LedgerCloseMeta> {
        let params = GetLedgersParams {
            start_ledger: seq,
            pagination: Pagination { limit: 1 },
        };
        match self.call::<_, GetLedgersResult>("getLedgers", params).await? {
            Ok(page) => match page.ledgers.into_iter().next() {
                Some(info) => Self::decode_ledger(seq, info),
                None if seq > page.latest_ledger => Err(SourceError::NotFound(seq)),
                None => Err(SourceError::Protocol(format!(
                    "ledger {seq} missing from page ending at {}",
                    page.latest_ledger
                ))),
            },
            Err(error) if error.code == INVALID_REQUEST || error.code == INVALID_PARAMS => {
                // Range errors are also returned for ledgers that are simply not closed yet.
                let latest = self.latest_sequence().await?;
                debug!(seq, latest, code = error.code, message = %error.message, "getLedgers rejected");
                if seq > latest {
                    Err(SourceError::NotFound(seq))
                } else {
                    Err(SourceError::Protocol(format!("getLedgers: {}", error.message)))
                }
            }
            Err(error) if error.code == INTERNAL_ERROR => Err(SourceError::Unavailable(format!(
                "getLedgers: {}",
                error.message
            ))),
            Err(error) => Err(SourceError::Protocol(format!(
                "getLedgers: code {}: {}",
                error.code, error.message
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sli_meta::LedgerCloseMetaBuilder;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source(server: &MockServer) -> RpcSource {
        RpcSource::new(&RpcConfig {
            url: server.uri(),
            request_timeout_ms: 5_000,
        })
        .unwrap()
    }

    fn encoded_ledger(seq: Sequence) -> String {
        let meta = LedgerCloseMetaBuilder::new("rpc-net", seq).build().unwrap();
        base64::engine::general_purpose::STANDARD.encode(LedgerMetaCodec::encode(&meta).unwrap())
    }

    async fn mount_latest(server: &MockServer, seq: Sequence) {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "getLatestLedger" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": { "id": "abc", "protocolVersion": 22, "sequence": seq }
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn latest_sequence_reads_result() {
        let server = MockServer::start().await;
        mount_latest(&server, 1_907_183).await;
        assert_eq!(source(&server).latest_sequence().await.unwrap(), 1_907_183);
    }

    #[tokio::test]
    async fn fetch_decodes_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "method": "getLedgers",
                "params": { "startLedger": 42, "pagination": { "limit": 1 } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": {
                    "ledgers": [{ "sequence": 42, "metadataXdr": encoded_ledger(42) }],
                    "latestLedger": 50
                }
            })))
            .mount(&server)
            .await;

        let meta = source(&server).fetch_by_sequence(42).await.unwrap();
        assert_eq!(meta.sequence(), 42);
    }

    #[tokio::test]
    async fn range_error_past_frontier_is_not_found() {
        let server = MockServer::start().await;
        mount_latest(&server, 4_999).await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "getLedgers" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": -32600, "message": "start ledger must be between 1 and 4999" }
            })))
            .mount(&server)
            .await;

        assert_eq!(
            source(&server).fetch_by_sequence(5_000).await.unwrap_err(),
            SourceError::NotFound(5_000)
        );
    }

    #[tokio::test]
    async fn range_error_inside_window_is_protocol_error() {
        let server = MockServer::start().await;
        mount_latest(&server, 6_000).await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "getLedgers" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": -32602, "message": "ledger pruned" }
            })))
            .mount(&server)
            .await;

        assert!(matches!(
            source(&server).fetch_by_sequence(5_000).await,
            Err(SourceError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn empty_page_past_latest_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": { "ledgers": [], "latestLedger": 10 }
            })))
            .mount(&server)
            .await;

        assert_eq!(
            source(&server).fetch_by_sequence(11).await.unwrap_err(),
            SourceError::NotFound(11)
        );
    }

    #[tokio::test]
    async fn server_error_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        assert!(matches!(
            source(&server).fetch_by_sequence(1).await,
            Err(SourceError::Unavailable(_))
        ));
        assert!(matches!(
            source(&server).latest_sequence().await,
            Err(SourceError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn malformed_body_is_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        assert!(matches!(
            source(&server).latest_sequence().await,
            Err(SourceError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn bad_base64_is_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": {
                    "ledgers": [{ "sequence": 3, "metadataXdr": "%%%not-base64%%%" }],
                    "latestLedger": 3
                }
            })))
            .mount(&server)
            .await;

        assert!(matches!(
            source(&server).fetch_by_sequence(3).await,
            Err(SourceError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn raw_xdr_metadata_is_protocol_error() {
        let server = MockServer::start().await;
        let xdr = base64::engine::general_purpose::STANDARD.encode([0u8, 0, 0, 1].repeat(16));
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": {
                    "ledgers": [{ "sequence": 3, "metadataXdr": xdr }],
                    "latestLedger": 3
                }
            })))
            .mount(&server)
            .await;

        match source(&server).fetch_by_sequence(3).await {
            Err(SourceError::Protocol(message)) => assert!(message.contains("SLCM"), "{message}"),
            other => panic!("expected protocol error, got {other:?}"),
        }
    }

    #[test]
    fn default_config_targets_default_url() {
        assert_eq!(RpcConfig::default().url, DEFAULT_RPC_URL);
    }

    #[tokio::test]
    async fn unreachable_server_is_unavailable() {
        let source = RpcSource::new(&RpcConfig {
            url: "http://127.0.0.1:9".into(),
            request_timeout_ms: 1_000,
        })
        .unwrap();
        assert!(matches!(
            source.latest_sequence().await,
            Err(SourceError::Unavailable(_))
        ));
    }
}
