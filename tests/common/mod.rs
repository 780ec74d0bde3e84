//! Shared test harness for integration tests.
//!
//! [`TestHarness`] builds an in-memory DB and a full [`AppContext`] around a
//! chunk fetcher, then starts the server on a random port. [`ChunkGateway`]
//! is a wiremock responder that plays the content-addressable store.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use sc_core::config::{Config, GatewayConfig};
use sc_core::{AssembledData, JobId};
use sc_db::pool::{init_memory_pool, DbPool};
use sc_server::context::AppContext;
use sc_stream::{ChunkFetcher, GatewayFetcher};
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Chunk size of a real deployment.
pub const MIB: u64 = 1_048_576;

/// Deterministic file contents where every byte depends on its offset.
pub fn reference_file(size: usize) -> Vec<u8> {
    (0..size).map(|i| ((i * 31 + i / 251) % 256) as u8).collect()
}

/// Test harness wrapping a running server backed by an in-memory database.
pub struct TestHarness {
    pub ctx: AppContext,
    pub db: DbPool,
    pub addr: SocketAddr,
    pub client: reqwest::Client,
}

impl TestHarness {
    /// Start a server reading chunks from `fetcher`.
    pub async fn start(config: Config, fetcher: Arc<dyn ChunkFetcher>) -> Self {
        let db = init_memory_pool().expect("failed to create in-memory pool");
        let ctx = AppContext::new(db.clone(), config, fetcher);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        let serve_ctx = ctx.clone();
        tokio::spawn(async move {
            sc_server::serve(listener, serve_ctx).await.ok();
        });

        Self {
            ctx,
            db,
            addr,
            client: reqwest::Client::new(),
        }
    }

    /// Start a server whose gateway is `gateway`, with the given chunk size.
    pub async fn with_gateway(gateway: &MockServer, chunk_size: u64) -> Self {
        let mut config = Config::default();
        config.streaming.chunk_size = chunk_size;
        config.gateway = GatewayConfig {
            url: gateway.uri(),
            ..GatewayConfig::default()
        };
        let fetcher = Arc::new(GatewayFetcher::new(&config.gateway));
        Self::start(config, fetcher).await
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn download_url(&self, id: JobId) -> String {
        self.url(&format!("/download/{id}"))
    }

    /// Insert a finished job whose output is `size` bytes in `chunk_ids`.
    pub fn seed_job(&self, codec: &str, size: u64, chunk_ids: Vec<String>) -> JobId {
        let conn = sc_db::pool::get_conn(&self.db).expect("failed to get db connection");
        let job = sc_db::queries::jobs::create_job(&conn, codec, None, chunk_ids.len() as i64)
            .expect("create job");
        let data = AssembledData {
            size,
            chunk: chunk_ids,
        };
        sc_db::queries::jobs::set_assembled_data(&conn, job.id, &data).expect("store assembly");
        job.id
    }

    /// Insert a job that has not finished yet.
    pub fn seed_unfinished_job(&self, codec: &str) -> JobId {
        let conn = sc_db::pool::get_conn(&self.db).expect("failed to get db connection");
        sc_db::queries::jobs::create_job(&conn, codec, None, 1)
            .expect("create job")
            .id
    }

    pub async fn get(&self, id: JobId, range: Option<&str>) -> reqwest::Response {
        let mut request = self.client.get(self.download_url(id));
        if let Some(r) = range {
            request = request.header("range", r);
        }
        request.send().await.expect("request failed")
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        self.ctx.shutdown.cancel();
    }
}

/// How the fake gateway treats a forwarded `Range` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeHandling {
    /// Answer 206 with only the requested bytes.
    Honour,
    /// Answer 200 with the whole chunk.
    Ignore,
}

/// wiremock responder serving chunks at `/ipfs/{cid}`.
pub struct ChunkGateway {
    chunks: HashMap<String, Bytes>,
    handling: RangeHandling,
    failing: Vec<String>,
}

impl ChunkGateway {
    /// Split `file` into chunks named `cid-{index}`; returns the responder
    /// and the ordered identifiers.
    pub fn from_file(file: &[u8], chunk_size: u64, handling: RangeHandling) -> (Self, Vec<String>) {
        let mut chunks = HashMap::new();
        let mut ids = Vec::new();
        for (i, piece) in file.chunks(chunk_size as usize).enumerate() {
            let cid = format!("cid-{i}");
            chunks.insert(cid.clone(), Bytes::copy_from_slice(piece));
            ids.push(cid);
        }
        (
            Self {
                chunks,
                handling,
                failing: Vec::new(),
            },
            ids,
        )
    }

    /// Answer 500 for `cid`.
    pub fn failing(mut self, cid: &str) -> Self {
        self.failing.push(cid.to_string());
        self
    }

    pub async fn mount(self, server: &MockServer) {
        Mock::given(method("GET"))
            .and(path_regex(r"^/ipfs/[^/]+$"))
            .respond_with(self)
            .mount(server)
            .await;
    }
}

impl Respond for ChunkGateway {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let cid = request.url.path().trim_start_matches("/ipfs/");
        if self.failing.iter().any(|f| f == cid) {
            return ResponseTemplate::new(500);
        }
        let Some(chunk) = self.chunks.get(cid) else {
            return ResponseTemplate::new(404);
        };

        let range = request
            .headers
            .get("range")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("bytes="))
            .and_then(|v| v.split_once('-'))
            .and_then(|(s, e)| Some((s.parse::<usize>().ok()?, e.parse::<usize>().ok()?)));

        match (range, self.handling) {
            (Some((start, end)), RangeHandling::Honour) => {
                if start >= chunk.len() {
                    return ResponseTemplate::new(416);
                }
                let end = end.min(chunk.len() - 1);
                ResponseTemplate::new(206)
                    .insert_header("content-range", format!("bytes {start}-{end}/{}", chunk.len()).as_str())
                    .set_body_bytes(chunk[start..=end].to_vec())
            }
            _ => ResponseTemplate::new(200).set_body_bytes(chunk.to_vec()),
        }
    }
}

/// Range headers the gateway received, in arrival order, as `(cid, range)`.
pub async fn gateway_requests(server: &MockServer) -> Vec<(String, Option<String>)> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| {
            (
                r.url.path().trim_start_matches("/ipfs/").to_string(),
                r.headers
                    .get("range")
                    .and_then(|v| v.to_str().ok())
                    .map(String::from),
            )
        })
        .collect()
}

/// Split a `multipart/byteranges` body into `(headers, data)` parts.
pub fn parse_multipart(body: &[u8], boundary: &str) -> Vec<(String, Vec<u8>)> {
    let delimiter = format!("--{boundary}");
    let closing = format!("\r\n--{boundary}--\r\n");
    assert!(
        body.ends_with(closing.as_bytes()),
        "body does not end with the closing delimiter"
    );
    let body = &body[..body.len() - closing.len()];

    let mut parts = Vec::new();
    let mut rest = body;
    let separator = format!("\r\n{delimiter}\r\n");
    let first = format!("{delimiter}\r\n");
    assert!(rest.starts_with(first.as_bytes()));
    rest = &rest[first.len()..];

    loop {
        let header_end = find(rest, b"\r\n\r\n").expect("part headers end");
        let headers = String::from_utf8_lossy(&rest[..header_end]).to_string();
        rest = &rest[header_end + 4..];
        match find(rest, separator.as_bytes()) {
            Some(at) => {
                parts.push((headers, rest[..at].to_vec()));
                rest = &rest[at + separator.len()..];
            }
            None => {
                parts.push((headers, rest.to_vec()));
                break;
            }
        }
    }
    parts
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
