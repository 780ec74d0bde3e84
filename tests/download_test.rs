//! Integration tests for `/download/{id}` against a fake chunk-store gateway.

mod common;

use common::{
    gateway_requests, parse_multipart, reference_file, ChunkGateway, RangeHandling, TestHarness,
    MIB,
};
use serde_json::Value;
use wiremock::MockServer;

const THREE_MIB: usize = 3 * MIB as usize;

struct Fixture {
    gateway: MockServer,
    harness: TestHarness,
    file: Vec<u8>,
    job: sc_core::JobId,
}

async fn fixture(size: usize, chunk_size: u64, handling: RangeHandling) -> Fixture {
    let file = reference_file(size);
    let gateway = MockServer::start().await;
    let (responder, ids) = ChunkGateway::from_file(&file, chunk_size, handling);
    responder.mount(&gateway).await;

    let harness = TestHarness::with_gateway(&gateway, chunk_size).await;
    let job = harness.seed_job("h264", size as u64, ids);
    Fixture {
        gateway,
        harness,
        file,
        job,
    }
}

fn header<'a>(response: &'a reqwest::Response, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

#[tokio::test]
async fn first_byte_of_three_chunk_file() {
    let f = fixture(THREE_MIB, MIB, RangeHandling::Honour).await;

    let response = f.harness.get(f.job, Some("bytes=0-0")).await;
    assert_eq!(response.status(), 206);
    assert_eq!(header(&response, "content-range"), Some("bytes 0-0/3145728"));
    assert_eq!(header(&response, "content-length"), Some("1"));
    assert_eq!(header(&response, "content-type"), Some("video/mp4"));
    assert_eq!(header(&response, "accept-ranges"), Some("bytes, rawchunk"));

    let body = response.bytes().await.unwrap();
    assert_eq!(&body[..], &f.file[0..1]);

    let requests = gateway_requests(&f.gateway).await;
    assert_eq!(requests, vec![("cid-0".to_string(), Some("bytes=0-0".to_string()))]);
}

#[tokio::test]
async fn range_straddling_a_chunk_boundary() {
    let f = fixture(THREE_MIB, MIB, RangeHandling::Honour).await;

    let response = f.harness.get(f.job, Some("bytes=1048570-1048580")).await;
    assert_eq!(response.status(), 206);
    assert_eq!(header(&response, "content-length"), Some("11"));
    assert_eq!(
        header(&response, "content-range"),
        Some("bytes 1048570-1048580/3145728")
    );
    let body = response.bytes().await.unwrap();
    assert_eq!(&body[..], &f.file[1048570..=1048580]);

    let mut requests = gateway_requests(&f.gateway).await;
    requests.sort();
    assert_eq!(
        requests,
        vec![
            ("cid-0".to_string(), Some("bytes=1048570-1048575".to_string())),
            ("cid-1".to_string(), Some("bytes=0-4".to_string())),
        ]
    );
}

#[tokio::test]
async fn suffix_range_serves_the_tail() {
    let f = fixture(THREE_MIB, MIB, RangeHandling::Honour).await;

    let response = f.harness.get(f.job, Some("bytes=-100")).await;
    assert_eq!(response.status(), 206);
    assert_eq!(
        header(&response, "content-range"),
        Some("bytes 3145628-3145727/3145728")
    );
    let body = response.bytes().await.unwrap();
    assert_eq!(&body[..], &f.file[3145628..]);
}

#[tokio::test]
async fn two_ranges_make_a_multipart_response() {
    let f = fixture(THREE_MIB, MIB, RangeHandling::Honour).await;

    let response = f.harness.get(f.job, Some("bytes=0-9,100-109")).await;
    assert_eq!(response.status(), 206);
    let content_type = header(&response, "content-type").unwrap().to_string();
    let boundary = content_type
        .strip_prefix("multipart/byteranges; boundary=")
        .expect("multipart content type")
        .to_string();
    let declared: usize = header(&response, "content-length").unwrap().parse().unwrap();

    let body = response.bytes().await.unwrap();
    assert_eq!(body.len(), declared);

    let parts = parse_multipart(&body, &boundary);
    assert_eq!(parts.len(), 2);
    assert!(parts[0].0.contains("Content-Range: bytes 0-9/3145728"));
    assert!(parts[0].0.contains("Content-Type: video/mp4"));
    assert_eq!(parts[0].1, f.file[0..10]);
    assert!(parts[1].0.contains("Content-Range: bytes 100-109/3145728"));
    assert_eq!(parts[1].1, f.file[100..110]);
}

#[tokio::test]
async fn multipart_parts_follow_request_order() {
    let f = fixture(4096, 512, RangeHandling::Honour).await;

    let response = f.harness.get(f.job, Some("bytes=3000-3099, 10-19, -5")).await;
    let content_type = header(&response, "content-type").unwrap().to_string();
    let boundary = content_type.split("boundary=").nth(1).unwrap().to_string();
    let body = response.bytes().await.unwrap();

    let parts = parse_multipart(&body, &boundary);
    assert_eq!(parts.len(), 3);
    assert!(parts[0].0.contains("bytes 3000-3099/4096"));
    assert_eq!(parts[0].1, f.file[3000..3100]);
    assert!(parts[1].0.contains("bytes 10-19/4096"));
    assert_eq!(parts[1].1, f.file[10..20]);
    assert!(parts[2].0.contains("bytes 4091-4095/4096"));
    assert_eq!(parts[2].1, f.file[4091..]);
}

#[tokio::test]
async fn missing_chunk_identifiers_fail_before_any_fetch() {
    let file = reference_file(THREE_MIB);
    let gateway = MockServer::start().await;
    let (responder, mut ids) = ChunkGateway::from_file(&file, MIB, RangeHandling::Honour);
    responder.mount(&gateway).await;
    ids.truncate(2);

    let harness = TestHarness::with_gateway(&gateway, MIB).await;
    let job = harness.seed_job("h264", THREE_MIB as u64, ids);

    let response = harness.get(job, Some("bytes=0-0")).await;
    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "data_consistency_error");
    assert!(gateway_requests(&gateway).await.is_empty());
}

#[tokio::test]
async fn no_range_streams_the_whole_file() {
    let f = fixture(5000, 1024, RangeHandling::Honour).await;

    let response = f.harness.get(f.job, None).await;
    assert_eq!(response.status(), 200);
    assert_eq!(header(&response, "content-length"), Some("5000"));
    assert!(header(&response, "content-range").is_none());
    let body = response.bytes().await.unwrap();
    assert_eq!(&body[..], &f.file[..]);

    // Whole chunks carry no Range header.
    let requests = gateway_requests(&f.gateway).await;
    assert_eq!(requests.len(), 5);
    assert!(requests.iter().all(|(_, range)| range.is_none()));
}

#[tokio::test]
async fn open_range_from_zero_is_served_as_whole_file() {
    let f = fixture(5000, 1024, RangeHandling::Honour).await;

    let response = f.harness.get(f.job, Some("bytes=0-")).await;
    assert_eq!(response.status(), 200);
    assert!(header(&response, "content-range").is_none());
    assert_eq!(response.bytes().await.unwrap().len(), 5000);
}

#[tokio::test]
async fn end_past_the_file_is_clamped() {
    let f = fixture(5000, 1024, RangeHandling::Honour).await;

    let response = f.harness.get(f.job, Some("bytes=4990-999999")).await;
    assert_eq!(response.status(), 206);
    assert_eq!(header(&response, "content-range"), Some("bytes 4990-4999/5000"));
    assert_eq!(&response.bytes().await.unwrap()[..], &f.file[4990..]);
}

#[tokio::test]
async fn rawchunk_unit_addresses_whole_chunks() {
    let f = fixture(5000, 1024, RangeHandling::Honour).await;

    let response = f.harness.get(f.job, Some("rawchunk=3-")).await;
    assert_eq!(response.status(), 206);
    assert_eq!(header(&response, "content-range"), Some("rawchunk 3-4/5"));
    assert_eq!(header(&response, "content-length"), Some("1928"));
    assert_eq!(&response.bytes().await.unwrap()[..], &f.file[3072..]);
}

#[tokio::test]
async fn gateway_ignoring_sub_ranges_still_serves_exact_bytes() {
    let f = fixture(4096, 1000, RangeHandling::Ignore).await;

    let response = f.harness.get(f.job, Some("bytes=995-2004")).await;
    assert_eq!(response.status(), 206);
    assert_eq!(&response.bytes().await.unwrap()[..], &f.file[995..=2004]);
}

#[tokio::test]
async fn head_reports_size_without_touching_the_gateway() {
    let f = fixture(5000, 1024, RangeHandling::Honour).await;

    let response = f
        .harness
        .client
        .head(f.harness.download_url(f.job))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(header(&response, "content-length"), Some("5000"));
    assert_eq!(header(&response, "content-type"), Some("video/mp4"));
    assert!(gateway_requests(&f.gateway).await.is_empty());
}

#[tokio::test]
async fn codec_picks_the_content_type() {
    let file = reference_file(100);
    let gateway = MockServer::start().await;
    let (responder, ids) = ChunkGateway::from_file(&file, 64, RangeHandling::Honour);
    responder.mount(&gateway).await;
    let harness = TestHarness::with_gateway(&gateway, 64).await;

    let vp9 = harness.seed_job("vp9", 100, ids.clone());
    let other = harness.seed_job("av1", 100, ids);

    let response = harness.get(vp9, Some("bytes=0-1")).await;
    assert_eq!(header(&response, "content-type"), Some("video/webm"));
    let response = harness.get(other, Some("bytes=0-1")).await;
    assert_eq!(header(&response, "content-type"), Some("application/octet-stream"));
}

#[tokio::test]
async fn unknown_and_unfinished_jobs_are_404() {
    let f = fixture(100, 64, RangeHandling::Honour).await;

    let response = f.harness.get(sc_core::JobId::new(9999), None).await;
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "not_found");

    let unfinished = f.harness.seed_unfinished_job("h264");
    let response = f.harness.get(unfinished, None).await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn request_errors_are_400() {
    let f = fixture(100, 64, RangeHandling::Honour).await;

    for range in ["bytes=100-", "bytes=-0", "bytes=9-3", "pages=0-1", "bytes=x-y"] {
        let response = f.harness.get(f.job, Some(range)).await;
        assert_eq!(response.status(), 400, "{range}");
        let body: Value = response.json().await.unwrap();
        assert!(body["error"].is_string());
    }

    let too_many = (0..17).map(|i| format!("{i}-{i}")).collect::<Vec<_>>().join(",");
    let response = f.harness.get(f.job, Some(&format!("bytes={too_many}"))).await;
    assert_eq!(response.status(), 400);

    let response = f.harness.client.get(f.harness.url("/download/abc")).send().await.unwrap();
    assert_eq!(response.status(), 400);
    let response = f.harness.client.get(f.harness.url("/download/")).send().await.unwrap();
    assert_eq!(response.status(), 400);

    assert!(gateway_requests(&f.gateway).await.is_empty());
}

#[tokio::test]
async fn error_body_carries_request_id() {
    let f = fixture(100, 64, RangeHandling::Honour).await;

    let response = f
        .harness
        .client
        .get(f.harness.url("/download/abc"))
        .header("x-request-id", "req-42")
        .send()
        .await
        .unwrap();
    assert_eq!(header(&response, "x-request-id"), Some("req-42"));
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["request_id"], "req-42");
}

#[tokio::test]
async fn unreachable_first_chunk_is_502() {
    let file = reference_file(3000);
    let gateway = MockServer::start().await;
    let (responder, ids) = ChunkGateway::from_file(&file, 1000, RangeHandling::Honour);
    responder.failing("cid-0").mount(&gateway).await;
    let harness = TestHarness::with_gateway(&gateway, 1000).await;
    let job = harness.seed_job("h264", 3000, ids);

    let response = harness.get(job, None).await;
    assert_eq!(response.status(), 502);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "upstream_error");
}

#[tokio::test]
async fn failure_after_first_chunk_aborts_the_body() {
    let file = reference_file(3000);
    let gateway = MockServer::start().await;
    let (responder, ids) = ChunkGateway::from_file(&file, 1000, RangeHandling::Honour);
    responder.failing("cid-2").mount(&gateway).await;
    let harness = TestHarness::with_gateway(&gateway, 1000).await;
    let job = harness.seed_job("h264", 3000, ids);

    let response = harness.get(job, None).await;
    assert_eq!(response.status(), 200);
    assert_eq!(header(&response, "content-length"), Some("3000"));
    // The connection closes before the declared length is reached.
    assert!(response.bytes().await.is_err());
}

#[tokio::test]
async fn health_endpoint() {
    let f = fixture(10, 10, RangeHandling::Honour).await;
    let response = f.harness.client.get(f.harness.url("/health")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
}
