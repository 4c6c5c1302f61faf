//! Offline end-to-end tests for the scanpress pipeline.
//!
//! These tests build real PDFs with lopdf and point the digitization
//! client at a loopback HTTP stub, so the whole pipeline — split, upload,
//! persist, merge, segment — runs without touching any external service.
//! The generation passes are disabled (no LLM in CI).

use lopdf::{dictionary, Document, Object, Stream};
use scanpress::{PipelineConfig, ScanpressError, SectionCatalog};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Build a PDF with `page_count` pages, each carrying a `(page N)` content
/// marker.
fn build_pdf(page_count: usize) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::new();
    for n in 1..=page_count {
        let content = Stream::new(dictionary! {}, format!("BT (page {n}) Tj ET").into_bytes());
        let content_id = doc.add_object(content);
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

fn save_pdf(doc: &mut Document, dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    doc.save(&path).unwrap();
    path
}

/// Read one full HTTP request (headers, then content-length body bytes) so
/// the client is never mid-write when the response goes out.
async fn read_request(socket: &mut tokio::net::TcpStream) {
    let mut data = Vec::new();
    let mut buf = [0u8; 16384];
    let header_end = loop {
        let Ok(n) = socket.read(&mut buf).await else {
            return;
        };
        if n == 0 {
            return;
        }
        data.extend_from_slice(&buf[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };
    let headers = String::from_utf8_lossy(&data[..header_end]).to_lowercase();
    let content_length: usize = headers
        .lines()
        .find_map(|l| l.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0);
    while data.len() < header_end + content_length {
        let Ok(n) = socket.read(&mut buf).await else {
            return;
        };
        if n == 0 {
            return;
        }
        data.extend_from_slice(&buf[..n]);
    }
}

/// Loopback digitization stub. Every request is answered with HTTP 200 and
/// a fragment whose HTML is `body_for(request_number)`; requests are
/// counted so tests can assert upload order and volume.
async fn spawn_ok_stub(
    body_for: fn(usize) -> String,
) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_clone = Arc::clone(&hits);

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let n = hits_clone.fetch_add(1, Ordering::SeqCst) + 1;
            read_request(&mut socket).await;
            let body = body_for(n);
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    (format!("http://{addr}"), hits)
}

/// Stub that always answers HTTP 503.
async fn spawn_failing_stub() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            read_request(&mut socket).await;
            let _ = socket
                .write_all(b"HTTP/1.1 503 Service Unavailable\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                .await;
            let _ = socket.shutdown().await;
        }
    });
    format!("http://{addr}")
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn full_offline_run_produces_ordered_merge_and_sections() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = save_pdf(&mut build_pdf(8), dir.path(), "guide.pdf");

    // Fragment N opens section N's marker so segmentation has real input.
    let (url, hits) = spawn_ok_stub(|n| {
        format!(r#"{{"api":"2.0","content":{{"html":"<h1>Part {n}</h1>text {n}"}}}}"#)
    })
    .await;

    let catalog =
        SectionCatalog::new(vec!["<h1>Part 1</h1>".into(), "<h1>Part 2</h1>".into()]).unwrap();
    let config = PipelineConfig::builder()
        .work_dir(dir.path().join("work"))
        .parts(2)
        .ocr_base_url(&url)
        .ocr_api_key("test-key")
        .retry_delay_ms(1)
        .catalog(catalog)
        .summarize(false)
        .build()
        .unwrap();

    let output = scanpress::run(pdf.to_str().unwrap(), &config).await.unwrap();

    // Two chunks uploaded, in order, each persisted.
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert_eq!(output.stats.chunk_count, 2);
    assert_eq!(output.stats.digitized_chunks, 2);
    assert_eq!(output.stats.failed_chunks, 0);
    assert!(config.fragments_dir().join("split_1.json").exists());
    assert!(config.fragments_dir().join("split_2.json").exists());
    assert!(config.splits_dir().join("split_1.pdf").exists());

    // Chunk PDFs partition the 8 pages as 4 + 4.
    let first = Document::load(config.splits_dir().join("split_1.pdf")).unwrap();
    assert_eq!(first.get_pages().len(), 4);

    // Merge order follows chunk index.
    assert_eq!(
        output.merged_html,
        "<h1>Part 1</h1>text 1\n<h1>Part 2</h1>text 2\n"
    );
    assert!(output.merged_path.exists());
    let envelope: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output.merged_path).unwrap()).unwrap();
    assert_eq!(envelope["api"], "2.0");
    assert_eq!(envelope["content"]["html"], output.merged_html);

    // Both sections extracted; the first is bounded by the second marker.
    assert_eq!(output.stats.sections_requested, 2);
    assert_eq!(output.stats.sections_extracted, 2);
    assert_eq!(output.sections.len(), 2);
    assert!(output.sections.iter().all(|s| s.error.is_none()));
}

#[tokio::test]
async fn all_chunks_failing_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = save_pdf(&mut build_pdf(4), dir.path(), "guide.pdf");
    let url = spawn_failing_stub().await;

    let config = PipelineConfig::builder()
        .work_dir(dir.path().join("work"))
        .parts(2)
        .ocr_base_url(&url)
        .ocr_api_key("test-key")
        .max_attempts(2)
        .retry_delay_ms(1)
        .build()
        .unwrap();

    let err = scanpress::run(pdf.to_str().unwrap(), &config).await.unwrap_err();
    match err {
        ScanpressError::AllChunksFailed { total, attempts, first_error } => {
            assert_eq!(total, 2);
            assert_eq!(attempts, 2);
            assert!(first_error.contains("503"), "got: {first_error}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn partial_failure_merges_what_survived() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = save_pdf(&mut build_pdf(6), dir.path(), "guide.pdf");

    // Fragment 2 parses but carries no content.html: the merge must skip
    // it with a diagnostic and keep the rest.
    let (url, _hits) = spawn_ok_stub(|n| {
        if n == 2 {
            r#"{"api":"2.0","content":{}}"#.to_string()
        } else {
            format!(r#"{{"content":{{"html":"F{n}"}}}}"#)
        }
    })
    .await;

    let config = PipelineConfig::builder()
        .work_dir(dir.path().join("work"))
        .parts(3)
        .ocr_base_url(&url)
        .ocr_api_key("test-key")
        .retry_delay_ms(1)
        .build()
        .unwrap();

    let output = scanpress::run(pdf.to_str().unwrap(), &config).await.unwrap();
    assert_eq!(output.stats.digitized_chunks, 3);
    assert_eq!(output.stats.merged_fragments, 2);
    assert_eq!(output.stats.skipped_fragments, 1);
    assert_eq!(output.merged_html, "F1\nF3\n");
    // No catalog: the pipeline stops after the merge.
    assert!(output.sections.is_empty());
    assert_eq!(output.stats.sections_requested, 0);
}

#[tokio::test]
async fn inspect_reports_profile_without_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = save_pdf(&mut build_pdf(12), dir.path(), "guide.pdf");

    let profile = scanpress::inspect(pdf.to_str().unwrap()).await.unwrap();
    assert_eq!(profile.page_count, 12);
    assert_eq!(profile.image_pages, 0);
    assert_eq!(scanpress::recommend_parts(&profile), 3);
}

#[tokio::test]
async fn missing_input_is_fatal() {
    let config = PipelineConfig::builder()
        .ocr_api_key("test-key")
        .build()
        .unwrap();
    let err = scanpress::run("/no/such/file.pdf", &config).await.unwrap_err();
    assert!(matches!(err, ScanpressError::FileNotFound { .. }));
}
