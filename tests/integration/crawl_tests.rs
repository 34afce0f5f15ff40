//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full mirror cycle end-to-end.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sumi_mirror::config::{
    Config, CrawlerConfig, DelayConfig, FailureDisposition, IncrementalConfig, OutputConfig,
    RendererConfig, ResumeConfig, RetryConfig, TargetConfig,
};
use sumi_mirror::crawler::{Coordinator, RenderError, Renderer};
use sumi_mirror::plugins::{Plugin, PluginError};
use sumi_mirror::state::PageRecord;
use sumi_mirror::MirrorError;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration mirroring `<server>/docs/` into `dir/site`
fn create_test_config(server: &MockServer, dir: &Path) -> Config {
    Config {
        target: TargetConfig {
            url: format!("{}/docs/", server.uri()),
        },
        crawler: CrawlerConfig {
            max_depth: 5,
            max_files: 500,
            crawl_workers: 4,
            resource_workers: 2,
            user_agent: "TestBot/1.0".to_string(),
            request_timeout_secs: 5,
        },
        delay: DelayConfig::None,
        retry: RetryConfig {
            max_attempts: 3,
            base_delay_ms: 10,
            backoff_multiplier: 2.0,
            jitter: false,
            max_delay_ms: 100,
            on_exhausted: FailureDisposition::Log,
        },
        incremental: IncrementalConfig::default(),
        resume: ResumeConfig {
            enabled: true,
            state_file: dir.join("state.json"),
            save_interval_secs: 300,
        },
        renderer: RendererConfig::default(),
        output: OutputConfig {
            directory: dir.join("site"),
        },
        exclude: vec![],
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!("<!DOCTYPE html><html><body>{}</body></html>", body))
        .insert_header("content-type", "text/html")
}

async fn mount_page(server: &MockServer, page_path: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(html(body))
        .mount(server)
        .await;
}

/// Number of requests the server saw for `verb` on `request_path`
async fn request_count(server: &MockServer, verb: &str, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.to_string() == verb && r.url.path() == request_path)
        .count()
}

/// Every regular file below `dir`
fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(files_under(&path));
            } else {
                files.push(path);
            }
        }
    }
    files
}

/// Records every plugin event
#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
    final_pages: Mutex<usize>,
}

impl Recorder {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl Plugin for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn on_crawl_start(&self, url: &str, _output_dir: &Path) -> Result<(), PluginError> {
        self.events.lock().unwrap().push(format!("start {}", url));
        Ok(())
    }

    fn on_page_crawled(&self, url: &str, _local_path: &str, _content: &str) -> Result<(), PluginError> {
        self.events.lock().unwrap().push(format!("page {}", url));
        Ok(())
    }

    fn on_error(&self, url: &str, _error: &str) -> Result<(), PluginError> {
        self.events.lock().unwrap().push(format!("error {}", url));
        Ok(())
    }

    fn on_crawl_end(&self, pages: &[PageRecord]) -> Result<(), PluginError> {
        *self.final_pages.lock().unwrap() = pages.len();
        self.events.lock().unwrap().push("end".to_string());
        Ok(())
    }
}

#[tokio::test]
async fn test_mirror_respects_scope_and_rewrites_links() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let base = server.uri();

    mount_page(
        &server,
        "/docs/",
        &format!(
            r#"<link rel="stylesheet" href="/docs/site.css">
            <a href="guide.html#intro">Guide</a>
            <a href="/blog/post.html">Blog</a>
            <a href="https://other.example/x">Elsewhere</a>
            <a href="mailto:team@example.com">Mail</a>
            <img src="img/logo.png">
            <img src="{}/shared/banner.png">"#,
            base
        ),
    )
    .await;
    mount_page(&server, "/docs/guide.html", r#"<a href="./">Home</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/docs/site.css"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("body { color: black; }")
                .insert_header("content-type", "text/css"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/docs/img/logo.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0x89, 0x50, 0x4e, 0x47])
                .insert_header("content-type", "image/png"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/blog/post.html"))
        .respond_with(html("out of scope"))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/shared/banner.png"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(&server, dir.path());
    let report = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Crawl failed");

    assert!(report.is_complete());
    assert_eq!(report.statistics.pages_fetched, 2);
    assert_eq!(report.statistics.resources_downloaded, 2);
    assert_eq!(report.pages_written, 2);

    let site = dir.path().join("site");
    let index = std::fs::read_to_string(site.join("docs/index.html")).unwrap();
    assert!(index.contains(r#"href="site.css""#));
    assert!(index.contains(r#"href="guide.html#intro""#));
    assert!(index.contains(&format!(r#"href="{}/blog/post.html""#, base)));
    assert!(index.contains(r#"href="https://other.example/x""#));
    assert!(index.contains(r#"href="mailto:team@example.com""#));
    assert!(index.contains(r#"src="img/logo.png""#));
    assert!(index.contains(&format!(r#"src="{}/shared/banner.png""#, base)));

    let guide = std::fs::read_to_string(site.join("docs/guide.html")).unwrap();
    assert!(guide.contains(r#"href="index.html""#));

    assert_eq!(
        std::fs::read(site.join("docs/img/logo.png")).unwrap(),
        vec![0x89, 0x50, 0x4e, 0x47]
    );
    assert!(site.join("docs/index.html.orig").exists());
    assert!(!site.join("blog").exists());
    assert!(!site.join("shared").exists());

    // A complete run leaves no resume state behind
    assert!(!dir.path().join("state.json").exists());
}

#[tokio::test]
async fn test_rewrites_every_attribute_form() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let base = server.uri();

    mount_page(
        &server,
        "/docs/",
        r#"<a href=../blog/post.html>Unquoted</a>
        <a href='../blog/post.html'>Single</a>
        <img src='../shared/banner.png'>
        <video poster=../media/poster.jpg src="../media/clip.mp4"></video>
        <a href=about>About</a>
        <a href='about.html'>About (html)</a>
        <a href="guide.html?v=1&amp;lang=en">Guide</a>"#,
    )
    .await;
    mount_page(&server, "/docs/about", "extensionless about").await;
    mount_page(&server, "/docs/about.html", "html about").await;
    mount_page(&server, "/docs/guide.html", "guide").await;
    for external in ["/blog/post.html", "/shared/banner.png", "/media/poster.jpg", "/media/clip.mp4"] {
        Mock::given(method("GET"))
            .and(path(external))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
    }

    let config = create_test_config(&server, dir.path());
    let report = Coordinator::new(config).unwrap().run().await.unwrap();
    assert!(report.is_complete());
    assert_eq!(report.statistics.pages_fetched, 4);

    let site = dir.path().join("site");
    let index = std::fs::read_to_string(site.join("docs/index.html")).unwrap();

    // Out-of-scope references keep their absolute URL whatever the quoting
    assert_eq!(
        index.matches(&format!(r#"href="{}/blog/post.html""#, base)).count(),
        2
    );
    assert!(index.contains(&format!(r#"src="{}/shared/banner.png""#, base)));
    assert!(index.contains(&format!(r#"poster="{}/media/poster.jpg""#, base)));
    assert!(index.contains(&format!(r#"src="{}/media/clip.mp4""#, base)));
    assert!(!index.contains("../"));

    // `about` and `about.html` are different pages with different files
    let about_url = Url::parse(&format!("{}/docs/about", base)).unwrap();
    let about_path = sumi_mirror::to_local_path(&about_url);
    assert_ne!(about_path, PathBuf::from("docs/about.html"));
    let about_name = about_path.file_name().unwrap().to_str().unwrap().to_string();
    assert!(index.contains(&format!(r#"href="{}""#, about_name)));
    assert!(index.contains(r#"href="about.html""#));
    assert!(std::fs::read_to_string(site.join(&about_path))
        .unwrap()
        .contains("extensionless about"));
    assert!(std::fs::read_to_string(site.join("docs/about.html"))
        .unwrap()
        .contains("html about"));

    // Entity-encoded query separators resolve to the downloaded page
    let guide_url = Url::parse(&format!("{}/docs/guide.html?lang=en&v=1", base)).unwrap();
    let guide_path = sumi_mirror::to_local_path(&guide_url);
    let guide_name = guide_path.file_name().unwrap().to_str().unwrap().to_string();
    assert!(index.contains(&format!(r#"href="{}""#, guide_name)));
    assert!(site.join(&guide_path).exists());
}

#[tokio::test]
async fn test_resume_skips_visited_urls() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(
        &server,
        "/docs/",
        r#"<a href="a.html">A</a><a href="b.html">B</a>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/docs/a.html"))
        .respond_with(html("a"))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/docs/b.html"))
        .respond_with(html("b"))
        .expect(1)
        .mount(&server)
        .await;

    let state = serde_json::json!({
        "visited_urls": [format!("{}/docs/a.html", server.uri())],
        "downloaded_files": {},
        "some_future_field": true
    });
    std::fs::write(dir.path().join("state.json"), state.to_string()).unwrap();

    let config = create_test_config(&server, dir.path());
    let report = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(report.statistics.pages_fetched, 2);
    assert!(!dir.path().join("site/docs/a.html").exists());
    assert!(dir.path().join("site/docs/b.html").exists());
}

#[tokio::test]
async fn test_resume_with_completed_target_does_nothing() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .respond_with(html("should not be fetched"))
        .expect(0)
        .mount(&server)
        .await;

    let state = serde_json::json!({ "visited_urls": [format!("{}/docs/", server.uri())] });
    std::fs::write(dir.path().join("state.json"), state.to_string()).unwrap();

    let config = create_test_config(&server, dir.path());
    let report = Coordinator::new(config).unwrap().run().await.unwrap();
    assert_eq!(report.statistics.pages_total(), 0);
}

#[tokio::test]
async fn test_fresh_ignores_saved_state() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_page(&server, "/docs/", "home").await;

    let state = serde_json::json!({ "visited_urls": [format!("{}/docs/", server.uri())] });
    std::fs::write(dir.path().join("state.json"), state.to_string()).unwrap();

    let config = create_test_config(&server, dir.path());
    let report = Coordinator::new(config)
        .unwrap()
        .ignore_saved_state(true)
        .run()
        .await
        .unwrap();
    assert_eq!(report.statistics.pages_fetched, 1);
}

#[tokio::test]
async fn test_corrupt_state_starts_empty() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_page(&server, "/docs/", "home").await;
    std::fs::write(dir.path().join("state.json"), "{ definitely not json").unwrap();

    let config = create_test_config(&server, dir.path());
    let report = Coordinator::new(config).unwrap().run().await.unwrap();
    assert_eq!(report.statistics.pages_fetched, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_max_files_limits_page_records() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let links: String = (0..100)
        .map(|i| format!(r#"<a href="p{}.html">{}</a>"#, i, i))
        .collect();
    mount_page(&server, "/docs/", &links).await;
    for i in 0..100 {
        mount_page(&server, &format!("/docs/p{}.html", i), &links).await;
    }

    let recorder = Arc::new(Recorder::default());
    let mut config = create_test_config(&server, dir.path());
    config.crawler.max_files = 5;

    let report = Coordinator::new(config)
        .unwrap()
        .with_plugin(recorder.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.statistics.pages_fetched, 5);
    assert_eq!(*recorder.final_pages.lock().unwrap(), 5);

    let gets = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.to_string() == "GET")
        .count();
    assert_eq!(gets, 5);

    let pages_on_disk = files_under(&dir.path().join("site"))
        .into_iter()
        .filter(|p| p.extension().is_some_and(|e| e == "html"))
        .count();
    assert_eq!(pages_on_disk, 5);
}

#[tokio::test]
async fn test_server_errors_exhaust_retries_then_log() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/docs/", r#"<a href="flaky.html">Flaky</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/docs/flaky.html"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let recorder = Arc::new(Recorder::default());
    let config = create_test_config(&server, dir.path());
    let report = Coordinator::new(config)
        .unwrap()
        .with_plugin(recorder.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.statistics.pages_fetched, 1);
    assert_eq!(report.statistics.pages_failed, 1);
    assert_eq!(report.statistics.failures.len(), 1);
    assert!(report.statistics.failures[0].url.ends_with("/docs/flaky.html"));

    let flaky = format!("{}/docs/flaky.html", server.uri());
    let errors: Vec<_> = recorder
        .events()
        .into_iter()
        .filter(|e| e.starts_with("error "))
        .collect();
    assert_eq!(errors, vec![format!("error {}", flaky)]);
    assert!(!dir.path().join("site/docs/flaky.html").exists());
}

#[tokio::test]
async fn test_skip_disposition_drops_silently() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/docs/", r#"<a href="gone.html">Gone</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/docs/gone.html"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let recorder = Arc::new(Recorder::default());
    let mut config = create_test_config(&server, dir.path());
    config.retry.on_exhausted = FailureDisposition::Skip;

    let report = Coordinator::new(config)
        .unwrap()
        .with_plugin(recorder.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.statistics.pages_skipped, 1);
    assert_eq!(report.statistics.pages_failed, 0);
    assert!(report.statistics.failures.is_empty());
    assert!(!recorder.events().iter().any(|e| e.starts_with("error ")));
}

#[tokio::test]
async fn test_abort_disposition_stops_crawl() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/docs/", r#"<a href="broken.html">Broken</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/docs/broken.html"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let recorder = Arc::new(Recorder::default());
    let mut config = create_test_config(&server, dir.path());
    config.crawler.crawl_workers = 1;
    config.retry.on_exhausted = FailureDisposition::Abort;

    let result = Coordinator::new(config)
        .unwrap()
        .with_plugin(recorder.clone())
        .run()
        .await;

    match result {
        Err(MirrorError::Aborted { url, .. }) => assert!(url.ends_with("/docs/broken.html")),
        other => panic!("expected abort, got {:?}", other.map(|r| r.statistics)),
    }

    // Progress is kept for the next run
    let saved = std::fs::read_to_string(dir.path().join("state.json")).unwrap();
    assert!(saved.contains(&format!("{}/docs/", server.uri())));
    assert!(!saved.contains("broken.html"));

    let events = recorder.events();
    assert!(events.iter().any(|e| e.ends_with("/docs/broken.html") && e.starts_with("error ")));
    assert_eq!(events.last().map(String::as_str), Some("end"));
}

#[tokio::test]
async fn test_incremental_refetches_when_remote_is_newer() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_page(&server, "/docs/", "home").await;

    let config = create_test_config(&server, dir.path());
    Coordinator::new(config.clone()).unwrap().run().await.unwrap();
    assert_eq!(request_count(&server, "GET", "/docs/").await, 1);

    Mock::given(method("HEAD"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("last-modified", "Fri, 01 Jan 2100 00:00:00 GMT"),
        )
        .mount(&server)
        .await;

    let report = Coordinator::new(config).unwrap().run().await.unwrap();
    assert_eq!(report.statistics.pages_fetched, 1);
    assert_eq!(request_count(&server, "HEAD", "/docs/").await, 1);
    assert_eq!(request_count(&server, "GET", "/docs/").await, 2);
}

#[tokio::test]
async fn test_incremental_skips_fetch_but_still_follows_links() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_page(&server, "/docs/", r#"<a href="a.html">A</a>"#).await;
    mount_page(&server, "/docs/a.html", "a").await;

    let config = create_test_config(&server, dir.path());
    Coordinator::new(config.clone()).unwrap().run().await.unwrap();

    Mock::given(method("HEAD"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("last-modified", "Sat, 01 Jan 2000 00:00:00 GMT"),
        )
        .mount(&server)
        .await;
    std::fs::remove_file(dir.path().join("site/docs/a.html")).unwrap();
    std::fs::remove_file(dir.path().join("site/docs/a.html.orig")).unwrap();

    let report = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(report.statistics.pages_unchanged, 1);
    assert_eq!(report.statistics.pages_fetched, 1);
    assert_eq!(request_count(&server, "GET", "/docs/").await, 1);
    assert_eq!(request_count(&server, "GET", "/docs/a.html").await, 2);

    // The unchanged page is still rewritten from its pristine copy
    let index = std::fs::read_to_string(dir.path().join("site/docs/index.html")).unwrap();
    assert!(index.contains(r#"href="a.html""#));
    assert!(dir.path().join("site/docs/a.html").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_eight_workers_visit_each_url_once() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let links: String = (0..50)
        .map(|i| format!(r#"<a href="p{}.html">{}</a>"#, i, i))
        .collect();
    mount_page(&server, "/docs/", &links).await;
    for i in 0..50 {
        let next = if i + 1 < 50 {
            format!(r#"<a href="p{}.html">next</a><a href="./">home</a>"#, i + 1)
        } else {
            r#"<a href="./">home</a>"#.to_string()
        };
        mount_page(&server, &format!("/docs/p{}.html", i), &next).await;
    }

    let mut config = create_test_config(&server, dir.path());
    config.crawler.crawl_workers = 8;

    let report = Coordinator::new(config).unwrap().run().await.unwrap();
    assert_eq!(report.statistics.pages_fetched, 51);
    assert_eq!(report.statistics.pages_failed, 0);

    assert_eq!(request_count(&server, "GET", "/docs/").await, 1);
    for i in 0..50 {
        let page = format!("/docs/p{}.html", i);
        assert_eq!(request_count(&server, "GET", &page).await, 1, "{}", page);
    }
}

#[tokio::test]
async fn test_exclusion_rules_prune_subtrees() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(
        &server,
        "/docs/",
        r#"<a href="private/">Private</a>
        <a href="private/deep/page.html">Deep</a>
        <a href="notes.bak">Backup</a>
        <a href="ok.html">Ok</a>"#,
    )
    .await;
    mount_page(&server, "/docs/ok.html", "ok").await;
    Mock::given(method("GET"))
        .and(path("/docs/private/"))
        .respond_with(html("private"))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/docs/private/deep/page.html"))
        .respond_with(html("deep"))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/docs/notes.bak"))
        .respond_with(html("backup"))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server, dir.path());
    config.exclude = vec!["private".to_string(), "*.bak".to_string()];

    let report = Coordinator::new(config).unwrap().run().await.unwrap();
    assert_eq!(report.statistics.pages_fetched, 2);

    let index = std::fs::read_to_string(dir.path().join("site/docs/index.html")).unwrap();
    assert!(index.contains(&format!(r#"href="{}/docs/private/""#, server.uri())));
}

#[tokio::test]
async fn test_depth_limit() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/docs/", r#"<a href="a.html">A</a>"#).await;
    mount_page(&server, "/docs/a.html", r#"<a href="b.html">B</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/docs/b.html"))
        .respond_with(html("b"))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server, dir.path());
    config.crawler.max_depth = 1;

    let report = Coordinator::new(config).unwrap().run().await.unwrap();
    assert_eq!(report.statistics.pages_fetched, 2);
}

#[tokio::test]
async fn test_non_html_page_saved_as_file() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/docs/", r#"<a href="manual.pdf">Manual</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/docs/manual.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"%PDF-1.7 fake".to_vec())
                .insert_header("content-type", "application/pdf"),
        )
        .mount(&server)
        .await;

    let config = create_test_config(&server, dir.path());
    let report = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(report.statistics.pages_fetched, 2);
    assert_eq!(report.pages_written, 1);
    assert_eq!(
        std::fs::read(dir.path().join("site/docs/manual.pdf")).unwrap(),
        b"%PDF-1.7 fake".to_vec()
    );
    let index = std::fs::read_to_string(dir.path().join("site/docs/index.html")).unwrap();
    assert!(index.contains(r#"href="manual.pdf""#));
}

struct StaticRenderer(String);

#[async_trait]
impl Renderer for StaticRenderer {
    async fn render(&self, _url: &Url, _timeout: Duration) -> Result<String, RenderError> {
        Ok(self.0.clone())
    }
}

struct BrokenRenderer;

#[async_trait]
impl Renderer for BrokenRenderer {
    async fn render(&self, _url: &Url, _timeout: Duration) -> Result<String, RenderError> {
        Err(RenderError::Failed("no browser".to_string()))
    }
}

#[tokio::test]
async fn test_renderer_output_is_used_when_enabled() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/docs/"))
        .respond_with(html("static"))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server, dir.path());
    config.crawler.max_depth = 0;
    config.renderer.enabled = true;

    let report = Coordinator::new(config)
        .unwrap()
        .with_renderer(Arc::new(StaticRenderer("<html><body>rendered</body></html>".into())))
        .run()
        .await
        .unwrap();

    assert_eq!(report.statistics.pages_fetched, 1);
    let index = std::fs::read_to_string(dir.path().join("site/docs/index.html")).unwrap();
    assert!(index.contains("rendered"));
}

#[tokio::test]
async fn test_renderer_failure_falls_back_to_fetch() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/docs/"))
        .respond_with(html("static"))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server, dir.path());
    config.renderer.enabled = true;

    let report = Coordinator::new(config)
        .unwrap()
        .with_renderer(Arc::new(BrokenRenderer))
        .run()
        .await
        .unwrap();
    assert_eq!(report.statistics.pages_fetched, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancellation_leaves_no_partial_files() {
    const SIZE: usize = 64 * 1024;

    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let images: String = (0..20)
        .map(|i| format!(r#"<img src="res/{}.bin">"#, i))
        .collect();
    mount_page(&server, "/docs/", &images).await;
    for i in 0..20 {
        Mock::given(method("GET"))
            .and(path(format!("/docs/res/{}.bin", i)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![b'x'; SIZE])
                    .insert_header("content-type", "application/octet-stream")
                    .set_delay(Duration::from_millis(100)),
            )
            .mount(&server)
            .await;
    }

    let config = create_test_config(&server, dir.path());
    let coordinator = Coordinator::new(config).unwrap();
    let cancel = coordinator.cancel_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(250)).await;
        cancel.cancel();
    });

    let report = coordinator.run().await.unwrap();
    assert!(report.cancelled);
    assert!(report.statistics.resources_downloaded < 20);

    for file in files_under(&dir.path().join("site/docs/res")) {
        let name = file.file_name().unwrap().to_string_lossy().to_string();
        assert!(!name.starts_with(".tmp"), "temporary file left: {}", name);
        assert_eq!(std::fs::metadata(&file).unwrap().len() as usize, SIZE, "{}", name);
    }

    // Interrupted runs keep their progress
    assert!(dir.path().join("state.json").exists());
}

#[tokio::test]
async fn test_plugin_event_order() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_page(&server, "/docs/", "home").await;

    let recorder = Arc::new(Recorder::default());
    let config = create_test_config(&server, dir.path());
    Coordinator::new(config)
        .unwrap()
        .with_plugin(recorder.clone())
        .run()
        .await
        .unwrap();

    let target = format!("{}/docs/", server.uri());
    assert_eq!(
        recorder.events(),
        vec![format!("start {}", target), format!("page {}", target), "end".to_string()]
    );
}
