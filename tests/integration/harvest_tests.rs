//! Integration tests for a full harvest session
//!
//! These tests serve a small site from a wiremock server and pin the site's
//! host names to it with `ClientBuilder::resolve`, so URLs keep their real
//! host names and land in per-host output directories.

use reqwest::redirect::Policy;
use reqwest::Client;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use sumi_harvest::config::Config;
use sumi_harvest::inspect::ImageInspector;
use sumi_harvest::render::HttpRenderer;
use sumi_harvest::{Harvester, HarvestError};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SITE: &str = "example.com";
const ASSETS: &str = "assets.examplecdn.net";
const TRACKER: &str = "ads.example-tracking.com";

/// Builds a client that sends every test host to the mock server
fn pinned_client(addr: SocketAddr, follow_redirects: bool) -> Client {
    let policy = if follow_redirects {
        Policy::limited(10)
    } else {
        Policy::none()
    };

    Client::builder()
        .redirect(policy)
        .resolve(SITE, addr)
        .resolve(ASSETS, addr)
        .resolve(TRACKER, addr)
        .build()
        .expect("Failed to build client")
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.crawler.depth = 1;
    config.download.request_delay_ms = 0;
    config.download.retry_delay_ms = 10;
    config
}

fn harvester(server: &MockServer, config: Config, output: &Path, dry_run: bool) -> Harvester {
    let addr = *server.address();
    Harvester::with_components(
        config,
        output.to_path_buf(),
        dry_run,
        Arc::new(HttpRenderer::new(pinned_client(addr, true))),
        pinned_client(addr, false),
        Arc::new(ImageInspector),
        CancellationToken::new(),
    )
}

fn url_on(host: &str, port: u16, route: &str) -> String {
    format!("http://{}:{}{}", host, port, route)
}

/// Mounts the seed page, an about page and three media files
async fn mount_site(server: &MockServer, media_expectations: [u64; 3]) {
    let port = server.address().port();

    let seed = format!(
        r#"<html><body>
            <img src="/logo.png">
            <img src="{}">
            <img src="{}">
            <a href="/about">About</a>
            <a href="{}">Off site</a>
        </body></html>"#,
        url_on(ASSETS, port, "/banner.jpg"),
        url_on(TRACKER, port, "/pixel.gif"),
        url_on(TRACKER, port, "/landing"),
    );
    let about = r#"<html><body>
            <img src="/logo.png">
            <div style="background-image: url('/team.webp')"></div>
        </body></html>"#;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(seed, "text/html"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(about, "text/html"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/landing"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html></html>", "text/html"))
        .expect(0)
        .mount(server)
        .await;

    let [logo, banner, pixel] = media_expectations;
    Mock::given(method("GET"))
        .and(path("/logo.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"logo bytes".to_vec()))
        .expect(logo)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/banner.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"banner bytes".to_vec()))
        .expect(banner)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pixel.gif"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"pixel".to_vec()))
        .expect(pixel)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/team.webp"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"team bytes".to_vec()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_harvest_downloads_site_and_asset_host_media() {
    let server = MockServer::start().await;
    mount_site(&server, [1, 1, 0]).await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("output");
    let seed = Url::parse(&url_on(SITE, server.address().port(), "/")).unwrap();

    let summary = harvester(&server, test_config(), &output, false)
        .run(&seed)
        .await
        .expect("Harvest failed");

    assert_eq!(
        std::fs::read(output.join(SITE).join("logo.png")).unwrap(),
        b"logo bytes"
    );
    assert_eq!(
        std::fs::read(output.join(ASSETS).join("banner.jpg")).unwrap(),
        b"banner bytes"
    );
    assert!(output.join(SITE).join("team.webp").exists());
    assert!(!output.join(TRACKER).exists());

    assert_eq!(
        summary.allowed_domains,
        vec![ASSETS.to_string(), SITE.to_string()]
    );
    assert_eq!(summary.crawl.pages_rendered, 2);
    assert_eq!(summary.downloads.saved, 3);
    assert_eq!(summary.downloads.failed, 0);
    assert!(summary.dedup.is_some());
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let server = MockServer::start().await;
    mount_site(&server, [0, 0, 0]).await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("output");
    let seed = Url::parse(&url_on(SITE, server.address().port(), "/")).unwrap();

    let summary = harvester(&server, test_config(), &output, true)
        .run(&seed)
        .await
        .expect("Harvest failed");

    assert!(summary.dry_run);
    assert_eq!(summary.downloads.dry_run, 3);
    assert_eq!(summary.downloads.saved, 0);
    assert!(!output.exists());
}

#[tokio::test]
async fn test_depth_zero_stays_on_seed_page() {
    let server = MockServer::start().await;
    mount_site(&server, [1, 1, 0]).await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("output");
    let seed = Url::parse(&url_on(SITE, server.address().port(), "/")).unwrap();
    let mut config = test_config();
    config.crawler.depth = 0;

    let summary = harvester(&server, config, &output, false)
        .run(&seed)
        .await
        .expect("Harvest failed");

    assert_eq!(summary.crawl.pages_rendered, 1);
    assert!(!output.join(SITE).join("team.webp").exists());
}

#[tokio::test]
async fn test_unreachable_seed_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let seed = Url::parse(&url_on(SITE, server.address().port(), "/")).unwrap();

    let result = harvester(&server, test_config(), &dir.path().join("output"), false)
        .run(&seed)
        .await;

    assert!(matches!(result, Err(HarvestError::SeedUnreachable { .. })));
}
