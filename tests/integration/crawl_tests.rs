//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test the HTTP
//! fetcher, and scripted fetchers to drive the coordinator through its
//! failure, cancellation and concurrency paths.

use async_trait::async_trait;
use crawl_graph::auth::JwtAuthService;
use crawl_graph::config::{FetcherConfig, UserAgentConfig};
use crawl_graph::crawler::{
    CommandFetcher, CrawlCoordinator, CrawlError, FetchError, Fetcher, HttpFetcher,
};
use crawl_graph::ingest::CrawledPage;
use crawl_graph::storage::{Database, DomainStore, LinkGraph, RunStatus, RunStore, UrlStore};
use crawl_graph::CrawlService;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SECRET: &str = "integration-test-secret";

fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

fn http_fetcher(max_pages: usize) -> HttpFetcher {
    let config = FetcherConfig {
        timeout_secs: 5,
        max_pages,
        ..FetcherConfig::default()
    };
    HttpFetcher::from_config(&user_agent(), &config).expect("Failed to build fetcher")
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html; charset=utf-8")
}

async fn mount(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Mounts a small site:
/// `/` links to `/page1`, `/page2`, an external page and a JSON file;
/// `/page1` links back home; `/page2` is a 404 page.
async fn mount_site(server: &MockServer) -> String {
    let base_url = server.uri();

    mount(
        server,
        "/",
        html(format!(
            r#"<html><head>
                <title>Home</title>
                <link rel="canonical" href="{base}/">
                <meta name="description" content="The home page">
            </head><body>
                <a href="/page1">Page 1</a>
                <a href="{base}/page2/">Page 2</a>
                <a href="/page1#again">Page 1 again</a>
                <a href="https://external.example/">Elsewhere</a>
                <a href="/data.json">Data</a>
                <a href="mailto:me@example.com">Mail</a>
            </body></html>"#,
            base = base_url
        )),
    )
    .await;

    mount(
        server,
        "/page1",
        html(r#"<html><head><title>Page 1</title></head><body><a href="/">Home</a></body></html>"#.to_string()),
    )
    .await;

    mount(
        server,
        "/page2",
        ResponseTemplate::new(404)
            .set_body_string("<html><head><title>Not Found</title></head></html>")
            .insert_header("content-type", "text/html"),
    )
    .await;

    mount(
        server,
        "/data.json",
        ResponseTemplate::new(200)
            .set_body_string("{}")
            .insert_header("content-type", "application/json"),
    )
    .await;

    base_url
}

#[tokio::test]
async fn test_http_fetcher_extracts_site() {
    let server = MockServer::start().await;
    let base_url = mount_site(&server).await;
    let seed = Url::parse(&format!("{}/", base_url)).unwrap();

    let pages = http_fetcher(50).fetch(&seed).await.expect("Fetch failed");

    let urls: Vec<&str> = pages.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            format!("{}/", base_url),
            format!("{}/page1", base_url),
            format!("{}/page2", base_url),
            format!("{}/data.json", base_url),
        ]
    );

    let home = &pages[0];
    assert_eq!(home.title.as_deref(), Some("Home"));
    assert_eq!(home.status_code, Some(200));
    assert_eq!(home.description.as_deref(), Some("The home page"));
    assert_eq!(home.canonical.as_deref(), Some(format!("{}/", base_url).as_str()));
    assert_eq!(
        home.internal_links,
        vec![
            format!("{}/page1", base_url),
            format!("{}/page2", base_url),
            format!("{}/data.json", base_url),
        ]
    );

    assert_eq!(pages[2].status_code, Some(404));
    assert_eq!(pages[3].status_code, Some(200));
    assert_eq!(pages[3].title, None);
    assert!(pages[3].internal_links.is_empty());
}

#[tokio::test]
async fn test_http_fetcher_respects_page_limit() {
    let server = MockServer::start().await;
    let base_url = mount_site(&server).await;
    let seed = Url::parse(&base_url).unwrap();

    let pages = http_fetcher(2).fetch(&seed).await.unwrap();

    assert_eq!(pages.len(), 2);
}

#[tokio::test]
async fn test_http_fetcher_seed_failure() {
    // Nothing listens on port 1.
    let seed = Url::parse("http://127.0.0.1:1/").unwrap();

    let err = http_fetcher(5).fetch(&seed).await.unwrap_err();

    assert!(matches!(err, FetchError::Http { .. }));
}

#[tokio::test]
async fn test_service_crawls_mock_site() {
    let server = MockServer::start().await;
    let base_url = mount_site(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(&dir.path().join("graph.db")).unwrap();
    let auth = JwtAuthService::new(SECRET, "crawl-graph", 60);
    let token = auth.issue_token(1).unwrap();
    let service = CrawlService::new(
        db.clone(),
        Arc::new(auth),
        Arc::new(http_fetcher(50)),
        Duration::from_secs(10),
    );

    let domain = service.register_domain(&token, &base_url).await.unwrap();
    let nodes = service
        .crawl(domain.id, &base_url, &token)
        .await
        .expect("Crawl failed");

    assert_eq!(nodes.len(), 4);
    let home = &nodes[0];
    let mut links = service.internal_links(home.id).unwrap();
    links.sort();
    assert_eq!(
        links,
        vec![
            format!("{}/data.json", base_url),
            format!("{}/page1", base_url),
            format!("{}/page2", base_url),
        ]
    );
    assert_eq!(
        service.linked_by(home.id).unwrap(),
        vec![format!("{}/page1", base_url)]
    );

    let stats = service.domain_stats(domain.id).unwrap();
    assert_eq!(stats.total_urls, 4);
    assert_eq!(stats.stub_urls, 0);
    assert_eq!(stats.broken_targets.len(), 1);

    let runs = service.domain_runs(domain.id).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Completed);
    assert_eq!(runs[0].pages_ingested, Some(4));
}

/// Returns scripted batches in order, after an optional delay
struct ScriptedFetcher {
    batches: Mutex<VecDeque<Vec<CrawledPage>>>,
    delay: Duration,
}

impl ScriptedFetcher {
    fn new(batches: Vec<Vec<CrawledPage>>, delay: Duration) -> Self {
        Self {
            batches: Mutex::new(batches.into()),
            delay,
        }
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, _seed: &Url) -> Result<Vec<CrawledPage>, FetchError> {
        tokio::time::sleep(self.delay).await;
        let next = self.batches.lock().unwrap().pop_front();
        next.ok_or_else(|| FetchError::Parse("no scripted batch left".to_string()))
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    db: Database,
    coordinator: Arc<CrawlCoordinator>,
    token: String,
    domain_id: i64,
}

fn harness(fetcher: ScriptedFetcher, fetch_timeout: Duration) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(&dir.path().join("graph.db")).unwrap();
    let auth = JwtAuthService::new(SECRET, "crawl-graph", 60);
    let token = auth.issue_token(7).unwrap();
    let domain_id = DomainStore::new(db.clone())
        .create(7, "https://a.com/")
        .unwrap()
        .id;
    let coordinator = Arc::new(CrawlCoordinator::new(
        db.clone(),
        Arc::new(auth),
        Arc::new(fetcher),
        fetch_timeout,
    ));
    Harness {
        _dir: dir,
        db,
        coordinator,
        token,
        domain_id,
    }
}

fn site(titles: &str) -> Vec<CrawledPage> {
    (0..20)
        .map(|i| CrawledPage {
            title: Some(format!("{} {}", titles, i)),
            status_code: Some(200),
            ..CrawledPage::new(format!("https://a.com/p{}", i)).with_links([
                format!("https://a.com/p{}", (i + 1) % 20),
                "https://a.com/".to_string(),
            ])
        })
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_runs_commit_serially() {
    let batches = (0..6).map(|i| site(&format!("run{}", i))).collect();
    let h = harness(
        ScriptedFetcher::new(batches, Duration::from_millis(5)),
        Duration::from_secs(10),
    );

    let tasks: Vec<_> = (0..6)
        .map(|_| {
            let coordinator = h.coordinator.clone();
            let token = h.token.clone();
            let domain_id = h.domain_id;
            tokio::spawn(async move {
                coordinator
                    .run_crawl(domain_id, "https://a.com/", &token)
                    .await
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().expect("Crawl failed");
    }

    let mut runs = RunStore::new(h.db.clone())
        .list_for_domain(h.domain_id)
        .unwrap();
    assert_eq!(runs.len(), 6);
    assert!(runs.iter().all(|r| r.status == RunStatus::Completed));

    runs.sort_by_key(|r| r.lock_acquired_at);
    for pair in runs.windows(2) {
        let earlier_end = pair[0].finished_at.unwrap();
        let later_start = pair[1].lock_acquired_at.unwrap();
        assert!(
            earlier_end <= later_start,
            "run {} committed while run {} held the domain lock",
            pair[1].id,
            pair[0].id
        );
    }

    // 20 pages plus the root stub, one edge set regardless of run count
    assert_eq!(UrlStore::new(h.db.clone()).list_by_domain(h.domain_id).unwrap().len(), 21);
    assert_eq!(LinkGraph::new(h.db.clone()).edge_count(h.domain_id).unwrap(), 40);
}

#[tokio::test]
async fn test_failed_run_keeps_previous_graph() {
    let good = vec![CrawledPage::new("https://a.com/").with_links(["https://a.com/b"])];
    let bad = vec![
        CrawledPage::new("https://a.com/").with_links(["https://a.com/c"]),
        CrawledPage::new("https://a.com/c").with_links(["not a url at all"]),
    ];
    let h = harness(
        ScriptedFetcher::new(vec![good, bad], Duration::ZERO),
        Duration::from_secs(5),
    );

    h.coordinator
        .run_crawl(h.domain_id, "https://a.com/", &h.token)
        .await
        .unwrap();
    let err = h
        .coordinator
        .run_crawl(h.domain_id, "https://a.com/", &h.token)
        .await
        .unwrap_err();

    assert!(matches!(err, CrawlError::Ingestion { .. }));
    assert_eq!(err.status_code(), 500);
    let urls: Vec<String> = UrlStore::new(h.db.clone())
        .list_by_domain(h.domain_id)
        .unwrap()
        .into_iter()
        .map(|n| n.url)
        .collect();
    assert_eq!(urls, vec!["https://a.com/", "https://a.com/b"]);

    let runs = RunStore::new(h.db.clone()).list_for_domain(h.domain_id).unwrap();
    assert_eq!(runs[1].status, RunStatus::Failed);
    assert!(runs[1].error_message.is_some());
}

#[tokio::test]
async fn test_fetch_error_and_timeout_status() {
    let h = harness(ScriptedFetcher::new(vec![], Duration::ZERO), Duration::from_secs(5));
    let err = h
        .coordinator
        .run_crawl(h.domain_id, "https://a.com/", &h.token)
        .await
        .unwrap_err();
    assert!(matches!(err, CrawlError::Fetch { .. }));
    assert_eq!(err.status_code(), 500);

    let h = harness(
        ScriptedFetcher::new(vec![site("slow")], Duration::from_secs(30)),
        Duration::from_millis(100),
    );
    let err = h
        .coordinator
        .run_crawl(h.domain_id, "https://a.com/", &h.token)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CrawlError::FetchTimeout { domain_id, .. } if domain_id == h.domain_id
    ));
    assert_eq!(err.status_code(), 504);
}

#[tokio::test]
async fn test_cancelled_fetch_commits_nothing() {
    let h = harness(
        ScriptedFetcher::new(vec![site("late")], Duration::from_secs(30)),
        Duration::from_secs(60),
    );

    let cancelled = tokio::time::timeout(
        Duration::from_millis(100),
        h.coordinator.run_crawl(h.domain_id, "https://a.com/", &h.token),
    )
    .await;

    assert!(cancelled.is_err());
    assert!(UrlStore::new(h.db.clone())
        .list_by_domain(h.domain_id)
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let h = harness(ScriptedFetcher::new(vec![site("x")], Duration::ZERO), Duration::from_secs(5));
    let expired = JwtAuthService::new(SECRET, "crawl-graph", 60)
        .issue_token_with_ttl(7, chrono::Duration::minutes(-5))
        .unwrap();

    let err = h
        .coordinator
        .run_crawl(h.domain_id, "https://a.com/", &expired)
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 401);
}

#[cfg(unix)]
#[tokio::test]
async fn test_command_fetcher_output_with_foreign_links_ingests() {
    // Shaped like crawl.py output: every anchor, unfiltered.
    let script = concat!(
        r#"printf '[{"url":"https://a.com/","title":"Home","status_code":200,"#,
        r#""internal_links":["https://a.com/b","https://twitter.com/x","mailto:me@a.com"]},"#,
        r#"{"url":"https://a.com/b","title":"B","status_code":200,"#,
        r#""internal_links":["tel:+15551234","/relative","https://a.com/"]}]'"#
    );
    let fetcher =
        CommandFetcher::new(&["sh".to_string(), "-c".to_string(), script.to_string()]).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(&dir.path().join("graph.db")).unwrap();
    let auth = JwtAuthService::new(SECRET, "crawl-graph", 60);
    let token = auth.issue_token(7).unwrap();
    let domain_id = DomainStore::new(db.clone())
        .create(7, "https://a.com/")
        .unwrap()
        .id;
    let coordinator = CrawlCoordinator::new(
        db.clone(),
        Arc::new(auth),
        Arc::new(fetcher),
        Duration::from_secs(10),
    );

    let nodes = coordinator
        .run_crawl(domain_id, "https://a.com/", &token)
        .await
        .unwrap();
    assert_eq!(nodes.len(), 2);

    let mut urls: Vec<String> = UrlStore::new(db.clone())
        .list_by_domain(domain_id)
        .unwrap()
        .into_iter()
        .map(|node| node.url)
        .collect();
    urls.sort();
    assert_eq!(urls, vec!["https://a.com/", "https://a.com/b"]);

    let graph = LinkGraph::new(db);
    assert_eq!(graph.internal_links(nodes[0].id).unwrap(), vec!["https://a.com/b"]);
    assert_eq!(graph.internal_links(nodes[1].id).unwrap(), vec!["https://a.com/"]);
}
