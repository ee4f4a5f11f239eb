//! Integration tests for the crawler
//!
//! These tests use wiremock to serve listing and detail pages and run the
//! HTTP page driver through full collection and extraction cycles.

use listing_sweep::config::{load_config_with_hash, ContentStrategy, Config, RowFields, SiteProfile};
use listing_sweep::crawler::{run_crawl, CollectionEnd, ResumeFrom, RunMode, RunOptions};
use listing_sweep::state::{CrawlState, FailureReason, Phase};
use listing_sweep::storage::CheckpointStore;
use listing_sweep::{Locator, SweepError};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration writing everything below `dir`
fn create_test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.crawler.target_count = 10;
    config.crawler.checkpoint_interval = 1;
    config.timeouts.page_load_secs = 5;
    config.timeouts.element_wait_secs = 1;
    config.timeouts.poll_interval_ms = 10;
    config.timeouts.settle_ms = 0;
    config.user_agent.crawler_name = "TestBot".to_string();
    config.output.checkpoint_dir = dir.join("checkpoints").to_string_lossy().into_owned();
    config.output.details_dir = dir.join("details").to_string_lossy().into_owned();
    config.output.diagnostics_dir = dir.join("diagnostics").to_string_lossy().into_owned();
    config.output.summary_dir = dir.to_string_lossy().into_owned();
    config
}

/// Site profile for the mock server; detail links come from the rows
fn mock_site(base_url: &str) -> SiteProfile {
    SiteProfile {
        name: "mock".to_string(),
        listing_url: format!("{}/stellen", base_url),
        keyword_param: None,
        listing_ready: Locator::css("table.results"),
        no_results: None,
        rows: Locator::css("table.results tbody tr"),
        fields: RowFields {
            id: Locator::css("td.id"),
            id_attribute: None,
            id_pattern: None,
            organization: Some(Locator::css("td.org")),
            title: Some(Locator::css("td.title")),
            link: Some(Locator::css("a.detail")),
        },
        detail_url_template: None,
        detail_ready: None,
        load_more: vec![
            Locator::id("load-more"),
            Locator::text(Some("a"), "(?i)mehr laden"),
        ],
        content: vec![ContentStrategy::new("richtext", Locator::css("div.richtext"))],
        consent: vec![],
    }
}

fn listing_page(ids: &[&str], next: Option<&str>) -> String {
    let rows: String = ids
        .iter()
        .map(|id| {
            format!(
                r#"<tr><td class="id">{id}</td><td class="org">Amt {id}</td>
                   <td class="title"><a class="detail" href="/stelle/{id}">Stelle {id}</a></td></tr>"#,
                id = id
            )
        })
        .collect();
    let pager = next
        .map(|href| format!(r#"<a id="load-more" href="{}">Mehr laden</a>"#, href))
        .unwrap_or_default();
    format!(
        r#"<html><body><table class="results"><tbody>{}</tbody></table>{}</body></html>"#,
        rows, pager
    )
}

fn detail_page(text: &str) -> String {
    format!(
        r#"<html><body><nav>Menu</nav><div class="richtext"><p>{}</p></div></body></html>"#,
        text
    )
}

async fn mount_html(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

/// First listing page (101, 102) and detail pages for 101..103
async fn mount_first_page_and_details(server: &MockServer) {
    mount_html(server, "/stellen", listing_page(&["101", "102"], Some("/stellen/2"))).await;
    for id in ["101", "102", "103"] {
        mount_html(
            server,
            &format!("/stelle/{}", id),
            detail_page(&format!("Sachbearbeitung {}", id)),
        )
        .await;
    }
}

fn files_with_prefix(dir: &Path, prefix: &str) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy().starts_with(prefix))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

#[tokio::test]
async fn test_process_mode_end_to_end() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_html(&mock_server, "/stellen", listing_page(&["101", "102"], Some("/stellen/2"))).await;
    mount_html(&mock_server, "/stellen/2", listing_page(&["101", "102", "103"], None)).await;
    mount_html(&mock_server, "/stelle/101", detail_page("Sachbearbeitung Haushalt")).await;
    mount_html(&mock_server, "/stelle/102", detail_page("Referent Digitalisierung")).await;
    Mock::given(method("GET"))
        .and(path("/stelle/103"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());
    let options = RunOptions::from_config(&config.crawler, RunMode::Process);

    let report = run_crawl(
        &config,
        mock_site(&base_url),
        None,
        &options,
        ResumeFrom::Fresh,
        None,
    )
    .await
    .expect("crawl failed");

    assert_eq!(report.final_state, CrawlState::Complete);
    assert_eq!(report.collection_end, Some(CollectionEnd::Exhausted));
    assert_eq!(report.statistics.total_collected, 3);
    assert_eq!(report.statistics.details_fetched, 3);
    assert_eq!(report.attempted, 3);
    assert_eq!(report.saved, 2);

    // Detail documents hold the matched content element only
    let details = dir.path().join("details");
    let saved = files_with_prefix(&details, "job_101_");
    assert_eq!(saved.len(), 1);
    let content = std::fs::read_to_string(&saved[0]).unwrap();
    assert!(content.contains("Sachbearbeitung Haushalt"));
    assert!(!content.contains("Menu"));
    assert_eq!(files_with_prefix(&details, "job_102_").len(), 1);
    assert!(files_with_prefix(&details, "job_103_").is_empty());

    // The HTTP driver cannot take screenshots, so diagnostics fall back to page source
    let captures = files_with_prefix(&dir.path().join("diagnostics"), "failed_description_103_");
    assert_eq!(captures.len(), 1);
    assert_eq!(captures[0].extension().unwrap(), "html");

    let snapshot = CheckpointStore::new(dir.path().join("checkpoints"))
        .load(None)
        .expect("latest checkpoint missing");
    assert_eq!(snapshot.phase, Phase::Complete);
    let failed = snapshot.jobs.iter().find(|job| job.id() == "103").unwrap();
    assert_eq!(
        failed.detail.as_ref().unwrap().failure_reason(),
        Some(FailureReason::NavigationError)
    );
    let first = &snapshot.jobs[0];
    assert_eq!(first.summary.organization, "Amt 101");
    assert_eq!(
        first.summary.url.as_deref(),
        Some(format!("{}/stelle/101", base_url).as_str())
    );

    assert_eq!(
        files_with_prefix(dir.path(), "job_extraction_summary_").len(),
        1
    );
}

#[tokio::test]
async fn test_collect_then_extract_in_batches() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // Pagination only happens during collection
    Mock::given(method("GET"))
        .and(path("/stellen/2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_page(&["101", "102", "103"], None))
                .insert_header("content-type", "text/html"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_first_page_and_details(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(dir.path());
    let store = CheckpointStore::new(dir.path().join("checkpoints"));

    let collect = RunOptions::from_config(&config.crawler, RunMode::Collect);
    let report = run_crawl(
        &config,
        mock_site(&base_url),
        None,
        &collect,
        ResumeFrom::Fresh,
        None,
    )
    .await
    .expect("collection failed");

    assert_eq!(report.collection_end, Some(CollectionEnd::Exhausted));
    assert_eq!(report.statistics.remaining, 3);
    assert_eq!(store.load(None).unwrap().phase, Phase::DetailExtraction);
    assert!(files_with_prefix(&dir.path().join("details"), "job_").is_empty());

    config.crawler.detail_batch_size = Some(2);
    let extract = RunOptions::from_config(&config.crawler, RunMode::Extract);

    let first = run_crawl(
        &config,
        mock_site(&base_url),
        None,
        &extract,
        ResumeFrom::Latest,
        None,
    )
    .await
    .expect("first extraction failed");
    assert_eq!(first.collection_end, None);
    assert_eq!(first.saved, 2);
    assert_eq!(first.statistics.remaining, 1);
    assert_eq!(store.load(None).unwrap().phase, Phase::DetailExtraction);

    let second = run_crawl(
        &config,
        mock_site(&base_url),
        None,
        &extract,
        ResumeFrom::Latest,
        None,
    )
    .await
    .expect("second extraction failed");
    assert_eq!(second.attempted, 1);
    assert_eq!(second.statistics.remaining, 0);
    assert_eq!(store.load(None).unwrap().phase, Phase::Complete);

    assert_eq!(files_with_prefix(&dir.path().join("details"), "job_").len(), 3);
}

#[tokio::test]
async fn test_resume_from_collection_record_replays_pagination() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_first_page_and_details(&mock_server).await;
    mount_html(&mock_server, "/stellen/2", listing_page(&["101", "102", "103"], None)).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(dir.path());
    config.crawler.target_count = 3;

    let collect = RunOptions::from_config(&config.crawler, RunMode::Collect);
    let report = run_crawl(
        &config,
        mock_site(&base_url),
        None,
        &collect,
        ResumeFrom::Fresh,
        None,
    )
    .await
    .unwrap();
    assert_eq!(report.collection_end, Some(CollectionEnd::TargetReached));

    // The cadence checkpoint after the first advance is still in the collection phase
    let records = files_with_prefix(&dir.path().join("checkpoints"), "checkpoint_");
    let record = records
        .iter()
        .find(|path| path.to_string_lossy().contains("_id_collection_1"))
        .expect("no collection-phase record")
        .clone();

    config.crawler.target_count = 10;
    let resumed_options = RunOptions::from_config(&config.crawler, RunMode::Collect);
    let resumed = run_crawl(
        &config,
        mock_site(&base_url),
        None,
        &resumed_options,
        ResumeFrom::Path(record),
        None,
    )
    .await
    .unwrap();

    // Page two is reached by replay and adds 103; there is no page three
    assert_eq!(resumed.collection_end, Some(CollectionEnd::Exhausted));
    assert_eq!(resumed.statistics.total_collected, 3);
    let ids: Vec<String> = CheckpointStore::new(dir.path().join("checkpoints"))
        .load(None)
        .unwrap()
        .jobs
        .iter()
        .map(|job| job.id().to_string())
        .collect();
    assert_eq!(ids, vec!["101", "102", "103"]);
}

#[tokio::test]
async fn test_extract_without_checkpoint_fails() {
    let mock_server = MockServer::start().await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());
    let options = RunOptions::from_config(&config.crawler, RunMode::Extract);

    let result = run_crawl(
        &config,
        mock_site(&mock_server.uri()),
        None,
        &options,
        ResumeFrom::Latest,
        None,
    )
    .await;

    assert!(matches!(result, Err(SweepError::MissingCheckpoint(_))));
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_config_file_site_and_hash() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // Detail pages addressed by template, identifiers read from a data attribute
    mount_html(
        &mock_server,
        "/jobs",
        r#"<html><body><ul class="jobs">
             <li class="job"><a class="ref" data-ref="/jobs/A-1.html"><span class="t">Alpha</span></a></li>
             <li class="job"><a class="ref" data-ref="/jobs/B-2.html"><span class="t">Beta</span></a></li>
           </ul></body></html>"#
            .to_string(),
    )
    .await;
    mount_html(&mock_server, "/detail/A-1", detail_page("Alpha text")).await;
    mount_html(&mock_server, "/detail/B-2", detail_page("Beta text")).await;

    let dir = TempDir::new().unwrap();
    let out = dir.path().to_string_lossy();
    let toml = format!(
        r#"
[crawler]
site = "mirror"
target-count = 5
checkpoint-interval = 1

[timeouts]
element-wait = 1
poll-interval-ms = 10
settle-ms = 0

[output]
checkpoint-dir = "{out}/checkpoints"
details-dir = "{out}/details"
diagnostics-dir = "{out}/diagnostics"
summary-dir = "{out}"
capture-screenshots = false

[[site]]
name = "mirror"
listing-url = "{base}/jobs"
listing-ready = {{ by = "css", value = "ul.jobs" }}
rows = {{ by = "css", value = "li.job" }}
fields.id = {{ by = "css", value = "a.ref" }}
fields.id-attribute = "data-ref"
fields.id-pattern = "/([^/]+?)\\.html$"
fields.title = {{ by = "css", value = "span.t" }}
detail-url-template = "{base}/detail/{{id}}"
content = [
    {{ label = "richtext", locator = {{ by = "css", value = "div.richtext" }} }},
]
"#,
        out = out,
        base = base_url
    );
    let config_path = dir.path().join("sweep.toml");
    std::fs::write(&config_path, toml).unwrap();

    let (config, hash) = load_config_with_hash(&config_path).expect("config should load");
    let site = config.site(&config.crawler.site).expect("site should resolve");
    let options = RunOptions::from_config(&config.crawler, RunMode::Process);

    let report = run_crawl(
        &config,
        site,
        None,
        &options,
        ResumeFrom::Fresh,
        Some(hash.clone()),
    )
    .await
    .unwrap();

    assert_eq!(report.saved, 2);

    let snapshot = CheckpointStore::new(dir.path().join("checkpoints"))
        .load(None)
        .unwrap();
    assert_eq!(snapshot.config_hash.as_deref(), Some(hash.as_str()));
    let ids: Vec<&str> = snapshot.jobs.iter().map(|job| job.id()).collect();
    assert_eq!(ids, vec!["A-1", "B-2"]);
    assert_eq!(snapshot.jobs[0].summary.organization, "Unknown");
    assert_eq!(snapshot.jobs[1].summary.title, "Beta");
}
