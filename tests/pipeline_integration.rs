//! End-to-end crawl tests: paginate, resolve and fetch against a mock ParlInfo.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use harvester_core::{
    CrawlOptions, DataLayout, DocumentFetcher, HarvestError, Harvester, QuerySpec, QueryState,
    ResolutionState, StopReason,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::fixtures::{
    landing_html, mount_feed_page, mount_landing, mount_transcript, pdf_link, record_id,
    result_uri, sitting_items, test_client, test_service, xml_link,
};
use support::socket_guard::start_mock_server_or_skip;

fn queries() -> Vec<QuerySpec> {
    vec![QuerySpec::new("hansardr", "(Dataset:hansardr)")]
}

fn harvester(server: &MockServer, data: &Path) -> Harvester {
    Harvester::new(test_client(), test_service(server), DataLayout::new(data))
}

/// Snapshot of every file under `root`, keyed by relative path.
fn snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut files = BTreeMap::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                let key = path.strip_prefix(root).unwrap().display().to_string();
                files.insert(key, std::fs::read(&path).unwrap());
            }
        }
    }
    files
}

#[tokio::test]
async fn test_first_crawl_stores_every_sitting() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let mut items = sitting_items(&server, "2009-02-12", 3);
    items.extend(sitting_items(&server, "2009-02-11", 2));
    mount_feed_page(&server, 0, &items, 1).await;
    mount_feed_page(&server, 1, &[], 1).await;
    mount_landing(
        &server,
        "2009-02-12",
        landing_html(Some(&xml_link("2009-02-12")), Some(&pdf_link("2009-02-12"))),
        1,
    )
    .await;
    mount_landing(
        &server,
        "2009-02-11",
        landing_html(None, Some(&pdf_link("2009-02-11"))),
        1,
    )
    .await;
    mount_transcript(&server, "2009-02-12", 1).await;
    mount_transcript(&server, "2009-02-11", 0).await;

    let data = TempDir::new().unwrap();
    let summary = harvester(&server, data.path())
        .run(&queries(), CrawlOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.queries.len(), 1);
    assert_eq!(summary.queries[0].1.new_results, 5);
    assert_eq!(summary.queries[0].1.stop, StopReason::Exhausted { page: 1 });
    assert_eq!(summary.check_uris, 2);
    assert_eq!(summary.resolve.with_xml, 1);
    assert_eq!(summary.resolve.without_xml, 1);
    assert_eq!(summary.documents.fetched, 1);

    let xml_uri = format!("{}{}", server.uri(), xml_link("2009-02-12"));
    let stored = DocumentFetcher::new(DocumentFetcher::root_for(data.path()))
        .document_dir(&xml_uri)
        .join("2009-02-12.xml");
    assert!(stored.is_file());
}

#[tokio::test]
async fn test_second_crawl_without_upstream_change_is_idempotent() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let items = sitting_items(&server, "2009-02-12", 3);
    // Run 1 reads pages 0 and 1; run 2 stops at page 0.
    mount_feed_page(&server, 0, &items, 2).await;
    mount_feed_page(&server, 1, &[], 1).await;
    mount_landing(
        &server,
        "2009-02-12",
        landing_html(Some(&xml_link("2009-02-12")), None),
        1,
    )
    .await;
    mount_transcript(&server, "2009-02-12", 1).await;

    let data = TempDir::new().unwrap();
    let harvester = harvester(&server, data.path());
    harvester
        .run(&queries(), CrawlOptions::default())
        .await
        .unwrap();
    let before = snapshot(data.path());

    let summary = harvester
        .run(&queries(), CrawlOptions::default())
        .await
        .unwrap();
    assert_eq!(summary.queries[0].1.stop, StopReason::Unchanged { page: 0 });
    assert_eq!(summary.resolve.checked, 0);
    assert_eq!(summary.documents.fetched, 0);
    assert_eq!(summary.documents.already_present, 1);
    assert_eq!(snapshot(data.path()), before, "second run must not change any file");
}

#[tokio::test]
async fn test_new_sitting_only_adds_state() {
    let Some(first_server) = start_mock_server_or_skip().await else {
        return;
    };
    let data = TempDir::new().unwrap();

    let old = sitting_items(&first_server, "2009-02-11", 2);
    mount_feed_page(&first_server, 0, &old, 1).await;
    mount_feed_page(&first_server, 1, &[], 1).await;
    mount_landing(
        &first_server,
        "2009-02-11",
        landing_html(Some(&xml_link("2009-02-11")), None),
        1,
    )
    .await;
    mount_transcript(&first_server, "2009-02-11", 1).await;
    harvester(&first_server, data.path())
        .run(&queries(), CrawlOptions::default())
        .await
        .unwrap();
    let before = snapshot(data.path());
    let query_path = QueryState::path_for(data.path(), "hansardr");
    let known_before = QueryState::load(&query_path).result_pages().clone();
    let resolved_before = ResolutionState::load(ResolutionState::path_for(data.path())).len();

    // The same upstream, now with a newer sitting at the head of the feed.
    first_server.reset().await;
    let mut feed = sitting_items(&first_server, "2009-02-12", 1);
    feed.extend(old.iter().cloned());
    mount_feed_page(&first_server, 0, &feed, 1).await;
    mount_feed_page(&first_server, 1, &old, 1).await;
    mount_landing(
        &first_server,
        "2009-02-12",
        landing_html(Some(&xml_link("2009-02-12")), None),
        1,
    )
    .await;
    mount_landing(&first_server, "2009-02-11", String::new(), 0).await;
    mount_transcript(&first_server, "2009-02-12", 1).await;
    mount_transcript(&first_server, "2009-02-11", 0).await;

    harvester(&first_server, data.path())
        .run(&queries(), CrawlOptions::default())
        .await
        .unwrap();

    let known_after = QueryState::load(&query_path).result_pages().clone();
    for (uri, title) in &known_before {
        assert_eq!(known_after.get(uri), Some(title), "entries are never removed or changed");
    }
    assert_eq!(known_after.len(), known_before.len() + 1);
    assert_eq!(
        ResolutionState::load(ResolutionState::path_for(data.path())).len(),
        resolved_before + 1
    );
    let after = snapshot(data.path());
    for (file, contents) in &before {
        if file.contains("documents") {
            assert_eq!(after.get(file), Some(contents), "stored documents are untouched");
        }
    }
}

#[tokio::test]
async fn test_corrupt_state_is_rebuilt() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let items = sitting_items(&server, "2009-02-12", 1);
    mount_feed_page(&server, 0, &items, 1).await;
    mount_feed_page(&server, 1, &[], 1).await;
    mount_landing(
        &server,
        "2009-02-12",
        landing_html(Some(&xml_link("2009-02-12")), None),
        1,
    )
    .await;
    mount_transcript(&server, "2009-02-12", 1).await;

    let data = TempDir::new().unwrap();
    let query_path = QueryState::path_for(data.path(), "hansardr");
    std::fs::create_dir_all(query_path.parent().unwrap()).unwrap();
    std::fs::write(&query_path, b"{ not json").unwrap();
    std::fs::write(ResolutionState::path_for(data.path()), b"[1, 2").unwrap();

    harvester(&server, data.path())
        .run(&queries(), CrawlOptions::default())
        .await
        .unwrap();

    assert_eq!(QueryState::load(&query_path).len(), 1);
    let resolution = ResolutionState::load(ResolutionState::path_for(data.path()));
    assert!(resolution.get(&result_uri(&server, &record_id("2009-02-12", 1))).is_some());
}

#[tokio::test]
async fn test_inconsistent_result_uri_fails_the_run() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let items = vec![(
        "Orphan".to_string(),
        format!("{}/parlInfo/search/display/display.w3p;query=nothing", server.uri()),
    )];
    mount_feed_page(&server, 0, &items, 1).await;
    mount_feed_page(&server, 1, &[], 1).await;

    let data = TempDir::new().unwrap();
    let result = harvester(&server, data.path())
        .run(&queries(), CrawlOptions::default())
        .await;

    assert!(matches!(result, Err(HarvestError::Query { ref query, .. }) if query == "hansardr"));
    assert!(
        !ResolutionState::path_for(data.path()).exists(),
        "resolution must not start"
    );
}

#[tokio::test]
async fn test_interrupted_crawl_keeps_resolved_pages() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let mut items = sitting_items(&server, "2009-02-12", 1);
    items.extend(sitting_items(&server, "2009-02-11", 1));
    mount_feed_page(&server, 0, &items, 1).await;
    mount_feed_page(&server, 1, &[], 1).await;
    mount_landing(
        &server,
        "2009-02-11",
        landing_html(Some(&xml_link("2009-02-11")), None),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path_regex(r"display\.w3p;.*2009-02-12"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(landing_html(Some(&xml_link("2009-02-12")), None))
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;
    mount_transcript(&server, "2009-02-11", 0).await;

    let data = TempDir::new().unwrap();
    let result = harvester(&server, data.path())
        .run_until(
            &queries(),
            CrawlOptions::default(),
            tokio::time::sleep(Duration::from_millis(1500)),
        )
        .await;

    assert!(matches!(result, Err(HarvestError::Interrupted)));
    let query_path = QueryState::path_for(data.path(), "hansardr");
    assert_eq!(QueryState::load(&query_path).len(), 2);
    let resolution = ResolutionState::load(ResolutionState::path_for(data.path()));
    assert_eq!(resolution.len(), 1, "resolved pages must survive the interrupt");
    let resolved = resolution
        .get(&result_uri(&server, &record_id("2009-02-11", 1)))
        .flatten()
        .unwrap();
    assert_eq!(
        resolved.xml_uri.as_deref(),
        Some(format!("{}{}", server.uri(), xml_link("2009-02-11")).as_str())
    );
}

#[tokio::test]
async fn test_run_until_returns_summary_when_crawl_finishes_first() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_feed_page(&server, 0, &[], 1).await;

    let data = TempDir::new().unwrap();
    let summary = harvester(&server, data.path())
        .run_until(&queries(), CrawlOptions::default(), std::future::pending())
        .await
        .unwrap();
    assert_eq!(summary.check_uris, 0);
}
