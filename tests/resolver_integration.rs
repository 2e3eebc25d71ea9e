//! Integration tests for landing-page resolution.

use std::collections::BTreeSet;

use harvester_core::{FetchError, ResolutionState, ResolveError, Resolver};
use tempfile::TempDir;

mod support;
use support::fixtures::{
    error_page, landing_html, mount_landing, pdf_link, record_id, result_uri, test_client,
    xml_link,
};
use support::socket_guard::start_mock_server_or_skip;

#[tokio::test]
async fn test_resolves_relative_links_against_origin() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let date = "2009-02-12";
    mount_landing(
        &server,
        date,
        landing_html(Some(&xml_link(date)), Some(&pdf_link(date))),
        1,
    )
    .await;

    let data = TempDir::new().unwrap();
    let mut state = ResolutionState::load(ResolutionState::path_for(data.path()));
    let uri = result_uri(&server, &record_id(date, 1));
    let resolver = Resolver::new(&server.uri()).unwrap();
    let summary = resolver
        .resolve_all(&test_client(), &mut state, &BTreeSet::from([uri.clone()]), false)
        .await
        .unwrap();

    assert_eq!(summary.checked, 1);
    assert_eq!(summary.with_xml, 1);
    let record = state.get(&uri).flatten().unwrap();
    assert_eq!(
        record.xml_uri.as_deref(),
        Some(format!("{}{}", server.uri(), xml_link(date)).as_str())
    );
    assert_eq!(
        record.pdf_uri.as_deref(),
        Some(format!("{}{}", server.uri(), pdf_link(date)).as_str())
    );
}

#[tokio::test]
async fn test_each_landing_page_is_fetched_at_most_once() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let date = "2009-02-12";
    mount_landing(&server, date, landing_html(Some(&xml_link(date)), None), 1).await;
    mount_landing(&server, "2009-02-13", landing_html(None, None), 1).await;

    let data = TempDir::new().unwrap();
    let path = ResolutionState::path_for(data.path());
    let uris = BTreeSet::from([
        result_uri(&server, &record_id(date, 1)),
        result_uri(&server, &record_id("2009-02-13", 1)),
    ]);
    let resolver = Resolver::new(&server.uri()).unwrap();
    let client = test_client();

    let mut state = ResolutionState::load(&path);
    resolver
        .resolve_all(&client, &mut state, &uris, false)
        .await
        .unwrap();

    let mut reloaded = ResolutionState::load(&path);
    assert_eq!(reloaded.len(), 2);
    let summary = resolver
        .resolve_all(&client, &mut reloaded, &uris, false)
        .await
        .unwrap();
    assert_eq!(summary.checked, 0);
    assert_eq!(summary.skipped, 2);
}

#[tokio::test]
async fn test_retry_unresolved_rechecks_entries_without_xml() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let with_xml = "2009-02-12";
    let without = "2009-02-13";
    mount_landing(&server, with_xml, landing_html(Some(&xml_link(with_xml)), None), 1).await;
    mount_landing(&server, without, landing_html(None, Some(&pdf_link(without))), 2).await;

    let data = TempDir::new().unwrap();
    let path = ResolutionState::path_for(data.path());
    let uris = BTreeSet::from([
        result_uri(&server, &record_id(with_xml, 1)),
        result_uri(&server, &record_id(without, 1)),
    ]);
    let resolver = Resolver::new(&server.uri()).unwrap();
    let client = test_client();

    let mut state = ResolutionState::load(&path);
    resolver
        .resolve_all(&client, &mut state, &uris, false)
        .await
        .unwrap();
    let summary = resolver
        .resolve_all(&client, &mut state, &uris, true)
        .await
        .unwrap();

    assert_eq!(summary.checked, 1);
    assert_eq!(summary.without_xml, 1);
    assert_eq!(summary.skipped, 1);
}

#[tokio::test]
async fn test_page_without_assets_is_recorded_as_null() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let date = "2009-02-12";
    mount_landing(&server, date, landing_html(None, None), 1).await;

    let data = TempDir::new().unwrap();
    let path = ResolutionState::path_for(data.path());
    let uri = result_uri(&server, &record_id(date, 1));
    let mut state = ResolutionState::load(&path);
    Resolver::new(&server.uri())
        .unwrap()
        .resolve_all(&test_client(), &mut state, &BTreeSet::from([uri.clone()]), false)
        .await
        .unwrap();

    let json: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(json.get(&uri), Some(&serde_json::Value::Null));
    assert!(state.xml_records().is_empty());
}

#[tokio::test]
async fn test_error_page_aborts_without_recording_item() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let good = "2009-02-12";
    let bad = "2009-02-13";
    mount_landing(&server, good, landing_html(Some(&xml_link(good)), None), 1).await;
    mount_landing(&server, bad, error_page(), 1).await;

    let data = TempDir::new().unwrap();
    let path = ResolutionState::path_for(data.path());
    let good_uri = result_uri(&server, &record_id(good, 1));
    let bad_uri = result_uri(&server, &record_id(bad, 1));
    let mut state = ResolutionState::load(&path);
    let result = Resolver::new(&server.uri())
        .unwrap()
        .resolve_all(
            &test_client(),
            &mut state,
            &BTreeSet::from([good_uri.clone(), bad_uri.clone()]),
            false,
        )
        .await;

    assert!(matches!(
        result,
        Err(ResolveError::Fetch(FetchError::DisguisedFailure { .. }))
    ));
    let saved = ResolutionState::load(&path);
    assert!(saved.get(&good_uri).is_some(), "resolved item must be saved");
    assert!(saved.get(&bad_uri).is_none(), "failed item must not be recorded");
}
