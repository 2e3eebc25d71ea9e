//! ParlInfo-shaped responses and client settings for mock-server tests.

use std::time::Duration;

use harvester_core::{HttpClient, HttpSettings, RetryPolicy, ServiceConfig};
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ERROR_MARKER: &str = "ParlInfo - Error";

/// Client with short timeouts and two immediate attempts per request.
pub fn test_client() -> HttpClient {
    let settings = HttpSettings {
        connect_timeout_secs: 2,
        read_timeout_secs: 5,
        retry_policy: RetryPolicy::new(2, Duration::ZERO),
        error_page_marker: ERROR_MARKER.to_string(),
    };
    HttpClient::new(&settings).unwrap()
}

/// Service endpoints pointing at `server`.
pub fn test_service(server: &MockServer) -> ServiceConfig {
    ServiceConfig {
        feed_url: format!("{}/parlInfo/feeds/rss.w3p", server.uri()),
        origin: server.uri(),
        ..ServiceConfig::default()
    }
}

/// Record identifier of fragment `fragment` of the House sitting on `date`.
pub fn record_id(date: &str, fragment: u32) -> String {
    format!("chamber/hansardr/{date}/{fragment:04}")
}

/// Result-page URI carrying `id`, hosted on `server`.
pub fn result_uri(server: &MockServer, id: &str) -> String {
    format!(
        "{}/parlInfo/search/display/display.w3p;query=Id%3A%22{}%22",
        server.uri(),
        urlencoding::encode(id)
    )
}

/// Relative XML asset link of the sitting on `date`.
pub fn xml_link(date: &str) -> String {
    format!("/parlInfo/download/chamber/hansardr/{date}/toc_unixml/{date}.xml;fileType=text%2Fxml")
}

/// Relative PDF asset link of the sitting on `date`.
pub fn pdf_link(date: &str) -> String {
    format!(
        "/parlInfo/download/chamber/hansardr/{date}/toc_pdf/{date}.pdf;fileType=application%2Fpdf"
    )
}

/// RSS feed page listing `items` as (title, guid).
pub fn feed_xml(items: &[(String, String)]) -> String {
    let mut body = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss version=\"2.0\"><channel><title>ParlInfo Search Results</title>\n",
    );
    for (title, guid) in items {
        body.push_str(&format!(
            "<item><title>{title}</title><guid>{guid}</guid></item>\n"
        ));
    }
    body.push_str("</channel></rss>\n");
    body
}

/// Feed items for fragments `1..=count` of the sitting on `date`.
pub fn sitting_items(server: &MockServer, date: &str, count: u32) -> Vec<(String, String)> {
    (1..=count)
        .map(|fragment| {
            (
                format!("House of Representatives {date} part {fragment}"),
                result_uri(server, &record_id(date, fragment)),
            )
        })
        .collect()
}

/// Landing page linking the given assets, plus the in-page PDF viewer link.
pub fn landing_html(xml: Option<&str>, pdf: Option<&str>) -> String {
    let mut body = String::from("<html><head><title>ParlInfo - Hansard</title></head><body>\n");
    body.push_str("<a href=\"/parlInfo/search/summary/summary.w3p\">Back to results</a>\n");
    if let Some(pdf) = pdf {
        body.push_str(&format!("<a href=\"{pdf}#search=%22hansard%22\">View PDF</a>\n"));
        body.push_str(&format!("<a href=\"{pdf}\">Download PDF</a>\n"));
    }
    if let Some(xml) = xml {
        body.push_str(&format!("<a href=\"{xml}\">Download XML</a>\n"));
    }
    body.push_str("</body></html>\n");
    body
}

/// Body of an error page served with HTTP 200.
pub fn error_page() -> String {
    format!("<html><head><title>{ERROR_MARKER}</title></head><body>Search failed</body></html>")
}

/// Hansard transcript of the sitting on `date`.
pub fn hansard_xml(date: &str) -> String {
    format!(
        "<?xml version=\"1.0\"?>\n<hansard><session.header><date>{date}</date><parliament.no>42</parliament.no><session.no>1</session.no><chamber>REPS</chamber><page.no>1</page.no><proof>0</proof></session.header></hansard>\n"
    )
}

/// Mounts feed page `page` with `items`, expecting `expected` requests.
pub async fn mount_feed_page(
    server: &MockServer,
    page: u32,
    items: &[(String, String)],
    expected: u64,
) {
    Mock::given(method("GET"))
        .and(path_regex(format!(r"rss\.w3p;.*;page={page};")))
        .respond_with(ResponseTemplate::new(200).set_body_string(feed_xml(items)))
        .expect(expected)
        .mount(server)
        .await;
}

/// Mounts the landing page of the sitting on `date`, expecting `expected` requests.
pub async fn mount_landing(server: &MockServer, date: &str, body: String, expected: u64) {
    Mock::given(method("GET"))
        .and(path_regex(format!(r"display\.w3p;.*{date}")))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(expected)
        .mount(server)
        .await;
}

/// Mounts the XML transcript of the sitting on `date`, expecting `expected` requests.
pub async fn mount_transcript(server: &MockServer, date: &str, expected: u64) {
    Mock::given(method("GET"))
        .and(path_regex(format!(r"toc_unixml/{date}\.xml")))
        .respond_with(ResponseTemplate::new(200).set_body_string(hansard_xml(date)))
        .expect(expected)
        .mount(server)
        .await;
}
