//! Search and fetch against local HTTP servers standing in for SearXNG and web hosts

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::{Json, Router};
use delve_core::{FetchSettings, SearchFailure, SearchResult, SearchSettings, SourceKind};
use delve_research::sources::fetcher::PDF_TOO_LARGE;
use delve_research::{ContentFetcher, HttpContentFetcher, SearchProvider, SearxngSearch};
use serde_json::json;

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn search_settings(base: &str) -> SearchSettings {
    SearchSettings {
        base_url: format!("{}/search", base),
        ..SearchSettings::default()
    }
}

#[tokio::test]
async fn test_search_backend_unavailable() {
    let base = serve(Router::new().route(
        "/search",
        get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
    ))
    .await;

    let search = SearxngSearch::new(&search_settings(&base)).unwrap();
    let results = search.search("remote work", 10).await;

    assert_eq!(
        results,
        vec![SearchResult::Failed(SearchFailure {
            error: "Search failed".to_string(),
            query: "remote work".to_string(),
        })]
    );
}

#[tokio::test]
async fn test_search_caps_results_and_fills_defaults() {
    let base = serve(Router::new().route(
        "/search",
        get(|| async {
            let results: Vec<_> = (1..=15)
                .map(|n| json!({"title": format!("Result {}", n), "url": format!("https://r{}.example", n), "content": "snippet"}))
                .chain(std::iter::once(json!({})))
                .collect();
            Json(json!({ "results": results }))
        }),
    ))
    .await;

    let search = SearxngSearch::new(&search_settings(&base)).unwrap();

    let results = search.search("solar", 10).await;
    assert_eq!(results.len(), 10);
    assert_eq!(results[0].as_hit().unwrap().title, "Result 1");

    let all = search.search("solar", 50).await;
    let last = all.last().and_then(SearchResult::as_hit).unwrap();
    assert_eq!(last.title, "No Title");
    assert_eq!(last.url, "#");
}

#[tokio::test]
async fn test_search_unreachable_backend() {
    let search = SearxngSearch::new(&SearchSettings {
        base_url: "http://127.0.0.1:9/search".to_string(),
        timeout_secs: 2,
        ..SearchSettings::default()
    })
    .unwrap();

    let results = search.search("anything", 5).await;
    match results.as_slice() {
        [SearchResult::Failed(failure)] => {
            assert!(failure.error.starts_with("Search failed"));
            assert_eq!(failure.query, "anything");
        }
        other => panic!("expected a single failure record, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_html_page() {
    let sentence = "Remote workers reported higher focus. ";
    let page = format!(
        "<html><head><title>t</title><script>track()</script></head><body>\
         <nav>Home | About</nav><main><h1>Findings</h1><p>{}</p></main>\
         <footer>Copyright</footer></body></html>",
        sentence.repeat(300)
    );
    let base = serve(Router::new().route("/article", get(move || async move { Html(page) }))).await;

    let fetcher = HttpContentFetcher::new(&FetchSettings::default()).unwrap();
    let document = fetcher.fetch(&format!("{}/article", base)).await;

    assert_eq!(document.source_kind, SourceKind::Html);
    assert!(document.truncated);
    assert!(document.clean_text.chars().count() <= 5000);
    assert!(document.clean_text.starts_with("Findings\nRemote workers"));
    assert!(document.clean_text.ends_with('.'));
    assert!(!document.clean_text.contains("track()"));
    assert!(!document.clean_text.contains("Home | About"));
}

#[tokio::test]
async fn test_fetch_html_error_status() {
    let base = serve(Router::new()).await;
    let url = format!("{}/missing", base);

    let fetcher = HttpContentFetcher::new(&FetchSettings::default()).unwrap();
    let document = fetcher.fetch(&url).await;

    assert!(document.is_error());
    assert!(document.clean_text.starts_with("Network error"));
    assert!(document.clean_text.contains("404"));
}

#[tokio::test]
async fn test_oversized_pdf_is_skipped() {
    let base = serve(Router::new().route(
        "/big.pdf",
        get(|| async {
            (
                [(header::CONTENT_TYPE, "application/pdf")],
                vec![b'%'; 11 * 1024 * 1024],
            )
        }),
    ))
    .await;

    let fetcher = HttpContentFetcher::new(&FetchSettings::default()).unwrap();
    let document = fetcher.fetch(&format!("{}/big.pdf", base)).await;

    assert!(document.is_error());
    assert_eq!(document.clean_text, PDF_TOO_LARGE);
}

#[tokio::test]
async fn test_streamed_pdf_without_length_is_capped() {
    let base = serve(Router::new().route(
        "/stream.pdf",
        get(|| async {
            let chunks = (0..4).map(|_| Ok::<_, std::io::Error>(vec![b'%'; 32 * 1024]));
            (
                [(header::CONTENT_TYPE, "application/pdf")],
                Body::from_stream(futures::stream::iter(chunks)),
            )
        }),
    ))
    .await;

    let fetcher = HttpContentFetcher::new(&FetchSettings {
        pdf_max_bytes: 64 * 1024,
        ..FetchSettings::default()
    })
    .unwrap();
    let document = fetcher.fetch(&format!("{}/stream.pdf", base)).await;

    assert!(document.is_error());
    assert_eq!(document.clean_text, PDF_TOO_LARGE);
}

#[tokio::test]
async fn test_pdf_heuristic_misfire_reports_content_type() {
    let base = serve(Router::new().route(
        "/view",
        get(|| async { Html("<p>not a pdf</p>").into_response() }),
    ))
    .await;

    let fetcher = HttpContentFetcher::new(&FetchSettings::default()).unwrap();
    let document = fetcher.fetch(&format!("{}/view?format=pdf", base)).await;

    assert!(document.is_error());
    assert!(document.clean_text.starts_with("[Not a PDF: text/html"));
}

#[tokio::test]
async fn test_invalid_pdf_bytes_yield_placeholder() {
    let base = serve(Router::new().route(
        "/broken.pdf",
        get(|| async { ([(header::CONTENT_TYPE, "application/pdf")], "definitely not a pdf") }),
    ))
    .await;

    let fetcher = HttpContentFetcher::new(&FetchSettings::default()).unwrap();
    let document = fetcher.fetch(&format!("{}/broken.pdf", base)).await;

    assert!(document.is_error());
    assert!(document.clean_text.starts_with("[PDF"));
}
