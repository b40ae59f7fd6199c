//! Static HTML pages.

use axum::response::Html;

const INDEX_HTML: &str = include_str!("../static/index.html");
const ANALYSIS_HTML: &str = include_str!("../static/analysis.html");

/// GET /: upload form.
pub async fn home() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// GET /analysis: latest report viewer.
pub async fn analysis() -> Html<&'static str> {
    Html(ANALYSIS_HTML)
}
