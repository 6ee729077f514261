//! HTTP routes serving the feed.
//!
//! - `GET /events.ics`: the latest published document
//! - `GET /`: a landing page with subscribe and download links

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{debug, info};
use url::{Position, Url};

use crate::error::{ServerError, ServerResult};
use crate::mailbox::MailboxReceiver;

/// Path of the feed.
pub const FEED_PATH: &str = "/events.ics";

const CALENDAR_CONTENT_TYPE: &str = "text/calendar; charset=utf-8";
const CALENDAR_DISPOSITION: &str = "attachment; filename=events.ics";

/// Texts of the landing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSettings {
    /// Page title and heading.
    pub title: String,
    /// Text of the subscribe link.
    pub subscribe_text: String,
    /// Explanation below the subscribe link.
    pub subscribe_description: String,
    /// Text of the download link.
    pub download_text: String,
    /// Explanation below the download link.
    pub download_description: String,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            title: "Events".to_string(),
            subscribe_text: "Subscribe to calendar".to_string(),
            subscribe_description: "Most calendar apps can subscribe to this calendar with \
                                    the link above and keep it up to date automatically."
                .to_string(),
            download_text: "Direct download (.ics)".to_string(),
            download_description: "If subscribing does not work, the calendar can also be \
                                   downloaded directly."
                .to_string(),
        }
    }
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    feed: MailboxReceiver,
    landing_page: Arc<str>,
}

impl AppState {
    /// Creates the state, rendering the landing page once.
    pub fn new(feed: MailboxReceiver, page: &PageSettings, base_url: Option<&Url>) -> Self {
        Self {
            feed,
            landing_page: render_landing_page(page, base_url).into(),
        }
    }
}

/// Builds the router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(landing_page))
        .route(FEED_PATH, get(feed))
        .with_state(state)
}

/// Binds the listen address.
pub async fn bind(address: SocketAddr) -> ServerResult<TcpListener> {
    let listener = TcpListener::bind(address)
        .await
        .map_err(|e| ServerError::bind(address.to_string(), e))?;
    info!(address = %address, "Feed server listening");
    Ok(listener)
}

/// Serves `router` until `shutdown` completes.
pub async fn serve<S>(listener: TcpListener, router: Router, shutdown: S) -> ServerResult<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("Feed server stopped");
    Ok(())
}

/// GET /events.ics - Latest document
async fn feed(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");

    let Some(document) = state.feed.latest() else {
        debug!(user_agent = %user_agent, "Feed requested before first publish");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::RETRY_AFTER, "60")],
            "calendar not available yet\n",
        )
            .into_response();
    };

    info!(
        user_agent = %user_agent,
        fingerprint = %document.fingerprint(),
        "Serving calendar"
    );
    (
        [
            (header::CONTENT_TYPE, CALENDAR_CONTENT_TYPE),
            (header::CONTENT_DISPOSITION, CALENDAR_DISPOSITION),
        ],
        document.content().to_owned(),
    )
        .into_response()
}

/// GET / - Landing page
async fn landing_page(State(state): State<AppState>) -> Html<String> {
    Html(state.landing_page.to_string())
}

/// Returns the download and subscribe links.
///
/// Without a base URL both links are relative.
pub fn feed_links(base_url: Option<&Url>) -> (String, String) {
    let Some(base) = base_url else {
        return (FEED_PATH.to_string(), FEED_PATH.to_string());
    };

    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    let download = match base.join(FEED_PATH.trim_start_matches('/')) {
        Ok(url) => url,
        Err(_) => return (FEED_PATH.to_string(), FEED_PATH.to_string()),
    };
    let subscribe = format!("webcal://{}", &download[Position::BeforeUsername..]);
    (download.to_string(), subscribe)
}

fn render_landing_page(page: &PageSettings, base_url: Option<&Url>) -> String {
    use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};

    let (download, subscribe) = feed_links(base_url);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
</head>
<body>
<main>
<h1>{title}</h1>
<p><a href="{subscribe}">{subscribe_text}</a></p>
<p>{subscribe_description}</p>
<p><a href="{download}">{download_text}</a></p>
<p>{download_description}</p>
</main>
</body>
</html>
"#,
        title = text(&page.title),
        subscribe = attr(&subscribe),
        subscribe_text = text(&page.subscribe_text),
        subscribe_description = text(&page.subscribe_description),
        download = attr(&download),
        download_text = text(&page.download_text),
        download_description = text(&page.download_description),
    )
}
