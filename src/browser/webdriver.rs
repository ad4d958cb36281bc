// W3C WebDriver client
// Speaks the wire protocol directly over HTTP (chromedriver, geckodriver, or
// a Selenium hub). One session per illustration batch; each unit of work gets
// its own window, so at most one page is in use at a time.
// Protocol reference: https://www.w3.org/TR/webdriver2/

use crate::browser::{Browser, BrowserSession, ImageElement, PageHandle};
use crate::config::BrowserConfig;
use crate::types::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Key under which the W3C protocol nests an element reference.
const ELEMENT_ID_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Upper bound on per-page element geometry probes. Image search results pages
/// can carry hundreds of `<img>` nodes; everything past this many cannot
/// affect the selection anyway.
const MAX_IMAGE_PROBES: usize = 16;

pub struct WebDriverBrowser {
    wd: WdClient,
    implicit_wait_ms: u64,
}

impl WebDriverBrowser {
    pub fn new(config: &BrowserConfig) -> Self {
        Self {
            wd: WdClient {
                http: Client::new(),
                base_url: config.webdriver_url.trim_end_matches('/').to_string(),
            },
            implicit_wait_ms: config.implicit_wait_ms,
        }
    }
}

#[async_trait]
impl Browser for WebDriverBrowser {
    async fn launch(&self) -> AppResult<Box<dyn BrowserSession>> {
        let created: NewSessionValue = self
            .wd
            .post(
                "/session",
                json!({
                    "capabilities": {
                        "alwaysMatch": {
                            "browserName": "chrome",
                            "goog:chromeOptions": {
                                "args": ["--headless=new", "--window-size=1280,1024"]
                            }
                        }
                    }
                }),
            )
            .await?;

        let session_id = created.session_id;
        debug!(session_id = %session_id, "WebDriver session created");

        // Bound every element lookup so a stalled page cannot hang a batch.
        self.wd
            .post::<serde_json::Value>(
                &format!("/session/{session_id}/timeouts"),
                json!({ "implicit": self.implicit_wait_ms }),
            )
            .await?;

        let root_handle: String = self
            .wd
            .get(&format!("/session/{session_id}/window"))
            .await?;

        Ok(Box::new(WebDriverSession {
            wd: self.wd.clone(),
            session_id,
            root_handle,
            released: false,
        }))
    }
}

pub struct WebDriverSession {
    wd: WdClient,
    session_id: String,
    root_handle: String,
    released: bool,
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn open_page(&mut self) -> AppResult<Box<dyn PageHandle>> {
        let window: NewWindowValue = self
            .wd
            .post(
                &format!("/session/{}/window/new", self.session_id),
                json!({ "type": "tab" }),
            )
            .await?;

        self.wd
            .post::<serde_json::Value>(
                &format!("/session/{}/window", self.session_id),
                json!({ "handle": window.handle }),
            )
            .await?;

        Ok(Box::new(WebDriverPage {
            wd: self.wd.clone(),
            session_id: self.session_id.clone(),
            handle: window.handle,
            root_handle: self.root_handle.clone(),
            closed: false,
        }))
    }

    async fn close(self: Box<Self>) -> AppResult<()> {
        let mut this = self;
        this.released = true;
        this.wd
            .delete::<serde_json::Value>(&format!("/session/{}", this.session_id))
            .await?;
        debug!(session_id = %this.session_id, "WebDriver session released");
        Ok(())
    }
}

impl Drop for WebDriverSession {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        // Abandoned without an explicit close (cancellation path). Release the
        // remote browser on a background task so it is never leaked.
        let wd = self.wd.clone();
        let session_id = self.session_id.clone();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(e) = wd
                    .delete::<serde_json::Value>(&format!("/session/{session_id}"))
                    .await
                {
                    warn!(error = %e, session_id = %session_id, "Failed to release abandoned WebDriver session");
                }
            });
        }
    }
}

pub struct WebDriverPage {
    wd: WdClient,
    session_id: String,
    handle: String,
    root_handle: String,
    closed: bool,
}

impl WebDriverPage {
    async fn close_window(
        wd: &WdClient,
        session_id: &str,
        handle: &str,
        root_handle: &str,
    ) -> AppResult<()> {
        wd.post::<serde_json::Value>(
            &format!("/session/{session_id}/window"),
            json!({ "handle": handle }),
        )
        .await?;
        wd.delete::<serde_json::Value>(&format!("/session/{session_id}/window"))
            .await?;
        wd.post::<serde_json::Value>(
            &format!("/session/{session_id}/window"),
            json!({ "handle": root_handle }),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl PageHandle for WebDriverPage {
    async fn navigate(&mut self, url: &str) -> AppResult<()> {
        self.wd
            .post::<serde_json::Value>(
                &format!("/session/{}/url", self.session_id),
                json!({ "url": url }),
            )
            .await?;
        Ok(())
    }

    async fn images(&mut self) -> AppResult<Vec<ImageElement>> {
        // Finding elements honors the session's implicit wait, so this blocks
        // (bounded) until at least one image is present.
        let elements: Vec<HashMap<String, String>> = self
            .wd
            .post(
                &format!("/session/{}/elements", self.session_id),
                json!({ "using": "css selector", "value": "img" }),
            )
            .await?;

        let mut images = Vec::new();
        for element in elements.iter().take(MAX_IMAGE_PROBES) {
            let Some(element_id) = element
                .get(ELEMENT_ID_KEY)
                .or_else(|| element.values().next())
            else {
                continue;
            };

            let rect: ElementRect = match self
                .wd
                .get(&format!(
                    "/session/{}/element/{}/rect",
                    self.session_id, element_id
                ))
                .await
            {
                Ok(rect) => rect,
                Err(e) => {
                    // Result grids mutate while loading; a stale element just
                    // drops out of consideration.
                    debug!(error = %e, "Skipping stale image element");
                    continue;
                }
            };

            let src: Option<String> = match self
                .wd
                .get(&format!(
                    "/session/{}/element/{}/property/src",
                    self.session_id, element_id
                ))
                .await
            {
                Ok(src) => src,
                Err(e) => {
                    debug!(error = %e, "Skipping image element without src");
                    continue;
                }
            };

            if let Some(src) = src.filter(|s| !s.is_empty()) {
                images.push(ImageElement {
                    src,
                    width: rect.width,
                    height: rect.height,
                });
            }
        }

        Ok(images)
    }

    async fn close(self: Box<Self>) -> AppResult<()> {
        let mut this = self;
        this.closed = true;
        Self::close_window(&this.wd, &this.session_id, &this.handle, &this.root_handle).await
    }
}

impl Drop for WebDriverPage {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let wd = self.wd.clone();
        let session_id = self.session_id.clone();
        let handle = self.handle.clone();
        let root_handle = self.root_handle.clone();
        if let Ok(rt) = tokio::runtime::Handle::try_current() {
            rt.spawn(async move {
                if let Err(e) =
                    WebDriverPage::close_window(&wd, &session_id, &handle, &root_handle).await
                {
                    debug!(error = %e, "Failed to close abandoned WebDriver window");
                }
            });
        }
    }
}

// ── Wire plumbing ─────────────────────────────────────────────────────────

#[derive(Clone)]
struct WdClient {
    http: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct WdValue<T> {
    value: T,
}

#[derive(Deserialize)]
struct WdErrorValue {
    error: String,
    message: String,
}

#[derive(Deserialize)]
struct NewSessionValue {
    #[serde(rename = "sessionId")]
    session_id: String,
}

#[derive(Deserialize)]
struct NewWindowValue {
    handle: String,
}

#[derive(Deserialize)]
struct ElementRect {
    width: f64,
    height: f64,
}

impl WdClient {
    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> AppResult<T> {
        self.execute(Method::POST, path, Some(body)).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        self.execute(Method::GET, path, None).await
    }

    async fn delete<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        self.execute(Method::DELETE, path, None).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> AppResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Browser(format!("WebDriver request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::Browser(format!("WebDriver response read failed: {e}")))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<WdValue<WdErrorValue>>(&text)
                .map(|e| format!("{}: {}", e.value.error, e.value.message))
                .unwrap_or_else(|_| format!("HTTP {status}"));
            return Err(AppError::Browser(format!("WebDriver error: {detail}")));
        }

        serde_json::from_str::<WdValue<T>>(&text)
            .map(|v| v.value)
            .map_err(|e| AppError::Browser(format!("WebDriver response decode failed: {e}")))
    }
}
