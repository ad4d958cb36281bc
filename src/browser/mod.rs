//! Browser Automation
//!
//! Thin seam over a remote-controlled browser, used by the illustrator to
//! find artwork images. The traits model exactly what the pipeline needs:
//! launch a session, open one page at a time, navigate, and inspect image
//! elements with their on-screen geometry. `webdriver` implements them over
//! the W3C WebDriver REST protocol; tests substitute in-memory mocks.

pub mod webdriver;

use crate::types::AppResult;
use async_trait::async_trait;

pub use webdriver::WebDriverBrowser;

/// An `<img>` element with its rendered geometry.
#[derive(Debug, Clone)]
pub struct ImageElement {
    pub src: String,
    pub width: f64,
    pub height: f64,
}

#[async_trait]
pub trait Browser: Send + Sync {
    async fn launch(&self) -> AppResult<Box<dyn BrowserSession>>;
}

/// A live browser session. Dropping a session without calling `close` releases
/// it on a best-effort background task, so a cancelled request never leaks the
/// remote browser.
#[async_trait]
pub trait BrowserSession: Send {
    /// Open a fresh page scoped to one unit of work. Only one page is expected
    /// to be open at a time.
    async fn open_page(&mut self) -> AppResult<Box<dyn PageHandle>>;

    async fn close(self: Box<Self>) -> AppResult<()>;
}

#[async_trait]
pub trait PageHandle: Send {
    async fn navigate(&mut self, url: &str) -> AppResult<()>;

    /// Image elements currently present, waiting (bounded by the session's
    /// implicit-wait timeout) for at least one to appear.
    async fn images(&mut self) -> AppResult<Vec<ImageElement>>;

    async fn close(self: Box<Self>) -> AppResult<()>;
}
