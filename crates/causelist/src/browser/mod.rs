//! Browser session seams. The engine only talks to these traits; the
//! production implementation in [`chrome`] drives Chrome over the DevTools
//! protocol.

pub mod chrome;

#[cfg(test)]
pub(crate) mod fake;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

pub use chrome::ChromeLauncher;

#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),
    #[error("DevTools command failed: {0}")]
    Cdp(String),
    #[error("Timed out after {after:?} waiting for {what}")]
    Timeout { what: String, after: Duration },
    #[error("Element not found: {0}")]
    ElementNotFound(String),
    #[error("Download failed: {0}")]
    Download(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One open tab.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigates and returns once the DOM is constructed.
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), BrowserError>;

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), BrowserError>;

    /// `value` attributes of every `<option>` under `selector`.
    async fn option_values(&self, selector: &str) -> Result<Vec<String>, BrowserError>;

    async fn select_option(&self, selector: &str, value: &str) -> Result<(), BrowserError>;

    async fn click(&self, selector: &str) -> Result<(), BrowserError>;

    /// Clicks and waits for the navigation the click triggers.
    async fn submit(&self, selector: &str, timeout: Duration) -> Result<(), BrowserError>;

    async fn content(&self) -> Result<String, BrowserError>;

    async fn count(&self, selector: &str) -> Result<usize, BrowserError>;

    /// Number of links whose visible text contains `text`, case-insensitive.
    async fn count_links_containing(&self, text: &str) -> Result<usize, BrowserError>;

    /// Clicks the first link containing `text` and returns the downloaded
    /// file's bytes.
    async fn download_link(&self, text: &str, timeout: Duration) -> Result<Vec<u8>, BrowserError>;

    async fn close(&self) -> Result<(), BrowserError>;
}

/// Isolated cookie/storage scope with downloads enabled and the desktop
/// user agent applied to every page it opens.
#[async_trait]
pub trait BrowsingContext: Send + Sync {
    async fn new_page(&self) -> Result<Box<dyn PageDriver>, BrowserError>;
    async fn close(&self) -> Result<(), BrowserError>;
}

#[async_trait]
pub trait BrowserHandle: Send + Sync {
    fn is_connected(&self) -> bool;
    async fn new_context(&self) -> Result<Box<dyn BrowsingContext>, BrowserError>;
    async fn close(&self) -> Result<(), BrowserError>;
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Arc<dyn BrowserHandle>, BrowserError>;
}

/// Owns the single shared browser process.
///
/// The live handle sits behind an async mutex that is held for the whole
/// launch, so callers arriving mid-launch queue on the lock and then reuse
/// the freshly launched handle.
pub struct SessionManager {
    launcher: Box<dyn BrowserLauncher>,
    launch_timeout: Duration,
    browser: Mutex<Option<Arc<dyn BrowserHandle>>>,
}

impl SessionManager {
    pub fn new(launcher: impl BrowserLauncher + 'static, launch_timeout: Duration) -> Self {
        Self {
            launcher: Box::new(launcher),
            launch_timeout,
            browser: Mutex::new(None),
        }
    }

    pub async fn acquire(&self) -> Result<Arc<dyn BrowserHandle>, BrowserError> {
        let mut slot = self.browser.lock().await;

        if let Some(browser) = slot.as_ref() {
            if browser.is_connected() {
                return Ok(Arc::clone(browser));
            }
            log::warn!("Browser disconnected, relaunching");
            if let Some(stale) = slot.take() {
                if let Err(e) = stale.close().await {
                    log::warn!("Failed to close disconnected browser: {}", e);
                }
            }
        }

        log::info!("Launching browser...");
        let browser = tokio::time::timeout(self.launch_timeout, self.launcher.launch())
            .await
            .map_err(|_| BrowserError::Timeout {
                what: "browser launch".to_string(),
                after: self.launch_timeout,
            })?
            .inspect_err(|e| log::error!("Browser launch failed: {}", e))?;
        log::info!("Browser launched successfully");

        *slot = Some(Arc::clone(&browser));
        Ok(browser)
    }

    /// A fresh isolated context on the shared browser, launching it if needed.
    pub async fn new_context(&self) -> Result<Box<dyn BrowsingContext>, BrowserError> {
        let browser = self.acquire().await?;
        browser.new_context().await
    }

    pub async fn is_live(&self) -> bool {
        self.browser
            .lock()
            .await
            .as_ref()
            .is_some_and(|b| b.is_connected())
    }

    /// Closes the browser process if one is live. Safe to call repeatedly.
    pub async fn shutdown(&self) -> Result<(), BrowserError> {
        let browser = self.browser.lock().await.take();
        match browser {
            Some(browser) => {
                log::info!("Closing browser...");
                browser.close().await
            }
            None => Ok(()),
        }
    }
}
