use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::browser::{
    BrowserContextId, SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::{BrowserError, BrowserHandle, BrowserLauncher, BrowsingContext, PageDriver};
use crate::config::ScraperConfig;

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const PARTIAL_DOWNLOAD_SUFFIX: &str = ".crdownload";

static CONTEXT_SEQ: AtomicU64 = AtomicU64::new(0);

impl From<CdpError> for BrowserError {
    fn from(e: CdpError) -> Self {
        BrowserError::Cdp(e.to_string())
    }
}

/// JSON string literal, which is also a valid JS string literal.
fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// Launches headless Chrome with the sandbox flags container hosts need.
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    chrome_path: Option<PathBuf>,
    user_agent: String,
    request_timeout: Duration,
}

impl ChromeLauncher {
    pub fn new(config: &ScraperConfig) -> Self {
        Self {
            chrome_path: config.chrome_path.clone(),
            user_agent: config.user_agent.clone(),
            request_timeout: config.navigation_timeout,
        }
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn launch(&self) -> Result<Arc<dyn BrowserHandle>, BrowserError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .request_timeout(self.request_timeout);
        if let Some(path) = &self.chrome_path {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    log::debug!("DevTools handler event error: {}", e);
                }
            }
            log::info!("Browser connection closed");
        });

        let download_root =
            std::env::temp_dir().join(format!("causelist-downloads-{}", std::process::id()));

        Ok(Arc::new(ChromeBrowser {
            browser: Arc::new(Mutex::new(browser)),
            handler,
            user_agent: self.user_agent.clone(),
            download_root,
        }))
    }
}

struct ChromeBrowser {
    browser: Arc<Mutex<Browser>>,
    handler: JoinHandle<()>,
    user_agent: String,
    download_root: PathBuf,
}

#[async_trait]
impl BrowserHandle for ChromeBrowser {
    fn is_connected(&self) -> bool {
        !self.handler.is_finished()
    }

    async fn new_context(&self) -> Result<Box<dyn BrowsingContext>, BrowserError> {
        let download_dir = self
            .download_root
            .join(format!("ctx-{}", CONTEXT_SEQ.fetch_add(1, Ordering::Relaxed)));
        tokio::fs::create_dir_all(&download_dir).await?;

        let browser = self.browser.lock().await;
        let id = browser
            .execute(CreateBrowserContextParams::default())
            .await?
            .result
            .browser_context_id;

        let mut downloads = SetDownloadBehaviorParams::new(SetDownloadBehaviorBehavior::Allow);
        downloads.browser_context_id = Some(id.clone());
        downloads.download_path = Some(download_dir.to_string_lossy().into_owned());
        browser.execute(downloads).await?;

        log::debug!("Opened browser context, downloads in {}", download_dir.display());

        Ok(Box::new(ChromeContext {
            browser: Arc::clone(&self.browser),
            id,
            user_agent: self.user_agent.clone(),
            download_dir,
        }))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        let mut browser = self.browser.lock().await;
        let closed = browser.close().await;
        if let Err(e) = browser.wait().await {
            log::warn!("Failed to reap browser process: {}", e);
        }
        self.handler.abort();

        if let Err(e) = tokio::fs::remove_dir_all(&self.download_root).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            log::warn!("Failed to remove download directory: {}", e);
        }

        closed.map(|_| ()).map_err(BrowserError::from)
    }
}

struct ChromeContext {
    browser: Arc<Mutex<Browser>>,
    id: BrowserContextId,
    user_agent: String,
    download_dir: PathBuf,
}

#[async_trait]
impl BrowsingContext for ChromeContext {
    async fn new_page(&self) -> Result<Box<dyn PageDriver>, BrowserError> {
        let mut target = CreateTargetParams::new("about:blank");
        target.browser_context_id = Some(self.id.clone());

        let page = self.browser.lock().await.new_page(target).await?;
        page.execute(SetUserAgentOverrideParams::new(self.user_agent.clone()))
            .await?;

        Ok(Box::new(ChromePage {
            page,
            download_dir: self.download_dir.clone(),
        }))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        let disposed = self
            .browser
            .lock()
            .await
            .execute(DisposeBrowserContextParams::new(self.id.clone()))
            .await;

        if let Err(e) = tokio::fs::remove_dir_all(&self.download_dir).await {
            log::warn!(
                "Failed to remove {}: {}",
                self.download_dir.display(),
                e
            );
        }

        disposed.map(|_| ()).map_err(BrowserError::from)
    }
}

struct ChromePage {
    page: Page,
    download_dir: PathBuf,
}

impl ChromePage {
    async fn eval<T: DeserializeOwned>(&self, script: String) -> Result<T, BrowserError> {
        self.page
            .evaluate(script.as_str())
            .await?
            .into_value::<T>()
            .map_err(|e| BrowserError::Cdp(format!("unexpected script result: {}", e)))
    }

    async fn wait_until_ready(&self, what: &str, timeout: Duration) -> Result<(), BrowserError> {
        let deadline = Instant::now() + timeout;
        loop {
            let state: String = self.eval("document.readyState".to_string()).await?;
            if state != "loading" {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::Timeout {
                    what: what.to_string(),
                    after: timeout,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), BrowserError> {
        let response = self.page.execute(NavigateParams::new(url)).await?;
        if let Some(error) = response.result.error_text.as_deref() {
            return Err(BrowserError::Cdp(format!("navigation to {} failed: {}", url, error)));
        }
        self.wait_until_ready(url, timeout).await
    }
}

async fn finished_downloads(dir: &Path) -> std::io::Result<HashSet<PathBuf>> {
    let mut files = HashSet::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let partial = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(PARTIAL_DOWNLOAD_SUFFIX));
        if entry.file_type().await?.is_file() && !partial {
            files.insert(path);
        }
    }
    Ok(files)
}

#[async_trait]
impl PageDriver for ChromePage {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), BrowserError> {
        log::info!("Navigating to {}...", url);
        tokio::time::timeout(timeout, self.navigate(url, timeout))
            .await
            .map_err(|_| BrowserError::Timeout {
                what: format!("navigation to {}", url),
                after: timeout,
            })?
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), BrowserError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::Timeout {
                    what: selector.to_string(),
                    after: timeout,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn option_values(&self, selector: &str) -> Result<Vec<String>, BrowserError> {
        self.eval(format!(
            "Array.from(document.querySelectorAll({})).map(o => o.getAttribute('value') ?? '')",
            js_string(&format!("{} option", selector))
        ))
        .await
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<(), BrowserError> {
        let found: bool = self
            .eval(format!(
                "(() => {{ const el = document.querySelector({}); if (!el) return false; \
                 el.value = {}; el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
                 return true; }})()",
                js_string(selector),
                js_string(value)
            ))
            .await?;
        if found {
            Ok(())
        } else {
            Err(BrowserError::ElementNotFound(selector.to_string()))
        }
    }

    async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::ElementNotFound(selector.to_string()))?;
        element.click().await?;
        Ok(())
    }

    async fn submit(&self, selector: &str, timeout: Duration) -> Result<(), BrowserError> {
        self.click(selector).await?;
        tokio::time::timeout(timeout, self.page.wait_for_navigation())
            .await
            .map_err(|_| BrowserError::Timeout {
                what: format!("navigation after clicking {}", selector),
                after: timeout,
            })??;
        self.wait_until_ready(selector, timeout).await
    }

    async fn content(&self) -> Result<String, BrowserError> {
        Ok(self.page.content().await?)
    }

    async fn count(&self, selector: &str) -> Result<usize, BrowserError> {
        self.eval(format!(
            "document.querySelectorAll({}).length",
            js_string(selector)
        ))
        .await
    }

    async fn count_links_containing(&self, text: &str) -> Result<usize, BrowserError> {
        self.eval(format!(
            "(() => {{ const needle = {}.toLowerCase(); \
             return Array.from(document.querySelectorAll('a')) \
             .filter(a => (a.textContent || '').toLowerCase().includes(needle)).length; }})()",
            js_string(text)
        ))
        .await
    }

    async fn download_link(&self, text: &str, timeout: Duration) -> Result<Vec<u8>, BrowserError> {
        let before = finished_downloads(&self.download_dir).await?;

        let clicked: bool = self
            .eval(format!(
                "(() => {{ const needle = {}.toLowerCase(); \
                 const link = Array.from(document.querySelectorAll('a')) \
                 .find(a => (a.textContent || '').toLowerCase().includes(needle)); \
                 if (!link) return false; link.click(); return true; }})()",
                js_string(text)
            ))
            .await?;
        if !clicked {
            return Err(BrowserError::ElementNotFound(format!("link '{}'", text)));
        }

        let deadline = Instant::now() + timeout;
        let file = loop {
            if let Some(file) = finished_downloads(&self.download_dir)
                .await?
                .difference(&before)
                .next()
                .cloned()
            {
                break file;
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::Download(format!(
                    "no file after clicking '{}' within {:?}",
                    text, timeout
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        };

        log::info!("Downloaded {}", file.display());
        let bytes = tokio::fs::read(&file).await?;

        if let Err(e) = tokio::fs::remove_file(&file).await {
            log::warn!("Failed to remove {}: {}", file.display(), e);
        }

        Ok(bytes)
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.page.clone().close().await?;
        Ok(())
    }
}
