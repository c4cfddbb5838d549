//! Scripted in-memory browser for engine tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{BrowserError, BrowserHandle, BrowserLauncher, BrowsingContext, PageDriver};

#[derive(Debug, Clone, Default)]
pub(crate) struct SiteScript {
    /// Values offered by the `#ct_date` dropdown.
    pub dates: Vec<String>,
    /// Markup served once the daily list is submitted.
    pub results_html: String,
    pub court_links: Vec<String>,
    pub pdf: Option<Vec<u8>>,
    /// Navigations that time out before one succeeds.
    pub goto_failures: u32,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct SiteStats {
    pub contexts_opened: usize,
    pub contexts_closed: usize,
    pub pages_opened: usize,
    pub pages_closed: usize,
    pub navigations: Vec<String>,
    pub selected_date: Option<String>,
    pub submits: usize,
    pub downloads: Vec<String>,
}

#[derive(Clone, Default)]
pub(crate) struct FakeSite {
    state: Arc<Mutex<(SiteScript, SiteStats)>>,
}

impl FakeSite {
    pub fn new(script: SiteScript) -> Self {
        Self {
            state: Arc::new(Mutex::new((script, SiteStats::default()))),
        }
    }

    pub fn stats(&self) -> SiteStats {
        self.state.lock().unwrap().1.clone()
    }

    fn with<R>(&self, f: impl FnOnce(&mut SiteScript, &mut SiteStats) -> R) -> R {
        let mut guard = self.state.lock().unwrap();
        let (script, stats) = &mut *guard;
        f(script, stats)
    }
}

fn timeout(what: &str) -> BrowserError {
    BrowserError::Timeout {
        what: what.to_string(),
        after: Duration::from_secs(10),
    }
}

struct FakePage {
    site: FakeSite,
}

#[async_trait]
impl PageDriver for FakePage {
    async fn goto(&self, url: &str, _timeout: Duration) -> Result<(), BrowserError> {
        self.site.with(|script, stats| {
            stats.navigations.push(url.to_string());
            if script.goto_failures > 0 {
                script.goto_failures -= 1;
                return Err(timeout(url));
            }
            Ok(())
        })
    }

    async fn wait_for(&self, selector: &str, _timeout: Duration) -> Result<(), BrowserError> {
        if self.count(selector).await? > 0 {
            Ok(())
        } else {
            Err(timeout(selector))
        }
    }

    async fn option_values(&self, _selector: &str) -> Result<Vec<String>, BrowserError> {
        Ok(self.site.with(|script, _| script.dates.clone()))
    }

    async fn select_option(&self, _selector: &str, value: &str) -> Result<(), BrowserError> {
        self.site
            .with(|_, stats| stats.selected_date = Some(value.to_string()));
        Ok(())
    }

    async fn click(&self, _selector: &str) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn submit(&self, _selector: &str, _timeout: Duration) -> Result<(), BrowserError> {
        self.site.with(|_, stats| stats.submits += 1);
        Ok(())
    }

    async fn content(&self) -> Result<String, BrowserError> {
        Ok(self.site.with(|script, _| script.results_html.clone()))
    }

    async fn count(&self, selector: &str) -> Result<usize, BrowserError> {
        Ok(self.site.with(|script, _| match selector {
            "table" => script.results_html.matches("<table").count(),
            "#ct_date option" => script.dates.len(),
            _ => 1,
        }))
    }

    async fn count_links_containing(&self, text: &str) -> Result<usize, BrowserError> {
        let needle = text.to_lowercase();
        Ok(self.site.with(|script, _| {
            script
                .court_links
                .iter()
                .filter(|label| label.to_lowercase().contains(&needle))
                .count()
        }))
    }

    async fn download_link(&self, text: &str, _timeout: Duration) -> Result<Vec<u8>, BrowserError> {
        self.site.with(|script, stats| {
            stats.downloads.push(text.to_string());
            script
                .pdf
                .clone()
                .ok_or_else(|| BrowserError::Download(format!("no file behind '{}'", text)))
        })
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.site.with(|_, stats| stats.pages_closed += 1);
        Ok(())
    }
}

struct FakeContext {
    site: FakeSite,
}

#[async_trait]
impl BrowsingContext for FakeContext {
    async fn new_page(&self) -> Result<Box<dyn PageDriver>, BrowserError> {
        self.site.with(|_, stats| stats.pages_opened += 1);
        Ok(Box::new(FakePage {
            site: self.site.clone(),
        }))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.site.with(|_, stats| stats.contexts_closed += 1);
        Ok(())
    }
}

struct FakeBrowser {
    site: FakeSite,
    connected: AtomicBool,
}

#[async_trait]
impl BrowserHandle for FakeBrowser {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn new_context(&self) -> Result<Box<dyn BrowsingContext>, BrowserError> {
        self.site.with(|_, stats| stats.contexts_opened += 1);
        Ok(Box::new(FakeContext {
            site: self.site.clone(),
        }))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

pub(crate) struct FakeLauncher {
    site: FakeSite,
    delay: Duration,
    launches: Arc<AtomicUsize>,
}

impl FakeLauncher {
    pub fn new(site: FakeSite) -> Self {
        Self {
            site,
            delay: Duration::ZERO,
            launches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_launch_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn launches(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.launches)
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Arc<dyn BrowserHandle>, BrowserError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(Arc::new(FakeBrowser {
            site: self.site.clone(),
            connected: AtomicBool::new(true),
        }))
    }
}
