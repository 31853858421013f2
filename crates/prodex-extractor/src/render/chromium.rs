//! Chromium-backed [`PageRenderer`] using chromiumoxide.
//!
//! Every render launches its own browser with a throwaway profile directory.
//! The [`BrowserSession`] guard owns the process: the normal path closes it
//! and waits for exit, and dropping the guard (error, panic, or a cancelled
//! request future) kills the child and aborts the CDP handler task.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use prodex_core::{ProductRecord, Provenance, RawDocument};
use tokio::task::JoinHandle;

use super::{
    PageRenderer, FULL_RENDER_SELECTORS, HEADING_SELECTORS, PRICE_SELECTOR,
    QUICK_RENDER_SELECTORS,
};
use crate::error::{ExtractorError, RenderPhase};
use crate::fetch::host_of;
use crate::normalize::{non_empty, parse_price_display};
use crate::settings::ExtractorSettings;

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);
const CLOSE_GRACE: Duration = Duration::from_secs(5);

const LAUNCH_ARGS: [&str; 7] = [
    "--disable-gpu",
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-extensions",
    "--disable-background-networking",
    "--disable-blink-features=AutomationControlled",
    "--no-first-run",
];

/// Launches a fresh headless Chromium for every call.
pub struct ChromiumRenderer {
    settings: ExtractorSettings,
}

impl ChromiumRenderer {
    #[must_use]
    pub fn new(settings: &ExtractorSettings) -> Self {
        Self {
            settings: settings.clone(),
        }
    }

    async fn snapshot(
        &self,
        session: &BrowserSession,
        url: &str,
    ) -> Result<RawDocument, ExtractorError> {
        let page = session.new_page().await?;
        navigate(&page, url, self.settings.navigation_timeout, true).await?;

        if !wait_for_selector(&page, FULL_RENDER_SELECTORS, self.settings.selector_timeout).await {
            tracing::info!(
                host = %host_of(url),
                "product selectors did not appear in time, using DOM as rendered"
            );
        }

        let html = page
            .content()
            .await
            .map_err(|e| ExtractorError::Browser(format!("failed to read page content: {e}")))?;
        Ok(RawDocument::new(html, Provenance::Rendered))
    }

    async fn quick_read(
        &self,
        session: &BrowserSession,
        url: &str,
    ) -> Result<ProductRecord, ExtractorError> {
        let page = session.new_page().await?;
        navigate(&page, url, self.settings.navigation_timeout, false).await?;

        if !wait_for_selector(&page, QUICK_RENDER_SELECTORS, self.settings.selector_timeout).await {
            return Err(ExtractorError::RenderTimeout {
                url: url.to_owned(),
                phase: RenderPhase::SelectorWait,
            });
        }

        let price = element_text(&page, PRICE_SELECTOR)
            .await
            .and_then(|text| parse_price_display(&text));

        let mut name = None;
        for selector in HEADING_SELECTORS {
            if let Ok(heading) = page.find_element(selector).await {
                name = heading
                    .inner_text()
                    .await
                    .ok()
                    .flatten()
                    .and_then(|t| non_empty(&t));
                break;
            }
        }

        Ok(ProductRecord {
            name,
            price,
            ..ProductRecord::default()
        })
    }
}

#[async_trait]
impl PageRenderer for ChromiumRenderer {
    async fn render_full(&self, url: &str) -> Result<RawDocument, ExtractorError> {
        let session = BrowserSession::launch(&self.settings).await?;
        let result = self.snapshot(&session, url).await;
        session.close().await;
        result
    }

    async fn render_quick(&self, url: &str) -> Result<ProductRecord, ExtractorError> {
        let session = BrowserSession::launch(&self.settings).await?;
        let result = self.quick_read(&session, url).await;
        session.close().await;
        result
    }
}

/// One launched browser process plus its CDP handler task.
struct BrowserSession {
    browser: Option<Browser>,
    handler: JoinHandle<()>,
    profile_dir: PathBuf,
}

impl BrowserSession {
    async fn launch(settings: &ExtractorSettings) -> Result<Self, ExtractorError> {
        let profile_dir =
            std::env::temp_dir().join(format!("prodex-chromium-{}", uuid::Uuid::new_v4()));

        let mut builder = BrowserConfig::builder()
            .user_data_dir(&profile_dir)
            .args(LAUNCH_ARGS)
            .arg(format!("--user-agent={}", settings.user_agent));
        if let Some(path) = &settings.chrome_path {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| ExtractorError::Browser(format!("invalid browser config: {e}")))?;

        let (browser, mut handler) = match Browser::launch(config).await {
            Ok(pair) => pair,
            Err(e) => {
                remove_profile(&profile_dir);
                return Err(ExtractorError::Browser(format!(
                    "failed to launch Chromium: {e}"
                )));
            }
        };
        let handler = tokio::spawn(async move { while handler.next().await.is_some() {} });

        tracing::debug!(profile = %profile_dir.display(), "browser launched");
        Ok(Self {
            browser: Some(browser),
            handler,
            profile_dir,
        })
    }

    async fn new_page(&self) -> Result<Page, ExtractorError> {
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| ExtractorError::Browser("browser already closed".to_string()))?;
        browser
            .new_page("about:blank")
            .await
            .map_err(|e| ExtractorError::Browser(format!("failed to open page: {e}")))
    }

    /// Closes the browser and waits for the process to exit.
    async fn close(mut self) {
        if let Some(mut browser) = self.browser.take() {
            if tokio::time::timeout(CLOSE_GRACE, browser.close()).await.is_err() {
                tracing::warn!("browser did not close in time, killing it");
            }
            let _ = browser.kill().await;
            let _ = browser.wait().await;
        }
        self.handler.abort();
        remove_profile(&self.profile_dir);
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();
        // Dropping the browser kills the child process.
        if self.browser.take().is_some() {
            tracing::debug!("browser session dropped before close");
            remove_profile(&self.profile_dir);
        }
    }
}

fn remove_profile(dir: &Path) {
    if let Err(e) = std::fs::remove_dir_all(dir) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::debug!(profile = %dir.display(), error = %e, "could not remove browser profile");
        }
    }
}

/// Navigates `page` to `url`. With `settle`, also waits for the navigation
/// to finish loading before returning.
async fn navigate(
    page: &Page,
    url: &str,
    limit: Duration,
    settle: bool,
) -> Result<(), ExtractorError> {
    let navigation = async {
        page.goto(url).await?;
        if settle {
            page.wait_for_navigation().await?;
        }
        Ok::<(), chromiumoxide::error::CdpError>(())
    };

    match tokio::time::timeout(limit, navigation).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(ExtractorError::Browser(format!("navigation failed: {e}"))),
        Err(_) => Err(ExtractorError::RenderTimeout {
            url: url.to_owned(),
            phase: RenderPhase::Navigation,
        }),
    }
}

/// Polls until an element matching `selector` exists. Returns `false` if
/// `limit` elapses first.
async fn wait_for_selector(page: &Page, selector: &str, limit: Duration) -> bool {
    let poll = async {
        loop {
            if page.find_element(selector).await.is_ok() {
                return;
            }
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    };
    tokio::time::timeout(limit, poll).await.is_ok()
}

async fn element_text(page: &Page, selector: &str) -> Option<String> {
    let element = page.find_element(selector).await.ok()?;
    element.inner_text().await.ok().flatten()
}
