//! Scoped ownership of one isolated browser session.
//!
//! Each provider iteration gets a fresh session; the orchestrator releases
//! it on every exit path before the next provider starts, so no two sessions
//! ever coexist.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::Page;
use futures::StreamExt;
use tracing::{debug, info};

use crate::error::TollError;

pub struct BrowserSession {
    browser: Option<Browser>,
    page: Option<Arc<Page>>,
}

impl BrowserSession {
    /// Launch a fresh browser with downloads routed into `download_dir`.
    pub async fn launch(download_dir: &Path, headless: bool) -> Result<Self, TollError> {
        info!("launching browser session");

        std::fs::create_dir_all(download_dir)?;
        let download_dir = download_dir
            .canonicalize()
            .unwrap_or_else(|_| PathBuf::from(download_dir));

        // Download routing happens through the SetDownloadBehavior CDP call
        // below; Chrome has no command-line switch for it.
        let mut builder = BrowserConfig::builder().window_size(1280, 800);

        if headless {
            builder = builder.arg("--headless=new");
        }

        let config = builder
            .build()
            .map_err(|e| TollError::BrowserInit(format!("browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| TollError::BrowserInit(e.to_string()))?;

        // Drain browser events in the background.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                debug!("browser event: {:?}", event);
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| TollError::BrowserInit(e.to_string()))?;

        let download_params = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::AllowAndName)
            .download_path(download_dir.to_string_lossy().to_string())
            .events_enabled(true)
            .build()
            .map_err(|e| TollError::BrowserInit(format!("download behavior: {}", e)))?;

        page.execute(download_params)
            .await
            .map_err(|e| TollError::BrowserInit(format!("download behavior: {}", e)))?;

        info!("browser session ready");
        Ok(Self {
            browser: Some(browser),
            page: Some(Arc::new(page)),
        })
    }

    pub fn page(&self) -> Result<&Arc<Page>, TollError> {
        self.page
            .as_ref()
            .ok_or_else(|| TollError::BrowserInit("browser session is closed".into()))
    }

    /// Release the page and browser. Safe to call more than once.
    pub async fn close(&mut self) {
        info!("closing browser session");

        self.page = None;
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                debug!("browser close: {}", e);
            }
        }
    }
}
