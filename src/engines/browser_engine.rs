// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::BrowserSettings;
use crate::engines::reqwest_engine::BROWSER_USER_AGENT;
use crate::engines::traits::{
    EngineError, ListingNavigator, RenderedListing, ScrapeRequest, ScrapeResponse, ScraperEngine,
};
use crate::utils::url_utils::resolve_url;
use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Element, Page};
use futures::StreamExt;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

fn browser_err(e: impl std::fmt::Display) -> EngineError {
    EngineError::Browser(e.to_string())
}

/// 一次性的浏览器会话
///
/// 每个会话使用独立的临时用户目录，`close` 后目录随 `TempDir` 一起删除
struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    profile: TempDir,
}

impl BrowserSession {
    async fn launch(settings: &BrowserSettings) -> Result<Self, EngineError> {
        let profile = tempfile::Builder::new()
            .prefix("newsrs-browser-")
            .tempdir()
            .map_err(browser_err)?;

        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .user_data_dir(profile.path())
            .request_timeout(Duration::from_secs(settings.wait_timeout_secs))
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg(format!("--user-agent={}", BROWSER_USER_AGENT));
        if let Some(executable) = &settings.executable {
            builder = builder.chrome_executable(executable);
        }
        let config = builder.build().map_err(EngineError::Browser)?;

        let (browser, mut events) = Browser::launch(config).await.map_err(browser_err)?;
        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        debug!(profile = %profile.path().display(), "browser session launched");
        Ok(Self {
            browser,
            handler,
            profile,
        })
    }

    /// 关闭浏览器并删除用户目录
    async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser cleanly: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            warn!("Failed to wait for browser exit: {}", e);
        }
        self.handler.abort();
        let path = self.profile.path().display().to_string();
        if let Err(e) = self.profile.close() {
            warn!(profile = %path, "Failed to remove browser profile: {}", e);
        }
    }
}

/// 浏览器引擎
///
/// 基于chromiumoxide，每次调用启动一个全新的浏览器并在所有退出路径上销毁
pub struct BrowserEngine {
    settings: BrowserSettings,
}

impl BrowserEngine {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }

    /// 在限定时间内探测元素是否存在，不存在时返回 None
    async fn find_within(page: &Page, selector: &str, within: Duration) -> Option<Element> {
        let deadline = Instant::now() + within;
        loop {
            if let Ok(element) = page.find_element(selector).await {
                return Some(element);
            }
            if Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// 在日期选择页中点击当天日期，返回打开的列表页
    async fn open_day(
        browser: &Browser,
        picker: &Page,
        picker_url: &Url,
        day_of_month: u32,
        wait: Duration,
    ) -> Result<Page, EngineError> {
        let day_label = day_of_month.to_string();
        let anchors = picker.find_elements("a").await.map_err(browser_err)?;

        let mut target = None;
        for anchor in anchors {
            let text = anchor.inner_text().await.map_err(browser_err)?;
            if text.as_deref().map(str::trim) == Some(day_label.as_str()) {
                target = Some(anchor);
                break;
            }
        }
        let anchor = target.ok_or_else(|| {
            EngineError::Browser(format!("no date link for day {}", day_of_month))
        })?;
        let href = anchor.attribute("href").await.map_err(browser_err)?;

        let before = browser.pages().await.map_err(browser_err)?.len();
        anchor.click().await.map_err(browser_err)?;

        // 日期链接会在新窗口中打开列表
        let deadline = Instant::now() + wait;
        while Instant::now() < deadline {
            let pages = browser.pages().await.map_err(browser_err)?;
            if pages.len() > before {
                if let Some(page) = pages.into_iter().last() {
                    return Ok(page);
                }
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        match href.filter(|h| !h.trim().is_empty() && !h.starts_with("javascript")) {
            Some(href) => {
                let url = resolve_url(picker_url, &href).map_err(browser_err)?;
                debug!(url = %url, "no new window appeared, opening date link directly");
                browser.new_page(url.as_str()).await.map_err(browser_err)
            }
            // 链接在当前窗口中跳转
            None => Ok(picker.clone()),
        }
    }

    async fn render_page(browser: &Browser, url: &str) -> Result<(String, String), EngineError> {
        let page = browser.new_page(url).await.map_err(browser_err)?;
        page.wait_for_navigation().await.map_err(browser_err)?;
        let final_url = page
            .url()
            .await
            .map_err(browser_err)?
            .unwrap_or_else(|| url.to_string());
        let content = page.content().await.map_err(browser_err)?;
        Ok((final_url, content))
    }

    async fn navigate_listing(
        &self,
        browser: &Browser,
        root_url: &str,
        day_of_month: u32,
    ) -> Result<RenderedListing, EngineError> {
        let root = Url::parse(root_url).map_err(|e| EngineError::Other(e.to_string()))?;
        let detect_window = Duration::from_secs(self.settings.detect_timeout_secs);
        let wait = Duration::from_secs(self.settings.wait_timeout_secs);

        let page = browser.new_page(root_url).await.map_err(browser_err)?;
        page.wait_for_navigation().await.map_err(browser_err)?;

        let frame_src = match Self::find_within(&page, &self.settings.iframe_selector, detect_window).await {
            Some(frame) => frame.attribute("src").await.map_err(browser_err)?,
            None => None,
        };

        let list_page = match frame_src {
            Some(src) => {
                let frame_url = resolve_url(&root, &src).map_err(browser_err)?;
                info!(frame = %frame_url, day = day_of_month, "date picker layout detected");
                let picker = browser.new_page(frame_url.as_str()).await.map_err(browser_err)?;
                picker.wait_for_navigation().await.map_err(browser_err)?;
                Self::open_day(browser, &picker, &frame_url, day_of_month, wait).await?
            }
            None => {
                info!("no date picker, assuming list layout");
                page
            }
        };

        if Self::find_within(&list_page, &self.settings.list_marker_selector, wait)
            .await
            .is_none()
        {
            warn!(
                selector = %self.settings.list_marker_selector,
                "list marker not found, reading page anyway"
            );
        }

        // 日期页通常位于更深的目录，相对链接必须按最终地址解析
        let url = list_page
            .url()
            .await
            .map_err(browser_err)?
            .filter(|u| u.starts_with("http"))
            .unwrap_or_else(|| root_url.to_string());
        let html = list_page.content().await.map_err(browser_err)?;
        debug!(url = %url, "listing rendered");
        Ok(RenderedListing { url, html })
    }
}

#[async_trait]
impl ScraperEngine for BrowserEngine {
    /// 渲染单个页面并返回源码
    async fn scrape(&self, request: &ScrapeRequest) -> Result<ScrapeResponse, EngineError> {
        let start = Instant::now();

        let session = BrowserSession::launch(&self.settings).await?;
        let outcome =
            tokio::time::timeout(request.timeout, Self::render_page(&session.browser, &request.url))
                .await;
        session.close().await;
        let (final_url, content) = outcome.map_err(|_| EngineError::Timeout)??;

        Ok(ScrapeResponse {
            status_code: 200,
            final_url,
            content,
            content_type: "text/html".to_string(),
            response_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn name(&self) -> &'static str {
        "browser"
    }
}

#[async_trait]
impl ListingNavigator for BrowserEngine {
    async fn render_listing(
        &self,
        root_url: &str,
        day_of_month: u32,
    ) -> Result<RenderedListing, EngineError> {
        // 探测、点击和等待列表各自有超时，整体再留出余量
        let budget = Duration::from_secs(
            self.settings.detect_timeout_secs + 3 * self.settings.wait_timeout_secs,
        );
        let session = BrowserSession::launch(&self.settings).await?;
        let outcome = tokio::time::timeout(
            budget,
            self.navigate_listing(&session.browser, root_url, day_of_month),
        )
        .await;
        session.close().await;
        outcome.map_err(|_| EngineError::Timeout)?
    }
}
