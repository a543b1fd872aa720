// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::CrawlerSettings;
use crate::domain::models::crawl_state::LinkCandidate;
use crate::engines::traits::{ListingNavigator, ScrapeRequest, ScraperEngine};
use crate::utils::time::today_in;
use crate::utils::url_utils::{canonical_url, host_matches};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{Datelike, FixedOffset};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

static NEWS_BLOCK_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)news|headline|main").expect("valid regex"));

/// 候选链接的判定规则
#[derive(Debug, Clone)]
pub struct LinkRules {
    /// 文章链接所属域名
    pub article_host: String,
    /// 路径中必须出现其一
    pub path_markers: Vec<String>,
    /// 标题字符数须大于该值
    pub min_title_chars: usize,
    pub max_links: usize,
}

impl From<&CrawlerSettings> for LinkRules {
    fn from(settings: &CrawlerSettings) -> Self {
        Self {
            article_host: settings.article_host.clone(),
            path_markers: settings.article_path_markers.clone(),
            min_title_chars: settings.min_link_title_chars,
            max_links: settings.max_links,
        }
    }
}

impl LinkRules {
    fn accepts(&self, title: &str, url: &Url) -> bool {
        title.chars().count() > self.min_title_chars
            && matches!(url.scheme(), "http" | "https")
            && host_matches(url, &self.article_host)
            && self.path_markers.iter().any(|m| url.path().contains(m.as_str()))
    }
}

/// 链接提取器
pub struct LinkDiscoverer;

impl LinkDiscoverer {
    /// 从页面的全部锚点中提取候选链接
    ///
    /// 按首次出现顺序去重，并截断到 `max_links`
    ///
    /// # 参数
    ///
    /// * `html_content` - HTML内容
    /// * `base_url` - 解析相对链接使用的地址
    /// * `rules` - 候选判定规则
    pub fn extract_links(
        html_content: &str,
        base_url: &str,
        rules: &LinkRules,
    ) -> Result<Vec<LinkCandidate>> {
        let document = Html::parse_document(html_content);
        let anchors = Self::selector("a")?;
        let base = Url::parse(base_url)?;
        Ok(Self::collect(document.select(&anchors), &base, rules))
    }

    /// 首页提取：优先只看新闻区块中的链接，区块中没有候选时退回全部锚点
    pub fn extract_news_links(
        html_content: &str,
        base_url: &str,
        rules: &LinkRules,
    ) -> Result<Vec<LinkCandidate>> {
        let document = Html::parse_document(html_content);
        let blocks = Self::selector("div[class], section[class]")?;
        let anchors = Self::selector("a")?;
        let base = Url::parse(base_url)?;

        let news_anchors = document
            .select(&blocks)
            .filter(|block| {
                block
                    .value()
                    .attr("class")
                    .is_some_and(|class| NEWS_BLOCK_CLASS.is_match(class))
            })
            .flat_map(|block| block.select(&anchors));
        let links = Self::collect(news_anchors, &base, rules);
        if !links.is_empty() {
            return Ok(links);
        }

        Ok(Self::collect(document.select(&anchors), &base, rules))
    }

    fn selector(css: &str) -> Result<Selector> {
        Selector::parse(css).map_err(|e| anyhow::anyhow!("Invalid selector: {:?}", e))
    }

    fn collect<'a>(
        anchors: impl Iterator<Item = ElementRef<'a>>,
        base: &Url,
        rules: &LinkRules,
    ) -> Vec<LinkCandidate> {
        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for anchor in anchors {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let href = href.trim();
            if href.is_empty()
                || href.starts_with('#')
                || href.starts_with("mailto:")
                || href.starts_with("javascript:")
            {
                continue;
            }
            let Ok(url) = base.join(href) else {
                continue;
            };

            let title = anchor.text().collect::<Vec<_>>().join(" ");
            let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
            if !rules.accepts(&title, &url) {
                continue;
            }

            let url = canonical_url(url.as_str());
            if seen.insert(url.clone()) {
                links.push(LinkCandidate::new(title, url));
                if links.len() >= rules.max_links {
                    break;
                }
            }
        }

        links
    }
}

/// 链接来源
#[async_trait]
pub trait LinkSource: Send + Sync {
    /// 发现当天的候选文章链接，全部策略失败时返回空列表
    async fn discover(&self) -> Vec<LinkCandidate>;
}

/// 发现策略，按顺序尝试
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    Homepage,
    ListingPages,
    Browser,
}

const STRATEGIES: [Strategy; 3] = [Strategy::Homepage, Strategy::ListingPages, Strategy::Browser];

/// 链接发现服务
///
/// 先用HTTP抓取首页和已知列表页，都失败后才启动无头浏览器
pub struct LinkDiscovery {
    http: Arc<dyn ScraperEngine>,
    navigator: Option<Arc<dyn ListingNavigator>>,
    settings: CrawlerSettings,
    rules: LinkRules,
    offset: FixedOffset,
}

impl LinkDiscovery {
    /// 创建链接发现服务
    ///
    /// # 参数
    ///
    /// * `http` - HTTP抓取引擎，需能识别跳转页
    /// * `navigator` - 浏览器列表导航，禁用浏览器时为 None
    /// * `settings` - 爬虫配置
    /// * `offset` - 计算"今天"使用的时区
    pub fn new(
        http: Arc<dyn ScraperEngine>,
        navigator: Option<Arc<dyn ListingNavigator>>,
        settings: CrawlerSettings,
        offset: FixedOffset,
    ) -> Self {
        let rules = LinkRules::from(&settings);
        Self {
            http,
            navigator,
            settings,
            rules,
            offset,
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.settings.request_timeout_secs)
    }

    async fn run(&self, strategy: Strategy) -> Vec<LinkCandidate> {
        match strategy {
            Strategy::Homepage => self.from_homepage().await,
            Strategy::ListingPages => self.from_listing_pages().await,
            Strategy::Browser => self.from_browser().await,
        }
    }

    async fn from_homepage(&self) -> Vec<LinkCandidate> {
        let request = ScrapeRequest::new(&self.settings.base_url, self.timeout());
        match self.http.scrape(&request).await {
            Ok(page) => LinkDiscoverer::extract_news_links(&page.content, &page.final_url, &self.rules)
                .unwrap_or_else(|e| {
                    warn!("Failed to parse homepage: {}", e);
                    Vec::new()
                }),
            Err(e) => {
                debug!(url = %self.settings.base_url, "homepage fetch failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn from_listing_pages(&self) -> Vec<LinkCandidate> {
        for listing_url in &self.settings.listing_urls {
            let request = ScrapeRequest::new(listing_url, self.timeout())
                .with_referer(&self.settings.base_url);
            let page = match self.http.scrape(&request).await {
                Ok(page) => page,
                Err(e) => {
                    debug!(url = %listing_url, "listing fetch failed: {}", e);
                    continue;
                }
            };
            match LinkDiscoverer::extract_links(&page.content, &page.final_url, &self.rules) {
                Ok(links) if !links.is_empty() => return links,
                Ok(_) => debug!(url = %listing_url, "listing page has no article links"),
                Err(e) => warn!(url = %listing_url, "Failed to parse listing page: {}", e),
            }
        }
        Vec::new()
    }

    async fn from_browser(&self) -> Vec<LinkCandidate> {
        let Some(navigator) = &self.navigator else {
            return Vec::new();
        };
        let Some(root) = self.settings.listing_urls.first() else {
            return Vec::new();
        };

        let day = today_in(self.offset).day();
        match navigator.render_listing(root, day).await {
            Ok(listing) => LinkDiscoverer::extract_links(&listing.html, &listing.url, &self.rules)
                .unwrap_or_else(|e| {
                    warn!(url = %listing.url, "Failed to parse rendered listing: {}", e);
                    Vec::new()
                }),
            Err(e) => {
                warn!(url = %root, "browser listing navigation failed: {}", e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl LinkSource for LinkDiscovery {
    async fn discover(&self) -> Vec<LinkCandidate> {
        for strategy in STRATEGIES {
            let links = self.run(strategy).await;
            if !links.is_empty() {
                info!(?strategy, count = links.len(), "article links discovered");
                return links;
            }
        }
        warn!("every discovery strategy came back empty");
        Vec::new()
    }
}

#[cfg(test)]
#[path = "link_discovery_test.rs"]
mod tests;
