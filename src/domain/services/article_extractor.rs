// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::CrawlerSettings;
use crate::domain::models::article::{Article, ArticleStatus, ImageRef, DEFAULT_CATEGORY};
use crate::domain::models::crawl_state::LinkCandidate;
use crate::domain::services::image_cache_service::ImageCache;
use crate::domain::services::markdown::{
    cached_image_path, count_images, image_markdown, is_image_line, render_article,
};
use crate::engines::traits::{EngineError, ScrapeRequest, ScrapeResponse, ScraperEngine};
use crate::utils::text_processing::{char_len, clean_text, extract_summary};
use crate::utils::time::now_in;
use async_trait::async_trait;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// 摘要的最大字符数
const SUMMARY_MAX_CHARS: usize = 200;

const CONTENT_START_MARKER: &str = "<!--enpcontent-->";
const CONTENT_END_MARKER: &str = "<!--/enpcontent-->";

/// 正文容器选择器，从具体到宽泛
const CONTENT_SELECTORS: [&str; 20] = [
    ".rm_txt_con",
    ".content",
    ".article-content",
    "#content",
    ".main-content",
    ".text-content",
    ".article-body",
    ".post-content",
    ".entry-content",
    ".article-text",
    ".body-content",
    ".content-text",
    ".main-text",
    ".body-text",
    ".article",
    ".post",
    ".entry",
    ".text",
    ".body",
    ".main",
];

/// 选择器命中的容器至少需要这么多字符才算正文
const MIN_SELECTOR_TEXT_CHARS: usize = 100;

const CONTENT_KEYWORDS: [&str; 8] = ["习近平", "中国", "发展", "经济", "政治", "社会", "建设", "改革"];

/// 路径片段或子域名 → 分类
const CATEGORY_PATHS: [(&str, &str); 8] = [
    ("finance", "经济·科技"),
    ("ent", "文旅·体育"),
    ("society", "社会·法治"),
    ("world", "国际"),
    ("politics", "时政"),
    ("military", "军事"),
    ("health", "健康·生活"),
    ("edu", "教育"),
];

const DEFAULT_SOURCE: &str = "人民网";
const DEFAULT_IMAGE_ALT: &str = "图片";
const PAPER_PIC_ROOT: &str = "http://paper.people.com.cn/rmrb/pc/pic";

static TITLE_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| parse_selectors(&["h1", ".rm_txt_con h1", "title"]));
static SOURCE_SELECTOR: Lazy<Selector> = Lazy::new(|| parse_selector(".channel .col-1-1, .source"));
static BREADCRUMB_SELECTOR: Lazy<Selector> = Lazy::new(|| parse_selector(".route a, .breadcrumb a"));
static BOILERPLATE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| parse_selector(".edit, .paper_num, .share, .ad, script, style"));
static CONTAINER_SELECTOR: Lazy<Selector> = Lazy::new(|| parse_selector("div, article, section, td"));
static CONTENT_SELECTOR_LIST: Lazy<Vec<Selector>> = Lazy::new(|| parse_selectors(&CONTENT_SELECTORS));

static TITLE_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:--[^-]+)*--人民网\s*$").expect("valid regex"));
static SOURCE_TEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"来源[：:]\s*(\S+)").expect("valid regex"));
static SOURCE_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"来源[：:]\s*<a[^>]*>([^<]+)</a>").expect("valid regex"));
static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(\d{4})年(\d{1,2})月(\d{1,2})日\s*(\d{1,2}):(\d{1,2})",
        r"(\d{4})-(\d{1,2})-(\d{1,2})\s+(\d{1,2}):(\d{1,2})",
        r"(\d{4})/(\d{1,2})/(\d{1,2})\s+(\d{1,2}):(\d{1,2})",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

fn parse_selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

fn parse_selectors(css: &[&str]) -> Vec<Selector> {
    css.iter().map(|c| parse_selector(c)).collect()
}

fn placeholder(index: usize) -> String {
    format!("__IMAGE_PLACEHOLDER_{}__", index)
}

/// 文章来源
#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// 提取一篇文章，失败时返回 None
    async fn extract(&self, link: &LinkCandidate) -> Option<Article>;
}

/// 正文中的一张图片
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSlot {
    /// 写入映射与回退引用的地址
    pub source_url: String,
    /// 依次尝试缓存的地址
    pub candidates: Vec<String>,
    pub alt: String,
}

/// 解析阶段的结果，不持有DOM
#[derive(Debug, Clone)]
pub struct ParsedPage {
    pub title: String,
    pub source: String,
    pub publish_date: DateTime<FixedOffset>,
    pub category: String,
    /// 以空行分隔的正文，图片位置为占位符
    pub body: String,
    pub images: Vec<ImageSlot>,
}

type Locator = fn(&str, &Html) -> Option<String>;

/// 正文定位策略，按顺序尝试
const LOCATORS: [(&str, Locator); 3] = [
    ("comment_markers", locate_by_markers),
    ("selectors", locate_by_selectors),
    ("keyword_block", locate_by_keywords),
];

fn locate_by_markers(raw: &str, _document: &Html) -> Option<String> {
    let start = raw.find(CONTENT_START_MARKER)? + CONTENT_START_MARKER.len();
    let end = raw[start..].find(CONTENT_END_MARKER)? + start;
    let inner = &raw[start..end];
    (!clean_text(inner).is_empty()).then(|| inner.to_string())
}

fn locate_by_selectors(_raw: &str, document: &Html) -> Option<String> {
    CONTENT_SELECTOR_LIST.iter().find_map(|selector| {
        document
            .select(selector)
            .find(|el| char_len(&element_text(el)) > MIN_SELECTOR_TEXT_CHARS)
            .map(|el| el.html())
    })
}

/// 在所有容器中找直接段落文本最多、且含有关键字的那个
fn locate_by_keywords(_raw: &str, document: &Html) -> Option<String> {
    document
        .select(&CONTAINER_SELECTOR)
        .filter_map(|container| {
            let paragraphs: String = container
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|child| child.value().name() == "p")
                .map(|p| element_text(&p))
                .collect();
            let score = char_len(&paragraphs);
            let relevant = CONTENT_KEYWORDS.iter().any(|k| paragraphs.contains(k));
            (score > 0 && relevant).then_some((score, container))
        })
        .max_by_key(|(score, _)| *score)
        .map(|(_, container)| container.html())
}

fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn is_block(name: &str) -> bool {
    matches!(
        name,
        "p" | "div" | "br" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "li" | "ul" | "ol"
            | "tr" | "table" | "section" | "article" | "blockquote" | "center" | "figure"
    )
}

/// 遍历正文容器：跳过样板元素，收集文本并把图片替换为占位符
struct ContentWalker<'a> {
    page_url: &'a Url,
    site_root: &'a Url,
    date: NaiveDate,
    text: String,
    images: Vec<ImageSlot>,
}

impl ContentWalker<'_> {
    fn walk(&mut self, element: ElementRef) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => self.text.push_str(text),
                Node::Element(_) => {
                    if let Some(el) = ElementRef::wrap(child) {
                        self.visit(el);
                    }
                }
                _ => {}
            }
        }
    }

    fn visit(&mut self, element: ElementRef) {
        if BOILERPLATE_SELECTOR.matches(&element) {
            return;
        }
        let name = element.value().name();
        if name == "img" {
            self.push_image(element);
            return;
        }
        let block = is_block(name);
        if block {
            self.text.push('\n');
        }
        self.walk(element);
        if block {
            self.text.push('\n');
        }
    }

    fn push_image(&mut self, img: ElementRef) {
        let src = ["src", "data-src", "original"]
            .iter()
            .filter_map(|attr| img.value().attr(attr))
            .map(str::trim)
            .find(|src| !src.is_empty() && !src.starts_with("data:"));
        let Some(src) = src else {
            return;
        };
        let candidates = image_candidates(src, self.page_url, self.site_root, self.date);
        let Some(source_url) = candidates.first().cloned() else {
            return;
        };
        let alt = img
            .value()
            .attr("alt")
            .map(str::trim)
            .filter(|alt| !alt.is_empty())
            .unwrap_or(DEFAULT_IMAGE_ALT)
            .to_string();

        self.text.push('\n');
        self.text.push_str(&placeholder(self.images.len()));
        self.text.push('\n');
        self.images.push(ImageSlot {
            source_url,
            candidates,
            alt,
        });
    }
}

/// 解析图片地址
///
/// 离线保存的页面会留下 `./xxx_files/NAME` 这样的路径，需要按文件名规律还原到站点上的真实位置
///
/// # 参数
///
/// * `src` - img 的原始地址
/// * `page_url` - 文章页地址，用于解析普通相对路径
/// * `site_root` - 站点根地址
/// * `date` - 文章日期，用于拼出按日期归档的路径
pub fn image_candidates(src: &str, page_url: &Url, site_root: &Url, date: NaiveDate) -> Vec<String> {
    if src.contains("_files/") && !src.starts_with("http") {
        let Some(name) = src.rsplit('/').next().filter(|n| !n.is_empty()) else {
            return Vec::new();
        };
        let stem = name.split('.').next().unwrap_or(name);
        let root = site_root.as_str().trim_end_matches('/');
        let (y, m, d) = (date.year(), date.month(), date.day());

        if name.starts_with("MAIN") {
            return vec![
                format!("{}/NMediaFile/{}/{:02}{:02}/{}", root, y, m, d, name),
                format!("{}/mediafile/pic/{}", root, name),
            ];
        }
        if stem.chars().all(|c| c.is_ascii_digit()) || char_len(stem) > 10 {
            return vec![format!("{}/mediafile/pic/BIG/{}{:02}{:02}/{}", root, y, m, d, name)];
        }
        return vec![format!("{}/{}{:02}/{:02}/{}", PAPER_PIC_ROOT, y, m, d, name)];
    }

    match page_url.join(src) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => vec![url.to_string()],
        _ => Vec::new(),
    }
}

fn extract_title(document: &Html, fallback: &str) -> String {
    TITLE_SELECTORS
        .iter()
        .filter_map(|selector| document.select(selector).next())
        .map(|el| clean_text(&element_text(&el)))
        .map(|title| TITLE_SUFFIX.replace(&title, "").trim().to_string())
        .find(|title| !title.is_empty())
        .unwrap_or_else(|| fallback.trim().to_string())
}

fn extract_source(document: &Html) -> String {
    for element in document.select(&SOURCE_SELECTOR) {
        if let Some(caps) = SOURCE_LINK.captures(&element.inner_html()) {
            return caps[1].trim().to_string();
        }
        let text = element.text().collect::<String>();
        if let Some(caps) = SOURCE_TEXT.captures(&text) {
            return caps[1].trim().to_string();
        }
    }
    DEFAULT_SOURCE.to_string()
}

/// 从页面文本中解析发布时间，支持 `2025年9月1日06:56`、`2025-09-01 06:56`、`2025/09/01 06:56`
pub fn parse_publish_date(text: &str, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    DATE_PATTERNS.iter().find_map(|pattern| {
        let caps = pattern.captures(text)?;
        let field = |i: usize| caps[i].parse::<u32>().ok();
        let date = NaiveDate::from_ymd_opt(caps[1].parse().ok()?, field(2)?, field(3)?)?;
        let datetime: NaiveDateTime = date.and_hms_opt(field(4)?, field(5)?, 0)?;
        offset.from_local_datetime(&datetime).single()
    })
}

/// 分类：先看URL的子域名和路径，再看面包屑，最后归入默认分类
pub fn category_for(url: &Url, breadcrumbs: &[String]) -> String {
    let host = url.host_str().unwrap_or_default();
    let path = url.path();
    let by_url = CATEGORY_PATHS.iter().find(|(segment, _)| {
        host.starts_with(&format!("{}.", segment)) || path.contains(&format!("/{}/", segment))
    });
    if let Some((_, category)) = by_url {
        return category.to_string();
    }

    breadcrumbs
        .iter()
        .map(|crumb| crumb.trim())
        .find_map(|crumb| {
            CATEGORY_PATHS
                .iter()
                .find(|(_, category)| *category == crumb)
                .map(|(_, category)| category.to_string())
        })
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string())
}

/// 正文分行：去掉空行和过短的噪声行，图片占位符总是保留
fn body_lines(text: &str, min_line_chars: usize) -> Vec<String> {
    text.lines()
        .map(|line| line.trim())
        .filter(|line| line.starts_with("__IMAGE_PLACEHOLDER_") || char_len(line) > min_line_chars)
        .map(str::to_string)
        .collect()
}

/// 解析文章页
///
/// 全部在同步代码中完成，DOM 不会跨越 await
///
/// # 参数
///
/// * `html` - 页面HTML
/// * `page_url` - 页面地址
/// * `site_root` - 站点根地址
/// * `link_title` - 列表页上的标题，页面中找不到标题时使用
/// * `min_line_chars` - 正文行的最小字符数（不含）
/// * `now` - 当前时间，无法解析发布时间时使用
///
/// # 返回值
///
/// 找不到正文时返回 None
pub fn parse_page(
    html: &str,
    page_url: &Url,
    site_root: &Url,
    link_title: &str,
    min_line_chars: usize,
    now: DateTime<FixedOffset>,
) -> Option<ParsedPage> {
    let document = Html::parse_document(html);

    let (strategy, container) = LOCATORS
        .iter()
        .find_map(|(name, locate)| locate(html, &document).map(|c| (*name, c)))?;
    debug!(url = %page_url, strategy, "article body located");

    let title = extract_title(&document, link_title);
    let source = extract_source(&document);
    let page_text = document.root_element().text().collect::<String>();
    let publish_date = parse_publish_date(&page_text, *now.offset()).unwrap_or(now);
    let breadcrumbs: Vec<String> = document
        .select(&BREADCRUMB_SELECTOR)
        .map(|a| element_text(&a))
        .collect();
    let category = category_for(page_url, &breadcrumbs);

    let fragment = Html::parse_fragment(&container);
    let mut walker = ContentWalker {
        page_url,
        site_root,
        date: publish_date.date_naive(),
        text: String::new(),
        images: Vec::new(),
    };
    walker.walk(fragment.root_element());

    let lines = body_lines(&walker.text, min_line_chars);
    Some(ParsedPage {
        title,
        source,
        publish_date,
        category,
        body: lines.join("\n\n"),
        images: walker.images,
    })
}

/// 文章提取器
///
/// HTTP 抓取得到跳转页时改用浏览器渲染；正文中的图片交给图片缓存
pub struct ArticleExtractor {
    http: Arc<dyn ScraperEngine>,
    browser: Option<Arc<dyn ScraperEngine>>,
    images: Arc<dyn ImageCache>,
    settings: CrawlerSettings,
    site_root: Url,
    offset: FixedOffset,
}

impl ArticleExtractor {
    /// 创建文章提取器
    ///
    /// # 参数
    ///
    /// * `http` - HTTP抓取引擎
    /// * `browser` - 浏览器抓取引擎，禁用浏览器时为 None
    /// * `images` - 图片缓存
    /// * `settings` - 爬虫配置
    /// * `offset` - 时区
    pub fn new(
        http: Arc<dyn ScraperEngine>,
        browser: Option<Arc<dyn ScraperEngine>>,
        images: Arc<dyn ImageCache>,
        settings: CrawlerSettings,
        offset: FixedOffset,
    ) -> anyhow::Result<Self> {
        let site_root = Url::parse(&settings.base_url)?;
        Ok(Self {
            http,
            browser,
            images,
            settings,
            site_root,
            offset,
        })
    }

    async fn fetch(&self, url: &str) -> Option<ScrapeResponse> {
        let request = ScrapeRequest::new(url, Duration::from_secs(self.settings.request_timeout_secs))
            .with_referer(&self.settings.base_url);

        match self.http.scrape(&request).await {
            Ok(page) => return Some(page),
            Err(EngineError::RedirectStub) => {
                debug!(url, "article page is a redirect stub, trying browser");
            }
            Err(e) => {
                warn!(url, "article fetch failed: {}", e);
                return None;
            }
        }

        let browser = self.browser.as_ref()?;
        match browser.scrape(&request).await {
            Ok(page) => Some(page),
            Err(e) => {
                warn!(url, "browser render failed: {}", e);
                None
            }
        }
    }

    /// 缓存一张图片，依次尝试候选地址
    async fn cache_image(&self, slot: &ImageSlot, referer: &str) -> Option<ImageRef> {
        for candidate in &slot.candidates {
            match self.images.get_or_fetch(candidate, Some(referer)).await {
                Ok(cached) => {
                    return Some(ImageRef {
                        image_id: cached.id,
                        alt_text: slot.alt.clone(),
                        content_type: cached.content_type,
                    })
                }
                Err(e) => debug!(url = %candidate, "image not cached: {}", e),
            }
        }
        None
    }

    /// 把占位符替换为图片引用
    async fn render_images(
        &self,
        page: &ParsedPage,
        referer: &str,
    ) -> (String, BTreeMap<String, ImageRef>) {
        let mut body = page.body.clone();
        let mut mapping = BTreeMap::new();

        for (index, slot) in page.images.iter().enumerate() {
            let markdown = match self.cache_image(slot, referer).await {
                Some(image) => {
                    let md = image_markdown(&slot.alt, &cached_image_path(&image.image_id));
                    mapping.insert(slot.source_url.clone(), image);
                    md
                }
                None => image_markdown(&slot.alt, &slot.source_url),
            };
            body = body.replace(&placeholder(index), &markdown);
        }

        (body, mapping)
    }
}

#[async_trait]
impl ArticleSource for ArticleExtractor {
    async fn extract(&self, link: &LinkCandidate) -> Option<Article> {
        let page = self.fetch(&link.url).await?;
        let page_url = Url::parse(&page.final_url)
            .or_else(|_| Url::parse(&link.url))
            .ok()?;
        let now = now_in(self.offset);

        let parsed = parse_page(
            &page.content,
            &page_url,
            &self.site_root,
            &link.title,
            self.settings.min_line_chars,
            now,
        );
        let Some(parsed) = parsed else {
            warn!(url = %link.url, "no article body found");
            return None;
        };

        let (body, image_mapping) = self.render_images(&parsed, page_url.as_str()).await;
        let raw_content = body
            .split("\n\n")
            .filter(|line| !is_image_line(line))
            .collect::<Vec<_>>()
            .join("\n\n");
        let word_count = raw_content.chars().filter(|c| !c.is_whitespace()).count();
        if word_count == 0 {
            warn!(url = %link.url, "article body is empty");
            return None;
        }

        let rendered_markdown = render_article(&parsed.title, &body);
        let image_count = count_images(&rendered_markdown);

        Some(Article {
            id: String::new(),
            title: parsed.title,
            url: link.url.clone(),
            source: parsed.source,
            publish_date: parsed.publish_date,
            summary: extract_summary(&raw_content, SUMMARY_MAX_CHARS),
            raw_content,
            rendered_markdown,
            category: parsed.category,
            word_count,
            image_count,
            image_mapping,
            crawl_status: ArticleStatus::Success,
            view_count: 0,
            created_at: now,
            updated_at: now,
        })
    }
}

#[cfg(test)]
#[path = "article_extractor_test.rs"]
mod tests;
