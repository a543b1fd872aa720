// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! Markdown 渲染

use crate::domain::models::article::Article;
use crate::utils::text_processing::clean_text;
use once_cell::sync::Lazy;
use regex::Regex;

static IMAGE_MD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[[^\]]*\]\([^)\s]+\)").expect("valid regex"));
static EXTRA_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// 推广类段落的关键字
const PROMO_KEYWORDS: [&str; 8] = [
    "公众号", "二维码", "扫码", "微信", "微博", "客户端", "订阅", "官微",
];

/// 缓存图片的站内地址
pub fn cached_image_path(image_id: &str) -> String {
    format!("/api/crawler/image/{}/", image_id)
}

pub fn image_markdown(alt: &str, target: &str) -> String {
    format!("![{}]({})", alt, target)
}

pub fn is_image_line(line: &str) -> bool {
    let line = line.trim();
    line.starts_with("![") && IMAGE_MD.is_match(line)
}

pub fn count_images(markdown: &str) -> usize {
    IMAGE_MD.find_iter(markdown).count()
}

/// 渲染文章 Markdown：标题为一级标题，段落以空行分隔，图片行原样保留
pub fn render_article(title: &str, body: &str) -> String {
    let paragraphs: Vec<String> = body
        .split('\n')
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                None
            } else if is_image_line(line) {
                Some(line.to_string())
            } else {
                let text = clean_text(line);
                let text = text.trim_start_matches('\u{3000}').trim().to_string();
                (!text.is_empty()).then_some(text)
            }
        })
        .collect();

    format!("# {}\n\n{}", title.trim(), paragraphs.join("\n\n"))
}

fn is_promotional(line: &str) -> bool {
    PROMO_KEYWORDS.iter().any(|k| line.contains(k))
}

/// 渲染对外提供的完整文章文档
///
/// 包含元数据头、正文和采集信息，过滤推广段落
pub fn render_document(article: &Article) -> String {
    let title_line = format!("# {}", article.title.trim());
    let body: Vec<&str> = article
        .rendered_markdown
        .lines()
        .filter(|line| line.trim() != title_line)
        .filter(|line| is_image_line(line) || !is_promotional(line))
        .collect();

    let document = format!(
        "{title}\n\n\
         **来源**: {source}  \n\
         **发布时间**: {published}  \n\
         **分类**: {category}  \n\
         **字数**: {words}  \n\
         **原文链接**: [{url}]({url})\n\n\
         ---\n\n\
         {body}\n\n\
         ---\n\n\
         *采集时间: {crawled}*  \n\
         *阅读次数: {views}*\n",
        title = title_line,
        source = article.source,
        published = article.publish_date.format("%Y年%m月%d日 %H:%M"),
        category = article.category,
        words = article.word_count,
        url = article.url,
        body = body.join("\n").trim(),
        crawled = article.created_at.format("%Y年%m月%d日 %H:%M"),
        views = article.view_count,
    );

    EXTRA_BLANK_LINES.replace_all(&document, "\n\n").into_owned()
}
