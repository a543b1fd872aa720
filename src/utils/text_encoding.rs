// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 网页字符集解码
//!
//! 依次使用 `Content-Type` 头、HTML meta 声明和 chardetng 猜测来决定编码，
//! 统一输出 UTF-8 字符串。

use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static HEADER_CHARSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)charset\s*=\s*"?([^";\s]+)"#).expect("valid regex"));

static META_CHARSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta[^>]*charset\s*=\s*["']?([^"'>\s/;]+)"#).expect("valid regex")
});

/// 将页面字节解码为字符串
///
/// # 参数
///
/// * `body` - 原始响应字节
/// * `content_type` - 响应的 `Content-Type` 头（可选）
pub fn decode_html(body: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(|ct| HEADER_CHARSET.captures(ct))
        .and_then(|c| Encoding::for_label(c[1].as_bytes()))
        .or_else(|| sniff_meta_charset(body))
        .unwrap_or_else(|| {
            let mut detector = EncodingDetector::new();
            detector.feed(body, true);
            detector.guess(None, true)
        });

    debug!(encoding = encoding.name(), "decoding page body");
    let (text, _, _) = encoding.decode(body);
    text.into_owned()
}

fn sniff_meta_charset(body: &[u8]) -> Option<&'static Encoding> {
    // meta 声明总出现在文档头部
    let head = &body[..body.len().min(4096)];
    let head = String::from_utf8_lossy(head);
    META_CHARSET
        .captures(&head)
        .and_then(|c| Encoding::for_label(c[1].as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8_from_header() {
        let html = "<html><body>人民网</body></html>";
        let decoded = decode_html(html.as_bytes(), Some("text/html; charset=utf-8"));
        assert_eq!(decoded, html);
    }

    #[test]
    fn test_decode_gbk_from_meta() {
        let source = "<html><head><meta charset=\"gbk\"></head><body>今日要闻</body></html>";
        let (bytes, _, _) = encoding_rs::GBK.encode(source);
        let decoded = decode_html(&bytes, Some("text/html"));
        assert!(decoded.contains("今日要闻"));
    }
}
