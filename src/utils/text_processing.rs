// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::Lazy;
use regex::Regex;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static SENTENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[。！？]").expect("valid regex"));

/// 清理文本：去除标签、解码实体并折叠空白
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let stripped = TAG_RE.replace_all(text, "");
    let decoded = html_escape::decode_html_entities(&stripped);
    WS_RE.replace_all(&decoded, " ").trim().to_string()
}

/// 按字符（而非字节）计算长度
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// 提取摘要：按句号切分，拼接完整句子直到达到上限
pub fn extract_summary(content: &str, max_chars: usize) -> String {
    let cleaned = clean_text(content);
    let mut summary = String::new();

    for sentence in SENTENCE_RE.split(&cleaned) {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }
        if char_len(&summary) + char_len(sentence) > max_chars {
            break;
        }
        summary.push_str(sentence);
        summary.push('。');
    }

    summary
}
