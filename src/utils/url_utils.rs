// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use url::{ParseError, Url};

/// 将可能为相对路径的URL转换为绝对路径URL
pub fn resolve_url(base_url: &Url, path: &str) -> Result<Url, ParseError> {
    base_url.join(path.trim())
}

/// 规范化URL：去掉片段标识，用于去重和生成指纹
pub fn canonical_url(url: &str) -> String {
    match Url::parse(url.trim()) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.trim().to_string(),
    }
}

/// 判断URL的主机是否属于指定域名（包括子域名）
pub fn host_matches(url: &Url, domain: &str) -> bool {
    match url.host_str() {
        Some(host) => host == domain || host.ends_with(&format!(".{}", domain)),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_absolute_url() {
        let base = Url::parse("http://example.com/a/b").unwrap();
        let path = "http://t.co/c";
        assert_eq!(resolve_url(&base, path).unwrap().as_str(), "http://t.co/c");
    }

    #[test]
    fn test_resolve_protocol_relative_url() {
        let base = Url::parse("https://example.com/a/b").unwrap();
        assert_eq!(
            resolve_url(&base, "//t.co/c").unwrap().as_str(),
            "https://t.co/c"
        );
    }

    #[test]
    fn test_resolve_relative_url() {
        let base = Url::parse("http://example.com/a/b").unwrap();
        assert_eq!(
            resolve_url(&base, "c").unwrap().as_str(),
            "http://example.com/a/c"
        );
        assert_eq!(
            resolve_url(&base, "/c").unwrap().as_str(),
            "http://example.com/c"
        );
    }

    #[test]
    fn test_canonical_url_strips_fragment() {
        assert_eq!(
            canonical_url("http://example.com/a.jpg#top"),
            "http://example.com/a.jpg"
        );
        assert_eq!(canonical_url("not a url"), "not a url");
    }

    #[test]
    fn test_host_matches_subdomains() {
        let url = Url::parse("http://politics.people.com.cn/n1/2025/0908/c1024.html").unwrap();
        assert!(host_matches(&url, "people.com.cn"));
        let other = Url::parse("http://people.com.cn.evil.org/n1/").unwrap();
        assert!(!host_matches(&other, "people.com.cn"));
    }
}
