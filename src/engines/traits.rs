// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// 引擎错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    /// 请求失败
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    /// 非成功状态码
    #[error("Unexpected status: {0}")]
    HttpStatus(u16),
    /// 页面是客户端跳转页，不含实际内容
    #[error("Page looks like a client-side redirect stub")]
    RedirectStub,
    /// 超时
    #[error("Timeout")]
    Timeout,
    /// 浏览器错误
    #[error("Browser error: {0}")]
    Browser(String),
    /// 其他错误
    #[error("Other error: {0}")]
    Other(String),
}

/// 抓取请求
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    /// 目标URL
    pub url: String,
    /// Referer 头
    pub referer: Option<String>,
    /// 超时时间
    pub timeout: Duration,
}

impl ScrapeRequest {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            referer: None,
            timeout,
        }
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }
}

/// 抓取响应
#[derive(Debug, Clone)]
pub struct ScrapeResponse {
    /// HTTP状态码
    pub status_code: u16,
    /// 跟随重定向后的最终地址
    pub final_url: String,
    /// 解码后的页面内容
    pub content: String,
    /// 内容类型
    pub content_type: String,
    /// 响应时间（毫秒）
    pub response_time_ms: u64,
}

/// 抓取引擎特质
#[async_trait]
pub trait ScraperEngine: Send + Sync {
    /// 执行抓取
    async fn scrape(&self, request: &ScrapeRequest) -> Result<ScrapeResponse, EngineError>;

    /// 引擎名称
    fn name(&self) -> &'static str;
}

/// 浏览器渲染出的列表页
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedListing {
    /// 页面最终停留的地址，相对链接以它为准
    pub url: String,
    pub html: String,
}

/// 每日列表页导航
///
/// 日期选择控件只能在浏览器中操作
#[async_trait]
pub trait ListingNavigator: Send + Sync {
    /// 打开列表入口，必要时选择当天日期，返回列表页地址和源码
    ///
    /// # 参数
    ///
    /// * `root_url` - 列表入口地址
    /// * `day_of_month` - 当天的日期数字
    async fn render_listing(
        &self,
        root_url: &str,
        day_of_month: u32,
    ) -> Result<RenderedListing, EngineError>;
}

/// 跳转页识别规则
#[derive(Debug, Clone)]
pub struct RedirectStubRule {
    /// 小于该字节数的页面视为跳转页
    pub min_bytes: usize,
    /// 出现任一标记即视为跳转页
    pub markers: Vec<String>,
}

impl RedirectStubRule {
    pub fn is_stub(&self, content: &str) -> bool {
        content.len() < self.min_bytes || self.markers.iter().any(|m| content.contains(m.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_stub_rule() {
        let rule = RedirectStubRule {
            min_bytes: 100,
            markers: vec!["setTimeout".to_string()],
        };
        let body = "x".repeat(200);
        assert!(!rule.is_stub(&body));
        assert!(rule.is_stub("<html>short</html>"));
        assert!(rule.is_stub(&format!("{}<script>setTimeout(go, 0)</script>", body)));
    }
}
