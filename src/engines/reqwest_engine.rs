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

use crate::engines::traits::{EngineError, RedirectStubRule, ScrapeRequest, ScrapeResponse, ScraperEngine};
use crate::utils::text_encoding::decode_html;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, REFERER};
use reqwest::redirect::Policy;
use std::time::{Duration, Instant};
use tracing::debug;

/// 站点会拒绝非浏览器的 User-Agent
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// 抓取引擎
///
/// 基于reqwest实现的HTTP抓取引擎，会拒绝跳转页
pub struct ReqwestEngine {
    client: reqwest::Client,
    stub_rule: RedirectStubRule,
}

impl ReqwestEngine {
    /// 创建HTTP抓取引擎
    ///
    /// # 参数
    ///
    /// * `timeout` - 默认请求超时
    /// * `max_redirects` - 最多跟随的重定向次数
    /// * `stub_rule` - 跳转页识别规则
    pub fn new(
        timeout: Duration,
        max_redirects: usize,
        stub_rule: RedirectStubRule,
    ) -> Result<Self, EngineError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"));

        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .redirect(Policy::limited(max_redirects))
            .cookie_store(true)
            .build()?;

        Ok(Self { client, stub_rule })
    }
}

#[async_trait]
impl ScraperEngine for ReqwestEngine {
    /// 执行HTTP抓取
    ///
    /// # 参数
    ///
    /// * `request` - 抓取请求
    ///
    /// # 返回值
    ///
    /// * `Ok(ScrapeResponse)` - 抓取响应
    /// * `Err(EngineError)` - 请求失败、状态码异常或页面为跳转页
    async fn scrape(&self, request: &ScrapeRequest) -> Result<ScrapeResponse, EngineError> {
        let mut builder = self.client.get(&request.url).timeout(request.timeout);
        if let Some(referer) = &request.referer {
            builder = builder.header(REFERER, referer);
        }

        let start = Instant::now();
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                EngineError::Timeout
            } else {
                EngineError::RequestFailed(e)
            }
        })?;

        let status_code = response.status().as_u16();
        if !response.status().is_success() {
            return Err(EngineError::HttpStatus(status_code));
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.trim().is_empty())
            .unwrap_or("text/html")
            .to_string();

        let body = response.bytes().await?;
        let content = decode_html(&body, Some(&content_type));

        if self.stub_rule.is_stub(&content) {
            debug!(url = %request.url, bytes = content.len(), "redirect stub rejected");
            return Err(EngineError::RedirectStub);
        }

        Ok(ScrapeResponse {
            status_code,
            final_url,
            content,
            content_type,
            response_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// 获取引擎名称
    fn name(&self) -> &'static str {
        "reqwest"
    }
}

#[cfg(test)]
#[path = "reqwest_engine_test.rs"]
mod tests;
