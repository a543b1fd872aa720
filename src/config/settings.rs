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

use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;

/// 应用程序配置设置
///
/// 包含服务器、Redis、指标、爬虫、浏览器、存储和图片缓存等所有配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 服务器配置
    pub server: ServerSettings,
    /// Redis配置
    pub redis: RedisSettings,
    /// 指标导出配置
    pub metrics: MetricsSettings,
    /// 爬虫配置
    pub crawler: CrawlerSettings,
    /// 无头浏览器配置
    pub browser: BrowserSettings,
    /// 存储（TTL）配置
    pub storage: StorageSettings,
    /// 图片缓存配置
    pub images: ImageSettings,
}

/// 服务器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// 服务器监听主机地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
}

/// Redis配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct RedisSettings {
    /// Redis连接URL，`memory://` 表示使用进程内存储
    pub url: String,
}

/// 指标配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    pub enabled: bool,
    /// Prometheus 监听地址
    pub listen_addr: String,
}

/// 爬虫配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerSettings {
    /// 站点首页
    pub base_url: String,
    /// 已知的每日列表页地址，按顺序尝试
    pub listing_urls: Vec<String>,
    /// 记录在任务上的目标地址
    pub task_target_url: String,
    /// 文章链接必须属于的域名
    pub article_host: String,
    /// 文章链接路径标记，满足其一即可
    pub article_path_markers: Vec<String>,
    /// 链接标题最小字符数（需严格大于）
    pub min_link_title_chars: usize,
    /// 单次发现的最大链接数
    pub max_links: usize,
    /// 低于该字节数的页面视为跳转页
    pub min_page_bytes: usize,
    /// 跳转页标记
    pub redirect_markers: Vec<String>,
    /// 请求超时（秒）
    pub request_timeout_secs: u64,
    /// 最大重定向次数
    pub max_redirects: usize,
    /// 文章之间的间隔（毫秒）
    pub request_delay_ms: u64,
    /// 计算日历日使用的时区偏移（小时）
    pub timezone_offset_hours: i32,
    /// 每日自动触发的本地小时
    pub schedule_hour: u32,
    /// 调度检查间隔（秒）
    pub schedule_check_secs: u64,
    /// 正文行最小字符数（需严格大于）
    pub min_line_chars: usize,
}

/// 无头浏览器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserSettings {
    pub enabled: bool,
    /// Chrome 可执行文件路径，为空时自动查找
    pub executable: Option<String>,
    /// 探测日期选择 iframe 的超时（秒）
    pub detect_timeout_secs: u64,
    /// 等待列表出现的超时（秒）
    pub wait_timeout_secs: u64,
    pub iframe_selector: String,
    /// 表示"已到达列表页"的选择器
    pub list_marker_selector: String,
}

/// 存储配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    pub article_ttl_secs: u64,
    pub task_ttl_secs: u64,
    /// 最近任务列表的长度上限
    pub recent_tasks_cap: usize,
    pub lock_ttl_secs: u64,
    pub status_ttl_secs: u64,
}

/// 图片缓存配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ImageSettings {
    /// 单张图片的最大字节数
    pub max_bytes: u64,
    /// 抓取图片的缓存时长（秒）
    pub ttl_secs: u64,
    /// 上传图片的缓存时长（秒）
    pub upload_ttl_secs: u64,
    pub timeout_secs: u64,
    /// 统计时的采样数量
    pub stats_sample_size: usize,
    /// 单次请求允许上传的图片数量
    pub max_uploads_per_request: usize,
}

/// 批量上传中每张图片及请求本身的 JSON 字段余量
const BATCH_FIELD_SLACK: u64 = 4096;

impl ImageSettings {
    /// 单张上传请求体的上限
    pub fn upload_body_limit(&self) -> usize {
        usize::try_from(self.max_bytes).unwrap_or(usize::MAX)
    }

    /// 批量上传请求体的上限，按 base64 膨胀后的大小计算
    pub fn batch_body_limit(&self) -> usize {
        let per_image = self.max_bytes.div_ceil(3) * 4 + BATCH_FIELD_SLACK;
        let total = per_image
            .saturating_mul(self.max_uploads_per_request as u64)
            .saturating_add(BATCH_FIELD_SLACK);
        usize::try_from(total).unwrap_or(usize::MAX)
    }
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次叠加内置默认值、`config/default`、`config/{APP_ENVIRONMENT}` 和
    /// `NEWSRS__` 前缀的环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        Self::with_defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("NEWSRS").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// 仅使用内置默认值构建配置
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::with_defaults()?.build()?.try_deserialize()
    }

    fn with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("redis.url", "redis://127.0.0.1:6379/0")?
            .set_default("metrics.enabled", true)?
            .set_default("metrics.listen_addr", "0.0.0.0:9000")?
            // Crawler
            .set_default("crawler.base_url", "http://www.people.com.cn")?
            .set_default(
                "crawler.listing_urls",
                vec![
                    "http://www.people.com.cn/GB/59476/".to_string(),
                    "http://www.people.com.cn/GB/".to_string(),
                    "http://www.people.com.cn/GB/59476/index.html".to_string(),
                ],
            )?
            .set_default(
                "crawler.task_target_url",
                "http://www.people.com.cn/GB/59476/index.html",
            )?
            .set_default("crawler.article_host", "people.com.cn")?
            .set_default(
                "crawler.article_path_markers",
                vec!["/n1/".to_string(), "/GB/".to_string()],
            )?
            .set_default("crawler.min_link_title_chars", 5)?
            .set_default("crawler.max_links", 15)?
            .set_default("crawler.min_page_bytes", 1000)?
            .set_default("crawler.redirect_markers", vec!["setTimeout".to_string()])?
            .set_default("crawler.request_timeout_secs", 30)?
            .set_default("crawler.max_redirects", 3)?
            .set_default("crawler.request_delay_ms", 1000)?
            .set_default("crawler.timezone_offset_hours", 8)?
            .set_default("crawler.schedule_hour", 6)?
            .set_default("crawler.schedule_check_secs", 300)?
            .set_default("crawler.min_line_chars", 5)?
            // Browser
            .set_default("browser.enabled", true)?
            .set_default("browser.detect_timeout_secs", 5)?
            .set_default("browser.wait_timeout_secs", 20)?
            .set_default("browser.iframe_selector", "iframe")?
            .set_default(
                "browser.list_marker_selector",
                ".p2j_list, .list_16, ul.list_14",
            )?
            // Storage
            .set_default("storage.article_ttl_secs", 172_800)?
            .set_default("storage.task_ttl_secs", 604_800)?
            .set_default("storage.recent_tasks_cap", 100)?
            .set_default("storage.lock_ttl_secs", 7200)?
            .set_default("storage.status_ttl_secs", 172_800)?
            // Images
            .set_default("images.max_bytes", 5 * 1024 * 1024)?
            .set_default("images.ttl_secs", 604_800)?
            .set_default("images.upload_ttl_secs", 86_400)?
            .set_default("images.timeout_secs", 30)?
            .set_default("images.stats_sample_size", 100)?
            .set_default("images.max_uploads_per_request", 5)?;

        Ok(builder)
    }
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
