// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, warn};

/// 初始化指标系统
///
/// 启动 Prometheus 导出端口并登记爬取相关指标
pub fn init_metrics(listen_addr: &str) -> anyhow::Result<()> {
    let addr: SocketAddr = listen_addr.parse()?;

    // 端口被占用时只告警，不影响主服务
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        warn!("Failed to install Prometheus recorder: {}", e);
        return Ok(());
    }

    describe_counter!("newsrs_articles_saved_total", "Articles extracted and saved");
    describe_counter!("newsrs_articles_failed_total", "Articles that failed extraction or saving");
    describe_counter!("newsrs_image_cache_hits_total", "Image lookups served from cache");
    describe_counter!("newsrs_image_cache_misses_total", "Image lookups that required a download");
    describe_counter!("newsrs_image_rejected_total", "Images rejected, labelled by reason");
    describe_counter!("newsrs_crawl_runs_total", "Daily crawl runs, labelled by outcome");
    describe_histogram!("newsrs_crawl_duration_seconds", "Duration of daily crawl runs in seconds");

    info!("Metrics exporter listening on {}", addr);
    Ok(())
}
