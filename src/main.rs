//! Mathmate - 入口：初始化日志、加载配置并启动 Web 服务

use std::path::PathBuf;

use anyhow::Context;
use mathmate::{config::load_config, observability, web};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    // 可选：第一个参数为额外的配置文件
    let extra = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(extra).context("Failed to load config")?;
    tracing::info!(
        provider = %cfg.llm.provider,
        model = %cfg.llm.model,
        "configuration loaded"
    );

    web::serve(cfg).await.context("Web server failed")?;
    Ok(())
}
