//! 日志初始化
//!
//! 控制台 + 日志文件两路输出；级别由 `RUST_LOG` 决定，未设置时按 `verbose_logging` 选 debug / info。

use crate::config::Config;
use crate::utils::logging::init_log_file;
use anyhow::{anyhow, Context, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 初始化全局日志
pub fn init(config: &Config) -> Result<()> {
    init_log_file(&config.output_log_file)
        .with_context(|| format!("无法初始化日志文件: {}", config.output_log_file))?;

    let file = OpenOptions::new()
        .append(true)
        .open(&config.output_log_file)
        .with_context(|| format!("无法打开日志文件: {}", config.output_log_file))?;

    let default_level = if config.verbose_logging { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false),
        )
        .try_init()
        .map_err(|e| anyhow!("日志初始化失败: {}", e))
}
