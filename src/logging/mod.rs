//! 日志初始化模块.
//!
//! 双输出:
//! - console: 彩色, 带时间戳和源码位置
//! - file: 无色, 按天滚动, 仅在配置了目录时启用
//!
//! 级别默认取 `LoggingConfig::level`, 可通过 `YIN_LOG` 环境变量覆盖.
//! 引擎 crate 通过 `log` 输出的记录会被桥接到同一个订阅器.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, FormatEvent, FormatFields, format::Writer},
    layer::{Layer, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// 覆盖日志级别的环境变量
pub const LOG_ENV: &str = "YIN_LOG";

/// 日志配置, 缺失的字段使用默认值
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 过滤指令, 如 "info" 或 "yin=debug,yin_flac=trace"
    pub level: String,
    /// 日志文件目录, 为空时只输出到 console
    pub directory: Option<String>,
    /// 日志文件名前缀
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            file_prefix: "yin".to_string(),
        }
    }
}

impl LoggingConfig {
    /// 当天日志文件的路径, 未配置目录时为 `None`
    pub fn current_log_path(&self) -> Option<PathBuf> {
        let directory = self.directory.as_deref()?;
        Some(build_log_path(
            Path::new(directory),
            &self.file_prefix,
            Local::now().date_naive(),
        ))
    }

    fn filter(&self) -> Result<EnvFilter> {
        match EnvFilter::try_from_env(LOG_ENV) {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(&self.level)
                .with_context(|| format!("无效的日志级别: {}", self.level)),
        }
    }
}

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// 初始化全局日志订阅器, 每个进程只能成功调用一次
pub fn init(config: LoggingConfig) -> Result<()> {
    let console_layer = fmt::Layer::default()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .event_format(LineFormatter { colored: true })
        .with_filter(config.filter()?);

    let file_layer = match config.directory.as_deref() {
        Some(directory) => {
            std::fs::create_dir_all(directory)
                .with_context(|| format!("创建日志目录失败, path={}", directory))?;
            let file_appender = tracing_appender::rolling::RollingFileAppender::builder()
                .rotation(tracing_appender::rolling::Rotation::DAILY)
                .filename_prefix(&config.file_prefix)
                .filename_suffix("log")
                .build(directory)
                .with_context(|| format!("创建日志文件失败, path={}", directory))?;

            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            LOG_GUARD.set(guard).ok();

            Some(
                fmt::Layer::default()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .event_format(LineFormatter { colored: false })
                    .with_filter(config.filter()?),
            )
        }
        None => None,
    };

    Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("全局日志订阅器已被初始化")?;

    Ok(())
}

pub(crate) fn build_log_path(directory: &Path, prefix: &str, date: NaiveDate) -> PathBuf {
    directory.join(format!("{}.{}.log", prefix, date.format("%Y-%m-%d")))
}

/// 单行日志格式
///
/// console 输出带颜色和源码位置, 文件输出不带颜色, 记录 target.
struct LineFormatter {
    colored: bool,
}

impl LineFormatter {
    fn level_color(level: tracing::Level) -> &'static str {
        match level {
            tracing::Level::ERROR => "\x1b[31m",
            tracing::Level::WARN => "\x1b[33m",
            tracing::Level::INFO => "\x1b[32m",
            _ => "\x1b[34m",
        }
    }
}

impl<S, N> FormatEvent<S, N> for LineFormatter
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        let timestamp = Local::now().format("%m-%d %H:%M:%S%.3f");
        if self.colored {
            write!(
                writer,
                "[{}] {}{:5}\x1b[0m {}:{} > ",
                timestamp,
                Self::level_color(*meta.level()),
                meta.level(),
                meta.file().unwrap_or("unknown"),
                meta.line().unwrap_or(0),
            )?;
        } else {
            write!(writer, "[{}] {:5} {} > ", timestamp, meta.level(), meta.target())?;
        }
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
