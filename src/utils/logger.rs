//! 日志模块
//!
//! 基于tracing-subscriber提供统一的日志初始化和配置。
//! 库内部只通过`tracing`宏输出日志，是否安装订阅者由使用方决定。

use crate::error::{DetectorError, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// 是否启用日志
    pub enabled: bool,
    /// 日志级别
    pub level: LogLevel,
    /// 是否显示时间戳
    pub show_timestamp: bool,
    /// 是否显示模块路径
    pub show_module: bool,
    /// 是否显示行号
    pub show_line_number: bool,
    /// 是否使用彩色输出
    pub use_colors: bool,
    /// 时间戳格式（chrono格式字符串）
    pub timestamp_format: Option<String>,
    /// 输出目标
    pub target: LogTarget,
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// 错误
    Error,
    /// 警告
    Warn,
    /// 信息
    Info,
    /// 调试
    Debug,
    /// 跟踪
    Trace,
}

impl LogLevel {
    /// 对应的过滤指令
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// 日志输出目标
#[derive(Debug, Clone)]
pub enum LogTarget {
    /// 标准输出
    Stdout,
    /// 标准错误
    Stderr,
    /// 文件（追加写入）
    File(String),
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: LogLevel::Info,
            show_timestamp: true,
            show_module: true,
            show_line_number: false,
            use_colors: true,
            timestamp_format: None,
            target: LogTarget::Stdout,
        }
    }
}

impl LoggerConfig {
    /// 构造环境过滤器
    ///
    /// `RUST_LOG`存在时优先使用，否则使用配置的级别。
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.as_directive()))
    }
}

/// 安装全局日志订阅者
///
/// 日志被禁用时直接返回。已有全局订阅者时返回配置错误。
pub fn init_logger(config: LoggerConfig) -> Result<()> {
    if !config.enabled {
        return Ok(());
    }

    let timer = match &config.timestamp_format {
        Some(format) => ChronoLocal::new(format.clone()),
        None => ChronoLocal::rfc_3339(),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.env_filter())
        .with_target(config.show_module)
        .with_line_number(config.show_line_number)
        .with_timer(timer);

    let installed = match (&config.target, config.show_timestamp) {
        (LogTarget::Stdout, true) => builder
            .with_ansi(config.use_colors)
            .with_writer(std::io::stdout)
            .try_init(),
        (LogTarget::Stdout, false) => builder
            .with_ansi(config.use_colors)
            .with_writer(std::io::stdout)
            .without_time()
            .try_init(),
        (LogTarget::Stderr, true) => builder
            .with_ansi(config.use_colors)
            .with_writer(std::io::stderr)
            .try_init(),
        (LogTarget::Stderr, false) => builder
            .with_ansi(config.use_colors)
            .with_writer(std::io::stderr)
            .without_time()
            .try_init(),
        (LogTarget::File(path), show_timestamp) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let builder = builder.with_ansi(false).with_writer(Mutex::new(file));
            if show_timestamp {
                builder.try_init()
            } else {
                builder.without_time().try_init()
            }
        }
    };

    installed.map_err(|e| DetectorError::config_error(format!("failed to install logger: {}", e)))
}

/// 构建器模式的日志配置
#[derive(Debug, Default)]
pub struct LoggerConfigBuilder {
    config: LoggerConfig,
}

impl LoggerConfigBuilder {
    /// 创建新的配置构建器
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置是否启用日志
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    /// 设置日志级别
    pub fn level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    /// 设置是否显示时间戳
    pub fn show_timestamp(mut self, show: bool) -> Self {
        self.config.show_timestamp = show;
        self
    }

    /// 设置是否显示模块路径
    pub fn show_module(mut self, show: bool) -> Self {
        self.config.show_module = show;
        self
    }

    /// 设置是否显示行号
    pub fn show_line_number(mut self, show: bool) -> Self {
        self.config.show_line_number = show;
        self
    }

    /// 设置是否使用彩色输出
    pub fn use_colors(mut self, use_colors: bool) -> Self {
        self.config.use_colors = use_colors;
        self
    }

    /// 设置时间戳格式
    pub fn timestamp_format<S: Into<String>>(mut self, format: S) -> Self {
        self.config.timestamp_format = Some(format.into());
        self
    }

    /// 设置输出目标
    pub fn target(mut self, target: LogTarget) -> Self {
        self.config.target = target;
        self
    }

    /// 构建配置
    pub fn build(self) -> LoggerConfig {
        self.config
    }

    /// 构建并初始化日志器
    pub fn init(self) -> Result<()> {
        init_logger(self.config)
    }
}

/// 创建禁用日志的配置
pub fn disabled_config() -> LoggerConfig {
    LoggerConfig {
        enabled: false,
        ..Default::default()
    }
}

/// 创建开发环境的日志配置
pub fn dev_config() -> LoggerConfig {
    LoggerConfigBuilder::new()
        .level(LogLevel::Debug)
        .show_line_number(true)
        .build()
}

/// 创建生产环境的日志配置
pub fn prod_config() -> LoggerConfig {
    LoggerConfigBuilder::new()
        .level(LogLevel::Info)
        .show_module(false)
        .use_colors(false)
        .build()
}

/// 创建文件日志配置
pub fn file_config<P: Into<String>>(path: P) -> LoggerConfig {
    LoggerConfigBuilder::new()
        .level(LogLevel::Info)
        .show_line_number(true)
        .use_colors(false)
        .target(LogTarget::File(path.into()))
        .build()
}
