//! 嗅探器模块
//!
//! 按顺序尝试注册表中的协议描述符，从首个数据包中提取主机名。

use crate::core::protocol::{ParseOutcome, ProtocolDescriptor};
use crate::core::registry::ProtocolRegistry;
use crate::error::{DetectorError, Result};
use crate::utils::hostname::normalize_hostname;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// 默认缓冲区上限
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 4096;

/// 嗅探结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// 协议名称
    pub protocol: String,
    /// 提取到的主机名
    pub hostname: String,
    /// 主机名是否来自回退配置
    pub used_fallback: bool,
    /// 参与解析的字节数
    pub bytes_inspected: usize,
    /// 嗅探耗时
    pub detection_time: Duration,
    /// 嗅探完成时间
    pub detected_at: DateTime<Utc>,
}

impl DetectionResult {
    /// 创建新的嗅探结果
    pub fn new<S1, S2>(
        protocol: S1,
        hostname: S2,
        bytes_inspected: usize,
        detection_time: Duration,
    ) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self {
            protocol: protocol.into(),
            hostname: hostname.into(),
            used_fallback: false,
            bytes_inspected,
            detection_time,
            detected_at: Utc::now(),
        }
    }

    /// 标记为回退主机名
    pub fn with_fallback(mut self) -> Self {
        self.used_fallback = true;
        self
    }
}

/// 嗅探器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnifferConfig {
    /// 缓冲区上限（字节）
    pub max_buffer_size: usize,
    /// 启用的协议，按尝试顺序
    pub enabled_protocols: Vec<String>,
    /// 请求中没有主机名时使用的回退主机名
    pub fallback_hostname: Option<String>,
    /// 是否优先尝试默认端口与端口提示相同的协议
    pub prefer_port_hint: bool,
}

impl Default for SnifferConfig {
    fn default() -> Self {
        Self {
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            enabled_protocols: crate::protocols::builtin_protocols()
                .iter()
                .map(|descriptor| descriptor.name().to_string())
                .collect(),
            fallback_hostname: None,
            prefer_port_hint: true,
        }
    }
}

impl SnifferConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 从JSON加载配置
    ///
    /// 未出现的字段使用默认值。
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// 序列化为JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 设置缓冲区上限
    pub fn with_max_buffer_size(mut self, size: usize) -> Self {
        self.max_buffer_size = size;
        self
    }

    /// 设置启用的协议
    pub fn with_protocols<I, S>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enabled_protocols = protocols.into_iter().map(Into::into).collect();
        self
    }

    /// 设置回退主机名
    pub fn with_fallback_hostname<S: Into<String>>(mut self, hostname: S) -> Self {
        self.fallback_hostname = Some(hostname.into());
        self
    }

    /// 设置是否优先使用端口提示
    pub fn prefer_port_hint(mut self, prefer: bool) -> Self {
        self.prefer_port_hint = prefer;
        self
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.max_buffer_size == 0 {
            return Err(DetectorError::config_error("缓冲区大小必须大于0"));
        }

        if let Some(fallback) = &self.fallback_hostname {
            normalize_hostname(fallback.as_bytes()).map_err(|_| {
                DetectorError::config_error(format!("回退主机名非法: {}", fallback))
            })?;
        }

        Ok(())
    }
}

/// 嗅探统计信息
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionStats {
    /// 总嗅探次数（不含需要更多数据的尝试）
    pub total_detections: u64,
    /// 成功次数
    pub successful_detections: u64,
    /// 失败次数
    pub failed_detections: u64,
    /// 平均耗时
    pub avg_detection_time: Duration,
    /// 各协议成功次数
    pub protocol_counts: HashMap<String, u64>,
}

impl DetectionStats {
    /// 创建新的统计信息
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录成功
    pub fn record_success(&mut self, protocol: &str, duration: Duration) {
        self.total_detections += 1;
        self.successful_detections += 1;
        self.update_avg_time(duration);
        *self.protocol_counts.entry(protocol.to_string()).or_insert(0) += 1;
    }

    /// 记录失败
    pub fn record_failure(&mut self, duration: Duration) {
        self.total_detections += 1;
        self.failed_detections += 1;
        self.update_avg_time(duration);
    }

    /// 成功率
    pub fn success_rate(&self) -> f64 {
        if self.total_detections == 0 {
            0.0
        } else {
            self.successful_detections as f64 / self.total_detections as f64
        }
    }

    /// 成功次数最多的协议
    pub fn most_common_protocol(&self) -> Option<&str> {
        self.protocol_counts
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(protocol, _)| protocol.as_str())
    }

    fn update_avg_time(&mut self, new_duration: Duration) {
        if self.total_detections == 1 {
            self.avg_detection_time = new_duration;
        } else {
            let total_nanos = self.avg_detection_time.as_nanos()
                * (self.total_detections - 1) as u128
                + new_duration.as_nanos();
            self.avg_detection_time =
                Duration::from_nanos((total_nanos / self.total_detections as u128) as u64);
        }
    }
}

/// 主机名嗅探器
#[derive(Debug)]
pub struct Sniffer {
    registry: ProtocolRegistry,
    config: SnifferConfig,
    fallback_hostname: Option<String>,
    stats: Mutex<DetectionStats>,
}

impl Sniffer {
    /// 使用给定注册表创建嗅探器
    ///
    /// 配置中的`enabled_protocols`会被替换为注册表中的协议名称。
    pub fn new(registry: ProtocolRegistry, mut config: SnifferConfig) -> Result<Self> {
        config.validate()?;
        if registry.is_empty() {
            return Err(DetectorError::config_error("至少需要启用一个协议"));
        }

        let fallback_hostname = config
            .fallback_hostname
            .as_deref()
            .map(|hostname| normalize_hostname(hostname.as_bytes()))
            .transpose()?;

        config.enabled_protocols = registry.names().into_iter().map(String::from).collect();

        Ok(Self {
            registry,
            config,
            fallback_hostname,
            stats: Mutex::new(DetectionStats::new()),
        })
    }

    /// 使用内置协议和默认配置创建嗅探器
    pub fn builtin() -> Result<Self> {
        Self::new(ProtocolRegistry::builtin().clone(), SnifferConfig::default())
    }

    /// 协议注册表
    pub fn registry(&self) -> &ProtocolRegistry {
        &self.registry
    }

    /// 生效的配置
    pub fn config(&self) -> &SnifferConfig {
        &self.config
    }

    /// 缓冲区上限
    pub fn max_buffer_size(&self) -> usize {
        self.config.max_buffer_size
    }

    /// 嗅探主机名
    pub fn sniff(&self, data: &[u8]) -> Result<DetectionResult> {
        self.run(data, None)
    }

    /// 使用连接到达的本地端口作为提示嗅探主机名
    pub fn sniff_with_port_hint(&self, data: &[u8], port: u16) -> Result<DetectionResult> {
        self.run(data, Some(port))
    }

    /// 指定协议的中止消息
    pub fn abort_message_for(&self, protocol: &str) -> Option<&Bytes> {
        self.registry
            .get(protocol)
            .map(|descriptor| descriptor.abort_message())
    }

    /// 统计信息快照
    pub fn stats(&self) -> DetectionStats {
        match self.stats.lock() {
            Ok(stats) => stats.clone(),
            Err(poisoned) => {
                warn!("Failed to acquire lock for detection stats");
                poisoned.into_inner().clone()
            }
        }
    }

    /// 清空统计信息
    pub fn reset_stats(&self) {
        match self.stats.lock() {
            Ok(mut stats) => *stats = DetectionStats::new(),
            Err(poisoned) => {
                warn!("Failed to acquire lock for detection stats");
                *poisoned.into_inner() = DetectionStats::new();
            }
        }
    }

    fn run(&self, data: &[u8], port_hint: Option<u16>) -> Result<DetectionResult> {
        let start = Instant::now();
        let limit = self.config.max_buffer_size;
        let window = &data[..data.len().min(limit)];
        let hint = port_hint.filter(|_| self.config.prefer_port_hint);

        let mut incomplete = false;
        let mut malformed: Option<(&'static str, String)> = None;

        for descriptor in self.registry.dispatch_order(hint) {
            let outcome = descriptor.parse_packet(window);
            trace!("{} -> {}", descriptor, outcome);

            match outcome {
                ParseOutcome::Parsed(hostname) => {
                    return Ok(self.succeed(descriptor, hostname, window.len(), start, false));
                }
                ParseOutcome::NoHostname => {
                    return match &self.fallback_hostname {
                        Some(fallback) => {
                            debug!(
                                "{} request without hostname, using fallback {}",
                                descriptor.name(),
                                fallback
                            );
                            Ok(self.succeed(
                                descriptor,
                                fallback.clone(),
                                window.len(),
                                start,
                                true,
                            ))
                        }
                        None => {
                            Err(self.fail(DetectorError::no_hostname(descriptor.name()), start))
                        }
                    };
                }
                ParseOutcome::Incomplete => incomplete = true,
                ParseOutcome::NotThisProtocol => {}
                ParseOutcome::Malformed(reason) => {
                    if malformed.is_none() {
                        malformed = Some((descriptor.name(), reason));
                    }
                }
            }
        }

        let err = if incomplete {
            if window.len() >= limit {
                DetectorError::BufferFull { limit }
            } else {
                // 不计入统计，调用方会带着更多数据重试
                return Err(DetectorError::NeedMoreData(window.len()));
            }
        } else if let Some((protocol, reason)) = malformed {
            DetectorError::malformed(protocol, reason)
        } else {
            DetectorError::NoProtocolDetected(format!(
                "{} bytes matched none of {:?}",
                window.len(),
                self.registry.names()
            ))
        };

        Err(self.fail(err, start))
    }

    fn succeed(
        &self,
        descriptor: &ProtocolDescriptor,
        hostname: String,
        bytes_inspected: usize,
        start: Instant,
        used_fallback: bool,
    ) -> DetectionResult {
        let elapsed = start.elapsed();
        match self.stats.lock() {
            Ok(mut stats) => stats.record_success(descriptor.name(), elapsed),
            Err(_) => warn!("Failed to acquire lock for detection stats"),
        }

        debug!("Detected {} request for {}", descriptor.name(), hostname);
        let result = DetectionResult::new(descriptor.name(), hostname, bytes_inspected, elapsed);
        if used_fallback {
            result.with_fallback()
        } else {
            result
        }
    }

    fn fail(&self, err: DetectorError, start: Instant) -> DetectorError {
        match self.stats.lock() {
            Ok(mut stats) => stats.record_failure(start.elapsed()),
            Err(_) => warn!("Failed to acquire lock for detection stats"),
        }
        debug!("Detection failed: {}", err);
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(entries: Vec<ProtocolDescriptor>) -> ProtocolRegistry {
        let mut registry = ProtocolRegistry::new();
        for descriptor in entries {
            registry.register(descriptor).unwrap();
        }
        registry
    }

    fn fixed(name: &'static str, port: u16, outcome: ParseOutcome) -> ProtocolDescriptor {
        ProtocolDescriptor::new(name, port, move |_: &[u8]| outcome.clone())
    }

    #[test]
    fn test_first_parsed_wins() {
        let sniffer = Sniffer::new(
            registry(vec![
                fixed("a", 1, ParseOutcome::NotThisProtocol),
                fixed("b", 2, ParseOutcome::Parsed("b.example".into())),
                fixed("c", 3, ParseOutcome::Parsed("c.example".into())),
            ]),
            SnifferConfig::default(),
        )
        .unwrap();

        let result = sniffer.sniff(b"x").unwrap();
        assert_eq!(result.protocol, "b");
        assert_eq!(result.hostname, "b.example");
        assert!(!result.used_fallback);

        let result = sniffer.sniff_with_port_hint(b"x", 3).unwrap();
        assert_eq!(result.protocol, "c");
    }

    #[test]
    fn test_port_hint_can_be_disabled() {
        let sniffer = Sniffer::new(
            registry(vec![
                fixed("b", 2, ParseOutcome::Parsed("b.example".into())),
                fixed("c", 3, ParseOutcome::Parsed("c.example".into())),
            ]),
            SnifferConfig::default().prefer_port_hint(false),
        )
        .unwrap();

        assert_eq!(sniffer.sniff_with_port_hint(b"x", 3).unwrap().protocol, "b");
    }

    #[test]
    fn test_incomplete_beats_malformed() {
        let sniffer = Sniffer::new(
            registry(vec![
                fixed("a", 1, ParseOutcome::malformed("broken")),
                fixed("b", 2, ParseOutcome::Incomplete),
            ]),
            SnifferConfig::default().with_max_buffer_size(8),
        )
        .unwrap();

        assert!(matches!(sniffer.sniff(b"abc"), Err(DetectorError::NeedMoreData(3))));
        assert!(matches!(
            sniffer.sniff(b"0123456789"),
            Err(DetectorError::BufferFull { limit: 8 })
        ));
    }

    #[test]
    fn test_malformed_reported() {
        let sniffer = Sniffer::new(
            registry(vec![
                fixed("a", 1, ParseOutcome::NotThisProtocol),
                fixed("b", 2, ParseOutcome::malformed("broken")),
            ]),
            SnifferConfig::default(),
        )
        .unwrap();

        match sniffer.sniff(b"abc") {
            Err(DetectorError::MalformedPacket { protocol, reason }) => {
                assert_eq!(protocol, "b");
                assert_eq!(reason, "broken");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_fallback_hostname() {
        let entries = || vec![fixed("a", 1, ParseOutcome::NoHostname)];

        let strict = Sniffer::new(registry(entries()), SnifferConfig::default()).unwrap();
        assert!(matches!(strict.sniff(b"x"), Err(DetectorError::NoHostname { .. })));

        let lenient = Sniffer::new(
            registry(entries()),
            SnifferConfig::default().with_fallback_hostname("Default.Example"),
        )
        .unwrap();
        let result = lenient.sniff(b"x").unwrap();
        assert_eq!(result.hostname, "default.example");
        assert!(result.used_fallback);
    }

    #[test]
    fn test_stats() {
        let sniffer = Sniffer::new(
            registry(vec![fixed("a", 1, ParseOutcome::Parsed("a.example".into()))]),
            SnifferConfig::default(),
        )
        .unwrap();

        sniffer.sniff(b"x").unwrap();
        sniffer.sniff(b"y").unwrap();
        let stats = sniffer.stats();
        assert_eq!(stats.successful_detections, 2);
        assert_eq!(stats.most_common_protocol(), Some("a"));

        sniffer.reset_stats();
        assert_eq!(sniffer.stats().total_detections, 0);
    }

    #[test]
    fn test_stats_survive_poisoned_lock() {
        let sniffer = Sniffer::new(
            registry(vec![fixed("a", 1, ParseOutcome::Parsed("a.example".into()))]),
            SnifferConfig::default(),
        )
        .unwrap();
        sniffer.sniff(b"x").unwrap();

        let poisoned = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = sniffer.stats.lock().unwrap();
            panic!("poison stats lock");
        }));
        assert!(poisoned.is_err());
        assert!(sniffer.stats.is_poisoned());

        assert_eq!(sniffer.stats().successful_detections, 1);
        sniffer.reset_stats();
        assert_eq!(sniffer.stats().total_detections, 0);
    }

    #[test]
    fn test_rejects_bad_config() {
        assert!(Sniffer::new(ProtocolRegistry::new(), SnifferConfig::default()).is_err());
        let err = Sniffer::new(
            registry(vec![fixed("a", 1, ParseOutcome::Incomplete)]),
            SnifferConfig::default().with_fallback_hostname("not valid"),
        )
        .unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_config_json() {
        let config = SnifferConfig::from_json(
            r#"{"max_buffer_size": 1024, "fallback_hostname": "example.com"}"#,
        )
        .unwrap();
        assert_eq!(config.max_buffer_size, 1024);
        assert_eq!(config.fallback_hostname.as_deref(), Some("example.com"));
        assert!(config.prefer_port_hint);

        let round = SnifferConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(round, config);

        let err = SnifferConfig::from_json(r#"{"max_buffer_size": 0}"#).unwrap_err();
        assert!(err.is_config_error());
    }
}
