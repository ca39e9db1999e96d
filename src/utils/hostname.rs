//! 主机名校验与规范化

use crate::error::{DetectorError, Result};
use std::net::Ipv6Addr;

/// 主机名最大长度
pub const MAX_HOSTNAME_LEN: usize = 255;

/// 单个标签最大长度
pub const MAX_LABEL_LEN: usize = 63;

fn is_label_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

fn valid_label(label: &[u8]) -> bool {
    !label.is_empty()
        && label.len() <= MAX_LABEL_LEN
        && label[0] != b'-'
        && label[label.len() - 1] != b'-'
        && label.iter().all(|&b| is_label_byte(b))
}

/// 检查是否为合法主机名
///
/// 接受DNS风格的主机名（允许一个结尾的点）以及带方括号的IPv6字面量。
pub fn is_valid_hostname(hostname: &[u8]) -> bool {
    if hostname.is_empty() || hostname.len() > MAX_HOSTNAME_LEN {
        return false;
    }

    if hostname[0] == b'[' {
        return is_bracketed_ipv6(hostname);
    }

    let trimmed = hostname.strip_suffix(b".").unwrap_or(hostname);
    !trimmed.is_empty() && trimmed.split(|&b| b == b'.').all(valid_label)
}

fn is_bracketed_ipv6(hostname: &[u8]) -> bool {
    let inner = match hostname
        .strip_prefix(b"[")
        .and_then(|rest| rest.strip_suffix(b"]"))
    {
        Some(inner) => inner,
        None => return false,
    };

    std::str::from_utf8(inner)
        .ok()
        .and_then(|s| s.parse::<Ipv6Addr>().ok())
        .is_some()
}

/// 校验并规范化主机名
///
/// 规范化结果为ASCII小写，并去掉结尾的点。
pub fn normalize_hostname(hostname: &[u8]) -> Result<String> {
    if !is_valid_hostname(hostname) {
        return Err(DetectorError::InvalidHostname(
            String::from_utf8_lossy(hostname).into_owned(),
        ));
    }

    let trimmed = if hostname[0] == b'[' {
        hostname
    } else {
        hostname.strip_suffix(b".").unwrap_or(hostname)
    };

    // 校验通过后只剩ASCII字节
    let mut normalized = String::from_utf8_lossy(trimmed).into_owned();
    normalized.make_ascii_lowercase();
    Ok(normalized)
}
