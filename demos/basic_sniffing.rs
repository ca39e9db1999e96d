//! 基础主机名嗅探示例
//!
//! 演示如何从TLS和HTTP首包中提取主机名，以及无法路由时取得中止消息

use sni_detector::utils::{LogLevel, LoggerConfigBuilder};
use sni_detector::{SniffBuffer, SniffState, SnifferBuilder};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    LoggerConfigBuilder::new().level(LogLevel::Debug).init()?;

    println!("🔍 SNI-Detector 基础嗅探示例");

    let sniffer = SnifferBuilder::new()
        .enable_tls()
        .enable_http()
        .with_max_buffer_size(4096)
        .build()?;

    let tls_hello: &[u8] = &[
        0x16, 0x03, 0x01, 0x00, 0x3f, // TLS记录头
        0x01, 0x00, 0x00, 0x3b, // 握手头
        0x03, 0x03, // 版本
        // 随机数 (32 字节)
        0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08,
        0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f, 0x10,
        0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18,
        0x19, 0x1a, 0x1b, 0x1c, 0x1d, 0x1e, 0x1f, 0x20,
        0x00, // 会话ID长度
        0x00, 0x02, 0x13, 0x01, // 密码套件
        0x01, 0x00, // 压缩方法
        0x00, 0x10, // 扩展总长度
        0x00, 0x00, 0x00, 0x0c, // server_name扩展
        0x00, 0x0a, 0x00, 0x00, 0x07, // 名称列表
        b'e', b'x', b'.', b't', b'e', b's', b't',
    ];

    let test_cases: Vec<(&str, &[u8])> = vec![
        ("TLS ClientHello", tls_hello),
        (
            "HTTP/1.1 请求",
            b"GET / HTTP/1.1\r\nHost: Example.com:8080\r\n\r\n",
        ),
        ("未知协议", &[0x00, 0x01, 0x02, 0x03]),
    ];

    for (name, data) in test_cases {
        println!("\n📦 测试: {}", name);
        match sniffer.sniff(data) {
            Ok(result) => println!(
                "   ✅ {} -> {} ({:?})",
                result.protocol, result.hostname, result.detection_time
            ),
            Err(e) => println!("   ❌ {}", e),
        }
    }

    // 数据分多次到达
    println!("\n📦 测试: 分段到达的HTTP请求");
    let mut buffer = SniffBuffer::for_sniffer(&sniffer);
    for chunk in [&b"GET /index.html HT"[..], b"TP/1.1\r\nHost: ", b"demo.test\r\n\r\n"] {
        buffer.extend(chunk)?;
        match buffer.poll(&sniffer) {
            SniffState::Pending => println!("   ⏳ 已缓冲 {} 字节，继续读取", buffer.len()),
            SniffState::Ready(result) => {
                println!("   ✅ {} -> {}", result.protocol, result.hostname)
            }
            SniffState::Failed(e) => {
                let abort = sniffer
                    .abort_message_for("http")
                    .map_or(0, |message| message.len());
                println!("   ❌ {}，中止消息 {} 字节", e, abort);
            }
        }
    }

    let stats = sniffer.stats();
    println!(
        "\n📊 共 {} 次嗅探，成功率 {:.1}%",
        stats.total_detections,
        stats.success_rate() * 100.0
    );

    Ok(())
}
