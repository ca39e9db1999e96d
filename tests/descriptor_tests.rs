//! 协议描述符契约测试

use sni_detector::core::protocol::{PacketParser, ParseOutcome, ProtocolDescriptor};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn always_incomplete(_: &[u8]) -> ParseOutcome {
    ParseOutcome::Incomplete
}

#[test]
fn test_default_port_is_stable() {
    let descriptor = ProtocolDescriptor::new("tls-like", 443, always_incomplete);
    for _ in 0..16 {
        assert_eq!(descriptor.default_port(), 443);
    }
    assert_eq!(descriptor.parse_packet(b"\x16\x03"), ParseOutcome::Incomplete);
}

#[test]
fn test_parser_reference_is_stable() {
    let descriptor = ProtocolDescriptor::new("tls-like", 443, always_incomplete);
    let first = Arc::clone(descriptor.parser());
    for _ in 0..16 {
        assert!(Arc::ptr_eq(&first, descriptor.parser()));
    }

    let copy = descriptor.clone();
    assert!(Arc::ptr_eq(&first, copy.parser()));
    assert_eq!(copy.default_port(), 443);
}

/// 带内部计数的解析器
struct CountingParser {
    calls: AtomicUsize,
    hostname: &'static str,
}

impl PacketParser for CountingParser {
    fn parse_packet(&self, packet: &[u8]) -> ParseOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if packet.is_empty() {
            ParseOutcome::Incomplete
        } else {
            ParseOutcome::Parsed(self.hostname.to_string())
        }
    }
}

#[test]
fn test_independent_descriptors() {
    let a = Arc::new(CountingParser {
        calls: AtomicUsize::new(0),
        hostname: "a.example",
    });
    let b = Arc::new(CountingParser {
        calls: AtomicUsize::new(0),
        hostname: "b.example",
    });

    let first = ProtocolDescriptor::from_arc("a", 1000, a.clone());
    let second = ProtocolDescriptor::from_arc("b", 2000, b.clone());

    assert_eq!(first.parse_packet(b"x"), ParseOutcome::Parsed("a.example".into()));
    assert_eq!(first.parse_packet(b""), ParseOutcome::Incomplete);
    assert_eq!(second.parse_packet(b"y"), ParseOutcome::Parsed("b.example".into()));

    assert_eq!(a.calls.load(Ordering::SeqCst), 2);
    assert_eq!(b.calls.load(Ordering::SeqCst), 1);
    assert_eq!(first.default_port(), 1000);
    assert_eq!(second.default_port(), 2000);
}

#[test]
fn test_closure_parser_owns_its_state() {
    let suffix = String::from(".internal");
    let descriptor = ProtocolDescriptor::new("custom", 7000, move |packet: &[u8]| {
        match std::str::from_utf8(packet) {
            Ok(name) if !name.is_empty() => ParseOutcome::Parsed(format!("{}{}", name, suffix)),
            Ok(_) => ParseOutcome::Incomplete,
            Err(_) => ParseOutcome::NotThisProtocol,
        }
    });

    assert_eq!(descriptor.parse_packet(b"db"), ParseOutcome::Parsed("db.internal".into()));
    assert_eq!(descriptor.parse_packet(&[0xff, 0xfe]), ParseOutcome::NotThisProtocol);
    assert!(descriptor.matches_port(7000));
    assert_eq!(descriptor.to_string(), "custom/7000");
}

#[test]
fn test_abort_message() {
    let descriptor = ProtocolDescriptor::new("custom", 1, always_incomplete)
        .with_abort_message(&b"bye\r\n"[..]);
    assert_eq!(descriptor.abort_message().as_ref(), b"bye\r\n");
}
