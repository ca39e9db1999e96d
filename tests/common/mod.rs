//! 集成测试共用的报文构造函数

#![allow(dead_code)]

/// 构造一条TLS ClientHello记录，可选携带SNI
pub fn client_hello(server_name: Option<&str>) -> Vec<u8> {
    let mut extensions = Vec::new();
    // supported_groups
    extensions.extend_from_slice(&[0x00, 0x0a, 0x00, 0x04, 0x00, 0x02, 0x00, 0x17]);
    if let Some(name) = server_name {
        let name = name.as_bytes();
        let list_len = 3 + name.len();
        extensions.extend_from_slice(&[0x00, 0x00]);
        extensions.extend_from_slice(&((2 + list_len) as u16).to_be_bytes());
        extensions.extend_from_slice(&(list_len as u16).to_be_bytes());
        extensions.push(0x00);
        extensions.extend_from_slice(&(name.len() as u16).to_be_bytes());
        extensions.extend_from_slice(name);
    }
    // ALPN: h2
    extensions.extend_from_slice(&[0x00, 0x10, 0x00, 0x05, 0x00, 0x03, 0x02, b'h', b'2']);

    let mut body = vec![0x03, 0x03];
    body.extend_from_slice(&[0x42; 32]);
    body.push(0x20);
    body.extend_from_slice(&[0x07; 32]);
    body.extend_from_slice(&[0x00, 0x04, 0x13, 0x01, 0x13, 0x02]);
    body.extend_from_slice(&[0x01, 0x00]);
    body.extend_from_slice(&(extensions.len() as u16).to_be_bytes());
    body.extend_from_slice(&extensions);

    let mut handshake = vec![0x01];
    handshake.extend_from_slice(&(body.len() as u32).to_be_bytes()[1..]);
    handshake.extend_from_slice(&body);

    let mut record = vec![0x16, 0x03, 0x01];
    record.extend_from_slice(&(handshake.len() as u16).to_be_bytes());
    record.extend_from_slice(&handshake);
    record
}

/// 构造一个带Host头的HTTP/1.1请求
pub fn http_request(host: &str) -> Vec<u8> {
    format!(
        "GET /index.html HTTP/1.1\r\nUser-Agent: test\r\nHost: {}\r\nAccept: */*\r\n\r\n",
        host
    )
    .into_bytes()
}
