use std::collections::HashMap;
use std::str;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Headers {
    headers: HashMap<String, String>
}

impl Headers {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

/// A retrieval request with its path already decoded.
#[derive(Debug, PartialEq, Eq)]
pub struct Request {
    pub path: String,
    pub headers: Headers
}

#[derive(Debug, PartialEq, Eq)]
pub enum BadRequest {
    Malformed,
    UnsupportedMethod(String)
}

/// Parses whatever a single read captured from the connection.
///
/// Only the request line must be complete; header lines after it are kept when
/// they look like `Name: value` and otherwise ignored.
pub fn parse_request(raw: &[u8], default_document: &str) -> Result<Request, BadRequest> {
    let line_end = find_crlf(raw).ok_or(BadRequest::Malformed)?;
    let line = str::from_utf8(&raw[..line_end]).map_err(|_| BadRequest::Malformed)?;
    let (method, target) = parse_request_line(line)?;

    if method != "GET" {
        return Err(BadRequest::UnsupportedMethod(method.to_string()));
    }

    let path = match target.find('?') {
        Some(index) => &target[..index],
        None => target
    };
    let path = if path.is_empty() || path == "/" {
        format!("/{}", default_document)
    } else {
        percent_decode(path)
    };

    Ok(Request {
        path,
        headers: parse_headers(&raw[line_end + 2..])
    })
}

fn find_crlf(raw: &[u8]) -> Option<usize> {
    raw.windows(2).position(|pair| pair == b"\r\n")
}

fn parse_request_line(line: &str) -> Result<(&str, &str), BadRequest> {
    let mut parts = line.splitn(3, ' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(method), Some(target), Some(_version)) if !method.is_empty() => Ok((method, target)),
        _ => Err(BadRequest::Malformed)
    }
}

fn parse_headers(raw: &[u8]) -> Headers {
    let mut headers = HashMap::new();
    let text = String::from_utf8_lossy(raw);
    for line in text.split("\r\n") {
        if line.is_empty() {
            break;
        }
        if let Some(index) = line.find(':') {
            let (name, value) = line.split_at(index);
            headers.insert(name.trim().to_string(), value[1..].trim().to_string());
        }
    }
    Headers { headers }
}

/// Decodes `%XX` escapes and `+`. Escapes that are not two hex digits are kept
/// as-is, and the output is never decoded a second time.
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() && is_hex_pair(bytes[i + 1], bytes[i + 2]) => {
                out.push(hex_value(bytes[i + 1]) << 4 | hex_value(bytes[i + 2]));
                i += 3;
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    match String::from_utf8(out) {
        Ok(decoded) => decoded,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned()
    }
}

fn is_hex_pair(high: u8, low: u8) -> bool {
    high.is_ascii_hexdigit() && low.is_ascii_hexdigit()
}

fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => digit - b'A' + 10
    }
}
