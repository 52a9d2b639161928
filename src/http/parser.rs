use crate::http::headers::HeaderMap;
use crate::http::request::Method;

#[derive(Debug, PartialEq, Eq)]
pub enum ParseError {
    InvalidResponse,
    InvalidStatusLine,
    InvalidHeader,
    InvalidContentLength,
    InvalidChunk,
    Incomplete,
}

/// Status line and headers of a response, parsed before the body arrives.
#[derive(Debug)]
pub struct ResponseHead {
    pub status: u16,
    pub status_text: String,
    pub headers: HeaderMap,
}

/// How the remainder of the response body is framed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFraming {
    /// No body follows (HEAD, 1xx, 204, 304).
    None,
    /// Exactly this many bytes follow.
    ContentLength(usize),
    /// Chunked transfer coding; chunks are reassembled into one body.
    Chunked,
    /// The body runs until the peer closes the connection.
    UntilClose,
}

pub fn parse_response_head(buf: &[u8]) -> Result<(ResponseHead, usize), ParseError> {
    let headers_end = find_headers_end(buf).ok_or(ParseError::Incomplete)?;
    let head_bytes = &buf[..headers_end];

    let head_str = std::str::from_utf8(head_bytes).map_err(|_| ParseError::InvalidResponse)?;

    let mut lines = head_str.split("\r\n");

    // Status line: HTTP-version SP status-code SP reason-phrase
    let status_line = lines.next().ok_or(ParseError::InvalidResponse)?;
    let mut parts = status_line.splitn(3, ' ');

    let version = parts.next().ok_or(ParseError::InvalidStatusLine)?;
    if !version.starts_with("HTTP/") {
        return Err(ParseError::InvalidStatusLine);
    }

    let status: u16 = parts
        .next()
        .ok_or(ParseError::InvalidStatusLine)?
        .parse()
        .map_err(|_| ParseError::InvalidStatusLine)?;

    let status_text = parts.next().unwrap_or("").to_string();

    // Headers, preserving repeats and order
    let mut headers = HeaderMap::new();

    for line in lines {
        if line.is_empty() {
            continue;
        }

        let (key, value) = line.split_once(':').ok_or(ParseError::InvalidHeader)?;
        headers.add(key.trim(), value.trim());
    }

    let head = ResponseHead {
        status,
        status_text,
        headers,
    };

    Ok((head, headers_end + 4))
}

/// Decides how the body after `head` is framed.
pub fn body_framing(method: Method, head: &ResponseHead) -> Result<BodyFraming, ParseError> {
    if method == Method::HEAD
        || head.status == 204
        || head.status == 304
        || (100..200).contains(&head.status)
    {
        return Ok(BodyFraming::None);
    }

    if let Some(te) = head.headers.get("Transfer-Encoding") {
        if te
            .split(',')
            .any(|t| t.trim().eq_ignore_ascii_case("chunked"))
        {
            return Ok(BodyFraming::Chunked);
        }
    }

    if let Some(cl) = head.headers.get("Content-Length") {
        let len = cl
            .trim()
            .parse::<usize>()
            .map_err(|_| ParseError::InvalidContentLength)?;
        return Ok(BodyFraming::ContentLength(len));
    }

    Ok(BodyFraming::UntilClose)
}

/// Decodes a complete chunked body from `buf`.
///
/// Returns `Incomplete` until the terminating zero-size chunk (and its
/// trailer section) has arrived, then the reassembled body and the number
/// of bytes consumed.
pub fn decode_chunked(buf: &[u8]) -> Result<(Vec<u8>, usize), ParseError> {
    let mut body = Vec::new();
    let mut pos = 0;

    loop {
        let line_end = find_crlf(&buf[pos..]).ok_or(ParseError::Incomplete)? + pos;

        let size_line =
            std::str::from_utf8(&buf[pos..line_end]).map_err(|_| ParseError::InvalidChunk)?;
        let size_token = size_line.split(';').next().unwrap_or("").trim();
        let size =
            usize::from_str_radix(size_token, 16).map_err(|_| ParseError::InvalidChunk)?;

        let data_start = line_end + 2;

        if size == 0 {
            // Trailer section: zero or more header lines, then an empty line.
            let mut p = data_start;
            loop {
                let le = find_crlf(&buf[p..]).ok_or(ParseError::Incomplete)? + p;
                if le == p {
                    return Ok((body, le + 2));
                }
                p = le + 2;
            }
        }

        if buf.len() < data_start + size + 2 {
            return Err(ParseError::Incomplete);
        }

        body.extend_from_slice(&buf[data_start..data_start + size]);

        if &buf[data_start + size..data_start + size + 2] != b"\r\n" {
            return Err(ParseError::InvalidChunk);
        }

        pos = data_start + size + 2;
    }
}

fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}
