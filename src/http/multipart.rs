use rand::Rng;
use rand::distr::Alphanumeric;

/// One part of a `multipart/form-data` body. Parts are sent in the order
/// they were added to the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    /// A text field.
    Text { name: String, value: String },
    /// A binary field with an optional filename and content type.
    Bytes {
        name: String,
        filename: Option<String>,
        content_type: Option<String>,
        data: Vec<u8>,
    },
}

impl Part {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Part::Text {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn bytes(
        name: impl Into<String>,
        filename: Option<String>,
        content_type: Option<String>,
        data: Vec<u8>,
    ) -> Self {
        Part::Bytes {
            name: name.into(),
            filename,
            content_type,
            data,
        }
    }

    fn content(&self) -> &[u8] {
        match self {
            Part::Text { value, .. } => value.as_bytes(),
            Part::Bytes { data, .. } => data,
        }
    }
}

/// Generates a boundary token that does not occur in any part's content.
pub fn generate_boundary(parts: &[Part]) -> String {
    loop {
        let candidate: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(24)
            .map(char::from)
            .collect();
        let token = format!("courier{}", candidate);

        let collides = parts.iter().any(|p| {
            p.content()
                .windows(token.len())
                .any(|w| w == token.as_bytes())
        });
        if !collides {
            return token;
        }
    }
}

/// Encodes the parts into a `multipart/form-data` body. The body begins
/// with `--<boundary>` and ends with the closing `--<boundary>--` marker.
pub fn encode(parts: &[Part], boundary: &str) -> Vec<u8> {
    let mut buf = Vec::new();

    for part in parts {
        buf.extend_from_slice(b"--");
        buf.extend_from_slice(boundary.as_bytes());
        buf.extend_from_slice(b"\r\n");

        match part {
            Part::Text { name, value } => {
                buf.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n", name).as_bytes(),
                );
                buf.extend_from_slice(b"\r\n");
                buf.extend_from_slice(value.as_bytes());
            }
            Part::Bytes {
                name,
                filename,
                content_type,
                data,
            } => {
                let mut disposition =
                    format!("Content-Disposition: form-data; name=\"{}\"", name);
                if let Some(filename) = filename {
                    disposition.push_str(&format!("; filename=\"{}\"", filename));
                }
                disposition.push_str("\r\n");
                buf.extend_from_slice(disposition.as_bytes());

                if let Some(ct) = content_type {
                    buf.extend_from_slice(format!("Content-Type: {}\r\n", ct).as_bytes());
                }
                buf.extend_from_slice(b"\r\n");
                buf.extend_from_slice(data);
            }
        }

        buf.extend_from_slice(b"\r\n");
    }

    buf.extend_from_slice(b"--");
    buf.extend_from_slice(boundary.as_bytes());
    buf.extend_from_slice(b"--\r\n");

    buf
}
