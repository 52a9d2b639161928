/// An HTTP cookie.
///
/// Outbound cookies serialize to the exact wire form
/// `name=value;Path=<p>;Domain=<d>` — the Path and Domain segments appear
/// only when set, and max-age/secure are carried on the type but never
/// serialized into the outbound header. Inbound cookies are parsed from
/// `Set-Cookie` headers with the full attribute set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub max_age: Option<i64>,
    pub secure: bool,
}

impl Cookie {
    pub fn new(
        path: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
        max_age: i64,
        secure: bool,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: Some(path.into()),
            domain: Some(domain.into()),
            max_age: Some(max_age),
            secure,
        }
    }

    /// A bare `name=value` cookie without attributes.
    pub fn named(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: None,
            domain: None,
            max_age: None,
            secure: false,
        }
    }

    /// Serializes to the outbound `Cookie` header form.
    pub fn to_wire(&self) -> String {
        let mut out = format!("{}={}", self.name, self.value);
        if let Some(path) = &self.path {
            out.push_str(";Path=");
            out.push_str(path);
        }
        if let Some(domain) = &self.domain {
            out.push_str(";Domain=");
            out.push_str(domain);
        }
        out
    }

    /// Parses a `Set-Cookie` header value.
    ///
    /// Returns `None` when the leading `name=value` pair is missing.
    pub fn parse_set_cookie(raw: &str) -> Option<Self> {
        let mut segments = raw.split(';').map(str::trim);

        let (name, value) = segments.next()?.split_once('=')?;
        if name.is_empty() {
            return None;
        }

        let mut cookie = Cookie::named(name, value);

        for segment in segments {
            match segment.split_once('=') {
                Some((k, v)) if k.eq_ignore_ascii_case("path") => {
                    cookie.path = Some(v.to_string());
                }
                Some((k, v)) if k.eq_ignore_ascii_case("domain") => {
                    cookie.domain = Some(v.to_string());
                }
                Some((k, v)) if k.eq_ignore_ascii_case("max-age") => {
                    cookie.max_age = v.parse().ok();
                }
                Some(_) => {}
                None => {
                    if segment.eq_ignore_ascii_case("secure") {
                        cookie.secure = true;
                    }
                }
            }
        }

        Some(cookie)
    }
}
