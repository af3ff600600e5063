//! Inbound request model.
//!
//! An [`InboundRequest`] is built once per connection by the transport.
//! Afterwards only header-prefix stripping touches it. Header names keep
//! their casing and order; repeated names are merged into one comma-joined
//! entry.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// HTTP verbs the gateway answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl Method {
    /// The on-the-wire token for this method.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request line named a verb outside [`Method`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported method: {0}")]
pub struct UnsupportedMethod(pub String);

impl FromStr for Method {
    type Err = UnsupportedMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Methods are case-sensitive tokens (RFC 9110 §9.1)
        match s {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "PATCH" => Ok(Self::Patch),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            other => Err(UnsupportedMethod(other.to_string())),
        }
    }
}

/// Ordered, case-preserving header list.
///
/// Appending a name that is already present (compared case-insensitively)
/// concatenates the new value onto the existing entry with `", "`. The entry
/// keeps the position and spelling of its first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderList {
    entries: Vec<(String, String)>,
}

impl HeaderList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a header, merging with an earlier entry of the same name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();

        if let Some((_, existing)) = self
            .entries
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            existing.push_str(", ");
            existing.push_str(&value);
        } else {
            self.entries.push((name, value));
        }
    }

    /// Look up a header value by case-insensitive name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Drop every header whose lowercased name starts with one of `prefixes`.
    ///
    /// Prefixes are compared case-insensitively. Empty prefixes are ignored.
    pub fn strip_prefixes<S: AsRef<str>>(&mut self, prefixes: &[S]) {
        let prefixes: Vec<String> = prefixes
            .iter()
            .map(|p| p.as_ref().trim().to_ascii_lowercase())
            .filter(|p| !p.is_empty())
            .collect();

        if prefixes.is_empty() {
            return;
        }

        self.entries.retain(|(name, _)| {
            let lower = name.to_ascii_lowercase();
            !prefixes.iter().any(|p| lower.starts_with(p.as_str()))
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for HeaderList {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut list = Self::new();
        for (name, value) in iter {
            list.append(name, value);
        }
        list
    }
}

/// A single HTTP request as handed over by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundRequest {
    pub method: Method,
    /// Request target exactly as received (path plus optional query).
    pub path: String,
    pub headers: HeaderList,
    pub body: Vec<u8>,
}

impl InboundRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderList::new(),
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Path without the query string.
    pub fn path_only(&self) -> &str {
        self.path
            .split_once('?')
            .map_or(self.path.as_str(), |(path, _)| path)
    }

    /// Whether this is a browser favicon probe.
    pub fn is_favicon(&self) -> bool {
        self.path_only() == "/favicon.ico"
    }
}
