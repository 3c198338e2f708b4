//! Ordered, case-insensitive header multimap.
//!
//! Unlike `http::HeaderMap`, [`Headers`] keeps every header line exactly in the order and
//! spelling it was received, so a proxied message is re-serialized the way the peer sent it.
//! Lookups are case-insensitive and fold duplicated keys into one comma-joined value.

use std::fmt;

/// A single `key: value` header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    key: String,
    value: String,
}

impl Header {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    #[inline]
    fn is(&self, key: &str) -> bool {
        self.key.eq_ignore_ascii_case(key)
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.value)
    }
}

/// Ordered sequence of [`Header`]s with multi-value semantics.
///
/// Messages carry a handful of headers, so lookups are a linear scan over a `Vec`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<Header>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { entries: Vec::with_capacity(capacity) }
    }

    /// Returns all values of `key` joined with `", "`, or `None` when the key is absent.
    pub fn get(&self, key: &str) -> Option<String> {
        let mut matches = self.entries.iter().filter(|header| header.is(key));
        let first = matches.next()?;

        let mut value = first.value.clone();
        for header in matches {
            value.push_str(", ");
            value.push_str(&header.value);
        }
        Some(value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|header| header.is(key))
    }

    /// Overwrites the first `key` in place and removes every later duplicate,
    /// or appends a new header when `key` is absent.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter().position(|header| header.is(key)) {
            Some(index) => {
                self.entries[index].value = value;
                let mut position = 0;
                self.entries.retain(|header| {
                    let keep = position <= index || !header.is(key);
                    position += 1;
                    keep
                });
            }
            None => self.entries.push(Header::new(key, value)),
        }
    }

    /// Appends a header without touching existing ones.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push(Header::new(key, value));
    }

    /// Removes every header named `key`.
    pub fn delete(&mut self, key: &str) {
        self.entries.retain(|header| !header.is(key));
    }

    pub fn iter(&self) -> impl Iterator<Item = &Header> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when the final transfer coding is `chunked`.
    pub fn is_chunked(&self) -> bool {
        self.get("Transfer-Encoding")
            .and_then(|value| value.rsplit(',').next().map(|last| last.trim().eq_ignore_ascii_case("chunked")))
            .unwrap_or(false)
    }

    /// Switches the framing headers between chunked and fixed length.
    ///
    /// Fixed length writes a placeholder `Content-Length: 0`; the writer recomputes it from the
    /// body that is actually sent.
    pub fn set_chunked(&mut self, chunked: bool) {
        if chunked {
            self.set("Transfer-Encoding", "chunked");
            self.delete("Content-Length");
        } else {
            self.delete("Transfer-Encoding");
            self.set("Content-Length", "0");
        }
    }

    /// Applies the hop-by-hop rules for a message leaving this proxy.
    ///
    /// Every header named in `Connection` (other than `close`) is dropped, the connection is
    /// always advertised as `close`, and `Upgrade` never crosses the proxy. Trailers are not
    /// forwarded at all. Running it twice yields the same headers as running it once.
    pub fn normalize_hop_by_hop(&mut self) {
        if let Some(value) = self.get("Connection") {
            value
                .split(',')
                .map(str::trim)
                .filter(|token| !token.is_empty() && !token.eq_ignore_ascii_case("close"))
                .for_each(|token| self.delete(token));
        }
        self.set("Connection", "close");

        self.delete("Upgrade");
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = &'a Header;
    type IntoIter = std::slice::Iter<'a, Header>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self { entries: iter.into_iter().map(|(key, value)| Header::new(key, value)).collect() }
    }
}
