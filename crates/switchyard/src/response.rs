//! HTTP response type.

use std::collections::HashMap;

/// An HTTP response as produced by handlers and middleware.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response headers. Lookups through [`Response::get_header`] ignore case.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Vec<u8>,
}

impl Response {
    /// Creates an empty response with the given status.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Creates an empty 200 response.
    pub fn ok() -> Self {
        Self::new(200)
    }

    /// Creates a 200 response with a plain text body.
    pub fn text(body: impl Into<String>) -> Self {
        Self::ok()
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body.into())
    }

    /// Creates a 200 response with a JSON body, or a 500 when `data` does
    /// not serialize.
    pub fn json<T: serde::Serialize>(data: &T) -> Self {
        serde_json::to_vec(data).map_or_else(
            |_| Self::new(500).body("Internal Server Error"),
            |body| Self::ok().header("Content-Type", "application/json").body(body),
        )
    }

    /// Sets a header, replacing any value stored under the same name.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        self.headers.retain(|name, _| !name.eq_ignore_ascii_case(&key));
        self.headers.insert(key, value.into());
        self
    }

    /// Appends a value to a header, space separated.
    ///
    /// Middleware use this to leave a trace on the way out, so the
    /// innermost layer's value comes first.
    #[must_use]
    pub fn append_header(self, key: &str, value: &str) -> Self {
        let combined = match self.get_header(key) {
            Some(existing) if !existing.is_empty() => format!("{existing} {value}"),
            _ => value.to_string(),
        };
        self.header(key, combined)
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Gets a header value.
    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    /// Returns the body as UTF-8 text.
    pub fn body_string(&self) -> Option<String> {
        String::from_utf8(self.body.clone()).ok()
    }
}
