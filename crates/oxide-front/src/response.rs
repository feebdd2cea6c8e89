//! Outbound response abstraction.

use std::collections::HashMap;

/// Content type used for textual handler results.
pub const TEXT_PLAIN_UTF8: &str = "text/plain;charset=UTF-8";

/// An HTTP response under construction.
///
/// Handlers that take `&mut Response` may write to it directly. Once the
/// response is committed the dispatcher no longer interprets the handler's
/// return value.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Vec<u8>,
    committed: bool,
}

impl Response {
    /// Creates a new response with the given status.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
            committed: false,
        }
    }

    /// Creates a 200 OK response.
    pub fn ok() -> Self {
        Self::new(200)
    }

    /// Creates a response with plain text content.
    pub fn text(body: impl Into<String>) -> Self {
        let mut res = Self::ok();
        res.set_content_type(TEXT_PLAIN_UTF8);
        res.write(&body.into());
        res
    }

    /// Sets a header.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(key, value);
        self
    }

    /// Sets the status code.
    #[must_use]
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a header in place.
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(key.into(), value.into());
    }

    /// Sets the `Content-Type` header.
    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.set_header("Content-Type", content_type);
    }

    /// Gets a header value, case-insensitively.
    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Appends text to the body.
    pub fn write(&mut self, text: &str) {
        self.body.extend_from_slice(text.as_bytes());
    }

    /// Appends raw bytes to the body.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
    }

    /// Marks the response as complete.
    pub fn commit(&mut self) {
        self.committed = true;
    }

    /// Returns whether the response has been committed.
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Turns the response into a 302 redirect and commits it.
    pub fn send_redirect(&mut self, location: impl Into<String>) {
        self.status = 302;
        self.body.clear();
        self.set_header("Location", location);
        self.commit();
    }

    /// Replaces the response with an error page and commits it.
    pub fn send_error(&mut self, status: u16, message: impl Into<String>) {
        self.status = status;
        self.body.clear();
        self.set_content_type(TEXT_PLAIN_UTF8);
        self.write(&message.into());
        self.commit();
    }

    /// Returns the body as a string.
    pub fn body_string(&self) -> Option<String> {
        String::from_utf8(self.body.clone()).ok()
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::ok()
    }
}
