//! Shell-document emission.
//!
//! Documents are produced by explicit phase transitions — head, content,
//! bootstrap script, tail — rather than by scanning the rendered byte
//! stream for a closing-tag marker. The bootstrap state is embedded as an
//! inert JSON `<script>` block the client-side collaborator reads.

use serde_json::Value;

/// Element id of the embedded bootstrap script block.
pub const BOOTSTRAP_SCRIPT_ID: &str = "hermes-bootstrap";

/// Bootstrap key holding the requested URL.
pub const URL_KEY: &str = "url";

/// Bootstrap key holding prefetched loader data.
pub const PREFETCHED_DATA_KEY: &str = "prefetchedData";

/// Bootstrap key holding deferred loader data that resolved in time.
pub const DEFERRED_DATA_KEY: &str = "deferredData";

/// Bootstrap key listing loader keys still pending when the document was
/// emitted; the client collaborator fetches these itself.
pub const PENDING_DATA_KEY: &str = "pendingData";

/// Phase-structured HTML document builder.
///
/// # Example
///
/// ```
/// use hermes_ssr::shell::DocumentBuilder;
/// use serde_json::json;
///
/// let mut doc = DocumentBuilder::new("Dashboard");
/// doc.content("<main>hello</main>");
/// doc.bootstrap(&json!({"url": "/dash"}));
/// let html = doc.finish();
/// assert!(html.starts_with("<!DOCTYPE html>"));
/// assert!(html.ends_with("</body></html>"));
/// ```
#[derive(Debug)]
pub struct DocumentBuilder {
    buf: String,
}

impl DocumentBuilder {
    /// Starts a document, emitting the head phase.
    #[must_use]
    pub fn new(title: &str) -> Self {
        let mut buf = String::with_capacity(256);
        buf.push_str("<!DOCTYPE html><html><head><meta charset=\"utf-8\">");
        if !title.is_empty() {
            buf.push_str("<title>");
            buf.push_str(&escape_html(title));
            buf.push_str("</title>");
        }
        buf.push_str("</head><body>");
        Self { buf }
    }

    /// Emits rendered content into the body phase.
    pub fn content(&mut self, html: &str) {
        self.buf.push_str(html);
    }

    /// Emits the bootstrap script block.
    ///
    /// The payload is serialized with `<` escaped so the embedded JSON can
    /// never terminate the script element early, regardless of chunking.
    pub fn bootstrap(&mut self, payload: &Value) {
        let json = serde_json::to_string(payload).unwrap_or_else(|_| "null".to_string());
        self.buf.push_str("<script id=\"");
        self.buf.push_str(BOOTSTRAP_SCRIPT_ID);
        self.buf.push_str("\" type=\"application/json\">");
        self.buf.push_str(&json.replace('<', "\\u003c"));
        self.buf.push_str("</script>");
    }

    /// Emits the tail phase and returns the complete document.
    #[must_use]
    pub fn finish(mut self) -> String {
        self.buf.push_str("</body></html>");
        self.buf
    }
}

/// Builds the minimal error page used when rendering fails.
#[must_use]
pub fn error_page(status: http::StatusCode, message: &str) -> String {
    let mut doc = DocumentBuilder::new("Error");
    doc.content(&format!(
        "<h1>{}</h1><p>{}</p>",
        status.as_u16(),
        escape_html(message)
    ));
    doc.finish()
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_phases() {
        let mut doc = DocumentBuilder::new("Home");
        doc.content("<main data-marker=\"rendered\">hi</main>");
        doc.bootstrap(&json!({"url": "/"}));
        let html = doc.finish();

        assert!(html.contains("<title>Home</title>"));
        assert!(html.contains("data-marker=\"rendered\""));
        assert!(html.contains("id=\"hermes-bootstrap\""));
        assert!(html.contains(r#"{"url":"/"}"#));
        assert!(html.ends_with("</body></html>"));
    }

    #[test]
    fn test_bootstrap_json_cannot_close_the_script_element() {
        let mut doc = DocumentBuilder::new("");
        doc.bootstrap(&json!({"payload": "</script><script>alert(1)</script>"}));
        let html = doc.finish();

        assert!(!html.contains("</script><script>alert"));
        assert!(html.contains("\\u003c/script"));
    }

    #[test]
    fn test_empty_title_omitted() {
        let html = DocumentBuilder::new("").finish();
        assert!(!html.contains("<title>"));
    }

    #[test]
    fn test_title_escaped() {
        let html = DocumentBuilder::new("a < b & c").finish();
        assert!(html.contains("<title>a &lt; b &amp; c</title>"));
    }

    #[test]
    fn test_error_page() {
        let html = error_page(http::StatusCode::INTERNAL_SERVER_ERROR, "failed to render page");
        assert!(html.contains("<h1>500</h1>"));
        assert!(html.contains("failed to render page"));
    }
}
