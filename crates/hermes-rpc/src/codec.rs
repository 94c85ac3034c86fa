//! Wire decoding for server-function calls.
//!
//! The RPC endpoint is a fixed prefix followed by the function name as a
//! path segment (`/_rpc/<name>` by default). GET calls carry their input
//! JSON-encoded in the `input` query parameter; POST calls carry it as a
//! JSON body, URL-encoded form fields, or a multipart form whose file parts
//! are re-encoded as `{name, size, type, base64data}` objects. A legacy
//! call shape posts `{name, input}` to the bare prefix.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;
use hermes_core::RpcError;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Default RPC path prefix.
pub const DEFAULT_RPC_PREFIX: &str = "/_rpc";

/// Query parameter carrying JSON-encoded input on GET calls.
pub const INPUT_QUERY_PARAM: &str = "input";

/// Extracts the function name from an RPC path.
///
/// Returns `None` unless the path is exactly `prefix/<single-segment>`.
#[must_use]
pub fn function_name_from_path(prefix: &str, path: &str) -> Option<String> {
    let rest = path.strip_prefix(prefix)?.strip_prefix('/')?;
    if rest.is_empty() || rest.contains('/') {
        return None;
    }
    Some(rest.to_string())
}

/// Returns `true` if the path is the bare RPC prefix (legacy call shape).
#[must_use]
pub fn is_rpc_root(prefix: &str, path: &str) -> bool {
    path == prefix || path.strip_suffix('/') == Some(prefix)
}

/// Decodes GET-call input from the query string.
///
/// The `input` parameter holds JSON; a missing parameter (or query) decodes
/// as `null`, which suits zero-argument functions.
pub fn decode_query_input(query: Option<&str>) -> Result<Value, RpcError> {
    let Some(query) = query else {
        return Ok(Value::Null);
    };
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)
        .map_err(|e| RpcError::validation(format!("malformed query string: {e}")))?;
    match pairs.into_iter().find(|(key, _)| key == INPUT_QUERY_PARAM) {
        Some((_, raw)) => serde_json::from_str(&raw).map_err(RpcError::from),
        None => Ok(Value::Null),
    }
}

/// Decodes POST-call input from the request body.
///
/// Content type selects the decoder: URL-encoded forms become a string map,
/// multipart forms become a map with file parts re-encoded as base64
/// payload objects, and anything else is treated as JSON. An empty body
/// decodes as `null`.
pub async fn decode_body_input(
    content_type: Option<&str>,
    body: Bytes,
) -> Result<Value, RpcError> {
    if body.is_empty() {
        return Ok(Value::Null);
    }
    let essence = content_type
        .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase());
    match essence.as_deref() {
        Some("application/x-www-form-urlencoded") => decode_form(&body),
        Some(ct) if ct.starts_with("multipart/") => {
            decode_multipart(content_type.unwrap_or_default(), body).await
        }
        _ => serde_json::from_slice(&body).map_err(RpcError::from),
    }
}

fn decode_form(body: &[u8]) -> Result<Value, RpcError> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)
        .map_err(|e| RpcError::validation(format!("malformed form body: {e}")))?;
    let mut map = Map::new();
    for (key, value) in pairs {
        map.insert(key, Value::String(value));
    }
    Ok(Value::Object(map))
}

async fn decode_multipart(content_type: &str, body: Bytes) -> Result<Value, RpcError> {
    let boundary = multer::parse_boundary(content_type)
        .map_err(|e| RpcError::validation(format!("invalid multipart content type: {e}")))?;
    let stream = futures_util::stream::once(async move { Ok::<Bytes, std::io::Error>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut map = Map::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| RpcError::validation(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if let Some(file_name) = field.file_name().map(str::to_owned) {
            let content_type = field
                .content_type()
                .map_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string(), ToString::to_string);
            let data = field.bytes().await.map_err(|e| {
                RpcError::validation(format!("failed to read multipart file field: {e}"))
            })?;
            map.insert(
                name,
                serde_json::json!({
                    "name": file_name,
                    "size": data.len(),
                    "type": content_type,
                    "base64data": BASE64.encode(&data),
                }),
            );
        } else {
            let text = field.text().await.map_err(|e| {
                RpcError::validation(format!("failed to read multipart field: {e}"))
            })?;
            map.insert(name, Value::String(text));
        }
    }
    Ok(Value::Object(map))
}

/// Legacy call shape: `{name, input}` posted to the bare prefix.
#[derive(Debug, Deserialize)]
pub struct LegacyCall {
    /// Function name.
    pub name: String,
    /// Raw input for the function.
    #[serde(default)]
    pub input: Value,
}

/// Decodes a legacy `{name, input}` call from a JSON or form body.
///
/// Form-encoded legacy bodies carry `input` as a JSON string; it is decoded
/// here so the executor always sees structured input.
pub async fn decode_legacy_call(
    content_type: Option<&str>,
    body: Bytes,
) -> Result<LegacyCall, RpcError> {
    let value = decode_body_input(content_type, body).await?;
    let Value::Object(mut map) = value else {
        return Err(RpcError::validation("legacy call body must be an object"));
    };
    let name = map
        .remove("name")
        .and_then(|v| v.as_str().map(str::to_owned))
        .ok_or_else(|| RpcError::validation("legacy call body missing 'name'"))?;
    let input = match map.remove("input") {
        Some(Value::String(raw)) => {
            serde_json::from_str(&raw).unwrap_or(Value::String(raw))
        }
        Some(other) => other,
        None => Value::Null,
    };
    Ok(LegacyCall { name, input })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_function_name_from_path() {
        assert_eq!(
            function_name_from_path(DEFAULT_RPC_PREFIX, "/_rpc/echo"),
            Some("echo".to_string())
        );
        assert_eq!(function_name_from_path(DEFAULT_RPC_PREFIX, "/_rpc"), None);
        assert_eq!(function_name_from_path(DEFAULT_RPC_PREFIX, "/_rpc/"), None);
        assert_eq!(
            function_name_from_path(DEFAULT_RPC_PREFIX, "/_rpc/a/b"),
            None
        );
        assert_eq!(function_name_from_path(DEFAULT_RPC_PREFIX, "/pages"), None);
    }

    #[test]
    fn test_is_rpc_root() {
        assert!(is_rpc_root(DEFAULT_RPC_PREFIX, "/_rpc"));
        assert!(is_rpc_root(DEFAULT_RPC_PREFIX, "/_rpc/"));
        assert!(!is_rpc_root(DEFAULT_RPC_PREFIX, "/_rpc/echo"));
    }

    #[test]
    fn test_decode_query_input() {
        let value =
            decode_query_input(Some("input=%7B%22message%22%3A%22abc%22%7D")).unwrap();
        assert_eq!(value, json!({"message": "abc"}));
    }

    #[test]
    fn test_decode_query_input_missing() {
        assert_eq!(decode_query_input(None).unwrap(), Value::Null);
        assert_eq!(decode_query_input(Some("other=1")).unwrap(), Value::Null);
    }

    #[test]
    fn test_decode_query_input_malformed_json() {
        let err = decode_query_input(Some("input=%7Boops")).unwrap_err();
        assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_decode_json_body() {
        let body = Bytes::from(r#"{"n": 5}"#);
        let value = decode_body_input(Some("application/json"), body)
            .await
            .unwrap();
        assert_eq!(value, json!({"n": 5}));
    }

    #[tokio::test]
    async fn test_decode_body_defaults_to_json_without_content_type() {
        let body = Bytes::from(r#"[1, 2, 3]"#);
        let value = decode_body_input(None, body).await.unwrap();
        assert_eq!(value, json!([1, 2, 3]));
    }

    #[tokio::test]
    async fn test_decode_empty_body() {
        let value = decode_body_input(Some("application/json"), Bytes::new())
            .await
            .unwrap();
        assert_eq!(value, Value::Null);
    }

    #[tokio::test]
    async fn test_decode_form_body() {
        let body = Bytes::from("message=hello+world&count=3");
        let value = decode_body_input(Some("application/x-www-form-urlencoded"), body)
            .await
            .unwrap();
        assert_eq!(value, json!({"message": "hello world", "count": "3"}));
    }

    #[tokio::test]
    async fn test_decode_multipart_body_with_file() {
        let boundary = "X-HERMES-TEST";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"comment\"\r\n\r\n\
             a note\r\n\
             --{boundary}\r\n\
             Content-Disposition: form-data; name=\"upload\"; filename=\"a.bin\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n\
             abc\r\n\
             --{boundary}--\r\n"
        );
        let content_type = format!("multipart/form-data; boundary={boundary}");
        let value = decode_body_input(Some(&content_type), Bytes::from(body))
            .await
            .unwrap();

        assert_eq!(value["comment"], "a note");
        assert_eq!(value["upload"]["name"], "a.bin");
        assert_eq!(value["upload"]["size"], 3);
        assert_eq!(value["upload"]["type"], "application/octet-stream");
        assert_eq!(value["upload"]["base64data"], BASE64.encode(b"abc"));
    }

    #[tokio::test]
    async fn test_decode_legacy_call_json() {
        let body = Bytes::from(r#"{"name": "echo", "input": {"message": "hi"}}"#);
        let call = decode_legacy_call(Some("application/json"), body)
            .await
            .unwrap();
        assert_eq!(call.name, "echo");
        assert_eq!(call.input, json!({"message": "hi"}));
    }

    #[tokio::test]
    async fn test_decode_legacy_call_form_with_json_string_input() {
        let body = Bytes::from("name=echo&input=%7B%22message%22%3A%22hi%22%7D");
        let call = decode_legacy_call(Some("application/x-www-form-urlencoded"), body)
            .await
            .unwrap();
        assert_eq!(call.name, "echo");
        assert_eq!(call.input, json!({"message": "hi"}));
    }

    #[tokio::test]
    async fn test_decode_legacy_call_missing_name() {
        let body = Bytes::from(r#"{"input": 1}"#);
        let err = decode_legacy_call(Some("application/json"), body)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);
    }
}
