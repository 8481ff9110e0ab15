//! Field extraction from fetched objects
//!
//! Path queries may be written kubectl-style (`{.data.config}`,
//! `.data.tls\.crt`, `.items[0].name`) or as RFC 9535 JSONPath (`$.data['tls.crt']`).
//! kubectl-style queries are normalized to JSONPath before evaluation.

use serde_json::Value;
use serde_json_path::JsonPath;
use thiserror::Error;

/// Why a query produced no bytes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("invalid path query: {0}")]
    Parse(String),

    #[error("path query matched nothing")]
    NoMatch,
}

/// Convert a kubectl-style query to JSONPath; JSONPath input is returned as-is
pub fn normalize(query: &str) -> String {
    let mut body = query.trim();
    if let Some(inner) = body.strip_prefix('{').and_then(|b| b.strip_suffix('}')) {
        body = inner.trim();
    }
    if body.starts_with('$') {
        return body.to_string();
    }

    let mut out = String::from("$");
    let mut segment = String::new();
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    segment.push(escaped);
                }
            }
            '.' => push_segment(&mut out, &mut segment),
            '[' => {
                push_segment(&mut out, &mut segment);
                out.push('[');
                for n in chars.by_ref() {
                    out.push(n);
                    if n == ']' {
                        break;
                    }
                }
            }
            _ => segment.push(c),
        }
    }
    push_segment(&mut out, &mut segment);
    out
}

fn push_segment(out: &mut String, segment: &mut String) {
    if segment.is_empty() {
        return;
    }
    if segment == "*" {
        out.push_str("[*]");
    } else {
        out.push_str("['");
        for c in segment.chars() {
            if c == '\'' || c == '\\' {
                out.push('\\');
            }
            out.push(c);
        }
        out.push_str("']");
    }
    segment.clear();
}

/// True when a normalized query addresses the `data` map of an object
pub fn targets_data_map(normalized: &str) -> bool {
    normalized == "$['data']"
        || normalized.starts_with("$['data'][")
        || normalized == "$.data"
        || normalized.starts_with("$.data.")
        || normalized.starts_with("$.data[")
}

/// Run a (normalized) query and render the match as bytes
///
/// One node: strings as their bytes, other scalars as their textual form,
/// containers as compact JSON. Several nodes: a compact JSON array.
pub fn extract(document: &Value, normalized: &str) -> Result<Vec<u8>, QueryError> {
    let path = JsonPath::parse(normalized).map_err(|e| QueryError::Parse(e.to_string()))?;
    let nodes = path.query(document).all();
    match nodes.as_slice() {
        [] => Err(QueryError::NoMatch),
        [node] => Ok(value_bytes(node)),
        many => Ok(Value::Array(many.iter().map(|v| (*v).clone()).collect())
            .to_string()
            .into_bytes()),
    }
}

fn value_bytes(value: &Value) -> Vec<u8> {
    match value {
        Value::String(s) => s.as_bytes().to_vec(),
        other => other.to_string().into_bytes(),
    }
}
