use ragloop_core::{RagloopError, RagloopResult};
use serde_json::Value;

/// A required, non-blank string argument, trimmed.
pub(crate) fn required_str(args: &Value, key: &str) -> RagloopResult<String> {
    match args.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::String(_)) | Some(Value::Null) | None => {
            Err(RagloopError::InvalidArguments(format!("{key} is required")))
        }
        Some(other) => Err(RagloopError::InvalidArguments(format!(
            "{key} must be a string, got {other}"
        ))),
    }
}

/// An optional list of strings. Missing or null yields an empty list.
pub(crate) fn string_list(args: &Value, key: &str) -> RagloopResult<Vec<String>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    RagloopError::InvalidArguments(format!("{key} must contain only strings"))
                })
            })
            .collect(),
        Some(_) => Err(RagloopError::InvalidArguments(format!(
            "{key} must be an array of strings"
        ))),
    }
}

/// An optional integer. Missing or null yields `None`; floats are truncated.
pub(crate) fn optional_int(args: &Value, key: &str) -> RagloopResult<Option<i64>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))),
        Some(_) => Err(RagloopError::InvalidArguments(format!(
            "{key} must be an integer"
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_str() {
        let args = json!({"q": "  docker ", "blank": " ", "num": 3});
        assert_eq!(required_str(&args, "q").unwrap(), "docker");
        assert!(required_str(&args, "blank").is_err());
        assert!(required_str(&args, "missing").is_err());
        assert!(required_str(&args, "num").unwrap_err().to_string().contains("string"));
    }

    #[test]
    fn test_string_list_and_int() {
        let args = json!({"ids": ["a", "b"], "bad": [1], "n": 2.9, "s": "x"});
        assert_eq!(string_list(&args, "ids").unwrap(), vec!["a", "b"]);
        assert!(string_list(&args, "absent").unwrap().is_empty());
        assert!(string_list(&args, "bad").is_err());
        assert_eq!(optional_int(&args, "n").unwrap(), Some(2));
        assert_eq!(optional_int(&args, "absent").unwrap(), None);
        assert!(optional_int(&args, "s").is_err());
    }
}
