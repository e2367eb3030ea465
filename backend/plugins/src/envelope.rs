//! Plugin response envelope: the only form in which plugin output re-enters
//! the conversation.

use serde::{Deserialize, Serialize};

/// Exactly one of `{"result": ...}` or `{"error": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginResponse {
    Result(String),
    Error(String),
}

impl PluginResponse {
    pub fn is_error(&self) -> bool {
        matches!(self, PluginResponse::Error(_))
    }

    /// JSON text appended to the transcript.
    pub fn to_json(&self) -> String {
        let value = match self {
            PluginResponse::Result(text) => serde_json::json!({ "result": text }),
            PluginResponse::Error(text) => serde_json::json!({ "error": text }),
        };
        value.to_string()
    }
}

impl<E: std::fmt::Display> From<Result<String, E>> for PluginResponse {
    fn from(outcome: Result<String, E>) -> Self {
        match outcome {
            Ok(result) => PluginResponse::Result(result),
            Err(e) => PluginResponse::Error(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn keys(json: &str) -> Vec<String> {
        let value: Value = serde_json::from_str(json).unwrap();
        value.as_object().unwrap().keys().cloned().collect()
    }

    #[test]
    fn test_envelope_has_exactly_one_key() {
        let ok = PluginResponse::Result(String::new()).to_json();
        assert_eq!(keys(&ok), vec!["result"]);

        let err = PluginResponse::Error("boom \"quoted\"\n".into()).to_json();
        assert_eq!(keys(&err), vec!["error"]);
    }

    #[test]
    fn test_envelope_matches_serde_shape() {
        let resp = PluginResponse::Result("2024-01-01T00:00:00Z".into());
        let via_serde = serde_json::to_string(&resp).unwrap();
        assert_eq!(via_serde, resp.to_json());

        let back: PluginResponse = serde_json::from_str(r#"{"error":"nope"}"#).unwrap();
        assert_eq!(back, PluginResponse::Error("nope".into()));
    }

    #[test]
    fn test_from_result() {
        let failed: Result<String, String> = Err("bad input".into());
        assert!(PluginResponse::from(failed).is_error());
    }
}
