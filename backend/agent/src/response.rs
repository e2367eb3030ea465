//! Reply interpretation: final answer or plugin call.
//!
//! Classification is structural. A reply is a call when it parses as a JSON
//! object naming a plugin; a reply that carries the `{"plugin":` marker but
//! does not parse is a protocol fault; anything else is a final answer.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::DispatchError;

static CALL_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\{\s*"plugin"\s*:"#).expect("call marker pattern is valid"));

/// A plugin call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionCall {
    #[serde(rename = "plugin")]
    pub name: String,
    pub arguments: Map<String, Value>,
}

impl FunctionCall {
    /// Arguments as the JSON object text handed to the plugin.
    pub fn arguments_json(&self) -> String {
        Value::Object(self.arguments.clone()).to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Interpretation {
    FinalAnswer(String),
    FunctionCall(FunctionCall),
}

/// Classify one model reply.
pub fn interpret(reply: &str) -> Result<Interpretation, DispatchError> {
    let candidate = strip_code_fence(reply.trim());
    if let Ok(call) = parse_call(candidate) {
        return Ok(Interpretation::FunctionCall(call));
    }

    if CALL_MARKER.is_match(reply) {
        // Tolerate prose around the object, e.g. "Sure! {\"plugin\": ...}".
        let embedded = match (reply.find('{'), reply.rfind('}')) {
            (Some(start), Some(end)) if start < end => &reply[start..=end],
            _ => reply,
        };
        return parse_call(embedded)
            .map(Interpretation::FunctionCall)
            .map_err(|reason| DispatchError::MalformedCall { reason });
    }

    Ok(Interpretation::FinalAnswer(reply.to_string()))
}

fn parse_call(text: &str) -> Result<FunctionCall, String> {
    let value: Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
    let Value::Object(mut object) = value else {
        return Err("call is not a JSON object".into());
    };

    // `plugin` is the advertised field; `{"name", "arguments"}` is accepted
    // only when `arguments` is present, so ordinary JSON answers with a
    // `name` field are not mistaken for calls.
    let has_arguments = object.contains_key("arguments");
    let name = match (object.remove("plugin"), has_arguments) {
        (Some(Value::String(name)), _) => name,
        (Some(_), _) => return Err("'plugin' must be a string".into()),
        (None, true) => match object.remove("name") {
            Some(Value::String(name)) => name,
            _ => return Err("missing plugin name".into()),
        },
        (None, false) => return Err("missing plugin name".into()),
    };
    if name.trim().is_empty() {
        return Err("plugin name is empty".into());
    }

    let arguments = match object.remove("arguments") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        // Some models double-encode the arguments object.
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => map,
            _ => return Err("'arguments' must be a JSON object".into()),
        },
        Some(_) => return Err("'arguments' must be a JSON object".into()),
    };

    Ok(FunctionCall { name, arguments })
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
