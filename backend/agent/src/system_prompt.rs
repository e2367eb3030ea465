//! System prompt builder.
//!
//! The prompt is the whole contract between free-text replies and plugin
//! dispatch: it lists the callable schemas and the exact reply shape the
//! interpreter in [`crate::response`] recognizes.

use clara_plugins::CallableSchema;

const PLACEHOLDER: &str = "${functionDefinitionsJSON}";

const TEMPLATE: &str = r#"You have access to the following plugins: ${functionDefinitionsJSON}
Follow these instructions when responding to user queries:
1. Evaluate the user's request to determine if it matches the capabilities of the available plugins.
2. If a suitable plugin is identified, respond strictly with a JSON object that specifies the selected plugin and its required input parameters, following the JSON schema specified at the plugin definition. Use exactly this shape and nothing else: {"plugin": "<plugin name>", "arguments": {...}}
3. Plugin results are returned to you as {"result": ...} or {"error": ...}. Use them to answer the user.
4. If no plugin is suitable, respond normally in natural language.
"#;

pub struct PromptBuilder;

impl PromptBuilder {
    /// Render the system prompt for the given schemas.
    pub fn build(schemas: &[CallableSchema]) -> String {
        let definitions = serde_json::to_string(schemas).unwrap_or_else(|_| "[]".to_string());
        TEMPLATE.replacen(PLACEHOLDER, &definitions, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn schema(name: &str) -> CallableSchema {
        CallableSchema {
            name: name.into(),
            description: format!("{name} plugin"),
            parameters: json!({ "type": "object", "properties": { "input": { "type": "string" } } }),
        }
    }

    #[test]
    fn test_schemas_embedded_as_json_array() {
        let prompt = PromptBuilder::build(&[schema("datetime"), schema("weather")]);
        assert!(!prompt.contains(PLACEHOLDER));

        let start = prompt.find('[').unwrap();
        let line_end = prompt[start..].find('\n').unwrap() + start;
        let embedded: Value = serde_json::from_str(&prompt[start..line_end]).unwrap();
        assert_eq!(embedded[0]["name"], "datetime");
        assert_eq!(embedded[1]["name"], "weather");
    }

    #[test]
    fn test_instructs_call_shape() {
        let prompt = PromptBuilder::build(&[]);
        assert!(prompt.contains("following plugins: []"));
        assert!(prompt.contains(r#"{"plugin": "<plugin name>", "arguments": {...}}"#));
    }

    #[test]
    fn test_build_is_deterministic() {
        let schemas = [schema("a"), schema("b")];
        assert_eq!(PromptBuilder::build(&schemas), PromptBuilder::build(&schemas));
    }
}
