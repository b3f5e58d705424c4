use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const EMPTY_RESPONSE_PLACEHOLDER: &str =
    "Désolé, je n'ai pas pu générer de réponse. Pouvez-vous reformuler votre question ?";
pub const DEFAULT_REASONING: &str = "Analyse basée sur votre question et les outils du catalogue.";
pub const DEFAULT_ACTION_SUGGESTION: &str =
    "Comparez les outils proposés et testez leur version d'essai.";

/// Reply shape returned to callers. Every field is always populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantResponse {
    pub response: String,
    pub reformulated_question: String,
    pub primary_recommendation: Option<Value>,
    pub alternatives: Vec<Value>,
    pub reasoning: String,
    pub action_suggestion: String,
    pub follow_up_questions: Vec<String>,
    pub timestamp: String,
}

/// Builds a fully defaulted response from a raw reply. A string is taken as
/// the response text; an object contributes whichever fields it carries.
pub fn normalize_reply(raw: &Value, question: &str) -> AssistantResponse {
    let field = |name: &str| match raw {
        Value::Object(map) => map.get(name),
        _ => None,
    };
    let response_text = match raw {
        Value::String(text) => Some(text.as_str()),
        _ => field("response").and_then(Value::as_str),
    };

    AssistantResponse {
        response: non_blank(response_text).unwrap_or(EMPTY_RESPONSE_PLACEHOLDER).to_string(),
        reformulated_question: non_blank(field("reformulatedQuestion").and_then(Value::as_str))
            .unwrap_or(question)
            .to_string(),
        primary_recommendation: field("primaryRecommendation")
            .filter(|value| !value.is_null())
            .cloned(),
        alternatives: field("alternatives")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
        reasoning: non_blank(field("reasoning").and_then(Value::as_str))
            .unwrap_or(DEFAULT_REASONING)
            .to_string(),
        action_suggestion: non_blank(field("actionSuggestion").and_then(Value::as_str))
            .unwrap_or(DEFAULT_ACTION_SUGGESTION)
            .to_string(),
        follow_up_questions: field("followUpQuestions")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| non_blank(item.as_str()))
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        timestamp: field("timestamp")
            .and_then(Value::as_str)
            .filter(|raw| DateTime::parse_from_rfc3339(raw).is_ok())
            .map(ToString::to_string)
            .unwrap_or_else(now_timestamp),
    }
}

/// Interprets provider completion text. Models sometimes answer with the
/// structured shape itself (bare or inside a ```json fence); such an object
/// is kept so its fields survive normalization. Anything else is plain text.
pub fn parse_completion_text(text: &str) -> Value {
    let candidate = strip_code_fence(text.trim());
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) if map.get("response").is_some_and(Value::is_string) => {
            Value::Object(map)
        }
        _ => Value::String(text.to_string()),
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
