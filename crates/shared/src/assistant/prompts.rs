use serde_json::{Map, Value};

use super::request::AssistantRequest;
use crate::llm::ChatMessage;

pub const DEFAULT_SYSTEM_PROMPT: &str = "Tu es l'assistant d'un annuaire d'outils d'intelligence artificielle. \
Tu aides des professionnels à choisir l'outil le plus adapté à leur besoin métier. \
Pour chaque recommandation, mets en avant la valeur business concrète : gain de temps, coût, \
retour sur investissement, facilité d'adoption par l'équipe et limites à connaître. \
Dès que tu évoques au moins deux outils, tu dois obligatoirement inclure un tableau comparatif \
en Markdown avec les colonnes Outil, Cas d'usage principal, Prix, Points forts et Points faibles. \
Termine par une action concrète que l'utilisateur peut entreprendre immédiatement. \
Réponds dans la langue de la question, de façon claire et structurée.";

pub fn effective_system_prompt(request: &AssistantRequest) -> &str {
    request
        .system_prompt
        .as_deref()
        .unwrap_or(DEFAULT_SYSTEM_PROMPT)
}

/// System prompt, then the surviving context turns in order, then the
/// question as the final user turn.
pub fn build_messages(request: &AssistantRequest) -> Vec<ChatMessage> {
    let mut system_prompt = effective_system_prompt(request).to_string();
    if let Some(hints) = caller_hints(request) {
        system_prompt.push_str("\n\nInformations fournies par l'utilisateur (JSON) : ");
        system_prompt.push_str(&hints);
    }

    let mut messages = Vec::with_capacity(request.context.len() + 2);
    messages.push(ChatMessage::system(system_prompt));
    messages.extend(request.context.iter().map(|turn| turn.to_chat_message()));
    messages.push(ChatMessage::user(request.question.clone()));
    messages
}

fn caller_hints(request: &AssistantRequest) -> Option<String> {
    let mut hints = Map::new();
    for (key, value) in [
        ("filters", &request.filters),
        ("userProfile", &request.user_profile),
        ("requestMetadata", &request.request_metadata),
    ] {
        if let Some(value) = value {
            hints.insert(key.to_string(), value.clone());
        }
    }

    if hints.is_empty() {
        None
    } else {
        Some(Value::Object(hints).to_string())
    }
}
