//! Message composition for generation backends

use serde::Deserialize;
use serde::Serialize;

use super::GenerationRequest;

/// Marker the model is asked to answer after; echoed prompts are cut at it
pub const RESPONSE_CUE: &str = "Now provide your response:";

/// Returned instead of an empty offline answer
pub const EMPTY_RESPONSE_NOTICE: &str =
    "No response generated. Please try again or provide more context.";

/// Chat message in the role/content shape shared by Ollama and OpenAI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Offline framing: the system prompt travels as its own message
pub fn offline_messages(request: &GenerationRequest) -> Vec<ChatMessage> {
    let user_message = format!(
        "Context:\n{}\n\nQuestion:\n{}\n\nRequirements:\n{}\n\n{RESPONSE_CUE}",
        request.context, request.prompt, request.spl_prompt
    );
    vec![
        ChatMessage::system(request.sysprompt.clone()),
        ChatMessage::user(user_message),
    ]
}

/// Online framing: everything goes into one user message, requirements only when present
pub fn online_messages(request: &GenerationRequest) -> Vec<ChatMessage> {
    let mut message = format!(
        "{}\nContext:\n{}\nQuestion:\n{}\n",
        request.sysprompt, request.context, request.prompt
    );
    if !request.spl_prompt.is_empty() {
        message.push_str(&format!("Requirements:\n{}\n", request.spl_prompt));
    }
    message.push('\n');
    message.push_str(RESPONSE_CUE);
    vec![ChatMessage::user(message)]
}

/// Strip an echoed prompt from a model answer and trim it
pub fn clean_response(raw: &str) -> String {
    let answer = if raw.contains("---CONTEXT START---") || raw.contains("---QUESTION START---") {
        raw.split_once(RESPONSE_CUE).map_or(raw, |(_, tail)| tail)
    } else {
        raw
    };
    answer.trim().to_string()
}
