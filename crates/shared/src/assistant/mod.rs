//! Question answering for the tool-recommendation chat assistant.
//!
//! A question is answered by the configured chat-completions provider when
//! one is available; otherwise, or when that call fails, the original request
//! is forwarded once to the secondary backend.

pub mod error;
pub mod gateway;
pub mod prompts;
pub mod request;
pub mod response;

pub use error::AssistantError;
pub use gateway::{AnswerSource, AskOutcome, AssistantGateway};
pub use prompts::{DEFAULT_SYSTEM_PROMPT, build_messages};
pub use request::{AssistantRequest, ConversationTurn, RequestValidationError, TurnRole};
pub use response::{AssistantResponse, normalize_reply, parse_completion_text};
