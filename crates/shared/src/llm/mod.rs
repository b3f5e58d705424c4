pub mod gateway;
pub mod openrouter;

pub use gateway::{
    ChatCompletion, ChatCompletionRequest, ChatMessage, ChatRole, LlmGateway, LlmGatewayError,
    LlmGatewayFuture, LlmTokenUsage,
};
pub use openrouter::{OpenRouterConfigError, OpenRouterGateway};
