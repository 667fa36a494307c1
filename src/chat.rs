pub mod client;
pub mod context;
pub mod engine;

pub use context::{ChatTurn, MessageRole};
pub use engine::{CompletionGateway, ErrorCategory, GenerateOptions, Generation, GenerationFailure};
