mod history;
mod message;

pub use history::normalize_history;
pub use message::{ChatTurn, MessageRole};
