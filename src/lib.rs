//! Backend for a Socratic tutoring chat: forwards conversation turns to a
//! generative-language provider, retrying rate limits and translating the
//! provider's errors into stable categories.

pub mod chat;
pub mod config;
pub mod server;
pub mod utils;
