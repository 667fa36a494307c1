mod categorize;
mod gateway;
mod outcome;
mod retry;

pub use categorize::{GENERIC_FAILURE_MESSAGE, categorize};
pub use gateway::{CompletionGateway, GenerateOptions};
pub use outcome::{ErrorCategory, Generation, GenerationFailure, GenerationResult};
pub use retry::{AttemptState, Clock, MAX_ATTEMPTS, RetryOutcome, RetryPolicy, TokioClock};
