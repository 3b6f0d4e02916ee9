//! Channel layer for option filtering and prompt matching.
//!
//! This module turns the raw byte stream of a connection into prompt-level
//! waits: control sequences are filtered out and answered, and the remaining
//! text is accumulated until one of the awaited prompts shows up.

mod buffer;
pub mod negotiation;
mod patterns;
mod reader;

pub use buffer::PromptBuffer;
pub use negotiation::{Filtered, NegotiationState, OptionRefuser, StreamFilter};
pub use patterns::{
    LOGIN_LINE, LOGIN_PROMPT, PASSWORD_LINE, PASSWORD_PROMPT, PromptMatcher, Prompts,
    SHELL_PROMPTS,
};
pub use reader::PromptReader;
