//! TCP transport layer.
//!
//! This module provides the low-level connection handling: dialing under a
//! deadline, byte and line reads bounded by that deadline, and immediate
//! writes.

mod tcp;

pub use tcp::{Connection, LineEnding};
