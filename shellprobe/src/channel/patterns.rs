//! Prompt targets and matching.

use memchr::memmem;

/// Login prompt, matched without its first letter so both `Login:` and
/// `login:` hit.
pub const LOGIN_PROMPT: &str = "ogin:";

/// Password prompt, matched without its first letter.
pub const PASSWORD_PROMPT: &str = "assword:";

/// Shell prompt markers for regular and root shells.
pub const SHELL_PROMPTS: [&str; 2] = ["$ ", "# "];

/// Login marker looked for in line mode.
pub const LOGIN_LINE: &str = "login:";

/// Password marker looked for in line mode.
pub const PASSWORD_LINE: &str = "Password:";

/// Trait for prompt matching.
pub trait PromptMatcher: Send + Sync {
    /// Returns byte offset where the match ends, or None if no match.
    fn find_match(&self, data: &[u8]) -> Option<usize>;

    /// Check if the data matches.
    fn is_match(&self, data: &[u8]) -> bool {
        self.find_match(data).is_some()
    }
}

/// An ordered set of literal prompt targets.
///
/// Data matches if it contains any target. When several are present the
/// first one in list order is reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompts {
    targets: Vec<String>,
}

impl Prompts {
    /// Create a target set. An empty set never matches.
    pub fn new<I, T>(targets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
        }
    }

    /// The shell prompt markers.
    pub fn shell() -> Self {
        Self::new(SHELL_PROMPTS)
    }

    /// The targets in order.
    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    /// Length of the longest target in bytes.
    pub fn longest(&self) -> usize {
        self.targets.iter().map(String::len).max().unwrap_or(0)
    }

    /// The first target contained in `data`, in list order.
    pub fn find_target(&self, data: &[u8]) -> Option<&str> {
        self.targets
            .iter()
            .find(|t| memmem::find(data, t.as_bytes()).is_some())
            .map(String::as_str)
    }
}

impl PromptMatcher for Prompts {
    fn find_match(&self, data: &[u8]) -> Option<usize> {
        self.targets
            .iter()
            .find_map(|t| memmem::find(data, t.as_bytes()).map(|start| start + t.len()))
    }
}

impl PromptMatcher for str {
    fn find_match(&self, data: &[u8]) -> Option<usize> {
        memmem::find(data, self.as_bytes()).map(|start| start + self.len())
    }
}
