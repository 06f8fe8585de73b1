//! Jobs: what to run, before it is cut into batches
//!
//! Jobs come from three places: the trailing command-line tokens, a job
//! script (one job per line), and the standard job list of a named bot.

pub mod bot;
pub mod parser;
pub mod planner;
pub mod script;

pub use bot::{bot_jobs, BotName};
pub use parser::{parse, parse_line, Token};
pub use planner::BatchPlanner;
pub use script::JobScript;

/// Cases to run and the flags to run them with
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Job {
    /// Case identifiers
    pub sources: Vec<String>,

    /// Runner flags, in order
    pub flags: Vec<String>,
}

impl Job {
    pub fn new(sources: Vec<String>, flags: Vec<String>) -> Self {
        Self { sources, flags }
    }

    /// A job with no cases (blank or comment-only line)
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
