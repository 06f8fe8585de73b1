//! Job line parsing
//!
//! A job line is a whitespace-separated list of tokens, e.g.
//! `gms b=cpu ct=8888 # software raster`. Each token is one of:
//!
//! - a comment marker (`#...`) which ends the line,
//! - a group name (`gm`, `gms`, `test`, `tests`) expanding to every case in
//!   that group,
//! - a `key=value` flag, passed to the runner as `-k value` or `--key value`,
//! - anything else: a literal case identifier.

use super::Job;
use crate::runner::{CaseGroup, Inventory};

/// One classified job token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Starts with `#`: the rest of the line is ignored
    Comment,
    /// A named group of cases
    Group(CaseGroup),
    /// A runner flag and its value
    Flag { name: String, value: &'a str },
    /// A single case identifier
    Literal(&'a str),
}

impl<'a> Token<'a> {
    pub fn classify(token: &'a str) -> Self {
        if token.starts_with('#') {
            return Token::Comment;
        }

        if let Some(group) = CaseGroup::from_token(token) {
            return Token::Group(group);
        }

        let mut parts = token.split('=');
        if let (Some(key), Some(value), None) = (parts.next(), parts.next(), parts.next()) {
            let dashes = if key.len() > 1 { "--" } else { "-" };
            return Token::Flag {
                name: format!("{}{}", dashes, key),
                value,
            };
        }

        Token::Literal(token)
    }
}

/// Parse one job line's tokens into sources and flags.
///
/// Pure: depends only on the tokens and the pre-fetched inventory.
pub fn parse<S: AsRef<str>>(tokens: &[S], inventory: &Inventory) -> Job {
    let mut job = Job::default();

    for token in tokens {
        match Token::classify(token.as_ref()) {
            Token::Comment => break,
            Token::Group(group) => job.sources.extend_from_slice(inventory.members(group)),
            Token::Flag { name, value } => {
                job.flags.push(name);
                job.flags.push(value.to_string());
            }
            Token::Literal(source) => job.sources.push(source.to_string()),
        }
    }

    job
}

/// Split a raw line on whitespace and parse it
pub fn parse_line(line: &str, inventory: &Inventory) -> Job {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    parse(&tokens, inventory)
}
