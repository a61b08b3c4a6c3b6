//! Lexical classification of argument-vector tokens.
//!
//! The kind of a token depends only on its shape, never on parser state:
//!
//! | Shape                              | Kind            |
//! |------------------------------------|-----------------|
//! | `--`                               | `Separator`     |
//! | `-x` (not a digit or `-`)          | `Flag`          |
//! | `--name`                           | `Flag`          |
//! | `--name=value`, `-x=value`         | `CompositeFlag` |
//! | anything else, including `-5`      | `Value`         |

use std::fmt;

use crate::ParseError;

/// Kind of a classified token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Flag,
    CompositeFlag,
    Separator,
    Value,
}

/// A classified token borrowing from the argument vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Flag(&'a str),
    CompositeFlag {
        raw: &'a str,
        name: &'a str,
        value: &'a str,
    },
    Separator,
    Value(&'a str),
}

impl<'a> Token<'a> {
    /// Classifies a raw token by shape.
    ///
    /// # Examples
    ///
    /// ```
    /// use cmdbind_core::{Token, TokenKind};
    ///
    /// assert_eq!(Token::classify("--count").kind(), TokenKind::Flag);
    /// assert_eq!(Token::classify("-c=3").kind(), TokenKind::CompositeFlag);
    /// assert_eq!(Token::classify("-3").kind(), TokenKind::Value);
    /// assert_eq!(Token::classify("--").kind(), TokenKind::Separator);
    /// ```
    pub fn classify(raw: &'a str) -> Self {
        if raw == "--" {
            return Self::Separator;
        }
        if is_flag(raw) || is_short_composite(raw) {
            return match raw.split_once('=') {
                Some((name, value)) => Self::CompositeFlag { raw, name, value },
                None => Self::Flag(raw),
            };
        }
        Self::Value(raw)
    }

    pub fn kind(&self) -> TokenKind {
        match self {
            Self::Flag(_) => TokenKind::Flag,
            Self::CompositeFlag { .. } => TokenKind::CompositeFlag,
            Self::Separator => TokenKind::Separator,
            Self::Value(_) => TokenKind::Value,
        }
    }

    /// The token as it appeared in the argument vector.
    pub fn raw(&self) -> &'a str {
        match self {
            Self::Flag(raw) | Self::Value(raw) | Self::CompositeFlag { raw, .. } => *raw,
            Self::Separator => "--",
        }
    }

    /// Flag name of a flag or composite flag token.
    pub fn flag_name(&self) -> Option<&'a str> {
        match self {
            Self::Flag(name) | Self::CompositeFlag { name, .. } => Some(*name),
            _ => None,
        }
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.raw())
    }
}

/// Rejects flag names that cannot name any declared flag.
pub(crate) fn check_flag_name(name: &str) -> Result<(), ParseError> {
    if name == "--" || name.starts_with("---") || name.chars().any(char::is_whitespace) {
        return Err(ParseError::InvalidFlag(name.to_string()));
    }
    Ok(())
}

/// `-x` with `x` not a digit or dash, or `--` followed by at least one byte.
pub(crate) fn is_flag(s: &str) -> bool {
    if let Some(rest) = s.strip_prefix("--") {
        return !rest.is_empty();
    }
    let mut chars = s.chars();
    chars.next() == Some('-')
        && chars.next().is_some_and(is_short_char)
        && chars.next().is_none()
}

fn is_short_composite(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next() == Some('-')
        && chars.next().is_some_and(is_short_char)
        && chars.next() == Some('=')
}

fn is_short_char(c: char) -> bool {
    !c.is_ascii_digit() && c != '-'
}
