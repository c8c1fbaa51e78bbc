//! Gate expressions - boolean conditions over module flags.
//!
//! A gate is the explicit form of an `#ifdef MODULE_FOO` guard. Gates are
//! written as text in the library:
//!
//! ```text
//! MODULE_GCOAP
//! MODULE_PERIPH_GPIO && !BOARD_NATIVE
//! defined(MODULE_SOCK) || (MODULE_CORD_EP and not MODULE_CORD_EP_STANDALONE)
//! ```
//!
//! Precedence is NOT > AND > OR. A flag that is not set evaluates to false,
//! the same way an undefined macro is falsy in the preprocessor.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::core::flags::FlagSet;

/// A parsed gate expression.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Gate {
    /// Always included
    #[default]
    Always,
    /// Never included
    Never,
    /// A single flag, true when the flag is set
    Flag(String),
    /// Negation
    Not(Box<Gate>),
    /// Conjunction, evaluated left to right
    All(Vec<Gate>),
    /// Disjunction, evaluated left to right
    Any(Vec<Gate>),
}

/// Error produced when a gate expression cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateParseError {
    #[error("unexpected character `{found}` at offset {offset}")]
    UnexpectedChar { found: char, offset: usize },

    #[error("unexpected `{found}` at offset {offset}, expected {expected}")]
    UnexpectedToken {
        found: String,
        offset: usize,
        expected: &'static str,
    },

    #[error("unexpected end of gate expression, expected {expected}")]
    UnexpectedEnd { expected: &'static str },

    #[error("empty gate expression")]
    Empty,
}

impl Gate {
    /// Gate on a single flag.
    pub fn flag(name: impl Into<String>) -> Self {
        Gate::Flag(name.into())
    }

    /// Negate a gate.
    pub fn not(inner: Gate) -> Self {
        Gate::Not(Box::new(inner))
    }

    /// Parse a gate from its textual form.
    pub fn parse(input: &str) -> Result<Self, GateParseError> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Err(GateParseError::Empty);
        }

        let mut parser = Parser { tokens, pos: 0 };
        let gate = parser.parse_or()?;

        if let Some(token) = parser.peek() {
            return Err(GateParseError::UnexpectedToken {
                found: token.kind.to_string(),
                offset: token.offset,
                expected: "`&&`, `||` or end of expression",
            });
        }

        Ok(gate)
    }

    /// Evaluate this gate against a flag set.
    ///
    /// Pure and deterministic; `&&` and `||` short-circuit.
    pub fn evaluate(&self, flags: &FlagSet) -> bool {
        match self {
            Gate::Always => true,
            Gate::Never => false,
            Gate::Flag(name) => flags.is_enabled(name),
            Gate::Not(inner) => !inner.evaluate(flags),
            Gate::All(parts) => parts.iter().all(|g| g.evaluate(flags)),
            Gate::Any(parts) => parts.iter().any(|g| g.evaluate(flags)),
        }
    }

    /// Check if this gate is unconditionally true.
    pub fn is_always(&self) -> bool {
        matches!(self, Gate::Always)
    }

    /// All flag names referenced by this gate, sorted.
    pub fn flags(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_flags(&mut out);
        out
    }

    fn collect_flags<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Gate::Always | Gate::Never => {}
            Gate::Flag(name) => {
                out.insert(name.as_str());
            }
            Gate::Not(inner) => inner.collect_flags(out),
            Gate::All(parts) | Gate::Any(parts) => {
                for part in parts {
                    part.collect_flags(out);
                }
            }
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Gate::Any(_) => 1,
            Gate::All(_) => 2,
            _ => 3,
        }
    }

    fn fmt_child(&self, child: &Gate, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if child.precedence() < self.precedence() {
            write!(f, "({})", child)
        } else {
            write!(f, "{}", child)
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gate::Always => write!(f, "true"),
            Gate::Never => write!(f, "false"),
            Gate::Flag(name) => write!(f, "{}", name),
            Gate::Not(inner) => {
                write!(f, "!")?;
                self.fmt_child(inner, f)
            }
            Gate::All(parts) | Gate::Any(parts) => {
                let sep = if matches!(self, Gate::All(_)) {
                    " && "
                } else {
                    " || "
                };
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(sep)?;
                    }
                    self.fmt_child(part, f)?;
                }
                Ok(())
            }
        }
    }
}

impl FromStr for Gate {
    type Err = GateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Gate::parse(s)
    }
}

impl Serialize for Gate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Gate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Gate::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    Ident(String),
    Not,
    And,
    Or,
    LParen,
    RParen,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(name) => write!(f, "{}", name),
            TokenKind::Not => write!(f, "!"),
            TokenKind::And => write!(f, "&&"),
            TokenKind::Or => write!(f, "||"),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
        }
    }
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    offset: usize,
}

fn tokenize(input: &str) -> Result<Vec<Token>, GateParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        let kind = match c {
            c if c.is_whitespace() => continue,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '!' => TokenKind::Not,
            '&' | '|' => {
                // Both `&&` and `&` are accepted, as are `||` and `|`
                if chars.peek().map(|&(_, next)| next) == Some(c) {
                    chars.next();
                }
                if c == '&' {
                    TokenKind::And
                } else {
                    TokenKind::Or
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut end = offset + c.len_utf8();
                while let Some(&(i, next)) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        end = i + next.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                match &input[offset..end] {
                    "and" => TokenKind::And,
                    "or" => TokenKind::Or,
                    "not" => TokenKind::Not,
                    word => TokenKind::Ident(word.to_string()),
                }
            }
            found => return Err(GateParseError::UnexpectedChar { found, offset }),
        };
        tokens.push(Token { kind, offset });
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek().map(|t| &t.kind) == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> Result<(), GateParseError> {
        match self.next() {
            Some(token) if token.kind == kind => Ok(()),
            Some(token) => Err(GateParseError::UnexpectedToken {
                found: token.kind.to_string(),
                offset: token.offset,
                expected,
            }),
            None => Err(GateParseError::UnexpectedEnd { expected }),
        }
    }

    fn parse_or(&mut self) -> Result<Gate, GateParseError> {
        let mut parts = vec![self.parse_and()?];
        while self.eat(&TokenKind::Or) {
            parts.push(self.parse_and()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Gate::Any(parts)
        })
    }

    fn parse_and(&mut self) -> Result<Gate, GateParseError> {
        let mut parts = vec![self.parse_unary()?];
        while self.eat(&TokenKind::And) {
            parts.push(self.parse_unary()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Gate::All(parts)
        })
    }

    fn parse_unary(&mut self) -> Result<Gate, GateParseError> {
        if self.eat(&TokenKind::Not) {
            return Ok(Gate::not(self.parse_unary()?));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Gate, GateParseError> {
        const EXPECTED: &str = "a flag name, `!` or `(`";

        let token = self
            .next()
            .ok_or(GateParseError::UnexpectedEnd { expected: EXPECTED })?;

        match token.kind {
            TokenKind::LParen => {
                let inner = self.parse_or()?;
                self.expect(TokenKind::RParen, "`)`")?;
                Ok(inner)
            }
            TokenKind::Ident(word) => match word.as_str() {
                "true" => Ok(Gate::Always),
                "false" => Ok(Gate::Never),
                "defined" if self.eat(&TokenKind::LParen) => {
                    let name = match self.next() {
                        Some(Token {
                            kind: TokenKind::Ident(name),
                            ..
                        }) => name,
                        Some(other) => {
                            return Err(GateParseError::UnexpectedToken {
                                found: other.kind.to_string(),
                                offset: other.offset,
                                expected: "a flag name",
                            })
                        }
                        None => {
                            return Err(GateParseError::UnexpectedEnd {
                                expected: "a flag name",
                            })
                        }
                    };
                    self.expect(TokenKind::RParen, "`)`")?;
                    Ok(Gate::Flag(name))
                }
                _ => Ok(Gate::Flag(word)),
            },
            other => Err(GateParseError::UnexpectedToken {
                found: other.to_string(),
                offset: token.offset,
                expected: EXPECTED,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(names: &[&str]) -> FlagSet {
        FlagSet::from_names(names.iter().copied())
    }

    #[test]
    fn test_parse_single_flag() {
        assert_eq!(Gate::parse("MODULE_GCOAP").unwrap(), Gate::flag("MODULE_GCOAP"));
        assert_eq!(Gate::parse("defined(FOO)").unwrap(), Gate::flag("FOO"));
        assert_eq!(Gate::parse("true").unwrap(), Gate::Always);
    }

    #[test]
    fn test_precedence() {
        // NOT binds tighter than AND, AND tighter than OR
        let gate = Gate::parse("A || !B && C").unwrap();
        assert_eq!(
            gate,
            Gate::Any(vec![
                Gate::flag("A"),
                Gate::All(vec![Gate::not(Gate::flag("B")), Gate::flag("C")]),
            ])
        );
    }

    #[test]
    fn test_word_operators() {
        let symbolic = Gate::parse("A && !(B || C)").unwrap();
        let words = Gate::parse("A and not (B or C)").unwrap();
        assert_eq!(symbolic, words);
    }

    #[test]
    fn test_unknown_flags_are_false() {
        let gate = Gate::parse("MODULE_NOPE").unwrap();
        assert!(!gate.evaluate(&FlagSet::new()));

        let gate = Gate::parse("!MODULE_NOPE").unwrap();
        assert!(gate.evaluate(&FlagSet::new()));
    }

    #[test]
    fn test_evaluate() {
        let gate = Gate::parse("MODULE_PERIPH_GPIO && !BOARD_NATIVE").unwrap();
        assert!(gate.evaluate(&flags(&["MODULE_PERIPH_GPIO"])));
        assert!(!gate.evaluate(&flags(&["MODULE_PERIPH_GPIO", "BOARD_NATIVE"])));
        assert!(!gate.evaluate(&flags(&[])));

        let gate = Gate::parse("(A || B) && C").unwrap();
        assert!(gate.evaluate(&flags(&["B", "C"])));
        assert!(!gate.evaluate(&flags(&["A", "B"])));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Gate::parse("   "), Err(GateParseError::Empty));
        assert!(matches!(
            Gate::parse("A &&"),
            Err(GateParseError::UnexpectedEnd { .. })
        ));
        assert!(matches!(
            Gate::parse("A $ B"),
            Err(GateParseError::UnexpectedChar { found: '$', offset: 2 })
        ));
        assert!(matches!(
            Gate::parse("(A || B"),
            Err(GateParseError::UnexpectedEnd { expected: "`)`" })
        ));
        assert!(matches!(
            Gate::parse("A B"),
            Err(GateParseError::UnexpectedToken { offset: 2, .. })
        ));
    }

    #[test]
    fn test_display_round_trips() {
        for text in ["A", "!A", "A && B || C", "(A || B) && C", "!(A && B)", "true"] {
            let gate = Gate::parse(text).unwrap();
            assert_eq!(Gate::parse(&gate.to_string()).unwrap(), gate);
        }
        assert_eq!(Gate::parse("(A || B) && C").unwrap().to_string(), "(A || B) && C");
    }

    #[test]
    fn test_referenced_flags() {
        let gate = Gate::parse("B && (A || !B)").unwrap();
        let names: Vec<_> = gate.flags().into_iter().collect();
        assert_eq!(names, vec!["A", "B"]);
    }
}
