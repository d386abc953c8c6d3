//! The International Morse alphabet.
//! Maps characters to their dot / dash tokens and back.

use std::{fmt, sync::OnceLock};

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    /// One unit of tone
    Dot,
    /// Three units of tone
    Dash,
}

/// The symbols of a single character.
/// Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token(Vec<Symbol>);

/// Bidirectional mapping between characters and tokens.
#[derive(Debug, Clone)]
pub struct CodeTable {
    order: Vec<char>,
    forward: HashMap<char, Token>,
    reverse: HashMap<Token, char>,
}

impl Symbol {
    pub fn as_char(&self) -> char {
        match self {
            Self::Dot => '.',
            Self::Dash => '-',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '.' => Some(Self::Dot),
            '-' => Some(Self::Dash),
            _ => None,
        }
    }
}

impl Token {
    pub fn new(symbols: Vec<Symbol>) -> Option<Self> {
        if symbols.is_empty() {
            return None;
        }

        Some(Self(symbols))
    }

    /// Parses a string made only of `.` and `-`.
    pub fn parse(s: &str) -> Option<Self> {
        let symbols = s.chars().map(Symbol::from_char).collect::<Option<Vec<_>>>()?;
        Self::new(symbols)
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in &self.0 {
            write!(f, "{}", i.as_char())?;
        }
        Ok(())
    }
}

impl CodeTable {
    /// Builds a table, refusing anything that would make the reverse lookup ambiguous.
    pub fn new(entries: &[(char, &[Symbol])]) -> Result<Self> {
        let mut order = Vec::with_capacity(entries.len());
        let mut forward = HashMap::with_capacity(entries.len());
        let mut reverse = HashMap::with_capacity(entries.len());

        for &(c, symbols) in entries {
            if c.is_whitespace() {
                return Err(Error::TableConflict(format!(
                    "whitespace character {c:?} is reserved for gaps"
                )));
            }

            let token = Token::new(symbols.to_vec())
                .ok_or_else(|| Error::TableConflict(format!("empty token for {c:?}")))?;

            if let Some(other) = reverse.insert(token.clone(), c) {
                return Err(Error::TableConflict(format!(
                    "{c:?} and {other:?} share the token `{token}`"
                )));
            }

            if forward.insert(c, token).is_some() {
                return Err(Error::TableConflict(format!("{c:?} is defined twice")));
            }

            order.push(c);
        }

        Ok(Self {
            order,
            forward,
            reverse,
        })
    }

    /// The ITU alphabet: letters, digits and common punctuation.
    pub fn standard() -> &'static CodeTable {
        static STANDARD: OnceLock<CodeTable> = OnceLock::new();
        STANDARD.get_or_init(|| match CodeTable::new(&MORSE_ENCODING) {
            Ok(table) => table,
            Err(e) => panic!("Standard Morse table is invalid: {e}"),
        })
    }

    pub fn lookup(&self, c: char) -> Option<&Token> {
        self.forward.get(&c)
    }

    pub fn reverse_lookup(&self, token: &Token) -> Option<char> {
        self.reverse.get(token).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterates the alphabet in the order it was defined.
    pub fn iter(&self) -> impl Iterator<Item = (char, &Token)> + '_ {
        self.order.iter().map(|c| (*c, &self.forward[c]))
    }
}

use Symbol::*;
const MORSE_ENCODING: [(char, &[Symbol]); 54] = [
    ('A', &[Dot, Dash]),
    ('B', &[Dash, Dot, Dot, Dot]),
    ('C', &[Dash, Dot, Dash, Dot]),
    ('D', &[Dash, Dot, Dot]),
    ('E', &[Dot]),
    ('F', &[Dot, Dot, Dash, Dot]),
    ('G', &[Dash, Dash, Dot]),
    ('H', &[Dot, Dot, Dot, Dot]),
    ('I', &[Dot, Dot]),
    ('J', &[Dot, Dash, Dash, Dash]),
    ('K', &[Dash, Dot, Dash]),
    ('L', &[Dot, Dash, Dot, Dot]),
    ('M', &[Dash, Dash]),
    ('N', &[Dash, Dot]),
    ('O', &[Dash, Dash, Dash]),
    ('P', &[Dot, Dash, Dash, Dot]),
    ('Q', &[Dash, Dash, Dot, Dash]),
    ('R', &[Dot, Dash, Dot]),
    ('S', &[Dot, Dot, Dot]),
    ('T', &[Dash]),
    ('U', &[Dot, Dot, Dash]),
    ('V', &[Dot, Dot, Dot, Dash]),
    ('W', &[Dot, Dash, Dash]),
    ('X', &[Dash, Dot, Dot, Dash]),
    ('Y', &[Dash, Dot, Dash, Dash]),
    ('Z', &[Dash, Dash, Dot, Dot]),
    ('0', &[Dash, Dash, Dash, Dash, Dash]),
    ('1', &[Dot, Dash, Dash, Dash, Dash]),
    ('2', &[Dot, Dot, Dash, Dash, Dash]),
    ('3', &[Dot, Dot, Dot, Dash, Dash]),
    ('4', &[Dot, Dot, Dot, Dot, Dash]),
    ('5', &[Dot, Dot, Dot, Dot, Dot]),
    ('6', &[Dash, Dot, Dot, Dot, Dot]),
    ('7', &[Dash, Dash, Dot, Dot, Dot]),
    ('8', &[Dash, Dash, Dash, Dot, Dot]),
    ('9', &[Dash, Dash, Dash, Dash, Dot]),
    ('.', &[Dot, Dash, Dot, Dash, Dot, Dash]),
    (',', &[Dash, Dash, Dot, Dot, Dash, Dash]),
    ('?', &[Dot, Dot, Dash, Dash, Dot, Dot]),
    ('\'', &[Dot, Dash, Dash, Dash, Dash, Dot]),
    ('!', &[Dash, Dot, Dash, Dot, Dash, Dash]),
    ('/', &[Dash, Dot, Dot, Dash, Dot]),
    ('(', &[Dash, Dot, Dash, Dash, Dot]),
    (')', &[Dash, Dot, Dash, Dash, Dot, Dash]),
    ('&', &[Dot, Dash, Dot, Dot, Dot]),
    (':', &[Dash, Dash, Dash, Dot, Dot, Dot]),
    (';', &[Dash, Dot, Dash, Dot, Dash, Dot]),
    ('=', &[Dash, Dot, Dot, Dot, Dash]),
    ('+', &[Dot, Dash, Dot, Dash, Dot]),
    ('-', &[Dash, Dot, Dot, Dot, Dot, Dash]),
    ('_', &[Dot, Dot, Dash, Dash, Dot, Dash]),
    ('"', &[Dot, Dash, Dot, Dot, Dash, Dot]),
    ('$', &[Dot, Dot, Dot, Dash, Dot, Dot, Dash]),
    ('@', &[Dot, Dash, Dash, Dot, Dash, Dot]),
];
