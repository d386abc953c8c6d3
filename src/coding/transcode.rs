//! Text to Morse and back.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::table::{CodeTable, Token};
use crate::error::{Error, Result};

/// One element of an encoded message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    /// A character from the code table
    Token(Token),
    /// Text with no Morse representation, carried through as is
    Literal(String),
    /// The space between two characters of a word
    LetterGap,
    /// The space between two words, written as `/`
    WordGap,
}

/// An encoded message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedLine {
    elements: Vec<Element>,
}

/// What decode does with a token that is not in the code table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodePolicy {
    /// Fail with [`Error::InvalidToken`]
    Strict,
    /// Copy the token into the output unchanged
    Lenient,
}

#[derive(Debug, Clone, Copy)]
pub struct Transcoder<'a> {
    table: &'a CodeTable,
    policy: DecodePolicy,
}

impl EncodedLine {
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Number of character elements (tokens and literals).
    pub fn token_count(&self) -> usize {
        self.elements
            .iter()
            .filter(|x| matches!(x, Element::Token(_) | Element::Literal(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Parses the string form back into elements.
    /// Anything that is not made of dots and dashes becomes a literal.
    pub fn parse(s: &str) -> Self {
        let mut line = EncodedLine::default();
        for part in s.split_whitespace() {
            if part == "/" {
                line.elements.push(Element::WordGap);
                continue;
            }

            let element = match Token::parse(part) {
                Some(token) => Element::Token(token),
                None => Element::Literal(part.to_owned()),
            };
            line.push_char(element);
        }

        line
    }

    fn push_char(&mut self, element: Element) {
        if matches!(
            self.elements.last(),
            Some(Element::Token(_) | Element::Literal(_))
        ) {
            self.elements.push(Element::LetterGap);
        }
        self.elements.push(element);
    }
}

/// Space separated tokens, with words split by ` / `.
impl fmt::Display for EncodedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for i in &self.elements {
            let part = match i {
                Element::Token(token) => token.to_string(),
                Element::Literal(text) => text.to_owned(),
                Element::WordGap => "/".to_owned(),
                Element::LetterGap => continue,
            };

            if !first {
                f.write_str(" ")?;
            }
            f.write_str(&part)?;
            first = false;
        }

        Ok(())
    }
}

impl FromStr for EncodedLine {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl Transcoder<'static> {
    pub fn new(policy: DecodePolicy) -> Self {
        Self::with_table(CodeTable::standard(), policy)
    }
}

impl<'a> Transcoder<'a> {
    pub fn with_table(table: &'a CodeTable, policy: DecodePolicy) -> Self {
        Self { table, policy }
    }

    /// Encodes text.
    /// Never fails, characters missing from the table are kept as literals.
    pub fn encode(&self, text: &str) -> EncodedLine {
        let mut line = EncodedLine::default();

        for (i, word) in text.split_whitespace().enumerate() {
            if i > 0 {
                line.elements.push(Element::WordGap);
            }

            for c in word.chars() {
                let element = match self.table.lookup(c.to_ascii_uppercase()) {
                    Some(token) => Element::Token(token.clone()),
                    None => Element::Literal(c.to_string()),
                };
                line.push_char(element);
            }
        }

        line
    }

    /// Decodes the string form of an encoded line.
    pub fn decode(&self, line: &str) -> Result<String> {
        let mut out = String::new();
        for (position, part) in line.split_whitespace().enumerate() {
            if part == "/" {
                out.push(' ');
                continue;
            }

            let c = Token::parse(part).and_then(|x| self.table.reverse_lookup(&x));
            self.push_decoded(&mut out, c, part, position)?;
        }

        Ok(out)
    }

    /// Decodes an already parsed line, with the same policy as [`Transcoder::decode`].
    pub fn decode_line(&self, line: &EncodedLine) -> Result<String> {
        let mut out = String::new();
        let mut position = 0;

        for element in &line.elements {
            match element {
                Element::LetterGap => continue,
                Element::WordGap => out.push(' '),
                Element::Token(token) => {
                    let c = self.table.reverse_lookup(token);
                    self.push_decoded(&mut out, c, &token.to_string(), position)?;
                }
                Element::Literal(text) => self.push_decoded(&mut out, None, text, position)?,
            }
            position += 1;
        }

        Ok(out)
    }

    fn push_decoded(
        &self,
        out: &mut String,
        c: Option<char>,
        raw: &str,
        position: usize,
    ) -> Result<()> {
        match (c, self.policy) {
            (Some(c), _) => out.push(c),
            (None, DecodePolicy::Lenient) => out.push_str(raw),
            (None, DecodePolicy::Strict) => {
                return Err(Error::InvalidToken {
                    token: raw.to_owned(),
                    position,
                })
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{DecodePolicy, Element, EncodedLine, Transcoder};
    use crate::{coding::table::CodeTable, error::Error};

    fn lenient() -> Transcoder<'static> {
        Transcoder::new(DecodePolicy::Lenient)
    }

    fn strict() -> Transcoder<'static> {
        Transcoder::new(DecodePolicy::Strict)
    }

    #[test]
    fn test_encode_known_vectors() {
        assert_eq!(lenient().encode("SOS").to_string(), "... --- ...");
        assert_eq!(
            lenient().encode("HELLO WORLD").to_string(),
            ".... . .-.. .-.. --- / .-- --- .-. .-.. -.."
        );
        assert_eq!(lenient().encode("sos").to_string(), "... --- ...");
    }

    #[test]
    fn test_decode_known_vectors() {
        assert_eq!(strict().decode("... --- ...").unwrap(), "SOS");
        assert_eq!(
            strict()
                .decode(".... . .-.. .-.. --- / .-- --- .-. .-.. -..")
                .unwrap(),
            "HELLO WORLD"
        );
    }

    #[test]
    fn test_round_trip_alphabet() {
        let transcoder = strict();
        for (c, _) in CodeTable::standard().iter() {
            let encoded = transcoder.encode(&c.to_string()).to_string();
            assert_eq!(transcoder.decode(&encoded).unwrap(), c.to_string());
        }

        let text =
            "The quick brown fox, jumps over 13 lazy dogs? (\"yes\") a@b.c $5 + 2=7 don't_stop!";
        let encoded = transcoder.encode(text);
        assert_eq!(
            transcoder.decode(&encoded.to_string()).unwrap(),
            text.to_ascii_uppercase()
        );
        assert_eq!(
            transcoder.decode_line(&encoded).unwrap(),
            text.to_ascii_uppercase()
        );
    }

    #[test]
    fn test_encode_unmapped_passes_through() {
        let line = lenient().encode("a#b");
        assert_eq!(line.to_string(), ".- # -...");
        assert_eq!(line.token_count(), 3);
        assert_eq!(lenient().decode(&line.to_string()).unwrap(), "A#B");
    }

    #[test]
    fn test_encode_collapses_whitespace() {
        let line = lenient().encode("  E \t  T ");
        assert_eq!(
            line.elements(),
            &[
                Element::Token(super::Token::parse(".").unwrap()),
                Element::WordGap,
                Element::Token(super::Token::parse("-").unwrap()),
            ]
        );
    }

    #[test]
    fn test_decode_strict_reports_position() {
        let err = strict().decode("... ........ ...").unwrap_err();
        assert_eq!(
            err,
            Error::InvalidToken {
                token: "........".to_owned(),
                position: 1
            }
        );

        assert!(matches!(
            strict().decode(".- #").unwrap_err(),
            Error::InvalidToken { .. }
        ));
    }

    #[test]
    fn test_decode_lenient_keeps_unknown() {
        assert_eq!(lenient().decode("... ........ ...").unwrap(), "S........S");
    }

    #[test]
    fn test_decode_slash_is_space() {
        assert_eq!(strict().decode(". / / -").unwrap(), "E  T");
        assert_eq!(strict().decode("").unwrap(), "");
    }

    #[test]
    fn test_empty_input() {
        let line = lenient().encode("");
        assert!(line.is_empty());
        assert_eq!(line.token_count(), 0);
        assert_eq!(line.to_string(), "");
    }

    #[test]
    fn test_parse_line() {
        let line = "... --- ... / .-".parse::<EncodedLine>().unwrap();
        assert_eq!(line, lenient().encode("SOS A"));

        let line = "-- ? --".parse::<EncodedLine>().unwrap();
        assert_eq!(line.elements()[2], Element::Literal("?".to_owned()));
        assert_eq!(lenient().decode_line(&line).unwrap(), "M?M");
    }
}
