//! Morse code: the code table and the text transcoder.

pub mod table;
pub mod transcode;

pub use table::{CodeTable, Symbol, Token};
pub use transcode::{DecodePolicy, Element, EncodedLine, Transcoder};
