//! Lexer for Lumen source code.
//!
//! Wraps the logos-generated automaton with the stateful pieces it cannot
//! express: string literals and `${…}` interpolation segments. On a `"` the
//! wrapper scans the string payload itself; a `${` inside the payload emits a
//! [`Token::StringInterpolation`] segment and pushes an interpolation
//! context. Ordinary expression lexing then continues until the braces of
//! that context rebalance, at which point string scanning resumes at the
//! closing `}`.

use logos::Logos;

use crate::error::{ParseError, ParseResult};
use crate::span::{SourceMap, Span};
use crate::token::Token;

/// Maximum nesting depth of string interpolation contexts
pub const MAX_INTERPOLATION_DEPTH: usize = 8;

/// A token with its span and source slice
#[derive(Debug, Clone, Copy)]
pub struct SpannedToken<'a> {
    pub kind: Token,
    pub span: Span,
    pub text: &'a str,
}

impl<'a> SpannedToken<'a> {
    pub fn new(kind: Token, span: Span, text: &'a str) -> Self {
        Self { kind, span, text }
    }
}

/// Lumen lexer
pub struct Lexer<'a> {
    source: &'a str,
    inner: logos::Lexer<'a, Token>,
    source_map: SourceMap,
    /// Offset of the inner lexer's input within `source` (the inner lexer is
    /// restarted after every manually scanned string segment)
    offset: usize,
    /// Peeked token for one-token lookahead
    peeked: Option<Result<SpannedToken<'a>, ParseError>>,
    /// Open-brace balance per active interpolation context, innermost last
    interpolation_braces: Vec<u32>,
}

impl std::fmt::Debug for Lexer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lexer")
            .field("offset", &self.offset)
            .field("interpolation_braces", &self.interpolation_braces)
            .finish_non_exhaustive()
    }
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            inner: Token::lexer(source),
            source_map: SourceMap::new(source),
            offset: 0,
            peeked: None,
            interpolation_braces: Vec::new(),
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn source_map(&self) -> &SourceMap {
        &self.source_map
    }

    fn make_token(&self, kind: Token, start: usize, end: usize) -> SpannedToken<'a> {
        SpannedToken::new(kind, self.source_map.span(start, end), &self.source[start..end])
    }

    /// Peek at the next token without consuming it. Idempotent.
    pub fn peek(&mut self) -> Option<&Result<SpannedToken<'a>, ParseError>> {
        if self.peeked.is_none() {
            self.peeked = self.next_token_internal();
        }
        self.peeked.as_ref()
    }

    /// Produce the next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Option<Result<SpannedToken<'a>, ParseError>> {
        if let Some(peeked) = self.peeked.take() {
            return Some(peeked);
        }
        self.next_token_internal()
    }

    fn next_token_internal(&mut self) -> Option<Result<SpannedToken<'a>, ParseError>> {
        let result = self.inner.next()?;
        let span = self.inner.span();
        let start = self.offset + span.start;
        let end = self.offset + span.end;

        match result {
            Ok(Token::DoubleQuote) => Some(self.scan_string_segment(start, end)),

            Ok(Token::OpenBrace) => {
                if let Some(depth) = self.interpolation_braces.last_mut() {
                    *depth += 1;
                }
                Some(Ok(self.make_token(Token::OpenBrace, start, end)))
            }

            Ok(Token::CloseBrace) => {
                if let Some(depth) = self.interpolation_braces.last_mut() {
                    *depth -= 1;
                    if *depth == 0 {
                        self.interpolation_braces.pop();
                        // The resumed segment includes this `}` as its first
                        // character, mirroring the head segment's `"`.
                        return Some(self.scan_string_segment(start, end));
                    }
                }
                Some(Ok(self.make_token(Token::CloseBrace, start, end)))
            }

            Ok(kind) => Some(Ok(self.make_token(kind, start, end))),

            Err(()) => {
                // Stop producing tokens after a lex error.
                self.restart_from(self.source.len());
                Some(Err(ParseError::UnexpectedCharacter {
                    span: self.source_map.span(start, end),
                }))
            }
        }
    }

    /// Scan a string payload starting at `content_start` (just past the
    /// opening `"` or resuming `}` at `segment_start`). Produces either a
    /// complete [`Token::String`] or a [`Token::StringInterpolation`] segment
    /// ending in `${`.
    fn scan_string_segment(
        &mut self,
        segment_start: usize,
        content_start: usize,
    ) -> ParseResult<SpannedToken<'a>> {
        let bytes = self.source.as_bytes();
        let mut pos = content_start;

        loop {
            let Some(found) = memchr::memchr3(b'"', b'$', b'\\', &bytes[pos..]) else {
                self.restart_from(self.source.len());
                return Err(ParseError::UnterminatedString {
                    span: self.source_map.span(segment_start, self.source.len()),
                });
            };
            pos += found;

            match bytes[pos] {
                b'\\' => {
                    // Only `\"` and `\\` affect scanning; other escapes are
                    // validated when the literal is unescaped.
                    if pos + 1 < bytes.len() && matches!(bytes[pos + 1], b'"' | b'\\') {
                        pos += 2;
                    } else {
                        pos += 1;
                    }
                }
                b'"' => {
                    self.restart_from(pos + 1);
                    return Ok(self.make_token(Token::String, segment_start, pos + 1));
                }
                b'$' => {
                    if pos + 1 < bytes.len() && bytes[pos + 1] == b'{' {
                        let token =
                            self.make_token(Token::StringInterpolation, segment_start, pos + 2);
                        if self.interpolation_braces.len() >= MAX_INTERPOLATION_DEPTH {
                            self.restart_from(self.source.len());
                            return Err(ParseError::InterpolationTooDeep {
                                max: MAX_INTERPOLATION_DEPTH,
                                span: token.span,
                            });
                        }
                        self.interpolation_braces.push(1);
                        self.restart_from(pos + 2);
                        return Ok(token);
                    }
                    pos += 1;
                }
                _ => unreachable!("memchr3 only finds the three probed bytes"),
            }
        }
    }

    /// Restart the inner lexer at an absolute source position.
    fn restart_from(&mut self, pos: usize) {
        self.inner = Token::lexer(&self.source[pos..]);
        self.offset = pos;
    }

    /// Collect all remaining tokens (tests and debugging)
    pub fn collect_all(mut self) -> Vec<Result<SpannedToken<'a>, ParseError>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token() {
            tokens.push(token);
        }
        tokens
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<SpannedToken<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

/// Tokenize source code into a vector of spanned tokens
pub fn tokenize(source: &str) -> Vec<Result<SpannedToken<'_>, ParseError>> {
    Lexer::new(source).collect_all()
}
