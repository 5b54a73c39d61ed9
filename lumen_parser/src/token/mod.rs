//! Token definitions for the Lumen lexer.
//!
//! The bulk of the token automaton is generated by logos. String literals and
//! interpolation segments need stateful scanning and are produced by the
//! lexer wrapper in `crate::lexer`; here they only get their kind tags.

mod rules;

use logos::Logos;
use serde::Serialize;

pub use rules::{InfixRule, Precedence, PrefixRule, Rule};

/// Lumen tokens
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Token {
    // ==================== Keywords ====================
    #[token("constant")]
    KwConstant,
    #[token("function")]
    KwFunction,
    #[token("var")]
    KwVar,
    #[token("if")]
    KwIf,
    #[token("else")]
    KwElse,
    #[token("while")]
    KwWhile,
    #[token("type")]
    KwType,
    #[token("for")]
    KwFor,
    #[token("in")]
    KwIn,

    // ==================== Boolean Literals ====================
    #[token("true")]
    True,
    #[token("false")]
    False,

    // ==================== Operators ====================
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("<")]
    Less,
    #[token("<=")]
    LessEqual,
    #[token(">")]
    Greater,
    #[token(">=")]
    GreaterEqual,
    #[token("==")]
    EqualEqual,
    #[token("!")]
    Bang,
    #[token("!=")]
    BangEqual,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    PipePipe,
    #[token(".")]
    Dot,
    #[token("..")]
    DotDot,
    #[token(":")]
    Colon,
    #[token(":=")]
    ColonEqual,

    // ==================== Delimiters ====================
    #[token("(")]
    OpenParen,
    #[token(")")]
    CloseParen,
    #[token("{")]
    OpenBrace,
    #[token("}")]
    CloseBrace,
    #[token("[")]
    OpenBracket,
    #[token("]")]
    CloseBracket,
    #[token("$[")]
    OpenDollarBracket,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,

    // ==================== Literals ====================
    #[regex(r"[0-9]+(\.[0-9]+)?")]
    Number,
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Identifier,

    // ==================== Trivia ====================
    #[regex(r"[ \t\r\n\f]+")]
    Whitespace,
    #[regex(r"#[^\n]*")]
    Comment,

    // ==================== Wrapper-produced kinds ====================
    /// Opening quote of a string; the lexer wrapper takes over scanning
    /// from here and never hands this kind to the parser.
    #[token("\"")]
    DoubleQuote,
    /// A complete string literal including both delimiters (`"…"`), or the
    /// tail segment of an interpolated string (`}…"`).
    String,
    /// A string segment ending in `${`: either the head (`"…${`) or a middle
    /// segment (`}…${`).
    StringInterpolation,
    /// End of input
    Eof,
}

impl Token {
    /// Human-readable name used in diagnostics
    pub fn name(self) -> &'static str {
        match self {
            Token::KwConstant => "`constant`",
            Token::KwFunction => "`function`",
            Token::KwVar => "`var`",
            Token::KwIf => "`if`",
            Token::KwElse => "`else`",
            Token::KwWhile => "`while`",
            Token::KwType => "`type`",
            Token::KwFor => "`for`",
            Token::KwIn => "`in`",
            Token::True => "`true`",
            Token::False => "`false`",
            Token::Plus => "`+`",
            Token::Minus => "`-`",
            Token::Star => "`*`",
            Token::Slash => "`/`",
            Token::Less => "`<`",
            Token::LessEqual => "`<=`",
            Token::Greater => "`>`",
            Token::GreaterEqual => "`>=`",
            Token::EqualEqual => "`==`",
            Token::Bang => "`!`",
            Token::BangEqual => "`!=`",
            Token::AndAnd => "`&&`",
            Token::PipePipe => "`||`",
            Token::Dot => "`.`",
            Token::DotDot => "`..`",
            Token::Colon => "`:`",
            Token::ColonEqual => "`:=`",
            Token::OpenParen => "`(`",
            Token::CloseParen => "`)`",
            Token::OpenBrace => "`{`",
            Token::CloseBrace => "`}`",
            Token::OpenBracket => "`[`",
            Token::CloseBracket => "`]`",
            Token::OpenDollarBracket => "`$[`",
            Token::Comma => "`,`",
            Token::Semicolon => "`;`",
            Token::Number => "number literal",
            Token::Identifier => "identifier",
            Token::Whitespace => "whitespace",
            Token::Comment => "comment",
            Token::DoubleQuote => "`\"`",
            Token::String => "string literal",
            Token::StringInterpolation => "string interpolation",
            Token::Eof => "end of file",
        }
    }

    /// Trivia tokens are produced by the lexer but skipped by the parser.
    pub fn is_trivia(self) -> bool {
        matches!(self, Token::Whitespace | Token::Comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logos::Logos;

    fn kinds(source: &str) -> Vec<Token> {
        Token::lexer(source)
            .filter_map(|t| t.ok())
            .filter(|t| !t.is_trivia())
            .collect()
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("var forward := format"),
            vec![
                Token::KwVar,
                Token::Identifier,
                Token::ColonEqual,
                Token::Identifier
            ]
        );
    }

    #[test]
    fn test_longest_match_operators() {
        assert_eq!(
            kinds("a..b .c := d"),
            vec![
                Token::Identifier,
                Token::DotDot,
                Token::Identifier,
                Token::Dot,
                Token::Identifier,
                Token::ColonEqual,
                Token::Identifier
            ]
        );
        assert_eq!(
            kinds("< <= == != ! :="),
            vec![
                Token::Less,
                Token::LessEqual,
                Token::EqualEqual,
                Token::BangEqual,
                Token::Bang,
                Token::ColonEqual
            ]
        );
    }

    #[test]
    fn test_dollar_bracket() {
        assert_eq!(
            kinds("$[x: 1]"),
            vec![
                Token::OpenDollarBracket,
                Token::Identifier,
                Token::Colon,
                Token::Number,
                Token::CloseBracket
            ]
        );
    }

    #[test]
    fn test_comment_runs_to_end_of_line() {
        let tokens: Vec<Token> = Token::lexer("# note\n1")
            .filter_map(|t| t.ok())
            .collect();
        assert_eq!(
            tokens,
            vec![Token::Comment, Token::Whitespace, Token::Number]
        );
    }

    #[test]
    fn test_number_literals() {
        assert_eq!(kinds("1 23.5 0.25"), vec![Token::Number; 3]);
    }
}
