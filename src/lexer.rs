//! Lexical analysis for the Sentrie policy language.
//!
//! The lexer turns a UTF-8 character stream into a stream of typed tokens
//! with byte/line/column-accurate ranges. It recognizes keywords,
//! identifiers, numbers, quoted strings, heredocs, `--` comments, and the
//! operator and punctuation set of the language.
//!
//! # Example
//!
//! ```rust
//! use sentrie::lexer::Lexer;
//! use sentrie::token::TokenKind;
//!
//! let mut lexer = Lexer::new("rule allow when true = true", "policy.sn");
//!
//! assert_eq!(lexer.next_token().kind, TokenKind::Rule);
//! assert_eq!(lexer.next_token().kind, TokenKind::Ident);
//! assert_eq!(lexer.next_token().kind, TokenKind::When);
//! ```
//!
//! Comments are tokens, not noise: a comment with only whitespace before
//! it on its line is a `LineComment`, one that follows code is a
//! `TrailingComment`. The parser decides whether to keep or drop them.

use crate::error::LexError;
use crate::token::{lookup_keyword, Pos, Range, Token, TokenKind};

/// The lexer for Sentrie source text.
///
/// The lexer scans on demand: each call to [`Lexer::next_token`] consumes
/// just enough input to produce one token. Errors are accumulated and
/// also surfaced as `Error` tokens so the parser can keep going.
pub struct Lexer<'a> {
    /// Remaining source to process.
    remaining: &'a str,

    /// The program reference, stamped into every token range.
    file: String,

    /// Current byte offset in the source.
    offset: usize,

    /// Current line number (1-indexed).
    line: u32,

    /// Current column number (1-indexed).
    column: u32,

    /// Whether a non-whitespace character has been consumed on the
    /// current line. Decides line vs trailing comment classification.
    line_has_content: bool,

    /// Accumulated errors.
    errors: Vec<LexError>,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer over `source`. `file` is the opaque program
    /// reference recorded in token ranges, usually a file path.
    pub fn new(source: &'a str, file: impl Into<String>) -> Self {
        Lexer {
            remaining: source,
            file: file.into(),
            offset: 0,
            line: 1,
            column: 1,
            line_has_content: false,
            errors: Vec::new(),
        }
    }

    /// The errors accumulated so far.
    pub fn errors(&self) -> &[LexError] {
        &self.errors
    }

    /// The current position.
    fn pos(&self) -> Pos {
        Pos::new(self.offset, self.line, self.column)
    }

    fn range_from(&self, from: Pos) -> Range {
        Range::new(self.file.clone(), from, self.pos())
    }

    /// Peeks the next character without consuming it.
    fn peek(&self) -> Option<char> {
        self.remaining.chars().next()
    }

    /// Peeks the character after the next one.
    fn peek2(&self) -> Option<char> {
        self.remaining.chars().nth(1)
    }

    /// Consumes one character and updates position tracking.
    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.remaining = &self.remaining[ch.len_utf8()..];
        self.offset += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
            self.line_has_content = false;
        } else {
            self.column += 1;
            if !ch.is_whitespace() {
                self.line_has_content = true;
            }
        }
        Some(ch)
    }

    /// Produces the next token, skipping whitespace first.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let start = self.pos();
        // A comment introducer is classified against the line content seen
        // before its own first character.
        let content_before = self.line_has_content;

        let Some(ch) = self.peek() else {
            return Token::new(TokenKind::Eof, "", self.range_from(start));
        };

        if self.remaining.starts_with("--") {
            return self.lex_comment(start, content_before);
        }
        if self.remaining.starts_with("<<<") {
            return self.lex_heredoc(start);
        }
        if ch == '"' {
            return self.lex_string(start);
        }
        if ch.is_ascii_digit() {
            return self.lex_number(start);
        }
        if ch.is_ascii_alphabetic() || ch == '_' {
            return self.lex_ident(start);
        }
        if let Some(token) = self.lex_operator(start) {
            return token;
        }

        // Unknown character.
        self.bump();
        let range = self.range_from(start);
        self.errors.push(LexError::UnexpectedChar {
            ch,
            range: range.clone(),
        });
        Token::new(TokenKind::Error, ch.to_string(), range)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn lex_comment(&mut self, start: Pos, content_before: bool) -> Token {
        self.bump();
        self.bump();
        let mut text = String::new();
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            text.push(ch);
            self.bump();
        }
        let kind = if content_before {
            TokenKind::TrailingComment
        } else {
            TokenKind::LineComment
        };
        Token::new(kind, text, self.range_from(start))
    }

    fn lex_string(&mut self, start: Pos) -> Token {
        self.bump();
        let mut content = String::new();
        loop {
            match self.bump() {
                None => {
                    let range = self.range_from(start);
                    self.errors.push(LexError::UnterminatedString {
                        range: range.clone(),
                    });
                    return Token::new(TokenKind::Error, content, range);
                }
                Some('"') => {
                    return Token::new(TokenKind::String, content, self.range_from(start));
                }
                Some('\\') => match self.bump() {
                    None => {
                        let range = self.range_from(start);
                        self.errors.push(LexError::UnterminatedString {
                            range: range.clone(),
                        });
                        return Token::new(TokenKind::Error, content, range);
                    }
                    Some('"') => content.push('"'),
                    Some('\\') => content.push('\\'),
                    Some('/') => content.push('/'),
                    Some('n') => content.push('\n'),
                    Some('t') => content.push('\t'),
                    Some('r') => content.push('\r'),
                    Some('b') => content.push('\u{0008}'),
                    Some('f') => content.push('\u{000C}'),
                    // Any other escaped character passes through verbatim.
                    Some(other) => content.push(other),
                },
                Some(ch) => content.push(ch),
            }
        }
    }

    fn lex_heredoc(&mut self, start: Pos) -> Token {
        self.bump();
        self.bump();
        self.bump();

        let mut tag = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                tag.push(ch);
                self.bump();
            } else {
                break;
            }
        }
        let valid_tag = tag
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        if !valid_tag {
            let range = self.range_from(start);
            self.errors.push(LexError::MissingHeredocTag {
                range: range.clone(),
            });
            return Token::new(TokenKind::Error, tag, range);
        }

        // Discard the remainder of the introducer line.
        loop {
            match self.bump() {
                Some('\n') => break,
                Some(_) => {}
                None => {
                    let range = self.range_from(start);
                    self.errors.push(LexError::UnterminatedHeredoc {
                        tag,
                        range: range.clone(),
                    });
                    return Token::new(TokenKind::Error, "", range);
                }
            }
        }

        // Collect body lines until one is exactly the tag.
        let mut body = String::new();
        let mut first_line = true;
        loop {
            let mut line = String::new();
            let mut saw_newline = false;
            while let Some(ch) = self.bump() {
                if ch == '\n' {
                    saw_newline = true;
                    break;
                }
                line.push(ch);
            }
            if line == tag {
                return Token::new(TokenKind::String, body, self.range_from(start));
            }
            if !first_line {
                body.push('\n');
            }
            body.push_str(&line);
            first_line = false;
            if !saw_newline {
                let range = self.range_from(start);
                self.errors.push(LexError::UnterminatedHeredoc {
                    tag,
                    range: range.clone(),
                });
                return Token::new(TokenKind::Error, body, range);
            }
        }
    }

    fn lex_number(&mut self, start: Pos) -> Token {
        let mut text = String::new();
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            text.push(self.bump().unwrap_or_default());
        }
        // Fractional part only if the dot is followed by a digit, so that
        // `7.count` never lexes as a float.
        if self.peek() == Some('.') && matches!(self.peek2(), Some(c) if c.is_ascii_digit()) {
            text.push(self.bump().unwrap_or_default());
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                text.push(self.bump().unwrap_or_default());
            }
            return Token::new(TokenKind::Float, text, self.range_from(start));
        }
        Token::new(TokenKind::Int, text, self.range_from(start))
    }

    fn lex_ident(&mut self, start: Pos) -> Token {
        let mut text = String::new();
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            text.push(self.bump().unwrap_or_default());
        }
        let kind = lookup_keyword(&text).unwrap_or(TokenKind::Ident);
        Token::new(kind, text, self.range_from(start))
    }

    fn lex_operator(&mut self, start: Pos) -> Option<Token> {
        let (kind, len) = if self.remaining.starts_with("...") {
            (TokenKind::Ellipsis, 3)
        } else if self.remaining.starts_with("==") {
            (TokenKind::Eq, 2)
        } else if self.remaining.starts_with("!=") {
            (TokenKind::NotEq, 2)
        } else if self.remaining.starts_with("<=") {
            (TokenKind::LtEq, 2)
        } else if self.remaining.starts_with(">=") {
            (TokenKind::GtEq, 2)
        } else {
            let kind = match self.peek()? {
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                '{' => TokenKind::LBrace,
                '}' => TokenKind::RBrace,
                '[' => TokenKind::LBracket,
                ']' => TokenKind::RBracket,
                ',' => TokenKind::Comma,
                ';' => TokenKind::Semicolon,
                ':' => TokenKind::Colon,
                '.' => TokenKind::Dot,
                '@' => TokenKind::At,
                '+' => TokenKind::Plus,
                '-' => TokenKind::Minus,
                '*' => TokenKind::Star,
                '/' => TokenKind::Slash,
                '%' => TokenKind::Percent,
                '=' => TokenKind::Assign,
                '<' => TokenKind::Lt,
                '>' => TokenKind::Gt,
                '?' => TokenKind::Question,
                '!' => TokenKind::Bang,
                _ => return None,
            };
            (kind, 1)
        };
        let mut text = String::new();
        for _ in 0..len {
            text.push(self.bump().unwrap_or_default());
        }
        Some(Token::new(kind, text, self.range_from(start)))
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            None
        } else {
            Some(token)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source, "test.sn").map(|t| t.kind).collect()
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("namespace policy allow unknown"),
            vec![
                TokenKind::Namespace,
                TokenKind::Policy,
                TokenKind::Ident,
                TokenKind::Unknown,
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("== != <= >= < > = + - * / % ? ! ..."),
            vec![
                TokenKind::Eq,
                TokenKind::NotEq,
                TokenKind::LtEq,
                TokenKind::GtEq,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::Assign,
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Percent,
                TokenKind::Question,
                TokenKind::Bang,
                TokenKind::Ellipsis,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        let mut lexer = Lexer::new("42 3.25 7.count", "test.sn");
        let t = lexer.next_token();
        assert_eq!((t.kind, t.literal.as_str()), (TokenKind::Int, "42"));
        let t = lexer.next_token();
        assert_eq!((t.kind, t.literal.as_str()), (TokenKind::Float, "3.25"));
        // A dot not followed by a digit stays a member access.
        let t = lexer.next_token();
        assert_eq!((t.kind, t.literal.as_str()), (TokenKind::Int, "7"));
        assert_eq!(lexer.next_token().kind, TokenKind::Dot);
        assert_eq!(lexer.next_token().kind, TokenKind::Count);
    }

    #[test]
    fn test_string_escapes() {
        let mut lexer = Lexer::new(r#""a\"b\\c\nd\/e\q""#, "test.sn");
        let t = lexer.next_token();
        assert_eq!(t.kind, TokenKind::String);
        assert_eq!(t.literal, "a\"b\\c\nd/eq");
        assert!(lexer.errors().is_empty());
    }

    #[test]
    fn test_unterminated_string() {
        let mut lexer = Lexer::new("\"oops", "test.sn");
        let t = lexer.next_token();
        assert_eq!(t.kind, TokenKind::Error);
        assert!(matches!(
            lexer.errors()[0],
            LexError::UnterminatedString { .. }
        ));
    }

    #[test]
    fn test_comment_classification() {
        let source = "let x = 1 -- trailing\n  -- full line\n";
        let collected: Vec<Token> = Lexer::new(source, "test.sn").collect();
        let comments: Vec<&Token> = collected.iter().filter(|t| t.kind.is_comment()).collect();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].kind, TokenKind::TrailingComment);
        assert_eq!(comments[0].literal, " trailing");
        assert_eq!(comments[1].kind, TokenKind::LineComment);
        assert_eq!(comments[1].literal, " full line");
    }

    #[test]
    fn test_heredoc() {
        let source = "<<<DOC\nline one\nline two\nDOC\nrule";
        let mut lexer = Lexer::new(source, "test.sn");
        let t = lexer.next_token();
        assert_eq!(t.kind, TokenKind::String);
        assert_eq!(t.literal, "line one\nline two");
        assert_eq!(lexer.next_token().kind, TokenKind::Rule);
    }

    #[test]
    fn test_heredoc_terminator_must_match_exactly() {
        let source = "<<<DOC\nbody\nDOCX\nDOC\n";
        let mut lexer = Lexer::new(source, "test.sn");
        let t = lexer.next_token();
        assert_eq!(t.kind, TokenKind::String);
        assert_eq!(t.literal, "body\nDOCX");
    }

    #[test]
    fn test_unterminated_heredoc() {
        let mut lexer = Lexer::new("<<<DOC\nno end", "test.sn");
        let t = lexer.next_token();
        assert_eq!(t.kind, TokenKind::Error);
        assert!(matches!(
            lexer.errors()[0],
            LexError::UnterminatedHeredoc { .. }
        ));
    }

    #[test]
    fn test_unknown_character() {
        let mut lexer = Lexer::new("let $", "test.sn");
        assert_eq!(lexer.next_token().kind, TokenKind::Let);
        let t = lexer.next_token();
        assert_eq!(t.kind, TokenKind::Error);
        assert_eq!(t.literal, "$");
        assert_eq!(lexer.errors().len(), 1);
    }

    #[test]
    fn test_token_ranges() {
        let mut lexer = Lexer::new("let answer", "test.sn");
        let t = lexer.next_token();
        assert_eq!(t.range.from, Pos::new(0, 1, 1));
        assert_eq!(t.range.to, Pos::new(3, 1, 4));
        let t = lexer.next_token();
        assert_eq!(t.range.from, Pos::new(4, 1, 5));
        assert_eq!(t.range.to, Pos::new(10, 1, 11));
        assert_eq!(t.range.file, "test.sn");
    }

    #[test]
    fn test_multiline_positions() {
        let mut lexer = Lexer::new("a\n  b", "test.sn");
        lexer.next_token();
        let t = lexer.next_token();
        assert_eq!(t.range.from.line, 2);
        assert_eq!(t.range.from.column, 3);
    }

    #[test]
    fn test_eof() {
        let mut lexer = Lexer::new("  ", "test.sn");
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
    }
}
