//! Tokens and source positions.
//!
//! The lexer produces [`Token`]s, each carrying a [`TokenKind`], the
//! literal source text, and a [`Range`] that names the originating file
//! and the positions of the first and one-past-last consumed characters.
//!
//! # Example
//!
//! ```rust
//! use sentrie::token::{lookup_keyword, TokenKind};
//!
//! assert_eq!(lookup_keyword("policy"), Some(TokenKind::Policy));
//! assert_eq!(lookup_keyword("allow"), None);
//! ```

use std::fmt;

use serde::Serialize;

/// A position in a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Pos {
    /// Byte offset from the start of the file.
    pub offset: usize,
    /// Line number, 1-based.
    pub line: u32,
    /// Column number, 1-based, counted in characters.
    pub column: u32,
}

impl Pos {
    /// Creates a position.
    pub fn new(offset: usize, line: u32, column: u32) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A half-open range of source text within one file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Range {
    /// The program reference the range belongs to, usually a file path.
    pub file: String,
    /// Position of the first consumed character.
    pub from: Pos,
    /// Position one past the last consumed character.
    pub to: Pos,
}

impl Range {
    /// Creates a range.
    pub fn new(file: impl Into<String>, from: Pos, to: Pos) -> Self {
        Self {
            file: file.into(),
            from,
            to,
        }
    }

    /// Merges two ranges into one covering both.
    ///
    /// Both ranges must come from the same file; the result keeps `self`'s
    /// file reference.
    pub fn merge(&self, other: &Range) -> Range {
        let from = if self.from.offset <= other.from.offset {
            self.from
        } else {
            other.from
        };
        let to = if self.to.offset >= other.to.offset {
            self.to
        } else {
            other.to
        };
        Range {
            file: self.file.clone(),
            from,
            to,
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.from)
    }
}

/// The category of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    // === Punctuation ===
    /// Left parenthesis `(`
    LParen,
    /// Right parenthesis `)`
    RParen,
    /// Left brace `{`
    LBrace,
    /// Right brace `}`
    RBrace,
    /// Left bracket `[`
    LBracket,
    /// Right bracket `]`
    RBracket,
    /// Comma `,`
    Comma,
    /// Semicolon `;`
    Semicolon,
    /// Colon `:`
    Colon,
    /// Member access `.`
    Dot,
    /// Constraint marker `@`
    At,
    /// Ellipsis `...`
    Ellipsis,

    // === Operators ===
    /// Plus `+`
    Plus,
    /// Minus `-`
    Minus,
    /// Star `*`
    Star,
    /// Slash `/`
    Slash,
    /// Percent `%`
    Percent,
    /// Assignment `=`
    Assign,
    /// Equality `==`
    Eq,
    /// Inequality `!=`
    NotEq,
    /// Less than `<`
    Lt,
    /// Less than or equal `<=`
    LtEq,
    /// Greater than `>`
    Gt,
    /// Greater than or equal `>=`
    GtEq,
    /// Ternary marker `?`
    Question,
    /// Bang `!`
    Bang,

    // === Declaration keywords ===
    /// The `namespace` keyword
    Namespace,
    /// The `policy` keyword
    Policy,
    /// The `shape` keyword
    Shape,
    /// The `rule` keyword
    Rule,
    /// The `let` keyword
    Let,
    /// The `fact` keyword
    Fact,
    /// The `use` keyword
    Use,
    /// The `from` keyword
    From,
    /// The `as` keyword
    As,
    /// The `with` keyword
    With,
    /// The `export` keyword
    Export,
    /// The `default` keyword
    Default,
    /// The `when` keyword
    When,

    // === Logic keywords ===
    /// The `and` keyword
    And,
    /// The `or` keyword
    Or,
    /// The `xor` keyword
    Xor,
    /// The `not` keyword
    Not,

    // === Membership and matching keywords ===
    /// The `in` keyword
    In,
    /// The `contains` keyword
    Contains,
    /// The `matches` keyword
    Matches,

    // === Quantifier and collection keywords ===
    /// The `any` quantifier
    Any,
    /// The `all` quantifier
    All,
    /// The `filter` keyword
    Filter,
    /// The `map` keyword (collection op and type constructor)
    Map,
    /// The `distinct` keyword
    Distinct,
    /// The `reduce` keyword
    Reduce,
    /// The `count` keyword
    Count,

    // === Literal keywords ===
    /// The `true` literal
    True,
    /// The `false` literal
    False,
    /// The `unknown` literal
    Unknown,

    // === Presence keywords ===
    /// The `is` keyword
    Is,
    /// The `defined` keyword
    Defined,
    /// The `empty` keyword
    Empty,

    // === Type keywords ===
    /// The `list` type constructor
    List,
    /// The `string` type
    StringType,
    /// The `number` type
    NumberType,
    /// The `boolean` type
    BooleanType,
    /// The `trinary` type
    TrinaryType,

    // === Literals ===
    /// An identifier
    Ident,
    /// An integer literal
    Int,
    /// A float literal
    Float,
    /// A string literal (quoted or heredoc)
    String,

    // === Comments ===
    /// A `--` comment with only whitespace before it on its line
    LineComment,
    /// A `--` comment following code on the same line
    TrailingComment,

    // === Special ===
    /// End of file
    Eof,
    /// Unrecognized input
    Error,
}

impl TokenKind {
    /// True for the two comment kinds.
    pub fn is_comment(self) -> bool {
        matches!(self, TokenKind::LineComment | TokenKind::TrailingComment)
    }

    /// True for keywords that open a statement, used for error recovery.
    pub fn starts_statement(self) -> bool {
        matches!(
            self,
            TokenKind::Namespace
                | TokenKind::Policy
                | TokenKind::Shape
                | TokenKind::Rule
                | TokenKind::Let
                | TokenKind::Fact
                | TokenKind::Use
                | TokenKind::Export
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Comma => ",",
            TokenKind::Semicolon => ";",
            TokenKind::Colon => ":",
            TokenKind::Dot => ".",
            TokenKind::At => "@",
            TokenKind::Ellipsis => "...",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Assign => "=",
            TokenKind::Eq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::Lt => "<",
            TokenKind::LtEq => "<=",
            TokenKind::Gt => ">",
            TokenKind::GtEq => ">=",
            TokenKind::Question => "?",
            TokenKind::Bang => "!",
            TokenKind::Namespace => "namespace",
            TokenKind::Policy => "policy",
            TokenKind::Shape => "shape",
            TokenKind::Rule => "rule",
            TokenKind::Let => "let",
            TokenKind::Fact => "fact",
            TokenKind::Use => "use",
            TokenKind::From => "from",
            TokenKind::As => "as",
            TokenKind::With => "with",
            TokenKind::Export => "export",
            TokenKind::Default => "default",
            TokenKind::When => "when",
            TokenKind::And => "and",
            TokenKind::Or => "or",
            TokenKind::Xor => "xor",
            TokenKind::Not => "not",
            TokenKind::In => "in",
            TokenKind::Contains => "contains",
            TokenKind::Matches => "matches",
            TokenKind::Any => "any",
            TokenKind::All => "all",
            TokenKind::Filter => "filter",
            TokenKind::Map => "map",
            TokenKind::Distinct => "distinct",
            TokenKind::Reduce => "reduce",
            TokenKind::Count => "count",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Unknown => "unknown",
            TokenKind::Is => "is",
            TokenKind::Defined => "defined",
            TokenKind::Empty => "empty",
            TokenKind::List => "list",
            TokenKind::StringType => "string",
            TokenKind::NumberType => "number",
            TokenKind::BooleanType => "boolean",
            TokenKind::TrinaryType => "trinary",
            TokenKind::Ident => "identifier",
            TokenKind::Int => "integer",
            TokenKind::Float => "float",
            TokenKind::String => "string literal",
            TokenKind::LineComment => "comment",
            TokenKind::TrailingComment => "comment",
            TokenKind::Eof => "end of file",
            TokenKind::Error => "error",
        };
        write!(f, "{text}")
    }
}

/// Looks up the keyword kind for an identifier, if any.
pub fn lookup_keyword(ident: &str) -> Option<TokenKind> {
    Some(match ident {
        "namespace" => TokenKind::Namespace,
        "policy" => TokenKind::Policy,
        "shape" => TokenKind::Shape,
        "rule" => TokenKind::Rule,
        "let" => TokenKind::Let,
        "fact" => TokenKind::Fact,
        "use" => TokenKind::Use,
        "from" => TokenKind::From,
        "as" => TokenKind::As,
        "with" => TokenKind::With,
        "export" => TokenKind::Export,
        "default" => TokenKind::Default,
        "when" => TokenKind::When,
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "xor" => TokenKind::Xor,
        "not" => TokenKind::Not,
        "in" => TokenKind::In,
        "contains" => TokenKind::Contains,
        "matches" => TokenKind::Matches,
        "any" => TokenKind::Any,
        "all" => TokenKind::All,
        "filter" => TokenKind::Filter,
        "map" => TokenKind::Map,
        "distinct" => TokenKind::Distinct,
        "reduce" => TokenKind::Reduce,
        "count" => TokenKind::Count,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "unknown" => TokenKind::Unknown,
        "is" => TokenKind::Is,
        "defined" => TokenKind::Defined,
        "empty" => TokenKind::Empty,
        "list" => TokenKind::List,
        "string" => TokenKind::StringType,
        "number" => TokenKind::NumberType,
        "boolean" => TokenKind::BooleanType,
        "trinary" => TokenKind::TrinaryType,
        _ => return None,
    })
}

/// A lexical token.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The category of this token.
    pub kind: TokenKind,
    /// The literal text. For strings this is the unescaped content; for
    /// comments the text after `--`.
    pub literal: String,
    /// Source range from the first read position to the position after the
    /// last consumed character.
    pub range: Range,
}

impl Token {
    /// Creates a new token.
    pub fn new(kind: TokenKind, literal: impl Into<String>, range: Range) -> Self {
        Self {
            kind,
            literal: literal.into(),
            range,
        }
    }
}
