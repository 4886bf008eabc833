//! Lexer for the definition template language using logos.
//!
//! Comments are kept as tokens so the parser can read `// +usage=` style
//! attributes. Whitespace (including newlines) is skipped, but every lexeme
//! records whether a newline preceded it: newlines terminate fields, and a
//! `[` or `(` on a fresh line never continues the previous expression.

use logos::Logos;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    // Keywords
    #[token("if")]
    If,
    #[token("for")]
    For,
    #[token("in")]
    In,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    // Bottom must win over `_` followed by `|`
    #[token("_|_")]
    Bottom,

    // Delimiters
    #[token("{")]
    BraceOpen,
    #[token("}")]
    BraceClose,
    #[token("[")]
    BracketOpen,
    #[token("]")]
    BracketClose,
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("?")]
    Question,
    #[token("...")]
    Ellipsis,
    #[token(".")]
    Dot,

    // Operators (longer first)
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    LessOrEqual,
    #[token(">=")]
    GreaterOrEqual,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("|")]
    Pipe,
    #[token("&")]
    Amp,
    #[token("*")]
    Star,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("/")]
    Slash,
    #[token("!")]
    Bang,
    #[token("=")]
    Assign,

    // Literals - identifiers must come after keywords
    #[regex(r"#?[_$a-zA-Z][_$a-zA-Z0-9]*", |lex| lex.slice().to_string(), priority = 1)]
    Ident(String),

    /// Raw string body between the quotes; escapes and `\(...)`
    /// interpolations are resolved by the parser.
    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| {
        let s = lex.slice();
        s[1..s.len() - 1].to_string()
    })]
    String(String),

    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    /// Line comment text without the leading `//`, trimmed.
    #[regex(r"//[^\n]*", |lex| lex.slice()[2..].trim().to_string())]
    Comment(String),
}

impl Token {
    /// Short human-readable form used in parse errors.
    pub fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("identifier `{name}`"),
            Token::String(s) => format!("string \"{s}\""),
            Token::Int(i) => format!("number {i}"),
            Token::Float(f) => format!("number {f}"),
            Token::Comment(_) => "comment".into(),
            other => format!("`{}`", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Token::If => "if",
            Token::For => "for",
            Token::In => "in",
            Token::True => "true",
            Token::False => "false",
            Token::Null => "null",
            Token::Bottom => "_|_",
            Token::BraceOpen => "{",
            Token::BraceClose => "}",
            Token::BracketOpen => "[",
            Token::BracketClose => "]",
            Token::ParenOpen => "(",
            Token::ParenClose => ")",
            Token::Comma => ",",
            Token::Colon => ":",
            Token::Question => "?",
            Token::Ellipsis => "...",
            Token::Dot => ".",
            Token::EqEq => "==",
            Token::NotEq => "!=",
            Token::LessOrEqual => "<=",
            Token::GreaterOrEqual => ">=",
            Token::Less => "<",
            Token::Greater => ">",
            Token::AndAnd => "&&",
            Token::OrOr => "||",
            Token::Pipe => "|",
            Token::Amp => "&",
            Token::Star => "*",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Slash => "/",
            Token::Bang => "!",
            Token::Assign => "=",
            Token::Ident(_)
            | Token::String(_)
            | Token::Float(_)
            | Token::Int(_)
            | Token::Comment(_) => "literal",
        }
    }
}

/// A token with its span and line-break information.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub token: Token,
    pub span: Span,
    /// A newline appears between the previous lexeme and this one.
    pub newline_before: bool,
}

/// Source fragment the lexer could not recognise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub offset: usize,
    pub fragment: String,
}

/// Lex input string into lexemes.
pub fn tokenize(input: &str) -> Result<Vec<Lexeme>, LexError> {
    let mut lexemes = Vec::new();
    let mut previous_end = 0;

    for (token, span) in Token::lexer(input).spanned() {
        let token = token.map_err(|()| LexError {
            offset: span.start,
            fragment: input[span.clone()].to_string(),
        })?;
        let newline_before = input[previous_end..span.start].contains('\n');
        previous_end = span.end;
        lexemes.push(Lexeme {
            token,
            span,
            newline_before,
        });
    }

    Ok(lexemes)
}
