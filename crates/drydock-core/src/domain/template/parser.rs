//! Parser for definition templates using chumsky.
//!
//! Before parsing, a newline after a token that can end an operand becomes
//! a `,`, so fields are separated by newlines or commas and a `[` or `(` on
//! a fresh line never continues the previous expression. Comments that
//! start their own line are collected per following token; `// +key=value`
//! comments in front of a field become its [`Attributes`].

use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

use chumsky::error::{RichPattern, RichReason};
use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use super::ast::{
    Attributes, BasicType, BinaryOp, Decl, Disjunct, Expr, Field, File, ForClause, Label,
    ListElem, Span, StrPart, UnaryOp,
};
use super::lexer::{Token, tokenize};

/// Syntax error with its byte span and 1-based source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}: {}", self.line, self.column, self.message)
    }
}

impl std::error::Error for ParseError {}

type PResult<T> = Result<T, ParseError>;

type Extra<'a> = extra::Err<Rich<'a, Token>>;

/// Field attributes keyed by the offset of the label they precede.
type AttributeTable = HashMap<usize, Attributes>;

/// Parse a complete template.
pub fn parse(source: &str) -> PResult<File> {
    let eoi = source.len();
    let laid = lay_out(source, 0..eoi)?;
    let stream = Stream::from_iter(laid.tokens.into_iter())
        .map((eoi..eoi).into(), |(token, span): (Token, SimpleSpan)| (token, span));

    file_parser(source, &laid.attributes)
        .parse(stream)
        .into_result()
        .map_err(|errors| first_error(source, errors))
}

/// Parse a single standalone expression.
pub fn parse_expression(source: &str) -> PResult<Expr> {
    parse_expression_range(source, 0..source.len())
}

/// Expression in `source[range]`; spans stay relative to `source`.
fn parse_expression_range(source: &str, range: Range<usize>) -> PResult<Expr> {
    let eoi = range.end;
    let laid = lay_out(source, range)?;
    let stream = Stream::from_iter(laid.tokens.into_iter())
        .map((eoi..eoi).into(), |(token, span): (Token, SimpleSpan)| (token, span));

    expr_parser(source, &laid.attributes)
        .then_ignore(end())
        .parse(stream)
        .into_result()
        .map_err(|errors| first_error(source, errors))
}

// ----------------------------------------------------------------------------
// Token layout
// ----------------------------------------------------------------------------

struct Laid {
    tokens: Vec<(Token, SimpleSpan)>,
    attributes: AttributeTable,
}

/// Lex `source[range]`, turn line breaks into separators and pull comments
/// out of the token stream.
fn lay_out(source: &str, range: Range<usize>) -> PResult<Laid> {
    let start = range.start;
    let lexemes = tokenize(&source[range]).map_err(|err| {
        error_at(
            source,
            start + err.offset,
            format!("unexpected character `{}`", err.fragment),
        )
    })?;

    let mut tokens: Vec<(Token, SimpleSpan)> = Vec::with_capacity(lexemes.len());
    let mut attributes = AttributeTable::new();
    let mut pending: Vec<String> = Vec::new();
    let mut previous: Option<Token> = None;

    for lexeme in lexemes {
        let span = start + lexeme.span.start..start + lexeme.span.end;

        if lexeme.newline_before && previous.as_ref().is_some_and(ends_operand) {
            let at = tokens
                .last()
                .map_or(span.start, |(_, last)| last.into_range().end);
            tokens.push((Token::Comma, (at..at).into()));
            previous = Some(Token::Comma);
        }

        match lexeme.token {
            Token::Comment(text) => {
                // Trailing comments on a code line are dropped
                if lexeme.newline_before || tokens.is_empty() {
                    pending.push(text);
                }
            }
            token => {
                if !pending.is_empty() {
                    let mut attrs = Attributes::default();
                    for comment in pending.drain(..) {
                        attrs.absorb(&comment);
                    }
                    attributes.insert(span.start, attrs);
                }
                previous = Some(token.clone());
                tokens.push((token, span.into()));
            }
        }
    }

    Ok(Laid { tokens, attributes })
}

/// Tokens after which a line break ends the current field or element.
fn ends_operand(token: &Token) -> bool {
    matches!(
        token,
        Token::Ident(_)
            | Token::String(_)
            | Token::Int(_)
            | Token::Float(_)
            | Token::True
            | Token::False
            | Token::Null
            | Token::Bottom
            | Token::Ellipsis
            | Token::BraceClose
            | Token::BracketClose
            | Token::ParenClose
    )
}

// ----------------------------------------------------------------------------
// Grammar
// ----------------------------------------------------------------------------

fn file_parser<'a, I>(
    source: &'a str,
    attributes: &'a AttributeTable,
) -> impl Parser<'a, I, File, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let expr = expr_parser(source, attributes);
    decls_parser(expr, source, attributes)
        .then_ignore(end())
        .map(|decls| File { decls })
}

/// Struct members separated by commas.
fn decls_parser<'a, I, P>(
    expr: P,
    source: &'a str,
    attributes: &'a AttributeTable,
) -> impl Parser<'a, I, Vec<Decl>, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
    P: Parser<'a, I, Expr, Extra<'a>> + Clone + 'a,
{
    recursive(move |decls| {
        let block = decls.delimited_by(just(Token::BraceOpen), just(Token::BraceClose));

        let if_decl = just(Token::If)
            .ignore_then(expr.clone())
            .then(block.clone())
            .map(|(cond, body)| Decl::If { cond, body });

        let for_decl = for_clause(expr.clone())
            .then(block)
            .map(|(clause, body)| Decl::For { clause, body });

        let field = field_parser(expr.clone(), source, attributes).map(Decl::Field);

        // Order matters: a label is only a label when `:` follows it
        choice((if_decl, for_decl, field, expr.clone().map(Decl::Embed)))
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .boxed()
    })
}

struct LabelPart {
    label: Label,
    optional: bool,
    start: usize,
}

impl LabelPart {
    fn into_field(self, value: Expr, attrs: Attributes, end: usize) -> Field {
        Field {
            label: self.label,
            optional: self.optional,
            value,
            attrs,
            span: self.start..end,
        }
    }
}

/// `label: value`, `label?: value` and chained `a: b: value`.
fn field_parser<'a, I, P>(
    expr: P,
    source: &'a str,
    attributes: &'a AttributeTable,
) -> impl Parser<'a, I, Field, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
    P: Parser<'a, I, Expr, Extra<'a>> + Clone + 'a,
{
    let label = choice((
        select! { Token::Ident(name) => Label::Ident(name) },
        string_literal(source).map(string_label),
        expr.clone()
            .delimited_by(just(Token::BracketOpen), just(Token::BracketClose))
            .map(|pattern| Label::Pattern(Box::new(pattern))),
    ));

    let part = label
        .then(just(Token::Question).or_not())
        .then_ignore(just(Token::Colon))
        .map_with(|(label, question), e| LabelPart {
            label,
            optional: question.is_some(),
            start: e.span().into_range().start,
        });

    part.clone()
        .then(part.repeated().collect::<Vec<_>>())
        .then(expr)
        .map_with(move |((first, rest), value), e| {
            let attrs = attributes.get(&first.start).cloned().unwrap_or_default();
            chain_field(first, rest, value, attrs, e.span().into_range().end)
        })
}

/// Nest chained labels; the innermost field owns the value and attributes.
fn chain_field(
    first: LabelPart,
    mut rest: Vec<LabelPart>,
    value: Expr,
    attrs: Attributes,
    end: usize,
) -> Field {
    let (outer, innermost) = match rest.pop() {
        Some(last) => {
            let mut outer = vec![first];
            outer.extend(rest);
            (outer, last)
        }
        None => (Vec::new(), first),
    };

    let mut field = innermost.into_field(value, attrs, end);
    for part in outer.into_iter().rev() {
        field = part.into_field(
            Expr::Struct(vec![Decl::Field(field)]),
            Attributes::default(),
            end,
        );
    }
    field
}

fn string_label(expr: Expr) -> Label {
    match expr {
        Expr::Str(parts) => match parts.as_slice() {
            [StrPart::Lit(text)] => Label::Str(text.clone()),
            _ => Label::Dynamic(Box::new(Expr::Str(parts))),
        },
        other => Label::Dynamic(Box::new(other)),
    }
}

/// `for v in source` or `for k, v in source`
fn for_clause<'a, I, P>(expr: P) -> impl Parser<'a, I, ForClause, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
    P: Parser<'a, I, Expr, Extra<'a>> + Clone,
{
    let name = select! { Token::Ident(name) => name };

    just(Token::For)
        .ignore_then(name.clone())
        .then(just(Token::Comma).ignore_then(name).or_not())
        .then_ignore(just(Token::In))
        .then(expr)
        .map(|((first, second), source)| match second {
            Some(value) => ForClause {
                key: Some(first),
                value,
                source,
            },
            None => ForClause {
                key: None,
                value: first,
                source,
            },
        })
}

/// A quoted string with escapes resolved and `\(...)` interpolations parsed.
fn string_literal<'a, I>(source: &'a str) -> impl Parser<'a, I, Expr, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    select! { Token::String(raw) => raw }.try_map(move |raw: String, span: SimpleSpan| {
        decode_string(source, &raw, span.into_range().start + 1)
            .map_err(|err| Rich::custom(SimpleSpan::from(err.span), err.message))
    })
}

enum Suffix {
    Select(String),
    Index(Expr),
    Call(Vec<Expr>),
}

fn apply_suffix(expr: Expr, suffix: Suffix) -> Result<Expr, String> {
    Ok(match suffix {
        Suffix::Select(name) => Expr::Select(Box::new(expr), name),
        Suffix::Index(index) => Expr::Index(Box::new(expr), Box::new(index)),
        Suffix::Call(args) => match expr {
            Expr::Ident(name) => Expr::Call(name, args),
            _ => return Err("only named builtins can be called".into()),
        },
    })
}

fn name_expr(name: String) -> Expr {
    if name == "_" {
        Expr::Top
    } else if let Some(basic) = BasicType::from_ident(&name) {
        Expr::Type(basic)
    } else {
        Expr::Ident(name)
    }
}

/// A lone non-default disjunct is just its expression.
fn collapse_disjunction(mut disjuncts: Vec<Disjunct>) -> Expr {
    if disjuncts.len() == 1 && !disjuncts[0].default {
        if let Some(only) = disjuncts.pop() {
            return only.expr;
        }
    }
    Expr::Disjunction(disjuncts)
}

fn left_assoc<'a, I, P, O>(operand: P, op: O) -> impl Parser<'a, I, Expr, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
    P: Parser<'a, I, Expr, Extra<'a>> + Clone,
    O: Parser<'a, I, BinaryOp, Extra<'a>> + Clone,
{
    operand
        .clone()
        .then(op.then(operand).repeated().collect::<Vec<_>>())
        .map(|(first, rest)| {
            rest.into_iter().fold(first, |left, (op, right)| {
                Expr::Binary(op, Box::new(left), Box::new(right))
            })
        })
}

fn expr_parser<'a, I>(
    source: &'a str,
    attributes: &'a AttributeTable,
) -> impl Parser<'a, I, Expr, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    recursive(move |expr| {
        let block = decls_parser(expr.clone(), source, attributes)
            .delimited_by(just(Token::BraceOpen), just(Token::BraceClose));

        let element = choice((
            just(Token::Ellipsis)
                .ignore_then(expr.clone().or_not())
                .map(ListElem::Ellipsis),
            just(Token::If)
                .ignore_then(expr.clone())
                .then(block.clone())
                .map(|(cond, body)| ListElem::If { cond, body }),
            for_clause(expr.clone())
                .then(block.clone())
                .map(|(clause, body)| ListElem::For { clause, body }),
            expr.clone().map(ListElem::Value),
        ));

        let list = element
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::BracketOpen), just(Token::BracketClose))
            .map(Expr::List);

        let literal = select! {
            Token::Null => Expr::Null,
            Token::True => Expr::Bool(true),
            Token::False => Expr::Bool(false),
            Token::Int(value) => Expr::Int(value),
            Token::Float(value) => Expr::Float(value),
            Token::Bottom => Expr::Bottom,
            Token::Ident(name) => name_expr(name),
        };

        let primary = choice((
            literal,
            string_literal(source),
            block.map(Expr::Struct),
            list,
            expr.clone()
                .delimited_by(just(Token::ParenOpen), just(Token::ParenClose)),
        ));

        let selector = just(Token::Dot).ignore_then(choice((
            select! { Token::Ident(name) => name },
            select! { Token::String(raw) => raw }.try_map(move |raw: String, span: SimpleSpan| {
                unescape(source, &raw, span.into_range().start + 1)
                    .map_err(|err| Rich::custom(SimpleSpan::from(err.span), err.message))
            }),
        )));

        let suffix = choice((
            selector.map(Suffix::Select),
            expr.clone()
                .delimited_by(just(Token::BracketOpen), just(Token::BracketClose))
                .map(Suffix::Index),
            expr.clone()
                .separated_by(just(Token::Comma))
                .allow_trailing()
                .collect::<Vec<_>>()
                .delimited_by(just(Token::ParenOpen), just(Token::ParenClose))
                .map(Suffix::Call),
        ));

        let postfix = primary
            .then(suffix.repeated().collect::<Vec<_>>())
            .try_map(|(base, suffixes), span: SimpleSpan| {
                suffixes
                    .into_iter()
                    .try_fold(base, apply_suffix)
                    .map_err(|message| Rich::custom(span, message))
            })
            .boxed();

        let unary = select! {
            Token::Bang => UnaryOp::Not,
            Token::Minus => UnaryOp::Neg,
        }
        .repeated()
        .collect::<Vec<_>>()
        .then(postfix)
        .map(|(ops, operand)| {
            ops.into_iter()
                .rev()
                .fold(operand, |expr, op| Expr::Unary(op, Box::new(expr)))
        });

        let product = left_assoc(
            unary,
            select! {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
            },
        );
        let sum = left_assoc(
            product,
            select! {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
            },
        )
        .boxed();
        let comparison = left_assoc(
            sum,
            select! {
                Token::EqEq => BinaryOp::Eq,
                Token::NotEq => BinaryOp::Ne,
                Token::Less => BinaryOp::Lt,
                Token::LessOrEqual => BinaryOp::Le,
                Token::Greater => BinaryOp::Gt,
                Token::GreaterOrEqual => BinaryOp::Ge,
            },
        );
        let conjunction = left_assoc(comparison, just(Token::AndAnd).to(BinaryOp::And));
        let logical = left_assoc(conjunction, just(Token::OrOr).to(BinaryOp::Or));

        let unification = logical
            .clone()
            .then(
                just(Token::Amp)
                    .ignore_then(logical)
                    .repeated()
                    .collect::<Vec<_>>(),
            )
            .map(|(first, rest)| {
                rest.into_iter()
                    .fold(first, |left, right| Expr::Unify(Box::new(left), Box::new(right)))
            });

        just(Token::Star)
            .or_not()
            .then(unification)
            .map(|(star, expr)| Disjunct {
                default: star.is_some(),
                expr,
            })
            .separated_by(just(Token::Pipe))
            .at_least(1)
            .collect::<Vec<_>>()
            .map(collapse_disjunction)
            .boxed()
    })
}

// ----------------------------------------------------------------------------
// Strings
// ----------------------------------------------------------------------------

/// `content_start` is the source offset of the first byte after the quote.
fn decode_string(source: &str, raw: &str, content_start: usize) -> PResult<Expr> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut chars = raw.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c != '\\' {
            literal.push(c);
            continue;
        }
        match chars.next() {
            Some((open, '(')) => {
                let close = matching_paren(raw, open).ok_or_else(|| {
                    error_at(source, content_start + i, "unterminated interpolation".into())
                })?;
                let expr = parse_expression_range(
                    source,
                    content_start + open + 1..content_start + close,
                )?;
                if !literal.is_empty() {
                    parts.push(StrPart::Lit(std::mem::take(&mut literal)));
                }
                parts.push(StrPart::Interp(expr));
                while chars.next_if(|&(idx, _)| idx <= close).is_some() {}
            }
            Some((_, escaped)) => {
                literal.push(escape(source, escaped, &mut chars, content_start + i)?);
            }
            None => {
                return Err(error_at(source, content_start + i, "dangling escape".into()));
            }
        }
    }

    if !literal.is_empty() || parts.is_empty() {
        parts.push(StrPart::Lit(literal));
    }
    Ok(Expr::Str(parts))
}

/// Selector strings: escapes only, no interpolation.
fn unescape(source: &str, raw: &str, content_start: usize) -> PResult<String> {
    match decode_string(source, raw, content_start)? {
        Expr::Str(parts) => match parts.as_slice() {
            [StrPart::Lit(text)] => Ok(text.clone()),
            _ => Err(error_at(
                source,
                content_start,
                "interpolation is not allowed in selectors".into(),
            )),
        },
        _ => Err(error_at(source, content_start, "invalid label".into())),
    }
}

fn escape(
    source: &str,
    escaped: char,
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    offset: usize,
) -> PResult<char> {
    Ok(match escaped {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '"' => '"',
        '\\' => '\\',
        '/' => '/',
        'u' => {
            let hex: String = (0..4).filter_map(|_| chars.next().map(|(_, c)| c)).collect();
            u32::from_str_radix(&hex, 16)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| {
                    error_at(source, offset, format!("invalid unicode escape `\\u{hex}`"))
                })?
        }
        other => {
            return Err(error_at(
                source,
                offset,
                format!("unknown escape sequence `\\{other}`"),
            ));
        }
    })
}

/// Index of the `)` closing the `(` at `open`.
fn matching_paren(raw: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in raw[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

// ----------------------------------------------------------------------------
// Errors
// ----------------------------------------------------------------------------

fn first_error(source: &str, errors: Vec<Rich<'_, Token>>) -> ParseError {
    errors.into_iter().next().map_or_else(
        || error_at(source, source.len(), "invalid template".into()),
        |err| syntax_error(source, &err),
    )
}

fn syntax_error(source: &str, err: &Rich<'_, Token>) -> ParseError {
    let span = err.span().into_range();
    let message = match err.reason() {
        RichReason::Custom(message) => message.to_string(),
        _ => {
            let found = err
                .found()
                .map_or_else(|| "end of input".to_string(), |token| token.describe());
            let mut expected: Vec<String> = err
                .expected()
                .filter_map(|pattern| match pattern {
                    RichPattern::Token(token) => Some(token.describe()),
                    RichPattern::EndOfInput => Some("end of input".to_string()),
                    _ => None,
                })
                .collect();
            expected.sort();
            expected.dedup();
            match expected.len() {
                1..=4 => format!("unexpected {found}, expected {}", expected.join(" or ")),
                _ => format!("unexpected {found}"),
            }
        }
    };

    let mut error = error_at(source, span.start, message);
    error.span = span.start.min(source.len())..span.end.min(source.len());
    error
}

fn error_at(source: &str, offset: usize, message: String) -> ParseError {
    let offset = offset.min(source.len());
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let column = before.rfind('\n').map_or(offset, |nl| offset - nl - 1) + 1;
    ParseError {
        message,
        span: offset..offset,
        line,
        column,
    }
}
