//! Syntax tree for definition templates.

use serde_json::Value;

pub use super::lexer::Span;

/// A parsed template file: an implicit top-level struct.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct File {
    pub decls: Vec<Decl>,
}

impl File {
    /// First unconditional top-level field with the given label.
    pub fn top_field<'a>(&'a self, name: &str) -> Option<&'a Field> {
        self.top_fields(name).next()
    }

    /// All unconditional top-level fields with the given label, in source order.
    pub fn top_fields<'a, 'n>(&'a self, name: &'n str) -> impl Iterator<Item = &'a Field> {
        self.decls.iter().filter_map(move |decl| match decl {
            Decl::Field(field) if field.label.name() == Some(name) => Some(field),
            _ => None,
        })
    }
}

/// A struct member.
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    Field(Field),
    If { cond: Expr, body: Vec<Decl> },
    For { clause: ForClause, body: Vec<Decl> },
    /// An expression embedded in a struct; its fields are merged in.
    Embed(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub label: Label,
    pub optional: bool,
    pub value: Expr,
    pub attrs: Attributes,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Label {
    Ident(String),
    Str(String),
    /// Interpolated string label, `"\(k)": v`
    Dynamic(Box<Expr>),
    /// `[K]: V` constraint applying to every field whose label matches `K`
    Pattern(Box<Expr>),
}

impl Label {
    /// Concrete field name, if this is not a pattern label.
    pub fn name(&self) -> Option<&str> {
        match self {
            Label::Ident(name) | Label::Str(name) => Some(name),
            Label::Dynamic(_) | Label::Pattern(_) => None,
        }
    }
}

/// Annotations read from `// +key=value` comments preceding a field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Attributes {
    pub usage: Option<String>,
    pub short: Option<String>,
    pub patch_key: Option<String>,
    pub patch_strategy: PatchStrategy,
}

impl Attributes {
    /// Applies one comment line; comments without a `+key=` prefix are ignored.
    pub fn absorb(&mut self, comment: &str) {
        let Some(rest) = comment.strip_prefix('+') else {
            return;
        };
        let (key, value) = match rest.split_once('=') {
            Some((key, value)) => (key.trim(), value.trim().to_string()),
            None => (rest.trim(), String::new()),
        };
        match key {
            "usage" => self.usage = Some(value),
            "short" => self.short = Some(value),
            "patchKey" => self.patch_key = Some(value),
            "patchStrategy" => {
                self.patch_strategy = if value.eq_ignore_ascii_case("replace") {
                    PatchStrategy::Replace
                } else {
                    PatchStrategy::Merge
                }
            }
            _ => {}
        }
    }

    pub fn has_patch_directive(&self) -> bool {
        self.patch_key.is_some() || self.patch_strategy == PatchStrategy::Replace
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatchStrategy {
    #[default]
    Merge,
    Replace,
}

/// `for k, v in source` or `for v in source`
#[derive(Debug, Clone, PartialEq)]
pub struct ForClause {
    pub key: Option<String>,
    pub value: String,
    pub source: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListElem {
    Value(Expr),
    /// `...` or `...T`: the list is open, extra elements must satisfy `T`
    Ellipsis(Option<Expr>),
    If { cond: Expr, body: Vec<Decl> },
    For { clause: ForClause, body: Vec<Decl> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasicType {
    String,
    Int,
    Float,
    Number,
    Bool,
    Bytes,
}

impl BasicType {
    pub fn from_ident(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::String),
            "int" => Some(Self::Int),
            "float" => Some(Self::Float),
            "number" => Some(Self::Number),
            "bool" => Some(Self::Bool),
            "bytes" => Some(Self::Bytes),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Number => "number",
            Self::Bool => "bool",
            Self::Bytes => "bytes",
        }
    }

    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String | Self::Bytes => value.is_string(),
            Self::Int => value.is_i64() || value.is_u64(),
            Self::Float | Self::Number => value.is_number(),
            Self::Bool => value.is_boolean(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StrPart {
    Lit(String),
    Interp(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Disjunct {
    pub default: bool,
    pub expr: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Vec<StrPart>),
    /// `_|_`
    Bottom,
    /// `_`
    Top,
    Type(BasicType),
    Ident(String),
    Select(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Struct(Vec<Decl>),
    List(Vec<ListElem>),
    Disjunction(Vec<Disjunct>),
    Unify(Box<Expr>, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

impl Expr {
    pub fn string(text: impl Into<String>) -> Self {
        Expr::Str(vec![StrPart::Lit(text.into())])
    }

    /// Dotted form of a reference chain such as `parameter.image`.
    pub fn reference_path(&self) -> Option<String> {
        match self {
            Expr::Ident(name) => Some(name.clone()),
            Expr::Select(base, field) => Some(format!("{}.{field}", base.reference_path()?)),
            Expr::Index(base, index) => {
                let base = base.reference_path()?;
                match index.literal() {
                    Some(Value::String(key)) => Some(format!("{base}[\"{key}\"]")),
                    Some(Value::Number(n)) => Some(format!("{base}[{n}]")),
                    _ => Some(format!("{base}[...]")),
                }
            }
            _ => None,
        }
    }

    /// Value of a constant expression, without any evaluation context.
    ///
    /// Only literals and lists or structs built purely from literals qualify.
    pub fn literal(&self) -> Option<Value> {
        match self {
            Expr::Null => Some(Value::Null),
            Expr::Bool(b) => Some(Value::Bool(*b)),
            Expr::Int(i) => Some(Value::from(*i)),
            Expr::Float(f) => serde_json::Number::from_f64(*f).map(Value::Number),
            Expr::Str(parts) => match parts.as_slice() {
                [] => Some(Value::String(String::new())),
                [StrPart::Lit(text)] => Some(Value::String(text.clone())),
                _ => None,
            },
            Expr::Unary(UnaryOp::Neg, inner) => match inner.literal()? {
                Value::Number(n) => n
                    .as_i64()
                    .map(|i| Value::from(-i))
                    .or_else(|| n.as_f64().map(|f| Value::from(-f))),
                _ => None,
            },
            Expr::List(elems) => elems
                .iter()
                .map(|elem| match elem {
                    ListElem::Value(expr) => expr.literal(),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
            Expr::Struct(decls) => {
                let mut map = serde_json::Map::new();
                for decl in decls {
                    let Decl::Field(field) = decl else {
                        return None;
                    };
                    if field.optional {
                        continue;
                    }
                    map.insert(field.label.name()?.to_string(), field.value.literal()?);
                }
                Some(Value::Object(map))
            }
            _ => None,
        }
    }
}
