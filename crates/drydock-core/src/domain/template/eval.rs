//! Template evaluation.
//!
//! Produces concrete documents from a parsed template, a bound `parameter`
//! value and a `context` value. An expression evaluates to `None` when it is
//! bottom or refers to something absent; presence checks (`x != _|_`) and
//! `if` guards treat that as "not present" instead of failing.

use serde_json::{Map, Number, Value};
use tracing::trace;

use super::ast::{
    BinaryOp, Decl, Disjunct, Expr, Field, File, ForClause, Label, ListElem, StrPart, UnaryOp,
};
use super::merge::{LIST_ELEMENT, Patch, PatchDirective};

/// Top-level fields that are rendered; everything else is a helper.
const RENDERED_FIELDS: [&str; 3] = ["output", "outputs", "patch"];

/// Failure inside the evaluator, before it is tied to a definition name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EvalError {
    /// Parameters do not satisfy the schema, or a required value is missing.
    Schema { path: String, reason: String },
    /// The template itself is inconsistent.
    Template(String),
}

pub(crate) type Eval<T> = Result<T, EvalError>;

/// Rendered pieces of a template.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EvalResult {
    /// The primary document (`output`).
    pub output: Option<Value>,
    /// Auxiliary documents (`outputs`) in declaration order.
    pub outputs: Vec<(String, Value)>,
    /// Patch to merge into the workload (`patch`).
    pub patch: Option<Patch>,
}

pub(crate) struct Evaluator<'a> {
    pub(super) file: &'a File,
    pub(super) parameter: Value,
    context: Value,
    /// Comprehension bindings and schema siblings; `None` marks a declared
    /// but absent value.
    pub(super) locals: Vec<(String, Option<Value>)>,
    pub(super) path: Vec<String>,
    directives: Vec<(Vec<String>, PatchDirective)>,
    output_order: Vec<String>,
    resolving: Vec<String>,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(file: &'a File, context: Value) -> Self {
        Self {
            file,
            parameter: Value::Object(Map::new()),
            context,
            locals: Vec::new(),
            path: Vec::new(),
            directives: Vec::new(),
            output_order: Vec::new(),
            resolving: Vec::new(),
        }
    }

    pub(crate) fn set_parameter(&mut self, parameter: Value) {
        self.parameter = parameter;
    }

    /// Evaluate the rendered top-level fields.
    pub(crate) fn run(mut self) -> Eval<EvalResult> {
        let mut top = Map::new();
        let file = self.file;
        self.eval_decls(&file.decls, &mut top, true)?;

        let output = top.remove("output");

        let outputs = match top.remove("outputs") {
            None => Vec::new(),
            Some(Value::Object(mut named)) => {
                let mut ordered = Vec::with_capacity(named.len());
                for name in &self.output_order {
                    if let Some(doc) = named.remove(name) {
                        ordered.push((name.clone(), doc));
                    }
                }
                // Anything not seen through a field insert, e.g. an embedded struct
                ordered.extend(named);
                ordered
            }
            Some(other) => {
                return Err(EvalError::Template(format!(
                    "`outputs` must be a struct, found {}",
                    kind_of(&other)
                )));
            }
        };

        let patch = top.remove("patch").map(|document| {
            let mut patch = Patch::new(document);
            for (path, directive) in self.directives.drain(..) {
                if path.first().map(String::as_str) == Some("patch") {
                    patch.insert_directive(path[1..].to_vec(), directive);
                }
            }
            patch
        });

        Ok(EvalResult {
            output,
            outputs,
            patch,
        })
    }

    // ------------------------------------------------------------------------
    // Structs
    // ------------------------------------------------------------------------

    fn eval_decls(&mut self, decls: &[Decl], out: &mut Map<String, Value>, top: bool) -> Eval<()> {
        for decl in decls {
            match decl {
                Decl::Field(field) => self.eval_field(field, out, top)?,
                Decl::If { cond, body } => {
                    if self.condition(cond)? {
                        self.eval_decls(body, out, top)?;
                    }
                }
                Decl::For { clause, body } => {
                    for bindings in self.iterate(clause)? {
                        let mark = self.locals.len();
                        self.locals.extend(bindings);
                        let result = self.eval_decls(body, out, top);
                        self.locals.truncate(mark);
                        result?;
                    }
                }
                Decl::Embed(expr) if !top => match self.eval(expr)? {
                    Some(Value::Object(fields)) => {
                        for (key, value) in fields {
                            self.insert(out, key, value)?;
                        }
                    }
                    Some(other) => {
                        return Err(EvalError::Template(format!(
                            "cannot embed {} in a struct at {}",
                            kind_of(&other),
                            self.path_string()
                        )));
                    }
                    None => return Err(self.incomplete(expr)),
                },
                Decl::Embed(_) => {}
            }
        }
        Ok(())
    }

    fn eval_field(&mut self, field: &Field, out: &mut Map<String, Value>, top: bool) -> Eval<()> {
        let name = match &field.label {
            Label::Ident(name) | Label::Str(name) => name.clone(),
            Label::Dynamic(expr) => match self.eval(expr)? {
                Some(Value::String(name)) => name,
                Some(other) => {
                    return Err(EvalError::Template(format!(
                        "field label must be a string, found {}",
                        kind_of(&other)
                    )));
                }
                None => return Err(self.incomplete(expr)),
            },
            // Constraints only
            Label::Pattern(_) => return Ok(()),
        };

        if field.optional || (top && !RENDERED_FIELDS.contains(&name.as_str())) {
            return Ok(());
        }

        let in_outputs = self.path.len() == 1 && self.path[0] == "outputs";
        self.path.push(name.clone());
        if field.attrs.has_patch_directive() {
            self.directives.push((
                self.path.clone(),
                PatchDirective {
                    key: field.attrs.patch_key.clone(),
                    strategy: field.attrs.patch_strategy,
                },
            ));
        }

        let result = match self.eval(&field.value) {
            Ok(Some(value)) => self.insert(out, name.clone(), value),
            Ok(None) => Err(self.incomplete(&field.value)),
            Err(err) => Err(err),
        };
        self.path.pop();
        result?;

        if in_outputs && !self.output_order.contains(&name) {
            self.output_order.push(name);
        }
        Ok(())
    }

    /// Insert a field, unifying with an earlier declaration of the same label.
    fn insert(&self, out: &mut Map<String, Value>, key: String, value: Value) -> Eval<()> {
        match out.get_mut(&key) {
            Some(existing) => unify(existing, value).map_err(|reason| {
                EvalError::Template(format!("{reason} at {}", self.child_path(&key)))
            }),
            None => {
                out.insert(key, value);
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------------

    pub(super) fn eval(&mut self, expr: &Expr) -> Eval<Option<Value>> {
        Ok(match expr {
            Expr::Null => Some(Value::Null),
            Expr::Bool(b) => Some(Value::Bool(*b)),
            Expr::Int(i) => Some(Value::from(*i)),
            Expr::Float(f) => Some(Value::Number(Number::from_f64(*f).ok_or_else(|| {
                EvalError::Template(format!("invalid number {f}"))
            })?)),
            Expr::Str(parts) => self.interpolate(parts)?,
            Expr::Bottom => None,
            Expr::Top | Expr::Type(_) => {
                return Err(EvalError::Schema {
                    path: self.path_string(),
                    reason: "value is not concrete".into(),
                });
            }
            Expr::Ident(name) => self.resolve(name)?,
            Expr::Select(base, field) => match self.eval(base)? {
                None => None,
                Some(Value::Object(mut fields)) => fields.remove(field),
                Some(other) => {
                    return Err(EvalError::Template(format!(
                        "cannot select `{field}` from {} at {}",
                        kind_of(&other),
                        self.path_string()
                    )));
                }
            },
            Expr::Index(base, index) => {
                let base = self.eval(base)?;
                let index = self.eval(index)?;
                match (base, index) {
                    (None, _) | (_, None) => None,
                    (Some(Value::Object(mut fields)), Some(Value::String(key))) => {
                        fields.remove(&key)
                    }
                    (Some(Value::Array(mut items)), Some(Value::Number(n))) => {
                        match n.as_u64().and_then(|i| usize::try_from(i).ok()) {
                            Some(i) if i < items.len() => Some(items.swap_remove(i)),
                            _ => None,
                        }
                    }
                    (Some(base), Some(index)) => {
                        return Err(EvalError::Template(format!(
                            "cannot index {} with {} at {}",
                            kind_of(&base),
                            kind_of(&index),
                            self.path_string()
                        )));
                    }
                }
            }
            Expr::Struct(decls) => {
                let mut fields = Map::new();
                self.eval_decls(decls, &mut fields, false)?;
                Some(Value::Object(fields))
            }
            Expr::List(elems) => Some(self.eval_list(elems)?),
            Expr::Disjunction(disjuncts) => self.eval_disjunction(disjuncts)?,
            Expr::Unify(left, right) => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                match (left, right) {
                    (Some(mut left), Some(right)) => {
                        unify(&mut left, right).map_err(|reason| {
                            EvalError::Template(format!("{reason} at {}", self.path_string()))
                        })?;
                        Some(left)
                    }
                    _ => None,
                }
            }
            Expr::Unary(op, operand) => match (op, self.eval(operand)?) {
                (_, None) => None,
                (UnaryOp::Not, Some(Value::Bool(b))) => Some(Value::Bool(!b)),
                (UnaryOp::Neg, Some(Value::Number(n))) => Some(negate(&n)?),
                (op, Some(other)) => {
                    return Err(EvalError::Template(format!(
                        "operator {} cannot be applied to {}",
                        if *op == UnaryOp::Not { "!" } else { "-" },
                        kind_of(&other)
                    )));
                }
            },
            Expr::Binary(op, left, right) => self.eval_binary(*op, left, right)?,
            Expr::Call(name, args) => self.call(name, args)?,
        })
    }

    fn eval_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> Eval<Option<Value>> {
        // Presence checks never fail
        if matches!(op, BinaryOp::Eq | BinaryOp::Ne) {
            let checked = match (left, right) {
                (operand, Expr::Bottom) | (Expr::Bottom, operand) => Some(operand),
                _ => None,
            };
            if let Some(operand) = checked {
                let present = matches!(self.eval(operand), Ok(Some(_)));
                return Ok(Some(Value::Bool(present == (op == BinaryOp::Ne))));
            }
        }

        let Some(left) = self.eval(left)? else {
            return Ok(None);
        };

        // Short-circuit logical operators
        match (op, &left) {
            (BinaryOp::And, Value::Bool(false)) => return Ok(Some(Value::Bool(false))),
            (BinaryOp::Or, Value::Bool(true)) => return Ok(Some(Value::Bool(true))),
            _ => {}
        }

        let Some(right) = self.eval(right)? else {
            return Ok(None);
        };
        apply_binary(op, &left, &right)
            .map(Some)
            .map_err(|reason| EvalError::Template(format!("{reason} at {}", self.path_string())))
    }

    fn eval_disjunction(&mut self, disjuncts: &[Disjunct]) -> Eval<Option<Value>> {
        if let Some(default) = disjuncts.iter().find(|d| d.default) {
            return self.eval(&default.expr);
        }

        let mut concrete: Vec<Value> = Vec::new();
        for disjunct in disjuncts {
            if let Ok(Some(value)) = self.eval(&disjunct.expr) {
                if !concrete.iter().any(|seen| values_equal(seen, &value)) {
                    concrete.push(value);
                }
            }
        }
        match concrete.len() {
            0 | 1 => Ok(concrete.pop()),
            n => Err(EvalError::Template(format!(
                "ambiguous disjunction with {n} concrete values at {}",
                self.path_string()
            ))),
        }
    }

    fn eval_list(&mut self, elems: &[ListElem]) -> Eval<Value> {
        let mut items = Vec::new();
        self.path.push(LIST_ELEMENT.to_string());
        let result = self.collect_list(elems, &mut items);
        self.path.pop();
        result?;
        Ok(Value::Array(items))
    }

    fn collect_list(&mut self, elems: &[ListElem], items: &mut Vec<Value>) -> Eval<()> {
        for elem in elems {
            match elem {
                ListElem::Value(expr) => match self.eval(expr)? {
                    Some(value) => items.push(value),
                    None => return Err(self.incomplete(expr)),
                },
                ListElem::Ellipsis(_) => {}
                ListElem::If { cond, body } => {
                    if self.condition(cond)? {
                        items.push(self.eval_element_body(body)?);
                    }
                }
                ListElem::For { clause, body } => {
                    for bindings in self.iterate(clause)? {
                        let mark = self.locals.len();
                        self.locals.extend(bindings);
                        let value = self.eval_element_body(body);
                        self.locals.truncate(mark);
                        items.push(value?);
                    }
                }
            }
        }
        Ok(())
    }

    /// Body of a list comprehension: a lone embedded value or a struct.
    fn eval_element_body(&mut self, body: &[Decl]) -> Eval<Value> {
        if let [Decl::Embed(expr)] = body {
            return match self.eval(expr)? {
                Some(value) => Ok(value),
                None => Err(self.incomplete(expr)),
            };
        }
        let mut fields = Map::new();
        self.eval_decls(body, &mut fields, false)?;
        Ok(Value::Object(fields))
    }

    /// Evaluate an `if` guard; absent values count as false.
    pub(super) fn condition(&mut self, cond: &Expr) -> Eval<bool> {
        match self.eval(cond)? {
            Some(Value::Bool(b)) => Ok(b),
            None => Ok(false),
            Some(other) => Err(EvalError::Template(format!(
                "condition must be a bool, found {} at {}",
                kind_of(&other),
                self.path_string()
            ))),
        }
    }

    /// Bindings for each iteration of a comprehension; absent sources yield none.
    fn iterate(&mut self, clause: &ForClause) -> Eval<Vec<Vec<(String, Option<Value>)>>> {
        let entries: Vec<(Value, Value)> = match self.eval(&clause.source)? {
            None => {
                trace!(path = %self.path_string(), "comprehension source absent");
                Vec::new()
            }
            Some(Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| (Value::from(i), item))
                .collect(),
            Some(Value::Object(fields)) => fields
                .into_iter()
                .map(|(k, v)| (Value::String(k), v))
                .collect(),
            Some(other) => {
                return Err(EvalError::Template(format!(
                    "cannot iterate over {} at {}",
                    kind_of(&other),
                    self.path_string()
                )));
            }
        };

        Ok(entries
            .into_iter()
            .map(|(key, value)| {
                let mut bindings = Vec::with_capacity(2);
                if let Some(key_name) = &clause.key {
                    bindings.push((key_name.clone(), Some(key)));
                }
                bindings.push((clause.value.clone(), Some(value)));
                bindings
            })
            .collect())
    }

    fn resolve(&mut self, name: &str) -> Eval<Option<Value>> {
        if let Some((_, value)) = self.locals.iter().rev().find(|(n, _)| n == name) {
            return Ok(value.clone());
        }
        match name {
            "parameter" => return Ok(Some(self.parameter.clone())),
            "context" => return Ok(Some(self.context.clone())),
            _ => {}
        }

        let file = self.file;
        let Some(field) = file.top_field(name) else {
            return Err(EvalError::Template(format!(
                "reference `{name}` not found at {}",
                self.path_string()
            )));
        };
        if self.resolving.iter().any(|n| n == name) {
            return Err(EvalError::Template(format!(
                "reference cycle through `{name}`"
            )));
        }

        // Helpers are evaluated on demand in their own scope
        self.resolving.push(name.to_string());
        let saved_path = std::mem::replace(&mut self.path, vec![name.to_string()]);
        let saved_locals = std::mem::take(&mut self.locals);
        let result = self.eval(&field.value);
        self.locals = saved_locals;
        self.path = saved_path;
        self.resolving.pop();
        result
    }

    fn interpolate(&mut self, parts: &[StrPart]) -> Eval<Option<Value>> {
        let mut text = String::new();
        for part in parts {
            match part {
                StrPart::Lit(literal) => text.push_str(literal),
                StrPart::Interp(expr) => match self.eval(expr)? {
                    None => return Ok(None),
                    Some(Value::String(s)) => text.push_str(&s),
                    Some(Value::Null) => text.push_str("null"),
                    Some(scalar @ (Value::Number(_) | Value::Bool(_))) => {
                        text.push_str(&scalar.to_string());
                    }
                    Some(other) => {
                        return Err(EvalError::Template(format!(
                            "cannot interpolate {} at {}",
                            kind_of(&other),
                            self.path_string()
                        )));
                    }
                },
            }
        }
        Ok(Some(Value::String(text)))
    }

    fn call(&mut self, name: &str, args: &[Expr]) -> Eval<Option<Value>> {
        match (name, args) {
            ("len", [arg]) => Ok(match self.eval(arg)? {
                None => None,
                Some(Value::String(s)) => Some(Value::from(s.chars().count())),
                Some(Value::Array(items)) => Some(Value::from(items.len())),
                Some(Value::Object(fields)) => Some(Value::from(fields.len())),
                Some(other) => {
                    return Err(EvalError::Template(format!(
                        "len() is not defined for {}",
                        kind_of(&other)
                    )));
                }
            }),
            ("len", _) => Err(EvalError::Template(
                "len() takes exactly one argument".into(),
            )),
            _ => Err(EvalError::Template(format!("unknown builtin `{name}`"))),
        }
    }

    // ------------------------------------------------------------------------
    // Paths and errors
    // ------------------------------------------------------------------------

    pub(super) fn path_string(&self) -> String {
        render_path(&self.path)
    }

    fn child_path(&self, key: &str) -> String {
        let mut path = self.path.clone();
        path.push(key.to_string());
        render_path(&path)
    }

    pub(super) fn incomplete(&self, expr: &Expr) -> EvalError {
        let reason = match expr.reference_path() {
            Some(reference) => format!("`{reference}` is not set"),
            None => "value is incomplete".to_string(),
        };
        EvalError::Schema {
            path: self.path_string(),
            reason,
        }
    }
}

/// Dotted path with `[]` for list elements, e.g. `spec.containers[].image`.
/// Segments that are already bracketed (`[2]`) attach without a dot.
pub(crate) fn render_path(path: &[String]) -> String {
    let mut rendered = String::new();
    for segment in path {
        if segment == LIST_ELEMENT {
            rendered.push_str("[]");
        } else if segment.starts_with('[') {
            rendered.push_str(segment);
        } else {
            if !rendered.is_empty() {
                rendered.push('.');
            }
            rendered.push_str(segment);
        }
    }
    rendered
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "struct",
    }
}

/// Structural equality where `1` and `1.0` are the same number.
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

/// Unify `incoming` into `target`: structs merge, equal values agree.
fn unify(target: &mut Value, incoming: Value) -> Result<(), String> {
    match (target, incoming) {
        (Value::Object(existing), Value::Object(fields)) => {
            for (key, value) in fields {
                match existing.get_mut(&key) {
                    Some(slot) => unify(slot, value)?,
                    None => {
                        existing.insert(key, value);
                    }
                }
            }
            Ok(())
        }
        (Value::Array(existing), Value::Array(items)) if existing.len() == items.len() => {
            for (slot, item) in existing.iter_mut().zip(items) {
                unify(slot, item)?;
            }
            Ok(())
        }
        (target, incoming) if values_equal(target, &incoming) => Ok(()),
        (target, incoming) => Err(format!("conflicting values {target} and {incoming}")),
    }
}

fn negate(n: &Number) -> Eval<Value> {
    if let Some(i) = n.as_i64() {
        return Ok(Value::from(-i));
    }
    n.as_f64()
        .and_then(|f| Number::from_f64(-f))
        .map(Value::Number)
        .ok_or_else(|| EvalError::Template(format!("cannot negate {n}")))
}

fn apply_binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, String> {
    use BinaryOp::*;

    match op {
        Eq => return Ok(Value::Bool(values_equal(left, right))),
        Ne => return Ok(Value::Bool(!values_equal(left, right))),
        And | Or => {
            return match (left, right) {
                (Value::Bool(a), Value::Bool(b)) => {
                    Ok(Value::Bool(if op == And { *a && *b } else { *a || *b }))
                }
                _ => Err(format!(
                    "logical operator needs bools, found {} and {}",
                    kind_of(left),
                    kind_of(right)
                )),
            };
        }
        _ => {}
    }

    match (left, right) {
        (Value::String(a), Value::String(b)) => match op {
            Add => Ok(Value::String(format!("{a}{b}"))),
            Lt => Ok(Value::Bool(a < b)),
            Le => Ok(Value::Bool(a <= b)),
            Gt => Ok(Value::Bool(a > b)),
            Ge => Ok(Value::Bool(a >= b)),
            _ => Err("unsupported operator on strings".to_string()),
        },
        (Value::Array(a), Value::Array(b)) if op == Add => {
            Ok(Value::Array(a.iter().chain(b).cloned().collect()))
        }
        (Value::Number(a), Value::Number(b)) => numeric(op, a, b),
        _ => Err(format!(
            "invalid operands {} and {}",
            kind_of(left),
            kind_of(right)
        )),
    }
}

fn numeric(op: BinaryOp, a: &Number, b: &Number) -> Result<Value, String> {
    use BinaryOp::*;

    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        let exact = match op {
            Add => x.checked_add(y),
            Sub => x.checked_sub(y),
            Mul => x.checked_mul(y),
            _ => None,
        };
        if let Some(result) = exact {
            return Ok(Value::from(result));
        }
        match op {
            Lt => return Ok(Value::Bool(x < y)),
            Le => return Ok(Value::Bool(x <= y)),
            Gt => return Ok(Value::Bool(x > y)),
            Ge => return Ok(Value::Bool(x >= y)),
            _ => {}
        }
    }

    let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) else {
        return Err("number out of range".to_string());
    };
    let result = match op {
        Add => x + y,
        Sub => x - y,
        Mul => x * y,
        Div if y == 0.0 => return Err("division by zero".to_string()),
        Div => x / y,
        Lt => return Ok(Value::Bool(x < y)),
        Le => return Ok(Value::Bool(x <= y)),
        Gt => return Ok(Value::Bool(x > y)),
        Ge => return Ok(Value::Bool(x >= y)),
        _ => return Err("unsupported numeric operator".to_string()),
    };
    Number::from_f64(result)
        .map(Value::Number)
        .ok_or_else(|| "arithmetic produced a non-finite number".to_string())
}
