//! Parameter schema: binding supplied properties and describing the schema.
//!
//! The `parameter` field of a template is both a type and a set of defaults.
//! Binding checks user properties against it, fills defaults, and rejects
//! missing required fields. Introspection turns it into a flat list of
//! [`ParameterDecl`]s for reference documentation.

use serde::Serialize;
use serde_json::{Map, Value};

use super::ast::{Decl, Expr, Field, File, Label, ListElem};
use super::eval::{Eval, EvalError, Evaluator, kind_of, values_equal};

/// One documented parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterDecl {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Members of a struct parameter, or of the element struct of a list
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<ParameterDecl>,
}

impl ParameterDecl {
    /// Default rendered for tables; empty when there is none.
    pub fn default_display(&self) -> String {
        match &self.default {
            None => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// Describe every declared field of the template's `parameter` struct.
pub fn introspect(file: &File) -> Vec<ParameterDecl> {
    let mut decls = Vec::new();
    for field in file.top_fields("parameter") {
        if let Expr::Struct(members) = &field.value {
            collect_decls(file, members, &mut decls);
        }
    }
    decls
}

fn collect_decls(file: &File, members: &[Decl], out: &mut Vec<ParameterDecl>) {
    for member in members {
        match member {
            Decl::Field(field) => {
                let Some(name) = field.label.name() else {
                    continue;
                };
                // Chained or conditional declarations repeat earlier names
                if out.iter().any(|d| d.name == name) {
                    continue;
                }
                out.push(describe_field(file, name, field));
            }
            Decl::If { body, .. } => collect_decls(file, body, out),
            Decl::For { .. } | Decl::Embed(_) => {}
        }
    }
}

fn describe_field(file: &File, name: &str, field: &Field) -> ParameterDecl {
    let mut fields = Vec::new();
    if let Some(members) = element_struct(file, &field.value) {
        collect_decls(file, members, &mut fields);
    }

    ParameterDecl {
        name: name.to_string(),
        description: field.attrs.usage.clone().unwrap_or_default(),
        type_name: type_name(&field.value),
        required: !field.optional,
        default: default_literal(&field.value),
        fields,
    }
}

/// Struct whose members should be documented as nested parameters.
fn element_struct<'f>(file: &'f File, expr: &'f Expr) -> Option<&'f [Decl]> {
    match expr {
        Expr::Struct(members) if !is_map(members) => Some(members),
        Expr::List(elems) => match elems.as_slice() {
            [ListElem::Ellipsis(Some(inner))] => element_struct(file, inner),
            _ => None,
        },
        Expr::Ident(name) => element_struct(file, &file.top_field(name)?.value),
        Expr::Disjunction(disjuncts) => disjuncts
            .iter()
            .find_map(|d| element_struct(file, &d.expr)),
        _ => None,
    }
}

fn is_map(members: &[Decl]) -> bool {
    matches!(members, [Decl::Field(Field { label: Label::Pattern(_), .. })])
}

/// Type notation such as `string`, `int`, `[]string`, `map[string]int`,
/// or `"" or "Memory"` for enumerations.
pub fn type_name(expr: &Expr) -> String {
    match expr {
        Expr::Top => "_".into(),
        Expr::Type(basic) => basic.name().into(),
        Expr::Null => "null".into(),
        Expr::Bool(_) => "bool".into(),
        Expr::Int(_) => "int".into(),
        Expr::Float(_) => "float".into(),
        Expr::Str(_) => "string".into(),
        Expr::Ident(name) => name.clone(),
        Expr::Disjunction(disjuncts) => {
            let all_literal = disjuncts.iter().all(|d| d.expr.literal().is_some());
            if all_literal && disjuncts.len() > 1 {
                return disjuncts
                    .iter()
                    .filter_map(|d| d.expr.literal())
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(" or ");
            }
            let mut names: Vec<String> = Vec::new();
            for disjunct in disjuncts {
                if disjunct.default && disjunct.expr.literal().is_some() {
                    continue;
                }
                let name = type_name(&disjunct.expr);
                if !names.contains(&name) {
                    names.push(name);
                }
            }
            if names.is_empty() {
                // Only defaults: the type of the default value
                return disjuncts.first().map_or("_".into(), |d| type_name(&d.expr));
            }
            names.join(" or ")
        }
        Expr::List(elems) => match elems.as_slice() {
            [ListElem::Ellipsis(Some(inner))] => format!("[]{}", element_type_name(inner)),
            [ListElem::Ellipsis(None)] => "[]_".into(),
            _ => "list".into(),
        },
        Expr::Struct(members) => match members.as_slice() {
            [Decl::Field(Field {
                label: Label::Pattern(key),
                value,
                ..
            })] => format!("map[{}]{}", type_name(key), type_name(value)),
            _ => "object".into(),
        },
        Expr::Unify(left, right) => {
            let left = type_name(left);
            if left == "_" { type_name(right) } else { left }
        }
        _ => "_".into(),
    }
}

fn element_type_name(expr: &Expr) -> String {
    match expr {
        Expr::Struct(members) if !is_map(members) => "object".into(),
        other => type_name(other),
    }
}

/// Statically known default of a declaration.
fn default_literal(expr: &Expr) -> Option<Value> {
    match expr {
        Expr::Disjunction(disjuncts) => disjuncts
            .iter()
            .find(|d| d.default)
            .and_then(|d| d.expr.literal()),
        Expr::Unify(left, right) => default_literal(left).or_else(|| default_literal(right)),
        Expr::Null | Expr::Bool(_) | Expr::Int(_) | Expr::Float(_) | Expr::Str(_) => {
            expr.literal()
        }
        _ => None,
    }
}

// ============================================================================
// Binding
// ============================================================================

impl Evaluator<'_> {
    /// Check `provided` against the `parameter` schema and fill defaults.
    ///
    /// Templates without a `parameter` field accept any properties unchanged.
    pub(crate) fn bind_parameters(&mut self, provided: &Map<String, Value>) -> Eval<Value> {
        let file = self.file;
        let mut bound = provided.clone();

        self.path = vec!["parameter".to_string()];
        for field in file.top_fields("parameter") {
            bound = match &field.value {
                Expr::Struct(members) => self.bind_struct(members, Some(&bound))?,
                other => match self.check(other, &Value::Object(bound))? {
                    Value::Object(fields) => fields,
                    value => {
                        return Err(self.mismatch(&value, other));
                    }
                },
            };
        }
        self.path.clear();
        Ok(Value::Object(bound))
    }

    fn bind_struct(
        &mut self,
        members: &[Decl],
        provided: Option<&Map<String, Value>>,
    ) -> Eval<Map<String, Value>> {
        // Open struct: undeclared keys pass through
        let mut bound = provided.cloned().unwrap_or_default();

        // Siblings are visible to `if` guards inside the schema
        let mark = self.locals.len();
        let mut declared = Vec::new();
        declared_names(members, &mut declared);
        for name in declared {
            if !bound.contains_key(&name) {
                self.locals.push((name, None));
            }
        }
        self.locals
            .extend(bound.iter().map(|(k, v)| (k.clone(), Some(v.clone()))));
        let result = self.bind_members(members, provided, &mut bound);
        self.locals.truncate(mark);
        result?;
        Ok(bound)
    }

    fn bind_members(
        &mut self,
        members: &[Decl],
        provided: Option<&Map<String, Value>>,
        bound: &mut Map<String, Value>,
    ) -> Eval<()> {
        for member in members {
            match member {
                Decl::Field(field) => match &field.label {
                    Label::Ident(name) | Label::Str(name) => {
                        self.path.push(name.clone());
                        let result = self.bind_field(field, provided.and_then(|p| p.get(name)));
                        let path = self.path_string();
                        self.path.pop();
                        match result? {
                            Some(value) => {
                                self.locals.push((name.clone(), Some(value.clone())));
                                bound.insert(name.clone(), value);
                            }
                            None if field.optional => {}
                            None => {
                                return Err(EvalError::Schema {
                                    path,
                                    reason: "required parameter is not set".into(),
                                });
                            }
                        }
                    }
                    Label::Pattern(_) => {
                        let Some(provided) = provided else { continue };
                        for (key, value) in provided {
                            if is_declared(members, key) {
                                continue;
                            }
                            self.path.push(key.clone());
                            let result = self.check(&field.value, value);
                            self.path.pop();
                            bound.insert(key.clone(), result?);
                        }
                    }
                    Label::Dynamic(_) => {}
                },
                Decl::If { cond, body } => {
                    if self.condition(cond)? {
                        self.bind_members(body, provided, bound)?;
                    }
                }
                Decl::For { .. } | Decl::Embed(_) => {}
            }
        }
        Ok(())
    }

    fn bind_field(&mut self, field: &Field, provided: Option<&Value>) -> Eval<Option<Value>> {
        match provided {
            Some(value) => self.check(&field.value, value).map(Some),
            None if field.optional => Ok(None),
            None => self.default_for(&field.value),
        }
    }

    /// Value used when a required field is not supplied.
    fn default_for(&mut self, schema: &Expr) -> Eval<Option<Value>> {
        match schema {
            Expr::Disjunction(disjuncts) => match disjuncts.iter().find(|d| d.default) {
                Some(default) => self.eval(&default.expr),
                None => Ok(None),
            },
            Expr::Struct(members) if !is_map(members) => {
                self.bind_struct(members, None).map(|m| Some(Value::Object(m)))
            }
            Expr::Unify(left, right) => match self.default_for(left)? {
                Some(value) => Ok(Some(value)),
                None => self.default_for(right),
            },
            Expr::Ident(name) => {
                let file = self.file;
                match file.top_field(name) {
                    Some(helper) => self.default_for(&helper.value),
                    None => Ok(None),
                }
            }
            other => Ok(other.literal()),
        }
    }

    /// Check a supplied value against a schema expression.
    fn check(&mut self, schema: &Expr, value: &Value) -> Eval<Value> {
        match schema {
            Expr::Top => Ok(value.clone()),
            Expr::Type(basic) if basic.accepts(value) => Ok(value.clone()),
            Expr::Null | Expr::Bool(_) | Expr::Int(_) | Expr::Float(_) | Expr::Str(_)
                if schema.literal().is_some_and(|lit| values_equal(&lit, value)) =>
            {
                Ok(value.clone())
            }
            Expr::Disjunction(disjuncts) => {
                for disjunct in disjuncts {
                    if let Ok(checked) = self.check(&disjunct.expr, value) {
                        return Ok(checked);
                    }
                }
                Err(self.mismatch(value, schema))
            }
            Expr::Unify(left, right) => {
                let checked = self.check(left, value)?;
                self.check(right, &checked)
            }
            Expr::List(elems) => self.check_list(elems, value, schema),
            Expr::Struct(members) => match value {
                Value::Object(fields) => {
                    self.bind_struct(members, Some(fields)).map(Value::Object)
                }
                _ => Err(self.mismatch(value, schema)),
            },
            Expr::Ident(name) => {
                let file = self.file;
                match file.top_field(name) {
                    Some(helper) => self.check(&helper.value, value),
                    None => Ok(value.clone()),
                }
            }
            Expr::Select(..) | Expr::Index(..) | Expr::Binary(..) | Expr::Call(..) => {
                match self.eval(schema) {
                    Ok(Some(expected)) if !values_equal(&expected, value) => {
                        Err(self.mismatch(value, schema))
                    }
                    _ => Ok(value.clone()),
                }
            }
            _ => Err(self.mismatch(value, schema)),
        }
    }

    fn check_list(&mut self, elems: &[ListElem], value: &Value, schema: &Expr) -> Eval<Value> {
        let Value::Array(items) = value else {
            return Err(self.mismatch(value, schema));
        };

        let fixed: Vec<&Expr> = elems
            .iter()
            .filter_map(|e| match e {
                ListElem::Value(expr) => Some(expr),
                _ => None,
            })
            .collect();
        let rest = elems.iter().find_map(|e| match e {
            ListElem::Ellipsis(rest) => Some(rest.as_ref()),
            _ => None,
        });

        if items.len() < fixed.len() || (rest.is_none() && items.len() > fixed.len()) {
            return Err(EvalError::Schema {
                path: self.path_string(),
                reason: format!(
                    "expected a list of {} elements, found {}",
                    fixed.len(),
                    items.len()
                ),
            });
        }

        let mut checked = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let element_schema = fixed.get(i).copied().or(rest.flatten());
            self.path.push(format!("[{i}]"));
            let result = match element_schema {
                Some(element_schema) => self.check(element_schema, item),
                None => Ok(item.clone()),
            };
            self.path.pop();
            checked.push(result?);
        }
        Ok(Value::Array(checked))
    }

    fn mismatch(&self, value: &Value, schema: &Expr) -> EvalError {
        let shown = match value {
            Value::Object(_) | Value::Array(_) => kind_of(value).to_string(),
            scalar => scalar.to_string(),
        };
        EvalError::Schema {
            path: self.path_string(),
            reason: format!("{shown} does not satisfy {}", type_name(schema)),
        }
    }
}

fn declared_names(members: &[Decl], out: &mut Vec<String>) {
    for member in members {
        match member {
            Decl::Field(field) => {
                if let Some(name) = field.label.name() {
                    out.push(name.to_string());
                }
            }
            Decl::If { body, .. } => declared_names(body, out),
            _ => {}
        }
    }
}

fn is_declared(members: &[Decl], key: &str) -> bool {
    members.iter().any(|member| match member {
        Decl::Field(field) => field.label.name() == Some(key),
        Decl::If { body, .. } => is_declared(body, key),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::template::parser::parse;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn bind(source: &str, provided: Value) -> Eval<Value> {
        let file = parse(source).unwrap();
        let mut evaluator = Evaluator::new(&file, json!({}));
        let Value::Object(provided) = provided else {
            panic!("properties must be an object");
        };
        evaluator.bind_parameters(&provided)
    }

    const WEBSERVICE: &str = r#"
parameter: {
    // +usage=Which image would you like to use for your service
    // +short=i
    image: string

    // +usage=Commands to run in the container
    cmd?: [...string]

    // +usage=Which port do you want customer traffic sent to
    // +short=p
    port: *80 | int

    // +usage=Define arguments by using environment variables
    env?: [...{
        name:   string
        value?: string
    }]

    // +usage=Number of CPU units for the service
    cpu?: string
}
"#;

    #[test]
    fn test_bind_fills_defaults() {
        let bound = bind(WEBSERVICE, json!({"image": "nginx"})).unwrap();
        assert_eq!(bound, json!({"image": "nginx", "port": 80}));
    }

    #[test]
    fn test_bind_missing_required() {
        let err = bind(WEBSERVICE, json!({"port": 8080})).unwrap_err();
        assert_eq!(
            err,
            EvalError::Schema {
                path: "parameter.image".into(),
                reason: "required parameter is not set".into()
            }
        );
    }

    #[test]
    fn test_bind_type_mismatch() {
        let err = bind(WEBSERVICE, json!({"image": "nginx", "port": "eighty"})).unwrap_err();
        let EvalError::Schema { path, reason } = err else {
            panic!("expected schema error");
        };
        assert_eq!(path, "parameter.port");
        assert!(reason.contains("does not satisfy int"));
    }

    #[test]
    fn test_bind_list_elements_are_checked() {
        let err = bind(
            WEBSERVICE,
            json!({"image": "nginx", "env": [{"name": "A"}, {"value": "x"}]}),
        )
        .unwrap_err();
        assert_eq!(
            err,
            EvalError::Schema {
                path: "parameter.env[1].name".into(),
                reason: "required parameter is not set".into()
            }
        );
    }

    #[test]
    fn test_bind_keeps_undeclared_keys() {
        let bound = bind(WEBSERVICE, json!({"image": "nginx", "extra": true})).unwrap();
        assert_eq!(bound["extra"], json!(true));
    }

    #[test]
    fn test_bind_enum_disjunction() {
        let source = r#"parameter: medium: *"" | "Memory""#;
        assert_eq!(bind(source, json!({})).unwrap(), json!({"medium": ""}));
        assert_eq!(
            bind(source, json!({"medium": "Memory"})).unwrap(),
            json!({"medium": "Memory"})
        );
        assert!(bind(source, json!({"medium": "Disk"})).is_err());
    }

    #[test]
    fn test_bind_conditional_schema_fields() {
        let source = r#"
parameter: volumes?: [...{
    name: string
    type: *"emptyDir" | "pvc"
    if type == "pvc" {
        claimName: string
    }
}]
"#;
        assert!(bind(source, json!({"volumes": [{"name": "a"}]})).is_ok());
        let err = bind(source, json!({"volumes": [{"name": "a", "type": "pvc"}]})).unwrap_err();
        assert!(matches!(err, EvalError::Schema { ref path, .. } if path == "parameter.volumes[0].claimName"));
    }

    #[test]
    fn test_bind_map_pattern() {
        let source = r#"parameter: http: [string]: int"#;
        assert!(bind(source, json!({"http": {"/": 80}})).is_ok());
        assert!(bind(source, json!({"http": {"/": "80"}})).is_err());
    }

    #[test]
    fn test_bind_definition_reference() {
        let source = r#"
#Port: int
parameter: port: #Port
"#;
        assert!(bind(source, json!({"port": 80})).is_ok());
        assert!(bind(source, json!({"port": "x"})).is_err());
    }

    #[test]
    fn test_template_without_parameter_accepts_anything() {
        assert_eq!(
            bind("output: {}", json!({"a": 1})).unwrap(),
            json!({"a": 1})
        );
    }

    #[test]
    fn test_introspect_webservice() {
        let file = parse(WEBSERVICE).unwrap();
        let decls = introspect(&file);
        let names: Vec<_> = decls.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["image", "cmd", "port", "env", "cpu"]);

        let image = &decls[0];
        assert_eq!(image.type_name, "string");
        assert!(image.required);
        assert_eq!(
            image.description,
            "Which image would you like to use for your service"
        );

        let port = &decls[2];
        assert_eq!(port.type_name, "int");
        assert_eq!(port.default, Some(json!(80)));
        assert_eq!(port.default_display(), "80");

        let cmd = &decls[1];
        assert_eq!(cmd.type_name, "[]string");
        assert!(!cmd.required);

        let env = &decls[3];
        assert_eq!(env.type_name, "[]object");
        let env_fields: Vec<_> = env.fields.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(env_fields, vec!["name", "value"]);
    }

    #[test]
    fn test_optional_field_with_default() {
        let source = "parameter: {\n    replicas?: *1 | int\n}";
        let decls = introspect(&parse(source).unwrap());
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].name, "replicas");
        assert_eq!(decls[0].type_name, "int");
        assert!(!decls[0].required);
        assert_eq!(decls[0].default, Some(json!(1)));

        assert_eq!(bind(source, json!({})).unwrap(), json!({}));
        assert_eq!(
            bind(source, json!({"replicas": 3})).unwrap(),
            json!({"replicas": 3})
        );
    }

    #[test]
    fn test_type_names() {
        let file = parse(
            r#"
parameter: {
    http: [string]: int
    medium: *"" | "Memory"
    mode: *420 | int
    any: _
}
"#,
        )
        .unwrap();
        let decls = introspect(&file);
        let types: Vec<_> = decls.iter().map(|d| d.type_name.as_str()).collect();
        assert_eq!(types, vec!["map[string]int", r#""" or "Memory""#, "int", "_"]);
        assert_eq!(decls[1].default, Some(json!("")));
    }
}
