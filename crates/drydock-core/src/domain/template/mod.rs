//! Definition template language.
//!
//! A small declarative configuration language: structs, lists, typed
//! parameters with defaults, disjunctions, references, string
//! interpolation, `if`/`for` comprehensions, and unification of repeated
//! fields. A template declares a `parameter` schema and renders any of:
//!
//! - `output`: the primary document
//! - `outputs`: named auxiliary documents
//! - `patch`: a partial document merged into the workload
//!
//! ```text
//! source ──lexer──▶ tokens ──parser──▶ File ──┬──▶ bind parameter ──▶ evaluate
//!                                             └──▶ introspect ──▶ ParameterDecl
//! ```

pub mod ast;
mod eval;
pub mod lexer;
pub mod merge;
pub mod parser;
pub mod schema;

use serde_json::{Map, Value};

pub use eval::EvalResult;
pub use merge::{Patch, PatchDirective};
pub use parser::ParseError;
pub use schema::ParameterDecl;

use crate::domain::{DomainError, RenderContext};
use eval::{EvalError, Evaluator};

/// A parsed template, ready to be evaluated many times.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTemplate {
    name: String,
    file: ast::File,
}

impl CompiledTemplate {
    /// Parse `source`; `name` is the owning definition, used in errors.
    pub fn compile(name: impl Into<String>, source: &str) -> Result<Self, DomainError> {
        let name = name.into();
        let file = parser::parse(source).map_err(|err| DomainError::Template {
            definition: name.clone(),
            reason: err.to_string(),
        })?;
        Ok(Self { name, file })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameters in declaration order.
    pub fn parameters(&self) -> Vec<ParameterDecl> {
        schema::introspect(&self.file)
    }

    /// Bind `properties` to the parameter schema and render the template.
    pub fn evaluate(
        &self,
        properties: &Value,
        context: &RenderContext,
    ) -> Result<EvalResult, DomainError> {
        let provided = match properties {
            Value::Null => Map::new(),
            Value::Object(fields) => fields.clone(),
            other => {
                return Err(DomainError::Schema {
                    definition: self.name.clone(),
                    path: "parameter".into(),
                    reason: format!("properties must be a struct, found {other}"),
                });
            }
        };

        let mut evaluator = Evaluator::new(&self.file, context.to_value());
        let parameter = evaluator
            .bind_parameters(&provided)
            .map_err(|err| self.domain_error(err))?;
        evaluator.set_parameter(parameter);
        evaluator.run().map_err(|err| self.domain_error(err))
    }

    fn domain_error(&self, err: EvalError) -> DomainError {
        match err {
            EvalError::Schema { path, reason } => DomainError::Schema {
                definition: self.name.clone(),
                path,
                reason,
            },
            EvalError::Template(reason) => DomainError::Template {
                definition: self.name.clone(),
                reason,
            },
        }
    }
}

/// Compile and evaluate in one step.
pub fn evaluate(
    name: &str,
    source: &str,
    properties: &Value,
    context: &RenderContext,
) -> Result<EvalResult, DomainError> {
    CompiledTemplate::compile(name, source)?.evaluate(properties, context)
}

/// Compile and list the parameters of a template.
pub fn introspect(name: &str, source: &str) -> Result<Vec<ParameterDecl>, DomainError> {
    Ok(CompiledTemplate::compile(name, source)?.parameters())
}
