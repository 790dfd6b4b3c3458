//! Expression evaluation for selection rules and endpoint templates.
//!
//! # Responsibilities
//! - Define the evaluation contract the core depends on
//! - Provide the built-in evaluator for `{#...}` expressions
//!
//! # Design Decisions
//! - The core depends only on the `TemplateEngine` trait; the concrete
//!   language is an injected capability
//! - Evaluation is the identity for strings without template markers
//! - Unknown references are errors; callers decide whether that means
//!   "non-match" (selection rules) or a failed resolution (endpoint targets)

use thiserror::Error;

use crate::context::attributes::{AttributeValue, Attributes};
use crate::context::GatewayRequest;

const MARKER_START: &str = "{#";
const MARKER_END: char = '}';

/// Errors produced while evaluating an expression.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("malformed expression: {0}")]
    Malformed(String),
    #[error("unknown reference: {0}")]
    UnknownReference(String),
    #[error("expression is not a boolean: {0}")]
    NotABoolean(String),
}

/// Variables an expression is evaluated against.
pub struct TemplateVars<'a> {
    request: &'a GatewayRequest,
    attributes: &'a Attributes,
}

impl<'a> TemplateVars<'a> {
    pub fn new(request: &'a GatewayRequest, attributes: &'a Attributes) -> Self {
        Self { request, attributes }
    }
}

/// Evaluation contract: `evaluate(expr, vars) -> value`.
pub trait TemplateEngine: Send + Sync {
    fn eval_string(&self, expression: &str, vars: &TemplateVars<'_>) -> Result<String, TemplateError>;

    fn eval_bool(&self, expression: &str, vars: &TemplateVars<'_>) -> Result<bool, TemplateError>;
}

/// Built-in evaluator.
///
/// Supports variable references of the form `{#request.path}`,
/// `{#request.method}`, `{#request.headers['name']}`,
/// `{#request.params['name']}` and `{#context.attributes['name']}`, plus
/// `==`/`!=` comparisons between a reference and a quoted literal inside a
/// single `{#...}` block.
#[derive(Debug, Default)]
pub struct BuiltinTemplateEngine;

impl BuiltinTemplateEngine {
    fn resolve(&self, path: &str, vars: &TemplateVars<'_>) -> Result<String, TemplateError> {
        let path = path.trim();
        if path == "request.path" {
            return Ok(vars.request.path.clone());
        }
        if path == "request.method" {
            return Ok(vars.request.method.as_str().to_string());
        }
        if path == "request.transaction" {
            return Ok(vars.request.transaction_id.clone());
        }
        if let Some(name) = indexed(path, "request.headers") {
            return vars
                .request
                .header(&name)
                .map(str::to_string)
                .ok_or_else(|| TemplateError::UnknownReference(path.to_string()));
        }
        if let Some(name) = indexed(path, "request.params") {
            return vars
                .request
                .params
                .get(&name)
                .cloned()
                .ok_or_else(|| TemplateError::UnknownReference(path.to_string()));
        }
        if let Some(name) = indexed(path, "context.attributes") {
            return vars
                .attributes
                .get(&name)
                .and_then(AttributeValue::as_text)
                .map(str::to_string)
                .ok_or_else(|| TemplateError::UnknownReference(path.to_string()));
        }
        Err(TemplateError::UnknownReference(path.to_string()))
    }

    fn eval_block(&self, block: &str, vars: &TemplateVars<'_>) -> Result<String, TemplateError> {
        let block = block.trim();
        for operator in ["==", "!="] {
            if let Some((lhs, rhs)) = block.split_once(operator) {
                let left = self.operand(lhs, vars)?;
                let right = self.operand(rhs, vars)?;
                let equal = left == right;
                let result = if operator == "==" { equal } else { !equal };
                return Ok(result.to_string());
            }
        }
        match block {
            "true" => Ok("true".to_string()),
            "false" => Ok("false".to_string()),
            path => self.resolve(path, vars),
        }
    }

    fn operand(&self, raw: &str, vars: &TemplateVars<'_>) -> Result<String, TemplateError> {
        let raw = raw.trim();
        if let Some(literal) = raw.strip_prefix('\'').and_then(|rest| rest.strip_suffix('\'')) {
            return Ok(literal.to_string());
        }
        self.resolve(raw, vars)
    }
}

impl TemplateEngine for BuiltinTemplateEngine {
    fn eval_string(&self, expression: &str, vars: &TemplateVars<'_>) -> Result<String, TemplateError> {
        if !expression.contains(MARKER_START) {
            return Ok(expression.to_string());
        }

        let mut output = String::with_capacity(expression.len());
        let mut rest = expression;
        while let Some(start) = rest.find(MARKER_START) {
            output.push_str(&rest[..start]);
            let after = &rest[start + MARKER_START.len()..];
            let end = after
                .find(MARKER_END)
                .ok_or_else(|| TemplateError::Malformed(expression.to_string()))?;
            output.push_str(&self.eval_block(&after[..end], vars)?);
            rest = &after[end + 1..];
        }
        output.push_str(rest);
        Ok(output)
    }

    fn eval_bool(&self, expression: &str, vars: &TemplateVars<'_>) -> Result<bool, TemplateError> {
        let value = self.eval_string(expression, vars)?;
        match value.trim() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(TemplateError::NotABoolean(other.to_string())),
        }
    }
}

fn indexed(path: &str, prefix: &str) -> Option<String> {
    path.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix("['"))
        .and_then(|rest| rest.strip_suffix("']"))
        .map(str::to_string)
}
