pub mod binding;
pub mod context;
pub mod debounce;
pub mod document;
pub mod engine;
pub mod errors;
pub mod fields;
pub mod functions; // plugin model
mod comparison;
mod expression;
mod parser;

use errors::Result;

pub use binding::{ActionSink, ConditionSpec, DataDisplay, ElementId, Host, Markup, Trigger};
pub use context::Settings;
pub use document::{Document, Element};
pub use engine::{Action, ActionKind, ActionResult, Evaluator};
pub use errors::EvalError;
pub use expression::Value;
pub use fields::{Control, ControlKind, FieldContext, Form};
pub use functions::{Helper, Registry};

/// Convenience: evaluate a condition with the built-in helpers.
pub fn evaluate(condition: &str, ctx: &dyn FieldContext) -> ActionResult {
    Evaluator::default().evaluate(condition, ctx)
}

/// Convenience: every `{field}` placeholder in `condition`, in order.
pub fn extract_fields(condition: &str) -> Vec<String> {
    fields::extract_fields(condition)
}

/// Convenience: run the built-in helpers over `condition`.
pub fn apply_helpers(condition: &str, ctx: &dyn FieldContext) -> String {
    Registry::with_builtins().apply(condition, ctx)
}

/// Convenience: replace the listed placeholders with escaped live values.
pub fn substitute_fields(condition: &str, fields: &[String], ctx: &dyn FieldContext) -> String {
    fields::substitute_fields(condition, fields, ctx)
}

/// Evaluate a single expression with no placeholders left in it.
pub fn eval_expression(expr: &str) -> Result<Value> {
    Evaluator::default().eval_expression(expr)
}
