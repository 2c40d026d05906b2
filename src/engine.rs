use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::errors::{EvalError, Result};
use crate::expression::{self, Value};
use crate::fields::{self, FieldContext};
use crate::functions::Registry;

/// Separates independent clauses.
pub const CLAUSE_SEPARATOR: &str = "; ||";
/// Separates a clause guard from its effect statements.
pub const EFFECT_SEPARATOR: &str = "::";

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("whitespace pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Show,
    Hide,
    Effect,
}

/// Something to do to the element owning the condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub script: String,
}

impl Action {
    pub fn show() -> Self {
        Self { kind: ActionKind::Show, script: String::new() }
    }

    pub fn hide() -> Self {
        Self { kind: ActionKind::Hide, script: String::new() }
    }

    pub fn effect(script: impl Into<String>) -> Self {
        Self { kind: ActionKind::Effect, script: script.into() }
    }
}

/// Actions in the order they must be applied.
pub type ActionResult = Vec<Action>;

/// Turns condition text plus live field values into actions.
///
/// Holds nothing but its helper registry, so one evaluator can serve any
/// number of elements.
#[derive(Clone)]
pub struct Evaluator {
    registry: Registry,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(Registry::with_builtins())
    }
}

impl Evaluator {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    pub fn extract_fields(&self, text: &str) -> Vec<String> {
        fields::extract_fields(text)
    }

    pub fn apply_helpers(&self, text: &str, ctx: &dyn FieldContext) -> String {
        self.registry.apply(text, ctx)
    }

    pub fn substitute_fields(&self, text: &str, fields: &[String], ctx: &dyn FieldContext) -> String {
        fields::substitute_fields(text, fields, ctx)
    }

    /// Helpers, then field values, then runs of two or more whitespace
    /// characters collapsed to a single space. A lone tab or newline is kept.
    pub fn prepare(&self, text: &str, ctx: &dyn FieldContext) -> String {
        let fields = self.extract_fields(text);
        let text = self.apply_helpers(text, ctx);
        let text = self.substitute_fields(&text, &fields, ctx);
        WHITESPACE.replace_all(&text, " ").into_owned()
    }

    /// Evaluates every clause of `text`; each satisfied clause contributes
    /// its actions, in clause order.
    pub fn evaluate(&self, text: &str, ctx: &dyn FieldContext) -> ActionResult {
        let prepared = self.prepare(text, ctx);
        trace!(%prepared, "evaluating condition");
        let mut actions = ActionResult::new();
        for clause in prepared.split(CLAUSE_SEPARATOR) {
            self.dispatch_clause(clause, &mut actions);
        }
        actions
    }

    fn dispatch_clause(&self, clause: &str, out: &mut ActionResult) {
        let parts: Vec<&str> = clause.split(EFFECT_SEPARATOR).collect();
        if let [expr] = parts.as_slice() {
            if self.is_satisfied(strip_terminator(expr)) {
                out.push(Action::show());
            }
            return;
        }
        let guard = parts[0];
        for part in &parts[1..] {
            for statement in effect_statements(part) {
                // guard is re-evaluated for every statement
                if self.is_satisfied(guard) {
                    out.push(Action::effect(statement));
                }
            }
        }
    }

    /// Reset actions run before every evaluation: hide when no reset script
    /// is configured, otherwise the script with its placeholders substituted.
    pub fn reset(&self, reset: Option<&str>, ctx: &dyn FieldContext) -> ActionResult {
        match reset.map(str::trim).filter(|s| !s.is_empty()) {
            None => vec![Action::hide()],
            Some(script) => {
                let fields = self.extract_fields(script);
                let script = self.substitute_fields(script, &fields, ctx);
                vec![Action::effect(WHITESPACE.replace_all(&script, " ").trim())]
            }
        }
    }

    /// Parses and evaluates one already-substituted expression.
    pub fn eval_expression(&self, expr: &str) -> Result<Value> {
        if let Some(field) = self.extract_fields(expr).into_iter().next() {
            return Err(EvalError::UnresolvedField(field));
        }
        let ast = expression::parse_expr(expr)?;
        Ok(expression::eval_ast(&ast))
    }

    /// True only for a boolean `true` result; failures count as unsatisfied.
    pub fn is_satisfied(&self, expr: &str) -> bool {
        match self.eval_expression(expr) {
            Ok(Value::Bool(true)) => true,
            Ok(other) => {
                trace!(expr, result = ?other, "clause not satisfied");
                false
            }
            Err(err) => {
                debug!(expr, error = %err, "clause skipped");
                false
            }
        }
    }
}

fn strip_terminator(expr: &str) -> &str {
    let expr = expr.trim_end();
    expr.strip_suffix(';').unwrap_or(expr).trim_end()
}

/// Statements of one effect part. An empty statement becomes `true`; the
/// empty tail after a closing `;` is not a statement.
fn effect_statements(part: &str) -> Vec<String> {
    let mut statements: Vec<&str> = part.split(';').collect();
    if statements.len() > 1 && statements.last().is_some_and(|s| s.trim().is_empty()) {
        statements.pop();
    }
    statements
        .into_iter()
        .map(|s| match s.trim() {
            "" => "true".to_string(),
            s => s.to_string(),
        })
        .collect()
}
