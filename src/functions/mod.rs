//! Helpers: textual rewrites applied to a condition before field substitution.
//!
//! A helper owns a regular expression (matched case-insensitively) and a
//! resolver that turns each match into expression text. Capture group 1, if
//! the pattern has one, is handed to the resolver as the field name.

use std::sync::Arc;

use regex::{Captures, Regex, RegexBuilder};
use tracing::trace;

use crate::errors::{EvalError, Result};
use crate::fields::FieldContext;

// a resolver that keeps reproducing its own pattern would otherwise spin forever
const MAX_PASSES: usize = 32;

/// Trait for pluggable helpers used by the condition evaluator.
pub trait Helper: Send + Sync {
    fn name(&self) -> &str;
    fn pattern(&self) -> &str;
    /// `None` declines the match and leaves the original text in place.
    fn resolve(&self, field: Option<&str>, ctx: &dyn FieldContext) -> Option<String>;
}

#[derive(Clone)]
struct Entry {
    helper: Arc<dyn Helper>,
    regex: Regex,
}

/// Ordered, cheaply cloned helper registry.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<Vec<Entry>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        // `!empty` must run before `empty`, the longer phrases before their prefixes
        let defaults: Vec<Arc<dyn Helper>> = vec![
            Arc::new(builtins::NotEmpty),
            Arc::new(builtins::Empty),
            Arc::new(builtins::Length),
            Arc::new(builtins::Phrase::GREATER_OR_EQUAL),
            Arc::new(builtins::Phrase::LESS_OR_EQUAL),
            Arc::new(builtins::Phrase::GREATER),
            Arc::new(builtins::Phrase::LESS),
            Arc::new(builtins::Phrase::EQUAL),
        ];
        for helper in defaults {
            let regex = compile(helper.as_ref()).expect("built-in helper patterns are valid");
            Arc::make_mut(&mut reg.inner).push(Entry { helper, regex });
        }
        reg
    }

    /// Adds a helper. A helper whose name is already registered replaces the
    /// existing one in place, keeping its position in the application order.
    pub fn register<H: Helper + 'static>(&mut self, helper: H) -> Result<()> {
        let regex = compile(&helper)?;
        let entry = Entry {
            helper: Arc::new(helper),
            regex,
        };
        let entries = Arc::make_mut(&mut self.inner);
        match entries
            .iter()
            .position(|e| e.helper.name() == entry.helper.name())
        {
            Some(idx) => entries[idx] = entry,
            None => entries.push(entry),
        }
        Ok(())
    }

    /// Registers a closure-backed helper.
    pub fn register_fn<F>(&mut self, name: &str, pattern: &str, resolve: F) -> Result<()>
    where
        F: Fn(Option<&str>, &dyn FieldContext) -> Option<String> + Send + Sync + 'static,
    {
        self.register(FnHelper {
            name: name.to_string(),
            pattern: pattern.to_string(),
            resolve: Box::new(resolve),
        })
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Helper>> {
        self.inner
            .iter()
            .find(|e| e.helper.name() == name)
            .map(|e| Arc::clone(&e.helper))
    }

    pub fn names(&self) -> Vec<&str> {
        self.inner.iter().map(|e| e.helper.name()).collect()
    }

    /// Runs every helper over `text`, in registry order, until none of them
    /// matches any more.
    pub fn apply(&self, text: &str, ctx: &dyn FieldContext) -> String {
        let mut out = text.to_string();
        for entry in self.inner.iter() {
            for _ in 0..MAX_PASSES {
                if !entry.regex.is_match(&out) {
                    break;
                }
                let next = entry
                    .regex
                    .replace_all(&out, |caps: &Captures| {
                        let field = caps.get(1).map(|m| m.as_str());
                        match entry.helper.resolve(field, ctx) {
                            Some(resolved) => {
                                trace!(helper = entry.helper.name(), matched = &caps[0], %resolved);
                                resolved
                            }
                            None => caps[0].to_string(),
                        }
                    })
                    .into_owned();
                if next == out {
                    break;
                }
                out = next;
            }
        }
        out
    }
}

fn compile(helper: &dyn Helper) -> Result<Regex> {
    RegexBuilder::new(helper.pattern())
        .case_insensitive(true)
        .build()
        .map_err(|source| EvalError::Helper {
            name: helper.name().to_string(),
            source,
        })
}

type ResolveFn = dyn Fn(Option<&str>, &dyn FieldContext) -> Option<String> + Send + Sync;

struct FnHelper {
    name: String,
    pattern: String,
    resolve: Box<ResolveFn>,
}

impl Helper for FnHelper {
    fn name(&self) -> &str {
        &self.name
    }
    fn pattern(&self) -> &str {
        &self.pattern
    }
    fn resolve(&self, field: Option<&str>, ctx: &dyn FieldContext) -> Option<String> {
        (self.resolve)(field, ctx)
    }
}

pub mod builtins {
    use super::*;

    /// `!empty({field})`: true when every matching control has a value.
    pub struct NotEmpty;
    impl Helper for NotEmpty {
        fn name(&self) -> &str { "!empty" }
        fn pattern(&self) -> &str { r"!empty\(\{([^}]+)\}\)" }
        fn resolve(&self, field: Option<&str>, ctx: &dyn FieldContext) -> Option<String> {
            let values = ctx.values(field?);
            if values.is_empty() {
                return None;
            }
            Some(values.iter().all(|v| !v.is_empty()).to_string())
        }
    }

    /// `empty({field})`: true when every matching control is blank.
    pub struct Empty;
    impl Helper for Empty {
        fn name(&self) -> &str { "empty" }
        fn pattern(&self) -> &str { r"empty\(\{([^}]+)\}\)" }
        fn resolve(&self, field: Option<&str>, ctx: &dyn FieldContext) -> Option<String> {
            let values = ctx.values(field?);
            if values.is_empty() {
                return None;
            }
            Some(values.iter().all(|v| v.is_empty()).to_string())
        }
    }

    /// `length({field})`: character count of the resolved value.
    pub struct Length;
    impl Helper for Length {
        fn name(&self) -> &str { "length" }
        fn pattern(&self) -> &str { r"length\(\{([^}]+)\}\)" }
        fn resolve(&self, field: Option<&str>, ctx: &dyn FieldContext) -> Option<String> {
            ctx.resolve(field?).map(|v| v.chars().count().to_string())
        }
    }

    /// Natural-language comparison, e.g. `is greater than` → `>`.
    pub struct Phrase {
        name: &'static str,
        pattern: &'static str,
        operator: &'static str,
    }

    impl Phrase {
        pub const GREATER_OR_EQUAL: Phrase = Phrase {
            name: "is greater than or equal to",
            pattern: r"\bis\s+greater\s+than\s+(?:or\s+)?equal\s+to\b",
            operator: ">=",
        };
        pub const LESS_OR_EQUAL: Phrase = Phrase {
            name: "is less than or equal to",
            pattern: r"\bis\s+less\s+than\s+(?:or\s+)?equal\s+to\b",
            operator: "<=",
        };
        pub const GREATER: Phrase = Phrase {
            name: "is greater than",
            pattern: r"\bis\s+greater\s+than\b",
            operator: ">",
        };
        pub const LESS: Phrase = Phrase {
            name: "is less than",
            pattern: r"\bis\s+less\s+than\b",
            operator: "<",
        };
        pub const EQUAL: Phrase = Phrase {
            name: "is equal to",
            pattern: r"\bis\s+equal\s+to\b",
            operator: "==",
        };
    }

    impl Helper for Phrase {
        fn name(&self) -> &str { self.name }
        fn pattern(&self) -> &str { self.pattern }
        fn resolve(&self, _field: Option<&str>, _ctx: &dyn FieldContext) -> Option<String> {
            Some(self.operator.to_string())
        }
    }
}
