//! JSON export
//!
//! Lossy by design: symbols and functions flatten to strings, and keys
//! inside mixed tables become one-entry objects. The canonical
//! round-trippable format is `unparse`; JSON is for feeding products to
//! other tools.

use crate::context::Context;
use crate::expr::Expression;
use serde_json::Value;

/// A single expression as a JSON value
pub fn expression_to_value(e: &Expression) -> Value {
    serde_json::to_value(e).unwrap_or(Value::Null)
}

/// A context as a JSON object mapping names to values, in sorted order
pub fn context_to_value(context: &Context) -> Value {
    let mut entries: Vec<(&String, &Expression)> = context.iter().collect();
    entries.sort_by_key(|(name, _)| name.as_str());

    Value::Object(
        entries
            .into_iter()
            .map(|(name, e)| (name.clone(), expression_to_value(e)))
            .collect(),
    )
}

/// A context pretty-printed as JSON text
pub fn context_to_string(context: &Context) -> String {
    serde_json::to_string_pretty(&context_to_value(context)).unwrap_or_else(|_| "{}".to_string())
}
