//! The evaluator: resolving expressions against a scope
//!
//! Symbols resolve to their binding in the scope, or to themselves when
//! unbound, so a partially resolvable expression is still representable.
//! Tables are interpreted by a call adapter, which decides whether the head
//! is a function call or the whole expression is data.

use super::{Expression, ExpressionKind, Parts};

/// Name lookup capability required by the evaluator
///
/// A rules or products context satisfies this, as does a transient map used
/// to bind function arguments.
pub trait Scope {
    fn lookup(&self, name: &str) -> Option<Expression>;
}

impl Scope for im::HashMap<String, Expression> {
    fn lookup(&self, name: &str) -> Option<Expression> {
        self.get(name).cloned()
    }
}

impl Scope for std::collections::HashMap<String, Expression> {
    fn lookup(&self, name: &str) -> Option<Expression> {
        self.get(name).cloned()
    }
}

/// Strategy applied to table expressions during evaluation
pub trait CallAdapter {
    fn call<S: Scope>(&self, scope: &S, expr: &Expression) -> Expression;
}

/// The standard call adapter
///
/// Resolves the head part; a function head is invoked with the resolved
/// remaining parts packed into a table, and any other head means the
/// expression is data: the head is nested and the resolved tail is appended
/// to it.
#[derive(Clone, Copy, Default)]
pub struct DefaultAdapter;

impl CallAdapter for DefaultAdapter {
    fn call<S: Scope>(&self, scope: &S, expr: &Expression) -> Expression {
        let head = expr.first().resolve(scope, self);
        let args: Parts = expr
            .iter()
            .skip(1)
            .map(|part| part.resolve(scope, self))
            .collect();
        let args = Expression::from_parts(args);

        if let ExpressionKind::Func(f) = head.kind() {
            f(args).keyed(head.key())
        } else {
            head.nest().concat(&args)
        }
    }
}

impl Expression {
    /// Evaluate this expression in the given scope
    ///
    /// Atoms resolve to themselves. A symbol resolves to its binding with
    /// the symbol's key preserved, or to itself when the scope has no
    /// binding. Tables are delegated to the call adapter, with the table's
    /// key preserved.
    pub fn resolve<S: Scope, A: CallAdapter>(&self, scope: &S, adapter: &A) -> Expression {
        match &self.kind {
            ExpressionKind::Table(_) => adapter.call(scope, self).keyed(self.key()),
            ExpressionKind::Sym(name) => match scope.lookup(name) {
                Some(binding) => binding.keyed(self.key()),
                None => self.clone(),
            },
            _ => self.clone(),
        }
    }
}
