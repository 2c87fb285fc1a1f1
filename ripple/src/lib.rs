//! # Ripple
//!
//! **An incremental, reactive evaluation kernel**
//!
//! Ripple keeps a set of named rules, parsed expressions that may reference
//! each other by symbol, consistent with a set of resolved products. When a
//! rule changes, only the rules that transitively depend on it are
//! recomputed; everything else is preserved. Resolution can run
//! synchronously, as a lazy generational stream, or asynchronously on a
//! worker pool with at-most-one in-flight evaluation per rule.
//!
//! ## Quick Start
//!
//! ```rust
//! use ripple::{resolve_full, Context};
//!
//! fn main() -> ripple::RippleResult<()> {
//!     let rules = Context::parse("(a=b b=c c=1)")?;
//!     let products = resolve_full(&rules, Context::default());
//!
//!     assert_eq!(products.at("a")?.as_i32(), 1);
//!     Ok(())
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Expressions
//! An [`Expression`](expr::Expression) is an immutable tagged value: numeric
//! and string atoms, symbols, ordered tables of parts, opaque functions, and
//! user data. Every expression carries an optional key, written `k=v` in the
//! surface syntax.
//!
//! ### Contexts
//! A [`Context`](context::Context) is a persistent map from names to
//! expressions that maintains incoming and outgoing dependency edges, so the
//! set of rules downstream of an edit is always cheap to compute. Inserts
//! that would create a dependency cycle are rejected.
//!
//! ### Resolution
//! The functions in [`resolve`] turn a rules context plus a possibly stale
//! products context into an up-to-date products context, one pass at a time
//! or to a fixed point. Unresolvable symbols are not errors; they stay
//! symbolic until a binding appears.
//!
//! ### Workers
//! A [`WorkerPool`](workers::WorkerPool) hosts named, cancelable tasks on a
//! fixed set of threads. Re-enqueueing a name cancels the previous instance,
//! which is what guarantees at most one evaluation per rule in flight.

pub mod context;
pub mod engine;
pub mod error;
pub mod expr;
pub mod limits;
pub mod parser;
pub mod resolve;
pub mod serializers;
pub mod workers;

pub use context::{Context, Set};
pub use engine::{Engine, Snapshot};
pub use error::{ParseDetails, RippleError};
pub use expr::{CallAdapter, DefaultAdapter, Expression, ExpressionKind, Scope, UserData};
pub use limits::ResourceLimits;
pub use parser::{parse, parse_parts};
pub use resolve::{
    insert_invalidate, resolution_of, resolve_full, resolve_once, resolve_one, resolve_pool,
    Resolution, Subscription,
};
pub use workers::{MessageQueue, PoolEvent, PoolListener, WorkerPool};

/// Result type for Ripple operations
pub type RippleResult<T> = Result<T, RippleError>;

#[cfg(test)]
mod tests;
