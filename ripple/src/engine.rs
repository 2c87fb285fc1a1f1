//! The stateful orchestrator front-ends talk to
//!
//! An [`Engine`] holds the rules and products contexts and keeps them
//! consistent across edits: inserting or erasing a rule drops every product
//! downstream of it, and the resolve methods rebuild what is missing. The
//! front-end observes the engine as a stream of [`Snapshot`]s.

use crate::context::Context;
use crate::expr::Expression;
use crate::limits::ResourceLimits;
use crate::parser;
use crate::resolve::{
    insert_invalidate, resolution_of, resolve_full, resolve_pool, Resolution,
};
use crate::workers::{MessageQueue, PoolEvent, WorkerPool};
use crate::RippleResult;
use log::debug;
use std::time::Duration;

/// One consistent view of the engine: the rules and their products
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub rules: Context,
    pub products: Context,
}

/// Rules, products, and the bookkeeping between them
#[derive(Default)]
pub struct Engine {
    rules: Context,
    products: Context,
    builtins: Context,
    limits: ResourceLimits,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with custom resource limits
    pub fn with_limits(limits: ResourceLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    pub fn rules(&self) -> &Context {
        &self.rules
    }

    pub fn products(&self) -> &Context {
        &self.products
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            rules: self.rules.clone(),
            products: self.products.clone(),
        }
    }

    /// Install a named builtin function
    ///
    /// Builtins are seeded into the products before every resolution pass,
    /// so rules can call them by name. A rule with the same name shadows the
    /// builtin.
    pub fn define(
        &mut self,
        name: &str,
        f: impl Fn(Expression) -> Expression + Send + Sync + 'static,
    ) -> RippleResult<()> {
        self.builtins = self.builtins.insert(Expression::func(f).keyed(name))?;
        Ok(())
    }

    /// Parse one keyed expression and insert it as a rule
    pub fn insert_source(&mut self, source: &str) -> RippleResult<()> {
        let e = parser::parse_with_limits(source, &self.limits)?;
        self.insert(e)
    }

    /// Insert a rule, dropping the products of everything downstream of it
    pub fn insert(&mut self, e: Expression) -> RippleResult<()> {
        let (rules, products) = insert_invalidate(e, &self.rules, &self.products)?;
        self.rules = rules;
        self.products = products;
        Ok(())
    }

    /// Erase a rule, dropping the products of everything downstream of it;
    /// a missing name is a no-op
    pub fn erase(&mut self, name: &str) {
        let stale = self.rules.referencing(name);
        debug!("erasing '{}', invalidating {} products", name, stale.len());
        self.rules = self.rules.erase(name);
        self.products = self.products.erase_all(&stale);
    }

    /// Load rules from source text, extending the current rules
    ///
    /// Top-level parts without a key are dropped; the rest are inserted in
    /// order. Products are re-derived, never loaded.
    pub fn load(&mut self, source: &str) -> RippleResult<()> {
        let loaded = Context::parse_with_limits(source, &self.limits)?;
        for (_, e) in loaded.iter() {
            self.insert(e.clone())?;
        }
        Ok(())
    }

    /// Serialize the rules to source text, `key=value` per line
    pub fn save(&self) -> String {
        self.rules.to_source()
    }

    /// Products seeded with any builtins not shadowed by a rule or already
    /// resolved
    fn seeded(&self) -> Context {
        self.builtins.iter().fold(
            self.products.clone(),
            |products, (name, builtin)| {
                if products.contains(name) || self.rules.contains(name) {
                    products
                } else {
                    products.insert(builtin.clone()).unwrap_or(products)
                }
            },
        )
    }

    /// Resolve synchronously to a fixed point
    pub fn resolve(&mut self) -> &Context {
        self.products = resolve_full(&self.rules, self.seeded());
        &self.products
    }

    /// A cold generational stream of maturing products, seeded with the
    /// current state
    pub fn resolution(&self, delay: Duration) -> Resolution {
        resolution_of(&self.rules, &self.seeded(), delay)
    }

    /// Enqueue every ready, unsubmitted rule onto the pool
    pub fn dispatch(&mut self, pool: &WorkerPool) {
        self.products = resolve_pool(&self.rules, &self.seeded(), pool);
    }

    /// Merge one pool event; returns true when a product was inserted
    ///
    /// Only `Finished` events carry results. An empty result means the task
    /// failed and the rule stays unresolved.
    pub fn absorb(&mut self, event: PoolEvent) -> bool {
        if let PoolEvent::Finished { result, .. } = event {
            if !result.key().is_empty() {
                if let Ok(products) = self.products.insert(result) {
                    self.products = products;
                    return true;
                }
            }
        }
        false
    }

    /// Drive pool-backed resolution until the products match what the
    /// synchronous resolve would produce
    ///
    /// The queue must be the listener the pool was built with. Task results
    /// are absorbed as they arrive and each batch of progress triggers
    /// another dispatch, re-submitting rules that just became ready.
    pub fn resolve_concurrent(&mut self, pool: &WorkerPool, queue: &MessageQueue) -> &Context {
        // products only ever grow toward the fixed point, and task results
        // are keyed by rule name, so reaching the fixed point's size means
        // every resolvable rule has its product. Comparing contexts directly
        // would never terminate once a builtin function is seeded, since
        // functions have no equality.
        let target = resolve_full(&self.rules, self.seeded());

        self.dispatch(pool);
        while self.products.len() < target.len() {
            let mut progressed = false;
            while let Some(event) = queue.next() {
                progressed |= self.absorb(event);
            }
            if progressed {
                self.dispatch(pool);
            } else {
                std::thread::sleep(Duration::from_millis(1));
            }
        }
        &self.products
    }
}
