//! Resolution: turning rules into products
//!
//! All of these operate on (rules, products) pairs of contexts and are pure:
//! they return new products rather than mutating. A rule resolves once every
//! symbol it references has a product; rules with unresolvable symbols are
//! simply left out, to be retried when their bindings appear.

use crate::context::Context;
use crate::expr::{DefaultAdapter, Expression};
use crate::workers::WorkerPool;
use crate::RippleResult;
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Resolve a single rule into the products, if it is ready
///
/// Acts only when the rule's key has no product yet: an expression without
/// free symbols is inserted as-is, one whose symbols all have products is
/// evaluated against them and the result inserted. Anything else leaves the
/// products unchanged.
pub fn resolve_one(e: &Expression, products: Context) -> Context {
    if products.contains(e.key()) {
        return products;
    }
    let symbols = e.symbols();

    if symbols.is_empty() {
        products.insert(e.clone()).unwrap_or(products)
    } else if symbols.iter().all(|s| products.contains(s)) {
        let resolved = e.resolve(&products, &DefaultAdapter);
        // a resolved value cannot introduce a cycle among products
        products.insert(resolved).unwrap_or(products)
    } else {
        products
    }
}

/// A single pass of [`resolve_one`] over every rule
pub fn resolve_once(rules: &Context, products: Context) -> Context {
    rules
        .iter()
        .fold(products, |products, (_, e)| resolve_one(e, products))
}

/// Iterate [`resolve_once`] to a fixed point
///
/// Size equality is a sufficient termination test because resolved keys are
/// never removed within a call; on a rules DAG of depth d this takes at most
/// d + 1 passes.
pub fn resolve_full(rules: &Context, products: Context) -> Context {
    let mut products = products;
    loop {
        let next = resolve_once(rules, products.clone());
        if next.len() == products.len() {
            return products;
        }
        products = next;
    }
}

/// Insert a rule and invalidate everything downstream of it
///
/// Returns the rules with `e` inserted, and the products with the rule
/// itself and every rule transitively referencing it erased, forcing their
/// recomputation on the next resolve.
pub fn insert_invalidate(
    e: Expression,
    rules: &Context,
    products: &Context,
) -> RippleResult<(Context, Context)> {
    let stale = rules.referencing(e.key());
    let new_rules = rules.insert(e)?;
    debug!("invalidating {} stale products", stale.len());
    Ok((new_rules, products.erase_all(&stale)))
}

/// Shared cancellation handle for a [`Resolution`] stream
#[derive(Clone)]
pub struct Subscription {
    active: Arc<AtomicBool>,
}

impl Subscription {
    fn new() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn unsubscribe(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

/// A cold, cancelable stream of maturing products
///
/// Each iteration first checks the subscription, optionally sleeps, then
/// runs one resolve pass: strictly larger products are emitted, anything
/// else completes the stream. Emissions are therefore strictly monotone in
/// the resolved-key set. The sleep gives a polling consumer time to observe
/// partial progress and unsubscribe cheaply.
pub struct Resolution {
    rules: Context,
    products: Context,
    delay: Duration,
    subscription: Subscription,
    complete: bool,
}

impl Resolution {
    /// A handle the consumer can keep to cancel the stream mid-flight
    pub fn subscription(&self) -> Subscription {
        self.subscription.clone()
    }

    /// True once the stream has reached the fixed point; false while it is
    /// still running or when it was unsubscribed
    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

impl Iterator for Resolution {
    type Item = Context;

    fn next(&mut self) -> Option<Context> {
        if self.complete || !self.subscription.is_subscribed() {
            return None;
        }
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        let next = resolve_once(&self.rules, self.products.clone());
        if next.len() > self.products.len() {
            self.products = next.clone();
            Some(next)
        } else {
            self.complete = true;
            None
        }
    }
}

/// A generational resolution stream seeded with the given products
pub fn resolution_of(rules: &Context, products: &Context, delay: Duration) -> Resolution {
    Resolution {
        rules: rules.clone(),
        products: products.clone(),
        delay,
        subscription: Subscription::new(),
        complete: false,
    }
}

/// The concurrent variant of [`resolve_once`]
///
/// Every rule that is ready to resolve and not already submitted to the
/// pool is enqueued as a named task evaluating against a snapshot of the
/// products; the unchanged products are returned immediately. Completed
/// results arrive through the pool's listener and are merged by the caller.
pub fn resolve_pool(rules: &Context, products: &Context, pool: &WorkerPool) -> Context {
    for (name, e) in rules.iter() {
        if products.contains(name) || pool.is_submitted(name) {
            continue;
        }
        let symbols = e.symbols();

        if symbols.is_empty() {
            let e = e.clone();
            pool.enqueue(name.clone(), move |_canceled: &AtomicBool| e);
        } else if symbols.iter().all(|s| products.contains(s)) {
            let e = e.clone();
            let scope = products.clone();
            pool.enqueue(name.clone(), move |_canceled: &AtomicBool| {
                e.resolve(&scope, &DefaultAdapter)
            });
        }
    }
    products.clone()
}
