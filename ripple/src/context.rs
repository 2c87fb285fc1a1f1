//! Dependency-indexed rule storage
//!
//! A [`Context`] extends a persistent map from names to expressions into a
//! dependency graph. Incoming edges (the symbols a rule references) and
//! outgoing edges (the rules referencing a name) are maintained on every
//! insert and erase, so finding everything downstream of an edit is fast,
//! as good as a topological sort without ever computing one. Worst case,
//! inserting a new rule is O(N + S) in the number of existing items N and
//! the symbol count S of the inserted expression; replacing an existing
//! rule is O(S).

use crate::error::RippleError;
use crate::expr::{Expression, Scope};
use crate::limits::ResourceLimits;
use crate::parser;
use crate::RippleResult;

pub type Map = im::HashMap<String, Expression>;
pub type Set = im::HashSet<String>;
type Edges = im::HashMap<String, Set>;

/// An immutable map of named expressions with maintained dependency edges
///
/// Mutation methods return new contexts sharing structure with the
/// original, so snapshots are cheap and may be held for arbitrary durations
/// by other threads.
#[derive(Clone, Default, Debug)]
pub struct Context {
    items: Map,
    incoming: Edges,
    outgoing: Edges,
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a context from a source string, per the rules-file format: every
    /// top-level part with a non-empty key becomes a rule, inserted in
    /// order; unkeyed parts are dropped.
    pub fn parse(source: &str) -> RippleResult<Context> {
        Self::parse_with_limits(source, &ResourceLimits::default())
    }

    pub fn parse_with_limits(source: &str, limits: &ResourceLimits) -> RippleResult<Context> {
        let parts = parser::parse_parts_with_limits(source, limits)?;

        // A single unkeyed table is the wrapped form of a rules file; its
        // parts are the rules. Anything else is the bare sequence itself.
        let rules: Vec<Expression> =
            if parts.len() == 1 && parts[0].key().is_empty() && parts[0].is_table() {
                parts[0].iter().cloned().collect()
            } else {
                parts
            };

        let mut context = Context::new();
        for rule in rules {
            if !rule.key().is_empty() {
                context = context.insert(rule)?;
            }
        }
        Ok(context)
    }

    /// Serialize every rule as `key=value`, one per line; products are never
    /// part of this, they are re-derived on load
    pub fn to_source(&self) -> String {
        let mut lines: Vec<String> = self.items.values().map(|e| e.to_string()).collect();
        lines.sort();
        lines.join("\n")
    }

    /// Insert the given expression under its key
    ///
    /// Fails with [`RippleError::Cycle`] when the addition would create a
    /// dependency cycle, and with [`RippleError::EmptyKey`] when the
    /// expression has no key. Neither failure changes the context.
    pub fn insert(&self, e: Expression) -> RippleResult<Context> {
        let key = e.key().to_string();
        if key.is_empty() {
            return Err(RippleError::EmptyKey);
        }
        if self.cyclic(&e) {
            return Err(RippleError::Cycle(key));
        }

        let previous = self.get(&key);
        let outgoing = add_through(remove_through(self.outgoing.clone(), &previous), &e)
            .update(key.clone(), self.get_outgoing(&key));

        Ok(Context {
            items: self.items.update(key.clone(), e.clone()),
            incoming: self.incoming.update(key, e.symbols()),
            outgoing,
        })
    }

    /// Erase the item with the given key; a missing key is a no-op
    pub fn erase(&self, key: &str) -> Context {
        let previous = self.get(key);
        Context {
            items: self.items.without(key),
            incoming: self.incoming.without(key),
            outgoing: remove_through(self.outgoing.clone(), &previous).without(key),
        }
    }

    /// Erase every item whose key is in the given set
    pub fn erase_all(&self, keys: &Set) -> Context {
        keys.iter().fold(self.clone(), |acc, key| acc.erase(key))
    }

    /// The incoming edges of a rule: the symbols its expression references.
    /// Empty for keys not in the context.
    pub fn get_incoming(&self, key: &str) -> Set {
        self.incoming.get(key).cloned().unwrap_or_default()
    }

    /// The outgoing edges of a name: the rules that reference it directly
    ///
    /// For a present key this is O(1) because the edges are kept up to date.
    /// A name can have outgoing edges without being in the context; that
    /// case walks every item, O(N).
    pub fn get_outgoing(&self, key: &str) -> Set {
        if self.items.contains_key(key) {
            return self.outgoing.get(key).cloned().unwrap_or_default();
        }
        self.incoming
            .iter()
            .filter(|(_, incoming)| incoming.contains(key))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// The names of items referencing the given key, directly or
    /// indirectly, plus the key itself
    pub fn referencing(&self, key: &str) -> Set {
        let mut result = Set::new();
        let mut frontier = vec![key.to_string()];

        while let Some(name) = frontier.pop() {
            for dependent in self.get_outgoing(&name) {
                if !result.contains(&dependent) {
                    result.insert(dependent.clone());
                    frontier.push(dependent);
                }
            }
        }
        result.insert(key.to_string());
        result
    }

    /// True if inserting the given expression would create a dependency
    /// cycle: some symbol of the expression is downstream of its key
    pub fn cyclic(&self, e: &Expression) -> bool {
        let dependents = self.referencing(e.key());
        e.symbols().iter().any(|s| dependents.contains(s))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The expression at the given key; absence is an error
    pub fn at(&self, key: &str) -> RippleResult<&Expression> {
        self.items
            .get(key)
            .ok_or_else(|| RippleError::Missing(key.to_string()))
    }

    /// The expression at the given key, or an empty one carrying that key
    pub fn get(&self, key: &str) -> Expression {
        self.items
            .get(key)
            .cloned()
            .unwrap_or_else(|| Expression::none().keyed(key))
    }

    /// Iterate over (name, expression) pairs in snapshot order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Expression)> {
        self.items.iter()
    }

    /// The key at the given linear index in snapshot order, used by
    /// front-ends that display the context; O(i)
    pub fn nth_key(&self, index: usize) -> Option<&str> {
        self.items.keys().nth(index).map(String::as_str)
    }

    /// All items gathered into one table expression
    pub fn expr(&self) -> Expression {
        self.items.values().cloned().collect()
    }
}

impl Scope for Context {
    fn lookup(&self, name: &str) -> Option<Expression> {
        self.items.get(name).cloned()
    }
}

/// o[s] -= e.key for each symbol s of e present in o
fn remove_through(mut outgoing: Edges, e: &Expression) -> Edges {
    for s in e.symbols() {
        if let Some(edges) = outgoing.get(&s) {
            let edges = edges.without(e.key());
            outgoing.insert(s, edges);
        }
    }
    outgoing
}

/// o[s] += e.key for each symbol s of e present in o
fn add_through(mut outgoing: Edges, e: &Expression) -> Edges {
    for s in e.symbols() {
        if let Some(edges) = outgoing.get(&s) {
            let edges = edges.update(e.key().to_string());
            outgoing.insert(s, edges);
        }
    }
    outgoing
}
