//! Structural editing of expressions
//!
//! Every operation returns a new expression sharing storage with the
//! original. Sequence edits treat a non-table receiver as having no parts;
//! all edits preserve the receiver's key.

use super::{Expression, ExpressionKind, Parts};

impl Expression {
    fn edited(&self, f: impl FnOnce(&mut Parts)) -> Expression {
        let mut parts = self.parts().cloned().unwrap_or_default();
        f(&mut parts);
        Expression::from_parts(parts).keyed(self.key())
    }

    /// Append a part at the back
    pub fn append(&self, part: Expression) -> Expression {
        self.edited(|parts| parts.push_back(part))
    }

    /// Insert a part at the front
    pub fn prepend(&self, part: Expression) -> Expression {
        self.edited(|parts| parts.push_front(part))
    }

    /// The parts of this expression followed by the parts of another
    pub fn concat(&self, more: &Expression) -> Expression {
        self.edited(|parts| {
            parts.append(more.parts().cloned().unwrap_or_default());
        })
    }

    /// Insert a part at the given index, clamped to the back
    pub fn insert(&self, index: usize, part: Expression) -> Expression {
        self.edited(|parts| {
            let index = index.min(parts.len());
            parts.insert(index, part);
        })
    }

    /// Remove the part at the given index; out-of-range leaves the
    /// expression unchanged
    pub fn erase(&self, index: usize) -> Expression {
        self.edited(|parts| {
            if index < parts.len() {
                parts.remove(index);
            }
        })
    }

    /// Only the first `count` parts
    pub fn take(&self, count: usize) -> Expression {
        self.edited(|parts| {
            parts.truncate(count.min(parts.len()));
        })
    }

    /// Without the final `count` parts
    pub fn pop_back(&self, count: usize) -> Expression {
        self.edited(|parts| {
            parts.truncate(parts.len().saturating_sub(count));
        })
    }

    /// Without the first `count` parts
    pub fn pop_front(&self, count: usize) -> Expression {
        self.edited(|parts| {
            *parts = parts.skip(count.min(parts.len()));
        })
    }

    /// This expression as the sole part of a new table: `key=val` becomes
    /// `(key=val)`
    pub fn nest(&self) -> Expression {
        Expression::table([self.clone()])
    }

    /// Replace the part at the given linear index; the replacement is used
    /// as given, key included. Not named `with_item` because the index
    /// counts keyed parts too.
    pub fn with_part(&self, index: usize, part: &Expression) -> Expression {
        match self.parts() {
            Some(parts) if index < parts.len() => {
                Expression::from_parts(parts.update(index, part.clone())).keyed(self.key())
            }
            _ => self.clone(),
        }
    }

    /// Replace every part having the given key with the value given, which
    /// takes that key; parts are never added
    pub fn with_attr(&self, key: &str, value: &Expression) -> Expression {
        match self.parts() {
            Some(parts) => {
                let parts = parts
                    .iter()
                    .map(|part| {
                        if part.key() == key {
                            value.keyed(key)
                        } else {
                            part.clone()
                        }
                    })
                    .collect();
                Expression::from_parts(parts).keyed(self.key())
            }
            _ => self.clone(),
        }
    }

    /// Without the part at the given index; out-of-range is unchanged
    pub fn without_part(&self, index: usize) -> Expression {
        match self.parts() {
            Some(parts) if index < parts.len() => {
                let mut parts = parts.clone();
                parts.remove(index);
                Expression::from_parts(parts).keyed(self.key())
            }
            _ => self.clone(),
        }
    }

    /// Without any parts having the given key
    pub fn without_attr(&self, key: &str) -> Expression {
        match self.parts() {
            Some(parts) => {
                let parts = parts.iter().filter(|p| p.key() != key).cloned().collect();
                Expression::from_parts(parts).keyed(self.key())
            }
            _ => self.clone(),
        }
    }

    /// Generalization of `with_attr` and `with_part`: the address is a
    /// sequence of attribute names (strings) and part indexes (ints),
    /// applied left to right. Keys in the address are disregarded.
    pub fn with(&self, address: &Expression, value: &Expression) -> Expression {
        let front = address.first();
        match front.kind() {
            ExpressionKind::Str(name) => {
                self.with_attr(name, &self.attr(name).with(&address.rest(), value))
            }
            ExpressionKind::I32(index) => match usize::try_from(*index) {
                Ok(index) => self.with_part(index, &self.part(index).with(&address.rest(), value)),
                Err(_) => self.clone(),
            },
            _ => value.clone(),
        }
    }

    /// This expression with the item at the given address removed
    pub fn without(&self, address: &Expression) -> Expression {
        if !self.is_table() {
            return self.clone();
        }
        if address.size() <= 1 {
            let front = address.first().otherwise(address.clone());
            match front.kind() {
                ExpressionKind::Str(name) => return self.without_attr(name),
                ExpressionKind::I32(index) => {
                    return match usize::try_from(*index) {
                        Ok(index) => self.without_part(index),
                        Err(_) => self.clone(),
                    };
                }
                _ => {}
            }
        }
        let rest = address.rest();
        let parts = self.iter().map(|part| part.without(&rest)).collect();
        Expression::from_parts(parts).keyed(self.key())
    }

    /// A nested item, using the address as a sequence of names and indexes
    pub fn address(&self, address: &Expression) -> Expression {
        let front = address.first();
        match front.kind() {
            ExpressionKind::Str(name) => self.attr(name).address(&address.rest()),
            ExpressionKind::I32(index) => usize::try_from(*index)
                .map(|index| self.part(index))
                .unwrap_or_default()
                .address(&address.rest()),
            _ => self.clone(),
        }
    }

    /// Rename every symbol `from` to `to`, at any depth
    pub fn relabel(&self, from: &str, to: &str) -> Expression {
        match self.kind() {
            ExpressionKind::Sym(name) if name == from => Expression::sym(to).keyed(self.key()),
            ExpressionKind::Table(parts) => {
                let parts = parts.iter().map(|part| part.relabel(from, to)).collect();
                Expression::from_parts(parts).keyed(self.key())
            }
            _ => self.clone(),
        }
    }

    /// Replace every occurrence of a symbol with the given expression
    pub fn replace(&self, symbol: &str, value: &Expression) -> Expression {
        match self.kind() {
            ExpressionKind::Sym(name) if name == symbol => value.keyed(self.key()),
            ExpressionKind::Table(parts) => {
                let parts = parts.iter().map(|part| part.replace(symbol, value)).collect();
                Expression::from_parts(parts).keyed(self.key())
            }
            _ => self.clone(),
        }
    }

    /// Replace every value equaling the first argument with the second,
    /// recursing into tables. Keys of both arguments are disregarded and the
    /// swapped-in value takes the key of the cell it lands in:
    ///
    /// `(a=1 b=2).substitute(1, 2)` yields `(a=2 b=2)`.
    ///
    /// Whole tables are not tested for a match, only their parts.
    pub fn substitute(&self, value: &Expression, new_value: &Expression) -> Expression {
        match self.kind() {
            ExpressionKind::Table(parts) => {
                let parts = parts
                    .iter()
                    .map(|part| part.substitute(value, new_value))
                    .collect();
                Expression::from_parts(parts).keyed(self.key())
            }
            _ => {
                if self.same_value(value) {
                    new_value.keyed(self.key())
                } else {
                    self.clone()
                }
            }
        }
    }

    /// Apply `substitute` for each keyed part of the lookup table, using the
    /// part's key as the value to match
    pub fn substitute_in(&self, lookup: &Expression) -> Expression {
        lookup.iter().fold(self.clone(), |acc, part| {
            acc.substitute(&Expression::from(part.key()), part)
        })
    }
}
