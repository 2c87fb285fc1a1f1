//! The expression data model
//!
//! An [`Expression`] is an immutable tagged value. Tables hold their parts in
//! a persistent vector, so structural edits share storage with the original.
//! Every expression carries an optional key; the key is orthogonal to the
//! value and travels with a part when it appears inside a table.

mod edit;
mod eval;

pub use eval::{CallAdapter, DefaultAdapter, Scope};

use crate::error::RippleError;
use crate::RippleResult;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// The parts of a table expression
pub type Parts = im::Vector<Expression>;

/// An opaque callable held by a `Func` expression
pub type FuncValue = Arc<dyn Fn(Expression) -> Expression + Send + Sync>;

/// A user-defined value carried opaquely by a `Data` expression
///
/// The projection to a table is used for unparsing and serialization; it
/// must not return a `Data` of the same type, or unparse would recurse
/// forever.
pub trait UserData: Send + Sync {
    fn type_name(&self) -> &'static str;
    fn to_table(&self) -> Expression;
}

/// A shared handle to user data; handles compare by identity
pub type DataValue = Arc<dyn UserData>;

/// The kind of an expression
#[derive(Clone, Default)]
pub enum ExpressionKind {
    /// The absent value, equivalent to an empty table
    #[default]
    None,
    I32(i32),
    F64(f64),
    Str(String),
    /// A name to resolve in a scope; always a non-empty string
    Sym(String),
    /// An ordered sequence of parts; never empty (collapses to `None`)
    Table(Parts),
    /// An opaque callable; never equal to anything, not even itself
    Func(FuncValue),
    /// Opaque user data shared by handle
    Data(DataValue),
}

impl fmt::Debug for ExpressionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpressionKind::None => f.write_str("None"),
            ExpressionKind::I32(n) => f.debug_tuple("I32").field(n).finish(),
            ExpressionKind::F64(x) => f.debug_tuple("F64").field(x).finish(),
            ExpressionKind::Str(s) => f.debug_tuple("Str").field(s).finish(),
            ExpressionKind::Sym(s) => f.debug_tuple("Sym").field(s).finish(),
            ExpressionKind::Table(parts) => f.debug_tuple("Table").field(parts).finish(),
            ExpressionKind::Func(_) => f.write_str("Func(..)"),
            ExpressionKind::Data(d) => write!(f, "Data({})", d.type_name()),
        }
    }
}

/// An immutable tagged value with an optional key
#[derive(Clone, Default)]
pub struct Expression {
    key: Option<Arc<str>>,
    kind: ExpressionKind,
}

impl Expression {
    /// The absent value
    pub fn none() -> Self {
        Self::default()
    }

    /// A symbol expression; the parser guarantees non-empty names, hand
    /// construction should too
    pub fn sym(name: impl Into<String>) -> Self {
        Self::from_kind(ExpressionKind::Sym(name.into()))
    }

    /// A table built from the given parts; an empty sequence collapses to
    /// `None`
    pub fn table(parts: impl IntoIterator<Item = Expression>) -> Self {
        Self::from_parts(parts.into_iter().collect())
    }

    /// A function expression wrapping the given closure
    pub fn func(f: impl Fn(Expression) -> Expression + Send + Sync + 'static) -> Self {
        Self::from_kind(ExpressionKind::Func(Arc::new(f)))
    }

    /// A user-data expression sharing the given handle
    pub fn data(value: impl UserData + 'static) -> Self {
        Self::from_kind(ExpressionKind::Data(Arc::new(value)))
    }

    pub(crate) fn from_parts(parts: Parts) -> Self {
        if parts.is_empty() {
            Self::none()
        } else {
            Self::from_kind(ExpressionKind::Table(parts))
        }
    }

    fn from_kind(kind: ExpressionKind) -> Self {
        Self { key: None, kind }
    }

    /// The kind of this expression
    pub fn kind(&self) -> &ExpressionKind {
        &self.kind
    }

    /// The key of this expression, empty when unkeyed
    pub fn key(&self) -> &str {
        self.key.as_deref().unwrap_or("")
    }

    /// A copy of this expression with a different key; an empty key erases
    pub fn keyed(&self, key: &str) -> Expression {
        Expression {
            key: if key.is_empty() {
                None
            } else {
                Some(Arc::from(key))
            },
            kind: self.kind.clone(),
        }
    }

    /// The name of this expression's type
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            ExpressionKind::None => "none",
            ExpressionKind::I32(_) => "i32",
            ExpressionKind::F64(_) => "f64",
            ExpressionKind::Str(_) => "str",
            ExpressionKind::Sym(_) => "symbol",
            ExpressionKind::Table(_) => "table",
            ExpressionKind::Func(_) => "function",
            ExpressionKind::Data(d) => d.type_name(),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self.kind, ExpressionKind::None)
    }

    pub fn is_sym(&self) -> bool {
        matches!(self.kind, ExpressionKind::Sym(_))
    }

    pub fn is_table(&self) -> bool {
        matches!(self.kind, ExpressionKind::Table(_))
    }

    pub fn is_func(&self) -> bool {
        matches!(self.kind, ExpressionKind::Func(_))
    }

    /// True for `None` and for an empty table, which are equivalent
    pub fn empty(&self) -> bool {
        match &self.kind {
            ExpressionKind::None => true,
            ExpressionKind::Table(parts) => parts.is_empty(),
            _ => false,
        }
    }

    /// The number of parts if this is a table, zero otherwise
    pub fn size(&self) -> usize {
        self.parts().map_or(0, |parts| parts.len())
    }

    pub(crate) fn parts(&self) -> Option<&Parts> {
        match &self.kind {
            ExpressionKind::Table(parts) => Some(parts),
            _ => None,
        }
    }

    /// Iterate over the parts; atoms iterate as empty
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Expression> {
        self.parts().into_iter().flatten()
    }

    /// The part at the given index; out-of-range is an error
    pub fn at(&self, index: usize) -> RippleResult<&Expression> {
        self.parts()
            .and_then(|parts| parts.get(index))
            .ok_or(RippleError::OutOfRange {
                index,
                len: self.size(),
            })
    }

    /// The part at the given index, or `None` if out-of-range
    pub fn part(&self, index: usize) -> Expression {
        self.parts()
            .and_then(|parts| parts.get(index))
            .cloned()
            .unwrap_or_default()
    }

    /// The i-th unkeyed part, skipping keyed ones; on a string, the
    /// one-character substring at that index
    pub fn item(&self, index: usize) -> Expression {
        if let ExpressionKind::Str(s) = &self.kind {
            return match s.get(index..index + 1) {
                Some(c) => Expression::from(c),
                None => Expression::none(),
            };
        }
        self.iter()
            .filter(|part| part.key().is_empty())
            .nth(index)
            .cloned()
            .unwrap_or_default()
    }

    /// The last part whose key matches, with its key cleared; `None` when
    /// absent
    pub fn attr(&self, key: &str) -> Expression {
        self.iter()
            .rev()
            .find(|part| part.key() == key)
            .map(|part| part.keyed(""))
            .unwrap_or_default()
    }

    pub fn first(&self) -> Expression {
        self.part(0)
    }

    pub fn second(&self) -> Expression {
        self.part(1)
    }

    /// Everything after the first part, or `None` if there is at most one
    pub fn rest(&self) -> Expression {
        match self.parts() {
            Some(parts) if parts.len() > 1 => Self::from_parts(parts.skip(1)),
            _ => Expression::none(),
        }
    }

    pub fn last(&self) -> Expression {
        match self.parts() {
            Some(parts) => parts.last().cloned().unwrap_or_default(),
            _ => Expression::none(),
        }
    }

    /// This expression if it is non-empty, the given default otherwise
    pub fn otherwise(&self, default: Expression) -> Expression {
        if self.empty() {
            default
        } else {
            self.clone()
        }
    }

    /// All symbols referenced at any depth in this expression
    pub fn symbols(&self) -> im::HashSet<String> {
        match &self.kind {
            ExpressionKind::Sym(name) => im::HashSet::unit(name.clone()),
            ExpressionKind::Table(parts) => parts
                .iter()
                .fold(im::HashSet::new(), |acc, part| acc.union(part.symbols())),
            _ => im::HashSet::new(),
        }
    }

    /// Call this expression as a function; any other type is an error
    pub fn call(&self, args: Expression) -> RippleResult<Expression> {
        match &self.kind {
            ExpressionKind::Func(f) => Ok(f(args).keyed(self.key())),
            _ => Err(RippleError::NotFunction(self.type_name().to_string())),
        }
    }

    /// Equivalence of type and value only, disregarding keys
    ///
    /// Functions have no equality, not even with themselves.
    pub fn same_value(&self, other: &Expression) -> bool {
        use ExpressionKind::*;
        match (&self.kind, &other.kind) {
            (None, None) => true,
            (I32(a), I32(b)) => a == b,
            (F64(a), F64(b)) => a == b,
            (Str(a), Str(b)) => a == b,
            (Sym(a), Sym(b)) => a == b,
            (Table(a), Table(b)) => a == b,
            (Data(a), Data(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn as_bool(&self) -> bool {
        match &self.kind {
            ExpressionKind::None => false,
            ExpressionKind::I32(n) => *n != 0,
            ExpressionKind::F64(x) => *x != 0.0,
            ExpressionKind::Str(s) => !s.is_empty(),
            ExpressionKind::Sym(s) => !s.is_empty(),
            ExpressionKind::Table(parts) => !parts.is_empty(),
            ExpressionKind::Func(_) | ExpressionKind::Data(_) => true,
        }
    }

    /// Best-guess integer equivalent: floats truncate, strings parse or
    /// default to zero
    pub fn as_i32(&self) -> i32 {
        match &self.kind {
            ExpressionKind::I32(n) => *n,
            ExpressionKind::F64(x) => *x as i32,
            ExpressionKind::Str(s) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }

    /// Best-guess float equivalent: ints promote, strings parse or default
    /// to zero
    pub fn as_f64(&self) -> f64 {
        match &self.kind {
            ExpressionKind::I32(n) => f64::from(*n),
            ExpressionKind::F64(x) => *x,
            ExpressionKind::Str(s) => s.trim().parse().unwrap_or(0.0),
            _ => 0.0,
        }
    }

    /// Best-guess string equivalent: unquoted for strings and symbols,
    /// unparsed for tables
    pub fn as_string(&self) -> String {
        match &self.kind {
            ExpressionKind::None => "()".to_string(),
            ExpressionKind::I32(n) => n.to_string(),
            ExpressionKind::F64(x) => fmt_f64(*x),
            ExpressionKind::Str(s) => s.clone(),
            ExpressionKind::Sym(s) => s.clone(),
            ExpressionKind::Table(_) => self.keyed("").to_string(),
            ExpressionKind::Func(_) => "<func>".to_string(),
            ExpressionKind::Data(d) => d.type_name().to_string(),
        }
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        self.same_value(other) && self.key() == other.key()
    }
}

impl From<i32> for Expression {
    fn from(n: i32) -> Self {
        Self::from_kind(ExpressionKind::I32(n))
    }
}

impl From<f64> for Expression {
    fn from(x: f64) -> Self {
        Self::from_kind(ExpressionKind::F64(x))
    }
}

impl From<&str> for Expression {
    fn from(s: &str) -> Self {
        Self::from_kind(ExpressionKind::Str(s.to_string()))
    }
}

impl From<String> for Expression {
    fn from(s: String) -> Self {
        Self::from_kind(ExpressionKind::Str(s))
    }
}

impl From<Vec<Expression>> for Expression {
    fn from(parts: Vec<Expression>) -> Self {
        Self::table(parts)
    }
}

impl FromIterator<Expression> for Expression {
    fn from_iter<I: IntoIterator<Item = Expression>>(iter: I) -> Self {
        Self::table(iter)
    }
}

/// Format a float so the token reparses as a float: integral values carry a
/// trailing `.0`, very large ones use exponent notation
fn fmt_f64(x: f64) -> String {
    if !x.is_finite() {
        return x.to_string();
    }
    if x == x.trunc() {
        if x.abs() < 1e16 {
            format!("{x:.1}")
        } else {
            format!("{x:e}")
        }
    } else {
        x.to_string()
    }
}

impl fmt::Display for Expression {
    /// The canonical round-trippable serialization; only `Func` values
    /// cannot be restored by the parser
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.key().is_empty() {
            write!(f, "{}=", self.key())?;
        }
        match &self.kind {
            ExpressionKind::None => f.write_str("()"),
            ExpressionKind::I32(n) => write!(f, "{}", n),
            ExpressionKind::F64(x) => f.write_str(&fmt_f64(*x)),
            ExpressionKind::Str(s) => write!(f, "'{}'", s),
            ExpressionKind::Sym(s) => f.write_str(s),
            ExpressionKind::Func(_) => f.write_str("<func>"),
            ExpressionKind::Data(d) => write!(f, "{}", d.to_table()),
            ExpressionKind::Table(parts) => {
                f.write_str("(")?;
                for (n, part) in parts.iter().enumerate() {
                    if n > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", part)?;
                }
                f.write_str(")")
            }
        }
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expression({})", self)
    }
}

/// Serializes to natural JSON: atoms as scalars, symbols as strings, tables
/// as arrays, or as objects when every part is keyed. The expression's own
/// key is the caller's concern (it becomes the entry name in a context).
impl Serialize for Expression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.kind {
            ExpressionKind::None => serializer.serialize_unit(),
            ExpressionKind::I32(n) => serializer.serialize_i32(*n),
            ExpressionKind::F64(x) => serializer.serialize_f64(*x),
            ExpressionKind::Str(s) => serializer.serialize_str(s),
            ExpressionKind::Sym(s) => serializer.serialize_str(s),
            ExpressionKind::Func(_) => serializer.serialize_str("<func>"),
            ExpressionKind::Data(d) => d.to_table().serialize(serializer),
            ExpressionKind::Table(parts) => {
                if parts.iter().all(|part| !part.key().is_empty()) {
                    let mut map = serializer.serialize_map(Some(parts.len()))?;
                    for part in parts {
                        map.serialize_entry(part.key(), part)?;
                    }
                    map.end()
                } else {
                    let mut seq = serializer.serialize_seq(Some(parts.len()))?;
                    for part in parts {
                        if part.key().is_empty() {
                            seq.serialize_element(part)?;
                        } else {
                            seq.serialize_element(&KeyedPart(part))?;
                        }
                    }
                    seq.end()
                }
            }
        }
    }
}

/// A keyed part inside a mixed table serializes as a one-entry object
struct KeyedPart<'a>(&'a Expression);

impl Serialize for KeyedPart<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.0.key(), self.0)?;
        map.end()
    }
}
