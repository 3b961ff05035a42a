pub mod serializer;

use indexmap::IndexMap;
use std::cmp::Ordering;
use std::fmt;

pub use serializer::to_value;

/// A render context value. Decided once when the context is bound, so the
/// renderer never has to guess whether something is a sequence or a mapping.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    Str(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
}

/// Coarse type used by strict equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Null,
    Bool,
    Number,
    Str,
    List,
    Map,
}

impl Value {
    fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Bool,
            Value::I64(_) | Value::F64(_) => Kind::Number,
            Value::Str(_) => Kind::Str,
            Value::List(_) => Kind::List,
            Value::Map(_) => Kind::Map,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::I64(n) => *n != 0,
            Value::F64(f) => *f != 0.0 && !f.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::List(_) | Value::Map(_) => true,
        }
    }

    /// Numeric view used by ordering and arithmetic. `None` behaves as NaN.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Value::Null => Some(0.0),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::I64(n) => Some(*n as f64),
            Value::F64(f) => Some(*f),
            Value::Str(s) => {
                let s = s.trim();
                if s.is_empty() {
                    Some(0.0)
                } else {
                    s.parse::<f64>().ok()
                }
            }
            Value::List(_) | Value::Map(_) => None,
        }
    }

    /// `==` semantics.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::List(_), _) | (_, Value::List(_)) | (Value::Map(_), _) | (_, Value::Map(_)) => {
                self == other
            }
            _ => match (self.to_number(), other.to_number()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    /// `===` semantics: same type class, no coercion.
    pub fn strict_eq(&self, other: &Value) -> bool {
        if self.kind() != other.kind() {
            return false;
        }
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(_), _) | (Value::Map(_), _) => self == other,
            _ => self.to_number() == other.to_number(),
        }
    }

    /// Ordering for `< > <= >=`. Two strings compare lexicographically,
    /// anything else numerically; `None` when a side is not a number.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            _ => self.to_number()?.partial_cmp(&other.to_number()?),
        }
    }

    pub fn add(&self, other: &Value) -> Value {
        match (self, other) {
            (Value::Str(_), _) | (_, Value::Str(_)) => Value::Str(format!("{}{}", self, other)),
            (Value::I64(a), Value::I64(b)) => a
                .checked_add(*b)
                .map(Value::I64)
                .unwrap_or(Value::F64(*a as f64 + *b as f64)),
            _ => Value::F64(num(self) + num(other)),
        }
    }

    pub fn sub(&self, other: &Value) -> Value {
        match (self, other) {
            (Value::I64(a), Value::I64(b)) => a
                .checked_sub(*b)
                .map(Value::I64)
                .unwrap_or(Value::F64(*a as f64 - *b as f64)),
            _ => Value::F64(num(self) - num(other)),
        }
    }

    pub fn mul(&self, other: &Value) -> Value {
        match (self, other) {
            (Value::I64(a), Value::I64(b)) => a
                .checked_mul(*b)
                .map(Value::I64)
                .unwrap_or(Value::F64(*a as f64 * *b as f64)),
            _ => Value::F64(num(self) * num(other)),
        }
    }

    pub fn div(&self, other: &Value) -> Value {
        Value::F64(num(self) / num(other))
    }

    pub fn neg(&self) -> Value {
        match self {
            Value::I64(n) => n
                .checked_neg()
                .map(Value::I64)
                .unwrap_or(Value::F64(-(*n as f64))),
            _ => Value::F64(-num(self)),
        }
    }

    /// Walks a dotted path. A missing key, an out-of-range index or a
    /// scalar in the middle of the path yields `None`.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut current = self;
        for part in path.split('.') {
            current = match current {
                Value::Map(m) => m.get(part)?,
                Value::List(items) => items.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Parses a literal matching `^[0-9.]+$`. Integers without a dot become
    /// `I64`, everything else `F64`.
    pub fn parse_numeric(s: &str) -> Option<Value> {
        if !is_numeric_literal(s) {
            return None;
        }
        if !s.contains('.') {
            if let Ok(n) = s.parse::<i64>() {
                return Some(Value::I64(n));
            }
        }
        s.parse::<f64>().ok().map(Value::F64)
    }
}

fn num(v: &Value) -> f64 {
    v.to_number().unwrap_or(f64::NAN)
}

pub(crate) fn is_numeric_literal(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit() || b == b'.')
}

fn format_number(f: f64, out: &mut fmt::Formatter<'_>) -> fmt::Result {
    if f.is_nan() {
        write!(out, "NaN")
    } else if f.is_infinite() {
        write!(out, "{}", if f > 0.0 { "Infinity" } else { "-Infinity" })
    } else if f.fract() == 0.0 && f.abs() < 1e15 {
        write!(out, "{}", f as i64)
    } else {
        write!(out, "{}", f)
    }
}

/// Output form of a value. `Null` and maps print nothing.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null | Value::Map(_) => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::I64(n) => write!(f, "{}", n),
            Value::F64(n) => format_number(*n, f),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}
impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I64(v as i64)
    }
}
impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}
impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}
impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}
impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}
impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}
impl From<IndexMap<String, Value>> for Value {
    fn from(v: IndexMap<String, Value>) -> Self {
        Value::Map(v)
    }
}
