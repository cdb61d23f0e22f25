//! Possible values of a random variable.
//!
//! A DRV can take values of several kinds at once (a pool's values are
//! [`PoolResult`]s, a comparison's values are booleans), so values are a
//! tagged enum rather than a type parameter.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::dice_engine::error::{DrvError, Result};
use crate::dice_engine::pools::PoolResult;

#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Outcome(PoolResult),
}

// ---------------------------------------------------------------------------
// Equality, hashing and storage order
// ---------------------------------------------------------------------------
//
// These exist so values can key a `BTreeMap`. Numbers are one class: `true`,
// `1` and `1.0` are the same key, so their probabilities merge. Text and pool
// results never equal a number. NaN sorts after every other number and equals
// only itself; -0.0 equals 0.0.

fn class(v: &Value) -> u8 {
    match v {
        Value::Bool(_) | Value::Int(_) | Value::Float(_) => 0,
        Value::Text(_) => 1,
        Value::Outcome(_) => 2,
    }
}

fn canonical_float(f: f64) -> f64 {
    if f == 0.0 {
        0.0
    } else {
        f
    }
}

// 2^63: the first float above every i64.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

fn cmp_floats(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => canonical_float(a).total_cmp(&canonical_float(b)),
    }
}

/// Exact comparison of an integer against a float, without rounding the
/// integer through `f64`.
fn cmp_int_float(i: i64, f: f64) -> Ordering {
    if f.is_nan() || f >= I64_BOUND {
        return Ordering::Less;
    }
    if f < -I64_BOUND {
        return Ordering::Greater;
    }
    let whole = f.trunc();
    i.cmp(&(whole as i64)).then_with(|| whole.partial_cmp(&f).unwrap_or(Ordering::Equal))
}

fn cmp_numbers(a: Num, b: Num) -> Ordering {
    match (a, b) {
        (Num::Int(a), Num::Int(b)) => a.cmp(&b),
        (Num::Int(a), Num::Float(b)) => cmp_int_float(a, b),
        (Num::Float(a), Num::Int(b)) => cmp_int_float(b, a).reverse(),
        (Num::Float(a), Num::Float(b)) => cmp_floats(a, b),
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Outcome(a), Value::Outcome(b)) => a.cmp(b),
            _ => match (self.as_num(), other.as_num()) {
                (Some(a), Some(b)) => cmp_numbers(a, b),
                _ => class(self).cmp(&class(other)),
            },
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        class(self).hash(state);
        match self {
            Value::Bool(b) => i64::from(*b).hash(state),
            Value::Int(n) => n.hash(state),
            // Whole floats hash like the integer they equal.
            Value::Float(f) if f.fract() == 0.0 && (-I64_BOUND..I64_BOUND).contains(f) => {
                (*f as i64).hash(state)
            }
            Value::Float(f) if f.is_nan() => u64::MAX.hash(state),
            Value::Float(f) => canonical_float(*f).to_bits().hash(state),
            Value::Text(s) => s.hash(state),
            Value::Outcome(r) => r.hash(state),
        }
    }
}

// ---------------------------------------------------------------------------
// Semantic comparison and arithmetic
// ---------------------------------------------------------------------------

enum Num {
    Int(i64),
    Float(f64),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Outcome(_) => "pool result",
        }
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Value::Int(_))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_outcome(&self) -> Option<&PoolResult> {
        match self {
            Value::Outcome(r) => Some(r),
            _ => None,
        }
    }

    fn as_num(&self) -> Option<Num> {
        match self {
            Value::Bool(b) => Some(Num::Int(i64::from(*b))),
            Value::Int(n) => Some(Num::Int(*n)),
            Value::Float(f) => Some(Num::Float(*f)),
            _ => None,
        }
    }

    fn is_zero_number(&self) -> bool {
        match self.as_num() {
            Some(Num::Int(n)) => n == 0,
            Some(Num::Float(f)) => f == 0.0,
            None => false,
        }
    }

    /// Order as the values' own kind defines it. Numbers (booleans count as
    /// 0 and 1) compare numerically, text compares lexically. Anything else
    /// is unordered.
    pub fn try_cmp(&self, other: &Value) -> Result<Ordering> {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => return Ok(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => return Ok(a.cmp(b)),
            _ => {}
        }
        let ordering = match (self.as_num(), other.as_num()) {
            (Some(Num::Int(a)), Some(Num::Int(b))) => Some(a.cmp(&b)),
            (Some(Num::Int(a)), Some(Num::Float(b))) => (a as f64).partial_cmp(&b),
            (Some(Num::Float(a)), Some(Num::Int(b))) => a.partial_cmp(&(b as f64)),
            (Some(Num::Float(a)), Some(Num::Float(b))) => a.partial_cmp(&b),
            _ => None,
        };
        ordering.ok_or_else(|| {
            DrvError::Type(format!(
                "cannot order {} ({}) against {} ({})",
                self,
                self.kind(),
                other,
                other.kind()
            ))
        })
    }

    pub fn try_add(&self, rhs: &Value) -> Result<Value> {
        match (self, rhs) {
            (Value::Outcome(r), other) => return Ok(Value::Outcome(r.concat(other)?)),
            (Value::Text(a), Value::Text(b)) => return Ok(Value::Text(format!("{a}{b}"))),
            _ => {}
        }
        numeric_op(self, rhs, "+", i64::checked_add, |a, b| a + b)
    }

    pub fn try_sub(&self, rhs: &Value) -> Result<Value> {
        numeric_op(self, rhs, "-", i64::checked_sub, |a, b| a - b)
    }

    pub fn try_mul(&self, rhs: &Value) -> Result<Value> {
        numeric_op(self, rhs, "*", i64::checked_mul, |a, b| a * b)
    }

    /// True division: the result is always a float.
    pub fn try_div(&self, rhs: &Value) -> Result<Value> {
        if rhs.is_zero_number() {
            return Err(DrvError::DivisionByZero(format!("{self} / {rhs}")));
        }
        match (self.as_num(), rhs.as_num()) {
            (Some(a), Some(b)) => Ok(Value::Float(num_to_f64(a) / num_to_f64(b))),
            _ => Err(unsupported(self, rhs, "/")),
        }
    }

    pub fn try_floor_div(&self, rhs: &Value) -> Result<Value> {
        if rhs.is_zero_number() {
            return Err(DrvError::DivisionByZero(format!("{self} // {rhs}")));
        }
        match (self.as_num(), rhs.as_num()) {
            (Some(Num::Int(a)), Some(Num::Int(b))) => {
                let q = a
                    .checked_div_euclid(b)
                    .ok_or_else(|| DrvError::Overflow(format!("{a} // {b}")))?;
                // div_euclid rounds towards -inf only for positive divisors.
                let q = if b < 0 && a.rem_euclid(b) != 0 { q - 1 } else { q };
                Ok(Value::Int(q))
            }
            (Some(a), Some(b)) => Ok(Value::Float((num_to_f64(a) / num_to_f64(b)).floor())),
            _ => Err(unsupported(self, rhs, "//")),
        }
    }

    pub fn try_neg(&self) -> Result<Value> {
        match self.as_num() {
            Some(Num::Int(n)) => n
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| DrvError::Overflow(format!("-{n}"))),
            Some(Num::Float(f)) => Ok(Value::Float(-f)),
            None => Err(DrvError::Type(format!("cannot negate {} ({})", self, self.kind()))),
        }
    }

    /// Sum of the dice in a pool result. Lets `pool.try_apply(Value::outcome_sum)`
    /// reduce a pool to its total.
    pub fn outcome_sum(&self) -> Result<Value> {
        match self {
            Value::Outcome(r) => r.sum(),
            other => Err(DrvError::Type(format!(
                "expected a pool result, got {} ({})",
                other,
                other.kind()
            ))),
        }
    }
}

/// Fails unless every value can be ordered against every other.
pub(crate) fn ensure_ordered<'a>(mut values: impl Iterator<Item = &'a Value>) -> Result<()> {
    if let Some(first) = values.next() {
        for v in values {
            first.try_cmp(v)?;
        }
    }
    Ok(())
}

fn num_to_f64(n: Num) -> f64 {
    match n {
        Num::Int(i) => i as f64,
        Num::Float(f) => f,
    }
}

fn unsupported(lhs: &Value, rhs: &Value, op: &str) -> DrvError {
    DrvError::Type(format!(
        "unsupported operands for {op}: {} and {}",
        lhs.kind(),
        rhs.kind()
    ))
}

fn numeric_op(
    lhs: &Value,
    rhs: &Value,
    op: &str,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value> {
    match (lhs.as_num(), rhs.as_num()) {
        (Some(Num::Int(a)), Some(Num::Int(b))) => int_op(a, b)
            .map(Value::Int)
            .ok_or_else(|| DrvError::Overflow(format!("{a} {op} {b}"))),
        (Some(a), Some(b)) => Ok(Value::Float(float_op(num_to_f64(a), num_to_f64(b)))),
        _ => Err(unsupported(lhs, rhs, op)),
    }
}

// ---------------------------------------------------------------------------
// Conversions and rendering
// ---------------------------------------------------------------------------

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Int(n as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<PoolResult> for Value {
    fn from(r: PoolResult) -> Self {
        Value::Outcome(r)
    }
}

impl From<&PoolResult> for Value {
    fn from(r: &PoolResult) -> Self {
        Value::Outcome(r.clone())
    }
}

impl From<&Value> for Value {
    fn from(v: &Value) -> Self {
        v.clone()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            // Debug keeps the decimal point on whole floats ("3.0").
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Outcome(r) => write!(f, "{}", r),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Outcome(r) => {
                let mut st = serializer.serialize_struct("PoolResult", 2)?;
                st.serialize_field("kind", r.kind_name())?;
                st.serialize_field("values", r.values())?;
                st.end()
            }
        }
    }
}
