//! Probabilities in one of two representations.
//!
//! `Exact` holds an arbitrary-precision rational and is what the preset dice
//! produce. `Real` holds an `f64`, which is faster but rounds. Mixing the two
//! in arithmetic always yields `Real`, so exactness is lost only when a caller
//! has already introduced a float somewhere.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};
use serde::{Serialize, Serializer};

/// Default relative tolerance for [`Prob::is_close`].
pub const DEFAULT_REL_TOL: f64 = 1e-9;
/// Default absolute tolerance for [`Prob::is_close`].
pub const DEFAULT_ABS_TOL: f64 = 0.0;

#[derive(Debug, Clone)]
pub enum Prob {
    Exact(BigRational),
    Real(f64),
}

impl Prob {
    /// Exact `numer / denom`.
    ///
    /// # Panics
    /// If `denom` is zero.
    pub fn ratio(numer: i64, denom: i64) -> Self {
        Prob::Exact(BigRational::new(BigInt::from(numer), BigInt::from(denom)))
    }

    pub fn zero() -> Self {
        Prob::Exact(BigRational::zero())
    }

    pub fn one() -> Self {
        Prob::Exact(BigRational::one())
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, Prob::Exact(_))
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Prob::Exact(r) => r.is_zero(),
            Prob::Real(f) => *f == 0.0,
        }
    }

    /// True for values in the closed interval `[0, 1]`. NaN is out of range.
    pub fn in_unit_range(&self) -> bool {
        match self {
            Prob::Exact(r) => !r.is_negative() && *r <= BigRational::one(),
            Prob::Real(f) => (0.0..=1.0).contains(f),
        }
    }

    pub fn to_f64(&self) -> f64 {
        match self {
            Prob::Exact(r) => rational_to_f64(r),
            Prob::Real(f) => *f,
        }
    }

    /// The same probability in the float representation.
    pub fn to_real(&self) -> Prob {
        Prob::Real(self.to_f64())
    }

    /// Exact denominator, or `None` for a float.
    pub fn denominator(&self) -> Option<&BigInt> {
        match self {
            Prob::Exact(r) => Some(r.denom()),
            Prob::Real(_) => None,
        }
    }

    /// Raise to a non-negative integer power.
    pub fn powi(&self, exp: u32) -> Prob {
        match self {
            Prob::Exact(r) => Prob::Exact(num_traits::pow(r.clone(), exp as usize)),
            Prob::Real(f) => Prob::Real(f.powi(exp as i32)),
        }
    }

    /// Approximate equality with `math.isclose` semantics:
    /// `|a - b| <= max(rel_tol * max(|a|, |b|), abs_tol)`.
    pub fn is_close(&self, other: &Prob, rel_tol: Option<f64>, abs_tol: Option<f64>) -> bool {
        if let (Prob::Exact(a), Prob::Exact(b)) = (self, other) {
            if a == b {
                return true;
            }
        }
        let rel_tol = rel_tol.unwrap_or(DEFAULT_REL_TOL);
        let abs_tol = abs_tol.unwrap_or(DEFAULT_ABS_TOL);
        let (a, b) = (self.to_f64(), other.to_f64());
        if a == b {
            return true;
        }
        let diff = (a - b).abs();
        diff <= (rel_tol * b.abs()).max(rel_tol * a.abs()).max(abs_tol)
    }
}

fn rational_to_f64(r: &BigRational) -> f64 {
    match r.to_f64() {
        Some(f) => f,
        None => {
            let numer = r.numer().to_f64().unwrap_or(f64::NAN);
            let denom = r.denom().to_f64().unwrap_or(f64::NAN);
            numer / denom
        }
    }
}

impl From<f64> for Prob {
    fn from(f: f64) -> Self {
        Prob::Real(f)
    }
}

impl From<BigRational> for Prob {
    fn from(r: BigRational) -> Self {
        Prob::Exact(r)
    }
}

impl From<&Prob> for Prob {
    fn from(p: &Prob) -> Self {
        p.clone()
    }
}

/// Integers are exact: `0` or `1` are the only ones that construct a valid DRV.
impl From<i64> for Prob {
    fn from(n: i64) -> Self {
        Prob::Exact(BigRational::from_integer(BigInt::from(n)))
    }
}

impl From<i32> for Prob {
    fn from(n: i32) -> Self {
        Prob::from(i64::from(n))
    }
}

macro_rules! prob_binop {
    ($trait:ident, $method:ident, $op:tt) => {
        impl $trait<&Prob> for &Prob {
            type Output = Prob;
            fn $method(self, rhs: &Prob) -> Prob {
                match (self, rhs) {
                    (Prob::Exact(a), Prob::Exact(b)) => Prob::Exact(a $op b),
                    (a, b) => Prob::Real(a.to_f64() $op b.to_f64()),
                }
            }
        }

        impl $trait for Prob {
            type Output = Prob;
            fn $method(self, rhs: Prob) -> Prob {
                (&self) $op (&rhs)
            }
        }
    };
}

prob_binop!(Add, add, +);
prob_binop!(Sub, sub, -);
prob_binop!(Mul, mul, *);
prob_binop!(Div, div, /);

impl PartialEq for Prob {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Prob::Exact(a), Prob::Exact(b)) => a == b,
            (a, b) => a.to_f64() == b.to_f64(),
        }
    }
}

impl PartialOrd for Prob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Prob::Exact(a), Prob::Exact(b)) => Some(a.cmp(b)),
            (a, b) => a.to_f64().partial_cmp(&b.to_f64()),
        }
    }
}

impl fmt::Display for Prob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prob::Exact(r) => write!(f, "{}", r),
            Prob::Real(x) => write!(f, "{}", x),
        }
    }
}

impl Serialize for Prob {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Prob::Exact(r) => serializer.serialize_str(&r.to_string()),
            Prob::Real(x) => serializer.serialize_f64(*x),
        }
    }
}
