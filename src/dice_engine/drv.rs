//! The discrete random variable type: representation, queries and sampling.
//!
//! Operators live in [`arithmetic`](crate::dice_engine::arithmetic).

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use num_bigint::{BigInt, RandBigInt};
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Zero};
use once_cell::sync::OnceCell;
use rand::Rng;
use serde::Serialize;

use crate::dice_engine::error::{DrvError, Result};
use crate::dice_engine::expressions::Expr;
use crate::dice_engine::pools::PoolResult;
use crate::dice_engine::probability::Prob;
use crate::dice_engine::rng;
use crate::dice_engine::value::{self, Value};

/// A discrete random variable: a finite mapping from possible values to
/// probabilities.
///
/// A `Drv` is immutable. Every operation returns a new one.
///
/// The comparison methods ([`Drv::equals`], [`Drv::lt`], ...) return another
/// `Drv` over `true`/`false`, so `Drv` deliberately implements neither
/// `PartialEq` nor `Hash` and cannot be tested for membership in a collection:
///
/// ```compile_fail
/// use dice_drv::dice;
/// let (d4, d6) = (dice::d4(), dice::d6());
/// let found = vec![d4].contains(&d6);
/// ```
///
/// The derived data needed for sampling is computed on first use and cached
/// behind thread-safe cells, so a `Drv` can be shared across threads.
#[derive(Debug, Clone)]
pub struct Drv {
    dist: Arc<BTreeMap<Value, Prob>>,
    tree: Option<Arc<Expr>>,
    cdf: OnceCell<Vec<(Prob, Value)>>,
    lcm: OnceCell<BigInt>,
    int_valued: OnceCell<bool>,
}

/// One row of [`Drv::to_json`].
#[derive(Debug, Clone, Serialize)]
pub struct TableRow {
    pub value: Value,
    pub probability: Prob,
}

/// Right-hand side of a binary operator: another DRV or a constant.
#[derive(Debug, Clone)]
pub enum Operand<'a> {
    Drv(&'a Drv),
    Const(Value),
}

impl<'a> From<&'a Drv> for Operand<'a> {
    fn from(drv: &'a Drv) -> Self {
        Operand::Drv(drv)
    }
}

macro_rules! const_operand {
    ($($ty:ty),*) => {
        $(
            impl<'a> From<$ty> for Operand<'a> {
                fn from(v: $ty) -> Self {
                    Operand::Const(Value::from(v))
                }
            }
        )*
    };
}

const_operand!(i64, i32, u32, usize, f64, bool, &str, String, Value, PoolResult, &Value);

pub(crate) fn accumulate(dist: &mut BTreeMap<Value, Prob>, value: Value, prob: Prob) {
    match dist.entry(value) {
        Entry::Occupied(mut e) => {
            let total = &*e.get() + &prob;
            *e.get_mut() = total;
        }
        Entry::Vacant(e) => {
            e.insert(prob);
        }
    }
}

impl Drv {
    /// Build a DRV from `(value, probability)` pairs. Repeated values have
    /// their probabilities added together.
    ///
    /// Fails if any probability is outside `[0, 1]` or there are no pairs.
    /// The total is not required to be exactly 1.
    pub fn new<I, V, P>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (V, P)>,
        V: Into<Value>,
        P: Into<Prob>,
    {
        let mut dist = BTreeMap::new();
        for (value, prob) in pairs {
            accumulate(&mut dist, value.into(), prob.into());
        }
        Self::from_map(dist, None)
    }

    pub(crate) fn from_map(dist: BTreeMap<Value, Prob>, tree: Option<Arc<Expr>>) -> Result<Self> {
        if dist.is_empty() {
            return Err(DrvError::Domain("a DRV needs at least one possible value".into()));
        }
        if let Some((value, prob)) = dist.iter().find(|(_, p)| !p.in_unit_range()) {
            return Err(DrvError::ProbabilityOutOfRange(format!("{value}: {prob}")));
        }
        Ok(Self::from_trusted(dist, tree))
    }

    /// Skips validation. Callers guarantee a non-empty map of valid probabilities.
    pub(crate) fn from_trusted(dist: BTreeMap<Value, Prob>, tree: Option<Arc<Expr>>) -> Self {
        Drv {
            dist: Arc::new(dist),
            tree,
            cdf: OnceCell::new(),
            lcm: OnceCell::new(),
            int_valued: OnceCell::new(),
        }
    }

    /// Collapse `(value, probability)` pairs into a DRV, summing collisions.
    pub(crate) fn reduced<I>(pairs: I, tree: Option<Arc<Expr>>) -> Result<Self>
    where
        I: IntoIterator<Item = Result<(Value, Prob)>>,
    {
        let mut dist = BTreeMap::new();
        for pair in pairs {
            let (value, prob) = pair?;
            accumulate(&mut dist, value, prob);
        }
        Self::from_map(dist, tree)
    }

    // ── queries ────────────────────────────────────────────────────────────

    /// Owned copy of the distribution. Changing it never affects `self`.
    pub fn to_dict(&self) -> BTreeMap<Value, Prob> {
        self.dist.as_ref().clone()
    }

    pub fn items(&self) -> impl DoubleEndedIterator<Item = (&Value, &Prob)> {
        self.dist.iter()
    }

    pub fn values(&self) -> impl DoubleEndedIterator<Item = &Value> {
        self.dist.keys()
    }

    /// Number of possible values, including any with probability zero.
    pub fn len(&self) -> usize {
        self.dist.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dist.is_empty()
    }

    pub fn probability(&self, value: &Value) -> Option<&Prob> {
        self.dist.get(value)
    }

    pub fn tree(&self) -> Option<&Arc<Expr>> {
        self.tree.as_ref()
    }

    /// True if every possible value is an integer.
    pub fn is_integer_valued(&self) -> bool {
        *self.int_valued.get_or_init(|| self.dist.keys().all(Value::is_int))
    }

    fn support(&self) -> impl Iterator<Item = (&Value, &Prob)> {
        self.dist.iter().filter(|(_, p)| !p.is_zero())
    }

    fn same_support(&self, other: &Drv) -> bool {
        self.support().map(|(v, _)| v).eq(other.support().map(|(v, _)| v))
    }

    /// Same distribution: equal sets of values with non-zero probability and
    /// exactly equal probabilities for each.
    pub fn is_same(&self, other: &Drv) -> bool {
        self.same_support(other)
            && self.support().all(|(v, p)| other.dist.get(v).map_or(false, |q| p == q))
    }

    /// As [`Drv::is_same`], but probabilities only need to be close
    /// (`math.isclose` semantics; defaults `rel_tol = 1e-9`, `abs_tol = 0`).
    pub fn is_close(&self, other: &Drv, rel_tol: Option<f64>, abs_tol: Option<f64>) -> bool {
        self.same_support(other)
            && self.support().all(|(v, p)| {
                other.dist.get(v).map_or(false, |q| p.is_close(q, rel_tol, abs_tol))
            })
    }

    /// Cumulative probabilities in distribution order, each paired with the
    /// value that reached it. If rounding leaves the total below 1, a final
    /// entry forces it to 1 so that sampling always lands on a value.
    pub fn cdf(&self) -> &[(Prob, Value)] {
        self.cdf.get_or_init(|| {
            let mut total = Prob::zero();
            let mut out = Vec::with_capacity(self.dist.len() + 1);
            for (value, prob) in self.dist.iter() {
                total = &total + prob;
                out.push((total.clone(), value.clone()));
            }
            if total < Prob::one() {
                let one = if total.is_exact() { Prob::one() } else { Prob::Real(1.0) };
                if let Some((_, last)) = out.last().cloned() {
                    out.push((one, last));
                }
            }
            out
        })
    }

    /// LCM of all denominators when every probability is exact, else zero.
    fn sampling_denominator(&self) -> &BigInt {
        self.lcm.get_or_init(|| {
            let mut lcm = BigInt::one();
            for prob in self.dist.values() {
                match prob.denominator() {
                    Some(denom) => lcm = lcm.lcm(denom),
                    None => return BigInt::zero(),
                }
            }
            lcm
        })
    }

    // ── sampling ───────────────────────────────────────────────────────────

    /// Sample using the process-wide generator (see [`rng::seed`]).
    pub fn sample(&self) -> Value {
        rng::with_rng(|r| self.sample_with(r))
    }

    /// Sample using the given generator.
    ///
    /// Exact distributions draw an exact rational `k / lcm` with `k` uniform
    /// in `1..=lcm`; anything else draws a float in `[0, 1)`.
    pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Value {
        let cdf = self.cdf();
        let lcm = self.sampling_denominator();
        // Leftmost total >= sample. A repeated total comes from a value with
        // probability zero, which must never be picked.
        let idx = if lcm.is_zero() {
            let x: f64 = rng.gen();
            cdf.partition_point(|(total, _)| total.to_f64() < x)
        } else {
            let k = rng.gen_bigint_range(&BigInt::zero(), lcm) + BigInt::one();
            let x = Prob::Exact(BigRational::new(k, lcm.clone()));
            cdf.partition_point(|(total, _)| *total < x)
        };
        let idx = idx.min(cdf.len().saturating_sub(1));
        cdf[idx].1.clone()
    }

    // ── conversions ────────────────────────────────────────────────────────

    /// Same distribution, different expression tree. Used when an optimised
    /// construction would otherwise lose the expression it came from.
    pub fn replace_tree(&self, tree: Option<Arc<Expr>>) -> Drv {
        Drv {
            dist: Arc::clone(&self.dist),
            tree,
            cdf: self.cdf.clone(),
            lcm: self.lcm.clone(),
            int_valued: self.int_valued.clone(),
        }
    }

    /// All probabilities converted to floats: faster, less precise.
    pub fn faster(&self) -> Result<Drv> {
        let dist = self.dist.iter().map(|(v, p)| (v.clone(), p.to_real())).collect();
        Drv::from_map(dist, self.combine_post(".faster()"))
    }

    /// Two-column listing, `value<TAB>probability`, sorted by value when the
    /// values can be ordered against each other.
    pub fn to_table(&self, as_float: bool) -> String {
        let mut rows: Vec<(&Value, Prob)> = self
            .dist
            .iter()
            .map(|(v, p)| (v, if as_float { p.to_real() } else { p.clone() }))
            .collect();
        if value::ensure_ordered(rows.iter().map(|(v, _)| *v)).is_ok() {
            rows.sort_by(|a, b| a.0.try_cmp(b.0).unwrap_or(std::cmp::Ordering::Equal));
        }
        let mut lines = vec!["value\tprobability".to_string()];
        lines.extend(rows.iter().map(|(v, p)| format!("{v}\t{p}")));
        lines.join("\n")
    }

    /// The distribution as a JSON array of `{value, probability}` objects.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let rows: Vec<TableRow> = self
            .dist
            .iter()
            .map(|(v, p)| TableRow { value: v.clone(), probability: p.clone() })
            .collect();
        Ok(serde_json::to_value(rows)?)
    }

    // ── expression tree helpers ────────────────────────────────────────────

    fn operand_tree(operand: &Operand<'_>) -> Option<Arc<Expr>> {
        match operand {
            Operand::Drv(d) => d.tree.clone(),
            Operand::Const(v) => Some(Arc::new(Expr::atom(v.to_string()))),
        }
    }

    /// Tree for `left <connective> right`; `None` if either side has none.
    pub(crate) fn combine(
        left: &Operand<'_>,
        right: &Operand<'_>,
        connective: &str,
    ) -> Option<Arc<Expr>> {
        let l = Self::operand_tree(left)?;
        let r = Self::operand_tree(right)?;
        Some(Arc::new(Expr::binary(l, r, connective)))
    }

    pub(crate) fn combine_unary(&self, operator: &str) -> Option<Arc<Expr>> {
        let sub = self.tree.clone()?;
        Some(Arc::new(Expr::unary(operator, sub)))
    }

    pub(crate) fn combine_post(&self, postfix: &str) -> Option<Arc<Expr>> {
        let sub = self.tree.clone()?;
        Some(Arc::new(Expr::attr(sub, postfix)))
    }
}

impl fmt::Display for Drv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tree) = &self.tree {
            return write!(f, "{}", tree.bracketed());
        }
        let body = self
            .dist
            .iter()
            .map(|(v, p)| format!("{v}: {p}"))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "DRV({{{body}}})")
    }
}

/// Probability that a boolean-valued DRV is `true`.
///
/// Fails with a type error if any possible value is not a boolean.
pub fn p(var: &Drv) -> Result<Prob> {
    if let Some(bad) = var.values().find(|v| v.as_bool().is_none()) {
        return Err(DrvError::Type(format!(
            "variable must be boolean-valued, found {} ({})",
            bad,
            bad.kind()
        )));
    }
    Ok(var.probability(&Value::Bool(true)).cloned().unwrap_or_else(Prob::zero))
}
