//! Operators on DRVs.
//!
//! Binary operators take either another DRV or a constant on the right. Two
//! DRVs are treated as independent: every pair of values is combined and the
//! product of their probabilities is added into the result under the
//! combined value.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::sync::Arc;

use tracing::trace;

use crate::dice_engine::convolve;
use crate::dice_engine::drv::{accumulate, Drv, Operand};
use crate::dice_engine::error::{DrvError, Result};
use crate::dice_engine::expressions::Expr;
use crate::dice_engine::probability::Prob;
use crate::dice_engine::value::{self, Value};

/// Reroll cap used by [`Drv::explode_default`].
pub const DEFAULT_REROLLS: u32 = 50;

fn boolean_dist(prob_true: Prob) -> BTreeMap<Value, Prob> {
    let mut dist = BTreeMap::new();
    if prob_true.is_zero() {
        dist.insert(Value::Bool(false), Prob::one());
    } else if prob_true >= Prob::one() {
        dist.insert(Value::Bool(true), Prob::one());
    } else {
        dist.insert(Value::Bool(false), &Prob::one() - &prob_true);
        dist.insert(Value::Bool(true), prob_true);
    }
    dist
}

impl Drv {
    // -----------------------------------------------------------------------
    // Generic combination
    // -----------------------------------------------------------------------

    fn map_values<F>(&self, f: F, tree: Option<Arc<Expr>>) -> Result<Drv>
    where
        F: Fn(&Value) -> Result<Value>,
    {
        Drv::reduced(
            self.items().map(|(v, p)| -> Result<(Value, Prob)> { Ok((f(v)?, p.clone())) }),
            tree,
        )
    }

    fn cross_reduce<F>(&self, right: &Drv, op: F, tree: Option<Arc<Expr>>) -> Result<Drv>
    where
        F: Fn(&Value, &Value) -> Result<Value>,
    {
        let op = &op;
        let pairs = self.items().flat_map(move |(lv, lp)| {
            right
                .items()
                .map(move |(rv, rp)| -> Result<(Value, Prob)> { Ok((op(lv, rv)?, lp * rp)) })
        });
        Drv::reduced(pairs, tree)
    }

    fn apply2<F>(&self, right: &Operand<'_>, connective: &str, op: F) -> Result<Drv>
    where
        F: Fn(&Value, &Value) -> Result<Value>,
    {
        let tree = Drv::combine(&Operand::Drv(self), right, connective);
        match right {
            Operand::Drv(r) => self.cross_reduce(r, op, tree),
            Operand::Const(c) => self.map_values(|v| op(v, c), tree),
        }
    }

    // -----------------------------------------------------------------------
    // Arithmetic
    // -----------------------------------------------------------------------

    /// `self + right`. Large dense integer DRVs are added by convolution.
    pub fn add<'a>(&self, right: impl Into<Operand<'a>>) -> Result<Drv> {
        let right = right.into();
        if let Operand::Drv(r) = right {
            if let Some(sum) = convolve::try_convolve(self, r)? {
                return Ok(sum.replace_tree(Drv::combine(&Operand::Drv(self), &right, "+")));
            }
        }
        self.apply2(&right, "+", Value::try_add)
    }

    /// `self - right`. Against a DRV this is `self + (-right)`, so it shares
    /// the addition fast path.
    pub fn sub<'a>(&self, right: impl Into<Operand<'a>>) -> Result<Drv> {
        let right = right.into();
        match right {
            Operand::Drv(r) => {
                let tree = Drv::combine(&Operand::Drv(self), &right, "-");
                Ok(self.add(&r.neg()?)?.replace_tree(tree))
            }
            Operand::Const(_) => self.apply2(&right, "-", Value::try_sub),
        }
    }

    pub fn mul<'a>(&self, right: impl Into<Operand<'a>>) -> Result<Drv> {
        self.apply2(&right.into(), "*", Value::try_mul)
    }

    /// True division. Zero must not be a possible value of `right`, even
    /// with probability zero.
    pub fn div<'a>(&self, right: impl Into<Operand<'a>>) -> Result<Drv> {
        self.apply2(&right.into(), "/", Value::try_div)
    }

    /// Floor division, with the same restriction on zero as [`Drv::div`].
    pub fn floor_div<'a>(&self, right: impl Into<Operand<'a>>) -> Result<Drv> {
        self.apply2(&right.into(), "//", Value::try_floor_div)
    }

    pub fn neg(&self) -> Result<Drv> {
        self.map_values(Value::try_neg, self.combine_unary("-"))
    }

    // -----------------------------------------------------------------------
    // Comparisons
    // -----------------------------------------------------------------------

    fn compare<'a>(
        &self,
        right: impl Into<Operand<'a>>,
        connective: &str,
        accept: fn(Ordering) -> bool,
    ) -> Result<Drv> {
        self.apply2(&right.into(), connective, |a, b| Ok(Value::Bool(accept(a.try_cmp(b)?))))
    }

    pub fn lt<'a>(&self, right: impl Into<Operand<'a>>) -> Result<Drv> {
        self.compare(right, "<", Ordering::is_lt)
    }

    pub fn le<'a>(&self, right: impl Into<Operand<'a>>) -> Result<Drv> {
        self.compare(right, "<=", Ordering::is_le)
    }

    pub fn gt<'a>(&self, right: impl Into<Operand<'a>>) -> Result<Drv> {
        self.compare(right, ">", Ordering::is_gt)
    }

    pub fn ge<'a>(&self, right: impl Into<Operand<'a>>) -> Result<Drv> {
        self.compare(right, ">=", Ordering::is_ge)
    }

    /// DRV over `true`/`false` for `self == right`.
    ///
    /// If one of the two outcomes is impossible the result has a single
    /// value with probability 1; a zero-probability entry is never created.
    pub fn equals<'a>(&self, right: impl Into<Operand<'a>>) -> Result<Drv> {
        let right = right.into();
        let prob = match right {
            Operand::Drv(r) => {
                let (small, big) = if self.len() <= r.len() { (self, r) } else { (r, self) };
                small.items().fold(Prob::zero(), |acc, (v, p)| match big.probability(v) {
                    Some(q) => &acc + &(p * q),
                    None => acc,
                })
            }
            Operand::Const(ref c) => self.probability(c).cloned().unwrap_or_else(Prob::zero),
        };
        let tree = Drv::combine(&Operand::Drv(self), &right, "==");
        Ok(Drv::from_trusted(boolean_dist(prob), tree))
    }

    pub fn not_equals<'a>(&self, right: impl Into<Operand<'a>>) -> Result<Drv> {
        let right = right.into();
        let tree = Drv::combine(&Operand::Drv(self), &right, "!=");
        let negated = self.equals(right)?.map_values(
            |v| match v {
                Value::Bool(b) => Ok(Value::Bool(!b)),
                other => Ok(other.clone()),
            },
            tree,
        )?;
        Ok(negated)
    }

    // -----------------------------------------------------------------------
    // Repeated sums
    // -----------------------------------------------------------------------

    /// `n @ self`: the sum of `n` independent samples. `n` must be at least 1.
    pub fn repeat(&self, n: u32) -> Result<Drv> {
        if n == 0 {
            return Err(DrvError::Domain("repeat count must be at least 1".into()));
        }
        trace!(n, "repeated sum by squaring");
        let mut result: Option<Drv> = None;
        let mut so_far = self.clone();
        let mut left = n;
        loop {
            if left % 2 == 1 {
                result = Some(match result {
                    None => so_far.clone(),
                    Some(r) => r.add(&so_far)?,
                });
            }
            left /= 2;
            if left == 0 {
                break;
            }
            so_far = Drv::add(&so_far, &so_far)?;
        }
        let tree = Drv::combine(&Operand::Const(Value::from(n)), &Operand::Drv(self), "@");
        result
            .map(|r| r.replace_tree(tree))
            .ok_or_else(|| DrvError::Domain("repeat count must be at least 1".into()))
    }

    /// `count @ self`: sample `count`, then sum that many samples of `self`.
    /// Every value of `count` must be an integer of at least 1.
    pub fn repeat_by(&self, count: &Drv) -> Result<Drv> {
        let mut counts = Vec::with_capacity(count.len());
        for (v, p) in count.items() {
            match v.as_int() {
                Some(n) if n >= 1 => counts.push((n, p)),
                Some(n) => {
                    return Err(DrvError::Domain(format!("repeat count must be at least 1, got {n}")))
                }
                None => {
                    return Err(DrvError::Type(format!(
                        "repeat counts must be integers, got {} ({})",
                        v,
                        v.kind()
                    )))
                }
            }
        }
        let first = counts
            .first()
            .map(|(n, _)| *n)
            .ok_or_else(|| DrvError::Domain("empty repeat count".into()))?;
        let first = u32::try_from(first).map_err(|_| DrvError::Overflow(format!("{first} @ ...")))?;
        // Keys are sorted, so each sum extends the previous one.
        let mut so_far = self.repeat(first)?;
        let mut current = i64::from(first);
        let mut parts = Vec::with_capacity(counts.len());
        for (n, p) in counts {
            while current < n {
                so_far = so_far.add(self)?;
                current += 1;
            }
            parts.push((so_far.clone(), p.clone()));
        }
        let tree = Drv::combine(&Operand::Drv(count), &Operand::Drv(self), "@");
        Drv::weighted_average_tree(parts, tree)
    }

    // -----------------------------------------------------------------------
    // Mapping and mixing
    // -----------------------------------------------------------------------

    /// Map every value through `f`, adding probabilities where values collide.
    /// The result has no expression tree.
    pub fn apply<F>(&self, f: F) -> Result<Drv>
    where
        F: Fn(&Value) -> Value,
    {
        self.map_values(|v| Ok(f(v)), None)
    }

    /// As [`Drv::apply`] with a fallible function.
    pub fn try_apply<F>(&self, f: F) -> Result<Drv>
    where
        F: Fn(&Value) -> Result<Value>,
    {
        self.map_values(f, None)
    }

    /// Map every value to a DRV and mix the results, each weighted by the
    /// probability of the value it came from.
    pub fn apply_drv<F>(&self, f: F) -> Result<Drv>
    where
        F: Fn(&Value) -> Result<Drv>,
    {
        let parts = self
            .items()
            .map(|(v, p)| -> Result<(Drv, Prob)> { Ok((f(v)?, p.clone())) })
            .collect::<Result<Vec<_>>>()?;
        Drv::weighted_average(parts)
    }

    /// Law of total probability: each DRV is the outcome given one of several
    /// mutually exclusive events, paired with that event's probability.
    /// The DRVs may share values. Weights are expected to total 1 but this is
    /// not checked.
    pub fn weighted_average<I, D, P>(pairs: I) -> Result<Drv>
    where
        I: IntoIterator<Item = (D, P)>,
        D: Borrow<Drv>,
        P: Into<Prob>,
    {
        Drv::weighted_average_tree(pairs, None)
    }

    fn weighted_average_tree<I, D, P>(pairs: I, tree: Option<Arc<Expr>>) -> Result<Drv>
    where
        I: IntoIterator<Item = (D, P)>,
        D: Borrow<Drv>,
        P: Into<Prob>,
    {
        let mut dist = BTreeMap::new();
        for (drv, weight) in pairs {
            let weight = weight.into();
            for (v, p) in drv.borrow().items() {
                accumulate(&mut dist, v.clone(), p * &weight);
            }
        }
        Drv::from_map(dist, tree)
    }

    /// An exploding die: on the maximum value, roll again and add, at most
    /// `rerolls` times. The probability of exceeding the cap is given to the
    /// final maximum, so the total is preserved.
    pub fn explode(&self, rerolls: u32) -> Result<Drv> {
        value::ensure_ordered(self.values())?;
        let (top, top_prob) = self
            .items()
            .max_by(|a, b| a.0.try_cmp(b.0).unwrap_or(Ordering::Equal))
            .ok_or_else(|| DrvError::Domain("cannot explode an empty DRV".into()))?;
        let mut pairs = Vec::with_capacity(self.len() * (rerolls as usize + 1));
        for idx in 0..=rerolls {
            let bonus = top.try_mul(&Value::from(idx))?;
            let weight = top_prob.powi(idx);
            for (v, p) in self.items().filter(|(v, _)| *v != top) {
                pairs.push(Ok((v.try_add(&bonus)?, p * &weight)));
            }
        }
        let last = rerolls
            .checked_add(1)
            .ok_or_else(|| DrvError::Overflow(format!("{rerolls} + 1 rerolls")))?;
        pairs.push(Ok((top.try_mul(&Value::from(last))?, top_prob.powi(last))));
        let postfix = if rerolls == DEFAULT_REROLLS {
            ".explode()".to_string()
        } else {
            format!(".explode({rerolls})")
        };
        Drv::reduced(pairs, self.combine_post(&postfix))
    }

    /// [`Drv::explode`] with 50 rerolls.
    pub fn explode_default(&self) -> Result<Drv> {
        self.explode(DEFAULT_REROLLS)
    }

    /// Conditional distribution given that `predicate` holds.
    ///
    /// Fails with [`DrvError::ZeroProbabilityCondition`] if the predicate
    /// holds with probability zero.
    pub fn given<F>(&self, predicate: F) -> Result<Drv>
    where
        F: Fn(&Value) -> bool,
    {
        let kept: Vec<(&Value, &Prob)> = self.items().filter(|(v, _)| predicate(v)).collect();
        let mass = kept.iter().fold(Prob::zero(), |acc, (_, p)| &acc + *p);
        if mass.is_zero() {
            return Err(DrvError::ZeroProbabilityCondition);
        }
        let dist = kept.into_iter().map(|(v, p)| (v.clone(), p / &mass)).collect();
        Drv::from_map(dist, None)
    }
}

// ---------------------------------------------------------------------------
// Operator sugar
// ---------------------------------------------------------------------------

macro_rules! drv_binop {
    ($trait:ident, $method:ident) => {
        impl<'a, R: Into<Operand<'a>>> $trait<R> for &Drv {
            type Output = Result<Drv>;
            fn $method(self, rhs: R) -> Result<Drv> {
                Drv::$method(self, rhs)
            }
        }

        impl<'a, R: Into<Operand<'a>>> $trait<R> for Drv {
            type Output = Result<Drv>;
            fn $method(self, rhs: R) -> Result<Drv> {
                Drv::$method(&self, rhs)
            }
        }
    };
}

drv_binop!(Add, add);
drv_binop!(Sub, sub);
drv_binop!(Mul, mul);
drv_binop!(Div, div);

impl Neg for &Drv {
    type Output = Result<Drv>;
    fn neg(self) -> Result<Drv> {
        Drv::neg(self)
    }
}

impl Neg for Drv {
    type Output = Result<Drv>;
    fn neg(self) -> Result<Drv> {
        Drv::neg(&self)
    }
}
