//! Dice pools: DRVs whose values keep every die's roll instead of a total.
//!
//! A pool starts as a single empty [`PoolResult`] with probability 1. Each die
//! is then DRV-added to it; adding a value to a `PoolResult` appends the value
//! and re-normalizes, so the ordinary cross-product-and-reduce of
//! [`Drv::add`] collapses equivalent outcomes after every die. A
//! normalization that throws information away early (keep the top two, say)
//! keeps big pools small.
//!
//! Equality of results is qualified by their [`ResultType`]:
//! `PlainResult(6, 5)` and `Highest_2(6, 5)` are different outcomes, and so
//! are a built-in type and a custom type that happens to share its name.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tracing::trace;

use crate::dice_engine::drv::Drv;
use crate::dice_engine::error::{DrvError, Result};
use crate::dice_engine::probability::Prob;
use crate::dice_engine::value::{ensure_ordered, Value};

/// Function form of a normalization, for [`ResultType::from_fn`] and
/// [`PoolOptions::normalize`].
pub type NormalizeFn = Arc<dyn Fn(Vec<Value>) -> Result<Vec<Value>> + Send + Sync>;

/// How a pool result erases differences that do not matter.
///
/// `name` qualifies equality: two results are equal only if their types have
/// the same name, are both built in or both custom, and their normalized
/// values match.
pub trait Normalize: Send + Sync {
    fn name(&self) -> &str;
    fn normalize(&self, values: Vec<Value>) -> Result<Vec<Value>>;
}

/// Sort descending. Fails if the values cannot be ordered against each other.
pub fn sorted_descending(mut values: Vec<Value>) -> Result<Vec<Value>> {
    ensure_ordered(values.iter())?;
    values.sort_by(|a, b| b.try_cmp(a).unwrap_or(Ordering::Equal));
    Ok(values)
}

// ---------------------------------------------------------------------------
// Built-in result types
// ---------------------------------------------------------------------------

struct Plain;

impl Normalize for Plain {
    fn name(&self) -> &str {
        "PlainResult"
    }

    fn normalize(&self, values: Vec<Value>) -> Result<Vec<Value>> {
        sorted_descending(values)
    }
}

struct KeepHighest {
    keep: usize,
    name: String,
}

impl Normalize for KeepHighest {
    fn name(&self) -> &str {
        &self.name
    }

    fn normalize(&self, values: Vec<Value>) -> Result<Vec<Value>> {
        let mut values = sorted_descending(values)?;
        values.truncate(self.keep);
        Ok(values)
    }
}

struct KeepLowest {
    keep: usize,
    name: String,
}

impl Normalize for KeepLowest {
    fn name(&self) -> &str {
        &self.name
    }

    fn normalize(&self, values: Vec<Value>) -> Result<Vec<Value>> {
        let mut values = sorted_descending(values)?;
        let skip = values.len().saturating_sub(self.keep);
        Ok(values.split_off(skip))
    }
}

/// Keeps roll order, so every permutation is a distinct outcome.
struct Ordered;

impl Normalize for Ordered {
    fn name(&self) -> &str {
        "Ordered"
    }

    fn normalize(&self, values: Vec<Value>) -> Result<Vec<Value>> {
        Ok(values)
    }
}

struct FromFn {
    name: String,
    f: NormalizeFn,
}

impl Normalize for FromFn {
    fn name(&self) -> &str {
        &self.name
    }

    fn normalize(&self, values: Vec<Value>) -> Result<Vec<Value>> {
        (self.f)(values)
    }
}

/// A shared handle to a [`Normalize`] implementation.
///
/// Identity is the name plus whether the type is built in, so a custom type
/// named `PlainResult` is still a different type from the built-in one.
#[derive(Clone)]
pub struct ResultType {
    inner: Arc<dyn Normalize>,
    custom: bool,
}

impl ResultType {
    /// A caller-defined result type.
    pub fn new(normalize: impl Normalize + 'static) -> Self {
        ResultType { inner: Arc::new(normalize), custom: true }
    }

    fn builtin(normalize: impl Normalize + 'static) -> Self {
        ResultType { inner: Arc::new(normalize), custom: false }
    }

    /// Order-insensitive: values sorted descending.
    pub fn plain() -> Self {
        Self::builtin(Plain)
    }

    /// Keep the `keep` highest values.
    pub fn highest(keep: usize) -> Self {
        Self::builtin(KeepHighest { keep, name: format!("Highest_{keep}") })
    }

    /// Keep the `keep` lowest values. Zero keeps nothing.
    pub fn lowest(keep: usize) -> Self {
        Self::builtin(KeepLowest { keep, name: format!("Lowest_{keep}") })
    }

    pub fn ordered() -> Self {
        Self::builtin(Ordered)
    }

    /// An anonymous result type from a plain function.
    pub fn from_fn<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Vec<Value>> + Send + Sync + 'static,
    {
        Self::new(FromFn { name: name.into(), f: Arc::new(f) })
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn is_custom(&self) -> bool {
        self.custom
    }

    pub fn normalize(&self, values: Vec<Value>) -> Result<Vec<Value>> {
        self.inner.normalize(values)
    }

    fn identity(&self) -> (bool, &str) {
        (self.custom, self.name())
    }
}

impl Default for ResultType {
    fn default() -> Self {
        Self::plain()
    }
}

impl fmt::Debug for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultType")
            .field("name", &self.name())
            .field("custom", &self.custom)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// PoolResult
// ---------------------------------------------------------------------------

/// One joint outcome of a pool: the normalized values of its dice.
#[derive(Clone)]
pub struct PoolResult {
    kind: ResultType,
    values: Vec<Value>,
}

impl PoolResult {
    pub fn new(kind: ResultType, values: Vec<Value>) -> Result<Self> {
        let values = kind.normalize(values)?;
        Ok(PoolResult { kind, values })
    }

    pub fn plain(values: Vec<Value>) -> Result<Self> {
        Self::new(ResultType::plain(), values)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn kind_name(&self) -> &str {
        self.kind.name()
    }

    pub fn result_type(&self) -> &ResultType {
        &self.kind
    }

    /// Numeric total of the values; zero for an empty result.
    pub fn sum(&self) -> Result<Value> {
        self.values.iter().try_fold(Value::Int(0), |total, v| total.try_add(v))
    }

    /// Append `other` (all of its values if it is itself a result). The left
    /// result's type wins.
    pub fn concat(&self, other: &Value) -> Result<PoolResult> {
        let mut values = self.values.clone();
        match other {
            Value::Outcome(r) => values.extend(r.values.iter().cloned()),
            v => values.push(v.clone()),
        }
        Self::new(self.kind.clone(), values)
    }

    pub fn to_plain(&self) -> Result<PoolResult> {
        Self::plain(self.values.clone())
    }
}

impl<'a> IntoIterator for &'a PoolResult {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl PartialEq for PoolResult {
    fn eq(&self, other: &Self) -> bool {
        self.kind.identity() == other.kind.identity() && self.values == other.values
    }
}

impl Eq for PoolResult {}

impl PartialOrd for PoolResult {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PoolResult {
    fn cmp(&self, other: &Self) -> Ordering {
        self.kind
            .identity()
            .cmp(&other.kind.identity())
            .then_with(|| self.values.cmp(&other.values))
    }
}

impl Hash for PoolResult {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.identity().hash(state);
        self.values.hash(state);
    }
}

impl fmt::Debug for PoolResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for PoolResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = self.values.iter().map(Value::to_string).collect::<Vec<_>>().join(", ");
        write!(f, "{}({})", self.kind_name(), body)
    }
}

// ---------------------------------------------------------------------------
// Building pools
// ---------------------------------------------------------------------------

/// Options for [`pool_with`].
#[derive(Clone)]
pub struct PoolOptions {
    /// With exactly one DRV, how many times to repeat it.
    pub count: usize,
    pub result_type: ResultType,
    /// Overrides `result_type` during construction. The finished pool is
    /// converted back to plain results.
    pub normalize: Option<NormalizeFn>,
}

impl PoolOptions {
    pub fn new() -> Self {
        PoolOptions { count: 1, result_type: ResultType::plain(), normalize: None }
    }

    pub fn count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn result_type(mut self, result_type: ResultType) -> Self {
        self.result_type = result_type;
        self
    }

    pub fn normalize<F>(mut self, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Vec<Value>> + Send + Sync + 'static,
    {
        self.normalize = Some(Arc::new(f));
        self
    }
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PoolOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolOptions")
            .field("count", &self.count)
            .field("result_type", &self.result_type)
            .field("normalize", &self.normalize.is_some())
            .finish()
    }
}

/// Pool of the given dice with plain results.
pub fn pool(drvs: &[&Drv]) -> Result<Drv> {
    pool_with(drvs, PoolOptions::new())
}

pub fn pool_with(drvs: &[&Drv], options: PoolOptions) -> Result<Drv> {
    let summands: Vec<&Drv> = match drvs {
        [single] => vec![*single; options.count],
        _ if options.count != 1 => {
            return Err(DrvError::Type(
                "a count needs exactly one DRV to repeat".into(),
            ))
        }
        _ => drvs.to_vec(),
    };
    let kind = match &options.normalize {
        Some(f) => ResultType::builtin(FromFn { name: "Normalized".into(), f: Arc::clone(f) }),
        None => options.result_type.clone(),
    };
    let empty = PoolResult::new(kind, Vec::new())?;
    let mut pool = Drv::new([(Value::Outcome(empty), Prob::one())])?;
    for (step, die) in summands.into_iter().enumerate() {
        pool = pool.add(die)?;
        trace!(step, outcomes = pool.len(), "added die to pool");
    }
    if options.normalize.is_some() {
        plain(&pool)
    } else {
        Ok(pool)
    }
}

/// Convert every result back to a `PlainResult`, dropping any special
/// normalization.
pub fn plain(pool: &Drv) -> Result<Drv> {
    pool.try_apply(|v| match v {
        Value::Outcome(r) => Ok(Value::Outcome(r.to_plain()?)),
        other => Err(DrvError::Type(format!(
            "expected a pool result, got {} ({})",
            other,
            other.kind()
        ))),
    })
}

fn how_many(drvs: &[&Drv], count: usize) -> usize {
    if drvs.len() == 1 {
        count
    } else {
        drvs.len()
    }
}

fn kept_pool(drvs: &[&Drv], count: usize, result_type: ResultType) -> Result<Drv> {
    plain(&pool_with(drvs, PoolOptions::new().count(count).result_type(result_type))?)
}

/// Keep the `keep` highest dice. Dice added to the pool afterwards are not
/// subject to the limit.
pub fn keep_highest(keep: usize, drvs: &[&Drv], count: usize) -> Result<Drv> {
    kept_pool(drvs, count, ResultType::highest(keep))
}

pub fn keep_lowest(keep: usize, drvs: &[&Drv], count: usize) -> Result<Drv> {
    kept_pool(drvs, count, ResultType::lowest(keep))
}

/// Drop the `drop` highest dice, i.e. keep the rest from the bottom.
pub fn drop_highest(drop: usize, drvs: &[&Drv], count: usize) -> Result<Drv> {
    let keep = how_many(drvs, count).saturating_sub(drop);
    kept_pool(drvs, count, ResultType::lowest(keep))
}

pub fn drop_lowest(drop: usize, drvs: &[&Drv], count: usize) -> Result<Drv> {
    let keep = how_many(drvs, count).saturating_sub(drop);
    kept_pool(drvs, count, ResultType::highest(keep))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice_engine::dice::{d10, d4, d6, d8};

    fn result(kind: ResultType, values: &[i64]) -> Value {
        Value::Outcome(PoolResult::new(kind, values.iter().map(|&v| Value::Int(v)).collect()).unwrap())
    }

    fn plain_result(values: &[i64]) -> Value {
        result(ResultType::plain(), values)
    }

    fn totals(pool: &Drv) -> Drv {
        pool.try_apply(Value::outcome_sum).unwrap()
    }

    #[test]
    fn plain_results_ignore_order() {
        assert_eq!(plain_result(&[1, 2, 1]), plain_result(&[2, 1, 1]));
        assert_ne!(plain_result(&[1, 1, 2]), plain_result(&[1, 2, 2]));
        assert_eq!(plain_result(&[1, 2, 3]).to_string(), "PlainResult(3, 2, 1)");
    }

    #[test]
    fn equality_is_qualified_by_type() {
        assert_ne!(plain_result(&[6, 5]), result(ResultType::highest(2), &[6, 5]));
        assert_eq!(result(ResultType::highest(2), &[6, 5]), result(ResultType::highest(2), &[5, 6]));
        assert_ne!(result(ResultType::highest(2), &[6]), result(ResultType::highest(1), &[6]));
    }

    #[test]
    fn custom_types_never_match_builtins() {
        let fake_plain = ResultType::from_fn("PlainResult", sorted_descending);
        assert!(fake_plain.is_custom());
        assert!(!ResultType::plain().is_custom());
        assert_ne!(result(fake_plain.clone(), &[6, 5]), plain_result(&[6, 5]));
        assert_eq!(result(fake_plain.clone(), &[5, 6]), result(fake_plain, &[6, 5]));

        let fake_high = ResultType::from_fn("Highest_2", |values| {
            let mut values = sorted_descending(values)?;
            values.truncate(2);
            Ok(values)
        });
        let fake = pool_with(&[&d6()], PoolOptions::new().count(2).result_type(fake_high)).unwrap();
        let real =
            pool_with(&[&d6()], PoolOptions::new().count(2).result_type(ResultType::highest(2))).unwrap();
        assert!(!fake.is_same(&real));
        assert!(plain(&fake).unwrap().is_same(&plain(&real).unwrap()));
    }

    #[test]
    fn unordered_values_cannot_be_pooled() {
        let mixed = PoolResult::plain(vec![Value::Int(1), Value::from("x")]);
        assert!(matches!(mixed, Err(DrvError::Type(_))));
    }

    #[test]
    fn two_dice() {
        let pl = pool(&[&d4(), &d4()]).unwrap();
        assert_eq!(pl.len(), 10);
        assert_eq!(pl.probability(&plain_result(&[1, 1])), Some(&Prob::ratio(1, 16)));
        assert_eq!(pl.probability(&plain_result(&[2, 1])), Some(&Prob::ratio(1, 8)));
        assert!(totals(&pl).is_same(&(&d4() + &d4()).unwrap()));
    }

    #[test]
    fn mixed_dice_middle_value() {
        let pl = pool(&[&d4(), &d6(), &d8()]).unwrap();
        let middle = pl
            .try_apply(|v| Ok(v.as_outcome().map(|r| r.values()[1].clone()).unwrap_or(Value::Int(0))))
            .unwrap();
        let expected = Drv::new([
            (1, Prob::ratio(1, 12)),
            (2, Prob::ratio(5, 24)),
            (3, Prob::ratio(13, 48)),
            (4, Prob::ratio(13, 48)),
            (5, Prob::ratio(5, 48)),
            (6, Prob::ratio(1, 16)),
        ])
        .unwrap();
        assert!(middle.is_same(&expected));
    }

    #[test]
    fn count_repeats_a_single_die() {
        let counted = pool_with(&[&d6()], PoolOptions::new().count(3)).unwrap();
        let listed = pool(&[&d6(), &d6(), &d6()]).unwrap();
        assert!(counted.is_same(&listed));
        let empty = pool_with(&[&d6()], PoolOptions::new().count(0)).unwrap();
        assert!(empty.is_same(&Drv::new([(plain_result(&[]), Prob::one())]).unwrap()));
        assert!(matches!(
            pool_with(&[&d6(), &d6()], PoolOptions::new().count(2)),
            Err(DrvError::Type(_))
        ));
    }

    #[test]
    fn pools_extend_with_dice_constants_and_pools() {
        let grown = (&(&pool(&[&d6()]).unwrap() + &d6()).unwrap() + &d8()).unwrap();
        assert!(grown.is_same(&pool(&[&d6(), &d6(), &d8()]).unwrap()));
        let with_const = (&pool(&[&d10()]).unwrap() + 10).unwrap();
        let listed = pool(&[&d10(), &Drv::new([(10, Prob::one())]).unwrap()]).unwrap();
        assert!(with_const.is_same(&listed));
        let two = pool(&[&d4()]).unwrap();
        let joined = (&two + &two).unwrap();
        assert!(joined.is_same(&pool(&[&d4(), &d4()]).unwrap()));
    }

    #[test]
    fn keep_highest_of_two() {
        let kept = totals(&keep_highest(1, &[&d6()], 2).unwrap());
        let expected =
            Drv::new((1..=6).map(|v| (v, Prob::ratio(2 * v - 1, 36)))).unwrap();
        assert!(kept.is_same(&expected));
    }

    #[test]
    fn keep_and_drop_agree() {
        let high = keep_highest(2, &[&d6()], 4).unwrap();
        let dropped = drop_lowest(2, &[&d6()], 4).unwrap();
        assert!(high.is_same(&dropped));
        let low = keep_lowest(1, &[&d6(), &d8()], 1).unwrap();
        let dropped = drop_highest(1, &[&d6(), &d8()], 1).unwrap();
        assert!(low.is_same(&dropped));
    }

    #[test]
    fn keep_nothing() {
        let none = keep_highest(0, &[&d6()], 1000).unwrap();
        assert!(none.is_same(&Drv::new([(plain_result(&[]), Prob::one())]).unwrap()));
        let none = keep_lowest(0, &[&d6()], 10).unwrap();
        assert_eq!(none.len(), 1);
        let all_dropped = drop_lowest(5, &[&d6()], 2).unwrap();
        assert_eq!(all_dropped.len(), 1);
    }

    #[test]
    fn custom_normalization() {
        let ends = PoolOptions::new().count(10).normalize(|values| {
            let values = sorted_descending(values)?;
            Ok(match values.len() {
                0 | 1 => values,
                n => vec![values[0].clone(), values[n - 1].clone()],
            })
        });
        let pl = pool_with(&[&d6()], ends).unwrap();
        assert!(pl.values().all(|v| v.as_outcome().map_or(false, |r| r.kind_name() == "PlainResult")));
        assert_eq!(pl.len(), 21);
        let total = pl.items().fold(Prob::zero(), |acc, (_, p)| &acc + p);
        assert_eq!(total, Prob::one());
    }

    #[test]
    fn ordered_results_keep_permutations() {
        let pl = pool_with(&[&d6()], PoolOptions::new().count(2).result_type(ResultType::ordered()))
            .unwrap();
        assert_eq!(pl.len(), 36);
        let converted = plain(&pl).unwrap();
        assert!(converted.is_same(&pool(&[&d6(), &d6()]).unwrap()));
    }

    #[test]
    fn left_result_type_wins() {
        let high = pool_with(&[&d6()], PoolOptions::new().result_type(ResultType::highest(1))).unwrap();
        let grown = (&high + &pool(&[&d6()]).unwrap()).unwrap();
        assert!(grown.values().all(|v| v.as_outcome().map_or(false, |r| r.len() == 1)));
    }
}
