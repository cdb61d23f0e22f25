//! Crate-level tests for `dice_drv`.
//!
//! Included from `lib.rs` under `#[cfg(test)]`.
//!
//! # Coverage
//!
//! | Group | What is tested |
//! |-------|----------------|
//! | Dice | `d(n)` is uniform over `1..=n` and sums to exactly 1 |
//! | Algebra | `+` commutes and associates up to `is_same` |
//! | Convolution | Fast path agrees with the generic cross product on 1000-sided dice |
//! | Repeated sums | `n @ d` equals chained addition |
//! | Float conversion | `faster()` stays close; sampling after it stays in the support |
//! | Conditioning | `given(pred)` makes `pred` certain |
//! | Pools | Summed pools match addition; keep-highest matches brute force |
//! | Construction | Out-of-range probabilities rejected; short totals still sample |
//! | Explode | Reroll cap is enforced exactly |
//! | Sampling | Seeded draws reproduce; frequencies track probabilities |

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::dice_engine::dice::{d, d10, d4, d6, d8};
use crate::dice_engine::pools::{keep_highest, pool};
use crate::{p, Drv, DrvError, Prob, Value};

// ── helpers ──────────────────────────────────────────────────────────────────

fn prob_of(drv: &Drv, value: impl Into<Value>) -> Prob {
    drv.probability(&value.into()).cloned().unwrap_or_else(Prob::zero)
}

fn total(drv: &Drv) -> Prob {
    drv.items().fold(Prob::zero(), |acc, (_, p)| &acc + p)
}

/// A small lopsided DRV with exact probabilities.
fn skewed() -> Drv {
    Drv::new([(0, Prob::ratio(1, 2)), (3, Prob::ratio(1, 3)), (10, Prob::ratio(1, 6))]).unwrap()
}

// ── dice ─────────────────────────────────────────────────────────────────────

#[test]
fn dice_are_uniform_and_complete() {
    for sides in [1u32, 3, 12, 99, 150] {
        let die = d(sides).unwrap();
        assert_eq!(die.len(), sides as usize, "d{sides} has {sides} values");
        assert!(die.items().all(|(_, p)| *p == Prob::ratio(1, i64::from(sides))));
        assert_eq!(total(&die), Prob::one(), "d{sides} sums to 1");
    }
}

// ── algebra ──────────────────────────────────────────────────────────────────

#[test]
fn addition_commutes_and_associates() {
    let (a, b, c) = (d4(), skewed(), d8());
    assert!(a.add(&b).unwrap().is_same(&b.add(&a).unwrap()), "a + b == b + a");
    let left = a.add(&b).unwrap().add(&c).unwrap();
    let right = a.add(&b.add(&c).unwrap()).unwrap();
    assert!(left.is_same(&right), "(a + b) + c == a + (b + c)");
    assert!(a.mul(&b).unwrap().is_same(&b.mul(&a).unwrap()), "a * b == b * a");
}

// ── convolution ──────────────────────────────────────────────────────────────

#[cfg(feature = "convolve")]
#[test]
fn convolution_agrees_with_the_cross_product() {
    use crate::dice_engine::convolve::try_convolve;

    let a = d(1000).unwrap().faster().unwrap();
    let b = d(1000).unwrap().faster().unwrap();
    let fast = try_convolve(&a, &b).unwrap().expect("1000 x 1000 dense dice take the fast path");
    let generic = a.apply_drv(|v| b.add(v)).unwrap();
    assert_eq!(fast.len(), 1999);
    assert!(fast.is_close(&generic, None, None), "both paths give the same sum");
    assert!(prob_of(&fast, 1001).is_close(&Prob::Real(1.0 / 1000.0), None, None));
}

#[test]
fn convolved_sum_keeps_its_expression() {
    let sum = d(1000).unwrap().add(&d(1000).unwrap()).unwrap();
    assert_eq!(sum.to_string(), "(d(1000) + d(1000))");
    let diff = d(1000).unwrap().sub(&d(1000).unwrap()).unwrap();
    assert_eq!(diff.to_string(), "(d(1000) - d(1000))");
    assert!(prob_of(&diff, 0).is_close(&Prob::Real(1.0 / 1000.0), None, None));
}

#[test]
fn exact_sums_below_the_limit_stay_exact() {
    let sum = d10().add(&d10()).unwrap();
    assert!(sum.items().all(|(_, p)| p.is_exact()));
    assert_eq!(prob_of(&sum, 11), Prob::ratio(1, 10));
}

// ── repeated sums ────────────────────────────────────────────────────────────

#[test]
fn repeat_is_chained_addition() {
    let chained = d6().add(&d6()).unwrap().add(&d6()).unwrap();
    assert!(d6().repeat(3).unwrap().is_same(&chained));
    assert_eq!(d6().repeat(3).unwrap().to_string(), "(3 @ d6)");
    let seven = (1..7).try_fold(skewed(), |acc, _| acc.add(&skewed())).unwrap();
    assert!(skewed().repeat(7).unwrap().is_same(&seven));
}

// ── float conversion ─────────────────────────────────────────────────────────

#[test]
fn faster_round_trip() {
    let mut rng = StdRng::seed_from_u64(17);
    for drv in [d6(), d6().repeat(10).unwrap(), d10().add(1).unwrap(), skewed()] {
        let fast = drv.faster().unwrap();
        assert!(fast.is_close(&drv, None, None), "{drv} survives faster()");
        assert!(fast.items().all(|(_, p)| !p.is_exact()));
        for _ in 0..50 {
            let v = fast.sample_with(&mut rng);
            assert!(drv.probability(&v).map_or(false, |p| !p.is_zero()), "{v} in support of {drv}");
        }
    }
}

// ── conditioning ─────────────────────────────────────────────────────────────

#[test]
fn given_makes_the_condition_certain() {
    let even = |v: &Value| v.as_int().map_or(false, |n| n % 2 == 0);
    let two = d6().repeat(2).unwrap();
    let conditioned = two.given(even).unwrap();
    assert_eq!(p(&conditioned.apply(|v| Value::Bool(even(v))).unwrap()).unwrap(), Prob::one());
    assert_eq!(prob_of(&conditioned, 2), Prob::ratio(1, 18));
    assert!(matches!(d6().given(|_| false), Err(DrvError::ZeroProbabilityCondition)));
}

// ── pools ────────────────────────────────────────────────────────────────────

#[test]
fn summed_pool_matches_addition() {
    let summed = pool(&[&d6(), &d6()]).unwrap().try_apply(Value::outcome_sum).unwrap();
    assert!(summed.is_same(&d6().add(&d6()).unwrap()));
    let summed = pool(&[&d4(), &d6(), &d8()]).unwrap().try_apply(Value::outcome_sum).unwrap();
    assert!(summed.is_same(&d4().add(&d6()).unwrap().add(&d8()).unwrap()));
}

#[test]
fn keep_highest_matches_brute_force() {
    // Every ordered roll of five d6, top two summed.
    let mut expected: BTreeMap<i64, i64> = BTreeMap::new();
    for code in 0..6i64.pow(5) {
        let mut rolls: Vec<i64> = (0..5).map(|i| code / 6i64.pow(i) % 6 + 1).collect();
        rolls.sort_unstable_by(|a, b| b.cmp(a));
        *expected.entry(rolls[0] + rolls[1]).or_insert(0) += 1;
    }
    let expected = Drv::new(expected.into_iter().map(|(v, n)| (v, Prob::ratio(n, 7776)))).unwrap();
    let kept = keep_highest(2, &[&d6()], 5).unwrap().try_apply(Value::outcome_sum).unwrap();
    assert!(kept.is_same(&expected));
}

#[test]
fn keep_highest_of_two_by_hand() {
    let kept = keep_highest(1, &[&d6()], 2).unwrap().try_apply(Value::outcome_sum).unwrap();
    for (value, numer) in [(6, 11), (5, 9), (4, 7), (3, 5), (2, 3), (1, 1)] {
        assert_eq!(prob_of(&kept, value), Prob::ratio(numer, 36), "P({value})");
    }
}

#[test]
fn pool_exports_to_json() {
    let json = pool(&[&d4(), &d4()]).unwrap().to_json().unwrap();
    let rows = json.as_array().expect("an array of rows");
    assert_eq!(rows.len(), 10);
    assert_eq!(rows[0]["value"]["kind"], "PlainResult");
    assert_eq!(rows[0]["value"]["values"][0], 1);
    assert_eq!(rows[0]["probability"], "1/16");
}

// ── construction ─────────────────────────────────────────────────────────────

#[test]
fn construction_checks_each_probability() {
    assert!(matches!(Drv::new([(1, 1.5)]), Err(DrvError::ProbabilityOutOfRange(_))));
    assert!(matches!(Drv::new([(1, -0.1)]), Err(DrvError::ProbabilityOutOfRange(_))));
    let short = Drv::new([(1, 0.333), (2, 0.333), (3, 0.333)]).unwrap();
    assert_eq!(prob_of(&short, 3), Prob::Real(0.333), "inspection is unmodified");
    let mut rng = StdRng::seed_from_u64(8);
    for _ in 0..200 {
        let v = short.sample_with(&mut rng).as_int().unwrap();
        assert!((1..=3).contains(&v));
    }
}

// ── explode ──────────────────────────────────────────────────────────────────

#[test]
fn explode_once() {
    let once = d6().explode(1).unwrap();
    assert_eq!(prob_of(&once, 12), Prob::ratio(1, 36));
    assert_eq!(p(&once.gt(12).unwrap()).unwrap(), Prob::zero());
    assert_eq!(total(&once), Prob::one());
    assert_eq!(once.to_string(), "d6.explode(1)");
}

// ── sampling ─────────────────────────────────────────────────────────────────

#[test]
fn seeded_sampling_reproduces() {
    let drv = d6().repeat(3).unwrap();
    let draw = |seed| {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..20).map(|_| drv.sample_with(&mut rng)).collect::<Vec<_>>()
    };
    assert_eq!(draw(42), draw(42), "same seed, same rolls");
    assert_ne!(draw(42), draw(43), "different seeds differ");
}

#[test]
fn sample_frequencies_track_probabilities() {
    let mut rng = StdRng::seed_from_u64(2024);
    let drv = skewed();
    let mut counts: BTreeMap<Value, u32> = BTreeMap::new();
    for _ in 0..6000 {
        *counts.entry(drv.sample_with(&mut rng)).or_insert(0) += 1;
    }
    let zero = counts.get(&Value::Int(0)).copied().unwrap_or(0);
    let ten = counts.get(&Value::Int(10)).copied().unwrap_or(0);
    assert!((2700..3300).contains(&zero), "P(0) = 1/2, got {zero}/6000");
    assert!((800..1200).contains(&ten), "P(10) = 1/6, got {ten}/6000");
}
