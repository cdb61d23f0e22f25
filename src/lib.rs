//! # dice_drv
//!
//! Discrete random variables for dice and other finite outcomes.
//!
//! A [`Drv`] maps each possible value to its probability. Probabilities are
//! either exact rationals or `f64`s ([`Prob`]), and every operation returns a
//! new `Drv`, so building up a dice expression reads like arithmetic.
//!
//! ## How it works
//!
//! 1. Start from a die ([`dice::d6`], [`dice::d`]) or any explicit
//!    distribution ([`Drv::new`]).
//! 2. Combine with operators: `+ - * /`, comparisons, `repeat` for `n @ die`,
//!    `explode`, `given`, `apply`. Independent DRVs are combined over every
//!    pair of outcomes; large integer sums switch to a convolution.
//! 3. Inspect the result with [`Drv::to_table`], [`p`], [`Drv::to_json`], or
//!    draw from it with [`Drv::sample`].
//!
//! ## Key features
//!
//! - **Exact by default**: preset dice carry rational probabilities, so
//!   `3 @ d6` is exactly `d6 + d6 + d6`. Call [`Drv::faster`] to switch to
//!   floats.
//! - **Readable**: a DRV built from dice remembers its expression and
//!   prints as `(2 @ d4) * (d6 + d10)`.
//! - **Pools**: [`pools`] keeps individual dice for roll-and-keep mechanics,
//!   collapsing equivalent outcomes after every die.
//! - **Reproducible**: [`rng::seed`] reseeds the generator behind
//!   [`Drv::sample`]; [`Drv::sample_with`] takes any `rand::Rng`.
//!
//! ## Quick start
//!
//! ```rust
//! use dice_drv::dice::{d10, d6};
//! use dice_drv::{p, pools, Prob, Value};
//!
//! // 2d6 + 3, and the chance of beating 12.
//! let attack = (&d6().repeat(2)? + 3)?;
//! println!("{attack}");
//! assert_eq!(p(&attack.gt(12)?)?, Prob::ratio(1, 6));
//!
//! // Roll four d6 and keep the best three.
//! let stat = pools::keep_highest(3, &[&d6()], 4)?.try_apply(Value::outcome_sum)?;
//! println!("{}", stat.to_table(true));
//!
//! // Exploding d10, seeded draws.
//! dice_drv::rng::seed(42);
//! let roll = d10().explode_default()?.sample();
//! assert!(roll.as_int().map_or(false, |n| n >= 1));
//! # Ok::<(), dice_drv::DrvError>(())
//! ```

pub mod dice_engine;

// Convenience re-exports so callers can use `dice_drv::Drv` and
// `dice_drv::dice::d6` directly without reaching into `dice_engine::`.
pub use dice_engine::{
    convolve_optimisation, dice, p, pools, rng, set_convolve_optimisation, Drv, DrvError,
    Expr, Operand, PoolOptions, PoolResult, Prob, Result, ResultType, Value,
};

#[cfg(test)]
mod tests;
