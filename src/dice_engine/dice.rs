//! Uniform dice and rolling.
//!
//! `d1` to `d100` are built once and shared; cloning one is cheap. Larger dice
//! come from [`d`].

use std::collections::BTreeMap;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::dice_engine::drv::Drv;
use crate::dice_engine::error::{DrvError, Result};
use crate::dice_engine::expressions::Expr;
use crate::dice_engine::probability::Prob;
use crate::dice_engine::value::Value;

/// Largest die available through [`preset`].
pub const MAX_PRESET: u32 = 100;

/// Sizes with a named constructor in this module.
pub const PRESET_DICE: [u32; 10] = [2, 3, 4, 6, 8, 10, 12, 20, 30, 100];

static PRESETS: Lazy<Vec<Drv>> = Lazy::new(|| (1..=MAX_PRESET).map(uniform).collect());

fn uniform(sides: u32) -> Drv {
    let prob = Prob::ratio(1, i64::from(sides));
    let dist: BTreeMap<Value, Prob> =
        (1..=sides).map(|v| (Value::from(v), prob.clone())).collect();
    let name = if sides <= MAX_PRESET { format!("d{sides}") } else { format!("d({sides})") };
    Drv::from_trusted(dist, Some(Arc::new(Expr::atom(name))))
}

/// A fair die numbered `1..=sides`, with exact probabilities.
pub fn d(sides: u32) -> Result<Drv> {
    match sides {
        0 => Err(DrvError::Domain("a die needs at least one side".into())),
        n => Ok(preset(n).unwrap_or_else(|| uniform(n))),
    }
}

/// The shared preset die with `sides` sides, for `1..=100`.
pub fn preset(sides: u32) -> Option<Drv> {
    let idx = usize::try_from(sides).ok()?.checked_sub(1)?;
    PRESETS.get(idx).cloned()
}

macro_rules! named_dice {
    ($($name:ident => $sides:expr),* $(,)?) => {
        $(
            #[doc = concat!("A fair ", stringify!($sides), "-sided die.")]
            pub fn $name() -> Drv {
                uniform_preset($sides)
            }
        )*
    };
}

fn uniform_preset(sides: u32) -> Drv {
    preset(sides).unwrap_or_else(|| uniform(sides))
}

named_dice! {
    d2 => 2,
    d3 => 3,
    d4 => 4,
    d6 => 6,
    d8 => 8,
    d10 => 10,
    d12 => 12,
    d20 => 20,
    d30 => 30,
    d100 => 100,
}

/// Roll once with the process-wide generator.
pub fn roll(drv: &Drv) -> Value {
    drv.sample()
}
