//! Array convolution fast path for adding large integer-valued DRVs.
//!
//! Adding two DRVs normally walks the full cross product and reduces it
//! through a map. When both operands are integer-valued, large, and dense
//! over their ranges, the same sum is a convolution of two probability
//! arrays, which is a much tighter loop. The result always has float
//! probabilities, even if the inputs were exact.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::dice_engine::drv::Drv;
use crate::dice_engine::error::{DrvError, Result};
use crate::dice_engine::probability::Prob;
use crate::dice_engine::value::Value;

/// The fast path is only tried when the cross product has more entries than this.
pub const CONVOLVE_SIZE_LIMIT: usize = 1000;

/// Skip the fast path when the dense arrays would be this many times larger
/// than the cross product.
pub const CONVOLVE_SPARSITY_FACTOR: u128 = 100;

static CONVOLVE_OPTIMISATION: AtomicBool = AtomicBool::new(true);

/// Enable or disable the fast path for the whole process.
pub fn set_convolve_optimisation(enabled: bool) {
    CONVOLVE_OPTIMISATION.store(enabled, Ordering::SeqCst);
}

/// Whether the fast path may be used: the `convolve` feature is compiled in
/// and it has not been switched off.
pub fn convolve_optimisation() -> bool {
    cfg!(feature = "convolve") && CONVOLVE_OPTIMISATION.load(Ordering::SeqCst)
}

/// Full discrete convolution of two sequences (length `a.len() + b.len() - 1`).
/// Positions no pair contributes to are exactly zero.
pub fn convolve(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, &x) in a.iter().enumerate() {
        if x == 0.0 {
            continue;
        }
        for (acc, &y) in out[i..].iter_mut().zip(b) {
            *acc += x * y;
        }
    }
    out
}

fn int_range(drv: &Drv) -> Option<(i64, i64)> {
    // Integer keys sort numerically, so the ends of the map are min and max.
    let lo = drv.values().next()?.as_int()?;
    let hi = drv.values().next_back()?.as_int()?;
    Some((lo, hi))
}

fn dense(drv: &Drv, lo: i64, len: usize) -> Vec<f64> {
    let mut out = vec![0.0; len];
    for (value, prob) in drv.items() {
        if let Some(n) = value.as_int() {
            out[(n - lo) as usize] = prob.to_f64();
        }
    }
    out
}

/// `left + right` by convolution, or `None` when the fast path does not apply.
pub(crate) fn try_convolve(left: &Drv, right: &Drv) -> Result<Option<Drv>> {
    if !convolve_optimisation() {
        return Ok(None);
    }
    let product_size = left.len() as u128 * right.len() as u128;
    if product_size <= CONVOLVE_SIZE_LIMIT as u128 {
        return Ok(None);
    }
    if !left.is_integer_valued() || !right.is_integer_valued() {
        return Ok(None);
    }
    let (Some((l_lo, l_hi)), Some((r_lo, r_hi))) = (int_range(left), int_range(right)) else {
        return Ok(None);
    };
    let l_len = (i128::from(l_hi) - i128::from(l_lo) + 1) as u128;
    let r_len = (i128::from(r_hi) - i128::from(r_lo) + 1) as u128;
    if CONVOLVE_SPARSITY_FACTOR * product_size <= l_len * r_len {
        debug!(product_size, l_len, r_len, "convolution skipped: operands too sparse");
        return Ok(None);
    }
    let lo = l_lo
        .checked_add(r_lo)
        .ok_or_else(|| DrvError::Overflow(format!("{l_lo} + {r_lo}")))?;
    l_hi.checked_add(r_hi)
        .ok_or_else(|| DrvError::Overflow(format!("{l_hi} + {r_hi}")))?;

    debug!(product_size, l_len, r_len, "adding by convolution");
    let probs = convolve(&dense(left, l_lo, l_len as usize), &dense(right, r_lo, r_len as usize));
    let dist: BTreeMap<Value, Prob> = probs
        .into_iter()
        .enumerate()
        .filter(|(_, p)| *p > 0.0)
        .map(|(i, p)| (Value::Int(lo + i as i64), Prob::Real(p)))
        .collect();
    Drv::from_map(dist, None).map(Some)
}
