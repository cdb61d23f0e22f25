//! Probability tables for a handful of dice expressions.
//!
//! Run with: `cargo run --example tables`
//!
//! Each block prints the expression, then its distribution as a two-column
//! table. Sampling uses a fixed seed, so the output is reproducible.
//!
//! ## Key concepts demonstrated
//!
//! - Operators on `&Drv` return `Result<Drv, DrvError>`, so `?` chains them.
//! - `repeat(n)` is `n @ die`; `explode_default()` rerolls on the maximum.
//! - Pools keep every die, and `keep_highest` collapses them as it goes.
//! - `p()` pulls out the probability of a boolean DRV being true.

use dice_drv::dice::{d10, d20, d4, d6};
use dice_drv::pools::{drop_lowest, keep_highest};
use dice_drv::{p, rng, Drv, DrvError, Value};

/// Print an expression with its table.
fn show(label: &str, drv: &Drv, as_float: bool) {
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("  {label}: {drv}");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("{}", drv.to_table(as_float));
    println!();
}

fn main() -> Result<(), DrvError> {
    let two_d6 = d6().repeat(2)?;
    show("Two six-sided dice", &two_d6, false);

    let attack = (&d20() + 5)?;
    let hit = attack.ge(15)?;
    show("Attack roll against AC 15", &hit, false);
    println!("  P(hit) = {}\n", p(&hit)?);

    let damage = (&d6().repeat(2)? + &d4())?;
    show("Damage", &damage, true);

    let stats = keep_highest(3, &[&d6()], 4)?.try_apply(Value::outcome_sum)?;
    show("4d6 keep highest 3", &stats, true);

    let advantage = drop_lowest(1, &[&d20(), &d20()], 1)?.try_apply(Value::outcome_sum)?;
    show("d20 with advantage", &advantage, true);

    let exploding = d10().explode(3)?;
    show("Exploding d10, three rerolls", &exploding, true);

    rng::seed(7);
    let rolls: Vec<String> = (0..10).map(|_| damage.sample().to_string()).collect();
    println!("  Ten damage rolls: {}", rolls.join(" "));
    Ok(())
}
