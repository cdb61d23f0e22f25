//! Core DRV engine: distributions, operators, pools and dice.
//!
//! ## Module overview
//!
//! | Module        | Purpose |
//! |---------------|---------|
//! | `error`       | `DrvError` and the crate-wide `Result` alias |
//! | `value`       | `Value`, the possible values of a DRV, with checked arithmetic |
//! | `probability` | `Prob`, exact rational or `f64` probabilities |
//! | `expressions` | Expression trees used only to render a DRV |
//! | `drv`         | The `Drv` type: construction, queries, sampling, export |
//! | `arithmetic`  | Operators, comparisons, repeated sums, explode, conditioning |
//! | `convolve`    | Array convolution fast path for large integer additions |
//! | `pools`       | Dice pools with pluggable result normalization |
//! | `dice`        | Uniform dice `d1`..`d100`, `d(n)` and `roll` |
//! | `rng`         | The process-wide seeded generator |

pub mod arithmetic;
pub mod convolve;
pub mod dice;
pub mod drv;
pub mod error;
pub mod expressions;
pub mod pools;
pub mod probability;
pub mod rng;
pub mod value;

// Re-export the main types so callers can write `dice_engine::Drv` without
// reaching into sub-modules.
pub use convolve::{convolve_optimisation, set_convolve_optimisation};
pub use drv::{p, Drv, Operand, TableRow};
pub use error::{DrvError, Result};
pub use expressions::Expr;
pub use pools::{PoolOptions, PoolResult, ResultType};
pub use probability::Prob;
pub use value::Value;
