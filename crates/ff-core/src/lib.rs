//! Rule-formula evaluation core of the flagfuse rollout service.
//!
//! Given a textual rule formula such as
//! `map(datetime("2021-11-08"), datetime("2021-11-16"), 0, 1, now())` and a
//! JSON object describing the current request, the core returns a scalar
//! frequency the surrounding service combines with a rollout identifier to
//! decide whether a feature is on for that context.
//!
//! The core is a pure function: no shared mutable state, no I/O beyond the
//! clock read in `now()`, no suspension. Compiled [`Formula`] trees are
//! read-only and may be shared across threads.

pub mod error;

mod env;
mod eval;
mod net;
mod value;

pub use eval::{Formula, evaluate, project, validate};
pub use value::Value;
