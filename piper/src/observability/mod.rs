//! Observability utilities.
//!
//! The engine logs through `tracing`: run start/finish at `info`, stage
//! start/finish at `debug` with `duration_ms`, failures at `warn`/`error`.
//! Log fields are `run_id`, `stage` and `func`.

mod spans;

pub use spans::{init_tracing, SpanTimer};
