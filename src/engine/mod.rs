//! Pure commission computation: template resolution, upline tracing, and
//! per-beneficiary amount calculation.
//!
//! Everything here is deterministic over its inputs; data access goes through
//! the injected provider ports and nothing is written.

pub mod calculator;
pub mod resolver;
pub mod tracer;

pub use calculator::{CalculationError, CommissionCalculator};
pub use resolver::{select_override, TemplateResolver};
pub use tracer::{BeneficiaryTracer, DEFAULT_MAX_UPLINE_DEPTH};
