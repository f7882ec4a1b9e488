//! Stage-indexed solution container for OCP QCQP solvers.
//!
//! An optimal-control QCQP over a horizon `N` has `N + 1` stages, each with
//! its own number of states, controls, constraints and slacks. This crate
//! provides:
//!
//! - [`OcpQcqpDim`]: the frozen per-stage dimensions.
//! - [`OcpQcqpSol`]: a solution whose memory is sized from those dimensions,
//!   read one stage or a stage range at a time.
//! - [`SolField`]: the closed registry of readable fields (`u`, `x`, slacks
//!   and multipliers).
//! - [`engine`]: the seam to the numerical solver, with an in-process
//!   [`ReferenceEngine`] and a runtime-loaded HPIPM [`NativeEngine`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use qcqp_core::{DimField, OcpQcqpDim, OcpQcqpSol, SolField};
//!
//! let mut b = OcpQcqpDim::builder(2);
//! b.set_range(DimField::Nx, 4, 0, 2)?;
//! b.set_range(DimField::Nu, 2, 0, 1)?;
//! let dim = Arc::new(b.build()?);
//!
//! let mut sol = OcpQcqpSol::reference(dim)?;
//! sol.set(SolField::U, 0, &[1.0, 2.0])?;
//!
//! assert_eq!(sol.stage(SolField::U, 0)?.len(), 2);
//! assert_eq!(sol.stage(SolField::U, 2)?.len(), 0);
//! assert_eq!(sol.stages(SolField::X, 0..=2)?.len(), 3);
//! assert!(sol.get("z", 0, None).is_err());
//! # Ok::<(), qcqp_core::QcqpError>(())
//! ```

#![warn(clippy::all)]

pub mod dim;
pub mod engine;
pub mod error;
pub mod field;
pub mod sol;

pub use dim::{DimField, OcpQcqpDim, OcpQcqpDimBuilder, StageDim};
pub use engine::{EngineConfig, NativeEngine, QcqpEngine, ReferenceEngine};
pub use error::{QcqpError, Result};
pub use field::SolField;
pub use sol::{OcpQcqpSol, SolValue};
