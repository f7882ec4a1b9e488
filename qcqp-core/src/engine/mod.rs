//! Solver engine seam.
//!
//! A [`QcqpEngine`] owns the layout of solution memory. The container in
//! [`crate::sol`] sizes, creates and reads a solution only through these entry
//! points, so it never sees offsets.
//!
//! Two engines are provided:
//!
//! - [`ReferenceEngine`]: in-process storage laid out per stage as
//!   `ux | pi | lam | t`.
//! - [`NativeEngine`]: the HPIPM shared library, loaded at runtime.

pub mod config;
pub mod memory;
pub mod native;
pub mod reference;

pub use config::EngineConfig;
pub use memory::OpaqueRegion;
pub use native::{HpipmLibrary, NativeEngine, NativeSol};
pub use reference::{ReferenceEngine, ReferenceSol};

use crate::dim::OcpQcqpDim;
use crate::error::{QcqpError, Result};
use crate::field::SolField;

/// Entry points a solution container needs from a solver engine.
///
/// `dim` is always the descriptor the solution was created from. `sol_get`
/// and `sol_set` reject a stage outside `[0, N]` and a buffer whose length is
/// not `field.count(dim, stage)`.
pub trait QcqpEngine {
    /// Engine-owned solution storage.
    type Sol;

    /// Short engine name for logs.
    fn name(&self) -> &'static str;

    /// Bytes of the solution header struct.
    fn sol_strsize(&self) -> usize;

    /// Bytes of solution memory required for `dim`.
    fn sol_memsize(&self, dim: &OcpQcqpDim) -> Result<usize>;

    /// Allocate and initialize a solution for `dim`. Either fully succeeds or
    /// leaves nothing behind.
    fn sol_create(&self, dim: &OcpQcqpDim) -> Result<Self::Sol>;

    /// Bytes of solution memory held by `sol`, as allocated by `sol_create`.
    fn sol_size(&self, sol: &Self::Sol) -> usize;

    /// Copy `field` at `stage` into `out`.
    fn sol_get(
        &self,
        dim: &OcpQcqpDim,
        field: SolField,
        stage: usize,
        sol: &Self::Sol,
        out: &mut [f64],
    ) -> Result<()>;

    /// Overwrite `field` at `stage` with `values`.
    fn sol_set(
        &self,
        dim: &OcpQcqpDim,
        field: SolField,
        stage: usize,
        values: &[f64],
        sol: &mut Self::Sol,
    ) -> Result<()>;

    /// Print every stage and field.
    fn sol_print(&self, dim: &OcpQcqpDim, sol: &Self::Sol);
}

/// Fails with `DimensionMismatch` unless a buffer of `actual` entries fits
/// `field` at `stage`.
pub(crate) fn check_len(
    field: SolField,
    stage: usize,
    expected: usize,
    actual: usize,
) -> Result<()> {
    if expected != actual {
        return Err(QcqpError::DimensionMismatch {
            field: field.name(),
            stage,
            expected,
            actual,
        });
    }
    Ok(())
}
