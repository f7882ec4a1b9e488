//! Stage-indexed OCP QCQP solution.
//!
//! [`OcpQcqpSol`] owns engine memory sized from a shared [`OcpQcqpDim`] and
//! hands out per-stage column vectors. Sizes vary from stage to stage (the
//! terminal stage typically has no controls), so every read resolves the
//! field's count at that stage first.
//!
//! Memory content before the solver writes it is unspecified. With the
//! [`ReferenceEngine`] it reads as NaN.

use std::ops::RangeInclusive;
use std::sync::Arc;

use nalgebra::DVector;

use crate::dim::OcpQcqpDim;
use crate::engine::{QcqpEngine, ReferenceEngine};
use crate::error::{QcqpError, Result};
use crate::field::SolField;

/// Result of a by-name [`OcpQcqpSol::get`].
#[derive(Debug, Clone, PartialEq)]
pub enum SolValue {
    /// Single stage.
    Stage(DVector<f64>),
    /// Stage range, ascending.
    Stages(Vec<DVector<f64>>),
}

impl SolValue {
    pub fn into_stage(self) -> Option<DVector<f64>> {
        match self {
            SolValue::Stage(v) => Some(v),
            SolValue::Stages(_) => None,
        }
    }

    pub fn into_stages(self) -> Vec<DVector<f64>> {
        match self {
            SolValue::Stage(v) => vec![v],
            SolValue::Stages(vs) => vs,
        }
    }
}

/// Solution of an OCP QCQP.
///
/// Not `Clone`: each instance owns its memory, and two solutions created
/// from the same descriptor never share storage.
pub struct OcpQcqpSol<E: QcqpEngine = ReferenceEngine> {
    engine: Arc<E>,
    dim: Arc<OcpQcqpDim>,
    raw: E::Sol,
    memsize: usize,
}

impl OcpQcqpSol<ReferenceEngine> {
    /// Solution backed by the in-process engine.
    pub fn reference(dim: Arc<OcpQcqpDim>) -> Result<Self> {
        Self::new(Arc::new(ReferenceEngine), dim)
    }
}

impl<E: QcqpEngine> OcpQcqpSol<E> {
    /// Allocate a solution for `dim`.
    pub fn new(engine: Arc<E>, dim: Arc<OcpQcqpDim>) -> Result<Self> {
        let raw = engine.sol_create(&dim)?;
        let memsize = engine.sol_size(&raw);
        log::debug!(
            "created {} solution: N = {}, struct {} B, memory {} B",
            engine.name(),
            dim.horizon(),
            engine.sol_strsize(),
            memsize
        );
        Ok(Self {
            engine,
            dim,
            raw,
            memsize,
        })
    }

    pub fn dim(&self) -> &Arc<OcpQcqpDim> {
        &self.dim
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Engine storage, for engine-specific inspection.
    pub fn raw(&self) -> &E::Sol {
        &self.raw
    }

    /// Bytes of engine memory backing this solution, fixed at creation.
    pub fn memsize(&self) -> usize {
        self.memsize
    }

    /// `field` at `stage`, length `dim.variable_count(field, stage)`.
    pub fn stage(&self, field: SolField, stage: usize) -> Result<DVector<f64>> {
        let n = self.dim.variable_count(field, stage)?;
        self.extract(field, stage, n)
    }

    /// `field` on every stage of `range`, in ascending order.
    ///
    /// All counts are resolved before anything is read, so an invalid stage
    /// fails the whole call. Bounds are checked before the order of the range.
    pub fn stages(
        &self,
        field: SolField,
        range: RangeInclusive<usize>,
    ) -> Result<Vec<DVector<f64>>> {
        let (start, end) = (*range.start(), *range.end());
        self.dim.check_stage(start)?;
        self.dim.check_stage(end)?;
        if end < start {
            return Err(QcqpError::InvalidRange { start, end });
        }
        let counts = range
            .map(|stage| Ok((stage, self.dim.variable_count(field, stage)?)))
            .collect::<Result<Vec<_>>>()?;
        counts
            .into_iter()
            .map(|(stage, n)| self.extract(field, stage, n))
            .collect()
    }

    /// By-name access: one vector for `stage_start`, or one per stage of
    /// `[stage_start, stage_end]` when `stage_end` is given.
    pub fn get(
        &self,
        field: &str,
        stage_start: usize,
        stage_end: Option<usize>,
    ) -> Result<SolValue> {
        let field = field.parse::<SolField>()?;
        match stage_end {
            None => self.stage(field, stage_start).map(SolValue::Stage),
            Some(end) => self.stages(field, stage_start..=end).map(SolValue::Stages),
        }
    }

    /// Overwrite `field` at `stage`. `values` must have exactly the field's
    /// count at that stage.
    pub fn set(&mut self, field: SolField, stage: usize, values: &[f64]) -> Result<()> {
        let n = self.dim.variable_count(field, stage)?;
        if values.len() != n {
            return Err(QcqpError::DimensionMismatch {
                field: field.name(),
                stage,
                expected: n,
                actual: values.len(),
            });
        }
        self.engine.sol_set(&self.dim, field, stage, values, &mut self.raw)
    }

    /// Same as [`set`](Self::set) with the field given by name.
    pub fn set_by_name(&mut self, field: &str, stage: usize, values: &[f64]) -> Result<()> {
        let field = field.parse::<SolField>()?;
        self.set(field, stage, values)
    }

    /// Print every field on every stage through the engine.
    pub fn dump(&self) {
        self.engine.sol_print(&self.dim, &self.raw);
    }

    fn extract(&self, field: SolField, stage: usize, n: usize) -> Result<DVector<f64>> {
        let mut out = vec![0.0; n];
        self.engine.sol_get(&self.dim, field, stage, &self.raw, &mut out)?;
        log::trace!("read {} at stage {} ({} values)", field, stage, n);
        Ok(DVector::from_vec(out))
    }
}

impl<E: QcqpEngine> std::fmt::Debug for OcpQcqpSol<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcpQcqpSol")
            .field("engine", &self.engine.name())
            .field("horizon", &self.dim.horizon())
            .finish()
    }
}
