//! Stage dimensions of an OCP QCQP.
//!
//! A problem with horizon `N` has `N + 1` stages. Each stage records how many
//! states, controls, bounds, general/quadratic constraints and soft
//! constraints it carries. Dimensions are collected in an
//! [`OcpQcqpDimBuilder`] and frozen into an [`OcpQcqpDim`] by
//! [`OcpQcqpDimBuilder::build`]; the frozen descriptor has no mutators.

use std::fmt;
use std::str::FromStr;

use crate::error::{QcqpError, Result};
use crate::field::SolField;

/// Dimension tracked per stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DimField {
    /// States.
    Nx,
    /// Controls.
    Nu,
    /// Box bounds, `nbx + nbu` (derived).
    Nb,
    /// State box bounds.
    Nbx,
    /// Control box bounds.
    Nbu,
    /// General linear constraints.
    Ng,
    /// Quadratic constraints.
    Nq,
    /// Soft constraints, `nsbx + nsbu + nsg + nsq` (derived).
    Ns,
    /// Softened state bounds.
    Nsbx,
    /// Softened control bounds.
    Nsbu,
    /// Softened general constraints.
    Nsg,
    /// Softened quadratic constraints.
    Nsq,
}

impl DimField {
    /// Every tracked dimension.
    pub const ALL: [DimField; 12] = [
        DimField::Nx,
        DimField::Nu,
        DimField::Nb,
        DimField::Nbx,
        DimField::Nbu,
        DimField::Ng,
        DimField::Nq,
        DimField::Ns,
        DimField::Nsbx,
        DimField::Nsbu,
        DimField::Nsg,
        DimField::Nsq,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DimField::Nx => "nx",
            DimField::Nu => "nu",
            DimField::Nb => "nb",
            DimField::Nbx => "nbx",
            DimField::Nbu => "nbu",
            DimField::Ng => "ng",
            DimField::Nq => "nq",
            DimField::Ns => "ns",
            DimField::Nsbx => "nsbx",
            DimField::Nsbu => "nsbu",
            DimField::Nsg => "nsg",
            DimField::Nsq => "nsq",
        }
    }

    /// Derived dimensions are computed from others and cannot be set.
    pub fn is_derived(self) -> bool {
        matches!(self, DimField::Nb | DimField::Ns)
    }
}

impl fmt::Display for DimField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DimField {
    type Err = QcqpError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.name() == s)
            .ok_or_else(|| QcqpError::UnknownDimField {
                field: s.to_string(),
                available: Self::ALL
                    .iter()
                    .map(|f| f.name())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

/// Raw counts of a single stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageDim {
    pub nx: usize,
    pub nu: usize,
    pub nbx: usize,
    pub nbu: usize,
    pub ng: usize,
    pub nq: usize,
    pub nsbx: usize,
    pub nsbu: usize,
    pub nsg: usize,
    pub nsq: usize,
}

impl StageDim {
    #[inline]
    pub fn nb(&self) -> usize {
        self.nbx + self.nbu
    }

    #[inline]
    pub fn ns(&self) -> usize {
        self.nsbx + self.nsbu + self.nsg + self.nsq
    }

    pub fn get(&self, field: DimField) -> usize {
        match field {
            DimField::Nx => self.nx,
            DimField::Nu => self.nu,
            DimField::Nb => self.nb(),
            DimField::Nbx => self.nbx,
            DimField::Nbu => self.nbu,
            DimField::Ng => self.ng,
            DimField::Nq => self.nq,
            DimField::Ns => self.ns(),
            DimField::Nsbx => self.nsbx,
            DimField::Nsbu => self.nsbu,
            DimField::Nsg => self.nsg,
            DimField::Nsq => self.nsq,
        }
    }

    fn slot(&mut self, field: DimField) -> Option<&mut usize> {
        match field {
            DimField::Nx => Some(&mut self.nx),
            DimField::Nu => Some(&mut self.nu),
            DimField::Nbx => Some(&mut self.nbx),
            DimField::Nbu => Some(&mut self.nbu),
            DimField::Ng => Some(&mut self.ng),
            DimField::Nq => Some(&mut self.nq),
            DimField::Nsbx => Some(&mut self.nsbx),
            DimField::Nsbu => Some(&mut self.nsbu),
            DimField::Nsg => Some(&mut self.nsg),
            DimField::Nsq => Some(&mut self.nsq),
            DimField::Nb | DimField::Ns => None,
        }
    }

    fn validate(&self, stage: usize) -> Result<()> {
        let checks = [
            (self.nbx <= self.nx, "nbx", self.nbx, "nx", self.nx),
            (self.nbu <= self.nu, "nbu", self.nbu, "nu", self.nu),
            (self.nsbx <= self.nbx, "nsbx", self.nsbx, "nbx", self.nbx),
            (self.nsbu <= self.nbu, "nsbu", self.nsbu, "nbu", self.nbu),
            (self.nsg <= self.ng, "nsg", self.nsg, "ng", self.ng),
            (self.nsq <= self.nq, "nsq", self.nsq, "nq", self.nq),
        ];
        for (ok, lhs, lv, rhs, rv) in checks {
            if !ok {
                return Err(QcqpError::InvalidDim(format!(
                    "stage {}: {} = {} exceeds {} = {}",
                    stage, lhs, lv, rhs, rv
                )));
            }
        }
        Ok(())
    }
}

/// Mutable collector for stage dimensions.
///
/// All counts start at zero.
#[derive(Debug, Clone)]
pub struct OcpQcqpDimBuilder {
    stages: Vec<StageDim>,
}

impl OcpQcqpDimBuilder {
    /// Builder for a horizon `n` (that is, `n + 1` stages).
    pub fn new(n: usize) -> Self {
        Self {
            stages: vec![StageDim::default(); n + 1],
        }
    }

    pub fn horizon(&self) -> usize {
        self.stages.len() - 1
    }

    /// Set one raw dimension at one stage.
    pub fn set(&mut self, field: DimField, stage: usize, value: usize) -> Result<&mut Self> {
        let horizon = self.horizon();
        let slot = self
            .stages
            .get_mut(stage)
            .ok_or(QcqpError::StageOutOfRange { stage, horizon })?
            .slot(field)
            .ok_or_else(|| {
                QcqpError::InvalidDim(format!("'{}' is derived and cannot be set", field))
            })?;
        *slot = value;
        Ok(self)
    }

    /// Current value of a raw or derived dimension at `stage`.
    pub fn get(&self, field: DimField, stage: usize) -> Result<usize> {
        let horizon = self.horizon();
        self.stages
            .get(stage)
            .map(|s| s.get(field))
            .ok_or(QcqpError::StageOutOfRange { stage, horizon })
    }

    /// Set a dimension by name, e.g. `"nu"`.
    pub fn set_by_name(&mut self, field: &str, stage: usize, value: usize) -> Result<&mut Self> {
        let field = field.parse::<DimField>()?;
        self.set(field, stage, value)
    }

    /// Set a dimension on every stage of `[start, end]`.
    ///
    /// Checks the whole range before writing anything.
    pub fn set_range(
        &mut self,
        field: DimField,
        value: usize,
        start: usize,
        end: usize,
    ) -> Result<&mut Self> {
        if end < start {
            return Err(QcqpError::InvalidRange { start, end });
        }
        let horizon = self.horizon();
        if end > horizon {
            return Err(QcqpError::StageOutOfRange { stage: end, horizon });
        }
        for stage in start..=end {
            self.set(field, stage, value)?;
        }
        Ok(self)
    }

    /// Validate and freeze.
    pub fn build(self) -> Result<OcpQcqpDim> {
        for (stage, s) in self.stages.iter().enumerate() {
            s.validate(stage)?;
        }
        Ok(OcpQcqpDim {
            stages: self.stages.into_boxed_slice(),
        })
    }
}

/// Finalized, immutable stage dimensions.
///
/// Share it between solutions with an `Arc`; nothing in this crate mutates
/// a descriptor after [`OcpQcqpDimBuilder::build`].
#[derive(Debug, PartialEq, Eq)]
pub struct OcpQcqpDim {
    stages: Box<[StageDim]>,
}

impl OcpQcqpDim {
    pub fn builder(n: usize) -> OcpQcqpDimBuilder {
        OcpQcqpDimBuilder::new(n)
    }

    /// Horizon length `N`.
    #[inline]
    pub fn horizon(&self) -> usize {
        self.stages.len() - 1
    }

    /// Number of stages, `N + 1`.
    #[inline]
    pub fn num_stages(&self) -> usize {
        self.stages.len()
    }

    pub fn check_stage(&self, stage: usize) -> Result<()> {
        if stage > self.horizon() {
            Err(QcqpError::StageOutOfRange {
                stage,
                horizon: self.horizon(),
            })
        } else {
            Ok(())
        }
    }

    /// Counts of one stage.
    pub fn stage(&self, stage: usize) -> Result<&StageDim> {
        self.check_stage(stage)?;
        Ok(&self.stages[stage])
    }

    /// One raw or derived dimension at `stage`.
    pub fn get(&self, field: DimField, stage: usize) -> Result<usize> {
        Ok(self.stage(stage)?.get(field))
    }

    /// Size of a solution field at `stage`.
    pub fn variable_count(&self, field: SolField, stage: usize) -> Result<usize> {
        field.count(self, stage)
    }

    pub fn stages(&self) -> impl Iterator<Item = &StageDim> {
        self.stages.iter()
    }
}
