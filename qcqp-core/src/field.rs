//! Registry of solution fields.
//!
//! Every field a solution exposes is a variant of [`SolField`]. Each variant
//! knows which stage dimension sizes it ([`SolField::count`]); engines match
//! on the variant to locate the values. Parsing from a name is the only
//! string-keyed path, and it fails for anything outside the registry.

use std::fmt;
use std::str::FromStr;

use crate::dim::{DimField, OcpQcqpDim};
use crate::error::{QcqpError, Result};

/// Per-stage variable class stored in an OCP QCQP solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolField {
    /// Controls, `nu[i]`.
    U,
    /// States, `nx[i]`.
    X,
    /// Lower slacks of soft constraints, `ns[i]`.
    Sl,
    /// Upper slacks of soft constraints, `ns[i]`.
    Su,
    /// Dynamics multipliers linking stage `i` to `i + 1`, `nx[i + 1]`.
    /// Empty at the terminal stage.
    Pi,
    /// Lower bound multipliers, `nb[i]`.
    LamLb,
    /// Upper bound multipliers, `nb[i]`.
    LamUb,
    /// Lower control bound multipliers, `nbu[i]`.
    LamLbu,
    /// Upper control bound multipliers, `nbu[i]`.
    LamUbu,
    /// Lower state bound multipliers, `nbx[i]`.
    LamLbx,
    /// Upper state bound multipliers, `nbx[i]`.
    LamUbx,
    /// Lower general constraint multipliers, `ng[i]`.
    LamLg,
    /// Upper general constraint multipliers, `ng[i]`.
    LamUg,
    /// Quadratic constraint multipliers, `nq[i]`.
    LamUq,
}

impl SolField {
    /// Every registered field, in registry order.
    pub const ALL: [SolField; 14] = [
        SolField::U,
        SolField::X,
        SolField::Sl,
        SolField::Su,
        SolField::Pi,
        SolField::LamLb,
        SolField::LamUb,
        SolField::LamLbu,
        SolField::LamUbu,
        SolField::LamLbx,
        SolField::LamUbx,
        SolField::LamLg,
        SolField::LamUg,
        SolField::LamUq,
    ];

    /// Registry name, as accepted by [`str::parse`].
    pub fn name(self) -> &'static str {
        match self {
            SolField::U => "u",
            SolField::X => "x",
            SolField::Sl => "sl",
            SolField::Su => "su",
            SolField::Pi => "pi",
            SolField::LamLb => "lam_lb",
            SolField::LamUb => "lam_ub",
            SolField::LamLbu => "lam_lbu",
            SolField::LamUbu => "lam_ubu",
            SolField::LamLbx => "lam_lbx",
            SolField::LamUbx => "lam_ubx",
            SolField::LamLg => "lam_lg",
            SolField::LamUg => "lam_ug",
            SolField::LamUq => "lam_uq",
        }
    }

    /// Number of scalars of this field at `stage`.
    ///
    /// Fails with [`QcqpError::StageOutOfRange`] when `stage > N`.
    pub fn count(self, dim: &OcpQcqpDim, stage: usize) -> Result<usize> {
        let n = match self {
            SolField::U => dim.get(DimField::Nu, stage)?,
            SolField::X => dim.get(DimField::Nx, stage)?,
            SolField::Sl | SolField::Su => dim.get(DimField::Ns, stage)?,
            SolField::Pi => {
                dim.check_stage(stage)?;
                if stage < dim.horizon() {
                    dim.get(DimField::Nx, stage + 1)?
                } else {
                    0
                }
            }
            SolField::LamLb | SolField::LamUb => dim.get(DimField::Nb, stage)?,
            SolField::LamLbu | SolField::LamUbu => dim.get(DimField::Nbu, stage)?,
            SolField::LamLbx | SolField::LamUbx => dim.get(DimField::Nbx, stage)?,
            SolField::LamLg | SolField::LamUg => dim.get(DimField::Ng, stage)?,
            SolField::LamUq => dim.get(DimField::Nq, stage)?,
        };
        Ok(n)
    }

    /// Comma separated list of registered names, for error messages.
    pub fn available() -> String {
        Self::ALL.iter().map(|f| f.name()).collect::<Vec<_>>().join(", ")
    }
}

impl fmt::Display for SolField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SolField {
    type Err = QcqpError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.name() == s)
            .ok_or_else(|| QcqpError::UnknownField {
                field: s.to_string(),
                available: Self::available(),
            })
    }
}
