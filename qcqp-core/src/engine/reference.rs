//! In-process engine with HPIPM's per-stage solution layout.
//!
//! Each stage `i` owns four consecutive blocks in one `f64` buffer:
//!
//! ```text
//! ux  : u (nu) | x (nx) | sl (ns) | su (ns)
//! pi  : nx[i+1]                    (empty at i = N)
//! lam : lb (nb) | lg (ng) | lq (nq) | ub (nb) | ug (ng) | uq (nq) | ls (ns) | us (ns)
//! t   : same shape as lam
//! ```
//!
//! Inside `lb`/`ub` control bounds come before state bounds. `t` holds the
//! constraint slacks of the interior-point iterate and is not exposed as a
//! field.
//!
//! Fresh memory is filled with NaN: reading before the solver (or `set`) has
//! written a field yields NaN rather than a plausible zero.

use std::ops::Range;

use crate::dim::{OcpQcqpDim, StageDim};
use crate::engine::memory::try_filled;
use crate::engine::{check_len, QcqpEngine};
use crate::error::Result;
use crate::field::SolField;

/// Solution storage of the [`ReferenceEngine`].
#[derive(Debug)]
pub struct ReferenceSol {
    mem: Vec<f64>,
    ux: Box<[usize]>,
    pi: Box<[usize]>,
    lam: Box<[usize]>,
    t: Box<[usize]>,
}

impl ReferenceSol {
    /// Interior-point slacks `t` of `stage`.
    pub fn t(&self, dim: &OcpQcqpDim, stage: usize) -> Result<&[f64]> {
        let s = dim.stage(stage)?;
        let start = self.t[stage];
        Ok(&self.mem[start..start + lam_len(s)])
    }
}

/// Engine storing solutions in Rust-owned memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceEngine;

impl ReferenceEngine {
    pub fn new() -> Self {
        Self
    }

    /// Human-readable dump of every field on every stage.
    pub fn render(&self, dim: &OcpQcqpDim, sol: &ReferenceSol) -> String {
        let mut out = String::new();
        for field in SolField::ALL {
            out.push_str(field.name());
            out.push('\n');
            for stage in 0..dim.num_stages() {
                let range = match locate(dim, field, stage, sol) {
                    Ok(r) => r,
                    Err(_) => continue,
                };
                out.push_str(&format!("  stage {:>3}:", stage));
                for v in &sol.mem[range] {
                    out.push_str(&format!(" {:.6e}", v));
                }
                out.push('\n');
            }
        }
        out
    }
}

fn ux_len(s: &StageDim) -> usize {
    s.nu + s.nx + 2 * s.ns()
}

fn lam_len(s: &StageDim) -> usize {
    2 * (s.nb() + s.ng + s.nq + s.ns())
}

/// Per-stage block offsets and total length.
struct Layout {
    ux: Vec<usize>,
    pi: Vec<usize>,
    lam: Vec<usize>,
    t: Vec<usize>,
    len: usize,
}

fn layout(dim: &OcpQcqpDim) -> Result<Layout> {
    let stages = dim.num_stages();
    let mut l = Layout {
        ux: Vec::with_capacity(stages),
        pi: Vec::with_capacity(stages),
        lam: Vec::with_capacity(stages),
        t: Vec::with_capacity(stages),
        len: 0,
    };
    for stage in 0..stages {
        let s = dim.stage(stage)?;
        let pi_len = SolField::Pi.count(dim, stage)?;

        l.ux.push(l.len);
        l.len += ux_len(s);
        l.pi.push(l.len);
        l.len += pi_len;
        l.lam.push(l.len);
        l.len += lam_len(s);
        l.t.push(l.len);
        l.len += lam_len(s);
    }
    Ok(l)
}

/// Slice of `sol.mem` holding `field` at `stage`.
fn locate(
    dim: &OcpQcqpDim,
    field: SolField,
    stage: usize,
    sol: &ReferenceSol,
) -> Result<Range<usize>> {
    let s = dim.stage(stage)?;
    let (nb, ns) = (s.nb(), s.ns());
    let ux = sol.ux[stage];
    let lam = sol.lam[stage];
    let ub = lam + nb + s.ng + s.nq;

    let (start, len) = match field {
        SolField::U => (ux, s.nu),
        SolField::X => (ux + s.nu, s.nx),
        SolField::Sl => (ux + s.nu + s.nx, ns),
        SolField::Su => (ux + s.nu + s.nx + ns, ns),
        SolField::Pi => (sol.pi[stage], field.count(dim, stage)?),
        SolField::LamLb => (lam, nb),
        SolField::LamLbu => (lam, s.nbu),
        SolField::LamLbx => (lam + s.nbu, s.nbx),
        SolField::LamLg => (lam + nb, s.ng),
        SolField::LamUb => (ub, nb),
        SolField::LamUbu => (ub, s.nbu),
        SolField::LamUbx => (ub + s.nbu, s.nbx),
        SolField::LamUg => (ub + nb, s.ng),
        SolField::LamUq => (ub + nb + s.ng, s.nq),
    };
    Ok(start..start + len)
}

impl QcqpEngine for ReferenceEngine {
    type Sol = ReferenceSol;

    fn name(&self) -> &'static str {
        "reference"
    }

    fn sol_strsize(&self) -> usize {
        std::mem::size_of::<ReferenceSol>()
    }

    fn sol_memsize(&self, dim: &OcpQcqpDim) -> Result<usize> {
        let l = layout(dim)?;
        let offsets = 4 * dim.num_stages() * std::mem::size_of::<usize>();
        Ok(l.len * std::mem::size_of::<f64>() + offsets)
    }

    fn sol_create(&self, dim: &OcpQcqpDim) -> Result<ReferenceSol> {
        let l = layout(dim)?;
        let mem = try_filled(l.len, f64::NAN)?;
        Ok(ReferenceSol {
            mem,
            ux: l.ux.into_boxed_slice(),
            pi: l.pi.into_boxed_slice(),
            lam: l.lam.into_boxed_slice(),
            t: l.t.into_boxed_slice(),
        })
    }

    fn sol_size(&self, sol: &ReferenceSol) -> usize {
        let offsets = 4 * sol.ux.len() * std::mem::size_of::<usize>();
        sol.mem.len() * std::mem::size_of::<f64>() + offsets
    }

    fn sol_get(
        &self,
        dim: &OcpQcqpDim,
        field: SolField,
        stage: usize,
        sol: &ReferenceSol,
        out: &mut [f64],
    ) -> Result<()> {
        let range = locate(dim, field, stage, sol)?;
        check_len(field, stage, range.len(), out.len())?;
        out.copy_from_slice(&sol.mem[range]);
        Ok(())
    }

    fn sol_set(
        &self,
        dim: &OcpQcqpDim,
        field: SolField,
        stage: usize,
        values: &[f64],
        sol: &mut ReferenceSol,
    ) -> Result<()> {
        let range = locate(dim, field, stage, sol)?;
        check_len(field, stage, range.len(), values.len())?;
        sol.mem[range].copy_from_slice(values);
        Ok(())
    }

    fn sol_print(&self, dim: &OcpQcqpDim, sol: &ReferenceSol) {
        print!("{}", self.render(dim, sol));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dim::DimField;
    use crate::error::QcqpError;

    fn full_stage_dim() -> OcpQcqpDim {
        let mut b = OcpQcqpDim::builder(1);
        b.set_range(DimField::Nx, 3, 0, 1).unwrap();
        b.set(DimField::Nu, 0, 2).unwrap();
        b.set(DimField::Nbu, 0, 1).unwrap();
        b.set(DimField::Nbx, 0, 2).unwrap();
        b.set(DimField::Ng, 0, 1).unwrap();
        b.set(DimField::Nq, 0, 1).unwrap();
        b.set(DimField::Nsbx, 0, 1).unwrap();
        b.set(DimField::Nsq, 0, 1).unwrap();
        b.build().unwrap()
    }

    #[test]
    fn memsize_covers_every_block() {
        let dim = full_stage_dim();
        // stage 0: ux 2+3+4, pi 3, lam 2*(3+1+1+2) twice
        // stage 1: ux 3, pi 0, lam 0, t 0
        let words = (9 + 3 + 14 + 14) + 3;
        let offsets = 4 * 2 * std::mem::size_of::<usize>();
        assert_eq!(
            ReferenceEngine.sol_memsize(&dim).unwrap(),
            words * 8 + offsets
        );
    }

    #[test]
    fn allocated_size_matches_memsize() {
        let dim = full_stage_dim();
        let sol = ReferenceEngine.sol_create(&dim).unwrap();
        assert_eq!(ReferenceEngine.sol_size(&sol), ReferenceEngine.sol_memsize(&dim).unwrap());
    }

    #[test]
    fn fresh_memory_is_nan() {
        let dim = full_stage_dim();
        let sol = ReferenceEngine.sol_create(&dim).unwrap();
        let mut out = vec![0.0; 2];
        ReferenceEngine.sol_get(&dim, SolField::U, 0, &sol, &mut out).unwrap();
        assert!(out.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn bound_multipliers_split_controls_then_states() {
        let dim = full_stage_dim();
        let engine = ReferenceEngine;
        let mut sol = engine.sol_create(&dim).unwrap();
        engine.sol_set(&dim, SolField::LamLb, 0, &[1.0, 2.0, 3.0], &mut sol).unwrap();
        engine.sol_set(&dim, SolField::LamUb, 0, &[4.0, 5.0, 6.0], &mut sol).unwrap();

        let mut lbu = vec![0.0; 1];
        let mut lbx = vec![0.0; 2];
        let mut ubx = vec![0.0; 2];
        engine.sol_get(&dim, SolField::LamLbu, 0, &sol, &mut lbu).unwrap();
        engine.sol_get(&dim, SolField::LamLbx, 0, &sol, &mut lbx).unwrap();
        engine.sol_get(&dim, SolField::LamUbx, 0, &sol, &mut ubx).unwrap();
        assert_eq!(lbu, vec![1.0]);
        assert_eq!(lbx, vec![2.0, 3.0]);
        assert_eq!(ubx, vec![5.0, 6.0]);
    }

    #[test]
    fn fields_do_not_overlap() {
        let dim = full_stage_dim();
        let engine = ReferenceEngine;
        let mut sol = engine.sol_create(&dim).unwrap();
        let disjoint = [
            SolField::U,
            SolField::X,
            SolField::Sl,
            SolField::Su,
            SolField::Pi,
            SolField::LamLb,
            SolField::LamLg,
            SolField::LamUb,
            SolField::LamUg,
            SolField::LamUq,
        ];
        for (k, field) in disjoint.iter().enumerate() {
            let n = field.count(&dim, 0).unwrap();
            engine.sol_set(&dim, *field, 0, &vec![k as f64; n], &mut sol).unwrap();
        }
        for (k, field) in disjoint.iter().enumerate() {
            let n = field.count(&dim, 0).unwrap();
            let mut out = vec![f64::NAN; n];
            engine.sol_get(&dim, *field, 0, &sol, &mut out).unwrap();
            assert!(out.iter().all(|&v| v == k as f64), "{} was overwritten", field);
        }
    }

    #[test]
    fn wrong_length_is_rejected() {
        let dim = full_stage_dim();
        let engine = ReferenceEngine;
        let mut sol = engine.sol_create(&dim).unwrap();
        let err = engine.sol_set(&dim, SolField::X, 1, &[1.0], &mut sol).unwrap_err();
        assert_eq!(
            err,
            QcqpError::DimensionMismatch {
                field: "x",
                stage: 1,
                expected: 3,
                actual: 1
            }
        );
    }

    #[test]
    fn t_matches_lam_shape() {
        let dim = full_stage_dim();
        let sol = ReferenceEngine.sol_create(&dim).unwrap();
        assert_eq!(sol.t(&dim, 0).unwrap().len(), 14);
        assert_eq!(sol.t(&dim, 1).unwrap().len(), 0);
    }

    #[test]
    fn render_lists_every_field() {
        let dim = full_stage_dim();
        let sol = ReferenceEngine.sol_create(&dim).unwrap();
        let text = ReferenceEngine.render(&dim, &sol);
        for field in SolField::ALL {
            assert!(text.lines().any(|l| l == field.name()), "missing {}", field);
        }
        assert!(text.contains("stage   1:"));
        assert!(text.contains("lam_lb\n  stage   0: NaN NaN NaN\n"));
    }
}
