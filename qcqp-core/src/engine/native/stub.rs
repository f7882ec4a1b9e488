//! In-process stand-in for the HPIPM symbol table.
//!
//! Implements the dimension and solution entry points for `u`, `x` and `pi`
//! over plain Rust structs, so [`NativeEngine`](super::NativeEngine) can be
//! exercised on machines without the shared library. Solution memory holds
//! `u | x` per stage; `pi` reads as zeros.

use std::ffi::CStr;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;

const MAX_STAGES: usize = 8;

/// Calls of the `pi` getter at the terminal stage, where HPIPM would read
/// past `nx`.
pub(super) static TERMINAL_PI_READS: AtomicUsize = AtomicUsize::new(0);
pub(super) static PRINTS: AtomicUsize = AtomicUsize::new(0);

#[repr(C)]
struct StubDim {
    n: c_int,
    nx: [c_int; MAX_STAGES],
    nu: [c_int; MAX_STAGES],
}

#[repr(C)]
struct StubSol {
    dim: *const StubDim,
    mem: *mut f64,
}

unsafe extern "C" fn dim_strsize() -> usize {
    std::mem::size_of::<StubDim>()
}

unsafe extern "C" fn dim_memsize(_n: c_int) -> usize {
    0
}

unsafe extern "C" fn dim_create(n: c_int, dim: *mut c_void, _mem: *mut c_void) {
    assert!((n as usize) < MAX_STAGES);
    dim.cast::<StubDim>().write(StubDim {
        n,
        nx: [0; MAX_STAGES],
        nu: [0; MAX_STAGES],
    });
}

unsafe extern "C" fn dim_set(
    field: *const c_char,
    stage: c_int,
    value: c_int,
    dim: *mut c_void,
) {
    let dim = &mut *dim.cast::<StubDim>();
    match CStr::from_ptr(field).to_bytes() {
        b"nx" => dim.nx[stage as usize] = value,
        b"nu" => dim.nu[stage as usize] = value,
        _ => {}
    }
}

unsafe extern "C" fn dim_get_nx(dim: *const c_void, stage: c_int, value: *mut c_int) {
    *value = (*dim.cast::<StubDim>()).nx[stage as usize];
}

unsafe extern "C" fn dim_get_nu(dim: *const c_void, stage: c_int, value: *mut c_int) {
    *value = (*dim.cast::<StubDim>()).nu[stage as usize];
}

/// Reports one state too many, as a library built with other dims would.
unsafe extern "C" fn dim_get_nx_off_by_one(
    dim: *const c_void,
    stage: c_int,
    value: *mut c_int,
) {
    *value = (*dim.cast::<StubDim>()).nx[stage as usize] + 1;
}

unsafe extern "C" fn sol_strsize() -> usize {
    std::mem::size_of::<StubSol>()
}

fn words(dim: &StubDim) -> usize {
    (0..=dim.n as usize).map(|i| (dim.nu[i] + dim.nx[i]) as usize).sum()
}

unsafe extern "C" fn sol_memsize(dim: *const c_void) -> usize {
    words(&*dim.cast::<StubDim>()) * std::mem::size_of::<f64>()
}

unsafe extern "C" fn sol_create(dim: *mut c_void, sol: *mut c_void, mem: *mut c_void) {
    sol.cast::<StubSol>().write(StubSol {
        dim: dim.cast(),
        mem: mem.cast(),
    });
}

unsafe extern "C" fn sol_print(_dim: *const c_void, _sol: *const c_void) {
    PRINTS.fetch_add(1, Ordering::SeqCst);
}

/// Pointer to `u` of `stage` followed by the stage's `(nu, nx)`.
unsafe fn stage_block(sol: *const c_void, stage: c_int) -> (*mut f64, usize, usize) {
    let sol = &*sol.cast::<StubSol>();
    let dim = &*sol.dim;
    let stage = stage as usize;
    let offset: usize = (0..stage).map(|i| (dim.nu[i] + dim.nx[i]) as usize).sum();
    (sol.mem.add(offset), dim.nu[stage] as usize, dim.nx[stage] as usize)
}

unsafe extern "C" fn get_u(stage: c_int, sol: *const c_void, vec: *mut f64) {
    let (u, nu, _) = stage_block(sol, stage);
    std::ptr::copy_nonoverlapping(u, vec, nu);
}

unsafe extern "C" fn get_x(stage: c_int, sol: *const c_void, vec: *mut f64) {
    let (u, nu, nx) = stage_block(sol, stage);
    std::ptr::copy_nonoverlapping(u.add(nu), vec, nx);
}

unsafe extern "C" fn set_u(stage: c_int, vec: *const f64, sol: *mut c_void) {
    let (u, nu, _) = stage_block(sol, stage);
    std::ptr::copy_nonoverlapping(vec, u, nu);
}

unsafe extern "C" fn set_x(stage: c_int, vec: *const f64, sol: *mut c_void) {
    let (u, nu, nx) = stage_block(sol, stage);
    std::ptr::copy_nonoverlapping(vec, u.add(nu), nx);
}

unsafe extern "C" fn get_pi(stage: c_int, sol: *const c_void, vec: *mut f64) {
    let dim = &*(*sol.cast::<StubSol>()).dim;
    if stage >= dim.n {
        TERMINAL_PI_READS.fetch_add(1, Ordering::SeqCst);
        return;
    }
    let n = dim.nx[stage as usize + 1] as usize;
    std::slice::from_raw_parts_mut(vec, n).fill(0.0);
}

/// Symbol table over the stub. With `consistent_dims` false the `nx` getter
/// disagrees with what was set.
pub(super) fn library(consistent_dims: bool) -> HpipmLibrary {
    let mut getters: [Option<SolGetFn>; SolField::ALL.len()] = [None; SolField::ALL.len()];
    let mut setters: [Option<SolSetFn>; SolField::ALL.len()] = [None; SolField::ALL.len()];
    getters[SolField::U as usize] = Some(get_u);
    getters[SolField::X as usize] = Some(get_x);
    getters[SolField::Pi as usize] = Some(get_pi);
    setters[SolField::U as usize] = Some(set_u);
    setters[SolField::X as usize] = Some(set_x);

    let get_nx: DimGetFn = if consistent_dims {
        dim_get_nx
    } else {
        dim_get_nx_off_by_one
    };
    HpipmLibrary {
        _lib: None,
        dim_strsize,
        dim_memsize,
        dim_create,
        dim_set,
        dim_get_nx: Some(get_nx),
        dim_get_nu: Some(dim_get_nu),
        sol_strsize,
        sol_memsize,
        sol_create,
        sol_print,
        getters,
        setters,
    }
}
