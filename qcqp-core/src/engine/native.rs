//! Dynamic bindings to the HPIPM shared library.
//!
//! The library is opened at runtime so the crate builds and runs on systems
//! without HPIPM; in that case [`HpipmLibrary::global`] reports
//! [`QcqpError::LibraryNotFound`]. Symbols are resolved once into plain
//! function pointers.
//!
//! HPIPM's solution struct keeps a pointer to its dimension struct, so every
//! [`NativeSol`] carries the native mirror of its [`OcpQcqpDim`] next to the
//! solution memory.

use std::ffi::{c_char, c_int, c_void, CString};
use std::sync::{Arc, OnceLock};

use libloading::Library;

use crate::dim::{DimField, OcpQcqpDim};
use crate::engine::config::EngineConfig;
use crate::engine::memory::OpaqueRegion;
use crate::engine::{check_len, QcqpEngine};
use crate::error::{QcqpError, Result};
use crate::field::SolField;

// ============================================================================
// Function pointer types
// ============================================================================

type StrsizeFn = unsafe extern "C" fn() -> usize;
type DimMemsizeFn = unsafe extern "C" fn(n: c_int) -> usize;
type DimCreateFn = unsafe extern "C" fn(n: c_int, dim: *mut c_void, mem: *mut c_void);
type DimSetFn =
    unsafe extern "C" fn(field: *const c_char, stage: c_int, value: c_int, dim: *mut c_void);
type DimGetFn = unsafe extern "C" fn(dim: *const c_void, stage: c_int, value: *mut c_int);

type SolMemsizeFn = unsafe extern "C" fn(dim: *const c_void) -> usize;
type SolCreateFn = unsafe extern "C" fn(dim: *mut c_void, sol: *mut c_void, mem: *mut c_void);
type SolGetFn = unsafe extern "C" fn(stage: c_int, sol: *const c_void, vec: *mut f64);
type SolSetFn = unsafe extern "C" fn(stage: c_int, vec: *const f64, sol: *mut c_void);
type SolPrintFn = unsafe extern "C" fn(dim: *const c_void, sol: *const c_void);

// ============================================================================
// Library wrapper
// ============================================================================

/// Dynamically loaded HPIPM library.
pub struct HpipmLibrary {
    /// `None` only for in-process symbol tables built by tests.
    _lib: Option<Library>,

    dim_strsize: StrsizeFn,
    dim_memsize: DimMemsizeFn,
    dim_create: DimCreateFn,
    dim_set: DimSetFn,
    dim_get_nx: Option<DimGetFn>,
    dim_get_nu: Option<DimGetFn>,

    sol_strsize: StrsizeFn,
    sol_memsize: SolMemsizeFn,
    sol_create: SolCreateFn,
    sol_print: SolPrintFn,

    /// Indexed by position in [`SolField::ALL`].
    getters: [Option<SolGetFn>; SolField::ALL.len()],
    setters: [Option<SolSetFn>; SolField::ALL.len()],
}

// SAFETY: the loaded entry points only touch memory passed in by the caller;
// no global state is mutated.
unsafe impl Send for HpipmLibrary {}
unsafe impl Sync for HpipmLibrary {}

static HPIPM_LIB: OnceLock<Result<Arc<HpipmLibrary>>> = OnceLock::new();

impl HpipmLibrary {
    /// Open the first library in `config.library_names` and resolve symbols.
    pub fn load(config: &EngineConfig) -> Result<Self> {
        let lib = open_first(&config.library_names)?;

        // SAFETY: signatures match the HPIPM C API for the double-precision
        // OCP QCQP dimension and solution modules.
        unsafe {
            let mut getters = [None; SolField::ALL.len()];
            let mut setters = [None; SolField::ALL.len()];
            for (i, field) in SolField::ALL.iter().enumerate() {
                let get_name = format!("d_ocp_qcqp_sol_get_{}", field.name());
                let set_name = format!("d_ocp_qcqp_sol_set_{}", field.name());
                getters[i] = optional::<SolGetFn>(&lib, &get_name);
                setters[i] = optional::<SolSetFn>(&lib, &set_name);
            }
            for field in [SolField::U, SolField::X] {
                if getters[field as usize].is_none() {
                    return Err(QcqpError::SymbolNotFound {
                        symbol: format!("d_ocp_qcqp_sol_get_{}", field.name()),
                        reason: "required getter missing".to_string(),
                    });
                }
            }

            let loaded = Self {
                dim_strsize: required(&lib, "d_ocp_qcqp_dim_strsize")?,
                dim_memsize: required(&lib, "d_ocp_qcqp_dim_memsize")?,
                dim_create: required(&lib, "d_ocp_qcqp_dim_create")?,
                dim_set: required(&lib, "d_ocp_qcqp_dim_set")?,
                dim_get_nx: optional(&lib, "d_ocp_qcqp_dim_get_nx"),
                dim_get_nu: optional(&lib, "d_ocp_qcqp_dim_get_nu"),
                sol_strsize: required(&lib, "d_ocp_qcqp_sol_strsize")?,
                sol_memsize: required(&lib, "d_ocp_qcqp_sol_memsize")?,
                sol_create: required(&lib, "d_ocp_qcqp_sol_create")?,
                sol_print: required(&lib, "d_ocp_qcqp_sol_print")?,
                getters,
                setters,
                _lib: Some(lib),
            };
            log::debug!(
                "loaded HPIPM: {} getters, {} setters",
                loaded.getters.iter().flatten().count(),
                loaded.setters.iter().flatten().count()
            );
            Ok(loaded)
        }
    }

    /// Process-wide instance, loaded on first call from [`EngineConfig::from_env`].
    pub fn global() -> Result<Arc<HpipmLibrary>> {
        HPIPM_LIB
            .get_or_init(|| HpipmLibrary::load(&EngineConfig::from_env()).map(Arc::new))
            .clone()
    }

    /// Whether the process-wide instance could be loaded.
    pub fn is_available() -> bool {
        Self::global().is_ok()
    }

    /// Whether the library exports a getter for `field`.
    pub fn supports_get(&self, field: SolField) -> bool {
        self.getters[field as usize].is_some()
    }

    pub fn supports_set(&self, field: SolField) -> bool {
        self.setters[field as usize].is_some()
    }
}

fn open_first(names: &[String]) -> Result<Library> {
    let mut errors = Vec::with_capacity(names.len());
    for name in names {
        // SAFETY: loading HPIPM runs no initialization routines with
        // preconditions on our side.
        match unsafe { Library::new(name) } {
            Ok(lib) => {
                log::debug!("opened {}", name);
                return Ok(lib);
            }
            Err(e) => errors.push(format!("{}: {}", name, e)),
        }
    }
    Err(QcqpError::LibraryNotFound(errors.join("; ")))
}

unsafe fn required<T: Copy>(lib: &Library, name: &str) -> Result<T> {
    lib.get::<T>(name.as_bytes())
        .map(|s| *s)
        .map_err(|e| QcqpError::SymbolNotFound {
            symbol: name.to_string(),
            reason: e.to_string(),
        })
}

unsafe fn optional<T: Copy>(lib: &Library, name: &str) -> Option<T> {
    lib.get::<T>(name.as_bytes()).ok().map(|s| *s)
}

fn to_c_int(value: usize, what: &str) -> Result<c_int> {
    c_int::try_from(value)
        .map_err(|_| QcqpError::InvalidDim(format!("{} = {} does not fit a C int", what, value)))
}

// ============================================================================
// Engine
// ============================================================================

/// Native solution storage: the dimension mirror plus the solution proper.
pub struct NativeSol {
    dim_struct: OpaqueRegion,
    _dim_mem: OpaqueRegion,
    sol_struct: OpaqueRegion,
    sol_mem: OpaqueRegion,
}

/// Engine backed by the HPIPM shared library.
#[derive(Clone)]
pub struct NativeEngine {
    lib: Arc<HpipmLibrary>,
    config: EngineConfig,
}

impl NativeEngine {
    pub fn new(lib: Arc<HpipmLibrary>, config: EngineConfig) -> Self {
        Self { lib, config }
    }

    /// Engine on the process-wide library.
    pub fn global() -> Result<Self> {
        Ok(Self::new(HpipmLibrary::global()?, EngineConfig::from_env()))
    }

    pub fn library(&self) -> &HpipmLibrary {
        &self.lib
    }

    /// Build the native dimension struct mirroring `dim`.
    fn create_dim(&self, dim: &OcpQcqpDim) -> Result<(OpaqueRegion, OpaqueRegion)> {
        let n = to_c_int(dim.horizon(), "N")?;
        // SAFETY: size queries have no preconditions.
        let (str_size, mem_size) =
            unsafe { ((self.lib.dim_strsize)(), (self.lib.dim_memsize)(n)) };
        let mut dim_struct = OpaqueRegion::try_new(str_size)?;
        let mut dim_mem = OpaqueRegion::try_new(mem_size)?;

        // SAFETY: both regions have the sizes HPIPM asked for.
        unsafe { (self.lib.dim_create)(n, dim_struct.as_mut_ptr(), dim_mem.as_mut_ptr()) };

        let mut names = Vec::new();
        for field in DimField::ALL.iter().filter(|f| !f.is_derived()) {
            let name = CString::new(field.name())
                .map_err(|e| QcqpError::InvalidDim(e.to_string()))?;
            names.push((*field, name));
        }
        for (stage, counts) in dim.stages().enumerate() {
            let stage_c = to_c_int(stage, "stage")?;
            for (field, name) in &names {
                let value = counts.get(*field);
                if value == 0 {
                    continue;
                }
                let value = to_c_int(value, field.name())?;
                // SAFETY: `name` is NUL terminated and the struct was created above.
                unsafe {
                    (self.lib.dim_set)(name.as_ptr(), stage_c, value, dim_struct.as_mut_ptr())
                };
            }
        }

        if self.config.verify_dims {
            self.verify_dim(dim, &dim_struct)?;
        }
        Ok((dim_struct, dim_mem))
    }

    fn verify_dim(&self, dim: &OcpQcqpDim, dim_struct: &OpaqueRegion) -> Result<()> {
        let checks = [
            (DimField::Nx, self.lib.dim_get_nx),
            (DimField::Nu, self.lib.dim_get_nu),
        ];
        for (field, getter) in checks {
            let Some(getter) = getter else {
                log::warn!("cannot verify '{}': getter not exported", field);
                continue;
            };
            for stage in 0..dim.num_stages() {
                let mut native: c_int = 0;
                // SAFETY: the struct was created by `dim_create` and stage <= N.
                unsafe { getter(dim_struct.as_ptr(), to_c_int(stage, "stage")?, &mut native) };
                let expected = dim.get(field, stage)?;
                if usize::try_from(native).ok() != Some(expected) {
                    return Err(QcqpError::InvalidDim(format!(
                        "native {} at stage {} is {}, expected {}",
                        field, stage, native, expected
                    )));
                }
            }
        }
        Ok(())
    }
}

impl QcqpEngine for NativeEngine {
    type Sol = NativeSol;

    fn name(&self) -> &'static str {
        "hpipm"
    }

    fn sol_strsize(&self) -> usize {
        // SAFETY: no preconditions.
        unsafe { (self.lib.sol_strsize)() }
    }

    fn sol_memsize(&self, dim: &OcpQcqpDim) -> Result<usize> {
        let (dim_struct, _dim_mem) = self.create_dim(dim)?;
        // SAFETY: `dim_struct` is a fully initialized dimension struct.
        Ok(unsafe { (self.lib.sol_memsize)(dim_struct.as_ptr()) })
    }

    fn sol_create(&self, dim: &OcpQcqpDim) -> Result<NativeSol> {
        let (mut dim_struct, dim_mem) = self.create_dim(dim)?;
        // SAFETY: `dim_struct` is a fully initialized dimension struct.
        let mem_size = unsafe { (self.lib.sol_memsize)(dim_struct.as_ptr()) };
        let mut sol_struct = OpaqueRegion::try_new(self.sol_strsize())?;
        let mut sol_mem = OpaqueRegion::try_new(mem_size)?;

        // SAFETY: regions are sized by HPIPM and outlive the solution, which
        // keeps pointers into `dim_struct` and `sol_mem`.
        unsafe {
            (self.lib.sol_create)(
                dim_struct.as_mut_ptr(),
                sol_struct.as_mut_ptr(),
                sol_mem.as_mut_ptr(),
            )
        };

        Ok(NativeSol {
            dim_struct,
            _dim_mem: dim_mem,
            sol_struct,
            sol_mem,
        })
    }

    fn sol_size(&self, sol: &NativeSol) -> usize {
        sol.sol_mem.size()
    }

    fn sol_get(
        &self,
        dim: &OcpQcqpDim,
        field: SolField,
        stage: usize,
        sol: &NativeSol,
        out: &mut [f64],
    ) -> Result<()> {
        let n = field.count(dim, stage)?;
        check_len(field, stage, n, out.len())?;
        let getter = self.lib.getters[field as usize].ok_or(QcqpError::Unsupported {
            op: "get",
            field: field.name(),
        })?;
        // HPIPM getters read `nx[stage + 1]` for `pi`, which does not exist
        // at the terminal stage.
        if n == 0 {
            return Ok(());
        }
        // SAFETY: `stage <= N` and `out` holds exactly the field's count.
        unsafe { getter(to_c_int(stage, "stage")?, sol.sol_struct.as_ptr(), out.as_mut_ptr()) };
        Ok(())
    }

    fn sol_set(
        &self,
        dim: &OcpQcqpDim,
        field: SolField,
        stage: usize,
        values: &[f64],
        sol: &mut NativeSol,
    ) -> Result<()> {
        let n = field.count(dim, stage)?;
        check_len(field, stage, n, values.len())?;
        let setter = self.lib.setters[field as usize].ok_or(QcqpError::Unsupported {
            op: "set",
            field: field.name(),
        })?;
        if n == 0 {
            return Ok(());
        }
        let stage = to_c_int(stage, "stage")?;
        // SAFETY: as in `sol_get`.
        unsafe { setter(stage, values.as_ptr(), sol.sol_struct.as_mut_ptr()) };
        Ok(())
    }

    fn sol_print(&self, _dim: &OcpQcqpDim, sol: &NativeSol) {
        // SAFETY: both structs were initialized in `sol_create`.
        unsafe { (self.lib.sol_print)(sol.dim_struct.as_ptr(), sol.sol_struct.as_ptr()) };
    }
}

#[cfg(test)]
mod stub;
