//! Python bindings for the OCP QCQP solution container.
//!
//! Exposes `OcpQcqpDim` and `OcpQcqpSol` via PyO3. Stage vectors are returned
//! as `(n, 1)` float64 numpy arrays. Solutions use the HPIPM shared library
//! when it can be loaded and fall back to the in-process reference engine
//! otherwise.

use std::sync::Arc;

use numpy::{PyArray1, PyArray2, PyArrayMethods, PyReadonlyArray1};
use pyo3::exceptions::{PyIndexError, PyNameError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyList;
use qcqp_core::{
    DimField, NativeEngine, OcpQcqpDim, OcpQcqpDimBuilder, OcpQcqpSol, QcqpError, ReferenceEngine,
    SolField,
};

fn to_py_err(e: QcqpError) -> PyErr {
    match e {
        QcqpError::UnknownField { .. } | QcqpError::UnknownDimField { .. } => {
            PyNameError::new_err(e.to_string())
        }
        QcqpError::StageOutOfRange { .. } | QcqpError::InvalidRange { .. } => {
            PyIndexError::new_err(e.to_string())
        }
        QcqpError::InvalidDim(_) | QcqpError::DimensionMismatch { .. } => {
            PyValueError::new_err(e.to_string())
        }
        QcqpError::Allocation { .. }
        | QcqpError::Unsupported { .. }
        | QcqpError::LibraryNotFound(_)
        | QcqpError::SymbolNotFound { .. } => PyRuntimeError::new_err(e.to_string()),
    }
}

fn column<'py>(py: Python<'py>, v: &[f64]) -> PyResult<Bound<'py, PyArray2<f64>>> {
    PyArray1::from_slice_bound(py, v).reshape([v.len(), 1])
}

/// Stage dimensions. Mutable until the first solution is created from it.
#[pyclass(name = "OcpQcqpDim")]
pub struct PyOcpQcqpDim {
    builder: Option<OcpQcqpDimBuilder>,
    frozen: Option<Arc<OcpQcqpDim>>,
    horizon: usize,
}

impl PyOcpQcqpDim {
    fn freeze(&mut self) -> PyResult<Arc<OcpQcqpDim>> {
        if let Some(dim) = &self.frozen {
            return Ok(dim.clone());
        }
        let builder = self
            .builder
            .take()
            .ok_or_else(|| PyRuntimeError::new_err("dimension builder already consumed"))?;
        let dim = Arc::new(builder.build().map_err(to_py_err)?);
        self.frozen = Some(dim.clone());
        Ok(dim)
    }
}

#[pymethods]
impl PyOcpQcqpDim {
    #[new]
    fn new(n: usize) -> Self {
        Self {
            builder: Some(OcpQcqpDim::builder(n)),
            frozen: None,
            horizon: n,
        }
    }

    /// Set `field` to `value` at `idx_start`, or on `[idx_start, idx_end]`.
    #[pyo3(signature = (field, value, idx_start, idx_end = None))]
    fn set(
        &mut self,
        field: &str,
        value: usize,
        idx_start: usize,
        idx_end: Option<usize>,
    ) -> PyResult<()> {
        let builder = self.builder.as_mut().ok_or_else(|| {
            PyRuntimeError::new_err("dimensions are frozen once a solution uses them")
        })?;
        let field = field.parse::<DimField>().map_err(to_py_err)?;
        let end = idx_end.unwrap_or(idx_start);
        builder.set_range(field, value, idx_start, end).map_err(to_py_err)?;
        Ok(())
    }

    /// Value of `field` at stage `idx`. Does not freeze the dimensions.
    fn get(&self, field: &str, idx: usize) -> PyResult<usize> {
        let field = field.parse::<DimField>().map_err(to_py_err)?;
        match (&self.frozen, &self.builder) {
            (Some(dim), _) => dim.get(field, idx),
            (None, Some(builder)) => builder.get(field, idx),
            (None, None) => return Err(PyRuntimeError::new_err("dimension builder consumed")),
        }
        .map_err(to_py_err)
    }

    #[getter]
    #[allow(non_snake_case)]
    fn N(&self) -> usize {
        self.horizon
    }

    fn __repr__(&self) -> String {
        format!(
            "OcpQcqpDim(N={}, frozen={})",
            self.horizon,
            self.frozen.is_some()
        )
    }
}

enum AnySol {
    Native(OcpQcqpSol<NativeEngine>),
    Reference(OcpQcqpSol<ReferenceEngine>),
}

/// Solution container bound to an `OcpQcqpDim`.
#[pyclass(name = "OcpQcqpSol", unsendable)]
pub struct PyOcpQcqpSol {
    sol: AnySol,
}

#[pymethods]
impl PyOcpQcqpSol {
    #[new]
    #[pyo3(signature = (dim, engine = None))]
    fn new(dim: &Bound<'_, PyOcpQcqpDim>, engine: Option<&str>) -> PyResult<Self> {
        let dim = dim.borrow_mut().freeze()?;
        let sol = match engine.unwrap_or("auto") {
            "reference" => AnySol::Reference(OcpQcqpSol::reference(dim).map_err(to_py_err)?),
            "hpipm" => {
                let native = NativeEngine::global().map_err(to_py_err)?;
                AnySol::Native(OcpQcqpSol::new(Arc::new(native), dim).map_err(to_py_err)?)
            }
            "auto" => match NativeEngine::global() {
                Ok(native) => {
                    AnySol::Native(OcpQcqpSol::new(Arc::new(native), dim).map_err(to_py_err)?)
                }
                Err(e) => {
                    log::warn!("falling back to reference engine: {}", e);
                    AnySol::Reference(OcpQcqpSol::reference(dim).map_err(to_py_err)?)
                }
            },
            other => {
                return Err(PyValueError::new_err(format!(
                    "unknown engine '{}'; expected 'auto', 'hpipm' or 'reference'",
                    other
                )))
            }
        };
        Ok(Self { sol })
    }

    /// Value of `field` at stage `idx_start`, or a list over
    /// `[idx_start, idx_end]` when `idx_end` is given.
    #[pyo3(signature = (field, idx_start, idx_end = None))]
    fn get(
        &self,
        py: Python<'_>,
        field: &str,
        idx_start: usize,
        idx_end: Option<usize>,
    ) -> PyResult<PyObject> {
        let field = field.parse::<SolField>().map_err(to_py_err)?;
        let end = idx_end.unwrap_or(idx_start);
        let values = match &self.sol {
            AnySol::Native(sol) => sol.stages(field, idx_start..=end),
            AnySol::Reference(sol) => sol.stages(field, idx_start..=end),
        }
        .map_err(to_py_err)?;

        let arrays = values
            .iter()
            .map(|v| column(py, v.as_slice()))
            .collect::<PyResult<Vec<_>>>()?;

        match idx_end {
            Some(_) => Ok(PyList::new_bound(py, arrays).into_any().unbind()),
            None => arrays
                .into_iter()
                .next()
                .map(|a| a.into_any().unbind())
                .ok_or_else(|| PyRuntimeError::new_err("empty stage range")),
        }
    }

    /// Overwrite `field` at stage `idx`.
    fn set(&mut self, field: &str, value: PyReadonlyArray1<'_, f64>, idx: usize) -> PyResult<()> {
        let field = field.parse::<SolField>().map_err(to_py_err)?;
        let values = value.as_slice()?;
        match &mut self.sol {
            AnySol::Native(sol) => sol.set(field, idx, values),
            AnySol::Reference(sol) => sol.set(field, idx, values),
        }
        .map_err(to_py_err)
    }

    /// Engine in use: `"hpipm"` or `"reference"`.
    #[getter]
    fn engine(&self) -> &'static str {
        match &self.sol {
            AnySol::Native(_) => "hpipm",
            AnySol::Reference(_) => "reference",
        }
    }

    #[allow(non_snake_case)]
    fn print_C_struct(&self) {
        match &self.sol {
            AnySol::Native(sol) => sol.dump(),
            AnySol::Reference(sol) => sol.dump(),
        }
    }

    fn __repr__(&self) -> String {
        match &self.sol {
            AnySol::Native(sol) => format!("{:?}", sol),
            AnySol::Reference(sol) => format!("{:?}", sol),
        }
    }
}

/// Get version information.
#[pyfunction]
fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Registered solution field names.
#[pyfunction]
fn fields() -> Vec<&'static str> {
    SolField::ALL.iter().map(|f| f.name()).collect()
}

/// Python module definition.
#[pymodule]
fn _native(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(version, m)?)?;
    m.add_function(wrap_pyfunction!(fields, m)?)?;
    m.add_class::<PyOcpQcqpDim>()?;
    m.add_class::<PyOcpQcqpSol>()?;
    Ok(())
}
