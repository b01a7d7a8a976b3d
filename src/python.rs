//! Python bindings. Table-driven damage is not available from Python since
//! the contact states carry no table collaborator here.

use crate::arena::ContactArena;
use crate::error::JointError;
use crate::interfaces::{ConstitutiveModel, Dim, PropertyValue};
use crate::plugin;
use crate::properties::{YopiParameters, YopiProperty};
use crate::state::ContactState;
use crate::yopi::YopiJoint;
use nalgebra::{Const, Dyn, Vector2};
use numpy::{PyReadonlyArray1, PyReadonlyArray2, PyReadwriteArray1, PyReadwriteArray2};
use pyo3::exceptions::{PyIndexError, PyKeyError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;
use std::collections::HashMap;

impl From<JointError> for PyErr {
    fn from(err: JointError) -> PyErr {
        let message = err.to_string();
        match err {
            JointError::PropertyIndex { .. }
            | JointError::EnergyIndex { .. }
            | JointError::UnknownContact(_) => PyIndexError::new_err(message),
            JointError::UnknownProperty(_)
            | JointError::UnknownModel(_)
            | JointError::TableNotFound(_) => PyKeyError::new_err(message),
            JointError::Configuration { .. }
            | JointError::PropertyType { .. }
            | JointError::ContactCount { .. }
            | JointError::LibraryName { .. } => PyValueError::new_err(message),
            _ => PyRuntimeError::new_err(message),
        }
    }
}

fn dim_from(dim: u8) -> PyResult<Dim> {
    match dim {
        2 => Ok(Dim::Two),
        3 => Ok(Dim::Three),
        _ => Err(PyValueError::new_err(format!("dim must be 2 or 3, got {dim}"))),
    }
}

fn property_map(parameters: &PyDict) -> PyResult<HashMap<String, PropertyValue>> {
    let mut map = HashMap::new();
    for (key, value) in parameters.iter() {
        let value = match value.extract::<f64>() {
            Ok(number) => PropertyValue::Double(number),
            Err(_) => PropertyValue::Str(value.extract::<String>()?),
        };
        map.insert(key.extract::<String>()?, value);
    }
    Ok(map)
}

fn parameters_from(parameters: &PyDict) -> PyResult<YopiParameters> {
    let mut params = YopiParameters::default();
    for (name, value) in property_map(parameters)? {
        params.set(YopiProperty::from_name(&name)?, value)?;
    }
    Ok(params)
}

#[pyclass(name = "YopiJoint")]
struct PyYopiJoint {
    joint: YopiJoint,
    state: ContactState<'static>,
    dim: Dim,
}

#[pymethods]
impl PyYopiJoint {
    #[new]
    #[pyo3(signature = (parameters, area = 1.0, dim = 3))]
    fn new(parameters: &PyDict, area: f64, dim: u8) -> PyResult<Self> {
        Ok(Self {
            joint: YopiJoint::from_hash_map(&property_map(parameters)?)?,
            state: ContactState::new(area),
            dim: dim_from(dim)?,
        })
    }

    /// Runs one cycle and returns `(normal_force, shear_x, shear_y)`.
    fn run(&mut self, normal_disp_inc: f64, shear_disp_inc: [f64; 2]) -> PyResult<(f64, f64, f64)> {
        self.state
            .set_increments(normal_disp_inc, Vector2::from(shear_disp_inc));
        self.joint.run(self.dim, &mut self.state)?;
        Ok((
            self.state.normal_force,
            self.state.shear_force.x,
            self.state.shear_force.y,
        ))
    }

    /// `(dt, ds, dc)`
    #[getter]
    fn damage(&self) -> (f64, f64, f64) {
        let history = self.joint.history();
        (history.dt, history.ds, history.dc)
    }

    #[getter]
    fn flags(&self) -> u32 {
        self.state.flags.bits()
    }

    #[getter]
    fn dnop(&self) -> f64 {
        self.state.dnop
    }

    fn properties(&self) -> String {
        self.joint.properties()
    }

    fn get_property(&self, py: Python, index: usize) -> PyResult<PyObject> {
        Ok(match self.joint.get_property(index)? {
            PropertyValue::Double(value) => value.into_py(py),
            PropertyValue::Str(value) => value.into_py(py),
        })
    }

    fn activate_energy(&mut self) {
        self.joint.activate_energy();
    }

    fn get_energy(&self, index: usize) -> PyResult<f64> {
        Ok(self.joint.get_energy(index)?)
    }
}

/// Batch of contacts sharing one parameter set.
#[pyclass(name = "ContactArena")]
struct PyContactArena {
    arena: ContactArena,
    states: Vec<ContactState<'static>>,
    dim: Dim,
}

#[pymethods]
impl PyContactArena {
    #[new]
    #[pyo3(signature = (parameters, areas, dim = 3))]
    fn new(parameters: &PyDict, areas: PyReadonlyArray1<f64>, dim: u8) -> PyResult<Self> {
        let mut arena = ContactArena::new(parameters_from(parameters)?);
        let areas = areas.as_array();
        let states = areas
            .iter()
            .map(|&area| {
                arena.add_contact();
                ContactState::new(area)
            })
            .collect();
        Ok(Self {
            arena,
            states,
            dim: dim_from(dim)?,
        })
    }

    fn __len__(&self) -> usize {
        self.arena.len()
    }

    fn activate_energy(&mut self) {
        self.arena.activate_energy();
    }

    /// Advances every contact by one cycle. `shear_disp_inc` and
    /// `shear_force` have shape `(n, 2)`; the forces are overwritten.
    fn run(
        &mut self,
        normal_disp_inc: PyReadonlyArray1<f64>,
        shear_disp_inc: PyReadonlyArray2<f64>,
        mut normal_force: PyReadwriteArray1<f64>,
        mut shear_force: PyReadwriteArray2<f64>,
    ) -> PyResult<()> {
        let n = self.states.len();
        let normal_disp_inc = normal_disp_inc
            .try_as_matrix::<Dyn, Const<1>, Const<1>, Dyn>()
            .ok_or_else(|| PyValueError::new_err("normal_disp_inc must be a 1d float array"))?;
        let shear_disp_inc = shear_disp_inc.as_array();
        if normal_disp_inc.nrows() != n || shear_disp_inc.shape() != [n, 2] {
            return Err(PyValueError::new_err(format!(
                "expected increments for {n} contacts"
            )));
        }
        for (i, state) in self.states.iter_mut().enumerate() {
            state.set_increments(
                normal_disp_inc[i],
                Vector2::new(shear_disp_inc[[i, 0]], shear_disp_inc[[i, 1]]),
            );
        }
        self.arena.run_all(self.dim, &mut self.states)?;

        let mut normal_force = normal_force.as_array_mut();
        let mut shear_force = shear_force.as_array_mut();
        if normal_force.len() != n || shear_force.shape() != [n, 2] {
            return Err(PyValueError::new_err(format!(
                "expected force buffers for {n} contacts"
            )));
        }
        for (i, state) in self.states.iter().enumerate() {
            normal_force[i] = state.normal_force;
            shear_force[[i, 0]] = state.shear_force.x;
            shear_force[[i, 1]] = state.shear_force.y;
        }
        Ok(())
    }

    /// `(dt, ds, dc)` of one contact.
    fn damage(&self, index: usize) -> PyResult<(f64, f64, f64)> {
        let id = self
            .arena
            .ids()
            .nth(index)
            .ok_or(JointError::UnknownContact(index))?;
        let history = self
            .arena
            .history(id)
            .ok_or(JointError::UnknownContact(index))?;
        Ok((history.dt, history.ds, history.dc))
    }
}

#[pyfunction]
#[pyo3(name = "get_name")]
fn py_get_name() -> &'static str {
    plugin::get_name()
}

#[pyfunction]
#[pyo3(name = "get_major_version")]
fn py_get_major_version() -> u32 {
    plugin::get_major_version()
}

#[pyfunction]
#[pyo3(name = "get_minor_version")]
fn py_get_minor_version() -> u32 {
    plugin::get_minor_version()
}

#[pyfunction]
fn library_file_name(name: &str, major: u32) -> String {
    plugin::library_file_name(name, major)
}

#[pymodule]
#[pyo3(name = "yopi")]
fn yopi_module(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(py_get_name, m)?)?;
    m.add_function(wrap_pyfunction!(py_get_major_version, m)?)?;
    m.add_function(wrap_pyfunction!(py_get_minor_version, m)?)?;
    m.add_function(wrap_pyfunction!(library_file_name, m)?)?;
    m.add_class::<PyYopiJoint>()?;
    m.add_class::<PyContactArena>()?;
    Ok(())
}
