use crate::error::{JointError, JointResult};
use crate::table::{TableHandle, TableLookup};
use nalgebra::Vector2;

/// Number of scratch slots carried by every contact state.
pub const WORKING_LEN: usize = 8;
/// Tensile damage increment of the current step.
pub const DQT: usize = 0;
/// Shear damage increment of the current step.
pub const DQS: usize = 1;
/// Compressive damage increment of the current step.
pub const DQC: usize = 2;
/// Plastic slip increment of the current step.
pub const DSLIP: usize = 3;

bitflags::bitflags! {
    /// Failure state of a contact as reported to the host.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ContactFlags: u32 {
        const SLIP_NOW = 0b0000_0001;
        const SLIP_PAST = 0b0000_0010;
        const TENSION_NOW = 0b0000_0100;
        const TENSION_PAST = 0b0000_1000;
        const COMPRESSION_NOW = 0b0001_0000;
        const COMPRESSION_PAST = 0b0010_0000;
    }
}

impl ContactFlags {
    /// Moves every *now* flag into its *past* counterpart.
    pub fn age(&mut self) {
        const PAIRS: [(ContactFlags, ContactFlags); 3] = [
            (ContactFlags::SLIP_NOW, ContactFlags::SLIP_PAST),
            (ContactFlags::TENSION_NOW, ContactFlags::TENSION_PAST),
            (ContactFlags::COMPRESSION_NOW, ContactFlags::COMPRESSION_PAST),
        ];
        for (now, past) in PAIRS {
            if self.contains(now) {
                self.remove(now);
                self.insert(past);
            }
        }
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct HostFeatures: u32 {
        const THERMAL = 0b0001;
        const CREEP = 0b0010;
        const FLUID = 0b0100;
        const TRACK_ENERGY = 0b1000;
    }
}

/// Per-contact quantities exchanged between the host and a model every cycle.
///
/// The host writes the displacement increments and `area` before calling
/// `run`; the model writes the forces, force increments and `dnop`.
#[derive(Clone)]
pub struct ContactState<'a> {
    pub normal_disp_inc: f64,
    pub shear_disp_inc: Vector2<f64>,
    pub area: f64,
    pub flags: ContactFlags,
    pub normal_force: f64,
    pub shear_force: Vector2<f64>,
    pub normal_force_inc: f64,
    pub shear_force_inc: Vector2<f64>,
    /// Fraction of the normal increment at which the contact separated.
    pub dnop: f64,
    pub working: [f64; WORKING_LEN],
    pub time_step: f64,
    pub features: HostFeatures,
    tables: Option<&'a (dyn TableLookup + Sync)>,
}

impl std::fmt::Debug for ContactState<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContactState")
            .field("normal_disp_inc", &self.normal_disp_inc)
            .field("shear_disp_inc", &self.shear_disp_inc)
            .field("area", &self.area)
            .field("flags", &self.flags)
            .field("normal_force", &self.normal_force)
            .field("shear_force", &self.shear_force)
            .field("dnop", &self.dnop)
            .field("has_tables", &self.tables.is_some())
            .finish()
    }
}

impl<'a> ContactState<'a> {
    pub fn new(area: f64) -> Self {
        Self {
            normal_disp_inc: 0.0,
            shear_disp_inc: Vector2::zeros(),
            area,
            flags: ContactFlags::empty(),
            normal_force: 0.0,
            shear_force: Vector2::zeros(),
            normal_force_inc: 0.0,
            shear_force_inc: Vector2::zeros(),
            dnop: 0.0,
            working: [0.0; WORKING_LEN],
            time_step: 1.0,
            features: HostFeatures::empty(),
            tables: None,
        }
    }

    pub fn with_tables(mut self, tables: &'a (dyn TableLookup + Sync)) -> Self {
        self.tables = Some(tables);
        self
    }

    pub fn tables(&self) -> Option<&'a (dyn TableLookup + Sync)> {
        self.tables
    }

    pub fn set_increments(&mut self, normal: f64, shear: Vector2<f64>) {
        self.normal_disp_inc = normal;
        self.shear_disp_inc = shear;
    }

    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    pub fn is_thermal(&self) -> bool {
        self.features.contains(HostFeatures::THERMAL)
    }

    pub fn is_creep(&self) -> bool {
        self.features.contains(HostFeatures::CREEP)
    }

    pub fn is_fluid(&self) -> bool {
        self.features.contains(HostFeatures::FLUID)
    }

    pub fn track_energy(&self) -> bool {
        self.features.contains(HostFeatures::TRACK_ENERGY)
    }

    pub fn table_index_from_id(&self, id: &str) -> JointResult<TableHandle> {
        let tables = self
            .tables
            .ok_or_else(|| JointError::NoTables(id.to_string()))?;
        tables
            .table_index_from_id(id)
            .ok_or_else(|| JointError::TableNotFound(id.to_string()))
    }

    pub fn y_from_x(&self, handle: TableHandle, x: f64) -> JointResult<f64> {
        self.tables
            .and_then(|tables| tables.y_from_x(handle, x))
            .ok_or(JointError::StaleTable(handle))
    }

    pub fn slope_from_x(&self, handle: TableHandle, x: f64) -> JointResult<f64> {
        self.tables
            .and_then(|tables| tables.slope_from_x(handle, x))
            .ok_or(JointError::StaleTable(handle))
    }

    /// Ages the failure flags at the start of a cycle. A contact that never
    /// failed gets its scratch slots cleared.
    pub(crate) fn begin_cycle(&mut self) {
        if self.flags.is_empty() {
            self.working = [0.0; WORKING_LEN];
        }
        self.flags.age();
    }
}
