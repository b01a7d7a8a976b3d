use crate::interfaces::Dim;
use crate::numerics::{clamp_unit, ratchet};
use serde::{Deserialize, Serialize};

/// Branch of the normal response the contact was on after its last step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NormalBranch {
    TensionLoading,
    TensionDamaged,
    #[default]
    CompressionElastic,
    CompressionEnvelope,
    CompressionUnloading,
    CompressionReloading,
}

/// Mutable per-contact state of the Yopi law. Only `initialize` (through
/// [`YopiHistory::bind`]) resets it; every cycle moves it forward.
///
/// Displacements are positive in closing, forces positive in compression.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct YopiHistory {
    pub dim: Option<Dim>,
    pub dt: f64,
    pub ds: f64,
    pub dc: f64,
    /// Saturating combination of `dt` and `ds`.
    pub d_ts: f64,
    pub dt_hist: f64,
    pub ds_hist: f64,
    pub dc_hist: f64,
    pub un: f64,
    /// Largest compressive displacement reached and the force there.
    pub un_hist_comp: f64,
    pub peak_normal: f64,
    /// Largest opening reached, as a positive number.
    pub un_hist_ten: f64,
    /// Start of the current reloading path.
    pub un_ro: f64,
    pub fm_ro: f64,
    /// Start of the current unloading path.
    pub un_ul: f64,
    pub fm_ul: f64,
    pub reload_flag: bool,
    /// Accumulated plastic slip.
    pub slip: f64,
    pub branch: NormalBranch,
}

impl YopiHistory {
    /// Resets the history unless it already belongs to `dim`.
    pub fn bind(&mut self, dim: Dim) {
        if self.dim != Some(dim) {
            *self = YopiHistory {
                dim: Some(dim),
                ..Default::default()
            };
        }
    }

    pub fn update_dt(&mut self, value: f64) -> f64 {
        self.dt = ratchet(value, &mut self.dt_hist);
        self.update_d_ts();
        self.dt
    }

    pub fn update_ds(&mut self, value: f64) -> f64 {
        self.ds = ratchet(value, &mut self.ds_hist);
        self.update_d_ts();
        self.ds
    }

    pub fn update_dc(&mut self, value: f64) -> f64 {
        self.dc = ratchet(value, &mut self.dc_hist);
        self.dc
    }

    fn update_d_ts(&mut self) {
        let combined = clamp_unit(self.dt + self.ds - self.dt * self.ds);
        self.d_ts = combined.max(self.d_ts);
    }
}
