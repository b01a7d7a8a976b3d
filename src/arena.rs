//! Many Yopi contacts sharing one parameter set, each with its own history,
//! addressed by [`ContactId`].

use crate::energy::JointEnergies;
use crate::error::{JointError, JointResult};
use crate::interfaces::Dim;
use crate::properties::YopiParameters;
use crate::state::ContactState;
use crate::yopi::{self, YopiDerived, YopiHistory};
use rayon::prelude::*;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContactId(usize);

impl ContactId {
    pub const fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Default)]
struct Contact {
    history: YopiHistory,
    energies: Option<JointEnergies>,
}

#[derive(Debug, Clone)]
pub struct ContactArena {
    params: Arc<YopiParameters>,
    derived: Option<YopiDerived>,
    contacts: Vec<Contact>,
    track_energy: bool,
}

impl ContactArena {
    pub fn new(params: YopiParameters) -> Self {
        Self::from_shared(Arc::new(params))
    }

    pub fn from_shared(params: Arc<YopiParameters>) -> Self {
        Self {
            params,
            derived: None,
            contacts: Vec::new(),
            track_energy: false,
        }
    }

    pub fn parameters(&self) -> &Arc<YopiParameters> {
        &self.params
    }

    /// Mutable parameters for every contact; constants are re-derived on
    /// the next run, histories are kept.
    pub fn parameters_mut(&mut self) -> &mut YopiParameters {
        self.derived = None;
        Arc::make_mut(&mut self.params)
    }

    pub fn add_contact(&mut self) -> ContactId {
        let energies = self.track_energy.then(JointEnergies::default);
        self.contacts.push(Contact {
            history: YopiHistory::default(),
            energies,
        });
        ContactId(self.contacts.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = ContactId> {
        (0..self.contacts.len()).map(ContactId)
    }

    pub fn history(&self, id: ContactId) -> Option<&YopiHistory> {
        self.contacts.get(id.0).map(|c| &c.history)
    }

    pub fn energies(&self, id: ContactId) -> Option<&JointEnergies> {
        self.contacts.get(id.0).and_then(|c| c.energies.as_ref())
    }

    pub fn activate_energy(&mut self) {
        self.track_energy = true;
        for contact in &mut self.contacts {
            contact.energies.get_or_insert_with(JointEnergies::default);
        }
    }

    pub fn is_valid(&self, dim: Dim) -> bool {
        self.derived.as_ref().is_some_and(|d| d.dim == dim)
    }

    pub fn initialize(&mut self, dim: Dim, state: &ContactState) -> JointResult<()> {
        self.derived = None;
        self.derived = Some(YopiDerived::new(&self.params, dim, state)?);
        Ok(())
    }

    pub fn run(&mut self, dim: Dim, id: ContactId, state: &mut ContactState) -> JointResult<()> {
        if !self.is_valid(dim) {
            self.initialize(dim, state)?;
        }
        let derived = self.derived.as_ref().ok_or_else(not_initialized)?;
        let contact = self
            .contacts
            .get_mut(id.0)
            .ok_or(JointError::UnknownContact(id.0))?;
        yopi::run_cycle(
            &self.params,
            derived,
            &mut contact.history,
            &mut contact.energies,
            state,
        )
    }

    /// Runs every contact once, `states[i]` belonging to the i-th contact.
    /// Contacts are independent, so they run in parallel.
    pub fn run_all(&mut self, dim: Dim, states: &mut [ContactState]) -> JointResult<()> {
        if states.len() != self.contacts.len() {
            return Err(JointError::ContactCount {
                expected: self.contacts.len(),
                found: states.len(),
            });
        }
        let Some(first) = states.first() else {
            return Ok(());
        };
        if !self.is_valid(dim) {
            self.initialize(dim, first)?;
        }
        let params = &self.params;
        let derived = self.derived.as_ref().ok_or_else(not_initialized)?;
        let result = self
            .contacts
            .par_iter_mut()
            .zip(states.par_iter_mut())
            .try_for_each(|(contact, state)| {
                yopi::run_cycle(
                    params,
                    derived,
                    &mut contact.history,
                    &mut contact.energies,
                    state,
                )
            });
        tracing::trace!(contacts = self.contacts.len(), ok = result.is_ok(), "batch cycle");
        result
    }
}

fn not_initialized() -> JointError {
    JointError::configuration(yopi::MODEL_NAME, "contact arena has not been initialized")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::ConstitutiveModel;
    use crate::yopi::YopiJoint;
    use nalgebra::Vector2;

    fn params() -> YopiParameters {
        YopiParameters {
            stiffness_normal: 1.0e10,
            stiffness_shear: 5.0e9,
            tension: 1.0e5,
            fracture_energy_tension: 50.0,
            cohesion: 1.0e6,
            friction: 30.0,
            dilation: 5.0,
            fracture_energy_shear: 500.0,
            compression: 1.0e7,
            fracture_energy_compression: 1.0e4,
            ..Default::default()
        }
    }

    fn increments(i: usize, step: usize) -> (f64, Vector2<f64>) {
        let phase = (i + 1) as f64 * (step as f64 * 0.3).sin();
        (2.0e-4 * phase, Vector2::new(1.0e-4 * phase.cos(), 5.0e-5 * phase))
    }

    #[test]
    fn test_parallel_batch_matches_single_joints() {
        let mut arena = ContactArena::new(params());
        let mut joints: Vec<YopiJoint> = Vec::new();
        for _ in 0..8 {
            arena.add_contact();
            joints.push(YopiJoint::new(params()));
        }
        let mut states = vec![ContactState::new(1.0); 8];
        let mut single = states.clone();
        for step in 0..25 {
            for i in 0..8 {
                let (n, s) = increments(i, step);
                states[i].set_increments(n, s);
                single[i].set_increments(n, s);
                joints[i].run(Dim::Three, &mut single[i]).unwrap();
            }
            arena.run_all(Dim::Three, &mut states).unwrap();
        }
        for (i, id) in arena.ids().enumerate() {
            assert_eq!(arena.history(id), Some(joints[i].history()));
            assert_eq!(states[i].normal_force, single[i].normal_force);
            assert_eq!(states[i].shear_force, single[i].shear_force);
        }
    }

    #[test]
    fn test_bad_ids_and_counts() {
        let mut arena = ContactArena::new(params());
        let id = arena.add_contact();
        assert_eq!(id.index(), 0);
        let mut state = ContactState::new(1.0);
        assert!(matches!(
            arena.run(Dim::Two, ContactId(3), &mut state),
            Err(JointError::UnknownContact(3))
        ));
        let mut states = vec![ContactState::new(1.0); 2];
        assert!(matches!(
            arena.run_all(Dim::Two, &mut states),
            Err(JointError::ContactCount { expected: 1, found: 2 })
        ));
    }

    #[test]
    fn test_energy_for_existing_and_new_contacts() {
        let mut arena = ContactArena::new(params());
        let first = arena.add_contact();
        assert!(arena.energies(first).is_none());
        arena.activate_energy();
        let second = arena.add_contact();
        let mut state = ContactState::new(1.0);
        state.set_increments(1.0e-5, Vector2::zeros());
        arena.run(Dim::Three, second, &mut state).unwrap();
        assert!(arena.energies(first).is_some());
        assert!(arena.energies(second).unwrap().compression > 0.0);
    }

    #[test]
    fn test_parameter_change_keeps_histories() {
        let mut arena = ContactArena::new(params());
        let id = arena.add_contact();
        let mut state = ContactState::new(1.0);
        state.set_increments(2.0e-3, Vector2::zeros());
        arena.run(Dim::Three, id, &mut state).unwrap();
        let dc = arena.history(id).map(|h| h.dc).unwrap_or_default();
        assert!(dc > 0.0);
        arena.parameters_mut().cohesion = 2.0e6;
        assert!(!arena.is_valid(Dim::Three));
        state.set_increments(0.0, Vector2::zeros());
        arena.run(Dim::Three, id, &mut state).unwrap();
        assert_eq!(arena.history(id).map(|h| h.dc), Some(dc));
    }
}
