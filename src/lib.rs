//! Joint (interface) constitutive models for rock and rock-mass contacts.
//!
//! The main law is [`YopiJoint`]: tension with softening, a hysteretic
//! compressive backbone, Coulomb shear with dilation, three ratcheting
//! damage variables and an elliptical compression–shear cap. Every law
//! implements [`ConstitutiveModel`]; [`JointModel`] closes over the laws of
//! this library and [`plugin`] exposes them to a host.

pub mod arena;
pub mod energy;
pub mod error;
pub mod interfaces;
pub mod linear_joint;
pub mod model;
pub mod numerics;
pub mod plugin;
pub mod properties;
pub mod state;
pub mod table;
pub mod yopi;

#[cfg(feature = "python")]
mod python;

pub use arena::{ContactArena, ContactId};
pub use energy::{EnergyKind, JointEnergies};
pub use error::{JointError, JointResult};
pub use interfaces::{ConstitutiveModel, Dim, PropertyValue};
pub use linear_joint::LinearJoint;
pub use model::JointModel;
pub use properties::{YopiParameters, YopiProperty};
pub use state::{ContactFlags, ContactState, HostFeatures};
pub use table::{Table, TableArena, TableHandle, TableLookup};
pub use yopi::{YopiHistory, YopiJoint};
