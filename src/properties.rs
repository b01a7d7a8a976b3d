use crate::error::{JointError, JointResult};
use crate::interfaces::PropertyValue;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{EnumCount, IntoEnumIterator};
use strum_macros::{EnumCount as EnumCountMacro, EnumIter, EnumString, FromRepr, IntoStaticStr};

/// Property table of the Yopi joint. The discriminant is the 1-based ordinal
/// used by reflection and save files, so variants must only ever be appended.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCountMacro, EnumString, FromRepr, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[repr(usize)]
pub enum YopiProperty {
    StiffnessNormal = 1,
    StiffnessShear,
    Tension,
    TensionResidual,
    Cohesion,
    CohesionResidual,
    Friction,
    FrictionResidual,
    Dilation,
    Compression,
    CompressionResidual,
    RatioElastic,
    FractureEnergyTension,
    FractureEnergyShear,
    FractureEnergyCompression,
    TableTension,
    TableShear,
    CapNormal,
    CapShear,
    CapLinear,
    DamageTension,
    DamageShear,
    DamageCompression,
}

impl YopiProperty {
    pub fn from_index(index: usize) -> JointResult<Self> {
        Self::from_repr(index).ok_or(JointError::PropertyIndex {
            index,
            count: Self::COUNT,
        })
    }

    pub fn from_name(name: &str) -> JointResult<Self> {
        Self::from_str(name).map_err(|_| JointError::UnknownProperty(name.to_string()))
    }

    pub const fn index(&self) -> usize {
        *self as usize
    }

    pub fn name(&self) -> &'static str {
        (*self).into()
    }

    pub fn names() -> String {
        Self::iter().map(|p| p.name()).collect::<Vec<_>>().join(",")
    }

    pub const fn is_string(&self) -> bool {
        matches!(self, YopiProperty::TableTension | YopiProperty::TableShear)
    }

    /// Properties that live in the per-contact history instead of the shared
    /// parameter set.
    pub const fn is_history(&self) -> bool {
        matches!(
            self,
            YopiProperty::DamageTension | YopiProperty::DamageShear | YopiProperty::DamageCompression
        )
    }
}

/// Material parameters of the Yopi joint, shared by every contact of a
/// material assignment. Angles are in degrees, stiffnesses per unit area,
/// strengths are stresses and fracture energies are per unit area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YopiParameters {
    pub stiffness_normal: f64,
    pub stiffness_shear: f64,
    pub tension: f64,
    pub tension_residual: f64,
    pub cohesion: f64,
    pub cohesion_residual: f64,
    pub friction: f64,
    pub friction_residual: f64,
    pub dilation: f64,
    pub compression: f64,
    pub compression_residual: f64,
    pub ratio_elastic: f64,
    pub fracture_energy_tension: f64,
    pub fracture_energy_shear: f64,
    pub fracture_energy_compression: f64,
    pub table_tension: String,
    pub table_shear: String,
    pub cap_normal: f64,
    pub cap_shear: f64,
    pub cap_linear: f64,
}

impl Default for YopiParameters {
    fn default() -> Self {
        Self {
            stiffness_normal: 0.0,
            stiffness_shear: 0.0,
            tension: 0.0,
            tension_residual: 0.0,
            cohesion: 0.0,
            cohesion_residual: 0.0,
            friction: 0.0,
            friction_residual: 0.0,
            dilation: 0.0,
            compression: 0.0,
            compression_residual: 0.0,
            ratio_elastic: 2.0,
            fracture_energy_tension: 0.0,
            fracture_energy_shear: 0.0,
            fracture_energy_compression: 0.0,
            table_tension: String::new(),
            table_shear: String::new(),
            cap_normal: 1.0,
            cap_shear: 9.0,
            cap_linear: 0.0,
        }
    }
}

macro_rules! scalar_slots {
    ($($variant:ident => $field:ident),* $(,)?) => {
        impl YopiParameters {
            fn scalar(&self, property: YopiProperty) -> Option<f64> {
                match property {
                    $(YopiProperty::$variant => Some(self.$field),)*
                    _ => None,
                }
            }

            fn scalar_mut(&mut self, property: YopiProperty) -> Option<&mut f64> {
                match property {
                    $(YopiProperty::$variant => Some(&mut self.$field),)*
                    _ => None,
                }
            }
        }
    };
}

scalar_slots!(
    StiffnessNormal => stiffness_normal,
    StiffnessShear => stiffness_shear,
    Tension => tension,
    TensionResidual => tension_residual,
    Cohesion => cohesion,
    CohesionResidual => cohesion_residual,
    Friction => friction,
    FrictionResidual => friction_residual,
    Dilation => dilation,
    Compression => compression,
    CompressionResidual => compression_residual,
    RatioElastic => ratio_elastic,
    FractureEnergyTension => fracture_energy_tension,
    FractureEnergyShear => fracture_energy_shear,
    FractureEnergyCompression => fracture_energy_compression,
    CapNormal => cap_normal,
    CapShear => cap_shear,
    CapLinear => cap_linear,
);

impl YopiParameters {
    fn string_mut(&mut self, property: YopiProperty) -> Option<&mut String> {
        match property {
            YopiProperty::TableTension => Some(&mut self.table_tension),
            YopiProperty::TableShear => Some(&mut self.table_shear),
            _ => None,
        }
    }

    /// Value of a parameter property; `None` for history properties.
    pub fn get(&self, property: YopiProperty) -> Option<PropertyValue> {
        match property {
            YopiProperty::TableTension => Some(PropertyValue::Str(self.table_tension.clone())),
            YopiProperty::TableShear => Some(PropertyValue::Str(self.table_shear.clone())),
            _ => self.scalar(property).map(PropertyValue::Double),
        }
    }

    /// Sets a parameter property. History properties are rejected with
    /// `UnknownProperty` so callers route them to the contact history.
    pub fn set(&mut self, property: YopiProperty, value: PropertyValue) -> JointResult<()> {
        if property.is_string() {
            let slot = self.string_mut(property).ok_or(JointError::PropertyType {
                name: property.name(),
                expected: "string",
            })?;
            *slot = match value {
                PropertyValue::Str(s) => s,
                PropertyValue::Double(_) => {
                    return Err(JointError::PropertyType {
                        name: property.name(),
                        expected: "string",
                    })
                }
            };
            return Ok(());
        }
        let number = value.as_f64().ok_or(JointError::PropertyType {
            name: property.name(),
            expected: "numeric",
        })?;
        let slot = self
            .scalar_mut(property)
            .ok_or_else(|| JointError::UnknownProperty(property.name().to_string()))?;
        *slot = number;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinals_match_name_list() {
        let names = YopiProperty::names();
        for (position, name) in names.split(',').enumerate() {
            let property = YopiProperty::from_name(name).unwrap();
            assert_eq!(property.index(), position + 1);
            assert_eq!(YopiProperty::from_index(position + 1).unwrap(), property);
        }
        assert_eq!(YopiProperty::COUNT, 23);
        assert!(names.starts_with("stiffness_normal,stiffness_shear,tension,"));
        assert!(names.ends_with(",damage_compression"));
    }

    #[test]
    fn test_bad_lookups() {
        assert!(matches!(
            YopiProperty::from_index(0),
            Err(JointError::PropertyIndex { index: 0, count: 23 })
        ));
        assert!(YopiProperty::from_index(24).is_err());
        assert!(matches!(
            YopiProperty::from_name("kn"),
            Err(JointError::UnknownProperty(_))
        ));
    }

    #[test]
    fn test_get_set_roundtrip_by_kind() {
        let mut params = YopiParameters::default();
        params.set(YopiProperty::Friction, 30.0.into()).unwrap();
        params.set(YopiProperty::TableShear, "ds".into()).unwrap();
        assert_eq!(params.friction, 30.0);
        assert_eq!(params.table_shear, "ds");
        assert_eq!(params.get(YopiProperty::Friction), Some(PropertyValue::Double(30.0)));
        assert_eq!(params.get(YopiProperty::TableShear), Some("ds".into()));
        assert_eq!(params.get(YopiProperty::DamageShear), None);
    }

    #[test]
    fn test_type_mismatch_is_rejected() {
        let mut params = YopiParameters::default();
        assert!(matches!(
            params.set(YopiProperty::TableTension, 1.0.into()),
            Err(JointError::PropertyType { expected: "string", .. })
        ));
        assert!(matches!(
            params.set(YopiProperty::Cohesion, "high".into()),
            Err(JointError::PropertyType { expected: "numeric", .. })
        ));
        assert!(matches!(
            params.set(YopiProperty::DamageTension, 0.5.into()),
            Err(JointError::UnknownProperty(_))
        ));
    }
}
