//! Entry points a host uses to discover and instantiate the joint laws of
//! this library, and the library file naming convention it loads them by.

use crate::error::{JointError, JointResult};
use crate::linear_joint::{self, LinearJoint};
use crate::model::JointModel;
use crate::yopi::{self, YopiJoint};
use std::path::Path;

/// File stem prefix shared by all joint model libraries.
pub const LIBRARY_PREFIX: &str = "jmodel";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelInfo {
    pub name: &'static str,
    pub full_name: &'static str,
    pub major_version: u32,
    pub minor_version: u32,
}

pub const REGISTERED_MODELS: [ModelInfo; 2] = [
    ModelInfo {
        name: yopi::MODEL_NAME,
        full_name: yopi::FULL_NAME,
        major_version: yopi::MAJOR_VERSION,
        minor_version: yopi::MINOR_VERSION,
    },
    ModelInfo {
        name: linear_joint::MODEL_NAME,
        full_name: linear_joint::FULL_NAME,
        major_version: linear_joint::MAJOR_VERSION,
        minor_version: linear_joint::MINOR_VERSION,
    },
];

pub fn get_name() -> &'static str {
    yopi::MODEL_NAME
}

pub fn get_major_version() -> u32 {
    yopi::MAJOR_VERSION
}

pub fn get_minor_version() -> u32 {
    yopi::MINOR_VERSION
}

pub fn model_info(name: &str) -> JointResult<ModelInfo> {
    REGISTERED_MODELS
        .iter()
        .find(|info| info.name == name)
        .copied()
        .ok_or_else(|| JointError::UnknownModel(name.to_string()))
}

pub fn create_instance(name: &str) -> JointResult<JointModel> {
    match name {
        yopi::MODEL_NAME => Ok(YopiJoint::default().into()),
        linear_joint::MODEL_NAME => Ok(LinearJoint::default().into()),
        _ => Err(JointError::UnknownModel(name.to_string())),
    }
}

/// Platform-independent file stem, e.g. `jmodelyopi001`.
pub fn library_file_name(name: &str, major: u32) -> String {
    format!("{LIBRARY_PREFIX}{name}{major:03}")
}

/// Checks that a library path encodes the declared model name and major
/// version. A platform `lib` prefix and any extension are ignored.
pub fn check_library_name(path: impl AsRef<Path>, name: &str, major: u32) -> JointResult<()> {
    let path = path.as_ref();
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    let stem = stem
        .strip_prefix("lib")
        .filter(|rest| rest.starts_with(LIBRARY_PREFIX))
        .unwrap_or(stem);
    if stem.eq_ignore_ascii_case(&library_file_name(name, major)) {
        Ok(())
    } else {
        Err(JointError::LibraryName {
            found: path.display().to_string(),
            name: name.to_string(),
            major,
        })
    }
}
