//! Data models for container planning.
//!
//! - `Item`: a rectangular object to be loaded, with dimensions and weight
//! - `ContainerSpec`: the single container type shared by every container of a run
//!
//! Derived quantities such as an item's volume are not stored here; the
//! packing engine computes them once per run.

use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use crate::geometry::Dimensions;

/// Validation error for item or container data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),
    #[error("Invalid weight: {0}")]
    InvalidWeight(String),
}

fn validate_positive(value: f64, name: &str) -> Result<(), String> {
    if value.is_nan() {
        return Err(format!("{} must not be NaN", name));
    }
    if value.is_infinite() {
        return Err(format!("{} must not be infinite", name));
    }
    if value <= 0.0 {
        return Err(format!("{} must be positive, got: {}", name, value));
    }
    Ok(())
}

/// Checks that all three axes are positive and finite.
///
/// `owner` prefixes the axis name in the error message, e.g. "Container length".
pub fn validate_dimensions(dims: &Dimensions, owner: &str) -> Result<(), ValidationError> {
    for (axis, value) in dims.axes() {
        validate_positive(value, &format!("{} {}", owner, axis))
            .map_err(ValidationError::InvalidDimension)?;
    }
    Ok(())
}

/// Checks that the product of the axes is finite; large finite axes can
/// still overflow to infinity.
pub fn validate_volume(dims: &Dimensions, owner: &str) -> Result<(), ValidationError> {
    let volume = dims.volume();
    if !volume.is_finite() {
        return Err(ValidationError::InvalidDimension(format!(
            "{} volume must be finite, got: {}",
            owner, volume
        )));
    }
    Ok(())
}

/// Checks that a weight or weight capacity is positive and finite.
pub fn validate_weight(value: f64, owner: &str) -> Result<(), ValidationError> {
    validate_positive(value, &format!("{} weight", owner)).map_err(ValidationError::InvalidWeight)
}

/// An object to be loaded into a container.
///
/// # Fields
/// * `id` - Caller-supplied identifier, unique within one packing request
/// * `dims` - Length, width and height
/// * `weight` - Weight in kg
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "id": 1, "length": 2.0, "width": 3.0, "height": 4.0, "weight": 10.0 }))]
pub struct Item {
    pub id: usize,
    #[serde(flatten)]
    pub dims: Dimensions,
    pub weight: f64,
}

impl Item {
    /// Creates a new item after validating its dimensions and weight.
    #[allow(dead_code)]
    pub fn new(id: usize, dims: Dimensions, weight: f64) -> Result<Self, ValidationError> {
        let item = Self { id, dims, weight };
        item.validate()?;
        Ok(item)
    }

    /// Re-checks the values of an item that was built without `new`,
    /// e.g. one deserialized from a request.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let owner = format!("Item {}", self.id);
        validate_dimensions(&self.dims, &owner)?;
        validate_volume(&self.dims, &owner)?;
        validate_weight(self.weight, &owner)
    }

    pub fn volume(&self) -> f64 {
        self.dims.volume()
    }
}

/// The container type used for every container of a packing run.
///
/// # Fields
/// * `dims` - Inner length, width and height
/// * `max_weight` - Maximum total weight in kg
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "length": 10.0, "width": 10.0, "height": 10.0, "max_weight": 100.0 }))]
pub struct ContainerSpec {
    #[serde(flatten)]
    pub dims: Dimensions,
    pub max_weight: f64,
}

impl ContainerSpec {
    /// Creates a container spec after validating dimensions and weight capacity.
    ///
    /// The packing engine itself accepts unvalidated specs; a spec with zero
    /// volume simply makes every item unfit.
    #[allow(dead_code)]
    pub fn new(dims: Dimensions, max_weight: f64) -> Result<Self, ValidationError> {
        let spec = Self { dims, max_weight };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_dimensions(&self.dims, "Container")?;
        validate_volume(&self.dims, "Container")?;
        validate_weight(self.max_weight, "Container")
    }

    /// Volume capacity of one container.
    pub fn volume_capacity(&self) -> f64 {
        self.dims.volume()
    }

    /// Checks whether an item fits on every axis, ignoring weight.
    pub fn fits_dimensions(&self, item: &Item) -> bool {
        item.dims.fits_within(&self.dims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_new_accepts_positive_values() {
        let item = Item::new(1, Dimensions::new(2.0, 3.0, 4.0), 10.0).unwrap();
        assert_eq!(item.volume(), 24.0);
    }

    #[test]
    fn item_new_rejects_non_positive_dimension() {
        let err = Item::new(7, Dimensions::new(2.0, 0.0, 4.0), 10.0).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidDimension("Item 7 width must be positive, got: 0".into())
        );
    }

    #[test]
    fn item_new_rejects_bad_weight() {
        assert!(matches!(
            Item::new(1, Dimensions::new(1.0, 1.0, 1.0), -5.0),
            Err(ValidationError::InvalidWeight(_))
        ));
        assert!(matches!(
            Item::new(1, Dimensions::new(1.0, 1.0, 1.0), f64::NAN),
            Err(ValidationError::InvalidWeight(_))
        ));
    }

    #[test]
    fn container_new_rejects_infinite_dimension() {
        let err = ContainerSpec::new(Dimensions::new(f64::INFINITY, 1.0, 1.0), 10.0).unwrap_err();
        assert!(err.to_string().contains("Container length must not be infinite"));
    }

    #[test]
    fn overflowing_volume_is_rejected() {
        let err = Item::new(2, Dimensions::new(1e200, 1e200, 1e200), 1.0).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidDimension("Item 2 volume must be finite, got: inf".into())
        );

        let err = ContainerSpec::new(Dimensions::new(1e200, 1e200, 1e200), 10.0).unwrap_err();
        assert!(err.to_string().contains("Container volume must be finite"));
    }

    #[test]
    fn container_fits_dimensions_ignores_weight() {
        let spec = ContainerSpec::new(Dimensions::new(10.0, 10.0, 10.0), 1.0).unwrap();
        let heavy = Item::new(1, Dimensions::new(10.0, 10.0, 10.0), 500.0).unwrap();
        assert!(spec.fits_dimensions(&heavy));
        assert_eq!(spec.volume_capacity(), 1000.0);
    }

    #[test]
    fn item_deserializes_from_flat_json() {
        let item: Item = serde_json::from_str(
            r#"{"id": 3, "length": 3.0, "width": 3.0, "height": 3.0, "weight": 15.0}"#,
        )
        .unwrap();
        assert_eq!(item.id, 3);
        assert_eq!(item.dims, Dimensions::new(3.0, 3.0, 3.0));
        assert_eq!(item.weight, 15.0);
    }
}
