//! Dimensionality masks for re-meshing and padding.
//!
//! A dimensional operation adds or subtracts a per-axis size from the grid
//! dimensions, but only along the axes selected by a mask. The mask is either
//! given explicitly, derived from the axes that are already non-singleton
//! (`preserve`), or chosen so that the result has exactly N non-singleton axes
//! (`"ND"`).
//!
//! Named classes pick, among all masks that yield exactly N non-singleton
//! axes, the one that includes the most axes that are non-singleton before
//! the operation. Remaining ties go to the mask selecting the lowest-indexed
//! axes.

use std::fmt;
use std::str::FromStr;

use glam::UVec3;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, VoxgridError};
use crate::grid::fmt_dims;

const VALID_CLASSES: &str = r#"[0, 1, 2, 3, "0D", "1D", "2D", "3D", "preserve"]"#;
const VALID_MASK_SHAPES: &str = "[(3,), (1, 3), (3, 1)]";

/// Requested dimensionality of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum Dimensionality {
    /// Explicit per-axis participation.
    Mask([bool; 3]),
    /// Only axes that are already non-singleton participate.
    #[default]
    Preserve,
    /// The result must have exactly this many non-singleton axes (0 to 3).
    Class(u8),
}

impl Dimensionality {
    /// Builds a named class from an integer in `0..=3`.
    pub fn class(n: i64) -> Result<Self> {
        match u8::try_from(n) {
            Ok(n) if n <= 3 => Ok(Self::Class(n)),
            _ => Err(invalid_class(&n.to_string())),
        }
    }
}

impl From<[bool; 3]> for Dimensionality {
    fn from(mask: [bool; 3]) -> Self {
        Self::Mask(mask)
    }
}

impl FromStr for Dimensionality {
    type Err = VoxgridError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "preserve" => Ok(Self::Preserve),
            "0D" | "0d" | "0" => Ok(Self::Class(0)),
            "1D" | "1d" | "1" => Ok(Self::Class(1)),
            "2D" | "2d" | "2" => Ok(Self::Class(2)),
            "3D" | "3d" | "3" => Ok(Self::Class(3)),
            other => Err(invalid_class(other)),
        }
    }
}

impl TryFrom<&Value> for Dimensionality {
    type Error = VoxgridError;

    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => s.parse(),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::class(i),
                None => Err(invalid_class(&n.to_string())),
            },
            Value::Array(_) => {
                let shape = json_shape(value);
                let flat: Vec<&Value> = match shape.as_slice() {
                    [3] | [1, 3] | [3, 1] => flatten(value),
                    _ => {
                        return Err(VoxgridError::invalid(format!(
                            "Array has shape {} which is not allowed. Shape must be one of {VALID_MASK_SHAPES}.",
                            fmt_shape(&shape)
                        )))
                    }
                };
                let mut mask = [false; 3];
                for (slot, v) in mask.iter_mut().zip(flat) {
                    *slot = v.as_bool().ok_or_else(|| {
                        VoxgridError::type_mismatch(format!(
                            "Dimensionality mask must contain booleans. Got {v}."
                        ))
                    })?;
                }
                Ok(Self::Mask(mask))
            }
            Value::Bool(_) => Err(VoxgridError::invalid(format!(
                "Array has shape () which is not allowed. Shape must be one of {VALID_MASK_SHAPES}."
            ))),
            other => Err(invalid_class(&other.to_string())),
        }
    }
}

impl TryFrom<Value> for Dimensionality {
    type Error = VoxgridError;

    fn try_from(value: Value) -> Result<Self> {
        Self::try_from(&value)
    }
}

impl From<Dimensionality> for Value {
    fn from(d: Dimensionality) -> Self {
        match d {
            Dimensionality::Mask(mask) => Value::from(mask.to_vec()),
            Dimensionality::Preserve => Value::from("preserve"),
            Dimensionality::Class(n) => Value::from(format!("{n}D")),
        }
    }
}

fn invalid_class(got: &str) -> VoxgridError {
    VoxgridError::invalid(format!(
        "`{got}` is not a valid dimensionality. Use one of {VALID_CLASSES}."
    ))
}

/// Shape of a (rectangular) nested JSON array, following the first element.
pub(crate) fn json_shape(value: &Value) -> Vec<usize> {
    let mut shape = Vec::new();
    let mut current = value;
    while let Value::Array(items) = current {
        shape.push(items.len());
        match items.first() {
            Some(first) => current = first,
            None => break,
        }
    }
    shape
}

pub(crate) fn fmt_shape(shape: &[usize]) -> String {
    match shape {
        [] => "()".to_string(),
        [n] => format!("({n},)"),
        _ => {
            let parts: Vec<String> = shape.iter().map(ToString::to_string).collect();
            format!("({})", parts.join(", "))
        }
    }
}

fn flatten(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().flat_map(flatten).collect(),
        leaf => vec![leaf],
    }
}

/// Direction of a dimensional operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimOp {
    Add,
    Sub,
}

impl DimOp {
    fn apply(self, dim: u32, size: u32) -> i64 {
        match self {
            Self::Add => i64::from(dim) + i64::from(size),
            Self::Sub => i64::from(dim) - i64::from(size),
        }
    }
}

impl fmt::Display for DimOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => f.write_str("add"),
            Self::Sub => f.write_str("sub"),
        }
    }
}

/// Resolved mask and resulting dimensions of a dimensional operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionalOperation {
    pub mask: [bool; 3],
    pub result: UVec3,
}

/// Resolves the mask of a dimensional operation and computes its result.
///
/// Fails when an explicit or preserved mask would produce a dimension below 1,
/// or when no mask yields the requested number of non-singleton axes.
pub fn validate_dimensional_operation(
    dims: UVec3,
    request: &Dimensionality,
    op: DimOp,
    size: [u32; 3],
) -> Result<DimensionalOperation> {
    let mask = match *request {
        Dimensionality::Mask(mask) => mask,
        Dimensionality::Preserve => dims.cmpgt(UVec3::ONE).into(),
        Dimensionality::Class(n) => {
            let mask = best_class_mask(dims, n, op, size).ok_or_else(|| {
                let pattern: Vec<&str> = (0..3)
                    .map(|i| if i < usize::from(n) { ">1" } else { "1" })
                    .collect();
                VoxgridError::invalid(format!(
                    "The operation requires to {op} at least {size:?} dimension(s) to {}. \
                     A {n}D ImageData with dims ({}) cannot be obtained.",
                    fmt_dims(dims),
                    pattern.join(", ")
                ))
            })?;
            log::debug!("dimensionality {n}D on {} resolved to mask {mask:?}", fmt_dims(dims));
            mask
        }
    };

    let result = apply_mask(dims, mask, op, size);
    if result.iter().any(|&d| d < 1) {
        return Err(VoxgridError::invalid(format!(
            "The mask ({}, {}, {}), size {size:?}, and operation {op} would result in {result:?} \
             which contains <= 0 dimensions.",
            mask[0], mask[1], mask[2]
        )));
    }
    let mut dims_out = [0_u32; 3];
    for (out, &d) in dims_out.iter_mut().zip(&result) {
        *out = u32::try_from(d).map_err(|_| {
            VoxgridError::invalid(format!(
                "The mask ({}, {}, {}), size {size:?}, and operation {op} would result in \
                 {result:?} which exceeds the largest supported dimension {}.",
                mask[0],
                mask[1],
                mask[2],
                u32::MAX
            ))
        })?;
    }
    Ok(DimensionalOperation {
        mask,
        result: UVec3::from_array(dims_out),
    })
}

/// Resolves a requested dimensionality into a per-axis mask.
///
/// Named classes are resolved for a unit-size growth of every selected axis.
pub fn resolve_mask(dims: UVec3, request: &Dimensionality) -> Result<[bool; 3]> {
    validate_dimensional_operation(dims, request, DimOp::Add, [1, 1, 1]).map(|op| op.mask)
}

fn apply_mask(dims: UVec3, mask: [bool; 3], op: DimOp, size: [u32; 3]) -> [i64; 3] {
    std::array::from_fn(|i| {
        if mask[i] {
            op.apply(dims[i], size[i])
        } else {
            i64::from(dims[i])
        }
    })
}

fn best_class_mask(dims: UVec3, n: u8, op: DimOp, size: [u32; 3]) -> Option<[bool; 3]> {
    (0..8_u8)
        .map(|bits| [bits & 4 != 0, bits & 2 != 0, bits & 1 != 0])
        .filter(|&mask| {
            let result = apply_mask(dims, mask, op, size);
            result.iter().all(|&d| d >= 1)
                && result.iter().filter(|&&d| d > 1).count() == usize::from(n)
        })
        .max_by_key(|mask| {
            let kept = (0..3).filter(|&i| mask[i] && dims[i] > 1).count();
            (kept, mask[0], mask[1], mask[2])
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: [u32; 3] = [1, 3, 5];

    fn dims(x: u32, y: u32, z: u32) -> UVec3 {
        UVec3::new(x, y, z)
    }

    fn check(image: UVec3, request: Dimensionality, op: DimOp, mask: [bool; 3], result: UVec3) {
        let resolved = validate_dimensional_operation(image, &request, op, SIZE).unwrap();
        assert_eq!(resolved.mask, mask, "mask for {request:?} on {image}");
        assert_eq!(resolved.result, result, "result for {request:?} on {image}");
    }

    fn class(s: &str) -> Dimensionality {
        s.parse().unwrap()
    }

    #[test]
    fn test_explicit_masks() {
        check(dims(1, 1, 1), [true; 3].into(), DimOp::Add, [true; 3], dims(2, 4, 6));
        check(dims(1, 1, 1), [false; 3].into(), DimOp::Add, [false; 3], dims(1, 1, 1));
        check(
            dims(1, 1, 1),
            [true, false, true].into(),
            DimOp::Add,
            [true, false, true],
            dims(2, 1, 6),
        );
    }

    #[test]
    fn test_preserve() {
        check(dims(1, 1, 1), Dimensionality::Preserve, DimOp::Add, [false; 3], dims(1, 1, 1));
        check(
            dims(1, 4, 7),
            Dimensionality::Preserve,
            DimOp::Sub,
            [false, true, true],
            dims(1, 1, 2),
        );
    }

    #[test]
    fn test_named_classes_add() {
        check(dims(1, 1, 1), class("0D"), DimOp::Add, [false; 3], dims(1, 1, 1));
        check(dims(1, 1, 1), class("1D"), DimOp::Add, [true, false, false], dims(2, 1, 1));
        check(dims(1, 1, 2), class("1D"), DimOp::Add, [false, false, true], dims(1, 1, 7));
        check(dims(1, 1, 1), class("2D"), DimOp::Add, [true, true, false], dims(2, 4, 1));
        check(dims(1, 1, 2), class("2D"), DimOp::Add, [true, false, true], dims(2, 1, 7));
        check(dims(1, 2, 2), class("2D"), DimOp::Add, [false, true, true], dims(1, 5, 7));
        check(dims(1, 1, 1), class("3D"), DimOp::Add, [true; 3], dims(2, 4, 6));
    }

    #[test]
    fn test_named_classes_sub() {
        check(dims(10, 10, 10), class("3D"), DimOp::Sub, [true; 3], dims(9, 7, 5));
        let unit = validate_dimensional_operation(dims(2, 2, 2), &class("0D"), DimOp::Sub, [1; 3])
            .unwrap();
        assert_eq!(unit.result, UVec3::ONE);
        let keep = validate_dimensional_operation(dims(1, 2, 2), &class("2D"), DimOp::Sub, [1; 3])
            .unwrap();
        assert_eq!(keep.mask, [false; 3]);
    }

    #[test]
    fn test_integer_classes_match_named() {
        for n in 0..=3 {
            assert_eq!(Dimensionality::class(n).unwrap(), class(&format!("{n}D")));
        }
        assert!(Dimensionality::class(4).is_err());
        assert!(Dimensionality::class(-1).is_err());
    }

    #[test]
    fn test_resolve_mask_unit_growth() {
        assert_eq!(resolve_mask(dims(1, 1, 1), &class("1D")).unwrap(), [true, false, false]);
        assert_eq!(resolve_mask(dims(1, 1, 1), &class("2D")).unwrap(), [true, true, false]);
        assert_eq!(resolve_mask(dims(4, 1, 3), &Dimensionality::Preserve).unwrap(), [true, false, true]);
        assert!(resolve_mask(dims(3, 3, 1), &class("1D")).is_err());
    }

    #[test]
    fn test_invalid_class_message() {
        let err = "invalid".parse::<Dimensionality>().unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"`invalid` is not a valid dimensionality. Use one of [0, 1, 2, 3, "0D", "1D", "2D", "3D", "preserve"]."#
        );
    }

    #[test]
    fn test_invalid_mask_shapes() {
        let err = Dimensionality::try_from(&serde_json::json!([true, true, true, true])).unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Array has shape (4,) which is not allowed."));

        let err = Dimensionality::try_from(&serde_json::json!(true)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Array has shape () which is not allowed. Shape must be one of [(3,), (1, 3), (3, 1)]."
        );
    }

    #[test]
    fn test_nested_masks_accepted() {
        let row = Dimensionality::try_from(&serde_json::json!([[true, false, true]])).unwrap();
        let col = Dimensionality::try_from(&serde_json::json!([[true], [false], [true]])).unwrap();
        assert_eq!(row, Dimensionality::Mask([true, false, true]));
        assert_eq!(col, row);
        assert_eq!(
            Dimensionality::try_from(&serde_json::json!(2)).unwrap(),
            Dimensionality::Class(2)
        );
    }

    #[test]
    fn test_unreachable_class_message() {
        let err = validate_dimensional_operation(dims(2, 2, 2), &class("1D"), DimOp::Add, SIZE)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "The operation requires to add at least [1, 3, 5] dimension(s) to (2, 2, 2). \
             A 1D ImageData with dims (>1, 1, 1) cannot be obtained."
        );

        let err = validate_dimensional_operation(dims(2, 1, 2), &class("3D"), DimOp::Sub, SIZE)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "The operation requires to sub at least [1, 3, 5] dimension(s) to (2, 1, 2). \
             A 3D ImageData with dims (>1, >1, >1) cannot be obtained."
        );
    }

    #[test]
    fn test_mask_below_one_message() {
        let err = validate_dimensional_operation(
            dims(1, 2, 5),
            &[true, false, true].into(),
            DimOp::Sub,
            SIZE,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "The mask (true, false, true), size [1, 3, 5], and operation sub would result in \
             [0, 2, 0] which contains <= 0 dimensions."
        );
    }

    #[test]
    fn test_result_above_u32_rejected() {
        let err = validate_dimensional_operation(
            dims(u32::MAX, 1, 1),
            &[true, false, false].into(),
            DimOp::Add,
            [1, 1, 1],
        )
        .unwrap_err();
        assert!(matches!(err, VoxgridError::InvalidArgument(_)));
        assert!(err
            .to_string()
            .ends_with("which exceeds the largest supported dimension 4294967295."));
    }

    proptest::proptest! {
        #[test]
        fn prop_named_class_has_exact_rank(x in 1_u32..5, y in 1_u32..5, z in 1_u32..5, n in 0_u8..4) {
            let image = dims(x, y, z);
            if let Ok(op) = validate_dimensional_operation(image, &Dimensionality::Class(n), DimOp::Add, [1; 3]) {
                let rank = op.result.to_array().iter().filter(|&&d| d > 1).count();
                proptest::prop_assert_eq!(rank, usize::from(n));
            }
        }

        #[test]
        fn prop_preserve_keeps_rank(x in 1_u32..6, y in 1_u32..6, z in 1_u32..6) {
            let image = dims(x, y, z);
            let op = validate_dimensional_operation(image, &Dimensionality::Preserve, DimOp::Add, [1; 3]).unwrap();
            let rank = |d: UVec3| d.to_array().iter().filter(|&&v| v > 1).count();
            proptest::prop_assert_eq!(rank(op.result), rank(image));
        }
    }

    #[test]
    fn test_serde_round_trip() {
        let json = serde_json::to_string(&Dimensionality::Class(2)).unwrap();
        assert_eq!(json, r#""2D""#);
        let back: Dimensionality = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Dimensionality::Class(2));
    }
}
