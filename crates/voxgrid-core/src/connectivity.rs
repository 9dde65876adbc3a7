//! Connected-region labeling of images.

use std::str::FromStr;

use glam::DVec3;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{parse_document, Fields};
use crate::contour::label_scalars;
use crate::dimensionality::{fmt_shape, json_shape};
use crate::engine::{ConnectivityRequest, ConnectivityResult, LabelEngine, REGION_ID};
use crate::error::{Result, VoxgridError};
use crate::grid::fmt_dims;
use crate::image::ImageData;

/// Range of scalar values that belong to a region.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum ScalarRange {
    /// The full data range.
    #[default]
    Auto,
    /// From the smallest value above the data minimum to the maximum.
    Foreground,
    /// `[0.5, f64::MAX]`, the engine's own default.
    VtkDefault,
    /// An inclusive `[min, max]` range.
    Explicit([f64; 2]),
}

impl ScalarRange {
    /// Builds an explicit range, which must be ascending.
    pub fn explicit(min: f64, max: f64) -> Result<Self> {
        check_ascending([min, max])?;
        Ok(Self::Explicit([min, max]))
    }
}

fn check_ascending(range: [f64; 2]) -> Result<()> {
    if range[0] > range[1] {
        return Err(VoxgridError::invalid(format!(
            "Data Range with 2 elements must be sorted in ascending order. Got {range:?}."
        )));
    }
    Ok(())
}

impl FromStr for ScalarRange {
    type Err = VoxgridError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(Self::Auto),
            "foreground" => Ok(Self::Foreground),
            "vtk_default" => Ok(Self::VtkDefault),
            other => Err(VoxgridError::invalid(format!(
                "Invalid `scalar_range` \"{other}\", use \"auto\", \"foreground\", \
                 \"vtk_default\", or a [min, max] range."
            ))),
        }
    }
}

impl TryFrom<&Value> for ScalarRange {
    type Error = VoxgridError;

    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => s.parse(),
            Value::Array(items) => {
                let shape = json_shape(value);
                if shape != [2] {
                    return Err(VoxgridError::invalid(format!(
                        "Data Range has shape {} which is not allowed. Shape must be 2.",
                        fmt_shape(&shape)
                    )));
                }
                let bounds = items
                    .iter()
                    .map(Value::as_f64)
                    .collect::<Option<Vec<f64>>>()
                    .ok_or_else(|| {
                        VoxgridError::type_mismatch(format!(
                            "Data Range must contain numbers. Got {value}."
                        ))
                    })?;
                Self::explicit(bounds[0], bounds[1])
            }
            other => Err(VoxgridError::invalid(format!(
                "Data Range has shape {} which is not allowed. Shape must be 2.",
                fmt_shape(&json_shape(other))
            ))),
        }
    }
}

impl TryFrom<Value> for ScalarRange {
    type Error = VoxgridError;

    fn try_from(value: Value) -> Result<Self> {
        Self::try_from(&value)
    }
}

impl From<ScalarRange> for Value {
    fn from(range: ScalarRange) -> Self {
        match range {
            ScalarRange::Auto => Value::from("auto"),
            ScalarRange::Foreground => Value::from("foreground"),
            ScalarRange::VtkDefault => Value::from("vtk_default"),
            ScalarRange::Explicit(bounds) => Value::from(bounds.to_vec()),
        }
    }
}

/// Which regions are extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    #[default]
    All,
    Largest,
    /// Regions containing one of the point seeds.
    Seeded,
}

impl FromStr for ExtractionMode {
    type Err = VoxgridError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(Self::All),
            "largest" => Ok(Self::Largest),
            "seeded" => Ok(Self::Seeded),
            other => Err(VoxgridError::invalid(format!(
                "Invalid `extraction_mode` \"{other}\", use \"all\", \"largest\", or \"seeded\"."
            ))),
        }
    }
}

/// How extracted regions are labeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelMode {
    /// Labels ordered by decreasing region size, starting at 1.
    #[default]
    Size,
    /// Every region gets `constant_value`.
    Constant,
    /// Labels follow the order of the point seeds.
    Seeds,
}

impl FromStr for LabelMode {
    type Err = VoxgridError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "size" => Ok(Self::Size),
            "constant" => Ok(Self::Constant),
            "seeds" => Ok(Self::Seeds),
            other => Err(VoxgridError::invalid(format!(
                "Invalid `label_mode` \"{other}\", use \"size\", \"constant\", or \"seeds\"."
            ))),
        }
    }
}

/// Options for [`label_connectivity`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityOptions {
    /// Array to label. Defaults to the active scalars.
    pub scalars: Option<String>,
    pub scalar_range: ScalarRange,
    pub extraction_mode: ExtractionMode,
    /// Seed positions in world coordinates.
    pub point_seeds: Option<Vec<DVec3>>,
    pub label_mode: LabelMode,
    pub constant_value: Option<i64>,
}

impl ConnectivityOptions {
    /// Parses options such as `{"scalar_range": "foreground", "extraction_mode": "largest"}`.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_value(&parse_document(json)?)
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let fields = Fields::new(
            "connectivity",
            value,
            &[
                "scalars",
                "scalar_range",
                "extraction_mode",
                "point_seeds",
                "label_mode",
                "constant_value",
            ],
        )?;
        let constant_value = match fields.get("constant_value") {
            None => None,
            Some(v) => Some(v.as_i64().ok_or_else(|| {
                VoxgridError::type_mismatch(format!("`constant_value` must be an integer. Got {v}."))
            })?),
        };
        Ok(Self {
            scalars: fields.string("scalars")?,
            scalar_range: fields.parse::<ScalarRange>("scalar_range")?.unwrap_or_default(),
            extraction_mode: fields
                .string("extraction_mode")?
                .map(|s| s.parse::<ExtractionMode>())
                .transpose()?
                .unwrap_or_default(),
            point_seeds: fields.get("point_seeds").map(parse_seeds).transpose()?,
            label_mode: fields
                .string("label_mode")?
                .map(|s| s.parse::<LabelMode>())
                .transpose()?
                .unwrap_or_default(),
            constant_value,
        })
    }

    /// Checks that every mode has the inputs it needs.
    fn validate(&self) -> Result<()> {
        if self.extraction_mode == ExtractionMode::Seeded && self.point_seeds.is_none() {
            return Err(VoxgridError::invalid(
                "`point_seeds` must be specified when `extraction_mode=\"seeded\"`.",
            ));
        }
        match self.label_mode {
            LabelMode::Seeds if self.point_seeds.is_none() => Err(VoxgridError::invalid(
                "`point_seeds` must be specified when `label_mode=\"seeds\"`.",
            )),
            LabelMode::Constant if self.constant_value.is_none() => Err(VoxgridError::invalid(
                "`constant_value` must be provided when `extraction_mode`is \"constant\".",
            )),
            _ => Ok(()),
        }
    }
}

/// Parses one `[x, y, z]` seed or a list of them.
fn parse_seeds(value: &Value) -> Result<Vec<DVec3>> {
    let shape = json_shape(value);
    let rows: Vec<&Value> = match (shape.as_slice(), value) {
        ([3], _) => vec![value],
        ([_, 3], Value::Array(items)) => items.iter().collect(),
        _ => {
            return Err(VoxgridError::invalid(format!(
                "points has shape {} which is not allowed. Shape must be one of [3, (-1, 3)].",
                fmt_shape(&shape)
            )))
        }
    };
    rows.into_iter()
        .map(|row| {
            let coords = row
                .as_array()
                .filter(|c| c.len() == 3)
                .and_then(|c| c.iter().map(Value::as_f64).collect::<Option<Vec<f64>>>())
                .ok_or_else(|| {
                    VoxgridError::type_mismatch(format!(
                        "Point seeds must be numeric [x, y, z] triples. Got {row}."
                    ))
                })?;
            Ok(DVec3::new(coords[0], coords[1], coords[2]))
        })
        .collect()
}

/// Labels the connected regions of `image` whose scalars fall in the range.
///
/// Returns the labeled image with a [`REGION_ID`] array, the region labels and
/// their sizes, as computed by the engine.
pub fn label_connectivity(
    engine: &dyn LabelEngine,
    image: &ImageData,
    options: &ConnectivityOptions,
) -> Result<ConnectivityResult> {
    options.validate()?;
    let binding = label_scalars(image, options.scalars.as_deref())?;
    if binding.array.n_components() != 1 {
        return Err(VoxgridError::invalid(format!(
            "Scalars '{}' must have a single component. Got {}.",
            binding.name,
            binding.array.n_components()
        )));
    }
    let scalar_range = resolve_range(options.scalar_range, &binding.name, binding.array.to_f64_vec())?;

    let request = ConnectivityRequest {
        image: image.clone(),
        scalars: binding.name.clone(),
        association: binding.association,
        scalar_range,
        extraction_mode: options.extraction_mode,
        point_seeds: options.point_seeds.clone().unwrap_or_default(),
        label_mode: options.label_mode,
        constant_value: options.constant_value,
    };
    log::debug!(
        "labeling {} '{}' in range {scalar_range:?} ({:?}, {:?})",
        request.association,
        request.scalars,
        request.extraction_mode,
        request.label_mode
    );

    let result = engine.label_connectivity(&request)?;
    if result.image.grid() != image.grid() {
        return Err(VoxgridError::invalid(format!(
            "Label engine returned a grid with dimensions {} that does not match the input \
             grid with dimensions {}.",
            fmt_dims(result.image.dimensions()),
            fmt_dims(image.dimensions())
        )));
    }
    if result.image.data().find_in(REGION_ID, binding.association).is_none() {
        return Err(VoxgridError::invalid(format!(
            "Label engine output has no '{REGION_ID}' {} array.",
            binding.association
        )));
    }
    if result.labels.len() != result.sizes.len() {
        return Err(VoxgridError::invalid(format!(
            "Label engine returned {} labels but {} region sizes.",
            result.labels.len(),
            result.sizes.len()
        )));
    }
    log::debug!("labeled {} regions", result.labels.len());
    Ok(result)
}

fn resolve_range(range: ScalarRange, name: &str, values: Vec<f64>) -> Result<[f64; 2]> {
    let finite: Vec<f64> = values.into_iter().filter(|v| !v.is_nan()).collect();
    let no_values = || VoxgridError::MissingData(format!("Scalars '{name}' have no values."));
    match range {
        ScalarRange::Auto => {
            let min = finite.iter().copied().reduce(f64::min).ok_or_else(no_values)?;
            let max = finite.iter().copied().reduce(f64::max).ok_or_else(no_values)?;
            Ok([min, max])
        }
        ScalarRange::Foreground => {
            let min = finite.iter().copied().reduce(f64::min).ok_or_else(no_values)?;
            let max = finite.iter().copied().reduce(f64::max).ok_or_else(no_values)?;
            let above = finite
                .iter()
                .copied()
                .filter(|&v| v > min)
                .reduce(f64::min)
                .ok_or_else(|| {
                    VoxgridError::invalid(format!(
                        "Scalars '{name}' have no foreground values above {min}."
                    ))
                })?;
            Ok([above, max])
        }
        ScalarRange::VtkDefault => Ok([0.5, f64::MAX]),
        ScalarRange::Explicit(bounds) => {
            check_ascending(bounds)?;
            Ok(bounds)
        }
    }
}
