//! Padding of point data along the edges of an image.
//!
//! Padding grows the selected axes by a number of samples before and after
//! the existing lattice. New samples are filled with a constant, a mirror
//! reflection of the edge, or a periodic wrap. The origin moves back by the
//! number of samples added before, so existing samples keep their position.

use std::fmt;
use std::str::FromStr;

use bytemuck::Zeroable;
use glam::UVec3;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::array::{with_values, ArrayValues, DType, DataArray, Element};
use crate::config::{parse_document, Fields};
use crate::data::{ArrayBinding, Association, DataStore};
use crate::dimensionality::{json_shape, validate_dimensional_operation, DimOp, Dimensionality};
use crate::error::{Result, VoxgridError};
use crate::grid::fmt_dims;
use crate::image::{check_length, ImageData};

/// Number of samples added along each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum PadSize {
    /// The same pad on every side.
    Scalar(u32),
    /// `(before, after)` on a single padded axis, otherwise `(x, y)` on both sides.
    Pair([u32; 2]),
    /// Symmetric `(x, y, z)` pads.
    PerAxis([u32; 3]),
    /// `(x_before, x_after, y_before, y_after, z_before, z_after)`.
    PerSide([u32; 6]),
}

impl Default for PadSize {
    fn default() -> Self {
        Self::Scalar(1)
    }
}

impl From<u32> for PadSize {
    fn from(size: u32) -> Self {
        Self::Scalar(size)
    }
}

impl PadSize {
    /// Builds a pad size from 1, 2, 3, 4 or 6 non-negative values.
    ///
    /// Four values pad `(x_before, x_after, y_before, y_after)` and leave z
    /// unpadded.
    pub fn from_values(values: &[i64]) -> Result<Self> {
        if let Some(&negative) = values.iter().find(|&&v| v < 0) {
            return Err(VoxgridError::invalid(format!(
                "Pad size cannot be negative. Got {negative}."
            )));
        }
        let sizes = values
            .iter()
            .map(|&v| {
                u32::try_from(v)
                    .map_err(|_| VoxgridError::invalid(format!("Pad size {v} is too large.")))
            })
            .collect::<Result<Vec<u32>>>()?;
        match *sizes.as_slice() {
            [n] => Ok(Self::Scalar(n)),
            [a, b] => Ok(Self::Pair([a, b])),
            [x, y, z] => Ok(Self::PerAxis([x, y, z])),
            [a, b, c, d] => Ok(Self::PerSide([a, b, c, d, 0, 0])),
            [a, b, c, d, e, f] => Ok(Self::PerSide([a, b, c, d, e, f])),
            _ => Err(VoxgridError::invalid(format!(
                "Pad size must have 1, 2, 3, 4, or 6 values, got {} instead.",
                sizes.len()
            ))),
        }
    }

    /// Per-side pads, reading a pair as symmetric `(x, y)`.
    fn sides(self) -> [u32; 6] {
        match self {
            Self::Scalar(n) => [n; 6],
            Self::Pair([x, y]) => [x, x, y, y, 0, 0],
            Self::PerAxis([x, y, z]) => [x, x, y, y, z, z],
            Self::PerSide(sides) => sides,
        }
    }

    /// Per-axis totals used to resolve a named dimensionality.
    fn totals(self, request: &Dimensionality) -> [u32; 3] {
        match (self, request) {
            (Self::Pair([a, b]), Dimensionality::Class(1)) => [a.saturating_add(b); 3],
            _ => {
                let s = self.sides();
                std::array::from_fn(|i| s[2 * i].saturating_add(s[2 * i + 1]))
            }
        }
    }
}

impl TryFrom<&Value> for PadSize {
    type Error = VoxgridError;

    fn try_from(value: &Value) -> Result<Self> {
        let items: Vec<&Value> = match value {
            Value::Array(items) => {
                let shape = json_shape(value);
                if shape.len() > 1 {
                    return Err(VoxgridError::invalid(format!(
                        "Pad size must be one dimensional. Got {} dimensions.",
                        shape.len()
                    )));
                }
                items.iter().collect()
            }
            scalar => vec![scalar],
        };
        let values = items
            .into_iter()
            .map(|v| {
                v.as_i64().ok_or_else(|| {
                    VoxgridError::type_mismatch(format!(
                        "Pad size must be integers. Got dtype {}.",
                        json_dtype(v)
                    ))
                })
            })
            .collect::<Result<Vec<i64>>>()?;
        Self::from_values(&values)
    }
}

impl TryFrom<Value> for PadSize {
    type Error = VoxgridError;

    fn try_from(value: Value) -> Result<Self> {
        Self::try_from(&value)
    }
}

impl From<PadSize> for Value {
    fn from(size: PadSize) -> Self {
        match size {
            PadSize::Scalar(n) => Value::from(n),
            PadSize::Pair(v) => Value::from(v.to_vec()),
            PadSize::PerAxis(v) => Value::from(v.to_vec()),
            PadSize::PerSide(v) => Value::from(v.to_vec()),
        }
    }
}

fn json_dtype(value: &Value) -> &'static str {
    match value {
        Value::Number(n) if n.is_f64() => "float64",
        Value::Number(_) => "uint64",
        Value::String(_) => "str",
        Value::Bool(_) => "bool",
        Value::Null | Value::Array(_) | Value::Object(_) => "object",
    }
}

/// How new samples are filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum PadValue {
    /// A fixed tuple. A single value is used for every component.
    Constant(Vec<f64>),
    /// Reflect about the edge, repeating the edge sample.
    Mirror,
    /// Repeat the image periodically.
    Wrap,
}

impl Default for PadValue {
    fn default() -> Self {
        Self::Constant(vec![0.0])
    }
}

impl From<f64> for PadValue {
    fn from(value: f64) -> Self {
        Self::Constant(vec![value])
    }
}

impl FromStr for PadValue {
    type Err = VoxgridError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mirror" => Ok(Self::Mirror),
            "wrap" => Ok(Self::Wrap),
            other => Err(invalid_pad_value(other)),
        }
    }
}

impl TryFrom<&Value> for PadValue {
    type Error = VoxgridError;

    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => s.parse(),
            Value::Number(n) => n
                .as_f64()
                .map(|v| Self::Constant(vec![v]))
                .ok_or_else(|| invalid_pad_value(&n.to_string())),
            Value::Array(items) if !items.is_empty() => items
                .iter()
                .map(Value::as_f64)
                .collect::<Option<Vec<f64>>>()
                .map(Self::Constant)
                .ok_or_else(|| invalid_pad_value(&value.to_string())),
            other => Err(invalid_pad_value(&other.to_string())),
        }
    }
}

impl TryFrom<Value> for PadValue {
    type Error = VoxgridError;

    fn try_from(value: Value) -> Result<Self> {
        Self::try_from(&value)
    }
}

impl From<PadValue> for Value {
    fn from(value: PadValue) -> Self {
        match value {
            PadValue::Constant(v) if v.len() == 1 => Value::from(v[0]),
            PadValue::Constant(v) => Value::from(v),
            PadValue::Mirror => Value::from("mirror"),
            PadValue::Wrap => Value::from("wrap"),
        }
    }
}

impl fmt::Display for PadValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(v) if v.len() == 1 => f.write_str(&fmt_number(v[0])),
            Self::Constant(v) => {
                let parts: Vec<String> = v.iter().map(|&x| fmt_number(x)).collect();
                write!(f, "({})", parts.join(", "))
            }
            Self::Mirror => f.write_str("mirror"),
            Self::Wrap => f.write_str("wrap"),
        }
    }
}

fn invalid_pad_value(got: &str) -> VoxgridError {
    VoxgridError::invalid(format!(
        "Invalid pad value {got}. Must be 'mirror' or 'wrap', or a number/component vector \
         for constant padding."
    ))
}

fn fmt_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

/// Options for [`ImageData::pad_image`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PadOptions {
    pub pad_value: PadValue,
    pub pad_size: PadSize,
    pub dimensionality: Dimensionality,

    /// Array to pad. Defaults to the active point scalars.
    pub scalars: Option<String>,

    /// Pad every point array instead of only the selected scalars.
    pub pad_all_scalars: bool,
}

impl Default for PadOptions {
    fn default() -> Self {
        Self {
            pad_value: PadValue::default(),
            pad_size: PadSize::default(),
            dimensionality: Dimensionality::Preserve,
            scalars: None,
            pad_all_scalars: false,
        }
    }
}

impl PadOptions {
    #[must_use]
    pub fn with_value(mut self, value: impl Into<PadValue>) -> Self {
        self.pad_value = value.into();
        self
    }

    #[must_use]
    pub fn with_size(mut self, size: impl Into<PadSize>) -> Self {
        self.pad_size = size.into();
        self
    }

    #[must_use]
    pub fn with_dimensionality(mut self, dimensionality: impl Into<Dimensionality>) -> Self {
        self.dimensionality = dimensionality.into();
        self
    }

    #[must_use]
    pub fn with_scalars(mut self, name: impl Into<String>) -> Self {
        self.scalars = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_all_scalars(mut self, pad_all_scalars: bool) -> Self {
        self.pad_all_scalars = pad_all_scalars;
        self
    }

    /// Parses options such as `{"pad_size": [1, 2], "pad_value": "wrap"}`.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_value(&parse_document(json)?)
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let fields = Fields::new(
            "pad",
            value,
            &["pad_value", "pad_size", "dimensionality", "scalars", "pad_all_scalars"],
        )?;
        let defaults = Self::default();
        Ok(Self {
            pad_value: fields.parse("pad_value")?.unwrap_or(defaults.pad_value),
            pad_size: fields.parse("pad_size")?.unwrap_or(defaults.pad_size),
            dimensionality: fields
                .parse("dimensionality")?
                .unwrap_or(defaults.dimensionality),
            scalars: fields.string("scalars")?,
            pad_all_scalars: fields
                .bool("pad_all_scalars")?
                .unwrap_or(defaults.pad_all_scalars),
        })
    }
}

/// Resolved per-axis padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PadPlan {
    before: [u32; 3],
    after: [u32; 3],
    result: UVec3,
}

fn plan_padding(dims: UVec3, size: PadSize, request: &Dimensionality) -> Result<PadPlan> {
    let resolved =
        validate_dimensional_operation(dims, request, DimOp::Add, size.totals(request))?;
    let mask = resolved.mask;

    let single_axis = match mask {
        [true, false, false] => Some(0),
        [false, true, false] => Some(1),
        [false, false, true] => Some(2),
        _ => None,
    };
    let sides = match (size, single_axis) {
        (PadSize::Pair([before, after]), Some(axis)) => {
            let mut sides = [0; 6];
            sides[2 * axis] = before;
            sides[2 * axis + 1] = after;
            sides
        }
        _ => size.sides(),
    };

    let mut before = [0; 3];
    let mut after = [0; 3];
    let mut result = [0; 3];
    for axis in 0..3 {
        if mask[axis] {
            before[axis] = sides[2 * axis];
            after[axis] = sides[2 * axis + 1];
        }
        result[axis] = dims[axis]
            .checked_add(before[axis])
            .and_then(|d| d.checked_add(after[axis]))
            .ok_or_else(|| {
                VoxgridError::invalid(format!(
                    "Padding {} by {sides:?} overflows the grid dimensions.",
                    fmt_dims(dims)
                ))
            })?;
    }
    Ok(PadPlan {
        before,
        after,
        result: UVec3::from_array(result),
    })
}

/// Typed fill rule for one array.
enum Fill<T> {
    Constant(Vec<T>),
    Mirror,
    Wrap,
}

impl ImageData {
    /// Pads point data along the edges of the image.
    ///
    /// Every input is validated before any output is built. Cell arrays are
    /// kept only when padding leaves the dimensions unchanged.
    pub fn pad_image(&self, options: &PadOptions) -> Result<ImageData> {
        let dims = self.dimensions();
        let selected = select_scalars(self, options.scalars.as_deref())?;
        let plan = plan_padding(dims, options.pad_size, &options.dimensionality)?;

        let targets: Vec<&ArrayBinding> = if options.pad_all_scalars {
            self.data().iter_in(Association::Point).collect()
        } else {
            vec![selected]
        };
        for binding in &targets {
            check_length(&binding.name, Association::Point, &binding.array, self.n_points())?;
            check_pad_value(binding, &options.pad_value, options.pad_all_scalars)?;
        }

        let before = UVec3::from_array(plan.before);
        let grid = self
            .grid()
            .with_dimensions(plan.result)?
            .shifted(-before.as_dvec3());

        let mut data = DataStore::new();
        for binding in &targets {
            let padded = pad_array(&binding.array, dims, &plan, &options.pad_value)?;
            data.insert(binding.name.clone(), Association::Point, padded);
        }

        let cells: Vec<&ArrayBinding> = self.data().iter_in(Association::Cell).collect();
        if plan.result == dims {
            for binding in cells {
                data.insert(binding.name.clone(), Association::Cell, binding.array.clone());
            }
        } else if !cells.is_empty() {
            let names: Vec<&str> = cells.iter().map(|b| b.name.as_str()).collect();
            log::warn!("padding to {} drops cell arrays {names:?}", fmt_dims(plan.result));
        }
        if !options.pad_all_scalars {
            let skipped: Vec<&str> = self
                .data()
                .iter_in(Association::Point)
                .filter(|b| b.name != selected.name)
                .map(|b| b.name.as_str())
                .collect();
            if !skipped.is_empty() {
                log::warn!("padding only '{}' drops point arrays {skipped:?}", selected.name);
            }
        }
        data.set_active_scalars_unchecked(Some(selected.name.clone()));

        log::debug!(
            "padded {} -> {} (before {:?}, after {:?})",
            fmt_dims(dims),
            fmt_dims(plan.result),
            plan.before,
            plan.after
        );
        ImageData::from_parts(grid, data)
    }
}

fn select_scalars<'a>(image: &'a ImageData, name: Option<&str>) -> Result<&'a ArrayBinding> {
    if let Some(name) = name {
        return image.scalars_on(name, Association::Point);
    }
    image
        .data()
        .active_scalars()
        .filter(|b| b.association == Association::Point)
        .or_else(|| image.data().iter_in(Association::Point).next())
        .ok_or_else(|| VoxgridError::MissingData("No data available".to_string()))
}

fn check_pad_value(binding: &ArrayBinding, value: &PadValue, pad_all: bool) -> Result<()> {
    let PadValue::Constant(tuple) = value else {
        return Ok(());
    };
    let n_components = binding.array.n_components();
    if tuple.len() != 1 && tuple.len() != n_components {
        let name = &binding.name;
        return Err(VoxgridError::invalid(if pad_all {
            format!(
                "Cannot pad array '{name}' with value {value}. Number of components \
                 ({n_components}) in '{name}' must match the number of components ({}) in \
                 value.\nTry setting `pad_all_scalars=false` or update the array.",
                tuple.len()
            )
        } else {
            format!(
                "Number of components ({}) in pad value {value} must match the number \
                 components ({n_components}) in array '{name}'.",
                tuple.len()
            )
        }));
    }
    let dtype = binding.array.dtype();
    if !tuple.iter().all(|&v| representable(dtype, v)) {
        let value_dtype = if tuple.iter().all(|&v| i64::from_f64(v).is_some()) {
            "int64"
        } else {
            "float64"
        };
        return Err(VoxgridError::type_mismatch(format!(
            "Pad value {value} with dtype '{value_dtype}' is not compatible with dtype \
             '{dtype}' of array '{}'.",
            binding.name
        )));
    }
    Ok(())
}

fn representable(dtype: DType, value: f64) -> bool {
    match dtype {
        DType::UInt8 => u8::from_f64(value).is_some(),
        DType::Int32 => i32::from_f64(value).is_some(),
        DType::Int64 => i64::from_f64(value).is_some(),
        DType::Float32 => f32::from_f64(value).is_some(),
        DType::Float64 => f64::from_f64(value).is_some(),
    }
}

fn pad_array(array: &DataArray, dims: UVec3, plan: &PadPlan, value: &PadValue) -> Result<DataArray> {
    let n_components = array.n_components();
    let values = with_values!(array.values(), v => {
        let fill = typed_fill(value, n_components);
        pad_values(&v[..], n_components, dims, plan, &fill)
    });
    DataArray::from_values(values, n_components)
}

fn typed_fill<T: Element>(value: &PadValue, n_components: usize) -> Fill<T> {
    match value {
        PadValue::Constant(tuple) => {
            let convert = |v: f64| T::from_f64(v).unwrap_or_else(T::zeroed);
            let tuple = if tuple.len() == 1 {
                vec![convert(tuple[0]); n_components]
            } else {
                tuple.iter().map(|&v| convert(v)).collect()
            };
            Fill::Constant(tuple)
        }
        PadValue::Mirror => Fill::Mirror,
        PadValue::Wrap => Fill::Wrap,
    }
}

fn pad_values<T: Element>(
    src: &[T],
    n_components: usize,
    dims: UVec3,
    plan: &PadPlan,
    fill: &Fill<T>,
) -> ArrayValues {
    let out = plan.result;
    let n_out = out.x as usize * out.y as usize * out.z as usize;
    let mut values = Vec::with_capacity(n_out * n_components);
    let dx = dims.x as usize;
    let dxy = dx * dims.y as usize;

    for k in 0..out.z {
        let sk = source_index(k, plan.before[2], dims.z, fill);
        for j in 0..out.y {
            let sj = source_index(j, plan.before[1], dims.y, fill);
            for i in 0..out.x {
                let si = source_index(i, plan.before[0], dims.x, fill);
                match (si, sj, sk, fill) {
                    (Some(si), Some(sj), Some(sk), _) => {
                        let start = (si + sj * dx + sk * dxy) * n_components;
                        values.extend_from_slice(&src[start..start + n_components]);
                    }
                    (_, _, _, Fill::Constant(tuple)) => values.extend_from_slice(tuple),
                    // Mirror and wrap always resolve a source index.
                    _ => values.extend(std::iter::repeat(T::zeroed()).take(n_components)),
                }
            }
        }
    }
    T::wrap(values.into())
}

/// Maps an output index on one axis to the input index it copies, if any.
fn source_index<T>(out: u32, before: u32, dim: u32, fill: &Fill<T>) -> Option<usize> {
    let s = i64::from(out) - i64::from(before);
    let d = i64::from(dim);
    let index = if (0..d).contains(&s) {
        s
    } else {
        match fill {
            Fill::Constant(_) => return None,
            Fill::Wrap => s.rem_euclid(d),
            Fill::Mirror => {
                let m = s.rem_euclid(2 * d);
                if m < d {
                    m
                } else {
                    2 * d - 1 - m
                }
            }
        }
    };
    usize::try_from(index).ok()
}
