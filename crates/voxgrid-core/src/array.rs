//! Typed data arrays attached to image grids.
//!
//! A [`DataArray`] is a flat, reference-counted buffer of tuples. Cloning a
//! `DataArray` aliases the buffer; [`DataArray::deep_copy`] allocates new
//! storage. Aliasing is what lets a points/cells remesh relabel an array's
//! domain without touching its data.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VoxgridError};

/// Element type of a [`DataArray`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    UInt8,
    Int32,
    Int64,
    Float32,
    Float64,
}

impl DType {
    /// Returns the lowercase dtype name used in messages (e.g. `uint8`).
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::UInt8 => "uint8",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    #[must_use]
    pub fn is_integer(self) -> bool {
        matches!(self, Self::UInt8 | Self::Int32 | Self::Int64)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A scalar type that can be stored in a [`DataArray`].
pub trait Element: bytemuck::Pod + PartialEq + Send + Sync + sealed::Sealed {
    const DTYPE: DType;

    /// Converts a number into this type, or `None` if it is not exactly representable.
    fn from_f64(value: f64) -> Option<Self>;

    fn to_f64(self) -> f64;

    #[doc(hidden)]
    fn wrap(values: Arc<[Self]>) -> ArrayValues;

    #[doc(hidden)]
    fn view(values: &ArrayValues) -> Option<&Arc<[Self]>>;
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for i32 {}
    impl Sealed for i64 {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// `$upper` is the exclusive upper bound `MAX + 1`, exact in `f64`.
macro_rules! impl_integer_element {
    ($ty:ty, $variant:ident, $upper:expr) => {
        impl Element for $ty {
            const DTYPE: DType = DType::$variant;

            #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
            fn from_f64(value: f64) -> Option<Self> {
                if value.fract() != 0.0 || value < <$ty>::MIN as f64 || value >= $upper {
                    return None;
                }
                Some(value as $ty)
            }

            #[allow(clippy::cast_precision_loss)]
            fn to_f64(self) -> f64 {
                self as f64
            }

            fn wrap(values: Arc<[Self]>) -> ArrayValues {
                ArrayValues::$variant(values)
            }

            fn view(values: &ArrayValues) -> Option<&Arc<[Self]>> {
                match values {
                    ArrayValues::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

impl_integer_element!(u8, UInt8, 256.0);
impl_integer_element!(i32, Int32, 2_147_483_648.0);
impl_integer_element!(i64, Int64, 9_223_372_036_854_775_808.0);

impl Element for f32 {
    const DTYPE: DType = DType::Float32;

    /// Rounds to the nearest `f32`. Finite values beyond the `f32` range are rejected.
    #[allow(clippy::cast_possible_truncation)]
    fn from_f64(value: f64) -> Option<Self> {
        if value.is_finite() && value.abs() > f64::from(f32::MAX) {
            return None;
        }
        Some(value as f32)
    }

    fn to_f64(self) -> f64 {
        f64::from(self)
    }

    fn wrap(values: Arc<[Self]>) -> ArrayValues {
        ArrayValues::Float32(values)
    }

    fn view(values: &ArrayValues) -> Option<&Arc<[Self]>> {
        match values {
            ArrayValues::Float32(v) => Some(v),
            _ => None,
        }
    }
}

impl Element for f64 {
    const DTYPE: DType = DType::Float64;

    fn from_f64(value: f64) -> Option<Self> {
        Some(value)
    }

    fn to_f64(self) -> f64 {
        self
    }

    fn wrap(values: Arc<[Self]>) -> ArrayValues {
        ArrayValues::Float64(values)
    }

    fn view(values: &ArrayValues) -> Option<&Arc<[Self]>> {
        match values {
            ArrayValues::Float64(v) => Some(v),
            _ => None,
        }
    }
}

/// Reference-counted storage of a [`DataArray`].
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayValues {
    UInt8(Arc<[u8]>),
    Int32(Arc<[i32]>),
    Int64(Arc<[i64]>),
    Float32(Arc<[f32]>),
    Float64(Arc<[f64]>),
}

/// Runs `$body` with `$slice` bound to the typed `Arc<[T]>` of `$values`.
macro_rules! with_values {
    ($values:expr, $slice:ident => $body:expr) => {
        match $values {
            $crate::array::ArrayValues::UInt8($slice) => $body,
            $crate::array::ArrayValues::Int32($slice) => $body,
            $crate::array::ArrayValues::Int64($slice) => $body,
            $crate::array::ArrayValues::Float32($slice) => $body,
            $crate::array::ArrayValues::Float64($slice) => $body,
        }
    };
}
pub(crate) use with_values;

impl ArrayValues {
    #[must_use]
    pub fn dtype(&self) -> DType {
        match self {
            Self::UInt8(_) => DType::UInt8,
            Self::Int32(_) => DType::Int32,
            Self::Int64(_) => DType::Int64,
            Self::Float32(_) => DType::Float32,
            Self::Float64(_) => DType::Float64,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        with_values!(self, v => v.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A flat buffer of `n_tuples * n_components` values.
#[derive(Debug, Clone, PartialEq)]
pub struct DataArray {
    values: ArrayValues,
    n_components: usize,
}

impl DataArray {
    /// Creates an array from flat values grouped into tuples of `n_components`.
    pub fn new<T: Element>(values: Vec<T>, n_components: usize) -> Result<Self> {
        Self::from_values(T::wrap(values.into()), n_components)
    }

    /// Creates a single-component array.
    pub fn scalars<T: Element>(values: Vec<T>) -> Self {
        Self {
            values: T::wrap(values.into()),
            n_components: 1,
        }
    }

    /// Creates an array from existing storage.
    pub fn from_values(values: ArrayValues, n_components: usize) -> Result<Self> {
        if n_components == 0 {
            return Err(VoxgridError::invalid(
                "Number of components must be at least 1.",
            ));
        }
        if values.len() % n_components != 0 {
            return Err(VoxgridError::invalid(format!(
                "Array of length {} cannot be split into tuples of {} components.",
                values.len(),
                n_components
            )));
        }
        Ok(Self {
            values,
            n_components,
        })
    }

    /// Creates an array with `n_tuples` copies of `tuple`.
    pub fn filled<T: Element>(tuple: &[T], n_tuples: usize) -> Result<Self> {
        let values: Vec<T> = tuple
            .iter()
            .copied()
            .cycle()
            .take(tuple.len() * n_tuples)
            .collect();
        Self::new(values, tuple.len())
    }

    #[must_use]
    pub fn values(&self) -> &ArrayValues {
        &self.values
    }

    /// Returns the typed values, or `None` if the array holds another dtype.
    #[must_use]
    pub fn as_slice<T: Element>(&self) -> Option<&[T]> {
        T::view(&self.values).map(|v| &v[..])
    }

    #[must_use]
    pub fn dtype(&self) -> DType {
        self.values.dtype()
    }

    #[must_use]
    pub fn n_components(&self) -> usize {
        self.n_components
    }

    /// Returns the number of tuples.
    #[must_use]
    pub fn n_tuples(&self) -> usize {
        self.values.len() / self.n_components
    }

    /// Returns the total number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns whether both arrays point at the same buffer.
    #[must_use]
    pub fn shares_buffer(&self, other: &DataArray) -> bool {
        match (&self.values, &other.values) {
            (ArrayValues::UInt8(a), ArrayValues::UInt8(b)) => Arc::ptr_eq(a, b),
            (ArrayValues::Int32(a), ArrayValues::Int32(b)) => Arc::ptr_eq(a, b),
            (ArrayValues::Int64(a), ArrayValues::Int64(b)) => Arc::ptr_eq(a, b),
            (ArrayValues::Float32(a), ArrayValues::Float32(b)) => Arc::ptr_eq(a, b),
            (ArrayValues::Float64(a), ArrayValues::Float64(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Returns a copy backed by newly allocated storage.
    #[must_use]
    pub fn deep_copy(&self) -> DataArray {
        let values = with_values!(&self.values, v => copy_values(v));
        DataArray {
            values,
            n_components: self.n_components,
        }
    }

    /// Returns the raw bytes of the buffer in native byte order.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        with_values!(&self.values, v => bytemuck::cast_slice(&v[..]))
    }

    /// Returns all values converted to `f64`.
    #[must_use]
    pub fn to_f64_vec(&self) -> Vec<f64> {
        with_values!(&self.values, v => v.iter().map(|x| x.to_f64()).collect())
    }

    /// Returns the minimum and maximum value over all components, ignoring NaN.
    #[must_use]
    pub fn range(&self) -> Option<(f64, f64)> {
        self.to_f64_vec()
            .into_iter()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

fn copy_values<T: Element>(values: &Arc<[T]>) -> ArrayValues {
    T::wrap(Arc::from(&values[..]))
}
