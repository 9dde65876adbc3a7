//! Conversion between point-sampled and cell-sampled images.
//!
//! `points_to_cells` grows every masked axis by one so that each old point
//! becomes the center of a new cell; `cells_to_points` is the inverse. The
//! origin moves by half a lattice step so sample positions are unchanged in
//! physical space, and array values are carried over without interpolation.

use glam::{BVec3, DVec3};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{parse_document, Fields};
use crate::data::{ArrayBinding, Association, DataStore};
use crate::dimensionality::{validate_dimensional_operation, DimOp, Dimensionality};
use crate::error::{Result, VoxgridError};
use crate::grid::fmt_dims;
use crate::image::{check_length, ImageData};

/// Options for [`ImageData::points_to_cells`] and [`ImageData::cells_to_points`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemeshOptions {
    /// Convert only this array and make it the active scalars.
    pub scalars: Option<String>,

    /// Which axes take part in the conversion.
    pub dimensionality: Dimensionality,

    /// Deep-copy the converted arrays instead of aliasing the input buffers.
    pub copy: bool,
}

impl Default for RemeshOptions {
    fn default() -> Self {
        Self {
            scalars: None,
            dimensionality: Dimensionality::Preserve,
            copy: true,
        }
    }
}

impl RemeshOptions {
    #[must_use]
    pub fn with_scalars(mut self, name: impl Into<String>) -> Self {
        self.scalars = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_dimensionality(mut self, dimensionality: impl Into<Dimensionality>) -> Self {
        self.dimensionality = dimensionality.into();
        self
    }

    #[must_use]
    pub fn with_copy(mut self, copy: bool) -> Self {
        self.copy = copy;
        self
    }

    /// Parses options such as `{"dimensionality": "2D", "copy": false}`.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_value(&parse_document(json)?)
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let fields = Fields::new("remesh", value, &["scalars", "dimensionality", "copy"])?;
        let defaults = Self::default();
        Ok(Self {
            scalars: fields.string("scalars")?,
            dimensionality: fields
                .parse("dimensionality")?
                .unwrap_or(defaults.dimensionality),
            copy: fields.bool("copy")?.unwrap_or(defaults.copy),
        })
    }
}

impl ImageData {
    /// Re-meshes point data into cell data.
    ///
    /// Each masked axis gains one point; the new cell centers sit on the old
    /// point positions. Cell arrays of the input are dropped.
    pub fn points_to_cells(&self, options: &RemeshOptions) -> Result<ImageData> {
        remesh(self, Association::Point, options)
    }

    /// Re-meshes cell data into point data.
    ///
    /// Each masked axis loses one point; the new points sit on the old cell
    /// centers. Point arrays of the input are dropped.
    pub fn cells_to_points(&self, options: &RemeshOptions) -> Result<ImageData> {
        remesh(self, Association::Cell, options)
    }
}

fn remesh(image: &ImageData, source: Association, options: &RemeshOptions) -> Result<ImageData> {
    let target = source.opposite();
    let (op, half_step) = match source {
        Association::Point => (DimOp::Add, -0.5),
        Association::Cell => (DimOp::Sub, 0.5),
    };

    let dims = image.dimensions();
    let resolved = validate_dimensional_operation(dims, &options.dimensionality, op, [1, 1, 1])?;
    let shift = DVec3::select(BVec3::from(resolved.mask), DVec3::splat(half_step), DVec3::ZERO);
    let grid = image
        .grid()
        .with_dimensions(resolved.result)?
        .shifted(shift);

    let n_in = image.n_samples(source);
    let n_out = match target {
        Association::Point => grid.n_points(),
        Association::Cell => grid.n_cells(),
    };
    if n_in != n_out {
        return Err(VoxgridError::invalid(format!(
            "Cannot re-mesh {source}s to {target}s. The dimensions of the input {} is not \
             compatible with the dimensions of the output {} and would require to map \
             {n_in} {} on {n_out} {}.",
            fmt_dims(dims),
            fmt_dims(resolved.result),
            source.plural(),
            target.plural(),
        )));
    }

    let selected: Vec<&ArrayBinding> = match &options.scalars {
        Some(name) => vec![image.scalars_on(name, source)?],
        None => image.data().iter_in(source).collect(),
    };
    for binding in &selected {
        check_length(&binding.name, source, &binding.array, n_in)?;
    }

    let mut data = DataStore::new();
    for binding in &selected {
        let array = if options.copy {
            binding.array.deep_copy()
        } else {
            binding.array.clone()
        };
        data.insert(binding.name.clone(), target, array);
    }

    let dropped: Vec<&str> = image
        .data()
        .iter_in(target)
        .map(|b| b.name.as_str())
        .collect();
    if !dropped.is_empty() {
        log::warn!("re-meshing {source}s to {target}s drops {target} arrays {dropped:?}");
    }

    let active = match &options.scalars {
        Some(name) => Some(name.clone()),
        None => image
            .data()
            .active_scalars()
            .filter(|b| b.association == source)
            .map(|b| b.name.clone()),
    };
    data.set_active_scalars_unchecked(active);

    log::debug!(
        "re-meshed {source}s to {target}s: {} -> {} (mask {:?})",
        fmt_dims(dims),
        fmt_dims(resolved.result),
        resolved.mask
    );
    ImageData::from_parts(grid, data)
}
