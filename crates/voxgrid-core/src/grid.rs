//! Structured image grid descriptor.
//!
//! An [`ImageGrid`] describes a regular lattice of points by its dimensions
//! (number of points along X, Y, Z), an integer extent offset, and the affine
//! index-to-physical transform `origin + direction * (spacing * ijk)`.
//!
//! Point values live at lattice vertices; cell values live at voxel centers.

use glam::{DMat3, DMat4, DVec3, IVec3, UVec3};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VoxgridError};

/// An immutable descriptor of a structured image grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageGrid {
    dimensions: UVec3,
    offset: IVec3,
    origin: DVec3,
    spacing: DVec3,
    direction: DMat3,
}

impl Default for ImageGrid {
    fn default() -> Self {
        Self {
            dimensions: UVec3::ONE,
            offset: IVec3::ZERO,
            origin: DVec3::ZERO,
            spacing: DVec3::ONE,
            direction: DMat3::IDENTITY,
        }
    }
}

impl ImageGrid {
    /// Creates a grid with unit spacing at the origin.
    ///
    /// Fails if any dimension is zero.
    pub fn new(dimensions: UVec3) -> Result<Self> {
        validate_dimensions(dimensions)?;
        Ok(Self {
            dimensions,
            ..Self::default()
        })
    }

    /// Creates a grid from an extent `[x_min, x_max, y_min, y_max, z_min, z_max]`.
    pub fn from_extent(extent: [i32; 6]) -> Result<Self> {
        Self::default().with_extent(extent)
    }

    /// Returns a copy of this grid covering the given extent.
    pub fn with_extent(mut self, extent: [i32; 6]) -> Result<Self> {
        let mut dims = [0_u32; 3];
        for (axis, dim) in dims.iter_mut().enumerate() {
            let (lo, hi) = (extent[2 * axis], extent[2 * axis + 1]);
            if hi < lo {
                return Err(VoxgridError::invalid(format!(
                    "Extent {extent:?} is invalid: max {hi} is less than min {lo} along axis {axis}."
                )));
            }
            *dim = hi.abs_diff(lo).checked_add(1).ok_or_else(|| {
                VoxgridError::invalid(format!(
                    "Extent {extent:?} is invalid: it spans more than {} points along axis {axis}.",
                    u32::MAX
                ))
            })?;
        }
        self.dimensions = UVec3::from_array(dims);
        self.offset = IVec3::new(extent[0], extent[2], extent[4]);
        Ok(self)
    }

    /// Returns a copy of this grid with new dimensions and the same offset.
    pub fn with_dimensions(mut self, dimensions: UVec3) -> Result<Self> {
        validate_dimensions(dimensions)?;
        self.dimensions = dimensions;
        Ok(self)
    }

    /// Returns a copy of this grid with a new origin.
    #[must_use]
    pub fn with_origin(mut self, origin: DVec3) -> Self {
        self.origin = origin;
        self
    }

    /// Returns a copy of this grid with new spacing. Each component must be positive.
    pub fn with_spacing(mut self, spacing: DVec3) -> Result<Self> {
        if !spacing.cmpgt(DVec3::ZERO).all() {
            return Err(VoxgridError::invalid(format!(
                "Spacing must be positive. Got ({}, {}, {}).",
                spacing.x, spacing.y, spacing.z
            )));
        }
        self.spacing = spacing;
        Ok(self)
    }

    /// Returns a copy of this grid with a new direction matrix.
    #[must_use]
    pub fn with_direction(mut self, direction: DMat3) -> Self {
        self.direction = direction;
        self
    }

    /// Builds the origin, spacing and direction from an index-to-physical matrix.
    ///
    /// Each of the first three columns is split into a spacing (its length) and
    /// a unit direction. The translation column becomes the origin.
    pub fn with_index_to_physical(mut self, matrix: DMat4) -> Result<Self> {
        let mut spacing = DVec3::ZERO;
        let mut cols = [DVec3::ZERO; 3];
        for axis in 0..3 {
            let col = matrix.col(axis).truncate();
            let len = col.length();
            if len <= 0.0 || !len.is_finite() {
                return Err(VoxgridError::invalid(format!(
                    "Index-to-physical matrix column {axis} must be a non-zero finite vector."
                )));
            }
            spacing[axis] = len;
            cols[axis] = col / len;
        }
        self.spacing = spacing;
        self.direction = DMat3::from_cols(cols[0], cols[1], cols[2]);
        self.origin = matrix.col(3).truncate();
        Ok(self)
    }

    /// Returns the affine index-to-physical matrix.
    #[must_use]
    pub fn index_to_physical(&self) -> DMat4 {
        let linear = self.direction * DMat3::from_diagonal(self.spacing);
        DMat4::from_cols(
            linear.x_axis.extend(0.0),
            linear.y_axis.extend(0.0),
            linear.z_axis.extend(0.0),
            self.origin.extend(1.0),
        )
    }

    /// Returns the number of points along each axis.
    #[must_use]
    pub fn dimensions(&self) -> UVec3 {
        self.dimensions
    }

    /// Returns the extent minimum (index of the first point along each axis).
    #[must_use]
    pub fn offset(&self) -> IVec3 {
        self.offset
    }

    /// Returns the extent `[x_min, x_max, y_min, y_max, z_min, z_max]`.
    #[must_use]
    pub fn extent(&self) -> [i32; 6] {
        let mut extent = [0; 6];
        for axis in 0..3 {
            let lo = self.offset[axis];
            extent[2 * axis] = lo;
            extent[2 * axis + 1] = lo.saturating_add_unsigned(self.dimensions[axis] - 1);
        }
        extent
    }

    #[must_use]
    pub fn origin(&self) -> DVec3 {
        self.origin
    }

    #[must_use]
    pub fn spacing(&self) -> DVec3 {
        self.spacing
    }

    #[must_use]
    pub fn direction(&self) -> DMat3 {
        self.direction
    }

    /// Returns the total number of points.
    #[must_use]
    pub fn n_points(&self) -> usize {
        self.dimensions.to_array().iter().map(|&d| d as usize).product()
    }

    /// Returns the number of cells along each axis.
    ///
    /// A singleton axis still spans one cell, so a `(1, 1, 1)` grid holds a
    /// single vertex cell.
    #[must_use]
    pub fn cell_dimensions(&self) -> UVec3 {
        self.dimensions.saturating_sub(UVec3::ONE).max(UVec3::ONE)
    }

    /// Returns the total number of cells.
    #[must_use]
    pub fn n_cells(&self) -> usize {
        self.cell_dimensions()
            .to_array()
            .iter()
            .map(|&d| d as usize)
            .product()
    }

    /// Returns the number of non-singleton axes.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.dimensions.to_array().iter().filter(|&&d| d > 1).count()
    }

    /// Maps continuous index coordinates (including the extent offset) to physical space.
    #[must_use]
    pub fn index_to_world(&self, ijk: DVec3) -> DVec3 {
        self.origin + self.direction * (self.spacing * ijk)
    }

    /// Returns the physical position of the point with local index `(i, j, k)`.
    #[must_use]
    pub fn point(&self, i: u32, j: u32, k: u32) -> DVec3 {
        let local = UVec3::new(i, j, k).as_dvec3();
        self.index_to_world(self.offset.as_dvec3() + local)
    }

    /// Returns the physical center of the cell with local index `(i, j, k)`.
    ///
    /// Along a singleton axis the center coincides with the single point.
    #[must_use]
    pub fn cell_center(&self, i: u32, j: u32, k: u32) -> DVec3 {
        let half = DVec3::select(self.dimensions.cmpgt(UVec3::ONE), DVec3::splat(0.5), DVec3::ZERO);
        let local = UVec3::new(i, j, k).as_dvec3() + half;
        self.index_to_world(self.offset.as_dvec3() + local)
    }

    /// Returns the physical bounds `[x_min, x_max, y_min, y_max, z_min, z_max]`.
    #[must_use]
    pub fn bounds(&self) -> [f64; 6] {
        let extent = self.extent();
        let mut min = DVec3::splat(f64::MAX);
        let mut max = DVec3::splat(f64::MIN);
        for corner in 0..8_usize {
            let ijk = DVec3::new(
                f64::from(extent[usize::from(corner & 1 != 0)]),
                f64::from(extent[2 + usize::from(corner & 2 != 0)]),
                f64::from(extent[4 + usize::from(corner & 4 != 0)]),
            );
            let p = self.index_to_world(ijk);
            min = min.min(p);
            max = max.max(p);
        }
        [min.x, max.x, min.y, max.y, min.z, max.z]
    }

    /// Returns a copy with the origin moved by `index_shift` lattice steps along each axis.
    pub(crate) fn shifted(mut self, index_shift: DVec3) -> Self {
        self.origin += self.direction * (self.spacing * index_shift);
        self
    }

    /// Flattens a local point index; X varies fastest.
    #[must_use]
    pub fn flatten_point_index(&self, i: u32, j: u32, k: u32) -> usize {
        let d = self.dimensions;
        i as usize + d.x as usize * (j as usize + d.y as usize * k as usize)
    }
}

fn validate_dimensions(dimensions: UVec3) -> Result<()> {
    if dimensions.cmpeq(UVec3::ZERO).any() {
        return Err(VoxgridError::invalid(format!(
            "Dimensions must be at least 1 along every axis. Got {}.",
            fmt_dims(dimensions)
        )));
    }
    Ok(())
}

/// Formats dimensions as `(x, y, z)` for error messages.
pub(crate) fn fmt_dims(dims: UVec3) -> String {
    format!("({}, {}, {})", dims.x, dims.y, dims.z)
}
