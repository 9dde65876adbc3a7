//! Image data: a grid descriptor together with its point and cell arrays.

use glam::UVec3;

use crate::array::DataArray;
use crate::data::{ArrayBinding, Association, DataStore};
use crate::error::{Result, VoxgridError};
use crate::grid::ImageGrid;

/// A structured image grid with named point and cell arrays.
///
/// Operations such as [`ImageData::points_to_cells`] and
/// [`ImageData::pad_image`] never modify `self`; they return a new
/// `ImageData`. Use `voxgrid::ImageSlot` to replace an owned image in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageData {
    grid: ImageGrid,
    data: DataStore,
}

impl ImageData {
    /// Creates an image without arrays.
    #[must_use]
    pub fn new(grid: ImageGrid) -> Self {
        Self {
            grid,
            data: DataStore::new(),
        }
    }

    /// Creates an image with the given dimensions, unit spacing and zero origin.
    pub fn with_dimensions(dimensions: UVec3) -> Result<Self> {
        Ok(Self::new(ImageGrid::new(dimensions)?))
    }

    /// Assembles an image from a grid and a store, checking every array length.
    pub fn from_parts(grid: ImageGrid, data: DataStore) -> Result<Self> {
        let image = Self { grid, data };
        image.check_array_lengths(Association::Point)?;
        image.check_array_lengths(Association::Cell)?;
        Ok(image)
    }

    #[must_use]
    pub fn into_parts(self) -> (ImageGrid, DataStore) {
        (self.grid, self.data)
    }

    #[must_use]
    pub fn grid(&self) -> &ImageGrid {
        &self.grid
    }

    #[must_use]
    pub fn data(&self) -> &DataStore {
        &self.data
    }

    /// Direct access to the array store.
    ///
    /// Arrays inserted here are not length-checked; operations re-check them.
    pub fn data_mut(&mut self) -> &mut DataStore {
        &mut self.data
    }

    #[must_use]
    pub fn dimensions(&self) -> UVec3 {
        self.grid.dimensions()
    }

    #[must_use]
    pub fn n_points(&self) -> usize {
        self.grid.n_points()
    }

    #[must_use]
    pub fn n_cells(&self) -> usize {
        self.grid.n_cells()
    }

    #[must_use]
    pub fn bounds(&self) -> [f64; 6] {
        self.grid.bounds()
    }

    /// Number of tuples an array of the given association must hold.
    #[must_use]
    pub fn n_samples(&self, association: Association) -> usize {
        match association {
            Association::Point => self.n_points(),
            Association::Cell => self.n_cells(),
        }
    }

    /// Adds or replaces a point array. The first array added becomes active.
    pub fn add_point_array(&mut self, name: impl Into<String>, array: DataArray) -> Result<()> {
        self.add_array(name.into(), Association::Point, array)
    }

    /// Adds or replaces a cell array. The first array added becomes active.
    pub fn add_cell_array(&mut self, name: impl Into<String>, array: DataArray) -> Result<()> {
        self.add_array(name.into(), Association::Cell, array)
    }

    fn add_array(&mut self, name: String, association: Association, array: DataArray) -> Result<()> {
        check_length(&name, association, &array, self.n_samples(association))?;
        if self.data.active_scalars_name().is_none() {
            self.data.set_active_scalars_unchecked(Some(name.clone()));
        }
        self.data.insert(name, association, array);
        Ok(())
    }

    /// Returns the array with the given name, preferring point data.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DataArray> {
        self.data.get(name)
    }

    #[must_use]
    pub fn array_names(&self) -> Vec<String> {
        self.data.array_names()
    }

    #[must_use]
    pub fn active_scalars_name(&self) -> Option<&str> {
        self.data.active_scalars_name()
    }

    #[must_use]
    pub fn active_scalars(&self) -> Option<&DataArray> {
        self.data.active_scalars().map(|b| &b.array)
    }

    /// Sets the active scalars, or clears them with `None`.
    pub fn set_active_scalars(&mut self, name: Option<&str>) -> Result<()> {
        if let Some(name) = name {
            if self.data.find(name).is_none() {
                return Err(VoxgridError::ArrayNotFound(name.to_string()));
            }
        }
        self.data
            .set_active_scalars_unchecked(name.map(ToString::to_string));
        Ok(())
    }

    /// Resolves a named array that must live on `required`.
    pub(crate) fn scalars_on(&self, name: &str, required: Association) -> Result<&ArrayBinding> {
        if let Some(binding) = self.data.find_in(name, required) {
            return Ok(binding);
        }
        match self.data.find_in(name, required.opposite()) {
            Some(_) => Err(VoxgridError::invalid(format!(
                "Scalars '{name}' must be associated with {required} data. Got {} data instead.",
                required.opposite()
            ))),
            None => Err(VoxgridError::ArrayNotFound(name.to_string())),
        }
    }

    /// Checks that every array of an association holds one tuple per sample.
    pub(crate) fn check_array_lengths(&self, association: Association) -> Result<()> {
        let expected = self.n_samples(association);
        for binding in self.data.iter_in(association) {
            check_length(&binding.name, association, &binding.array, expected)?;
        }
        Ok(())
    }
}

pub(crate) fn check_length(
    name: &str,
    association: Association,
    array: &DataArray,
    expected: usize,
) -> Result<()> {
    if array.n_tuples() != expected {
        return Err(VoxgridError::invalid(format!(
            "Array '{name}' has {} tuples but is bound to {association} data of an image with {expected} {}.",
            array.n_tuples(),
            association.plural()
        )));
    }
    Ok(())
}
