//! Named array storage for point and cell data.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::array::DataArray;

/// Which lattice an array is sampled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Association {
    /// One tuple per lattice vertex.
    Point,
    /// One tuple per voxel.
    Cell,
}

impl Association {
    /// Returns the other association.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Point => Self::Cell,
            Self::Cell => Self::Point,
        }
    }

    /// Plural noun used in messages ("points" / "cells").
    #[must_use]
    pub fn plural(self) -> &'static str {
        match self {
            Self::Point => "points",
            Self::Cell => "cells",
        }
    }
}

impl fmt::Display for Association {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Point => f.write_str("point"),
            Self::Cell => f.write_str("cell"),
        }
    }
}

/// A named array bound to an association.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayBinding {
    pub name: String,
    pub association: Association,
    pub array: DataArray,
}

/// Ordered collection of point and cell arrays plus the active scalars name.
///
/// Names are unique within an association. Name lookups that do not specify
/// an association prefer point data over cell data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataStore {
    arrays: Vec<ArrayBinding>,
    active_scalars: Option<String>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an array. Returns the replaced array, if any.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        association: Association,
        array: DataArray,
    ) -> Option<DataArray> {
        let name = name.into();
        if let Some(existing) = self
            .arrays
            .iter_mut()
            .find(|b| b.association == association && b.name == name)
        {
            return Some(std::mem::replace(&mut existing.array, array));
        }
        self.arrays.push(ArrayBinding {
            name,
            association,
            array,
        });
        None
    }

    /// Removes an array. Clears the active scalars if they named it and no
    /// other array keeps the name.
    pub fn remove(&mut self, name: &str, association: Association) -> Option<DataArray> {
        let idx = self
            .arrays
            .iter()
            .position(|b| b.association == association && b.name == name)?;
        let removed = self.arrays.remove(idx);
        if self.active_scalars.as_deref() == Some(name) && self.find(name).is_none() {
            self.active_scalars = None;
        }
        Some(removed.array)
    }

    /// Removes every array and the active scalars name.
    pub fn clear(&mut self) {
        self.arrays.clear();
        self.active_scalars = None;
    }

    /// Looks up an array by name, preferring point data.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&ArrayBinding> {
        self.find_in(name, Association::Point)
            .or_else(|| self.find_in(name, Association::Cell))
    }

    /// Looks up an array by name within one association.
    #[must_use]
    pub fn find_in(&self, name: &str, association: Association) -> Option<&ArrayBinding> {
        self.arrays
            .iter()
            .find(|b| b.association == association && b.name == name)
    }

    /// Returns the array with the given name, preferring point data.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DataArray> {
        self.find(name).map(|b| &b.array)
    }

    #[must_use]
    pub fn get_point(&self, name: &str) -> Option<&DataArray> {
        self.find_in(name, Association::Point).map(|b| &b.array)
    }

    #[must_use]
    pub fn get_cell(&self, name: &str) -> Option<&DataArray> {
        self.find_in(name, Association::Cell).map(|b| &b.array)
    }

    /// Iterates over all bindings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ArrayBinding> {
        self.arrays.iter()
    }

    /// Iterates over the bindings of one association in insertion order.
    pub fn iter_in(&self, association: Association) -> impl Iterator<Item = &ArrayBinding> {
        self.arrays
            .iter()
            .filter(move |b| b.association == association)
    }

    #[must_use]
    pub fn point_names(&self) -> Vec<String> {
        self.names_in(Association::Point)
    }

    #[must_use]
    pub fn cell_names(&self) -> Vec<String> {
        self.names_in(Association::Cell)
    }

    /// Returns point array names followed by cell array names.
    #[must_use]
    pub fn array_names(&self) -> Vec<String> {
        let mut names = self.point_names();
        names.extend(self.cell_names());
        names
    }

    fn names_in(&self, association: Association) -> Vec<String> {
        self.iter_in(association).map(|b| b.name.clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }

    #[must_use]
    pub fn active_scalars_name(&self) -> Option<&str> {
        self.active_scalars.as_deref()
    }

    /// Returns the active scalars binding, if the active name resolves to an array.
    #[must_use]
    pub fn active_scalars(&self) -> Option<&ArrayBinding> {
        self.active_scalars.as_deref().and_then(|n| self.find(n))
    }

    /// Sets the active scalars name without checking that it exists.
    ///
    /// Checked activation lives on [`crate::ImageData::set_active_scalars`].
    pub fn set_active_scalars_unchecked(&mut self, name: Option<String>) {
        self.active_scalars = name;
    }
}
