//! Contract with the external label engine.
//!
//! Surface-nets contouring and connected-component labeling are performed by
//! an engine outside this crate. This module defines what the engine is asked
//! for and what it must hand back; [`crate::contour`] and
//! [`crate::connectivity`] validate the options, build the requests, and
//! check the responses.

use std::fmt;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::connectivity::{ExtractionMode, LabelMode};
use crate::contour::{BoundaryStyle, OutputMeshType};
use crate::data::{Association, DataStore};
use crate::error::Result;
use crate::image::ImageData;

/// Version of a label engine, ordered by `(major, minor, patch)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EngineVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl EngineVersion {
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// An engine that contours and labels images.
///
/// Engines receive fully validated requests. Errors they return are passed
/// through to the caller unchanged.
pub trait LabelEngine {
    fn version(&self) -> EngineVersion;

    /// Extracts the boundary surfaces between labeled regions.
    fn contour_labels(&self, request: &ContourLabelsRequest) -> Result<LabelSurface>;

    /// Labels the connected regions of an image.
    fn label_connectivity(&self, request: &ConnectivityRequest) -> Result<ConnectivityResult>;
}

/// Smoothing parameters for contoured surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingParams {
    pub iterations: u32,
    pub relaxation_factor: f64,
    /// Maximum distance a point may move, in world units.
    pub constraint_distance: Option<f64>,
    /// Maximum distance as a multiple of the largest spacing, if no distance is given.
    pub constraint_scale: f64,
}

impl Default for SmoothingParams {
    fn default() -> Self {
        Self {
            iterations: 16,
            relaxation_factor: 0.5,
            constraint_distance: None,
            constraint_scale: 2.0,
        }
    }
}

/// A contouring request. The image holds exactly one point array, the labels.
#[derive(Debug, Clone, PartialEq)]
pub struct ContourLabelsRequest {
    pub image: ImageData,
    pub scalars: String,
    pub boundary_style: BoundaryStyle,
    pub background_value: f64,
    pub select_inputs: Option<Vec<f64>>,
    pub select_outputs: Option<Vec<f64>>,
    pub output_mesh_type: OutputMeshType,
    /// `None` disables smoothing.
    pub smoothing: Option<SmoothingParams>,
}

/// Name of the cell array holding the two labels on either side of a face.
pub const BOUNDARY_LABELS: &str = "boundary_labels";

/// A polygonal surface returned by the engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelSurface {
    pub points: Vec<DVec3>,
    /// Point indices of each face (quads or triangles).
    pub faces: Vec<Vec<u32>>,
    /// Per-face arrays. Must contain [`BOUNDARY_LABELS`].
    pub cell_data: DataStore,
}

impl LabelSurface {
    #[must_use]
    pub fn n_faces(&self) -> usize {
        self.faces.len()
    }
}

/// A connectivity request with the scalar range already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectivityRequest {
    pub image: ImageData,
    pub scalars: String,
    pub association: Association,
    /// Inclusive range of values that belong to a region.
    pub scalar_range: [f64; 2],
    pub extraction_mode: ExtractionMode,
    pub point_seeds: Vec<DVec3>,
    pub label_mode: LabelMode,
    pub constant_value: Option<i64>,
}

/// Name of the array holding region labels.
pub const REGION_ID: &str = "RegionId";

/// Labeled image and region statistics returned by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectivityResult {
    /// The input image with a [`REGION_ID`] array on the labeled association.
    pub image: ImageData,
    /// Label of each extracted region.
    pub labels: Vec<i64>,
    /// Number of samples in each region, in the order of `labels`.
    pub sizes: Vec<usize>,
}
