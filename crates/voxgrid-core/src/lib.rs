//! Core types and operations for voxgrid-rs.
//!
//! This crate provides the structured-grid model and the operations on it:
//! - [`ImageGrid`] and [`ImageData`] for uniform grids with point and cell arrays
//! - Dimensionality masks and dimensional operations
//! - Re-meshing between point and cell data, and image padding
//! - The [`LabelEngine`] contract for delegated contouring and labeling

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Options structs legitimately have many boolean flags
#![allow(clippy::struct_excessive_bools)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]
// Grid dimensions are u32 and index math happens in usize
#![allow(clippy::cast_possible_truncation)]

pub mod array;
mod config;
pub mod connectivity;
pub mod contour;
pub mod data;
pub mod dimensionality;
pub mod engine;
pub mod error;
pub mod grid;
pub mod image;
pub mod pad;
pub mod remesh;

pub use array::{ArrayValues, DType, DataArray, Element};
pub use connectivity::{
    label_connectivity, ConnectivityOptions, ExtractionMode, LabelMode, ScalarRange,
};
pub use contour::{
    contour_labels, BoundaryStyle, ContourLabelsOptions, OutputMeshType, SURFACE_NETS_VERSION,
};
pub use data::{ArrayBinding, Association, DataStore};
pub use dimensionality::{
    resolve_mask, validate_dimensional_operation, DimOp, DimensionalOperation, Dimensionality,
};
pub use engine::{
    ConnectivityRequest, ConnectivityResult, ContourLabelsRequest, EngineVersion, LabelEngine,
    LabelSurface, SmoothingParams, BOUNDARY_LABELS, REGION_ID,
};
pub use error::{Result, VoxgridError};
pub use grid::ImageGrid;
pub use image::ImageData;
pub use pad::{PadOptions, PadSize, PadValue};
pub use remesh::RemeshOptions;

// Re-export glam types for convenience
pub use glam::{BVec3, DMat3, DMat4, DVec3, DVec4, IVec3, UVec3};
