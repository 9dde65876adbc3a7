//! voxgrid-rs: structured image grids with point and cell data.
//!
//! An [`ImageData`] is a uniform lattice described by its dimensions, extent
//! offset, origin, spacing and direction, together with named arrays sampled
//! on its points or its cells.
//!
//! # Quick Start
//!
//! ```no_run
//! use voxgrid::*;
//!
//! fn main() -> Result<()> {
//!     init_logging();
//!
//!     let mut image = ImageData::with_dimensions(UVec3::new(4, 3, 3))?;
//!     image.add_cell_array("Data", DataArray::scalars(vec![0_i64; 12]))?;
//!
//!     // Move the cell values onto the cell centers as points.
//!     let points = image.cells_to_points(&RemeshOptions::default())?;
//!     assert_eq!(points.dimensions(), UVec3::new(3, 2, 2));
//!
//!     // Grow the image by one sample on every side.
//!     let padded = points.pad_image(&PadOptions::default().with_value(PadValue::Mirror))?;
//!     assert_eq!(padded.dimensions(), UVec3::new(5, 4, 4));
//!     Ok(())
//! }
//! ```
//!
//! # Dimensionality
//!
//! Re-meshing and padding only act on the axes selected by a
//! [`Dimensionality`]: an explicit mask, `preserve` (the axes that are
//! already larger than one), or a named class such as `"2D"`.
//!
//! # In-place updates
//!
//! Operations never modify their input. Wrap an image in an [`ImageSlot`]
//! to replace it with the result of an operation.

mod init;
mod slot;

pub use init::init_logging;
pub use slot::ImageSlot;

// Re-export core types
pub use voxgrid_core::{
    array::{ArrayValues, DType, DataArray, Element},
    connectivity::{label_connectivity, ConnectivityOptions, ExtractionMode, LabelMode, ScalarRange},
    contour::{contour_labels, BoundaryStyle, ContourLabelsOptions, OutputMeshType, SURFACE_NETS_VERSION},
    data::{ArrayBinding, Association, DataStore},
    dimensionality::{
        resolve_mask, validate_dimensional_operation, DimOp, DimensionalOperation, Dimensionality,
    },
    engine::{
        ConnectivityRequest, ConnectivityResult, ContourLabelsRequest, EngineVersion,
        LabelEngine, LabelSurface, SmoothingParams, BOUNDARY_LABELS, REGION_ID,
    },
    error::{Result, VoxgridError},
    grid::ImageGrid,
    image::ImageData,
    pad::{PadOptions, PadSize, PadValue},
    remesh::RemeshOptions,
    BVec3, DMat3, DMat4, DVec3, DVec4, IVec3, UVec3,
};
