//! Label engine integration through the voxgrid-rs facade.

use std::cell::Cell;

use voxgrid::*;

/// Engine that returns one square per request and labels every sample as region 0.
struct SquareEngine {
    version: EngineVersion,
    contour_dims: Cell<Option<UVec3>>,
}

impl SquareEngine {
    fn new(version: EngineVersion) -> Self {
        Self {
            version,
            contour_dims: Cell::new(None),
        }
    }
}

impl LabelEngine for SquareEngine {
    fn version(&self) -> EngineVersion {
        self.version
    }

    fn contour_labels(&self, request: &ContourLabelsRequest) -> Result<LabelSurface> {
        self.contour_dims.set(Some(request.image.dimensions()));
        let mut cell_data = DataStore::new();
        cell_data.insert(
            BOUNDARY_LABELS,
            Association::Cell,
            DataArray::new(vec![0_i32, 5], 2)?,
        );
        Ok(LabelSurface {
            points: vec![DVec3::ZERO, DVec3::X, DVec3::new(1.0, 1.0, 0.0), DVec3::Y],
            faces: vec![vec![0, 1, 2, 3]],
            cell_data,
        })
    }

    fn label_connectivity(&self, request: &ConnectivityRequest) -> Result<ConnectivityResult> {
        let mut image = request.image.clone();
        let n = image.n_samples(request.association);
        let ids = DataArray::scalars(vec![0_i64; n]);
        match request.association {
            Association::Point => image.add_point_array(REGION_ID, ids)?,
            Association::Cell => image.add_cell_array(REGION_ID, ids)?,
        }
        Ok(ConnectivityResult {
            image,
            labels: vec![0],
            sizes: vec![n],
        })
    }
}

fn labeled_cells() -> ImageData {
    let mut image = ImageData::with_dimensions(UVec3::new(4, 4, 4)).unwrap();
    let labels: Vec<i32> = (0..27).map(|i| if i == 13 { 5 } else { 0 }).collect();
    image.add_cell_array("labels", DataArray::scalars(labels)).unwrap();
    image
}

#[test]
fn test_contour_labels_through_facade() {
    init_logging();
    let engine = SquareEngine::new(EngineVersion::new(9, 3, 0));
    let surface = contour_labels(&engine, &labeled_cells(), &ContourLabelsOptions::default())
        .unwrap();

    // 3x3x3 cells become 3x3x3 points, then one background sample per side.
    assert_eq!(engine.contour_dims.get(), Some(UVec3::new(5, 5, 5)));
    assert_eq!(surface.n_faces(), 1);
    assert_eq!(surface.cell_data.active_scalars_name(), Some(BOUNDARY_LABELS));
    let labels = surface.cell_data.get_cell(BOUNDARY_LABELS).unwrap();
    assert_eq!(labels.n_components(), 1);
    assert_eq!(labels.as_slice::<i32>(), Some(&[5][..]));
}

#[test]
fn test_contour_labels_old_engine() {
    let engine = SquareEngine::new(EngineVersion::new(9, 2, 6));
    let err = contour_labels(&engine, &labeled_cells(), &ContourLabelsOptions::default())
        .unwrap_err();
    assert!(matches!(err, VoxgridError::UnsupportedVersion { .. }));
    assert_eq!(engine.contour_dims.get(), None);
}

#[test]
fn test_contour_options_from_json() {
    let engine = SquareEngine::new(EngineVersion::new(9, 4, 0));
    let options = ContourLabelsOptions::from_json(
        r#"{"pad_background": false, "simplify_output": false, "boundary_style": "all"}"#,
    )
    .unwrap();
    let surface = contour_labels(&engine, &labeled_cells(), &options).unwrap();
    assert_eq!(engine.contour_dims.get(), Some(UVec3::new(3, 3, 3)));
    let labels = surface.cell_data.get_cell(BOUNDARY_LABELS).unwrap();
    assert_eq!(labels.as_slice::<i32>(), Some(&[5, 0][..]));
}

#[test]
fn test_slot_label_connectivity() {
    let engine = SquareEngine::new(EngineVersion::new(9, 4, 0));
    let mut slot = ImageSlot::from(labeled_cells());
    let (labels, sizes) = slot
        .label_connectivity(&engine, &ConnectivityOptions::default())
        .unwrap();
    assert_eq!(labels, vec![0]);
    assert_eq!(sizes, vec![27]);
    assert!(slot.get().data().find_in(REGION_ID, Association::Cell).is_some());

    let before = slot.get().clone();
    let options = ConnectivityOptions::from_json(r#"{"label_mode": "seeds"}"#).unwrap();
    assert!(slot.label_connectivity(&engine, &options).is_err());
    assert_eq!(slot.get(), &before);
}
