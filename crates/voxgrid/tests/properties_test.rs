//! Property tests for re-meshing and padding.

use proptest::prelude::*;
use voxgrid::*;

fn dims_strategy() -> impl Strategy<Value = UVec3> {
    (1_u32..6, 1_u32..6, 1_u32..6).prop_map(|(x, y, z)| UVec3::new(x, y, z))
}

/// Dimensions where about half of the axes are singletons.
fn sparse_dims_strategy() -> impl Strategy<Value = UVec3> {
    let axis = || prop_oneof![Just(1_u32), 2_u32..6];
    (axis(), axis(), axis()).prop_map(|(x, y, z)| UVec3::new(x, y, z))
}

fn grid_strategy() -> impl Strategy<Value = ImageGrid> {
    grid_with_dims(dims_strategy())
}

/// Origins and spacings that half-cell shifts keep exact.
fn grid_with_dims(dims: impl Strategy<Value = UVec3>) -> impl Strategy<Value = ImageGrid> {
    let spacing = prop::sample::select(vec![0.25, 0.5, 1.0, 2.0, 4.0]);
    (dims, (-8_i32..8, -8_i32..8, -8_i32..8), (spacing.clone(), spacing.clone(), spacing))
        .prop_map(|(dims, (ox, oy, oz), (sx, sy, sz))| {
            ImageGrid::new(dims)
                .unwrap()
                .with_origin(DVec3::new(f64::from(ox), f64::from(oy), f64::from(oz)))
                .with_spacing(DVec3::new(sx, sy, sz))
                .unwrap()
        })
}

fn with_ramp(grid: ImageGrid) -> ImageData {
    let mut image = ImageData::new(grid);
    let n = image.n_points() as i32;
    image
        .add_point_array("ramp", DataArray::scalars((0..n).collect()))
        .unwrap();
    image
}

proptest! {
    #[test]
    fn prop_points_cells_round_trip(grid in grid_strategy()) {
        let image = with_ramp(grid);
        let options = RemeshOptions::default();
        let cells = image.points_to_cells(&options).unwrap();
        prop_assert_eq!(cells.n_cells(), image.n_points());

        let back = cells.cells_to_points(&options).unwrap();
        prop_assert_eq!(back.dimensions(), image.dimensions());
        prop_assert_eq!(back.bounds(), image.bounds());
        prop_assert_eq!(back, image);
    }

    #[test]
    fn prop_points_cells_round_trip_with_mask(
        grid in grid_with_dims(sparse_dims_strategy()),
        mask in prop::array::uniform3(any::<bool>()),
    ) {
        let image = with_ramp(grid);
        let options = RemeshOptions::default().with_dimensionality(mask);

        // Points only map onto cells when every non-singleton axis is masked.
        let cells = image.points_to_cells(&options);
        prop_assume!(cells.is_ok());
        let cells = cells.unwrap();
        for axis in 0..3 {
            let grown = u32::from(mask[axis]);
            prop_assert_eq!(cells.dimensions()[axis], image.dimensions()[axis] + grown);
        }

        let back = cells.cells_to_points(&options).unwrap();
        prop_assert_eq!(back, image);
    }

    #[test]
    fn prop_pad_grows_masked_axes(
        dims in dims_strategy(),
        sides in prop::array::uniform6(0_u32..3),
        mask in prop::array::uniform3(any::<bool>()),
    ) {
        let image = with_ramp(ImageGrid::new(dims).unwrap());
        let padded = image
            .pad_image(
                &PadOptions::default()
                    .with_size(PadSize::PerSide(sides))
                    .with_dimensionality(mask),
            )
            .unwrap();

        let bounds = padded.bounds();
        for axis in 0..3 {
            let (before, after) = if mask[axis] {
                (sides[2 * axis], sides[2 * axis + 1])
            } else {
                (0, 0)
            };
            prop_assert_eq!(padded.dimensions()[axis], dims[axis] + before + after);
            prop_assert_eq!(bounds[2 * axis], -f64::from(before));
        }
        prop_assert_eq!(padded.get("ramp").unwrap().n_tuples(), padded.n_points());
    }

    #[test]
    fn prop_zero_pad_is_identity(grid in grid_strategy(), value in -3.0_f64..3.0) {
        let mut image = with_ramp(grid);
        let n_cells = image.n_cells();
        image
            .add_cell_array("cells", DataArray::scalars(vec![1.5_f32; n_cells]))
            .unwrap();
        let padded = image
            .pad_image(
                &PadOptions::default()
                    .with_size(0_u32)
                    .with_value(value.round())
                    .with_all_scalars(true),
            )
            .unwrap();
        prop_assert_eq!(padded, image);
    }
}
