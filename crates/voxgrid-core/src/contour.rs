//! Boundary surfaces of labeled images.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::array::{with_values, ArrayValues, DataArray, Element};
use crate::config::{parse_document, Fields};
use crate::data::{ArrayBinding, Association};
use crate::dimensionality::Dimensionality;
use crate::engine::{
    ContourLabelsRequest, EngineVersion, LabelEngine, LabelSurface, SmoothingParams,
    BOUNDARY_LABELS,
};
use crate::error::{Result, VoxgridError};
use crate::image::ImageData;
use crate::pad::{PadOptions, PadValue};
use crate::remesh::RemeshOptions;

/// Oldest engine that provides surface nets.
pub const SURFACE_NETS_VERSION: EngineVersion = EngineVersion::new(9, 3, 0);

/// Which boundaries between labels are extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryStyle {
    /// Boundaries between a label and the background.
    #[default]
    External,
    /// Boundaries between two foreground labels.
    Internal,
    /// Both external and internal boundaries.
    All,
    /// External boundaries of regions that touch no other foreground label.
    StrictExternal,
}

impl FromStr for BoundaryStyle {
    type Err = VoxgridError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "external" => Ok(Self::External),
            "internal" => Ok(Self::Internal),
            "all" => Ok(Self::All),
            "strict_external" => Ok(Self::StrictExternal),
            other => Err(VoxgridError::invalid(format!(
                "Invalid `boundary_style` \"{other}\", use \"external\", \"internal\", \"all\", \
                 or \"strict_external\"."
            ))),
        }
    }
}

/// Face type of the contoured surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMeshType {
    Quads,
    Triangles,
}

impl FromStr for OutputMeshType {
    type Err = VoxgridError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "quads" => Ok(Self::Quads),
            "triangles" => Ok(Self::Triangles),
            other => Err(VoxgridError::invalid(format!(
                "Invalid `output_mesh_type` \"{other}\", use \"quads\" or \"triangles\"."
            ))),
        }
    }
}

/// Options for [`contour_labels`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourLabelsOptions {
    /// Label array to contour. Defaults to the active scalars.
    pub scalars: Option<String>,
    pub boundary_style: BoundaryStyle,
    pub background_value: f64,
    /// Only contour these input labels.
    pub select_inputs: Option<Vec<f64>>,
    /// Only keep boundaries of these labels in the output.
    pub select_outputs: Option<Vec<f64>>,
    /// Pad the labels with one layer of background so external surfaces are closed.
    pub pad_background: bool,
    /// Defaults to triangles when smoothing, quads otherwise.
    pub output_mesh_type: Option<OutputMeshType>,
    pub smoothing: bool,
    pub smoothing_params: SmoothingParams,
    /// Collapse `boundary_labels` to one component. Defaults to true for external boundaries.
    pub simplify_output: Option<bool>,
}

impl Default for ContourLabelsOptions {
    fn default() -> Self {
        Self {
            scalars: None,
            boundary_style: BoundaryStyle::External,
            background_value: 0.0,
            select_inputs: None,
            select_outputs: None,
            pad_background: true,
            output_mesh_type: None,
            smoothing: false,
            smoothing_params: SmoothingParams::default(),
            simplify_output: None,
        }
    }
}

impl ContourLabelsOptions {
    /// Parses options such as `{"boundary_style": "all", "smoothing": true}`.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_value(&parse_document(json)?)
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let fields = Fields::new(
            "contour",
            value,
            &[
                "scalars",
                "boundary_style",
                "background_value",
                "select_inputs",
                "select_outputs",
                "pad_background",
                "output_mesh_type",
                "smoothing",
                "smoothing_num_iterations",
                "smoothing_relaxation_factor",
                "smoothing_constraint_distance",
                "smoothing_constraint_scale",
                "simplify_output",
            ],
        )?;
        let defaults = Self::default();
        let mut smoothing_params = defaults.smoothing_params;
        if let Some(n) = fields.number("smoothing_num_iterations")? {
            smoothing_params.iterations = non_negative_count(n)?;
        }
        if let Some(f) = fields.number("smoothing_relaxation_factor")? {
            smoothing_params.relaxation_factor = f;
        }
        smoothing_params.constraint_distance = fields.number("smoothing_constraint_distance")?;
        if let Some(s) = fields.number("smoothing_constraint_scale")? {
            smoothing_params.constraint_scale = s;
        }

        Ok(Self {
            scalars: fields.string("scalars")?,
            boundary_style: fields
                .string("boundary_style")?
                .map(|s| s.parse::<BoundaryStyle>())
                .transpose()?
                .unwrap_or(defaults.boundary_style),
            background_value: fields
                .number("background_value")?
                .unwrap_or(defaults.background_value),
            select_inputs: fields.numbers("select_inputs")?,
            select_outputs: fields.numbers("select_outputs")?,
            pad_background: fields
                .bool("pad_background")?
                .unwrap_or(defaults.pad_background),
            output_mesh_type: fields
                .string("output_mesh_type")?
                .map(|s| s.parse::<OutputMeshType>())
                .transpose()?,
            smoothing: fields.bool("smoothing")?.unwrap_or(defaults.smoothing),
            smoothing_params,
            simplify_output: fields.bool("simplify_output")?,
        })
    }

    fn resolved_mesh_type(&self) -> OutputMeshType {
        self.output_mesh_type.unwrap_or(if self.smoothing {
            OutputMeshType::Triangles
        } else {
            OutputMeshType::Quads
        })
    }

    fn resolved_simplify(&self) -> bool {
        self.simplify_output
            .unwrap_or(self.boundary_style == BoundaryStyle::External)
    }
}

fn non_negative_count(value: f64) -> Result<u32> {
    if value.fract() != 0.0 || value < 0.0 || value > f64::from(u32::MAX) {
        return Err(VoxgridError::invalid(format!(
            "Number of smoothing iterations must be a non-negative integer. Got {value}."
        )));
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let count = value as u32;
    Ok(count)
}

/// Contours the boundaries between labeled regions of `image`.
///
/// Cell labels are first re-meshed to points. The returned surface has
/// [`BOUNDARY_LABELS`] as its active cell scalars.
pub fn contour_labels(
    engine: &dyn LabelEngine,
    image: &ImageData,
    options: &ContourLabelsOptions,
) -> Result<LabelSurface> {
    let found = engine.version();
    if found < SURFACE_NETS_VERSION {
        return Err(VoxgridError::UnsupportedVersion {
            feature: "Surface nets 3D".to_string(),
            required: SURFACE_NETS_VERSION,
            found,
        });
    }

    let binding = label_scalars(image, options.scalars.as_deref())?;
    let name = binding.name.clone();
    if binding.array.n_components() != 1 {
        return Err(VoxgridError::invalid(format!(
            "Label scalars '{name}' must have a single component. Got {}.",
            binding.array.n_components()
        )));
    }

    let mut labels = ImageData::new(*image.grid());
    match binding.association {
        Association::Point => labels.add_point_array(name.clone(), binding.array.clone())?,
        Association::Cell => {
            labels.add_cell_array(name.clone(), binding.array.clone())?;
            labels = labels.cells_to_points(
                &RemeshOptions::default()
                    .with_scalars(name.clone())
                    .with_dimensionality(Dimensionality::Preserve)
                    .with_copy(false),
            )?;
        }
    }
    if options.pad_background {
        labels = labels.pad_image(
            &PadOptions::default()
                .with_value(PadValue::Constant(vec![options.background_value]))
                .with_scalars(name.clone()),
        )?;
    }

    let request = ContourLabelsRequest {
        image: labels,
        scalars: name,
        boundary_style: options.boundary_style,
        background_value: options.background_value,
        select_inputs: options.select_inputs.clone(),
        select_outputs: options.select_outputs.clone(),
        output_mesh_type: options.resolved_mesh_type(),
        smoothing: options.smoothing.then_some(options.smoothing_params),
    };
    log::debug!(
        "contouring '{}' on {:?} ({:?}, {:?})",
        request.scalars,
        request.image.dimensions(),
        request.boundary_style,
        request.output_mesh_type
    );

    let mut surface = engine.contour_labels(&request)?;
    check_surface(&surface)?;
    orient_boundary_labels(&mut surface, options.background_value, options.resolved_simplify())?;
    surface
        .cell_data
        .set_active_scalars_unchecked(Some(BOUNDARY_LABELS.to_string()));
    Ok(surface)
}

/// Picks the named array, else the active scalars, else the first array.
pub(crate) fn label_scalars<'a>(image: &'a ImageData, name: Option<&str>) -> Result<&'a ArrayBinding> {
    let data = image.data();
    if data.is_empty() {
        return Err(VoxgridError::MissingData("No data available".to_string()));
    }
    match name {
        Some(name) => data
            .find(name)
            .ok_or_else(|| VoxgridError::ArrayNotFound(name.to_string())),
        None => data
            .active_scalars()
            .or_else(|| data.iter().next())
            .ok_or_else(|| VoxgridError::MissingData("No data available".to_string())),
    }
}

fn check_surface(surface: &LabelSurface) -> Result<()> {
    let n_points = surface.points.len();
    if let Some(face) = surface
        .faces
        .iter()
        .find(|f| f.iter().any(|&i| i as usize >= n_points))
    {
        return Err(VoxgridError::invalid(format!(
            "Label engine returned face {face:?} referencing a point beyond {n_points} points."
        )));
    }
    let labels = surface.cell_data.get_cell(BOUNDARY_LABELS).ok_or_else(|| {
        VoxgridError::invalid(format!(
            "Label engine output has no '{BOUNDARY_LABELS}' cell array."
        ))
    })?;
    if labels.n_components() != 2 || labels.n_tuples() != surface.n_faces() {
        return Err(VoxgridError::invalid(format!(
            "Label engine returned '{BOUNDARY_LABELS}' with {} tuples of {} components for {} faces. \
             Expected one pair of labels per face.",
            labels.n_tuples(),
            labels.n_components(),
            surface.n_faces()
        )));
    }
    Ok(())
}

/// Puts the background label of each pair second.
///
/// With `simplify`, only the first (foreground) label of each pair is kept.
fn orient_boundary_labels(
    surface: &mut LabelSurface,
    background: f64,
    simplify: bool,
) -> Result<()> {
    let Some(pairs) = surface.cell_data.get_cell(BOUNDARY_LABELS) else {
        return Ok(());
    };
    let values = with_values!(pairs.values(), v => oriented_labels(&v[..], background, simplify));
    let oriented = DataArray::from_values(values, if simplify { 1 } else { 2 })?;
    surface
        .cell_data
        .insert(BOUNDARY_LABELS, Association::Cell, oriented);
    Ok(())
}

#[allow(clippy::float_cmp)]
fn oriented_labels<T: Element>(pairs: &[T], background: f64, simplify: bool) -> ArrayValues {
    let capacity = if simplify { pairs.len() / 2 } else { pairs.len() };
    let mut labels: Vec<T> = Vec::with_capacity(capacity);
    for pair in pairs.chunks_exact(2) {
        let (first, second) = if pair[0].to_f64() == background {
            (pair[1], pair[0])
        } else {
            (pair[0], pair[1])
        };
        labels.push(first);
        if !simplify {
            labels.push(second);
        }
    }
    T::wrap(labels.into())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use glam::{DVec3, UVec3};

    use super::*;
    use crate::engine::{ConnectivityRequest, ConnectivityResult};

    struct MockEngine {
        version: EngineVersion,
        labels: Vec<i32>,
        seen: RefCell<Option<ContourLabelsRequest>>,
    }

    impl MockEngine {
        fn new(labels: Vec<i32>) -> Self {
            Self {
                version: EngineVersion::new(9, 4, 0),
                labels,
                seen: RefCell::new(None),
            }
        }

        fn request(&self) -> ContourLabelsRequest {
            self.seen.borrow().clone().unwrap()
        }
    }

    impl LabelEngine for MockEngine {
        fn version(&self) -> EngineVersion {
            self.version
        }

        fn contour_labels(&self, request: &ContourLabelsRequest) -> Result<LabelSurface> {
            *self.seen.borrow_mut() = Some(request.clone());
            let n_faces = self.labels.len() / 2;
            let mut surface = LabelSurface {
                points: vec![DVec3::ZERO; 4],
                faces: vec![vec![0, 1, 2, 3]; n_faces],
                ..LabelSurface::default()
            };
            surface.cell_data.insert(
                BOUNDARY_LABELS,
                Association::Cell,
                DataArray::new(self.labels.clone(), 2)?,
            );
            Ok(surface)
        }

        fn label_connectivity(&self, _: &ConnectivityRequest) -> Result<ConnectivityResult> {
            Err(VoxgridError::invalid("not supported"))
        }
    }

    fn labeled_points() -> ImageData {
        let mut image = ImageData::with_dimensions(UVec3::new(3, 2, 2)).unwrap();
        image
            .add_point_array("labels", DataArray::scalars(vec![0_i32, 2, 2, 0, 5, 5, 0, 2, 2, 0, 5, 5]))
            .unwrap();
        image
    }

    #[test]
    fn test_requires_surface_nets() {
        let mut engine = MockEngine::new(vec![]);
        engine.version = EngineVersion::new(9, 2, 6);
        let err = contour_labels(&engine, &ImageData::default(), &ContourLabelsOptions::default())
            .unwrap_err();
        assert!(matches!(err, VoxgridError::UnsupportedVersion { .. }));
        assert_eq!(
            err.to_string(),
            "Surface nets 3D require engine version 9.3.0 or newer (found 9.2.6)."
        );
    }

    #[test]
    fn test_missing_data_and_scalars() {
        let engine = MockEngine::new(vec![]);
        assert!(matches!(
            contour_labels(&engine, &ImageData::default(), &ContourLabelsOptions::default()),
            Err(VoxgridError::MissingData(_))
        ));
        let options = ContourLabelsOptions {
            scalars: Some("nonexistent_key".to_string()),
            ..ContourLabelsOptions::default()
        };
        assert!(matches!(
            contour_labels(&engine, &labeled_points(), &options),
            Err(VoxgridError::ArrayNotFound(_))
        ));
    }

    #[test]
    fn test_pads_background_by_default() {
        let engine = MockEngine::new(vec![0, 2, 5, 0]);
        contour_labels(&engine, &labeled_points(), &ContourLabelsOptions::default()).unwrap();
        let request = engine.request();
        assert_eq!(request.image.dimensions(), UVec3::new(5, 4, 4));
        assert_eq!(request.scalars, "labels");
        assert_eq!(request.output_mesh_type, OutputMeshType::Quads);
        assert_eq!(request.smoothing, None);

        let options = ContourLabelsOptions {
            pad_background: false,
            ..ContourLabelsOptions::default()
        };
        contour_labels(&engine, &labeled_points(), &options).unwrap();
        assert_eq!(engine.request().image.dimensions(), UVec3::new(3, 2, 2));
    }

    #[test]
    fn test_cell_labels_become_points() {
        let mut image = ImageData::with_dimensions(UVec3::new(4, 3, 3)).unwrap();
        image
            .add_cell_array("Data", DataArray::scalars(vec![0_i64, 0, 0, 1, 0, 1, 1, 2, 0, 0, 0, 0]))
            .unwrap();
        image
            .add_point_array("other", DataArray::scalars(vec![0.0_f64; 36]))
            .unwrap();
        let engine = MockEngine::new(vec![0, 1]);
        let options = ContourLabelsOptions {
            scalars: Some("Data".to_string()),
            pad_background: false,
            ..ContourLabelsOptions::default()
        };
        contour_labels(&engine, &image, &options).unwrap();
        let request = engine.request();
        assert_eq!(request.image.dimensions(), UVec3::new(3, 2, 2));
        assert_eq!(request.image.data().point_names(), vec!["Data"]);
        assert!(request
            .image
            .get("Data")
            .unwrap()
            .shares_buffer(image.data().get_cell("Data").unwrap()));
    }

    #[test]
    fn test_mesh_type_follows_smoothing() {
        let engine = MockEngine::new(vec![0, 2]);
        let smooth = ContourLabelsOptions {
            smoothing: true,
            ..ContourLabelsOptions::default()
        };
        contour_labels(&engine, &labeled_points(), &smooth).unwrap();
        let request = engine.request();
        assert_eq!(request.output_mesh_type, OutputMeshType::Triangles);
        assert_eq!(request.smoothing, Some(SmoothingParams::default()));

        let explicit = ContourLabelsOptions {
            output_mesh_type: Some(OutputMeshType::Quads),
            ..smooth
        };
        contour_labels(&engine, &labeled_points(), &explicit).unwrap();
        assert_eq!(engine.request().output_mesh_type, OutputMeshType::Quads);
    }

    #[test]
    fn test_simplify_output() {
        let engine = MockEngine::new(vec![0, 2, 5, 0, 2, 5]);
        let surface =
            contour_labels(&engine, &labeled_points(), &ContourLabelsOptions::default()).unwrap();
        let labels = surface.cell_data.get_cell(BOUNDARY_LABELS).unwrap();
        assert_eq!(labels.n_components(), 1);
        assert_eq!(labels.as_slice::<i32>(), Some(&[2, 5, 2][..]));
        assert_eq!(surface.cell_data.active_scalars_name(), Some(BOUNDARY_LABELS));

        let internal = ContourLabelsOptions {
            boundary_style: BoundaryStyle::Internal,
            ..ContourLabelsOptions::default()
        };
        let surface = contour_labels(&engine, &labeled_points(), &internal).unwrap();
        let labels = surface.cell_data.get_cell(BOUNDARY_LABELS).unwrap();
        assert_eq!(labels.n_components(), 2);
        assert_eq!(labels.as_slice::<i32>(), Some(&[2, 0, 5, 0, 2, 5][..]));
    }

    #[test]
    fn test_background_label_comes_second() {
        let engine = MockEngine::new(vec![0, 5, 5, 2, 7, 7]);
        let all = ContourLabelsOptions {
            boundary_style: BoundaryStyle::All,
            ..ContourLabelsOptions::default()
        };
        let surface = contour_labels(&engine, &labeled_points(), &all).unwrap();
        let labels = surface.cell_data.get_cell(BOUNDARY_LABELS).unwrap();
        assert_eq!(labels.as_slice::<i32>(), Some(&[5, 0, 5, 2, 7, 7][..]));

        let shifted = ContourLabelsOptions {
            background_value: 7.0,
            ..all
        };
        let surface = contour_labels(&engine, &labeled_points(), &shifted).unwrap();
        let labels = surface.cell_data.get_cell(BOUNDARY_LABELS).unwrap();
        let values = labels.as_slice::<i32>().unwrap();
        assert_eq!(values, &[0, 5, 5, 2, 7, 7][..]);
        assert!(values.chunks_exact(2).all(|pair| pair[0] != 7 || pair[1] == 7));
    }

    #[test]
    fn test_rejects_malformed_surface() {
        let engine = MockEngine::new(vec![0, 2, 5]);
        let err = contour_labels(&engine, &labeled_points(), &ContourLabelsOptions::default())
            .unwrap_err();
        assert!(matches!(err, VoxgridError::InvalidArgument(_)));
    }

    #[test]
    fn test_options_from_json() {
        let options = ContourLabelsOptions::from_json(
            r#"{"boundary_style": "strict_external", "select_inputs": 2, "smoothing": true,
                "smoothing_num_iterations": 4}"#,
        )
        .unwrap();
        assert_eq!(options.boundary_style, BoundaryStyle::StrictExternal);
        assert_eq!(options.select_inputs, Some(vec![2.0]));
        assert_eq!(options.smoothing_params.iterations, 4);
        assert!(options.pad_background);

        let err = ContourLabelsOptions::from_json(r#"{"boundary_style": "outer"}"#).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid `boundary_style` \"outer\", use \"external\", \"internal\", \"all\", or \
             \"strict_external\"."
        );
    }
}
