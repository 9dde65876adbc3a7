//! An owned image that operations can replace in place.

use voxgrid_core::{
    label_connectivity, ConnectivityOptions, ImageData, LabelEngine, PadOptions, RemeshOptions,
    Result,
};

/// Owns an [`ImageData`] and swaps in the result of an operation.
///
/// Operations on [`ImageData`] always return a new image. `ImageSlot` gives
/// the "modify my image" workflow on top of that: the contents are only
/// replaced when the operation succeeds, so a failed call leaves the slot as
/// it was.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageSlot {
    image: ImageData,
}

impl ImageSlot {
    #[must_use]
    pub fn new(image: ImageData) -> Self {
        Self { image }
    }

    #[must_use]
    pub fn get(&self) -> &ImageData {
        &self.image
    }

    /// Replaces the contents and returns the previous image.
    pub fn replace(&mut self, image: ImageData) -> ImageData {
        std::mem::replace(&mut self.image, image)
    }

    /// Runs `op` on the current image and stores its result on success.
    pub fn apply<F>(&mut self, op: F) -> Result<&ImageData>
    where
        F: FnOnce(&ImageData) -> Result<ImageData>,
    {
        let next = op(&self.image)?;
        self.image = next;
        Ok(&self.image)
    }

    pub fn points_to_cells(&mut self, options: &RemeshOptions) -> Result<&ImageData> {
        self.apply(|image| image.points_to_cells(options))
    }

    pub fn cells_to_points(&mut self, options: &RemeshOptions) -> Result<&ImageData> {
        self.apply(|image| image.cells_to_points(options))
    }

    pub fn pad_image(&mut self, options: &PadOptions) -> Result<&ImageData> {
        self.apply(|image| image.pad_image(options))
    }

    /// Labels connected regions and stores the labeled image.
    ///
    /// Returns the region labels and sizes.
    pub fn label_connectivity(
        &mut self,
        engine: &dyn LabelEngine,
        options: &ConnectivityOptions,
    ) -> Result<(Vec<i64>, Vec<usize>)> {
        let result = label_connectivity(engine, &self.image, options)?;
        self.image = result.image;
        Ok((result.labels, result.sizes))
    }

    #[must_use]
    pub fn into_inner(self) -> ImageData {
        self.image
    }
}

impl From<ImageData> for ImageSlot {
    fn from(image: ImageData) -> Self {
        Self::new(image)
    }
}
