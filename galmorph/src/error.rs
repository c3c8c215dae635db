use thiserror::Error;

/// Errors raised when the inputs to a morphology analysis violate the
/// collaborator contract.
///
/// Numerical failures inside the engine (a crossing that cannot be located,
/// a search that does not converge) are never reported through this type;
/// they surface as NaN statistics with companion [`Flag`](crate::result::Flag)
/// values so one bad statistic cannot abort the rest of the source.
#[derive(Error, Debug)]
pub enum MorphError {
    /// Science image and segmentation map have different shapes.
    #[error("image shape {image:?} does not match segmentation shape {segmap:?}")]
    ShapeMismatch {
        /// Science image shape (rows, cols).
        image: (usize, usize),
        /// Segmentation map shape (rows, cols).
        segmap: (usize, usize),
    },

    /// Science image has zero rows or columns.
    #[error("science image is empty")]
    EmptyImage,

    /// Catalog record fails a geometric invariant.
    #[error("invalid catalog record: {0}")]
    InvalidRecord(String),

    /// Segmentation map flags every pixel as belonging to a source, so no
    /// background sample exists.
    #[error("no background pixels available (segmentation covers entire frame)")]
    NoBackgroundPixels,
}
