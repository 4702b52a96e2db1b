//! Image source port for acquiring images from various sources.

use crate::domain::RawImage;
use crate::error::AcquireError;

/// Port for acquiring images from a source.
pub trait ImageSource: Send + Sync {
    /// Returns an iterator over images from this source.
    ///
    /// Each yielded image carries an identifier unique within the iteration.
    ///
    /// # Errors
    ///
    /// Individual items are errors if an image cannot be read; the error
    /// keeps the identifier and path the image would have had.
    fn images(&self) -> Box<dyn Iterator<Item = Result<RawImage, AcquireError>> + Send + '_>;

    /// Returns the total number of images, if known.
    fn count_hint(&self) -> Option<usize>;
}
