use crate::annotation::domain::annotation::Annotation;
use crate::shared::frame::Frame;

/// Draws annotations onto a frame in place.
///
/// Kept separate from [`FrameAnnotator`](crate::annotation::domain::frame_annotator::FrameAnnotator)
/// so annotating a frame never touches its pixels.
pub trait AnnotationRenderer: Send {
    fn render(
        &self,
        frame: &mut Frame,
        annotations: &[Annotation],
    ) -> Result<(), Box<dyn std::error::Error>>;
}
