pub mod annotation;
pub mod directive;
pub mod session;

pub use annotation::{AnnotationKind, AnnotationSpan};
pub use directive::ServiceOptions;
pub use session::{CheckSession, ParagraphRef, PendingRequest, TraversalCursor};
