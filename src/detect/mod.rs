mod backend;
mod backends;
mod nms;
mod result;

pub use backend::{is_model_not_ready, DetectorBackend, ModelNotReady};
pub use backends::StubBackend;
pub use nms::suppress;
pub use result::Detection;
