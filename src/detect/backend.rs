use std::fmt;

use anyhow::Result;

use crate::detect::result::Detection;

/// The inference collaborator may not have its model loaded yet. Callers
/// detect this condition by downcasting the anyhow chain and treat the frame
/// as contributing zero detections rather than a fatal error.
#[derive(Clone, Copy, Debug)]
pub struct ModelNotReady;

impl fmt::Display for ModelNotReady {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("detection model not ready")
    }
}

impl std::error::Error for ModelNotReady {}

/// True when an inference error is the recoverable "model not ready" case.
pub fn is_model_not_ready(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ModelNotReady>().is_some()
}

/// Detector backend trait: the contract the engine requires from the
/// external inference service.
///
/// The engine never trains or loads models; it only consumes per-frame
/// detection lists. A backend failing with [`ModelNotReady`] degrades the
/// frame to zero detections at the call site.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame.
    ///
    /// Box coordinates must be expressed in the engine's declared area unit.
    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
