use std::{path::Path, time::Duration};

use crate::{
    foundation::{core::FrameIndex, error::ConvertResult},
    render::{chrome::ChromeBackend, frames::RenderOpts},
};

/// An engine that hosts the animation player and captures its output.
///
/// Calls arrive strictly in order: one `load`, then `seek`/`capture_png` pairs with increasing
/// frame indices, then `close`. Implementations own one page whose state is mutated in place,
/// so they are not shared between requests.
pub trait PlayerBackend {
    /// Open the host page and block until the player reports ready, failing after
    /// `ready_timeout`.
    fn load(&mut self, page: &Path, ready_timeout: Duration) -> ConvertResult<()>;

    /// Seek to `frame` (relative to the in-point) and pause there.
    fn seek(&mut self, frame: FrameIndex) -> ConvertResult<()>;

    /// Capture the viewport as PNG bytes.
    fn capture_png(&mut self) -> ConvertResult<Vec<u8>>;

    /// Release the engine. Called once rendering finishes; dropping must also release it.
    fn close(&mut self) -> ConvertResult<()> {
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BackendKind {
    /// Headless Chrome over the DevTools protocol.
    #[default]
    Chrome,
}

pub fn create_backend(kind: BackendKind, opts: &RenderOpts) -> ConvertResult<Box<dyn PlayerBackend>> {
    match kind {
        BackendKind::Chrome => Ok(Box::new(ChromeBackend::launch(opts)?)),
    }
}
