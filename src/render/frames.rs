use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use crate::{
    animation::model::Animation,
    foundation::{
        core::{FrameIndex, Viewport},
        error::{ConvertError, ConvertResult},
    },
    render::{
        backend::PlayerBackend,
        chrome::ChromeOpts,
        page::{PlayerScript, write_host_page},
    },
    session::workspace::Workspace,
};

/// No pacing wait ever exceeds this.
pub const MAX_PACING_WAIT: Duration = Duration::from_secs(1);

/// Delay inserted after each captured frame.
///
/// Seeking is exact, so pacing never affects which pixels are captured; it only gives slow
/// engines time to settle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FramePacing {
    /// Capture back to back.
    #[default]
    None,
    /// Wait a fixed duration after each frame.
    Settle(Duration),
    /// Wait out the rest of the frame's real-time duration (`1000 / fr` ms minus capture time).
    RealTime,
}

impl FramePacing {
    pub fn wait_after(self, frame_duration: Duration, elapsed: Duration) -> Duration {
        let wait = match self {
            Self::None => Duration::ZERO,
            Self::Settle(d) => d,
            Self::RealTime => frame_duration.saturating_sub(elapsed),
        };
        wait.min(MAX_PACING_WAIT)
    }
}

/// Options for [`render_frames`].
#[derive(Clone, Debug)]
pub struct RenderOpts {
    /// Captured frame size.
    pub viewport: Viewport,
    /// Bound on waiting for the player to initialize.
    pub ready_timeout: Duration,
    /// Bound on each engine call (navigation, seek, screenshot).
    pub capture_timeout: Duration,
    pub pacing: FramePacing,
    pub player_script: PlayerScript,
    pub chrome: ChromeOpts,
}

impl Default for RenderOpts {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            ready_timeout: Duration::from_secs(5),
            capture_timeout: Duration::from_secs(30),
            pacing: FramePacing::None,
            player_script: PlayerScript::default(),
            chrome: ChromeOpts::default(),
        }
    }
}

impl RenderOpts {
    pub fn validate(&self) -> ConvertResult<()> {
        self.viewport.validate()?;
        if self.ready_timeout.is_zero() {
            return Err(ConvertError::validation("ready timeout must be non-zero"));
        }
        if self.capture_timeout.is_zero() {
            return Err(ConvertError::validation("capture timeout must be non-zero"));
        }
        Ok(())
    }
}

/// Frames written by [`render_frames`], in index order.
#[derive(Clone, Debug)]
pub struct FrameSet {
    pub dir: PathBuf,
    pub frames: Vec<PathBuf>,
    pub viewport: Viewport,
}

impl FrameSet {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

pub fn frame_file_name(idx: FrameIndex) -> String {
    format!("frame_{}.png", idx.0)
}

/// Drive `backend` through every frame of `anim`, writing one PNG per frame into the
/// workspace's frame directory.
///
/// Frames are produced strictly in increasing index order; the first failure aborts.
#[tracing::instrument(skip_all, fields(frames = anim.frame_count()))]
pub fn render_frames(
    anim: &Animation,
    backend: &mut dyn PlayerBackend,
    workspace: &Workspace,
    opts: &RenderOpts,
) -> ConvertResult<FrameSet> {
    opts.validate()?;

    let page = workspace.page_path();
    write_host_page(&page, anim, opts.viewport, &opts.player_script)?;
    let dir = workspace.ensure_frames_dir()?;

    backend.load(&page, opts.ready_timeout)?;
    tracing::debug!("player ready");

    let frame_duration = frame_duration(anim.frame_rate());
    let mut frames = Vec::with_capacity(anim.frame_count() as usize);

    for idx in anim.frame_range().iter() {
        let started = Instant::now();

        backend.seek(idx)?;
        let png = backend.capture_png()?;

        let path = dir.join(frame_file_name(idx));
        write_frame_png(&path, &png, opts.viewport)?;
        tracing::trace!(frame = idx.0, path = %path.display(), "captured frame");
        frames.push(path);

        let wait = opts.pacing.wait_after(frame_duration, started.elapsed());
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }
    }

    backend.close()?;
    tracing::info!(frames = frames.len(), "rendered frames");

    Ok(FrameSet {
        dir,
        frames,
        viewport: opts.viewport,
    })
}

/// Real-time length of one frame. Rates too small for a `Duration` saturate to the pacing cap.
fn frame_duration(frame_rate: f64) -> Duration {
    Duration::try_from_secs_f64(1.0 / frame_rate).map_or(MAX_PACING_WAIT, |d| d.min(MAX_PACING_WAIT))
}

/// Write a captured frame, normalizing its size to the viewport.
fn write_frame_png(path: &Path, png: &[u8], viewport: Viewport) -> ConvertResult<()> {
    let img = image::load_from_memory_with_format(png, image::ImageFormat::Png)
        .map_err(|e| ConvertError::render(format!("engine returned an undecodable frame: {e}")))?;

    if img.width() == viewport.width && img.height() == viewport.height {
        return std::fs::write(path, png).map_err(|e| ConvertError::io_at("write frame", path, e));
    }

    tracing::debug!(
        got_w = img.width(),
        got_h = img.height(),
        "resizing captured frame to viewport"
    );
    let resized = image::imageops::resize(
        &img.to_rgba8(),
        viewport.width,
        viewport.height,
        image::imageops::FilterType::Triangle,
    );
    resized
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| match e {
            image::ImageError::IoError(io) => ConvertError::io_at("write frame", path, io),
            other => ConvertError::render(format!("re-encode frame: {other}")),
        })
}

#[cfg(test)]
#[path = "../../tests/unit/render/frames.rs"]
mod tests;
