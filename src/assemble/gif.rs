use std::path::{Path, PathBuf};

use image::{
    Delay, Frame, RgbaImage,
    codecs::gif::{GifEncoder, Repeat},
    imageops::FilterType,
};

use crate::{
    encode::transcode::ensure_parent_dir,
    foundation::error::{ConvertError, ConvertResult},
};

/// Shortest delay emitted when deriving it from a frame rate. Viewers treat smaller GIF delays
/// as 100 ms.
pub const MIN_GIF_DELAY_MS: u32 = 20;

/// Longest delay a GIF frame can hold (`u16::MAX` centiseconds).
pub const MAX_GIF_DELAY_MS: u32 = u16::MAX as u32 * 10;

/// Legacy fixed delay.
pub const DEFAULT_GIF_DELAY_MS: u32 = 100;

/// Encoder speed/quality trade-off (1 = best, 30 = fastest).
pub const DEFAULT_GIF_SPEED: i32 = 10;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GifLoop {
    #[default]
    Forever,
    Times(u16),
}

/// Options for [`assemble_gif`].
#[derive(Clone, Debug)]
pub struct GifOpts {
    pub delay_ms: u32,
    pub repeat: GifLoop,
    pub speed: i32,
}

impl Default for GifOpts {
    fn default() -> Self {
        Self {
            delay_ms: DEFAULT_GIF_DELAY_MS,
            repeat: GifLoop::Forever,
            speed: DEFAULT_GIF_SPEED,
        }
    }
}

impl GifOpts {
    pub fn validate(&self) -> ConvertResult<()> {
        if self.delay_ms == 0 {
            return Err(ConvertError::validation("gif frame delay must be non-zero"));
        }
        if !(1..=30).contains(&self.speed) {
            return Err(ConvertError::validation("gif speed must be in 1..=30"));
        }
        Ok(())
    }
}

/// Per-frame delay matching `frame_rate`, rounded to the GIF's 10 ms resolution.
pub fn delay_for_frame_rate(frame_rate: f64) -> u32 {
    if !frame_rate.is_finite() || frame_rate <= 0.0 {
        return DEFAULT_GIF_DELAY_MS;
    }
    let cs = (100.0 / frame_rate).round();
    let ms = (cs * 10.0).min(f64::from(MAX_GIF_DELAY_MS)) as u32;
    ms.max(MIN_GIF_DELAY_MS)
}

/// The delay a GIF actually stores for `delay_ms`: whole centiseconds, at least one.
pub fn stored_gif_delay_ms(delay_ms: u32) -> u32 {
    let cs = delay_ms.saturating_add(5) / 10;
    cs.clamp(1, u32::from(u16::MAX)) * 10
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameFile {
    pub index: u64,
    pub path: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GifArtifact {
    pub path: PathBuf,
    pub frames: usize,
    pub width: u32,
    pub height: u32,
    pub delay_ms: u32,
}

/// First run of ASCII digits in `name`.
pub fn frame_number(name: &str) -> Option<u64> {
    let start = name.find(|c: char| c.is_ascii_digit())?;
    let digits: &str = &name[start..];
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse().ok()
}

/// List the PNG frames in `dir`, ordered by their embedded index.
///
/// Directory listing order is never trusted: `frame_2.png` sorts before `frame_10.png`.
pub fn collect_frames(dir: &Path) -> ConvertResult<Vec<FrameFile>> {
    let entries = std::fs::read_dir(dir).map_err(|e| ConvertError::io_at("list frames in", dir, e))?;

    let mut frames = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConvertError::io_at("list frames in", dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_png = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("png"));
        if !is_png {
            continue;
        }
        let Some(index) = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(frame_number)
        else {
            tracing::debug!(path = %path.display(), "skipping frame without an index");
            continue;
        };
        frames.push(FrameFile { index, path });
    }

    frames.sort_by(|a, b| a.index.cmp(&b.index).then_with(|| a.path.cmp(&b.path)));
    Ok(frames)
}

/// Encode the frames in `frames_dir` into an animated GIF at `out`.
///
/// Fails with [`ConvertError::EmptyInput`] before touching `out` when there are no frames.
/// Frames that differ in size from the first one are scaled to match it.
#[tracing::instrument(skip(opts), fields(delay_ms = opts.delay_ms))]
pub fn assemble_gif(frames_dir: &Path, out: &Path, opts: &GifOpts) -> ConvertResult<GifArtifact> {
    opts.validate()?;

    let frames = collect_frames(frames_dir)?;
    let Some(first) = frames.first() else {
        return Err(ConvertError::empty_input(format!(
            "no png frames in '{}'",
            frames_dir.display()
        )));
    };

    let first_img = load_rgba(&first.path)?;
    let (width, height) = first_img.dimensions();

    let delay_ms = stored_gif_delay_ms(opts.delay_ms);
    let mut bytes = Vec::new();
    {
        let mut encoder = GifEncoder::new_with_speed(&mut bytes, opts.speed);
        let repeat = match opts.repeat {
            GifLoop::Forever => Repeat::Infinite,
            GifLoop::Times(n) => Repeat::Finite(n),
        };
        encoder
            .set_repeat(repeat)
            .map_err(|e| gif_error(out, e))?;

        let delay = Delay::from_numer_denom_ms(delay_ms, 1);
        let mut pending_first = Some(first_img);
        for frame in &frames {
            let img = match pending_first.take() {
                Some(img) => img,
                None => load_rgba(&frame.path)?,
            };
            let img = if img.dimensions() == (width, height) {
                img
            } else {
                image::imageops::resize(&img, width, height, FilterType::Triangle)
            };
            encoder
                .encode_frame(Frame::from_parts(img, 0, 0, delay))
                .map_err(|e| gif_error(out, e))?;
            tracing::trace!(frame = frame.index, "added frame");
        }
    }

    ensure_parent_dir(out)?;
    std::fs::write(out, &bytes).map_err(|e| ConvertError::io_at("write gif", out, e))?;
    tracing::info!(path = %out.display(), frames = frames.len(), "assembled gif");

    Ok(GifArtifact {
        path: out.to_path_buf(),
        frames: frames.len(),
        width,
        height,
        delay_ms,
    })
}

fn load_rgba(path: &Path) -> ConvertResult<RgbaImage> {
    let img = image::open(path).map_err(|e| match e {
        image::ImageError::IoError(io) => ConvertError::io_at("read frame", path, io),
        other => ConvertError::Other(
            anyhow::Error::new(other).context(format!("decode frame '{}'", path.display())),
        ),
    })?;
    Ok(img.to_rgba8())
}

fn gif_error(out: &Path, e: image::ImageError) -> ConvertError {
    match e {
        image::ImageError::IoError(io) => ConvertError::io_at("write gif", out, io),
        other => ConvertError::Other(
            anyhow::Error::new(other).context(format!("encode gif '{}'", out.display())),
        ),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assemble/gif.rs"]
mod tests;
