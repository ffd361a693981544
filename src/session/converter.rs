use std::path::{Path, PathBuf};

use crate::{
    animation::model::Animation,
    assemble::gif::{
        DEFAULT_GIF_SPEED, GifArtifact, GifLoop, GifOpts, assemble_gif, delay_for_frame_rate,
    },
    decode::tgs::decode_file,
    encode::transcode::{TranscodeConfig, ensure_parent_dir, gif_to_mp4, gif_to_webp},
    foundation::error::{ConvertError, ConvertResult},
    render::{
        backend::{BackendKind, PlayerBackend, create_backend},
        frames::{RenderOpts, render_frames},
    },
    session::workspace::Workspace,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Gif,
    Webp,
    Mp4,
}

impl OutputFormat {
    /// Infer the format from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> ConvertResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("gif") => Ok(Self::Gif),
            Some("webp") => Ok(Self::Webp),
            Some("mp4") => Ok(Self::Mp4),
            _ => Err(ConvertError::validation(format!(
                "cannot infer output format from '{}' (expected .gif, .webp or .mp4)",
                path.display()
            ))),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Gif => "gif",
            Self::Webp => "webp",
            Self::Mp4 => "mp4",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputTarget {
    pub format: OutputFormat,
    pub path: PathBuf,
}

impl OutputTarget {
    pub fn new(format: OutputFormat, path: impl Into<PathBuf>) -> Self {
        Self {
            format,
            path: path.into(),
        }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> ConvertResult<Self> {
        let path = path.into();
        Ok(Self {
            format: OutputFormat::from_path(&path)?,
            path,
        })
    }
}

/// How the GIF per-frame delay is chosen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GifTiming {
    /// `1000 / fr` ms, so the GIF plays at the animation's own speed.
    #[default]
    FromFrameRate,
    FixedMs(u32),
}

/// Options for a [`Converter`].
#[derive(Clone, Debug)]
pub struct ConvertOpts {
    pub backend: BackendKind,
    pub render: RenderOpts,
    pub gif_timing: GifTiming,
    pub gif_loop: GifLoop,
    pub gif_speed: i32,
    pub transcode: TranscodeConfig,
    /// Parent for per-request workspaces; the system temp dir when `None`.
    pub work_root: Option<PathBuf>,
}

impl Default for ConvertOpts {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            render: RenderOpts::default(),
            gif_timing: GifTiming::default(),
            gif_loop: GifLoop::Forever,
            gif_speed: DEFAULT_GIF_SPEED,
            transcode: TranscodeConfig::default(),
            work_root: None,
        }
    }
}

impl ConvertOpts {
    pub fn validate(&self) -> ConvertResult<()> {
        self.render.validate()?;
        self.transcode.validate()?;
        self.gif_opts_for_rate(1.0).validate()
    }

    pub fn gif_opts(&self, anim: &Animation) -> GifOpts {
        self.gif_opts_for_rate(anim.frame_rate())
    }

    fn gif_opts_for_rate(&self, frame_rate: f64) -> GifOpts {
        let delay_ms = match self.gif_timing {
            GifTiming::FromFrameRate => delay_for_frame_rate(frame_rate),
            GifTiming::FixedMs(ms) => ms,
        };
        GifOpts {
            delay_ms,
            repeat: self.gif_loop,
            speed: self.gif_speed,
        }
    }
}

type BackendFactory = dyn Fn(&RenderOpts) -> ConvertResult<Box<dyn PlayerBackend>>;

/// Converts one sticker file into GIF, WebP and MP4 outputs.
///
/// Every call runs in its own [`Workspace`], so repeated or interleaved calls on one converter
/// (or on several converters) never share working files. The workspace is removed when the call
/// returns, whether it succeeded or not.
pub struct Converter {
    input: PathBuf,
    opts: ConvertOpts,
    backend_factory: Option<Box<BackendFactory>>,
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("input", &self.input)
            .field("opts", &self.opts)
            .field("custom_backend", &self.backend_factory.is_some())
            .finish()
    }
}

impl Converter {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            opts: ConvertOpts::default(),
            backend_factory: None,
        }
    }

    pub fn with_opts(mut self, opts: ConvertOpts) -> Self {
        self.opts = opts;
        self
    }

    /// Replace the rendering engine, e.g. with a test double.
    pub fn with_backend_factory(
        mut self,
        factory: impl Fn(&RenderOpts) -> ConvertResult<Box<dyn PlayerBackend>> + 'static,
    ) -> Self {
        self.backend_factory = Some(Box::new(factory));
        self
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn opts(&self) -> &ConvertOpts {
        &self.opts
    }

    /// Decode the input without rendering anything.
    pub fn decode(&self) -> ConvertResult<Animation> {
        decode_file(&self.input)
    }

    pub fn convert_to_gif(&self, out: impl AsRef<Path>) -> ConvertResult<PathBuf> {
        self.convert_one(OutputFormat::Gif, out.as_ref())
    }

    pub fn convert_to_webp(&self, out: impl AsRef<Path>) -> ConvertResult<PathBuf> {
        self.convert_one(OutputFormat::Webp, out.as_ref())
    }

    pub fn convert_to_mp4(&self, out: impl AsRef<Path>) -> ConvertResult<PathBuf> {
        self.convert_one(OutputFormat::Mp4, out.as_ref())
    }

    /// Render once and derive every target from the same GIF.
    ///
    /// Targets are produced in the given order; the first failure aborts the rest.
    #[tracing::instrument(skip_all, fields(input = %self.input.display(), targets = targets.len()))]
    pub fn convert(&self, targets: &[OutputTarget]) -> ConvertResult<Vec<PathBuf>> {
        if targets.is_empty() {
            return Err(ConvertError::validation("no output targets requested"));
        }
        self.opts.validate()?;
        if !self.opts.transcode.overwrite
            && let Some(existing) = targets.iter().find(|t| t.path.exists())
        {
            return Err(ConvertError::validation(format!(
                "output file '{}' already exists",
                existing.path.display()
            )));
        }

        let anim = self.decode()?;
        let mut workspace = self.create_workspace()?;
        anim.write_json(&workspace.animation_json_path())?;

        let gif_path = targets
            .iter()
            .find(|t| t.format == OutputFormat::Gif)
            .map(|t| t.path.clone())
            .unwrap_or_else(|| workspace.gif_path());
        let gif = self.render_gif(&anim, &workspace, &gif_path)?;

        let mut written = Vec::with_capacity(targets.len());
        for target in targets {
            let path = match target.format {
                OutputFormat::Gif => copy_gif(&gif, &target.path)?,
                OutputFormat::Webp => gif_to_webp(&gif.path, &target.path, &self.opts.transcode)?,
                OutputFormat::Mp4 => gif_to_mp4(&gif.path, &target.path, &self.opts.transcode)?,
            };
            written.push(path);
        }

        workspace.cleanup();
        Ok(written)
    }

    fn convert_one(&self, format: OutputFormat, out: &Path) -> ConvertResult<PathBuf> {
        let mut written = self.convert(&[OutputTarget::new(format, out)])?;
        written
            .pop()
            .ok_or_else(|| ConvertError::validation("conversion produced no output"))
    }

    fn create_workspace(&self) -> ConvertResult<Workspace> {
        match &self.opts.work_root {
            Some(root) => Workspace::create_in(root),
            None => Workspace::create(),
        }
    }

    fn create_backend(&self) -> ConvertResult<Box<dyn PlayerBackend>> {
        match &self.backend_factory {
            Some(factory) => factory(&self.opts.render),
            None => create_backend(self.opts.backend, &self.opts.render),
        }
    }

    fn render_gif(
        &self,
        anim: &Animation,
        workspace: &Workspace,
        out: &Path,
    ) -> ConvertResult<GifArtifact> {
        let frames = {
            let mut backend = self.create_backend()?;
            render_frames(anim, backend.as_mut(), workspace, &self.opts.render)?
        };

        let gif = assemble_gif(&frames.dir, out, &self.opts.gif_opts(anim))?;
        if gif.frames != frames.len() {
            return Err(ConvertError::render(format!(
                "rendered {} frames but assembled {}",
                frames.len(),
                gif.frames
            )));
        }
        Ok(gif)
    }
}

fn copy_gif(gif: &GifArtifact, dest: &Path) -> ConvertResult<PathBuf> {
    if gif.path != dest {
        ensure_parent_dir(dest)?;
        std::fs::copy(&gif.path, dest).map_err(|e| ConvertError::io_at("copy gif to", dest, e))?;
    }
    Ok(dest.to_path_buf())
}

#[cfg(test)]
#[path = "../../tests/unit/session/converter.rs"]
mod tests;
