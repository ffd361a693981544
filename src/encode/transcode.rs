use std::{
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use crate::foundation::error::{ConvertError, ConvertResult};

pub const DEFAULT_WEBP_QUALITY: u8 = 80;

/// Which external program produces WebP output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WebpTool {
    /// `gif2webp` when it is on PATH, `ffmpeg` otherwise.
    #[default]
    Auto,
    Gif2Webp,
    Ffmpeg,
}

#[derive(Clone, Debug)]
pub struct TranscodeConfig {
    /// WebP quality, 0..=100.
    pub webp_quality: u8,
    pub webp_tool: WebpTool,
    pub ffmpeg: PathBuf,
    pub gif2webp: PathBuf,
    pub overwrite: bool,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            webp_quality: DEFAULT_WEBP_QUALITY,
            webp_tool: WebpTool::Auto,
            ffmpeg: PathBuf::from("ffmpeg"),
            gif2webp: PathBuf::from("gif2webp"),
            overwrite: true,
        }
    }
}

impl TranscodeConfig {
    pub fn validate(&self) -> ConvertResult<()> {
        if self.webp_quality > 100 {
            return Err(ConvertError::validation("webp quality must be in 0..=100"));
        }
        Ok(())
    }
}

pub fn is_tool_on_path(program: &Path, version_flag: &str) -> bool {
    Command::new(program)
        .arg(version_flag)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn is_ffmpeg_on_path() -> bool {
    is_tool_on_path(Path::new("ffmpeg"), "-version")
}

pub fn ensure_parent_dir(path: &Path) -> ConvertResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| ConvertError::io_at("create output directory", parent, e))?;
    }
    Ok(())
}

/// Re-encode an animated GIF as animated WebP.
#[tracing::instrument(skip(cfg))]
pub fn gif_to_webp(gif: &Path, out: &Path, cfg: &TranscodeConfig) -> ConvertResult<PathBuf> {
    cfg.validate()?;
    prepare_output(gif, out, cfg)?;

    let quality = cfg.webp_quality.to_string();
    let cmd = match resolve_webp_tool(cfg) {
        WebpTool::Gif2Webp => {
            let mut cmd = Command::new(&cfg.gif2webp);
            cmd.args(["-quiet", "-q", quality.as_str()])
                .arg(gif)
                .arg("-o")
                .arg(out);
            cmd
        }
        _ => {
            let mut cmd = ffmpeg_command(cfg);
            cmd.arg("-i")
                .arg(gif)
                .args([
                    "-c:v",
                    "libwebp",
                    "-quality",
                    quality.as_str(),
                    "-loop",
                    "0",
                    "-f",
                    "webp",
                ])
                .arg(out);
            cmd
        }
    };

    run_tool(cmd)?;
    check_output(out)?;
    tracing::info!(path = %out.display(), "wrote webp");
    Ok(out.to_path_buf())
}

/// Re-encode an animated GIF as H.264 MP4 with encoder defaults.
#[tracing::instrument(skip(cfg))]
pub fn gif_to_mp4(gif: &Path, out: &Path, cfg: &TranscodeConfig) -> ConvertResult<PathBuf> {
    cfg.validate()?;
    prepare_output(gif, out, cfg)?;

    let mut cmd = ffmpeg_command(cfg);
    cmd.arg("-i")
        .arg(gif)
        .args([
            "-an",
            "-c:v",
            "libx264",
            // yuv420p needs even dimensions.
            "-vf",
            "scale=trunc(iw/2)*2:trunc(ih/2)*2",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ])
        .arg(out);

    run_tool(cmd)?;
    check_output(out)?;
    tracing::info!(path = %out.display(), "wrote mp4");
    Ok(out.to_path_buf())
}

fn ffmpeg_command(cfg: &TranscodeConfig) -> Command {
    let mut cmd = Command::new(&cfg.ffmpeg);
    cmd.arg(if cfg.overwrite { "-y" } else { "-n" })
        .args(["-loglevel", "error"]);
    cmd
}

fn resolve_webp_tool(cfg: &TranscodeConfig) -> WebpTool {
    match cfg.webp_tool {
        WebpTool::Auto if is_tool_on_path(&cfg.gif2webp, "-version") => WebpTool::Gif2Webp,
        WebpTool::Auto => WebpTool::Ffmpeg,
        other => other,
    }
}

fn prepare_output(input: &Path, out: &Path, cfg: &TranscodeConfig) -> ConvertResult<()> {
    if !input.is_file() {
        return Err(ConvertError::io_at(
            "read gif",
            input,
            std::io::Error::from(std::io::ErrorKind::NotFound),
        ));
    }
    if !cfg.overwrite && out.exists() {
        return Err(ConvertError::validation(format!(
            "output file '{}' already exists",
            out.display()
        )));
    }
    ensure_parent_dir(out)
}

fn run_tool(mut cmd: Command) -> ConvertResult<()> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    tracing::debug!(command = ?cmd, "spawning encoder");

    let output = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| {
            ConvertError::transcode(format!(
                "failed to spawn {program} (is it installed and on PATH?): {e}"
            ))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ConvertError::transcode(format!(
            "{program} exited with status {}: {}",
            output.status,
            stderr.trim()
        )));
    }
    Ok(())
}

fn check_output(out: &Path) -> ConvertResult<()> {
    let len = std::fs::metadata(out)
        .map_err(|e| ConvertError::transcode(format!("encoder produced no output '{}': {e}", out.display())))?
        .len();
    if len == 0 {
        return Err(ConvertError::transcode(format!(
            "encoder produced an empty file '{}'",
            out.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/transcode.rs"]
mod tests;
