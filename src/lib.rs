//! tgsconv converts animated stickers (TGS: gzip-compressed Lottie JSON) into GIF, WebP and MP4.
//!
//! # Pipeline overview
//!
//! 1. **Decode**: inflate and parse the sticker into an [`Animation`]
//! 2. **Render**: load the animation into the lottie-web player in headless Chrome, seek to every
//!    frame and capture it as PNG ([`render_frames`])
//! 3. **Assemble**: encode the ordered frames as an animated GIF ([`assemble_gif`])
//! 4. **Transcode** (optional): hand the GIF to `gif2webp` / `ffmpeg` ([`gif_to_webp`],
//!    [`gif_to_mp4`])
//!
//! [`Converter`] runs the whole pipeline inside a per-request [`Workspace`] that is removed when
//! the request finishes.
#![forbid(unsafe_code)]

mod animation;
mod assemble;
mod decode;
mod encode;
mod foundation;
mod render;
mod session;

pub use animation::model::{Animation, AnimationHeader, MAX_FRAMES};
pub use assemble::gif::{
    DEFAULT_GIF_DELAY_MS, DEFAULT_GIF_SPEED, FrameFile, GifArtifact, GifLoop, GifOpts,
    MAX_GIF_DELAY_MS, MIN_GIF_DELAY_MS, assemble_gif, collect_frames, delay_for_frame_rate,
    frame_number, stored_gif_delay_ms,
};
pub use decode::tgs::{
    Compression, MAX_INFLATED_BYTES, decode_bytes, decode_file, detect_compression,
    inflate_to_string,
};
pub use encode::transcode::{
    DEFAULT_WEBP_QUALITY, TranscodeConfig, WebpTool, ensure_parent_dir, gif_to_mp4, gif_to_webp,
    is_ffmpeg_on_path, is_tool_on_path,
};
pub use foundation::core::{FrameIndex, FrameRange, Viewport};
pub use foundation::error::{ConvertError, ConvertResult};
pub use render::backend::{BackendKind, PlayerBackend, create_backend};
pub use render::chrome::{ChromeBackend, ChromeOpts};
pub use render::frames::{
    FramePacing, FrameSet, MAX_PACING_WAIT, RenderOpts, frame_file_name, render_frames,
};
pub use render::page::{
    DEFAULT_PLAYER_URL, PlayerScript, PlayerState, READY_PROBE_JS, build_host_page, seek_js,
};
pub use session::converter::{
    ConvertOpts, Converter, GifTiming, OutputFormat, OutputTarget,
};
pub use session::workspace::Workspace;
