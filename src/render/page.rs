use std::path::{Path, PathBuf};

use crate::{
    animation::model::Animation,
    foundation::{
        core::{FrameIndex, Viewport},
        error::{ConvertError, ConvertResult},
    },
};

/// lottie-web light build (SVG renderer only).
pub const DEFAULT_PLAYER_URL: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/lottie-web/5.7.8/lottie_light.min.js";

/// Where the host page gets the player library from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlayerScript {
    /// Referenced with `<script src>`.
    Url(String),
    /// Read from disk and inlined, for offline rendering.
    File(PathBuf),
}

impl Default for PlayerScript {
    fn default() -> Self {
        Self::Url(DEFAULT_PLAYER_URL.to_string())
    }
}

impl PlayerScript {
    /// `http(s)://` and `file://` are URLs, anything else is a local path.
    pub fn parse(s: &str) -> Self {
        let lower = s.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("file://")
        {
            Self::Url(s.to_string())
        } else {
            Self::File(PathBuf::from(s))
        }
    }

    fn to_tag(&self) -> ConvertResult<String> {
        match self {
            Self::Url(url) => Ok(format!(
                r#"<script src="{}"></script>"#,
                url.replace('"', "%22")
            )),
            Self::File(path) => {
                let body = std::fs::read_to_string(path)
                    .map_err(|e| ConvertError::io_at("read player script", path, e))?;
                Ok(format!(
                    "<script>\n{}\n</script>",
                    body.replace("</script", "<\\/script")
                ))
            }
        }
    }
}

/// State reported by [`READY_PROBE_JS`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlayerState {
    Pending,
    Ready,
    /// The player library never defined its global.
    MissingPlayer,
    /// A script error was raised on the page.
    Failed(String),
}

impl PlayerState {
    pub fn from_probe(value: Option<&serde_json::Value>) -> Self {
        let Some(s) = value.and_then(|v| v.as_str()) else {
            return Self::Pending;
        };
        match s {
            "ready" => Self::Ready,
            "missing" => Self::MissingPlayer,
            other => match other.strip_prefix("error:") {
                Some(msg) => Self::Failed(msg.to_string()),
                None => Self::Pending,
            },
        }
    }
}

/// Evaluates to `"ready"`, `"pending"`, `"missing"` or `"error:<message>"`.
pub const READY_PROBE_JS: &str = r#"(function () {
    if (document.readyState === 'complete' && typeof lottie === 'undefined') { return 'missing'; }
    if (window.__playerError) { return 'error:' + window.__playerError; }
    if (window.animation && window.animation.isLoaded === true) { return 'ready'; }
    return 'pending';
})()"#;

/// Seek the player to `frame` (relative to `ip`) and hold it there.
pub fn seek_js(frame: FrameIndex) -> String {
    format!("window.animation.goToAndStop({}, true); true", frame.0)
}

/// Build the HTML document that hosts the player.
pub fn build_host_page(
    anim: &Animation,
    viewport: Viewport,
    script: &PlayerScript,
) -> ConvertResult<String> {
    let data = escape_inline_script(&anim.to_json_string()?);
    let player_tag = script.to_tag()?;
    let (w, h) = (viewport.width, viewport.height);

    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>sticker</title>
<style>
html, body {{ margin: 0; padding: 0; overflow: hidden; background: transparent; }}
#animationContainer {{ width: {w}px; height: {h}px; }}
</style>
</head>
<body>
<div id="animationContainer"></div>
<script>
window.__playerError = null;
window.addEventListener('error', function (e) {{ window.__playerError = String(e.message || e); }});
</script>
{player_tag}
<script>
window.animationData = {data};
window.animation = null;
document.addEventListener('DOMContentLoaded', function () {{
    window.animation = lottie.loadAnimation({{
        container: document.getElementById('animationContainer'),
        renderer: 'svg',
        loop: false,
        autoplay: false,
        animationData: window.animationData,
    }});
}});
</script>
</body>
</html>
"#
    ))
}

pub fn write_host_page(
    path: &Path,
    anim: &Animation,
    viewport: Viewport,
    script: &PlayerScript,
) -> ConvertResult<()> {
    let html = build_host_page(anim, viewport, script)?;
    std::fs::write(path, html).map_err(|e| ConvertError::io_at("write host page", path, e))
}

/// `file://` URL for an absolute path.
pub fn file_url(path: &Path) -> String {
    let raw = path.to_string_lossy().replace('\\', "/");
    let mut out = String::from("file://");
    if !raw.starts_with('/') {
        out.push('/');
    }
    for b in raw.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'/' | b'-' | b'_' | b'.' | b'~' | b':' => {
                out.push(char::from(b))
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

fn escape_inline_script(s: &str) -> String {
    s.replace("</", "<\\/")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

#[cfg(test)]
#[path = "../../tests/unit/render/page.rs"]
mod tests;
