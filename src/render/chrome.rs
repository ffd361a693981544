use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use headless_chrome::{Browser, LaunchOptions, Tab, protocol::cdp::Page};

use crate::{
    foundation::{
        core::{FrameIndex, Viewport},
        error::{ConvertError, ConvertResult},
    },
    render::{
        backend::PlayerBackend,
        frames::RenderOpts,
        page::{PlayerState, READY_PROBE_JS, file_url, seek_js},
    },
};

const READY_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Browser process settings.
#[derive(Clone, Debug)]
pub struct ChromeOpts {
    /// Browser executable; auto-detected when `None`.
    pub path: Option<PathBuf>,
    pub headless: bool,
    /// Disable to run as root inside containers.
    pub sandbox: bool,
}

impl Default for ChromeOpts {
    fn default() -> Self {
        Self {
            path: None,
            headless: true,
            sandbox: true,
        }
    }
}

pub struct ChromeBackend {
    browser: Option<Browser>,
    tab: Arc<Tab>,
    viewport: Viewport,
}

impl ChromeBackend {
    /// Launch a browser and open one tab sized to the viewport.
    ///
    /// Every DevTools call on the tab is bounded by `opts.capture_timeout`.
    pub fn launch(opts: &RenderOpts) -> ConvertResult<Self> {
        opts.viewport.validate()?;

        let idle = opts.capture_timeout.max(opts.ready_timeout) + Duration::from_secs(30);
        let launch = LaunchOptions::default_builder()
            .headless(opts.chrome.headless)
            .sandbox(opts.chrome.sandbox)
            .window_size(Some((opts.viewport.width, opts.viewport.height)))
            .path(opts.chrome.path.clone())
            .idle_browser_timeout(idle)
            .build()
            .map_err(|e| ConvertError::render(format!("invalid browser launch options: {e}")))?;

        let browser = Browser::new(launch)
            .map_err(|e| ConvertError::render(format!("failed to launch browser: {e:#}")))?;
        let tab = browser
            .new_tab()
            .map_err(|e| ConvertError::render(format!("failed to open browser tab: {e:#}")))?;
        tab.set_default_timeout(opts.capture_timeout);

        tracing::debug!(
            width = opts.viewport.width,
            height = opts.viewport.height,
            "browser launched"
        );

        Ok(Self {
            browser: Some(browser),
            tab,
            viewport: opts.viewport,
        })
    }

    fn probe(&self) -> ConvertResult<PlayerState> {
        let obj = self
            .tab
            .evaluate(READY_PROBE_JS, false)
            .map_err(|e| ConvertError::render(format!("player probe failed: {e:#}")))?;
        Ok(PlayerState::from_probe(obj.value.as_ref()))
    }
}

impl PlayerBackend for ChromeBackend {
    fn load(&mut self, page: &Path, ready_timeout: Duration) -> ConvertResult<()> {
        let page = page
            .canonicalize()
            .map_err(|e| ConvertError::io_at("resolve host page", page, e))?;
        let url = file_url(&page);

        self.tab
            .navigate_to(&url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| ConvertError::render(format!("failed to load host page: {e:#}")))?;

        wait_until_ready(ready_timeout, READY_POLL_INTERVAL, || self.probe())
    }

    fn seek(&mut self, frame: FrameIndex) -> ConvertResult<()> {
        self.tab
            .evaluate(&seek_js(frame), false)
            .map_err(|e| ConvertError::render(format!("seek to frame {} failed: {e:#}", frame.0)))?;
        Ok(())
    }

    fn capture_png(&mut self) -> ConvertResult<Vec<u8>> {
        let clip = Page::Viewport {
            x: 0.0,
            y: 0.0,
            width: f64::from(self.viewport.width),
            height: f64::from(self.viewport.height),
            scale: 1.0,
        };
        self.tab
            .capture_screenshot(
                Page::CaptureScreenshotFormatOption::Png,
                None,
                Some(clip),
                true,
            )
            .map_err(|e| ConvertError::render(format!("screenshot failed: {e:#}")))
    }

    fn close(&mut self) -> ConvertResult<()> {
        if let Some(browser) = self.browser.take() {
            // The browser process is killed on drop even if closing the tab fails.
            let _ = self.tab.close(false);
            drop(browser);
            tracing::debug!("browser closed");
        }
        Ok(())
    }
}

/// Poll `probe` every `interval` until the player is ready, failing after `timeout`.
///
/// A missing player library or a page script error fails immediately.
pub(crate) fn wait_until_ready(
    timeout: Duration,
    interval: Duration,
    mut probe: impl FnMut() -> ConvertResult<PlayerState>,
) -> ConvertResult<()> {
    let deadline = Instant::now() + timeout;
    loop {
        match probe()? {
            PlayerState::Ready => return Ok(()),
            PlayerState::MissingPlayer => {
                return Err(ConvertError::render(
                    "player script did not load (offline? try a local player script)",
                ));
            }
            PlayerState::Failed(msg) => {
                return Err(ConvertError::render(format!(
                    "player failed to initialize: {msg}"
                )));
            }
            PlayerState::Pending => {}
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(ConvertError::render(format!(
                "player not ready after {} ms",
                timeout.as_millis()
            )));
        }
        std::thread::sleep(interval.min(deadline - now));
    }
}

impl Drop for ChromeBackend {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/chrome.rs"]
mod tests;
