use std::io::Cursor;

use super::*;

#[derive(Default)]
struct ScriptedPlayer {
    fail_load: bool,
    capture_size: Option<(u32, u32)>,
    loaded_page: Option<PathBuf>,
    current: Option<FrameIndex>,
    seeks: Vec<u64>,
    closed: bool,
}

impl PlayerBackend for ScriptedPlayer {
    fn load(&mut self, page: &Path, _ready_timeout: Duration) -> ConvertResult<()> {
        if self.fail_load {
            return Err(ConvertError::render("player not ready after 5000 ms"));
        }
        assert!(page.is_file(), "host page must exist before load");
        self.loaded_page = Some(page.to_path_buf());
        Ok(())
    }

    fn seek(&mut self, frame: FrameIndex) -> ConvertResult<()> {
        self.current = Some(frame);
        self.seeks.push(frame.0);
        Ok(())
    }

    fn capture_png(&mut self) -> ConvertResult<Vec<u8>> {
        let (w, h) = self.capture_size.unwrap_or((8, 8));
        let shade = (self.current.map(|f| f.0).unwrap_or(0) * 20 % 256) as u8;
        let img = image::RgbaImage::from_pixel(w, h, image::Rgba([shade, 0, 0, 255]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        Ok(buf)
    }

    fn close(&mut self) -> ConvertResult<()> {
        self.closed = true;
        Ok(())
    }
}

fn small_opts() -> RenderOpts {
    RenderOpts {
        viewport: Viewport::new(8, 8).unwrap(),
        ..RenderOpts::default()
    }
}

fn anim(ip: u32, op: u32, fr: u32) -> Animation {
    Animation::from_value(serde_json::json!({ "ip": ip, "op": op, "fr": fr, "layers": [] }))
        .unwrap()
}

#[test]
fn renders_exactly_op_minus_ip_frames_in_order() {
    let root = tempfile::tempdir().unwrap();
    let ws = Workspace::create_in(root.path()).unwrap();
    let mut player = ScriptedPlayer::default();

    let set = render_frames(&anim(0, 10, 30), &mut player, &ws, &small_opts()).unwrap();

    assert_eq!(set.len(), 10);
    assert_eq!(player.seeks, (0..10).collect::<Vec<_>>());
    assert!(player.closed);
    assert_eq!(player.loaded_page.as_deref(), Some(ws.page_path().as_path()));
    for (i, path) in set.frames.iter().enumerate() {
        assert_eq!(path.file_name().unwrap().to_str().unwrap(), format!("frame_{i}.png"));
        assert!(path.is_file());
    }
}

#[test]
fn seeks_are_relative_to_in_point() {
    let root = tempfile::tempdir().unwrap();
    let ws = Workspace::create_in(root.path()).unwrap();
    let mut player = ScriptedPlayer::default();

    let set = render_frames(&anim(30, 34, 30), &mut player, &ws, &small_opts()).unwrap();
    assert_eq!(set.len(), 4);
    assert_eq!(player.seeks, vec![0, 1, 2, 3]);
}

#[test]
fn captured_frames_are_normalized_to_viewport() {
    let root = tempfile::tempdir().unwrap();
    let ws = Workspace::create_in(root.path()).unwrap();
    let mut player = ScriptedPlayer {
        capture_size: Some((16, 12)),
        ..ScriptedPlayer::default()
    };

    let set = render_frames(&anim(0, 2, 10), &mut player, &ws, &small_opts()).unwrap();
    for path in &set.frames {
        let img = image::open(path).unwrap();
        assert_eq!((img.width(), img.height()), (8, 8));
    }
}

#[test]
fn player_init_failure_is_a_render_error_and_writes_no_frames() {
    let root = tempfile::tempdir().unwrap();
    let ws = Workspace::create_in(root.path()).unwrap();
    let mut player = ScriptedPlayer {
        fail_load: true,
        ..ScriptedPlayer::default()
    };

    let err = render_frames(&anim(0, 3, 10), &mut player, &ws, &small_opts()).unwrap_err();
    assert!(matches!(err, ConvertError::Render(_)), "{err}");
    assert!(player.seeks.is_empty());
    let written = std::fs::read_dir(ws.frames_dir()).unwrap().count();
    assert_eq!(written, 0);
}

#[test]
fn pacing_waits_are_bounded() {
    let frame = Duration::from_millis(100);
    assert_eq!(
        FramePacing::None.wait_after(frame, Duration::ZERO),
        Duration::ZERO
    );
    assert_eq!(
        FramePacing::RealTime.wait_after(frame, Duration::from_millis(30)),
        Duration::from_millis(70)
    );
    assert_eq!(
        FramePacing::RealTime.wait_after(frame, Duration::from_millis(300)),
        Duration::ZERO
    );
    assert_eq!(
        FramePacing::RealTime.wait_after(Duration::from_secs(10), Duration::ZERO),
        MAX_PACING_WAIT
    );
    assert_eq!(
        FramePacing::Settle(Duration::from_secs(5)).wait_after(frame, Duration::ZERO),
        MAX_PACING_WAIT
    );
}

#[test]
fn invalid_options_are_rejected() {
    let opts = RenderOpts {
        ready_timeout: Duration::ZERO,
        ..small_opts()
    };
    assert!(opts.validate().is_err());

    let opts = RenderOpts {
        viewport: Viewport {
            width: 0,
            height: 8,
        },
        ..RenderOpts::default()
    };
    assert!(opts.validate().is_err());
}

#[test]
fn vanishing_frame_rate_does_not_break_pacing() {
    assert_eq!(frame_duration(1e-20), MAX_PACING_WAIT);
    assert_eq!(frame_duration(f64::MIN_POSITIVE / 4.0), MAX_PACING_WAIT);
    assert_eq!(frame_duration(10.0), Duration::from_millis(100));

    let root = tempfile::tempdir().unwrap();
    let ws = Workspace::create_in(root.path()).unwrap();
    let slow = Animation::from_value(serde_json::json!({ "ip": 0, "op": 2, "fr": 1e-20, "layers": [] }))
        .unwrap();
    let mut player = ScriptedPlayer::default();

    let set = render_frames(&slow, &mut player, &ws, &small_opts()).unwrap();
    assert_eq!(set.len(), 2);
    assert_eq!(player.seeks, vec![0, 1]);
}
