use std::{fs::File, io::BufReader};

use image::AnimationDecoder as _;

use super::*;

fn write_png(path: &Path, w: u32, h: u32, shade: u8) {
    RgbaImage::from_pixel(w, h, image::Rgba([shade, shade, 0, 255]))
        .save(path)
        .unwrap();
}

fn decode_gif(path: &Path) -> Vec<image::Frame> {
    let reader = BufReader::new(File::open(path).unwrap());
    image::codecs::gif::GifDecoder::new(reader)
        .unwrap()
        .into_frames()
        .collect_frames()
        .unwrap()
}

#[test]
fn frame_number_extracts_first_integer() {
    assert_eq!(frame_number("frame_10"), Some(10));
    assert_eq!(frame_number("frame_2"), Some(2));
    assert_eq!(frame_number("007"), Some(7));
    assert_eq!(frame_number("f3_v2"), Some(3));
    assert_eq!(frame_number("cover"), None);
}

#[test]
fn frames_sort_numerically_not_lexicographically() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["frame_2.png", "frame_10.png", "frame_1.png"] {
        write_png(&dir.path().join(name), 2, 2, 0);
    }
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
    std::fs::write(dir.path().join("cover.png"), "ignored").unwrap();
    std::fs::create_dir(dir.path().join("frame_99.png.d")).unwrap();

    let frames = collect_frames(dir.path()).unwrap();
    let order: Vec<u64> = frames.iter().map(|f| f.index).collect();
    assert_eq!(order, vec![1, 2, 10]);
}

#[test]
fn uppercase_png_extension_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir.path().join("frame_0.PNG"), 2, 2, 0);
    assert_eq!(collect_frames(dir.path()).unwrap().len(), 1);
}

#[test]
fn empty_directory_is_empty_input_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let frames = dir.path().join("frames");
    std::fs::create_dir(&frames).unwrap();
    let out = dir.path().join("out.gif");

    let err = assemble_gif(&frames, &out, &GifOpts::default()).unwrap_err();
    assert!(matches!(err, ConvertError::EmptyInput(_)), "{err}");
    assert!(!out.exists());
}

#[test]
fn missing_directory_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = collect_frames(&dir.path().join("nope")).unwrap_err();
    assert!(matches!(err, ConvertError::Io { .. }), "{err}");
}

#[test]
fn assembles_every_frame_in_index_order() {
    let dir = tempfile::tempdir().unwrap();
    let frames = dir.path().join("frames");
    std::fs::create_dir(&frames).unwrap();
    for (i, shade) in [(0u64, 0u8), (1, 120), (2, 250)] {
        write_png(&frames.join(format!("frame_{i}.png")), 6, 4, shade);
    }
    let out = dir.path().join("nested").join("out.gif");

    let opts = GifOpts {
        delay_ms: 50,
        ..GifOpts::default()
    };
    let gif = assemble_gif(&frames, &out, &opts).unwrap();
    assert_eq!(gif.frames, 3);
    assert_eq!((gif.width, gif.height), (6, 4));
    assert_eq!(gif.delay_ms, 50);

    let decoded = decode_gif(&out);
    assert_eq!(decoded.len(), 3);
    let (num, den) = decoded[0].delay().numer_denom_ms();
    assert_eq!(num / den, 50);
    let first_px = decoded[0].buffer().get_pixel(0, 0).0[0];
    let last_px = decoded[2].buffer().get_pixel(0, 0).0[0];
    assert!(first_px < last_px);
}

#[test]
fn mismatched_frames_are_scaled_to_the_first() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir.path().join("frame_0.png"), 4, 4, 10);
    write_png(&dir.path().join("frame_1.png"), 8, 2, 10);
    let out = dir.path().join("out.gif");

    assemble_gif(dir.path(), &out, &GifOpts::default()).unwrap();
    for frame in decode_gif(&out) {
        assert_eq!(frame.buffer().dimensions(), (4, 4));
    }
}

#[test]
fn delay_follows_frame_rate_with_a_floor() {
    assert_eq!(delay_for_frame_rate(10.0), 100);
    assert_eq!(delay_for_frame_rate(30.0), 30);
    assert_eq!(delay_for_frame_rate(24.0), 40);
    assert_eq!(delay_for_frame_rate(60.0), MIN_GIF_DELAY_MS);
    assert_eq!(delay_for_frame_rate(0.0), DEFAULT_GIF_DELAY_MS);
}

#[test]
fn options_are_validated() {
    let bad_delay = GifOpts {
        delay_ms: 0,
        ..GifOpts::default()
    };
    assert!(bad_delay.validate().is_err());
    let bad_speed = GifOpts {
        speed: 31,
        ..GifOpts::default()
    };
    assert!(bad_speed.validate().is_err());
}

#[test]
fn reported_delay_matches_stored_centiseconds() {
    assert_eq!(stored_gif_delay_ms(33), 30);
    assert_eq!(stored_gif_delay_ms(35), 40);
    assert_eq!(stored_gif_delay_ms(1), 10);
    assert_eq!(stored_gif_delay_ms(u32::MAX), MAX_GIF_DELAY_MS);

    let dir = tempfile::tempdir().unwrap();
    write_png(&dir.path().join("frame_0.png"), 2, 2, 10);
    write_png(&dir.path().join("frame_1.png"), 2, 2, 200);
    let out = dir.path().join("q.gif");
    let gif = assemble_gif(
        dir.path(),
        &out,
        &GifOpts {
            delay_ms: 33,
            ..GifOpts::default()
        },
    )
    .unwrap();

    assert_eq!(gif.delay_ms, 30);
    let (num, den) = decode_gif(&out)[0].delay().numer_denom_ms();
    assert_eq!(num / den, gif.delay_ms);
}
