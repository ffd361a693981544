use super::*;

#[test]
fn frame_range_rejects_inverted_bounds() {
    assert!(FrameRange::new(FrameIndex(3), FrameIndex(2)).is_err());
    let r = FrameRange::new(FrameIndex(2), FrameIndex(2)).unwrap();
    assert!(r.is_empty());
    assert_eq!(r.len_frames(), 0);
}

#[test]
fn first_n_iterates_in_order() {
    let r = FrameRange::first_n(4);
    assert_eq!(r.len_frames(), 4);
    assert!(r.contains(FrameIndex(0)));
    assert!(!r.contains(FrameIndex(4)));
    let all: Vec<u64> = r.iter().map(|f| f.0).collect();
    assert_eq!(all, vec![0, 1, 2, 3]);
}

#[test]
fn viewport_defaults_to_512_square() {
    let v = Viewport::default();
    assert_eq!((v.width, v.height), (512, 512));
    assert!(Viewport::new(0, 10).is_err());
    assert!(Viewport::new(10, 0).is_err());
    assert!(Viewport::new(1, 1).is_ok());
}
