use super::*;

fn anim_with_name(name: &str) -> Animation {
    let doc = serde_json::json!({ "ip": 0, "op": 5, "fr": 10, "nm": name, "layers": [] });
    Animation::from_value(doc).unwrap()
}

#[test]
fn page_embeds_player_data_and_viewport() {
    let anim = anim_with_name("plain");
    let html = build_host_page(&anim, Viewport::new(320, 240).unwrap(), &PlayerScript::default())
        .unwrap();

    assert!(html.contains(DEFAULT_PLAYER_URL));
    assert!(html.contains("width: 320px; height: 240px;"));
    assert!(html.contains("window.animationData = {"));
    assert!(html.contains("\"nm\":\"plain\""));
    assert!(html.contains("autoplay: false"));
    assert!(html.contains("renderer: 'svg'"));
}

#[test]
fn closing_tags_in_data_cannot_end_the_script() {
    let anim = anim_with_name("</script><b>x</b>");
    let html = build_host_page(&anim, Viewport::default(), &PlayerScript::default()).unwrap();
    assert!(!html.contains("</script><b>"));
    assert!(html.contains(r"<\/script><b>x<\/b>"));
}

#[test]
fn local_player_script_is_inlined() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("player.js");
    std::fs::write(&path, "var lottie = { tag: '</script>' };").unwrap();

    let anim = anim_with_name("offline");
    let html = build_host_page(&anim, Viewport::default(), &PlayerScript::File(path)).unwrap();
    assert!(html.contains("var lottie = { tag: '<\\/script>' };"));
    assert!(!html.contains(DEFAULT_PLAYER_URL));
}

#[test]
fn missing_local_player_script_is_an_io_error() {
    let anim = anim_with_name("x");
    let err = build_host_page(
        &anim,
        Viewport::default(),
        &PlayerScript::File(PathBuf::from("/definitely/not/here.js")),
    )
    .unwrap_err();
    assert!(matches!(err, ConvertError::Io { .. }), "{err}");
}

#[test]
fn player_script_parse_distinguishes_urls_and_paths() {
    assert_eq!(
        PlayerScript::parse("https://example.com/lottie.js"),
        PlayerScript::Url("https://example.com/lottie.js".to_string())
    );
    assert_eq!(
        PlayerScript::parse("vendor/lottie.js"),
        PlayerScript::File(PathBuf::from("vendor/lottie.js"))
    );
}

#[test]
fn probe_states_parse() {
    use serde_json::json;
    assert_eq!(PlayerState::from_probe(Some(&json!("ready"))), PlayerState::Ready);
    assert_eq!(PlayerState::from_probe(Some(&json!("pending"))), PlayerState::Pending);
    assert_eq!(
        PlayerState::from_probe(Some(&json!("missing"))),
        PlayerState::MissingPlayer
    );
    assert_eq!(
        PlayerState::from_probe(Some(&json!("error:boom"))),
        PlayerState::Failed("boom".to_string())
    );
    assert_eq!(PlayerState::from_probe(None), PlayerState::Pending);
    assert_eq!(PlayerState::from_probe(Some(&json!(1))), PlayerState::Pending);
}

#[test]
fn seek_script_uses_frame_mode() {
    assert_eq!(
        seek_js(FrameIndex(7)),
        "window.animation.goToAndStop(7, true); true"
    );
}

#[test]
fn file_urls_are_percent_encoded() {
    assert_eq!(
        file_url(Path::new("/tmp/tgs conv/player.html")),
        "file:///tmp/tgs%20conv/player.html"
    );
}
