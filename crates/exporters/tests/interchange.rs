use exporters::relinking::build_relink_map;
use exporters::{detect_format, import_timeline, DetectedFormat, EdlOptions, ExportConfig, ExportFormat, Exporter};
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use timeline::assembly::conform_timeline;
use timeline::{Clip, Fps, Timeline, TrackKind, Transition, DEFAULT_FPS};

fn edit() -> Timeline {
    let mut timeline = Timeline::new("Interchange", DEFAULT_FPS);
    timeline.add_clip(
        Clip::from_frames("Open", "/proxies/open.mov", 12, 108, 0, DEFAULT_FPS).with_notes("slate cut"),
        TrackKind::Video,
        1,
    );
    timeline.add_clip(Clip::from_frames("Close", "/proxies/close.mov", 0, 48, 120, DEFAULT_FPS), TrackKind::Video, 1);
    timeline.add_clip(Clip::from_frames("Score", "/audio/score.wav", 0, 168, 0, DEFAULT_FPS), TrackKind::Audio, 1);
    timeline.transitions.push(Transition::dissolve("Open", "Close", 12));
    timeline
}

fn export(timeline: &Timeline, format: ExportFormat, path: &Path) {
    Exporter::new(ExportConfig::new(format, path))
        .export_timeline(timeline)
        .unwrap();
}

#[test]
fn edl_file_matches_the_reference_event() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.edl");
    let mut timeline = Timeline::new("Test", DEFAULT_FPS);
    timeline.add_clip(Clip::from_frames("Shot_001", "", 0, 100, 0, DEFAULT_FPS), TrackKind::Video, 1);

    export(&timeline, ExportFormat::Edl, &path);
    let content = fs::read_to_string(&path).unwrap();

    assert!(content.lines().any(|l| l == "TITLE: Test"));
    let event = content.lines().position(|l| l.starts_with("001 ")).unwrap();
    assert_eq!(
        content.lines().nth(event + 1).unwrap(),
        "00 00 00 00 00 00 04 04 00 00 00 00 00 00 04 04"
    );
    assert_eq!(detect_format(&path), Some(DetectedFormat::Edl));
}

#[test]
fn otio_file_with_one_clip_imports() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("scenario.otio");
    fs::write(
        &path,
        r#"{"OTIO_SCHEMA": "Timeline.1", "tracks": {"OTIO_SCHEMA": "Stack.1", "children": [
            {"OTIO_SCHEMA": "Track.1", "kind": "Video", "children": [
                {"OTIO_SCHEMA": "Clip.1", "name": "Only",
                 "source_range": {"start_time": 0, "duration": 100, "rate": 24}}]}]}}"#,
    )
    .unwrap();

    assert_eq!(detect_format(&path), Some(DetectedFormat::Otio));
    let timeline = import_timeline(&path, DEFAULT_FPS).unwrap();
    assert_eq!(timeline.video_tracks.len(), 1);
    assert_eq!(timeline.video_tracks[0].clips.len(), 1);
    assert_eq!(timeline.video_tracks[0].clips[0].duration(), 100);
}

#[test]
fn every_format_survives_export_and_import() {
    let original = edit();
    let dir = tempdir().unwrap();

    for format in ExportFormat::ALL {
        let path = dir.path().join(format!("edit.{}", format.extension()));
        export(&original, format, &path);
        let back = import_timeline(&path, DEFAULT_FPS).unwrap();

        assert_eq!(back.clip_count(), original.clip_count(), "{format}");
        assert_eq!(back.calculate_duration(), original.calculate_duration(), "{format}");
        for clip in original.get_all_clips() {
            // EDL keeps at most eight uppercased characters of a name.
            let name = if format == ExportFormat::Edl {
                clip.name.to_uppercase()
            } else {
                clip.name.clone()
            };
            let restored = back.find_clip(&name).unwrap_or_else(|| panic!("{format}: {name}"));
            assert_eq!(restored.record_range(), clip.record_range(), "{format}: {name}");
            assert_eq!(restored.source_range(), clip.source_range(), "{format}: {name}");
            assert_eq!(restored.source_path, clip.source_path, "{format}: {name}");
        }
    }
}

#[test]
fn canonical_formats_are_lossless() {
    let original = edit();
    let dir = tempdir().unwrap();
    for format in [ExportFormat::Json, ExportFormat::Aaf] {
        let path = dir.path().join(format!("edit.{}", format.extension()));
        export(&original, format, &path);
        assert_eq!(import_timeline(&path, DEFAULT_FPS).unwrap(), original, "{format}");
    }
}

#[test]
fn edl_transitions_are_opt_in() {
    let dir = tempdir().unwrap();
    let original = edit();

    let plain = dir.path().join("plain.edl");
    export(&original, ExportFormat::Edl, &plain);
    assert!(import_timeline(&plain, DEFAULT_FPS).unwrap().transitions.is_empty());

    let rich = dir.path().join("rich.edl");
    let config = ExportConfig::new(ExportFormat::Edl, &rich).with_edl_options(EdlOptions { emit_transitions: true });
    Exporter::new(config).export_timeline(&original).unwrap();
    let back = import_timeline(&rich, DEFAULT_FPS).unwrap();
    assert_eq!(back.transitions.len(), 1);
    assert_eq!(back.transitions[0].duration, 12);
    assert_eq!(back.transitions[0].from_clip.name(), "OPEN");
}

#[test]
fn fractional_rate_survives_fcpxml() {
    let fps = Fps::new(24000, 1001);
    let mut timeline = Timeline::new("NTSC", fps);
    timeline.add_clip(Clip::from_frames("A", "/a.mov", 1001, 2002, 5000, fps), TrackKind::Video, 1);

    let dir = tempdir().unwrap();
    let path = dir.path().join("ntsc.fcpxml");
    export(&timeline, ExportFormat::FcpXml, &path);
    let back = import_timeline(&path, DEFAULT_FPS).unwrap();

    assert_eq!(back.fps, fps);
    let clip = back.find_clip("A").unwrap();
    assert_eq!(clip.record_range(), timeline.find_clip("A").unwrap().record_range());
    assert_eq!(clip.source_in.to_frames(), 1001);
}

#[test]
fn detection_never_fails_loudly() {
    let dir = tempdir().unwrap();
    assert_eq!(detect_format(&dir.path().join("missing.edl")), None);

    let generic = dir.path().join("other.xml");
    fs::write(&generic, "<?xml version=\"1.0\"?>\n<xmeml version=\"5\"/>").unwrap();
    assert_eq!(detect_format(&generic), Some(DetectedFormat::Xml));
    assert!(import_timeline(&generic, DEFAULT_FPS).is_err());

    let garbage = dir.path().join("notes.txt");
    fs::write(&garbage, "remember to grade reel 3").unwrap();
    assert_eq!(detect_format(&garbage), None);
    assert!(import_timeline(&garbage, DEFAULT_FPS).is_err());
}

#[test]
fn relink_map_feeds_conform() {
    let dir = tempdir().unwrap();
    let online = dir.path().join("online").join("day2");
    fs::create_dir_all(&online).unwrap();
    fs::write(online.join("open.mov"), b"").unwrap();
    fs::write(online.join("score.wav"), b"").unwrap();

    let original = edit();
    let map = build_relink_map(&original, &[dir.path().to_path_buf()]);
    assert_eq!(map.len(), 2);
    assert!(!map.contains_key("Close"));

    let conformed = conform_timeline(&original, &map).unwrap();
    let open = conformed.find_clip("Open").unwrap();
    assert!(Path::new(&open.source_path).starts_with(&online));
    assert_eq!(conformed.find_clip("Close").unwrap().source_path, "/proxies/close.mov");
    assert_eq!(original.find_clip("Open").unwrap().source_path, "/proxies/open.mov");
}

#[test]
fn every_writer_reports_unwritable_paths() {
    let dir = tempdir().unwrap();
    let timeline = edit();
    for format in ExportFormat::ALL {
        let path = dir.path().join("missing").join(format!("edit.{}", format.extension()));
        let error = Exporter::new(ExportConfig::new(format, &path))
            .export_timeline(&timeline)
            .unwrap_err();
        assert!(error.to_string().contains(format.as_str()), "{format}: {error}");
        assert!(!path.exists());
    }
}
