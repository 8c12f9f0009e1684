mod common;

use mapgif::{CancelToken, MapgifError, RenderConfig, Wad, gif::scan, render_wad};

use common::{QUAD, WadBuilder, quad_lines, scratch_dir};

fn cfg() -> RenderConfig {
    RenderConfig {
        image_width: 64,
        border: 4,
        ..RenderConfig::default()
    }
}

fn mixed_wad() -> Vec<u8> {
    let flat = [(5, 5), (5, 5), (5, 5), (5, 5)];
    WadBuilder::default()
        .doom_map("MAP01", &QUAD, &quad_lines(), &[0])
        .doom_map("MAP02", &flat, &quad_lines(), &[0])
        .lump("MAP03", vec![])
        .lump("TEXTMAP", b"namespace = \"zdoom\";".to_vec())
        .lump("ENDMAP", vec![])
        .doom_map("MAP04", &QUAD, &quad_lines(), &[0])
        .build()
}

#[test]
fn batch_continues_past_failing_maps() {
    let dir = scratch_dir("batch_mixed");
    let wad_path = dir.join("MIXED.WAD");
    for map in ["MAP01", "MAP02", "MAP03", "MAP04"] {
        let _ = std::fs::remove_file(dir.join(format!("MIXED.WAD_{map}.gif")));
    }

    let wad = Wad::from_bytes(mixed_wad()).unwrap();
    assert_eq!(
        wad.map_names().collect::<Vec<_>>(),
        vec!["MAP01", "MAP02", "MAP03", "MAP04"]
    );

    let report = render_wad(&wad, &wad_path, Some(&dir), &cfg(), &CancelToken::new()).unwrap();

    let rendered: Vec<_> = report.rendered.iter().map(|(n, _, _)| n.as_str()).collect();
    assert_eq!(rendered, vec!["MAP01", "MAP04"]);
    assert!(report.skipped.is_empty());
    assert!(!report.is_clean());

    assert_eq!(report.failed.len(), 2);
    assert_eq!(report.failed[0].0, "MAP02");
    assert!(matches!(report.failed[0].1, MapgifError::Geometry(_)));
    assert_eq!(report.failed[1].0, "MAP03");
    assert!(matches!(
        report.failed[1].1,
        MapgifError::UnsupportedFormat(_)
    ));

    for (_, path, stats) in &report.rendered {
        let bytes = std::fs::read(path).unwrap();
        let summary = scan(&bytes).unwrap();
        assert!(summary.terminated);
        assert_eq!(summary.frames.len() as u64, stats.frames);
    }
    assert!(!dir.join("MIXED.WAD_MAP02.gif").exists());
}

#[test]
fn cancelled_batch_skips_remaining_maps() {
    let dir = scratch_dir("batch_cancelled");
    let wad = Wad::from_bytes(mixed_wad()).unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();

    let report = render_wad(&wad, &dir.join("MIXED.WAD"), Some(&dir), &cfg(), &cancel).unwrap();
    assert!(report.rendered.is_empty());
    assert!(report.failed.is_empty());
    assert_eq!(report.skipped.len(), 4);
}

#[test]
fn invalid_settings_abort_the_whole_batch() {
    let dir = scratch_dir("batch_invalid");
    let wad = Wad::from_bytes(mixed_wad()).unwrap();
    let bad = RenderConfig {
        image_width: 8,
        border: 4,
        ..RenderConfig::default()
    };
    let err = render_wad(&wad, &dir.join("MIXED.WAD"), Some(&dir), &bad, &CancelToken::new())
        .unwrap_err();
    assert!(matches!(err, MapgifError::Validation(_)));
}
