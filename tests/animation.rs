mod common;

use image::AnimationDecoder as _;
use mapgif::{
    CancelToken, Framing, RenderConfig, SectorId, SegmentId, Side, SideId, Tracer, Wad,
    gif::scan, render_animation,
};

use common::{ML_BLOCKING, ML_TWOSIDED, NO_SIDE, QUAD, WadBuilder, quad_lines, quad_map};

fn small_cfg() -> RenderConfig {
    RenderConfig {
        image_width: 84,
        border: 10,
        ..RenderConfig::default()
    }
}

fn decode(bytes: &[u8]) -> Vec<image::Frame> {
    image::codecs::gif::GifDecoder::new(std::io::Cursor::new(bytes))
        .unwrap()
        .into_frames()
        .collect_frames()
        .unwrap()
}

#[test]
fn quad_from_wad_renders_one_frame_per_line() {
    let bytes = WadBuilder::default()
        .doom_map("E1M1", &QUAD, &quad_lines(), &[0])
        .build();
    let wad = Wad::from_bytes(bytes).unwrap();
    let map = wad.load_map("e1m1").unwrap();

    let mut out = Vec::new();
    let stats = render_animation(&map, &small_cfg(), &mut out, &CancelToken::new()).unwrap();
    assert_eq!(stats.segments_drawn, 4);
    assert_eq!(stats.frames, 6);
    assert!(!stats.cancelled);

    let summary = scan(&out).unwrap();
    assert_eq!((summary.width, summary.height), (84, 84));
    assert!(summary.looping);
    assert!(summary.terminated);
    assert_eq!(summary.frames.len(), 6);
    assert_eq!(out.iter().rev().take_while(|&&b| b == 0x3B).count(), 1);

    let first = summary.frames[0];
    assert_eq!((first.left, first.top, first.width, first.height), (0, 0, 84, 84));
    let last = summary.frames[5].control.unwrap();
    assert_eq!(last.delay.centis(), 500);
}

#[test]
fn decoded_animation_highlights_then_settles() {
    let map = quad_map();
    let mut out = Vec::new();
    render_animation(&map, &small_cfg(), &mut out, &CancelToken::new()).unwrap();

    let frames = decode(&out);
    assert_eq!(frames.len(), 6);

    let white = [255, 255, 255];
    let red = [220, 0, 0];
    let black = [0, 0, 0];

    // Bottom edge (segment 0) runs along y = 74 on the canvas.
    assert_eq!(&frames[0].buffer().get_pixel(40, 74).0[..3], &white);
    assert_eq!(&frames[1].buffer().get_pixel(40, 74).0[..3], &red);
    assert_eq!(&frames[2].buffer().get_pixel(40, 74).0[..3], &black);

    let last = frames[5].buffer();
    for (x, y) in [(40, 74), (74, 40), (40, 10), (10, 40)] {
        assert_eq!(&last.get_pixel(x, y).0[..3], &black, "edge pixel ({x},{y})");
    }
    assert_eq!(&last.get_pixel(40, 40).0[..3], &white);
}

#[test]
fn per_shape_emits_one_frame_per_trace() {
    let map = quad_map();
    let cfg = RenderConfig {
        framing: Framing::PerShape,
        ..small_cfg()
    };
    let mut out = Vec::new();
    let stats = render_animation(&map, &cfg, &mut out, &CancelToken::new()).unwrap();
    assert_eq!(stats.traces, 1);
    assert_eq!(stats.frames, 3);
    assert_eq!(decode(&out).len(), 3);
}

#[test]
fn two_sided_start_resolves_to_lower_sector() {
    let mut map = quad_map();
    map.sides.push(Side {
        sector: SectorId(1),
    });
    map.sector_count = Some(2);
    let shared = &mut map.segments[0];
    shared.front = SideId(1);
    shared.back = Some(SideId(0));
    shared.two_sided = true;

    let tracer = Tracer::new(&map);
    assert_eq!(tracer.resolve_sector(SegmentId(0)), SectorId(0));
    let run = tracer.trace(SegmentId(0), None);
    assert_eq!(run.len(), 4);
    assert_eq!(run[0], SegmentId(0));

    assert_eq!(tracer.trace(SegmentId(0), Some(SectorId(1))), vec![SegmentId(0)]);
}

#[test]
fn every_segment_is_committed_once() {
    // Two rooms side by side; the middle wall is shared.
    let vertices = [(0, 0), (64, 0), (64, 64), (0, 64), (128, 0), (128, 64)];
    let lines = [
        (0, 1, ML_BLOCKING, 0, 0, NO_SIDE),
        (1, 2, ML_TWOSIDED, 0, 0, 1),
        (2, 3, ML_BLOCKING, 0, 0, NO_SIDE),
        (3, 0, ML_BLOCKING, 0, 0, NO_SIDE),
        (1, 4, ML_BLOCKING, 0, 1, NO_SIDE),
        (4, 5, ML_BLOCKING, 9, 1, NO_SIDE),
        (5, 2, ML_BLOCKING, 0, 1, NO_SIDE),
    ];
    let bytes = WadBuilder::default()
        .doom_map("MAP01", &vertices, &lines, &[0, 1])
        .build();
    let map = Wad::from_bytes(bytes).unwrap().load_map("MAP01").unwrap();
    assert!(map.segments[5].has_action);

    for draw_twice in [false, true] {
        let cfg = RenderConfig {
            draw_twice,
            ..small_cfg()
        };
        let mut out = Vec::new();
        let stats = render_animation(&map, &cfg, &mut out, &CancelToken::new()).unwrap();
        assert_eq!(stats.segments_drawn, 7);
        assert_eq!(stats.remaining(), 0);
        assert_eq!(stats.redraws, u64::from(draw_twice));
        assert_eq!(stats.frames, 7 + stats.redraws + 2);
        assert_eq!(scan(&out).unwrap().frames.len() as u64, stats.frames);
    }
}

#[test]
fn cancelled_render_keeps_a_playable_file() {
    let map = quad_map();
    let cancel = CancelToken::new();
    cancel.cancel();
    let mut out = Vec::new();
    let stats = render_animation(&map, &small_cfg(), &mut out, &cancel).unwrap();
    assert!(stats.cancelled);
    assert_eq!(decode(&out).len(), 2);
}
