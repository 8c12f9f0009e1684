use std::{
    io::Write,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use crate::{
    config::{Framing, RenderConfig},
    encoder::AnimationEncoder,
    error::MapgifResult,
    geometry::normalize,
    map::{MapData, SegmentId},
    trace::Tracer,
};

/// Shared flag asking a render to stop at the next run boundary.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct RenderStats {
    pub segments_total: u64,
    /// Distinct segments drawn; each counts once however often it is redrawn.
    pub segments_drawn: u64,
    /// Extra draws of already-drawn segments (only with `draw_twice`).
    pub redraws: u64,
    pub traces: u64,
    pub frames: u64,
    pub bytes: u64,
    pub cancelled: bool,
}

impl RenderStats {
    pub fn remaining(&self) -> u64 {
        self.segments_total - self.segments_drawn
    }
}

/// Render `map` as an animated GIF into `out`.
///
/// Segments are revealed one traced run at a time. Cancellation is honoured between runs; the
/// output is finalized (terminal frame + trailer) whether the render completes, is cancelled,
/// or fails part-way.
#[tracing::instrument(skip_all, fields(map = %map.name))]
pub fn render_animation<W: Write>(
    map: &MapData,
    cfg: &RenderConfig,
    out: W,
    cancel: &CancelToken,
) -> MapgifResult<RenderStats> {
    cfg.validate()?;
    map.validate()?;

    let geometry = normalize(&map.vertices, cfg)?;
    tracing::debug!(
        width = geometry.width,
        height = geometry.height,
        scale = geometry.scale,
        "map normalized"
    );

    let tracer = Tracer::new(map);
    let mut encoder = AnimationEncoder::new(map, &geometry, cfg, out)?;
    let mut stats = RenderStats {
        segments_total: map.segments.len() as u64,
        ..RenderStats::default()
    };

    encoder.begin()?;

    let mut cursor = map.segment_ids().peekable();
    loop {
        if cancel.is_cancelled() {
            tracing::info!(remaining = stats.remaining(), "render cancelled");
            stats.cancelled = true;
            break;
        }

        // Drawn segments never become undrawn, so the cursor only moves forward.
        while cursor.next_if(|&id| encoder.is_drawn(id)).is_some() {}
        let Some(start) = cursor.next() else {
            break;
        };

        tracing::debug!(
            remaining = stats.remaining(),
            frame = encoder.frames() + 1,
            start = start.0,
            "tracing run"
        );
        let run = tracer.trace(start, None);
        stats.traces += 1;

        for id in run {
            if !draw_segment(&mut encoder, &mut stats, id, cfg.draw_twice) {
                continue;
            }
            if cfg.framing == Framing::PerLine {
                encoder.emit_frame()?;
            }
        }
        if cfg.framing == Framing::PerShape {
            encoder.emit_frame()?;
        }
    }

    encoder.finish()?;
    stats.frames = encoder.frames();
    stats.bytes = encoder.bytes_written();
    tracing::info!(
        drawn = stats.segments_drawn,
        frames = stats.frames,
        bytes = stats.bytes,
        "render finished"
    );
    Ok(stats)
}

/// Returns `false` when the segment was skipped as a repeat.
fn draw_segment<W: Write>(
    encoder: &mut AnimationEncoder<'_, W>,
    stats: &mut RenderStats,
    id: SegmentId,
    draw_twice: bool,
) -> bool {
    let repeat = encoder.is_drawn(id);
    if repeat && !draw_twice {
        return false;
    }
    if repeat {
        stats.redraws += 1;
    } else {
        stats.segments_drawn += 1;
    }
    encoder.draw_new(id);
    true
}
