use crate::{
    canvas::{IndexedCanvas, PixelRect},
    config::PaletteIndex,
    geometry::NormalizedMap,
    map::{MapData, SegmentId},
    trace::SegmentSet,
};

/// Which segments are on screen, and in which colour.
#[derive(Clone, Debug, Default)]
pub struct DrawState {
    committed: SegmentSet,
    /// Segments committed by the most recent flush; the next frame recolours them.
    recent: Vec<SegmentId>,
    pending: Vec<SegmentId>,
    pending_set: SegmentSet,
}

impl DrawState {
    pub fn new(segments: usize) -> Self {
        Self {
            committed: SegmentSet::with_capacity(segments),
            recent: Vec::new(),
            pending: Vec::new(),
            pending_set: SegmentSet::with_capacity(segments),
        }
    }

    pub fn is_committed(&self, id: SegmentId) -> bool {
        self.committed.contains(id)
    }

    pub fn is_pending(&self, id: SegmentId) -> bool {
        self.pending_set.contains(id)
    }

    pub fn is_drawn(&self, id: SegmentId) -> bool {
        self.is_committed(id) || self.is_pending(id)
    }

    /// Returns `false` if the segment is already pending.
    pub fn mark_pending(&mut self, id: SegmentId) -> bool {
        if !self.pending_set.insert(id) {
            return false;
        }
        self.pending.push(id);
        true
    }

    /// Move pending into committed; they become the recent set for the next frame.
    pub fn flush(&mut self) {
        for &id in &self.pending {
            self.pending_set.remove(id);
            self.committed.insert(id);
        }
        self.recent = std::mem::take(&mut self.pending);
    }

    pub fn pending(&self) -> &[SegmentId] {
        &self.pending
    }

    pub fn recent(&self) -> &[SegmentId] {
        &self.recent
    }

    pub fn committed_len(&self) -> usize {
        self.committed.len()
    }
}

/// Draws segments onto the persistent canvas and tracks their draw state.
pub struct FrameRenderer<'m> {
    map: &'m MapData,
    geometry: &'m NormalizedMap,
    canvas: IndexedCanvas,
    state: DrawState,
}

impl<'m> FrameRenderer<'m> {
    pub fn new(map: &'m MapData, geometry: &'m NormalizedMap) -> Self {
        Self {
            map,
            geometry,
            canvas: IndexedCanvas::new(
                geometry.width,
                geometry.height,
                PaletteIndex::Background.as_u8(),
            ),
            state: DrawState::new(map.segments.len()),
        }
    }

    pub fn canvas(&self) -> &IndexedCanvas {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut IndexedCanvas {
        &mut self.canvas
    }

    pub fn state(&self) -> &DrawState {
        &self.state
    }

    pub fn color_for(&self, id: SegmentId, new: bool) -> PaletteIndex {
        let seg = self.map.segment(id);
        if new {
            PaletteIndex::Highlight
        } else if seg.has_action {
            PaletteIndex::Action
        } else if seg.back_side().is_none() {
            PaletteIndex::OneSided
        } else {
            PaletteIndex::TwoSided
        }
    }

    /// Three one-pixel strokes (as-is, +1 x, +1 y) for a two-pixel-wide look.
    fn stroke(&mut self, id: SegmentId, color: PaletteIndex) {
        let seg = self.map.segment(id);
        let (p1, p2) = (
            self.geometry.canvas_point(seg.a),
            self.geometry.canvas_point(seg.b),
        );
        let idx = color.as_u8();
        self.canvas.draw_line(p1, p2, idx);
        self.canvas.draw_line(p1.offset(1, 0), p2.offset(1, 0), idx);
        self.canvas.draw_line(p1.offset(0, 1), p2.offset(0, 1), idx);
    }

    /// Draw in the highlight colour and queue the segment for the next frame.
    pub fn draw_new(&mut self, id: SegmentId) {
        self.state.mark_pending(id);
        self.stroke(id, PaletteIndex::Highlight);
    }

    /// Draw in the segment's resting colour.
    pub fn draw_resting(&mut self, id: SegmentId) {
        let color = self.color_for(id, false);
        self.stroke(id, color);
    }

    pub fn redraw_recent(&mut self) {
        let recent = std::mem::take(&mut self.state.recent);
        for &id in &recent {
            self.draw_resting(id);
        }
        self.state.recent = recent;
    }

    /// Smallest rectangle holding every endpoint of the recent and pending segments, grown by
    /// two pixels on the far edges (one for the inclusive endpoint, one for stroke width) and
    /// clamped to the canvas. `None` when there is nothing to show.
    pub fn frame_bounds(&self) -> Option<PixelRect> {
        let mut points = self
            .state
            .recent
            .iter()
            .chain(&self.state.pending)
            .flat_map(|&id| {
                let seg = self.map.segment(id);
                [
                    self.geometry.canvas_point(seg.a),
                    self.geometry.canvas_point(seg.b),
                ]
            });

        let first = points.next()?;
        let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
        for p in points {
            x0 = x0.min(p.x);
            y0 = y0.min(p.y);
            x1 = x1.max(p.x);
            y1 = y1.max(p.y);
        }

        let to_u32 = |v: i32| v.max(0) as u32;
        Some(
            PixelRect::new(to_u32(x0), to_u32(y0), to_u32(x1 + 2), to_u32(y1 + 2))
                .clamp_to(self.canvas.width(), self.canvas.height()),
        )
    }

    pub fn flush(&mut self) {
        self.state.flush();
    }
}
