use std::io::Write;

use crate::{
    canvas::PixelRect,
    config::{PaletteIndex, RenderConfig},
    error::{MapgifError, MapgifResult},
    geometry::NormalizedMap,
    gif::{self, BlockWriter, Delay, Disposal, GraphicsControl},
    map::{MapData, SegmentId},
    render::FrameRenderer,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    /// Nothing written yet.
    Fresh,
    /// Header and first frame written.
    Animating,
    /// Terminal frame and trailer written.
    Finished,
    /// A write failed part-way; the stream is left as is.
    Failed,
}

/// Streams an animation of the canvas as it is drawn on.
///
/// The first frame carries the whole canvas. Every later frame carries only the bounding box of
/// the segments it touches: newly drawn ones in the highlight colour and the previous frame's
/// ones recoloured to their resting colour. Frames are kept on screen (disposal "keep") with
/// the background index transparent, so the picture accumulates in the player while the
/// encoder's canvas is wiped back to background after each frame.
///
/// Dropping an encoder that has started but not finished writes the terminal frame and
/// trailer, so the output is a playable GIF on every exit path that can still write. After an
/// output error nothing more is written. Call [`AnimationEncoder::finish`] to observe errors.
pub struct AnimationEncoder<'m, W: Write> {
    cfg: &'m RenderConfig,
    renderer: FrameRenderer<'m>,
    out: BlockWriter<W>,
    stage: Stage,
    frames: u64,
}

impl<'m, W: Write> AnimationEncoder<'m, W> {
    pub fn new(
        map: &'m MapData,
        geometry: &'m NormalizedMap,
        cfg: &'m RenderConfig,
        out: W,
    ) -> MapgifResult<Self> {
        let max = u32::from(u16::MAX);
        if geometry.width > max || geometry.height > max {
            return Err(MapgifError::validation(format!(
                "canvas {}x{} exceeds the GIF size limit",
                geometry.width, geometry.height
            )));
        }
        Ok(Self {
            cfg,
            renderer: FrameRenderer::new(map, geometry),
            out: BlockWriter::new(out),
            stage: Stage::Fresh,
            frames: 0,
        })
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn bytes_written(&self) -> u64 {
        self.out.bytes_written()
    }

    pub fn renderer(&self) -> &FrameRenderer<'m> {
        &self.renderer
    }

    pub fn is_finished(&self) -> bool {
        self.stage == Stage::Finished
    }

    /// Drawn in an earlier frame or queued for the next one.
    pub fn is_drawn(&self, id: SegmentId) -> bool {
        self.renderer.state().is_drawn(id)
    }

    pub fn draw_new(&mut self, id: SegmentId) {
        self.renderer.draw_new(id);
    }

    /// Write the header, optional loop extension and the full-canvas first frame.
    pub fn begin(&mut self) -> MapgifResult<()> {
        if self.stage != Stage::Fresh {
            return Err(MapgifError::encode("animation already started"));
        }
        let result = self.write_opening();
        self.fail_on_err(result)?;
        self.stage = Stage::Animating;
        Ok(())
    }

    fn write_opening(&mut self) -> MapgifResult<()> {
        let canvas = self.renderer.canvas();
        let (width, height) = (canvas.width() as u16, canvas.height() as u16);
        self.out
            .write(&gif::header_bytes(width, height, &self.cfg.palette))?;
        if self.cfg.looping {
            self.out.write(&gif::LOOP_FOREVER)?;
        }

        let control = GraphicsControl {
            disposal: Disposal::Keep,
            transparent: self.cfg.transparent_background,
            delay: self.cfg.frame_delay(),
        };
        let full = canvas.full_rect();
        self.write_frame(control, full)
    }

    fn fail_on_err<T>(&mut self, result: MapgifResult<T>) -> MapgifResult<T> {
        if result.is_err() {
            self.stage = Stage::Failed;
        }
        result
    }

    /// Emit a delta frame for everything drawn since the previous frame.
    pub fn emit_frame(&mut self) -> MapgifResult<()> {
        self.emit_delta(self.cfg.frame_delay())
    }

    /// Emit the terminal frame (held for the loop delay) and the trailer. Idempotent.
    pub fn finish(&mut self) -> MapgifResult<()> {
        if self.stage == Stage::Finished {
            return Ok(());
        }
        self.emit_delta(self.cfg.loop_delay())?;
        let result = self
            .out
            .write(&[gif::TRAILER])
            .and_then(|()| self.out.flush());
        self.fail_on_err(result)?;
        self.stage = Stage::Finished;
        tracing::debug!(
            frames = self.frames,
            bytes = self.out.bytes_written(),
            "animation finalized"
        );
        Ok(())
    }

    fn emit_delta(&mut self, delay: Delay) -> MapgifResult<()> {
        match self.stage {
            Stage::Fresh => self.begin()?,
            Stage::Animating => {}
            Stage::Finished => return Err(MapgifError::encode("animation already finished")),
            Stage::Failed => {
                return Err(MapgifError::encode("animation output failed earlier"));
            }
        }
        let result = self.write_delta(delay);
        self.fail_on_err(result)
    }

    fn write_delta(&mut self, delay: Delay) -> MapgifResult<()> {
        self.renderer.redraw_recent();
        let bounds = self
            .renderer
            .frame_bounds()
            .unwrap_or_else(|| PixelRect::new(0, 0, 1, 1));

        if self.cfg.show_bbox {
            self.renderer
                .canvas_mut()
                .outline_rect(bounds, PaletteIndex::Highlight.as_u8());
        }

        let control = GraphicsControl {
            disposal: Disposal::Keep,
            transparent: true,
            delay,
        };
        self.write_frame(control, bounds)
    }

    fn write_frame(&mut self, control: GraphicsControl, rect: PixelRect) -> MapgifResult<()> {
        let canvas = self.renderer.canvas();
        let rect = rect.clamp_to(canvas.width(), canvas.height());
        let patch = canvas.crop(rect);
        let block = gif::image_bytes(
            rect.x0 as u16,
            rect.y0 as u16,
            rect.width() as u16,
            rect.height() as u16,
            patch.as_raw(),
        )?;

        self.out.write(&control.to_bytes())?;
        self.out.write(&block)?;
        self.frames += 1;
        tracing::trace!(frame = self.frames, ?rect, "frame written");

        self.renderer.flush();
        self.renderer
            .canvas_mut()
            .fill_rect(rect, PaletteIndex::Background.as_u8());
        Ok(())
    }
}

impl<W: Write> Drop for AnimationEncoder<'_, W> {
    fn drop(&mut self) {
        if self.stage != Stage::Animating || std::thread::panicking() {
            return;
        }
        if let Err(e) = self.finish() {
            tracing::warn!(error = %e, "failed to finalize animation on drop");
        }
    }
}
