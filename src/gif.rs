//! Byte-level GIF89a block writer.
//!
//! Only the handful of blocks an incremental animation needs are produced: header with global
//! colour table, the NETSCAPE2.0 repeat extension, graphics control extensions, image blocks
//! and the trailer. Pixel data is LZW-compressed with `weezl`.

use std::io::Write;

use crate::{
    config::Palette,
    error::{MapgifError, MapgifResult},
};

pub const SIGNATURE: &[u8; 6] = b"GIF89a";
pub const TRAILER: u8 = 0x3B;
/// Smallest LZW code size that covers the 8-entry colour table.
pub const LZW_MIN_CODE_SIZE: u8 = 3;

const EXTENSION_INTRODUCER: u8 = 0x21;
const GRAPHICS_CONTROL_LABEL: u8 = 0xF9;
const APPLICATION_LABEL: u8 = 0xFF;
const IMAGE_SEPARATOR: u8 = 0x2C;
const MAX_SUB_BLOCK: usize = 255;

/// Frame delay in centiseconds, saturating at the 16-bit field maximum.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Delay(u16);

impl Delay {
    pub const MAX: Self = Self(u16::MAX);

    pub fn from_centis(centis: u64) -> Self {
        Self(centis.min(u64::from(u16::MAX)) as u16)
    }

    /// Negative and NaN inputs become zero; anything past 655.35 s becomes [`Delay::MAX`].
    pub fn from_secs(secs: f64) -> Self {
        if secs.is_nan() || secs <= 0.0 {
            return Self(0);
        }
        let centis = (secs * 100.0).round();
        if centis >= f64::from(u16::MAX) {
            Self::MAX
        } else {
            Self(centis as u16)
        }
    }

    pub fn centis(self) -> u16 {
        self.0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum Disposal {
    #[default]
    Unspecified = 0,
    /// Leave the frame in place; the next frame composites over it.
    Keep = 1,
    RestoreBackground = 2,
    RestorePrevious = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GraphicsControl {
    pub disposal: Disposal,
    pub transparent: bool,
    pub delay: Delay,
}

impl GraphicsControl {
    /// Transparent colour index; always the background slot.
    pub const TRANSPARENT_INDEX: u8 = 0;

    pub fn packed(&self) -> u8 {
        ((self.disposal as u8) << 2) | u8::from(self.transparent)
    }

    pub fn to_bytes(&self) -> [u8; 8] {
        let [lo, hi] = self.delay.centis().to_le_bytes();
        [
            EXTENSION_INTRODUCER,
            GRAPHICS_CONTROL_LABEL,
            4,
            self.packed(),
            lo,
            hi,
            Self::TRANSPARENT_INDEX,
            0,
        ]
    }
}

/// Application extension asking players to repeat forever.
pub const LOOP_FOREVER: [u8; 19] = [
    EXTENSION_INTRODUCER,
    APPLICATION_LABEL,
    11,
    b'N',
    b'E',
    b'T',
    b'S',
    b'C',
    b'A',
    b'P',
    b'E',
    b'2',
    b'.',
    b'0',
    3,
    1,
    0,
    0,
    0,
];

/// Signature, logical screen descriptor and global colour table.
pub fn header_bytes(width: u16, height: u16, palette: &Palette) -> Vec<u8> {
    // global table present, 3-bit colour resolution, 2^(2+1) entries
    const SCREEN_FLAGS: u8 = 0x80 | (2 << 4) | 2;

    let mut out = Vec::with_capacity(13 + Palette::TABLE_LEN * 3);
    out.extend_from_slice(SIGNATURE);
    out.extend_from_slice(&width.to_le_bytes());
    out.extend_from_slice(&height.to_le_bytes());
    out.extend_from_slice(&[SCREEN_FLAGS, 0, 0]);
    out.extend_from_slice(&palette.to_table());
    out
}

/// Image descriptor plus LZW data sub-blocks for a `width x height` patch at `(left, top)`.
pub fn image_bytes(
    left: u16,
    top: u16,
    width: u16,
    height: u16,
    pixels: &[u8],
) -> MapgifResult<Vec<u8>> {
    if pixels.len() != usize::from(width) * usize::from(height) {
        return Err(MapgifError::encode(format!(
            "image block expects {}x{} pixels, got {}",
            width,
            height,
            pixels.len()
        )));
    }

    let compressed = weezl::encode::Encoder::new(weezl::BitOrder::Lsb, LZW_MIN_CODE_SIZE)
        .encode(pixels)
        .map_err(|e| MapgifError::encode(format!("LZW compression failed: {e}")))?;

    let blocks = compressed.len().div_ceil(MAX_SUB_BLOCK);
    let mut out = Vec::with_capacity(10 + 1 + compressed.len() + blocks + 1);
    out.push(IMAGE_SEPARATOR);
    for v in [left, top, width, height] {
        out.extend_from_slice(&v.to_le_bytes());
    }
    // no local colour table, not interlaced
    out.push(0);
    out.push(LZW_MIN_CODE_SIZE);
    for chunk in compressed.chunks(MAX_SUB_BLOCK) {
        out.push(chunk.len() as u8);
        out.extend_from_slice(chunk);
    }
    out.push(0);
    Ok(out)
}

/// Thin wrapper that turns I/O failures into [`MapgifError::Encode`] and counts bytes.
pub struct BlockWriter<W: Write> {
    out: W,
    written: u64,
}

impl<W: Write> BlockWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, written: 0 }
    }

    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    pub fn write(&mut self, bytes: &[u8]) -> MapgifResult<()> {
        self.out
            .write_all(bytes)
            .map_err(|e| MapgifError::encode(format!("failed to write GIF data: {e}")))?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    pub fn flush(&mut self) -> MapgifResult<()> {
        self.out
            .flush()
            .map_err(|e| MapgifError::encode(format!("failed to flush GIF output: {e}")))
    }
}

/// One image block as seen by [`scan`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameInfo {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    pub control: Option<GraphicsControl>,
}

/// Block-level summary of a GIF stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GifSummary {
    pub width: u16,
    pub height: u16,
    pub looping: bool,
    pub frames: Vec<FrameInfo>,
    /// Whether the stream ends with exactly one trailer byte and nothing after it.
    pub terminated: bool,
}

/// Walk the block structure of a GIF stream without decoding pixels.
pub fn scan(bytes: &[u8]) -> MapgifResult<GifSummary> {
    struct Cursor<'a> {
        bytes: &'a [u8],
        pos: usize,
    }

    impl<'a> Cursor<'a> {
        fn take(&mut self, n: usize) -> MapgifResult<&'a [u8]> {
            let end = self.pos.checked_add(n).filter(|&e| e <= self.bytes.len());
            let Some(end) = end else {
                return Err(MapgifError::load(format!(
                    "GIF stream truncated at byte {}",
                    self.pos
                )));
            };
            let out = &self.bytes[self.pos..end];
            self.pos = end;
            Ok(out)
        }

        fn u8(&mut self) -> MapgifResult<u8> {
            Ok(self.take(1)?[0])
        }

        fn u16(&mut self) -> MapgifResult<u16> {
            let b = self.take(2)?;
            Ok(u16::from_le_bytes([b[0], b[1]]))
        }

        fn sub_blocks(&mut self) -> MapgifResult<Vec<u8>> {
            let mut out = Vec::new();
            loop {
                let n = self.u8()? as usize;
                if n == 0 {
                    return Ok(out);
                }
                out.extend_from_slice(self.take(n)?);
            }
        }
    }

    let mut c = Cursor { bytes, pos: 0 };
    let sig = c.take(6)?;
    if sig != SIGNATURE && sig != b"GIF87a" {
        return Err(MapgifError::load("not a GIF stream (bad signature)"));
    }
    let width = c.u16()?;
    let height = c.u16()?;
    let flags = c.u8()?;
    c.take(2)?;
    if flags & 0x80 != 0 {
        c.take(3 << ((flags & 7) + 1))?;
    }

    let mut summary = GifSummary {
        width,
        height,
        looping: false,
        frames: Vec::new(),
        terminated: false,
    };
    let mut control = None;

    while c.pos < bytes.len() {
        match c.u8()? {
            EXTENSION_INTRODUCER => {
                let label = c.u8()?;
                let data = c.sub_blocks()?;
                match label {
                    GRAPHICS_CONTROL_LABEL if data.len() == 4 => {
                        control = Some(GraphicsControl {
                            disposal: match (data[0] >> 2) & 7 {
                                1 => Disposal::Keep,
                                2 => Disposal::RestoreBackground,
                                3 => Disposal::RestorePrevious,
                                _ => Disposal::Unspecified,
                            },
                            transparent: data[0] & 1 != 0,
                            delay: Delay(u16::from_le_bytes([data[1], data[2]])),
                        });
                    }
                    APPLICATION_LABEL if data.starts_with(b"NETSCAPE2.0") => {
                        summary.looping = true;
                    }
                    _ => {}
                }
            }
            IMAGE_SEPARATOR => {
                let left = c.u16()?;
                let top = c.u16()?;
                let w = c.u16()?;
                let h = c.u16()?;
                let flags = c.u8()?;
                if flags & 0x80 != 0 {
                    c.take(3 << ((flags & 7) + 1))?;
                }
                c.u8()?;
                c.sub_blocks()?;
                summary.frames.push(FrameInfo {
                    left,
                    top,
                    width: w,
                    height: h,
                    control: control.take(),
                });
            }
            TRAILER => {
                summary.terminated = c.pos == bytes.len();
                break;
            }
            other => {
                return Err(MapgifError::load(format!(
                    "unexpected block 0x{other:02X} at byte {}",
                    c.pos - 1
                )));
            }
        }
    }

    Ok(summary)
}
