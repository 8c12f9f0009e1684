#![forbid(unsafe_code)]

pub mod canvas;
pub mod config;
pub mod driver;
pub mod encoder;
pub mod error;
pub mod geometry;
pub mod gif;
pub mod map;
pub mod pipeline;
pub mod render;
pub mod trace;
pub mod wad;

pub use canvas::{IndexedCanvas, PixelRect};
pub use config::{Framing, Palette, PaletteIndex, RenderConfig};
pub use driver::{CancelToken, RenderStats, render_animation};
pub use encoder::AnimationEncoder;
pub use error::{MapgifError, MapgifResult};
pub use geometry::{NormalizedMap, PixelPoint, normalize};
pub use gif::{Delay, GifSummary};
pub use map::{MapData, RawVertex, SectorId, Segment, SegmentId, Side, SideId, VertexId};
pub use pipeline::{BatchReport, default_output_path, render_map_to_file, render_wad};
pub use trace::{AdjacencyIndex, SegmentSet, Tracer};
pub use wad::{MapFormat, Wad, WadKind};
