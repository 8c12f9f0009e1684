use crate::{
    error::{MapgifError, MapgifResult},
    gif::Delay,
};

pub type Rgb = [u8; 3];

/// Slots of the fixed five-colour palette. The order is part of the output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PaletteIndex {
    Background = 0,
    Highlight = 1,
    Action = 2,
    OneSided = 3,
    TwoSided = 4,
}

impl PaletteIndex {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Palette {
    pub background: Rgb,
    /// Segments revealed in the current frame.
    pub highlight: Rgb,
    pub action: Rgb,
    pub one_sided: Rgb,
    pub two_sided: Rgb,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: [255, 255, 255],
            highlight: [220, 0, 0],
            action: [220, 130, 50],
            one_sided: [0, 0, 0],
            two_sided: [144, 144, 144],
        }
    }
}

impl Palette {
    /// Number of entries in the global colour table (next power of two above five colours).
    pub const TABLE_LEN: usize = 8;

    pub fn color(&self, idx: PaletteIndex) -> Rgb {
        match idx {
            PaletteIndex::Background => self.background,
            PaletteIndex::Highlight => self.highlight,
            PaletteIndex::Action => self.action,
            PaletteIndex::OneSided => self.one_sided,
            PaletteIndex::TwoSided => self.two_sided,
        }
    }

    /// RGB triples in palette order, padded with black to [`Palette::TABLE_LEN`] entries.
    pub fn to_table(&self) -> [u8; Self::TABLE_LEN * 3] {
        let mut out = [0u8; Self::TABLE_LEN * 3];
        let colors = [
            self.background,
            self.highlight,
            self.action,
            self.one_sided,
            self.two_sided,
        ];
        for (dst, c) in out.chunks_exact_mut(3).zip(colors) {
            dst.copy_from_slice(&c);
        }
        out
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framing {
    /// One frame per drawn segment.
    #[default]
    PerLine,
    /// One frame per traced run of connected segments.
    PerShape,
}

/// Render settings. Built once (defaults, JSON, CLI flags), validated, then only read.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Image width in pixels, borders included.
    pub image_width: u32,
    pub border: u32,
    pub frame_secs: f64,
    /// Add the infinite-repeat extension.
    pub looping: bool,
    /// Hold time of the last frame.
    pub loop_delay_secs: f64,
    pub framing: Framing,
    /// Redraw two-sided segments when their second sector is traced.
    pub draw_twice: bool,
    /// Outline each delta frame's bounding box (debugging aid).
    pub show_bbox: bool,
    /// Mark the background index transparent on the first frame too.
    pub transparent_background: bool,
    pub palette: Palette,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            image_width: 1024,
            border: 8,
            frame_secs: 0.04,
            looping: true,
            loop_delay_secs: 5.0,
            framing: Framing::PerLine,
            draw_twice: false,
            show_bbox: false,
            transparent_background: false,
            palette: Palette::default(),
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> MapgifResult<()> {
        if self.image_width > u32::from(u16::MAX) {
            return Err(MapgifError::validation(format!(
                "image width {} does not fit a GIF logical screen (max {})",
                self.image_width,
                u16::MAX
            )));
        }
        if self.image_width <= self.border.saturating_mul(2) {
            return Err(MapgifError::validation(format!(
                "image width {} leaves no room inside a {} px border",
                self.image_width, self.border
            )));
        }
        for (name, secs) in [
            ("frame_secs", self.frame_secs),
            ("loop_delay_secs", self.loop_delay_secs),
        ] {
            if !secs.is_finite() || secs < 0.0 {
                return Err(MapgifError::validation(format!(
                    "{name} must be a finite, non-negative number of seconds (got {secs})"
                )));
            }
        }
        Ok(())
    }

    /// Drawable span of the larger map axis.
    pub fn inner_width(&self) -> u32 {
        self.image_width.saturating_sub(self.border.saturating_mul(2))
    }

    pub fn frame_delay(&self) -> Delay {
        Delay::from_secs(self.frame_secs)
    }

    pub fn loop_delay(&self) -> Delay {
        Delay::from_secs(self.loop_delay_secs)
    }

    pub fn from_json_str(s: &str) -> MapgifResult<Self> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| MapgifError::validation(format!("invalid render config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        RenderConfig::default().validate().unwrap();
        assert_eq!(RenderConfig::default().inner_width(), 1008);
    }

    #[test]
    fn validation_catches_bad_values() {
        let cfg = RenderConfig {
            image_width: 16,
            border: 8,
            ..RenderConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = RenderConfig {
            image_width: 70_000,
            ..RenderConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = RenderConfig {
            frame_secs: f64::NAN,
            ..RenderConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = RenderConfig {
            loop_delay_secs: -1.0,
            ..RenderConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg = RenderConfig::from_json_str(
            r#"{ "image_width": 256, "framing": "per_shape", "palette": { "highlight": [0, 0, 255] } }"#,
        )
        .unwrap();
        assert_eq!(cfg.image_width, 256);
        assert_eq!(cfg.border, 8);
        assert_eq!(cfg.framing, Framing::PerShape);
        assert_eq!(cfg.palette.highlight, [0, 0, 255]);
        assert_eq!(cfg.palette.background, [255, 255, 255]);
    }

    #[test]
    fn unknown_json_fields_are_rejected() {
        let err = RenderConfig::from_json_str(r#"{ "imagewidth": 256 }"#).unwrap_err();
        assert!(matches!(err, MapgifError::Validation(_)));
    }

    #[test]
    fn palette_table_keeps_slot_order() {
        let table = Palette::default().to_table();
        assert_eq!(&table[0..3], &[255, 255, 255]);
        assert_eq!(&table[3..6], &[220, 0, 0]);
        assert_eq!(&table[12..15], &[144, 144, 144]);
        assert_eq!(&table[15..], &[0u8; 9]);
        assert_eq!(PaletteIndex::TwoSided.as_u8(), 4);
    }
}
