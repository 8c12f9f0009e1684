//! Reader for id Tech 1 WAD containers.
//!
//! Only what map rendering needs is decoded: the lump directory, map discovery, and the
//! VERTEXES / LINEDEFS / SIDEDEFS / SECTORS lumps of binary (Doom or Hexen) maps.

use std::path::Path;

use anyhow::Context as _;

use crate::{
    error::{MapgifError, MapgifResult},
    map::{MapData, RawVertex, SectorId, Segment, Side, SideId, VertexId},
};

const HEADER_LEN: usize = 12;
const DIR_ENTRY_LEN: usize = 16;
const NO_SIDE: u16 = 0xFFFF;
const ML_TWOSIDED: u16 = 0x0004;

const VERTEX_LEN: usize = 4;
const SIDEDEF_LEN: usize = 30;
const SECTOR_LEN: usize = 26;
const DOOM_LINEDEF_LEN: usize = 14;
const HEXEN_LINEDEF_LEN: usize = 16;

/// Lumps that may follow a binary map marker.
const MAP_LUMPS: &[&str] = &[
    "THINGS", "LINEDEFS", "SIDEDEFS", "VERTEXES", "SEGS", "SSECTORS", "NODES", "SECTORS", "REJECT",
    "BLOCKMAP", "BEHAVIOR", "SCRIPTS",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WadKind {
    Iwad,
    Pwad,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MapFormat {
    Doom,
    /// Doom layout plus a BEHAVIOR lump and 16-byte linedefs.
    Hexen,
    /// Text-based UDMF (`TEXTMAP`); not supported for rendering.
    Udmf,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lump {
    pub name: String,
    offset: usize,
    size: usize,
}

#[derive(Clone, Debug)]
struct MapEntry {
    name: String,
    /// Directory indices of the lumps after the marker.
    lumps: std::ops::Range<usize>,
    format: MapFormat,
}

#[derive(Clone, Debug)]
pub struct Wad {
    kind: WadKind,
    data: Vec<u8>,
    lumps: Vec<Lump>,
    maps: Vec<MapEntry>,
}

fn le_u16(b: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([b[at], b[at + 1]])
}

fn le_i16(b: &[u8], at: usize) -> i16 {
    i16::from_le_bytes([b[at], b[at + 1]])
}

fn le_i32(b: &[u8], at: usize) -> i32 {
    i32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

fn lump_name(raw: &[u8]) -> String {
    let end = raw.iter().position(|&c| c == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).to_ascii_uppercase()
}

impl Wad {
    pub fn from_file(path: &Path) -> MapgifResult<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("read WAD '{}'", path.display()))
            .map_err(|e| MapgifError::load(format!("{e:#}")))?;
        Self::from_bytes(data)
    }

    pub fn from_bytes(data: Vec<u8>) -> MapgifResult<Self> {
        if data.len() < HEADER_LEN {
            return Err(MapgifError::load(format!(
                "file too short for a WAD header ({} bytes)",
                data.len()
            )));
        }
        let kind = match &data[..4] {
            b"IWAD" => WadKind::Iwad,
            b"PWAD" => WadKind::Pwad,
            other => {
                return Err(MapgifError::load(format!(
                    "bad WAD identification {:?}",
                    String::from_utf8_lossy(other)
                )));
            }
        };

        let count = usize::try_from(le_i32(&data, 4))
            .map_err(|_| MapgifError::load("negative lump count"))?;
        let dir = usize::try_from(le_i32(&data, 8))
            .map_err(|_| MapgifError::load("negative directory offset"))?;
        let dir_end = count
            .checked_mul(DIR_ENTRY_LEN)
            .and_then(|n| n.checked_add(dir))
            .filter(|&end| end <= data.len())
            .ok_or_else(|| {
                MapgifError::load(format!(
                    "lump directory ({count} entries at {dir}) runs past end of file"
                ))
            })?;

        let mut lumps = Vec::with_capacity(count);
        for (i, entry) in data[dir..dir_end].chunks_exact(DIR_ENTRY_LEN).enumerate() {
            let name = lump_name(&entry[8..16]);
            let offset = usize::try_from(le_i32(entry, 0));
            let size = usize::try_from(le_i32(entry, 4));
            let (Ok(offset), Ok(size)) = (offset, size) else {
                return Err(MapgifError::load(format!(
                    "lump {i} ({name}) has a negative offset or size"
                )));
            };
            if offset.checked_add(size).is_none_or(|end| end > data.len()) {
                return Err(MapgifError::load(format!(
                    "lump {i} ({name}) runs past end of file"
                )));
            }
            lumps.push(Lump { name, offset, size });
        }

        let maps = find_maps(&lumps);
        tracing::debug!(?kind, lumps = lumps.len(), maps = maps.len(), "WAD loaded");
        Ok(Self {
            kind,
            data,
            lumps,
            maps,
        })
    }

    pub fn kind(&self) -> WadKind {
        self.kind
    }

    pub fn lumps(&self) -> &[Lump] {
        &self.lumps
    }

    /// Map marker names in directory order.
    pub fn map_names(&self) -> impl Iterator<Item = &str> {
        self.maps.iter().map(|m| m.name.as_str())
    }

    pub fn map_format(&self, name: &str) -> Option<MapFormat> {
        self.find_map(name).map(|m| m.format)
    }

    fn find_map(&self, name: &str) -> Option<&MapEntry> {
        self.maps.iter().find(|m| m.name.eq_ignore_ascii_case(name))
    }

    fn lump_data(&self, lump: &Lump) -> &[u8] {
        &self.data[lump.offset..lump.offset + lump.size]
    }

    /// Load one map's geometry. The name is matched case-insensitively.
    #[tracing::instrument(skip(self))]
    pub fn load_map(&self, name: &str) -> MapgifResult<MapData> {
        let entry = self
            .find_map(name)
            .ok_or_else(|| MapgifError::not_found(name.to_ascii_uppercase()))?;
        let map_name = entry.name.as_str();

        let linedef_len = match entry.format {
            MapFormat::Doom => DOOM_LINEDEF_LEN,
            MapFormat::Hexen => HEXEN_LINEDEF_LEN,
            MapFormat::Udmf => {
                return Err(MapgifError::unsupported(format!(
                    "{map_name} is a UDMF (TEXTMAP) map"
                )));
            }
        };

        let lump = |lump_name: &str| {
            self.lumps[entry.lumps.clone()]
                .iter()
                .find(|l| l.name == lump_name)
                .map(|l| self.lump_data(l))
        };
        let required = |lump_name: &str| {
            lump(lump_name).ok_or_else(|| {
                MapgifError::unsupported(format!("{map_name} has no {lump_name} lump"))
            })
        };
        let records = |lump_name: &str, data: &[u8], len: usize| {
            if data.len() % len != 0 {
                return Err(MapgifError::unsupported(format!(
                    "{map_name}: {lump_name} is {} bytes, not a multiple of the {len}-byte record",
                    data.len()
                )));
            }
            Ok(data.len() / len)
        };

        let vertex_data = required("VERTEXES")?;
        records("VERTEXES", vertex_data, VERTEX_LEN)?;
        let vertices = vertex_data
            .chunks_exact(VERTEX_LEN)
            .map(|r| RawVertex {
                x: i32::from(le_i16(r, 0)),
                y: i32::from(le_i16(r, 2)),
            })
            .collect();

        let side_data = required("SIDEDEFS")?;
        records("SIDEDEFS", side_data, SIDEDEF_LEN)?;
        let sides = side_data
            .chunks_exact(SIDEDEF_LEN)
            .map(|r| Side {
                sector: SectorId(u32::from(le_u16(r, 28))),
            })
            .collect();

        let line_data = required("LINEDEFS")?;
        records("LINEDEFS", line_data, linedef_len)?;
        let mut segments = Vec::with_capacity(line_data.len() / linedef_len);
        for (i, r) in line_data.chunks_exact(linedef_len).enumerate() {
            let flags = le_u16(r, 4);
            let (has_action, front, back) = match entry.format {
                MapFormat::Hexen => (r[6] != 0, le_u16(r, 12), le_u16(r, 14)),
                _ => (le_u16(r, 6) != 0, le_u16(r, 10), le_u16(r, 12)),
            };
            if front == NO_SIDE {
                return Err(MapgifError::load(format!(
                    "{map_name}: linedef {i} has no front sidedef"
                )));
            }
            segments.push(Segment {
                a: VertexId(u32::from(le_u16(r, 0))),
                b: VertexId(u32::from(le_u16(r, 2))),
                front: SideId(u32::from(front)),
                back: (back != NO_SIDE).then_some(SideId(u32::from(back))),
                two_sided: flags & ML_TWOSIDED != 0,
                has_action,
            });
        }

        let sector_count = match lump("SECTORS") {
            Some(data) => Some(records("SECTORS", data, SECTOR_LEN)? as u32),
            None => None,
        };

        let map = MapData {
            name: map_name.to_string(),
            vertices,
            sides,
            segments,
            sector_count,
        };
        map.validate()?;
        tracing::debug!(
            vertices = map.vertices.len(),
            segments = map.segments.len(),
            format = ?entry.format,
            "map loaded"
        );
        Ok(map)
    }
}

fn find_maps(lumps: &[Lump]) -> Vec<MapEntry> {
    let mut maps = Vec::new();
    let mut i = 0;
    while i + 1 < lumps.len() {
        let next = lumps[i + 1].name.as_str();
        if next == "TEXTMAP" {
            let end = lumps[i + 1..]
                .iter()
                .position(|l| l.name == "ENDMAP")
                .map_or(lumps.len(), |p| i + 1 + p + 1);
            maps.push(MapEntry {
                name: lumps[i].name.clone(),
                lumps: i + 1..end,
                format: MapFormat::Udmf,
            });
            i = end;
        } else if next == "THINGS" {
            let mut end = i + 1;
            while end < lumps.len() && MAP_LUMPS.contains(&lumps[end].name.as_str()) {
                end += 1;
            }
            let hexen = lumps[i + 1..end].iter().any(|l| l.name == "BEHAVIOR");
            maps.push(MapEntry {
                name: lumps[i].name.clone(),
                lumps: i + 1..end,
                format: if hexen {
                    MapFormat::Hexen
                } else {
                    MapFormat::Doom
                },
            });
            i = end;
        } else {
            i += 1;
        }
    }
    maps
}
