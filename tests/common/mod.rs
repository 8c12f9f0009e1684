#![allow(dead_code)]

use std::path::PathBuf;

use mapgif::{MapData, RawVertex, SectorId, Segment, Side, SideId, VertexId};

pub const NO_SIDE: u16 = 0xFFFF;
pub const ML_BLOCKING: u16 = 0x0001;
pub const ML_TWOSIDED: u16 = 0x0004;

/// Builds a PWAD image from named lumps, in order.
#[derive(Default)]
pub struct WadBuilder {
    lumps: Vec<(String, Vec<u8>)>,
}

impl WadBuilder {
    pub fn lump(mut self, name: &str, data: Vec<u8>) -> Self {
        self.lumps.push((name.to_string(), data));
        self
    }

    /// A Doom-format map with the given vertices, `(a, b, flags, special, front, back)`
    /// linedefs, and sidedef sectors.
    pub fn doom_map(
        self,
        name: &str,
        vertices: &[(i16, i16)],
        lines: &[(u16, u16, u16, u16, u16, u16)],
        side_sectors: &[u16],
    ) -> Self {
        let linedefs = lines
            .iter()
            .flat_map(|&(a, b, flags, special, front, back)| {
                words(&[a, b, flags, special, 0, front, back])
            })
            .collect();
        let sectors = side_sectors.iter().copied().max().map_or(0, |m| m + 1);
        self.lump(name, vec![])
            .lump("THINGS", vec![0; 10])
            .lump("LINEDEFS", linedefs)
            .lump(
                "SIDEDEFS",
                side_sectors.iter().flat_map(|&s| sidedef(s)).collect(),
            )
            .lump("VERTEXES", vertexes(vertices))
            .lump("SECTORS", vec![0; 26 * sectors as usize])
    }

    pub fn build(self) -> Vec<u8> {
        let mut out = b"PWAD".to_vec();
        out.extend_from_slice(&(self.lumps.len() as i32).to_le_bytes());
        let body: usize = self.lumps.iter().map(|(_, d)| d.len()).sum();
        out.extend_from_slice(&((12 + body) as i32).to_le_bytes());
        let mut offsets = Vec::with_capacity(self.lumps.len());
        for (_, data) in &self.lumps {
            offsets.push(out.len());
            out.extend_from_slice(data);
        }
        for ((name, data), offset) in self.lumps.iter().zip(offsets) {
            out.extend_from_slice(&(offset as i32).to_le_bytes());
            out.extend_from_slice(&(data.len() as i32).to_le_bytes());
            let mut raw = [0u8; 8];
            raw[..name.len()].copy_from_slice(name.as_bytes());
            out.extend_from_slice(&raw);
        }
        out
    }
}

pub fn words(values: &[u16]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn vertexes(points: &[(i16, i16)]) -> Vec<u8> {
    points
        .iter()
        .flat_map(|&(x, y)| [x.to_le_bytes(), y.to_le_bytes()].concat())
        .collect()
}

pub fn sidedef(sector: u16) -> Vec<u8> {
    let mut r = vec![0u8; 30];
    r[28..30].copy_from_slice(&sector.to_le_bytes());
    r
}

pub const QUAD: [(i16, i16); 4] = [(0, 0), (64, 0), (64, 64), (0, 64)];

/// Closed square room in sector 0.
pub fn quad_lines() -> Vec<(u16, u16, u16, u16, u16, u16)> {
    vec![
        (0, 1, ML_BLOCKING, 0, 0, NO_SIDE),
        (1, 2, ML_BLOCKING, 0, 0, NO_SIDE),
        (2, 3, ML_BLOCKING, 0, 0, NO_SIDE),
        (3, 0, ML_BLOCKING, 0, 0, NO_SIDE),
    ]
}

pub fn quad_map() -> MapData {
    MapData {
        name: "QUAD".to_string(),
        vertices: QUAD
            .iter()
            .map(|&(x, y)| RawVertex {
                x: x.into(),
                y: y.into(),
            })
            .collect(),
        sides: vec![Side {
            sector: SectorId(0),
        }],
        segments: (0..4)
            .map(|i| Segment {
                a: VertexId(i),
                b: VertexId((i + 1) % 4),
                front: SideId(0),
                back: None,
                two_sided: false,
                has_action: false,
            })
            .collect(),
        sector_count: Some(1),
    }
}

pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join(name);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
