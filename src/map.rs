use crate::error::{MapgifError, MapgifResult};

macro_rules! index_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize,
            serde::Deserialize,
        )]
        pub struct $name(pub u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

index_id!(
    /// Position of a vertex in [`MapData::vertices`].
    VertexId
);
index_id!(
    /// Position of a side in [`MapData::sides`].
    SideId
);
index_id!(
    /// Stable segment identity: its position in [`MapData::segments`].
    SegmentId
);
index_id!(SectorId);

/// Vertex in level space (y grows upwards).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RawVertex {
    pub x: i32,
    pub y: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Side {
    pub sector: SectorId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Segment {
    pub a: VertexId,
    pub b: VertexId,
    pub front: SideId,
    pub back: Option<SideId>,
    pub two_sided: bool,
    pub has_action: bool,
}

impl Segment {
    /// Back side, if the segment is flagged two-sided and actually has one.
    pub fn back_side(&self) -> Option<SideId> {
        if self.two_sided { self.back } else { None }
    }
}

/// One map's geometry as typed records.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MapData {
    pub name: String,
    pub vertices: Vec<RawVertex>,
    pub sides: Vec<Side>,
    pub segments: Vec<Segment>,
    /// Sector count when known; sector references are only range-checked against it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector_count: Option<u32>,
}

impl MapData {
    pub fn validate(&self) -> MapgifResult<()> {
        let vcount = self.vertices.len();
        let scount = self.sides.len();

        for (i, seg) in self.segments.iter().enumerate() {
            for v in [seg.a, seg.b] {
                if v.index() >= vcount {
                    return Err(MapgifError::load(format!(
                        "{}: segment {i} references vertex {} (only {vcount} vertices)",
                        self.name, v.0
                    )));
                }
            }
            for side in std::iter::once(seg.front).chain(seg.back) {
                if side.index() >= scount {
                    return Err(MapgifError::load(format!(
                        "{}: segment {i} references side {} (only {scount} sides)",
                        self.name, side.0
                    )));
                }
            }
        }

        if let Some(n) = self.sector_count {
            for (i, side) in self.sides.iter().enumerate() {
                if side.sector.0 >= n {
                    return Err(MapgifError::load(format!(
                        "{}: side {i} references sector {} (only {n} sectors)",
                        self.name, side.sector.0
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn segment(&self, id: SegmentId) -> &Segment {
        &self.segments[id.index()]
    }

    pub fn side_sector(&self, side: SideId) -> SectorId {
        self.sides[side.index()].sector
    }

    pub fn segment_ids(&self) -> impl Iterator<Item = SegmentId> + '_ {
        (0..self.segments.len() as u32).map(SegmentId)
    }

    /// Sectors bordered by a segment: front first, then back when two-sided.
    pub fn segment_sectors(&self, id: SegmentId) -> (SectorId, Option<SectorId>) {
        let seg = self.segment(id);
        (
            self.side_sector(seg.front),
            seg.back_side().map(|s| self.side_sector(s)),
        )
    }
}
