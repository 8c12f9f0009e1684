//! Sector-connectivity tracing.
//!
//! A trace starts at one segment and walks every segment that shares an endpoint with an
//! already-visited one while bordering the same sector. The walk is depth-first pre-order and
//! visits neighbours in segment-index order, which fixes the reveal order of the animation.

use std::collections::HashMap;

use crate::map::{MapData, SectorId, SegmentId, VertexId};

/// Membership set over segment ids, backed by a bitmap sized to the map.
#[derive(Clone, Debug, Default)]
pub struct SegmentSet {
    bits: Vec<u64>,
    len: usize,
}

impl SegmentSet {
    pub fn with_capacity(segments: usize) -> Self {
        Self {
            bits: vec![0; segments.div_ceil(64)],
            len: 0,
        }
    }

    pub fn contains(&self, id: SegmentId) -> bool {
        let i = id.index();
        self.bits
            .get(i / 64)
            .is_some_and(|word| word & (1u64 << (i % 64)) != 0)
    }

    /// Returns `true` if the id was not already present.
    pub fn insert(&mut self, id: SegmentId) -> bool {
        let i = id.index();
        if i / 64 >= self.bits.len() {
            self.bits.resize(i / 64 + 1, 0);
        }
        let word = &mut self.bits[i / 64];
        let mask = 1u64 << (i % 64);
        if *word & mask != 0 {
            return false;
        }
        *word |= mask;
        self.len += 1;
        true
    }

    /// Returns `true` if the id was present.
    pub fn remove(&mut self, id: SegmentId) -> bool {
        let i = id.index();
        let Some(word) = self.bits.get_mut(i / 64) else {
            return false;
        };
        let mask = 1u64 << (i % 64);
        if *word & mask == 0 {
            return false;
        }
        *word &= !mask;
        self.len -= 1;
        true
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Segments incident to each (sector, vertex) pair.
#[derive(Clone, Debug, Default)]
pub struct AdjacencyIndex {
    by_corner: HashMap<(SectorId, VertexId), Vec<SegmentId>>,
}

impl AdjacencyIndex {
    pub fn build(map: &MapData) -> Self {
        let mut by_corner: HashMap<(SectorId, VertexId), Vec<SegmentId>> = HashMap::new();
        for id in map.segment_ids() {
            let seg = map.segment(id);
            let (front, back) = map.segment_sectors(id);
            for sector in std::iter::once(front).chain(back.filter(|&b| b != front)) {
                for v in [seg.a, seg.b] {
                    let list = by_corner.entry((sector, v)).or_default();
                    // a == b would register twice
                    if list.last() != Some(&id) {
                        list.push(id);
                    }
                }
            }
        }
        Self { by_corner }
    }

    /// Incident segments in ascending id order.
    pub fn incident(&self, sector: SectorId, vertex: VertexId) -> &[SegmentId] {
        self.by_corner
            .get(&(sector, vertex))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

pub struct Tracer<'m> {
    map: &'m MapData,
    index: AdjacencyIndex,
}

impl<'m> Tracer<'m> {
    pub fn new(map: &'m MapData) -> Self {
        Self {
            map,
            index: AdjacencyIndex::build(map),
        }
    }

    pub fn index(&self) -> &AdjacencyIndex {
        &self.index
    }

    /// Sector a fresh trace from `seg` follows: the front sector, or the lower-numbered of the
    /// two sectors of a two-sided segment.
    pub fn resolve_sector(&self, seg: SegmentId) -> SectorId {
        match self.map.segment_sectors(seg) {
            (front, Some(back)) => front.min(back),
            (front, None) => front,
        }
    }

    /// Segments sharing an endpoint with `seg` under `sector`, ascending and deduplicated.
    fn neighbors(&self, seg: SegmentId, sector: SectorId) -> Vec<SegmentId> {
        let s = self.map.segment(seg);
        let (left, right) = (
            self.index.incident(sector, s.a),
            self.index.incident(sector, s.b),
        );

        let mut out = Vec::with_capacity(left.len() + right.len());
        let (mut i, mut j) = (0, 0);
        while i < left.len() || j < right.len() {
            let next = match (left.get(i), right.get(j)) {
                (Some(&l), Some(&r)) if l == r => {
                    i += 1;
                    j += 1;
                    l
                }
                (Some(&l), Some(&r)) if l < r => {
                    i += 1;
                    l
                }
                (Some(&l), None) => {
                    i += 1;
                    l
                }
                (_, Some(&r)) => {
                    j += 1;
                    r
                }
                (None, None) => break,
            };
            out.push(next);
        }
        out
    }

    /// Ordered run of segments reachable from `start` within one sector.
    ///
    /// With `sector == None` the sector is resolved from `start` (see
    /// [`Tracer::resolve_sector`]). `start` is always the first element, even if it does not
    /// border an explicitly given sector.
    pub fn trace(&self, start: SegmentId, sector: Option<SectorId>) -> Vec<SegmentId> {
        let sector = sector.unwrap_or_else(|| self.resolve_sector(start));

        let mut visited = SegmentSet::with_capacity(self.map.segments.len());
        let mut order = vec![start];
        visited.insert(start);

        // (segment, its neighbours, next neighbour to look at)
        let mut stack = vec![(self.neighbors(start, sector), 0usize)];
        while let Some((neighbors, cursor)) = stack.last_mut() {
            let Some(&next) = neighbors.get(*cursor) else {
                stack.pop();
                continue;
            };
            *cursor += 1;
            if visited.insert(next) {
                order.push(next);
                stack.push((self.neighbors(next, sector), 0));
            }
        }

        order
    }
}
