//! Per-edge classification against the contour value
//!
//! Every x-edge of the volume is reduced to one [`EdgeCase`]: the
//! above/below pattern of its two endpoints together with the
//! truncated-distance state of each endpoint.

/// Above/below pattern of the two endpoints of an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EdgeClass {
    /// Both endpoints below the contour value
    Below = 0,
    /// Only the left (lower index) endpoint is at or above the value
    LeftAbove = 1,
    /// Only the right endpoint is at or above the value
    RightAbove = 2,
    /// Both endpoints at or above the value
    BothAbove = 3,
}

impl EdgeClass {
    /// Classify a scalar pair; values equal to `iso` count as above
    #[inline]
    pub fn classify(s0: f32, s1: f32, iso: f32) -> Self {
        match (s0 >= iso, s1 >= iso) {
            (false, false) => EdgeClass::Below,
            (true, false) => EdgeClass::LeftAbove,
            (false, true) => EdgeClass::RightAbove,
            (true, true) => EdgeClass::BothAbove,
        }
    }

    #[inline]
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => EdgeClass::Below,
            1 => EdgeClass::LeftAbove,
            2 => EdgeClass::RightAbove,
            _ => EdgeClass::BothAbove,
        }
    }

    #[inline]
    pub fn bits(self) -> u8 {
        self as u8
    }

    /// The contour passes through this edge
    #[inline]
    pub fn is_crossing(self) -> bool {
        matches!(self, EdgeClass::LeftAbove | EdgeClass::RightAbove)
    }

    #[inline]
    pub fn left_above(self) -> bool {
        self.bits() & 1 != 0
    }

    #[inline]
    pub fn right_above(self) -> bool {
        self.bits() & 2 != 0
    }
}

/// Where a sample sits relative to a truncated distance band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum VertexState {
    /// `|v| < radius`, or any sample of a plain scalar field
    Near = 0,
    /// `v <= -radius`: observed free space
    Empty = 1,
    /// `v >= radius`: never observed
    Unseen = 2,
}

impl VertexState {
    /// State of a sample; without a radius every sample is near
    #[inline]
    pub fn of(value: f32, radius: Option<f32>) -> Self {
        match radius {
            None => VertexState::Near,
            Some(r) if value.abs() < r => VertexState::Near,
            Some(r) if value <= -r => VertexState::Empty,
            Some(_) => VertexState::Unseen,
        }
    }

    #[inline]
    fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => VertexState::Near,
            1 => VertexState::Empty,
            _ => VertexState::Unseen,
        }
    }

    /// Whether geometry may be generated at this sample
    ///
    /// Hole filling admits empty and unseen samples as well.
    #[inline]
    pub fn is_legal(self, hole_filling: bool) -> bool {
        hole_filling || self == VertexState::Near
    }
}

/// Combined state of an edge, derived from its two endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeState {
    Near,
    Empty,
    Unseen,
    /// One endpoint empty, the other unseen
    Separating,
}

/// Packed per-edge record: class in bits 0-1, left state in bits 2-3,
/// right state in bits 4-5
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EdgeCase(u8);

impl EdgeCase {
    #[inline]
    pub fn new(class: EdgeClass, left: VertexState, right: VertexState) -> Self {
        Self(class as u8 | (left as u8) << 2 | (right as u8) << 4)
    }

    #[inline]
    pub fn class(self) -> EdgeClass {
        EdgeClass::from_bits(self.0)
    }

    #[inline]
    pub fn left_state(self) -> VertexState {
        VertexState::from_bits(self.0 >> 2)
    }

    #[inline]
    pub fn right_state(self) -> VertexState {
        VertexState::from_bits(self.0 >> 4)
    }

    pub fn state(self) -> EdgeState {
        use VertexState::*;
        match (self.left_state(), self.right_state()) {
            (Near, Near) => EdgeState::Near,
            (Empty, Unseen) | (Unseen, Empty) => EdgeState::Separating,
            (Empty, _) | (_, Empty) => EdgeState::Empty,
            _ => EdgeState::Unseen,
        }
    }

    /// Crossing edge whose endpoints are both legal; such an edge owns one output point
    #[inline]
    pub fn is_active(self, hole_filling: bool) -> bool {
        self.class().is_crossing()
            && self.left_state().is_legal(hole_filling)
            && self.right_state().is_legal(hole_filling)
    }

    #[inline]
    pub fn bits(self) -> u8 {
        self.0
    }
}

/// Voxel case number from the x-edges of rows `(j,k)`, `(j+1,k)`, `(j,k+1)`, `(j+1,k+1)`
#[inline]
pub fn voxel_case(corners: &[EdgeCase; 4]) -> u8 {
    corners
        .iter()
        .enumerate()
        .fold(0u8, |case, (n, edge)| case | edge.class().bits() << (2 * n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(EdgeClass::classify(-1.0, -0.5, 0.0), EdgeClass::Below);
        assert_eq!(EdgeClass::classify(1.0, -0.5, 0.0), EdgeClass::LeftAbove);
        assert_eq!(EdgeClass::classify(-1.0, 0.5, 0.0), EdgeClass::RightAbove);
        assert_eq!(EdgeClass::classify(0.0, 0.0, 0.0), EdgeClass::BothAbove);
        assert_eq!(EdgeClass::classify(f32::NAN, 1.0, 0.0), EdgeClass::RightAbove);
    }

    #[test]
    fn test_vertex_states() {
        assert_eq!(VertexState::of(5.0, None), VertexState::Near);
        assert_eq!(VertexState::of(0.5, Some(1.0)), VertexState::Near);
        assert_eq!(VertexState::of(-1.0, Some(1.0)), VertexState::Empty);
        assert_eq!(VertexState::of(1.0, Some(1.0)), VertexState::Unseen);

        assert!(!VertexState::Empty.is_legal(false));
        assert!(VertexState::Empty.is_legal(true));
    }

    #[test]
    fn test_packing_keeps_fields_apart() {
        let edge = EdgeCase::new(EdgeClass::RightAbove, VertexState::Unseen, VertexState::Empty);

        assert_eq!(edge.class(), EdgeClass::RightAbove);
        assert_eq!(edge.left_state(), VertexState::Unseen);
        assert_eq!(edge.right_state(), VertexState::Empty);
        assert_eq!(edge.state(), EdgeState::Separating);
        assert!(!edge.is_active(false));
        assert!(edge.is_active(true));
    }

    #[test]
    fn test_edge_state() {
        let near = EdgeCase::new(EdgeClass::LeftAbove, VertexState::Near, VertexState::Near);
        let half = EdgeCase::new(EdgeClass::LeftAbove, VertexState::Near, VertexState::Unseen);

        assert_eq!(near.state(), EdgeState::Near);
        assert!(near.is_active(false));
        assert_eq!(half.state(), EdgeState::Unseen);
        assert!(!half.is_active(false));
    }

    #[test]
    fn test_voxel_case_packing() {
        let n = VertexState::Near;
        let corners = [
            EdgeCase::new(EdgeClass::LeftAbove, n, n),
            EdgeCase::new(EdgeClass::Below, n, n),
            EdgeCase::new(EdgeClass::BothAbove, n, n),
            EdgeCase::new(EdgeClass::RightAbove, n, n),
        ];

        assert_eq!(voxel_case(&corners), 0b10_11_00_01);
    }
}
