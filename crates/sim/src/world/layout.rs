use super::Rect;

pub const BLOCK_SIZE: i32 = 100;
/// Building lots occupy `y in [0, LOT_DEPTH)`; the rest of the block is
/// sidewalk, where appended street slots live.
pub const LOT_DEPTH: i32 = 90;

const QUADRANT: [Rect; 4] = [
    Rect::new(0, 0, 50, 45),
    Rect::new(50, 0, 50, 45),
    Rect::new(0, 45, 50, 45),
    Rect::new(50, 45, 50, 45),
];

const SIXTY_FORTY: [Rect; 2] = [Rect::new(0, 0, 60, 90), Rect::new(60, 0, 40, 90)];

const STRIP: [Rect; 4] = [
    Rect::new(0, 0, 100, 54),
    Rect::new(0, 54, 33, 36),
    Rect::new(33, 54, 33, 36),
    Rect::new(66, 54, 34, 36),
];

const TRIPLE_VERTICAL: [Rect; 3] = [
    Rect::new(0, 0, 33, 90),
    Rect::new(33, 0, 33, 90),
    Rect::new(66, 0, 34, 90),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockLayout {
    Quadrant,
    SixtyForty,
    Strip,
    TripleVertical,
}

impl BlockLayout {
    pub(crate) fn from_unit(value: f64) -> Self {
        match (value * 4.0) as u32 {
            0 => Self::Quadrant,
            1 => Self::SixtyForty,
            2 => Self::Strip,
            _ => Self::TripleVertical,
        }
    }

    pub(crate) fn slots(self) -> &'static [Rect] {
        match self {
            Self::Quadrant => &QUADRANT,
            Self::SixtyForty => &SIXTY_FORTY,
            Self::Strip => &STRIP,
            Self::TripleVertical => &TRIPLE_VERTICAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_layout_tiles_the_lot_exactly() {
        for layout in [
            BlockLayout::Quadrant,
            BlockLayout::SixtyForty,
            BlockLayout::Strip,
            BlockLayout::TripleVertical,
        ] {
            let total: i64 = layout.slots().iter().map(Rect::area).sum();
            assert_eq!(total, i64::from(BLOCK_SIZE * LOT_DEPTH), "{layout:?}");
        }
    }

    #[test]
    fn unit_draw_maps_to_quarters() {
        assert_eq!(BlockLayout::from_unit(0.0), BlockLayout::Quadrant);
        assert_eq!(BlockLayout::from_unit(0.26), BlockLayout::SixtyForty);
        assert_eq!(BlockLayout::from_unit(0.5), BlockLayout::Strip);
        assert_eq!(BlockLayout::from_unit(0.999), BlockLayout::TripleVertical);
    }
}
