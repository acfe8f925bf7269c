//! Quadrant layout of the tooth chart.
//!
//! The chart is two rows (upper, lower) of two quadrant slots split at the
//! midline. The viewer's left slots run from the periphery inward (18…11,
//! 48…41) and the right slots from the midline outward (21…28, 31…38), which
//! mirrors the linear numbering into a symmetric arrangement. Mixed dentition
//! nests the deciduous row under the permanent row of the same slot.

use crate::models::{DentitionType, ToothNumber};

/// Which side of the midline a slot sits on, from the viewer's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// One run of teeth within a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToothRow {
    /// Anatomical quadrant (1–8)
    pub quadrant: u8,
    /// Teeth in display order
    pub teeth: Vec<ToothNumber>,
    /// Rendered at reduced size (deciduous row of a mixed chart)
    pub scaled: bool,
}

/// A quadrant slot: one or two nested rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuadrantSlot {
    pub side: Side,
    pub rows: Vec<ToothRow>,
}

/// The full chart arrangement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartLayout {
    pub dentition_type: DentitionType,
    /// Upper jaw, left slot then right slot
    pub upper: [QuadrantSlot; 2],
    /// Lower jaw, left slot then right slot
    pub lower: [QuadrantSlot; 2],
}

impl ChartLayout {
    pub fn for_dentition(dentition_type: DentitionType) -> Self {
        let slot = |side: Side, permanent: u8, deciduous: u8| {
            let rows = match dentition_type {
                DentitionType::Adult => vec![quadrant_row(permanent, side, false)],
                DentitionType::Child => vec![quadrant_row(deciduous, side, false)],
                DentitionType::Mixed => vec![
                    quadrant_row(permanent, side, false),
                    quadrant_row(deciduous, side, true),
                ],
            };
            QuadrantSlot { side, rows }
        };

        Self {
            dentition_type,
            upper: [slot(Side::Left, 1, 5), slot(Side::Right, 2, 6)],
            lower: [slot(Side::Left, 4, 8), slot(Side::Right, 3, 7)],
        }
    }

    /// Every tooth on the chart, in display order.
    pub fn teeth(&self) -> impl Iterator<Item = ToothNumber> + '_ {
        self.upper
            .iter()
            .chain(self.lower.iter())
            .flat_map(|slot| slot.rows.iter())
            .flat_map(|row| row.teeth.iter().copied())
    }

    pub fn contains(&self, tooth: ToothNumber) -> bool {
        self.teeth().any(|t| t == tooth)
    }
}

/// Number of teeth in a quadrant.
pub fn quadrant_size(quadrant: u8) -> u8 {
    if quadrant >= 5 {
        5
    } else {
        8
    }
}

/// Teeth of one quadrant ordered for the given side of the midline.
pub fn quadrant_row(quadrant: u8, side: Side, scaled: bool) -> ToothRow {
    let positions: Vec<u8> = match side {
        Side::Left => (1..=quadrant_size(quadrant)).rev().collect(),
        Side::Right => (1..=quadrant_size(quadrant)).collect(),
    };
    let teeth = positions
        .into_iter()
        .filter_map(|position| ToothNumber::new(quadrant * 10 + position).ok())
        .collect();
    ToothRow {
        quadrant,
        teeth,
        scaled,
    }
}
