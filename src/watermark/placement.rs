//! Watermark placement
//!
//! The mask is split into four equal quadrants and the text goes into the
//! corner of the quadrant with the fewest set cells. Ties go to the
//! quadrant that comes first in `Quadrant::PRIORITY`.

use std::fmt;
use std::ops::Range;

use log::debug;

use crate::errors::{WatermarkError, WatermarkResult};
use crate::watermark::mask::BinaryMask;

/// One of the four equal partitions of the mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quadrant {
    UpperLeft,
    UpperRight,
    BottomLeft,
    BottomRight,
}

impl Quadrant {
    /// Scan order; the first minimum in this order wins
    pub const PRIORITY: [Quadrant; 4] = [
        Quadrant::UpperLeft,
        Quadrant::UpperRight,
        Quadrant::BottomLeft,
        Quadrant::BottomRight,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Quadrant::UpperLeft => "upper_left",
            Quadrant::UpperRight => "upper_right",
            Quadrant::BottomLeft => "bottom_left",
            Quadrant::BottomRight => "bottom_right",
        }
    }

    fn index(&self) -> usize {
        match self {
            Quadrant::UpperLeft => 0,
            Quadrant::UpperRight => 1,
            Quadrant::BottomLeft => 2,
            Quadrant::BottomRight => 3,
        }
    }

    /// Column and row ranges of this quadrant in a grid of even size
    pub fn cell_ranges(&self, width: u32, height: u32) -> (Range<u32>, Range<u32>) {
        let (half_w, half_h) = (width / 2, height / 2);
        match self {
            Quadrant::UpperLeft => (0..half_w, 0..half_h),
            Quadrant::UpperRight => (half_w..width, 0..half_h),
            Quadrant::BottomLeft => (0..half_w, half_h..height),
            Quadrant::BottomRight => (half_w..width, half_h..height),
        }
    }

    /// Top-left corner for text of the given size anchored in this corner
    ///
    /// Keeps `margin` pixels from the adjacent edges. Right and bottom
    /// anchors subtract the text extent; the result never goes below 0.
    pub fn anchor(&self, width: u32, height: u32, text: TextMetrics, margin: u32) -> PlacementCoordinate {
        let near = margin as i64;
        let far_x = width as i64 - text.width as i64 - margin as i64;
        let far_y = height as i64 - text.height as i64 - margin as i64;

        let (x, y) = match self {
            Quadrant::UpperLeft => (near, near),
            Quadrant::UpperRight => (far_x, near),
            Quadrant::BottomLeft => (near, far_y),
            Quadrant::BottomRight => (far_x, far_y),
        };

        PlacementCoordinate {
            x: x.max(0) as i32,
            y: y.max(0) as i32,
        }
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Measured extent of the watermark text in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextMetrics {
    pub width: u32,
    pub height: u32,
}

/// Pixel position of the text's top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementCoordinate {
    pub x: i32,
    pub y: i32,
}

impl PlacementCoordinate {
    pub fn new(x: i32, y: i32) -> Self {
        PlacementCoordinate { x, y }
    }
}

impl fmt::Display for PlacementCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Set-cell counts of the four quadrants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuadrantSums {
    sums: [u64; 4],
}

impl QuadrantSums {
    /// Counts set cells per quadrant
    ///
    /// Both mask dimensions must be even.
    pub fn from_mask(mask: &BinaryMask) -> WatermarkResult<Self> {
        let (width, height) = (mask.width(), mask.height());
        if width % 2 != 0 || height % 2 != 0 {
            return Err(WatermarkError::OddMaskDimensions(width, height));
        }

        let mut sums = [0u64; 4];
        for quadrant in Quadrant::PRIORITY {
            let (columns, rows) = quadrant.cell_ranges(width, height);
            sums[quadrant.index()] = mask.count_in(columns.start, columns.end, rows.start, rows.end);
        }

        Ok(QuadrantSums { sums })
    }

    pub fn get(&self, quadrant: Quadrant) -> u64 {
        self.sums[quadrant.index()]
    }

    pub fn total(&self) -> u64 {
        self.sums.iter().sum()
    }

    /// Quadrant with the smallest sum, first in priority order on ties
    pub fn least_busy(&self) -> Quadrant {
        let mut best = Quadrant::PRIORITY[0];
        for quadrant in Quadrant::PRIORITY.iter().skip(1) {
            if self.get(*quadrant) < self.get(best) {
                best = *quadrant;
            }
        }
        best
    }
}

/// Result of choosing where the watermark goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub quadrant: Quadrant,
    pub sums: QuadrantSums,
    pub coordinate: PlacementCoordinate,
}

/// Chooses the watermark position from a mask and measured text
#[derive(Debug, Clone, Copy)]
pub struct PlacementSelector {
    margin: u32,
}

impl PlacementSelector {
    pub fn new(margin: u32) -> Self {
        PlacementSelector { margin }
    }

    pub fn select(&self, mask: &BinaryMask, text: TextMetrics) -> WatermarkResult<Placement> {
        let sums = QuadrantSums::from_mask(mask)?;
        let quadrant = sums.least_busy();
        let coordinate = quadrant.anchor(mask.width(), mask.height(), text, self.margin);

        debug!(
            "Quadrant sums {:?}, chose {} at {}",
            sums.sums, quadrant, coordinate
        );

        Ok(Placement {
            quadrant,
            sums,
            coordinate,
        })
    }
}
