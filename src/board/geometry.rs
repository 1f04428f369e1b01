//! Hex-grid cell centers and nearest-cell assignment.
//!
//! The board is 8 rows by 5 columns. Rows are offset horizontally every
//! other row, so each row has its own X start; all rows share one spacing.

use crate::region::PixelRect;
use crate::util::math::distance;
use crate::util::{BoardSightError, BoardSightResult};

/// Number of board rows.
pub const BOARD_ROWS: usize = 8;
/// Number of cells per row.
pub const BOARD_COLS: usize = 5;
/// Rows at the bottom of the board that belong to the player.
pub const PLAYABLE_ROWS: usize = 4;

/// Coordinate frame of the calibration table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CalibrationOrigin {
    /// Screen pixels of the reference capture.
    #[default]
    Absolute,
    /// Offsets from the top-left corner of the board rectangle.
    BoardRelative,
}

/// Measured hex layout.
#[derive(Clone, Debug, PartialEq)]
pub struct Calibration {
    /// Y coordinate of each row's cell centers.
    pub row_y: [f32; BOARD_ROWS],
    /// X of column 0 on rows 0, 2, 4 and 6.
    pub x_start_even: f32,
    /// X of column 0 on rows 1, 3, 5 and 7.
    pub x_start_odd: f32,
    /// Horizontal distance between neighbouring cells in a row.
    pub spacing: f32,
    pub origin: CalibrationOrigin,
    /// Assignment radius as a multiple of the larger cell pitch.
    pub radius_factor: f32,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            row_y: [538.0, 594.0, 650.0, 706.0, 763.0, 819.0, 875.0, 932.0],
            x_start_even: 1136.0,
            x_start_odd: 1094.0,
            spacing: 82.0,
            origin: CalibrationOrigin::Absolute,
            radius_factor: 1.5,
        }
    }
}

impl Calibration {
    /// Checks that every value is finite and the spacing and radius are positive.
    pub fn validate(&self) -> BoardSightResult<()> {
        let finite = self
            .row_y
            .iter()
            .chain([&self.x_start_even, &self.x_start_odd])
            .all(|v| v.is_finite());
        if !finite {
            return Err(BoardSightError::InvalidCalibration {
                reason: "coordinates must be finite",
            });
        }
        if !(self.spacing.is_finite() && self.spacing > 0.0) {
            return Err(BoardSightError::InvalidCalibration {
                reason: "spacing must be > 0",
            });
        }
        if !(self.radius_factor.is_finite() && self.radius_factor > 0.0) {
            return Err(BoardSightError::InvalidCalibration {
                reason: "radius_factor must be > 0",
            });
        }
        Ok(())
    }

    fn x_start(&self, row: usize) -> f32 {
        if row % 2 == 0 {
            self.x_start_even
        } else {
            self.x_start_odd
        }
    }
}

/// Precomputed cell centers and assignment radius for one board rectangle.
#[derive(Clone, Debug, PartialEq)]
pub struct BoardGeometry {
    board: PixelRect,
    centers: [[(f32, f32); BOARD_COLS]; BOARD_ROWS],
    radius: f32,
}

impl BoardGeometry {
    /// Builds the geometry for `board` from a calibration table.
    pub fn build(board: PixelRect, calibration: &Calibration) -> BoardSightResult<Self> {
        calibration.validate()?;
        if board.width == 0 || board.height == 0 {
            return Err(BoardSightError::InvalidCalibration {
                reason: "board rectangle is empty",
            });
        }

        let (dx, dy) = match calibration.origin {
            CalibrationOrigin::Absolute => (0.0, 0.0),
            CalibrationOrigin::BoardRelative => (board.x as f32, board.y as f32),
        };
        let mut centers = [[(0.0f32, 0.0f32); BOARD_COLS]; BOARD_ROWS];
        for (row, row_centers) in centers.iter_mut().enumerate() {
            let x_start = calibration.x_start(row);
            for (col, center) in row_centers.iter_mut().enumerate() {
                *center = (
                    dx + x_start + col as f32 * calibration.spacing,
                    dy + calibration.row_y[row],
                );
            }
        }

        let pitch_x = board.width as f32 / BOARD_COLS as f32;
        let pitch_y = board.height as f32 / BOARD_ROWS as f32;
        let radius = calibration.radius_factor * pitch_x.max(pitch_y);

        Ok(Self {
            board,
            centers,
            radius,
        })
    }

    /// Returns the board rectangle in frame pixels.
    pub fn board(&self) -> PixelRect {
        self.board
    }

    /// Returns the maximum center distance for an assignment.
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Returns the center of `(row, col)`.
    pub fn center(&self, row: usize, col: usize) -> Option<(f32, f32)> {
        self.centers.get(row)?.get(col).copied()
    }

    /// Iterates over `((row, col), center)` in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = ((usize, usize), (f32, f32))> + '_ {
        self.centers.iter().enumerate().flat_map(|(row, centers)| {
            centers
                .iter()
                .enumerate()
                .map(move |(col, &center)| ((row, col), center))
        })
    }

    /// Nearest cell to `(x, y)`, if it lies within the radius.
    ///
    /// Equidistant cells resolve to the first one in row-major order.
    pub fn assign(&self, x: f32, y: f32) -> Option<(usize, usize)> {
        let mut best: Option<((usize, usize), f32)> = None;
        for (cell, (cx, cy)) in self.cells() {
            let dist = distance(x, y, cx, cy);
            if best.map_or(true, |(_, best_dist)| dist < best_dist) {
                best = Some((cell, dist));
            }
        }
        match best {
            Some((cell, dist)) if dist <= self.radius => Some(cell),
            _ => None,
        }
    }

    /// Returns true for rows in the player's half of the board.
    pub fn is_playable_row(row: usize) -> bool {
        (BOARD_ROWS - PLAYABLE_ROWS..BOARD_ROWS).contains(&row)
    }
}

#[cfg(test)]
mod tests {
    use super::{BoardGeometry, Calibration, CalibrationOrigin};
    use crate::region::{PixelRect, SearchRegion};

    fn reference_geometry() -> BoardGeometry {
        let board = SearchRegion::field_board().resolve(2560, 1440).unwrap();
        BoardGeometry::build(board, &Calibration::default()).unwrap()
    }

    #[test]
    fn centers_follow_the_calibration_table() {
        let geo = reference_geometry();
        assert_eq!(geo.center(0, 0), Some((1136.0, 538.0)));
        assert_eq!(geo.center(1, 0), Some((1094.0, 594.0)));
        assert_eq!(geo.center(7, 4), Some((1094.0 + 4.0 * 82.0, 932.0)));
        assert_eq!(geo.center(8, 0), None);
        assert_eq!(geo.cells().count(), 40);
    }

    #[test]
    fn radius_uses_larger_pitch() {
        let geo = reference_geometry();
        // 512 / 5 = 102.4 beats 490 / 8.
        assert!((geo.radius() - 153.6).abs() < 1e-3);
    }

    #[test]
    fn exact_center_assigns_its_cell() {
        let geo = reference_geometry();
        assert_eq!(geo.assign(1300.0, 763.0), Some((4, 2)));
    }

    #[test]
    fn equidistant_point_takes_first_cell() {
        let geo = reference_geometry();
        assert_eq!(geo.assign(1177.0, 538.0), Some((0, 0)));
    }

    #[test]
    fn far_point_is_unassigned() {
        let geo = reference_geometry();
        assert_eq!(geo.assign(100.0, 100.0), None);
    }

    #[test]
    fn relative_calibration_is_offset_by_the_board() {
        let board = PixelRect {
            x: 100,
            y: 50,
            width: 500,
            height: 400,
        };
        let calibration = Calibration {
            row_y: [10.0, 60.0, 110.0, 160.0, 210.0, 260.0, 310.0, 360.0],
            x_start_even: 40.0,
            x_start_odd: 0.0,
            spacing: 100.0,
            origin: CalibrationOrigin::BoardRelative,
            radius_factor: 1.5,
        };
        let geo = BoardGeometry::build(board, &calibration).unwrap();
        assert_eq!(geo.center(0, 1), Some((240.0, 60.0)));
        assert_eq!(geo.center(1, 0), Some((100.0, 110.0)));
    }

    #[test]
    fn invalid_calibration_is_rejected() {
        let board = PixelRect {
            x: 0,
            y: 0,
            width: 10,
            height: 10,
        };
        let bad = Calibration {
            spacing: 0.0,
            ..Calibration::default()
        };
        assert!(BoardGeometry::build(board, &bad).is_err());
        let empty = PixelRect {
            width: 0,
            ..board
        };
        assert!(BoardGeometry::build(empty, &Calibration::default()).is_err());
    }

    #[test]
    fn playable_rows_are_the_bottom_four() {
        let playable: Vec<usize> = (0..8)
            .filter(|&row| BoardGeometry::is_playable_row(row))
            .collect();
        assert_eq!(playable, vec![4, 5, 6, 7]);
    }
}
