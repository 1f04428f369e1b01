//! Hex board layout and per-cycle board state.
//!
//! [`BoardGeometry`] is built once from a calibration table. [`BoardState`]
//! is owned by the caller and refilled every detection cycle: it is reset,
//! populated with the cycle's surviving matches, queried, and reset again on
//! the next cycle. Nothing carries over between cycles.

pub mod geometry;
mod summary;

pub use geometry::{
    BoardGeometry, Calibration, CalibrationOrigin, BOARD_COLS, BOARD_ROWS, PLAYABLE_ROWS,
};
pub use summary::{BoardSummary, CellSummary};

use crate::search::Match;

/// One board cell and the matches assigned to it this cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct HexCell {
    row: usize,
    col: usize,
    center: (f32, f32),
    matches: Vec<Match>,
}

impl HexCell {
    /// Returns the zero-based row.
    pub fn row(&self) -> usize {
        self.row
    }

    /// Returns the zero-based column.
    pub fn col(&self) -> usize {
        self.col
    }

    /// Returns the cell center in frame pixels.
    pub fn center(&self) -> (f32, f32) {
        self.center
    }

    /// Matches assigned to this cell, in placement order.
    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    /// Returns true if at least one match sits in the cell.
    pub fn is_occupied(&self) -> bool {
        !self.matches.is_empty()
    }

    /// Returns true for cells in the player's half of the board.
    pub fn is_playable(&self) -> bool {
        BoardGeometry::is_playable_row(self.row)
    }

    /// One-based label, e.g. `Row 5, Col 3`.
    pub fn label(&self) -> String {
        format!("Row {}, Col {}", self.row + 1, self.col + 1)
    }
}

/// Cells of the board plus the matches that fell outside every cell.
#[derive(Clone, Debug, PartialEq)]
pub struct BoardState {
    cells: Vec<HexCell>,
    unassigned: Vec<Match>,
}

impl BoardState {
    /// Creates an empty board with the cell centers of `geometry`.
    pub fn new(geometry: &BoardGeometry) -> Self {
        let cells = geometry
            .cells()
            .map(|((row, col), center)| HexCell {
                row,
                col,
                center,
                matches: Vec::new(),
            })
            .collect();
        Self {
            cells,
            unassigned: Vec::new(),
        }
    }

    /// Removes every match, keeping the cell layout.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.matches.clear();
        }
        self.unassigned.clear();
    }

    /// Clears the board and adopts the cell centers of `geometry`.
    pub fn reset(&mut self, geometry: &BoardGeometry) {
        self.clear();
        for (cell, (_, center)) in self.cells.iter_mut().zip(geometry.cells()) {
            cell.center = center;
        }
    }

    /// Assigns `m` to its nearest cell within the geometry radius.
    ///
    /// The chosen cell is written to `m.cell`; matches outside every cell are
    /// kept in the unassigned list.
    pub fn place(&mut self, geometry: &BoardGeometry, m: &mut Match) -> Option<(usize, usize)> {
        let (cx, cy) = m.center();
        m.cell = geometry.assign(cx as f32, cy as f32);
        match m.cell {
            Some((row, col)) => {
                let idx = row * BOARD_COLS + col;
                if let Some(cell) = self.cells.get_mut(idx) {
                    cell.matches.push(m.clone());
                }
            }
            None => self.unassigned.push(m.clone()),
        }
        m.cell
    }

    /// Returns the cell at `(row, col)`.
    pub fn cell(&self, row: usize, col: usize) -> Option<&HexCell> {
        if row >= BOARD_ROWS || col >= BOARD_COLS {
            return None;
        }
        self.cells.get(row * BOARD_COLS + col)
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> &[HexCell] {
        &self.cells
    }

    /// Cells holding at least one match, in row-major order.
    pub fn occupied_cells(&self) -> impl Iterator<Item = &HexCell> + '_ {
        self.cells.iter().filter(|cell| cell.is_occupied())
    }

    /// Cells in the player's half of the board.
    pub fn playable_cells(&self) -> impl Iterator<Item = &HexCell> + '_ {
        self.cells.iter().filter(|cell| cell.is_playable())
    }

    /// Matches assigned to `(row, col)`; empty for unknown cells.
    pub fn matches_at(&self, row: usize, col: usize) -> &[Match] {
        self.cell(row, col).map(HexCell::matches).unwrap_or(&[])
    }

    /// Number of matches assigned to some cell.
    pub fn total_assigned(&self) -> usize {
        self.cells.iter().map(|cell| cell.matches.len()).sum()
    }

    /// Matches that were outside the radius of every cell.
    pub fn unassigned(&self) -> &[Match] {
        &self.unassigned
    }

    /// Snapshot of the occupied cells for reporting.
    pub fn summary(&self) -> BoardSummary {
        BoardSummary {
            occupied: self
                .occupied_cells()
                .map(|cell| CellSummary {
                    row: cell.row,
                    col: cell.col,
                    template_ids: cell.matches.iter().map(|m| m.template_id.clone()).collect(),
                })
                .collect(),
            total_assigned: self.total_assigned(),
            unassigned: self.unassigned.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BoardGeometry, BoardState, Calibration};
    use crate::region::SearchRegion;
    use crate::search::Match;

    fn geometry() -> BoardGeometry {
        let board = SearchRegion::field_board().resolve(2560, 1440).unwrap();
        BoardGeometry::build(board, &Calibration::default()).unwrap()
    }

    fn centered(id: &str, cx: usize, cy: usize) -> Match {
        Match {
            template_id: id.into(),
            x: cx - 20,
            y: cy - 20,
            width: 40,
            height: 40,
            confidence: 0.9,
            scale: 1.0,
            cell: None,
        }
    }

    #[test]
    fn new_board_is_empty() {
        let board = BoardState::new(&geometry());
        assert_eq!(board.cells().len(), 40);
        assert_eq!(board.occupied_cells().count(), 0);
        assert_eq!(board.playable_cells().count(), 20);
        assert_eq!(board.total_assigned(), 0);
        assert_eq!(board.cell(3, 4).unwrap().label(), "Row 4, Col 5");
        assert!(board.cell(8, 0).is_none());
    }

    #[test]
    fn place_records_cell_and_allows_stacking() {
        let geo = geometry();
        let mut board = BoardState::new(&geo);
        let mut a = centered("knight", 1300, 763);
        let mut b = centered("archer", 1302, 760);
        assert_eq!(board.place(&geo, &mut a), Some((4, 2)));
        assert_eq!(board.place(&geo, &mut b), Some((4, 2)));
        assert_eq!(a.cell, Some((4, 2)));
        assert_eq!(board.matches_at(4, 2).len(), 2);
        assert_eq!(board.occupied_cells().count(), 1);
        assert!(board.cell(4, 2).unwrap().is_playable());
    }

    #[test]
    fn distant_match_is_unassigned() {
        let geo = geometry();
        let mut board = BoardState::new(&geo);
        let mut m = centered("bomber", 100, 100);
        assert_eq!(board.place(&geo, &mut m), None);
        assert_eq!(m.cell, None);
        assert_eq!(board.unassigned().len(), 1);
        assert_eq!(board.total_assigned(), 0);
    }

    #[test]
    fn clear_empties_every_cell() {
        let geo = geometry();
        let mut board = BoardState::new(&geo);
        board.place(&geo, &mut centered("knight", 1136, 538));
        board.place(&geo, &mut centered("bomber", 20, 20));
        board.clear();
        assert_eq!(board.total_assigned(), 0);
        assert!(board.unassigned().is_empty());
        assert_eq!(board, BoardState::new(&geo));
    }

    #[test]
    fn summary_lists_occupied_cells() {
        let geo = geometry();
        let mut board = BoardState::new(&geo);
        board.place(&geo, &mut centered("knight", 1300, 763));
        board.place(&geo, &mut centered("field_archer", 1136, 538));
        board.place(&geo, &mut centered("bomber", 20, 20));
        let summary = board.summary();
        assert_eq!(summary.occupied.len(), 2);
        assert_eq!(summary.occupied[0].row, 0);
        assert_eq!(summary.occupied[0].template_ids, vec!["field_archer"]);
        assert_eq!(summary.total_assigned, 2);
        assert_eq!(summary.unassigned, 1);
    }
}
