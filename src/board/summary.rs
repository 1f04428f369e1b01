//! Reportable snapshot of a populated board.

use super::{BOARD_COLS, BOARD_ROWS, PLAYABLE_ROWS};
use crate::catalog::TroopCatalog;
use std::fmt;

/// Template ids found in one cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellSummary {
    pub row: usize,
    pub col: usize,
    pub template_ids: Vec<String>,
}

/// Occupied cells, in row-major order, with assignment counts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BoardSummary {
    pub occupied: Vec<CellSummary>,
    pub total_assigned: usize,
    pub unassigned: usize,
}

impl BoardSummary {
    /// Text rendering with one-based cell labels.
    ///
    /// With a catalog, template ids are replaced by troop display names where
    /// the catalog knows them.
    pub fn render(&self, catalog: Option<&TroopCatalog>) -> String {
        let mut lines = vec![
            "=== HEXAGONAL BOARD STATE ===".to_string(),
            format!(
                "Total hexagons: {BOARD_ROWS}x{BOARD_COLS} (playable: {PLAYABLE_ROWS} bottom rows)"
            ),
            format!("Occupied hexagons: {}", self.occupied.len()),
            format!("Total troops: {}", self.total_assigned),
        ];
        if self.unassigned > 0 {
            lines.push(format!("Unassigned detections: {}", self.unassigned));
        }
        lines.push(String::new());

        for cell in &self.occupied {
            let names: Vec<String> = cell
                .template_ids
                .iter()
                .map(|id| match catalog {
                    Some(catalog) => catalog.display_name(id),
                    None => id.clone(),
                })
                .collect();
            lines.push(format!(
                "Row {}, Col {}: {}",
                cell.row + 1,
                cell.col + 1,
                names.join(", ")
            ));
        }
        lines.join("\n")
    }
}

impl fmt::Display for BoardSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(None))
    }
}
