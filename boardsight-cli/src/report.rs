//! Serializable detection records and the batch report layout.

use boardsight::{BoardState, CycleOutput, Match, TroopCatalog};
use serde::Serialize;

/// Local time in ISO 8601 with microseconds.
pub fn timestamp() -> String {
    chrono::Local::now()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
pub struct Size {
    pub width: usize,
    pub height: usize,
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
pub struct CellRecord {
    pub row: usize,
    pub col: usize,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct MatchRecord {
    pub template_id: String,
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
    pub center_x: usize,
    pub center_y: usize,
    pub confidence: f32,
    pub scale: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell: Option<CellRecord>,
}

impl From<&Match> for MatchRecord {
    fn from(value: &Match) -> Self {
        let (center_x, center_y) = value.center();
        Self {
            template_id: value.template_id.clone(),
            x: value.x,
            y: value.y,
            width: value.width,
            height: value.height,
            center_x,
            center_y,
            confidence: value.confidence,
            scale: value.scale,
            cell: value.cell.map(|(row, col)| CellRecord { row, col }),
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct IconResult {
    pub icon_name: String,
    pub template_size: Size,
    /// Best score at any scale, 0 when no scale could be scanned.
    pub best_confidence: f32,
    pub matches_found: usize,
    pub matches: Vec<MatchRecord>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ScreenshotResult {
    pub screenshot: String,
    pub timestamp: String,
    pub image_size: Size,
    pub icons_detected: Vec<IconResult>,
    pub total_matches: usize,
    pub highlighted_image: Option<String>,
}

impl ScreenshotResult {
    /// Groups the cycle's matches by template, in template order.
    pub fn from_cycle(screenshot: String, image_size: Size, out: &CycleOutput) -> Self {
        let icons_detected: Vec<IconResult> = out
            .templates
            .iter()
            .map(|tpl| {
                let matches: Vec<MatchRecord> = out
                    .matches
                    .iter()
                    .filter(|m| m.template_id == tpl.template_id)
                    .map(MatchRecord::from)
                    .collect();
                IconResult {
                    icon_name: tpl.template_id.clone(),
                    template_size: Size {
                        width: tpl.width,
                        height: tpl.height,
                    },
                    best_confidence: tpl.best_confidence.unwrap_or(0.0),
                    matches_found: matches.len(),
                    matches,
                }
            })
            .collect();
        Self {
            screenshot,
            timestamp: timestamp(),
            image_size,
            total_matches: out.matches.len(),
            icons_detected,
            highlighted_image: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct DetectionSummary {
    pub timestamp: String,
    pub total_screenshots: usize,
    pub total_matches: usize,
    pub threshold_used: f32,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct BatchReport {
    pub detection_summary: DetectionSummary,
    pub results: Vec<ScreenshotResult>,
}

impl BatchReport {
    pub fn new(results: Vec<ScreenshotResult>, threshold: f32) -> Self {
        Self {
            detection_summary: DetectionSummary {
                timestamp: timestamp(),
                total_screenshots: results.len(),
                total_matches: results.iter().map(|r| r.total_matches).sum(),
                threshold_used: threshold,
            },
            results,
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct CellContents {
    pub row: usize,
    pub col: usize,
    pub label: String,
    pub playable: bool,
    pub troops: Vec<String>,
}

/// JSON view of one board cycle.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct BoardReport {
    pub timestamp: String,
    pub occupied: Vec<CellContents>,
    pub total_assigned: usize,
    pub unassigned: usize,
    pub matches: Vec<MatchRecord>,
}

impl BoardReport {
    pub fn new(out: &CycleOutput, board: &BoardState, catalog: &TroopCatalog) -> Self {
        let occupied = board
            .occupied_cells()
            .map(|cell| CellContents {
                row: cell.row(),
                col: cell.col(),
                label: cell.label(),
                playable: cell.is_playable(),
                troops: cell
                    .matches()
                    .iter()
                    .map(|m| catalog.display_name(&m.template_id))
                    .collect(),
            })
            .collect();
        Self {
            timestamp: timestamp(),
            occupied,
            total_assigned: board.total_assigned(),
            unassigned: board.unassigned().len(),
            matches: out.matches.iter().map(MatchRecord::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BatchReport, ScreenshotResult, Size};
    use boardsight::{CycleOutput, Match, TemplateBest};

    fn output() -> CycleOutput {
        let m = |id: &str, x: usize, confidence: f32| Match {
            template_id: id.into(),
            x,
            y: 10,
            width: 20,
            height: 30,
            confidence,
            scale: 1.0,
            cell: None,
        };
        let best = |id: &str, best: Option<f32>, raw: usize| TemplateBest {
            template_id: id.into(),
            width: 20,
            height: 30,
            best_confidence: best,
            raw_matches: raw,
        };
        CycleOutput {
            region: None,
            matches: vec![m("knight", 0, 0.9), m("archer", 50, 0.8), m("knight", 100, 0.7)],
            raw_count: 3,
            unassigned: 3,
            templates: vec![
                best("archer", Some(0.8), 1),
                best("bomber", None, 0),
                best("knight", Some(0.9), 2),
            ],
        }
    }

    #[test]
    fn screenshot_result_groups_by_template() {
        let size = Size {
            width: 640,
            height: 480,
        };
        let result = ScreenshotResult::from_cycle("a.png".into(), size, &output());
        assert_eq!(result.total_matches, 3);
        let names: Vec<&str> = result
            .icons_detected
            .iter()
            .map(|icon| icon.icon_name.as_str())
            .collect();
        assert_eq!(names, vec!["archer", "bomber", "knight"]);
        assert_eq!(result.icons_detected[1].best_confidence, 0.0);
        assert_eq!(result.icons_detected[2].matches_found, 2);
        assert_eq!(result.icons_detected[2].matches[0].center_x, 10);
        assert_eq!(result.icons_detected[2].matches[0].center_y, 25);
    }

    #[test]
    fn report_uses_the_persisted_layout() {
        let size = Size {
            width: 640,
            height: 480,
        };
        let result = ScreenshotResult::from_cycle("a.png".into(), size, &output());
        let report = BatchReport::new(vec![result], 0.6);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["detection_summary"]["total_screenshots"], 1);
        assert_eq!(json["detection_summary"]["total_matches"], 3);
        assert!(json["results"][0]["highlighted_image"].is_null());
        assert_eq!(json["results"][0]["image_size"]["width"], 640);
        let first = &json["results"][0]["icons_detected"][0];
        assert_eq!(first["icon_name"], "archer");
        assert_eq!(first["matches_found"], 1);
        assert!(first["matches"][0].get("cell").is_none());
    }
}
