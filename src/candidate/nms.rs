//! Overlap-based non-maximum suppression for matches.
//!
//! Two matches overlap when the intersection of their boxes, divided by the
//! smaller of the two box areas, exceeds the threshold. Using the smaller area
//! lets a small variant nested inside a larger one count as a duplicate.

use crate::search::Match;
use crate::util::math::intersection_area;
use std::cmp::Ordering;
use std::collections::BTreeMap;

fn match_cmp_desc(a: &Match, b: &Match) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| a.template_id.cmp(&b.template_id))
        .then_with(|| a.y.cmp(&b.y))
        .then_with(|| a.x.cmp(&b.x))
        .then_with(|| a.scale.total_cmp(&b.scale))
}

/// Sorts matches by descending confidence with deterministic tie-breaking
/// (template id, y, x, scale ascending).
pub fn sort_matches_desc(matches: &mut [Match]) {
    matches.sort_by(match_cmp_desc);
}

/// Fraction of the smaller box covered by the intersection of `a` and `b`.
pub fn overlap_ratio(a: &Match, b: &Match) -> f32 {
    let inter = intersection_area(a.rect(), b.rect());
    if inter == 0 {
        return 0.0;
    }
    let smaller = a.area().min(b.area());
    if smaller == 0 {
        return 0.0;
    }
    inter as f32 / smaller as f32
}

/// Greedy overlap suppression.
///
/// Matches are visited in descending confidence; a match is kept if its
/// overlap ratio with every already kept match is `<= overlap_threshold`.
/// The result is sorted by descending confidence and is a fixed point:
/// suppressing it again returns it unchanged.
pub fn suppress(mut matches: Vec<Match>, overlap_threshold: f32) -> Vec<Match> {
    sort_matches_desc(&mut matches);
    let mut kept: Vec<Match> = Vec::with_capacity(matches.len());

    'outer: for candidate in matches {
        for accepted in kept.iter() {
            if overlap_ratio(&candidate, accepted) > overlap_threshold {
                continue 'outer;
            }
        }
        kept.push(candidate);
    }

    kept
}

/// Applies [`suppress`] separately within each template id.
///
/// Matches of different templates never suppress each other here.
pub fn suppress_per_template(matches: Vec<Match>, overlap_threshold: f32) -> Vec<Match> {
    let mut groups: BTreeMap<String, Vec<Match>> = BTreeMap::new();
    for m in matches {
        groups.entry(m.template_id.clone()).or_default().push(m);
    }

    let mut kept: Vec<Match> = groups
        .into_values()
        .flat_map(|group| suppress(group, overlap_threshold))
        .collect();
    sort_matches_desc(&mut kept);
    kept
}

/// Keeps the single highest-confidence match of each template id.
pub fn best_per_template(matches: Vec<Match>) -> Vec<Match> {
    let mut best: BTreeMap<String, Match> = BTreeMap::new();
    for m in matches {
        match best.get(&m.template_id) {
            Some(current) if match_cmp_desc(&m, current) != Ordering::Less => {}
            _ => {
                best.insert(m.template_id.clone(), m);
            }
        }
    }

    let mut kept: Vec<Match> = best.into_values().collect();
    sort_matches_desc(&mut kept);
    kept
}

#[cfg(test)]
mod tests {
    use super::{best_per_template, overlap_ratio, suppress, suppress_per_template};
    use crate::search::Match;

    fn m(id: &str, x: usize, y: usize, size: usize, confidence: f32) -> Match {
        Match {
            template_id: id.to_string(),
            x,
            y,
            width: size,
            height: size,
            confidence,
            scale: 1.0,
            cell: None,
        }
    }

    #[test]
    fn overlapping_weaker_match_is_dropped() {
        let strong = m("knight", 100, 100, 50, 0.90);
        let weak = m("knight", 110, 100, 50, 0.75);
        assert!((overlap_ratio(&strong, &weak) - 0.8).abs() < 1e-6);

        let kept = suppress(vec![weak, strong.clone()], 0.5);
        assert_eq!(kept, vec![strong]);
    }

    #[test]
    fn nested_box_counts_against_smaller_area() {
        let big = m("a", 0, 0, 40, 0.8);
        let small = m("a", 10, 10, 10, 0.9);
        assert_eq!(overlap_ratio(&big, &small), 1.0);
        let kept = suppress(vec![big, small.clone()], 0.3);
        assert_eq!(kept, vec![small]);
    }

    #[test]
    fn ratio_at_threshold_is_kept() {
        let a = m("a", 0, 0, 10, 0.9);
        let b = m("a", 5, 0, 10, 0.8);
        assert!((overlap_ratio(&a, &b) - 0.5).abs() < 1e-6);
        assert_eq!(suppress(vec![a, b], 0.5).len(), 2);
    }

    #[test]
    fn suppression_is_idempotent() {
        let input = vec![
            m("a", 0, 0, 20, 0.95),
            m("a", 4, 4, 20, 0.91),
            m("a", 30, 0, 20, 0.90),
            m("b", 32, 2, 20, 0.85),
            m("b", 70, 70, 20, 0.80),
        ];
        let once = suppress(input, 0.3);
        let twice = suppress(once.clone(), 0.3);
        assert_eq!(once, twice);
        assert_eq!(once.len(), 3);
    }

    #[test]
    fn per_template_groups_do_not_interact() {
        let input = vec![
            m("a", 0, 0, 20, 0.95),
            m("b", 2, 2, 20, 0.90),
            m("a", 3, 3, 20, 0.85),
        ];
        let kept = suppress_per_template(input, 0.3);
        let ids: Vec<&str> = kept.iter().map(|k| k.template_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn best_per_template_keeps_one_each() {
        let input = vec![
            m("a", 0, 0, 20, 0.7),
            m("a", 50, 0, 20, 0.9),
            m("b", 0, 50, 20, 0.8),
        ];
        let kept = best_per_template(input);
        assert_eq!(kept.len(), 2);
        assert_eq!((kept[0].template_id.as_str(), kept[0].x), ("a", 50));
        assert_eq!(kept[1].template_id, "b");
    }

    #[test]
    fn ties_break_by_position() {
        let a = m("a", 40, 0, 10, 0.8);
        let b = m("a", 0, 0, 10, 0.8);
        let kept = suppress(vec![a, b], 0.3);
        assert_eq!(kept[0].x, 0);
    }
}
