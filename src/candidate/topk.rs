//! Peak records produced by correlation scans and bounded collectors.

use std::cmp::Ordering;

/// Placement of one template variant in image space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Peak {
    /// X coordinate (column) of the placement's top-left corner.
    pub x: usize,
    /// Y coordinate (row) of the placement's top-left corner.
    pub y: usize,
    /// ZNCC score at the placement.
    pub score: f32,
    /// Index of the scale variant that produced the peak.
    pub variant_idx: usize,
}

fn peak_cmp_desc(a: &Peak, b: &Peak) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.y.cmp(&b.y))
        .then_with(|| a.x.cmp(&b.x))
        .then_with(|| a.variant_idx.cmp(&b.variant_idx))
}

fn peak_cmp_raster(a: &Peak, b: &Peak) -> Ordering {
    a.y.cmp(&b.y)
        .then_with(|| a.x.cmp(&b.x))
        .then_with(|| a.variant_idx.cmp(&b.variant_idx))
}

/// Sorts peaks by descending score with deterministic tie-breaking.
pub(crate) fn sort_peaks_desc(peaks: &mut [Peak]) {
    peaks.sort_by(peak_cmp_desc);
}

/// Top-K container with O(k) insertion cost.
pub struct TopK<T> {
    k: usize,
    items: Vec<T>,
}

impl TopK<Peak> {
    /// Creates a new Top-K collector.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            items: Vec::with_capacity(k.min(256)),
        }
    }

    /// Pushes a peak, evicting the lowest score if at capacity.
    pub fn push(&mut self, peak: Peak) {
        if self.k == 0 {
            return;
        }
        if self.items.len() < self.k {
            self.items.push(peak);
            return;
        }

        let mut worst_idx = 0usize;
        for (idx, item) in self.items.iter().enumerate().skip(1) {
            if peak_cmp_desc(item, &self.items[worst_idx]) == Ordering::Greater {
                worst_idx = idx;
            }
        }

        if peak_cmp_desc(&peak, &self.items[worst_idx]) == Ordering::Less {
            self.items[worst_idx] = peak;
        }
    }

    /// Returns peaks sorted by descending score.
    pub fn into_sorted_desc(mut self) -> Vec<Peak> {
        sort_peaks_desc(&mut self.items);
        self.items
    }
}

/// Collects every peak, or only the best `k` when a cap is configured.
///
/// Output is always in raster order (row-major) so that capped and uncapped
/// scans list surviving placements the same way.
pub(crate) enum PeakCollector {
    All(Vec<Peak>),
    Capped(TopK<Peak>),
}

impl PeakCollector {
    pub(crate) fn new(cap: Option<usize>) -> Self {
        match cap {
            Some(k) => PeakCollector::Capped(TopK::new(k)),
            None => PeakCollector::All(Vec::new()),
        }
    }

    pub(crate) fn push(&mut self, peak: Peak) {
        match self {
            PeakCollector::All(items) => items.push(peak),
            PeakCollector::Capped(topk) => topk.push(peak),
        }
    }

    pub(crate) fn into_raster_order(self) -> Vec<Peak> {
        let mut peaks = match self {
            PeakCollector::All(items) => items,
            PeakCollector::Capped(topk) => topk.into_sorted_desc(),
        };
        peaks.sort_by(peak_cmp_raster);
        peaks
    }
}
