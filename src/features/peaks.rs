//! Corner peak ordering and non-maximum suppression.

use std::cmp::Ordering;

/// Local maximum of the corner response on one pyramid level.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Peak {
    pub(crate) x: usize,
    pub(crate) y: usize,
    pub(crate) score: f32,
}

fn peak_cmp_desc(a: &Peak, b: &Peak) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.y.cmp(&b.y))
        .then_with(|| a.x.cmp(&b.x))
}

/// Sorts peaks by descending score with deterministic tie-breaking.
pub(crate) fn sort_peaks_desc(peaks: &mut [Peak]) {
    peaks.sort_by(peak_cmp_desc);
}

/// Greedy non-maximum suppression using Chebyshev distance.
///
/// Peaks are visited in descending score order; a peak is kept when no
/// previously kept peak lies within `radius`. Stops after `limit` peaks.
/// Suppression is tracked in a `width x height` mask so the cost does not
/// grow with the number of kept peaks.
pub(crate) fn nms_2d(
    peaks: &mut [Peak],
    radius: usize,
    limit: usize,
    width: usize,
    height: usize,
) -> Vec<Peak> {
    sort_peaks_desc(peaks);
    let mut kept = Vec::with_capacity(limit.min(peaks.len()));
    if limit == 0 {
        return kept;
    }

    let mut suppressed = vec![false; width * height];
    for peak in peaks.iter().copied() {
        if peak.x >= width || peak.y >= height || suppressed[peak.y * width + peak.x] {
            continue;
        }
        kept.push(peak);
        if kept.len() == limit {
            break;
        }
        let y0 = peak.y.saturating_sub(radius);
        let y1 = (peak.y + radius).min(height - 1);
        let x0 = peak.x.saturating_sub(radius);
        let x1 = (peak.x + radius).min(width - 1);
        for y in y0..=y1 {
            suppressed[y * width + x0..=y * width + x1].fill(true);
        }
    }
    kept
}
