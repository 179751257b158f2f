//! Footage duration reconciliation.
//!
//! Picks clips from the downloaded footage pool until their combined length
//! covers the required duration, then trims the longest clips first so the
//! selection adds up to exactly that duration. Works on duration metadata only;
//! the compositor applies the resulting trims to the media files.

use crate::error::{PipelineError, Result};
use std::path::PathBuf;

/// Tolerance used when comparing summed durations against the target.
pub const DURATION_EPSILON: f64 = 1e-6;

/// A downloaded stock clip and its probed length in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct FootageAsset {
    pub path: PathBuf,
    pub source_url: String,
    pub duration: f64,
}

impl FootageAsset {
    pub fn new(path: impl Into<PathBuf>, source_url: impl Into<String>, duration: f64) -> Self {
        Self {
            path: path.into(),
            source_url: source_url.into(),
            duration,
        }
    }

    fn is_usable(&self) -> bool {
        self.duration.is_finite() && self.duration > 0.0
    }
}

/// One selected clip with the portion of it that ends up in the video.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionEntry {
    pub asset: FootageAsset,
    pub effective_duration: f64,
}

impl SelectionEntry {
    fn full(asset: FootageAsset) -> Self {
        let effective_duration = asset.duration;
        Self {
            asset,
            effective_duration,
        }
    }

    pub fn is_trimmed(&self) -> bool {
        self.effective_duration < self.asset.duration
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub entries: Vec<SelectionEntry>,
    pub required: f64,
    pub total: f64,
}

impl Reconciliation {
    pub fn is_feasible(&self) -> bool {
        self.total + DURATION_EPSILON >= self.required
    }

    /// Seconds of footage missing to reach the target; zero when feasible.
    pub fn shortfall(&self) -> f64 {
        (self.required - self.total).max(0.0)
    }

    /// Even split of the target across the selected clips. Reporting only.
    pub fn participation_secs(&self) -> Option<f64> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.required / self.entries.len() as f64)
        }
    }

    /// Converts an infeasible reconciliation into `InfeasibleDuration`.
    pub fn into_feasible(self) -> Result<Self> {
        if self.is_feasible() {
            Ok(self)
        } else {
            Err(PipelineError::InfeasibleDuration {
                available: self.total,
                required: self.required,
            })
        }
    }
}

/// Selects and trims footage so the summed effective duration equals `required`.
///
/// Clips are taken in the order given, at full length, until the running total
/// reaches `required`. Any overshoot is trimmed from the longest clips first
/// (stable on ties, so earlier clips lose footage first); clips trimmed to zero
/// are dropped. If the pool runs dry first, the result holds every usable clip
/// and reports the shortfall through [`Reconciliation::is_feasible`].
pub fn reconcile(assets: &[FootageAsset], required: f64) -> Reconciliation {
    let mut used: Vec<bool> = assets.iter().map(|a| !a.is_usable()).collect();
    let mut selected: Vec<usize> = Vec::new();
    let mut total = 0.0;

    // First pass is the greedy walk; later passes backfill from whatever is
    // still unused. Each productive pass consumes at least one asset.
    while total < required {
        let added = accumulate(assets, &mut used, &mut selected, &mut total, required);
        if added == 0 {
            break;
        }
    }

    let mut entries: Vec<SelectionEntry> = selected
        .into_iter()
        .map(|i| SelectionEntry::full(assets[i].clone()))
        .collect();

    if total > required {
        trim_excess(&mut entries, total - required);
    }

    let total = entries.iter().map(|e| e.effective_duration).sum();
    Reconciliation {
        entries,
        required,
        total,
    }
}

fn accumulate(
    assets: &[FootageAsset],
    used: &mut [bool],
    selected: &mut Vec<usize>,
    total: &mut f64,
    required: f64,
) -> usize {
    let mut added = 0;
    for (idx, asset) in assets.iter().enumerate() {
        if *total >= required {
            break;
        }
        if used[idx] {
            continue;
        }
        used[idx] = true;
        selected.push(idx);
        *total += asset.duration;
        added += 1;
    }
    added
}

fn trim_excess(entries: &mut Vec<SelectionEntry>, mut excess: f64) {
    // sort_by is stable: equal durations keep selection order.
    entries.sort_by(|a, b| b.asset.duration.total_cmp(&a.asset.duration));

    for entry in entries.iter_mut() {
        if entry.asset.duration > excess {
            entry.effective_duration = entry.asset.duration - excess;
            break;
        }
        excess -= entry.asset.duration;
        entry.effective_duration = 0.0;
    }

    entries.retain(|e| e.effective_duration > 0.0);
}

/// Renders seconds as "M minutes and S seconds" for progress output.
pub fn format_duration(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let minutes = (seconds / 60.0).floor() as u64;
    let remaining = (seconds % 60.0).floor() as u64;
    format!("{} minutes and {} seconds", minutes, remaining)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(durations: &[f64]) -> Vec<FootageAsset> {
        durations
            .iter()
            .enumerate()
            .map(|(i, d)| {
                FootageAsset::new(
                    format!("background_{i}.mp4"),
                    format!("https://videos.example/{i}"),
                    *d,
                )
            })
            .collect()
    }

    fn picked(result: &Reconciliation) -> Vec<(String, f64)> {
        result
            .entries
            .iter()
            .map(|e| (e.asset.path.display().to_string(), e.effective_duration))
            .collect()
    }

    #[test]
    fn test_trims_longest_clip_on_overshoot() {
        let assets = pool(&[10.0, 8.0, 6.0]);
        let result = reconcile(&assets, 15.0);

        assert!(result.is_feasible());
        assert_eq!(
            picked(&result),
            vec![
                ("background_0.mp4".to_string(), 7.0),
                ("background_1.mp4".to_string(), 8.0),
            ]
        );
        assert!((result.total - 15.0).abs() < DURATION_EPSILON);
    }

    #[test]
    fn test_shortfall_keeps_everything() {
        let assets = pool(&[5.0, 5.0]);
        let result = reconcile(&assets, 20.0);

        assert!(!result.is_feasible());
        assert_eq!(result.entries.len(), 2);
        assert!((result.total - 10.0).abs() < DURATION_EPSILON);
        assert!((result.shortfall() - 10.0).abs() < DURATION_EPSILON);

        match result.into_feasible() {
            Err(PipelineError::InfeasibleDuration { available, required }) => {
                assert_eq!(available, 10.0);
                assert_eq!(required, 20.0);
            }
            other => panic!("expected InfeasibleDuration, got {other:?}"),
        }
    }

    #[test]
    fn test_exact_match_needs_no_trim() {
        let assets = pool(&[10.0, 5.0]);
        let result = reconcile(&assets, 15.0);

        assert_eq!(
            picked(&result),
            vec![
                ("background_0.mp4".to_string(), 10.0),
                ("background_1.mp4".to_string(), 5.0),
            ]
        );
        assert!(result.entries.iter().all(|e| !e.is_trimmed()));
    }

    #[test]
    fn test_small_overshoot_comes_off_first_of_equal_clips() {
        let assets = pool(&[3.0, 3.0, 2.0]);
        let result = reconcile(&assets, 5.5);
        // 3 + 3 = 6 reaches the target, the 0.5s excess comes off the first clip.
        assert_eq!(
            picked(&result),
            vec![
                ("background_0.mp4".to_string(), 2.5),
                ("background_1.mp4".to_string(), 3.0),
            ]
        );
    }

    #[test]
    fn test_trim_zeroes_and_drops_clips_covered_by_excess() {
        let assets = pool(&[2.0, 5.0, 1.0, 5.0]);
        let mut entries: Vec<SelectionEntry> =
            assets.into_iter().map(SelectionEntry::full).collect();

        // Both 5s clips vanish, the 2s clip absorbs the last second.
        trim_excess(&mut entries, 11.0);

        let left: Vec<(String, f64)> = entries
            .iter()
            .map(|e| (e.asset.path.display().to_string(), e.effective_duration))
            .collect();
        assert_eq!(
            left,
            vec![
                ("background_0.mp4".to_string(), 1.0),
                ("background_2.mp4".to_string(), 1.0),
            ]
        );
    }

    #[test]
    fn test_equal_durations_trim_in_selection_order() {
        let assets = pool(&[4.0, 4.0, 4.0]);
        let result = reconcile(&assets, 10.0);

        assert_eq!(
            picked(&result),
            vec![
                ("background_0.mp4".to_string(), 2.0),
                ("background_1.mp4".to_string(), 4.0),
                ("background_2.mp4".to_string(), 4.0),
            ]
        );
    }

    #[test]
    fn test_unusable_assets_are_skipped() {
        let assets = pool(&[0.0, f64::NAN, 6.0, -2.0, 6.0]);
        let result = reconcile(&assets, 9.0);

        assert_eq!(
            picked(&result),
            vec![
                ("background_2.mp4".to_string(), 3.0),
                ("background_4.mp4".to_string(), 6.0),
            ]
        );
    }

    #[test]
    fn test_empty_pool_is_infeasible() {
        let result = reconcile(&[], 12.0);
        assert!(result.entries.is_empty());
        assert!(!result.is_feasible());
        assert_eq!(result.shortfall(), 12.0);
        assert_eq!(result.participation_secs(), None);
    }

    #[test]
    fn test_participation_is_even_split() {
        let assets = pool(&[10.0, 8.0, 6.0]);
        let result = reconcile(&assets, 15.0);
        assert_eq!(result.participation_secs(), Some(7.5));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0), "0 minutes and 0 seconds");
        assert_eq!(format_duration(59.9), "0 minutes and 59 seconds");
        assert_eq!(format_duration(125.4), "2 minutes and 5 seconds");
    }
}
