//! Corner segmenter state machine

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace};

// Internal
use super::{Corner, CornerError, CornerParams, Turn};
use util::maths::{forward_distance, wrap_index};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Finds corners in a loop of smoothed curvature values.
#[derive(Debug, Clone)]
pub struct CornerSegmenter {
    params: CornerParams,
}

/// A corner which is still being scanned.
#[derive(Debug, Copy, Clone)]
struct OpenCorner {
    start: usize,
    end: usize,

    /// Sign of the curvature when the corner opened
    sign: f64,

    peak_index: usize,
    peak_mag_m: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// State of the scan at the current index.
#[derive(Debug, Copy, Clone)]
enum ScanState {
    Outside,
    InsideCorner(OpenCorner),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CornerSegmenter {
    /// Create a new segmenter, checking that the parameters are consistent.
    pub fn new(params: CornerParams) -> Result<Self, CornerError> {
        if !(params.exit_threshold_m > 0.0 && params.exit_threshold_m < params.enter_threshold_m)
        {
            return Err(CornerError::InvalidHysteresis {
                enter: params.enter_threshold_m,
                exit: params.exit_threshold_m,
            });
        }

        if !(0.0..=1.0).contains(&params.late_apex_fraction) {
            return Err(CornerError::InvalidLateApexFraction(
                params.late_apex_fraction,
            ));
        }

        Ok(Self { params })
    }

    pub fn params(&self) -> &CornerParams {
        &self.params
    }

    /// Find the corners in the loop of smoothed curvature values.
    ///
    /// Corners are returned in order of their start index.
    pub fn segment(&self, smoothed_m: &[f64]) -> Vec<Corner> {
        let n = smoothed_m.len();
        if n == 0 {
            return Vec::new();
        }

        // Start the scan from the flattest point so that no corner is open at the start, which
        // means a corner spanning the wrap seam is seen in one piece.
        let mut scan_start = 0;
        for i in 1..n {
            if smoothed_m[i].abs() < smoothed_m[scan_start].abs() {
                scan_start = i;
            }
        }

        if smoothed_m[scan_start].abs() >= self.params.exit_threshold_m {
            debug!("Curvature never drops below the exit threshold, the loop has no distinct corners");
            return Vec::new();
        }

        let mut corners = Vec::new();
        let mut state = ScanState::Outside;

        for k in 0..n {
            let i = (scan_start + k) % n;
            let curv_m = smoothed_m[i];
            let mag_m = curv_m.abs();

            state = match state {
                ScanState::Outside => {
                    if mag_m > self.params.enter_threshold_m {
                        ScanState::InsideCorner(OpenCorner::new(i, curv_m))
                    } else {
                        ScanState::Outside
                    }
                }
                ScanState::InsideCorner(mut open) => {
                    if mag_m < self.params.exit_threshold_m {
                        self.close(open, smoothed_m, &mut corners);
                        ScanState::Outside
                    } else if curv_m.signum() != open.sign {
                        // The curvature reversed without passing through a straight, the
                        // current corner ends here and the opposite one may start immediately
                        self.close(open, smoothed_m, &mut corners);
                        if mag_m > self.params.enter_threshold_m {
                            ScanState::InsideCorner(OpenCorner::new(i, curv_m))
                        } else {
                            ScanState::Outside
                        }
                    } else {
                        open.extend(i, mag_m);
                        ScanState::InsideCorner(open)
                    }
                }
            };
        }

        // The scan start is below the exit threshold so a corner can only still be open if it
        // ends on the last scanned index
        if let ScanState::InsideCorner(open) = state {
            self.close(open, smoothed_m, &mut corners);
        }

        let mut corners = self.merge(corners, n);

        for c in corners.iter_mut() {
            self.place_targets(c, n);
        }

        corners.sort_by_key(|c| c.start_index);

        debug!("Found {} corner(s)", corners.len());
        for c in &corners {
            trace!(
                "    {:?} [{}, {}] peak {:.4} 1/m at {}, entry {} apex {} exit {}",
                c.turn,
                c.start_index,
                c.end_index,
                c.peak_curvature_m,
                c.peak_index,
                c.entry_index,
                c.apex_index,
                c.exit_index
            );
        }

        corners
    }

    /// Close an open corner, keeping it if it is long and sharp enough.
    fn close(&self, open: OpenCorner, smoothed_m: &[f64], corners: &mut Vec<Corner>) {
        let n = smoothed_m.len();
        let length = forward_distance(open.start, open.end, n) + 1;

        if length < self.params.min_corner_length {
            trace!(
                "Discarding corner [{}, {}]: too short ({} points)",
                open.start,
                open.end,
                length
            );
            return;
        }
        if open.peak_mag_m < self.params.min_peak_curvature_m {
            trace!(
                "Discarding corner [{}, {}]: too shallow ({:.4} 1/m)",
                open.start,
                open.end,
                open.peak_mag_m
            );
            return;
        }

        // The turn direction is taken at the peak, not averaged over the corner
        let peak_curvature_m = smoothed_m[open.peak_index];

        corners.push(Corner {
            start_index: open.start,
            end_index: open.end,
            length,
            turn: Turn::from_curvature(peak_curvature_m),
            peak_index: open.peak_index,
            peak_curvature_m,
            apex_index: open.peak_index,
            entry_index: open.start,
            exit_index: open.end,
        });
    }

    /// Merge each corner with its cyclic successor while they turn the same way and the gap
    /// between them is below the merge gap.
    fn merge(&self, mut corners: Vec<Corner>, n: usize) -> Vec<Corner> {
        let mut merged_any = true;

        while merged_any && corners.len() > 1 {
            merged_any = false;

            for i in 0..corners.len() {
                let j = (i + 1) % corners.len();
                let (a, b) = (corners[i], corners[j]);

                if a.turn != b.turn {
                    continue;
                }

                let gap = forward_distance(a.end_index, b.start_index, n).saturating_sub(1);
                if gap >= self.params.merge_gap {
                    continue;
                }

                let length = forward_distance(a.start_index, b.end_index, n) + 1;
                if length >= n {
                    continue;
                }

                let (peak_index, peak_curvature_m) =
                    if b.peak_curvature_m.abs() > a.peak_curvature_m.abs() {
                        (b.peak_index, b.peak_curvature_m)
                    } else {
                        (a.peak_index, a.peak_curvature_m)
                    };

                trace!(
                    "Merging {:?} corners [{}, {}] and [{}, {}] (gap {})",
                    a.turn,
                    a.start_index,
                    a.end_index,
                    b.start_index,
                    b.end_index,
                    gap
                );

                corners[i] = Corner {
                    start_index: a.start_index,
                    end_index: b.end_index,
                    length,
                    turn: a.turn,
                    peak_index,
                    peak_curvature_m,
                    apex_index: peak_index,
                    entry_index: a.start_index,
                    exit_index: b.end_index,
                };
                corners.remove(j);

                merged_any = true;
                break;
            }
        }

        corners
    }

    /// Set the entry, apex and exit indices of the corner.
    fn place_targets(&self, corner: &mut Corner, n: usize) {
        let late_shift =
            (self.params.late_apex_fraction * corner.length as f64).floor() as isize;

        corner.entry_index = wrap_index(corner.start_index, -(self.params.entry_lead as isize), n);
        corner.exit_index = wrap_index(corner.end_index, self.params.exit_lead as isize, n);
        corner.apex_index = wrap_index(corner.peak_index, late_shift, n);
    }
}

impl OpenCorner {
    fn new(index: usize, curv_m: f64) -> Self {
        Self {
            start: index,
            end: index,
            sign: curv_m.signum(),
            peak_index: index,
            peak_mag_m: curv_m.abs(),
        }
    }

    fn extend(&mut self, index: usize, mag_m: f64) {
        self.end = index;
        if mag_m > self.peak_mag_m {
            self.peak_mag_m = mag_m;
            self.peak_index = index;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        curvature::{CurvatureParams, CurvatureProfile},
        track::test::{s_bend_loop, single_corner_loop},
    };

    /// A loop of `n` zero curvature points with the given runs set to constant values.
    fn curvature_loop(n: usize, runs: &[(usize, usize, f64)]) -> Vec<f64> {
        let mut k = vec![0.0; n];
        for &(start, len, value) in runs {
            for i in 0..len {
                k[(start + i) % n] = value;
            }
        }
        k
    }

    fn segmenter() -> CornerSegmenter {
        CornerSegmenter::new(CornerParams {
            enter_threshold_m: 0.03,
            exit_threshold_m: 0.02,
            min_corner_length: 4,
            min_peak_curvature_m: 0.04,
            merge_gap: 5,
            entry_lead: 6,
            exit_lead: 6,
            late_apex_fraction: 0.25,
        })
        .unwrap()
    }

    #[test]
    fn test_invalid_params() {
        let mut params = CornerParams::default();
        params.exit_threshold_m = params.enter_threshold_m;
        assert!(matches!(
            CornerSegmenter::new(params),
            Err(CornerError::InvalidHysteresis { .. })
        ));

        let mut params = CornerParams::default();
        params.late_apex_fraction = 1.5;
        assert!(matches!(
            CornerSegmenter::new(params),
            Err(CornerError::InvalidLateApexFraction(_))
        ));
    }

    #[test]
    fn test_single_corner_targets() {
        let mut k = curvature_loop(100, &[(20, 20, 0.05)]);
        k[25] = 0.08;

        let corners = segmenter().segment(&k);
        assert_eq!(corners.len(), 1);

        let c = corners[0];
        assert_eq!(c.turn, Turn::Left);
        assert_eq!((c.start_index, c.end_index, c.length), (20, 39, 20));
        assert_eq!(c.peak_index, 25);
        assert_eq!(c.peak_curvature_m, 0.08);
        assert_eq!(c.entry_index, 14);
        assert_eq!(c.exit_index, 45);

        // Late apex: 25 + floor(0.25 * 20)
        assert_eq!(c.apex_index, 30);
    }

    #[test]
    fn test_hysteresis() {
        // Dips between the two thresholds do not close the corner
        let mut k = curvature_loop(100, &[(10, 30, 0.05)]);
        k[20] = 0.025;
        k[21] = 0.021;
        let corners = segmenter().segment(&k);
        assert_eq!(corners.len(), 1);
        assert_eq!((corners[0].start_index, corners[0].end_index), (10, 39));

        // Rising into the band without crossing the enter threshold never opens one
        let k = curvature_loop(100, &[(10, 30, 0.029)]);
        assert!(segmenter().segment(&k).is_empty());
    }

    #[test]
    fn test_discard() {
        // Too short
        let k = curvature_loop(100, &[(10, 3, 0.09)]);
        assert!(segmenter().segment(&k).is_empty());

        // Too shallow
        let k = curvature_loop(100, &[(10, 20, 0.035)]);
        assert!(segmenter().segment(&k).is_empty());
    }

    #[test]
    fn test_right_turn_sign_from_peak() {
        let mut k = curvature_loop(100, &[(50, 10, -0.05)]);
        k[55] = -0.09;
        let corners = segmenter().segment(&k);

        assert_eq!(corners.len(), 1);
        assert_eq!(corners[0].turn, Turn::Right);
        assert_eq!(corners[0].turn.sign(), -1.0);
        assert_eq!(corners[0].peak_index, 55);
        assert_eq!(corners[0].peak_curvature_m, -0.09);
    }

    #[test]
    fn test_corner_across_seam() {
        let k = curvature_loop(100, &[(95, 10, -0.06)]);
        let corners = segmenter().segment(&k);

        assert_eq!(corners.len(), 1);
        let c = corners[0];
        assert_eq!((c.start_index, c.end_index, c.length), (95, 4, 10));
        assert_eq!(c.turn, Turn::Right);
        assert_eq!(c.entry_index, 89);
        assert_eq!(c.exit_index, 10);
        assert_eq!(c.apex_index, 97);
    }

    #[test]
    fn test_merge_same_sign() {
        let mut k = curvature_loop(100, &[(20, 10, 0.05), (33, 10, 0.05)]);
        k[36] = 0.07;
        let corners = segmenter().segment(&k);

        assert_eq!(corners.len(), 1);
        let c = corners[0];
        assert_eq!((c.start_index, c.end_index, c.length), (20, 42, 23));
        assert_eq!(c.peak_index, 36);
        assert_eq!(c.turn, Turn::Left);

        // A large enough gap keeps them apart
        let k = curvature_loop(100, &[(20, 10, 0.05), (40, 10, 0.05)]);
        assert_eq!(segmenter().segment(&k).len(), 2);
    }

    #[test]
    fn test_merge_across_seam() {
        let k = curvature_loop(100, &[(2, 10, -0.05), (88, 10, -0.05)]);
        let corners = segmenter().segment(&k);

        assert_eq!(corners.len(), 1);
        assert_eq!((corners[0].start_index, corners[0].end_index), (88, 11));
    }

    #[test]
    fn test_opposite_signs_never_merge() {
        // An S bend with a gap well inside the merge gap
        let k = curvature_loop(100, &[(20, 10, 0.05), (32, 10, -0.05)]);
        let corners = segmenter().segment(&k);

        assert_eq!(corners.len(), 2);
        assert_eq!(corners[0].turn, Turn::Left);
        assert_eq!(corners[1].turn, Turn::Right);
        assert_eq!((corners[0].start_index, corners[0].end_index), (20, 29));
        assert_eq!((corners[1].start_index, corners[1].end_index), (32, 41));
    }

    #[test]
    fn test_sign_reversal_without_gap() {
        // The curvature flips straight from left to right with no point below the exit threshold
        let k = curvature_loop(100, &[(20, 10, 0.05), (30, 10, -0.05)]);
        let corners = segmenter().segment(&k);

        assert_eq!(corners.len(), 2);
        assert_eq!(corners[0].turn, Turn::Left);
        assert_eq!((corners[0].start_index, corners[0].end_index), (20, 29));
        assert_eq!(corners[1].turn, Turn::Right);
        assert_eq!((corners[1].start_index, corners[1].end_index), (30, 39));
    }

    #[test]
    fn test_constant_curvature_loop() {
        let k = vec![0.05; 60];
        assert!(segmenter().segment(&k).is_empty());
        assert!(segmenter().segment(&[]).is_empty());
    }

    #[test]
    fn test_single_corner_track() {
        let path = single_corner_loop(1.0);
        let curv = CurvatureProfile::compute(&path, &CurvatureParams::default());
        let corners = CornerSegmenter::new(CornerParams::default())
            .unwrap()
            .segment(&curv.smoothed());

        // The wide closing arc stays below the thresholds
        assert_eq!(corners.len(), 1);
        assert_eq!(corners[0].turn, Turn::Left);
        assert!((corners[0].peak_curvature_m - 1.0 / 15.0).abs() < 1e-3);
    }

    #[test]
    fn test_s_bend_track() {
        let path = s_bend_loop(1.0);
        let curv = CurvatureProfile::compute(&path, &CurvatureParams::default());
        let corners = CornerSegmenter::new(CornerParams::default())
            .unwrap()
            .segment(&curv.smoothed());

        // Two separate corners, the merge gap is larger than the gap between them but they turn
        // opposite ways
        assert_eq!(corners.len(), 2);
        assert_eq!(corners[0].turn, Turn::Left);
        assert_eq!(corners[1].turn, Turn::Right);
        assert!(corners[0].peak_curvature_m > 0.0);
        assert!(corners[1].peak_curvature_m < 0.0);
        assert!(corners[0].end_index < corners[1].start_index);
    }
}
