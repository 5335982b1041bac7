//! Offset inference for keyframe lists.
//!
//! Keyframes may leave their offset unset. Inference pins the first
//! keyframe to 0 and the last to 1, then spaces every unset run evenly
//! between its nearest defined neighbors:
//!
//! ```text
//! [0, _, _, 0.9]  ->  [0, 0.3, 0.6, 0.9]
//! [_, 0.5, _]     ->  [0, 0.5, 1]
//! ```

/// Anything carrying an optional offset in 0.0-1.0.
pub trait HasOffset {
    fn offset(&self) -> Option<f64>;
    fn set_offset(&mut self, offset: f64);
}

impl HasOffset for Option<f64> {
    fn offset(&self) -> Option<f64> {
        *self
    }

    fn set_offset(&mut self, offset: f64) {
        *self = Some(offset);
    }
}

/// Fill every unset offset in place.
///
/// A single keyframe without an offset becomes 0. Defined offsets are never
/// changed.
pub fn infer_offsets<T: HasOffset>(keyframes: &mut [T]) {
    let len = keyframes.len();
    if len == 0 {
        return;
    }

    if keyframes[0].offset().is_none() {
        keyframes[0].set_offset(0.0);
    }
    if len > 1 && keyframes[len - 1].offset().is_none() {
        keyframes[len - 1].set_offset(1.0);
    }

    let mut i = 1;
    while i < len {
        if keyframes[i].offset().is_some() {
            i += 1;
            continue;
        }

        // The last keyframe is always defined here, so an anchor exists.
        let next = (i + 1..len)
            .find(|&j| keyframes[j].offset().is_some())
            .unwrap_or(len - 1);

        let start = keyframes[i - 1].offset().unwrap_or(0.0);
        let end = keyframes[next].offset().unwrap_or(1.0);
        let gap = next - i + 1;

        for k in 1..gap {
            let offset = start + (end - start) * k as f64 / gap as f64;
            keyframes[i + k - 1].set_offset(offset);
        }

        i = next + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn infer(input: &[Option<f64>]) -> Vec<f64> {
        let mut list = input.to_vec();
        infer_offsets(&mut list);
        list.into_iter()
            .map(|o| o.expect("every offset should be defined"))
            .collect()
    }

    fn assert_offsets(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < EPSILON, "expected {:?}, got {:?}", expected, actual);
        }
    }

    #[test]
    fn test_empty() {
        let mut list: Vec<Option<f64>> = Vec::new();
        infer_offsets(&mut list);
        assert!(list.is_empty());
    }

    #[test]
    fn test_single_becomes_zero() {
        assert_offsets(&infer(&[None]), &[0.0]);
    }

    #[test]
    fn test_single_defined_is_kept() {
        assert_offsets(&infer(&[Some(0.4)]), &[0.4]);
    }

    #[test]
    fn test_endpoints() {
        assert_offsets(&infer(&[None, None]), &[0.0, 1.0]);
        assert_offsets(&infer(&[None, None, None]), &[0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_run_between_anchors() {
        assert_offsets(
            &infer(&[Some(0.0), None, None, Some(0.9)]),
            &[0.0, 0.3, 0.6, 0.9],
        );
    }

    #[test]
    fn test_multiple_runs() {
        assert_offsets(
            &infer(&[None, None, Some(0.5), None, None, None]),
            &[0.0, 0.25, 0.5, 0.5 + 0.5 / 3.0, 0.5 + 1.0 / 3.0, 1.0],
        );
    }

    #[test]
    fn test_defined_values_untouched() {
        assert_offsets(
            &infer(&[Some(0.2), None, Some(0.4), Some(0.8)]),
            &[0.2, 0.3, 0.4, 0.8],
        );
    }

    #[test]
    fn test_result_is_non_decreasing() {
        let out = infer(&[None, None, Some(0.1), None, Some(0.7), None, None]);
        assert!(out.windows(2).all(|w| w[0] <= w[1]), "{:?}", out);
        assert_eq!(out[0], 0.0);
        assert_eq!(out[out.len() - 1], 1.0);
    }
}
