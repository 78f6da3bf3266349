//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Wrap an angle into the range (-pi, pi].
pub fn wrap_pi<T>(angle: T) -> T
where
    T: Float,
{
    let pi_t = T::from(std::f64::consts::PI).unwrap();
    let tau_t = T::from(std::f64::consts::TAU).unwrap();

    let wrapped = rem_euclid(angle + pi_t, tau_t) - pi_t;

    // rem_euclid puts +pi at -pi, move it back to the top of the range
    if wrapped <= -pi_t {
        wrapped + tau_t
    } else {
        wrapped
    }
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::zero() {
        r + rhs.abs()
    } else {
        r
    }
}

/// Index `offset` steps away from `index` on a loop of `len` elements.
///
/// `len` must be non-zero.
pub fn wrap_index(index: usize, offset: isize, len: usize) -> usize {
    let len_i = len as isize;
    (((index as isize + offset) % len_i + len_i) % len_i) as usize
}

/// Number of forward steps needed to get from `from` to `to` on a loop of `len` elements.
pub fn forward_distance(from: usize, to: usize, len: usize) -> usize {
    (to + len - from % len) % len
}

/// Shortest number of steps between two indices on a loop of `len` elements.
pub fn cyclic_distance(a: usize, b: usize, len: usize) -> usize {
    let fwd = forward_distance(a, b, len);
    fwd.min(len - fwd)
}

/// Symmetric moving average over a loop of values.
///
/// Each output element is the mean of the input elements within `half_window` of it, wrapping
/// around the ends. The window is shrunk if it would cover the loop more than once.
pub fn circular_moving_average<T>(values: &[T], half_window: usize) -> Vec<T>
where
    T: Float,
{
    let len = values.len();
    if len == 0 || half_window == 0 {
        return values.to_vec();
    }

    let half_window = half_window.min((len - 1) / 2);
    if half_window == 0 {
        return values.to_vec();
    }
    let width = T::from(2 * half_window + 1).unwrap();

    (0..len)
        .map(|i| {
            let mut sum = T::zero();
            for k in -(half_window as isize)..=(half_window as isize) {
                sum = sum + values[wrap_index(i, k, len)];
            }
            sum / width
        })
        .collect()
}

/// Largest absolute difference between neighbouring elements of a loop of values.
pub fn max_adjacent_difference<T>(values: &[T]) -> T
where
    T: Float,
{
    let len = values.len();
    (0..len).fold(T::zero(), |acc, i| {
        acc.max((values[(i + 1) % len] - values[i]).abs())
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_wrap_pi() {
        const PI: f64 = std::f64::consts::PI;
        const TAU: f64 = std::f64::consts::TAU;

        assert_relative_eq!(wrap_pi(0.5f64), 0.5);
        assert_relative_eq!(wrap_pi(-0.5f64), -0.5);
        assert_relative_eq!(wrap_pi(PI + 0.5), -PI + 0.5, epsilon = 1e-12);
        assert_relative_eq!(wrap_pi(-PI - 0.5), PI - 0.5, epsilon = 1e-12);
        assert_relative_eq!(wrap_pi(3.0 * TAU + 1.0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(wrap_pi(PI), PI);
        assert_relative_eq!(wrap_pi(-PI), PI);
    }

    #[test]
    fn test_loop_indices() {
        assert_eq!(wrap_index(0, -1, 10), 9);
        assert_eq!(wrap_index(9, 1, 10), 0);
        assert_eq!(wrap_index(3, -25, 10), 8);
        assert_eq!(forward_distance(8, 2, 10), 4);
        assert_eq!(forward_distance(2, 8, 10), 6);
        assert_eq!(cyclic_distance(8, 2, 10), 4);
        assert_eq!(cyclic_distance(2, 8, 10), 4);
        assert_eq!(cyclic_distance(5, 5, 10), 0);
    }

    #[test]
    fn test_circular_moving_average() {
        let values = [0.0f64, 0.0, 3.0, 0.0, 0.0, 0.0];
        let avg = circular_moving_average(&values, 1);
        assert_relative_eq!(avg[1], 1.0);
        assert_relative_eq!(avg[2], 1.0);
        assert_relative_eq!(avg[3], 1.0);
        assert_relative_eq!(avg[5], 0.0);

        // Wrapping picks up the far end of the loop
        let values = [3.0f64, 0.0, 0.0, 0.0, 0.0, 0.0];
        let avg = circular_moving_average(&values, 1);
        assert_relative_eq!(avg[5], 1.0);

        // The window is clamped to the loop length and the mean is preserved
        let values = [1.0f64, 2.0, 3.0];
        let avg = circular_moving_average(&values, 50);
        for v in avg {
            assert_relative_eq!(v, 2.0);
        }
    }

    #[test]
    fn test_moving_average_reduces_adjacent_difference() {
        // A deterministic but irregular sequence
        let values: Vec<f64> = (0..97)
            .map(|i| ((i * 37 % 11) as f64 - 5.0) * 0.1 + (i as f64 * 0.3).sin())
            .collect();
        let raw_max = max_adjacent_difference(&values);

        for half_window in 1..8 {
            let smoothed = circular_moving_average(&values, half_window);
            assert!(max_adjacent_difference(&smoothed) <= raw_max + 1e-12);
        }
    }
}
