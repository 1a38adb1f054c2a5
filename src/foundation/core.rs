pub use kurbo::{Point, Rect};

/// Image axis a coordinate or removal range lives on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    /// Left-right, i.e. column coordinates.
    X,
    /// Top-down, i.e. row coordinates.
    Y,
}

/// Length of the overlap of `[a0, a1]` and `[b0, b1]`, zero when disjoint.
pub(crate) fn overlap_len(a0: f64, a1: f64, b0: f64, b1: f64) -> f64 {
    (a1.min(b1) - a0.max(b0)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_len_disjoint_is_zero() {
        assert_eq!(overlap_len(0.0, 10.0, 20.0, 30.0), 0.0);
        assert_eq!(overlap_len(20.0, 30.0, 0.0, 10.0), 0.0);
    }

    #[test]
    fn overlap_len_partial_and_contained() {
        assert_eq!(overlap_len(0.0, 10.0, 5.0, 20.0), 5.0);
        assert_eq!(overlap_len(0.0, 10.0, 2.0, 4.0), 2.0);
    }
}
