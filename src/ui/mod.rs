pub mod page;
pub mod panels;
pub mod plot;
pub mod shapes;

/// Smallest and largest of `values`; `(0, 0)` when there are none.
pub fn value_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
        .unwrap_or((0.0, 0.0))
}

#[cfg(test)]
mod tests {
    use super::value_range;

    #[test]
    fn value_range_of_nothing_is_zero() {
        assert_eq!(value_range(std::iter::empty()), (0.0, 0.0));
        assert_eq!(value_range([3.0, -1.0, 2.0].into_iter()), (-1.0, 3.0));
    }
}
