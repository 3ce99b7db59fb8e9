/// Smallest and largest value, or `None` for an empty input.
pub fn min_max(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    let mut it = values.into_iter();
    let first = it.next()?;
    let mut min = first;
    let mut max = first;
    for v in it {
        min = min.min(v);
        max = max.max(v);
    }
    Some((min, max))
}
