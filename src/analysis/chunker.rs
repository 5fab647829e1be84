//! Line windows and practice batches

/// Drops blank lines and groups the rest into windows of `window_size` lines.
/// Order is preserved; the last window may be shorter.
pub fn split_lines(content: &str, window_size: usize) -> Vec<Vec<&str>> {
    let non_blank: Vec<&str> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect();

    non_blank
        .chunks(window_size.max(1))
        .map(|window| window.to_vec())
        .collect()
}

/// Joins a window back into evaluable source text
pub fn window_text(window: &[&str]) -> String {
    window.join("\n")
}

/// Contiguous batches of at most `batch_size` items, no reordering
pub fn split_practices<T>(practices: &[T], batch_size: usize) -> Vec<&[T]> {
    practices.chunks(batch_size.max(1)).collect()
}
