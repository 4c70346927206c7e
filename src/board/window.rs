use std::ops::Range;

/// Rows to render for a scrolled column: every row intersecting the
/// viewport, padded by `overscan` rows on each side, clamped to the column.
pub fn visible_range(
    total_rows: usize,
    row_height: f64,
    viewport_height: f64,
    scroll_offset: f64,
    overscan: usize,
) -> Range<usize> {
    if total_rows == 0 || row_height <= 0.0 || viewport_height <= 0.0 {
        return 0..0;
    }
    let offset = scroll_offset.max(0.0);
    let first = (offset / row_height).floor() as usize;
    let last = ((offset + viewport_height) / row_height).ceil() as usize;

    let start = first.saturating_sub(overscan).min(total_rows);
    let end = last.saturating_add(overscan).min(total_rows);
    start..end.max(start)
}

/// Adjust a row scroll offset so `cursor` is within the `visible_rows`
/// rows shown.
pub fn scroll_to_reveal(cursor: usize, offset: usize, visible_rows: usize) -> usize {
    if visible_rows == 0 {
        return cursor;
    }
    if cursor < offset {
        cursor
    } else if cursor >= offset + visible_rows {
        cursor.saturating_sub(visible_rows - 1)
    } else {
        offset
    }
}
