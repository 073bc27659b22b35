//! Free-window computation: office hours minus busy windows, merged into
//! disjoint half-open windows.

use crate::model::Window;

/// Merge sorted overlapping/adjacent windows into disjoint windows.
pub fn merge_overlapping(sorted: &[Window]) -> Vec<Window> {
    let mut merged: Vec<Window> = Vec::new();
    for &window in sorted {
        if let Some(last) = merged.last_mut()
            && window.start <= last.end
        {
            last.end = last.end.max(window.end);
            continue;
        }
        merged.push(window);
    }
    merged
}

/// Subtract `to_remove` (sorted, disjoint) from `base` (sorted, disjoint).
pub fn subtract_windows(base: &[Window], to_remove: &[Window]) -> Vec<Window> {
    let mut result = Vec::new();
    let mut ri = 0;

    for &b in base {
        let mut current_start = b.start;
        let current_end = b.end;

        while ri < to_remove.len() && to_remove[ri].end <= current_start {
            ri += 1;
        }

        let mut j = ri;
        while j < to_remove.len() && to_remove[j].start < current_end {
            let r = &to_remove[j];
            if r.start > current_start {
                result.push(Window::new(current_start, r.start));
            }
            current_start = current_start.max(r.end);
            j += 1;
        }

        if current_start < current_end {
            result.push(Window::new(current_start, current_end));
        }
    }

    result
}

/// Open slots within `office` once `busy` is taken out. Input order does not
/// matter; windows shorter than `min_minutes` are dropped.
pub fn free_windows(office: Window, busy: &[Window], min_minutes: Option<i64>) -> Vec<Window> {
    let mut busy = busy.to_vec();
    busy.sort_by_key(|w| w.start);
    let busy = merge_overlapping(&busy);
    let mut free = subtract_windows(&[office], &busy);
    if let Some(min) = min_minutes {
        free.retain(|w| w.duration_minutes() >= min);
    }
    free
}
