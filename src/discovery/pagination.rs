const WINDOW: usize = 5;

pub fn total_pages(total: u64, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    (total as usize).div_ceil(page_size)
}

/// Page numbers to offer around `current`: at most five, clamped to the ends.
pub fn page_window(current: usize, total_pages: usize) -> Vec<usize> {
    if total_pages == 0 {
        return Vec::new();
    }
    let current = current.clamp(1, total_pages);
    let start = if total_pages <= WINDOW || current <= 3 {
        1
    } else if current >= total_pages - 2 {
        total_pages - WINDOW + 1
    } else {
        current - 2
    };
    let end = (start + WINDOW - 1).min(total_pages);
    (start..=end).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_partial_last_page() {
        assert_eq!(total_pages(0, 12), 0);
        assert_eq!(total_pages(12, 12), 1);
        assert_eq!(total_pages(13, 12), 2);
        assert_eq!(total_pages(5, 0), 0);
    }

    #[test]
    fn window_tracks_current_page() {
        assert_eq!(page_window(1, 3), vec![1, 2, 3]);
        assert_eq!(page_window(2, 10), vec![1, 2, 3, 4, 5]);
        assert_eq!(page_window(6, 10), vec![4, 5, 6, 7, 8]);
        assert_eq!(page_window(9, 10), vec![6, 7, 8, 9, 10]);
        assert_eq!(page_window(42, 10), vec![6, 7, 8, 9, 10]);
        assert!(page_window(1, 0).is_empty());
    }
}
