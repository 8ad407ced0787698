pub const PAGE_SIZE: usize = 10;

pub const NEAR_BOTTOM_THRESHOLD: u32 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationController {
    visible_count: usize,
}

impl Default for PaginationController {
    fn default() -> Self {
        Self {
            visible_count: PAGE_SIZE,
        }
    }
}

impl PaginationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visible_count(&self) -> usize {
        self.visible_count
    }

    pub fn on_near_bottom(&mut self, remaining: u32) -> bool {
        if remaining > NEAR_BOTTOM_THRESHOLD {
            return false;
        }
        self.visible_count = self.visible_count.saturating_add(PAGE_SIZE);
        true
    }

    pub fn reset(&mut self) {
        self.visible_count = PAGE_SIZE;
    }

    pub fn is_exhausted(&self, total: usize) -> bool {
        self.visible_count >= total
    }

    pub fn is_expanded(&self) -> bool {
        self.visible_count > PAGE_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_one_page() {
        let pagination = PaginationController::new();
        assert_eq!(pagination.visible_count(), 10);
        assert!(!pagination.is_expanded());
    }

    #[test]
    fn grows_only_within_threshold() {
        let mut pagination = PaginationController::new();
        assert!(!pagination.on_near_bottom(301));
        assert_eq!(pagination.visible_count(), 10);
        assert!(pagination.on_near_bottom(300));
        assert!(pagination.on_near_bottom(0));
        assert_eq!(pagination.visible_count(), 30);
        assert!(pagination.is_expanded());
    }

    #[test]
    fn repeated_signals_never_shrink() {
        let mut pagination = PaginationController::new();
        let mut last = pagination.visible_count();
        for remaining in [0, 500, 120, 301, 300, 10_000, 0] {
            pagination.on_near_bottom(remaining);
            assert!(pagination.visible_count() >= last);
            last = pagination.visible_count();
        }
    }

    #[test]
    fn reset_returns_to_first_page() {
        let mut pagination = PaginationController::new();
        pagination.on_near_bottom(0);
        pagination.on_near_bottom(0);
        pagination.reset();
        assert_eq!(pagination.visible_count(), 10);
        pagination.reset();
        assert_eq!(pagination.visible_count(), 10);
    }

    #[test]
    fn three_signals_over_twenty_five_posts() {
        let mut pagination = PaginationController::new();
        assert!(!pagination.is_exhausted(25));
        for _ in 0..3 {
            assert!(pagination.on_near_bottom(100));
        }
        assert_eq!(pagination.visible_count(), 40);
        assert!(pagination.is_exhausted(25));
    }
}
