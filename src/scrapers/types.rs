/// Upper bound on scroll-and-poll rounds for lazily loaded listings.
pub const MAX_SCROLL_POLLS: u32 = 30;

/// Unchanged polls tolerated before a listing is considered fully loaded.
pub const STABLE_POLLS: u32 = 2;

/// What to do after observing the current listing size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollStep {
    /// Scroll again and re-poll
    Continue,
    /// The count stopped growing
    Settled,
    /// Poll ceiling reached
    Exhausted,
}

/// Tracks listing growth while a page is scrolled.
///
/// This is a heuristic: on a slow network it can stop before everything has
/// loaded, and on a randomised feed it just runs to the ceiling.
#[derive(Debug, Clone)]
pub struct ScrollPoller {
    last_count: Option<usize>,
    unchanged: u32,
    polls: u32,
    max_polls: u32,
}

impl Default for ScrollPoller {
    fn default() -> Self {
        Self::new(MAX_SCROLL_POLLS)
    }
}

impl ScrollPoller {
    pub fn new(max_polls: u32) -> Self {
        Self {
            last_count: None,
            unchanged: 0,
            polls: 0,
            max_polls,
        }
    }

    pub fn observe(&mut self, count: usize) -> ScrollStep {
        self.polls += 1;
        if self.last_count == Some(count) {
            self.unchanged += 1;
        } else {
            self.unchanged = 0;
        }
        self.last_count = Some(count);

        if self.unchanged > STABLE_POLLS {
            ScrollStep::Settled
        } else if self.polls >= self.max_polls {
            ScrollStep::Exhausted
        } else {
            ScrollStep::Continue
        }
    }

    pub fn polls(&self) -> u32 {
        self.polls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settles_after_more_than_two_unchanged_polls() {
        let mut poller = ScrollPoller::default();
        assert_eq!(poller.observe(10), ScrollStep::Continue);
        assert_eq!(poller.observe(20), ScrollStep::Continue);
        assert_eq!(poller.observe(20), ScrollStep::Continue);
        assert_eq!(poller.observe(20), ScrollStep::Continue);
        assert_eq!(poller.observe(20), ScrollStep::Settled);
        assert_eq!(poller.polls(), 5);
    }

    #[test]
    fn test_growth_resets_stability() {
        let mut poller = ScrollPoller::default();
        for count in [5, 5, 5, 6, 6, 6] {
            assert_eq!(poller.observe(count), ScrollStep::Continue);
        }
        assert_eq!(poller.observe(6), ScrollStep::Settled);
    }

    #[test]
    fn test_stops_at_poll_ceiling() {
        let mut poller = ScrollPoller::default();
        let mut steps = Vec::new();
        for i in 0..MAX_SCROLL_POLLS as usize {
            steps.push(poller.observe(i));
        }
        assert!(steps[..steps.len() - 1].iter().all(|s| *s == ScrollStep::Continue));
        assert_eq!(steps.last(), Some(&ScrollStep::Exhausted));
    }

    #[test]
    fn test_empty_page_settles() {
        let mut poller = ScrollPoller::new(10);
        let steps: Vec<_> = (0..4).map(|_| poller.observe(0)).collect();
        assert_eq!(steps.last(), Some(&ScrollStep::Settled));
    }
}
