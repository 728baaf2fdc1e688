#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    fn step(self) -> usize {
        match self {
            Self::Forward => 1,
            Self::Backward => usize::MAX,
        }
    }
}

/// Total match count plus the active match, if any.
///
/// `current` is `Some(i)` with `i < count` whenever `count > 0`, and `None`
/// otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchCursor {
    count: usize,
    current: Option<usize>,
}

impl MatchCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor for a fresh search: first match active when there is one.
    pub fn from_count(count: usize) -> Self {
        Self {
            count,
            current: (count > 0).then_some(0),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    /// 1-based position and total, for display.
    pub fn position(&self) -> Option<(usize, usize)> {
        self.current.map(|i| (i + 1, self.count))
    }

    /// Moves one match in `direction`, wrapping at both ends. Returns the new
    /// index, or `None` without touching anything when there are no matches.
    pub fn navigate(&mut self, direction: Direction) -> Option<usize> {
        if self.count == 0 {
            return None;
        }
        let current = self.current.unwrap_or(0);
        // (current + direction + count) % count, with -1 as wrapping add.
        let next = current
            .wrapping_add(direction.step())
            .wrapping_add(self.count)
            % self.count;
        self.current = Some(next);
        Some(next)
    }

    pub fn status_text(&self) -> String {
        match self.position() {
            Some((current, total)) => format!("{} of {}", current, total),
            None => "No matches".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cursor() {
        let cursor = MatchCursor::new();
        assert!(cursor.is_empty());
        assert_eq!(cursor.count(), 0);
        assert!(cursor.current().is_none());
        assert!(cursor.position().is_none());
        assert_eq!(cursor.status_text(), "No matches");
    }

    #[test]
    fn test_from_count() {
        assert_eq!(MatchCursor::from_count(0), MatchCursor::new());
        let cursor = MatchCursor::from_count(4);
        assert_eq!(cursor.current(), Some(0));
        assert_eq!(cursor.status_text(), "1 of 4");
    }

    #[test]
    fn test_navigation() {
        let mut cursor = MatchCursor::from_count(3);

        assert_eq!(cursor.position(), Some((1, 3)));

        cursor.navigate(Direction::Forward);
        assert_eq!(cursor.position(), Some((2, 3)));

        cursor.navigate(Direction::Forward);
        assert_eq!(cursor.position(), Some((3, 3)));

        cursor.navigate(Direction::Forward);
        assert_eq!(cursor.position(), Some((1, 3)));

        cursor.navigate(Direction::Backward);
        assert_eq!(cursor.position(), Some((3, 3)));
    }

    #[test]
    fn test_wraps_at_both_ends() {
        let mut cursor = MatchCursor::from_count(3);
        cursor.navigate(Direction::Backward);
        assert_eq!(cursor.current(), Some(2));
        assert_eq!(cursor.navigate(Direction::Forward), Some(0));
        assert_eq!(cursor.navigate(Direction::Backward), Some(2));
    }

    #[test]
    fn test_single_match_stays_put() {
        let mut cursor = MatchCursor::from_count(1);
        assert_eq!(cursor.navigate(Direction::Forward), Some(0));
        assert_eq!(cursor.navigate(Direction::Backward), Some(0));
    }

    #[test]
    fn test_navigate_without_matches_is_noop() {
        let mut cursor = MatchCursor::new();
        assert_eq!(cursor.navigate(Direction::Forward), None);
        assert_eq!(cursor.navigate(Direction::Backward), None);
        assert_eq!(cursor, MatchCursor::new());
    }

    #[test]
    fn test_reset() {
        let mut cursor = MatchCursor::from_count(5);
        cursor.navigate(Direction::Forward);
        cursor.reset();
        assert_eq!(cursor, MatchCursor::new());
    }
}
