//! Level derivation from cumulative points

/// Flat level curve: `level = 1 + points / points_per_level`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelPolicy {
    points_per_level: u32,
}

impl LevelPolicy {
    /// `points_per_level` below 1 is treated as 1
    pub fn new(points_per_level: u32) -> Self {
        Self {
            points_per_level: points_per_level.max(1),
        }
    }

    pub fn points_per_level(&self) -> u32 {
        self.points_per_level
    }

    pub fn level_for(&self, points: i64) -> u32 {
        if points <= 0 {
            return 1;
        }
        let level = 1 + points / i64::from(self.points_per_level);
        u32::try_from(level).unwrap_or(u32::MAX)
    }

    /// `(level_up, new_level)` for a score change
    pub fn progress(&self, old_points: i64, new_points: i64) -> (bool, u32) {
        let old_level = self.level_for(old_points);
        let new_level = self.level_for(new_points);
        (new_level > old_level, new_level)
    }
}

impl Default for LevelPolicy {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_boundaries() {
        let policy = LevelPolicy::default();
        assert_eq!(policy.level_for(0), 1);
        assert_eq!(policy.level_for(999), 1);
        assert_eq!(policy.level_for(1000), 2);
        assert_eq!(policy.level_for(2500), 3);
        assert_eq!(policy.level_for(-300), 1);
    }

    #[test]
    fn test_level_up_detection() {
        let policy = LevelPolicy::new(1000);
        assert_eq!(policy.progress(0, 500), (false, 1));
        assert_eq!(policy.progress(500, 1300), (true, 2));
    }

    #[test]
    fn test_zero_points_per_level_is_clamped() {
        let policy = LevelPolicy::new(0);
        assert_eq!(policy.points_per_level(), 1);
        assert_eq!(policy.level_for(5), 6);
    }
}
