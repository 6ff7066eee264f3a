//! Per-side contributor ranking.

use crate::domain::{PerSide, UserContribution};

/// How many contributors each side's leaderboard shows.
pub const LEADERBOARD_SIZE: usize = 3;

/// Ranks one side's contributors: descending by accumulated score, ties
/// keeping arrival order, truncated to [`LEADERBOARD_SIZE`].
#[must_use]
pub fn rank(contributions: &[UserContribution]) -> Vec<UserContribution> {
    let mut ranked = contributions.to_vec();
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked.truncate(LEADERBOARD_SIZE);
    ranked
}

/// Ranks both sides.
#[must_use]
pub fn rank_sides(
    contributions: &PerSide<Vec<UserContribution>>,
) -> PerSide<Vec<UserContribution>> {
    PerSide {
        host: rank(&contributions.host),
        guest: rank(&contributions.guest),
    }
}

#[cfg(test)]
mod tests {
    use super::rank;
    use crate::domain::{User, UserContribution};

    fn entry(id: &str, score: i64) -> UserContribution {
        UserContribution {
            user: User::new(id, id),
            score,
        }
    }

    #[test]
    fn test_rank_sorts_descending_and_truncates_to_three() {
        // Arrange
        let contributions = vec![entry("a", 5), entry("b", 9), entry("c", 1), entry("d", 7)];

        // Act
        let ranked = rank(&contributions);

        // Assert
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].user.id, "b");
        assert_eq!(ranked[1].user.id, "d");
        assert_eq!(ranked[2].user.id, "a");
    }

    #[test]
    fn test_rank_keeps_arrival_order_on_ties() {
        // Arrange
        let contributions = vec![entry("first", 4), entry("second", 4), entry("third", 4)];

        // Act
        let ranked = rank(&contributions);

        // Assert
        assert_eq!(ranked[0].user.id, "first");
        assert_eq!(ranked[1].user.id, "second");
        assert_eq!(ranked[2].user.id, "third");
    }

    #[test]
    fn test_rank_of_empty_contributions_is_empty() {
        assert!(rank(&[]).is_empty());
    }
}
