use std::cmp::Reverse;
use std::str::FromStr;

use iboard_types::Idea;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOption {
    #[default]
    Newest,
    Oldest,
    MostVoted,
    LeastVoted,
}

impl FromStr for SortOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest" => Ok(Self::Newest),
            "oldest" => Ok(Self::Oldest),
            "most_voted" => Ok(Self::MostVoted),
            "least_voted" => Ok(Self::LeastVoted),
            other => Err(format!("unknown sort option: {}", other)),
        }
    }
}

/// Search and ordering applied to a board for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdeaFilter {
    pub query: String,
    pub sort: SortOption,
}

impl IdeaFilter {
    pub fn new(query: impl Into<String>, sort: SortOption) -> Self {
        Self {
            query: query.into(),
            sort,
        }
    }

    /// Matching ideas in display order. Ties keep their input order.
    pub fn apply<'a>(&self, ideas: &'a [Idea]) -> Vec<&'a Idea> {
        let query = self.query.trim().to_lowercase();
        let mut out: Vec<&Idea> = ideas
            .iter()
            .filter(|i| query.is_empty() || i.text.to_lowercase().contains(&query))
            .collect();

        match self.sort {
            SortOption::Newest => out.sort_by_key(|i| Reverse(i.created_at)),
            SortOption::Oldest => out.sort_by_key(|i| i.created_at),
            SortOption::MostVoted => out.sort_by_key(|i| Reverse(i.score())),
            SortOption::LeastVoted => out.sort_by_key(|i| i.score()),
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::snapshot::tests::idea;

    fn board() -> Vec<Idea> {
        let base = Utc::now();
        let mut a = idea("Team lunch on Friday", 5, 1);
        let mut b = idea("Quiet hours", 0, 2);
        let mut c = idea("Lunch and learn sessions", 1, 0);
        a.created_at = base - Duration::minutes(3);
        b.created_at = base - Duration::minutes(2);
        c.created_at = base - Duration::minutes(1);
        vec![a, b, c]
    }

    fn texts(ideas: Vec<&Idea>) -> Vec<&str> {
        ideas.into_iter().map(|i| i.text.as_str()).collect()
    }

    #[test]
    fn search_is_trimmed_and_case_insensitive() {
        let ideas = board();
        let filter = IdeaFilter::new("  LUNCH ", SortOption::Oldest);
        assert_eq!(
            texts(filter.apply(&ideas)),
            ["Team lunch on Friday", "Lunch and learn sessions"]
        );
    }

    #[test]
    fn blank_query_keeps_everything() {
        let ideas = board();
        assert_eq!(IdeaFilter::new("   ", SortOption::Newest).apply(&ideas).len(), 3);
    }

    #[test]
    fn sorts_by_date_and_score() {
        let ideas = board();
        let by = |sort| texts(IdeaFilter::new("", sort).apply(&ideas));

        assert_eq!(by(SortOption::Newest)[0], "Lunch and learn sessions");
        assert_eq!(by(SortOption::Oldest)[0], "Team lunch on Friday");
        assert_eq!(by(SortOption::MostVoted), ["Team lunch on Friday", "Lunch and learn sessions", "Quiet hours"]);
        assert_eq!(by(SortOption::LeastVoted)[0], "Quiet hours");
    }

    #[test]
    fn parses_sort_names() {
        assert_eq!("most_voted".parse::<SortOption>(), Ok(SortOption::MostVoted));
        assert!("random".parse::<SortOption>().is_err());
    }
}
