//! Display settings model

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::Task;

/// Column the task table is sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    Name,
    Date,
    /// Manual order, not-completed tasks first
    #[default]
    Order,
    Difficulty,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortBy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Date => "date",
            Self::Order => "order",
            Self::Difficulty => "difficulty",
        }
    }
}

impl SortDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" | "title" => Ok(Self::Name),
            "date" | "created_at" => Ok(Self::Date),
            "order" => Ok(Self::Order),
            "difficulty" => Ok(Self::Difficulty),
            other => Err(format!("unknown sort column: {other}")),
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!("unknown sort direction: {other}")),
        }
    }
}

/// Sort tasks for display according to the persisted sort settings.
///
/// Ties keep their manual order. Tasks without a difficulty sort as 0.
pub fn sort_tasks(tasks: &mut [Task], by: SortBy, direction: SortDirection) {
    tasks.sort_by(|left, right| {
        let primary = match by {
            SortBy::Name => left
                .title
                .to_lowercase()
                .cmp(&right.title.to_lowercase()),
            SortBy::Date => left.created_at.cmp(&right.created_at),
            SortBy::Order => left
                .is_completed()
                .cmp(&right.is_completed())
                .then(left.order.cmp(&right.order)),
            SortBy::Difficulty => left
                .difficulty
                .unwrap_or(0)
                .cmp(&right.difficulty.unwrap_or(0)),
        };
        let primary = match direction {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };
        if primary == Ordering::Equal {
            left.order.cmp(&right.order)
        } else {
            primary
        }
    });
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::models::TaskStatus;

    fn task(title: &str, order: i64, difficulty: Option<u8>, status: TaskStatus) -> Task {
        Task {
            id: title.into(),
            list_id: "list".into(),
            title: title.to_string(),
            status,
            difficulty,
            description: None,
            assignee: None,
            order,
            created_at: Utc::now() + Duration::seconds(order),
        }
    }

    fn titles(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|task| task.title.as_str()).collect()
    }

    #[test]
    fn sort_settings_default_to_manual_ascending() {
        assert_eq!(SortBy::default(), SortBy::Order);
        assert_eq!(SortDirection::default(), SortDirection::Asc);
        assert_eq!(serde_json::to_string(&SortBy::Order).unwrap(), "\"order\"");
    }

    #[test]
    fn sort_by_name_is_case_insensitive() {
        let mut tasks = vec![
            task("banana", 0, None, TaskStatus::NotStarted),
            task("Apple", 1, None, TaskStatus::NotStarted),
            task("cherry", 2, None, TaskStatus::NotStarted),
        ];
        sort_tasks(&mut tasks, SortBy::Name, SortDirection::Asc);
        assert_eq!(titles(&tasks), vec!["Apple", "banana", "cherry"]);
    }

    #[test]
    fn sort_by_difficulty_descending_breaks_ties_by_order() {
        let mut tasks = vec![
            task("easy", 0, Some(2), TaskStatus::NotStarted),
            task("hard-late", 3, Some(8), TaskStatus::NotStarted),
            task("hard-early", 1, Some(8), TaskStatus::NotStarted),
            task("unrated", 2, None, TaskStatus::NotStarted),
        ];
        sort_tasks(&mut tasks, SortBy::Difficulty, SortDirection::Desc);
        assert_eq!(titles(&tasks), vec!["hard-early", "hard-late", "easy", "unrated"]);
    }

    #[test]
    fn sort_by_order_keeps_completed_last() {
        let mut tasks = vec![
            task("done", 0, None, TaskStatus::Done),
            task("second", 1, None, TaskStatus::NotStarted),
            task("first", 0, None, TaskStatus::InProgress),
        ];
        sort_tasks(&mut tasks, SortBy::Order, SortDirection::Asc);
        assert_eq!(titles(&tasks), vec!["first", "second", "done"]);
    }
}
