use anyhow::anyhow;

use crate::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    All,
    Active,
    Completed,
}

impl std::str::FromStr for FilterMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            other => Err(anyhow!(
                "invalid filter mode: {other} (expected all, active or completed)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counts {
    pub total: usize,
    pub completed: usize,
}

pub fn count_completed(tasks: &[Task]) -> Counts {
    Counts {
        total: tasks.len(),
        completed: tasks.iter().filter(|t| t.completed).count(),
    }
}

/// Order-preserving subsequence of `tasks` visible under `mode`.
pub fn visible_tasks(tasks: &[Task], mode: FilterMode) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|t| match mode {
            FilterMode::All => true,
            FilterMode::Active => !t.completed,
            FilterMode::Completed => t.completed,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Task> {
        vec![
            Task {
                id: 1,
                title: "A".to_string(),
                completed: false,
            },
            Task {
                id: 2,
                title: "B".to_string(),
                completed: true,
            },
            Task {
                id: 3,
                title: "C".to_string(),
                completed: false,
            },
        ]
    }

    #[test]
    fn counts_totals_and_completed() {
        let tasks = sample();
        let counts = count_completed(&tasks[..2]);
        assert_eq!(counts, Counts { total: 2, completed: 1 });
    }

    #[test]
    fn all_mode_is_identity() {
        let tasks = sample();
        let visible = visible_tasks(&tasks, FilterMode::All);
        let ids: Vec<i64> = visible.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn active_and_completed_partition_the_list() {
        let tasks = sample();
        let active = visible_tasks(&tasks, FilterMode::Active);
        let completed = visible_tasks(&tasks, FilterMode::Completed);

        assert_eq!(active.len() + completed.len(), tasks.len());
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, 2);
    }

    #[test]
    fn filtering_preserves_relative_order() {
        let tasks = sample();
        let active = visible_tasks(&tasks, FilterMode::Active);
        let ids: Vec<i64> = active.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("ALL".parse::<FilterMode>().expect("parses"), FilterMode::All);
        assert_eq!(
            "Active".parse::<FilterMode>().expect("parses"),
            FilterMode::Active
        );
        assert!("done".parse::<FilterMode>().is_err());
    }
}
