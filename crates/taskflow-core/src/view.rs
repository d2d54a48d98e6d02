use tracing::trace;

use crate::task::{Status, Task};

/// Status narrowing: everything, or exactly one of the three statuses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(Status),
}

impl StatusFilter {
    pub fn parse(s: &str) -> Option<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Some(StatusFilter::All);
        }
        s.parse::<Status>().ok().map(StatusFilter::Only)
    }

    fn admits(self, status: Status) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => status == wanted,
        }
    }
}

/// Client-local filter state. Never mutates server data; only narrows
/// what is shown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub query: String,
    pub status: StatusFilter,
}

/// Tallies over the unfiltered snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
}

#[derive(Debug, Clone)]
pub struct View {
    pub visible: Vec<Task>,
    pub counts: Counts,
}

/// Reduces the full snapshot to the subset to display. Counts always
/// reflect the whole snapshot, independent of the active filter; the
/// visible subset keeps the snapshot's order and is never re-sorted.
///
/// The status predicate applies first, then the search predicate. The
/// query is used untrimmed; only the is-it-empty check trims.
pub fn derive(snapshot: &[Task], filter: &FilterState) -> View {
    let counts = tally(snapshot);

    let query = if filter.query.trim().is_empty() {
        None
    } else {
        Some(filter.query.to_lowercase())
    };

    let visible: Vec<Task> = snapshot
        .iter()
        .filter(|task| filter.status.admits(task.status))
        .filter(|task| match query.as_deref() {
            None => true,
            Some(needle) => matches_query(task, needle),
        })
        .cloned()
        .collect();

    trace!(
        total = counts.total,
        visible = visible.len(),
        status = ?filter.status,
        "derived view"
    );

    View { visible, counts }
}

fn tally(snapshot: &[Task]) -> Counts {
    let mut counts = Counts {
        total: snapshot.len(),
        ..Counts::default()
    };

    for task in snapshot {
        match task.status {
            Status::Pending => counts.pending += 1,
            Status::InProgress => counts.in_progress += 1,
            Status::Completed => counts.completed += 1,
        }
    }

    counts
}

fn matches_query(task: &Task, needle: &str) -> bool {
    task.title.to_lowercase().contains(needle)
        || task.description.to_lowercase().contains(needle)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use super::{FilterState, StatusFilter, derive};
    use crate::task::{Status, Task};

    fn task(title: &str, description: &str, status: Status) -> Task {
        let now = Utc.with_ymd_and_hms(2026, 8, 4, 9, 0, 0).unwrap();
        Task {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: description.to_string(),
            status,
            deadline: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn sample() -> Vec<Task> {
        vec![
            task("Buy milk", "", Status::Pending),
            task("Write report", "quarterly", Status::Completed),
        ]
    }

    #[test]
    fn counts_ignore_query_and_status_filter() {
        let snapshot = sample();
        let expected = derive(&snapshot, &FilterState::default()).counts;

        for (query, status) in [
            ("report", StatusFilter::All),
            ("", StatusFilter::Only(Status::Pending)),
            ("zzz", StatusFilter::Only(Status::Completed)),
        ] {
            let view = derive(
                &snapshot,
                &FilterState {
                    query: query.to_string(),
                    status,
                },
            );
            assert_eq!(view.counts, expected);
        }

        assert_eq!(expected.total, 2);
        assert_eq!(expected.pending, 1);
        assert_eq!(expected.in_progress, 0);
        assert_eq!(expected.completed, 1);
    }

    #[test]
    fn identity_filter_returns_snapshot_in_order() {
        let snapshot = sample();
        let view = derive(&snapshot, &FilterState::default());
        assert_eq!(view.visible, snapshot);
    }

    #[test]
    fn search_matches_title_or_description_case_insensitively() {
        let snapshot = sample();

        let by_title = derive(
            &snapshot,
            &FilterState {
                query: "REPORT".to_string(),
                status: StatusFilter::All,
            },
        );
        assert_eq!(by_title.visible.len(), 1);
        assert_eq!(by_title.visible[0].title, "Write report");

        let by_description = derive(
            &snapshot,
            &FilterState {
                query: "Quarterly".to_string(),
                status: StatusFilter::All,
            },
        );
        assert_eq!(by_description.visible.len(), 1);
        assert_eq!(by_description.visible[0].title, "Write report");
    }

    #[test]
    fn status_filter_keeps_only_matching_tasks() {
        let snapshot = sample();
        let view = derive(
            &snapshot,
            &FilterState {
                query: String::new(),
                status: StatusFilter::Only(Status::Pending),
            },
        );
        assert_eq!(view.visible.len(), 1);
        assert_eq!(view.visible[0].title, "Buy milk");
    }

    #[test]
    fn status_and_search_compose() {
        let mut snapshot = sample();
        snapshot.push(task("Review report draft", "", Status::Pending));

        let view = derive(
            &snapshot,
            &FilterState {
                query: "report".to_string(),
                status: StatusFilter::Only(Status::Pending),
            },
        );
        assert_eq!(view.visible.len(), 1);
        assert_eq!(view.visible[0].title, "Review report draft");
    }

    #[test]
    fn empty_description_never_matches_search() {
        let snapshot = vec![task("Buy milk", "", Status::Pending)];
        let view = derive(
            &snapshot,
            &FilterState {
                query: "groceries".to_string(),
                status: StatusFilter::All,
            },
        );
        assert!(view.visible.is_empty());
    }

    #[test]
    fn whitespace_query_is_no_search_filter() {
        let snapshot = sample();
        let view = derive(
            &snapshot,
            &FilterState {
                query: "   ".to_string(),
                status: StatusFilter::All,
            },
        );
        assert_eq!(view.visible.len(), snapshot.len());
    }

    #[test]
    fn derive_is_deterministic_and_leaves_input_alone() {
        let snapshot = sample();
        let before = snapshot.clone();
        let filter = FilterState {
            query: "report".to_string(),
            status: StatusFilter::All,
        };

        let first = derive(&snapshot, &filter);
        let second = derive(&snapshot, &filter);
        assert_eq!(first.visible, second.visible);
        assert_eq!(first.counts, second.counts);
        assert_eq!(snapshot, before);
    }

    #[test]
    fn status_filter_parses_user_tokens() {
        assert_eq!(StatusFilter::parse("all"), Some(StatusFilter::All));
        assert_eq!(
            StatusFilter::parse("in-progress"),
            Some(StatusFilter::Only(Status::InProgress))
        );
        assert_eq!(StatusFilter::parse("nope"), None);
    }
}
