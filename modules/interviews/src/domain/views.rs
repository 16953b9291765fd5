//! Derived views over a snapshot of interviews.
//!
//! Every function here is pure: it takes a slice and returns a fresh `Vec`,
//! leaving the canonical list untouched.

use std::str::FromStr;

use crate::contract::model::{Interview, InterviewStatus, PriorityLevel};

/// Aggregate counts for the dashboard cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InterviewStats {
    pub total: usize,
    pub pending: usize,
    pub passed: usize,
    pub failed: usize,
    pub no_feedback: usize,
}

impl InterviewStats {
    /// Sum of the status buckets; less than `total` when some statuses are unrecognized.
    pub fn bucketed(&self) -> usize {
        self.pending + self.passed + self.failed + self.no_feedback
    }
}

pub fn compute_stats(list: &[Interview]) -> InterviewStats {
    list.iter().fold(
        InterviewStats {
            total: list.len(),
            ..Default::default()
        },
        |mut acc, i| {
            match i.status {
                InterviewStatus::Pending => acc.pending += 1,
                InterviewStatus::Passed => acc.passed += 1,
                InterviewStatus::Failed => acc.failed += 1,
                InterviewStatus::NoFeedback => acc.no_feedback += 1,
                InterviewStatus::Unrecognized(_) => {}
            }
            acc
        },
    )
}

/// Pending interviews, earliest date first. `sort_by_key` is stable, so
/// same-day interviews keep their input order.
pub fn select_pending(list: &[Interview]) -> Vec<Interview> {
    let mut pending: Vec<Interview> = list
        .iter()
        .filter(|i| i.status == InterviewStatus::Pending)
        .cloned()
        .collect();
    pending.sort_by_key(|i| i.interview_date);
    pending
}

/// Case-insensitive substring match on company, position or interviewer.
/// A blank term returns the input unchanged.
pub fn filter_by_search(list: &[Interview], term: &str) -> Vec<Interview> {
    if term.trim().is_empty() {
        return list.to_vec();
    }
    let needle = term.to_lowercase();
    list.iter()
        .filter(|i| {
            [&i.company_name, &i.job_position, &i.interviewer_name]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}

/// `All` or one exact value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selector<T> {
    #[default]
    All,
    Only(T),
}

pub type StatusFilter = Selector<InterviewStatus>;
pub type PriorityFilter = Selector<PriorityLevel>;

impl<T> Selector<T> {
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

impl<T: PartialEq> Selector<T> {
    fn accepts(&self, value: &T) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == value,
        }
    }
}

impl<T> FromStr for Selector<T>
where
    T: FromStr<Err = String>,
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else {
            s.parse().map(Self::Only)
        }
    }
}

pub fn filter_by_status(list: &[Interview], status: &StatusFilter) -> Vec<Interview> {
    list.iter()
        .filter(|i| status.accepts(&i.status))
        .cloned()
        .collect()
}

pub fn filter_by_priority(list: &[Interview], priority: &PriorityFilter) -> Vec<Interview> {
    list.iter()
        .filter(|i| priority.accepts(&i.priority_level))
        .cloned()
        .collect()
}

/// Conjunction of search, status and priority as used by the list screen.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InterviewFilter {
    pub search: String,
    pub status: StatusFilter,
    pub priority: PriorityFilter,
}

impl InterviewFilter {
    pub fn apply(&self, list: &[Interview]) -> Vec<Interview> {
        let searched = filter_by_search(list, &self.search);
        let by_status = filter_by_status(&searched, &self.status);
        filter_by_priority(&by_status, &self.priority)
    }
}

/// Dashboard projection: stats over the whole list plus the pending queue.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DashboardView {
    pub stats: InterviewStats,
    pub pending: Vec<Interview>,
}

/// Stats ignore `search`; it narrows the pending list only.
pub fn dashboard(list: &[Interview], search: &str) -> DashboardView {
    DashboardView {
        stats: compute_stats(list),
        pending: filter_by_search(&select_pending(list), search),
    }
}
