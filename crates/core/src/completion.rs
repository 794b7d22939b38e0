//! Completion metrics derived from the progress ledger.
//!
//! Everything here is a pure function over already-loaded rows. Counts are
//! taken over entries whose resource belongs to the pathway, whatever pathway
//! the entry was last recorded under, because the ledger keeps a single row
//! per (user, resource).

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::model::{Pathway, ProgressEntry, ProgressStatus, ResourceId, UserId};

/// Percentage of `completed` over `total`, rounded half up.
///
/// The denominator is floored at 1, so an empty pathway reports 0 rather
/// than dividing by zero.
#[must_use]
pub fn completion_percentage(completed: u32, total: u32) -> u8 {
    let total = u64::from(total.max(1));
    let completed = u64::from(completed).min(total);
    let pct = (200 * completed + total) / (2 * total);
    // completed <= total keeps this within 0..=100
    u8::try_from(pct).unwrap_or(100)
}

/// Counts for one user on one pathway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    pub completed_count: u32,
    pub in_progress_count: u32,
    pub total_count: u32,
    pub percentage: u8,
}

impl Completion {
    #[must_use]
    pub fn standing(&self) -> Standing {
        Standing::classify(self.completed_count, self.total_count)
    }
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Completion of `pathway` for a single user given that user's entries.
#[must_use]
pub fn completion_for(pathway: &Pathway, user_entries: &[ProgressEntry]) -> Completion {
    let members: HashSet<ResourceId> = pathway.resource_ids().iter().copied().collect();
    let relevant = user_entries
        .iter()
        .filter(|e| members.contains(&e.resource_id));

    let (mut completed, mut in_progress) = (0usize, 0usize);
    for entry in relevant {
        match entry.status {
            ProgressStatus::Completed => completed += 1,
            ProgressStatus::InProgress => in_progress += 1,
            ProgressStatus::NotStarted => {}
        }
    }

    let total = count(pathway.resource_ids().len());
    let completed = count(completed);
    Completion {
        completed_count: completed,
        in_progress_count: count(in_progress),
        total_count: total,
        percentage: completion_percentage(completed, total),
    }
}

/// Cohort classification shown on admin dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Standing {
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Certified")]
    Certified,
}

impl Standing {
    #[must_use]
    pub fn classify(completed: u32, total: u32) -> Self {
        if completed == 0 {
            Standing::NotStarted
        } else if total > 0 && completed >= total {
            Standing::Certified
        } else {
            Standing::InProgress
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Standing::NotStarted => "Not Started",
            Standing::InProgress => "In Progress",
            Standing::Certified => "Certified",
        }
    }
}

/// One line of a pathway roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterRow {
    pub user_id: UserId,
    #[serde(flatten)]
    pub completion: Completion,
    pub standing: Standing,
}

/// Builds the roster for `pathway`.
///
/// `pathway_entries` are the entries whose pathway field is this pathway and
/// decide who appears, in order of first appearance. `resource_entries` are
/// all entries on the pathway's resources and supply the counts. Users with
/// no entry under the pathway are absent.
#[must_use]
pub fn roster(
    pathway: &Pathway,
    pathway_entries: &[ProgressEntry],
    resource_entries: &[ProgressEntry],
) -> Vec<RosterRow> {
    let mut order: Vec<UserId> = Vec::new();
    let mut seen = HashSet::new();
    let mut sorted: Vec<&ProgressEntry> = pathway_entries
        .iter()
        .filter(|e| e.pathway_id == pathway.id)
        .collect();
    sorted.sort_by_key(|e| e.id);
    for entry in sorted {
        if seen.insert(entry.user_id) {
            order.push(entry.user_id);
        }
    }

    let mut by_user: HashMap<UserId, Vec<ProgressEntry>> = HashMap::new();
    for entry in resource_entries.iter().chain(pathway_entries) {
        let bucket = by_user.entry(entry.user_id).or_default();
        if !bucket.iter().any(|e| e.id == entry.id) {
            bucket.push(entry.clone());
        }
    }

    order
        .into_iter()
        .map(|user_id| {
            let entries = by_user.get(&user_id).map_or(&[][..], Vec::as_slice);
            let completion = completion_for(pathway, entries);
            RosterRow {
                user_id,
                completion,
                standing: completion.standing(),
            }
        })
        .collect()
}

/// Orders roster rows by completed count, highest first. Ties keep their
/// roster order.
pub fn rank_by_completed(rows: &mut [RosterRow]) {
    rows.sort_by(|a, b| {
        b.completion
            .completed_count
            .cmp(&a.completion.completed_count)
    });
}

/// Pathways a user has touched, in order of their first entry.
#[must_use]
pub fn pathways_touched(user_entries: &[ProgressEntry]) -> Vec<crate::model::PathwayId> {
    let mut sorted: Vec<&ProgressEntry> = user_entries.iter().collect();
    sorted.sort_by_key(|e| e.id);
    let mut seen = HashSet::new();
    sorted
        .into_iter()
        .map(|e| e.pathway_id)
        .filter(|id| seen.insert(*id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, PathwayFields, PathwayId, ProgressId};
    use crate::time::fixed_now;

    fn pathway(id: u64, resources: &[u64]) -> Pathway {
        Pathway {
            id: PathwayId::new(id),
            fields: PathwayFields {
                title: format!("P{id}"),
                description: None,
                category: Category::DataScience,
                resource_ids: resources.iter().copied().map(ResourceId::new).collect(),
            },
            created_by: UserId::new(1),
            created_at: fixed_now(),
        }
    }

    fn entry(id: u64, user: u64, pathway: u64, resource: u64, status: ProgressStatus) -> ProgressEntry {
        ProgressEntry {
            id: ProgressId::new(id),
            user_id: UserId::new(user),
            pathway_id: PathwayId::new(pathway),
            resource_id: ResourceId::new(resource),
            status,
            completed_at: None,
            notes: None,
            source_platform: None,
            created_at: fixed_now(),
            updated_at: fixed_now(),
        }
    }

    #[test]
    fn percentage_rounds_half_up_and_guards_zero() {
        assert_eq!(completion_percentage(0, 0), 0);
        assert_eq!(completion_percentage(1, 1), 100);
        assert_eq!(completion_percentage(1, 3), 33);
        assert_eq!(completion_percentage(2, 3), 67);
        assert_eq!(completion_percentage(1, 8), 13); // 12.5 -> 13
        assert_eq!(completion_percentage(1, 200), 1); // 0.5 -> 1
    }

    #[test]
    fn percentage_matches_formula_over_a_grid() {
        for n in 1..=40u32 {
            for k in 0..=n {
                let expected = (f64::from(100 * k) / f64::from(n) + 0.5).floor();
                assert_eq!(f64::from(completion_percentage(k, n)), expected, "{k}/{n}");
            }
        }
    }

    #[test]
    fn completion_ignores_resources_outside_pathway() {
        let p = pathway(1, &[10, 11, 12, 13]);
        let entries = vec![
            entry(1, 5, 1, 10, ProgressStatus::Completed),
            entry(2, 5, 1, 11, ProgressStatus::InProgress),
            entry(3, 5, 2, 99, ProgressStatus::Completed),
        ];
        let c = completion_for(&p, &entries);
        assert_eq!(c.completed_count, 1);
        assert_eq!(c.in_progress_count, 1);
        assert_eq!(c.total_count, 4);
        assert_eq!(c.percentage, 25);
        assert_eq!(c.standing(), Standing::InProgress);
    }

    #[test]
    fn shared_resource_counts_under_either_pathway() {
        let p = pathway(1, &[10]);
        let recorded_elsewhere = vec![entry(1, 5, 2, 10, ProgressStatus::Completed)];
        assert_eq!(completion_for(&p, &recorded_elsewhere).percentage, 100);
    }

    #[test]
    fn empty_pathway_is_zero_percent_and_not_certified() {
        let p = pathway(1, &[]);
        let c = completion_for(&p, &[]);
        assert_eq!(c.percentage, 0);
        assert_eq!(c.standing(), Standing::NotStarted);
    }

    #[test]
    fn standing_thresholds() {
        assert_eq!(Standing::classify(0, 3), Standing::NotStarted);
        assert_eq!(Standing::classify(2, 3), Standing::InProgress);
        assert_eq!(Standing::classify(3, 3), Standing::Certified);
        assert_eq!(Standing::Certified.label(), "Certified");
    }

    #[test]
    fn roster_lists_only_users_with_entries_in_first_seen_order() {
        let p = pathway(1, &[10, 11]);
        let entries = vec![
            entry(4, 8, 1, 10, ProgressStatus::InProgress),
            entry(2, 7, 1, 10, ProgressStatus::Completed),
            entry(3, 7, 1, 11, ProgressStatus::Completed),
            entry(5, 9, 1, 11, ProgressStatus::NotStarted),
        ];
        let rows = roster(&p, &entries, &entries);
        let users: Vec<u64> = rows.iter().map(|r| r.user_id.value()).collect();
        assert_eq!(users, vec![7, 8, 9]);
        assert_eq!(rows[0].standing, Standing::Certified);
        assert_eq!(rows[1].standing, Standing::NotStarted);
        assert_eq!(rows[1].completion.in_progress_count, 1);
        assert_eq!(rows[2].standing, Standing::NotStarted);
    }

    #[test]
    fn roster_counts_shared_resources_recorded_under_other_pathway() {
        let p = pathway(1, &[10, 11]);
        let under_p = vec![entry(1, 7, 1, 10, ProgressStatus::Completed)];
        let on_resources = vec![
            entry(1, 7, 1, 10, ProgressStatus::Completed),
            entry(2, 7, 2, 11, ProgressStatus::Completed),
            entry(3, 8, 2, 11, ProgressStatus::Completed),
        ];
        let rows = roster(&p, &under_p, &on_resources);
        assert_eq!(rows.len(), 1, "user 8 never recorded under this pathway");
        assert_eq!(rows[0].completion.completed_count, 2);
        assert_eq!(rows[0].standing, Standing::Certified);
    }

    #[test]
    fn ranking_is_stable_for_ties() {
        let p = pathway(1, &[10, 11]);
        let entries = vec![
            entry(1, 1, 1, 10, ProgressStatus::InProgress),
            entry(2, 2, 1, 10, ProgressStatus::Completed),
            entry(3, 3, 1, 10, ProgressStatus::Completed),
            entry(4, 3, 1, 11, ProgressStatus::Completed),
            entry(5, 4, 1, 11, ProgressStatus::Completed),
        ];
        let mut rows = roster(&p, &entries, &entries);
        rank_by_completed(&mut rows);
        let users: Vec<u64> = rows.iter().map(|r| r.user_id.value()).collect();
        assert_eq!(users, vec![3, 2, 4, 1]);
    }

    #[test]
    fn touched_pathways_follow_first_entry() {
        let entries = vec![
            entry(3, 1, 2, 10, ProgressStatus::Completed),
            entry(1, 1, 5, 11, ProgressStatus::Completed),
            entry(2, 1, 2, 12, ProgressStatus::Completed),
        ];
        let ids: Vec<u64> = pathways_touched(&entries).iter().map(|p| p.value()).collect();
        assert_eq!(ids, vec![5, 2]);
    }
}
