//! Progress and completion aggregation.
//!
//! Progress is never stored. Every call rescans the persisted rows of a
//! dataset, decides per row whether it is labeled, and groups the counts by
//! owning user.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::csv::write_record;
use crate::roles::{Capability, Role};
use crate::row::{Column, Row};
use crate::types::DbId;

/// Datasets completed by this many users are hidden from labelers.
pub const DEFAULT_COMPLETION_HIDE_THRESHOLD: usize = 5;

/// Annotation fields whose presence marks a row as labeled.
///
/// `step` is deliberately absent: picking a step alone does not count.
pub const LABEL_EVIDENCE_COLUMNS: [Column; 6] = [
    Column::Substep,
    Column::IntentOfOptum,
    Column::Flag,
    Column::ConfidenceOfOptum,
    Column::PatientConfidenceScore,
    Column::ReasonForFlag,
];

/// A row is labeled iff any evidence field is non-empty after trimming.
pub fn is_labeled(row: &Row) -> bool {
    LABEL_EVIDENCE_COLUMNS
        .iter()
        .any(|c| !c.get(row).trim().is_empty())
}

/// `round(labeled / total * 100)`, rounding halves up. Zero when `total` is zero.
pub fn percentage(labeled_count: i64, total_rows: i64) -> i64 {
    if total_rows <= 0 {
        return 0;
    }
    (labeled_count as f64 / total_rows as f64 * 100.0).round() as i64
}

/// One user's progress on one dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProgress {
    pub user_id: DbId,
    pub email: String,
    pub labeled_count: i64,
    pub percentage: i64,
    pub is_complete: bool,
}

impl UserProgress {
    pub fn new(user_id: DbId, email: impl Into<String>, labeled_count: i64, total_rows: i64) -> Self {
        Self {
            user_id,
            email: email.into(),
            labeled_count,
            percentage: percentage(labeled_count, total_rows),
            is_complete: labeled_count >= total_rows,
        }
    }
}

/// Progress of every user who owns rows in a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetProgress {
    pub dataset_id: DbId,
    pub total_rows: i64,
    pub completed_users: usize,
    pub users: Vec<UserProgress>,
}

/// A persisted row together with its owner.
#[derive(Debug, Clone, Copy)]
pub struct OwnedRow<'a> {
    pub user_id: DbId,
    pub email: &'a str,
    pub row: &'a Row,
}

/// Group `rows` by owner and compute each user's progress.
///
/// Users are reported in ascending id order. A user who owns rows but has
/// labeled none of them is still listed with a zero count.
pub fn aggregate<'a>(
    dataset_id: DbId,
    total_rows: i64,
    rows: impl IntoIterator<Item = OwnedRow<'a>>,
) -> DatasetProgress {
    let mut per_user: BTreeMap<DbId, (&'a str, i64)> = BTreeMap::new();
    for owned in rows {
        let entry = per_user.entry(owned.user_id).or_insert((owned.email, 0));
        if is_labeled(owned.row) {
            entry.1 += 1;
        }
    }

    let users: Vec<UserProgress> = per_user
        .into_iter()
        .map(|(user_id, (email, count))| UserProgress::new(user_id, email, count, total_rows))
        .collect();
    let completed_users = users.iter().filter(|u| u.is_complete).count();

    DatasetProgress {
        dataset_id,
        total_rows,
        completed_users,
        users,
    }
}

/// Whether a dataset appears in `role`'s dataset list.
pub fn dataset_visible(role: Role, completed_users: usize, hide_threshold: usize) -> bool {
    role.can(Capability::SeeCompletedDatasets) || completed_users < hide_threshold
}

/// Header of the administrator's progress report.
pub const PROGRESS_REPORT_HEADER: [&str; 6] = [
    "Dataset Name",
    "User Email",
    "Labeled Rows",
    "Total Rows",
    "Progress %",
    "Status",
];

/// Render a progress report with one line per (dataset, user) pair.
pub fn progress_report_csv<'a>(
    entries: impl IntoIterator<Item = (&'a str, &'a DatasetProgress)>,
) -> String {
    let mut lines = vec![write_record(&PROGRESS_REPORT_HEADER)];
    for (dataset_name, progress) in entries {
        for user in &progress.users {
            let status = if user.is_complete { "Complete" } else { "In Progress" };
            lines.push(write_record(&[
                dataset_name.to_string(),
                user.email.clone(),
                user.labeled_count.to_string(),
                progress.total_rows.to_string(),
                format!("{}%", user.percentage),
                status.to_string(),
            ]));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flagged(flag: &str) -> Row {
        Row {
            flag: flag.to_string(),
            ..Row::default()
        }
    }

    #[test]
    fn labeled_requires_a_non_blank_evidence_field() {
        assert!(!is_labeled(&Row::default()));
        assert!(!is_labeled(&flagged("   ")));
        assert!(is_labeled(&flagged("GREEN")));

        let step_only = Row {
            step: "Step 3".into(),
            ..Row::default()
        };
        assert!(!is_labeled(&step_only));

        let reason_only = Row {
            reason_for_flag: "out of protocol".into(),
            ..Row::default()
        };
        assert!(is_labeled(&reason_only));
    }

    #[test]
    fn percentage_rounds_and_guards_zero() {
        assert_eq!(percentage(40, 100), 40);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(5, 0), 0);
        assert_eq!(percentage(3, 3), 100);
    }

    #[test]
    fn forty_of_hundred_is_not_complete() {
        let labeled = flagged("RED");
        let blank = Row::default();
        let mut rows = Vec::new();
        for i in 0..100 {
            rows.push(OwnedRow {
                user_id: 7,
                email: "a@example.com",
                row: if i < 40 { &labeled } else { &blank },
            });
        }

        let progress = aggregate(1, 100, rows);
        assert_eq!(progress.users.len(), 1);
        let user = &progress.users[0];
        assert_eq!(user.labeled_count, 40);
        assert_eq!(user.percentage, 40);
        assert!(!user.is_complete);
        assert_eq!(progress.completed_users, 0);
    }

    #[test]
    fn groups_by_user_and_counts_completions() {
        let labeled = flagged("GREEN");
        let blank = Row::default();
        let rows = vec![
            OwnedRow { user_id: 2, email: "b@x.io", row: &labeled },
            OwnedRow { user_id: 1, email: "a@x.io", row: &labeled },
            OwnedRow { user_id: 2, email: "b@x.io", row: &labeled },
            OwnedRow { user_id: 1, email: "a@x.io", row: &blank },
            OwnedRow { user_id: 3, email: "c@x.io", row: &blank },
        ];

        let progress = aggregate(9, 2, rows);
        let ids: Vec<DbId> = progress.users.iter().map(|u| u.user_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(progress.users[0].labeled_count, 1);
        assert_eq!(progress.users[0].percentage, 50);
        assert!(progress.users[1].is_complete);
        assert_eq!(progress.users[2].labeled_count, 0);
        assert_eq!(progress.completed_users, 1);
    }

    #[test]
    fn completed_datasets_hidden_from_labelers_only() {
        assert!(dataset_visible(Role::Labeler, 4, 5));
        assert!(!dataset_visible(Role::Labeler, 5, 5));
        assert!(dataset_visible(Role::Admin, 12, 5));
    }

    #[test]
    fn report_has_one_line_per_user() {
        let progress = DatasetProgress {
            dataset_id: 1,
            total_rows: 10,
            completed_users: 1,
            users: vec![
                UserProgress::new(1, "a@x.io", 10, 10),
                UserProgress::new(2, "b@x.io", 4, 10),
            ],
        };
        let csv = progress_report_csv([("Batch A, clinic 2", &progress)]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Dataset Name,User Email,Labeled Rows,Total Rows,Progress %,Status");
        assert_eq!(lines[1], "\"Batch A, clinic 2\",a@x.io,10,10,100%,Complete");
        assert_eq!(lines[2], "\"Batch A, clinic 2\",b@x.io,4,10,40%,In Progress");
    }
}
