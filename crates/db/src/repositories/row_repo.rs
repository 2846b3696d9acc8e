//! Repository for per-user rows: `dataset_rows` joined with `row_annotations`.

use std::collections::BTreeMap;

use eyelabel_core::row::{Row, ANNOTATION_COLUMNS};
use eyelabel_core::types::DbId;
use sqlx::PgPool;

use crate::models::row::{OwnedRowRecord, RowRecord};

/// Select list producing a [`RowRecord`] from `dataset_rows r` left-joined
/// with `row_annotations a`.
const ROW_COLUMNS: &str = "r.row_index, r.engagement_id, r.timestamp, \
     r.r_sph, r.r_cyl, r.r_axis, r.r_add, r.l_sph, r.l_cyl, r.l_axis, r.l_add, r.pd, \
     r.chart_number, r.occluder_state, r.chart_display, r.speaker, r.utterance_text, \
     COALESCE(a.step, '') AS step, \
     COALESCE(a.substep, '') AS substep, \
     COALESCE(a.intent_of_optum, '') AS intent_of_optum, \
     COALESCE(a.confidence_of_optum, '') AS confidence_of_optum, \
     COALESCE(a.patient_confidence_score, '') AS patient_confidence_score, \
     COALESCE(a.flag, '') AS flag, \
     COALESCE(a.reason_for_flag, '') AS reason_for_flag";

/// SQL form of "this annotation marks its row as labeled", over alias `a`.
///
/// Mirrors `eyelabel_core::progress::is_labeled`: a field counts when it has
/// at least one non-whitespace character. Whitespace-only cells are also
/// stored as empty strings by [`RowRepo::upsert_annotations`].
pub const LABELED_PREDICATE: &str = "(a.substep ~ '[^[:space:]]' \
     OR a.intent_of_optum ~ '[^[:space:]]' \
     OR a.flag ~ '[^[:space:]]' \
     OR a.confidence_of_optum ~ '[^[:space:]]' \
     OR a.patient_confidence_score ~ '[^[:space:]]' \
     OR a.reason_for_flag ~ '[^[:space:]]')";

/// Rows written per bulk upsert statement.
const UPSERT_BATCH_SIZE: usize = 1000;

/// Reads and writes a labeler's copy of dataset rows.
pub struct RowRepo;

impl RowRepo {
    /// Every row of a dataset as `user_id` sees it, in row order.
    pub async fn list_for_user(
        pool: &PgPool,
        dataset_id: DbId,
        user_id: DbId,
    ) -> Result<Vec<RowRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {ROW_COLUMNS}
             FROM dataset_rows r
             LEFT JOIN row_annotations a
               ON a.dataset_id = r.dataset_id AND a.row_index = r.row_index AND a.user_id = $2
             WHERE r.dataset_id = $1
             ORDER BY r.row_index"
        );
        sqlx::query_as::<_, RowRecord>(&query)
            .bind(dataset_id)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// One row as `user_id` sees it.
    pub async fn find_for_user(
        pool: &PgPool,
        dataset_id: DbId,
        user_id: DbId,
        row_index: i32,
    ) -> Result<Option<RowRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {ROW_COLUMNS}
             FROM dataset_rows r
             LEFT JOIN row_annotations a
               ON a.dataset_id = r.dataset_id AND a.row_index = r.row_index AND a.user_id = $2
             WHERE r.dataset_id = $1 AND r.row_index = $3"
        );
        sqlx::query_as::<_, RowRecord>(&query)
            .bind(dataset_id)
            .bind(user_id)
            .bind(row_index)
            .fetch_optional(pool)
            .await
    }

    /// Rows that have an annotation copy, with the owning user.
    ///
    /// `user_id = None` returns every user's copies, ordered by user then row.
    pub async fn list_owned(
        pool: &PgPool,
        dataset_id: DbId,
        user_id: Option<DbId>,
    ) -> Result<Vec<OwnedRowRecord>, sqlx::Error> {
        let query = format!(
            "SELECT a.user_id, u.email AS user_email, {ROW_COLUMNS}
             FROM row_annotations a
             JOIN dataset_rows r ON r.dataset_id = a.dataset_id AND r.row_index = a.row_index
             JOIN users u ON u.id = a.user_id
             WHERE a.dataset_id = $1 AND ($2::BIGINT IS NULL OR a.user_id = $2)
             ORDER BY a.user_id, r.row_index"
        );
        sqlx::query_as::<_, OwnedRowRecord>(&query)
            .bind(dataset_id)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Insert or replace the annotation of one row.
    ///
    /// Returns `false` when the dataset has no row with that index.
    pub async fn upsert_annotation(
        pool: &PgPool,
        dataset_id: DbId,
        user_id: DbId,
        row: &Row,
    ) -> Result<bool, sqlx::Error> {
        Ok(Self::upsert_annotations(pool, dataset_id, user_id, std::slice::from_ref(row)).await? > 0)
    }

    /// Insert or replace the annotations of many rows in one transaction.
    ///
    /// Only annotation fields are written, and whitespace-only cells are
    /// written as empty strings. Indices that do not exist in the dataset are
    /// skipped; when an index repeats, the last occurrence wins.
    /// Returns the number of rows written.
    pub async fn upsert_annotations(
        pool: &PgPool,
        dataset_id: DbId,
        user_id: DbId,
        rows: &[Row],
    ) -> Result<u64, sqlx::Error> {
        let unique: BTreeMap<i32, &Row> = rows.iter().map(|r| (r.id, r)).collect();
        let rows: Vec<&Row> = unique.into_values().collect();

        let names: Vec<&str> = ANNOTATION_COLUMNS.iter().map(|c| c.name()).collect();
        let arrays: Vec<String> = (0..ANNOTATION_COLUMNS.len())
            .map(|i| format!("${}::TEXT[]", i + 4))
            .collect();
        let updates: Vec<String> = names.iter().map(|n| format!("{n} = EXCLUDED.{n}")).collect();
        let query = format!(
            "INSERT INTO row_annotations (dataset_id, user_id, row_index, {names})
             SELECT $1::BIGINT, $2::BIGINT, v.*
             FROM UNNEST($3::INTEGER[], {arrays}) AS v(row_index, {names})
             WHERE EXISTS (
                 SELECT 1 FROM dataset_rows r
                 WHERE r.dataset_id = $1 AND r.row_index = v.row_index
             )
             ON CONFLICT ON CONSTRAINT uq_row_annotations_owner DO UPDATE SET {updates}",
            names = names.join(", "),
            arrays = arrays.join(", "),
            updates = updates.join(", "),
        );

        let mut tx = pool.begin().await?;
        let mut written = 0;
        for batch in rows.chunks(UPSERT_BATCH_SIZE) {
            let indices: Vec<i32> = batch.iter().map(|r| r.id).collect();
            let columns: Vec<Vec<String>> = ANNOTATION_COLUMNS
                .iter()
                .map(|c| batch.iter().map(|r| stored_value(c.get(r))).collect())
                .collect();

            let mut statement = sqlx::query(&query)
                .bind(dataset_id)
                .bind(user_id)
                .bind(&indices);
            for values in &columns {
                statement = statement.bind(values);
            }
            written += statement.execute(&mut *tx).await?.rows_affected();
        }
        tx.commit().await?;

        Ok(written)
    }
}

fn stored_value(cell: &str) -> String {
    if cell.trim().is_empty() {
        String::new()
    } else {
        cell.to_string()
    }
}
