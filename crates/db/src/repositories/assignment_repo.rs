//! Repository for `row_assignments`: which row a labeler is currently on.
//!
//! A user holds at most one assignment per dataset. Assignments expire
//! after a timeout so an abandoned browser tab does not pin a row forever.

use eyelabel_core::types::DbId;
use sqlx::PgPool;

use crate::models::assignment::RowAssignment;
use crate::repositories::row_repo::LABELED_PREDICATE;

const COLUMNS: &str = "id, dataset_id, user_id, row_index, assigned_at, expires_at";

pub struct AssignmentRepo;

impl AssignmentRepo {
    /// The caller's live assignment on a dataset, if any.
    pub async fn find_active(
        pool: &PgPool,
        dataset_id: DbId,
        user_id: DbId,
    ) -> Result<Option<RowAssignment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM row_assignments
             WHERE dataset_id = $1 AND user_id = $2 AND expires_at > NOW()"
        );
        sqlx::query_as::<_, RowAssignment>(&query)
            .bind(dataset_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Assign the next row the user has not labeled yet.
    ///
    /// With `after`, rows with a greater index are preferred and the search
    /// wraps around to the start. Any previous assignment of the user on this
    /// dataset is replaced. Returns `None` when every row is labeled.
    pub async fn assign_next(
        pool: &PgPool,
        dataset_id: DbId,
        user_id: DbId,
        after: Option<i32>,
        timeout_mins: i64,
    ) -> Result<Option<RowAssignment>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let pick = format!(
            "SELECT r.row_index FROM dataset_rows r
             WHERE r.dataset_id = $1
               AND NOT EXISTS (
                   SELECT 1 FROM row_annotations a
                   WHERE a.dataset_id = r.dataset_id
                     AND a.row_index = r.row_index
                     AND a.user_id = $2
                     AND {LABELED_PREDICATE}
               )
             ORDER BY ($3::INTEGER IS NOT NULL AND r.row_index <= $3), r.row_index
             LIMIT 1"
        );
        let next: Option<(i32,)> = sqlx::query_as(&pick)
            .bind(dataset_id)
            .bind(user_id)
            .bind(after)
            .fetch_optional(&mut *tx)
            .await?;

        let Some((row_index,)) = next else {
            sqlx::query("DELETE FROM row_assignments WHERE dataset_id = $1 AND user_id = $2")
                .bind(dataset_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            return Ok(None);
        };

        let upsert = format!(
            "INSERT INTO row_assignments (dataset_id, user_id, row_index, expires_at)
             VALUES ($1, $2, $3, NOW() + make_interval(mins => $4::INTEGER))
             ON CONFLICT ON CONSTRAINT uq_row_assignments_user DO UPDATE SET
                row_index = EXCLUDED.row_index,
                assigned_at = NOW(),
                expires_at = EXCLUDED.expires_at
             RETURNING {COLUMNS}"
        );
        let assignment = sqlx::query_as::<_, RowAssignment>(&upsert)
            .bind(dataset_id)
            .bind(user_id)
            .bind(row_index)
            .bind(timeout_mins as i32)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(assignment))
    }

    /// Drop the user's assignment on `row_index`. Returns `true` if one existed.
    pub async fn release(
        pool: &PgPool,
        dataset_id: DbId,
        user_id: DbId,
        row_index: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM row_assignments
             WHERE dataset_id = $1 AND user_id = $2 AND row_index = $3",
        )
        .bind(dataset_id)
        .bind(user_id)
        .bind(row_index)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete assignments past their expiry. Returns how many were removed.
    pub async fn expire_stale(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM row_assignments WHERE expires_at <= NOW()")
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
