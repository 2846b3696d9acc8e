//! Repository for `datasets`, `dataset_uploads` and `dataset_rows`.

use eyelabel_core::row::{Row, SOURCE_COLUMNS};
use eyelabel_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::dataset::{CreateDataset, Dataset, DatasetUpload};

const COLUMNS: &str = "id, name, total_rows, uploaded_by, uploaded_at, created_at, updated_at";

/// Rows written per `INSERT ... UNNEST` statement.
pub const INSERT_BATCH_SIZE: usize = 1000;

/// Datasets and their immutable source rows.
pub struct DatasetRepo;

impl DatasetRepo {
    /// Create a dataset, store its upload and insert every ingested row.
    ///
    /// Runs in one transaction: either the whole dataset exists afterwards
    /// or none of it does.
    pub async fn create_with_rows(
        pool: &PgPool,
        input: &CreateDataset,
        rows: &[Row],
    ) -> Result<Dataset, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO datasets (name, total_rows, uploaded_by)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        let dataset = sqlx::query_as::<_, Dataset>(&query)
            .bind(&input.name)
            .bind(rows.len() as i32)
            .bind(input.uploaded_by)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO dataset_uploads (dataset_id, file_name, content, size_bytes)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(dataset.id)
        .bind(&input.file_name)
        .bind(&input.content)
        .bind(input.content.len() as i64)
        .execute(&mut *tx)
        .await?;

        for batch in rows.chunks(INSERT_BATCH_SIZE) {
            Self::insert_rows_batch(&mut tx, dataset.id, batch).await?;
        }

        tx.commit().await?;
        Ok(dataset)
    }

    async fn insert_rows_batch(
        tx: &mut Transaction<'_, Postgres>,
        dataset_id: DbId,
        rows: &[Row],
    ) -> Result<(), sqlx::Error> {
        let indices: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let columns: Vec<Vec<String>> = SOURCE_COLUMNS
            .iter()
            .map(|c| rows.iter().map(|r| c.get(r).to_string()).collect())
            .collect();

        let names: Vec<&str> = SOURCE_COLUMNS.iter().map(|c| c.name()).collect();
        let arrays: Vec<String> = (0..SOURCE_COLUMNS.len())
            .map(|i| format!("${}::TEXT[]", i + 3))
            .collect();
        let query = format!(
            "INSERT INTO dataset_rows (dataset_id, row_index, {})
             SELECT $1::BIGINT, * FROM UNNEST($2::INTEGER[], {})",
            names.join(", "),
            arrays.join(", ")
        );

        let mut statement = sqlx::query(&query).bind(dataset_id).bind(&indices);
        for values in &columns {
            statement = statement.bind(values);
        }
        statement.execute(&mut **tx).await?;
        Ok(())
    }

    /// Find a dataset by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Dataset>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM datasets WHERE id = $1");
        sqlx::query_as::<_, Dataset>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List every dataset, newest upload first.
    pub async fn list(pool: &PgPool) -> Result<Vec<Dataset>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM datasets ORDER BY uploaded_at DESC, id DESC");
        sqlx::query_as::<_, Dataset>(&query).fetch_all(pool).await
    }

    /// Delete a dataset. Rows, annotations, assignments and the upload go
    /// with it via `ON DELETE CASCADE`.
    ///
    /// Returns `true` if a dataset was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM datasets WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Fetch the original uploaded file.
    pub async fn find_upload(
        pool: &PgPool,
        dataset_id: DbId,
    ) -> Result<Option<DatasetUpload>, sqlx::Error> {
        sqlx::query_as::<_, DatasetUpload>(
            "SELECT dataset_id, file_name, content, size_bytes, created_at
             FROM dataset_uploads WHERE dataset_id = $1",
        )
        .bind(dataset_id)
        .fetch_optional(pool)
        .await
    }
}
