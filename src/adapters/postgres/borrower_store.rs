use crate::domain::borrower::Borrower;
use crate::domain::value_objects::BorrowerId;
use crate::ports::borrower_store::BorrowerStore as BorrowerStoreTrait;
use crate::ports::Result;
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

use super::errors::map_sqlx_error;

const BORROWER_COLUMNS: &str = "borrower_id, name, email, membership_id, contact_number";

pub(crate) fn map_row_to_borrower(row: &PgRow) -> Result<Borrower> {
    Ok(Borrower {
        borrower_id: BorrowerId::from_uuid(row.try_get("borrower_id").map_err(map_sqlx_error)?),
        name: row.try_get("name").map_err(map_sqlx_error)?,
        email: row.try_get("email").map_err(map_sqlx_error)?,
        membership_id: row.try_get("membership_id").map_err(map_sqlx_error)?,
        contact_number: row.try_get("contact_number").map_err(map_sqlx_error)?,
    })
}

/// BorrowerStoreのPostgreSQL実装
pub struct BorrowerStore {
    pool: PgPool,
}

impl BorrowerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BorrowerStoreTrait for BorrowerStore {
    async fn get_by_id(&self, borrower_id: BorrowerId) -> Result<Option<Borrower>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM borrowers WHERE borrower_id = $1",
            BORROWER_COLUMNS
        ))
        .bind(borrower_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(map_row_to_borrower).transpose()
    }

    async fn get_by_membership_id(&self, membership_id: &str) -> Result<Option<Borrower>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM borrowers WHERE membership_id = $1",
            BORROWER_COLUMNS
        ))
        .bind(membership_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(map_row_to_borrower).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Borrower>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM borrowers ORDER BY name ASC, membership_id ASC",
            BORROWER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(map_row_to_borrower).collect()
    }

    async fn insert(&self, borrower: Borrower) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO borrowers (borrower_id, name, email, membership_id, contact_number)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(borrower.borrower_id.value())
        .bind(&borrower.name)
        .bind(&borrower.email)
        .bind(&borrower.membership_id)
        .bind(&borrower.contact_number)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn update(&self, borrower: Borrower) -> Result<Option<Borrower>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE borrowers
            SET name = $2,
                email = $3,
                membership_id = $4,
                contact_number = $5,
                updated_at = NOW()
            WHERE borrower_id = $1
            RETURNING {}
            "#,
            BORROWER_COLUMNS
        ))
        .bind(borrower.borrower_id.value())
        .bind(&borrower.name)
        .bind(&borrower.email)
        .bind(&borrower.membership_id)
        .bind(&borrower.contact_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(map_row_to_borrower).transpose()
    }

    async fn delete(&self, borrower_id: BorrowerId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM borrowers WHERE borrower_id = $1")
            .bind(borrower_id.value())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
