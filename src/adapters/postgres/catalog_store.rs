use crate::domain::book::{Book, BookFilter};
use crate::domain::value_objects::{BookId, Quantity};
use crate::ports::catalog_store::CatalogStore as CatalogStoreTrait;
use crate::ports::{Result, StorageError};
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

use super::errors::map_sqlx_error;

const BOOK_COLUMNS: &str = "book_id, title, author, isbn, genre, quantity, version";

/// PostgreSQLの行データをBookに変換する
///
/// quantityが負の行は不変条件違反としてInvalidDataを返す。
pub(crate) fn map_row_to_book(row: &PgRow) -> Result<Book> {
    let quantity: i32 = row.try_get("quantity").map_err(map_sqlx_error)?;
    let quantity = Quantity::try_from(quantity)
        .map_err(|e| StorageError::InvalidData(format!("books.quantity: {}", e)))?;

    Ok(Book {
        book_id: BookId::from_uuid(row.try_get("book_id").map_err(map_sqlx_error)?),
        title: row.try_get("title").map_err(map_sqlx_error)?,
        author: row.try_get("author").map_err(map_sqlx_error)?,
        isbn: row.try_get("isbn").map_err(map_sqlx_error)?,
        genre: row.try_get("genre").map_err(map_sqlx_error)?,
        quantity,
        version: row.try_get("version").map_err(map_sqlx_error)?,
    })
}

/// ILIKE用に`%`、`_`、`\`をエスケープし、部分一致パターンにする
fn like_pattern(term: Option<&str>) -> Option<String> {
    let term = term.map(str::trim).filter(|t| !t.is_empty())?;
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Some(format!("%{}%", escaped))
}

fn quantity_param(book: &Book) -> Result<i32> {
    i32::try_from(book.quantity.value())
        .map_err(|_| StorageError::InvalidData(format!("quantity too large: {}", book.quantity.value())))
}

/// CatalogStoreのPostgreSQL実装
pub struct CatalogStore {
    pool: PgPool,
}

impl CatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStoreTrait for CatalogStore {
    async fn get_by_id(&self, book_id: BookId) -> Result<Option<Book>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM books WHERE book_id = $1",
            BOOK_COLUMNS
        ))
        .bind(book_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(map_row_to_book).transpose()
    }

    async fn get_by_isbn(&self, isbn: &str) -> Result<Option<Book>> {
        let row = sqlx::query(&format!("SELECT {} FROM books WHERE isbn = $1", BOOK_COLUMNS))
            .bind(isbn)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref().map(map_row_to_book).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Book>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM books ORDER BY title ASC, isbn ASC",
            BOOK_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(map_row_to_book).collect()
    }

    /// 空の条件はNULLとしてバインドし、条件なしとして扱う
    async fn search(&self, filter: &BookFilter) -> Result<Vec<Book>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM books
            WHERE ($1::text IS NULL OR title ILIKE $1)
              AND ($2::text IS NULL OR author ILIKE $2)
              AND ($3::text IS NULL OR genre ILIKE $3)
            ORDER BY title ASC, isbn ASC
            "#,
            BOOK_COLUMNS
        ))
        .bind(like_pattern(filter.title.as_deref()))
        .bind(like_pattern(filter.author.as_deref()))
        .bind(like_pattern(filter.genre.as_deref()))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(map_row_to_book).collect()
    }

    async fn insert(&self, book: Book) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO books (book_id, title, author, isbn, genre, quantity, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(book.book_id.value())
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(&book.genre)
        .bind(quantity_param(&book)?)
        .bind(book.version)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    /// versionが一致する場合のみ更新する（楽観ロック）
    ///
    /// 0行更新の場合、行が存在すれば競合、存在しなければNoneとする。
    async fn update(&self, book: Book) -> Result<Option<Book>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE books
            SET title = $2,
                author = $3,
                genre = $4,
                quantity = $5,
                version = version + 1,
                updated_at = NOW()
            WHERE book_id = $1 AND version = $6
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(book.book_id.value())
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.genre)
        .bind(quantity_param(&book)?)
        .bind(book.version)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if let Some(row) = row {
            return map_row_to_book(&row).map(Some);
        }

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE book_id = $1)")
                .bind(book.book_id.value())
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        if exists {
            Err(StorageError::Conflict(format!(
                "book {} was modified concurrently (expected version {})",
                book.book_id, book.version
            )))
        } else {
            Ok(None)
        }
    }

    async fn delete(&self, book_id: BookId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM books WHERE book_id = $1")
            .bind(book_id.value())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
