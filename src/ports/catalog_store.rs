use crate::domain::book::{Book, BookFilter};
use crate::domain::value_objects::BookId;
use async_trait::async_trait;

use super::Result;

/// カタログストアポート
///
/// 書籍レコードの永続化のみを担い、ビジネスロジックは持たない。
/// ISBNの一意性はストアで保証し、違反は`StorageError::UniqueViolation`で返す。
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// IDで書籍を取得する
    async fn get_by_id(&self, book_id: BookId) -> Result<Option<Book>>;

    /// ISBNで書籍を取得する
    async fn get_by_isbn(&self, isbn: &str) -> Result<Option<Book>>;

    /// 全書籍をタイトル順に取得する
    async fn list_all(&self) -> Result<Vec<Book>>;

    /// 条件に一致する書籍をタイトル順に取得する
    async fn search(&self, filter: &BookFilter) -> Result<Vec<Book>>;

    /// 書籍を新規登録する
    async fn insert(&self, book: Book) -> Result<()>;

    /// 書籍を更新する（楽観ロック）
    ///
    /// 保存済みのversionが`book.version`と一致する場合のみ書き込み、
    /// versionを1つ進めた書籍を返す。
    /// 一致しない場合は`StorageError::Conflict`、存在しない場合は`None`。
    async fn update(&self, book: Book) -> Result<Option<Book>>;

    /// 書籍を削除する。存在しなかった場合は`false`
    async fn delete(&self, book_id: BookId) -> Result<bool>;
}
