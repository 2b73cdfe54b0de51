use crate::application::ServiceDependencies;
use crate::domain::book::{self, Book, BookChanges, BookFilter, NewBook};
use crate::domain::value_objects::BookId;
use crate::ports::StorageError;

use super::errors::{CatalogError, Result};

const ISBN_CONSTRAINT: &str = "books_isbn_key";

pub async fn list_books(deps: &ServiceDependencies) -> Result<Vec<Book>> {
    Ok(deps.catalog_store.list_all().await?)
}

pub async fn get_book(deps: &ServiceDependencies, book_id: BookId) -> Result<Book> {
    deps.catalog_store
        .get_by_id(book_id)
        .await?
        .ok_or(CatalogError::BookNotFound(book_id))
}

/// 空白のみの条件は無視される
pub async fn search_books(deps: &ServiceDependencies, filter: &BookFilter) -> Result<Vec<Book>> {
    Ok(deps.catalog_store.search(filter).await?)
}

/// 書籍を登録する
///
/// ISBNの重複は事前確認に加え、同時登録の場合は一意制約違反から検出する。
pub async fn add_book(deps: &ServiceDependencies, input: NewBook) -> Result<Book> {
    let new_book = book::create_book(input)?;

    if deps
        .catalog_store
        .get_by_isbn(&new_book.isbn)
        .await?
        .is_some()
    {
        return Err(CatalogError::DuplicateIsbn(new_book.isbn));
    }

    match deps.catalog_store.insert(new_book.clone()).await {
        Ok(()) => {}
        Err(StorageError::UniqueViolation { constraint }) if constraint == ISBN_CONSTRAINT => {
            return Err(CatalogError::DuplicateIsbn(new_book.isbn));
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(book_id = %new_book.book_id, isbn = %new_book.isbn, "book added");
    Ok(new_book)
}

/// 書籍を更新する
///
/// ISBNは変更不可。`expected_version`が指定された場合、読み取り時点の
/// versionと一致しなければConflictとする。書き込み自体もversionで条件付けされる。
pub async fn update_book(
    deps: &ServiceDependencies,
    book_id: BookId,
    changes: BookChanges,
    expected_version: Option<i64>,
) -> Result<Book> {
    let current = get_book(deps, book_id).await?;

    if let Some(expected) = expected_version {
        if expected != current.version {
            return Err(CatalogError::Conflict(format!(
                "book {} is at version {}, expected {}",
                book_id, current.version, expected
            )));
        }
    }

    let updated = book::apply_book_changes(&current, changes)?;

    let saved = deps
        .catalog_store
        .update(updated)
        .await?
        .ok_or(CatalogError::BookNotFound(book_id))?;

    tracing::info!(book_id = %book_id, version = saved.version, "book updated");
    Ok(saved)
}

/// 書籍を削除する
///
/// 貸出中の書籍も削除できる。貸出記録はIDを保持したまま残る。
pub async fn delete_book(deps: &ServiceDependencies, book_id: BookId) -> Result<()> {
    if !deps.catalog_store.delete(book_id).await? {
        return Err(CatalogError::BookNotFound(book_id));
    }

    tracing::info!(book_id = %book_id, "book deleted");
    Ok(())
}
