use serde::{Deserialize, Serialize};

use super::errors::{check_max_len, require_text};
use super::{BookId, Quantity, QuantityError, ValidationError};

pub const TITLE_MAX_LEN: usize = 200;
pub const AUTHOR_MAX_LEN: usize = 150;
pub const ISBN_MAX_LEN: usize = 50;
pub const GENRE_MAX_LEN: usize = 100;

/// 書籍（カタログの1エントリ）
///
/// `quantity`は現在貸出可能な冊数。貸出エンジンが変更するのはこの項目のみ。
/// `version`は楽観ロック用のトークンで、行への書き込みごとに増える。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub genre: String,
    pub quantity: Quantity,
    pub version: i64,
}

/// 一覧表示用の書籍要約
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSummary {
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    pub isbn: String,
}

impl From<&Book> for BookSummary {
    fn from(book: &Book) -> Self {
        Self {
            book_id: book.book_id,
            title: book.title.clone(),
            author: book.author.clone(),
            isbn: book.isbn.clone(),
        }
    }
}

/// 書籍登録の入力
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub isbn: String,
    #[serde(default)]
    pub genre: String,
    pub quantity: i64,
}

/// 書籍更新の入力
///
/// ISBNは変更不可のため含まない。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BookChanges {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub genre: String,
    pub quantity: i64,
}

/// 書籍検索条件
///
/// 空白のみの条件は無視される。すべての条件はANDで結合する。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BookFilter {
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<String>,
}

impl BookFilter {
    /// 書籍が検索条件に一致するか（大文字小文字を区別しない部分一致）
    pub fn matches(&self, book: &Book) -> bool {
        contains_ignore_case(&book.title, self.title.as_deref())
            && contains_ignore_case(&book.author, self.author.as_deref())
            && contains_ignore_case(&book.genre, self.genre.as_deref())
    }
}

fn contains_ignore_case(haystack: &str, needle: Option<&str>) -> bool {
    match needle.map(str::trim) {
        None | Some("") => true,
        Some(needle) => haystack.to_lowercase().contains(&needle.to_lowercase()),
    }
}

/// 在庫数は0以上、`Quantity::MAX`以下
fn validate_quantity(errors: &mut ValidationError, quantity: i64) -> Quantity {
    match Quantity::try_from(quantity) {
        Ok(quantity) => quantity,
        Err(QuantityError::TooLarge(_)) => {
            errors.push(
                "quantity",
                format!("quantity is too large (maximum {})", Quantity::MAX.value()),
            );
            Quantity::ZERO
        }
        Err(_) => {
            errors.push("quantity", "quantity cannot be negative");
            Quantity::ZERO
        }
    }
}

/// 純粋関数：書籍を作成する
///
/// 入力を検証し、version 0の新しい書籍を返す。
/// ISBNの重複確認はストア側の責務。
pub fn create_book(input: NewBook) -> Result<Book, ValidationError> {
    let mut errors = ValidationError::new();
    require_text(&mut errors, "title", &input.title, TITLE_MAX_LEN);
    require_text(&mut errors, "author", &input.author, AUTHOR_MAX_LEN);
    require_text(&mut errors, "isbn", &input.isbn, ISBN_MAX_LEN);
    check_max_len(&mut errors, "genre", &input.genre, GENRE_MAX_LEN);
    let quantity = validate_quantity(&mut errors, input.quantity);
    errors.into_result()?;

    Ok(Book {
        book_id: BookId::new(),
        title: input.title.trim().to_string(),
        author: input.author.trim().to_string(),
        isbn: input.isbn.trim().to_string(),
        genre: input.genre.trim().to_string(),
        quantity,
        version: 0,
    })
}

/// 純粋関数：書籍の変更を適用する
///
/// 変更可能な項目はtitle, author, genre, quantityのみ。
/// versionは読み込んだ時点の値を保持し、ストアの楽観ロックに使われる。
pub fn apply_book_changes(book: &Book, changes: BookChanges) -> Result<Book, ValidationError> {
    let mut errors = ValidationError::new();
    require_text(&mut errors, "title", &changes.title, TITLE_MAX_LEN);
    require_text(&mut errors, "author", &changes.author, AUTHOR_MAX_LEN);
    check_max_len(&mut errors, "genre", &changes.genre, GENRE_MAX_LEN);
    let quantity = validate_quantity(&mut errors, changes.quantity);
    errors.into_result()?;

    Ok(Book {
        title: changes.title.trim().to_string(),
        author: changes.author.trim().to_string(),
        genre: changes.genre.trim().to_string(),
        quantity,
        ..book.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_book() -> NewBook {
        NewBook {
            title: "The Rust Programming Language".to_string(),
            author: "Steve Klabnik".to_string(),
            isbn: "978-1718503106".to_string(),
            genre: "Programming".to_string(),
            quantity: 3,
        }
    }

    #[test]
    fn test_create_book_success() {
        let book = create_book(new_book()).unwrap();
        assert_eq!(book.quantity.value(), 3);
        assert_eq!(book.version, 0);
        assert_eq!(book.isbn, "978-1718503106");
    }

    #[test]
    fn test_create_book_collects_all_errors() {
        let input = NewBook {
            title: "   ".to_string(),
            author: String::new(),
            isbn: "x".repeat(ISBN_MAX_LEN + 1),
            genre: String::new(),
            quantity: -1,
        };

        let err = create_book(input).unwrap_err();
        assert!(err.has_field("title"));
        assert!(err.has_field("author"));
        assert!(err.has_field("isbn"));
        assert!(err.has_field("quantity"));
        assert!(!err.has_field("genre"));
    }

    #[test]
    fn test_create_book_rejects_quantity_above_maximum() {
        let input = NewBook {
            quantity: i64::from(i32::MAX) + 1,
            ..new_book()
        };

        let err = create_book(input).unwrap_err();
        assert!(err.has_field("quantity"));
        assert!(
            err.errors()
                .iter()
                .any(|e| e.field == "quantity" && e.message.contains("too large"))
        );

        let input = NewBook {
            quantity: i64::from(i32::MAX),
            ..new_book()
        };
        assert_eq!(create_book(input).unwrap().quantity, Quantity::MAX);
    }

    #[test]
    fn test_apply_book_changes_rejects_quantity_above_maximum() {
        let book = create_book(new_book()).unwrap();
        let changes = BookChanges {
            title: book.title.clone(),
            author: book.author.clone(),
            genre: book.genre.clone(),
            quantity: 3_000_000_000,
        };

        let err = apply_book_changes(&book, changes).unwrap_err();
        assert!(err.has_field("quantity"));
    }

    #[test]
    fn test_apply_book_changes_keeps_isbn_and_version() {
        let mut book = create_book(new_book()).unwrap();
        book.version = 4;

        let updated = apply_book_changes(
            &book,
            BookChanges {
                title: "Rust Book".to_string(),
                author: "Carol Nichols".to_string(),
                genre: String::new(),
                quantity: 10,
            },
        )
        .unwrap();

        assert_eq!(updated.book_id, book.book_id);
        assert_eq!(updated.isbn, book.isbn);
        assert_eq!(updated.version, 4);
        assert_eq!(updated.quantity.value(), 10);
        assert_eq!(updated.title, "Rust Book");
    }

    #[test]
    fn test_book_filter_matches_case_insensitively() {
        let book = create_book(new_book()).unwrap();

        let filter = BookFilter {
            title: Some("rust".to_string()),
            author: Some("  ".to_string()),
            genre: None,
        };
        assert!(filter.matches(&book));

        let filter = BookFilter {
            genre: Some("fiction".to_string()),
            ..BookFilter::default()
        };
        assert!(!filter.matches(&book));
    }
}
