use serde::Serialize;

use super::QuantityError;

/// 貸出のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BorrowBookError {
    /// 在庫なし（quantity = 0）
    Unavailable,
}

impl From<QuantityError> for BorrowBookError {
    fn from(_: QuantityError) -> Self {
        BorrowBookError::Unavailable
    }
}

/// 返却のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnBookError {
    /// 既に返却済み
    AlreadyReturned,
}

/// 入力項目1件分の検証エラー
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// レコード検証エラー
///
/// 書籍・利用者の登録/更新時に、違反したすべての項目をまとめて返す。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct ValidationError {
    errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// エラーがなければ`Ok(())`を返す
    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationError {}

/// 必須の文字列項目を検証する
pub(crate) fn require_text(
    errors: &mut ValidationError,
    field: &'static str,
    value: &str,
    max_len: usize,
) {
    if value.trim().is_empty() {
        errors.push(field, format!("{} is required", field));
    } else {
        check_max_len(errors, field, value, max_len);
    }
}

/// 文字数の上限を検証する
pub(crate) fn check_max_len(
    errors: &mut ValidationError,
    field: &'static str,
    value: &str,
    max_len: usize,
) {
    if value.chars().count() > max_len {
        errors.push(
            field,
            format!("{} must be at most {} characters", field, max_len),
        );
    }
}
