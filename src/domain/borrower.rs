use serde::{Deserialize, Serialize};

use super::errors::{check_max_len, require_text};
use super::{BorrowerId, ValidationError};

pub const NAME_MAX_LEN: usize = 120;
pub const MEMBERSHIP_ID_MAX_LEN: usize = 50;
pub const EMAIL_MAX_LEN: usize = 254;

/// 登録利用者
///
/// 貸出エンジンからは読み取り専用。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Borrower {
    pub borrower_id: BorrowerId,
    pub name: String,
    pub email: String,
    pub membership_id: String,
    pub contact_number: String,
}

/// 一覧表示用の利用者要約
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowerSummary {
    pub borrower_id: BorrowerId,
    pub name: String,
    pub membership_id: String,
}

impl From<&Borrower> for BorrowerSummary {
    fn from(borrower: &Borrower) -> Self {
        Self {
            borrower_id: borrower.borrower_id,
            name: borrower.name.clone(),
            membership_id: borrower.membership_id.clone(),
        }
    }
}

/// 利用者登録・更新の入力
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BorrowerDetails {
    pub name: String,
    pub email: String,
    pub membership_id: String,
    #[serde(default)]
    pub contact_number: String,
}

/// メールアドレスの形式チェック（local@domain.tld）
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && tld.len() >= 2,
        None => false,
    }
}

/// 電話番号の形式チェック
///
/// 先頭の`+`、空白・ハイフン・括弧の区切りを許容し、数字は7〜20桁。
fn is_valid_phone(number: &str) -> bool {
    let body = number.strip_prefix('+').unwrap_or(number);
    if !body
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')'))
    {
        return false;
    }
    let digits = body.chars().filter(char::is_ascii_digit).count();
    (7..=20).contains(&digits)
}

fn validate_details(details: &BorrowerDetails) -> Result<(), ValidationError> {
    let mut errors = ValidationError::new();
    require_text(&mut errors, "name", &details.name, NAME_MAX_LEN);
    require_text(&mut errors, "email", &details.email, EMAIL_MAX_LEN);
    if !details.email.trim().is_empty() && !is_valid_email(details.email.trim()) {
        errors.push("email", "email is not a valid address");
    }
    require_text(
        &mut errors,
        "membership_id",
        &details.membership_id,
        MEMBERSHIP_ID_MAX_LEN,
    );
    let contact = details.contact_number.trim();
    if !contact.is_empty() {
        check_max_len(&mut errors, "contact_number", contact, 32);
        if !is_valid_phone(contact) {
            errors.push("contact_number", "contact_number is not a valid phone number");
        }
    }
    errors.into_result()
}

/// 純粋関数：利用者を登録する
pub fn register_borrower(details: BorrowerDetails) -> Result<Borrower, ValidationError> {
    validate_details(&details)?;

    Ok(Borrower {
        borrower_id: BorrowerId::new(),
        name: details.name.trim().to_string(),
        email: details.email.trim().to_string(),
        membership_id: details.membership_id.trim().to_string(),
        contact_number: details.contact_number.trim().to_string(),
    })
}

/// 純粋関数：利用者情報の変更を適用する
pub fn apply_borrower_changes(
    borrower: &Borrower,
    details: BorrowerDetails,
) -> Result<Borrower, ValidationError> {
    validate_details(&details)?;

    Ok(Borrower {
        borrower_id: borrower.borrower_id,
        name: details.name.trim().to_string(),
        email: details.email.trim().to_string(),
        membership_id: details.membership_id.trim().to_string(),
        contact_number: details.contact_number.trim().to_string(),
    })
}
