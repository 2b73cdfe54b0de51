use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// 貸出ID - 貸出記録（Loan）の識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoanId(Uuid);

impl LoanId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl Default for LoanId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LoanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// 書籍ID - カタログへの参照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(Uuid);

impl BookId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl Default for BookId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// 利用者ID - 登録利用者への参照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BorrowerId(Uuid);

impl BorrowerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl Default for BorrowerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BorrowerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// 在庫数エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    /// 在庫が0冊のため減らせない
    #[error("quantity is already zero")]
    Exhausted,
    #[error("quantity cannot be negative: {0}")]
    Negative(i64),
    /// 上限（`Quantity::MAX`）を超える値
    #[error("quantity is too large: {0}")]
    TooLarge(i64),
}

/// 貸出可能な在庫数
///
/// 不変条件：在庫数は0以上。
/// u32で表現することで負の在庫を型として作れないようにする。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Quantity(u32);

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);
    /// 在庫数の上限。books.quantityのINTEGER列に収まる範囲
    pub const MAX: Quantity = Quantity(i32::MAX as u32);

    pub fn new(value: u32) -> Self {
        Self(value)
    }

    /// 1冊減らす
    ///
    /// # エラー
    /// 在庫が0の場合は`QuantityError::Exhausted`を返す
    pub fn decrement(self) -> Result<Self, QuantityError> {
        match self.0.checked_sub(1) {
            Some(value) => Ok(Self(value)),
            None => Err(QuantityError::Exhausted),
        }
    }

    /// 1冊増やす
    ///
    /// # エラー
    /// 上限を超える場合は`QuantityError::TooLarge`を返す
    pub fn increment(self) -> Result<Self, QuantityError> {
        match self.0.checked_add(1) {
            Some(value) if value <= Self::MAX.0 => Ok(Self(value)),
            _ => Err(QuantityError::TooLarge(i64::from(self.0) + 1)),
        }
    }

    pub fn is_available(&self) -> bool {
        self.0 > 0
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value < 0 {
            return Err(QuantityError::Negative(value));
        }
        if value > i64::from(Self::MAX.0) {
            return Err(QuantityError::TooLarge(value));
        }
        u32::try_from(value)
            .map(Self)
            .map_err(|_| QuantityError::TooLarge(value))
    }
}

impl TryFrom<i32> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::try_from(i64::from(value))
    }
}

impl From<Quantity> for i64 {
    fn from(quantity: Quantity) -> Self {
        i64::from(quantity.0)
    }
}
