use crate::domain::events::{BookBorrowed, BookReturned};
use async_trait::async_trait;

use super::Result;

/// 貸出コミットの結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorrowOutcome {
    /// 在庫の減算と貸出記録の作成が確定した
    Committed,
    /// 条件付き減算が0行に一致した（在庫0）
    StockExhausted,
    /// 書籍が存在しない（検証後に削除された）
    BookMissing,
    /// 利用者が存在しない（検証後に削除された）
    BorrowerMissing,
}

/// 返却コミットの結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnOutcome {
    /// 貸出記録をクローズした。書籍が削除済みの場合`stock_restored`はfalse
    Closed { stock_restored: bool },
    /// 既にクローズ済み（同時返却に負けた）
    AlreadyClosed,
    /// 貸出記録が存在しない
    LoanMissing,
}

/// 貸出・返却の原子的な更新ポート
///
/// 在庫数の増減・貸出記録の作成/クローズ・イベントログへの追記を
/// 1つの単位として確定する。`Committed`/`Closed`以外の結果では
/// いかなる書き込みも残らない。
///
/// 同時実行の安全性はバックエンドの条件付き更新で保証し、
/// プロセス内のロックには依存しない（複数インスタンスで同じストアを共有できる）。
#[async_trait]
pub trait LendingUnitOfWork: Send + Sync {
    /// 在庫を1冊減らし、貸出記録を作成する
    async fn commit_borrow(&self, event: &BookBorrowed) -> Result<BorrowOutcome>;

    /// 貸出記録をクローズし、在庫を1冊戻す
    async fn commit_return(&self, event: &BookReturned) -> Result<ReturnOutcome>;
}
