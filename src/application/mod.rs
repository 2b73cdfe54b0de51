pub mod catalog;
pub mod lending;

use crate::ports::*;
use std::sync::Arc;

pub use lending::RetryPolicy;

/// サービスの依存関係
///
/// 関数型DDDの原則に従い、データ構造として定義。
/// 振る舞い（メソッド）は持たず、貸出・カタログの各関数に明示的に渡す。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub catalog_store: Arc<dyn CatalogStore>,
    pub borrower_store: Arc<dyn BorrowerStore>,
    pub loan_ledger: Arc<dyn LoanLedger>,
    pub lending_unit: Arc<dyn LendingUnitOfWork>,
    pub retry_policy: RetryPolicy,
}

impl ServiceDependencies {
    /// すべてのポートを1つのストアで実装するアダプター用
    pub fn from_store<S>(store: Arc<S>, retry_policy: RetryPolicy) -> Self
    where
        S: CatalogStore + BorrowerStore + LoanLedger + LendingUnitOfWork + 'static,
    {
        Self {
            catalog_store: store.clone(),
            borrower_store: store.clone(),
            loan_ledger: store.clone(),
            lending_unit: store,
            retry_policy,
        }
    }
}
