use crate::application::ServiceDependencies;
use crate::domain::borrower::{self, Borrower, BorrowerDetails};
use crate::domain::value_objects::BorrowerId;
use crate::ports::StorageError;

use super::errors::{CatalogError, Result};

const MEMBERSHIP_CONSTRAINT: &str = "borrowers_membership_id_key";

fn map_write_error(err: StorageError, membership_id: &str) -> CatalogError {
    match err {
        StorageError::UniqueViolation { constraint } if constraint == MEMBERSHIP_CONSTRAINT => {
            CatalogError::DuplicateMembershipId(membership_id.to_string())
        }
        other => other.into(),
    }
}

pub async fn list_borrowers(deps: &ServiceDependencies) -> Result<Vec<Borrower>> {
    Ok(deps.borrower_store.list_all().await?)
}

pub async fn get_borrower(deps: &ServiceDependencies, borrower_id: BorrowerId) -> Result<Borrower> {
    deps.borrower_store
        .get_by_id(borrower_id)
        .await?
        .ok_or(CatalogError::BorrowerNotFound(borrower_id))
}

pub async fn add_borrower(deps: &ServiceDependencies, details: BorrowerDetails) -> Result<Borrower> {
    let new_borrower = borrower::register_borrower(details)?;

    if deps
        .borrower_store
        .get_by_membership_id(&new_borrower.membership_id)
        .await?
        .is_some()
    {
        return Err(CatalogError::DuplicateMembershipId(new_borrower.membership_id));
    }

    deps.borrower_store
        .insert(new_borrower.clone())
        .await
        .map_err(|e| map_write_error(e, &new_borrower.membership_id))?;

    tracing::info!(
        borrower_id = %new_borrower.borrower_id,
        membership_id = %new_borrower.membership_id,
        "borrower registered"
    );
    Ok(new_borrower)
}

/// 利用者情報を更新する
///
/// 会員番号を変更する場合、他の利用者と重複してはならない。
pub async fn update_borrower(
    deps: &ServiceDependencies,
    borrower_id: BorrowerId,
    details: BorrowerDetails,
) -> Result<Borrower> {
    let current = get_borrower(deps, borrower_id).await?;
    let updated = borrower::apply_borrower_changes(&current, details)?;

    if updated.membership_id != current.membership_id {
        let holder = deps
            .borrower_store
            .get_by_membership_id(&updated.membership_id)
            .await?;
        if holder.is_some_and(|other| other.borrower_id != borrower_id) {
            return Err(CatalogError::DuplicateMembershipId(updated.membership_id));
        }
    }

    let membership_id = updated.membership_id.clone();
    let saved = deps
        .borrower_store
        .update(updated)
        .await
        .map_err(|e| map_write_error(e, &membership_id))?
        .ok_or(CatalogError::BorrowerNotFound(borrower_id))?;

    tracing::info!(borrower_id = %borrower_id, "borrower updated");
    Ok(saved)
}

/// 利用者を削除する
///
/// 未返却の貸出がある利用者も削除できる。
pub async fn delete_borrower(deps: &ServiceDependencies, borrower_id: BorrowerId) -> Result<()> {
    if !deps.borrower_store.delete(borrower_id).await? {
        return Err(CatalogError::BorrowerNotFound(borrower_id));
    }

    tracing::info!(borrower_id = %borrower_id, "borrower deleted");
    Ok(())
}
