//! Closing a unit-of-work transaction from a step's result.

use foodx_database::UnitOfWork;
use tracing::warn;

use crate::error::FoodxResult;

/// Commits when `result` is `Ok`, rolls back otherwise. A failed rollback is logged and the
/// original error is returned.
pub async fn finish<U: UnitOfWork, T>(uow: &U, result: FoodxResult<T>) -> FoodxResult<T> {
    match result {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = uow.rollback().await {
                warn!(error = %rollback, "Rollback after a failed step also failed");
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FoodxError;
    use chrono::Utc;
    use foodx_database::{InMemoryDatabase, Repository, UnitOfWorkFactory};
    use foodx_models::{Buyer, BuyerInput};

    fn buyer(email: &str) -> Buyer {
        Buyer::new(
            BuyerInput {
                company_name: "Fresh Foods".into(),
                email: email.into(),
                ..Default::default()
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_ok_commits_and_err_rolls_back() {
        let db = InMemoryDatabase::new();
        let uow = db.unit_of_work();

        uow.begin_transaction().await.unwrap();
        let added = uow.buyers().add(buyer("a@fresh.example")).await.map_err(FoodxError::from);
        finish(&uow, added).await.unwrap();

        uow.begin_transaction().await.unwrap();
        let failed = async {
            uow.buyers().add(buyer("b@fresh.example")).await?;
            Err::<(), _>(FoodxError::validation("items", "no items"))
        }
        .await;
        assert!(finish(&uow, failed).await.is_err());

        assert!(!uow.in_transaction().await);
        assert_eq!(db.unit_of_work().buyers().count(None).await.unwrap(), 1);
    }
}
