mod expense_tests;

use crate::core::capabilities::CapabilityDetector;
use crate::core::ledger::SplitPolicy;
use crate::core::models::group::{Group, GroupMember};
use crate::core::models::user::User;
use crate::core::services::{ExpenseDraft, LedgerService};
use crate::infrastructure::logging::in_memory::InMemoryLogging;
use crate::infrastructure::storage::Storage;
use crate::infrastructure::storage::in_memory::InMemoryStorage;
use chrono::Utc;
use rust_decimal::Decimal;

pub const GROUP: &str = "trip";

/// The service plus a handle on its storage for seeding the directory and
/// group membership, which the ledger does not own.
pub fn create_test_service() -> (LedgerService<InMemoryLogging, InMemoryStorage>, InMemoryStorage) {
    create_service_with(InMemoryStorage::new(), true)
}

pub fn create_service_with(
    storage: InMemoryStorage,
    auto_migrate: bool,
) -> (LedgerService<InMemoryLogging, InMemoryStorage>, InMemoryStorage) {
    let _ = env_logger::builder().is_test(true).try_init();
    let service = LedgerService::new(
        storage.clone(),
        InMemoryLogging::new(),
        CapabilityDetector::new(auto_migrate),
    );
    (service, storage)
}

pub async fn seed_group<S: Storage>(storage: &S, group_id: &str, members: &[&str]) {
    for id in members {
        storage
            .save_user(User {
                id: id.to_string(),
                name: format!("User {}", id.to_uppercase()),
                avatar_url: None,
            })
            .await
            .unwrap();
    }
    storage
        .save_group(Group {
            id: group_id.to_string(),
            name: format!("Group {}", group_id),
            members: members
                .iter()
                .map(|id| GroupMember {
                    user_id: id.to_string(),
                    joined_at: Utc::now(),
                })
                .collect(),
        })
        .await
        .unwrap();
}

pub fn equal_draft(payer: &str, amount: Decimal, members: &[&str]) -> ExpenseDraft {
    ExpenseDraft {
        payer_id: payer.to_string(),
        amount,
        category: "food".to_string(),
        description: None,
        split: SplitPolicy::Equal {
            members: members.iter().map(|m| m.to_string()).collect(),
        },
    }
}
