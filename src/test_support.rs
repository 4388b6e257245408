use std::sync::Arc;

use axum::{body::to_bytes, response::Response};
use chrono::Duration;
use serde_json::Value;

use crate::{
    config::Config,
    db::memory::MemoryStore,
    mail::sendmail::testing::RecordingMailer,
    models::usermodel::User,
    service::{background_jobs::JobQueue, storage::testing::MemoryStorage},
    utils::token::{self, TokenType},
    AppState,
};

/// App state over in-memory collaborators, plus the store for seeding.
pub fn test_state_with_store() -> (Arc<AppState>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let (job_queue, receiver) = JobQueue::new();
    // Nothing drains the queue in handler tests; keep it open so enqueue succeeds.
    std::mem::forget(receiver);

    let state = AppState::new(
        Config::for_tests(),
        store.clone(),
        Arc::new(MemoryStorage::default()),
        Arc::new(MemoryStorage::default()),
        Arc::new(RecordingMailer::default()),
        None,
        job_queue,
    );
    (Arc::new(state), store)
}

pub fn test_state() -> Arc<AppState> {
    test_state_with_store().0
}

/// `Bearer <access token>` for `user`, signed with the test secret.
pub fn bearer(user: &User) -> String {
    let token = token::create_token(
        user,
        TokenType::Access,
        Config::for_tests().jwt_secret.as_bytes(),
        Duration::minutes(5),
    )
    .unwrap();
    format!("Bearer {}", token)
}

pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
