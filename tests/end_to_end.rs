use anyhow::Result;
use secrecy::SecretString;
use silvergym::{
    api::{GymConfig, GymState},
    gym::{ApprovalState, Catalog, Error, Exercise, ExerciseLevel, OperatorCredentials, Principal},
    store::{MemoryStore, Store},
};
use std::sync::Arc;
use time::OffsetDateTime;

fn state() -> GymState {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let config = GymConfig::new(SecretString::from("end-to-end-secret".to_string())).with_operator(
        OperatorCredentials::new("Silver Gym", SecretString::from("silver101".to_string())),
    );
    let catalog = Catalog::new(vec![Exercise::new(
        "E1",
        "Warm-up",
        "Five minutes of light cardio",
        ExerciseLevel::Beginner,
    )]);
    GymState::with_catalog(store, &config, catalog)
}

#[tokio::test]
async fn member_lifecycle_from_signup_to_nightly_reset() -> Result<()> {
    let state = state();
    let now = OffsetDateTime::now_utc();

    let alice = state
        .directory()
        .register("alice", "Alice@Example.com", "pw1")
        .await?;
    assert_eq!(alice.email, "alice@example.com");
    assert_eq!(alice.total_stars, 0);

    assert!(matches!(
        state.gate().login("alice", "pw1").await,
        Err(Error::NotApproved)
    ));

    let admin_token = state.gate().admin_login("Silver Gym", "silver101")?;
    assert!(matches!(
        state.gate().authenticate(&admin_token).await?,
        Principal::Administrator
    ));

    state
        .directory()
        .set_approval(alice.id, ApprovalState::Approved)
        .await?;

    let grant = state.gate().login("alice", "pw1").await?;
    let principal = state.gate().authenticate(&grant.token).await?;
    let member = silvergym::gym::require_user(principal)?;
    assert_eq!(member.id, alice.id);

    assert_eq!(state.ledger().record_completion(alice.id, "E1", now).await?, 1);
    assert_eq!(state.directory().get(alice.id).await?.total_stars, 1);
    assert!(matches!(
        state.ledger().record_completion(alice.id, "E1", now).await,
        Err(Error::AlreadyCompleted)
    ));

    let report = state.scheduler().run_cycle().await;
    assert!(report.is_complete());
    assert_eq!(report.completions_cleared, Some(1));
    assert!(state.ledger().todays_completions(alice.id, now).await?.is_empty());
    assert_eq!(state.directory().get(alice.id).await?.total_stars, 0);

    // A new cycle allows the same exercise again.
    assert_eq!(state.ledger().record_completion(alice.id, "E1", now).await?, 1);
    Ok(())
}

#[tokio::test]
async fn deleting_a_member_drops_lookups_and_completions() -> Result<()> {
    let state = state();
    let now = OffsetDateTime::now_utc();

    let bob = state.directory().register("bob", "bob@example.com", "pw2").await?;
    state
        .directory()
        .set_approval(bob.id, ApprovalState::Approved)
        .await?;
    state.ledger().record_completion(bob.id, "E1", now).await?;

    state.directory().delete(bob.id).await?;
    assert!(matches!(
        state.directory().get(bob.id).await,
        Err(Error::NotFound)
    ));
    assert!(state.ledger().todays_completions(bob.id, now).await?.is_empty());
    assert!(matches!(
        state.gate().login("bob", "pw2").await,
        Err(Error::InvalidCredential)
    ));

    // Deleting twice is not an error.
    state.directory().delete(bob.id).await?;
    Ok(())
}

#[tokio::test]
async fn concurrent_duplicate_completions_record_once() -> Result<()> {
    let state = Arc::new(state());
    let now = OffsetDateTime::now_utc();

    let carol = state
        .directory()
        .register("carol", "carol@example.com", "pw3")
        .await?;
    state
        .directory()
        .set_approval(carol.id, ApprovalState::Approved)
        .await?;

    let carol_id = carol.id;
    let mut tasks = Vec::new();
    for _ in 0..8 {
        let state = Arc::clone(&state);
        tasks.push(tokio::spawn(async move {
            state.ledger().record_completion(carol_id, "E1", now).await
        }));
    }

    let mut recorded = 0;
    let mut duplicates = 0;
    for task in tasks {
        match task.await? {
            Ok(_) => recorded += 1,
            Err(Error::AlreadyCompleted) => duplicates += 1,
            Err(other) => return Err(other.into()),
        }
    }
    assert_eq!(recorded, 1);
    assert_eq!(duplicates, 7);
    assert_eq!(state.directory().get(carol.id).await?.total_stars, 1);
    Ok(())
}
