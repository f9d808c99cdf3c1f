mod common;

use ukasir::errors::{TokenError, TokenResult};
use ukasir::server::Database;
use ukasir::token::{BindOutcome, Device};

use common::{setup_in_memory_db, SEED_TOKEN, UNKNOWN_TOKEN};

// =============================================================================
// Lookup and provisioning
// =============================================================================

#[tokio::test]
async fn get_token_returns_none_for_unknown_id() -> TokenResult<()> {
    let db = setup_in_memory_db().await?;

    assert!(db.get_token(UNKNOWN_TOKEN).await?.is_none());

    Ok(())
}

#[tokio::test]
async fn inserted_token_is_active_and_unbound() -> TokenResult<()> {
    let db = setup_in_memory_db().await?;

    assert!(db.insert_token(SEED_TOKEN, true).await?);

    let token = db.get_token(SEED_TOKEN).await?.expect("token should exist");
    assert_eq!(token.id, SEED_TOKEN);
    assert!(token.active);
    assert!(!token.is_bound());
    assert!(token.bound_at.is_none());

    Ok(())
}

#[tokio::test]
async fn insert_token_leaves_existing_row_untouched() -> TokenResult<()> {
    let db = setup_in_memory_db().await?;

    assert!(db.insert_token(SEED_TOKEN, true).await?);
    let original = db.get_token(SEED_TOKEN).await?.expect("token should exist");

    assert!(!db.insert_token(SEED_TOKEN, false).await?, "second insert is a no-op");

    let after = db.get_token(SEED_TOKEN).await?.expect("token should exist");
    assert!(after.active, "conflicting insert must not deactivate the token");
    assert_eq!(after.registered_at, original.registered_at);

    Ok(())
}

#[tokio::test]
async fn ensure_schema_is_idempotent() -> TokenResult<()> {
    let db = setup_in_memory_db().await?;
    db.insert_token(SEED_TOKEN, true).await?;

    db.ensure_schema().await?;

    assert!(db.get_token(SEED_TOKEN).await?.is_some());
    assert!(db.ping().await);
    assert_eq!(db.db_type(), "sqlite");

    Ok(())
}

// =============================================================================
// Conditional bind
// =============================================================================

#[tokio::test]
async fn bind_device_sets_full_binding_once() -> TokenResult<()> {
    let db = setup_in_memory_db().await?;
    db.insert_token(SEED_TOKEN, true).await?;

    let device = Device::new("D1").with_name("Kasir Depan").with_type("android");
    assert_eq!(db.bind_device(SEED_TOKEN, &device).await?, BindOutcome::Bound);

    let token = db.get_token(SEED_TOKEN).await?.expect("token should exist");
    assert_eq!(token.device, Some(device));
    assert!(token.bound_at.is_some());

    Ok(())
}

#[tokio::test]
async fn bind_device_same_id_is_already_bound_same() -> TokenResult<()> {
    let db = setup_in_memory_db().await?;
    db.insert_token(SEED_TOKEN, true).await?;

    db.bind_device(SEED_TOKEN, &Device::new("D1").with_name("first"))
        .await?;
    let outcome = db
        .bind_device(SEED_TOKEN, &Device::new("D1").with_name("renamed"))
        .await?;
    assert_eq!(outcome, BindOutcome::AlreadyBoundSame);

    // Descriptive fields are not rewritten by a re-confirmation.
    let token = db.get_token(SEED_TOKEN).await?.expect("token should exist");
    let device = token.device.expect("token should be bound");
    assert_eq!(device.device_name.as_deref(), Some("first"));

    Ok(())
}

#[tokio::test]
async fn bind_device_never_overwrites_other_device() -> TokenResult<()> {
    let db = setup_in_memory_db().await?;
    db.insert_token(SEED_TOKEN, true).await?;

    db.bind_device(SEED_TOKEN, &Device::new("D1")).await?;
    let first_bound_at = db.get_token(SEED_TOKEN).await?.and_then(|t| t.bound_at);

    let outcome = db.bind_device(SEED_TOKEN, &Device::new("D2")).await?;
    assert_eq!(outcome, BindOutcome::AlreadyBoundDifferent);

    let token = db.get_token(SEED_TOKEN).await?.expect("token should exist");
    assert_eq!(token.bound_device_id(), Some("D1"));
    assert_eq!(token.bound_at, first_bound_at);

    Ok(())
}

#[tokio::test]
async fn bind_device_after_out_of_band_clearance_registers() -> TokenResult<()> {
    let pool = common::memory_pool().await?;
    let db = Database::SQLite(pool.clone());
    db.ensure_schema().await?;
    db.insert_token(SEED_TOKEN, true).await?;

    db.bind_device(SEED_TOKEN, &Device::new("D1")).await?;

    // Operators clear a binding directly on the table.
    sqlx::query(
        "UPDATE ukasir_token \
             SET device_id = NULL, device_name = NULL, device_type = NULL, device_bound_at = NULL \
             WHERE token_number = ?",
    )
    .bind(SEED_TOKEN)
    .execute(&pool)
    .await
    .map_err(|e| TokenError::StoreUnavailable(e.to_string()))?;

    let outcome = db.bind_device(SEED_TOKEN, &Device::new("D2")).await?;
    assert_eq!(outcome, BindOutcome::Bound);

    let token = db.get_token(SEED_TOKEN).await?.expect("token should exist");
    assert_eq!(token.bound_device_id(), Some("D2"));

    Ok(())
}

#[tokio::test]
async fn bind_device_on_unknown_token_is_not_found() -> TokenResult<()> {
    let db = setup_in_memory_db().await?;

    let outcome = db.bind_device(UNKNOWN_TOKEN, &Device::new("D1")).await?;
    assert_eq!(outcome, BindOutcome::NotFound);
    assert!(db.get_token(UNKNOWN_TOKEN).await?.is_none(), "bind must not create rows");

    Ok(())
}

#[tokio::test]
async fn bind_device_does_not_consult_active_flag() -> TokenResult<()> {
    let db = setup_in_memory_db().await?;
    db.insert_token(SEED_TOKEN, false).await?;

    assert_eq!(
        db.bind_device(SEED_TOKEN, &Device::new("D1")).await?,
        BindOutcome::Bound
    );

    Ok(())
}

#[tokio::test]
async fn store_errors_surface_as_store_unavailable() -> TokenResult<()> {
    let pool = common::memory_pool().await?;
    let db = Database::SQLite(pool.clone());
    db.ensure_schema().await?;

    pool.close().await;

    let err = db.get_token(SEED_TOKEN).await.unwrap_err();
    assert!(matches!(err, TokenError::StoreUnavailable(_)));
    assert!(!db.ping().await);

    Ok(())
}
