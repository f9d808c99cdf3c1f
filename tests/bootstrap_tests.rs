mod common;

use std::sync::Arc;

use ukasir::errors::TokenResult;
use ukasir::server::bootstrap::{execute_command, Command, DEFAULT_SEED_TOKEN};
use ukasir::server::Database;
use ukasir::token::Device;

use common::{memory_pool, setup_in_memory_db};

/// Store without the token table, as on a first start.
async fn empty_db() -> TokenResult<Arc<Database>> {
    Ok(Arc::new(Database::SQLite(memory_pool().await?)))
}

#[tokio::test]
async fn serve_continues_to_server_without_touching_store() -> TokenResult<()> {
    let db = empty_db().await?;

    assert!(!execute_command(&db, &Command::Serve).await?);
    assert!(
        db.get_token(DEFAULT_SEED_TOKEN).await.is_err(),
        "serve must not create the table"
    );

    Ok(())
}

#[tokio::test]
async fn migrate_creates_table_and_exits() -> TokenResult<()> {
    let db = empty_db().await?;

    assert!(execute_command(&db, &Command::Migrate).await?);
    assert!(db.get_token(DEFAULT_SEED_TOKEN).await?.is_none());

    // Running it again on an existing table is fine.
    assert!(execute_command(&db, &Command::Migrate).await?);

    Ok(())
}

#[tokio::test]
async fn seed_inserts_active_unbound_token() -> TokenResult<()> {
    let db = empty_db().await?;
    let seed = Command::Seed {
        token: DEFAULT_SEED_TOKEN.to_string(),
    };

    assert!(execute_command(&db, &seed).await?);

    let token = db
        .get_token(DEFAULT_SEED_TOKEN)
        .await?
        .expect("seeded token should exist");
    assert!(token.active);
    assert!(!token.is_bound());

    Ok(())
}

#[tokio::test]
async fn seed_keeps_existing_token_and_binding() -> TokenResult<()> {
    let db = setup_in_memory_db().await?;
    db.insert_token("1234-5678-9012-3456", false).await?;
    db.bind_device("1234-5678-9012-3456", &Device::new("D1"))
        .await?;

    let seed = Command::Seed {
        token: "1234-5678-9012-3456".to_string(),
    };
    assert!(execute_command(&db, &seed).await?);

    let token = db
        .get_token("1234-5678-9012-3456")
        .await?
        .expect("token should exist");
    assert!(!token.active, "seed must not reactivate an existing token");
    assert_eq!(token.bound_device_id(), Some("D1"));

    Ok(())
}
