//! User-state service backed by the game's stored functions.
//!
//! Each [`UserStateService`] operation maps to one stored function:
//!
//! | operation | function |
//! |---|---|
//! | active users | `get_active_users()` |
//! | population | `get_user_population_by_guid(guid)` |
//! | stores | `get_user_stores_by_guid(guid)` |
//! | population delta | `delta_user_population_by_guid(guid, delta)` |
//! | store delta | `delta_user_store_by_store_name_by_guid(guid, store, delta)` |
//! | notification | `send_user_notification_by_guid(guid, payload)` |
//!
//! [`PgUserStateService::submit_action_queue`] runs a whole queue in one
//! transaction.

use rowantree_core::service::{ServiceError, UserStateService};
use rowantree_types::actions::{DELTA_POPULATION, DELTA_STORE, SEND_NOTIFICATION};
use rowantree_types::{Action, ActionQueue, StoreSnapshot, StoreType, UserId};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{DbError, command_error};
use crate::postgres::PostgresPool;

/// [`UserStateService`] over a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgUserStateService {
    pool: PgPool,
}

impl PgUserStateService {
    /// Create a service bound to a connection pool.
    pub fn new(pool: &PostgresPool) -> Self {
        Self {
            pool: pool.pool().clone(),
        }
    }

    async fn with_connection(&self, action: &Action) -> Result<(), ServiceError> {
        let mut conn = self.pool.acquire().await.map_err(DbError::from)?;
        execute_action(&mut conn, action).await
    }
}

/// Run one action's stored function on `conn`.
async fn execute_action(conn: &mut PgConnection, action: &Action) -> Result<(), ServiceError> {
    match action {
        Action::DeltaPopulation { user, delta } => {
            sqlx::query("SELECT delta_user_population_by_guid($1, $2)")
                .bind(user.into_inner())
                .bind(*delta)
                .execute(conn)
                .await
                .map_err(|e| command_error(DELTA_POPULATION, e))?;
        }
        Action::DeltaStore { user, store, delta } => {
            sqlx::query("SELECT delta_user_store_by_store_name_by_guid($1, $2, $3)")
                .bind(user.into_inner())
                .bind(store.as_str())
                .bind(*delta)
                .execute(conn)
                .await
                .map_err(|e| command_error(DELTA_STORE, e))?;
        }
        Action::Notify { user, payload } => {
            sqlx::query("SELECT send_user_notification_by_guid($1, $2)")
                .bind(user.into_inner())
                .bind(payload.as_str())
                .execute(conn)
                .await
                .map_err(|e| command_error(SEND_NOTIFICATION, e))?;
        }
    }
    Ok(())
}

/// Collect store rows into a snapshot, skipping names this build does not know.
fn snapshot_from_rows(user: UserId, rows: Vec<(String, i64)>) -> StoreSnapshot {
    let mut snapshot = StoreSnapshot::new();
    for (name, amount) in rows {
        match name.to_ascii_lowercase().parse::<StoreType>() {
            Ok(store) => {
                snapshot.insert(store, amount);
            }
            Err(e) => tracing::warn!(user = %user, store = %name, error = %e, "skipping store row"),
        }
    }
    snapshot
}

impl UserStateService for PgUserStateService {
    async fn active_users(&self) -> Result<Vec<UserId>, ServiceError> {
        let rows: Vec<(Uuid,)> = sqlx::query_as("SELECT user_guid FROM get_active_users()")
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;
        Ok(rows.into_iter().map(|(id,)| UserId::from(id)).collect())
    }

    async fn user_population(&self, user: UserId) -> Result<i64, ServiceError> {
        let population: Option<i64> =
            sqlx::query_scalar("SELECT get_user_population_by_guid($1)::BIGINT")
                .bind(user.into_inner())
                .fetch_one(&self.pool)
                .await
                .map_err(DbError::from)?;
        population.ok_or(ServiceError::UnknownUser(user))
    }

    async fn user_stores(&self, user: UserId) -> Result<StoreSnapshot, ServiceError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT store_name, amount::BIGINT FROM get_user_stores_by_guid($1)")
                .bind(user.into_inner())
                .fetch_all(&self.pool)
                .await
                .map_err(DbError::from)?;
        Ok(snapshot_from_rows(user, rows))
    }

    async fn delta_population(&self, user: UserId, delta: i64) -> Result<(), ServiceError> {
        self.with_connection(&Action::DeltaPopulation { user, delta })
            .await
    }

    async fn delta_store(
        &self,
        user: UserId,
        store: StoreType,
        delta: i64,
    ) -> Result<(), ServiceError> {
        self.with_connection(&Action::DeltaStore { user, store, delta })
            .await
    }

    async fn notify(&self, user: UserId, payload: &str) -> Result<(), ServiceError> {
        self.with_connection(&Action::Notify {
            user,
            payload: payload.to_owned(),
        })
        .await
    }

    async fn submit_action_queue(&self, queue: &ActionQueue) -> Result<(), ServiceError> {
        if queue.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;
        for action in queue {
            execute_action(&mut tx, action).await?;
        }
        tx.commit().await.map_err(DbError::from)?;

        tracing::debug!(actions = queue.len(), "Applied action queue");
        Ok(())
    }
}
