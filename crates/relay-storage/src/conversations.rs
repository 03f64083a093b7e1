// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the durable conversation store.
//!
//! Each conversation is one row whose `messages` column holds the full
//! message array as JSON, mirroring a document store keyed by id.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use tokio::sync::OnceCell;
use tracing::debug;

use relay_config::model::StorageConfig;
use relay_core::types::{Conversation, ConversationMessage};
use relay_core::{
    AdapterType, ConversationId, ConversationStore, HealthStatus, PluginAdapter, RelayError,
};

use crate::database::{map_tr_err, Database};

/// SQLite-backed conversation store.
///
/// The database is opened lazily by [`SqliteConversationStore::initialize`].
pub struct SqliteConversationStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteConversationStore {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Open the database and run migrations. Fails if called twice.
    pub async fn initialize(&self) -> Result<(), RelayError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db
            .set(db)
            .map_err(|_| RelayError::storage("conversation store already initialized"))?;
        debug!(path = %self.config.database_path, "SQLite conversation store initialized");
        Ok(())
    }

    fn db(&self) -> Result<&Database, RelayError> {
        self.db.get().ok_or_else(|| {
            RelayError::storage("conversation store not initialized -- call initialize() first")
        })
    }
}

fn to_storage_err(e: impl std::error::Error + Send + Sync + 'static) -> RelayError {
    RelayError::Storage {
        source: Box::new(e),
    }
}

#[async_trait]
impl PluginAdapter for SqliteConversationStore {
    fn name(&self) -> &str {
        "sqlite-conversations"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::ConversationStore
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        let Ok(db) = self.db() else {
            return Ok(HealthStatus::Unhealthy("not initialized".to_string()));
        };
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RelayError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for SqliteConversationStore {
    async fn find_by_id(&self, id: &ConversationId) -> Result<Option<Conversation>, RelayError> {
        let key = id.0.clone();
        let row = self
            .db()?
            .connection()
            .call(move |conn| -> Result<Option<(String, String)>, rusqlite::Error> {
                conn.query_row(
                    "SELECT messages, updated_at FROM conversations WHERE id = ?1",
                    params![key],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()
            })
            .await
            .map_err(map_tr_err)?;

        let Some((messages, updated_at)) = row else {
            return Ok(None);
        };
        let messages: Vec<ConversationMessage> =
            serde_json::from_str(&messages).map_err(to_storage_err)?;
        let updated_at = DateTime::parse_from_rfc3339(&updated_at)
            .map_err(to_storage_err)?
            .with_timezone(&Utc);

        Ok(Some(Conversation {
            id: id.clone(),
            messages,
            updated_at,
        }))
    }

    async fn replace_messages(
        &self,
        id: &ConversationId,
        messages: Vec<ConversationMessage>,
    ) -> Result<(), RelayError> {
        let key = id.0.clone();
        let count = messages.len();
        let json = serde_json::to_string(&messages).map_err(to_storage_err)?;
        let now = Utc::now().to_rfc3339();

        self.db()?
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO conversations (id, messages, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?3)
                     ON CONFLICT(id) DO UPDATE SET messages = excluded.messages,
                                                   updated_at = excluded.updated_at",
                    params![key, json, now],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;

        debug!(conversation_id = %id, messages = count, "conversation messages replaced");
        Ok(())
    }
}
