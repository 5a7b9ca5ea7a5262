use super::{Collection, DocumentStore};
use crate::error::{Result, ScraperError};
use async_trait::async_trait;
use libsql::{Builder, Connection, Database};
use serde_json::{Map, Value};
use std::env;
use tracing::{debug, info};

fn db_err(context: &str, e: impl std::fmt::Display) -> ScraperError {
    ScraperError::persistence(format!("{context}: {e}"))
}

/// Document store on a libSQL database, one row per document.
pub struct LibsqlDocumentStore {
    db: Database,
}

impl LibsqlDocumentStore {
    /// Open a local database file.
    pub async fn open_local(path: &str) -> Result<Self> {
        info!("Opening local libSQL database at {}", path);
        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| db_err("Failed to open database", e))?;
        Ok(Self { db })
    }

    /// Connect to Turso using LIBSQL_URL and LIBSQL_AUTH_TOKEN.
    pub async fn open_remote() -> Result<Self> {
        let url = env::var("LIBSQL_URL")
            .map_err(|_| ScraperError::persistence("LIBSQL_URL environment variable not set"))?;
        let auth_token = env::var("LIBSQL_AUTH_TOKEN").map_err(|_| {
            ScraperError::persistence("LIBSQL_AUTH_TOKEN environment variable not set")
        })?;

        info!("Connecting to Turso database at {}", url);
        let db = Builder::new_remote(url, auth_token)
            .build()
            .await
            .map_err(|e| db_err("Failed to connect to database", e))?;
        Ok(Self { db })
    }

    fn connection(&self) -> Result<Connection> {
        self.db
            .connect()
            .map_err(|e| db_err("Failed to get database connection", e))
    }

    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations...");
        let conn = self.connection()?;
        let migration_sql = include_str!("../../migrations/001_create_documents.sql");
        conn.execute_batch(migration_sql)
            .await
            .map_err(|e| db_err("Failed to run migrations", e))?;
        info!("Database migrations completed successfully");
        Ok(())
    }

    async fn read_doc(conn: &Connection, collection: Collection, key: &str) -> Result<Option<Value>> {
        let mut rows = conn
            .query(
                "SELECT data FROM documents WHERE collection = ? AND key = ?",
                libsql::params![collection.name(), key],
            )
            .await
            .map_err(|e| db_err("Failed to query document", e))?;

        match rows.next().await.map_err(|e| db_err("Failed to read row", e))? {
            Some(row) => {
                let data: String = row.get(0).map_err(|e| db_err("Failed to get data", e))?;
                Ok(Some(serde_json::from_str(&data)?))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl DocumentStore for LibsqlDocumentStore {
    async fn find_by_key(&self, collection: Collection, key: &str) -> Result<Option<Value>> {
        let conn = self.connection()?;
        Self::read_doc(&conn, collection, key).await
    }

    async fn find_all(&self, collection: Collection) -> Result<Vec<Value>> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                "SELECT data FROM documents WHERE collection = ? ORDER BY created_at, key",
                libsql::params![collection.name()],
            )
            .await
            .map_err(|e| db_err("Failed to query documents", e))?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| db_err("Failed to read row", e))? {
            let data: String = row.get(0).map_err(|e| db_err("Failed to get data", e))?;
            results.push(serde_json::from_str(&data)?);
        }
        Ok(results)
    }

    async fn insert_one(&self, collection: Collection, doc: Value) -> Result<()> {
        let key = collection.key_of(&doc)?;
        let data = serde_json::to_string(&doc)?;
        let conn = self.connection()?;
        if Self::read_doc(&conn, collection, &key).await?.is_some() {
            return Err(ScraperError::AlreadyExists {
                entity: collection.entity(),
                id: key,
            });
        }
        conn.execute(
            "INSERT INTO documents (collection, key, data) VALUES (?, ?, ?)",
            libsql::params![collection.name(), key.as_str(), data],
        )
        .await
        .map_err(|e| db_err("Failed to insert document", e))?;
        debug!("Inserted {} document {}", collection, key);
        Ok(())
    }

    async fn update_one(
        &self,
        collection: Collection,
        key: &str,
        fields: Map<String, Value>,
    ) -> Result<bool> {
        let conn = self.connection()?;
        let Some(Value::Object(mut doc)) = Self::read_doc(&conn, collection, key).await? else {
            return Ok(false);
        };
        for (field, value) in fields {
            doc.insert(field, value);
        }
        let data = serde_json::to_string(&doc)?;
        let changed = conn
            .execute(
                "UPDATE documents SET data = ?, updated_at = datetime('now') WHERE collection = ? AND key = ?",
                libsql::params![data, collection.name(), key],
            )
            .await
            .map_err(|e| db_err("Failed to update document", e))?;
        debug!("Updated {} document {}", collection, key);
        Ok(changed > 0)
    }

    async fn delete_one(&self, collection: Collection, key: &str) -> Result<bool> {
        let conn = self.connection()?;
        let deleted = conn
            .execute(
                "DELETE FROM documents WHERE collection = ? AND key = ?",
                libsql::params![collection.name(), key],
            )
            .await
            .map_err(|e| db_err("Failed to delete document", e))?;
        Ok(deleted > 0)
    }
}
