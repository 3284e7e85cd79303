//! PostgreSQL directory store implementation

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use std::time::Duration;

use crate::error::{AuthzError, Result};
use crate::store::DirectoryStore;
use warden_core::{AttachmentLevel, Organization, Policy, PolicyId, Statement, Team, TeamId, User};

/// Map sqlx failures onto the engine's taxonomy: decode problems are
/// data corruption, everything else is the store being unavailable.
fn store_err(e: sqlx::Error) -> AuthzError {
    match e {
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::TypeNotFound { .. } => {
            AuthzError::CorruptState(format!("row decode failed: {}", e))
        }
        other => AuthzError::StoreUnavailable(other.to_string()),
    }
}

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS organizations (
        id          TEXT PRIMARY KEY,
        name        TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT ''
    )",
    "CREATE TABLE IF NOT EXISTS teams (
        id          TEXT PRIMARY KEY,
        org_id      TEXT NOT NULL REFERENCES organizations(id),
        name        TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        parent_id   TEXT REFERENCES teams(id),
        path        TEXT[] NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS users (
        id     TEXT PRIMARY KEY,
        org_id TEXT NOT NULL REFERENCES organizations(id),
        name   TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS team_members (
        user_id TEXT NOT NULL REFERENCES users(id),
        team_id TEXT NOT NULL REFERENCES teams(id),
        PRIMARY KEY (user_id, team_id)
    )",
    "CREATE TABLE IF NOT EXISTS policies (
        id         TEXT PRIMARY KEY,
        org_id     TEXT NOT NULL REFERENCES organizations(id),
        name       TEXT NOT NULL,
        version    INTEGER NOT NULL DEFAULT 1,
        statements JSONB NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS org_policies (
        seq       BIGSERIAL,
        org_id    TEXT NOT NULL REFERENCES organizations(id),
        policy_id TEXT NOT NULL,
        PRIMARY KEY (org_id, policy_id)
    )",
    "CREATE TABLE IF NOT EXISTS team_policies (
        seq       BIGSERIAL,
        team_id   TEXT NOT NULL REFERENCES teams(id),
        policy_id TEXT NOT NULL,
        PRIMARY KEY (team_id, policy_id)
    )",
    "CREATE TABLE IF NOT EXISTS user_policies (
        seq       BIGSERIAL,
        user_id   TEXT NOT NULL REFERENCES users(id),
        policy_id TEXT NOT NULL,
        PRIMARY KEY (user_id, policy_id)
    )",
];

/// PostgreSQL directory store with connection pooling
///
/// Attachment join tables deliberately carry no foreign key on
/// `policy_id`: a dangling attachment is a corruption the aggregator
/// must detect and refuse, and the test suite needs to produce one.
pub struct PostgresDirectory {
    pool: PgPool,
}

impl PostgresDirectory {
    /// Connect with pool settings suited to the request-critical read
    /// path
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(25)
            .min_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect(database_url)
            .await
            .map_err(|e| AuthzError::StoreUnavailable(format!("failed to connect: {}", e)))?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the backing tables if they do not exist
    pub async fn ensure_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(store_err)?;
        }
        Ok(())
    }

    /// Underlying pool, for callers that need their own queries
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DirectoryStore for PostgresDirectory {
    async fn get_organization(&self, id: &str) -> Result<Option<Organization>> {
        let row = sqlx::query("SELECT id, name, description FROM organizations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;

        row.map(|row| {
            Ok(Organization {
                id: row.try_get("id").map_err(store_err)?,
                name: row.try_get("name").map_err(store_err)?,
                description: row.try_get("description").map_err(store_err)?,
            })
        })
        .transpose()
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, org_id, name FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;

        row.map(|row| {
            Ok(User {
                id: row.try_get("id").map_err(store_err)?,
                org_id: row.try_get("org_id").map_err(store_err)?,
                name: row.try_get("name").map_err(store_err)?,
            })
        })
        .transpose()
    }

    async fn get_team(&self, id: &str) -> Result<Option<Team>> {
        let row = sqlx::query(
            "SELECT id, org_id, name, description, parent_id, path FROM teams WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        row.map(|row| {
            Ok(Team {
                id: row.try_get("id").map_err(store_err)?,
                org_id: row.try_get("org_id").map_err(store_err)?,
                name: row.try_get("name").map_err(store_err)?,
                description: row.try_get("description").map_err(store_err)?,
                parent_id: row.try_get("parent_id").map_err(store_err)?,
                path: row.try_get::<Vec<String>, _>("path").map_err(store_err)?,
            })
        })
        .transpose()
    }

    async fn get_team_memberships(&self, user_id: &str) -> Result<Vec<TeamId>> {
        let rows = sqlx::query(
            "SELECT team_id FROM team_members WHERE user_id = $1 ORDER BY team_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        rows.iter()
            .map(|row| row.try_get("team_id").map_err(store_err))
            .collect()
    }

    async fn get_attached_policies(&self, level: &AttachmentLevel) -> Result<Vec<PolicyId>> {
        let query = match level {
            AttachmentLevel::Organization(_) => {
                "SELECT policy_id FROM org_policies WHERE org_id = $1 ORDER BY seq"
            }
            AttachmentLevel::Team(_) => {
                "SELECT policy_id FROM team_policies WHERE team_id = $1 ORDER BY seq"
            }
            AttachmentLevel::User(_) => {
                "SELECT policy_id FROM user_policies WHERE user_id = $1 ORDER BY seq"
            }
        };

        let rows = sqlx::query(query)
            .bind(level.entity_id())
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;

        rows.iter()
            .map(|row| row.try_get("policy_id").map_err(store_err))
            .collect()
    }

    async fn get_policy(&self, id: &str) -> Result<Option<Policy>> {
        let row = sqlx::query(
            "SELECT id, org_id, name, version, statements FROM policies WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        row.map(|row| {
            let statements: serde_json::Value =
                row.try_get("statements").map_err(store_err)?;
            let statements: Vec<Statement> =
                serde_json::from_value(statements).map_err(|e| {
                    AuthzError::CorruptState(format!("policy '{}' has malformed statements: {}", id, e))
                })?;

            Ok(Policy {
                id: row.try_get("id").map_err(store_err)?,
                org_id: row.try_get("org_id").map_err(store_err)?,
                name: row.try_get("name").map_err(store_err)?,
                version: row.try_get("version").map_err(store_err)?,
                statements,
            })
        })
        .transpose()
    }
}
