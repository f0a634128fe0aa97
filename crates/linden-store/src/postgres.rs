//! PostgreSQL storage implementation
//!
//! Entities are stored as JSONB `data` columns with the fields the
//! engine filters or guards on (state, holder, version) denormalized.
//! `apply_transition` runs the proposal update and the log insert in
//! one database transaction; the version predicate on the UPDATE is
//! the optimistic concurrency check.

use crate::error::{StorageError, StoreResult};
use crate::traits::*;
use async_trait::async_trait;
use linden_types::{
    CouncilAssignment, CouncilEvaluation, HolderUnit, ProjectState, Proposal, ProposalId, UserId,
    WorkflowLogEntry,
};
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use std::time::Duration;

/// PostgreSQL-backed storage
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect and initialize the schema.
    pub async fn connect(
        url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(connect_timeout_secs))
            .connect(url)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let store = Self { pool };
        store.initialize_schema().await?;
        Ok(store)
    }

    async fn initialize_schema(&self) -> StoreResult<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS proposals (
                id TEXT PRIMARY KEY,
                state TEXT NOT NULL,
                holder_code TEXT,
                version BIGINT NOT NULL,
                data JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            );
            "#,
            r#"CREATE INDEX IF NOT EXISTS proposals_holder_code ON proposals(holder_code);"#,
            r#"
            CREATE TABLE IF NOT EXISTS workflow_logs (
                id TEXT PRIMARY KEY,
                proposal_id TEXT NOT NULL,
                ts TIMESTAMPTZ NOT NULL,
                data JSONB NOT NULL
            );
            "#,
            r#"CREATE INDEX IF NOT EXISTS workflow_logs_proposal ON workflow_logs(proposal_id, ts);"#,
            r#"
            CREATE TABLE IF NOT EXISTS council_assignments (
                proposal_id TEXT PRIMARY KEY,
                data JSONB NOT NULL
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS council_evaluations (
                proposal_id TEXT NOT NULL,
                evaluator_id TEXT NOT NULL,
                data JSONB NOT NULL,
                PRIMARY KEY (proposal_id, evaluator_id)
            );
            "#,
        ];

        for statement in statements {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    fn decode<T: serde::de::DeserializeOwned>(row: &sqlx::postgres::PgRow) -> StoreResult<T> {
        let data: serde_json::Value = row.try_get("data")?;
        Ok(serde_json::from_value(data)?)
    }
}

#[async_trait]
impl ProposalStore for PostgresStore {
    async fn insert_proposal(&self, proposal: Proposal) -> StoreResult<()> {
        let data = serde_json::to_value(&proposal)?;
        let result = sqlx::query(
            r#"
            INSERT INTO proposals (id, state, holder_code, version, data, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(proposal.id.as_str())
        .bind(proposal.state.as_str())
        .bind(proposal.holder_unit.as_ref().map(|u| u.code()))
        .bind(proposal.version as i64)
        .bind(&data)
        .bind(proposal.created_at)
        .bind(proposal.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict(format!(
                "proposal {} already exists",
                proposal.id
            )));
        }
        Ok(())
    }

    async fn get_proposal(&self, id: &ProposalId) -> StoreResult<Option<Proposal>> {
        let row = sqlx::query("SELECT data FROM proposals WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::decode).transpose()
    }

    async fn list_proposals(&self) -> StoreResult<Vec<Proposal>> {
        let rows = sqlx::query("SELECT data FROM proposals ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::decode).collect()
    }

    async fn list_by_holder(&self, unit: &HolderUnit) -> StoreResult<Vec<Proposal>> {
        let rows =
            sqlx::query("SELECT data FROM proposals WHERE holder_code = $1 ORDER BY created_at")
                .bind(unit.code())
                .fetch_all(&self.pool)
                .await?;
        rows.iter().map(Self::decode).collect()
    }

    async fn apply_transition(
        &self,
        expected_version: u64,
        updated: Proposal,
        entry: WorkflowLogEntry,
    ) -> StoreResult<Proposal> {
        let proposal_data = serde_json::to_value(&updated)?;
        let entry_data = serde_json::to_value(&entry)?;

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE proposals
            SET state = $1, holder_code = $2, version = $3, data = $4, updated_at = $5
            WHERE id = $6 AND version = $7
            "#,
        )
        .bind(updated.state.as_str())
        .bind(updated.holder_unit.as_ref().map(|u| u.code()))
        .bind(updated.version as i64)
        .bind(&proposal_data)
        .bind(updated.updated_at)
        .bind(updated.id.as_str())
        .bind(expected_version as i64)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(StorageError::Conflict(format!(
                "proposal {} changed concurrently",
                updated.id
            )));
        }

        sqlx::query(
            "INSERT INTO workflow_logs (id, proposal_id, ts, data) VALUES ($1, $2, $3, $4)",
        )
        .bind(&entry.id)
        .bind(entry.proposal_id.as_str())
        .bind(entry.timestamp)
        .bind(&entry_data)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn force_set_state(&self, id: &ProposalId, state: ProjectState) -> StoreResult<()> {
        let now = chrono::Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE proposals
            SET state = $1,
                data = jsonb_set(data, '{state}', to_jsonb($1::text)),
                updated_at = $2
            WHERE id = $3
            "#,
        )
        .bind(state.as_str())
        .bind(now)
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("proposal {id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl WorkflowLogStore for PostgresStore {
    async fn logs_for(&self, id: &ProposalId) -> StoreResult<Vec<WorkflowLogEntry>> {
        let rows = sqlx::query("SELECT data FROM workflow_logs WHERE proposal_id = $1 ORDER BY ts")
            .bind(id.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::decode).collect()
    }
}

#[async_trait]
impl EvaluationStore for PostgresStore {
    async fn save_assignment(&self, assignment: CouncilAssignment) -> StoreResult<()> {
        let data = serde_json::to_value(&assignment)?;
        sqlx::query(
            r#"
            INSERT INTO council_assignments (proposal_id, data)
            VALUES ($1, $2)
            ON CONFLICT (proposal_id) DO UPDATE SET data = EXCLUDED.data
            "#,
        )
        .bind(assignment.proposal_id.as_str())
        .bind(&data)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_assignment(&self, id: &ProposalId) -> StoreResult<Option<CouncilAssignment>> {
        let row = sqlx::query("SELECT data FROM council_assignments WHERE proposal_id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::decode).transpose()
    }

    async fn upsert_evaluation(&self, evaluation: CouncilEvaluation) -> StoreResult<()> {
        let data = serde_json::to_value(&evaluation)?;
        sqlx::query(
            r#"
            INSERT INTO council_evaluations (proposal_id, evaluator_id, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (proposal_id, evaluator_id) DO UPDATE SET data = EXCLUDED.data
            "#,
        )
        .bind(evaluation.proposal_id.as_str())
        .bind(evaluation.evaluator_id.as_str())
        .bind(&data)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_evaluation(
        &self,
        proposal: &ProposalId,
        evaluator: &UserId,
    ) -> StoreResult<Option<CouncilEvaluation>> {
        let row = sqlx::query(
            "SELECT data FROM council_evaluations WHERE proposal_id = $1 AND evaluator_id = $2",
        )
        .bind(proposal.as_str())
        .bind(evaluator.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::decode).transpose()
    }

    async fn evaluations_for(&self, proposal: &ProposalId) -> StoreResult<Vec<CouncilEvaluation>> {
        let rows = sqlx::query(
            "SELECT data FROM council_evaluations WHERE proposal_id = $1 ORDER BY evaluator_id",
        )
        .bind(proposal.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::decode).collect()
    }
}

impl WorkflowStore for PostgresStore {}
