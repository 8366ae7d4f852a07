/// Correlation state backfill
///
/// Derives each correlation's lifecycle state from the flow node instances of
/// its process instance:
/// - any `running` or `suspended` instance: `running`
/// - otherwise any `error` or `terminated` instance: `error`
/// - otherwise: `finished` (the column default)
///
/// Active wins over failed. A row is written only when the derived state
/// differs from the stored one, so running the backfill again re-derives
/// without side effects. Rows are processed one at a time and every update is
/// awaited. A row that cannot be read or written is logged and skipped.

use crate::error::{BackfillRowError, Result};
use crate::store::types::{CorrelationState, FlowNodeInstanceState, CORRELATIONS, FLOW_NODE_INSTANCES};
use crate::store::SchemaIntrospector;
use sqlx::{Row, SqliteConnection};

/// Summary of one backfill pass
#[derive(Debug, Default)]
pub struct BackfillReport {
    /// False when the pass was skipped because a required table or column is missing
    pub performed: bool,
    pub examined: usize,
    pub marked_running: usize,
    pub marked_error: usize,
    /// Rows set back to `finished` by a re-derivation
    pub marked_finished: usize,
    pub unchanged: usize,
    pub failures: Vec<BackfillRowError>,
}

impl BackfillReport {
    pub fn updated(&self) -> usize {
        self.marked_running + self.marked_error + self.marked_finished
    }
}

/// Pure classification from counts of active and failed flow node instances
pub fn classify(active: u64, failed: u64) -> CorrelationState {
    if active > 0 {
        CorrelationState::Running
    } else if failed > 0 {
        CorrelationState::Error
    } else {
        CorrelationState::Finished
    }
}

/// Backfill the state of every correlation row
///
/// Skips entirely when flow node instances do not exist yet or correlations
/// have no state column. Only listing the correlation rows can fail the pass.
pub async fn backfill_correlation_states(conn: &mut SqliteConnection) -> Result<BackfillReport> {
    let mut report = BackfillReport::default();

    if !SchemaIntrospector::table_exists(conn, FLOW_NODE_INSTANCES).await? {
        tracing::info!("📭 {} does not exist, correlation backfill skipped", FLOW_NODE_INSTANCES);
        return Ok(report);
    }
    if !SchemaIntrospector::has_column(conn, CORRELATIONS, "state").await? {
        tracing::info!("📭 {} has no state column, correlation backfill skipped", CORRELATIONS);
        return Ok(report);
    }
    if !SchemaIntrospector::has_column(conn, FLOW_NODE_INSTANCES, "processInstanceId").await? {
        tracing::warn!(
            "⚠️ {} has no processInstanceId column, correlation backfill skipped",
            FLOW_NODE_INSTANCES
        );
        return Ok(report);
    }

    report.performed = true;

    let row_ids: Vec<i64> = sqlx::query_scalar(r#"SELECT id FROM "Correlations" ORDER BY id"#)
        .fetch_all(&mut *conn)
        .await?;

    tracing::info!("🧮 Backfilling state for {} correlations", row_ids.len());

    for row_id in row_ids {
        report.examined += 1;
        match reclassify(conn, row_id).await {
            Ok(Outcome::Unchanged) => report.unchanged += 1,
            Ok(Outcome::Updated(CorrelationState::Running)) => report.marked_running += 1,
            Ok(Outcome::Updated(CorrelationState::Error)) => report.marked_error += 1,
            Ok(Outcome::Updated(CorrelationState::Finished)) => report.marked_finished += 1,
            Err(err) => {
                tracing::warn!("⚠️ {}", err);
                report.failures.push(err);
            }
        }
    }

    tracing::info!(
        "✅ Correlation backfill done: {} examined, {} running, {} error, {} reset to finished, {} unchanged, {} failed",
        report.examined,
        report.marked_running,
        report.marked_error,
        report.marked_finished,
        report.unchanged,
        report.failures.len()
    );

    Ok(report)
}

enum Outcome {
    Unchanged,
    Updated(CorrelationState),
}

async fn reclassify(
    conn: &mut SqliteConnection,
    row_id: i64,
) -> std::result::Result<Outcome, BackfillRowError> {
    let mut correlation_id = None;
    let fail = |correlation_id: &Option<String>, source| BackfillRowError {
        row_id,
        correlation_id: correlation_id.clone(),
        source,
    };

    let (process_instance_id, stored) = {
        let row = sqlx::query(
            r#"SELECT correlationId, processInstanceId, state FROM "Correlations" WHERE id = ?1"#,
        )
        .bind(row_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| fail(&correlation_id, e))?;

        correlation_id = row
            .try_get::<Option<String>, _>("correlationId")
            .map_err(|e| fail(&None, e))?;
        let process_instance_id: Option<String> = row
            .try_get("processInstanceId")
            .map_err(|e| fail(&correlation_id, e))?;
        let stored: Option<String> = row.try_get("state").map_err(|e| fail(&correlation_id, e))?;
        (process_instance_id, stored)
    };

    let derived = match process_instance_id.as_deref() {
        Some(process_instance_id) => {
            let active = count_in_states(conn, process_instance_id, FlowNodeInstanceState::ACTIVE)
                .await
                .map_err(|e| fail(&correlation_id, e))?;
            let failed = if active > 0 {
                0
            } else {
                count_in_states(conn, process_instance_id, FlowNodeInstanceState::FAILED)
                    .await
                    .map_err(|e| fail(&correlation_id, e))?
            };
            classify(active, failed)
        }
        None => CorrelationState::Finished,
    };

    let current = stored.as_deref().and_then(|s| s.parse::<CorrelationState>().ok());
    if current == Some(derived) {
        return Ok(Outcome::Unchanged);
    }

    sqlx::query(r#"UPDATE "Correlations" SET state = ?1 WHERE id = ?2"#)
        .bind(derived.as_str())
        .bind(row_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| fail(&correlation_id, e))?;

    tracing::debug!(
        "Correlation row {} ({:?}) -> {}",
        row_id,
        correlation_id,
        derived
    );
    Ok(Outcome::Updated(derived))
}

async fn count_in_states(
    conn: &mut SqliteConnection,
    process_instance_id: &str,
    states: [FlowNodeInstanceState; 2],
) -> std::result::Result<u64, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(
        r#"SELECT COUNT(*) FROM "FlowNodeInstances" WHERE processInstanceId = ?1 AND state IN (?2, ?3)"#,
    )
    .bind(process_instance_id)
    .bind(states[0].as_str())
    .bind(states[1].as_str())
    .fetch_one(&mut *conn)
    .await?;

    Ok(count.max(0) as u64)
}
