/// Flow node instance metadata columns
///
/// Adds the descriptive columns the engine started writing once flow node
/// instances were queried without loading the process model.

use crate::error::Result;
use crate::migration::unit::MigrationUnit;
use crate::migration::units::ddl::add_column_if_missing;
use crate::store::types::FLOW_NODE_INSTANCES;
use crate::store::SchemaIntrospector;
use async_trait::async_trait;
use sqlx::SqliteConnection;

pub const ID: &str = "20181015000000-flow_node_instance_add_metadata";

const COLUMNS: [&str; 5] = [
    "flowNodeName",
    "flowNodeLane",
    "flowNodeType",
    "interruptedBy",
    "parentProcessInstanceId",
];

#[derive(Debug, Default)]
pub struct FlowNodeInstanceMetadata;

#[async_trait]
impl MigrationUnit for FlowNodeInstanceMetadata {
    fn id(&self) -> &str {
        ID
    }

    fn description(&self) -> &str {
        "Add name, lane, type, interruptedBy and parent process instance to flow node instances"
    }

    fn target_tables(&self) -> &[&'static str] {
        &[FLOW_NODE_INSTANCES]
    }

    async fn detect_applied(&self, conn: &mut SqliteConnection) -> Result<bool> {
        SchemaIntrospector::has_columns(conn, FLOW_NODE_INSTANCES, &COLUMNS).await
    }

    async fn forward(&self, conn: &mut SqliteConnection) -> Result<()> {
        for column in COLUMNS {
            add_column_if_missing(conn, FLOW_NODE_INSTANCES, column, "TEXT").await?;
        }
        Ok(())
    }
}
