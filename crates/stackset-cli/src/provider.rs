//! The calls this tool makes against CloudFormation and STS, expressed over
//! plain data so the orchestration logic does not depend on SDK types.

use crate::error::ProviderError;
use crate::tags::Tag;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

pub type OperationId = String;

/// Snapshot of a StackSet as the provider currently reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveStackSet {
    pub administration_role_arn: Option<String>,
    pub execution_role_name: Option<String>,
    pub template_body: Option<String>,
    pub tags: Vec<Tag>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackInstance {
    pub account: String,
    pub region: String,
    pub stack_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackSetSummary {
    #[serde(rename = "StackSetName")]
    pub name: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "StackSetId")]
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationPreferences {
    pub failure_tolerance_count: i32,
    pub max_concurrent_count: i32,
}

impl Default for OperationPreferences {
    fn default() -> Self {
        Self {
            failure_tolerance_count: 0,
            max_concurrent_count: 2,
        }
    }
}

/// Parameters shared by CreateStackSet and UpdateStackSet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackSetRequest {
    pub stack_set_name: String,
    pub administration_role_arn: String,
    pub execution_role_name: String,
    pub template_body: String,
    pub capabilities: Vec<String>,
    pub tags: Vec<Tag>,
    /// Only honoured by updates; CreateStackSet does not start an operation.
    pub preferences: Option<OperationPreferences>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateInstancesRequest {
    pub stack_set_name: String,
    pub accounts: Vec<String>,
    pub regions: Vec<String>,
    pub preferences: OperationPreferences,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteInstancesRequest {
    pub stack_set_name: String,
    pub accounts: Vec<String>,
    pub regions: Vec<String>,
    pub retain_stacks: bool,
}

/// Status of a StackSet operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    Queued,
    Running,
    Stopping,
    Succeeded,
    Failed,
    Stopped,
    Other(String),
}

impl OperationStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "QUEUED" => Self::Queued,
            "RUNNING" => Self::Running,
            "STOPPING" => Self::Stopping,
            "SUCCEEDED" => Self::Succeeded,
            "FAILED" => Self::Failed,
            "STOPPED" => Self::Stopped,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Stopping => "STOPPING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Stopped => "STOPPED",
            Self::Other(s) => s,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Queued | Self::Running | Self::Stopping)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Stopped)
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait CloudFormation: Send + Sync {
    async fn describe_stack_set(&self, name: &str) -> ProviderResult<LiveStackSet>;

    /// Returns the operation id when the provider started one.
    async fn create_stack_set(&self, req: &StackSetRequest) -> ProviderResult<Option<OperationId>>;

    async fn update_stack_set(&self, req: &StackSetRequest) -> ProviderResult<Option<OperationId>>;

    async fn delete_stack_set(&self, name: &str) -> ProviderResult<()>;

    /// All instances of the StackSet, across every page.
    async fn list_stack_instances(&self, name: &str) -> ProviderResult<Vec<StackInstance>>;

    async fn create_stack_instances(
        &self,
        req: &CreateInstancesRequest,
    ) -> ProviderResult<Option<OperationId>>;

    async fn delete_stack_instances(
        &self,
        req: &DeleteInstancesRequest,
    ) -> ProviderResult<Option<OperationId>>;

    async fn describe_stack_set_operation(
        &self,
        name: &str,
        operation_id: &str,
    ) -> ProviderResult<OperationStatus>;

    async fn list_stack_sets(&self) -> ProviderResult<Vec<StackSetSummary>>;
}

#[async_trait]
pub trait CallerIdentity: Send + Sync {
    /// Account id of the ambient credentials.
    async fn caller_account(&self) -> ProviderResult<Option<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_roundtrips_known_values() {
        for s in ["QUEUED", "RUNNING", "STOPPING", "SUCCEEDED", "FAILED", "STOPPED"] {
            assert_eq!(OperationStatus::parse(s).as_str(), s);
        }
        assert_eq!(
            OperationStatus::parse("WEIRD"),
            OperationStatus::Other("WEIRD".to_string())
        );
    }

    #[test]
    fn in_flight_and_failure_classification() {
        assert!(OperationStatus::Running.is_in_flight());
        assert!(OperationStatus::Queued.is_in_flight());
        assert!(!OperationStatus::Succeeded.is_in_flight());
        assert!(!OperationStatus::Other("X".into()).is_in_flight());
        assert!(OperationStatus::Failed.is_failure());
        assert!(OperationStatus::Stopped.is_failure());
        assert!(!OperationStatus::Succeeded.is_failure());
    }
}
