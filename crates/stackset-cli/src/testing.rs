//! In-memory provider and pacer used by unit tests.

use crate::error::ProviderError;
use crate::poller::Pacer;
use crate::provider::*;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    DescribeStackSet(String),
    CreateStackSet(StackSetRequest),
    UpdateStackSet(StackSetRequest),
    DeleteStackSet(String),
    ListStackInstances(String),
    CreateStackInstances(CreateInstancesRequest),
    DeleteStackInstances(DeleteInstancesRequest),
    DescribeOperation(String),
    ListStackSets,
}

impl Call {
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Call::CreateStackSet(_)
                | Call::UpdateStackSet(_)
                | Call::DeleteStackSet(_)
                | Call::CreateStackInstances(_)
                | Call::DeleteStackInstances(_)
        )
    }
}

fn fail(action: &'static str) -> ProviderError {
    ProviderError::new(action, "injected failure")
}

/// Scriptable CloudFormation double that records every call.
#[derive(Default)]
pub struct FakeCloudFormation {
    pub live: Option<LiveStackSet>,
    pub instances: Vec<StackInstance>,
    pub stack_sets: Vec<StackSetSummary>,
    /// Statuses returned by successive DescribeStackSetOperation calls;
    /// an `Err` entry simulates a failed query. Defaults to SUCCEEDED once drained.
    pub statuses: Mutex<VecDeque<Result<OperationStatus, ProviderError>>>,
    pub fail_create: bool,
    pub fail_update: bool,
    pub fail_delete_stack_set: bool,
    pub fail_list_instances: bool,
    pub fail_create_instances: bool,
    pub fail_delete_instances: bool,
    /// Whether CreateStackSet returns an operation id.
    pub create_returns_operation: bool,
    /// Whether UpdateStackSet returns an operation id.
    pub update_returns_operation: bool,
    calls: Mutex<Vec<Call>>,
}

impl FakeCloudFormation {
    pub fn new() -> Self {
        Self {
            create_returns_operation: true,
            update_returns_operation: true,
            ..Default::default()
        }
    }

    pub fn with_statuses(self, statuses: Vec<Result<OperationStatus, ProviderError>>) -> Self {
        *self.statuses.lock().unwrap() = statuses.into();
        self
    }

    pub fn with_accounts(mut self, accounts: &[&str]) -> Self {
        self.instances = accounts
            .iter()
            .map(|a| StackInstance {
                account: a.to_string(),
                region: "eu-west-1".to_string(),
                stack_id: Some(format!("arn:aws:cloudformation:eu-west-1:{a}:stack/s/1")),
                status: Some("CURRENT".to_string()),
            })
            .collect();
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutating_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutating).collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl CloudFormation for FakeCloudFormation {
    async fn describe_stack_set(&self, name: &str) -> ProviderResult<LiveStackSet> {
        self.record(Call::DescribeStackSet(name.to_string()));
        self.live.clone().ok_or_else(|| {
            ProviderError::new("DescribeStackSet", format!("StackSet {name} not found"))
        })
    }

    async fn create_stack_set(&self, req: &StackSetRequest) -> ProviderResult<Option<OperationId>> {
        self.record(Call::CreateStackSet(req.clone()));
        if self.fail_create {
            return Err(fail("CreateStackSet"));
        }
        Ok(self
            .create_returns_operation
            .then(|| "op-create".to_string()))
    }

    async fn update_stack_set(&self, req: &StackSetRequest) -> ProviderResult<Option<OperationId>> {
        self.record(Call::UpdateStackSet(req.clone()));
        if self.fail_update {
            return Err(fail("UpdateStackSet"));
        }
        Ok(self
            .update_returns_operation
            .then(|| "op-update".to_string()))
    }

    async fn delete_stack_set(&self, name: &str) -> ProviderResult<()> {
        self.record(Call::DeleteStackSet(name.to_string()));
        if self.fail_delete_stack_set {
            return Err(fail("DeleteStackSet"));
        }
        Ok(())
    }

    async fn list_stack_instances(&self, name: &str) -> ProviderResult<Vec<StackInstance>> {
        self.record(Call::ListStackInstances(name.to_string()));
        if self.fail_list_instances {
            return Err(fail("ListStackInstances"));
        }
        Ok(self.instances.clone())
    }

    async fn create_stack_instances(
        &self,
        req: &CreateInstancesRequest,
    ) -> ProviderResult<Option<OperationId>> {
        self.record(Call::CreateStackInstances(req.clone()));
        if self.fail_create_instances {
            return Err(fail("CreateStackInstances"));
        }
        Ok(Some("op-add".to_string()))
    }

    async fn delete_stack_instances(
        &self,
        req: &DeleteInstancesRequest,
    ) -> ProviderResult<Option<OperationId>> {
        self.record(Call::DeleteStackInstances(req.clone()));
        if self.fail_delete_instances {
            return Err(fail("DeleteStackInstances"));
        }
        Ok(Some("op-remove".to_string()))
    }

    async fn describe_stack_set_operation(
        &self,
        _name: &str,
        operation_id: &str,
    ) -> ProviderResult<OperationStatus> {
        self.record(Call::DescribeOperation(operation_id.to_string()));
        self.statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(OperationStatus::Succeeded))
    }

    async fn list_stack_sets(&self) -> ProviderResult<Vec<StackSetSummary>> {
        self.record(Call::ListStackSets);
        Ok(self.stack_sets.clone())
    }
}

/// Pacer that returns immediately and counts how often it was asked to wait.
#[derive(Default)]
pub struct CountingPacer {
    pauses: Mutex<Vec<Duration>>,
}

impl CountingPacer {
    pub fn count(&self) -> usize {
        self.pauses.lock().unwrap().len()
    }

    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses.lock().unwrap().clone()
    }
}

#[async_trait]
impl Pacer for CountingPacer {
    async fn pause(&self, interval: Duration) {
        self.pauses.lock().unwrap().push(interval);
    }
}
