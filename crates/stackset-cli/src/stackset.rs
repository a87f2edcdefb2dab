//! StackSet lifecycle: create-or-update, stack instance registration and
//! cascading deletion.
//!
//! Every provider call is attempted exactly once. Submissions that fail
//! surface as [`StackSetError::OperationSubmissionFailed`]; operations that
//! run but end badly are logged and reported through their terminal
//! [`OperationStatus`].

use crate::compare::{self, DesiredStackSet};
use crate::config::StackSetDescriptor;
use crate::error::{ProviderError, Result, StackSetError};
use crate::poller::{OperationPoller, Pacer};
use crate::provider::{
    CloudFormation, CreateInstancesRequest, DeleteInstancesRequest, OperationId,
    OperationPreferences, OperationStatus, StackInstance, StackSetRequest,
};
use crate::tags;
use crate::template::read_template;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

const CAPABILITY_NAMED_IAM: &str = "CAPABILITY_NAMED_IAM";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The live StackSet already matches; nothing was submitted.
    Unchanged,
    Created(OperationStatus),
    Updated(OperationStatus),
}

impl ApplyOutcome {
    pub fn status(&self) -> Option<&OperationStatus> {
        match self {
            ApplyOutcome::Unchanged => None,
            ApplyOutcome::Created(s) | ApplyOutcome::Updated(s) => Some(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstancesOutcome {
    NoNewAccounts,
    Added {
        accounts: Vec<String>,
        status: OperationStatus,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceCleanup {
    NotNeeded,
    Finished(OperationStatus),
    NotSubmitted(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    pub instances: InstanceCleanup,
    pub stack_set_deleted: bool,
}

fn submission_failed(e: ProviderError) -> StackSetError {
    StackSetError::OperationSubmissionFailed {
        action: e.action,
        reason: e.message,
    }
}

fn missing_operation(action: &'static str) -> StackSetError {
    StackSetError::OperationSubmissionFailed {
        action,
        reason: "response carried no OperationId".to_string(),
    }
}

pub struct StackSet {
    descriptor: StackSetDescriptor,
    cfn: Arc<dyn CloudFormation>,
    poller: OperationPoller,
}

impl StackSet {
    pub fn new(
        descriptor: StackSetDescriptor,
        cfn: Arc<dyn CloudFormation>,
        pacer: Arc<dyn Pacer>,
    ) -> Self {
        let poller = OperationPoller::new(cfn.clone(), pacer);
        Self {
            descriptor,
            cfn,
            poller,
        }
    }

    pub fn descriptor(&self) -> &StackSetDescriptor {
        &self.descriptor
    }

    fn name(&self) -> &str {
        self.descriptor.name()
    }

    async fn await_operation(&self, label: &str, operation_id: &OperationId) -> OperationStatus {
        info!("{label} in progress (operation: {operation_id})");
        let status = self.poller.wait(self.name(), operation_id).await;
        if status.is_failure() {
            error!("{label} ended with {status}");
        } else {
            info!("{label} ended with {status}");
        }
        status
    }

    /// Create the StackSet from the template at `template_path`, or update it
    /// when the live configuration differs (or the descriptor forces it).
    pub async fn create_or_update(&self, template_path: &Path) -> Result<ApplyOutcome> {
        let template_body = read_template(template_path).await?;
        let desired = DesiredStackSet {
            admin_role_arn: self.descriptor.admin_role_arn()?,
            exec_role: self.descriptor.exec_role().to_string(),
            template_body,
            tags: self.descriptor.tags().to_vec(),
        };
        info!("Admin role : {}", desired.admin_role_arn);
        info!("Exec role : {}", desired.exec_role);
        info!("Tags : {}", tags::decode(&desired.tags));

        let live = match self.cfn.describe_stack_set(self.name()).await {
            Ok(live) => {
                debug!(status = ?live.status, "found existing stackset");
                Some(live)
            }
            Err(e) => {
                debug!("{e}; treating stackset as absent");
                None
            }
        };

        let mut request = StackSetRequest {
            stack_set_name: self.name().to_string(),
            administration_role_arn: desired.admin_role_arn.clone(),
            execution_role_name: desired.exec_role.clone(),
            template_body: desired.template_body.clone(),
            capabilities: vec![CAPABILITY_NAMED_IAM.to_string()],
            tags: desired.tags.clone(),
            preferences: None,
        };

        match live {
            Some(live) => {
                if compare::is_equal(&desired, &live) {
                    if !self.descriptor.force() {
                        info!("Update stackset : no update to perform.");
                        return Ok(ApplyOutcome::Unchanged);
                    }
                    info!("no differences found; updating anyway (--force)");
                }
                request.preferences = self.descriptor.preferences();
                let operation_id = self
                    .cfn
                    .update_stack_set(&request)
                    .await
                    .map_err(submission_failed)?
                    .ok_or_else(|| missing_operation("UpdateStackSet"))?;
                let status = self.await_operation("Update stackset", &operation_id).await;
                Ok(ApplyOutcome::Updated(status))
            }
            None => {
                let operation_id = self
                    .cfn
                    .create_stack_set(&request)
                    .await
                    .map_err(submission_failed)?;
                let status = match operation_id {
                    Some(id) => self.await_operation("Create stackset", &id).await,
                    // CreateStackSet completes synchronously on AWS.
                    None => {
                        info!("Create stackset ended with SUCCEEDED");
                        OperationStatus::Succeeded
                    }
                };
                Ok(ApplyOutcome::Created(status))
            }
        }
    }

    pub async fn stack_instances(&self) -> Result<Vec<StackInstance>> {
        Ok(self.cfn.list_stack_instances(self.name()).await?)
    }

    /// Distinct accounts across all stack instances, in enumeration order.
    pub async fn managed_accounts(&self) -> Result<Vec<String>> {
        let instances = self.stack_instances().await?;
        for i in &instances {
            debug!(account = %i.account, region = %i.region, stack_id = ?i.stack_id, status = ?i.status, "stack instance");
        }
        Ok(distinct(instances.into_iter().map(|i| i.account)))
    }

    /// Add stack instances for every account in `accounts` that is not yet
    /// managed. Existing instances are left untouched.
    pub async fn update_stack_instances(
        &self,
        accounts: &[String],
        preferences: OperationPreferences,
    ) -> Result<InstancesOutcome> {
        let managed = self.managed_accounts().await?;
        info!("Current managed accounts : {managed:?}");

        let new_accounts = accounts_to_add(accounts, &managed);
        if new_accounts.is_empty() {
            info!("Update of existing stack instances - no update to perform");
            return Ok(InstancesOutcome::NoNewAccounts);
        }
        info!("New accounts to manage : {new_accounts:?}");

        let request = CreateInstancesRequest {
            stack_set_name: self.name().to_string(),
            accounts: new_accounts.clone(),
            regions: vec![self.descriptor.region().to_string()],
            preferences,
        };
        let operation_id = self
            .cfn
            .create_stack_instances(&request)
            .await
            .map_err(submission_failed)?
            .ok_or_else(|| missing_operation("CreateStackInstances"))?;
        let status = self
            .await_operation("Creation of new stack instances", &operation_id)
            .await;

        Ok(InstancesOutcome::Added {
            accounts: new_accounts,
            status,
        })
    }

    /// Remove every stack instance (and its stack) but keep the StackSet.
    pub async fn delete_stack_instances(&self) -> Result<InstanceCleanup> {
        let accounts = self.managed_accounts().await?;
        if accounts.is_empty() {
            return Ok(InstanceCleanup::NotNeeded);
        }
        Ok(self.remove_instances(accounts).await)
    }

    async fn remove_instances(&self, accounts: Vec<String>) -> InstanceCleanup {
        let request = DeleteInstancesRequest {
            stack_set_name: self.name().to_string(),
            accounts,
            regions: vec![self.descriptor.region().to_string()],
            retain_stacks: false,
        };
        let operation_id = match self.cfn.delete_stack_instances(&request).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                let e = missing_operation("DeleteStackInstances");
                error!("{e}");
                return InstanceCleanup::NotSubmitted(e.to_string());
            }
            Err(e) => {
                error!("{e}");
                return InstanceCleanup::NotSubmitted(e.to_string());
            }
        };
        let status = self
            .await_operation("Delete stack instances", &operation_id)
            .await;
        InstanceCleanup::Finished(status)
    }

    /// Delete all stack instances, then the StackSet itself.
    ///
    /// Failures are logged rather than returned. The StackSet deletion is
    /// attempted even when instance removal did not succeed; the provider
    /// rejects it if instances remain.
    pub async fn delete(&self) -> DeleteReport {
        let instances = match self.managed_accounts().await {
            Ok(accounts) if accounts.is_empty() => InstanceCleanup::NotNeeded,
            Ok(accounts) => self.remove_instances(accounts).await,
            Err(e) => {
                error!("{e}");
                InstanceCleanup::NotSubmitted(e.to_string())
            }
        };

        let stack_set_deleted = match self.cfn.delete_stack_set(self.name()).await {
            Ok(()) => true,
            Err(e) => {
                error!("{e}");
                false
            }
        };

        DeleteReport {
            instances,
            stack_set_deleted,
        }
    }
}

fn distinct(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

/// `requested − managed`, keeping the order of `requested`.
fn accounts_to_add(requested: &[String], managed: &[String]) -> Vec<String> {
    distinct(
        requested
            .iter()
            .filter(|a| !managed.contains(a))
            .cloned(),
    )
}
