use crate::provider::{CloudFormation, OperationStatus};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

pub const CHECK_INTERVAL: Duration = Duration::from_millis(1000);

/// Source of the delay between two status queries.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, interval: Duration);
}

pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, interval: Duration) {
        tokio::time::sleep(interval).await;
    }
}

/// Waits for StackSet operations to leave their in-flight states.
///
/// There is no deadline and no cancellation: the loop ends only when the
/// provider reports a terminal status or a status query fails. Interrupting
/// the process leaves the provider-side operation running.
#[derive(Clone)]
pub struct OperationPoller {
    cfn: Arc<dyn CloudFormation>,
    pacer: Arc<dyn Pacer>,
    interval: Duration,
}

impl OperationPoller {
    pub fn new(cfn: Arc<dyn CloudFormation>, pacer: Arc<dyn Pacer>) -> Self {
        Self {
            cfn,
            pacer,
            interval: CHECK_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Poll `operation_id` until it is terminal.
    ///
    /// A failed query counts as `FAILED`; it is not retried.
    pub async fn wait(&self, stack_set_name: &str, operation_id: &str) -> OperationStatus {
        let mut status = OperationStatus::Running;
        while status.is_in_flight() {
            self.pacer.pause(self.interval).await;
            status = match self
                .cfn
                .describe_stack_set_operation(stack_set_name, operation_id)
                .await
            {
                Ok(s) => s,
                Err(e) => {
                    error!("{e}");
                    return OperationStatus::Failed;
                }
            };
            debug!(operation_id, %status, "operation status");
        }
        status
    }
}
