use crate::error::Result;
use crate::provider::{CloudFormation, StackSetSummary};

pub async fn list_stack_sets(cfn: &dyn CloudFormation) -> Result<Vec<StackSetSummary>> {
    Ok(cfn.list_stack_sets().await?)
}
