use crate::error::ProviderError;
use crate::provider::{
    CallerIdentity, CloudFormation, CreateInstancesRequest, DeleteInstancesRequest, LiveStackSet,
    OperationId, OperationPreferences, OperationStatus, ProviderResult, StackInstance,
    StackSetRequest, StackSetSummary,
};
use crate::tags::Tag;
use async_trait::async_trait;
use aws_sdk_cloudformation::error::DisplayErrorContext;
use aws_sdk_cloudformation::types as cfn;
use aws_types::region::Region;

/// Shared SDK config for `region`, using the ambient credential chain.
pub async fn load_config(region: &str) -> aws_config::SdkConfig {
    aws_config::from_env()
        .region(Region::new(region.to_string()))
        .load()
        .await
}

fn provider_err<E: std::error::Error>(action: &'static str, err: E) -> ProviderError {
    ProviderError::new(action, DisplayErrorContext(err).to_string())
}

fn to_sdk_tags(tags: &[Tag]) -> Vec<cfn::Tag> {
    tags.iter()
        .map(|t| cfn::Tag::builder().key(&t.key).value(&t.value).build())
        .collect()
}

fn from_sdk_tag(tag: &cfn::Tag) -> Tag {
    Tag::new(
        tag.key().unwrap_or_default(),
        tag.value().unwrap_or_default(),
    )
}

fn to_sdk_preferences(prefs: OperationPreferences) -> cfn::StackSetOperationPreferences {
    cfn::StackSetOperationPreferences::builder()
        .failure_tolerance_count(prefs.failure_tolerance_count)
        .max_concurrent_count(prefs.max_concurrent_count)
        .build()
}

fn to_sdk_capabilities(capabilities: &[String]) -> Vec<cfn::Capability> {
    capabilities
        .iter()
        .map(|c| cfn::Capability::from(c.as_str()))
        .collect()
}

pub struct CloudFormationClient {
    client: aws_sdk_cloudformation::Client,
}

impl CloudFormationClient {
    pub fn new(shared: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_cloudformation::Client::new(shared),
        }
    }
}

#[async_trait]
impl CloudFormation for CloudFormationClient {
    async fn describe_stack_set(&self, name: &str) -> ProviderResult<LiveStackSet> {
        let out = self
            .client
            .describe_stack_set()
            .stack_set_name(name)
            .send()
            .await
            .map_err(|e| provider_err("DescribeStackSet", e))?;
        let ss = out.stack_set().ok_or_else(|| {
            ProviderError::new("DescribeStackSet", format!("no StackSet returned for {name}"))
        })?;
        Ok(LiveStackSet {
            administration_role_arn: ss.administration_role_arn().map(str::to_string),
            execution_role_name: ss.execution_role_name().map(str::to_string),
            template_body: ss.template_body().map(str::to_string),
            tags: ss.tags().iter().map(from_sdk_tag).collect(),
            status: ss.status().map(|s| s.as_str().to_string()),
        })
    }

    async fn create_stack_set(&self, req: &StackSetRequest) -> ProviderResult<Option<OperationId>> {
        let out = self
            .client
            .create_stack_set()
            .stack_set_name(&req.stack_set_name)
            .administration_role_arn(&req.administration_role_arn)
            .execution_role_name(&req.execution_role_name)
            .template_body(&req.template_body)
            .set_capabilities(Some(to_sdk_capabilities(&req.capabilities)))
            .set_tags(Some(to_sdk_tags(&req.tags)))
            .send()
            .await
            .map_err(|e| provider_err("CreateStackSet", e))?;
        tracing::debug!(stack_set_id = out.stack_set_id().unwrap_or_default(), "stackset created");
        Ok(None)
    }

    async fn update_stack_set(&self, req: &StackSetRequest) -> ProviderResult<Option<OperationId>> {
        let out = self
            .client
            .update_stack_set()
            .stack_set_name(&req.stack_set_name)
            .administration_role_arn(&req.administration_role_arn)
            .execution_role_name(&req.execution_role_name)
            .template_body(&req.template_body)
            .set_capabilities(Some(to_sdk_capabilities(&req.capabilities)))
            .set_tags(Some(to_sdk_tags(&req.tags)))
            .set_operation_preferences(req.preferences.map(to_sdk_preferences))
            .send()
            .await
            .map_err(|e| provider_err("UpdateStackSet", e))?;
        Ok(out.operation_id().map(str::to_string))
    }

    async fn delete_stack_set(&self, name: &str) -> ProviderResult<()> {
        self.client
            .delete_stack_set()
            .stack_set_name(name)
            .send()
            .await
            .map_err(|e| provider_err("DeleteStackSet", e))?;
        Ok(())
    }

    async fn list_stack_instances(&self, name: &str) -> ProviderResult<Vec<StackInstance>> {
        let mut instances = Vec::new();
        let mut next = None;
        loop {
            let out = self
                .client
                .list_stack_instances()
                .stack_set_name(name)
                .set_next_token(next.take())
                .send()
                .await
                .map_err(|e| provider_err("ListStackInstances", e))?;
            for s in out.summaries() {
                instances.push(StackInstance {
                    account: s.account().unwrap_or_default().to_string(),
                    region: s.region().unwrap_or_default().to_string(),
                    stack_id: s.stack_id().map(str::to_string),
                    status: s.status().map(|st| st.as_str().to_string()),
                });
            }
            match out.next_token() {
                Some(t) if !t.is_empty() => next = Some(t.to_string()),
                _ => break,
            }
        }
        Ok(instances)
    }

    async fn create_stack_instances(
        &self,
        req: &CreateInstancesRequest,
    ) -> ProviderResult<Option<OperationId>> {
        let out = self
            .client
            .create_stack_instances()
            .stack_set_name(&req.stack_set_name)
            .set_accounts(Some(req.accounts.clone()))
            .set_regions(Some(req.regions.clone()))
            .operation_preferences(to_sdk_preferences(req.preferences))
            .send()
            .await
            .map_err(|e| provider_err("CreateStackInstances", e))?;
        Ok(out.operation_id().map(str::to_string))
    }

    async fn delete_stack_instances(
        &self,
        req: &DeleteInstancesRequest,
    ) -> ProviderResult<Option<OperationId>> {
        let out = self
            .client
            .delete_stack_instances()
            .stack_set_name(&req.stack_set_name)
            .set_accounts(Some(req.accounts.clone()))
            .set_regions(Some(req.regions.clone()))
            .retain_stacks(req.retain_stacks)
            .send()
            .await
            .map_err(|e| provider_err("DeleteStackInstances", e))?;
        Ok(out.operation_id().map(str::to_string))
    }

    async fn describe_stack_set_operation(
        &self,
        name: &str,
        operation_id: &str,
    ) -> ProviderResult<OperationStatus> {
        let out = self
            .client
            .describe_stack_set_operation()
            .stack_set_name(name)
            .operation_id(operation_id)
            .send()
            .await
            .map_err(|e| provider_err("DescribeStackSetOperation", e))?;
        let status = out
            .stack_set_operation()
            .and_then(|op| op.status())
            .ok_or_else(|| {
                ProviderError::new(
                    "DescribeStackSetOperation",
                    format!("operation {operation_id} has no status"),
                )
            })?;
        Ok(OperationStatus::parse(status.as_str()))
    }

    async fn list_stack_sets(&self) -> ProviderResult<Vec<StackSetSummary>> {
        let mut summaries = Vec::new();
        let mut next = None;
        loop {
            let out = self
                .client
                .list_stack_sets()
                .set_next_token(next.take())
                .send()
                .await
                .map_err(|e| provider_err("ListStackSets", e))?;
            for s in out.summaries() {
                summaries.push(StackSetSummary {
                    name: s.stack_set_name().unwrap_or_default().to_string(),
                    status: s.status().map(|st| st.as_str()).unwrap_or("-").to_string(),
                    id: s.stack_set_id().unwrap_or_default().to_string(),
                });
            }
            match out.next_token() {
                Some(t) if !t.is_empty() => next = Some(t.to_string()),
                _ => break,
            }
        }
        Ok(summaries)
    }
}

pub struct StsClient {
    client: aws_sdk_sts::Client,
}

impl StsClient {
    pub fn new(shared: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_sts::Client::new(shared),
        }
    }
}

#[async_trait]
impl CallerIdentity for StsClient {
    async fn caller_account(&self) -> ProviderResult<Option<String>> {
        let ident = self
            .client
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| provider_err("GetCallerIdentity", e))?;
        Ok(ident.account().map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_map_to_sdk_shape() {
        let tags = to_sdk_tags(&[Tag::new("team", "platform"), Tag::new("env", "")]);
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].key(), Some("team"));
        assert_eq!(tags[0].value(), Some("platform"));
        assert_eq!(tags[1].value(), Some(""));
    }

    #[test]
    fn live_tags_without_fields_map_to_empty_strings() {
        let full = cfn::Tag::builder().key("team").value("platform").build();
        assert_eq!(from_sdk_tag(&full), Tag::new("team", "platform"));
        let bare = cfn::Tag::builder().build();
        assert_eq!(from_sdk_tag(&bare), Tag::new("", ""));
    }

    #[test]
    fn named_iam_capability_is_recognised() {
        let caps = to_sdk_capabilities(&["CAPABILITY_NAMED_IAM".to_string()]);
        assert_eq!(caps, vec![cfn::Capability::CapabilityNamedIam]);
    }

    #[test]
    fn preferences_carry_counts() {
        let prefs = to_sdk_preferences(OperationPreferences {
            failure_tolerance_count: 1,
            max_concurrent_count: 4,
        });
        assert_eq!(prefs.failure_tolerance_count(), Some(1));
        assert_eq!(prefs.max_concurrent_count(), Some(4));
    }
}
