use crate::error::{Result, StackSetError};
use crate::provider::CallerIdentity;
use tracing::debug;

/// Account id of the ambient credentials (STS GetCallerIdentity).
pub async fn resolve_account_number(identity: &dyn CallerIdentity) -> Result<String> {
    let account = identity
        .caller_account()
        .await
        .map_err(|e| StackSetError::IdentityUnavailable(e.to_string()))?
        .unwrap_or_default();
    if account.is_empty() {
        return Err(StackSetError::IdentityUnavailable(
            "GetCallerIdentity returned no account".to_string(),
        ));
    }
    debug!(%account, "resolved caller account");
    Ok(account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::provider::ProviderResult;
    use async_trait::async_trait;

    struct StaticIdentity(ProviderResult<Option<String>>);

    #[async_trait]
    impl CallerIdentity for StaticIdentity {
        async fn caller_account(&self) -> ProviderResult<Option<String>> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn returns_account() {
        let id = StaticIdentity(Ok(Some("123456789012".into())));
        assert_eq!(resolve_account_number(&id).await.unwrap(), "123456789012");
    }

    #[tokio::test]
    async fn call_failure_is_identity_unavailable() {
        let id = StaticIdentity(Err(ProviderError::new("GetCallerIdentity", "expired token")));
        let err = resolve_account_number(&id).await.unwrap_err();
        assert!(matches!(err, StackSetError::IdentityUnavailable(ref m) if m.contains("expired token")));
    }

    #[tokio::test]
    async fn empty_account_is_rejected() {
        for answer in [None, Some(String::new())] {
            let id = StaticIdentity(Ok(answer));
            assert!(matches!(
                resolve_account_number(&id).await,
                Err(StackSetError::IdentityUnavailable(_))
            ));
        }
    }
}
