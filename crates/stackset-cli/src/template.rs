use crate::error::{Result, StackSetError};
use std::path::Path;

/// Read a template verbatim; the body is never parsed or normalised.
pub async fn read_template(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| StackSetError::TemplateRead {
            path: path.to_path_buf(),
            source,
        })
}
