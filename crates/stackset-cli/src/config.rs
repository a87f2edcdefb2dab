use crate::error::{Result, StackSetError};
use crate::provider::OperationPreferences;
use crate::tags::{self, Tag};

pub const DEFAULT_REGION: &str = "eu-west-1";
pub const DEFAULT_ADMIN_ROLE: &str = "AWSCloudFormationStackSetAdministrationRole";
pub const DEFAULT_EXEC_ROLE: &str = "AWSCloudFormationStackSetExecutionRole";
pub const DEFAULT_FAILURE_COUNT: i32 = 0;
pub const DEFAULT_MAX_CONCURRENT: i32 = 2;

/// Raw inputs for a [`StackSetDescriptor`], as collected from the command line.
#[derive(Debug, Clone, Default)]
pub struct DescriptorOptions {
    pub name: String,
    pub region: String,
    pub account_number: Option<String>,
    pub admin_role: Option<String>,
    pub exec_role: Option<String>,
    /// `key=value,key2=value2`
    pub tags: Option<String>,
    pub force: bool,
    pub failure_tolerance_count: Option<i32>,
    pub max_concurrent_count: Option<i32>,
}

/// Validated, immutable description of the StackSet an invocation targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackSetDescriptor {
    name: String,
    region: String,
    account_number: Option<String>,
    admin_role: String,
    exec_role: String,
    tags: Vec<Tag>,
    force: bool,
    preferences: Option<OperationPreferences>,
}

fn role_or_default(role: Option<String>, default: &str) -> String {
    role.filter(|r| !r.is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl StackSetDescriptor {
    pub fn new(opts: DescriptorOptions) -> Result<Self> {
        let name = opts.name.trim().to_string();
        if name.is_empty() {
            return Err(StackSetError::InvalidDescriptor(
                "stackset name must not be empty".to_string(),
            ));
        }
        let region = if opts.region.is_empty() {
            DEFAULT_REGION.to_string()
        } else {
            opts.region
        };
        // Absent when neither count was given; the provider then applies its own.
        let preferences = match (opts.failure_tolerance_count, opts.max_concurrent_count) {
            (None, None) => None,
            (failure, max) => Some(OperationPreferences {
                failure_tolerance_count: failure.unwrap_or(DEFAULT_FAILURE_COUNT),
                max_concurrent_count: max.unwrap_or(DEFAULT_MAX_CONCURRENT),
            }),
        };
        if let Some(p) = preferences {
            if p.failure_tolerance_count < 0 || p.max_concurrent_count < 1 {
                return Err(StackSetError::InvalidDescriptor(format!(
                    "failure count must be >= 0 and max concurrent >= 1 (got {} and {})",
                    p.failure_tolerance_count, p.max_concurrent_count
                )));
            }
        }

        Ok(Self {
            name,
            region,
            account_number: opts.account_number.filter(|a| !a.is_empty()),
            admin_role: role_or_default(opts.admin_role, DEFAULT_ADMIN_ROLE),
            exec_role: role_or_default(opts.exec_role, DEFAULT_EXEC_ROLE),
            tags: tags::encode(opts.tags.as_deref()),
            force: opts.force,
            preferences,
        })
    }

    /// Descriptor for commands that only need to address an existing StackSet.
    pub fn named(name: impl Into<String>, region: impl Into<String>) -> Result<Self> {
        Self::new(DescriptorOptions {
            name: name.into(),
            region: region.into(),
            ..Default::default()
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn exec_role(&self) -> &str {
        &self.exec_role
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn force(&self) -> bool {
        self.force
    }

    pub fn preferences(&self) -> Option<OperationPreferences> {
        self.preferences
    }

    pub fn admin_role_arn(&self) -> Result<String> {
        let account = self
            .account_number
            .as_deref()
            .ok_or(StackSetError::MissingAccountNumber)?;
        Ok(format!("arn:aws:iam::{account}:role/{}", self.admin_role))
    }
}
