use crate::provider::LiveStackSet;
use crate::tags::{self, Tag};
use tracing::info;

/// The parts of a StackSet this tool owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredStackSet {
    pub admin_role_arn: String,
    pub exec_role: String,
    pub template_body: String,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    AdministrationRoleArn,
    ExecutionRoleName,
    TemplateBody,
    Tags,
}

impl Field {
    fn label(self) -> &'static str {
        match self {
            Field::AdministrationRoleArn => "AdministrationRoleARN",
            Field::ExecutionRoleName => "ExecutionRoleName",
            Field::TemplateBody => "TemplateBody",
            Field::Tags => "Tags",
        }
    }
}

/// Every field on which `live` departs from `desired`, in comparison order.
/// Each difference is logged.
pub fn differences(desired: &DesiredStackSet, live: &LiveStackSet) -> Vec<Field> {
    let checks = [
        (
            Field::AdministrationRoleArn,
            live.administration_role_arn.as_deref() == Some(desired.admin_role_arn.as_str()),
        ),
        (
            Field::ExecutionRoleName,
            live.execution_role_name.as_deref() == Some(desired.exec_role.as_str()),
        ),
        // Byte-for-byte: whitespace changes count.
        (
            Field::TemplateBody,
            live.template_body.as_deref() == Some(desired.template_body.as_str()),
        ),
        (Field::Tags, tags::equals(&desired.tags, &live.tags)),
    ];

    checks
        .into_iter()
        .filter(|(_, same)| !same)
        .map(|(field, _)| {
            info!("{} are different", field.label());
            field
        })
        .collect()
}

pub fn is_equal(desired: &DesiredStackSet, live: &LiveStackSet) -> bool {
    differences(desired, live).is_empty()
}
