use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

use crate::aws;
use crate::config::{self, DescriptorOptions, StackSetDescriptor};
use crate::identity;
use crate::lister;
use crate::logging::LogLevel;
use crate::poller::TokioPacer;
use crate::provider::{CloudFormation, OperationPreferences};
use crate::stackset::{InstanceCleanup, InstancesOutcome, StackSet};

#[derive(Debug, Parser)]
#[command(name = "stackset", version, about = "Manage AWS CloudFormation StackSets")]
pub struct RootCmd {
    /// AWS region to operate in
    #[arg(long, global = true, env = "AWS_REGION", default_value = config::DEFAULT_REGION)]
    pub region: String,

    /// Minimum severity of log lines written to stderr
    #[arg(
        long,
        global = true,
        env = "LOG_LEVEL",
        value_enum,
        ignore_case = true,
        default_value = "ERROR"
    )]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Args)]
pub struct TemplateArgs {
    #[arg(short = 's', long = "stackset-name")]
    pub stackset_name: String,

    /// Local file containing the body of the StackSet
    #[arg(short = 'f', long = "stackset-file")]
    pub stackset_file: PathBuf,

    /// Administration role; must exist in the administration account
    #[arg(short = 'a', long, default_value = config::DEFAULT_ADMIN_ROLE)]
    pub admin_role: String,

    /// Execution role; must exist in each managed account
    #[arg(short = 'e', long, default_value = config::DEFAULT_EXEC_ROLE)]
    pub exec_role: String,

    /// Tags of the StackSet. Format: key=value,key2=value2
    #[arg(short = 't', long)]
    pub tags: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a StackSet, or update it if it already exists
    #[command(alias = "cs")]
    CreateStackset {
        #[command(flatten)]
        template: TemplateArgs,

        /// Update even if the live StackSet already matches
        #[arg(long)]
        force: bool,

        #[arg(long, default_value_t = config::DEFAULT_FAILURE_COUNT)]
        failure_count: i32,

        #[arg(long, default_value_t = config::DEFAULT_MAX_CONCURRENT)]
        max_concurrent: i32,
    },

    /// Update an existing StackSet, leaving operation preferences to the provider
    #[command(alias = "us")]
    UpdateStackset {
        #[command(flatten)]
        template: TemplateArgs,
    },

    /// Delete a StackSet and all of its stack instances
    #[command(alias = "ds")]
    DeleteStackset {
        #[arg(short = 's', long = "stackset-name")]
        stackset_name: String,
    },

    /// List accounts managed by a StackSet (its stack instances)
    #[command(alias = "lma")]
    ListManagedAccounts {
        #[arg(short = 's', long = "stackset-name")]
        stackset_name: String,

        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// List StackSets
    #[command(alias = "ls")]
    ListStacksets {
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Register accounts to be managed by a StackSet
    #[command(alias = "asi")]
    AddStackInstances {
        #[arg(short = 's', long = "stackset-name")]
        stackset_name: String,

        /// Comma-separated account ids
        #[arg(short = 'a', long, value_delimiter = ',', required = true)]
        accounts: Vec<String>,

        #[arg(short = 'f', long, default_value_t = config::DEFAULT_FAILURE_COUNT)]
        failure_count: i32,

        #[arg(short = 'm', long, default_value_t = config::DEFAULT_MAX_CONCURRENT)]
        max_concurrent: i32,
    },

    /// Delete every stack instance of a StackSet, keeping the StackSet
    #[command(alias = "dsi")]
    DeleteStackInstances {
        #[arg(short = 's', long = "stackset-name")]
        stackset_name: String,
    },

    /// Generate shell completion scripts
    Completion {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

struct Aws {
    shared: aws_config::SdkConfig,
    cfn: Arc<dyn CloudFormation>,
}

impl Aws {
    async fn connect(region: &str) -> Self {
        let shared = aws::load_config(region).await;
        let cfn: Arc<dyn CloudFormation> = Arc::new(aws::CloudFormationClient::new(&shared));
        Self { shared, cfn }
    }

    fn stack_set(&self, descriptor: StackSetDescriptor) -> StackSet {
        StackSet::new(descriptor, self.cfn.clone(), Arc::new(TokioPacer))
    }

    async fn account_number(&self) -> Result<String> {
        let sts = aws::StsClient::new(&self.shared);
        identity::resolve_account_number(&sts)
            .await
            .context("resolve account number")
    }
}

async fn apply(
    aws: &Aws,
    region: String,
    template: TemplateArgs,
    force: bool,
    preferences: Option<OperationPreferences>,
) -> Result<()> {
    let account_number = aws.account_number().await?;
    let descriptor = StackSetDescriptor::new(DescriptorOptions {
        name: template.stackset_name,
        region,
        account_number: Some(account_number),
        admin_role: Some(template.admin_role),
        exec_role: Some(template.exec_role),
        tags: template.tags,
        force,
        failure_tolerance_count: preferences.map(|p| p.failure_tolerance_count),
        max_concurrent_count: preferences.map(|p| p.max_concurrent_count),
    })?;

    let outcome = aws
        .stack_set(descriptor)
        .create_or_update(&template.stackset_file)
        .await?;
    match outcome.status() {
        None => println!("No update to perform."),
        Some(status) => println!("{status}"),
    }
    Ok(())
}

pub async fn run(root: RootCmd) -> Result<()> {
    let region = root.region;
    match root.cmd {
        Command::Completion { shell } => {
            let mut cmd = RootCmd::command();
            clap_complete::generate(shell, &mut cmd, "stackset", &mut std::io::stdout());
            Ok(())
        }
        Command::CreateStackset {
            template,
            force,
            failure_count,
            max_concurrent,
        } => {
            let aws = Aws::connect(&region).await;
            let preferences = OperationPreferences {
                failure_tolerance_count: failure_count,
                max_concurrent_count: max_concurrent,
            };
            apply(&aws, region, template, force, Some(preferences)).await
        }
        Command::UpdateStackset { template } => {
            let aws = Aws::connect(&region).await;
            apply(&aws, region, template, false, None).await
        }
        Command::DeleteStackset { stackset_name } => {
            let aws = Aws::connect(&region).await;
            let report = aws
                .stack_set(StackSetDescriptor::named(stackset_name, region)?)
                .delete()
                .await;
            print_cleanup(&report.instances);
            if report.stack_set_deleted {
                println!("StackSet deleted.");
            } else {
                println!("StackSet deletion failed.");
            }
            Ok(())
        }
        Command::ListManagedAccounts {
            stackset_name,
            format,
        } => {
            let aws = Aws::connect(&region).await;
            let stack_set = aws.stack_set(StackSetDescriptor::named(stackset_name, region)?);
            let accounts = stack_set
                .managed_accounts()
                .await
                .context("list managed accounts")?;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&accounts)?);
                }
                OutputFormat::Text => {
                    println!(
                        "Managed accounts by StackSet {}: ",
                        stack_set.descriptor().name()
                    );
                    for account in accounts {
                        println!("{account}");
                    }
                }
            }
            Ok(())
        }
        Command::ListStacksets { format } => {
            let aws = Aws::connect(&region).await;
            let stack_sets = lister::list_stack_sets(aws.cfn.as_ref())
                .await
                .context("list stacksets")?;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&stack_sets)?);
                }
                OutputFormat::Text => {
                    println!("StackSets : ");
                    for s in stack_sets {
                        println!("{} - {} - {}", s.name, s.status, s.id);
                    }
                }
            }
            Ok(())
        }
        Command::AddStackInstances {
            stackset_name,
            accounts,
            failure_count,
            max_concurrent,
        } => {
            let aws = Aws::connect(&region).await;
            let descriptor = StackSetDescriptor::new(DescriptorOptions {
                name: stackset_name,
                region,
                failure_tolerance_count: Some(failure_count),
                max_concurrent_count: Some(max_concurrent),
                ..Default::default()
            })?;
            let preferences = descriptor.preferences().unwrap_or_default();
            let accounts: Vec<String> = accounts
                .into_iter()
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .collect();
            let outcome = aws
                .stack_set(descriptor)
                .update_stack_instances(&accounts, preferences)
                .await?;
            match outcome {
                InstancesOutcome::NoNewAccounts => println!("No new accounts to manage."),
                InstancesOutcome::Added { accounts, status } => {
                    println!("Added stack instances for {}: {status}", accounts.join(","));
                }
            }
            Ok(())
        }
        Command::DeleteStackInstances { stackset_name } => {
            let aws = Aws::connect(&region).await;
            let cleanup = aws
                .stack_set(StackSetDescriptor::named(stackset_name, region)?)
                .delete_stack_instances()
                .await?;
            print_cleanup(&cleanup);
            Ok(())
        }
    }
}

fn print_cleanup(cleanup: &InstanceCleanup) {
    match cleanup {
        InstanceCleanup::NotNeeded => println!("No stack instances to delete."),
        InstanceCleanup::Finished(status) => println!("Stack instances deletion: {status}"),
        InstanceCleanup::NotSubmitted(reason) => {
            println!("Stack instances deletion not submitted: {reason}")
        }
    }
}
