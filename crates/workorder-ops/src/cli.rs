//! Command-line surface of `workorder-ops`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use uuid::Uuid;
use workorder_lifecycle::transitions::STATUS_TABLE;
use workorder_lifecycle::{
    AssigneeKind, EngineConfig, GuardContext, NewWorkOrder, Plan, Priority, ResourceContext,
    Role, StatsFilter, WorkOrderService, WorkOrderStatus,
};

use crate::snapshot;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Operate on work orders held in a JSON snapshot", long_about = None)]
pub struct Cli {
    /// Snapshot file holding every work order
    #[arg(long, global = true, default_value = "workorders.json")]
    pub data: PathBuf,

    /// TOML engine configuration (defaults plus WORKORDER_* overrides when absent)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Caller identity flags shared by mutating commands
#[derive(clap::Args, Debug, Clone)]
pub struct Caller {
    #[arg(long)]
    pub tenant: Uuid,
    #[arg(long)]
    pub user: Uuid,
    #[arg(long)]
    pub role: Role,
    #[arg(long)]
    pub plan: Option<Plan>,
    /// Caller does not belong to the owning organization
    #[arg(long, default_value_t = false)]
    pub external: bool,
}

impl Caller {
    fn context(&self) -> ResourceContext {
        let mut ctx = ResourceContext::new(self.tenant, self.user, self.role);
        if let Some(plan) = self.plan {
            ctx = ctx.with_plan(plan);
        }
        if self.external {
            ctx = ctx.external();
        }
        ctx
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Register a new work order in NEW
    Create {
        #[arg(long)]
        tenant: Uuid,
        #[arg(long)]
        title: String,
        #[arg(long)]
        priority: Priority,
        #[arg(long)]
        requested_by: Uuid,
        #[arg(long, default_value = "")]
        category: String,
        #[arg(long)]
        property: Option<Uuid>,
        #[arg(long)]
        unit: Option<Uuid>,
    },
    /// Per-tenant statistics
    Stats {
        #[arg(long)]
        tenant: Uuid,
        #[arg(long)]
        status: Option<WorkOrderStatus>,
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long)]
        property: Option<String>,
        #[arg(long)]
        assignee: Option<String>,
    },
    /// Move a work order to another status
    Transition {
        #[command(flatten)]
        caller: Caller,
        #[arg(long)]
        id: String,
        #[arg(long)]
        to: WorkOrderStatus,
        #[arg(long)]
        reason: Option<String>,
        /// Evidence reference attached to the request (repeatable)
        #[arg(long)]
        evidence: Vec<String>,
    },
    /// Assign a work order to a user, team or vendor
    Assign {
        #[command(flatten)]
        caller: Caller,
        #[arg(long)]
        id: String,
        #[arg(long)]
        assignee: String,
        #[arg(long, default_value = "user")]
        kind: AssigneeKind,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Raise priority one step, or to --target
    Escalate {
        #[command(flatten)]
        caller: Caller,
        #[arg(long)]
        id: String,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        target: Option<Priority>,
    },
    /// Print one work order with its SLA view
    Show {
        #[arg(long)]
        tenant: Uuid,
        #[arg(long)]
        id: String,
    },
    /// Print the status table
    Table,
}

impl Command {
    /// Whether the command writes the snapshot back
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Self::Create { .. } | Self::Transition { .. } | Self::Assign { .. } | Self::Escalate { .. }
        )
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return EngineConfig::from_env().context("invalid WORKORDER_* environment");
    };
    let mut config = EngineConfig::from_file(path)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    config.apply_env();
    config
        .validate()
        .context("invalid WORKORDER_* override of config file")?;
    Ok(config)
}

/// Run one command and return its JSON output
pub async fn run(cli: Cli) -> Result<Value> {
    let config = load_config(cli.config.as_ref())?;
    let store = Arc::new(snapshot::load(&cli.data)?);
    let service = WorkOrderService::with_config(store.clone(), config);

    let output = match &cli.command {
        Command::Create {
            tenant,
            title,
            priority,
            requested_by,
            category,
            property,
            unit,
        } => {
            let order = service
                .create(NewWorkOrder {
                    tenant_id: *tenant,
                    title: title.clone(),
                    description: String::new(),
                    category: category.clone(),
                    priority: *priority,
                    property_id: *property,
                    unit_id: *unit,
                    requested_by: *requested_by,
                })
                .await?;
            serde_json::to_value(order)?
        }
        Command::Stats {
            tenant,
            status,
            priority,
            property,
            assignee,
        } => {
            let filter = StatsFilter {
                tenant_id: *tenant,
                status: *status,
                priority: *priority,
                assignee_id: assignee.clone(),
                property_id: property.clone(),
                date_range: None,
            };
            serde_json::to_value(service.get_stats(&filter).await?)?
        }
        Command::Transition {
            caller,
            id,
            to,
            reason,
            evidence,
        } => {
            let ctx = caller.context();
            // Identity facts are re-derived by the engine; only evidence counts
            let guard = (!evidence.is_empty()).then(|| GuardContext {
                tenant_id: ctx.tenant_id,
                role: ctx.role,
                user_id: ctx.user_id,
                plan: ctx.plan,
                is_org_member: ctx.is_org_member,
                is_assigned_technician: false,
                evidence_attached: evidence.clone(),
            });
            let result = service
                .transition_status(id, *to, &ctx, reason.clone(), guard)
                .await?;
            serde_json::to_value(result)?
        }
        Command::Assign {
            caller,
            id,
            assignee,
            kind,
            notes,
        } => {
            let outcome = service
                .assign(id, assignee, *kind, &caller.context(), notes.clone())
                .await?;
            serde_json::to_value(outcome)?
        }
        Command::Escalate {
            caller,
            id,
            reason,
            target,
        } => {
            let outcome = service
                .escalate(id, &caller.context(), reason, *target)
                .await?;
            serde_json::to_value(outcome)?
        }
        Command::Show { tenant, id } => {
            let order = service.get(id, *tenant).await?;
            let sla = service.sla_status(id, *tenant).await?;
            json!({ "work_order": order, "sla": sla })
        }
        Command::Table => serde_json::to_value(STATUS_TABLE)?,
    };

    if cli.command.is_mutating() {
        snapshot::save(&store, &cli.data)?;
    }
    Ok(output)
}
