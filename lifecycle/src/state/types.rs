//! Core types for work-order persistence
//!
//! These types are stored by a [`WorkOrderStore`](super::WorkOrderStore) and
//! represent the persistent state of a single work order.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LifecycleError, LifecycleResult};
use crate::sla::{SlaInfo, SlaPolicy};

/// Unique identifier for work orders
pub type WorkOrderId = Uuid;

/// Identifier of the owning organization
pub type TenantId = Uuid;

/// Identifier of an acting or assigned user
pub type UserId = Uuid;

/// Parse a raw identifier coming from the caller.
///
/// Malformed input is an `InvalidIdentifier`, never a not-found.
pub fn parse_identifier(field: &'static str, raw: &str) -> LifecycleResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| LifecycleError::InvalidIdentifier {
        field,
        value: raw.to_string(),
    })
}

/// Error returned when parsing an enumerated value from text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

fn normalize(raw: &str) -> String {
    raw.trim().to_ascii_lowercase().replace(['-', ' '], "_")
}

/// Lifecycle status of a work order
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkOrderStatus {
    /// Raised by intake, not yet triaged
    New,
    /// Being assessed by management or a technician
    Assessment,
    /// Work is underway
    InProgress,
    /// Paused
    OnHold,
    /// Waiting on spare parts
    PendingParts,
    /// Waiting on a quote or cost approval
    PendingApproval,
    /// Field work finished
    WorkComplete,
    /// Costs being posted to finance
    FinancialPosting,
    /// Done; no outgoing edges
    Closed,
    /// Soft-cancelled; can be reinstated
    Cancelled,
}

impl WorkOrderStatus {
    /// Every status, in lifecycle order
    pub const ALL: [WorkOrderStatus; 10] = [
        Self::New,
        Self::Assessment,
        Self::InProgress,
        Self::OnHold,
        Self::PendingParts,
        Self::PendingApproval,
        Self::WorkComplete,
        Self::FinancialPosting,
        Self::Closed,
        Self::Cancelled,
    ];

    /// Whether the SLA clock has stopped for this status.
    pub fn is_sla_terminal(self) -> bool {
        matches!(
            self,
            Self::WorkComplete | Self::FinancialPosting | Self::Closed
        )
    }

    /// Closed and cancelled orders accept no further assignment or escalation
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Closed | Self::Cancelled)
    }

    /// Wire name of the status
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Assessment => "ASSESSMENT",
            Self::InProgress => "IN_PROGRESS",
            Self::OnHold => "ON_HOLD",
            Self::PendingParts => "PENDING_PARTS",
            Self::PendingApproval => "PENDING_APPROVAL",
            Self::WorkComplete => "WORK_COMPLETE",
            Self::FinancialPosting => "FINANCIAL_POSTING",
            Self::Closed => "CLOSED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for WorkOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkOrderStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| ParseEnumError {
                kind: "status",
                value: s.to_string(),
            })
    }
}

/// Work order priority; drives SLA budgets
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Every priority, lowest rank first
    pub const ALL: [Priority; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    /// Numeric rank; higher is more urgent
    pub fn rank(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
            Self::Critical => 3,
        }
    }

    /// The next priority up, or `None` at the top of the ladder
    pub fn next(self) -> Option<Priority> {
        match self {
            Self::Low => Some(Self::Medium),
            Self::Medium => Some(Self::High),
            Self::High => Some(Self::Critical),
            Self::Critical => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| ParseEnumError {
                kind: "priority",
                value: s.to_string(),
            })
    }
}

/// Role of the acting user, as resolved by the session layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    /// Facility-management manager
    Manager,
    PropertyManager,
    Dispatcher,
    Technician,
    /// External vendor staff
    Vendor,
    Finance,
    /// Resident or occupant who raised the request
    Requester,
}

impl Role {
    pub const ALL: [Role; 9] = [
        Self::SuperAdmin,
        Self::Admin,
        Self::Manager,
        Self::PropertyManager,
        Self::Dispatcher,
        Self::Technician,
        Self::Vendor,
        Self::Finance,
        Self::Requester,
    ];

    /// Roles that do the physical work and must be assigned to act on it
    pub fn is_field_worker(self) -> bool {
        matches!(self, Self::Technician | Self::Vendor)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::PropertyManager => "property_manager",
            Self::Dispatcher => "dispatcher",
            Self::Technician => "technician",
            Self::Vendor => "vendor",
            Self::Finance => "finance",
            Self::Requester => "requester",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == wanted)
            .ok_or_else(|| ParseEnumError {
                kind: "role",
                value: s.to_string(),
            })
    }
}

/// Subscription plan of the owning organization
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    Starter,
    Standard,
    Premium,
    Enterprise,
}

impl Plan {
    /// Finance posting ships from the standard plan upwards
    pub fn permits_financial_posting(self) -> bool {
        self >= Self::Standard
    }
}

impl FromStr for Plan {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "starter" => Ok(Self::Starter),
            "standard" => Ok(Self::Standard),
            "premium" => Ok(Self::Premium),
            "enterprise" => Ok(Self::Enterprise),
            _ => Err(ParseEnumError {
                kind: "plan",
                value: s.to_string(),
            }),
        }
    }
}

/// What kind of party a work order is assigned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssigneeKind {
    User,
    Team,
    Vendor,
}

impl AssigneeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Team => "team",
            Self::Vendor => "vendor",
        }
    }
}

impl fmt::Display for AssigneeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssigneeKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "user" => Ok(Self::User),
            "team" => Ok(Self::Team),
            "vendor" => Ok(Self::Vendor),
            _ => Err(ParseEnumError {
                kind: "assignee kind",
                value: s.to_string(),
            }),
        }
    }
}

/// The party a work order is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Assignee {
    pub kind: AssigneeKind,
    pub id: Uuid,
}

/// One entry of the reassignment log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReassignmentEntry {
    /// Assignee before this change, if any
    pub previous: Option<Assignee>,
    pub assignee: Assignee,
    pub reassigned_by: UserId,
    pub reassigned_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Current assignment plus its append-only history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssignmentState {
    pub assigned_to: Option<Assignee>,
    pub assigned_by: Option<UserId>,
    pub assigned_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reassignment_history: Vec<ReassignmentEntry>,
}

/// One recorded status transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: WorkOrderStatus,
    pub to: WorkOrderStatus,
    pub changed_by: UserId,
    pub changed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Source of a communication log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    System,
    Escalation,
    Note,
}

/// Entry in the communication log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunicationUpdate {
    pub kind: UpdateKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<UserId>,
    pub message: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Communication {
    #[serde(default)]
    pub updates: Vec<CommunicationUpdate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkOrderMetrics {
    pub escalation_count: u32,
}

/// Intake payload for a new work order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWorkOrder {
    pub tenant_id: TenantId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub priority: Priority,
    #[serde(default)]
    pub property_id: Option<Uuid>,
    #[serde(default)]
    pub unit_id: Option<Uuid>,
    pub requested_by: UserId,
}

/// The work-order aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub id: WorkOrderId,
    pub tenant_id: TenantId,

    /// Human readable reference, e.g. `WO-20260118-4F2A`
    pub code: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub property_id: Option<Uuid>,
    #[serde(default)]
    pub unit_id: Option<Uuid>,
    pub requested_by: UserId,

    pub status: WorkOrderStatus,
    pub priority: Priority,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,

    /// Derived from `priority` and `created_at`
    pub sla: SlaInfo,

    #[serde(default)]
    pub assignment: AssignmentState,
    #[serde(default)]
    pub status_history: Vec<StatusChange>,
    #[serde(default)]
    pub metrics: WorkOrderMetrics,
    #[serde(default)]
    pub communication: Communication,

    /// Revision counter, bumped on every committed write
    #[serde(default)]
    pub version: u64,
}

impl WorkOrder {
    /// Build a work order in `NEW` from an intake payload
    pub fn new(intake: NewWorkOrder, policy: &SlaPolicy, now: DateTime<Utc>) -> Self {
        let id = Uuid::new_v4();
        let suffix = id.simple().to_string()[..4].to_ascii_uppercase();
        Self {
            id,
            tenant_id: intake.tenant_id,
            code: format!("WO-{}-{}", now.format("%Y%m%d"), suffix),
            title: intake.title,
            description: intake.description,
            category: intake.category,
            property_id: intake.property_id,
            unit_id: intake.unit_id,
            requested_by: intake.requested_by,
            status: WorkOrderStatus::New,
            priority: intake.priority,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
            sla: policy.compute(intake.priority, now),
            assignment: AssignmentState::default(),
            status_history: Vec::new(),
            metrics: WorkOrderMetrics::default(),
            communication: Communication::default(),
            version: 0,
        }
    }

    /// Whether `user_id` is the party currently assigned
    pub fn is_assigned_to(&self, user_id: UserId) -> bool {
        self.assignment
            .assigned_to
            .is_some_and(|assignee| assignee.id == user_id)
    }
}
