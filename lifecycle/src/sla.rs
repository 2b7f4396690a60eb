//! SLA Calculator: priority budgets, deadlines and overdue checks
//!
//! Pure and deterministic: nothing here touches the store or the clock unless
//! the caller asks for "now". Deadlines are a flat offset from the order's
//! creation time; there is no business-hours calendar.
//!
//! ```text
//! critical   4h   response 24m
//! high       8h   response 48m
//! medium    24h   response 2h24m
//! low       72h   response 7h12m
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::state::{Priority, WorkOrder, WorkOrderStatus};

/// Response and resolution budgets for one priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaBudget {
    pub response_time_minutes: u32,
    pub resolution_time_minutes: u32,
}

/// SLA snapshot stored on a work order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaInfo {
    pub response_time_minutes: u32,
    pub resolution_time_minutes: u32,
    pub response_deadline: DateTime<Utc>,
    pub resolution_deadline: DateTime<Utc>,
}

/// Per-priority resolution budgets
///
/// Organizations can supply their own policy; the contract stays the same.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlaPolicy {
    pub critical_hours: u32,
    pub high_hours: u32,
    pub medium_hours: u32,
    pub low_hours: u32,
    /// Response budget as a percentage of the resolution budget
    pub response_percent: u32,
}

impl Default for SlaPolicy {
    fn default() -> Self {
        Self {
            critical_hours: 4,
            high_hours: 8,
            medium_hours: 24,
            low_hours: 72,
            response_percent: 10,
        }
    }
}

impl SlaPolicy {
    /// Resolution budget in hours for a priority
    pub fn resolution_hours(&self, priority: Priority) -> u32 {
        match priority {
            Priority::Critical => self.critical_hours,
            Priority::High => self.high_hours,
            Priority::Medium => self.medium_hours,
            Priority::Low => self.low_hours,
        }
    }

    /// Budgets for a priority
    pub fn budget(&self, priority: Priority) -> SlaBudget {
        let resolution = self.resolution_hours(priority).saturating_mul(60);
        SlaBudget {
            response_time_minutes: resolution.saturating_mul(self.response_percent) / 100,
            resolution_time_minutes: resolution,
        }
    }

    /// Resolution deadline measured from creation
    pub fn deadline(&self, priority: Priority, created_at: DateTime<Utc>) -> DateTime<Utc> {
        created_at + Duration::minutes(i64::from(self.budget(priority).resolution_time_minutes))
    }

    /// Full SLA snapshot for a priority, anchored at `created_at`
    pub fn compute(&self, priority: Priority, created_at: DateTime<Utc>) -> SlaInfo {
        let budget = self.budget(priority);
        SlaInfo {
            response_time_minutes: budget.response_time_minutes,
            resolution_time_minutes: budget.resolution_time_minutes,
            response_deadline: created_at
                + Duration::minutes(i64::from(budget.response_time_minutes)),
            resolution_deadline: created_at
                + Duration::minutes(i64::from(budget.resolution_time_minutes)),
        }
    }

    /// Budgets must be non-zero and strictly shrink as priority rises.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ladder = [
            (Priority::Low, self.low_hours),
            (Priority::Medium, self.medium_hours),
            (Priority::High, self.high_hours),
            (Priority::Critical, self.critical_hours),
        ];

        if let Some((priority, _)) = ladder.iter().find(|(_, hours)| *hours == 0) {
            return Err(ConfigError::invalid(format!(
                "SLA budget for {} must be greater than zero",
                priority
            )));
        }

        for pair in ladder.windows(2) {
            let (lower, lower_hours) = pair[0];
            let (higher, higher_hours) = pair[1];
            if higher_hours >= lower_hours {
                return Err(ConfigError::invalid(format!(
                    "SLA budget for {} ({}h) must be shorter than {} ({}h)",
                    higher, higher_hours, lower, lower_hours
                )));
            }
        }

        if self.response_percent == 0 || self.response_percent > 100 {
            return Err(ConfigError::invalid(format!(
                "response_percent must be within 1..=100, got {}",
                self.response_percent
            )));
        }

        Ok(())
    }
}

/// Budgets under the default policy
pub fn sla_config(priority: Priority) -> SlaBudget {
    SlaPolicy::default().budget(priority)
}

/// Resolution deadline under the default policy
pub fn deadline(priority: Priority, created_at: DateTime<Utc>) -> DateTime<Utc> {
    SlaPolicy::default().deadline(priority, created_at)
}

/// Whether an order with this deadline and status is overdue right now
pub fn is_overdue(deadline: DateTime<Utc>, status: WorkOrderStatus) -> bool {
    is_overdue_at(deadline, status, Utc::now())
}

/// Whether an order with this deadline and status is overdue at `now`
pub fn is_overdue_at(deadline: DateTime<Utc>, status: WorkOrderStatus, now: DateTime<Utc>) -> bool {
    !status.is_sla_terminal() && now > deadline
}

/// SLA view of a single order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaStatus {
    pub priority: Priority,
    pub response_deadline: DateTime<Utc>,
    pub resolution_deadline: DateTime<Utc>,
    pub is_overdue: bool,
    /// Negative once the deadline has passed
    pub minutes_remaining: i64,
}

impl SlaStatus {
    pub fn of(order: &WorkOrder, now: DateTime<Utc>) -> Self {
        let deadline = order.sla.resolution_deadline;
        Self {
            priority: order.priority,
            response_deadline: order.sla.response_deadline,
            resolution_deadline: deadline,
            is_overdue: is_overdue_at(deadline, order.status, now),
            minutes_remaining: (deadline - now).num_minutes(),
        }
    }
}
