//! Statistics Aggregator
//!
//! Per-tenant counts over a filtered set of work orders. The store projects
//! the rows; everything below is a pure fold over them.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::LifecycleResult;
use crate::sla::is_overdue_at;
use crate::state::{
    Priority, SharedWorkOrderStore, StatsQuery, StatsRow, TenantId, WorkOrderStatus,
};

/// Half-open `created_at` window: `from` inclusive, `to` exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// Statistics selection as received from the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsFilter {
    pub tenant_id: TenantId,
    #[serde(default)]
    pub status: Option<WorkOrderStatus>,
    #[serde(default)]
    pub priority: Option<Priority>,
    /// Raw identifier; malformed values select nothing
    #[serde(default)]
    pub assignee_id: Option<String>,
    /// Raw identifier; malformed values select nothing
    #[serde(default)]
    pub property_id: Option<String>,
    #[serde(default)]
    pub date_range: Option<DateRange>,
}

impl StatsFilter {
    pub fn tenant(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            status: None,
            priority: None,
            assignee_id: None,
            property_id: None,
            date_range: None,
        }
    }

    /// Resolve into a store query, or `None` when an identifier is malformed
    pub fn to_query(&self) -> Option<StatsQuery> {
        let parse = |raw: &Option<String>| match raw {
            Some(raw) => Uuid::parse_str(raw.trim()).map(Some).ok(),
            None => Some(None),
        };

        Some(StatsQuery {
            tenant_id: self.tenant_id,
            status: self.status,
            priority: self.priority,
            assignee_id: parse(&self.assignee_id)?,
            property_id: parse(&self.property_id)?,
            created_from: self.date_range.map(|r| r.from),
            created_to: self.date_range.map(|r| r.to),
        })
    }
}

/// Aggregate view over a tenant's work orders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub total: u64,
    pub by_status: BTreeMap<WorkOrderStatus, u64>,
    pub by_priority: BTreeMap<Priority, u64>,
    pub overdue: u64,
    pub completed_this_week: u64,
    pub completed_this_month: u64,
    /// Mean of `completed_at - created_at`; 0.0 when nothing has completed
    pub average_resolution_hours: f64,
}

impl Stats {
    /// All counters zero, every status and priority key present
    pub fn empty() -> Self {
        Self {
            total: 0,
            by_status: WorkOrderStatus::ALL.into_iter().map(|s| (s, 0)).collect(),
            by_priority: Priority::ALL.into_iter().map(|p| (p, 0)).collect(),
            overdue: 0,
            completed_this_week: 0,
            completed_this_month: 0,
            average_resolution_hours: 0.0,
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::empty()
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// Monday 00:00 UTC of the week containing `now`
pub fn week_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive();
    let back = i64::from(today.weekday().num_days_from_monday());
    midnight(today - Duration::days(back))
}

/// The 1st 00:00 UTC of the month containing `now`
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive();
    midnight(today.with_day(1).unwrap_or(today))
}

/// Fold projected rows into [`Stats`] as of `now`
pub fn summarize(rows: &[StatsRow], now: DateTime<Utc>) -> Stats {
    let week = week_start(now);
    let month = month_start(now);
    let mut stats = Stats::empty();
    let mut resolution_hours = Vec::new();

    for row in rows {
        stats.total += 1;
        *stats.by_status.entry(row.status).or_default() += 1;
        *stats.by_priority.entry(row.priority).or_default() += 1;

        if is_overdue_at(row.resolution_deadline, row.status, now) {
            stats.overdue += 1;
        }
        if let Some(done) = row.completed_at {
            if done >= week {
                stats.completed_this_week += 1;
            }
            if done >= month {
                stats.completed_this_month += 1;
            }
            resolution_hours.push((done - row.created_at).num_seconds() as f64 / 3600.0);
        }
    }

    if !resolution_hours.is_empty() {
        stats.average_resolution_hours =
            resolution_hours.iter().sum::<f64>() / resolution_hours.len() as f64;
    }
    stats
}

#[derive(Clone)]
pub struct StatsAggregator {
    store: SharedWorkOrderStore,
}

impl StatsAggregator {
    pub fn new(store: SharedWorkOrderStore) -> Self {
        Self { store }
    }

    pub async fn get_stats(&self, filter: &StatsFilter) -> LifecycleResult<Stats> {
        self.get_stats_at(filter, Utc::now()).await
    }

    /// [`get_stats`](Self::get_stats) evaluated against a fixed clock
    pub async fn get_stats_at(
        &self,
        filter: &StatsFilter,
        now: DateTime<Utc>,
    ) -> LifecycleResult<Stats> {
        let Some(query) = filter.to_query() else {
            debug!(tenant_id = %filter.tenant_id, "Malformed stats filter, returning empty stats");
            return Ok(Stats::empty());
        };

        let rows = self.store.aggregate(&query).await?;
        debug!(tenant_id = %filter.tenant_id, rows = rows.len(), "Aggregated work orders");
        Ok(summarize(&rows, now))
    }
}
