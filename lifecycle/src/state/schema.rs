//! Collection and key layout for work-order storage
//!
//! Keys always embed the tenant, so a lookup under the wrong tenant misses
//! the same way a lookup for a nonexistent id does.

/// Collection holding work orders
pub const WORK_ORDERS: &str = "work_orders";

/// Compound key builders
pub mod keys {
    use uuid::Uuid;

    /// Tenant prefix, for scans over one organization
    pub fn tenant_prefix(tenant_id: &Uuid) -> String {
        format!("wo:{}:", tenant_id)
    }

    /// Key of a single work order
    pub fn work_order(tenant_id: &Uuid, work_order_id: &Uuid) -> String {
        format!("wo:{}:{}", tenant_id, work_order_id)
    }
}
