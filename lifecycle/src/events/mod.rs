//! Lifecycle event distribution
//!
//! The service publishes one [`LifecycleEvent`] after every committed write
//! (and one for each rejected transition). Notification dispatch and audit
//! consumers subscribe to the [`EventBus`], optionally through an
//! [`EventFilter`].
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │   Service    │────▶│  Event Bus   │────▶│  Subscribers │
//! │  (publish)   │     │  (broadcast) │     │   (recv)     │
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```

pub mod bus;
pub mod types;

pub use bus::{EventBus, EventFilter, FilteredReceiver, SharedEventBus, DEFAULT_CAPACITY};
pub use types::LifecycleEvent;
