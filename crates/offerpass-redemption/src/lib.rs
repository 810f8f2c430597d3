//! # offerpass-redemption
//!
//! **Redemption plane**: persistent store, analytics trail, the orchestration
//! service, and the entry-point adapters.
//!
//! ## Architecture
//!
//! The redemption plane receives gated requests and drives the entitlement
//! lifecycle:
//! 1. Validates the event against the pure lifecycle plane
//! 2. Applies the state change through the store's compare-and-swap
//! 3. Captures bills and savings into append-only redemption rows
//! 4. Emits fire-and-forget analytics events
//!
//! ## Ownership
//!
//! [`RedemptionService`] is the **only** component that mutates entitlements
//! and redemptions. Proof tokens live in the gate plane; daily markers
//! expire on their own.

pub mod analytics;
pub mod handlers;
pub mod request_replay;
pub mod service;
pub mod store;

pub use analytics::AnalyticsEmitter;
pub use handlers::{Api, AuthContext};
pub use request_replay::ReplayGuard;
pub use service::RedemptionService;
pub use store::{MerchantDaySummary, RedemptionStore, SavingsSummary};
