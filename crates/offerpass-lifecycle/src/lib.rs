//! # offerpass-lifecycle
//!
//! **Pure lifecycle plane for OfferPass.**
//!
//! This crate is the compute plane of the redemption core — it decides
//! which lifecycle events are legal and what a confirmed bill is worth. It
//! has:
//!
//! - **Zero side effects**: no store access, no KV access, no clock reads —
//!   time arrives as arguments
//! - **One void predicate**: the 2 h window and the same-local-day rule live
//!   in a single place
//! - **Exact money**: fixed-point decimals, banker's rounding, and the
//!   `final + discount == bill` identity on every outcome

pub mod savings;
pub mod transition;

pub use savings::{Savings, compute_savings};
pub use transition::{LifecycleEvent, Transition, TransitionContext, evaluate, void_permitted};
