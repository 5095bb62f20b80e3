//! leroutage - Lifecycle and Routing Engine
//!
//! *Le Routage* (The Routing) - status transitions with audit history, and the
//! first-match-wins team routing that runs after intake

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

/// Engine error types
pub mod error;

/// Request creation and background routing
pub mod intake;

/// Status transitions and their history entries
pub mod lifecycle;

/// Team routing policy
pub mod routing;

/// Status labels and the completion policy
pub mod status;

pub use error::{EngineError, Result};
pub use intake::{
    open_request, route_request, IntakeOutcome, IntakeRouter, RoutedRequest, SharedStorage,
    SYSTEM_ACTOR,
};
pub use lifecycle::{LifecycleEngine, StatusChange, Transition};
pub use routing::{assign_team, RoutingAttributes, RoutingPolicy, RoutingRule, RuleCondition, Team};
pub use status::{completion_percentage, RequestStatus};
