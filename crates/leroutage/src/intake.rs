//! Intake: request creation and asynchronous first routing
//!
//! A created request is returned to the caller immediately in `New` state.
//! Routing runs afterwards on the blocking pool. Its failures are logged
//! and never reach the creating caller.

use crate::error::{EngineError, Result};
use crate::lifecycle::{apply_transition, StatusChange};
use crate::routing::{RoutingAttributes, RoutingPolicy, Team};
use crate::status::RequestStatus;
use chrono::Utc;
use lestockage::{
    AssignmentStore, NewRequest, OnboardingRequest, RequestDetails, RequestStore,
    StatusHistoryEntry, Storage, TeamAssignment,
};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Acting user recorded for automatic routing transitions
pub const SYSTEM_ACTOR: &str = "system";

/// Storage handle shared between request handlers and background routing
pub type SharedStorage = Arc<Mutex<Storage>>;

/// Persist a new request in the initial `New` state
pub fn open_request(
    storage: &Storage,
    details: RequestDetails,
    created_by: Option<String>,
) -> Result<OnboardingRequest> {
    let status = RequestStatus::New;
    let request = RequestStore::new(storage.conn()).create(NewRequest {
        details,
        completion_percentage: status.completion_percentage(),
        status: status.as_str().to_string(),
        created_by,
    })?;

    info!(
        request_id = %request.id,
        reference = %request.reference_number,
        "onboarding request created"
    );
    Ok(request)
}

/// Everything written by one routing run
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedRequest {
    /// Team chosen by the policy
    pub team: Team,
    /// Request after routing
    pub request: OnboardingRequest,
    /// History entry for `New` → `Under Review`
    pub entry: StatusHistoryEntry,
    /// Assignment record
    pub assignment: TeamAssignment,
}

/// What a routing run did
#[derive(Debug, Clone, PartialEq)]
pub enum IntakeOutcome {
    /// Request routed
    Routed(Box<RoutedRequest>),
    /// Request no longer exists; nothing written
    Missing,
    /// Request already carries a team; nothing written
    AlreadyRouted,
}

/// Route one request: choose a team, move it to `Under Review`, record the
/// history entry and the pending assignment in a single transaction.
pub fn route_request(
    storage: &mut Storage,
    policy: &RoutingPolicy,
    request_id: &str,
) -> Result<IntakeOutcome> {
    let tx = storage.conn_mut().transaction()?;

    let Some(mut request) = RequestStore::new(&tx).find(request_id)? else {
        return Ok(IntakeOutcome::Missing);
    };
    if request.assigned_team.is_some() {
        return Ok(IntakeOutcome::AlreadyRouted);
    }

    let team = policy.assign_team(&RoutingAttributes::from(&request.details));
    let now = Utc::now();

    request.assigned_team = Some(team.as_str().to_string());
    let entry = apply_transition(
        &tx,
        &mut request,
        StatusChange::new(RequestStatus::UnderReview.as_str(), SYSTEM_ACTOR),
        now,
    )?;
    let assignment = AssignmentStore::new(&tx).create(&request.id, team.as_str(), None, now)?;

    tx.commit()?;

    Ok(IntakeOutcome::Routed(Box::new(RoutedRequest {
        team,
        request,
        entry,
        assignment,
    })))
}

/// Background router for newly created requests
#[derive(Clone)]
pub struct IntakeRouter {
    storage: SharedStorage,
    policy: Arc<RoutingPolicy>,
}

impl IntakeRouter {
    /// Router using the built-in policy
    pub fn new(storage: SharedStorage) -> Self {
        Self::with_policy(storage, RoutingPolicy::standard())
    }

    /// Router using a custom policy
    pub fn with_policy(storage: SharedStorage, policy: RoutingPolicy) -> Self {
        Self {
            storage,
            policy: Arc::new(policy),
        }
    }

    /// Policy in use
    pub fn policy(&self) -> &RoutingPolicy {
        &self.policy
    }

    /// Route a request synchronously on the current thread
    pub fn route_new_request(&self, request_id: &str) -> Result<IntakeOutcome> {
        let mut storage = self
            .storage
            .lock()
            .map_err(|e| EngineError::StorageUnavailable(e.to_string()))?;
        route_request(&mut storage, &self.policy, request_id)
    }

    /// Schedule routing for a freshly created request
    ///
    /// Must be called from within a Tokio runtime. Callers normally drop the
    /// handle; awaiting it only reports completion, never the routing error.
    pub fn schedule(&self, request_id: String) -> JoinHandle<()> {
        let router = self.clone();
        tokio::task::spawn_blocking(move || match router.route_new_request(&request_id) {
            Ok(IntakeOutcome::Routed(routed)) => info!(
                request_id = %request_id,
                team = %routed.team,
                "request routed"
            ),
            Ok(IntakeOutcome::Missing) => {
                debug!(request_id = %request_id, "request gone before routing, skipped")
            }
            Ok(IntakeOutcome::AlreadyRouted) => {
                debug!(request_id = %request_id, "request already routed, skipped")
            }
            Err(err) => warn!(request_id = %request_id, error = %err, "routing failed"),
        })
    }
}
