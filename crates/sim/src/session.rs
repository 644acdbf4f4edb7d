use std::collections::BTreeSet;

use tracing::{error, info, warn};

use crate::actions::{apply, Action, ActionResult};
use crate::alloc::{audit_exclusivity, available_crew, AssignmentContext};
use crate::content::Catalog;
use crate::error::{ActionError, InvariantViolation};
use crate::events::Notification;
use crate::scheduler::{self, TickReport};
use crate::state::{CompletionMode, CrewMember, EpochMs, GameState, OperationId};

/// The single logical actor that owns the current snapshot. Every mutation
/// goes through [`Session::dispatch`], one at a time.
#[derive(Debug)]
pub struct Session {
    state: GameState,
    catalog: Catalog,
    events: Vec<Notification>,
    announced_ready: BTreeSet<OperationId>,
}

impl Session {
    /// Adopts a snapshot after auditing it. A loaded save that double-books
    /// crew is refused rather than repaired.
    pub fn new(state: GameState, catalog: Catalog) -> Result<Self, InvariantViolation> {
        audit_exclusivity(&state)?;
        info!(
            revision = state.revision,
            holdings = state.holdings.len(),
            crew = state.crew.len(),
            catalog_fingerprint = %catalog.fingerprint(),
            "session_started"
        );
        Ok(Self {
            state,
            catalog,
            events: Vec::new(),
            announced_ready: BTreeSet::new(),
        })
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn dispatch(&mut self, action: Action, now: EpochMs) -> Result<ActionResult, ActionError> {
        let name = action.name();
        match apply(&self.state, action, now, &self.catalog) {
            Ok(outcome) => {
                self.state = outcome.state;
                self.events.extend(outcome.events);
                info!(action = name, revision = self.state.revision, "action_applied");
                Ok(outcome.result)
            }
            Err(err) if err.is_fatal() => {
                error!(action = name, error = %err, "action_aborted_on_invariant");
                Err(err)
            }
            Err(err) => {
                warn!(action = name, code = err.code(), error = %err, "action_rejected");
                Err(err)
            }
        }
    }

    /// Re-derives presentation values and queues an [`Notification::OperationReady`]
    /// the first time a manual-collect operation is seen ready. Never changes
    /// the snapshot.
    pub fn tick(&mut self, now: EpochMs) -> TickReport {
        let report = scheduler::tick(&self.state, now);
        self.announced_ready
            .retain(|id| report.operations.iter().any(|view| view.id == *id));
        for view in &report.operations {
            if view.mode == CompletionMode::ManualCollect
                && view.status.is_ready()
                && self.announced_ready.insert(view.id)
            {
                info!(operation_id = %view.id, kind = view.kind.as_token(), "operation_ready");
                self.events.push(Notification::OperationReady {
                    operation: view.id,
                    kind: view.kind,
                });
            }
        }
        report
    }

    pub fn drain_events(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.events)
    }

    pub fn available_crew(
        &self,
        context: &AssignmentContext,
    ) -> Result<Vec<&CrewMember>, InvariantViolation> {
        available_crew(&self.state, context)
    }
}
