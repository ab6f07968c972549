//! Solving sessions.
//!
//! A session owns one route plan for the duration of a solve. The optimizer
//! driving it lives outside this crate: it takes a [`ScoreDirector`] from
//! [`SolveSession::start`], applies edits on its own thread, publishes
//! improvements and checks [`SolveSession::should_terminate`] between edits.
//! Cancellation is cooperative through a shared flag.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::director::ScoreDirector;
use crate::domain::RoutePlan;
use crate::score::HardSoftScore;
use crate::scoring::ConstraintSet;

/// Default solving time: 30 seconds.
const DEFAULT_TIME_LIMIT_SECS: u64 = 30;

/// Termination criteria for a solve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Stop after this duration.
    pub time_limit: Option<Duration>,
    /// Stop after this many steps.
    pub step_limit: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            time_limit: Some(Duration::from_secs(DEFAULT_TIME_LIMIT_SECS)),
            step_limit: None,
        }
    }
}

/// Status of a solving session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverStatus {
    #[serde(rename = "NOT_SOLVING")]
    NotSolving,
    #[serde(rename = "SOLVING_ACTIVE")]
    Solving,
}

impl SolverStatus {
    /// Wire name of the status.
    ///
    /// ```
    /// use dial_a_ride::session::SolverStatus;
    ///
    /// assert_eq!(SolverStatus::NotSolving.as_str(), "NOT_SOLVING");
    /// assert_eq!(SolverStatus::Solving.as_str(), "SOLVING_ACTIVE");
    /// ```
    pub fn as_str(self) -> &'static str {
        match self {
            SolverStatus::NotSolving => "NOT_SOLVING",
            SolverStatus::Solving => "SOLVING_ACTIVE",
        }
    }
}

/// One solve: the best plan found so far plus its lifecycle state.
pub struct SolveSession {
    pub id: String,
    status: SolverStatus,
    best: RoutePlan,
    config: SessionConfig,
    terminate: Arc<AtomicBool>,
    started: Option<Instant>,
}

impl SolveSession {
    pub fn new(id: String, plan: RoutePlan) -> Self {
        Self::with_config(id, plan, SessionConfig::default())
    }

    pub fn with_config(id: String, plan: RoutePlan, config: SessionConfig) -> Self {
        Self {
            id,
            status: SolverStatus::NotSolving,
            best: plan,
            config,
            terminate: Arc::new(AtomicBool::new(false)),
            started: None,
        }
    }

    #[inline]
    pub fn status(&self) -> SolverStatus {
        self.status
    }

    #[inline]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Best plan published so far.
    #[inline]
    pub fn best(&self) -> &RoutePlan {
        &self.best
    }

    /// Flag an optimizer thread can poll without holding the session lock.
    pub fn terminate_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.terminate)
    }

    /// Marks the session as solving and hands out a director over a copy of
    /// the best plan.
    pub fn start(&mut self) -> ScoreDirector {
        self.start_with(crate::constraints::define_constraints())
    }

    /// Like [`start`](Self::start) with a custom constraint set.
    pub fn start_with(&mut self, constraints: ConstraintSet) -> ScoreDirector {
        self.terminate.store(false, Ordering::SeqCst);
        self.started = Some(Instant::now());
        self.status = SolverStatus::Solving;

        let director = ScoreDirector::with_constraints(self.best.clone(), constraints);
        self.best.set_score(director.score());

        info!(
            session_id = %self.id,
            visits = self.best.visits().len(),
            vehicles = self.best.vehicles().len(),
            score = %director.score(),
            "Solving started"
        );
        director
    }

    /// Keeps a copy of the director's plan if it beats the best one.
    ///
    /// Returns true if the plan was kept.
    pub fn publish_best(&mut self, director: &ScoreDirector) -> bool {
        let score = director.score();
        if self.best.score().is_some_and(|best| score <= best) {
            return false;
        }
        debug!(session_id = %self.id, %score, "New best solution");
        self.best = director.snapshot();
        true
    }

    /// Returns true once stopped, out of time, or past the step limit.
    pub fn should_terminate(&self, steps: u64) -> bool {
        if self.terminate.load(Ordering::SeqCst) {
            return true;
        }
        if self.config.step_limit.is_some_and(|limit| steps >= limit) {
            return true;
        }
        match (self.config.time_limit, self.started) {
            (Some(limit), Some(started)) => started.elapsed() >= limit,
            _ => false,
        }
    }

    /// Requests termination; the optimizer stops at its next check.
    pub fn stop(&mut self) -> bool {
        if self.status != SolverStatus::Solving {
            return false;
        }
        self.terminate.store(true, Ordering::SeqCst);
        true
    }

    /// Publishes the director's final plan if better and freezes the session.
    pub fn finish(&mut self, director: ScoreDirector) -> HardSoftScore {
        let score = director.score();
        if self.best.score().map_or(true, |best| score > best) {
            self.best = director.finish();
        }
        self.status = SolverStatus::NotSolving;

        let score = self.best.score().unwrap_or_default();
        info!(
            session_id = %self.id,
            duration_secs = self.started.map_or(0.0, |s| s.elapsed().as_secs_f64()),
            score = %score,
            feasible = score.is_feasible(),
            "Solving complete"
        );
        score
    }
}

/// Sessions by id.
///
/// # Examples
///
/// ```
/// use dial_a_ride::domain::{RoutePlan, Vehicle};
/// use dial_a_ride::geometry::Location;
/// use dial_a_ride::session::{SessionRegistry, SolverStatus};
///
/// let registry = SessionRegistry::new();
/// let plan = RoutePlan::new("demo", vec![], vec![Vehicle::new("v1", 4, Location::new(0.0, 0.0))]).unwrap();
///
/// let (id, session) = registry.create(plan);
/// assert_eq!(session.read().status(), SolverStatus::NotSolving);
/// assert!(registry.get(&id).is_some());
/// ```
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<RwLock<SolveSession>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a session for `plan` under a fresh id.
    pub fn create(&self, plan: RoutePlan) -> (String, Arc<RwLock<SolveSession>>) {
        self.create_with_config(plan, SessionConfig::default())
    }

    pub fn create_with_config(
        &self,
        plan: RoutePlan,
        config: SessionConfig,
    ) -> (String, Arc<RwLock<SolveSession>>) {
        let id = Uuid::new_v4().to_string();
        let session = Arc::new(RwLock::new(SolveSession::with_config(id.clone(), plan, config)));
        self.sessions.write().insert(id.clone(), Arc::clone(&session));
        debug!(session_id = %id, "Session created");
        (id, session)
    }

    pub fn get(&self, id: &str) -> Option<Arc<RwLock<SolveSession>>> {
        self.sessions.read().get(id).cloned()
    }

    pub fn list(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }

    pub fn remove(&self, id: &str) -> Option<Arc<RwLock<SolveSession>>> {
        self.sessions.write().remove(id)
    }

    /// Signals the session to stop. Returns false if unknown or idle.
    pub fn stop_solving(&self, id: &str) -> bool {
        self.get(id).is_some_and(|session| session.write().stop())
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
