use rand::Rng as _;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::registry::EntityRegistry;
use crate::worker::WorkerContext;

pub type ActionFuture = Pin<Box<dyn Future<Output = ActionOutcome> + Send>>;

type ActionFn = Arc<dyn Fn(WorkerContext) -> ActionFuture + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Completed,
    Failed,
    /// The action had no target to operate on (e.g. empty registry). Not a
    /// real failure; excluded from error rates.
    Skipped,
}

#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub status: OutcomeStatus,
    /// Identifier of an entity this action created, if any; the worker
    /// publishes it to the shared registry.
    pub produced: Option<String>,
}

impl ActionOutcome {
    pub fn completed() -> Self {
        Self {
            status: OutcomeStatus::Completed,
            produced: None,
        }
    }

    pub fn created(id: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Completed,
            produced: Some(id.into()),
        }
    }

    pub fn failed() -> Self {
        Self {
            status: OutcomeStatus::Failed,
            produced: None,
        }
    }

    pub fn skipped() -> Self {
        Self {
            status: OutcomeStatus::Skipped,
            produced: None,
        }
    }
}

#[derive(Clone)]
pub struct Action {
    name: Arc<str>,
    weight: f64,
    handler: ActionFn,
}

impl Action {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub(crate) fn run(&self, ctx: WorkerContext) -> ActionFuture {
        (self.handler)(ctx)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("weight", &self.weight)
            .finish_non_exhaustive()
    }
}

/// Fixed catalog of named actions with proportional selection weights.
/// One action may be designated as the seeding action: while the shared
/// registry is still empty it is selected deterministically, bypassing the
/// weighted draw, so later actions have entities to operate on.
#[derive(Debug, Default)]
pub struct ActionCatalog {
    actions: Vec<Action>,
    seed: Option<usize>,
}

impl ActionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn action<F, Fut>(mut self, name: &str, weight: f64, handler: F) -> Self
    where
        F: Fn(WorkerContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionOutcome> + Send + 'static,
    {
        self.push(name, weight, handler);
        self
    }

    /// Like [`ActionCatalog::action`], additionally marking this action as
    /// the bootstrap used while no entities exist yet.
    pub fn seed_action<F, Fut>(mut self, name: &str, weight: f64, handler: F) -> Self
    where
        F: Fn(WorkerContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionOutcome> + Send + 'static,
    {
        self.push(name, weight, handler);
        self.seed = Some(self.actions.len() - 1);
        self
    }

    fn push<F, Fut>(&mut self, name: &str, weight: f64, handler: F)
    where
        F: Fn(WorkerContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionOutcome> + Send + 'static,
    {
        let handler: ActionFn = Arc::new(move |ctx| Box::pin(handler(ctx)) as ActionFuture);
        self.actions.push(Action {
            name: Arc::from(name),
            weight,
            handler,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub(crate) fn weights_are_valid(&self) -> bool {
        let mut total = 0.0;
        for a in &self.actions {
            if !a.weight.is_finite() || a.weight < 0.0 {
                return false;
            }
            total += a.weight;
        }
        total > 0.0
    }

    /// Selection for one worker iteration: the seed action while the
    /// bootstrap precondition is unmet, a weighted draw otherwise.
    pub(crate) fn next_action(&self, entities: &EntityRegistry) -> Option<&Action> {
        if entities.is_empty()
            && let Some(idx) = self.seed
        {
            return self.actions.get(idx);
        }
        self.pick()
    }

    fn pick(&self) -> Option<&Action> {
        let total: f64 = self.actions.iter().map(|a| a.weight).sum();
        if !(total > 0.0) {
            return None;
        }

        let mut x = rand::thread_rng().gen_range(0.0..total);
        for a in &self.actions {
            if x < a.weight {
                return Some(a);
            }
            x -= a.weight;
        }
        // Floating-point edge: fall back to the last weighted entry.
        self.actions.iter().rev().find(|a| a.weight > 0.0)
    }
}
