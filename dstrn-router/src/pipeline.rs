//! Sequential step executor with conditional branching
//!
//! A [`Pipeline`] runs its steps in order against a mutable context. Each
//! task returns a [`Flow`]; the first [`Flow::Abort`] stops the run. A
//! [`Step::Branch`] evaluates its predicate once, when it is reached, and
//! splices the chosen sub-list in front of the remaining work, so an abort
//! inside a branch aborts the whole run.
//!
//! Tasks are stored as `for<'a> Fn(&'a mut C) -> BoxFuture<'a, Flow>` so a
//! step may await while holding the context.
//!
//! # Example
//! ```rust,ignore
//! use dstrn_router::pipeline::{Flow, Pipeline, Step};
//!
//! let pipeline = Pipeline::new()
//!     .then(Step::sync(|n: &mut u32| { *n += 1; Flow::Continue }))
//!     .then(Step::branch(
//!         |n: &u32| *n > 1,
//!         vec![Step::sync(|_: &mut u32| Flow::Abort)],
//!         vec![],
//!     ));
//! ```

use futures::future::BoxFuture;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

/// Outcome of a single step or hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flow {
    /// Proceed with the next step
    Continue,
    /// Stop the run; nothing after this step executes
    Abort,
}

impl Flow {
    /// True for [`Flow::Abort`].
    pub fn is_abort(self) -> bool {
        matches!(self, Self::Abort)
    }
}

impl From<bool> for Flow {
    /// `true` continues, `false` aborts.
    fn from(proceed: bool) -> Self {
        if proceed { Self::Continue } else { Self::Abort }
    }
}

/// How a pipeline run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Every step ran
    Finished,
    /// A step returned [`Flow::Abort`]
    Aborted,
}

/// Task function stored by [`Step::Task`].
pub type TaskFn<C> = Arc<dyn for<'a> Fn(&'a mut C) -> BoxFuture<'a, Flow> + Send + Sync>;

/// Predicate stored by [`Step::Branch`].
pub type PredicateFn<C> = Arc<dyn Fn(&C) -> bool + Send + Sync>;

/// One unit of work in a [`Pipeline`].
pub enum Step<C> {
    /// Async task
    Task(TaskFn<C>),
    /// Conditional sub-list
    Branch(Branch<C>),
}

/// Predicate plus the two sub-lists it chooses between.
pub struct Branch<C> {
    predicate: PredicateFn<C>,
    if_true: Vec<Step<C>>,
    if_false: Vec<Step<C>>,
}

impl<C> Clone for Step<C> {
    fn clone(&self) -> Self {
        match self {
            Self::Task(task) => Self::Task(task.clone()),
            Self::Branch(branch) => Self::Branch(branch.clone()),
        }
    }
}

impl<C> Clone for Branch<C> {
    fn clone(&self) -> Self {
        Self {
            predicate: self.predicate.clone(),
            if_true: self.if_true.clone(),
            if_false: self.if_false.clone(),
        }
    }
}

impl<C> fmt::Debug for Step<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Task(_) => f.write_str("Task"),
            Self::Branch(branch) => f
                .debug_struct("Branch")
                .field("if_true", &branch.if_true)
                .field("if_false", &branch.if_false)
                .finish(),
        }
    }
}

impl<C: Send + 'static> Step<C> {
    /// Async task step.
    pub fn task<F>(run: F) -> Self
    where
        F: for<'a> Fn(&'a mut C) -> BoxFuture<'a, Flow> + Send + Sync + 'static,
    {
        Self::Task(Arc::new(run))
    }

    /// Task step that never awaits.
    pub fn sync<F>(run: F) -> Self
    where
        F: Fn(&mut C) -> Flow + Send + Sync + 'static,
    {
        Self::task(move |ctx| {
            let flow = run(ctx);
            Box::pin(async move { flow })
        })
    }

    /// Branch step.
    pub fn branch<P>(predicate: P, if_true: Vec<Step<C>>, if_false: Vec<Step<C>>) -> Self
    where
        P: Fn(&C) -> bool + Send + Sync + 'static,
    {
        Self::Branch(Branch {
            predicate: Arc::new(predicate),
            if_true,
            if_false,
        })
    }
}

/// Ordered list of steps run against a context.
pub struct Pipeline<C> {
    steps: Vec<Step<C>>,
}

impl<C> Default for Pipeline<C> {
    fn default() -> Self {
        Self { steps: Vec::new() }
    }
}

impl<C> Clone for Pipeline<C> {
    fn clone(&self) -> Self {
        Self {
            steps: self.steps.clone(),
        }
    }
}

impl<C> fmt::Debug for Pipeline<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline").field("steps", &self.steps).finish()
    }
}

impl<C> FromIterator<Step<C>> for Pipeline<C> {
    fn from_iter<I: IntoIterator<Item = Step<C>>>(iter: I) -> Self {
        Self {
            steps: iter.into_iter().collect(),
        }
    }
}

impl<C: Send + 'static> Pipeline<C> {
    /// Empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step.
    #[must_use]
    pub fn then(mut self, step: Step<C>) -> Self {
        self.steps.push(step);
        self
    }

    /// Number of top-level steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True when there is nothing to run.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step against `ctx`.
    pub async fn run(&self, ctx: &mut C) -> Completion {
        let mut work: VecDeque<Step<C>> = self.steps.iter().cloned().collect();

        while let Some(step) = work.pop_front() {
            match step {
                Step::Task(task) => {
                    if task(ctx).await.is_abort() {
                        return Completion::Aborted;
                    }
                }
                Step::Branch(branch) => {
                    let chosen = if (branch.predicate)(ctx) {
                        branch.if_true
                    } else {
                        branch.if_false
                    };
                    for step in chosen.into_iter().rev() {
                        work.push_front(step);
                    }
                }
            }
        }

        Completion::Finished
    }
}
