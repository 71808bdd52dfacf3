//! Request-scoped actor context.
//!
//! One context exists per in-flight request and is reachable from arbitrarily
//! deep async work servicing that request, without threading it through every
//! call signature. The store is a scoped task-local: the value lives exactly
//! as long as the future passed to [`run_with_context`], is torn down on every
//! exit path, and is invisible to other tasks sharing the worker pool. Tasks
//! handed to `tokio::spawn` do not inherit the scope, so background work that
//! outlives its request observes "no context" rather than a stale actor.

use tokio::task_local;

use applygate_core::{ActorId, ActorKind, ActorRef};

use crate::actor::Actor;

task_local! {
    static ACTOR_CONTEXT: ActorContext;
}

/// Ephemeral (actor id, actor kind) pair used for audit attribution.
///
/// Never persisted; persistence hooks copy what they need into attribution
/// columns at write time.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ActorContext {
    actor: ActorRef,
}

impl ActorContext {
    /// Context derived from a verified identity.
    pub fn authenticated(id: ActorId, kind: ActorKind) -> Self {
        Self {
            actor: ActorRef::new(id, kind),
        }
    }

    pub fn for_actor(actor: &Actor) -> Self {
        Self {
            actor: actor.actor_ref(),
        }
    }

    /// Context for unauthenticated endpoints that still require attribution.
    pub fn system() -> Self {
        Self {
            actor: ActorRef::system(),
        }
    }

    pub fn actor(&self) -> ActorRef {
        self.actor
    }

    pub fn actor_id(&self) -> Option<ActorId> {
        self.actor.id
    }

    pub fn kind(&self) -> ActorKind {
        self.actor.kind
    }
}

/// Establish `context` for the full dynamic and asynchronous extent of `work`.
///
/// The context is cleared deterministically when that extent completes,
/// whether `work` resolves, errors, or is dropped mid-flight.
pub async fn run_with_context<F>(context: ActorContext, work: F) -> F::Output
where
    F: Future,
{
    ACTOR_CONTEXT.scope(context, work).await
}

/// The active context for the calling execution, or `None` outside any
/// established scope. Absence is not an error: attribution fields simply
/// stay unset.
pub fn current_context() -> Option<ActorContext> {
    ACTOR_CONTEXT.try_with(|ctx| *ctx).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn no_context_outside_a_scope() {
        assert_eq!(current_context(), None);
    }

    #[tokio::test]
    async fn context_reaches_nested_async_work() {
        async fn deep() -> Option<ActorId> {
            tokio::task::yield_now().await;
            current_context().and_then(|c| c.actor_id())
        }

        let id = ActorId::new();
        let seen = run_with_context(
            ActorContext::authenticated(id, ActorKind::Admin),
            async { deep().await },
        )
        .await;
        assert_eq!(seen, Some(id));
    }

    #[tokio::test]
    async fn context_is_cleared_after_the_scope_ends() {
        run_with_context(ActorContext::system(), async {}).await;
        assert_eq!(current_context(), None);
    }

    #[tokio::test]
    async fn context_is_cleared_when_the_scope_errors() {
        let result: Result<(), &str> =
            run_with_context(ActorContext::system(), async { Err("boom") }).await;
        assert!(result.is_err());
        assert_eq!(current_context(), None);
    }

    #[tokio::test]
    async fn spawned_tasks_do_not_inherit_the_context() {
        let observed = run_with_context(ActorContext::system(), async {
            tokio::spawn(async { current_context() }).await.unwrap()
        })
        .await;
        assert_eq!(observed, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_never_observe_each_other() {
        let id_a = ActorId::new();
        let id_b = ActorId::new();

        let request = |id: ActorId| async move {
            run_with_context(ActorContext::authenticated(id, ActorKind::Admin), async move {
                for _ in 0..50 {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    let seen = current_context().and_then(|c| c.actor_id());
                    assert_eq!(seen, Some(id));
                }
            })
            .await;
        };

        let (a, b) = tokio::join!(
            tokio::spawn(request(id_a)),
            tokio::spawn(request(id_b))
        );
        a.unwrap();
        b.unwrap();
    }
}
