//! Resolve-then-stop sequencing

use stackdown_core::{
    CancelToken, DeploymentTarget, Error, ExecutionResult, LifecycleEvent, ResolvedEndpoint,
    Result,
};
use stackdown_executor::Executor;
use stackdown_resolver::Resolver;
use std::time::{Instant, SystemTime};
use tokio::sync::mpsc;

/// Runs the resolver to completion, then the executor
///
/// `stop` needs a [`ResolvedEndpoint`], which only `resolve` hands out, so
/// the executor cannot run ahead of a successful resolution.
pub struct StopWorkflow {
    resolver: Resolver,
    executor: Executor,
    event_tx: Option<mpsc::Sender<LifecycleEvent>>,
}

impl StopWorkflow {
    pub const fn new(resolver: Resolver, executor: Executor) -> Self {
        Self {
            resolver,
            executor,
            event_tx: None,
        }
    }

    /// Add event channel for emitting events
    #[must_use]
    pub fn with_events(mut self, tx: mpsc::Sender<LifecycleEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub const fn executor(&self) -> &Executor {
        &self.executor
    }

    async fn emit(&self, event: LifecycleEvent) {
        event.emit_trace();
        if let Some(ref tx) = self.event_tx {
            let _ = tx.send(event).await;
        }
    }

    async fn fail<T>(&self, target: &DeploymentTarget, result: Result<T>) -> Result<T> {
        if let Err(ref e) = result {
            self.emit(LifecycleEvent::Failed {
                target: target.name().to_string(),
                message: e.to_string(),
                timestamp: SystemTime::now(),
            })
            .await;
        }
        result
    }

    /// Look the target's instance up
    ///
    /// Cancelling abandons the listing; the listing child is killed on drop.
    pub async fn resolve(
        &self,
        target: &DeploymentTarget,
        cancel: &CancelToken,
    ) -> Result<ResolvedEndpoint> {
        self.emit(LifecycleEvent::Resolving {
            target: target.name().to_string(),
            timestamp: SystemTime::now(),
        })
        .await;

        let resolved = tokio::select! {
            resolved = self.resolver.resolve(target.name()) => resolved,
            () = cancel.cancelled() => Err(Error::Cancelled { operation: "instance listing" }),
        };
        let endpoint = self.fail(target, resolved).await?;

        self.emit(LifecycleEvent::Resolved {
            target: target.name().to_string(),
            instance: endpoint.instance().to_string(),
            ip: endpoint.public_ip(),
            timestamp: SystemTime::now(),
        })
        .await;

        Ok(endpoint)
    }

    /// Bring the stack down on an already resolved endpoint
    pub async fn stop(
        &self,
        endpoint: &ResolvedEndpoint,
        target: &DeploymentTarget,
        cancel: &CancelToken,
    ) -> Result<ExecutionResult> {
        self.emit(LifecycleEvent::CommandIssued {
            target: target.name().to_string(),
            ip: endpoint.public_ip(),
            command: self.executor.command_for(target).render(),
            timestamp: SystemTime::now(),
        })
        .await;

        let started = Instant::now();
        let result = self
            .fail(target, self.executor.stop(endpoint, target, cancel).await)
            .await?;

        self.emit(LifecycleEvent::Completed {
            target: target.name().to_string(),
            exit_code: result.exit_code,
            elapsed: started.elapsed(),
            timestamp: SystemTime::now(),
        })
        .await;

        Ok(result)
    }
}
