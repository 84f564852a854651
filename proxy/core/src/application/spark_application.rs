// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Spark application use cases.
//!
//! Composes the registry, the execution backend and the event bus. The
//! registry call is the commit point of every operation; backend calls happen
//! afterwards on detached tasks so a cancelled request never leaves a
//! half-applied mutation behind.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use metrics::counter;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::domain::application::{ApplicationSpec, ApplicationState, SparkApplication};
use crate::domain::backend::ExecutionBackend;
use crate::domain::events::ApplicationEvent;
use crate::domain::lifecycle::TransitionRequest;
use crate::domain::repository::{ApplicationRegistry, RegistryError, TransitionOutcome};
use crate::domain::status::ApplicationRef;
use crate::infrastructure::event_bus::EventBus;

#[async_trait]
pub trait SparkApplicationService: Send + Sync {
    async fn create_application(
        &self,
        namespace: &str,
        spec: ApplicationSpec,
    ) -> Result<SparkApplication, RegistryError>;

    async fn list_applications(&self, namespace: &str) -> Vec<SparkApplication>;

    async fn get_application(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<SparkApplication, RegistryError>;

    async fn delete_application(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<SparkApplication, RegistryError>;

    async fn transition_application(
        &self,
        namespace: &str,
        target: &ApplicationRef,
        request: &TransitionRequest,
    ) -> Result<TransitionOutcome, RegistryError>;

    /// Events for one application, starting from the moment of the call.
    async fn watch_application(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<BoxStream<'static, ApplicationEvent>, RegistryError>;
}

pub struct StandardSparkApplicationService {
    registry: Arc<dyn ApplicationRegistry>,
    backend: Arc<dyn ExecutionBackend>,
    event_bus: Arc<EventBus>,
}

impl StandardSparkApplicationService {
    pub fn new(
        registry: Arc<dyn ApplicationRegistry>,
        backend: Arc<dyn ExecutionBackend>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            registry,
            backend,
            event_bus,
        }
    }

    /// Hand the new resource to the backend. Failure to reach it moves the
    /// resource to `UNKNOWN`; success is confirmed later by a `SUBMITTED` report.
    ///
    /// A delete may commit while the submission is in flight, in which case
    /// its removal can reach the backend first. The registry is checked again
    /// once the backend has accepted the job, and a job whose resource is gone
    /// is removed.
    fn submit_in_background(&self, application: SparkApplication) {
        let registry = self.registry.clone();
        let backend = self.backend.clone();
        let event_bus = self.event_bus.clone();

        tokio::spawn(async move {
            let Err(e) = backend.submit(&application).await else {
                if !is_registered(&*registry, &application).await {
                    debug!(
                        namespace = %application.namespace,
                        name = application.name(),
                        id = %application.id,
                        "Application deleted during submission, withdrawing job"
                    );
                    remove_from_backend(&*backend, &application).await;
                }
                return;
            };
            warn!(
                namespace = %application.namespace,
                name = application.name(),
                id = %application.id,
                "Backend submission failed: {}", e
            );

            let target = ApplicationRef::Id(application.id.clone());
            let request = TransitionRequest::to(ApplicationState::Unknown)
                .for_application(application.id.clone());
            if let Err(e) =
                record_transition(&*registry, &event_bus, &application.namespace, &target, &request)
                    .await
            {
                debug!(id = %application.id, "Could not mark application UNKNOWN: {}", e);
            }
        });
    }

    fn remove_in_background(&self, application: SparkApplication) {
        let backend = self.backend.clone();

        tokio::spawn(async move {
            remove_from_backend(&*backend, &application).await;
        });
    }
}

async fn remove_from_backend(backend: &dyn ExecutionBackend, application: &SparkApplication) {
    if let Err(e) = backend.remove(application).await {
        warn!(
            namespace = %application.namespace,
            name = application.name(),
            id = %application.id,
            "Backend removal failed: {}", e
        );
    }
}

/// Whether `application` is still the live incarnation of its name.
async fn is_registered(registry: &dyn ApplicationRegistry, application: &SparkApplication) -> bool {
    match registry.get(&application.namespace, application.name()).await {
        Ok(current) => current.id == application.id,
        Err(_) => false,
    }
}

#[async_trait]
impl SparkApplicationService for StandardSparkApplicationService {
    async fn create_application(
        &self,
        namespace: &str,
        spec: ApplicationSpec,
    ) -> Result<SparkApplication, RegistryError> {
        let application = match self.registry.create(namespace, spec).await {
            Ok(application) => application,
            Err(RegistryError::Identity(e)) => {
                error!(namespace, "Identity generator failed, refusing to create applications: {}", e);
                return Err(RegistryError::Identity(e));
            }
            Err(e) => return Err(e),
        };

        info!(
            namespace,
            name = application.name(),
            id = %application.id,
            "Application created"
        );
        counter!("spark_proxy_applications_created_total").increment(1);
        self.event_bus.publish(ApplicationEvent::Created {
            namespace: application.namespace.clone(),
            name: application.name().to_string(),
            id: application.id.clone(),
            created_at: application.created_at,
        });

        self.submit_in_background(application.clone());
        Ok(application)
    }

    async fn list_applications(&self, namespace: &str) -> Vec<SparkApplication> {
        self.registry.list(namespace).await
    }

    async fn get_application(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<SparkApplication, RegistryError> {
        self.registry.get(namespace, name).await
    }

    async fn delete_application(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<SparkApplication, RegistryError> {
        let application = self.registry.delete(namespace, name).await?;

        info!(namespace, name, id = %application.id, "Application deleted");
        counter!("spark_proxy_applications_deleted_total").increment(1);
        self.event_bus.publish(ApplicationEvent::Deleted {
            namespace: application.namespace.clone(),
            name: application.name().to_string(),
            id: application.id.clone(),
            deleted_at: chrono::Utc::now(),
        });

        self.remove_in_background(application.clone());
        Ok(application)
    }

    async fn transition_application(
        &self,
        namespace: &str,
        target: &ApplicationRef,
        request: &TransitionRequest,
    ) -> Result<TransitionOutcome, RegistryError> {
        record_transition(&*self.registry, &self.event_bus, namespace, target, request).await
    }

    async fn watch_application(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<BoxStream<'static, ApplicationEvent>, RegistryError> {
        // Subscribe first so nothing between the lookup and the subscription is lost
        let stream = self.event_bus.application_stream(namespace, name);
        self.registry.get(namespace, name).await?;
        Ok(stream.boxed())
    }
}

async fn record_transition(
    registry: &dyn ApplicationRegistry,
    event_bus: &EventBus,
    namespace: &str,
    target: &ApplicationRef,
    request: &TransitionRequest,
) -> Result<TransitionOutcome, RegistryError> {
    let outcome = registry.transition(namespace, target, request).await?;
    let application = &outcome.application;

    info!(
        namespace,
        name = application.name(),
        id = %application.id,
        from = %outcome.previous,
        to = %application.state(),
        "Application state changed"
    );
    counter!("spark_proxy_state_transitions_total", "state" => application.state().as_str())
        .increment(1);
    event_bus.publish(ApplicationEvent::StateChanged {
        namespace: application.namespace.clone(),
        name: application.name().to_string(),
        id: application.id.clone(),
        from: outcome.previous,
        to: application.state(),
        changed_at: application.updated_at(),
    });

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::application::{ApplicationId, ApplicationType};
    use crate::domain::backend::BackendError;
    use crate::domain::lifecycle::TransitionError;
    use crate::infrastructure::identity::UuidIdentityGenerator;
    use crate::infrastructure::registry::InMemoryApplicationRegistry;
    use parking_lot::Mutex;
    use std::time::Duration;

    /// Records calls; optionally refuses everything.
    #[derive(Default)]
    struct RecordingBackend {
        unreachable: bool,
        submitted: Mutex<Vec<ApplicationId>>,
        removed: Mutex<Vec<ApplicationId>>,
    }

    #[async_trait]
    impl ExecutionBackend for RecordingBackend {
        async fn submit(&self, application: &SparkApplication) -> Result<(), BackendError> {
            if self.unreachable {
                return Err(BackendError::Unavailable("down".to_string()));
            }
            self.submitted.lock().push(application.id.clone());
            Ok(())
        }

        async fn remove(&self, application: &SparkApplication) -> Result<(), BackendError> {
            self.removed.lock().push(application.id.clone());
            Ok(())
        }
    }

    fn service(backend: Arc<RecordingBackend>) -> (StandardSparkApplicationService, Arc<EventBus>) {
        let event_bus = Arc::new(EventBus::new(64));
        let registry = Arc::new(InMemoryApplicationRegistry::new(Arc::new(UuidIdentityGenerator)));
        (
            StandardSparkApplicationService::new(registry, backend, event_bus.clone()),
            event_bus,
        )
    }

    fn spec(name: &str) -> ApplicationSpec {
        ApplicationSpec::new(name, ApplicationType::Scala, "local:///opt/spark/jars/app.jar")
    }

    async fn eventually<F: Fn() -> bool>(condition: F) {
        for _ in 0..100 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_create_publishes_and_submits() {
        let backend = Arc::new(RecordingBackend::default());
        let (service, event_bus) = service(backend.clone());
        let mut events = Box::pin(event_bus.application_stream("default", "etl"));

        let app = service.create_application("default", spec("etl")).await.unwrap();
        assert_eq!(app.state(), ApplicationState::Pending);

        let event = events.next().await.unwrap();
        assert!(matches!(event, ApplicationEvent::Created { ref id, .. } if id == &app.id));

        eventually(|| backend.submitted.lock().contains(&app.id)).await;
        // Submission alone does not advance the state
        assert_eq!(
            service.get_application("default", "etl").await.unwrap().state(),
            ApplicationState::Pending
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_marks_unknown() {
        let backend = Arc::new(RecordingBackend {
            unreachable: true,
            ..Default::default()
        });
        let (service, _event_bus) = service(backend);

        service.create_application("default", spec("etl")).await.unwrap();

        for _ in 0..100 {
            let state = service.get_application("default", "etl").await.unwrap().state();
            if state == ApplicationState::Unknown {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("application never became UNKNOWN");
    }

    #[tokio::test]
    async fn test_delete_removes_from_backend() {
        let backend = Arc::new(RecordingBackend::default());
        let (service, event_bus) = service(backend.clone());

        let app = service.create_application("default", spec("etl")).await.unwrap();
        let mut events = Box::pin(event_bus.application_stream("default", "etl"));

        let removed = service.delete_application("default", "etl").await.unwrap();
        assert_eq!(removed.id, app.id);
        assert!(matches!(events.next().await.unwrap(), ApplicationEvent::Deleted { .. }));

        eventually(|| backend.removed.lock().contains(&app.id)).await;
        assert!(matches!(
            service.delete_application("default", "etl").await,
            Err(RegistryError::NotFound { .. })
        ));
    }

    /// Tracks live jobs; submissions take a while to land.
    struct SlowBackend {
        live: Mutex<Vec<ApplicationId>>,
    }

    #[async_trait]
    impl ExecutionBackend for SlowBackend {
        async fn submit(&self, application: &SparkApplication) -> Result<(), BackendError> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.live.lock().push(application.id.clone());
            Ok(())
        }

        async fn remove(&self, application: &SparkApplication) -> Result<(), BackendError> {
            self.live.lock().retain(|id| id != &application.id);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_delete_during_submission_leaves_no_job() {
        let backend = Arc::new(SlowBackend {
            live: Mutex::new(Vec::new()),
        });
        let service = StandardSparkApplicationService::new(
            Arc::new(InMemoryApplicationRegistry::new(Arc::new(UuidIdentityGenerator))),
            backend.clone(),
            Arc::new(EventBus::new(16)),
        );

        service.create_application("default", spec("etl")).await.unwrap();
        service.delete_application("default", "etl").await.unwrap();
        assert!(service.list_applications("default").await.is_empty());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(backend.live.lock().is_empty());
    }

    #[tokio::test]
    async fn test_recreated_name_keeps_its_job() {
        let backend = Arc::new(SlowBackend {
            live: Mutex::new(Vec::new()),
        });
        let service = StandardSparkApplicationService::new(
            Arc::new(InMemoryApplicationRegistry::new(Arc::new(UuidIdentityGenerator))),
            backend.clone(),
            Arc::new(EventBus::new(16)),
        );

        service.create_application("default", spec("etl")).await.unwrap();
        service.delete_application("default", "etl").await.unwrap();
        let current = service.create_application("default", spec("etl")).await.unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(*backend.live.lock(), vec![current.id]);
    }

    #[tokio::test]
    async fn test_transition_publishes_state_change() {
        let backend = Arc::new(RecordingBackend::default());
        let (service, _event_bus) = service(backend);

        let app = service.create_application("default", spec("etl")).await.unwrap();
        let mut watch = service.watch_application("default", "etl").await.unwrap();

        let target = ApplicationRef::Name("etl".to_string());
        let outcome = service
            .transition_application(
                "default",
                &target,
                &TransitionRequest::to(ApplicationState::Submitted),
            )
            .await
            .unwrap();
        assert_eq!(outcome.previous, ApplicationState::Pending);
        let updated = outcome.application;
        assert_eq!(updated.state(), ApplicationState::Submitted);

        let event = watch.next().await.unwrap();
        assert_eq!(
            event,
            ApplicationEvent::StateChanged {
                namespace: "default".to_string(),
                name: "etl".to_string(),
                id: app.id.clone(),
                from: ApplicationState::Pending,
                to: ApplicationState::Submitted,
                changed_at: updated.updated_at(),
            }
        );

        let err = service
            .transition_application(
                "default",
                &target,
                &TransitionRequest::to(ApplicationState::Submitted),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Transition(TransitionError::StaleTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_watch_missing_application_fails() {
        let (service, _event_bus) = service(Arc::new(RecordingBackend::default()));
        assert!(matches!(
            service.watch_application("default", "ghost").await,
            Err(RegistryError::NotFound { .. })
        ));
    }
}
