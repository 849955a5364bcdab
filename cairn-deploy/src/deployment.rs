//! The deployment context every program runs against.

use crate::invoke::{self, InvokeOptions};
use crate::registrar;
use crate::resource::{DeployedResource, ResourceDecl};
use crate::settings::DeploymentSettings;
use cairn0::config::Config;
use cairn0::error::OutputError;
use cairn0::id::STACK_TYPE;
use cairn0::log::{Log, TracingLog};
use cairn0::monitor::Monitor;
use cairn0::output::Output;
use cairn0::property::PropertyMap;
use cairn0::resource::{Resource, ResourceHeader, ResourceRef};
use cairn0::task::{TaskLabel, TaskTracker};
use cairn0::transform::Transformation;
use cairn0::wire::PropertyBag;
use cairn_runner::{RunError, Runner};
use futures::future::FutureExt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, RwLock};
use tokio::sync::OnceCell;

struct Shared {
    runner: Runner,
    stack_transformations: RwLock<Vec<Arc<dyn Transformation>>>,
    stack: OnceLock<ResourceRef>,
    exports: Mutex<PropertyMap>,
    keep_secrets: OnceCell<bool>,
}

/// One run of a program against one Monitor.
///
/// Holds the settings, the Monitor and Log, configuration, stack-level
/// transformations, and the [`Runner`] tracking every task the program
/// starts. Cheap to clone; clones share all of it. Nothing here is global:
/// two deployments in one process are fully independent.
#[derive(Clone)]
pub struct Deployment {
    settings: Arc<DeploymentSettings>,
    monitor: Arc<dyn Monitor>,
    log: Arc<dyn Log>,
    config: Arc<Config>,
    shared: Arc<Shared>,
}

impl Deployment {
    /// A deployment logging through [`TracingLog`], with empty
    /// configuration namespaced by the project.
    pub fn new(settings: DeploymentSettings, monitor: Arc<dyn Monitor>) -> Self {
        let config = Config::new(settings.project.clone());
        Self {
            settings: Arc::new(settings),
            monitor,
            log: Arc::new(TracingLog::new()),
            config: Arc::new(config),
            shared: Arc::new(Shared {
                runner: Runner::new(),
                stack_transformations: RwLock::new(Vec::new()),
                stack: OnceLock::new(),
                exports: Mutex::new(PropertyMap::new()),
                keep_secrets: OnceCell::new(),
            }),
        }
    }

    /// Send diagnostics to `log`.
    pub fn with_log(mut self, log: Arc<dyn Log>) -> Self {
        self.log = log;
        self
    }

    /// Use `config` for configuration lookups.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Arc::new(config);
        self
    }

    /// Add a stack-level transformation, applied to every resource after
    /// all others.
    pub fn with_stack_transformation(self, transformation: Arc<dyn Transformation>) -> Self {
        self.register_stack_transformation(transformation);
        self
    }

    /// Add a stack-level transformation from inside a program. Only
    /// resources registered afterwards see it.
    pub fn register_stack_transformation(&self, transformation: Arc<dyn Transformation>) {
        self.shared
            .stack_transformations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(transformation);
    }

    pub(crate) fn stack_transformations(&self) -> Vec<Arc<dyn Transformation>> {
        self.shared
            .stack_transformations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Settings.
    pub fn settings(&self) -> &DeploymentSettings {
        &self.settings
    }

    /// Whether this is a preview.
    pub fn is_dry_run(&self) -> bool {
        self.settings.dry_run
    }

    /// Configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The diagnostics sink.
    pub fn log(&self) -> Arc<dyn Log> {
        Arc::clone(&self.log)
    }

    /// The Monitor.
    pub fn monitor(&self) -> Arc<dyn Monitor> {
        Arc::clone(&self.monitor)
    }

    /// The runner tracking this deployment's tasks.
    pub fn runner(&self) -> &Runner {
        &self.shared.runner
    }

    /// The root stack component, once [`run`](Self::run) has started.
    pub fn stack(&self) -> Option<ResourceRef> {
        self.shared.stack.get().cloned()
    }

    pub(crate) async fn keep_secrets(&self) -> bool {
        let monitor = Arc::clone(&self.monitor);
        *self
            .shared
            .keep_secrets
            .get_or_init(|| async move { monitor.supports_feature("secrets").await })
            .await
    }

    /// Declare a resource and start its registration.
    ///
    /// Returns at once; the registration runs as a tracked task. Without an
    /// explicit parent the resource is parented to the stack.
    pub fn register_resource(&self, decl: ResourceDecl) -> DeployedResource {
        let parent = decl.options.parent.clone().or_else(|| self.stack());
        self.declare(decl, parent)
    }

    fn declare(&self, decl: ResourceDecl, parent: Option<ResourceRef>) -> DeployedResource {
        let ResourceDecl {
            type_token,
            name,
            kind,
            args,
            options,
            outputs,
        } = decl;
        let mut header = ResourceHeader::new(type_token, name, kind);
        header.parent = parent;
        header.options = options;

        let deployment = self.clone();
        let resource = ResourceRef::new(header, move |me| {
            registrar::register(deployment, me, args).boxed()
        });
        let registration = resource.registration();
        self.shared.runner.track(
            TaskLabel::for_resource("register", &resource),
            async move { registration.await.map(|_| ()) }.boxed(),
        );
        DeployedResource::new(resource, outputs, self.is_dry_run())
    }

    fn register_stack(&self) -> ResourceRef {
        self.shared
            .stack
            .get_or_init(|| {
                let decl = ResourceDecl::component(STACK_TYPE, self.settings.stack_resource_name());
                self.declare(decl, None).resource_ref().clone()
            })
            .clone()
    }

    /// Export stack outputs. Merged with whatever the program returns.
    pub fn register_outputs(&self, outputs: PropertyMap) {
        let mut exports = lock(&self.shared.exports);
        for (key, value) in outputs {
            exports.insert(key, value);
        }
    }

    /// Attach outputs to an already declared resource, typically a
    /// component once its children are declared.
    pub fn register_resource_outputs(&self, resource: &impl Resource, outputs: PropertyMap) {
        let resource = resource.resource_ref().clone();
        let monitor = self.monitor();
        let label = TaskLabel::for_resource("register outputs", &resource);
        self.shared.runner.track(
            label,
            async move {
                let urn = resource.urn().resolve().await?.into_value();
                let resolved = outputs.resolve().await?;
                if let Some(urn) = urn {
                    monitor
                        .register_resource_outputs(&urn, resolved.values)
                        .await
                        .map_err(|e| OutputError::Registration {
                            resource: resource.to_string(),
                            message: e.to_string(),
                        })?;
                }
                Ok(())
            }
            .boxed(),
        );
    }

    /// Call a provider function.
    ///
    /// The call is tracked: its failure fails the run even if nobody reads
    /// the result.
    pub fn invoke(
        &self,
        token: impl Into<String>,
        args: PropertyMap,
        options: InvokeOptions,
    ) -> Output<PropertyBag> {
        let token = token.into();
        let deployment = self.clone();
        let call_token = token.clone();
        let output = Output::from_data(async move {
            let keep_secrets = deployment.keep_secrets().await;
            invoke::invoke(deployment.monitor(), keep_secrets, call_token, args, options).await
        });
        let tracked = output.clone();
        self.shared.runner.track(
            TaskLabel::new(format!("invoke {token}")),
            async move { tracked.resolve().await.map(|_| ()) }.boxed(),
        );
        output
    }

    /// Track arbitrary work; its failure fails the run.
    pub fn spawn<F>(&self, description: impl Into<String>, work: F)
    where
        F: Future<Output = Result<(), OutputError>> + Send + 'static,
    {
        self.shared
            .runner
            .track(TaskLabel::new(description), work.boxed());
    }

    /// Run `program` to completion.
    ///
    /// Registers the stack, runs the program with this deployment, waits
    /// for every task it started, then resolves and registers the stack
    /// outputs. Outputs that resolved are registered even when others
    /// failed. Returns the registered stack outputs, or every failure.
    pub async fn run<F, Fut>(&self, program: F) -> Result<PropertyBag, RunError>
    where
        F: FnOnce(Deployment) -> Fut,
        Fut: Future<Output = Result<PropertyMap, OutputError>>,
    {
        tracing::info!(
            project = %self.settings.project,
            stack = %self.settings.stack,
            dry_run = self.settings.dry_run,
            "deployment.run"
        );
        let stack = self.register_stack();
        let returned = self.shared.runner.execute(program(self.clone())).await;

        let mut exports = std::mem::take(&mut *lock(&self.shared.exports));
        for (key, value) in returned.into_iter().flatten() {
            exports.insert(key, value);
        }
        let outputs = self.resolve_exports(exports).await;
        self.publish_exports(&stack, &outputs).await;

        self.shared.runner.complete().await?;
        Ok(outputs)
    }

    async fn resolve_exports(&self, exports: PropertyMap) -> PropertyBag {
        let mut outputs = PropertyBag::new();
        for (key, value) in exports {
            let single = PropertyMap::new().with(key.clone(), value);
            match single.resolve().await {
                Ok(resolved) => outputs.extend(resolved.values),
                Err(error) => self
                    .shared
                    .runner
                    .record_failure(TaskLabel::new(format!("export {key}")), error),
            }
        }
        outputs
    }

    async fn publish_exports(&self, stack: &ResourceRef, outputs: &PropertyBag) {
        // A failed stack registration is already recorded by its own task.
        let Ok(data) = stack.urn().resolve().await else {
            return;
        };
        let Some(urn) = data.into_value() else {
            return;
        };
        let outputs = if self.keep_secrets().await {
            outputs.clone()
        } else {
            outputs
                .iter()
                .map(|(k, v)| (k.clone(), v.clone().strip_secrets()))
                .collect()
        };
        if let Err(e) = self.monitor.register_resource_outputs(&urn, outputs).await {
            self.shared.runner.record_failure(
                TaskLabel::for_resource("register outputs", stack),
                OutputError::Registration {
                    resource: stack.to_string(),
                    message: e.to_string(),
                },
            );
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl std::fmt::Debug for Deployment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deployment")
            .field("settings", &self.settings)
            .field("runner", &self.shared.runner)
            .finish()
    }
}
