//! The single boundary where commands meet real I/O.

use std::collections::BTreeMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;
use tokio::runtime::{Handle, TryCurrentError};
use tokio::sync::Notify;

use super::cmd::{panic_message, AlertSpec, ApiRequest, Cmd, NavMethod};
use super::error::ApiError;
use super::store::Dispatcher;
use super::update::Message;

/// Shared HTTP client used by `Cmd::Http` and by services.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Perform `request` and return the decoded JSON body.
    async fn request(&self, request: ApiRequest) -> Result<Value, ApiError>;
}

/// Navigation target for `Cmd::Navigate`.
pub trait Router: Send + Sync {
    fn push(&self, pathname: &str, params: &BTreeMap<String, String>);
    fn replace(&self, pathname: &str, params: &BTreeMap<String, String>);
    fn back(&self);
}

/// Called once with the index of the pressed button, or `None` if the
/// dialog was dismissed without a choice.
pub type PressCallback = Box<dyn FnOnce(Option<usize>) + Send>;

/// Dialog primitive for `Cmd::Alert`.
pub trait AlertPresenter: Send + Sync {
    fn present(&self, alert: AlertSpec, on_press: PressCallback);
}

/// Stand-in for collaborators nobody wired up.
struct Unwired;

#[async_trait]
impl ApiClient for Unwired {
    async fn request(&self, request: ApiRequest) -> Result<Value, ApiError> {
        tracing::warn!(url = %request.url, "HTTP effect issued without an API client");
        Err(ApiError::NotConfigured)
    }
}

impl Router for Unwired {
    fn push(&self, pathname: &str, _params: &BTreeMap<String, String>) {
        tracing::warn!(pathname, "navigation push dropped: no router");
    }

    fn replace(&self, pathname: &str, _params: &BTreeMap<String, String>) {
        tracing::warn!(pathname, "navigation replace dropped: no router");
    }

    fn back(&self) {
        tracing::warn!("navigation back dropped: no router");
    }
}

impl AlertPresenter for Unwired {
    fn present(&self, alert: AlertSpec, on_press: PressCallback) {
        tracing::warn!(title = %alert.title, "alert dismissed: no presenter");
        on_press(None);
    }
}

/// Counts effects that are still running so callers can wait for quiet.
#[derive(Default)]
pub(crate) struct EffectTracker {
    in_flight: AtomicUsize,
    idle: Notify,
}

/// Keeps its effect counted as in flight until dropped.
pub(crate) struct InFlight(Arc<EffectTracker>);

impl EffectTracker {
    pub(crate) fn begin(self: &Arc<Self>) -> InFlight {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        InFlight(Arc::clone(self))
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub(crate) async fn settled(&self) {
        loop {
            // Register interest before checking the counter so a drop to
            // zero between the check and the await is not missed.
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.0.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Executes commands for a store.
///
/// Each leaf is started in submission order. Async leaves run as tokio
/// tasks, so their completion order is not guaranteed.
#[derive(Clone)]
pub struct EffectHandlers {
    runtime: Handle,
    api: Arc<dyn ApiClient>,
    router: Arc<dyn Router>,
    alerts: Arc<dyn AlertPresenter>,
}

impl EffectHandlers {
    /// Handlers spawning onto `runtime`, with nothing wired yet.
    pub fn new(runtime: Handle) -> Self {
        let unwired = Arc::new(Unwired);
        Self {
            runtime,
            api: unwired.clone(),
            router: unwired.clone(),
            alerts: unwired,
        }
    }

    /// Handlers bound to the runtime the caller is running in.
    pub fn current() -> Result<Self, TryCurrentError> {
        Ok(Self::new(Handle::try_current()?))
    }

    pub fn with_api(mut self, api: Arc<dyn ApiClient>) -> Self {
        self.api = api;
        self
    }

    pub fn with_router(mut self, router: Arc<dyn Router>) -> Self {
        self.router = router;
        self
    }

    pub fn with_alerts(mut self, alerts: Arc<dyn AlertPresenter>) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn api(&self) -> Arc<dyn ApiClient> {
        Arc::clone(&self.api)
    }

    /// Interpret `cmd`, feeding produced messages back through `dispatcher`.
    pub(crate) fn run<Msg: Message>(&self, cmd: Cmd<Msg>, dispatcher: &Dispatcher<Msg>) {
        for leaf in cmd.flatten() {
            if let Some(tag) = leaf.tag() {
                tracing::debug!(store = dispatcher.name(), %tag, "running effect");
            }
            match leaf {
                Cmd::None | Cmd::Batch(_) => {}
                Cmd::Task(task) | Cmd::Attempt(task) => {
                    let label = task.label().to_string();
                    self.spawn(dispatcher, label, task.run().map(Some));
                }
                Cmd::Http(request) => {
                    let api = Arc::clone(&self.api);
                    let (request, responder) = request.into_parts();
                    let label = format!("{} {}", request.method.as_str(), request.url);
                    self.spawn(dispatcher, label, async move {
                        let result = api.request(request).await;
                        if let Err(err) = &result {
                            tracing::debug!(error_type = err.error_type(), %err, "HTTP effect failed");
                        }
                        Some(responder.respond(result))
                    });
                }
                Cmd::Navigate(navigation) => {
                    let label = format!("navigate {:?} {}", navigation.method, navigation.pathname);
                    contain(dispatcher.name(), &label, || match navigation.method {
                        NavMethod::Push => {
                            self.router.push(&navigation.pathname, &navigation.params)
                        }
                        NavMethod::Replace => {
                            self.router.replace(&navigation.pathname, &navigation.params)
                        }
                        NavMethod::Back => self.router.back(),
                    });
                }
                Cmd::Sleep(sleep) => {
                    let label = format!("sleep {:?}", sleep.duration);
                    self.spawn(dispatcher, label, async move {
                        tokio::time::sleep(sleep.duration).await;
                        Some(sleep.msg)
                    });
                }
                Cmd::Alert(alert) => {
                    let (spec, mut messages) = alert.split();
                    let label = format!("alert {:?}", spec.title);
                    let target = dispatcher.clone();
                    contain(dispatcher.name(), &label, move || {
                        self.alerts.present(
                            spec,
                            Box::new(move |choice| {
                                let msg = choice
                                    .and_then(|index| messages.get_mut(index))
                                    .and_then(Option::take);
                                if let Some(msg) = msg {
                                    target.dispatch(msg);
                                }
                            }),
                        )
                    });
                }
            }
        }
    }

    fn spawn<Msg, Fut>(&self, dispatcher: &Dispatcher<Msg>, label: String, effect: Fut)
    where
        Msg: Message,
        Fut: Future<Output = Option<Msg>> + Send + 'static,
    {
        let dispatcher = dispatcher.clone();
        let in_flight = dispatcher.track();
        self.runtime.spawn(async move {
            // Dropped after the produced message has been dispatched.
            let _in_flight = in_flight;
            match AssertUnwindSafe(effect).catch_unwind().await {
                Ok(Some(msg)) => dispatcher.dispatch(msg),
                Ok(None) => {}
                Err(payload) => {
                    tracing::error!(
                        store = dispatcher.name(),
                        effect = %label,
                        panic = %panic_message(payload.as_ref()),
                        "effect callback panicked; message dropped"
                    );
                }
            }
        });
    }
}

/// Run a synchronous collaborator call. A panic is logged and swallowed so
/// the calling dispatch keeps draining its queue.
fn contain(store: &str, label: &str, call: impl FnOnce()) {
    if let Err(payload) = std::panic::catch_unwind(AssertUnwindSafe(call)) {
        tracing::error!(
            store,
            effect = %label,
            panic = %panic_message(payload.as_ref()),
            "effect handler panicked"
        );
    }
}
