//! Shared test utilities and mock infrastructure.

#![allow(dead_code, unused_imports)]

pub mod mock_api;

use async_trait::async_trait;
use lotto_store::api::{Agency, LoginService, Role, StructureService, User};
use lotto_store::core::{
    Alert, AlertButton, AlertPresenter, AlertSpec, ApiError, Cmd, EffectError, EffectHandlers,
    HttpRequest, PressCallback, Return, Router, Store, Sub, Update, WebData,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Navigation call seen by [`RecordingRouter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavCall {
    Push(String, BTreeMap<String, String>),
    Replace(String, BTreeMap<String, String>),
    Back,
}

#[derive(Default)]
pub struct RecordingRouter {
    calls: Mutex<Vec<NavCall>>,
}

impl RecordingRouter {
    pub fn calls(&self) -> Vec<NavCall> {
        self.calls.lock().clone()
    }
}

impl Router for RecordingRouter {
    fn push(&self, pathname: &str, params: &BTreeMap<String, String>) {
        self.calls
            .lock()
            .push(NavCall::Push(pathname.to_string(), params.clone()));
    }

    fn replace(&self, pathname: &str, params: &BTreeMap<String, String>) {
        self.calls
            .lock()
            .push(NavCall::Replace(pathname.to_string(), params.clone()));
    }

    fn back(&self) {
        self.calls.lock().push(NavCall::Back);
    }
}

/// Records alerts and answers each with the next queued choice
/// (dismissed when the queue is empty).
#[derive(Default)]
pub struct RecordingAlerts {
    shown: Mutex<Vec<AlertSpec>>,
    choices: Mutex<VecDeque<Option<usize>>>,
}

impl RecordingAlerts {
    pub fn answer_with(&self, choice: Option<usize>) {
        self.choices.lock().push_back(choice);
    }

    pub fn shown(&self) -> Vec<AlertSpec> {
        self.shown.lock().clone()
    }
}

impl AlertPresenter for RecordingAlerts {
    fn present(&self, alert: AlertSpec, on_press: PressCallback) {
        self.shown.lock().push(alert);
        let choice = self.choices.lock().pop_front().flatten();
        on_press(choice);
    }
}

/// Effect handlers on the current runtime with recording collaborators.
pub struct Harness {
    pub router: Arc<RecordingRouter>,
    pub alerts: Arc<RecordingAlerts>,
    pub handlers: EffectHandlers,
}

impl Harness {
    pub fn new() -> Self {
        let router = Arc::new(RecordingRouter::default());
        let alerts = Arc::new(RecordingAlerts::default());
        let handlers = EffectHandlers::current()
            .expect("tests run inside a tokio runtime")
            .with_router(router.clone())
            .with_alerts(alerts.clone());
        Self {
            router,
            alerts,
            handlers,
        }
    }
}

pub fn user(username: &str, role: Role, token: &str, structure_id: Option<&str>) -> User {
    User {
        username: username.to_string(),
        role,
        token: token.to_string(),
        structure_id: structure_id.map(str::to_string),
    }
}

pub fn agency(id: &str, name: &str) -> Agency {
    Agency {
        id: id.to_string(),
        name: name.to_string(),
        listero_count: 0,
    }
}

/// Login service answering from a queue of canned results.
#[derive(Default)]
pub struct FakeLogin {
    results: Mutex<VecDeque<Result<User, ApiError>>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeLogin {
    pub fn answering(result: Result<User, ApiError>) -> Arc<Self> {
        let fake = Self::default();
        fake.results.lock().push_back(result);
        Arc::new(fake)
    }
}

#[async_trait]
impl LoginService for FakeLogin {
    async fn login(&self, username: &str, _password: &str) -> Result<User, ApiError> {
        self.calls.lock().push(username.to_string());
        self.results
            .lock()
            .pop_front()
            .unwrap_or(Err(ApiError::NotConfigured))
    }
}

/// Structure service answering every call with the same result after an
/// optional delay.
pub struct FakeStructures {
    result: Result<Vec<Agency>, ApiError>,
    delay: Duration,
    pub calls: Mutex<Vec<(String, String)>>,
}

impl FakeStructures {
    pub fn answering(result: Result<Vec<Agency>, ApiError>) -> Arc<Self> {
        Self::answering_after(result, Duration::ZERO)
    }

    pub fn answering_after(result: Result<Vec<Agency>, ApiError>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            result,
            delay,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl StructureService for FakeStructures {
    async fn agencies(&self, structure_id: &str, token: &str) -> Result<Vec<Agency>, ApiError> {
        self.calls
            .lock()
            .push((structure_id.to_string(), token.to_string()));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.result.clone()
    }
}

/// Minimal store used to exercise the engine.
pub struct CounterUpdate;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Counter {
    pub count: i64,
    pub label: String,
    pub errors: Vec<String>,
    pub fetched: Option<WebData<Value>>,
}

#[derive(Debug)]
pub enum CounterMsg {
    Add(i64),
    Rename(String),
    AddLater(Duration, i64),
    AddFromTask(i64),
    PanickingTask,
    PanickingCallback,
    MissingTask,
    Failed(String),
    Confirm(i64),
    Go(String),
    Fetch(String),
    Fetched(WebData<Value>),
    Explode,
}

impl Update for CounterUpdate {
    type Model = Counter;
    type Msg = CounterMsg;
    type Env = ();
    type Flags = i64;

    fn init(_env: &(), start: i64) -> Return<Counter, CounterMsg> {
        Return::singleton(Counter {
            count: start,
            ..Counter::default()
        })
    }

    fn update(_env: &(), model: &Counter, msg: CounterMsg) -> Return<Counter, CounterMsg> {
        let mut next = model.clone();
        match msg {
            CounterMsg::Add(n) => {
                next.count += n;
                Return::singleton(next)
            }
            CounterMsg::Rename(label) => {
                next.label = label;
                Return::singleton(next)
            }
            CounterMsg::AddLater(delay, n) => {
                Return::val(next, Cmd::sleep(delay, CounterMsg::Add(n)))
            }
            CounterMsg::AddFromTask(n) => Return::val(
                next,
                Cmd::task(
                    move || async move { Ok::<i64, EffectError>(n) },
                    CounterMsg::Add,
                    |e: EffectError| CounterMsg::Failed(e.to_string()),
                ),
            ),
            CounterMsg::PanickingTask => Return::val(
                next,
                Cmd::task(
                    || async {
                        let blow_up = true;
                        if blow_up {
                            panic!("task blew up");
                        }
                        Ok::<(), EffectError>(())
                    },
                    |()| CounterMsg::Add(1),
                    |e: EffectError| CounterMsg::Failed(e.to_string()),
                ),
            ),
            CounterMsg::PanickingCallback => Return::val(
                next,
                Cmd::task(
                    || async { Ok::<i64, EffectError>(1) },
                    |_: i64| -> CounterMsg { panic!("callback blew up") },
                    |e: EffectError| CounterMsg::Failed(e.to_string()),
                ),
            ),
            CounterMsg::MissingTask => {
                let task: Option<fn() -> std::future::Ready<Result<i64, EffectError>>> = None;
                Return::val(
                    next,
                    Cmd::try_task(task, CounterMsg::Add, |e: EffectError| {
                        CounterMsg::Failed(e.to_string())
                    }),
                )
            }
            CounterMsg::Failed(reason) => {
                next.errors.push(reason);
                Return::singleton(next)
            }
            CounterMsg::Confirm(n) => Return::val(
                next,
                Cmd::alert(
                    Alert::new("Add?", format!("Add {}", n))
                        .button(AlertButton::cancel("No"))
                        .button(AlertButton::new("Yes", Some(CounterMsg::Add(n)))),
                ),
            ),
            CounterMsg::Go(path) => Return::val(next, Cmd::push(path)),
            CounterMsg::Fetch(path) => Return::val(
                next,
                Cmd::http(HttpRequest::get(path, CounterMsg::Fetched)),
            ),
            CounterMsg::Fetched(data) => {
                next.fetched = Some(data);
                Return::singleton(next)
            }
            CounterMsg::Explode => panic!("update blew up"),
        }
    }
}

/// Store that mirrors a counter store's count through a subscription.
pub struct WatcherUpdate;

pub struct WatcherEnv {
    pub source: Store<CounterUpdate>,
    /// Registered twice under the same key when true.
    pub duplicate: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Watcher {
    pub seen: Vec<i64>,
}

#[derive(Debug)]
pub enum WatcherMsg {
    CountChanged(i64),
}

pub const COUNT_KEY: &str = "watcher/count";

pub fn watch_count(source: &Store<CounterUpdate>) -> Sub<WatcherMsg> {
    Sub::watch_store(
        source,
        |counter: &Counter| counter.count,
        |count: &i64| WatcherMsg::CountChanged(*count),
        COUNT_KEY,
    )
}

impl Update for WatcherUpdate {
    type Model = Watcher;
    type Msg = WatcherMsg;
    type Env = WatcherEnv;
    type Flags = ();

    fn init(_env: &WatcherEnv, _flags: ()) -> Return<Watcher, WatcherMsg> {
        Return::singleton(Watcher::default())
    }

    fn update(_env: &WatcherEnv, model: &Watcher, msg: WatcherMsg) -> Return<Watcher, WatcherMsg> {
        match msg {
            WatcherMsg::CountChanged(count) => {
                let mut next = model.clone();
                next.seen.push(count);
                Return::singleton(next)
            }
        }
    }

    fn subscriptions(env: &WatcherEnv, _model: &Watcher) -> Sub<WatcherMsg> {
        if env.duplicate {
            Sub::batch([watch_count(&env.source), watch_count(&env.source)])
        } else {
            watch_count(&env.source)
        }
    }
}

/// Create a temporary config file with `content`.
pub fn temp_config(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, content).expect("Failed to write config");
    (temp_dir, config_path)
}
