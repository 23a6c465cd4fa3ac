//! Effect descriptors returned by update functions.
//!
//! An update never performs I/O. It returns a [`Cmd`] describing what should
//! happen, and the store hands it to [`EffectHandlers`](super::EffectHandlers)
//! after committing the new model.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;

use super::error::{ApiError, EffectError};
use super::remote_data::{RemoteData, WebData};

type MapFn<Msg, P> = Arc<dyn Fn(Msg) -> P + Send + Sync>;

/// Tag of a leaf command, used for logging and handler dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdTag {
    Task,
    Attempt,
    Http,
    Navigate,
    Sleep,
    Alert,
}

impl fmt::Display for CmdTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CmdTag::Task => "TASK",
            CmdTag::Attempt => "ATTEMPT",
            CmdTag::Http => "HTTP",
            CmdTag::Navigate => "NAVIGATE",
            CmdTag::Sleep => "SLEEP",
            CmdTag::Alert => "ALERT",
        };
        f.write_str(name)
    }
}

/// A request for the store to perform a side effect.
///
/// Batches may nest to any depth. Flattening happens when the effect
/// handlers consume the command, but [`Cmd::map`] visits every leaf
/// regardless of nesting.
pub enum Cmd<Msg> {
    /// No effect.
    None,
    /// Run an async function resolving to `Result<T, E>`.
    Task(Task<Msg>),
    /// Run an async function resolving to a `(Option<E>, T)` pair.
    Attempt(Task<Msg>),
    /// Perform a request through the shared API client.
    Http(HttpRequest<Msg>),
    /// Ask the router to move.
    Navigate(Navigation),
    /// Deliver a message after a delay.
    Sleep(Sleep<Msg>),
    /// Show a dialog; buttons may carry a message.
    Alert(Alert<Msg>),
    /// Several commands, executed in order of submission.
    Batch(Vec<Cmd<Msg>>),
}

impl<Msg: Send + 'static> Cmd<Msg> {
    pub fn none() -> Self {
        Cmd::None
    }

    /// Run `task` and turn its outcome into a message.
    ///
    /// A panic while starting or polling the task is routed to
    /// `on_failure` as [`EffectError::Panicked`].
    pub fn task<T, E, F, Fut>(
        task: F,
        on_success: impl FnOnce(T) -> Msg + Send + 'static,
        on_failure: impl FnOnce(E) -> Msg + Send + 'static,
    ) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: From<EffectError> + Send + 'static,
    {
        Self::try_task(Some(task), on_success, on_failure)
    }

    /// Like [`Cmd::task`], but accepts a task that may be missing, for
    /// example a service looked up by name. A missing task still yields a
    /// runnable descriptor: it rejects immediately with
    /// [`EffectError::NotInvocable`] so the failure travels through
    /// `on_failure` instead of aborting the dispatch.
    pub fn try_task<T, E, F, Fut>(
        task: Option<F>,
        on_success: impl FnOnce(T) -> Msg + Send + 'static,
        on_failure: impl FnOnce(E) -> Msg + Send + 'static,
    ) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: From<EffectError> + Send + 'static,
    {
        let label = short_type_name::<F>();
        let Some(task) = task else {
            return Cmd::Task(Task::rejecting(label, on_failure));
        };

        let run_label = label.clone();
        Cmd::Task(Task::new(label, move || {
            async move {
                match guarded(&run_label, task).await {
                    Ok(Ok(value)) => on_success(value),
                    Ok(Err(error)) => on_failure(error),
                    Err(panic) => on_failure(E::from(panic)),
                }
            }
            .boxed()
        }))
    }

    /// Run `task`, which reports failure Go-style as the first element of a
    /// pair instead of through `Err`.
    pub fn attempt<T, E, F, Fut>(
        task: F,
        on_success: impl FnOnce(T) -> Msg + Send + 'static,
        on_failure: impl FnOnce(E) -> Msg + Send + 'static,
    ) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = (Option<E>, T)> + Send + 'static,
        T: Send + 'static,
        E: From<EffectError> + Send + 'static,
    {
        let label = short_type_name::<F>();
        let run_label = label.clone();
        Cmd::Attempt(Task::new(label, move || {
            async move {
                match guarded(&run_label, task).await {
                    Ok((Some(error), _)) => on_failure(error),
                    Ok((None, data)) => on_success(data),
                    Err(panic) => on_failure(E::from(panic)),
                }
            }
            .boxed()
        }))
    }

    pub fn http(request: HttpRequest<Msg>) -> Self {
        Cmd::Http(request)
    }

    pub fn navigate(navigation: Navigation) -> Self {
        Cmd::Navigate(navigation)
    }

    pub fn push(pathname: impl Into<String>) -> Self {
        Cmd::Navigate(Navigation::push(pathname))
    }

    pub fn replace(pathname: impl Into<String>) -> Self {
        Cmd::Navigate(Navigation::replace(pathname))
    }

    pub fn back() -> Self {
        Cmd::Navigate(Navigation::back())
    }

    pub fn sleep(duration: Duration, msg: Msg) -> Self {
        Cmd::Sleep(Sleep { duration, msg })
    }

    pub fn alert(alert: Alert<Msg>) -> Self {
        Cmd::Alert(alert)
    }

    /// Flatten any mix of leaves, `None`s and nested batches into a single
    /// flat batch. Order is preserved and `None`s are dropped.
    pub fn batch<I>(cmds: I) -> Self
    where
        I: IntoIterator<Item = Cmd<Msg>>,
    {
        let mut flat = Vec::new();
        for cmd in cmds {
            cmd.flatten_into(&mut flat);
        }
        Cmd::Batch(flat)
    }

    /// Leaf commands in submission order.
    pub fn flatten(self) -> Vec<Cmd<Msg>> {
        let mut flat = Vec::new();
        self.flatten_into(&mut flat);
        flat
    }

    fn flatten_into(self, out: &mut Vec<Cmd<Msg>>) {
        match self {
            Cmd::None => {}
            Cmd::Batch(cmds) => {
                for cmd in cmds {
                    cmd.flatten_into(out);
                }
            }
            leaf => out.push(leaf),
        }
    }

    /// True when executing this command would do nothing.
    pub fn is_none(&self) -> bool {
        match self {
            Cmd::None => true,
            Cmd::Batch(cmds) => cmds.iter().all(Cmd::is_none),
            _ => false,
        }
    }

    /// Leaf tag, or `None` for `Cmd::None` and batches.
    pub fn tag(&self) -> Option<CmdTag> {
        match self {
            Cmd::None | Cmd::Batch(_) => None,
            Cmd::Task(_) => Some(CmdTag::Task),
            Cmd::Attempt(_) => Some(CmdTag::Attempt),
            Cmd::Http(_) => Some(CmdTag::Http),
            Cmd::Navigate(_) => Some(CmdTag::Navigate),
            Cmd::Sleep(_) => Some(CmdTag::Sleep),
            Cmd::Alert(_) => Some(CmdTag::Alert),
        }
    }

    /// Rewrite every message this command can produce through `f`.
    ///
    /// Recurses into nested batches. `Navigate` carries no message and
    /// passes through unchanged.
    pub fn map<P, F>(self, f: F) -> Cmd<P>
    where
        F: Fn(Msg) -> P + Send + Sync + 'static,
        P: Send + 'static,
    {
        let f: MapFn<Msg, P> = Arc::new(f);
        self.map_with(&f)
    }

    fn map_with<P: Send + 'static>(self, f: &MapFn<Msg, P>) -> Cmd<P> {
        match self {
            Cmd::None => Cmd::None,
            Cmd::Task(task) => Cmd::Task(task.map_with(Arc::clone(f))),
            Cmd::Attempt(task) => Cmd::Attempt(task.map_with(Arc::clone(f))),
            Cmd::Http(request) => Cmd::Http(request.map_with(Arc::clone(f))),
            Cmd::Navigate(navigation) => Cmd::Navigate(navigation),
            Cmd::Sleep(Sleep { duration, msg }) => Cmd::Sleep(Sleep {
                duration,
                msg: f(msg),
            }),
            Cmd::Alert(alert) => Cmd::Alert(alert.map_with(f)),
            Cmd::Batch(cmds) => Cmd::Batch(cmds.into_iter().map(|c| c.map_with(f)).collect()),
        }
    }
}

impl<Msg: Send + 'static> From<Vec<Cmd<Msg>>> for Cmd<Msg> {
    fn from(cmds: Vec<Cmd<Msg>>) -> Self {
        Cmd::Batch(cmds)
    }
}

impl<Msg: Send + 'static> From<Option<Cmd<Msg>>> for Cmd<Msg> {
    fn from(cmd: Option<Cmd<Msg>>) -> Self {
        cmd.unwrap_or(Cmd::None)
    }
}

impl<Msg: fmt::Debug> fmt::Debug for Cmd<Msg> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cmd::None => f.write_str("Cmd::None"),
            Cmd::Task(task) => f.debug_tuple("Cmd::Task").field(&task.label).finish(),
            Cmd::Attempt(task) => f.debug_tuple("Cmd::Attempt").field(&task.label).finish(),
            Cmd::Http(request) => f.debug_tuple("Cmd::Http").field(&request.request).finish(),
            Cmd::Navigate(navigation) => f.debug_tuple("Cmd::Navigate").field(navigation).finish(),
            Cmd::Sleep(sleep) => f.debug_tuple("Cmd::Sleep").field(sleep).finish(),
            Cmd::Alert(alert) => f.debug_tuple("Cmd::Alert").field(alert).finish(),
            Cmd::Batch(cmds) => f.debug_tuple("Cmd::Batch").field(cmds).finish(),
        }
    }
}

/// An async computation with its message callbacks already attached.
pub struct Task<Msg> {
    label: String,
    run: Box<dyn FnOnce() -> BoxFuture<'static, Msg> + Send>,
}

impl<Msg: Send + 'static> Task<Msg> {
    fn new(
        label: String,
        run: impl FnOnce() -> BoxFuture<'static, Msg> + Send + 'static,
    ) -> Self {
        Self {
            label,
            run: Box::new(run),
        }
    }

    fn rejecting<E>(label: String, on_failure: impl FnOnce(E) -> Msg + Send + 'static) -> Self
    where
        E: From<EffectError> + Send + 'static,
    {
        let error = EffectError::NotInvocable {
            label: label.clone(),
            reason: "no task was supplied".to_string(),
        };
        Self::new(label, move || async move { on_failure(E::from(error)) }.boxed())
    }

    /// Name of the task closure, for logs.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Start the task. The returned future resolves to the message produced
    /// by whichever callback ran.
    pub fn run(self) -> BoxFuture<'static, Msg> {
        (self.run)()
    }

    fn map_with<P: Send + 'static>(self, f: MapFn<Msg, P>) -> Task<P> {
        let run = self.run;
        Task::new(self.label, move || {
            let inner = run();
            async move { f(inner.await) }.boxed()
        })
    }
}

/// HTTP methods understood by the API client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// Plain description of a request, as the API client sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    /// Path relative to the client's base URL, or an absolute URL.
    pub url: String,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

type MsgCreator<Msg> = Box<dyn FnOnce(WebData<Value>) -> Msg + Send>;
type ErrorCreator<Msg> = Box<dyn FnOnce(ApiError) -> Msg + Send>;

/// Declarative HTTP effect.
pub struct HttpRequest<Msg> {
    pub request: ApiRequest,
    responder: HttpResponder<Msg>,
}

/// Message creators of an [`HttpRequest`], split off so the request can be
/// sent while the creators wait for the answer.
pub struct HttpResponder<Msg> {
    msg_creator: MsgCreator<Msg>,
    error_creator: Option<ErrorCreator<Msg>>,
}

impl<Msg: Send + 'static> HttpRequest<Msg> {
    /// `msg_creator` receives `Success(body)`, or `Failure(err)` when no
    /// error creator is set.
    pub fn new(
        request: ApiRequest,
        msg_creator: impl FnOnce(WebData<Value>) -> Msg + Send + 'static,
    ) -> Self {
        Self {
            request,
            responder: HttpResponder {
                msg_creator: Box::new(msg_creator),
                error_creator: None,
            },
        }
    }

    pub fn get(
        url: impl Into<String>,
        msg_creator: impl FnOnce(WebData<Value>) -> Msg + Send + 'static,
    ) -> Self {
        Self::new(ApiRequest::new(HttpMethod::Get, url), msg_creator)
    }

    pub fn post(
        url: impl Into<String>,
        body: Value,
        msg_creator: impl FnOnce(WebData<Value>) -> Msg + Send + 'static,
    ) -> Self {
        Self::new(
            ApiRequest::new(HttpMethod::Post, url).with_body(body),
            msg_creator,
        )
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request = self.request.with_header(name, value);
        self
    }

    /// Route failures to a dedicated message instead of `msg_creator`.
    pub fn on_error(
        mut self,
        error_creator: impl FnOnce(ApiError) -> Msg + Send + 'static,
    ) -> Self {
        self.responder.error_creator = Some(Box::new(error_creator));
        self
    }

    pub fn into_parts(self) -> (ApiRequest, HttpResponder<Msg>) {
        (self.request, self.responder)
    }

    fn map_with<P: Send + 'static>(self, f: MapFn<Msg, P>) -> HttpRequest<P> {
        HttpRequest {
            request: self.request,
            responder: self.responder.map_with(f),
        }
    }
}

impl<Msg: Send + 'static> HttpResponder<Msg> {
    /// Turn the client's answer into the message to dispatch.
    pub fn respond(self, result: Result<Value, ApiError>) -> Msg {
        match (result, self.error_creator) {
            (Ok(body), _) => (self.msg_creator)(RemoteData::Success(body)),
            (Err(error), Some(error_creator)) => error_creator(error),
            (Err(error), None) => (self.msg_creator)(RemoteData::Failure(error)),
        }
    }

    fn map_with<P: Send + 'static>(self, f: MapFn<Msg, P>) -> HttpResponder<P> {
        let msg_creator = self.msg_creator;
        let on_data = Arc::clone(&f);
        HttpResponder {
            msg_creator: Box::new(move |data: WebData<Value>| on_data(msg_creator(data))),
            error_creator: self.error_creator.map(|error_creator| {
                Box::new(move |error: ApiError| f(error_creator(error))) as ErrorCreator<P>
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavMethod {
    Push,
    Replace,
    Back,
}

/// Navigation intent. `Back` ignores `pathname` and `params`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub method: NavMethod,
    pub pathname: String,
    pub params: BTreeMap<String, String>,
}

impl Navigation {
    pub fn push(pathname: impl Into<String>) -> Self {
        Self {
            method: NavMethod::Push,
            pathname: pathname.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn replace(pathname: impl Into<String>) -> Self {
        Self {
            method: NavMethod::Replace,
            pathname: pathname.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn back() -> Self {
        Self {
            method: NavMethod::Back,
            pathname: String::new(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug)]
pub struct Sleep<Msg> {
    pub duration: Duration,
    pub msg: Msg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonStyle {
    #[default]
    Default,
    Cancel,
    Destructive,
}

#[derive(Debug)]
pub struct AlertButton<Msg> {
    pub text: String,
    pub style: ButtonStyle,
    pub on_press: Option<Msg>,
}

impl<Msg> AlertButton<Msg> {
    pub fn new(text: impl Into<String>, on_press: Option<Msg>) -> Self {
        Self {
            text: text.into(),
            style: ButtonStyle::Default,
            on_press,
        }
    }

    pub fn cancel(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: ButtonStyle::Cancel,
            on_press: None,
        }
    }

    pub fn destructive(text: impl Into<String>, on_press: Msg) -> Self {
        Self {
            text: text.into(),
            style: ButtonStyle::Destructive,
            on_press: Some(on_press),
        }
    }
}

#[derive(Debug)]
pub struct Alert<Msg> {
    pub title: String,
    pub message: String,
    pub buttons: Vec<AlertButton<Msg>>,
}

/// What a presenter needs to draw an alert; messages stay with the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertSpec {
    pub title: String,
    pub message: String,
    pub buttons: Vec<(String, ButtonStyle)>,
}

impl<Msg> Alert<Msg> {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            buttons: Vec::new(),
        }
    }

    pub fn button(mut self, button: AlertButton<Msg>) -> Self {
        self.buttons.push(button);
        self
    }

    /// Separate the presentable part from the per-button messages.
    pub fn split(self) -> (AlertSpec, Vec<Option<Msg>>) {
        let mut labels = Vec::with_capacity(self.buttons.len());
        let mut messages = Vec::with_capacity(self.buttons.len());
        for button in self.buttons {
            labels.push((button.text, button.style));
            messages.push(button.on_press);
        }
        (
            AlertSpec {
                title: self.title,
                message: self.message,
                buttons: labels,
            },
            messages,
        )
    }

    fn map_with<P>(self, f: &MapFn<Msg, P>) -> Alert<P> {
        Alert {
            title: self.title,
            message: self.message,
            buttons: self
                .buttons
                .into_iter()
                .map(|b| AlertButton {
                    text: b.text,
                    style: b.style,
                    on_press: b.on_press.map(|m| f(m)),
                })
                .collect(),
        }
    }
}

/// Start and poll `task`, turning a panic at either step into an error.
async fn guarded<F, Fut>(label: &str, task: F) -> Result<Fut::Output, EffectError>
where
    F: FnOnce() -> Fut,
    Fut: Future,
{
    let panicked = |payload: Box<dyn Any + Send>| EffectError::Panicked {
        label: label.to_string(),
        message: panic_message(payload.as_ref()),
    };
    let fut = std::panic::catch_unwind(AssertUnwindSafe(task)).map_err(panicked)?;
    AssertUnwindSafe(fut).catch_unwind().await.map_err(panicked)
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn short_type_name<T>() -> String {
    let full = std::any::type_name::<T>();
    full.split('<').next().unwrap_or(full).to_string()
}
