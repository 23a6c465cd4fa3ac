//! The runtime that owns one model and serializes every change to it.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use super::cmd::Cmd;
use super::effects::{EffectHandlers, EffectTracker, InFlight};
use super::ret::Return;
use super::sub::Sub;
use super::update::Update;

type Listener<M> = Arc<dyn Fn(&Arc<M>) + Send + Sync>;

/// Something messages can be delivered to.
pub(crate) trait DispatchTarget<Msg>: Send + Sync {
    fn dispatch(&self, msg: Msg);
}

/// Weak, cloneable handle for sending messages into a store.
///
/// Held by running effects and by other stores' subscriptions. Once the
/// store is dropped, messages sent here are discarded.
pub struct Dispatcher<Msg> {
    target: Weak<dyn DispatchTarget<Msg>>,
    tracker: Arc<EffectTracker>,
    name: &'static str,
}

impl<Msg> Clone for Dispatcher<Msg> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            tracker: Arc::clone(&self.tracker),
            name: self.name,
        }
    }
}

impl<Msg: std::fmt::Debug + 'static> Dispatcher<Msg> {
    pub fn dispatch(&self, msg: Msg) {
        match self.target.upgrade() {
            Some(target) => target.dispatch(msg),
            None => tracing::trace!(store = self.name, ?msg, "store dropped; message discarded"),
        }
    }
}

impl<Msg> Dispatcher<Msg> {
    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn track(&self) -> InFlight {
        self.tracker.begin()
    }
}

/// Detaches a listener or subscription when dropped.
#[must_use = "dropping a Subscription detaches it immediately"]
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub(crate) fn new(detach: impl FnOnce() + Send + 'static) -> Self {
        Self {
            detach: Some(Box::new(detach)),
        }
    }

    /// Keep the listener attached for the lifetime of the watched store.
    pub fn forget(mut self) {
        self.detach = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

enum Work<U: Update> {
    Msg(U::Msg),
    Init(U::Flags),
}

struct Mailbox<U: Update> {
    pending: VecDeque<Work<U>>,
    draining: bool,
}

struct StoreInner<U: Update> {
    name: &'static str,
    env: U::Env,
    model: RwLock<Arc<U::Model>>,
    mailbox: Mutex<Mailbox<U>>,
    listeners: RwLock<Vec<(u64, Listener<U::Model>)>>,
    next_listener: AtomicU64,
    subs: Mutex<HashMap<String, Subscription>>,
    handlers: EffectHandlers,
    tracker: Arc<EffectTracker>,
    this: Weak<StoreInner<U>>,
}

/// Owner of one feature model.
///
/// A `Store` is a cheap handle; clones share the same model. Stores are
/// created explicitly and passed around, never kept in globals, so tests can
/// build isolated instances.
///
/// # Dispatch
///
/// `dispatch` runs `update` and commits the result before returning, unless
/// another dispatch for this store is already in progress (re-entrantly from
/// a listener, or from an effect on another thread). In that case the
/// message is queued and processed by the active dispatch, in order.
///
/// # Cycles
///
/// Stores observing each other in a cycle can ping-pong messages forever.
/// Queuing keeps this from deadlocking or overflowing the stack, but it does
/// not stop the loop. Keep the observation graph acyclic.
pub struct Store<U: Update> {
    inner: Arc<StoreInner<U>>,
}

impl<U: Update> Clone for Store<U> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<U: Update> Store<U> {
    /// Build a store: run `init`, commit its model, register subscriptions,
    /// then start the init command.
    pub fn create(env: U::Env, flags: U::Flags, handlers: EffectHandlers) -> Self {
        let Return { model, cmd } = U::init(&env, flags);
        let name = short_name::<U>();
        tracing::debug!(store = name, "store created");
        let inner = Arc::new_cyclic(|this| StoreInner {
            name,
            env,
            model: RwLock::new(Arc::new(model)),
            mailbox: Mutex::new(Mailbox {
                pending: VecDeque::new(),
                draining: false,
            }),
            listeners: RwLock::new(Vec::new()),
            next_listener: AtomicU64::new(0),
            subs: Mutex::new(HashMap::new()),
            handlers,
            tracker: Arc::new(EffectTracker::default()),
            this: this.clone(),
        });
        let model = inner.model();
        inner.register(U::subscriptions(&inner.env, &model));
        inner.run_effects(cmd);
        Self { inner }
    }

    /// Current model snapshot.
    pub fn model(&self) -> Arc<U::Model> {
        self.inner.model()
    }

    pub fn env(&self) -> &U::Env {
        &self.inner.env
    }

    pub fn dispatch(&self, msg: U::Msg) {
        self.inner.enqueue(Work::Msg(msg));
    }

    pub fn dispatcher(&self) -> Dispatcher<U::Msg> {
        self.inner.dispatcher()
    }

    /// Re-run `init` with new flags. The model is replaced, not merged, and
    /// subscriptions are dropped and registered again.
    pub fn init(&self, flags: U::Flags) {
        self.inner.enqueue(Work::Init(flags));
    }

    /// Call `listener` after every commit that changed the model.
    pub fn subscribe(
        &self,
        listener: impl Fn(&Arc<U::Model>) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.inner.next_listener.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.write().push((id, Arc::new(listener)));
        let inner = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.listeners.write().retain(|(other, _)| *other != id);
            }
        })
    }

    /// Register extra subscriptions. A key that is already registered is
    /// replaced, never duplicated.
    pub fn watch(&self, sub: Sub<U::Msg>) {
        self.inner.register(sub);
    }

    /// Keys of the subscriptions this store currently holds.
    pub fn subscription_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.subs.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of commit listeners attached to this store.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.read().len()
    }

    /// Number of effects started by this store that have not finished.
    pub fn effects_in_flight(&self) -> usize {
        self.inner.tracker.in_flight()
    }

    /// Wait until no effect started by this store is still running.
    ///
    /// With a multi-threaded runtime a message produced by the last effect
    /// may still be queued behind a dispatch on another thread when this
    /// returns.
    pub async fn settled(&self) {
        self.inner.tracker.settled().await;
    }
}

impl<U: Update> StoreInner<U> {
    fn model(&self) -> Arc<U::Model> {
        Arc::clone(&self.model.read())
    }

    fn dispatcher(&self) -> Dispatcher<U::Msg> {
        let target: Weak<dyn DispatchTarget<U::Msg>> = self.this.clone();
        Dispatcher {
            target,
            tracker: Arc::clone(&self.tracker),
            name: self.name,
        }
    }

    fn enqueue(&self, work: Work<U>) {
        {
            let mut mailbox = self.mailbox.lock();
            mailbox.pending.push_back(work);
            if mailbox.draining {
                tracing::trace!(store = self.name, "queued behind active dispatch");
                return;
            }
            mailbox.draining = true;
        }

        let _reset = scopeguard::guard_on_unwind((), |()| {
            let mut mailbox = self.mailbox.lock();
            tracing::error!(
                store = self.name,
                dropped = mailbox.pending.len(),
                "update panicked; pending messages dropped"
            );
            mailbox.pending.clear();
            mailbox.draining = false;
        });

        loop {
            let next = {
                let mut mailbox = self.mailbox.lock();
                match mailbox.pending.pop_front() {
                    Some(next) => next,
                    None => {
                        mailbox.draining = false;
                        break;
                    }
                }
            };
            self.process(next);
        }
    }

    fn process(&self, work: Work<U>) {
        match work {
            Work::Msg(msg) => {
                tracing::trace!(store = self.name, ?msg, "dispatch");
                let current = self.model();
                let Return { model, cmd } = U::update(&self.env, &current, msg);
                self.commit(model);
                self.run_effects(cmd);
            }
            Work::Init(flags) => {
                tracing::debug!(store = self.name, "re-initializing");
                let Return { model, cmd } = U::init(&self.env, flags);
                let previous = std::mem::take(&mut *self.subs.lock());
                drop(previous);
                self.commit(model);
                let model = self.model();
                self.register(U::subscriptions(&self.env, &model));
                self.run_effects(cmd);
            }
        }
    }

    /// Swap in `next` and notify listeners, unless nothing changed.
    fn commit(&self, next: U::Model) {
        let next = {
            let mut slot = self.model.write();
            if **slot == next {
                return;
            }
            let next = Arc::new(next);
            *slot = Arc::clone(&next);
            next
        };

        let listeners: Vec<Listener<U::Model>> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&next);
        }
    }

    fn run_effects(&self, cmd: Cmd<U::Msg>) {
        if cmd.is_none() {
            return;
        }
        self.handlers.run(cmd, &self.dispatcher());
    }

    fn register(&self, sub: Sub<U::Msg>) {
        // Within one set the last descriptor for a key wins, so a key is
        // attached (and delivers its initial value) at most once.
        let mut pending = Vec::new();
        for descriptor in sub.into_descriptors() {
            let (key, attach) = descriptor.into_parts();
            if let Some(pos) = pending.iter().position(|(other, _)| *other == key) {
                tracing::debug!(store = self.name, %key, "duplicate subscription key");
                pending.remove(pos);
            }
            pending.push((key, attach));
        }

        for (key, attach) in pending {
            let replaced = self.subs.lock().remove(&key);
            if replaced.is_some() {
                tracing::debug!(store = self.name, %key, "subscription replaced");
            }
            drop(replaced);
            let subscription = attach(self.dispatcher());
            self.subs.lock().insert(key, subscription);
        }
    }
}

impl<U: Update> DispatchTarget<U::Msg> for StoreInner<U> {
    fn dispatch(&self, msg: U::Msg) {
        self.enqueue(Work::Msg(msg));
    }
}

fn short_name<U>() -> &'static str {
    let full = std::any::type_name::<U>();
    full.rsplit("::").next().unwrap_or(full)
}
