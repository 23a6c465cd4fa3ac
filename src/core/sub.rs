//! Cross-store observation.
//!
//! Store B declares it depends on a value derived from store A's model. The
//! projection is re-evaluated after every commit to A, and B receives a
//! message only when the projected value actually changed. B never sees A's
//! messages or update logic, and never writes A's model.
//!
//! Observation must stay acyclic: dashboards may watch auth, drawers may
//! watch dashboards, never the reverse. A cycle where B's reaction changes
//! what A projects for B will dispatch forever.

use std::sync::Arc;

use parking_lot::Mutex;

use super::store::{Dispatcher, Store, Subscription};
use super::update::{Message, Update};

type Attach<Msg> = Box<dyn FnOnce(Dispatcher<Msg>) -> Subscription + Send>;

/// One keyed observation, not yet attached.
pub struct SubDescriptor<Msg> {
    key: String,
    attach: Attach<Msg>,
}

impl<Msg> SubDescriptor<Msg> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn into_parts(self) -> (String, Attach<Msg>) {
        (self.key, self.attach)
    }
}

/// Set of subscriptions for one store.
pub struct Sub<Msg> {
    descriptors: Vec<SubDescriptor<Msg>>,
}

impl<Msg: Message> Sub<Msg> {
    pub fn none() -> Self {
        Self {
            descriptors: Vec::new(),
        }
    }

    /// Combine several subscription sets into one.
    pub fn batch<I>(subs: I) -> Self
    where
        I: IntoIterator<Item = Sub<Msg>>,
    {
        Self {
            descriptors: subs.into_iter().flat_map(|s| s.descriptors).collect(),
        }
    }

    /// Observe `project(model)` of `store`, delivering `to_msg(value)` to the
    /// subscribing store whenever the value changes.
    ///
    /// On attach the current value is delivered once, so the subscriber
    /// starts in sync. `key` identifies the observation within the
    /// subscribing store; registering the same key again replaces the
    /// earlier observation.
    pub fn watch_store<A, V, P, T>(store: &Store<A>, project: P, to_msg: T, key: impl Into<String>) -> Self
    where
        A: Update,
        V: PartialEq + Send + 'static,
        P: Fn(&A::Model) -> V + Send + Sync + 'static,
        T: Fn(&V) -> Msg + Send + Sync + 'static,
    {
        let source = store.clone();
        let key = key.into();
        let log_key = key.clone();
        let attach = move |dispatcher: Dispatcher<Msg>| {
            let watch = Arc::new(Projection::new(project, to_msg));

            let on_commit = Arc::clone(&watch);
            let commit_dispatcher = dispatcher.clone();
            let commit_key = log_key.clone();
            let subscription = source.subscribe(move |model| {
                if let Some(msg) = on_commit.changed(&**model) {
                    tracing::trace!(key = %commit_key, "watched projection changed");
                    commit_dispatcher.dispatch(msg);
                }
            });
            // Attached first so no commit is missed; the initial value is
            // only sent if no commit has reported a newer one meanwhile.
            if let Some(msg) = watch.initial(|| source.model()) {
                tracing::trace!(key = %log_key, "watched projection attached");
                dispatcher.dispatch(msg);
            }
            subscription
        };

        Self {
            descriptors: vec![SubDescriptor {
                key,
                attach: Box::new(attach),
            }],
        }
    }

    pub fn keys(&self) -> Vec<&str> {
        self.descriptors.iter().map(SubDescriptor::key).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub(crate) fn into_descriptors(self) -> Vec<SubDescriptor<Msg>> {
        self.descriptors
    }
}

/// Last value seen for one watch, plus how to derive and announce it.
struct Projection<V, P, T> {
    last_seen: Mutex<Option<V>>,
    project: P,
    to_msg: T,
}

impl<V: PartialEq, P, T> Projection<V, P, T> {
    fn new(project: P, to_msg: T) -> Self {
        Self {
            last_seen: Mutex::new(None),
            project,
            to_msg,
        }
    }

    /// Message for a commit of `model`, if its projection differs from the
    /// last one delivered.
    fn changed<M, Msg>(&self, model: &M) -> Option<Msg>
    where
        P: Fn(&M) -> V,
        T: Fn(&V) -> Msg,
    {
        let value = (self.project)(model);
        let mut last = self.last_seen.lock();
        if last.as_ref() == Some(&value) {
            return None;
        }
        let msg = (self.to_msg)(&value);
        *last = Some(value);
        Some(msg)
    }

    /// Message for the value at attach time. `None` when a commit already
    /// delivered a value, which is never older than the current snapshot.
    fn initial<M, Msg>(&self, snapshot: impl FnOnce() -> Arc<M>) -> Option<Msg>
    where
        P: Fn(&M) -> V,
        T: Fn(&V) -> Msg,
    {
        let mut last = self.last_seen.lock();
        if last.is_some() {
            return None;
        }
        let snapshot = snapshot();
        let value = (self.project)(&*snapshot);
        let msg = (self.to_msg)(&value);
        *last = Some(value);
        Some(msg)
    }
}
