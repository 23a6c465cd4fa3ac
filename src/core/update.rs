//! The contract every feature store implements.

use std::fmt::Debug;

use super::ret::Return;
use super::sub::Sub;

/// Marker trait for feature models.
///
/// Models should be:
/// - Immutable (each update returns a new value)
/// - Self-contained (everything a view needs)
/// - Comparable (`PartialEq` lets the store skip no-op commits)
pub trait Model: Clone + PartialEq + Debug + Send + Sync + 'static {}

impl<T> Model for T where T: Clone + PartialEq + Debug + Send + Sync + 'static {}

/// Marker trait for feature messages.
///
/// Messages represent:
/// - User actions (button taps, form submits)
/// - Effect results (API responses, timers)
/// - Changes observed in other stores
pub trait Message: Debug + Send + 'static {}

impl<T> Message for T where T: Debug + Send + 'static {}

/// Update logic for one feature store.
///
/// `update` is the only place where the model changes. It must be pure:
/// any I/O is described by the returned command and performed later by the
/// effect handlers. The environment carries what commands need to capture
/// (service handles, other stores to watch) and is fixed for the store's
/// lifetime.
pub trait Update: 'static {
    type Model: Model;
    type Msg: Message;
    /// Services and store handles, injected once at store creation.
    type Env: Send + Sync + 'static;
    /// Parameters accepted by `init`, e.g. the entity a screen is bound to.
    type Flags: Send + 'static;

    /// Build the initial model and its startup command.
    fn init(env: &Self::Env, flags: Self::Flags) -> Return<Self::Model, Self::Msg>;

    /// Process a message and return the next model plus command.
    fn update(
        env: &Self::Env,
        model: &Self::Model,
        msg: Self::Msg,
    ) -> Return<Self::Model, Self::Msg>;

    /// Other stores this one observes. Registered on every `init`.
    fn subscriptions(_env: &Self::Env, _model: &Self::Model) -> Sub<Self::Msg> {
        Sub::none()
    }
}
