//! Lifecycle of an asynchronously fetched value.

use serde::{Deserialize, Serialize};

use super::error::ApiError;

/// Data that arrives over the network, or fails trying.
pub type WebData<A> = RemoteData<ApiError, A>;

/// Four-state tagged union for async data.
///
/// The type carries no transition rules. Feature updates follow the
/// convention `NotAsked -> Loading -> Success | Failure`, and a re-fetch
/// goes `Success -> Loading` without passing back through `NotAsked`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum RemoteData<E, A> {
    /// No fetch attempted yet.
    #[default]
    NotAsked,
    /// Fetch in flight.
    Loading,
    /// Fetch completed with an error.
    Failure(E),
    /// Fetch completed with a value.
    Success(A),
}

impl<E, A> RemoteData<E, A> {
    pub fn not_asked() -> Self {
        Self::NotAsked
    }

    pub fn loading() -> Self {
        Self::Loading
    }

    pub fn failure(error: E) -> Self {
        Self::Failure(error)
    }

    pub fn success(data: A) -> Self {
        Self::Success(data)
    }

    pub fn is_not_asked(&self) -> bool {
        matches!(self, Self::NotAsked)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Success data by reference, if any.
    pub fn success_ref(&self) -> Option<&A> {
        match self {
            Self::Success(data) => Some(data),
            _ => None,
        }
    }

    /// Error by reference, if any.
    pub fn failure_ref(&self) -> Option<&E> {
        match self {
            Self::Failure(error) => Some(error),
            _ => None,
        }
    }

    pub fn as_ref(&self) -> RemoteData<&E, &A> {
        match self {
            Self::NotAsked => RemoteData::NotAsked,
            Self::Loading => RemoteData::Loading,
            Self::Failure(error) => RemoteData::Failure(error),
            Self::Success(data) => RemoteData::Success(data),
        }
    }

    /// Transform the success value. Every other tag passes through.
    pub fn map<B, F>(self, f: F) -> RemoteData<E, B>
    where
        F: FnOnce(A) -> B,
    {
        match self {
            Self::NotAsked => RemoteData::NotAsked,
            Self::Loading => RemoteData::Loading,
            Self::Failure(error) => RemoteData::Failure(error),
            Self::Success(data) => RemoteData::Success(f(data)),
        }
    }

    /// Transform the error. Every other tag passes through.
    pub fn map_failure<G, F>(self, f: F) -> RemoteData<G, A>
    where
        F: FnOnce(E) -> G,
    {
        match self {
            Self::NotAsked => RemoteData::NotAsked,
            Self::Loading => RemoteData::Loading,
            Self::Failure(error) => RemoteData::Failure(f(error)),
            Self::Success(data) => RemoteData::Success(data),
        }
    }

    /// The success value, or `default` for any other tag.
    pub fn with_default(self, default: A) -> A {
        match self {
            Self::Success(data) => data,
            _ => default,
        }
    }

    /// Exhaustive dispatch: exactly one of the four callbacks runs.
    pub fn fold<R>(
        self,
        on_not_asked: impl FnOnce() -> R,
        on_loading: impl FnOnce() -> R,
        on_failure: impl FnOnce(E) -> R,
        on_success: impl FnOnce(A) -> R,
    ) -> R {
        match self {
            Self::NotAsked => on_not_asked(),
            Self::Loading => on_loading(),
            Self::Failure(error) => on_failure(error),
            Self::Success(data) => on_success(data),
        }
    }

    /// Chain a computation that only runs on `Success` and may itself
    /// produce any tag.
    pub fn and_then<B, F>(self, f: F) -> RemoteData<E, B>
    where
        F: FnOnce(A) -> RemoteData<E, B>,
    {
        match self {
            Self::NotAsked => RemoteData::NotAsked,
            Self::Loading => RemoteData::Loading,
            Self::Failure(error) => RemoteData::Failure(error),
            Self::Success(data) => f(data),
        }
    }
}

impl<E, A> From<Result<A, E>> for RemoteData<E, A> {
    fn from(result: Result<A, E>) -> Self {
        match result {
            Ok(data) => Self::Success(data),
            Err(error) => Self::Failure(error),
        }
    }
}
