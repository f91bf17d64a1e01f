#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Query binding engine.
//!
//! A [`QueryBinding`] ties one [`Query`] to the `{data, loading, error}`
//! state a view renders. Every request it issues carries a
//! [`Generation`]; a completion is applied only when its generation is
//! still the binding's current one, so the visible state always reflects
//! the most recently *issued* request regardless of the order in which
//! responses arrive.

pub mod binding;

use asrs_query_models::{ContractError, ParamKey, ParamSet, QueryState};
use asrs_transport::{Transport, TransportError};
use thiserror::Error;

pub use asrs_query_models::{Generation, QueryPhase, QueryView};
pub use binding::{Outcome, QueryBinding, Request};

/// Errors surfaced in a binding's `error` state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Network or HTTP-level failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The response arrived but does not satisfy its schema.
    #[error(transparent)]
    Contract(#[from] ContractError),
}

/// State snapshot of a binding over query output `T`.
pub type BindingState<T> = QueryState<T, QueryError>;

/// A named, parameterised analytics query.
///
/// Implementations describe where the query lives, which parameters it
/// sends and how its JSON response is validated into [`Self::Output`].
pub trait Query: Send + Sync + 'static {
    /// Validated response type.
    type Output: Send + Sync + 'static;

    /// Short name used in logs and contract errors (e.g. `"timeline"`).
    fn name(&self) -> &'static str;

    /// Request path relative to the transport's base path, with any path
    /// parameters already substituted.
    fn path(&self) -> String;

    /// Query-string parameters. Absent values are omitted.
    fn params(&self) -> ParamSet;

    /// Validates a response body.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError`] if a required field is missing or
    /// malformed or a cross-field invariant does not hold.
    fn decode(&self, value: serde_json::Value) -> Result<Self::Output, ContractError>;

    /// Identity of this query's inputs. Covers the path so that path
    /// parameters take part in change detection.
    fn key(&self) -> ParamKey {
        ParamKey::scoped(&self.path(), &self.params())
    }
}

/// Runs `query` once, outside of any binding.
///
/// # Errors
///
/// Returns [`QueryError::Transport`] if the request fails and
/// [`QueryError::Contract`] if the response does not validate.
pub async fn fetch<Q: Query + ?Sized>(
    transport: &dyn Transport,
    query: &Q,
) -> Result<Q::Output, QueryError> {
    let path = query.path();
    let value = transport.execute(&path, &query.params()).await?;
    query.decode(value).map_err(|e| {
        log::warn!("{}: contract violation: {e}", query.name());
        QueryError::Contract(e)
    })
}
