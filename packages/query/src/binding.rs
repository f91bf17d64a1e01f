//! Per-binding state machine.
//!
//! ```text
//! Idle ──activate──▶ Loading ──current ok──▶ Settled(Ok)
//!                      │  ▲   ──current err─▶ Settled(Err)
//!                      │  └── key change / refetch (from any state)
//!                      └── stale completion: no transition
//! ```
//!
//! Requests run on spawned Tokio tasks. All transitions happen inside a
//! short critical section on the binding's control block, which is never
//! held across an `.await`, so transitions are applied one at a time.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use asrs_query_models::{Generation, ParamKey};
use asrs_transport::Transport;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{BindingState, Query, QueryError, fetch};

/// What happened to one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The response (success or failure) was applied to the binding.
    Applied,
    /// A newer request superseded this one; the response was dropped.
    Stale,
    /// The binding was destroyed before the response arrived.
    Detached,
}

/// Handle to one issued request.
///
/// Dropping it does not cancel anything; the request keeps running and
/// its completion is still applied or discarded by the generation check.
#[derive(Debug)]
pub struct Request {
    generation: Generation,
    handle: JoinHandle<Outcome>,
}

impl Request {
    /// Generation assigned to this request.
    #[must_use]
    pub const fn generation(&self) -> Generation {
        self.generation
    }

    /// Waits for the request to complete and reports whether it was
    /// applied.
    pub async fn finished(self) -> Outcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::debug!("request {} did not complete: {e}", self.generation);
                Outcome::Detached
            }
        }
    }
}

struct Control<Q> {
    query: Option<Arc<Q>>,
    key: Option<ParamKey>,
    generation: Generation,
}

struct Inner<Q: Query> {
    transport: Arc<dyn Transport>,
    control: Mutex<Control<Q>>,
    state_tx: watch::Sender<BindingState<Q::Output>>,
}

impl<Q: Query> Inner<Q> {
    fn control(&self) -> MutexGuard<'_, Control<Q>> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies a completion if `generation` is still current.
    fn complete(&self, generation: Generation, result: Result<Q::Output, QueryError>) -> Outcome {
        let control = self.control();
        if control.generation != generation {
            log::trace!(
                "discarding stale response {generation} (current {})",
                control.generation
            );
            return Outcome::Stale;
        }

        self.state_tx.send_modify(|state| {
            match result {
                Ok(data) => {
                    state.data = Some(Arc::new(data));
                    state.error = None;
                }
                Err(e) => {
                    state.error = Some(Arc::new(e));
                }
            }
            state.loading = false;
            state.settled_generation = generation;
        });
        drop(control);
        Outcome::Applied
    }
}

/// Live association between a query and the state a view renders.
///
/// Cloning a binding shares it. The binding is destroyed when the last
/// clone is dropped; responses that arrive afterwards are discarded.
pub struct QueryBinding<Q: Query> {
    inner: Arc<Inner<Q>>,
}

impl<Q: Query> Clone for QueryBinding<Q> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<Q: Query> std::fmt::Debug for QueryBinding<Q> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let control = self.inner.control();
        f.debug_struct("QueryBinding")
            .field("key", &control.key)
            .field("generation", &control.generation)
            .finish_non_exhaustive()
    }
}

impl<Q: Query> QueryBinding<Q> {
    /// Creates an idle binding that issues nothing until a query is set.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let (state_tx, _) = watch::channel(BindingState::default());
        Self {
            inner: Arc::new(Inner {
                transport,
                control: Mutex::new(Control {
                    query: None,
                    key: None,
                    generation: Generation::ZERO,
                }),
                state_tx,
            }),
        }
    }

    /// Creates a binding and immediately activates it with `query`.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    #[must_use]
    pub fn bind(transport: Arc<dyn Transport>, query: Q) -> Self {
        let binding = Self::new(transport);
        let _ = binding.set_query(query);
        binding
    }

    /// Points the binding at `query`.
    ///
    /// Issues a new request when the binding was idle or the query's
    /// [`key`](Query::key) differs from the current one. Returns `None`
    /// when nothing relevant changed.
    ///
    /// # Panics
    ///
    /// Panics if a request is issued outside of a Tokio runtime.
    pub fn set_query(&self, query: Q) -> Option<Request> {
        let key = query.key();
        let mut control = self.inner.control();
        if control.key.as_ref() == Some(&key) {
            log::trace!("{}: parameters unchanged ({key})", query.name());
            return None;
        }
        let query = Arc::new(query);
        control.key = Some(key);
        control.query = Some(Arc::clone(&query));
        Some(self.issue(&mut control, query))
    }

    /// Re-issues the current query even though its parameters are
    /// unchanged. Returns `None` if no query was ever set.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn refetch(&self) -> Option<Request> {
        let mut control = self.inner.control();
        let query = control.query.clone()?;
        Some(self.issue(&mut control, query))
    }

    /// Bumps the generation, asserts `loading` and spawns the request.
    /// Prior `data` and `error` are kept until the new request settles.
    fn issue(&self, control: &mut Control<Q>, query: Arc<Q>) -> Request {
        let generation = control.generation.next();
        control.generation = generation;

        log::debug!(
            "{}: issuing request {generation} for {}",
            query.name(),
            query.path()
        );

        self.inner.state_tx.send_modify(|state| {
            state.loading = true;
            state.generation = generation;
        });

        let transport = Arc::clone(&self.inner.transport);
        let weak: Weak<Inner<Q>> = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            let result = fetch(transport.as_ref(), query.as_ref()).await;
            weak.upgrade().map_or_else(
                || {
                    log::trace!("{}: binding dropped before {generation} completed", query.name());
                    Outcome::Detached
                },
                |inner| inner.complete(generation, result),
            )
        });

        Request { generation, handle }
    }

    /// Current state snapshot.
    #[must_use]
    pub fn state(&self) -> BindingState<Q::Output> {
        self.inner.state_tx.borrow().clone()
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<BindingState<Q::Output>> {
        self.inner.state_tx.subscribe()
    }

    /// Waits until the current generation has settled and returns the
    /// resulting state. Returns immediately for an idle binding.
    pub async fn settled(&self) -> BindingState<Q::Output> {
        let mut rx = self.subscribe();
        loop {
            {
                let state = rx.borrow_and_update();
                if !state.loading {
                    return state.clone();
                }
            }
            if rx.changed().await.is_err() {
                return self.state();
            }
        }
    }

    /// Generation of the most recently issued request.
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.inner.control().generation
    }

    /// Key of the current query, if any.
    #[must_use]
    pub fn key(&self) -> Option<ParamKey> {
        self.inner.control().key.clone()
    }

    /// The current query, if any.
    #[must_use]
    pub fn query(&self) -> Option<Arc<Q>> {
        self.inner.control().query.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use asrs_query_models::{ContractError, ParamSet, ParamValue, QueryPhase};
    use asrs_transport::TransportError;
    use async_trait::async_trait;
    use tokio::sync::{mpsc, oneshot};

    use super::*;

    type Reply = Result<serde_json::Value, TransportError>;

    /// A pending call whose completion the test controls.
    struct Call {
        path: String,
        params: ParamSet,
        reply: oneshot::Sender<Reply>,
    }

    impl Call {
        fn respond(self, reply: Reply) {
            let _ = self.reply.send(reply);
        }
    }

    struct ScriptedTransport {
        calls: mpsc::UnboundedSender<Call>,
        count: AtomicUsize,
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn execute(&self, path: &str, params: &ParamSet) -> Reply {
            self.count.fetch_add(1, Ordering::SeqCst);
            let (reply, rx) = oneshot::channel();
            let _ = self.calls.send(Call {
                path: path.to_string(),
                params: params.clone(),
                reply,
            });
            rx.await.unwrap_or_else(|_| {
                Err(TransportError::Network {
                    message: "dropped".to_string(),
                })
            })
        }
    }

    fn scripted() -> (Arc<ScriptedTransport>, mpsc::UnboundedReceiver<Call>) {
        let (calls, rx) = mpsc::unbounded_channel();
        (
            Arc::new(ScriptedTransport {
                calls,
                count: AtomicUsize::new(0),
            }),
            rx,
        )
    }

    #[derive(Debug, Clone)]
    struct YearQuery {
        start_year: Option<i64>,
        end_year: Option<i64>,
    }

    impl YearQuery {
        const fn new(start_year: Option<i64>, end_year: Option<i64>) -> Self {
            Self {
                start_year,
                end_year,
            }
        }
    }

    impl Query for YearQuery {
        type Output = i64;

        fn name(&self) -> &'static str {
            "years"
        }

        fn path(&self) -> String {
            "/years".to_string()
        }

        fn params(&self) -> ParamSet {
            ParamSet::new()
                .with_opt("start_year", self.start_year)
                .with_opt("end_year", self.end_year)
        }

        fn decode(&self, value: serde_json::Value) -> Result<i64, ContractError> {
            value["total"]
                .as_i64()
                .ok_or_else(|| ContractError::MissingField {
                    query: "years",
                    field: "total".to_string(),
                })
        }
    }

    fn ok(total: i64) -> Reply {
        Ok(serde_json::json!({ "total": total }))
    }

    fn server_error() -> Reply {
        Err(TransportError::Status {
            status: 500,
            status_text: "Internal Server Error".to_string(),
        })
    }

    #[tokio::test]
    async fn idle_binding_issues_nothing() {
        let (transport, _calls) = scripted();
        let binding: QueryBinding<YearQuery> = QueryBinding::new(transport.clone());
        assert_eq!(binding.state().phase(), QueryPhase::Idle);
        assert!(binding.refetch().is_none());
        assert!(binding.query().is_none());
        assert_eq!(transport.count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn activation_sets_loading_then_applies_data() {
        let (transport, mut calls) = scripted();
        let binding = QueryBinding::new(transport);
        let request = binding
            .set_query(YearQuery::new(Some(2001), None))
            .unwrap();

        let state = binding.state();
        assert!(state.loading);
        assert_eq!(state.phase(), QueryPhase::Loading);
        assert_eq!(request.generation(), Generation::ZERO.next());

        let call = calls.recv().await.unwrap();
        assert_eq!(call.path, "/years");
        assert_eq!(call.params, ParamSet::new().with("start_year", 2001));
        call.respond(ok(42));

        assert_eq!(request.finished().await, Outcome::Applied);
        let state = binding.state();
        assert!(!state.loading);
        assert_eq!(state.data.as_deref(), Some(&42));
        assert!(state.error.is_none());
        assert_eq!(state.phase(), QueryPhase::SettledOk);
    }

    #[tokio::test]
    async fn equivalent_parameters_do_not_reissue() {
        let (transport, mut calls) = scripted();
        let binding = QueryBinding::new(transport.clone());
        let request = binding
            .set_query(YearQuery::new(Some(2001), None))
            .unwrap();
        calls.recv().await.unwrap().respond(ok(1));
        request.finished().await;

        assert!(binding.set_query(YearQuery::new(Some(2001), None)).is_none());
        assert_eq!(binding.generation(), Generation::ZERO.next());
        assert_eq!(transport.count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn last_issued_wins_when_first_completes_last() {
        let (transport, mut calls) = scripted();
        let binding = QueryBinding::new(transport);

        let r1 = binding
            .set_query(YearQuery::new(Some(2001), None))
            .unwrap();
        let c1 = calls.recv().await.unwrap();
        let r2 = binding
            .set_query(YearQuery::new(Some(2010), None))
            .unwrap();
        let c2 = calls.recv().await.unwrap();
        assert!(r2.generation() > r1.generation());

        c2.respond(ok(2));
        assert_eq!(r2.finished().await, Outcome::Applied);
        assert!(!binding.state().loading);

        c1.respond(ok(1));
        assert_eq!(r1.finished().await, Outcome::Stale);

        let state = binding.state();
        assert_eq!(state.data.as_deref(), Some(&2));
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn stale_failure_is_not_surfaced() {
        let (transport, mut calls) = scripted();
        let binding = QueryBinding::new(transport);

        let r1 = binding
            .set_query(YearQuery::new(Some(2001), None))
            .unwrap();
        let c1 = calls.recv().await.unwrap();
        let r2 = binding
            .set_query(YearQuery::new(Some(2002), None))
            .unwrap();
        let c2 = calls.recv().await.unwrap();

        c1.respond(server_error());
        assert_eq!(r1.finished().await, Outcome::Stale);
        let state = binding.state();
        assert!(state.loading);
        assert!(state.error.is_none());

        c2.respond(ok(7));
        assert_eq!(r2.finished().await, Outcome::Applied);
        assert_eq!(binding.state().data.as_deref(), Some(&7));
    }

    #[tokio::test]
    async fn loading_stays_true_while_superseded_request_settles() {
        let (transport, mut calls) = scripted();
        let binding = QueryBinding::new(transport);

        let r1 = binding
            .set_query(YearQuery::new(Some(2001), None))
            .unwrap();
        let c1 = calls.recv().await.unwrap();
        let _r2 = binding
            .set_query(YearQuery::new(Some(2002), None))
            .unwrap();
        let _c2 = calls.recv().await.unwrap();

        c1.respond(ok(1));
        assert_eq!(r1.finished().await, Outcome::Stale);
        let state = binding.state();
        assert!(state.loading);
        assert!(state.data.is_none());
        assert_eq!(state.settled_generation, Generation::ZERO);
    }

    #[tokio::test]
    async fn failure_preserves_last_known_good_data() {
        let (transport, mut calls) = scripted();
        let binding = QueryBinding::new(transport);

        let r1 = binding
            .set_query(YearQuery::new(Some(2001), None))
            .unwrap();
        calls.recv().await.unwrap().respond(ok(10));
        r1.finished().await;

        let r2 = binding
            .set_query(YearQuery::new(Some(2005), None))
            .unwrap();
        let state = binding.state();
        assert!(state.loading);
        assert_eq!(state.data.as_deref(), Some(&10));

        calls.recv().await.unwrap().respond(server_error());
        assert_eq!(r2.finished().await, Outcome::Applied);

        let state = binding.state();
        assert!(!state.loading);
        assert_eq!(state.data.as_deref(), Some(&10));
        assert!(matches!(
            state.error.as_deref(),
            Some(QueryError::Transport(TransportError::Status { status: 500, .. }))
        ));
        assert_eq!(state.phase(), QueryPhase::SettledErr);
    }

    #[tokio::test]
    async fn success_after_failure_clears_error() {
        let (transport, mut calls) = scripted();
        let binding = QueryBinding::new(transport);

        let r1 = binding
            .set_query(YearQuery::new(None, None))
            .unwrap();
        calls.recv().await.unwrap().respond(server_error());
        r1.finished().await;
        assert!(binding.state().error.is_some());
        assert!(binding.state().data.is_none());

        let r2 = binding.refetch().unwrap();
        assert!(binding.state().error.is_some());
        calls.recv().await.unwrap().respond(ok(3));
        r2.finished().await;

        let state = binding.state();
        assert!(state.error.is_none());
        assert_eq!(state.data.as_deref(), Some(&3));
    }

    #[tokio::test]
    async fn contract_violation_is_surfaced_as_error() {
        let (transport, mut calls) = scripted();
        let binding = QueryBinding::new(transport);
        let request = binding
            .set_query(YearQuery::new(None, None))
            .unwrap();
        calls
            .recv()
            .await
            .unwrap()
            .respond(Ok(serde_json::json!({ "count": 1 })));
        request.finished().await;

        let state = binding.state();
        assert!(state.data.is_none());
        assert!(matches!(
            state.error.as_deref(),
            Some(QueryError::Contract(ContractError::MissingField { .. }))
        ));
    }

    #[tokio::test]
    async fn refetch_bumps_generation_with_same_parameters() {
        let (transport, mut calls) = scripted();
        let binding = QueryBinding::new(transport.clone());
        let r1 = binding
            .set_query(YearQuery::new(Some(2001), Some(2025)))
            .unwrap();
        let g1 = r1.generation();
        calls.recv().await.unwrap().respond(ok(1));
        r1.finished().await;

        let current = binding.query().unwrap();
        assert_eq!(current.params().get("end_year"), Some(&ParamValue::Int(2025)));

        let r2 = binding.refetch().unwrap();
        assert!(r2.generation() > g1);
        assert!(binding.state().loading);
        let call = calls.recv().await.unwrap();
        assert_eq!(
            call.params,
            ParamSet::new().with("start_year", 2001).with("end_year", 2025)
        );
        call.respond(ok(2));
        r2.finished().await;
        assert_eq!(binding.state().data.as_deref(), Some(&2));
        assert_eq!(transport.count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn generations_are_strictly_increasing() {
        let (transport, mut calls) = scripted();
        let binding = QueryBinding::new(transport);
        let mut last = Generation::ZERO;
        for year in 2001..2006 {
            let request = binding
                .set_query(YearQuery::new(Some(year), None))
                .unwrap();
            assert!(request.generation() > last);
            last = request.generation();
            let _ = calls.recv().await.unwrap();
        }
        assert_eq!(binding.generation(), last);
    }

    #[tokio::test]
    async fn responses_after_destruction_are_detached() {
        let (transport, mut calls) = scripted();
        let binding = QueryBinding::new(transport);
        let mut rx = binding.subscribe();
        let request = binding
            .set_query(YearQuery::new(None, None))
            .unwrap();
        let call = calls.recv().await.unwrap();

        drop(binding);
        call.respond(ok(5));
        assert_eq!(request.finished().await, Outcome::Detached);
        assert!(rx.borrow().data.is_none());
    }

    #[tokio::test]
    async fn settled_waits_for_current_generation() {
        let (transport, mut calls) = scripted();
        let binding = QueryBinding::bind(transport, YearQuery::new(Some(2001), None));
        let waiter = {
            let binding = binding.clone();
            tokio::spawn(async move { binding.settled().await })
        };
        calls.recv().await.unwrap().respond(ok(9));
        let state = waiter.await.unwrap();
        assert_eq!(state.data.as_deref(), Some(&9));
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn loading_flips_false_once_per_applied_request() {
        let (transport, mut calls) = scripted();
        let binding = QueryBinding::new(transport);
        let mut rx = binding.subscribe();
        let mut transitions = Vec::new();

        let request = binding
            .set_query(YearQuery::new(None, None))
            .unwrap();
        transitions.push(rx.borrow_and_update().loading);
        calls.recv().await.unwrap().respond(ok(1));
        request.finished().await;
        rx.changed().await.unwrap();
        transitions.push(rx.borrow_and_update().loading);

        assert_eq!(transitions, vec![true, false]);
        assert!(!rx.has_changed().unwrap());
    }
}
