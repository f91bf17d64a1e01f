#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Typed client for the ASRS analytics API.
//!
//! [`queries`] defines one [`Query`] per endpoint, [`validate`] the
//! response checks they run, and [`AnalyticsClient`] ties both to a
//! [`Transport`] for one-shot calls or live [`QueryBinding`]s.

pub mod queries;
pub mod validate;

use std::sync::Arc;

use asrs_api_models::{
    ComparisonResponse, EmergingPatternsResponse, FactorsResponse, FilterOptions,
    IncidentDetailResponse, IncidentsResponse, KpisResponse, SummaryResponse, TimelineResponse,
    TopicKeywordsResponse, TopicNarrativesResponse, TopicsResponse,
};
use asrs_query::{Query, QueryBinding, QueryError};
use asrs_transport::Transport;

pub use queries::{
    EmergingPatternsQuery, FactorsQuery, FilterOptionsQuery, IncidentDetailQuery, IncidentsQuery,
    SummaryQuery, TimelineQuery, TopicKeywordsQuery, TopicNarrativesQuery, TopicsQuery,
    TrendComparisonQuery, TrendKpisQuery,
};

/// Entry point to the analytics API over a shared transport.
#[derive(Clone)]
pub struct AnalyticsClient {
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for AnalyticsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticsClient").finish_non_exhaustive()
    }
}

impl AnalyticsClient {
    /// Creates a client over `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// The underlying transport.
    #[must_use]
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    /// Creates a binding that starts loading `query` immediately.
    #[must_use]
    pub fn bind<Q: Query>(&self, query: Q) -> QueryBinding<Q> {
        QueryBinding::bind(self.transport(), query)
    }

    /// Creates an idle binding; nothing is requested until a query is set.
    #[must_use]
    pub fn binding<Q: Query>(&self) -> QueryBinding<Q> {
        QueryBinding::new(self.transport())
    }

    /// Runs `query` once.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] if the request fails or the response does not
    /// validate.
    pub async fn run<Q: Query>(&self, query: &Q) -> Result<Q::Output, QueryError> {
        asrs_query::fetch(self.transport.as_ref(), query).await
    }

    /// Corpus summary.
    ///
    /// # Errors
    ///
    /// See [`AnalyticsClient::run`].
    pub async fn summary(&self) -> Result<SummaryResponse, QueryError> {
        self.run(&SummaryQuery).await
    }

    /// Filter sidebar options.
    ///
    /// # Errors
    ///
    /// See [`AnalyticsClient::run`].
    pub async fn filter_options(&self) -> Result<FilterOptions, QueryError> {
        self.run(&FilterOptionsQuery).await
    }

    /// Yearly incident counts.
    ///
    /// # Errors
    ///
    /// See [`AnalyticsClient::run`].
    pub async fn timeline(&self, query: &TimelineQuery) -> Result<TimelineResponse, QueryError> {
        self.run(query).await
    }

    /// Contributing factor ranking.
    ///
    /// # Errors
    ///
    /// See [`AnalyticsClient::run`].
    pub async fn factors(&self, query: &FactorsQuery) -> Result<FactorsResponse, QueryError> {
        self.run(query).await
    }

    /// One page of incidents.
    ///
    /// # Errors
    ///
    /// See [`AnalyticsClient::run`].
    pub async fn incidents(
        &self,
        query: &IncidentsQuery,
    ) -> Result<IncidentsResponse, QueryError> {
        self.run(query).await
    }

    /// A single incident. An unknown accession number surfaces as a
    /// 404 [`TransportError::Status`](asrs_transport::TransportError::Status).
    ///
    /// # Errors
    ///
    /// See [`AnalyticsClient::run`].
    pub async fn incident(
        &self,
        query: &IncidentDetailQuery,
    ) -> Result<IncidentDetailResponse, QueryError> {
        self.run(query).await
    }

    /// Topic clusters.
    ///
    /// # Errors
    ///
    /// See [`AnalyticsClient::run`].
    pub async fn topics(&self, query: &TopicsQuery) -> Result<TopicsResponse, QueryError> {
        self.run(query).await
    }

    /// Keywords of one topic.
    ///
    /// # Errors
    ///
    /// See [`AnalyticsClient::run`].
    pub async fn topic_keywords(
        &self,
        query: &TopicKeywordsQuery,
    ) -> Result<TopicKeywordsResponse, QueryError> {
        self.run(query).await
    }

    /// Narratives of one topic.
    ///
    /// # Errors
    ///
    /// See [`AnalyticsClient::run`].
    pub async fn topic_narratives(
        &self,
        query: &TopicNarrativesQuery,
    ) -> Result<TopicNarrativesResponse, QueryError> {
        self.run(query).await
    }

    /// Delta KPIs.
    ///
    /// # Errors
    ///
    /// See [`AnalyticsClient::run`].
    pub async fn trend_kpis(&self, query: &TrendKpisQuery) -> Result<KpisResponse, QueryError> {
        self.run(query).await
    }

    /// Baseline-vs-inference comparison.
    ///
    /// # Errors
    ///
    /// See [`AnalyticsClient::run`].
    pub async fn trend_comparison(
        &self,
        query: &TrendComparisonQuery,
    ) -> Result<ComparisonResponse, QueryError> {
        self.run(query).await
    }

    /// Emerging patterns.
    ///
    /// # Errors
    ///
    /// See [`AnalyticsClient::run`].
    pub async fn emerging_patterns(
        &self,
        query: &EmergingPatternsQuery,
    ) -> Result<EmergingPatternsResponse, QueryError> {
        self.run(query).await
    }
}
