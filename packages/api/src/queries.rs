//! One [`Query`] per analytics endpoint.
//!
//! Optional fields left as `None` are omitted from the request so the
//! server applies its own defaults.

use std::fmt::Write as _;

use asrs_api_models::{
    ComparisonResponse, ComparisonView, EmergingPatternsResponse, FactorsResponse, FilterOptions,
    IncidentDetailResponse, IncidentsResponse, KpisResponse, PeriodBounds, Severity,
    SummaryResponse, TimelineResponse, TopicKeywordsResponse, TopicModel,
    TopicNarrativesResponse, TopicsResponse, TrendPeriods,
};
use asrs_query::Query;
use asrs_query_models::{ContractError, ParamSet};

use crate::validate;

fn year_params(start_year: Option<i32>, end_year: Option<i32>) -> ParamSet {
    ParamSet::new()
        .with_opt("start_year", start_year)
        .with_opt("end_year", end_year)
}

fn insert_periods(params: &mut ParamSet, bounds: &PeriodBounds) {
    params.insert_opt("baseline_start", bounds.baseline_start);
    params.insert_opt("baseline_end", bounds.baseline_end);
    params.insert_opt("inference_start", bounds.inference_start);
    params.insert_opt("inference_end", bounds.inference_end);
}

/// Percent-encodes a path segment, leaving RFC 3986 unreserved characters
/// as they are.
#[must_use]
pub fn escape_path_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "%{byte:02X}");
        }
    }
    out
}

/// Corpus summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SummaryQuery;

impl Query for SummaryQuery {
    type Output = SummaryResponse;

    fn name(&self) -> &'static str {
        "summary"
    }

    fn path(&self) -> String {
        "/summary".to_string()
    }

    fn params(&self) -> ParamSet {
        ParamSet::new()
    }

    fn decode(&self, value: serde_json::Value) -> Result<Self::Output, ContractError> {
        validate::decode(self.name(), value)
    }
}

/// Filter sidebar options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterOptionsQuery;

impl Query for FilterOptionsQuery {
    type Output = FilterOptions;

    fn name(&self) -> &'static str {
        "filter_options"
    }

    fn path(&self) -> String {
        "/filters/options".to_string()
    }

    fn params(&self) -> ParamSet {
        ParamSet::new()
    }

    fn decode(&self, value: serde_json::Value) -> Result<Self::Output, ContractError> {
        validate::decode(self.name(), value)
    }
}

/// Yearly incident counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimelineQuery {
    /// First year (inclusive).
    pub start_year: Option<i32>,
    /// Last year (inclusive).
    pub end_year: Option<i32>,
}

impl Query for TimelineQuery {
    type Output = TimelineResponse;

    fn name(&self) -> &'static str {
        "timeline"
    }

    fn path(&self) -> String {
        "/incidents/timeline".to_string()
    }

    fn params(&self) -> ParamSet {
        year_params(self.start_year, self.end_year)
    }

    fn decode(&self, value: serde_json::Value) -> Result<Self::Output, ContractError> {
        let response = validate::decode(self.name(), value)?;
        validate::timeline(self.name(), &response)?;
        Ok(response)
    }
}

/// Contributing factor ranking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FactorsQuery {
    /// First year (inclusive).
    pub start_year: Option<i32>,
    /// Last year (inclusive).
    pub end_year: Option<i32>,
    /// Number of factors; the server defaults to 10.
    pub limit: Option<u32>,
}

impl Query for FactorsQuery {
    type Output = FactorsResponse;

    fn name(&self) -> &'static str {
        "factors"
    }

    fn path(&self) -> String {
        "/incidents/factors".to_string()
    }

    fn params(&self) -> ParamSet {
        year_params(self.start_year, self.end_year).with_opt("limit", self.limit)
    }

    fn decode(&self, value: serde_json::Value) -> Result<Self::Output, ContractError> {
        let response = validate::decode(self.name(), value)?;
        validate::factors(self.name(), &response)?;
        Ok(response)
    }
}

/// One page of the incident table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncidentsQuery {
    /// First year (inclusive).
    pub start_year: Option<i32>,
    /// Last year (inclusive).
    pub end_year: Option<i32>,
    /// Page, starting at 1; the server defaults to 1.
    pub page: Option<u32>,
    /// Page size; the server defaults to 20 and caps it at 100.
    pub limit: Option<u32>,
    /// Airport code, matched case-insensitively.
    pub location: Option<String>,
    /// Severity filter.
    pub severity: Option<Severity>,
}

impl Query for IncidentsQuery {
    type Output = IncidentsResponse;

    fn name(&self) -> &'static str {
        "incidents"
    }

    fn path(&self) -> String {
        "/incidents".to_string()
    }

    fn params(&self) -> ParamSet {
        year_params(self.start_year, self.end_year)
            .with_opt("page", self.page)
            .with_opt("limit", self.limit)
            .with_opt("location", self.location.as_deref())
            .with_opt("severity", self.severity.as_ref().map(AsRef::<str>::as_ref))
    }

    fn decode(&self, value: serde_json::Value) -> Result<Self::Output, ContractError> {
        let response = validate::decode(self.name(), value)?;
        validate::incidents(self.name(), &response)?;
        Ok(response)
    }
}

/// Segments under `/incidents/` that belong to other endpoints.
const RESERVED_INCIDENT_SEGMENTS: &[&str] = &["timeline", "factors"];

/// A single incident with similar incidents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidentDetailQuery {
    acn: String,
}

impl IncidentDetailQuery {
    /// Creates the query for accession number `acn`.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::InvalidParams`] if `acn` is empty or names a
    /// sibling route such as `timeline`.
    pub fn new(acn: impl Into<String>) -> Result<Self, ContractError> {
        let acn = acn.into();
        let trimmed = acn.trim();
        if trimmed.is_empty() {
            return Err(ContractError::InvalidParams {
                message: "incident accession number is required".to_string(),
            });
        }
        if RESERVED_INCIDENT_SEGMENTS
            .iter()
            .any(|reserved| trimmed.eq_ignore_ascii_case(reserved))
        {
            return Err(ContractError::InvalidParams {
                message: format!("'{trimmed}' is not an incident accession number"),
            });
        }
        Ok(Self { acn })
    }

    /// Requested accession number.
    #[must_use]
    pub fn acn(&self) -> &str {
        &self.acn
    }
}

impl Query for IncidentDetailQuery {
    type Output = IncidentDetailResponse;

    fn name(&self) -> &'static str {
        "incident_detail"
    }

    fn path(&self) -> String {
        format!("/incidents/{}", escape_path_segment(&self.acn))
    }

    fn params(&self) -> ParamSet {
        ParamSet::new()
    }

    fn decode(&self, value: serde_json::Value) -> Result<Self::Output, ContractError> {
        let response = validate::decode(self.name(), value)?;
        validate::incident_detail(self.name(), &response)?;
        Ok(response)
    }
}

/// Topic clusters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopicsQuery {
    /// Topic model; the server defaults to LDA.
    pub model: Option<TopicModel>,
    /// First year (inclusive).
    pub start_year: Option<i32>,
    /// Last year (inclusive).
    pub end_year: Option<i32>,
}

impl Query for TopicsQuery {
    type Output = TopicsResponse;

    fn name(&self) -> &'static str {
        "topics"
    }

    fn path(&self) -> String {
        "/topics".to_string()
    }

    fn params(&self) -> ParamSet {
        year_params(self.start_year, self.end_year)
            .with_opt("model", self.model.as_ref().map(AsRef::<str>::as_ref))
    }

    fn decode(&self, value: serde_json::Value) -> Result<Self::Output, ContractError> {
        validate::decode(self.name(), value)
    }
}

/// Weighted keywords of one topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicKeywordsQuery {
    /// Topic id.
    pub topic_id: i64,
    /// Number of keywords; the server defaults to 10.
    pub limit: Option<u32>,
}

impl TopicKeywordsQuery {
    /// Keywords of `topic_id` with the server's default limit.
    #[must_use]
    pub const fn new(topic_id: i64) -> Self {
        Self {
            topic_id,
            limit: None,
        }
    }
}

impl Query for TopicKeywordsQuery {
    type Output = TopicKeywordsResponse;

    fn name(&self) -> &'static str {
        "topic_keywords"
    }

    fn path(&self) -> String {
        format!("/topics/{}/keywords", self.topic_id)
    }

    fn params(&self) -> ParamSet {
        ParamSet::new().with_opt("limit", self.limit)
    }

    fn decode(&self, value: serde_json::Value) -> Result<Self::Output, ContractError> {
        let response = validate::decode(self.name(), value)?;
        validate::topic_keywords(self.name(), &response)?;
        Ok(response)
    }
}

/// Representative narratives of one topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicNarrativesQuery {
    /// Topic id.
    pub topic_id: i64,
    /// Number of narratives; the server defaults to 3.
    pub limit: Option<u32>,
}

impl TopicNarrativesQuery {
    /// Narratives of `topic_id` with the server's default limit.
    #[must_use]
    pub const fn new(topic_id: i64) -> Self {
        Self {
            topic_id,
            limit: None,
        }
    }
}

impl Query for TopicNarrativesQuery {
    type Output = TopicNarrativesResponse;

    fn name(&self) -> &'static str {
        "topic_narratives"
    }

    fn path(&self) -> String {
        format!("/topics/{}/narratives", self.topic_id)
    }

    fn params(&self) -> ParamSet {
        ParamSet::new().with_opt("limit", self.limit)
    }

    fn decode(&self, value: serde_json::Value) -> Result<Self::Output, ContractError> {
        validate::decode(self.name(), value)
    }
}

/// Delta KPIs between a baseline and an inference period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrendKpisQuery {
    bounds: PeriodBounds,
}

impl TrendKpisQuery {
    /// KPIs over two validated periods.
    #[must_use]
    pub fn new(periods: TrendPeriods) -> Self {
        Self {
            bounds: periods.into(),
        }
    }

    /// KPIs over possibly partial periods.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::InvalidParams`] if the known bounds are
    /// inconsistent.
    pub fn partial(bounds: PeriodBounds) -> Result<Self, ContractError> {
        bounds.validate()?;
        Ok(Self { bounds })
    }

    /// Requested period bounds.
    #[must_use]
    pub const fn bounds(&self) -> PeriodBounds {
        self.bounds
    }
}

impl Query for TrendKpisQuery {
    type Output = KpisResponse;

    fn name(&self) -> &'static str {
        "trend_kpis"
    }

    fn path(&self) -> String {
        "/trends/kpis".to_string()
    }

    fn params(&self) -> ParamSet {
        let mut params = ParamSet::new();
        insert_periods(&mut params, &self.bounds);
        params
    }

    fn decode(&self, value: serde_json::Value) -> Result<Self::Output, ContractError> {
        validate::decode(self.name(), value)
    }
}

/// Per-category comparison between a baseline and an inference period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrendComparisonQuery {
    bounds: PeriodBounds,
    /// Category axis; the server defaults to factors.
    pub view: Option<ComparisonView>,
    /// Number of categories; the server defaults to 7.
    pub limit: Option<u32>,
}

impl TrendComparisonQuery {
    /// Comparison over two validated periods.
    #[must_use]
    pub fn new(periods: TrendPeriods) -> Self {
        Self {
            bounds: periods.into(),
            view: None,
            limit: None,
        }
    }

    /// Comparison over possibly partial periods.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::InvalidParams`] if the known bounds are
    /// inconsistent.
    pub fn partial(bounds: PeriodBounds) -> Result<Self, ContractError> {
        bounds.validate()?;
        Ok(Self {
            bounds,
            view: None,
            limit: None,
        })
    }

    /// Sets the category axis.
    #[must_use]
    pub const fn with_view(mut self, view: ComparisonView) -> Self {
        self.view = Some(view);
        self
    }

    /// Sets the number of categories.
    #[must_use]
    pub const fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Requested period bounds.
    #[must_use]
    pub const fn bounds(&self) -> PeriodBounds {
        self.bounds
    }
}

impl Query for TrendComparisonQuery {
    type Output = ComparisonResponse;

    fn name(&self) -> &'static str {
        "trend_comparison"
    }

    fn path(&self) -> String {
        "/trends/comparison".to_string()
    }

    fn params(&self) -> ParamSet {
        let mut params = ParamSet::new()
            .with_opt("view", self.view.as_ref().map(AsRef::<str>::as_ref))
            .with_opt("limit", self.limit);
        insert_periods(&mut params, &self.bounds);
        params
    }

    fn decode(&self, value: serde_json::Value) -> Result<Self::Output, ContractError> {
        let response = validate::decode(self.name(), value)?;
        validate::comparison(self.name(), &response)?;
        Ok(response)
    }
}

/// Risk patterns that emerged in the inference period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmergingPatternsQuery {
    bounds: PeriodBounds,
    /// Number of patterns; the server defaults to 4.
    pub limit: Option<u32>,
}

impl EmergingPatternsQuery {
    /// Patterns over two validated periods.
    #[must_use]
    pub fn new(periods: TrendPeriods) -> Self {
        Self {
            bounds: periods.into(),
            limit: None,
        }
    }

    /// Patterns over possibly partial periods.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::InvalidParams`] if the known bounds are
    /// inconsistent.
    pub fn partial(bounds: PeriodBounds) -> Result<Self, ContractError> {
        bounds.validate()?;
        Ok(Self {
            bounds,
            limit: None,
        })
    }

    /// Sets the number of patterns.
    #[must_use]
    pub const fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Requested period bounds.
    #[must_use]
    pub const fn bounds(&self) -> PeriodBounds {
        self.bounds
    }
}

impl Query for EmergingPatternsQuery {
    type Output = EmergingPatternsResponse;

    fn name(&self) -> &'static str {
        "emerging_patterns"
    }

    fn path(&self) -> String {
        "/trends/emerging-patterns".to_string()
    }

    fn params(&self) -> ParamSet {
        let mut params = ParamSet::new().with_opt("limit", self.limit);
        insert_periods(&mut params, &self.bounds);
        params
    }

    fn decode(&self, value: serde_json::Value) -> Result<Self::Output, ContractError> {
        validate::decode(self.name(), value)
    }
}

#[cfg(test)]
mod tests {
    use asrs_api_models::YearRange;
    use asrs_query_models::ParamValue;

    use super::*;

    #[test]
    fn unset_fields_are_not_sent() {
        assert!(TimelineQuery::default().params().is_empty());
        assert!(IncidentsQuery::default().params().is_empty());
        assert!(TrendKpisQuery::default().params().is_empty());
    }

    #[test]
    fn incidents_params_use_wire_names() {
        let query = IncidentsQuery {
            page: Some(2),
            limit: Some(10),
            severity: Some(Severity::High),
            location: Some("KORD".to_string()),
            ..IncidentsQuery::default()
        };
        let params = query.params();
        assert_eq!(params.get("page"), Some(&ParamValue::Int(2)));
        assert_eq!(params.get("limit"), Some(&ParamValue::Int(10)));
        assert_eq!(
            params.get("severity"),
            Some(&ParamValue::Str("High".to_string()))
        );
        assert_eq!(
            params.get("location"),
            Some(&ParamValue::Str("KORD".to_string()))
        );
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn topics_sends_lowercase_model() {
        let query = TopicsQuery {
            model: Some(TopicModel::Bert),
            ..TopicsQuery::default()
        };
        assert_eq!(
            query.params().get("model"),
            Some(&ParamValue::Str("bert".to_string()))
        );
    }

    #[test]
    fn acn_is_path_escaped() {
        let query = IncidentDetailQuery::new("12/34 5").unwrap();
        assert_eq!(query.path(), "/incidents/12%2F34%205");
        assert_eq!(query.acn(), "12/34 5");
    }

    #[test]
    fn empty_acn_is_rejected() {
        assert!(matches!(
            IncidentDetailQuery::new("  "),
            Err(ContractError::InvalidParams { .. })
        ));
    }

    #[test]
    fn sibling_route_names_are_rejected_as_acn() {
        for acn in ["timeline", "factors", " Timeline "] {
            assert!(matches!(
                IncidentDetailQuery::new(acn),
                Err(ContractError::InvalidParams { .. })
            ));
        }
        assert!(IncidentDetailQuery::new("timeline-1").is_ok());
    }

    #[test]
    fn path_parameters_take_part_in_the_key() {
        let a = TopicKeywordsQuery::new(1);
        let b = TopicKeywordsQuery::new(2);
        assert_eq!(a.params(), b.params());
        assert_ne!(a.key(), b.key());
        assert_eq!(a.path(), "/topics/1/keywords");
        assert_eq!(TopicNarrativesQuery::new(3).path(), "/topics/3/narratives");
    }

    #[test]
    fn trend_queries_send_all_four_bounds() {
        let periods = TrendPeriods::new(
            YearRange::new(2012, 2017).unwrap(),
            YearRange::new(2018, 2025).unwrap(),
        )
        .unwrap();
        let params = TrendComparisonQuery::new(periods)
            .with_view(ComparisonView::Topics)
            .params();
        assert_eq!(params.get("baseline_start"), Some(&ParamValue::Int(2012)));
        assert_eq!(params.get("baseline_end"), Some(&ParamValue::Int(2017)));
        assert_eq!(params.get("inference_start"), Some(&ParamValue::Int(2018)));
        assert_eq!(params.get("inference_end"), Some(&ParamValue::Int(2025)));
        assert_eq!(
            params.get("view"),
            Some(&ParamValue::Str("topics".to_string()))
        );
        assert!(params.get("limit").is_none());
    }

    #[test]
    fn partial_bounds_are_validated() {
        let bounds = PeriodBounds {
            baseline_start: Some(2020),
            baseline_end: Some(2010),
            ..PeriodBounds::default()
        };
        assert!(EmergingPatternsQuery::partial(bounds).is_err());

        let bounds = PeriodBounds {
            inference_start: Some(2019),
            ..PeriodBounds::default()
        };
        let query = EmergingPatternsQuery::partial(bounds).unwrap().with_limit(2);
        let params = query.params();
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("inference_start"), Some(&ParamValue::Int(2019)));
    }
}
