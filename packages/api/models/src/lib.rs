#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Request and response types for the ASRS analytics API.
//!
//! Field names match the JSON wire format (`snake_case`). These types are
//! the schema table the contract layer validates responses against; they
//! hold no transport or binding logic.

use asrs_query_models::ContractError;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Year that splits the timeline into benchmark and post-benchmark eras.
///
/// Independent of [`TrendPeriods`]; the two mechanisms are not reconciled.
pub const BENCHMARK_YEAR: i32 = 2017;

// ── Enumerations ────────────────────────────────────────────────────

/// Server-assigned risk class of a contributing factor.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Risk {
    /// High risk.
    High,
    /// Medium risk.
    Medium,
    /// Low risk.
    Low,
}

/// Severity classification of an incident.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Severity {
    /// High severity.
    High,
    /// Medium severity.
    Medium,
    /// Low severity.
    Low,
}

/// Direction of a trend indicator.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TrendDirection {
    /// Increase.
    Up,
    /// Decrease.
    Down,
    /// No meaningful change.
    Neutral,
}

impl TrendDirection {
    /// Direction of a signed variance.
    #[must_use]
    pub fn of(variance: f64) -> Self {
        if variance > 0.0 {
            Self::Up
        } else if variance < 0.0 {
            Self::Down
        } else {
            Self::Neutral
        }
    }
}

/// Topic model whose clusters are requested.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum TopicModel {
    /// Latent Dirichlet Allocation.
    #[default]
    Lda,
    /// `BERTopic`.
    Bert,
}

/// Category axis of a trend comparison.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum ComparisonView {
    /// Compare contributing factors.
    #[default]
    Factors,
    /// Compare topics.
    Topics,
}

// ── Trend periods ───────────────────────────────────────────────────

/// Inclusive range of years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct YearRange {
    /// First year (inclusive).
    pub start: i32,
    /// Last year (inclusive).
    pub end: i32,
}

impl YearRange {
    /// Creates a range.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::InvalidParams`] if `start > end`.
    pub fn new(start: i32, end: i32) -> Result<Self, ContractError> {
        if start > end {
            return Err(ContractError::InvalidParams {
                message: format!("year range {start}-{end} ends before it starts"),
            });
        }
        Ok(Self { start, end })
    }

    /// Whether `year` falls inside the range.
    #[must_use]
    pub const fn contains(&self, year: i32) -> bool {
        self.start <= year && year <= self.end
    }

    /// Number of years covered.
    #[must_use]
    pub const fn span(&self) -> i32 {
        self.end - self.start + 1
    }
}

impl std::fmt::Display for YearRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Named trend segments used by the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(ascii_case_insensitive)]
pub enum TrendSegment {
    /// 2012-2017, benchmark replication.
    A,
    /// 2018-2025, inference / validation.
    B,
    /// 2001-2025, longitudinal view.
    C,
}

impl TrendSegment {
    /// Years covered by the segment.
    #[must_use]
    pub const fn range(self) -> YearRange {
        match self {
            Self::A => YearRange {
                start: 2012,
                end: 2017,
            },
            Self::B => YearRange {
                start: 2018,
                end: 2025,
            },
            Self::C => YearRange {
                start: 2001,
                end: 2025,
            },
        }
    }
}

/// Baseline and inference periods of a trend comparison.
///
/// The two ranges are disjoint and the inference period lies strictly
/// after the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TrendPeriods {
    baseline: YearRange,
    inference: YearRange,
}

impl TrendPeriods {
    /// Validates and pairs two periods.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::InvalidParams`] if either range is reversed
    /// or the inference period does not start after the baseline ends.
    pub fn new(baseline: YearRange, inference: YearRange) -> Result<Self, ContractError> {
        let baseline = YearRange::new(baseline.start, baseline.end)?;
        let inference = YearRange::new(inference.start, inference.end)?;
        if inference.start <= baseline.end {
            return Err(ContractError::InvalidParams {
                message: format!(
                    "inference period {inference} must start after baseline period {baseline}"
                ),
            });
        }
        Ok(Self {
            baseline,
            inference,
        })
    }

    /// Convenience constructor from raw years.
    ///
    /// # Errors
    ///
    /// See [`TrendPeriods::new`].
    pub fn from_years(
        baseline_start: i32,
        baseline_end: i32,
        inference_start: i32,
        inference_end: i32,
    ) -> Result<Self, ContractError> {
        Self::new(
            YearRange::new(baseline_start, baseline_end)?,
            YearRange::new(inference_start, inference_end)?,
        )
    }

    /// Baseline period.
    #[must_use]
    pub const fn baseline(&self) -> YearRange {
        self.baseline
    }

    /// Inference period.
    #[must_use]
    pub const fn inference(&self) -> YearRange {
        self.inference
    }
}

impl Default for TrendPeriods {
    /// Segment A as baseline against segment B as inference.
    fn default() -> Self {
        Self {
            baseline: TrendSegment::A.range(),
            inference: TrendSegment::B.range(),
        }
    }
}

/// Possibly partial trend period bounds. Missing bounds are filled by the
/// server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeriodBounds {
    /// First baseline year.
    pub baseline_start: Option<i32>,
    /// Last baseline year.
    pub baseline_end: Option<i32>,
    /// First inference year.
    pub inference_start: Option<i32>,
    /// Last inference year.
    pub inference_end: Option<i32>,
}

impl PeriodBounds {
    /// Checks the bounds that are present against each other.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::InvalidParams`] if a known range is reversed
    /// or the inference period can be seen to start before the baseline
    /// ends.
    pub fn validate(&self) -> Result<(), ContractError> {
        if let (Some(start), Some(end)) = (self.baseline_start, self.baseline_end) {
            YearRange::new(start, end)?;
        }
        if let (Some(start), Some(end)) = (self.inference_start, self.inference_end) {
            YearRange::new(start, end)?;
        }
        let baseline_last = self.baseline_end.or(self.baseline_start);
        let inference_first = self.inference_start.or(self.inference_end);
        if let (Some(last), Some(first)) = (baseline_last, inference_first)
            && first <= last
        {
            return Err(ContractError::InvalidParams {
                message: format!(
                    "inference period starting {first} must start after baseline ending {last}"
                ),
            });
        }
        Ok(())
    }
}

impl From<TrendPeriods> for PeriodBounds {
    fn from(periods: TrendPeriods) -> Self {
        Self {
            baseline_start: Some(periods.baseline.start),
            baseline_end: Some(periods.baseline.end),
            inference_start: Some(periods.inference.start),
            inference_end: Some(periods.inference.end),
        }
    }
}

// ── Summary and filters ─────────────────────────────────────────────

/// Corpus-wide summary statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResponse {
    /// Number of incidents in the corpus.
    pub total_incidents: u64,
    /// Years covered by the corpus.
    pub date_range: SummaryDateRange,
    /// Most frequent contributing factor.
    pub primary_risk: String,
    /// When the data was last refreshed (ISO-like timestamp).
    pub last_updated: String,
}

impl SummaryResponse {
    /// Parses [`last_updated`](Self::last_updated), accepting RFC 3339 or a
    /// naive timestamp (interpreted as UTC).
    #[must_use]
    pub fn last_updated_at(&self) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&self.last_updated) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&self.last_updated, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}

/// Year coverage in the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryDateRange {
    /// First year.
    pub start: i32,
    /// Last year.
    pub end: i32,
    /// Number of years, `end - start + 1`.
    pub span: i32,
}

/// Values available to the filter sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    /// Known contributing factors.
    pub contributing_factors: Vec<String>,
    /// Most common aircraft types.
    pub aircraft_types: Vec<String>,
    /// States with incidents.
    pub states: Vec<StateOption>,
    /// Incident type labels.
    pub incident_types: Vec<String>,
    /// Severity labels.
    pub severity_levels: Vec<String>,
    /// Years available for filtering.
    pub year_range: YearBounds,
}

/// A selectable state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateOption {
    /// State code.
    pub code: String,
    /// Display name.
    pub name: String,
}

/// Minimum and maximum selectable year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearBounds {
    /// Earliest year.
    pub min: i32,
    /// Latest year.
    pub max: i32,
}

// ── Timeline ────────────────────────────────────────────────────────

/// Incident count for one year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelinePoint {
    /// Calendar year.
    pub year: i32,
    /// Incidents reported that year.
    pub incidents: u64,
}

/// Yearly incident counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineResponse {
    /// Points in strictly increasing year order.
    pub data: Vec<TimelinePoint>,
    /// Benchmark split year, present regardless of the requested range.
    pub benchmark_year: i32,
    /// Corpus metadata for the requested range.
    pub metadata: TimelineMetadata,
}

/// Metadata attached to a timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineMetadata {
    /// Incidents in the requested range.
    pub total_incidents: u64,
    /// Years actually present; both `None` for an empty range.
    pub date_range: OpenYearRange,
}

/// Year range whose bounds may be unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenYearRange {
    /// First year, if any data exists.
    pub start: Option<i32>,
    /// Last year, if any data exists.
    pub end: Option<i32>,
}

// ── Factors ─────────────────────────────────────────────────────────

/// Contributing factor with its incident count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributingFactor {
    /// Factor label.
    pub factor: String,
    /// Incidents citing the factor.
    pub count: u64,
    /// Server-assigned risk class.
    pub risk: Risk,
}

/// Ranked contributing factors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorsResponse {
    /// Factors ordered by `count` descending.
    pub factors: Vec<ContributingFactor>,
    /// Analysis metadata.
    pub metadata: FactorsMetadata,
}

/// Metadata attached to a factor ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorsMetadata {
    /// Incidents considered.
    pub total_incidents_analyzed: u64,
    /// Count thresholds behind the risk classes.
    pub risk_thresholds: RiskThresholds,
}

/// Minimum counts for the `high` and `medium` risk classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskThresholds {
    /// Lower bound of `high`.
    pub high: u64,
    /// Lower bound of `medium`.
    pub medium: u64,
}

// ── Incident listing ────────────────────────────────────────────────

/// Row of the incident table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentSummary {
    /// Accession number.
    pub acn: String,
    /// Incident date (`YYYY-MM-DD` when known).
    pub date: String,
    /// Airport code.
    pub location: String,
    /// Incident type label.
    #[serde(rename = "type")]
    pub incident_type: String,
    /// Severity classification.
    pub severity: Severity,
}

/// Page metadata. `page` is 1-indexed and
/// `total_pages = ceil(total / limit)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Current page, starting at 1.
    pub page: u32,
    /// Page size.
    pub limit: u32,
    /// Total matching records.
    pub total: u64,
    /// Number of pages.
    pub total_pages: u64,
}

impl Pagination {
    /// `ceil(total / limit)`; `None` for a zero limit.
    #[must_use]
    pub fn expected_total_pages(total: u64, limit: u32) -> Option<u64> {
        if limit == 0 {
            return None;
        }
        Some(total.div_ceil(u64::from(limit)))
    }

    /// Whether another page follows this one.
    #[must_use]
    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages
    }
}

/// One page of incidents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentsResponse {
    /// At most `pagination.limit` rows.
    pub reports: Vec<IncidentSummary>,
    /// Page metadata.
    pub pagination: Pagination,
}

// ── Incident detail ─────────────────────────────────────────────────

/// Where an incident happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentLocation {
    /// Airport code.
    pub airport_code: String,
    /// Airport name.
    #[serde(default)]
    pub airport_name: Option<String>,
    /// Taxiway involved.
    #[serde(default)]
    pub taxiway: Option<String>,
    /// Runway involved.
    #[serde(default)]
    pub runway: Option<String>,
    /// State.
    #[serde(default)]
    pub state: Option<String>,
}

/// Aircraft involved in an incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentAircraft {
    /// Aircraft type.
    #[serde(rename = "type")]
    pub aircraft_type: String,
    /// Operator.
    #[serde(default)]
    pub operator: Option<String>,
    /// Flight phase.
    #[serde(default)]
    pub flight_phase: Option<String>,
}

/// Weather at the time of an incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentWeather {
    /// Conditions summary.
    pub conditions: String,
    /// Visibility.
    #[serde(default)]
    pub visibility: Option<String>,
    /// Ceiling.
    #[serde(default)]
    pub ceiling: Option<String>,
}

/// Topic an incident was assigned to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicAssignment {
    /// Topic id.
    pub topic_id: i64,
    /// Topic label.
    pub topic_label: String,
    /// Assignment confidence.
    pub confidence: f64,
}

/// Full incident record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentDetail {
    /// Accession number.
    pub acn: String,
    /// Headline.
    pub title: String,
    /// Severity classification.
    pub severity: Severity,
    /// Machine date.
    pub date: String,
    /// Display date, separate from the machine date.
    pub date_formatted: String,
    /// Local time.
    #[serde(default)]
    pub time: Option<String>,
    /// Time zone of `time`.
    #[serde(default)]
    pub timezone: Option<String>,
    /// Location.
    pub location: IncidentLocation,
    /// Aircraft.
    pub aircraft: IncidentAircraft,
    /// Weather.
    pub weather: IncidentWeather,
    /// Narrative text.
    pub narrative: String,
    /// Terms to highlight in the narrative.
    pub highlighted_terms: Vec<String>,
    /// Contributing factors.
    pub contributing_factors: Vec<String>,
    /// Topic assignment, when the topic model has one.
    #[serde(default)]
    pub topic_assignment: Option<TopicAssignment>,
}

/// Incident ranked by similarity to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarIncident {
    /// Accession number.
    pub acn: String,
    /// Airport code.
    pub location: String,
    /// Similarity score in `[0, 100]`.
    pub similarity: f64,
    /// Why the incident matched.
    pub match_reason: String,
}

/// Incident detail with similar incidents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentDetailResponse {
    /// The incident.
    pub incident: IncidentDetail,
    /// Similar incidents, most similar first.
    pub similar_incidents: Vec<SimilarIncident>,
}

// ── Topics ──────────────────────────────────────────────────────────

/// Topic cluster projected to two dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicCluster {
    /// Topic id.
    pub id: i64,
    /// Projected x coordinate.
    pub x: f64,
    /// Projected y coordinate.
    pub y: f64,
    /// Documents in the cluster.
    pub size: u64,
    /// Topic label.
    pub label: String,
}

/// Topic clusters of one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicsResponse {
    /// Clusters.
    pub topics: Vec<TopicCluster>,
    /// Model display name (e.g. `"LDA"`, `"BERTopic"`).
    pub model: String,
    /// Model metadata.
    pub metadata: TopicsMetadata,
}

/// Metadata attached to a topic model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicsMetadata {
    /// Number of topics.
    pub num_topics: u32,
    /// Documents in the requested range.
    pub total_documents: u64,
    /// Topic coherence.
    pub coherence_score: f64,
}

/// Keyword with its weight in a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicKeyword {
    /// Keyword.
    pub keyword: String,
    /// Weight in `[0, 1]`.
    pub weight: f64,
}

/// Ranked keywords of a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicKeywordsResponse {
    /// Topic id.
    pub topic_id: i64,
    /// Keywords, heaviest first.
    pub keywords: Vec<TopicKeyword>,
}

/// Narrative excerpt representative of a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicNarrative {
    /// Accession number.
    pub acn: String,
    /// Excerpt.
    pub narrative: String,
    /// Topic keywords found in the excerpt.
    pub keywords: Vec<String>,
}

/// Sampled narratives of a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicNarrativesResponse {
    /// Topic id.
    pub topic_id: i64,
    /// Narratives.
    pub narratives: Vec<TopicNarrative>,
}

// ── Trends ──────────────────────────────────────────────────────────

/// Headline change indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaKpi {
    /// Title.
    pub title: String,
    /// Formatted value (e.g. `"+12%"`).
    pub value: String,
    /// Description.
    pub description: String,
    /// Direction.
    pub trend: TrendDirection,
    /// Unformatted value.
    #[serde(default)]
    pub raw_value: Option<f64>,
}

/// A period together with its incident count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodCount {
    /// First year.
    pub start: i32,
    /// Last year.
    pub end: i32,
    /// Incidents in the period.
    pub count: u64,
}

/// Periods the KPIs were computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonPeriods {
    /// Baseline period.
    pub baseline: PeriodCount,
    /// Inference period.
    pub inference: PeriodCount,
}

/// Delta KPIs between baseline and inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpisResponse {
    /// Indicators.
    pub kpis: Vec<DeltaKpi>,
    /// Periods used.
    pub comparison_periods: ComparisonPeriods,
}

/// Share of one category in each period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonPoint {
    /// Category label.
    pub category: String,
    /// Baseline value.
    pub baseline: f64,
    /// Inference value.
    pub inference: f64,
    /// `inference - baseline`.
    pub variance: f64,
}

impl ComparisonPoint {
    /// `inference - baseline` as computed on the client.
    #[must_use]
    pub fn expected_variance(&self) -> f64 {
        self.inference - self.baseline
    }
}

/// Category with the greatest absolute variance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GreatestChange {
    /// Category label, `"N/A"` when there is no data.
    pub category: String,
    /// Its variance.
    pub variance: f64,
    /// Sign of the variance.
    pub direction: TrendDirection,
}

impl GreatestChange {
    /// Label used when there is nothing to compare.
    pub const NONE_CATEGORY: &'static str = "N/A";

    /// Whether this is the empty-data fallback.
    #[must_use]
    pub fn is_none(&self) -> bool {
        self.category == Self::NONE_CATEGORY
    }
}

/// Display labels of the compared periods (e.g. `"2012-2017"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodLabels {
    /// Baseline label.
    pub baseline: String,
    /// Inference label.
    pub inference: String,
}

/// Baseline-vs-inference comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResponse {
    /// Per-category values.
    pub data: Vec<ComparisonPoint>,
    /// Entry with the greatest absolute variance.
    pub greatest_change: GreatestChange,
    /// Period labels.
    pub periods: PeriodLabels,
}

impl ComparisonResponse {
    /// Largest `|variance|` among the entries.
    #[must_use]
    pub fn max_abs_variance(&self) -> Option<f64> {
        self.data
            .iter()
            .map(|p| p.variance.abs())
            .reduce(f64::max)
    }
}

/// Risk pattern that emerged in the inference period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergingPattern {
    /// Topic id.
    pub topic_id: i64,
    /// Topic label.
    pub topic_label: String,
    /// Description.
    pub description: String,
    /// Reports in the pattern.
    pub report_count: u64,
    /// When the pattern first appeared (e.g. `"Q2 2018"`).
    pub first_appeared: String,
    /// Formatted growth.
    pub growth: String,
    /// Growth in percent.
    #[serde(default)]
    pub growth_rate: Option<f64>,
}

/// Emerging patterns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergingPatternsResponse {
    /// Patterns.
    pub patterns: Vec<EmergingPattern>,
    /// Method used to find them.
    pub analysis_method: String,
    /// Significance threshold of the method.
    pub significance_threshold: f64,
}
