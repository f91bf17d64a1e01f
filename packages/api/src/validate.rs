//! Response validation.
//!
//! Decoding is fail-closed: a body that does not deserialize into its
//! schema, or whose fields contradict each other, is reported as a
//! [`ContractError`] rather than passed through partially filled.

use asrs_api_models::{
    ComparisonResponse, FactorsResponse, GreatestChange, IncidentDetailResponse,
    IncidentsResponse, Pagination, TimelineResponse, TopicKeywordsResponse, TrendDirection,
};
use asrs_query_models::ContractError;
use serde::de::DeserializeOwned;

/// Slack allowed between a reported variance and `inference - baseline`.
/// The server rounds `baseline`, `inference` and `variance` to one decimal
/// place independently, so each contributes up to 0.05 of error.
pub const VARIANCE_TOLERANCE: f64 = 0.15 + 1e-9;

const FLOAT_EPSILON: f64 = 1e-9;

/// Deserializes `value` into `T`.
///
/// # Errors
///
/// Returns [`ContractError::MissingField`] or
/// [`ContractError::InvalidField`] if the body does not match `T`.
pub fn decode<T: DeserializeOwned>(
    query: &'static str,
    value: serde_json::Value,
) -> Result<T, ContractError> {
    serde_json::from_value(value).map_err(|e| ContractError::from_serde(query, &e))
}

fn invariant(query: &'static str, message: impl Into<String>) -> ContractError {
    ContractError::Invariant {
        query,
        message: message.into(),
    }
}

fn invalid(query: &'static str, field: impl Into<String>, message: impl Into<String>) -> ContractError {
    ContractError::InvalidField {
        query,
        field: field.into(),
        message: message.into(),
    }
}

/// Checks page metadata against itself and the page length.
///
/// # Errors
///
/// Returns [`ContractError`] if `limit` or `page` is zero, `total_pages`
/// is not `ceil(total / limit)` or the page holds more than `limit` rows.
pub fn pagination(
    query: &'static str,
    pagination: &Pagination,
    rows: usize,
) -> Result<(), ContractError> {
    if pagination.page == 0 {
        return Err(invalid(query, "pagination.page", "must be at least 1"));
    }
    let Some(expected) = Pagination::expected_total_pages(pagination.total, pagination.limit)
    else {
        return Err(invalid(query, "pagination.limit", "must be at least 1"));
    };
    if pagination.total_pages != expected {
        return Err(invariant(
            query,
            format!(
                "total_pages is {} but ceil({} / {}) is {expected}",
                pagination.total_pages, pagination.total, pagination.limit
            ),
        ));
    }
    if rows > pagination.limit as usize {
        return Err(invariant(
            query,
            format!("page holds {rows} rows, more than limit {}", pagination.limit),
        ));
    }
    Ok(())
}

/// # Errors
///
/// See [`pagination`].
pub fn incidents(query: &'static str, response: &IncidentsResponse) -> Result<(), ContractError> {
    pagination(query, &response.pagination, response.reports.len())
}

/// Checks that timeline years strictly increase.
///
/// # Errors
///
/// Returns [`ContractError::Invariant`] on the first out-of-order year.
pub fn timeline(query: &'static str, response: &TimelineResponse) -> Result<(), ContractError> {
    for pair in response.data.windows(2) {
        if pair[1].year <= pair[0].year {
            return Err(invariant(
                query,
                format!(
                    "timeline years must strictly increase, found {} after {}",
                    pair[1].year, pair[0].year
                ),
            ));
        }
    }
    Ok(())
}

/// Checks that factors are ranked by count, highest first.
///
/// # Errors
///
/// Returns [`ContractError::Invariant`] if a factor outranks one with a
/// higher count.
pub fn factors(query: &'static str, response: &FactorsResponse) -> Result<(), ContractError> {
    for pair in response.factors.windows(2) {
        if pair[1].count > pair[0].count {
            return Err(invariant(
                query,
                format!(
                    "factors must be sorted by count descending, '{}' ({}) follows '{}' ({})",
                    pair[1].factor, pair[1].count, pair[0].factor, pair[0].count
                ),
            ));
        }
    }
    Ok(())
}

/// Checks similarity scores.
///
/// # Errors
///
/// Returns [`ContractError::InvalidField`] for a similarity outside
/// `[0, 100]`.
pub fn incident_detail(
    query: &'static str,
    response: &IncidentDetailResponse,
) -> Result<(), ContractError> {
    for (i, similar) in response.similar_incidents.iter().enumerate() {
        if !(0.0..=100.0).contains(&similar.similarity) {
            return Err(invalid(
                query,
                format!("similar_incidents[{i}].similarity"),
                format!("{} is outside [0, 100]", similar.similarity),
            ));
        }
    }
    Ok(())
}

/// Checks keyword weights.
///
/// # Errors
///
/// Returns [`ContractError::InvalidField`] for a weight outside `[0, 1]`.
pub fn topic_keywords(
    query: &'static str,
    response: &TopicKeywordsResponse,
) -> Result<(), ContractError> {
    for (i, keyword) in response.keywords.iter().enumerate() {
        if !(0.0..=1.0).contains(&keyword.weight) {
            return Err(invalid(
                query,
                format!("keywords[{i}].weight"),
                format!("{} is outside [0, 1]", keyword.weight),
            ));
        }
    }
    Ok(())
}

/// Checks comparison variances and the greatest change.
///
/// # Errors
///
/// Returns [`ContractError::Invariant`] if a variance is not
/// `inference - baseline`, the greatest change does not name an entry of
/// maximal absolute variance, or the empty-data fallback is malformed.
pub fn comparison(query: &'static str, response: &ComparisonResponse) -> Result<(), ContractError> {
    for point in &response.data {
        let expected = point.expected_variance();
        if (point.variance - expected).abs() > VARIANCE_TOLERANCE {
            return Err(invariant(
                query,
                format!(
                    "variance of '{}' is {} but inference - baseline is {expected:.3}",
                    point.category, point.variance
                ),
            ));
        }
    }

    let greatest = &response.greatest_change;
    let Some(max) = response.max_abs_variance() else {
        let is_fallback = greatest.is_none()
            && greatest.variance.abs() < FLOAT_EPSILON
            && greatest.direction == TrendDirection::Neutral;
        if !is_fallback {
            return Err(invariant(
                query,
                format!(
                    "greatest_change must be {{category: {}, variance: 0, direction: neutral}} \
                     without data, got '{}'",
                    GreatestChange::NONE_CATEGORY,
                    greatest.category
                ),
            ));
        }
        return Ok(());
    };

    let named = response.data.iter().any(|p| {
        p.category == greatest.category
            && (p.variance.abs() - max).abs() < FLOAT_EPSILON
            && (p.variance - greatest.variance).abs() < FLOAT_EPSILON
    });
    if !named {
        return Err(invariant(
            query,
            format!(
                "greatest_change '{}' ({}) is not an entry of maximal |variance| {max}",
                greatest.category, greatest.variance
            ),
        ));
    }

    let direction_matches = match greatest.direction {
        TrendDirection::Up => greatest.variance > 0.0,
        TrendDirection::Down | TrendDirection::Neutral => greatest.variance <= 0.0,
    };
    if !direction_matches {
        return Err(invariant(
            query,
            format!(
                "greatest_change direction {} contradicts variance {}",
                greatest.direction, greatest.variance
            ),
        ));
    }
    Ok(())
}
