//! Remote optimizer service client.
//!
//! [`RemoteService`] is the seam the resolver and the per-leg download tasks talk
//! to; [`HttpService`] is the production implementation. Every call is a single
//! request/response exchange: no retries, no caching.

use std::time::Duration;

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::config::ServiceConfig;
use crate::error::{Error, Result};
use crate::types::{DownloadTask, FlightDate, FlightId, LegMap, Record};

/// Field added to every downloaded record with the originating flight number
pub const FLIGHT_NUMBER_FIELD: &str = "FLIGHT_NUMBER";
/// Field added to every downloaded record with the originating flight date
pub const FLIGHT_DATE_FIELD: &str = "FLIGHT_DATE";

/// Abstraction over the three remote lookups, enabling testability.
#[async_trait::async_trait]
pub trait RemoteService: Send + Sync {
    /// Ordered operating dates of `flight`
    async fn fetch_schedule(&self, flight: &FlightId) -> Result<Vec<FlightDate>>;

    /// Leg structure of `flight` operating on `date`
    async fn fetch_leg_map(&self, flight: &FlightId, date: FlightDate) -> Result<LegMap>;

    /// Detail records of one leg, tagged with flight number and date
    async fn fetch_leg_detail(&self, task: &DownloadTask) -> Result<Vec<Record>>;
}

/// Body of every flight-scoped request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FlightPayload<'a> {
    carrier_code: &'a str,
    flight_number: &'a str,
    flight_date: String,
}

/// Production [`RemoteService`] backed by a shared reqwest client.
#[derive(Clone, Debug)]
pub struct HttpService {
    client: reqwest::Client,
    base_url: Url,
    schedule_path: String,
    leg_structure_path: String,
    leg_detail_path: String,
    carrier_code: String,
}

impl HttpService {
    /// Build a service client from configuration
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Self::with_client(client, config)
    }

    /// Build a service client around an existing reqwest client
    pub fn with_client(client: reqwest::Client, config: &ServiceConfig) -> Result<Self> {
        let mut base_url = Url::parse(&config.base_url)?;
        // Url::join drops the last segment unless the base ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            client,
            base_url,
            schedule_path: config.schedule_path.clone(),
            leg_structure_path: config.leg_structure_path.clone(),
            leg_detail_path: config.leg_detail_path.clone(),
            carrier_code: config.carrier_code.clone(),
        })
    }

    /// Resolve an endpoint path against the base URL
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Perform one JSON exchange.
    ///
    /// Non-success statuses become [`Error::Network`] carrying status and body text;
    /// a body that is not JSON becomes [`Error::Decode`].
    pub async fn request<P: Serialize + ?Sized>(
        &self,
        endpoint: Url,
        method: Method,
        payload: &P,
    ) -> Result<Value> {
        let context = endpoint.path().to_string();
        let response = self
            .client
            .request(method, endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::Network {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|source| Error::Decode { context, source })
    }

    fn flight_payload<'a>(&'a self, flight: &'a FlightId, date: FlightDate) -> FlightPayload<'a> {
        FlightPayload {
            carrier_code: &self.carrier_code,
            flight_number: flight.as_str(),
            flight_date: date.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl RemoteService for HttpService {
    async fn fetch_schedule(&self, flight: &FlightId) -> Result<Vec<FlightDate>> {
        let url = self.endpoint(&self.schedule_path)?;
        let json = self
            .request(url, Method::POST, &serde_json::json!({ "myMarkets": true }))
            .await?;
        parse_schedule(&json, &self.carrier_code, flight)
    }

    async fn fetch_leg_map(&self, flight: &FlightId, date: FlightDate) -> Result<LegMap> {
        let url = self.endpoint(&self.leg_structure_path)?;
        let json = self
            .request(url, Method::POST, &self.flight_payload(flight, date))
            .await?;
        parse_leg_map(&json, flight, date)
    }

    async fn fetch_leg_detail(&self, task: &DownloadTask) -> Result<Vec<Record>> {
        let mut url = self.endpoint(&self.leg_detail_path)?;
        url.query_pairs_mut()
            .append_pair("origin", &task.leg.origin)
            .append_pair("destination", &task.leg.destination)
            .append_pair("showFullList", "true");
        let json = self
            .request(url, Method::POST, &self.flight_payload(&task.flight, task.date))
            .await?;
        Ok(tag_records(json, &task.flight, task.date))
    }
}

/// Extract `carrier -> flight -> [dates]` from a schedule response.
pub fn parse_schedule(json: &Value, carrier: &str, flight: &FlightId) -> Result<Vec<FlightDate>> {
    let entries = json
        .get(carrier)
        .and_then(|flights| flights.get(flight.as_str()))
        .and_then(Value::as_array)
        .ok_or_else(|| Error::MissingData(format!("no schedule entries for flight {flight}")))?;

    if entries.is_empty() {
        return Err(Error::MissingData(format!(
            "no schedule entries for flight {flight}"
        )));
    }

    entries
        .iter()
        .map(|entry| {
            serde_json::from_value::<FlightDate>(entry.clone()).map_err(|source| Error::Decode {
                context: format!("schedule of flight {flight}"),
                source,
            })
        })
        .collect()
}

/// Extract the `legMapping` object from a leg structure response.
pub fn parse_leg_map(json: &Value, flight: &FlightId, date: FlightDate) -> Result<LegMap> {
    let mapping = json
        .get("legMapping")
        .and_then(Value::as_object)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| {
            Error::MissingData(format!("no leg mapping for flight {flight} on {date}"))
        })?;
    Ok(LegMap::from_mapping(mapping))
}

/// Turn a leg detail response into records tagged with flight number and date.
///
/// An array contributes each object element, a single object contributes one
/// record, anything else contributes nothing.
///
/// Non-object array elements are dropped rather than turned into rows that carry
/// only the two tag fields; such rows hold no leg data.
pub fn tag_records(json: Value, flight: &FlightId, date: FlightDate) -> Vec<Record> {
    let records: Vec<Record> = match json {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(record) => Some(record),
                _ => None,
            })
            .collect(),
        Value::Object(record) => vec![record],
        _ => Vec::new(),
    };

    records
        .into_iter()
        .map(|mut record| {
            record.insert(
                FLIGHT_NUMBER_FIELD.to_string(),
                Value::String(flight.to_string()),
            );
            record.insert(
                FLIGHT_DATE_FIELD.to_string(),
                Value::String(date.to_string()),
            );
            record
        })
        .collect()
}

/// Sleep for a uniformly random duration in `min..=max` before a request.
///
/// `max < min` collapses the range to `min`; a zero range returns immediately.
pub async fn jitter_delay(min: Duration, max: Duration) {
    let delay = jitter_duration(min, max);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

pub(crate) fn jitter_duration(min: Duration, max: Duration) -> Duration {
    use rand::Rng;

    let lo = min.as_millis() as u64;
    let hi = (max.as_millis() as u64).max(lo);
    if hi == lo {
        return Duration::from_millis(lo);
    }
    Duration::from_millis(rand::thread_rng().gen_range(lo..=hi))
}
