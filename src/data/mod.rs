//! Request and response types for the weather relay
//!
//! Inbound messages arrive as loosely-typed JSON (`RequestMessage`) and are
//! validated into a `WeatherRequest` before they reach the cache. Outbound
//! messages carry the fetched payload tagged with the caller's instance id.

pub mod weather;

pub use weather::{FetchError, Fetcher, WeatherClient};

use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Endpoint used when a request does not name one
pub const DEFAULT_ENDPOINT: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Update interval in minutes used when a request does not carry one
pub const DEFAULT_UPDATE_INTERVAL_MINUTES: f64 = 10.0;

/// Reasons a request is dropped before any cache lookup or fetch
#[derive(Debug, Error, PartialEq)]
pub enum PreconditionError {
    /// No API key, or a blank one
    #[error("missing API key")]
    MissingApiKey,

    /// Latitude not supplied
    #[error("missing latitude")]
    MissingLatitude,

    /// Longitude not supplied
    #[error("missing longitude")]
    MissingLongitude,

    /// A coordinate was NaN or infinite
    #[error("coordinate '{0}' is not a finite number")]
    NonFiniteCoordinate(&'static str),

    /// Units value outside metric/imperial/blank
    #[error("invalid units: '{0}'. Valid units: metric, imperial")]
    InvalidUnits(String),

    /// Update interval must be a positive, finite number of minutes
    #[error("invalid update interval: {0} minutes")]
    InvalidUpdateInterval(f64),

    /// Endpoint could not be parsed as an http(s) URL
    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
}

/// Unit system requested from the weather API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Units {
    Metric,
    Imperial,
}

impl Units {
    /// Parses a wire value; blank means "no units" and yields `Ok(None)`
    pub fn parse(s: &str) -> Result<Option<Self>, PreconditionError> {
        match s.trim().to_lowercase().as_str() {
            "" => Ok(None),
            "metric" => Ok(Some(Units::Metric)),
            "imperial" => Ok(Some(Units::Imperial)),
            _ => Err(PreconditionError::InvalidUnits(s.to_string())),
        }
    }

    /// Value sent in the `units` query parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }
}

/// A request as it arrives on the inbound channel
///
/// Every field is optional here so that a message with a missing coordinate
/// is reported as a precondition failure rather than a parse error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMessage {
    #[serde(default)]
    pub apikey: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub update_interval: Option<f64>,
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Opaque tag echoed back so the caller can attribute the response
    #[serde(default)]
    pub instance_id: Option<Value>,
}

/// Fallbacks applied to fields a request leaves out
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDefaults {
    pub endpoint: String,
    pub update_interval_minutes: f64,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            update_interval_minutes: DEFAULT_UPDATE_INTERVAL_MINUTES,
        }
    }
}

/// A request that passed every precondition
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherRequest {
    pub apikey: String,
    pub latitude: f64,
    pub longitude: f64,
    pub units: Option<Units>,
    pub language: Option<String>,
    pub update_interval_minutes: f64,
    pub endpoint: Url,
}

impl WeatherRequest {
    /// Validates an inbound message, filling absent endpoint and interval from `defaults`
    pub fn from_message(
        message: &RequestMessage,
        defaults: &RequestDefaults,
    ) -> Result<Self, PreconditionError> {
        let apikey = message
            .apikey
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(PreconditionError::MissingApiKey)?
            .to_string();

        let latitude = message.latitude.ok_or(PreconditionError::MissingLatitude)?;
        let longitude = message
            .longitude
            .ok_or(PreconditionError::MissingLongitude)?;
        if !latitude.is_finite() {
            return Err(PreconditionError::NonFiniteCoordinate("latitude"));
        }
        if !longitude.is_finite() {
            return Err(PreconditionError::NonFiniteCoordinate("longitude"));
        }

        let units = match message.units.as_deref() {
            Some(raw) => Units::parse(raw)?,
            None => None,
        };

        let language = message
            .language
            .as_deref()
            .map(str::trim)
            .filter(|lang| !lang.is_empty())
            .map(str::to_string);

        let update_interval_minutes = message
            .update_interval
            .unwrap_or(defaults.update_interval_minutes);
        if !update_interval_minutes.is_finite() || update_interval_minutes <= 0.0 {
            return Err(PreconditionError::InvalidUpdateInterval(
                update_interval_minutes,
            ));
        }

        let endpoint_str = message
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|endpoint| !endpoint.is_empty())
            .unwrap_or(defaults.endpoint.as_str());
        let endpoint = parse_endpoint(endpoint_str)?;

        Ok(Self {
            apikey,
            latitude,
            longitude,
            units,
            language,
            update_interval_minutes,
            endpoint,
        })
    }

    /// Builds the fetch URL: `lat`, `lon`, optional `units` and `lang`, then `appid`
    pub fn fetch_url(&self) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("lat", &self.latitude.to_string());
            query.append_pair("lon", &self.longitude.to_string());
            if let Some(units) = self.units {
                query.append_pair("units", units.as_str());
            }
            if let Some(ref lang) = self.language {
                query.append_pair("lang", lang);
            }
            query.append_pair("appid", &self.apikey);
        }
        url
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url, PreconditionError> {
    let invalid = |reason: String| PreconditionError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason,
    };

    let url = Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme '{}'", other))),
    }
}

/// A relayed payload, ready for the outbound channel
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherResponse(pub Value);

impl WeatherResponse {
    /// Tags `body` with the caller's instance id
    ///
    /// Object bodies get an `instanceId` field; any other JSON value is wrapped
    /// as `{"data": body, "instanceId": id}`. Without an instance id the body is
    /// relayed untouched.
    pub fn new(body: &Value, instance_id: Option<&Value>) -> Self {
        let Some(id) = instance_id else {
            return Self(body.clone());
        };

        let mut object = match body {
            Value::Object(map) => map.clone(),
            other => {
                let mut map = Map::new();
                map.insert("data".to_string(), other.clone());
                map
            }
        };
        object.insert("instanceId".to_string(), id.clone());
        Self(Value::Object(object))
    }

    pub fn into_json(self) -> Value {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message() -> RequestMessage {
        RequestMessage {
            apikey: Some("secret".to_string()),
            latitude: Some(10.0),
            longitude: Some(20.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_request_message_parses_camel_case_fields() {
        let raw = r#"{
            "apikey": "k",
            "latitude": 49.28,
            "longitude": -123.12,
            "units": "metric",
            "language": "nl",
            "updateInterval": 15,
            "endpoint": "https://example.test/weather",
            "instanceId": "module_3"
        }"#;
        let msg: RequestMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.apikey.as_deref(), Some("k"));
        assert_eq!(msg.latitude, Some(49.28));
        assert_eq!(msg.update_interval, Some(15.0));
        assert_eq!(msg.instance_id, Some(json!("module_3")));
    }

    #[test]
    fn test_request_message_tolerates_missing_fields() {
        let msg: RequestMessage = serde_json::from_str("{}").unwrap();
        assert!(msg.latitude.is_none());
        assert!(msg.apikey.is_none());
    }

    #[test]
    fn test_from_message_applies_defaults() {
        let request = WeatherRequest::from_message(&message(), &RequestDefaults::default()).unwrap();
        assert_eq!(request.update_interval_minutes, DEFAULT_UPDATE_INTERVAL_MINUTES);
        assert_eq!(request.endpoint.as_str(), DEFAULT_ENDPOINT);
        assert!(request.units.is_none());
        assert!(request.language.is_none());
    }

    #[test]
    fn test_from_message_rejects_missing_preconditions() {
        let defaults = RequestDefaults::default();

        let mut msg = message();
        msg.apikey = Some("   ".to_string());
        assert_eq!(
            WeatherRequest::from_message(&msg, &defaults),
            Err(PreconditionError::MissingApiKey)
        );

        let mut msg = message();
        msg.latitude = None;
        assert_eq!(
            WeatherRequest::from_message(&msg, &defaults),
            Err(PreconditionError::MissingLatitude)
        );

        let mut msg = message();
        msg.longitude = None;
        assert_eq!(
            WeatherRequest::from_message(&msg, &defaults),
            Err(PreconditionError::MissingLongitude)
        );
    }

    #[test]
    fn test_from_message_rejects_bad_interval() {
        let defaults = RequestDefaults::default();
        for bad in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let mut msg = message();
            msg.update_interval = Some(bad);
            assert!(matches!(
                WeatherRequest::from_message(&msg, &defaults),
                Err(PreconditionError::InvalidUpdateInterval(_))
            ));
        }
    }

    #[test]
    fn test_from_message_rejects_bad_endpoint() {
        let defaults = RequestDefaults::default();

        let mut msg = message();
        msg.endpoint = Some("not a url".to_string());
        assert!(matches!(
            WeatherRequest::from_message(&msg, &defaults),
            Err(PreconditionError::InvalidEndpoint { .. })
        ));

        msg.endpoint = Some("ftp://example.test/weather".to_string());
        assert!(matches!(
            WeatherRequest::from_message(&msg, &defaults),
            Err(PreconditionError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn test_units_parse() {
        assert_eq!(Units::parse("metric").unwrap(), Some(Units::Metric));
        assert_eq!(Units::parse("Imperial").unwrap(), Some(Units::Imperial));
        assert_eq!(Units::parse("").unwrap(), None);
        let err = Units::parse("kelvin").unwrap_err();
        assert!(err.to_string().contains("kelvin"));
    }

    #[test]
    fn test_fetch_url_query_order() {
        let mut msg = message();
        msg.units = Some("imperial".to_string());
        msg.language = Some("de".to_string());
        msg.endpoint = Some("https://example.test/data/2.5/weather".to_string());
        let request = WeatherRequest::from_message(&msg, &RequestDefaults::default()).unwrap();

        assert_eq!(
            request.fetch_url().as_str(),
            "https://example.test/data/2.5/weather?lat=10&lon=20&units=imperial&lang=de&appid=secret"
        );
    }

    #[test]
    fn test_fetch_url_omits_blank_optionals() {
        let mut msg = message();
        msg.units = Some(String::new());
        msg.language = Some(" ".to_string());
        msg.endpoint = Some("https://example.test/weather".to_string());
        let request = WeatherRequest::from_message(&msg, &RequestDefaults::default()).unwrap();

        assert_eq!(
            request.fetch_url().as_str(),
            "https://example.test/weather?lat=10&lon=20&appid=secret"
        );
    }

    #[test]
    fn test_response_inserts_instance_id_into_object() {
        let response = WeatherResponse::new(&json!({"temp": 5}), Some(&json!("X")));
        assert_eq!(response.into_json(), json!({"temp": 5, "instanceId": "X"}));
    }

    #[test]
    fn test_response_wraps_non_object_body() {
        let response = WeatherResponse::new(&json!([1, 2]), Some(&json!(7)));
        assert_eq!(response.into_json(), json!({"data": [1, 2], "instanceId": 7}));
    }

    #[test]
    fn test_response_without_instance_id_is_untouched() {
        let response = WeatherResponse::new(&json!({"temp": 5}), None);
        assert_eq!(response.into_json(), json!({"temp": 5}));
    }
}
