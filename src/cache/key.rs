//! Cache key derivation

use std::fmt;

use serde_json::{Map, Value};

use crate::data::WeatherRequest;

/// Canonical identity of a cached payload
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives the cache key for a request
///
/// Only latitude, longitude, units and language identify a payload. The API
/// key, endpoint and update interval are left out, so requests
/// differing only in those share one entry. The key is a JSON object with
/// sorted fields and absent options omitted.
pub fn derive_key(request: &WeatherRequest) -> CacheKey {
    // Inserted in sorted order so the output is stable with or without
    // serde_json's `preserve_order`.
    let mut fields = Map::new();
    if let Some(ref lang) = request.language {
        fields.insert("lang".to_string(), Value::from(lang.as_str()));
    }
    // `+ 0.0` folds -0.0 into 0.0
    fields.insert("lat".to_string(), Value::from(request.latitude + 0.0));
    fields.insert("lon".to_string(), Value::from(request.longitude + 0.0));
    if let Some(units) = request.units {
        fields.insert("units".to_string(), Value::from(units.as_str()));
    }
    CacheKey(Value::Object(fields).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{RequestDefaults, RequestMessage};

    fn request(apply: impl FnOnce(&mut RequestMessage)) -> WeatherRequest {
        let mut msg = RequestMessage {
            apikey: Some("key-a".to_string()),
            latitude: Some(10.0),
            longitude: Some(20.0),
            ..Default::default()
        };
        apply(&mut msg);
        WeatherRequest::from_message(&msg, &RequestDefaults::default()).unwrap()
    }

    #[test]
    fn test_key_ignores_credentials_endpoint_and_interval() {
        let a = request(|_| {});
        let b = request(|m| {
            m.apikey = Some("key-b".to_string());
            m.endpoint = Some("https://mirror.example.test/weather".to_string());
            m.update_interval = Some(60.0);
            m.instance_id = Some(serde_json::json!("other"));
        });
        assert_eq!(derive_key(&a), derive_key(&b));
    }

    #[test]
    fn test_key_distinguishes_identity_fields() {
        let base = derive_key(&request(|_| {}));
        assert_ne!(base, derive_key(&request(|m| m.latitude = Some(10.5))));
        assert_ne!(base, derive_key(&request(|m| m.longitude = Some(-20.0))));
        assert_ne!(base, derive_key(&request(|m| m.units = Some("metric".to_string()))));
        assert_ne!(base, derive_key(&request(|m| m.language = Some("fr".to_string()))));
    }

    #[test]
    fn test_blank_optionals_match_absent() {
        let absent = derive_key(&request(|_| {}));
        let blank = derive_key(&request(|m| {
            m.units = Some(String::new());
            m.language = Some(String::new());
        }));
        assert_eq!(absent, blank);
    }

    #[test]
    fn test_negative_zero_matches_zero() {
        let zero = derive_key(&request(|m| m.latitude = Some(0.0)));
        let neg_zero = derive_key(&request(|m| m.latitude = Some(-0.0)));
        assert_eq!(zero.as_str(), neg_zero.as_str());
    }

    #[test]
    fn test_key_is_canonical_json() {
        let key = derive_key(&request(|m| {
            m.units = Some("metric".to_string());
            m.language = Some("en".to_string());
        }));
        assert_eq!(
            key.as_str(),
            r#"{"lang":"en","lat":10.0,"lon":20.0,"units":"metric"}"#
        );
    }
}
