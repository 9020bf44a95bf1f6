//! Wire types for the OpticOdds API.
//!
//! The provider is loose about types (ids may be numbers or strings, nested
//! objects or plain names), so most fields are kept as [`Value`] and reduced
//! to text by the helpers below.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::port::outbound::feed::{RawEvent, RawEventKind, RawPrice};

/// Payload of an `odds` or `locked-odds` stream event.
#[derive(Debug, Deserialize)]
pub struct OddsPayload {
    #[serde(default)]
    pub entry_id: Option<String>,
    #[serde(default)]
    pub data: Vec<Value>,
}

/// One odds item inside [`OddsPayload::data`].
#[derive(Debug, Default, Deserialize)]
pub struct OddsItem {
    #[serde(default)]
    pub sportsbook: Option<Value>,
    #[serde(default)]
    pub sport: Option<Value>,
    #[serde(default)]
    pub league: Option<Value>,
    #[serde(default, alias = "event_id", alias = "game_id")]
    pub fixture_id: Option<Value>,
    #[serde(default, alias = "market_name")]
    pub market: Option<Value>,
    #[serde(default, alias = "selection")]
    pub name: Option<Value>,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub decimal: Option<Value>,
    #[serde(default)]
    pub american: Option<Value>,
    #[serde(default)]
    pub points: Option<Value>,
    #[serde(default)]
    pub is_main: Option<bool>,
    #[serde(default)]
    pub is_live: Option<bool>,
    /// Seconds since the epoch.
    #[serde(default)]
    pub timestamp: Option<f64>,
}

impl OddsItem {
    /// Convert into a [`RawEvent`] without validating anything.
    pub fn into_raw(
        self,
        kind: RawEventKind,
        sequence: u64,
        default_sport: &str,
        received_at: DateTime<Utc>,
    ) -> RawEvent {
        let price = self.raw_price();
        RawEvent {
            kind,
            sequence,
            sport: id_text(self.sport.as_ref()).or_else(|| Some(default_sport.to_string())),
            league: id_text(self.league.as_ref()),
            sportsbook: id_text(self.sportsbook.as_ref()),
            fixture: id_text(self.fixture_id.as_ref()),
            market: id_text(self.market.as_ref()),
            selection: id_text(self.name.as_ref()),
            price,
            line: scalar_text(self.points.as_ref()),
            is_main: self.is_main,
            is_live: self.is_live.unwrap_or(false),
            observed_at: self
                .timestamp
                .and_then(epoch_seconds)
                .unwrap_or(received_at),
        }
    }

    /// Pick the price field, preferring explicit decimal, then explicit
    /// American, then the generic `price` (American when `|x| >= 100`).
    fn raw_price(&self) -> Option<RawPrice> {
        let nested = self.price.as_ref().filter(|v| v.is_object());
        let field = |key: &str| nested.and_then(|p| scalar_text(p.get(key)));

        if let Some(decimal) = scalar_text(self.decimal.as_ref()).or_else(|| field("decimal")) {
            return Some(RawPrice::Decimal(decimal));
        }
        if let Some(american) = scalar_text(self.american.as_ref()).or_else(|| field("american")) {
            return Some(RawPrice::American(american));
        }
        let generic = scalar_text(self.price.as_ref())?;
        let magnitude = generic
            .trim_start_matches('+')
            .parse::<f64>()
            .map(f64::abs)
            .unwrap_or(0.0);
        if magnitude >= 100.0 {
            Some(RawPrice::American(generic))
        } else {
            Some(RawPrice::Decimal(generic))
        }
    }
}

/// Envelope of list endpoints.
#[derive(Debug, Deserialize)]
pub struct ListResponse {
    #[serde(default)]
    pub data: Vec<CatalogItem>,
}

/// Sport, league, market or sportsbook as returned by the catalog endpoints.
#[derive(Debug, Deserialize)]
pub struct CatalogItem {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, alias = "title", alias = "display_name")]
    pub name: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub sport: Option<Value>,
}

/// Text of a scalar (string or number). Blank strings count as absent.
pub fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Identifier of a scalar or of an object's `id` field.
pub fn id_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Object(map) => scalar_text(map.get("id")).or_else(|| scalar_text(map.get("name"))),
        other => scalar_text(Some(other)),
    }
}

fn epoch_seconds(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() || secs <= 0.0 {
        return None;
    }
    let millis = (secs * 1000.0) as i64;
    Utc.timestamp_millis_opt(millis).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(value: Value) -> OddsItem {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn generic_price_detects_american() {
        let it = item(json!({"price": -110}));
        assert_eq!(it.raw_price(), Some(RawPrice::American("-110".into())));
        let it = item(json!({"price": 1.91}));
        assert_eq!(it.raw_price(), Some(RawPrice::Decimal("1.91".into())));
    }

    #[test]
    fn explicit_fields_win() {
        let it = item(json!({"price": {"american": "+150"}, "decimal": null}));
        assert_eq!(it.raw_price(), Some(RawPrice::American("+150".into())));
        let it = item(json!({"price": 250, "decimal": 3.5}));
        assert_eq!(it.raw_price(), Some(RawPrice::Decimal("3.5".into())));
    }

    #[test]
    fn into_raw_reads_nested_ids_and_timestamp() {
        let it = item(json!({
            "sportsbook": "Pinnacle",
            "league": {"id": "nba", "name": "NBA"},
            "fixture_id": 12345,
            "market": "Moneyline",
            "name": "Boston Celtics",
            "price": 1.8,
            "timestamp": 1700000000.5
        }));
        let raw = it.into_raw(RawEventKind::Odds, 7, "basketball", Utc::now());
        assert_eq!(raw.league.as_deref(), Some("nba"));
        assert_eq!(raw.fixture.as_deref(), Some("12345"));
        assert_eq!(raw.sport.as_deref(), Some("basketball"));
        assert_eq!(raw.observed_at.timestamp_millis(), 1_700_000_000_500);
        assert!(!raw.is_live);
    }
}
