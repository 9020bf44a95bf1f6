//! OpticOdds server-sent odds stream.
//!
//! One [`OpticOddsFeed`] holds at most one open HTTP response. Each `odds` or
//! `locked-odds` event becomes an [`OddsBatch`] whose position is the
//! provider's `entry_id`; passing that position back as `Last-Event-ID`
//! replays everything after it.

use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::{Stream, StreamExt};
use tracing::{debug, info, trace, warn};
use url::Url;

use super::dto::{OddsItem, OddsPayload};
use super::settings::OpticOddsConfig;
use super::sse::{SseDecoder, SseMessage};
use crate::domain::id::EventPosition;
use crate::error::{Error, FeedError};
use crate::port::outbound::feed::{FeedEvent, OddsBatch, OddsFeed, RawEventKind, Subscription};

type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, reqwest::Error>> + Send>>;

/// Items per batch that get distinct sequence slots.
const SEQUENCE_SLOTS: u64 = 1_000;

/// Map a stream entry id (`"<millis>-<counter>"`) and an item index to a
/// sequence number that increases with stream order.
#[must_use]
pub fn sequence_from_entry_id(entry_id: &str, index: usize) -> Option<u64> {
    let (millis, counter) = match entry_id.split_once('-') {
        Some((m, c)) => (m.parse::<u64>().ok()?, c.parse::<u64>().ok()?),
        None => (entry_id.parse::<u64>().ok()?, 0),
    };
    let counter = counter.min(SEQUENCE_SLOTS - 1);
    let index = (index as u64).min(SEQUENCE_SLOTS - 1);
    millis
        .checked_mul(SEQUENCE_SLOTS * SEQUENCE_SLOTS)?
        .checked_add(counter * SEQUENCE_SLOTS + index)
}

/// Server-sent events connection to the OpticOdds odds stream.
pub struct OpticOddsFeed {
    client: reqwest::Client,
    config: OpticOddsConfig,
    body: Option<ByteStream>,
    decoder: SseDecoder,
    pending: VecDeque<FeedEvent>,
    sport: String,
    /// Used when a payload carries no parseable entry id.
    fallback_sequence: u64,
}

impl OpticOddsFeed {
    /// Create a disconnected feed.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: OpticOddsConfig) -> Result<Self, Error> {
        let client = Self::client(&config)?;
        Ok(Self::with_client(client, config))
    }

    /// HTTP client suited to long-lived streams: connect timeout only.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built.
    pub fn client(config: &OpticOddsConfig) -> Result<reqwest::Client, Error> {
        Ok(reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()?)
    }

    /// Create a disconnected feed sharing an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, config: OpticOddsConfig) -> Self {
        Self {
            client,
            config,
            body: None,
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
            sport: String::new(),
            fallback_sequence: 0,
        }
    }

    /// Build the stream URL for a subscription.
    ///
    /// # Errors
    ///
    /// Returns an error if `stream_url` is not a valid base URL.
    pub fn stream_url(&self, subscription: &Subscription) -> Result<Url, Error> {
        let base = self.config.stream_url.trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}/{}", subscription.sport))?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(key) = self.config.api_key.as_deref() {
                query.append_pair("key", key);
            }
            for league in &subscription.leagues {
                query.append_pair("league", league.as_str());
            }
            for book in &subscription.sportsbooks {
                query.append_pair("sportsbook", book.as_str());
            }
            for market in &subscription.markets {
                query.append_pair("market", market);
            }
            if subscription.main_lines_only {
                query.append_pair("is_main", "true");
            }
            if self.config.include_fixture_updates {
                query.append_pair("include_fixture_updates", "true");
            }
            query.append_pair("odds_format", "DECIMAL");
        }
        Ok(url)
    }

    fn handle_message(&mut self, message: SseMessage) {
        let kind = match message.event.as_str() {
            "odds" => RawEventKind::Odds,
            "locked-odds" => RawEventKind::Locked,
            "connected" => {
                debug!(sport = %self.sport, "Stream acknowledged connection");
                self.pending.push_back(FeedEvent::Heartbeat);
                return;
            }
            other => {
                trace!(event = other, "Ignoring stream event");
                self.pending.push_back(FeedEvent::Heartbeat);
                return;
            }
        };
        let batch = self.decode_batch(kind, &message);
        self.pending.push_back(FeedEvent::Batch(batch));
    }

    fn decode_batch(&mut self, kind: RawEventKind, message: &SseMessage) -> OddsBatch {
        let received_at = Utc::now();
        let payload: OddsPayload = match serde_json::from_str(&message.data) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Malformed odds payload");
                return OddsBatch {
                    position: message.id.as_deref().map(EventPosition::new),
                    events: Vec::new(),
                    malformed: 1,
                };
            }
        };
        let entry_id = payload.entry_id.or_else(|| message.id.clone());
        let mut malformed = 0;
        let mut events = Vec::with_capacity(payload.data.len());
        for (index, value) in payload.data.into_iter().enumerate() {
            let item: OddsItem = match serde_json::from_value(value) {
                Ok(item) => item,
                Err(e) => {
                    trace!(error = %e, "Skipping undecodable odds item");
                    malformed += 1;
                    continue;
                }
            };
            let sequence = entry_id
                .as_deref()
                .and_then(|id| sequence_from_entry_id(id, index))
                .unwrap_or_else(|| self.next_fallback_sequence());
            events.push(item.into_raw(kind, sequence, &self.sport, received_at));
        }
        OddsBatch {
            position: entry_id.map(EventPosition::new),
            events,
            malformed,
        }
    }

    fn next_fallback_sequence(&mut self) -> u64 {
        self.fallback_sequence += 1;
        self.fallback_sequence
    }
}

#[async_trait]
impl OddsFeed for OpticOddsFeed {
    async fn connect(
        &mut self,
        subscription: &Subscription,
        resume_from: Option<&EventPosition>,
    ) -> Result<(), Error> {
        self.body = None;
        self.decoder = SseDecoder::new();
        self.pending.clear();
        self.sport = subscription.sport.to_string();
        let now_millis = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        self.fallback_sequence = now_millis.saturating_mul(SEQUENCE_SLOTS * SEQUENCE_SLOTS);

        let url = self.stream_url(subscription)?;
        let mut request = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "text/event-stream");
        if let Some(position) = resume_from {
            request = request.header("Last-Event-ID", position.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| FeedError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason: String = body.chars().take(200).collect();
            return Err(FeedError::from_status(status.as_u16(), reason).into());
        }

        info!(
            sport = %subscription.sport,
            leagues = subscription.leagues.len(),
            resumed = resume_from.is_some(),
            "Odds stream connected"
        );
        let stream = response.bytes_stream().map(|chunk| chunk.map(|b| b.to_vec()));
        self.body = Some(Box::pin(stream));
        Ok(())
    }

    async fn next_event(&mut self) -> Option<FeedEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }
        let next = match self.body.as_mut() {
            Some(body) => body.next().await,
            None => return None,
        };
        match next {
            Some(Ok(chunk)) => {
                for message in self.decoder.push(&chunk) {
                    self.handle_message(message);
                }
                // Any bytes, comments included, prove the connection is alive.
                Some(self.pending.pop_front().unwrap_or(FeedEvent::Heartbeat))
            }
            Some(Err(e)) => {
                self.body = None;
                Some(FeedEvent::Disconnected {
                    reason: e.to_string(),
                })
            }
            None => {
                self.body = None;
                Some(FeedEvent::Disconnected {
                    reason: "stream closed by server".to_string(),
                })
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        "opticodds"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::id::{LeagueId, SportId, SportsbookId};

    fn subscription() -> Subscription {
        Subscription {
            sport: SportId::from("basketball"),
            leagues: vec![LeagueId::from("nba"), LeagueId::from("wnba")],
            sportsbooks: vec![SportsbookId::from("pinnacle")],
            markets: vec![],
            main_lines_only: true,
        }
    }

    fn feed() -> OpticOddsFeed {
        let config = OpticOddsConfig {
            api_key: Some("secret".into()),
            ..OpticOddsConfig::default()
        };
        OpticOddsFeed::new(config).unwrap()
    }

    #[test]
    fn entry_ids_order_by_time_then_counter_then_index() {
        let a = sequence_from_entry_id("1700000000000-0", 5).unwrap();
        let b = sequence_from_entry_id("1700000000000-1", 0).unwrap();
        let c = sequence_from_entry_id("1700000000001-0", 0).unwrap();
        assert!(a < b && b < c);
        assert!(sequence_from_entry_id("garbage", 0).is_none());
    }

    #[test]
    fn stream_url_repeats_filters() {
        let url = feed().stream_url(&subscription()).unwrap();
        assert_eq!(url.path(), "/api/v3/stream/odds/basketball");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("key".into(), "secret".into())));
        assert_eq!(pairs.iter().filter(|(k, _)| k == "league").count(), 2);
        assert!(pairs.contains(&("is_main".into(), "true".into())));
        assert!(pairs.contains(&("odds_format".into(), "DECIMAL".into())));
    }

    #[test]
    fn decodes_odds_message_into_batch() {
        let mut feed = feed();
        feed.sport = "basketball".into();
        let data = r#"{"entry_id":"1700000000000-2","data":[
            {"sportsbook":"pinnacle","fixture_id":"f1","market":"Moneyline","name":"Home","price":1.9},
            "not an object",
            {"sportsbook":"pinnacle","fixture_id":"f1","market":"Moneyline","name":"Away","price":2.0}
        ]}"#;
        feed.handle_message(SseMessage {
            event: "odds".into(),
            data: data.into(),
            id: None,
        });
        let Some(FeedEvent::Batch(batch)) = feed.pending.pop_front() else {
            panic!("expected batch");
        };
        assert_eq!(batch.position, Some(EventPosition::from("1700000000000-2")));
        assert_eq!(batch.events.len(), 2);
        assert_eq!(batch.malformed, 1);
        assert!(batch.events[0].sequence < batch.events[1].sequence);
    }

    #[test]
    fn locked_odds_and_garbage_payloads() {
        let mut feed = feed();
        feed.handle_message(SseMessage {
            event: "locked-odds".into(),
            data: r#"{"entry_id":"5-0","data":[{"sportsbook":"a","name":"x"}]}"#.into(),
            id: None,
        });
        feed.handle_message(SseMessage {
            event: "odds".into(),
            data: "{".into(),
            id: Some("6-0".into()),
        });
        match feed.pending.pop_front() {
            Some(FeedEvent::Batch(b)) => assert_eq!(b.events[0].kind, RawEventKind::Locked),
            other => panic!("unexpected {other:?}"),
        }
        match feed.pending.pop_front() {
            Some(FeedEvent::Batch(b)) => {
                assert_eq!(b.malformed, 1);
                assert_eq!(b.position, Some(EventPosition::from("6-0")));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
