//! Optional live-quote WebSocket listener. Purely ambient: discovery runs
//! work from REST/batch features alone if nothing is listening. Spawns
//! its own task and forwards into [`FeatureCache`] with `Source::Stream`,
//! the same fan-out-to-broadcast idiom as the teacher's
//! `services/market_data.rs::binance_feed`.

use futures_util::StreamExt;
use serde::Deserialize;
use tokio_tungstenite::connect_async;
use tungstenite::Message;

use crate::feature_cache::FeatureCache;
use crate::types::Source;

pub struct StreamQuoteListener {
    url: String,
}

impl StreamQuoteListener {
    pub fn new(api_key: &str) -> Self {
        Self {
            url: format!("wss://socket.polygon.io/stocks?apiKey={api_key}"),
        }
    }

    /// Spawns the listener task and returns immediately. Connection
    /// failures are logged and the task exits; nothing downstream
    /// depends on it succeeding.
    pub fn spawn(self, cache: &'static FeatureCache) {
        tokio::spawn(async move {
            let (mut ws, _) = match connect_async(&self.url).await {
                Ok(t) => t,
                Err(e) => {
                    log::warn!("stream quote listener connect failed: {e}");
                    return;
                }
            };

            while let Some(Ok(msg)) = ws.next().await {
                if let Message::Text(txt) = &msg {
                    if let Ok(quotes) = serde_json::from_str::<Vec<PolygonQuoteEvent>>(txt) {
                        for q in quotes {
                            if let (Some(sym), Some(price)) = (q.sym, q.price()) {
                                cache.write("quote", &sym, price, Source::Stream);
                            }
                        }
                    }
                }
            }
        });
    }
}

#[derive(Debug, Deserialize)]
struct PolygonQuoteEvent {
    sym: Option<String>,
    #[serde(rename = "bp")]
    bid_price: Option<f64>,
    #[serde(rename = "ap")]
    ask_price: Option<f64>,
}

impl PolygonQuoteEvent {
    fn price(&self) -> Option<f64> {
        match (self.bid_price, self.ask_price) {
            (Some(b), Some(a)) => Some((b + a) / 2.0),
            (Some(b), None) => Some(b),
            (None, Some(a)) => Some(a),
            (None, None) => None,
        }
    }
}
