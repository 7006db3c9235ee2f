//! Polymarket data models.
//!
//! Models for Polymarket CLOB API responses and internal representations.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A Polymarket binary outcome market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    /// Unique market condition ID
    pub condition_id: String,
    /// Market question/title
    pub question: String,
    /// Optional description
    pub description: Option<String>,
    /// Market end/resolution date
    pub end_date: Option<DateTime<Utc>>,
    /// Tokens representing outcomes
    pub tokens: Vec<Token>,
    /// Whether the market is currently active
    pub active: bool,
    /// Tags/categories for the market
    pub tags: Option<Vec<String>>,
    /// 24-hour volume in USD
    pub volume_24h: Option<Decimal>,
    /// Current liquidity in USD
    pub liquidity: Option<Decimal>,
}

impl Market {
    /// Returns the "Yes" token if present.
    #[must_use]
    pub fn yes_token(&self) -> Option<&Token> {
        self.tokens
            .iter()
            .find(|t| t.outcome.eq_ignore_ascii_case("yes"))
    }

    /// Returns the "No" token if present.
    #[must_use]
    pub fn no_token(&self) -> Option<&Token> {
        self.tokens
            .iter()
            .find(|t| t.outcome.eq_ignore_ascii_case("no"))
    }

    /// Returns the yes price (0.0 to 1.0).
    #[must_use]
    pub fn yes_price(&self) -> Option<Decimal> {
        self.yes_token().map(|t| t.price)
    }

    /// Returns the no price (0.0 to 1.0).
    #[must_use]
    pub fn no_price(&self) -> Option<Decimal> {
        self.no_token().map(|t| t.price)
    }

    /// Returns true if the market is related to BTC/Bitcoin.
    #[must_use]
    pub fn is_btc_related(&self) -> bool {
        self.matches_keywords(&["bitcoin", "btc", "satoshi"])
    }

    /// Returns true if the market's title matches any of the given
    /// case-insensitive keywords (asset tickers such as BTC/ETH/SOL).
    #[must_use]
    pub fn matches_keywords(&self, keywords: &[&str]) -> bool {
        let question_lower = self.question.to_lowercase();
        keywords
            .iter()
            .any(|kw| question_lower.contains(&kw.to_lowercase()))
    }

    /// Returns true if the market has sufficient liquidity.
    #[must_use]
    pub fn has_sufficient_liquidity(&self, min_liquidity: Decimal) -> bool {
        self.liquidity.map(|l| l >= min_liquidity).unwrap_or(false)
    }

    /// Returns true if the market is tradeable (active and has prices).
    #[must_use]
    pub fn is_tradeable(&self) -> bool {
        self.active && self.yes_price().is_some() && self.no_price().is_some()
    }

    /// Returns the "Up" token if present (for 15-min markets).
    #[must_use]
    pub fn up_token(&self) -> Option<&Token> {
        self.tokens
            .iter()
            .find(|t| t.outcome.eq_ignore_ascii_case("up"))
    }

    /// Returns the "Down" token if present (for 15-min markets).
    #[must_use]
    pub fn down_token(&self) -> Option<&Token> {
        self.tokens
            .iter()
            .find(|t| t.outcome.eq_ignore_ascii_case("down"))
    }

    /// Returns the up price (for 15-min markets, 0.0 to 1.0).
    #[must_use]
    pub fn up_price(&self) -> Option<Decimal> {
        self.up_token().map(|t| t.price)
    }

    /// Returns the down price (for 15-min markets, 0.0 to 1.0).
    #[must_use]
    pub fn down_price(&self) -> Option<Decimal> {
        self.down_token().map(|t| t.price)
    }

    /// Returns true if this is a 15-minute Up/Down market.
    #[must_use]
    pub fn is_15min_market(&self) -> bool {
        self.up_token().is_some() && self.down_token().is_some()
    }
}

/// A token representing an outcome in a binary market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    /// Unique token ID
    pub token_id: String,
    /// Outcome name ("Yes" or "No")
    pub outcome: String,
    /// Current price (0.0 to 1.0, representing probability)
    pub price: Decimal,
    /// Whether this token won (Some(true) = won, Some(false) = lost, None = not resolved)
    pub winner: Option<bool>,
}

/// Filter for market discovery.
#[derive(Debug, Clone, Default)]
pub struct MarketFilter {
    /// Search query string
    pub query: Option<String>,
    /// Only active markets
    pub active_only: bool,
    /// Minimum liquidity requirement
    pub min_liquidity: Option<Decimal>,
    /// Tags to filter by
    pub tags: Option<Vec<String>>,
}

impl MarketFilter {
    /// Creates a new filter for BTC-related markets.
    #[must_use]
    pub fn btc_markets() -> Self {
        Self::keyword_markets(&["bitcoin", "btc"])
    }

    /// Creates a new filter matching any of the given asset keywords.
    #[must_use]
    pub fn keyword_markets(keywords: &[&str]) -> Self {
        Self {
            query: Some(keywords.join(" OR ")),
            active_only: true,
            min_liquidity: None,
            tags: None,
        }
    }

    /// Adds a minimum liquidity requirement.
    #[must_use]
    pub fn with_min_liquidity(mut self, liquidity: Decimal) -> Self {
        self.min_liquidity = Some(liquidity);
        self
    }
}

/// Price information from the CLOB.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Price {
    /// Token ID
    pub token_id: String,
    /// Best bid price
    pub bid: Option<Decimal>,
    /// Best ask price
    pub ask: Option<Decimal>,
    /// Last traded price
    pub last: Option<Decimal>,
    /// Bid-ask spread
    pub spread: Option<Decimal>,
}

impl Price {
    /// Returns the mid price if both bid and ask are available.
    #[must_use]
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::TWO),
            (Some(bid), None) => Some(bid),
            (None, Some(ask)) => Some(ask),
            (None, None) => self.last,
        }
    }

    /// Returns the spread in basis points.
    #[must_use]
    pub fn spread_bps(&self) -> Option<Decimal> {
        let mid = self.mid_price()?;
        if mid == Decimal::ZERO {
            return None;
        }
        let spread = self.spread?;
        Some(spread / mid * Decimal::from(10000))
    }
}

/// Raw API response for markets endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketsResponse {
    pub data: Option<Vec<RawMarket>>,
    pub next_cursor: Option<String>,
}

/// Raw market data from API.
#[derive(Debug, Clone, Deserialize)]
pub struct RawMarket {
    pub condition_id: String,
    pub question: String,
    pub description: Option<String>,
    pub end_date_iso: Option<String>,
    pub tokens: Vec<RawToken>,
    pub active: bool,
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub volume_num_24hr: Option<f64>,
    #[serde(default)]
    pub liquidity_num: Option<f64>,
}

/// Raw token data from API.
#[derive(Debug, Clone, Deserialize)]
pub struct RawToken {
    pub token_id: String,
    pub outcome: String,
    #[serde(default)]
    pub price: Option<f64>,
    pub winner: Option<bool>,
}

// ============================================================================
// Gamma API Types (for 15-minute market discovery)
// ============================================================================

/// Supported coins for 15-minute markets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Coin {
    Btc,
    Eth,
    Sol,
    Xrp,
}

impl Coin {
    /// Returns the slug prefix for this coin.
    #[must_use]
    pub fn slug_prefix(&self) -> &'static str {
        match self {
            Coin::Btc => "btc",
            Coin::Eth => "eth",
            Coin::Sol => "sol",
            Coin::Xrp => "xrp",
        }
    }

    /// Returns all supported coins.
    #[must_use]
    pub fn all() -> &'static [Coin] {
        &[Coin::Btc, Coin::Eth, Coin::Sol, Coin::Xrp]
    }
}

/// Gamma API event response (contains markets).
#[derive(Debug, Clone, Deserialize)]
pub struct GammaEvent {
    pub slug: String,
    pub title: Option<String>,
    pub markets: Vec<GammaMarket>,
}

/// Gamma API market data for a 15-minute binary option.
#[derive(Debug, Clone, Deserialize)]
pub struct GammaMarket {
    /// Condition ID for the market
    #[serde(rename = "conditionId")]
    pub condition_id: String,

    /// JSON string array: "[\"0.53\", \"0.47\"]"
    #[serde(rename = "outcomePrices")]
    pub outcome_prices: String,

    /// JSON string array: "[\"token_id_1\", \"token_id_2\"]"
    #[serde(rename = "clobTokenIds")]
    pub clob_token_ids: String,

    /// Liquidity as string (e.g., "11888.4997")
    pub liquidity: Option<String>,

    /// End date in ISO format
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,

    /// Start date in ISO format
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,

    /// Question/title of the market
    pub question: Option<String>,

    /// Whether the market is active
    pub active: Option<bool>,
}

impl GammaMarket {
    /// Parses outcome prices from JSON string array.
    #[must_use]
    pub fn parse_outcome_prices(&self) -> Option<(Decimal, Decimal)> {
        let prices: Vec<String> = serde_json::from_str(&self.outcome_prices).ok()?;
        if prices.len() >= 2 {
            let up_price = prices[0].parse::<Decimal>().ok()?;
            let down_price = prices[1].parse::<Decimal>().ok()?;
            Some((up_price, down_price))
        } else {
            None
        }
    }

    /// Parses CLOB token IDs from JSON string array.
    #[must_use]
    pub fn parse_clob_token_ids(&self) -> Option<(String, String)> {
        let ids: Vec<String> = serde_json::from_str(&self.clob_token_ids).ok()?;
        if ids.len() >= 2 {
            Some((ids[0].clone(), ids[1].clone()))
        } else {
            None
        }
    }

    /// Parses liquidity from string.
    #[must_use]
    pub fn parse_liquidity(&self) -> Option<Decimal> {
        self.liquidity.as_ref()?.parse::<Decimal>().ok()
    }

    /// Converts to internal Market type.
    #[must_use]
    pub fn to_market(&self) -> Option<Market> {
        let (up_price, down_price) = self.parse_outcome_prices()?;
        let (up_token_id, down_token_id) = self.parse_clob_token_ids()?;

        let end_date = self.end_date.as_ref().and_then(|s| {
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
        });

        Some(Market {
            condition_id: self.condition_id.clone(),
            question: self
                .question
                .clone()
                .unwrap_or_else(|| format!("15-min Up/Down {}", self.condition_id)),
            description: None,
            end_date,
            tokens: vec![
                Token {
                    token_id: up_token_id,
                    outcome: "Up".to_string(),
                    price: up_price,
                    winner: None,
                },
                Token {
                    token_id: down_token_id,
                    outcome: "Down".to_string(),
                    price: down_price,
                    winner: None,
                },
            ],
            active: self.active.unwrap_or(true),
            tags: Some(vec!["15min".to_string(), "updown".to_string()]),
            volume_24h: None,
            liquidity: self.parse_liquidity(),
        })
    }
}

impl From<RawMarket> for Market {
    fn from(raw: RawMarket) -> Self {
        let end_date = raw.end_date_iso.and_then(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
        });

        let tokens = raw.tokens.into_iter().map(Token::from).collect();

        Self {
            condition_id: raw.condition_id,
            question: raw.question,
            description: raw.description,
            end_date,
            tokens,
            active: raw.active,
            tags: raw.tags,
            volume_24h: raw
                .volume_num_24hr
                .map(Decimal::try_from)
                .and_then(Result::ok),
            liquidity: raw
                .liquidity_num
                .map(Decimal::try_from)
                .and_then(Result::ok),
        }
    }
}

impl From<RawToken> for Token {
    fn from(raw: RawToken) -> Self {
        Self {
            token_id: raw.token_id,
            outcome: raw.outcome,
            price: raw
                .price
                .map(Decimal::try_from)
                .and_then(Result::ok)
                .unwrap_or(Decimal::ZERO),
            winner: raw.winner,
        }
    }
}
