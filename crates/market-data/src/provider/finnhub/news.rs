//! Market and company news from Finnhub.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{FinnhubClient, PROVIDER_ID};
use crate::errors::MarketDataError;
use crate::provider::NewsFetcher;

/// Headline keywords that mark a general-category article as trading relevant.
const TRADING_KEYWORDS: [&str; 9] = [
    "forex",
    "usd",
    "eur",
    "gold",
    "xauusd",
    "fomc",
    "inflation",
    "interest rate",
    "fed",
];

const COMPANY_NEWS_DAYS: i64 = 30;

/// A news article as returned by Finnhub.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsArticle {
    pub category: String,
    /// Publication time (Unix seconds)
    pub datetime: i64,
    pub headline: String,
    pub id: i64,
    pub image: String,
    pub related: String,
    pub source: String,
    pub summary: String,
    pub url: String,
}

/// How general-category news is merged with forex news.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum NewsMode {
    /// Forex and general articles, all of them.
    #[default]
    Combined,
    /// Forex articles, topped up with keyword-matching general articles
    /// only when forex alone does not reach the limit.
    TradingFiltered,
}

fn is_trading_relevant(article: &NewsArticle) -> bool {
    let headline = article.headline.to_lowercase();
    TRADING_KEYWORDS.iter().any(|keyword| headline.contains(keyword))
}

/// Merge category feeds, drop blank or repeated headlines and cap at `limit`.
pub(crate) fn merge_news(
    forex: Vec<NewsArticle>,
    general: Vec<NewsArticle>,
    limit: usize,
    mode: NewsMode,
) -> Vec<NewsArticle> {
    let mut merged = forex;
    match mode {
        NewsMode::Combined => merged.extend(general),
        NewsMode::TradingFiltered => {
            if merged.len() < limit {
                merged.extend(general.into_iter().filter(is_trading_relevant));
            }
        }
    }

    let mut seen = HashSet::new();
    merged
        .into_iter()
        .filter(|article| !article.headline.is_empty() && seen.insert(article.headline.clone()))
        .take(limit)
        .collect()
}

/// News over Finnhub's `/news` and `/company-news` endpoints.
pub struct FinnhubNewsFetcher {
    client: Arc<FinnhubClient>,
}

impl FinnhubNewsFetcher {
    pub fn new(client: Arc<FinnhubClient>) -> Self {
        Self { client }
    }

    async fn category(&self, category: &str) -> Vec<NewsArticle> {
        match self
            .client
            .get::<Vec<NewsArticle>>("/news", &[("category", category)])
            .await
        {
            Ok(articles) => articles,
            Err(e) => {
                warn!("Finnhub {} news unavailable: {}", category, e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl NewsFetcher for FinnhubNewsFetcher {
    fn provider(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn market_news(
        &self,
        limit: usize,
        mode: NewsMode,
    ) -> Result<Vec<NewsArticle>, MarketDataError> {
        let (forex, general) = match mode {
            NewsMode::Combined => {
                futures::join!(self.category("forex"), self.category("general"))
            }
            NewsMode::TradingFiltered => {
                let forex = self.category("forex").await;
                let general = if forex.len() >= limit {
                    Vec::new()
                } else {
                    self.category("general").await
                };
                (forex, general)
            }
        };

        let articles = merge_news(forex, general, limit, mode);
        debug!("Finnhub market news: {} articles", articles.len());
        Ok(articles)
    }

    async fn company_news(&self, symbol: &str) -> Result<Vec<NewsArticle>, MarketDataError> {
        let today = Utc::now().date_naive();
        let from = (today - ChronoDuration::days(COMPANY_NEWS_DAYS))
            .format("%Y-%m-%d")
            .to_string();
        let to = today.format("%Y-%m-%d").to_string();

        let result = self
            .client
            .get::<Vec<NewsArticle>>(
                "/company-news",
                &[("symbol", symbol), ("from", from.as_str()), ("to", to.as_str())],
            )
            .await;

        match result {
            Ok(articles) => Ok(articles),
            Err(e) => {
                warn!("Finnhub company news for {} unavailable: {}", symbol, e);
                Ok(Vec::new())
            }
        }
    }
}
