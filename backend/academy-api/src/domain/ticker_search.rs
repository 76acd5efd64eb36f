//! Symbol lookup over the built-in ticker catalog.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ticker {
    pub symbol: &'static str,
    pub name: &'static str,
    pub sector: &'static str,
}

const fn ticker(symbol: &'static str, name: &'static str, sector: &'static str) -> Ticker {
    Ticker {
        symbol,
        name,
        sector,
    }
}

pub static CATALOG: &[Ticker] = &[
    ticker("AAPL", "Apple Inc.", "Technology"),
    ticker("MSFT", "Microsoft Corporation", "Technology"),
    ticker("GOOGL", "Alphabet Inc. Class A", "Communication Services"),
    ticker("AMZN", "Amazon.com Inc.", "Consumer Discretionary"),
    ticker("META", "Meta Platforms Inc.", "Communication Services"),
    ticker("NVDA", "NVIDIA Corporation", "Technology"),
    ticker("TSLA", "Tesla Inc.", "Consumer Discretionary"),
    ticker("AMD", "Advanced Micro Devices Inc.", "Technology"),
    ticker("INTC", "Intel Corporation", "Technology"),
    ticker("NFLX", "Netflix Inc.", "Communication Services"),
    ticker("ADBE", "Adobe Inc.", "Technology"),
    ticker("CRM", "Salesforce Inc.", "Technology"),
    ticker("ORCL", "Oracle Corporation", "Technology"),
    ticker("IBM", "International Business Machines", "Technology"),
    ticker("JPM", "JPMorgan Chase & Co.", "Financials"),
    ticker("BAC", "Bank of America Corporation", "Financials"),
    ticker("GS", "Goldman Sachs Group Inc.", "Financials"),
    ticker("V", "Visa Inc.", "Financials"),
    ticker("MA", "Mastercard Incorporated", "Financials"),
    ticker("BRK.B", "Berkshire Hathaway Inc. Class B", "Financials"),
    ticker("JNJ", "Johnson & Johnson", "Health Care"),
    ticker("PFE", "Pfizer Inc.", "Health Care"),
    ticker("UNH", "UnitedHealth Group Incorporated", "Health Care"),
    ticker("MRNA", "Moderna Inc.", "Health Care"),
    ticker("KO", "The Coca-Cola Company", "Consumer Staples"),
    ticker("PEP", "PepsiCo Inc.", "Consumer Staples"),
    ticker("WMT", "Walmart Inc.", "Consumer Staples"),
    ticker("COST", "Costco Wholesale Corporation", "Consumer Staples"),
    ticker("PG", "Procter & Gamble Company", "Consumer Staples"),
    ticker("DIS", "The Walt Disney Company", "Communication Services"),
    ticker("NKE", "Nike Inc.", "Consumer Discretionary"),
    ticker("SBUX", "Starbucks Corporation", "Consumer Discretionary"),
    ticker("MCD", "McDonald's Corporation", "Consumer Discretionary"),
    ticker("XOM", "Exxon Mobil Corporation", "Energy"),
    ticker("CVX", "Chevron Corporation", "Energy"),
    ticker("BA", "The Boeing Company", "Industrials"),
    ticker("CAT", "Caterpillar Inc.", "Industrials"),
    ticker("UBER", "Uber Technologies Inc.", "Industrials"),
    ticker("SPY", "SPDR S&P 500 ETF Trust", "ETF"),
    ticker("QQQ", "Invesco QQQ Trust", "ETF"),
    ticker("VTI", "Vanguard Total Stock Market ETF", "ETF"),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchOrder {
    #[default]
    Relevance,
    Alpha,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub ticker: Ticker,
    pub score: u32,
}

/// Relevance of `ticker` for an upper-cased query; zero means no match.
pub fn match_score(ticker: &Ticker, query_upper: &str) -> u32 {
    let symbol = ticker.symbol;
    let name = ticker.name.to_uppercase();

    if symbol == query_upper {
        100
    } else if symbol.starts_with(query_upper) {
        80
    } else if name.starts_with(query_upper) {
        60
    } else if symbol.contains(query_upper) {
        40
    } else if name.contains(query_upper) {
        20
    } else {
        0
    }
}

pub fn search(catalog: &[Ticker], query: &str, order: SearchOrder, limit: usize) -> Vec<SearchHit> {
    let query_upper = query.trim().to_uppercase();
    if query_upper.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<SearchHit> = catalog
        .iter()
        .filter_map(|t| {
            let score = match_score(t, &query_upper);
            (score > 0).then_some(SearchHit { ticker: *t, score })
        })
        .collect();

    match order {
        SearchOrder::Relevance => hits.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.ticker.symbol.cmp(b.ticker.symbol))
        }),
        SearchOrder::Alpha => hits.sort_by(|a, b| a.ticker.symbol.cmp(b.ticker.symbol)),
    }

    hits.truncate(limit);
    hits
}

/// Upper-cased, validated ticker symbol (`BRK.B`, `AAPL`).
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let symbol = raw.trim().to_uppercase();
    let valid = (1..=10).contains(&symbol.len())
        && symbol
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '.' || c == '-');
    valid.then_some(symbol)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols(hits: &[SearchHit]) -> Vec<&'static str> {
        hits.iter().map(|h| h.ticker.symbol).collect()
    }

    #[test]
    fn empty_query_matches_nothing() {
        assert!(search(CATALOG, "   ", SearchOrder::Relevance, 10).is_empty());
    }

    #[test]
    fn exact_symbol_ranks_first() {
        let hits = search(CATALOG, "ma", SearchOrder::Relevance, 10);
        assert_eq!(hits[0].ticker.symbol, "MA");
        assert_eq!(hits[0].score, 100);
    }

    #[test]
    fn scores_follow_match_kind() {
        let apple = CATALOG.iter().find(|t| t.symbol == "AAPL").unwrap();
        assert_eq!(match_score(apple, "AAPL"), 100);
        assert_eq!(match_score(apple, "AA"), 80);
        assert_eq!(match_score(apple, "APPLE"), 60);
        assert_eq!(match_score(apple, "APL"), 40);
        assert_eq!(match_score(apple, "INC"), 20);
        assert_eq!(match_score(apple, "ZZZ"), 0);
    }

    #[test]
    fn name_search_is_case_insensitive() {
        let hits = search(CATALOG, "coca", SearchOrder::Relevance, 10);
        assert_eq!(symbols(&hits), vec!["KO"]);
    }

    #[test]
    fn alpha_order_and_limit() {
        let hits = search(CATALOG, "corp", SearchOrder::Alpha, 3);
        assert_eq!(hits.len(), 3);
        let syms = symbols(&hits);
        let mut sorted = syms.clone();
        sorted.sort();
        assert_eq!(syms, sorted);
    }

    #[test]
    fn symbols_are_normalized() {
        assert_eq!(normalize_symbol(" aapl ").as_deref(), Some("AAPL"));
        assert_eq!(normalize_symbol("brk.b").as_deref(), Some("BRK.B"));
        assert_eq!(normalize_symbol(""), None);
        assert_eq!(normalize_symbol("AAPL; DROP"), None);
        assert_eq!(normalize_symbol("ABCDEFGHIJK"), None);
    }
}
