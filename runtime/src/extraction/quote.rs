//! Label-anchored extraction of an equity quote from rendered page text.
//!
//! The quote page has no stable table; values sit next to their labels in
//! the rendered text. Each field lists label variants; the numeric token
//! immediately following a label at the start of a line is captured.
//! Period returns are read from short fragments that carry exactly one
//! period token and a percentage.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Longest fragment considered when scanning for period returns.
const MAX_FRAGMENT_LEN: usize = 48;

/// Period tokens in display order.
pub const RETURN_PERIODS: &[&str] = &[
    "YTD", "1W", "1M", "3M", "6M", "1Y", "3Y", "5Y", "10Y", "15Y", "20Y", "25Y", "30Y",
];

/// Output field → label variants, most specific first.
const FIELD_LABELS: &[(&str, &[&str])] = &[
    ("open", &["Open"]),
    ("high", &["Intraday High", "High"]),
    ("low", &["Intraday Low", "Low"]),
    ("prev_close", &["Prev. Close", "Previous Close", "Prev Close"]),
    ("vwap", &["VWAP"]),
    ("upper_band", &["Upper Band"]),
    ("lower_band", &["Lower Band"]),
    ("traded_volume_lakhs", &["Traded Volume (Lakhs)", "Traded Volume"]),
    ("traded_value_cr", &["Traded Value (₹ Cr.)", "Traded Value"]),
    ("total_market_cap_cr", &["Total Market Cap (₹ Cr.)", "Total Market Cap"]),
    (
        "free_float_market_cap_cr",
        &["Free Float Market Cap (₹ Cr.)", "Free Float Market Cap"],
    ),
    ("face_value", &["Face Value"]),
    ("pe", &["Symbol P/E", "Adjusted P/E", "P/E"]),
    ("52_week_high", &["52 Week High", "52W High"]),
    ("52_week_low", &["52 Week Low", "52W Low"]),
];

static PRICE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:₹|Rs\.?)?[ \t]*(\d[\d,]*\.\d+)\s*([+-]?\d[\d,]*\.\d+)\s*\(\s*([+-]?\d+(?:\.\d+)?)\s*%\s*\)",
    )
    .expect("price line regex is valid")
});

static PERIOD_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(YTD|1\s?W|1\s?M|3\s?M|6\s?M|1\s?Y|3\s?Y|5\s?Y|10\s?Y|15\s?Y|20\s?Y|25\s?Y|30\s?Y)\b")
        .expect("period token regex is valid")
});

static PERCENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([+-]?\d+(?:\.\d+)?)\s*%").expect("percent regex is valid"));

static LABEL_PATTERNS: Lazy<Vec<(&'static str, Vec<Regex>)>> = Lazy::new(|| {
    FIELD_LABELS
        .iter()
        .map(|(field, labels)| {
            let patterns = labels
                .iter()
                .map(|label| {
                    Regex::new(&format!(
                        r"(?mi)^[ \t]*{}(?:[ \t]*\([^)\n]*\))?[ \t]*:?\s*([+-]?\d[\d,]*(?:\.\d+)?)",
                        regex::escape(label)
                    ))
                    .expect("label regex is valid")
                })
                .collect();
            (*field, patterns)
        })
        .collect()
});

/// Return percentages keyed by period label, in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeriodReturns(Vec<(String, String)>);

impl PeriodReturns {
    pub fn get(&self, period: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(p, _)| p == period)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for PeriodReturns {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// A structured equity quote. Values keep the source's formatting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EquityQuote {
    pub symbol: String,
    pub last_price: String,
    pub change: String,
    pub percent_change: String,
    pub open: String,
    pub high: String,
    pub low: String,
    pub prev_close: String,
    pub vwap: String,
    pub upper_band: String,
    pub lower_band: String,
    pub traded_volume_lakhs: String,
    pub traded_value_cr: String,
    pub total_market_cap_cr: String,
    pub free_float_market_cap_cr: String,
    pub face_value: String,
    pub pe: String,
    #[serde(rename = "52_week_high")]
    pub week52_high: String,
    #[serde(rename = "52_week_low")]
    pub week52_low: String,
    pub returns: PeriodReturns,
}

impl EquityQuote {
    /// True when nothing beyond the symbol was extracted.
    pub fn is_empty(&self) -> bool {
        self.last_price.is_empty()
            && self.returns.is_empty()
            && FIELD_LABELS.iter().all(|(f, _)| self.field(f).map_or(true, str::is_empty))
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut String> {
        Some(match name {
            "open" => &mut self.open,
            "high" => &mut self.high,
            "low" => &mut self.low,
            "prev_close" => &mut self.prev_close,
            "vwap" => &mut self.vwap,
            "upper_band" => &mut self.upper_band,
            "lower_band" => &mut self.lower_band,
            "traded_volume_lakhs" => &mut self.traded_volume_lakhs,
            "traded_value_cr" => &mut self.traded_value_cr,
            "total_market_cap_cr" => &mut self.total_market_cap_cr,
            "free_float_market_cap_cr" => &mut self.free_float_market_cap_cr,
            "face_value" => &mut self.face_value,
            "pe" => &mut self.pe,
            "52_week_high" => &mut self.week52_high,
            "52_week_low" => &mut self.week52_low,
            _ => return None,
        })
    }

    fn field(&self, name: &str) -> Option<&str> {
        Some(match name {
            "open" => &self.open,
            "high" => &self.high,
            "low" => &self.low,
            "prev_close" => &self.prev_close,
            "vwap" => &self.vwap,
            "upper_band" => &self.upper_band,
            "lower_band" => &self.lower_band,
            "traded_volume_lakhs" => &self.traded_volume_lakhs,
            "traded_value_cr" => &self.traded_value_cr,
            "total_market_cap_cr" => &self.total_market_cap_cr,
            "free_float_market_cap_cr" => &self.free_float_market_cap_cr,
            "face_value" => &self.face_value,
            "pe" => &self.pe,
            "52_week_high" => &self.week52_high,
            "52_week_low" => &self.week52_low,
            _ => return None,
        })
    }
}

/// Build a quote from the page's rendered body text plus short text
/// fragments collected from individual elements.
pub fn parse_quote(symbol: &str, body_text: &str, fragments: &[String]) -> EquityQuote {
    let mut quote = EquityQuote {
        symbol: symbol.to_string(),
        ..Default::default()
    };

    if let Some(caps) = PRICE_LINE.captures(body_text) {
        quote.last_price = caps[1].to_string();
        quote.change = caps[2].to_string();
        quote.percent_change = format!("{}%", &caps[3]);
    }

    for (field, patterns) in LABEL_PATTERNS.iter() {
        let value = patterns
            .iter()
            .find_map(|re| re.captures(body_text).map(|c| c[1].to_string()));
        if let (Some(value), Some(slot)) = (value, quote.field_mut(field)) {
            *slot = value;
        }
    }

    quote.returns = parse_returns(body_text, fragments);
    quote
}

/// Collect period returns from element fragments first, then from short
/// windows of the body text (a label and its value often sit on adjacent
/// lines).
pub fn parse_returns(body_text: &str, fragments: &[String]) -> PeriodReturns {
    let lines: Vec<&str> = body_text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let windows = lines
        .iter()
        .map(|l| l.to_string())
        .chain(lines.windows(2).map(|w| format!("{} {}", w[0], w[1])));

    let mut found: Vec<(String, String)> = Vec::new();
    for fragment in fragments.iter().cloned().chain(windows) {
        if fragment.chars().count() > MAX_FRAGMENT_LEN || !fragment.contains('%') {
            continue;
        }
        let tokens: Vec<regex::Match> = PERIOD_TOKEN
            .captures_iter(&fragment)
            .filter_map(|c| c.get(1))
            .collect();
        let [token] = tokens.as_slice() else {
            continue;
        };
        // The percentage must follow its period label.
        let Some(pct) = PERCENT.captures(&fragment[token.end()..]) else {
            continue;
        };
        let period = token.as_str().to_ascii_uppercase().replace(char::is_whitespace, "");
        if found.iter().any(|(p, _)| *p == period) {
            continue;
        }
        found.push((period, format!("{}%", &pct[1])));
    }

    found.sort_by_key(|(p, _)| {
        RETURN_PERIODS
            .iter()
            .position(|known| known == p)
            .unwrap_or(usize::MAX)
    });
    PeriodReturns(found)
}
