//! The six data categories and everything that varies between them.
//!
//! A single [`CategoryDescriptor`] per category declares the API endpoint,
//! the listing page, the table layout, the field mapping and which fetch
//! tiers apply. The orchestrator and the tiers are written once against
//! the descriptor.

use crate::config::RuntimeConfig;
use crate::extraction::normalize::{FieldMapping, FieldRule};
use crate::extraction::table::{ColumnRule, TableSpec};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A supported data kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    EventCalendar,
    BoardMeetings,
    CorporateActions,
    Announcements,
    EquityQuote,
    FinancialResults,
}

/// One fetch strategy, ordered by cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchTier {
    ApiProbe,
    StaticHtml,
    BrowserRender,
}

impl fmt::Display for FetchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FetchTier::ApiProbe => "api",
            FetchTier::StaticHtml => "static-html",
            FetchTier::BrowserRender => "browser",
        })
    }
}

/// A JSON endpoint and its fixed query parameters (the symbol is added).
#[derive(Debug, Clone, Copy)]
pub struct ApiEndpoint {
    pub path: &'static str,
    pub params: &'static [(&'static str, &'static str)],
}

/// What the browser tier does once the page is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserFlow {
    /// Wait for the listing table and run the table extractor.
    Table,
    /// Read the quote page text with the label-anchored parser.
    Quote,
    /// Drive the company search form, then parse the results table.
    FinancialResults,
}

#[derive(Debug, Clone, Copy)]
pub struct CategoryDescriptor {
    pub category: Category,
    pub api: Option<ApiEndpoint>,
    /// Page path; the symbol is passed as the `symbol` query parameter.
    pub page_path: &'static str,
    pub table: Option<TableSpec>,
    pub mapping: Option<FieldMapping>,
    /// Applicable tiers, cheapest first.
    pub tiers: &'static [FetchTier],
    pub flow: BrowserFlow,
}

impl CategoryDescriptor {
    pub fn has_tier(&self, tier: FetchTier) -> bool {
        self.tiers.contains(&tier)
    }

    /// Absolute page URL for `symbol`.
    pub fn page_url(&self, config: &RuntimeConfig, symbol: &str) -> String {
        let base = config.url(self.page_path);
        match url::Url::parse_with_params(&base, &[("symbol", symbol)]) {
            Ok(url) => url.to_string(),
            Err(_) => base,
        }
    }

    /// Query parameters for the API call.
    pub fn api_params(&self, symbol: &str) -> Vec<(&'static str, String)> {
        let Some(api) = self.api else {
            return Vec::new();
        };
        let mut params: Vec<(&'static str, String)> =
            api.params.iter().map(|(k, v)| (*k, v.to_string())).collect();
        params.insert(1.min(params.len()), ("symbol", symbol.to_string()));
        params
    }
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::EventCalendar,
        Category::BoardMeetings,
        Category::CorporateActions,
        Category::Announcements,
        Category::EquityQuote,
        Category::FinancialResults,
    ];

    /// URL/CLI name, e.g. `board-meetings`.
    pub fn slug(&self) -> &'static str {
        match self {
            Category::EventCalendar => "event-calendar",
            Category::BoardMeetings => "board-meetings",
            Category::CorporateActions => "corporate-actions",
            Category::Announcements => "announcements",
            Category::EquityQuote => "equity-quote",
            Category::FinancialResults => "financial-results",
        }
    }

    /// Whether results are a record list (as opposed to one object).
    pub fn is_tabular(&self) -> bool {
        self.descriptor().flow == BrowserFlow::Table
    }

    pub fn descriptor(&self) -> &'static CategoryDescriptor {
        match self {
            Category::EventCalendar => &EVENT_CALENDAR,
            Category::BoardMeetings => &BOARD_MEETINGS,
            Category::CorporateActions => &CORPORATE_ACTIONS,
            Category::Announcements => &ANNOUNCEMENTS,
            Category::EquityQuote => &EQUITY_QUOTE,
            Category::FinancialResults => &FINANCIAL_RESULTS,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Category::ALL
            .into_iter()
            .find(|c| c.slug() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = Category::ALL.iter().map(|c| c.slug()).collect();
                format!("unknown category {s:?} (expected one of: {})", known.join(", "))
            })
    }
}

// ── Descriptors ──────────────────────────────────────────────

const TABULAR_TIERS: &[FetchTier] = &[
    FetchTier::ApiProbe,
    FetchTier::StaticHtml,
    FetchTier::BrowserRender,
];
const BROWSER_ONLY: &[FetchTier] = &[FetchTier::BrowserRender];

const FILING_API: &str = "/api/corporate-filing";

pub static EVENT_CALENDAR: CategoryDescriptor = CategoryDescriptor {
    category: Category::EventCalendar,
    api: Some(ApiEndpoint {
        path: FILING_API,
        params: &[("index", "equities"), ("type", "Event Calendar")],
    }),
    page_path: "/companies-listing/corporate-filings-event-calendar",
    table: Some(TableSpec {
        selectors: &["table#CFeventCalendarTable"],
        anchor_id: "CFeventCalendarTable",
        id_fragment: "eventCalendar",
        min_columns: 4,
        columns: &[
            ColumnRule::text("symbol", 0),
            ColumnRule::text("company", 1),
            ColumnRule::text("purpose", 2),
            ColumnRule::rich("details", 3),
            ColumnRule::text("date", 4).optional(),
        ],
    }),
    mapping: Some(FieldMapping {
        fields: &[
            FieldRule::new("symbol", &["symbol", "SYMBOL"]).or_symbol(),
            FieldRule::new("company", &["company", "companyName", "sm_name"]),
            FieldRule::new("purpose", &["purpose", "subject", "event"]),
            FieldRule::new("details", &["details", "description", "bmdesc", "eventDescription"]),
            FieldRule::new("date", &["date", "eventDate", "bm_date"]),
        ],
    }),
    tiers: TABULAR_TIERS,
    flow: BrowserFlow::Table,
};

pub static BOARD_MEETINGS: CategoryDescriptor = CategoryDescriptor {
    category: Category::BoardMeetings,
    api: Some(ApiEndpoint {
        path: FILING_API,
        params: &[("index", "equities"), ("type", "Board Meeting")],
    }),
    page_path: "/companies-listing/corporate-filings-board-meetings",
    table: Some(TableSpec {
        selectors: &["table#CFboardmeetingEquityTable"],
        anchor_id: "CFboardmeetingEquityTable",
        id_fragment: "boardmeeting",
        min_columns: 7,
        columns: &[
            ColumnRule::text("symbol", 0),
            ColumnRule::text("company", 1),
            ColumnRule::text("purpose", 2),
            ColumnRule::link("details_link", 3),
            ColumnRule::text("meeting_date", 4),
            ColumnRule::link("attachment_link", 5),
            ColumnRule::text("broadcast_datetime", 6),
        ],
    }),
    mapping: Some(FieldMapping {
        fields: &[
            FieldRule::new("symbol", &["symbol", "SYMBOL"]).or_symbol(),
            FieldRule::new("company", &["sm_name", "company", "companyName"]),
            FieldRule::new("purpose", &["bm_purpose", "purpose", "subject"]),
            FieldRule::new("details_link", &["detailsUrl", "details_link", "bm_details"]),
            FieldRule::new("meeting_date", &["bm_date", "meetingDate", "meeting_date"]),
            FieldRule::new("attachment_link", &["attachment", "attachmentUrl", "pdfUrl", "xmlUrl"]),
            FieldRule::new(
                "broadcast_datetime",
                &["bm_timestamp", "broadcastDateTime", "broadcast_time"],
            ),
        ],
    }),
    tiers: TABULAR_TIERS,
    flow: BrowserFlow::Table,
};

pub static CORPORATE_ACTIONS: CategoryDescriptor = CategoryDescriptor {
    category: Category::CorporateActions,
    api: Some(ApiEndpoint {
        path: "/api/corporate-actions",
        params: &[("index", "equities")],
    }),
    page_path: "/companies-listing/corporate-filings-actions",
    table: Some(TableSpec {
        selectors: &["table#CFcorpactionsEquityTable"],
        anchor_id: "CFcorpactionsEquityTable",
        id_fragment: "corpactions",
        min_columns: 9,
        columns: &[
            ColumnRule::text("symbol", 0),
            ColumnRule::text("company", 1),
            ColumnRule::text("series", 2),
            ColumnRule::text("purpose", 3),
            ColumnRule::text("face_value", 4),
            ColumnRule::text("ex_date", 5),
            ColumnRule::text("record_date", 6),
            ColumnRule::text("book_closure_start", 7),
            ColumnRule::text("book_closure_end", 8),
        ],
    }),
    mapping: Some(FieldMapping {
        fields: &[
            FieldRule::new("symbol", &["symbol", "SYMBOL"]).or_symbol(),
            FieldRule::new("company", &["company", "comp", "companyName"]),
            FieldRule::new("series", &["series"]),
            FieldRule::new("purpose", &["subject", "purpose"]),
            FieldRule::new("face_value", &["faceVal", "face_value"]),
            FieldRule::new("ex_date", &["exDate", "ex_date"]),
            FieldRule::new("record_date", &["recDate", "recordDate", "rec_date"]),
            FieldRule::new("book_closure_start", &["bcStartDate", "bc_start_date"]),
            FieldRule::new("book_closure_end", &["bcEndDate", "bc_end_date"]),
        ],
    }),
    tiers: TABULAR_TIERS,
    flow: BrowserFlow::Table,
};

pub static ANNOUNCEMENTS: CategoryDescriptor = CategoryDescriptor {
    category: Category::Announcements,
    api: Some(ApiEndpoint {
        path: FILING_API,
        params: &[("index", "equities"), ("type", "Announcement")],
    }),
    page_path: "/companies-listing/corporate-filings-announcements",
    table: Some(TableSpec {
        selectors: &[
            "table#CFanncEquityTable",
            "table#CFanncEquity",
            "table[class*='annc' i]",
        ],
        anchor_id: "CFanncEquityTable",
        id_fragment: "CFannc",
        min_columns: 7,
        columns: &[
            ColumnRule::text("symbol", 0),
            ColumnRule::text("company", 1),
            ColumnRule::text("subject", 2),
            ColumnRule::rich("details", 3),
            ColumnRule::link("attachment_link", 4),
            ColumnRule::link("xbrl_link", 5),
            ColumnRule::text("broadcast_datetime", 6),
        ],
    }),
    mapping: Some(FieldMapping {
        fields: &[
            FieldRule::new("symbol", &["symbol", "SYMBOL"]).or_symbol(),
            FieldRule::new("company", &["sm_name", "company", "companyName"]),
            FieldRule::new("subject", &["desc", "subject", "purpose"]),
            FieldRule::new("details", &["details", "description", "attchmntText"]),
            FieldRule::new("attachment_link", &["attachment", "attachmentUrl", "attchmntFile"]),
            FieldRule::new("xbrl_link", &["xbrl", "xbrlUrl", "seq_id"]),
            FieldRule::new(
                "broadcast_datetime",
                &["an_dt", "broadcastDateTime", "broadcast_datetime"],
            ),
        ],
    }),
    tiers: TABULAR_TIERS,
    flow: BrowserFlow::Table,
};

pub static EQUITY_QUOTE: CategoryDescriptor = CategoryDescriptor {
    category: Category::EquityQuote,
    api: None,
    page_path: "/get-quotes/equity",
    table: None,
    mapping: None,
    tiers: BROWSER_ONLY,
    flow: BrowserFlow::Quote,
};

pub static FINANCIAL_RESULTS: CategoryDescriptor = CategoryDescriptor {
    category: Category::FinancialResults,
    api: None,
    page_path: "/companies-listing/corporate-filings-financial-results-comparision",
    table: None,
    mapping: None,
    tiers: BROWSER_ONLY,
    flow: BrowserFlow::FinancialResults,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_round_trip_and_aliases() {
        for c in Category::ALL {
            assert_eq!(c.slug().parse::<Category>().unwrap(), c);
            assert_eq!(c.descriptor().category, c);
        }
        assert_eq!(
            "Board_Meetings".parse::<Category>().unwrap(),
            Category::BoardMeetings
        );
        assert!("dividends".parse::<Category>().is_err());
    }

    #[test]
    fn test_browser_only_categories() {
        for c in [Category::EquityQuote, Category::FinancialResults] {
            let d = c.descriptor();
            assert_eq!(d.tiers, &[FetchTier::BrowserRender]);
            assert!(d.api.is_none());
            assert!(!c.is_tabular());
        }
    }

    #[test]
    fn test_tabular_descriptors_are_consistent() {
        for c in Category::ALL.into_iter().filter(Category::is_tabular) {
            let d = c.descriptor();
            let table = d.table.expect("tabular category has a table");
            let mapping = d.mapping.expect("tabular category has a mapping");
            let table_fields: Vec<&str> = table.columns.iter().map(|r| r.field).collect();
            let mapped_fields: Vec<&str> = mapping.field_names().collect();
            assert_eq!(table_fields, mapped_fields, "{c} schemas diverge");
            assert!(table.columns.iter().all(|r| r.index < table.min_columns || r.optional));
        }
    }

    #[test]
    fn test_table_selectors_parse() {
        for c in Category::ALL.into_iter().filter(Category::is_tabular) {
            for raw in c.descriptor().table.unwrap().selectors {
                assert!(scraper::Selector::parse(raw).is_ok(), "{c}: {raw}");
            }
        }
    }

    #[test]
    fn test_announcement_class_match_ignores_case() {
        let html = r#"<table class="CFAnncEquity"><tbody><tr>
            <td>INFY</td><td>Infosys Limited</td><td>Press Release</td><td>Update</td>
            <td><a href="https://archives.example.com/infy.pdf">PDF</a></td><td>-</td>
            <td>17-Oct-2026 18:02:11</td>
        </tr></tbody></table>"#;
        let rows = crate::extraction::extract_table(html, &ANNOUNCEMENTS.table.unwrap());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("symbol"), Some("INFY"));
    }

    #[test]
    fn test_minimum_columns() {
        assert_eq!(EVENT_CALENDAR.table.unwrap().min_columns, 4);
        assert_eq!(BOARD_MEETINGS.table.unwrap().min_columns, 7);
        assert_eq!(ANNOUNCEMENTS.table.unwrap().min_columns, 7);
        assert_eq!(CORPORATE_ACTIONS.table.unwrap().min_columns, 9);
    }

    #[test]
    fn test_urls_and_params() {
        let cfg = RuntimeConfig::default();
        assert_eq!(
            EQUITY_QUOTE.page_url(&cfg, "M&M"),
            "https://www.nseindia.com/get-quotes/equity?symbol=M%26M"
        );
        let params = BOARD_MEETINGS.api_params("TCS");
        assert_eq!(
            params,
            vec![
                ("index", "equities".to_string()),
                ("symbol", "TCS".to_string()),
                ("type", "Board Meeting".to_string()),
            ]
        );
        assert_eq!(EQUITY_QUOTE.api_params("TCS"), Vec::new());
    }
}
