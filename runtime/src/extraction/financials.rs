//! Financial-results comparison table parser.
//!
//! The comparison page renders one table: two header rows (period labels,
//! then audit status per period) and a body in which divider rows open a
//! new section and ordinary rows are line items of the current section.

use super::table::{child_elements, element_text, find_table};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

/// Candidate selectors for the results table, tried in order.
pub const RESULTS_TABLE_SELECTORS: &[&str] = &[
    "table#resultsTable",
    "table#financialResultsTable",
    "table[id*='financial']",
    "table[id*='Financial']",
    "table[id*='result']",
    "table.common_table",
];

const COMPANY_SELECTORS: &[&str] = &["#companyName", ".companyName", ".company-name", "h1"];
const DEFAULT_SECTION: &str = "Particulars";
const SECTION_CLASS_MARKERS: &[&str] = &["section", "group", "heading"];
const TOTAL_CLASS_MARKERS: &[&str] = &["bold", "total", "highlight"];
const NOTE: &str = "Values as published by the source, in the currency shown; periods in display order.";

static THEAD: Lazy<Selector> = Lazy::new(|| Selector::parse("thead").expect("thead selector is valid"));
static TBODY: Lazy<Selector> = Lazy::new(|| Selector::parse("tbody").expect("tbody selector is valid"));
static EMPHASIS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("b, strong").expect("emphasis selector is valid"));
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("body selector is valid"));

static CURRENCY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(₹|Rs\.?|INR)\s*(?:in\s+)?(lakhs?|lacs?|crores?|millions?)")
        .expect("currency regex is valid")
});

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompanyInfo {
    pub name: String,
    pub symbol: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItem {
    pub name: String,
    pub values: Vec<String>,
    pub is_total: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub section_name: String,
    pub line_items: Vec<LineItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultsMetadata {
    pub total_quarters: usize,
    pub total_sections: usize,
    pub note: String,
}

/// Structured financial-results comparison for one company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinancialResults {
    pub status: String,
    pub company: CompanyInfo,
    pub quarters: Vec<String>,
    pub audit_status: Vec<String>,
    pub currency: String,
    pub sections: Vec<Section>,
    pub metadata: ResultsMetadata,
}

impl FinancialResults {
    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(|s| s.line_items.is_empty())
    }
}

/// Parse the rendered comparison page. `None` when no results table exists.
pub fn parse_financial_results(html: &str, symbol: &str) -> Option<FinancialResults> {
    let document = Html::parse_document(html);
    let table = find_table(&document, RESULTS_TABLE_SELECTORS)?;

    let header_rows = header_rows(table);
    let first: Vec<String> = header_rows
        .first()
        .map(|row| header_cells(*row).map(element_text).collect())
        .unwrap_or_default();
    let default_section = first
        .first()
        .filter(|label| !label.is_empty())
        .cloned()
        .unwrap_or_else(|| DEFAULT_SECTION.to_string());
    let quarters: Vec<String> = first.iter().skip(1).cloned().collect();

    let audit_status: Vec<String> = header_rows
        .get(1)
        .map(|row| {
            let cells: Vec<String> = header_cells(*row).map(element_text).collect();
            // A leading label cell shifts the statuses by one.
            if cells.len() > quarters.len() {
                cells[cells.len() - quarters.len()..].to_vec()
            } else {
                cells
            }
        })
        .unwrap_or_default();

    let sections = body_sections(table, &default_section);
    let currency = detect_currency(&document);

    Some(FinancialResults {
        status: "success".to_string(),
        company: CompanyInfo {
            name: company_name(&document),
            symbol: symbol.to_string(),
        },
        metadata: ResultsMetadata {
            total_quarters: quarters.len(),
            total_sections: sections.len(),
            note: NOTE.to_string(),
        },
        quarters,
        audit_status,
        currency,
        sections,
    })
}

fn header_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    if let Some(thead) = table.select(&THEAD).next() {
        return child_elements(thead, "tr").take(2).collect();
    }
    // Without a thead, leading rows made of th cells are the header.
    table
        .select(&TBODY)
        .next()
        .map(|body| {
            child_elements(body, "tr")
                .take_while(|row| child_elements(*row, "th").next().is_some())
                .take(2)
                .collect()
        })
        .unwrap_or_default()
}

fn header_cells<'a>(row: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| matches!(el.value().name(), "th" | "td"))
}

fn body_sections(table: ElementRef<'_>, default_section: &str) -> Vec<Section> {
    let Some(body) = table.select(&TBODY).next() else {
        return Vec::new();
    };

    let has_thead = table.select(&THEAD).next().is_some();
    let mut sections: Vec<Section> = Vec::new();
    for row in child_elements(body, "tr") {
        let cells: Vec<ElementRef> = header_cells(row).collect();
        let header_only = cells.iter().all(|c| c.value().name() == "th");
        if cells.is_empty() || (!has_thead && header_only) {
            continue;
        }
        let name = element_text(cells[0]);

        if is_section_divider(row, &cells) {
            if !name.is_empty() {
                sections.push(Section {
                    section_name: name,
                    line_items: Vec::new(),
                });
            }
            continue;
        }
        if name.is_empty() {
            continue;
        }

        let item = LineItem {
            name,
            values: cells[1..].iter().map(|c| element_text(*c)).collect(),
            is_total: is_total_row(row, &cells),
        };
        match sections.last_mut() {
            Some(section) => section.line_items.push(item),
            None => sections.push(Section {
                section_name: default_section.to_string(),
                line_items: vec![item],
            }),
        }
    }
    sections
}

fn has_class_marker(el: ElementRef, markers: &[&str]) -> bool {
    el.value().classes().any(|class| {
        let class = class.to_ascii_lowercase();
        markers.iter().any(|m| class.contains(m))
    })
}

fn is_section_divider(row: ElementRef, cells: &[ElementRef]) -> bool {
    if has_class_marker(row, SECTION_CLASS_MARKERS) || cells.len() == 1 {
        return true;
    }
    cells[0]
        .value()
        .attr("colspan")
        .and_then(|span| span.trim().parse::<usize>().ok())
        .is_some_and(|span| span > 1)
}

fn is_total_row(row: ElementRef, cells: &[ElementRef]) -> bool {
    has_class_marker(row, TOTAL_CLASS_MARKERS)
        || cells
            .iter()
            .any(|c| has_class_marker(*c, TOTAL_CLASS_MARKERS) || c.select(&EMPHASIS).next().is_some())
}

fn detect_currency(document: &Html) -> String {
    let text: String = document
        .select(&BODY)
        .next()
        .map(|body| body.text().collect::<Vec<_>>().join(" "))
        .unwrap_or_default();
    let Some(caps) = CURRENCY.captures(&text) else {
        return String::new();
    };
    let unit = caps[2].to_ascii_lowercase();
    let unit = if unit.starts_with("la") {
        "Lakhs"
    } else if unit.starts_with("cr") {
        "Crores"
    } else {
        "Millions"
    };
    format!("₹ {unit}")
}

fn company_name(document: &Html) -> String {
    COMPANY_SELECTORS
        .iter()
        .filter_map(|raw| Selector::parse(raw).ok())
        .find_map(|sel| {
            document
                .select(&sel)
                .map(element_text)
                .find(|text| !text.is_empty())
        })
        .unwrap_or_default()
}
