//! Table-to-record extraction for the filing listing pages.
//!
//! Locates the category's table by trying candidate selectors in order,
//! walks the body rows and applies one rule per logical column. A missing
//! table, a missing body or a table with no data rows all produce an empty
//! list: "no rows" is a valid outcome, distinct from a fetch failure.
//!
//! All entry points are synchronous because `scraper` types are `!Send`;
//! async callers run them under `tokio::task::spawn_blocking`.

use super::normalize::NormalizedRecord;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

/// Attributes that carry the untruncated text of a description cell.
const FULL_TEXT_ATTRS: &[&str] = &["data-ws-symbol-col-prev", "data-ws-symbol-col"];

static TBODY: Lazy<Selector> = Lazy::new(|| Selector::parse("tbody").expect("tbody selector is valid"));
static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("anchor selector is valid"));
static ANCHOR_HREF: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("href selector is valid"));
static CONTENT_SPAN: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.content").expect("content span selector is valid"));

/// How a cell's value is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Visible text, preferring an inner link's text.
    Text,
    /// The `href` of the cell's anchor, or empty.
    Link,
    /// Full-text data attribute, then `span.content`, then the cell text.
    RichText,
}

/// Extraction rule for one logical column.
#[derive(Debug, Clone, Copy)]
pub struct ColumnRule {
    pub field: &'static str,
    pub index: usize,
    pub kind: ColumnKind,
    /// Yield an empty value instead of dropping the row when the cell is absent.
    pub optional: bool,
}

impl ColumnRule {
    pub const fn text(field: &'static str, index: usize) -> Self {
        Self {
            field,
            index,
            kind: ColumnKind::Text,
            optional: false,
        }
    }

    pub const fn link(field: &'static str, index: usize) -> Self {
        Self {
            field,
            index,
            kind: ColumnKind::Link,
            optional: false,
        }
    }

    pub const fn rich(field: &'static str, index: usize) -> Self {
        Self {
            field,
            index,
            kind: ColumnKind::RichText,
            optional: false,
        }
    }

    pub const fn optional(self) -> Self {
        Self {
            field: self.field,
            index: self.index,
            kind: self.kind,
            optional: true,
        }
    }
}

/// Where a category's table lives and how its rows map to records.
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    /// CSS selectors tried in order until one matches a table.
    pub selectors: &'static [&'static str],
    /// Element id of the primary table (used by browser waits).
    pub anchor_id: &'static str,
    /// Fragment of the id shared by the table's variants.
    pub id_fragment: &'static str,
    /// Rows with fewer cells are header or spacer rows.
    pub min_columns: usize,
    pub columns: &'static [ColumnRule],
}

/// Parse `html` and extract one record per qualifying data row.
pub fn extract_table(html: &str, spec: &TableSpec) -> Vec<NormalizedRecord> {
    let document = Html::parse_document(html);
    extract_from_document(&document, spec)
}

/// Extract records from an already-parsed document.
pub fn extract_from_document(document: &Html, spec: &TableSpec) -> Vec<NormalizedRecord> {
    let Some(table) = find_table(document, spec.selectors) else {
        return Vec::new();
    };
    let Some(body) = table.select(&TBODY).next() else {
        return Vec::new();
    };

    let mut records = Vec::new();
    for row in child_elements(body, "tr") {
        let cells: Vec<ElementRef> = child_elements(row, "td").collect();
        if cells.len() < spec.min_columns {
            continue;
        }
        match extract_row(&cells, spec.columns) {
            Some(record) => records.push(record),
            None => tracing::debug!("skipping row with {} cells: missing required column", cells.len()),
        }
    }
    records
}

/// First element matched by any of `selectors`, tried in order.
pub fn find_table<'a>(document: &'a Html, selectors: &[&str]) -> Option<ElementRef<'a>> {
    selectors.iter().find_map(|raw| {
        let sel = Selector::parse(raw).ok()?;
        document.select(&sel).next()
    })
}

fn extract_row(cells: &[ElementRef], columns: &[ColumnRule]) -> Option<NormalizedRecord> {
    let mut record = NormalizedRecord::new();
    for rule in columns {
        let value = match cells.get(rule.index) {
            Some(cell) => read_cell(*cell, rule.kind),
            None if rule.optional => String::new(),
            None => return None,
        };
        record.set(rule.field, value);
    }
    Some(record)
}

fn read_cell(cell: ElementRef, kind: ColumnKind) -> String {
    match kind {
        ColumnKind::Text => match cell.select(&ANCHOR).next() {
            Some(link) => {
                let text = element_text(link);
                if text.is_empty() {
                    element_text(cell)
                } else {
                    text
                }
            }
            None => element_text(cell),
        },
        ColumnKind::Link => cell
            .select(&ANCHOR_HREF)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(|href| href.trim().to_string())
            .unwrap_or_default(),
        ColumnKind::RichText => {
            let attr = FULL_TEXT_ATTRS
                .iter()
                .filter_map(|name| cell.value().attr(name))
                .map(str::trim)
                .find(|v| !v.is_empty());
            if let Some(full) = attr {
                return full.to_string();
            }
            match cell.select(&CONTENT_SPAN).next() {
                Some(span) => element_text(span),
                None => element_text(cell),
            }
        }
    }
}

/// Concatenate an element's trimmed text nodes.
pub fn element_text(el: ElementRef) -> String {
    el.text().map(str::trim).filter(|t| !t.is_empty()).collect()
}

/// Direct element children with the given tag name.
pub fn child_elements<'a>(
    parent: ElementRef<'a>,
    tag: &'static str,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |el| el.value().name() == tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUT: TableSpec = TableSpec {
        selectors: &["table#primary", "table#secondary"],
        anchor_id: "primary",
        id_fragment: "primary",
        min_columns: 3,
        columns: &[
            ColumnRule::text("symbol", 0),
            ColumnRule::rich("details", 1),
            ColumnRule::link("link", 2),
            ColumnRule::text("extra", 3).optional(),
        ],
    };

    fn page(table: &str) -> String {
        format!("<html><body><div>{table}</div></body></html>")
    }

    #[test]
    fn test_missing_table_is_empty() {
        let html = page(r#"<table id="other"><tbody><tr><td>a</td><td>b</td><td>c</td></tr></tbody></table>"#);
        assert!(extract_table(&html, &LAYOUT).is_empty());
        assert!(extract_table("", &LAYOUT).is_empty());
    }

    #[test]
    fn test_fallback_selector_is_used() {
        let html = page(r#"<table id="secondary"><tbody><tr><td>TCS</td><td>d</td><td></td></tr></tbody></table>"#);
        let rows = extract_table(&html, &LAYOUT);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("symbol"), Some("TCS"));
    }

    #[test]
    fn test_short_rows_are_skipped() {
        let html = page(
            r#"<table id="primary"><tbody>
                <tr><td colspan="3">No Records</td></tr>
                <tr><td>A</td><td>B</td></tr>
                <tr><td>INFY</td><td>x</td><td>y</td></tr>
            </tbody></table>"#,
        );
        let rows = extract_table(&html, &LAYOUT);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("symbol"), Some("INFY"));
        assert_eq!(rows[0].get("extra"), Some(""));
    }

    #[test]
    fn test_table_without_rows_is_empty() {
        let html = page(r#"<table id="primary"><thead><tr><th>S</th></tr></thead><tbody></tbody></table>"#);
        assert!(extract_table(&html, &LAYOUT).is_empty());
    }

    #[test]
    fn test_text_prefers_link_text() {
        let html = page(
            r#"<table id="primary"><tbody><tr>
                <td><a href="/get-quotes/equity?symbol=SBIN"> SBIN </a><span class="tip">State Bank</span></td>
                <td>x</td><td>y</td>
            </tr></tbody></table>"#,
        );
        let rows = extract_table(&html, &LAYOUT);
        assert_eq!(rows[0].get("symbol"), Some("SBIN"));
    }

    #[test]
    fn test_rich_text_priority() {
        let html = page(
            r#"<table id="primary"><tbody>
              <tr><td>A</td><td data-ws-symbol-col="full attr text"><span class="content">short...</span></td><td></td></tr>
              <tr><td>B</td><td data-ws-symbol-col-prev=" prev attr " data-ws-symbol-col="other"></td><td></td></tr>
              <tr><td>C</td><td>prefix <span class="content">span text</span></td><td></td></tr>
              <tr><td>D</td><td> plain text </td><td></td></tr>
            </tbody></table>"#,
        );
        let rows = extract_table(&html, &LAYOUT);
        let details: Vec<_> = rows.iter().map(|r| r.get("details").unwrap()).collect();
        assert_eq!(details, vec!["full attr text", "prev attr", "span text", "plain text"]);
    }

    #[test]
    fn test_link_rule() {
        let html = page(
            r#"<table id="primary"><tbody>
              <tr><td>A</td><td>x</td><td><a href=" https://example.com/a.pdf ">PDF</a></td></tr>
              <tr><td>B</td><td>x</td><td>-</td></tr>
            </tbody></table>"#,
        );
        let rows = extract_table(&html, &LAYOUT);
        assert_eq!(rows[0].get("link"), Some("https://example.com/a.pdf"));
        assert_eq!(rows[1].get("link"), Some(""));
    }

    #[test]
    fn test_nested_tables_do_not_leak_rows() {
        let html = page(
            r#"<table id="primary"><tbody>
              <tr><td>A</td><td><table><tbody><tr><td>1</td><td>2</td><td>3</td></tr></tbody></table></td><td>z</td></tr>
            </tbody></table>"#,
        );
        let rows = extract_table(&html, &LAYOUT);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("symbol"), Some("A"));
    }
}
