//! Row extraction from one page of HS code search results.

use std::sync::LazyLock;

use hsmatch_core::Hs10Entry;
use hsmatch_core::codes::digits_only;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::SyncError;

const TABLE_BODY: &str = "tbody#hskCodeTbody";

static BODY_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(TABLE_BODY).expect("Invalid table body selector"));
static ROW_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("Invalid row selector"));
static CELL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").expect("Invalid cell selector"));

/// Chapter labels are printed as `제84류 원자로ㆍ보일러ㆍ기계류`.
static CHAPTER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"제\d+류\s*").expect("Invalid regex pattern"));

/// Parse the result table of one page, keeping rows under `four_digit`.
///
/// Rows with fewer than four cells are skipped. A page without the result
/// table is an error; a table with no matching rows is not.
pub fn parse_page(html: &str, four_digit: &str) -> Result<Vec<Hs10Entry>, SyncError> {
    let doc = Html::parse_document(html);
    let body = doc
        .select(&BODY_SEL)
        .next()
        .ok_or_else(|| SyncError::Parse(format!("no {TABLE_BODY} element")))?;

    let entries = body
        .select(&ROW_SEL)
        .filter_map(|row| {
            let cells: Vec<String> = row.select(&CELL_SEL).map(cell_text).collect();
            if cells.len() < 4 {
                return None;
            }
            let code = digits_only(&cells[0]);
            if code.get(..4) != Some(four_digit) {
                return None;
            }
            Some(Hs10Entry {
                code,
                chapter_label: CHAPTER_PREFIX.replace_all(&cells[1], "").into_owned(),
                heading_label: cells[2].clone(),
                label: cells[3].clone(),
            })
        })
        .collect();
    Ok(entries)
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}
