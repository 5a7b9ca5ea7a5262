//! Curriculum list page ("Disciplinas do Currículo").

use super::{normalize_whitespace, parse_leading_int};
use crate::browser::DomSnapshot;
use crate::constants::{MENU_LINK_SELECTOR, MIN_CATALOG_CELLS};
use crate::types::CatalogRow;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};

static ROW_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("tbody tr").expect("row selector"));
static TH_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("th").expect("th selector"));
static TD_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("td").expect("td selector"));
static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(MENU_LINK_SELECTOR).expect("link selector"));

static ONCLICK_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"consultarDisciplina\(output,\s*(\d+)\)").expect("onclick regex"));

/// All discipline rows of the list page, in page order.
///
/// Header rows and rows with fewer than nine cells are dropped. A row whose
/// link carries no recognizable id keeps `discipline_id = None`.
pub fn extract_catalog_rows(snapshot: &DomSnapshot) -> Vec<CatalogRow> {
    let document = snapshot.document();
    document
        .select(&ROW_SELECTOR)
        .filter(|row| row.select(&TH_SELECTOR).next().is_none())
        .filter_map(|row| {
            let cells: Vec<ElementRef> = row.select(&TD_SELECTOR).collect();
            if cells.len() < MIN_CATALOG_CELLS {
                return None;
            }
            Some(row_from_cells(&cells))
        })
        .collect()
}

fn cell_text(cell: &ElementRef) -> String {
    normalize_whitespace(&cell.text().collect::<Vec<_>>().join(" "))
}

fn row_from_cells(cells: &[ElementRef]) -> CatalogRow {
    CatalogRow {
        discipline_id: discipline_id_of(&cells[0]),
        name: cell_text(&cells[0]),
        period: cell_text(&cells[1]),
        attended: cell_text(&cells[2]),
        kind: cell_text(&cells[3]),
        ramification: cell_text(&cells[4]),
        credits: parse_leading_int(&cell_text(&cells[5])),
        total_hours: parse_leading_int(&cell_text(&cells[6])),
        credit_lock: cell_text(&cells[7]),
        class_in_period: cell_text(&cells[8]),
    }
}

fn discipline_id_of(cell: &ElementRef) -> Option<String> {
    let link = cell.select(&LINK_SELECTOR).next()?;
    let onclick = link.value().attr("onclick")?;
    ONCLICK_ID_RE
        .captures(onclick)
        .map(|caps| caps[1].to_string())
}
