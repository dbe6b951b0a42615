use crate::error::{LensError, Result};
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

/// Placeholder used when a station row lacks a name or a price.
pub const UNKNOWN: &str = "不明";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prefecture {
    pub name: String,
    /// Line index page of the prefecture.
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineLink {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyLines {
    pub company: String,
    pub lines: Vec<LineLink>,
}

/// Raw row of a line page. `rent` is the displayed text, not yet parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationRent {
    pub station: String,
    pub rent: String,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| LensError::Parse(format!("Invalid selector: {:?}", e)))
}

fn text_of(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn absolute(base: &Url, href: &str) -> Result<String> {
    base.join(href)
        .map(String::from)
        .map_err(|e| LensError::Parse(format!("Invalid link '{}': {}", href, e)))
}

/// Prefecture links of the top page. Each URL points at the prefecture's
/// per-line (`ensen/`) index.
pub fn parse_prefectures(html: &str, page_url: &Url) -> Result<Vec<Prefecture>> {
    let document = Html::parse_document(html);
    let link_selector = selector("a.areamenu_detail-btn")?;

    let mut prefectures = Vec::new();
    for link in document.select(&link_selector) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        prefectures.push(Prefecture {
            name: text_of(link),
            url: format!("{}ensen/", absolute(page_url, href)?),
        });
    }

    Ok(prefectures)
}

/// Lines grouped by operating company, in page order.
pub fn parse_lines(html: &str, page_url: &Url) -> Result<Vec<CompanyLines>> {
    let document = Html::parse_document(html);
    let table_selector = selector("table.searchtable")?;
    let row_selector = selector("tr")?;
    let title_selector = selector("th.searchtable-title")?;
    let link_selector = selector("a")?;

    let Some(table) = document.select(&table_selector).next() else {
        info!("No searchtable found on {}", page_url);
        return Ok(Vec::new());
    };

    let mut companies = Vec::new();
    for row in table.select(&row_selector) {
        let Some(title) = row.select(&title_selector).next() else {
            continue;
        };

        let mut lines = Vec::new();
        let cells = title
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .filter(|e| e.value().name() == "td");
        for cell in cells {
            for link in cell.select(&link_selector) {
                let name = text_of(link);
                match link.value().attr("href") {
                    Some(href) => lines.push(LineLink {
                        name,
                        url: absolute(page_url, href)?,
                    }),
                    None => debug!("Line link without href: {} ({})", name, page_url),
                }
            }
        }

        companies.push(CompanyLines {
            company: text_of(title),
            lines,
        });
    }

    Ok(companies)
}

/// Station rows of a line page.
pub fn parse_station_rents(html: &str) -> Result<Vec<StationRent>> {
    let document = Html::parse_document(html);
    let row_selector = selector("tr.js-graph-data")?;
    let cell_selector = selector("td")?;
    let price_selector = selector("span.graphpanel_matrix-td_graphinfo-strong")?;

    let rows = document
        .select(&row_selector)
        .map(|row| StationRent {
            station: row
                .select(&cell_selector)
                .next()
                .map_or_else(|| UNKNOWN.to_string(), text_of),
            rent: row
                .select(&price_selector)
                .next()
                .map_or_else(|| UNKNOWN.to_string(), text_of),
        })
        .collect();

    Ok(rows)
}

/// Parses a displayed rent in units of 10,000 yen. `None` for the site's
/// placeholders and anything that is not a number.
pub fn parse_rent(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() || text == UNKNOWN || text == "---" {
        return None;
    }
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}
