use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use wreq::header::{REFERER, USER_AGENT};

use crate::{error::AppResult, models::LeaderboardEntry};

const BROWSER_UA: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

pub fn leaderboard_url(base_url: &str, year: i16) -> String {
    format!("{}/year/world/{}/", base_url.trim_end_matches('/'), year)
}

pub async fn fetch_leaderboard(
    client: &wreq::Client,
    base_url: &str,
    year: i16,
) -> AppResult<Vec<LeaderboardEntry>> {
    let url = leaderboard_url(base_url, year);
    debug!(url = %url, "fetching box office leaderboard");

    let html = client
        .get(&url)
        .header(USER_AGENT, BROWSER_UA)
        .header(REFERER, base_url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let entries = parse_leaderboard(&html)?;
    debug!(year = year, entries = entries.len(), "parsed box office leaderboard");
    Ok(entries)
}

pub fn parse_leaderboard(html: &str) -> AppResult<Vec<LeaderboardEntry>> {
    let doc = Html::parse_document(html);
    let row_selector = selector("table tr")?;
    let cell_selector = selector("td")?;

    let mut out = Vec::new();

    for row in doc.select(&row_selector) {
        let cells: Vec<ElementRef> = row.select(&cell_selector).collect();
        if cells.len() < 3 {
            continue;
        }

        let Some(rank) = cell_text(&cells[0]).replace(',', "").parse::<i32>().ok() else {
            continue;
        };
        let title = cell_text(&cells[1]);
        if title.is_empty() {
            continue;
        }
        let Some(worldwide_gross) = parse_money(&cell_text(&cells[2])) else {
            continue;
        };

        // Columns 4 and 6 hold the domestic/foreign percentages.
        let domestic_gross = cells.get(3).and_then(|c| parse_money(&cell_text(c)));
        let foreign_gross = cells.get(5).and_then(|c| parse_money(&cell_text(c)));

        out.push(LeaderboardEntry { rank, title, worldwide_gross, domestic_gross, foreign_gross });
    }

    Ok(out)
}

/// `$1,698,863,816` -> 1698863816. Dashes and blanks mean no figure.
pub fn parse_money(s: &str) -> Option<i64> {
    let digits: String = s.trim().trim_start_matches('$').chars().filter(|c| *c != ',').collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn cell_text(cell: &ElementRef) -> String {
    cell.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

fn selector(css: &str) -> AppResult<Selector> {
    Selector::parse(css).map_err(|e| anyhow::anyhow!("bad selector {css}: {e}").into())
}
