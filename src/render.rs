use analytics::InstrumentSummary;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, Color, Table};
use configuration::Catalog;
use core_types::RankedEntry;

const MISSING: &str = "n/a";
const BAR_WIDTH: usize = 30;
const SPARKLINE_WIDTH: usize = 60;
const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Which instrument, if any, is shown in the expanded detail view.
///
/// The state belongs to the caller and is passed into every render call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub expanded: Option<String>,
}

impl ViewState {
    pub fn expanded(symbol: impl Into<String>) -> Self {
        Self {
            expanded: Some(symbol.into()),
        }
    }

    pub fn is_expanded(&self, symbol: &str) -> bool {
        self.expanded
            .as_deref()
            .is_some_and(|expanded| expanded.eq_ignore_ascii_case(symbol))
    }
}

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).apply_modifier(UTF8_ROUND_CORNERS);
    table
}

fn number_cell(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

pub fn format_price(value: f64) -> String {
    if !value.is_finite() {
        MISSING.to_string()
    } else if value.abs() < 1.0 {
        format!("{:.4}", value)
    } else {
        format!("{:.2}", value)
    }
}

pub fn format_score(value: f64) -> String {
    if value.is_finite() {
        format!("{:+.2}", value)
    } else {
        MISSING.to_string()
    }
}

pub fn format_pct(value: f64) -> String {
    if value.is_finite() {
        format!("{:+.2}%", value)
    } else {
        MISSING.to_string()
    }
}

fn signed_color(value: f64) -> Color {
    if value > 0.0 {
        Color::Green
    } else if value < 0.0 {
        Color::Red
    } else {
        Color::Reset
    }
}

/// The ranked list in ranker order: most depressed z-score first.
pub fn ranking_table(entries: &[RankedEntry], state: &ViewState) -> Table {
    let mut table = new_table();
    table.set_header(vec!["#", "Name", "Symbol", "Points", "Last", "Z-Score"]);

    for (position, entry) in entries.iter().enumerate() {
        let marker = if state.is_expanded(&entry.instrument.symbol) {
            format!("{} *", position + 1)
        } else {
            (position + 1).to_string()
        };
        let last = entry.series.last().map_or(f64::NAN, |p| p.close);
        table.add_row(vec![
            Cell::new(marker),
            Cell::new(&entry.instrument.display_name),
            Cell::new(&entry.instrument.symbol),
            number_cell(entry.series.len().to_string()),
            number_cell(format_price(last)),
            number_cell(format_score(entry.score)).fg(signed_color(entry.score)),
        ]);
    }
    table
}

/// Latest prices, colored by period return like a heatmap.
pub fn snapshot_table(summaries: &[InstrumentSummary]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Name", "Symbol", "Last", "High", "Return", "Z-Score"]);

    for summary in summaries {
        let color = heat_color(summary.return_pct);
        table.add_row(vec![
            Cell::new(&summary.display_name),
            Cell::new(&summary.symbol),
            number_cell(format_price(summary.last_close)).fg(color),
            number_cell(format_price(summary.period_high)),
            number_cell(format_pct(summary.return_pct)).fg(color),
            number_cell(format_score(summary.score)),
        ]);
    }
    table
}

fn heat_color(return_pct: f64) -> Color {
    match return_pct {
        r if r.is_nan() => Color::DarkGrey,
        r if r >= 10.0 => Color::Green,
        r if r > 0.0 => Color::DarkGreen,
        r if r <= -10.0 => Color::Red,
        r if r < 0.0 => Color::DarkRed,
        _ => Color::Reset,
    }
}

/// Period returns with a horizontal bar per instrument.
pub fn returns_table(summaries: &[InstrumentSummary]) -> Table {
    let scale = summaries
        .iter()
        .map(|s| s.return_pct.abs())
        .filter(|r| r.is_finite())
        .fold(0.0, f64::max);

    let mut table = new_table();
    table.set_header(vec!["Name", "Symbol", "Return", ""]);
    for summary in summaries {
        let color = signed_color(summary.return_pct);
        table.add_row(vec![
            Cell::new(&summary.display_name),
            Cell::new(&summary.symbol),
            number_cell(format_pct(summary.return_pct)).fg(color),
            Cell::new(return_bar(summary.return_pct, scale, BAR_WIDTH)).fg(color),
        ]);
    }
    table
}

/// A bar of up to `width` blocks, proportional to `|value| / scale`.
pub fn return_bar(value: f64, scale: f64, width: usize) -> String {
    if !value.is_finite() || scale <= 0.0 {
        return String::new();
    }
    let filled = ((value.abs() / scale) * width as f64).round() as usize;
    "█".repeat(filled.clamp(usize::from(value != 0.0), width))
}

/// Maps closes onto block characters, keeping the last close of each bucket
/// when there are more points than `width`.
pub fn sparkline(closes: &[f64], width: usize) -> String {
    if closes.is_empty() || width == 0 {
        return String::new();
    }

    let sampled: Vec<f64> = if closes.len() <= width {
        closes.to_vec()
    } else {
        (1..=width)
            .map(|bucket| closes[bucket * closes.len() / width - 1])
            .collect()
    };

    let low = sampled.iter().copied().fold(f64::INFINITY, f64::min);
    let high = sampled.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = high - low;
    let top = SPARK_LEVELS.len() - 1;

    sampled
        .iter()
        .map(|&close| {
            if span > 0.0 {
                SPARK_LEVELS[(((close - low) / span) * top as f64).round() as usize]
            } else {
                SPARK_LEVELS[top / 2]
            }
        })
        .collect()
}

/// The expanded view of the instrument selected in `state`, or `None` when
/// nothing is expanded or the selection is not in `entries`.
pub fn render_detail(
    entries: &[RankedEntry],
    summaries: &[InstrumentSummary],
    state: &ViewState,
) -> Option<String> {
    let entry = entries
        .iter()
        .find(|e| state.is_expanded(&e.instrument.symbol))?;
    let summary = summaries
        .iter()
        .find(|s| s.symbol == entry.instrument.symbol)?;

    let mut table = new_table();
    table.set_header(vec![
        Cell::new(format!("{} ({})", summary.display_name, summary.symbol)),
        Cell::new(""),
    ]);
    let first = entry.series.first().map(|p| p.timestamp.to_string());
    let last = entry.series.last().map(|p| p.timestamp.to_string());
    let rows = [
        ("Points", summary.points.to_string()),
        ("From", first.unwrap_or_else(|| MISSING.to_string())),
        ("To", last.unwrap_or_else(|| MISSING.to_string())),
        ("First close", format_price(summary.first_close)),
        ("Last close", format_price(summary.last_close)),
        ("Period high", format_price(summary.period_high)),
        ("Return", format_pct(summary.return_pct)),
        ("Z-Score", format_score(summary.score)),
    ];
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), number_cell(value)]);
    }

    let closes: Vec<f64> = entry.series.closes().collect();
    let spark = sparkline(&closes, SPARKLINE_WIDTH);
    Some(if spark.is_empty() {
        format!("{table}\n(no data)")
    } else {
        format!("{table}\n{spark}")
    })
}

pub fn catalog_table(catalog: &Catalog) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Name", "Symbol", "Group"]);
    for entry in catalog.entries() {
        table.add_row(vec![
            Cell::new(&entry.display_name),
            Cell::new(&entry.symbol),
            Cell::new(entry.group.to_string()),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use analytics::summarize;
    use chrono::NaiveDate;
    use core_types::{Instrument, PricePoint, Series};

    fn entry(symbol: &str, closes: &[f64], score: f64) -> RankedEntry {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PricePoint::new(start + chrono::Duration::days(i as i64), c, c))
            .collect();
        RankedEntry {
            instrument: Instrument::new(format!("{symbol} name"), symbol),
            series: Series::new(points).unwrap(),
            score,
        }
    }

    #[test]
    fn missing_values_render_as_na() {
        assert_eq!(format_price(f64::NAN), "n/a");
        assert_eq!(format_score(f64::NAN), "n/a");
        assert_eq!(format_pct(f64::NAN), "n/a");
        assert_eq!(format_price(2063.456), "2063.46");
        assert_eq!(format_price(0.12345), "0.1235");
        assert_eq!(format_score(1.5), "+1.50");
        assert_eq!(format_pct(-3.0), "-3.00%");
    }

    #[test]
    fn view_state_expands_at_most_one_symbol() {
        assert!(!ViewState::default().is_expanded("GC=F"));
        let state = ViewState::expanded("GC=F");
        assert!(state.is_expanded("gc=f"));
        assert!(!state.is_expanded("SI=F"));
    }

    #[test]
    fn return_bar_scales_to_the_largest_move() {
        assert_eq!(return_bar(10.0, 10.0, 4).chars().count(), 4);
        assert_eq!(return_bar(-5.0, 10.0, 4).chars().count(), 2);
        assert_eq!(return_bar(0.01, 10.0, 4).chars().count(), 1);
        assert_eq!(return_bar(0.0, 10.0, 4), "");
        assert_eq!(return_bar(f64::NAN, 10.0, 4), "");
        assert_eq!(return_bar(1.0, 0.0, 4), "");
    }

    #[test]
    fn sparkline_spans_lowest_to_highest_block() {
        assert_eq!(sparkline(&[1.0, 2.0, 3.0], 10), "▁▅█");
        assert_eq!(sparkline(&[5.0, 5.0], 10), "▄▄");
        assert_eq!(sparkline(&[], 10), "");

        let long: Vec<f64> = (0..100).map(f64::from).collect();
        let line = sparkline(&long, 10);
        assert_eq!(line.chars().count(), 10);
        assert!(line.ends_with('█'));
    }

    #[test]
    fn detail_renders_only_the_expanded_instrument() {
        let entries = vec![entry("GC=F", &[1.0, 2.0, 4.0], 0.9), entry("SI=F", &[], f64::NAN)];
        let summaries: Vec<InstrumentSummary> = entries.iter().map(summarize).collect();

        assert!(render_detail(&entries, &summaries, &ViewState::default()).is_none());
        assert!(render_detail(&entries, &summaries, &ViewState::expanded("HG=F")).is_none());

        let gold = render_detail(&entries, &summaries, &ViewState::expanded("GC=F")).unwrap();
        assert!(gold.contains("GC=F name (GC=F)"));
        assert!(gold.contains("+300.00%"));
        assert!(gold.ends_with("▁▃█"));

        let silver = render_detail(&entries, &summaries, &ViewState::expanded("SI=F")).unwrap();
        assert!(silver.contains("n/a"));
        assert!(silver.ends_with("(no data)"));
    }

    #[test]
    fn ranking_table_marks_the_expanded_row() {
        let entries = vec![entry("GC=F", &[1.0, 2.0], -0.7), entry("SI=F", &[], f64::NAN)];
        let rendered = ranking_table(&entries, &ViewState::expanded("SI=F")).to_string();
        assert!(rendered.contains("2 *"));
        assert!(rendered.contains("-0.70"));
        assert!(rendered.contains("n/a"));
    }
}
