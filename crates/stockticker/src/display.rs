use crate::cli::ChartStyle;
use colored::{ColoredString, Colorize};
use stockticker_core::history::PriceSeries;
use stockticker_core::movers::MoversView;
use stockticker_core::resolver::SearchView;
use stockticker_core::schema::{FavoriteEntry, MoverQuote, PricePoint, StockRecord};

const SPARKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const BAR_WIDTH: usize = 40;

pub fn money(value: f64) -> String {
    format!("₹{value:.2}")
}

/// `1.23B`, `4.56M`, `7.89K`, or the plain amount.
pub fn large_number(value: f64) -> String {
    match value {
        v if v >= 1e9 => format!("₹{:.2}B", v / 1e9),
        v if v >= 1e6 => format!("₹{:.2}M", v / 1e6),
        v if v >= 1e3 => format!("₹{:.2}K", v / 1e3),
        v => money(v),
    }
}

/// Digits grouped in threes: `1234567` is `1,234,567`.
pub fn thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// `+12.30 (+0.45%)` in green, or red for a loss.
pub fn change(change: f64, percent: f64) -> ColoredString {
    let sign = if change >= 0.0 { "+" } else { "" };
    let text = format!("{sign}{change:.2} ({sign}{percent:.2}%)");
    if change >= 0.0 {
        text.green()
    } else {
        text.red()
    }
}

pub fn search(view: &SearchView) {
    if let Some(message) = view.outcome.message() {
        println!("{}", message.yellow());
        return;
    }
    for hit in view.outcome.matches() {
        let exchange = hit.exchange.as_deref().unwrap_or("");
        println!("{:<14} {:<40} {}", hit.symbol.bold(), hit.name, exchange.dimmed());
    }
}

fn mover(quote: &MoverQuote) {
    println!(
        "{:<14} {:>12}  {}",
        quote.symbol.bold(),
        money(quote.price),
        change(quote.change, quote.change_percent)
    );
}

pub fn movers(view: &MoversView) {
    if let Some(notice) = &view.notice {
        println!("{}", format!("{notice} - Showing demo data").yellow());
    }
    if let Some(at) = view.updated_at {
        println!("{}", format!("Updated {}", at.format("%H:%M:%S")).dimmed());
    }
    view.quotes.iter().for_each(mover);
}

pub fn stock(record: &StockRecord, degraded: bool) {
    println!("{}  {}", record.symbol.bold(), record.name);
    println!(
        "{}  {}",
        money(record.price).bold(),
        change(record.change, record.change_percent)
    );
    if degraded {
        println!("{}", "Live quote unavailable - showing estimated figures".yellow());
    }
    println!();

    let market_cap = record
        .market_cap
        .map_or_else(|| "N/A".to_string(), |cap| large_number(cap * 1e6));
    let pe = record.pe.map_or_else(|| "N/A".to_string(), |pe| format!("{pe:.2}"));
    let eps = record.eps.map_or_else(|| "N/A".to_string(), money);

    let rows = [
        ("Open", money(record.open)),
        ("High", money(record.high)),
        ("Low", money(record.low)),
        ("Previous Close", money(record.previous_close())),
        ("Day Range", format!("{} - {}", money(record.low), money(record.high))),
        ("Volume", thousands(record.volume)),
        ("Market Cap", market_cap),
        ("P/E Ratio", pe),
        ("EPS", eps),
    ];
    for (label, value) in rows {
        println!("{:<16} {}", label.dimmed(), value);
    }
}

pub fn not_found(symbol: &str) {
    println!("{}", "Stock Not Found".red().bold());
    println!(
        "The stock symbol {symbol:?} doesn't exist or couldn't be found. \
         Try searching for a different stock symbol or check the spelling."
    );
}

pub fn summary(series: &PriceSeries) {
    let summary = series.summary();
    let mut line = format!(
        "{} chart  {}  {}",
        series.period,
        money(summary.current),
        change(summary.change, summary.change_percent)
    );
    if series.source.is_fallback() {
        line.push_str(&format!("  {}", "(demo data)".yellow()));
    }
    println!("{line}");
}

/// One spark character per point, scaled between the series' min and max.
pub fn sparkline(points: &[PricePoint]) -> String {
    let (min, max) = bounds(points);
    let span = max - min;
    points
        .iter()
        .map(|p| {
            if span <= 0.0 {
                return SPARKS[SPARKS.len() / 2];
            }
            let level = ((p.price - min) / span * (SPARKS.len() - 1) as f64).round() as usize;
            SPARKS[level.min(SPARKS.len() - 1)]
        })
        .collect()
}

fn bounds(points: &[PricePoint]) -> (f64, f64) {
    points.iter().fold((f64::MAX, f64::MIN), |(lo, hi), p| {
        (lo.min(p.price), hi.max(p.price))
    })
}

pub fn chart(series: &PriceSeries, style: ChartStyle) {
    summary(series);
    if series.points.is_empty() {
        println!("{}", "No price data".dimmed());
        return;
    }

    match style {
        ChartStyle::Line => println!("{}", sparkline(&series.points)),
        ChartStyle::Area => {
            let (min, max) = bounds(&series.points);
            let span = (max - min).max(f64::EPSILON);
            for point in &series.points {
                let width = 1 + ((point.price - min) / span * (BAR_WIDTH - 1) as f64).round() as usize;
                let volume = point.volume.map(thousands).unwrap_or_default();
                println!(
                    "{:>12} {:>10} {} {}",
                    point.time,
                    money(point.price),
                    "█".repeat(width).cyan(),
                    volume.dimmed()
                );
            }
        }
    }
}

pub fn favorites(entries: &[FavoriteEntry]) {
    if entries.is_empty() {
        println!("{}", "No favorites yet".dimmed());
        return;
    }
    for fav in entries {
        println!(
            "{:<14} {:<32} {:>12}  {}",
            fav.symbol.bold(),
            fav.name,
            money(fav.price),
            change(fav.change, fav.change_percent)
        );
    }
}
