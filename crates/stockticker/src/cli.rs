use clap::{Parser, Subcommand, ValueEnum};
use stockticker_core::history::Period;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Sets the level of tracing
    #[arg(long, global = true, value_enum, ignore_case = true, default_value_t = TraceLevel::WARN)]
    pub trace: TraceLevel,

    /// Print JSON instead of formatted text.
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Look up ticker symbols matching free text.
    Search {
        query: String,

        /// Open the detail view of the top match.
        #[arg(long)]
        select: bool,
    },

    /// Show the top movers of the configured index.
    Movers {
        /// Keep polling and print every refresh, until Ctrl-C.
        #[arg(long)]
        watch: bool,
    },

    /// Show the detail view of one or more stocks: header, metrics, and
    /// chart summary.
    Stock {
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Chart window: 1D, 1W, 1M, 3M, or 1Y.
        #[arg(long, default_value = "1D")]
        period: Period,
    },

    /// Print the price series of a stock.
    Chart {
        symbol: String,

        /// Chart window: 1D, 1W, 1M, 3M, or 1Y.
        #[arg(long, default_value = "1D")]
        period: Period,

        #[arg(long, value_enum, default_value_t = ChartStyle::Area)]
        style: ChartStyle,
    },

    /// Manage favorite stocks.
    Fav {
        #[command(subcommand)]
        action: FavArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum FavArgs {
    /// Add a stock, snapshotting its current quote.
    Add { symbol: String },

    /// Remove a stock.
    Rm { symbol: String },

    /// List favorites in the order they were added.
    Ls,

    /// Add the stock if absent, remove it otherwise.
    Toggle { symbol: String },
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChartStyle {
    /// One sparkline row.
    Line,
    /// One bar per point.
    Area,
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum TraceLevel {
    DEBUG,
    INFO,
    WARN,
    ERROR,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn trace_defaults_to_warn() {
        let cli = Cli::try_parse_from(["stockticker", "fav", "ls"]).unwrap();
        assert_eq!(cli.trace, TraceLevel::WARN);
        assert!(!cli.json);
        assert!(matches!(cli.command, Commands::Fav { action: FavArgs::Ls }));
    }

    #[test]
    fn trace_level_ignores_case() {
        let cli = Cli::try_parse_from(["stockticker", "--trace", "debug", "fav", "ls"]).unwrap();
        assert_eq!(cli.trace, TraceLevel::DEBUG);

        let cli = Cli::try_parse_from(["stockticker", "movers", "--trace", "ERROR"]).unwrap();
        assert_eq!(cli.trace, TraceLevel::ERROR);
    }

    #[test]
    fn chart_defaults_to_area_over_one_day() {
        let cli = Cli::try_parse_from(["stockticker", "chart", "tcs", "--json"]).unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Chart {
                symbol,
                period,
                style,
            } => {
                assert_eq!(symbol, "tcs");
                assert_eq!(period, Period::default());
                assert_eq!(style, ChartStyle::Area);
            }
            other => panic!("parsed {other:?}"),
        }
    }

    #[test]
    fn stock_requires_a_symbol() {
        assert!(Cli::try_parse_from(["stockticker", "stock"]).is_err());
    }
}
