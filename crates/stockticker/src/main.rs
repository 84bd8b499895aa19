use anyhow::{bail, Result};
use clap::Parser;
use cli::{Cli, Commands::*, TraceLevel};
use dotenv::dotenv;
use futures::future::join_all;
use std::sync::Arc;
use stockticker_core::prelude::*;
use stockticker_util::ui::spinner;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::{wrappers::WatchStream, StreamExt};
use tracing::{debug, info, subscriber, trace, Level};
use tracing_subscriber::FmtSubscriber;

mod cli;
mod display;

fn preprocess(trace_level: Level) -> Result<()> {
    dotenv().ok();
    let my_subscriber = FmtSubscriber::builder()
        .with_max_level(trace_level)
        .with_writer(std::io::stderr)
        .finish();
    subscriber::set_global_default(my_subscriber)?;
    Ok(())
}

fn market_api(config: &Config) -> Result<Arc<dyn MarketApi>> {
    let http = HttpApi::new(config)?;
    Ok(Arc::new(Revalidating::new(Arc::new(http))))
}

fn favorites(config: &Config) -> FavoritesStore {
    debug!("favorites stored under {}", config.data_dir.display());
    FavoritesStore::load(Arc::new(FileStorage::new(&config.data_dir)))
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Drive the resolver through its debounce path until the panel settles.
async fn search(resolver: &mut SymbolResolver, query: &str) -> SearchView {
    let mut views = WatchStream::new(resolver.subscribe());
    resolver.set_query(query);
    if query.trim().is_empty() {
        return resolver.view();
    }

    let pb = spinner(format!("Searching for {query:?}"));
    let mut settled = None;
    while let Some(view) = views.next().await {
        if view.panel_open && !view.loading {
            settled = Some(view);
            break;
        }
    }
    pb.finish_and_clear();
    settled.unwrap_or_else(|| resolver.view())
}

/// Detail record and chart of one symbol; the chart is only fetched for a
/// stock that exists.
async fn detail_page(
    api: &dyn MarketApi,
    config: &Config,
    symbol: String,
    period: Period,
) -> (String, DetailOutcome, Option<PriceSeries>) {
    let outcome = fetch_stock(api, &symbol, config).await;
    let series = match outcome {
        DetailOutcome::Found { .. } => Some(fetch_history(api, &symbol, period, config).await),
        DetailOutcome::NotFound => None,
    };
    (symbol, outcome, series)
}

async fn show_stocks(
    api: &dyn MarketApi,
    config: &Config,
    symbols: Vec<String>,
    period: Period,
    json: bool,
) -> Result<()> {
    let pb = spinner(format!("Loading {}", symbols.join(", ")));
    let pages = join_all(
        symbols
            .into_iter()
            .map(|symbol| detail_page(api, config, symbol.to_uppercase(), period)),
    )
    .await;
    pb.finish_and_clear();

    for (i, (symbol, outcome, series)) in pages.into_iter().enumerate() {
        if i > 0 {
            println!();
        }
        match (&outcome, series) {
            (DetailOutcome::Found { record, source }, series) => {
                if json {
                    print_json(record)?;
                    continue;
                }
                display::stock(record, source.is_fallback());
                if let Some(series) = series {
                    println!();
                    display::summary(&series);
                }
            }
            (DetailOutcome::NotFound, _) => display::not_found(&symbol),
        }
    }
    Ok(())
}

/// A fresh snapshot of `symbol` for the favorites collection.
async fn snapshot(api: &dyn MarketApi, config: &Config, symbol: &str) -> Result<FavoriteEntry> {
    match fetch_stock(api, symbol, config).await {
        DetailOutcome::Found { record, .. } => Ok(FavoriteEntry::from(&record)),
        DetailOutcome::NotFound => bail!("Stock Not Found: {symbol}"),
    }
}

/// What `fav add`, `rm` and `toggle` match against: a stored symbol when
/// the input names one, the upstream's symbol otherwise.
async fn favorite_symbol(
    api: &dyn MarketApi,
    config: &Config,
    store: &FavoritesStore,
    input: &str,
) -> String {
    resolve_symbol(api, input, config, |symbol| store.contains(symbol)).await
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.trace {
        TraceLevel::DEBUG => Level::DEBUG,
        TraceLevel::INFO => Level::INFO,
        TraceLevel::WARN => Level::WARN,
        TraceLevel::ERROR => Level::ERROR,
    };

    preprocess(log_level)?;
    trace!("Command line input recorded: {cli:#?}");

    let config = Config::from_env()?;
    let api = market_api(&config)?;

    match cli.command {
        // "> stockticker search <QUERY> [--select]"
        Search { query, select } => {
            let mut resolver = SymbolResolver::new(api.clone(), &config);
            let view = search(&mut resolver, &query).await;

            if cli.json {
                print_json(view.outcome.matches())?;
            } else {
                display::search(&view);
            }

            if select {
                match resolver.submit() {
                    Some(Route::Stock(symbol)) => {
                        info!("opening {symbol}");
                        println!();
                        show_stocks(api.as_ref(), &config, vec![symbol], Period::default(), cli.json)
                            .await?;
                    }
                    None => debug!("nothing to select for {query:?}"),
                }
            }
        }

        // "> stockticker movers [--watch]"
        Movers { watch } => {
            if !watch {
                let pb = spinner("Loading market data");
                let snapshot = fetch_movers(api.as_ref(), &config).await;
                pb.finish_and_clear();

                if cli.json {
                    print_json(&snapshot.quotes)?;
                } else {
                    display::movers(&MoversView {
                        quotes: snapshot.quotes,
                        source: snapshot.source,
                        notice: snapshot.notice,
                        loading: false,
                        refreshing: false,
                        updated_at: Some(snapshot.updated_at),
                    });
                }
                return Ok(());
            }

            let feed = MoversFeed::spawn(api.clone(), &config);
            let mut views = WatchStream::new(feed.subscribe());
            let mut stdin = BufReader::new(tokio::io::stdin()).lines();
            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(ctrl_c);

            eprintln!("Press Enter to refresh, Ctrl-C to stop");
            loop {
                tokio::select! {
                    _ = &mut ctrl_c => break,
                    Ok(Some(_)) = stdin.next_line() => feed.refresh(),
                    next = views.next() => match next {
                        Some(view) if !view.loading && !view.refreshing => {
                            if cli.json {
                                print_json(&view.quotes)?;
                            } else {
                                println!();
                                display::movers(&view);
                            }
                        }
                        Some(_) => {}
                        None => break,
                    },
                }
            }
            debug!("movers feed stopped");
        }

        // "> stockticker stock <SYMBOL>... [--period 1D]"
        Stock { symbols, period } => {
            show_stocks(api.as_ref(), &config, symbols, period, cli.json).await?;
        }

        // "> stockticker chart <SYMBOL> [--period 1D] [--style area]"
        Chart {
            symbol,
            period,
            style,
        } => {
            let symbol = symbol.to_uppercase();
            let pb = spinner(format!("Loading {period} chart for {symbol}"));
            let series = fetch_history(api.as_ref(), &symbol, period, &config).await;
            pb.finish_and_clear();

            if cli.json {
                print_json(&series.points)?;
            } else {
                display::chart(&series, style);
            }
        }

        // "> stockticker fav [add rm ls toggle]"
        Fav { action } => {
            use cli::FavArgs::*;

            let store = favorites(&config);
            match action {
                Add { symbol } => {
                    let symbol = favorite_symbol(api.as_ref(), &config, &store, &symbol).await;
                    let entry = snapshot(api.as_ref(), &config, &symbol).await?;
                    let name = entry.symbol.clone();
                    store.add(entry);
                    println!("Added {name} to favorites");
                }
                Rm { symbol } => {
                    let symbol = favorite_symbol(api.as_ref(), &config, &store, &symbol).await;
                    if store.contains(&symbol) {
                        store.remove(&symbol);
                        println!("Removed {symbol} from favorites");
                    } else {
                        println!("{symbol} is not a favorite");
                    }
                }
                Ls => {
                    if cli.json {
                        print_json(&store.list())?;
                    } else {
                        display::favorites(&store.list());
                    }
                }
                Toggle { symbol } => {
                    let symbol = favorite_symbol(api.as_ref(), &config, &store, &symbol).await;
                    let entry = match store.list().into_iter().find(|fav| fav.symbol == symbol) {
                        Some(existing) => existing,
                        None => snapshot(api.as_ref(), &config, &symbol).await?,
                    };
                    let name = entry.symbol.clone();
                    if store.toggle(entry) {
                        println!("Added {name} to favorites");
                    } else {
                        println!("Removed {name} from favorites");
                    }
                }
            }
        }
    }

    Ok(())
}
