use std::{future::Future, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{CategoriesView, HttpCollectionSource, StderrNotifier, ViewHost, DO_AJAX};
use futures::StreamExt;
use tracing::{info, warn};
use url::Url;

/// Mounts the categories view against the page served at `--page-url`.
#[derive(Parser, Debug)]
struct Args {
    /// URL of the page hosting the view; `api/categories` is resolved against it.
    #[arg(long, default_value = "http://127.0.0.1:8080/")]
    page_url: Url,
    /// Keep the view mounted, refetching on an interval and printing each render.
    #[arg(long)]
    watch: bool,
    /// Seconds between fetches in watch mode.
    #[arg(long, default_value_t = 5)]
    interval: u64,
    /// Treat non-2xx responses as failures instead of parsing their body.
    #[arg(long)]
    check_status: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let source = HttpCollectionSource::new(&args.page_url)
        .with_context(|| format!("cannot resolve categories path against {}", args.page_url))?
        .with_status_check(args.check_status);
    info!(url = %source.url(), "categories source");

    let view = CategoriesView::new(Arc::new(source), Arc::new(StderrNotifier));
    let mut host = ViewHost::create(view);
    host.mount("#app")?;
    println!("{}", host.render());

    if !args.watch {
        host.dispatch(DO_AJAX)?
            .await
            .context("categories fetch task panicked")?;
        println!("{}", host.render());
        return Ok(());
    }

    let period = Duration::from_secs(args.interval.max(1));
    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };
    watch(&host, period, shutdown, |rendered| println!("{rendered}")).await
}

/// Refetches every `period` and hands each new render to `emit` until `shutdown` resolves.
async fn watch(
    host: &ViewHost<CategoriesView>,
    period: Duration,
    shutdown: impl Future<Output = ()>,
    mut emit: impl FnMut(String),
) -> Result<()> {
    let mut renders = Box::pin(host.renders());
    let mut ticker = tokio::time::interval(period);
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("interrupted");
                break;
            }
            _ = ticker.tick() => {
                host.dispatch(DO_AJAX)?;
            }
            rendered = renders.next() => match rendered {
                Some(rendered) => emit(rendered),
                None => break,
            },
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
