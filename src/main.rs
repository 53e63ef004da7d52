//! Binary entry point: housekeeping passes over both files, then the scan.

use std::sync::Arc;
use std::time::Duration;

use log::debug;

use sourcescan::input::{Config, Opts};
use sourcescan::scanner::{NoopSink, Scanner, PORT_WINDOW};
use sourcescan::store::ServerStore;
use sourcescan::worklist::WorkList;
use sourcescan::{detail, output, warning};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut opts = Opts::read();
    let config = Config::read(opts.config_path.clone());
    opts.merge(&config);
    debug!("main() `opts` arguments are {opts:?}");

    if !opts.greppable && !opts.no_banner {
        print_opening(&opts);
    }

    let store = Arc::new(ServerStore::new(&opts.servers_file));
    let worklist = WorkList::new(&opts.targets_file);

    // Housekeeping before touching the network: collapse duplicates in both
    // files and put the smallest entries first.
    store.dedup().await;
    worklist.tidy().await;

    let tokens = worklist.load().await?;
    if tokens.is_empty() {
        warning!(
            format!("{} has no entries left to scan.", opts.targets_file.display()),
            opts.greppable,
            opts.accessible
        );
        return Ok(());
    }
    detail!(
        format!("Starting scan against {} entries.", tokens.len()),
        opts.greppable,
        opts.accessible
    );

    let scanner = Scanner::new(
        Arc::clone(&store),
        worklist,
        opts.batch_size,
        Duration::from_millis(u64::from(opts.timeout)),
        PORT_WINDOW,
        opts.greppable,
        opts.accessible,
        Arc::new(NoopSink),
    );
    let outcomes = scanner.run(&tokens).await;
    debug!("resolutions: {outcomes:?}");

    let total = store.record_count().await;
    output!(
        format!("Total valid servers found: {total}"),
        opts.greppable,
        opts.accessible
    );

    Ok(())
}

/// Prints a short banner with the settings of this run.
fn print_opening(opts: &Opts) {
    debug!("Printing opening");
    let details = format!(
        "targets: {} | servers: {} | batch size: {} | timeout: {}ms | ports: {}-{}",
        opts.targets_file.display(),
        opts.servers_file.display(),
        opts.batch_size,
        opts.timeout,
        PORT_WINDOW.0,
        PORT_WINDOW.1
    );
    detail!(details, opts.greppable, opts.accessible);
}
