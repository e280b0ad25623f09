use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

mod config;
mod error;
mod filecache;
mod handler;
mod http;
mod isolation;
mod logger;
mod periodic;
mod routing;
mod server;
mod stats;

use crate::config::{AppState, Cli, Config};
use crate::error::BootstrapError;
use crate::isolation::PlatformIsolation;
use crate::stats::StatsReporter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logger::log_fatal(&e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), BootstrapError> {
    let cfg = match Config::load(cli) {
        Ok(cfg) => cfg,
        Err(e) => {
            // no configured level yet, report with the defaults
            logger::init("info");
            return Err(e.into());
        }
    };
    logger::init(&cfg.logging.level);

    let root = resolve_root(Path::new(&cfg.server.root))?;
    let root = isolation::apply(
        &PlatformIsolation,
        root,
        cfg.server.chroot,
        cfg.server.run_as(),
    )?;

    // Create the Tokio runtime, sized by the workers setting
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build().map_err(BootstrapError::Runtime)?;

    runtime.block_on(async_main(cfg, root))
}

async fn async_main(cfg: Config, root: PathBuf) -> Result<(), BootstrapError> {
    let addr = cfg.socket_addr()?;
    let dump_interval = stats::reporter_interval(&cfg.stats.dump_interval);

    let state = Arc::new(AppState::new(cfg, &root));
    let sweeper = state.cache.start();
    let reporter = dump_interval.map(|interval| StatsReporter::start(Arc::clone(&state.cache), interval));

    let listener = match server::create_listener(addr) {
        Ok(listener) => listener,
        Err(source) => {
            stop_background(sweeper, reporter).await;
            return Err(BootstrapError::Bind { addr, source });
        }
    };

    logger::log_server_start(&addr, &root, &state.config);
    server::serve(listener, state, server::shutdown_signal()).await;

    stop_background(sweeper, reporter).await;
    Ok(())
}

async fn stop_background(sweeper: Option<periodic::PeriodicTask>, reporter: Option<StatsReporter>) {
    if let Some(reporter) = reporter {
        reporter.stop().await;
    }
    if let Some(sweeper) = sweeper {
        sweeper.stop().await;
    }
}

/// Make the serving root absolute and check that it is a directory
fn resolve_root(path: &Path) -> Result<PathBuf, BootstrapError> {
    let root = path
        .canonicalize()
        .map_err(|source| BootstrapError::ResolveRoot {
            path: path.to_path_buf(),
            source,
        })?;

    if !root.is_dir() {
        return Err(BootstrapError::NotADirectory(root));
    }
    Ok(root)
}
