use std::sync::Arc;

use clap::error::ErrorKind as ClapErrorKind;
use clap::{CommandFactory, Parser};
use tokio::task::JoinSet;

use envmirror::cli::Cli;
use envmirror::{
    CleanupRegistry, EnvRenderer, SignalNotifier, TreeMirror, WatchDispatcher, log_event,
    parse_signal,
};

const EXIT_FATAL: i32 = 1;
const EXIT_USAGE: i32 = 64;

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => 0,
                _ => EXIT_USAGE,
            };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    envmirror::logging::init(cli.verbose);

    let Some(signal) = parse_signal(&cli.signal) else {
        eprintln!("error: unknown signal '{}'", cli.signal);
        print_usage();
        std::process::exit(EXIT_USAGE);
    };

    std::process::exit(run(cli, signal).await);
}

fn print_usage() {
    eprintln!("{}", Cli::command().render_usage());
}

async fn run(cli: Cli, signal: sysinfo::Signal) -> i32 {
    // Destination validity is checked before any resource is touched.
    let destination = match cli.destination.canonicalize() {
        Ok(path) if path.is_dir() => path,
        _ => {
            eprintln!(
                "error: destination is not an existing directory: {}",
                cli.destination.display()
            );
            print_usage();
            return EXIT_FATAL;
        }
    };

    let mut sources = Vec::new();
    for source in &cli.sources {
        match source.canonicalize() {
            Ok(path) => sources.push(path),
            Err(e) => {
                eprintln!("error: cannot access source {}: {e}", source.display());
                print_usage();
                return EXIT_USAGE;
            }
        }
    }

    let registry = Arc::new(CleanupRegistry::new());
    let renderer = Arc::new(EnvRenderer::new());
    let notifier = Arc::new(SignalNotifier::new(cli.process.clone(), signal));

    // Each root mirrors independently and gets its own dispatch loop.
    let mut dispatchers = JoinSet::new();
    for source in sources {
        let outcome = TreeMirror::new(&destination, &source, registry.clone(), renderer.clone())
            .and_then(|mirror| {
                mirror.mirror()?;
                Ok(mirror)
            });
        let mirror = match outcome {
            Ok(mirror) => mirror,
            Err(e) => {
                eprintln!("error: {e}");
                dispatchers.shutdown().await;
                registry.run_all();
                return EXIT_FATAL;
            }
        };
        match WatchDispatcher::watch_root(mirror, notifier.clone()) {
            Ok(dispatcher) => {
                dispatchers.spawn(dispatcher.run());
            }
            Err(e) => {
                eprintln!("error: {e}");
                dispatchers.shutdown().await;
                registry.run_all();
                return EXIT_FATAL;
            }
        }
    }

    let exit = tokio::select! {
        _ = shutdown_signal() => {
            log_event!("main", "termination requested");
            0
        }
        Some(finished) = dispatchers.join_next() => {
            match finished {
                Ok(Err(e)) => eprintln!("error: {e}"),
                Ok(Ok(())) => eprintln!("error: watch loop ended unexpectedly"),
                Err(e) => eprintln!("error: watch task failed: {e}"),
            }
            EXIT_FATAL
        }
    };

    // Stop dispatching before the drain so nothing registers into a
    // registry that has already been taken.
    dispatchers.shutdown().await;
    registry.run_all();
    exit
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = term.recv() => {}
    }
}
