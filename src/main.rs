#![warn(
    noop_method_call,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_lifetimes,
    unused_qualifications,
    clippy::pedantic
)]
#![allow(
    clippy::match_bool,
    clippy::single_component_path_imports, // https://github.com/rust-lang/rust-clippy/issues/7923
    clippy::items_after_statements,
    clippy::module_name_repetitions,
)]

use ::{
    anyhow::Context as _,
    crossbeam::channel,
    notify::Watcher,
    std::{
        env,
        path::PathBuf,
        sync::Arc,
        time::{Duration, Instant},
    },
};

mod config;
mod css;
mod js;
mod raw;
mod targets;

mod util;
use self::{
    config::Config,
    targets::{Target, Targets},
    util::{log_errors, minify},
};

/// Minifies CodeMirror's JavaScript and CSS for redistribution.
#[derive(clap::Parser)]
struct Args {
    /// Which target to build.
    #[clap(value_enum, default_value_t = Target::Default)]
    target: Target,

    /// Root of the unminified sources.
    #[clap(long, default_value = "codemirror")]
    source: PathBuf,

    /// Where to write the minified tree.
    #[clap(long, default_value = "codemirror_minified")]
    out: PathBuf,

    /// Directory containing the `package.json` for the minifiers.
    #[clap(long, default_value = "tools")]
    tools_dir: PathBuf,

    /// Don't run `npm install` before building.
    #[clap(long)]
    skip_install: bool,

    /// Whether to watch the sources for changes.
    #[clap(long)]
    watch: bool,
}

fn main() -> anyhow::Result<()> {
    init_logger();

    let args: Args = clap::Parser::parse();
    let config = Config::new(args)?;

    if config.install {
        minify::init(&config.tools_dir)?;
    }

    let targets = Targets::new(
        Arc::new(minify::ClosureCompiler::new(&config.tools_dir)),
        Arc::new(minify::CleanCss::new(&config.tools_dir)),
    )?;

    let build = || -> anyhow::Result<()> {
        let emitted = targets.run(config.target, &config.source, &config.out)?;
        log::info!(
            "successfully emitted {} files to {}",
            emitted.len(),
            config.out.display()
        );
        Ok(())
    };

    if !config.watch {
        return build();
    }

    log_errors(build());

    let (sender, receiver) = channel::bounded(1);

    let mut watcher = notify::recommended_watcher(move |event_res| {
        let event: notify::Event = match event_res {
            Ok(event) => event,
            Err(e) => {
                log::error!("error watching: {}", e);
                return;
            }
        };
        if !matches!(event.kind, notify::event::EventKind::Access(_)) {
            let _ = sender.try_send(());
        }
    })
    .context("failed to create file watcher")?;

    watcher
        .watch(&config.source, notify::RecursiveMode::Recursive)
        .with_context(|| format!("failed to watch `{}`", config.source.display()))?;

    log::info!("now watching {} for changes", config.source.display());

    loop {
        let _ = receiver.recv();
        // debounce
        let debounce_deadline = Instant::now() + Duration::from_millis(10);
        while receiver.recv_deadline(debounce_deadline).is_ok() {}

        log::info!("rebuilding");
        log_errors(build());
    }
}

/// Log at `info` unless `RUST_LOG` says otherwise, so that progress is always visible.
fn init_logger() {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(log::LevelFilter::Info);
    if let Ok(filters) = env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}
