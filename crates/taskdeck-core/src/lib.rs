pub mod cli;
pub mod commands;
pub mod config;
pub mod filter;
pub mod remote;
pub mod render;
pub mod storage;
pub mod store;
pub mod task;

use std::ffi::OsString;

use chrono::Utc;
use clap::Parser;
use tracing::{debug, info};

#[tracing::instrument(skip_all)]
pub fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let pre = cli::preprocess_args(&raw_args)?;
    let cli = cli::GlobalCli::parse_from(pre.cleaned_args);

    cli::init_tracing(cli.verbose, cli.quiet)?;

    info!(verbose = cli.verbose, quiet = cli.quiet, "starting taskdeck CLI");
    debug!(?pre.rc_overrides, "preprocessed rc overrides");

    let mut cfg = config::Config::load(cli.taskrc.as_deref())?;
    cfg.apply_overrides(
        pre.rc_overrides.into_iter().chain(
            cli.rc_overrides
                .into_iter()
                .map(|kv| (kv.key, kv.value)),
        ),
    );

    let data_dir = config::resolve_data_dir(&cfg, cli.data.as_deref());
    let kv = storage::KvStore::open(&data_dir);
    let mut store = store::TaskStore::open(kv);

    if store.seed_if_empty(Utc::now()) {
        debug!("seeded welcome task into empty store");
    }

    let mut renderer = render::Renderer::new(&cfg)?;
    let inv = cli::Invocation::parse(&cfg, cli.rest)?;

    commands::dispatch(&mut store, &cfg, &mut renderer, inv)?;

    info!("done");
    Ok(())
}
