mod cli;
mod launch;
mod logging;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use vardr_engine::domain::types::{parse_flag, MergerConfig, MergerEnv};
use vardr_engine::{KeyStoreWriter, ReconcileOutcome};

use cli::{Cli, TrustFormat};
use launch::{LaunchContext, LaunchPlan};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let json = cli.json_logs
        || std::env::var(MergerEnv::JSON_LOGS).is_ok_and(|v| parse_flag(&v));
    logging::init(json);

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    info!("Starting certificate import process...");
    let config = build_config(cli);
    let keystore = KeyStoreWriter::new(config.keystore_password.clone());

    let outcome: ReconcileOutcome = match cli.framework.trust_format() {
        TrustFormat::KeyStore => vardr_engine::reconcile_keystore(config)?,
        TrustFormat::PemBundle => vardr_engine::reconcile_pem_bundle(config)?,
    };

    if cli.no_exec {
        return Ok(ExitCode::SUCCESS);
    }

    info!("Starting {} application...", cli.framework);
    let plan = launch_plan(cli, &outcome, &keystore)?;
    Ok(launch::handoff(&plan)?)
}

/// Environment first, then command-line overrides, then the profile's base
/// trust when nothing else picked one.
fn build_config(cli: &Cli) -> MergerConfig {
    let mut config = MergerConfig::from_env();
    if let Some(dir) = &cli.certs_dir {
        config.candidates_dir = dir.clone();
    }
    if let Some(dir) = &cli.state_dir {
        config.state_dir = dir.clone();
    }
    if cli.scan_nested {
        config.nested_dir = Some(vardr_engine::MergerDefaults::NESTED_DIR.to_string());
    }
    if cli.no_base_trust {
        config.base_trust = None;
    } else if let Some(base) = &cli.base_trust {
        config.base_trust = Some(base.clone());
    } else if config.base_trust.is_none() {
        config.base_trust = launch::default_base_trust(cli.framework, env_var);
    }
    config
}

fn launch_plan(
    cli: &Cli,
    outcome: &ReconcileOutcome,
    keystore: &KeyStoreWriter,
) -> Result<LaunchPlan> {
    let ctx = LaunchContext {
        trust_path: &outcome.trust_material_path,
        keystore: (cli.framework.trust_format() == TrustFormat::KeyStore).then_some(keystore),
        app_dir: &cli.app_dir,
        extra_args: &cli.extra_args,
        env: env_var,
    };
    Ok(launch::plan(cli.framework, &ctx)?)
}

/// Environment lookup that treats empty values as unset.
fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
