use anyhow::{bail, Context, Result};
use relayer_core::report::{SubmissionPlan, VaaReport};
use relayer_core::{decode_vaa, Meta, RelayerConfig};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: vaa-relayer <config.toml> <vaa-hex>";

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        bail!(USAGE);
    }

    let config = RelayerConfig::load_from_file(&args[1])
        .with_context(|| format!("loading config from {}", args[1]))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let raw = hex::decode(args[2].trim_start_matches("0x")).context("VAA is not valid hex")?;
    let vaa = decode_vaa(&raw)?;
    tracing::info!(
        meta = vaa.meta.name(),
        emitter_chain = vaa.emitter_chain,
        sequence = vaa.sequence,
        "Decoded VAA"
    );

    let app_id = match vaa.meta {
        Meta::CoreGovernance(_) => config.core_app_id,
        _ => config.token_bridge_app_id,
    };
    let plan = SubmissionPlan::new(&vaa, &config, app_id);
    if !plan.settles {
        tracing::warn!("Payload is not relayable; submission would be refused");
    }

    let output = serde_json::json!({
        "vaa": VaaReport::from(&vaa),
        "plan": plan,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
