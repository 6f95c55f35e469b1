use clap::Parser;
use scripts::{
    artifacts::{ArtifactStore, DeploymentArtifacts},
    cli::Cli,
    commands::run,
    errors::ScriptError,
    shielded::RpcEncryptor,
    verify::ExplorerVerifier,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), ScriptError> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().pretty().init();

    let config = cli.deploy_config();
    let client = scripts::client::setup_client(&cli.priv_key, &config.rpc_endpoint)?;
    let encryptor = RpcEncryptor::new(&config.encryption_endpoint, &config.encryption_method)?;

    let store = ArtifactStore::new(&config.artifacts_dir);
    let artifacts = DeploymentArtifacts::load(&store)?;
    let verifier = ExplorerVerifier::new(&config.explorer, store)?;

    let report = run(&config, &client, &encryptor, &verifier, &artifacts).await?;

    for failure in report.failures() {
        warn!("{} at {} was not verified", failure.kind, failure.address);
    }
    info!("Deployment complete");

    Ok(())
}
