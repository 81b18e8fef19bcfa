use clap::Parser;
use log::error;
use mqe::{AddressSpec, Cli, ExecErr, FileConf, SystemLookup, UdpQueryConnector};
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .init();

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::from(err.exit_code())
        }
    }
}

async fn run(cli: &Cli) -> Result<(), ExecErr> {
    let spec = AddressSpec::parse(&cli.address)?;
    let file_conf = match &cli.config {
        Some(path) => Some(FileConf::load(path)?),
        None => None,
    };

    mqe::execute(
        &SystemLookup,
        &UdpQueryConnector,
        &spec,
        &cli.timeout_option(file_conf.as_ref()),
        &mut std::io::stdout(),
    )
    .await
}
