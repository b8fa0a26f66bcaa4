//! Main entry point for CLI command to start server.

use std::io::IsTerminal;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use anyhow::anyhow;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::axum_factory::PhonebookServer;
use crate::configuration::Configuration;
use crate::configuration::generate_config_schema;
use crate::schema::sdl;

/// Options for the phonebook
#[derive(Parser, Debug)]
#[command(
    name = "phonebook",
    about = "GraphQL directory of contacts",
    disable_version_flag = true
)]
pub(crate) struct Opt {
    /// Log level (off|error|warn|info|debug|trace).
    #[arg(
        long = "log",
        default_value = "info",
        alias = "log-level",
        env = "PHONEBOOK_LOG"
    )]
    log_level: String,

    /// Configuration location relative to the working directory.
    #[arg(short, long = "config", env = "PHONEBOOK_CONFIG_PATH")]
    config_path: Option<PathBuf>,

    /// Address to listen on, overriding `server.listen`.
    #[arg(long, env = "PHONEBOOK_LISTEN")]
    listen: Option<SocketAddr>,

    /// Prints the configuration schema.
    #[arg(long)]
    schema: bool,

    /// Prints the GraphQL schema.
    #[arg(long)]
    sdl: bool,

    /// Display version and exit.
    #[arg(long, short = 'V')]
    version: bool,
}

/// This is the main phonebook entrypoint.
pub fn main() -> Result<()> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(nb) = std::env::var("PHONEBOOK_NUM_CORES")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
    {
        builder.worker_threads(nb);
    }
    let runtime = builder.build()?;
    runtime.block_on(Executable::builder().start())
}

/// Entry point into creating a phonebook executable.
pub struct Executable {}

#[buildstructor::buildstructor]
impl Executable {
    /// Build an executable that will parse commandline options and set up logging.
    /// You may optionally supply a `config` to use instead of the `--config` file.
    ///
    /// Note that if you do not specify a runtime you must be in the context of an existing tokio runtime.
    #[builder(entry = "builder", exit = "start")]
    pub async fn start(config: Option<Configuration>) -> Result<()> {
        let opt = Opt::parse();

        if opt.version {
            println!("{}", std::env!("CARGO_PKG_VERSION"));
            return Ok(());
        }

        if opt.schema {
            let schema = generate_config_schema();
            println!("{}", serde_json::to_string_pretty(&schema)?);
            return Ok(());
        }

        if opt.sdl {
            println!("{}", sdl());
            return Ok(());
        }

        init_subscriber(&opt.log_level)?;
        setup_panic_handler();

        let mut configuration = match (config, &opt.config_path) {
            (Some(configuration), _) => configuration,
            (None, Some(path)) => Configuration::from_file(path)
                .with_context(|| format!("could not load configuration from {}", path.display()))?,
            (None, None) => Configuration::default(),
        };
        if let Some(listen) = opt.listen {
            configuration.set_listen(listen);
        }

        tracing::info!("Phonebook v{}", std::env!("CARGO_PKG_VERSION"));
        let served = match PhonebookServer::bind(&configuration).await {
            Ok(server) => server.serve(shutdown_signal()).await,
            Err(err) => Err(err),
        };
        if let Err(err) = served {
            tracing::error!("{}", err);
            return Err(err.into());
        }
        Ok(())
    }
}

fn init_subscriber(log_level: &str) -> Result<()> {
    let builder = tracing_subscriber::fmt::fmt().with_env_filter(
        EnvFilter::try_new(log_level).context("could not parse log configuration")?,
    );

    if std::io::stdout().is_terminal() {
        builder.try_init()
    } else {
        builder.json().try_init()
    }
    .map_err(|err| anyhow!("could not install the log subscriber: {err}"))
}

fn setup_panic_handler() {
    // Redirect panics to the logs.
    std::panic::set_hook(Box::new(|info| tracing::error!("{}", info)));
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("cannot listen for ctrl-c, the server will not shut down gracefully: {err}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Opt::command().debug_assert();
    }

    #[test]
    fn parses_options() {
        let opt = Opt::try_parse_from([
            "phonebook",
            "--log",
            "debug",
            "-c",
            "phonebook.yaml",
            "--listen",
            "0.0.0.0:4001",
        ])
        .unwrap();

        assert_eq!(opt.log_level, "debug");
        assert_eq!(opt.config_path, Some(PathBuf::from("phonebook.yaml")));
        assert_eq!(opt.listen, Some(SocketAddr::from(([0, 0, 0, 0], 4001))));
        assert!(!opt.schema);
        assert!(!opt.sdl);
    }

    #[test]
    fn rejects_bad_listen_addresses() {
        assert!(Opt::try_parse_from(["phonebook", "--listen", "localhost"]).is_err());
    }
}
