//! Chartsmith CLI - turn Kubernetes manifests into a parameterized Helm chart

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

use chartsmith_core::Config;
use chartsmith_transform::App;

mod decoder;
mod writer;

#[derive(Parser)]
#[command(name = "chartsmith")]
#[command(version)]
#[command(about = "Create a Helm chart from Kubernetes manifests", long_about = None)]
struct Cli {
    /// Chart name; also the name of the output directory
    #[arg(default_value = "chart")]
    chart_name: String,

    /// Manifest file or directory to read. Repeatable. Reads stdin when omitted
    #[arg(short = 'f', long = "files")]
    files: Vec<PathBuf>,

    /// Recurse into subdirectories of directories given with -f
    #[arg(short = 'r', long = "recursive")]
    recursive: bool,

    /// Directory the chart directory is created in
    #[arg(short = 'd', long = "destination", default_value = ".")]
    destination: PathBuf,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,

    /// Place CustomResourceDefinition templates under crds/
    #[arg(long = "crd-dir")]
    crd_dir: bool,

    /// Let pod image pull secrets be overridden from values
    #[arg(long = "image-pull-secrets")]
    image_pull_secrets: bool,

    /// Keep resource namespaces in the generated templates
    #[arg(long = "preserve-ns")]
    preserve_ns: bool,

    /// Guard webhook resources with a webhook.enabled value
    #[arg(long = "add-webhook-option")]
    add_webhook_option: bool,

    /// Declare cert-manager as a chart dependency
    #[arg(long = "cert-manager-as-subchart")]
    cert_manager_as_subchart: bool,

    /// Version of the cert-manager dependency
    #[arg(long = "cert-manager-version", default_value = "v1.12.2")]
    cert_manager_version: String,

    /// Install CRDs with the cert-manager dependency
    #[arg(long = "cert-manager-install-crd", default_value_t = true)]
    cert_manager_install_crd: bool,
}

impl Cli {
    fn config(&self) -> Config {
        let mut conf = Config::new(&self.chart_name);
        conf.preserve_ns = self.preserve_ns;
        conf.image_pull_secrets = self.image_pull_secrets;
        conf.add_webhook_option = self.add_webhook_option;
        conf.crd_dir = self.crd_dir;
        conf.cert_manager_as_subchart = self.cert_manager_as_subchart;
        conf.cert_manager_version = self.cert_manager_version.clone();
        conf.cert_manager_install_crd = self.cert_manager_install_crd;
        conf
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("received termination, signaling shutdown");
            flag.store(true, Ordering::Relaxed);
        }
    });

    // The pipeline itself is synchronous; only signal handling is async.
    tokio::task::spawn_blocking(move || run(cli, &cancel))
        .await
        .into_diagnostic()?
}

fn run(cli: Cli, cancel: &AtomicBool) -> Result<()> {
    let objects = decoder::load(&cli.files, cli.recursive)?;
    let mut app = App::new(cli.config()).into_diagnostic()?;
    let chart = app.render(&objects, cancel).into_diagnostic()?;
    writer::write(&chart, app.meta().config(), &cli.destination)
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "error",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
