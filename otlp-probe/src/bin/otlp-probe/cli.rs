use std::path::PathBuf;

use clap::Parser;

use otlp_probe::build::CLAP_LONG_VERSION;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[clap(long_version = CLAP_LONG_VERSION)]
pub enum Args {
    /// Emit the sample metric set once and exit.
    #[command(name = "emit")]
    Emit(EmitOptions),
}

#[derive(Parser, Debug)]
pub struct EmitOptions {
    /// Path to a JSON config file. When neither this nor --config-content is
    /// given, configuration is assembled from CX_ENDPOINT and CX_TOKEN.
    #[arg(short, long)]
    pub config_file: Option<PathBuf>,

    /// Inline JSON config.
    #[arg(long)]
    pub config_content: Option<String>,
}
