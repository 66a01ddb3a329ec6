use clap::Parser;

#[derive(Parser, Debug)]
#[command(about, long_about = None, version)]
pub(crate) struct Args {
    /// Path to the config file (default: ~/.wattline/wattline.toml).
    #[arg(short, long)]
    pub(crate) config: Option<String>,
}
