use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "confab-server", about = "Confab chat server")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/confab.toml")]
    pub config: String,
}
