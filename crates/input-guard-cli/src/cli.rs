use clap::Parser;
use input_guard::RemoveSpecials;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "input-guard",
    version,
    about = "Score and clean untrusted text, one JSON result per input line"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "input-guard.yaml")]
    pub config: PathBuf,

    /// Evaluate this text instead of reading lines from stdin
    #[arg(short, long)]
    pub text: Option<String>,

    /// Special-character policy (overrides config file setting)
    #[arg(long, value_parser = parse_remove_specials)]
    pub remove_specials: Option<RemoveSpecials>,

    /// HTML-escape the cleaned text (overrides config file setting)
    #[arg(long)]
    pub escape_html: bool,

    /// Audit log path (overrides config file setting)
    #[arg(long)]
    pub audit_log: Option<PathBuf>,
}

fn parse_remove_specials(s: &str) -> Result<RemoveSpecials, String> {
    s.parse().map_err(|e: input_guard::ConfigError| e.to_string())
}
