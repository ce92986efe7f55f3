//! `mimedecode` - decode a raw email message into its MIME tree.
//!
//! Reads a message from a file or stdin and prints the decoded structure as
//! JSON, or a short summary of headers and parts.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod config;
mod render;

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use mimedecode::{MailDecoder, MimeDecoder};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::{Config, OutputFormat};

#[derive(Parser, Debug)]
#[command(name = "mimedecode", version, about = "Decode a MIME email message")]
struct Cli {
    /// Message file to read; stdin when omitted or "-".
    input: Option<PathBuf>,

    #[arg(long, short, help = "Configuration file (JSON)")]
    config: Option<PathBuf>,

    #[arg(long, short, value_enum, help = "Output format")]
    format: Option<OutputFormat>,

    #[arg(long, help = "Apply transfer decoding to bodies")]
    decode_bodies: Option<bool>,

    #[arg(long, help = "Keep leaf bodies in the output")]
    include_bodies: Option<bool>,

    #[arg(long, help = "Decode RFC 2047 encoded-words in headers")]
    decode_headers: Option<bool>,

    #[arg(long, help = "Keep the raw body of message/rfc822 parts")]
    rfc822_bodies: Option<bool>,

    #[arg(long, short, help = "List uuencoded files found in the body")]
    uuencoded: bool,

    #[arg(long, help = "Write the effective configuration to the config path and exit")]
    write_config: bool,

    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    #[arg(
        long,
        short,
        help = "Quiet mode, only warnings and errors will be logged"
    )]
    quiet: bool,
}

impl Cli {
    /// Overrides configuration values with the flags that were given.
    fn apply(&self, mut config: Config) -> Config {
        let options = &mut config.options;
        let overrides: [(&mut bool, Option<bool>); 4] = [
            (&mut options.decode_bodies, self.decode_bodies),
            (&mut options.include_bodies, self.include_bodies),
            (&mut options.decode_headers, self.decode_headers),
            (&mut options.rfc822_bodies, self.rfc822_bodies),
        ];
        for (field, value) in overrides {
            if let Some(value) = value {
                *field = value;
            }
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        config
    }

    fn log_filter(&self) -> &'static str {
        if self.quiet {
            "warn"
        } else if self.verbose > 0 {
            "mimedecode=debug"
        } else {
            "mimedecode=info"
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = cli.apply(Config::load(cli.config.as_deref())?);

    if cli.write_config {
        let path = cli.config.clone().unwrap_or_else(config::default_path);
        return config.save(&path);
    }

    let raw = read_input(cli.input.as_deref())?;
    info!(bytes = raw.len(), "Decoding message");

    let mut decoder = MimeDecoder::with_options(config.options);
    decoder
        .parse_bytes(&raw)
        .context("failed to decode message")?;

    let output = if cli.uuencoded {
        render::uuencoded(&decoder.uuencoded_files()?)
    } else {
        match config.format {
            OutputFormat::Json => {
                let mut json = serde_json::to_string_pretty(&decoder.structure())?;
                json.push('\n');
                json
            }
            OutputFormat::Summary => render::summary(&decoder)?,
        }
    };
    print!("{output}");
    Ok(())
}

fn read_input(path: Option<&Path>) -> anyhow::Result<Vec<u8>> {
    match path {
        Some(path) if path != Path::new("-") => {
            std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
        }
        _ => {
            let mut raw = Vec::new();
            std::io::stdin()
                .read_to_end(&mut raw)
                .context("failed to read stdin")?;
            Ok(raw)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mimedecode::DecodeOptions;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "mimedecode",
            "--decode-headers",
            "false",
            "--rfc822-bodies",
            "true",
            "--format",
            "summary",
        ]);
        let config = cli.apply(Config::default());
        assert!(!config.options.decode_headers);
        assert!(config.options.rfc822_bodies);
        assert!(config.options.decode_bodies);
        assert_eq!(config.format, OutputFormat::Summary);
    }

    #[test]
    fn test_absent_flags_keep_config() {
        let cli = Cli::parse_from(["mimedecode", "message.eml"]);
        let file_config = Config {
            options: DecodeOptions::new().with_include_bodies(false),
            format: OutputFormat::Summary,
        };
        let config = cli.apply(file_config.clone());
        assert_eq!(config, file_config);
        assert_eq!(cli.input.as_deref(), Some(Path::new("message.eml")));
    }

    #[test]
    fn test_log_filter() {
        assert_eq!(
            Cli::parse_from(["mimedecode", "-q"]).log_filter(),
            "warn"
        );
        assert_eq!(
            Cli::parse_from(["mimedecode", "-vv"]).log_filter(),
            "mimedecode=debug"
        );
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
