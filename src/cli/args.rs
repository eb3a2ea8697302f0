//! CLI argument parsing using clap.

use clap::{
    Parser,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Mirror configuration trees with live environment substitution.
///
/// Each source tree is shadowed under DESTINATION; reading a mirrored file
/// renders it through the current process environment at that moment. When
/// substituted content changes, the configured consumer process receives a
/// reload signal.
#[derive(Parser, Debug)]
#[command(
    name = "envmirror",
    version,
    styles = clap_cargo_style(),
    after_help = "Examples:\n  \
        envmirror /etc/mirror /opt/templates\n  \
        envmirror /etc/mirror /opt/app.conf -p nginx -s HUP -v 2"
)]
pub struct Cli {
    /// Destination directory that receives the live mirror
    pub destination: PathBuf,

    /// Files or directories to mirror
    #[arg(required = true)]
    pub sources: Vec<PathBuf>,

    /// Consumer process name to signal when content changes
    #[arg(short, long, value_name = "NAME")]
    pub process: Option<String>,

    /// Signal to deliver, as a name or number (default: HUP)
    #[arg(short, long, value_name = "SIGSPEC", default_value = "HUP")]
    pub signal: String,

    /// Verbosity: 1 info, 2 debug, 3 trace (default without flag: warn)
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        num_args = 0..=1,
        default_missing_value = "1"
    )]
    pub verbose: Option<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_invocation() {
        let cli = Cli::try_parse_from(["envmirror", "/etc/mirror", "/opt/app"]).unwrap();
        assert_eq!(cli.destination, PathBuf::from("/etc/mirror"));
        assert_eq!(cli.sources, vec![PathBuf::from("/opt/app")]);
        assert_eq!(cli.process, None);
        assert_eq!(cli.signal, "HUP");
        assert_eq!(cli.verbose, None);
    }

    #[test]
    fn parses_full_invocation() {
        let cli = Cli::try_parse_from([
            "envmirror",
            "/etc/mirror",
            "/opt/a",
            "/opt/b.conf",
            "--process",
            "nginx",
            "--signal",
            "USR1",
            "--verbose",
            "2",
        ])
        .unwrap();
        assert_eq!(cli.sources.len(), 2);
        assert_eq!(cli.process.as_deref(), Some("nginx"));
        assert_eq!(cli.signal, "USR1");
        assert_eq!(cli.verbose, Some(2));
    }

    #[test]
    fn bare_verbose_flag_defaults_to_info() {
        let cli = Cli::try_parse_from(["envmirror", "/etc/mirror", "/opt/app", "-v"]).unwrap();
        assert_eq!(cli.verbose, Some(1));
    }

    #[test]
    fn missing_sources_is_a_usage_error() {
        assert!(Cli::try_parse_from(["envmirror", "/etc/mirror"]).is_err());
    }
}
