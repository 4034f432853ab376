use clap::{Parser, Subcommand, Args};

#[derive(Parser)]
#[command(name = "cicd-guardian", version, about = "CI/CD pipeline policy enforcement agent")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server
    Serve(ServeArgs),
    /// Analyze a single pipeline report file
    Analyze(AnalyzeArgs),
    /// Print aggregate metrics from the incident log
    Metrics(MetricsArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

#[derive(Args, Clone)]
pub struct ServeArgs {
    /// Listen port
    #[arg(long, default_value = "8000")]
    pub port: u16,

    /// Listen address
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// YAML policy configuration
    #[arg(short, long)]
    pub config: Option<String>,
}

#[derive(Args, Clone)]
pub struct AnalyzeArgs {
    /// Pipeline report as JSON
    pub report: String,

    /// YAML policy configuration
    #[arg(short, long)]
    pub config: Option<String>,
}

#[derive(Args, Clone)]
pub struct MetricsArgs {
    /// YAML policy configuration
    #[arg(short, long)]
    pub config: Option<String>,
}

#[derive(Args, Clone)]
pub struct ValidateArgs {
    /// Config file to validate
    pub config: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_defaults() {
        let cli = Cli::try_parse_from(["cicd-guardian", "serve"]).unwrap();
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.port, 8000);
                assert_eq!(args.host, "0.0.0.0");
                assert!(args.config.is_none());
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_parse_analyze_with_config_and_verbosity() {
        let cli = Cli::try_parse_from([
            "cicd-guardian", "-vv", "analyze", "report.json", "--config", "rules.yaml",
        ]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Analyze(args) => {
                assert_eq!(args.report, "report.json");
                assert_eq!(args.config.as_deref(), Some("rules.yaml"));
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_validate_requires_path() {
        assert!(Cli::try_parse_from(["cicd-guardian", "validate"]).is_err());
    }
}
