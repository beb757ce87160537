use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(
    name = "repo-standard",
    version,
    about = "Enforce organization governance policy on GitHub repositories"
)]
pub struct Cli {
    #[arg(long, help = "GitHub organization to enforce (overrides GITHUB_ORG)")]
    pub org: Option<String>,

    #[arg(long, help = "Policy document path (overrides POLICY_FILE)")]
    pub policy: Option<PathBuf>,

    #[arg(short, long, help = "Slack webhook URL (overrides SLACK_URL)")]
    pub webhook: Option<String>,

    #[arg(short, long, default_value_t = false, help = "Do not print individual findings")]
    pub silent: bool,

    #[arg(
        long = "check",
        value_name = "NAME",
        help = "Enable a bundled custom check (repeatable)"
    )]
    pub checks: Vec<String>,

    #[arg(long, help = "Maximum repositories evaluated at once")]
    pub concurrency: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from([
            "repo-standard",
            "--org",
            "acme",
            "--check",
            "jenkinsfile",
            "--check",
            "other",
            "-s",
            "--concurrency",
            "4",
        ])
        .unwrap();

        assert_eq!(cli.org.as_deref(), Some("acme"));
        assert_eq!(cli.checks, vec!["jenkinsfile".to_string(), "other".to_string()]);
        assert!(cli.silent);
        assert_eq!(cli.concurrency, Some(4));
        assert!(cli.policy.is_none());
    }

    #[test]
    fn test_rejects_bad_concurrency() {
        assert!(Cli::try_parse_from(["repo-standard", "--concurrency", "many"]).is_err());
    }
}
