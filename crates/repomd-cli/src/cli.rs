use clap::{ArgAction, Args as ClapArgs, Parser, Subcommand, ValueHint};

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    help_template = "{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}",
    arg_required_else_help = true
)]
pub struct Args {
    /// Set output verbosity
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress outputs
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output as json
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Provide custom config file
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<String>,

    /// Set proxy
    #[arg(required = false, long, short = 'P', global = true)]
    pub proxy: Option<String>,

    /// Set request headers (`Key: Value`)
    #[arg(required = false, long, short = 'H', global = true)]
    pub header: Option<Vec<String>>,

    /// Set user agent
    #[arg(required = false, long, short = 'A', global = true)]
    pub user_agent: Option<String>,

    #[clap(subcommand)]
    pub command: Commands,
}

/// Which repository to read: a configured one, an ad-hoc mirror, or every
/// enabled repository when neither is given.
#[derive(ClapArgs, Clone, Debug, Default)]
pub struct RepoSelection {
    /// Name of a configured repository
    #[arg(short, long, conflicts_with = "mirror")]
    pub repo: Option<String>,

    /// Mirror base URL, overriding the configured repositories
    #[arg(short, long, requires = "path", value_hint = ValueHint::Url)]
    pub mirror: Option<String>,

    /// Repository path under the mirror (the directory holding `repodata/`)
    #[arg(short, long, requires = "mirror")]
    pub path: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the sub-databases of a repository
    #[clap(name = "dbs", visible_alias = "databases")]
    Dbs {
        #[command(flatten)]
        selection: RepoSelection,
    },

    /// List the packages of a repository
    #[clap(name = "packages", visible_alias = "ls")]
    Packages {
        #[command(flatten)]
        selection: RepoSelection,

        /// Only decode sub-databases of this type (repeatable)
        #[arg(short, long = "type")]
        types: Vec<String>,

        /// Skip package entries that fail to decode
        #[arg(long)]
        skip_invalid: bool,

        /// Maximum number of packages to print per sub-database
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Print the effective configuration
    Config,

    /// Generate default config
    #[clap(name = "defconfig")]
    DefConfig,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_command_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_packages() {
        let args = Args::try_parse_from([
            "repomd",
            "-vv",
            "packages",
            "--mirror",
            "https://mirror.example.com/centos",
            "--path",
            "8-stream/BaseOS/x86_64/os",
            "-t",
            "primary",
            "--skip-invalid",
            "--limit",
            "10",
        ])
        .unwrap();

        assert_eq!(args.verbose, 2);
        match args.command {
            Commands::Packages {
                selection,
                types,
                skip_invalid,
                limit,
            } => {
                assert_eq!(selection.path.as_deref(), Some("8-stream/BaseOS/x86_64/os"));
                assert_eq!(types, vec!["primary"]);
                assert!(skip_invalid);
                assert_eq!(limit, Some(10));
            }
            _ => panic!("expected packages command"),
        }
    }

    #[test]
    fn test_mirror_requires_path() {
        let result = Args::try_parse_from(["repomd", "dbs", "--mirror", "https://example.com"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_repo_conflicts_with_mirror() {
        let result = Args::try_parse_from([
            "repomd",
            "dbs",
            "--repo",
            "baseos",
            "--mirror",
            "https://example.com",
            "--path",
            "os",
        ]);
        assert!(result.is_err());
    }
}
