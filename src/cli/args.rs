//! Command-line argument parsing

use crate::config::AppConfig;
use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "registry-catalog-cache")]
#[command(about = "Browse a container registry through a background-synchronized metadata cache")]
#[command(version, author)]
pub struct Args {
    #[command(flatten)]
    pub registry: RegistryArgs,

    #[command(flatten)]
    pub refresh: RefreshArgs,

    /// Verbose output
    #[arg(long = "verbose", short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Quiet output
    #[arg(long = "quiet", short = 'q', global = true, help = "Only print errors and results")]
    pub quiet: bool,

    /// Print results as JSON
    #[arg(long = "json", global = true, help = "Print results as JSON")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(ClapArgs, Debug, Default)]
pub struct RegistryArgs {
    /// Registry address
    #[arg(
        long = "registry",
        short = 'r',
        global = true,
        help = "Registry address including scheme, e.g. https://registry.example.com"
    )]
    pub address: Option<String>,

    /// Registry username
    #[arg(long = "username", short = 'u', global = true, help = "Username for registry authentication")]
    pub username: Option<String>,

    /// Registry password
    #[arg(long = "password", short = 'p', global = true, help = "Password for registry authentication")]
    pub password: Option<String>,

    /// Password file
    #[arg(long = "password-file", global = true, help = "Read the registry password from this file")]
    pub password_file: Option<String>,

    /// Skip TLS verification
    #[arg(long = "skip-tls", short = 'k', global = true, help = "Skip TLS certificate verification")]
    pub skip_tls: bool,

    /// Timeout in seconds for network operations
    #[arg(long = "timeout", short = 't', global = true, help = "Timeout for each registry request in seconds")]
    pub timeout: Option<u64>,

    /// Catalog page size
    #[arg(long = "page-size", global = true, help = "Repositories requested per catalog page")]
    pub page_size: Option<usize>,
}

#[derive(ClapArgs, Debug, Default)]
pub struct RefreshArgs {
    #[arg(
        long = "catalog-interval",
        global = true,
        help = "Catalog refresh interval in minutes, 0 fetches the catalog once"
    )]
    pub catalog_interval: Option<u64>,

    #[arg(
        long = "tags-interval",
        global = true,
        help = "Background tag refresh interval in minutes, 0 fetches tags on every listing"
    )]
    pub tags_interval: Option<u64>,

    #[arg(
        long = "online-max",
        global = true,
        help = "Refresh cached repositories with at most this many tags on every listing, 0 disables"
    )]
    pub online_max: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Keep the cache synchronized and report statistics until Ctrl-C
    Watch {
        #[arg(long = "report-every", default_value = "60", help = "Seconds between statistics reports")]
        report_every: u64,
    },
    /// Fetch the catalog and all tags once, then print statistics
    Stats {
        #[arg(long = "top", default_value = "10", help = "Number of repositories in the top list")]
        top: usize,
    },
    /// List the entries below a catalog path with their tag counts
    Browse {
        /// Catalog path, empty for the root
        #[arg(default_value = "")]
        path: String,
    },
    /// List the tags of one repository
    Tags {
        repository: String,
    },
    /// Delete a tag (and every tag sharing its digest) from the registry
    Delete {
        repository: String,
        tag: String,
    },
}

impl Args {
    pub fn parse_args() -> Self {
        Args::parse()
    }

    /// Apply the flags given on the command line on top of `config`
    /// (usually [`AppConfig::from_env`]). Unset flags leave it untouched.
    pub fn apply_to(&self, mut config: AppConfig) -> AppConfig {
        let registry = &self.registry;
        if let Some(address) = &registry.address {
            config.registry.address = address.clone();
        }
        if let Some(username) = &registry.username {
            config.registry.username = Some(username.clone());
        }
        if let Some(password) = &registry.password {
            config.registry.password = Some(password.clone());
        }
        if let Some(path) = &registry.password_file {
            config.registry.password_file = Some(path.clone());
        }
        if let Some(timeout) = registry.timeout {
            config.registry.timeout = timeout;
        }
        if let Some(size) = registry.page_size {
            config.registry.catalog_page_size = size;
        }
        config.registry.skip_tls |= registry.skip_tls;

        if let Some(minutes) = self.refresh.catalog_interval {
            config.refresh.catalog_refresh_interval = minutes;
        }
        if let Some(minutes) = self.refresh.tags_interval {
            config.refresh.tags_async_refresh_interval = minutes;
        }
        if let Some(count) = self.refresh.online_max {
            config.refresh.tags_online_refresh_max_count = count;
        }

        config.verbose |= self.verbose;
        config.quiet |= self.quiet;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RefreshPolicy;

    fn env(vars: &[(&str, &str)]) -> AppConfig {
        AppConfig::from_lookup(|key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        })
    }

    #[test]
    fn test_parse_subcommand_with_global_flags() {
        let args = Args::try_parse_from([
            "registry-catalog-cache",
            "tags",
            "team/app",
            "--registry",
            "https://registry.example.com",
            "--tags-interval",
            "0",
        ])
        .unwrap();

        assert!(matches!(&args.command, Command::Tags { repository } if repository == "team/app"));
        let config = args.apply_to(AppConfig::default());
        assert_eq!(config.registry.address, "https://registry.example.com");
        assert_eq!(config.refresh.tags_async_refresh_interval, 0);
        assert_eq!(
            config.refresh.catalog_refresh_interval,
            RefreshPolicy::default().catalog_refresh_interval
        );
    }

    #[test]
    fn test_flags_override_environment() {
        let args = Args::try_parse_from(["registry-catalog-cache", "stats", "--online-max", "0"]).unwrap();
        let config = args.apply_to(env(&[
            ("REGISTRY_CACHE_ADDRESS", "https://env.example.com"),
            ("REGISTRY_CACHE_TAGS_ONLINE_MAX", "7"),
        ]));

        assert_eq!(config.registry.address, "https://env.example.com");
        assert_eq!(config.refresh.tags_online_refresh_max_count, 0);
        assert!(matches!(args.command, Command::Stats { top: 10 }));
    }

    #[test]
    fn test_flag_equal_to_default_overrides_environment() {
        let args = Args::try_parse_from([
            "registry-catalog-cache",
            "stats",
            "--tags-interval",
            "60",
            "--timeout",
            "60",
            "--registry",
            "http://localhost:5000",
        ])
        .unwrap();
        let config = args.apply_to(env(&[
            ("REGISTRY_CACHE_TAGS_INTERVAL", "0"),
            ("REGISTRY_CACHE_TIMEOUT", "5"),
            ("REGISTRY_CACHE_ADDRESS", "https://env.example.com"),
        ]));

        assert_eq!(config.refresh.tags_async_refresh_interval, 60);
        assert_eq!(config.registry.timeout, 60);
        assert_eq!(config.registry.address, "http://localhost:5000");
    }

    #[test]
    fn test_unset_flags_keep_environment() {
        let args = Args::try_parse_from(["registry-catalog-cache", "watch"]).unwrap();
        let from_env = env(&[
            ("REGISTRY_CACHE_CATALOG_INTERVAL", "0"),
            ("REGISTRY_CACHE_SKIP_TLS", "true"),
            ("REGISTRY_CACHE_VERBOSE", "1"),
        ]);

        assert_eq!(args.apply_to(from_env.clone()), from_env);
    }
}
