//! Provides a means to read, parse and hold configuration options for scans.
use clap::Parser;
use serde_derive::Deserialize;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "sourcescan",
    version = env!("CARGO_PKG_VERSION"),
    max_term_width = 120,
    help_template = "{bin} {version}\n{about}\n\nUSAGE:\n    {usage}\n\nOPTIONS:\n{options}",
)]
#[allow(clippy::struct_excessive_bools)]
/// Discovers Valve Source Engine game servers across a target file of IPs,
/// ranges and CIDR blocks, recording confirmed servers and pruning exhausted
/// entries between runs.
/// WARNING Only point this at address space you are authorised to scan.
pub struct Opts {
    /// File of scan targets: one IP, dash range, or CIDR block per line.
    #[arg(short = 'f', long, default_value = "ips.txt")]
    pub targets_file: PathBuf,

    /// File confirmed servers are appended to, one ip:port per line.
    #[arg(short, long, default_value = "validservers.txt")]
    pub servers_file: PathBuf,

    /// How many addresses of a single entry are probed at once. Each worker
    /// walks the full port window for its address.
    #[arg(short, long, default_value = "25")]
    pub batch_size: u16,

    /// The timeout in milliseconds before a probe is assumed unanswered.
    #[arg(short, long, default_value = "200")]
    pub timeout: u32,

    /// Greppable mode. Only print confirmed servers.
    #[arg(short, long)]
    pub greppable: bool,

    /// Accessible mode. Turns off features which negatively affect screen readers.
    #[arg(long)]
    pub accessible: bool,

    /// Whether to ignore the configuration file or not.
    #[arg(short, long)]
    pub no_config: bool,

    /// Hide the banner.
    #[arg(long)]
    pub no_banner: bool,

    /// Custom path to config file.
    #[arg(short, long, value_parser)]
    pub config_path: Option<PathBuf>,
}

#[cfg(not(tarpaulin_include))]
impl Opts {
    /// Reads the command line arguments into an Opts struct.
    #[must_use]
    pub fn read() -> Self {
        Opts::parse()
    }

    /// Merges values found within the user configuration file.
    pub fn merge(&mut self, config: &Config) {
        if !self.no_config {
            self.merge_required(config);
            self.merge_optional(config);
        }
    }

    fn merge_required(&mut self, config: &Config) {
        macro_rules! merge_required {
            ($($field: ident),+) => {
                $(
                    if let Some(e) = &config.$field {
                        self.$field = e.clone();
                    }
                )+
            }
        }

        merge_required!(
            targets_file,
            servers_file,
            batch_size,
            timeout,
            greppable,
            accessible
        );
    }

    fn merge_optional(&mut self, config: &Config) {
        macro_rules! merge_optional {
            ($($field: ident),+) => {
                $(
                    if config.$field.is_some() {
                        self.$field = config.$field.clone();
                    }
                )+
            }
        }

        merge_optional!(config_path);
    }
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            targets_file: PathBuf::from("ips.txt"),
            servers_file: PathBuf::from("validservers.txt"),
            batch_size: 25,
            timeout: 200,
            greppable: true,
            accessible: false,
            no_config: true,
            no_banner: false,
            config_path: None,
        }
    }
}

/// Struct used to deserialize the options specified within our config file.
/// These will be further merged with our command line arguments in order to
/// generate the final Opts struct.
#[cfg(not(tarpaulin_include))]
#[derive(Debug, Deserialize)]
pub struct Config {
    targets_file: Option<PathBuf>,
    servers_file: Option<PathBuf>,
    batch_size: Option<u16>,
    timeout: Option<u32>,
    greppable: Option<bool>,
    accessible: Option<bool>,
    config_path: Option<PathBuf>,
}

#[cfg(not(tarpaulin_include))]
impl Config {
    /// Reads the configuration file with TOML format and parses it into a
    /// Config struct.
    ///
    /// # Format
    ///
    /// targets_file = "ips.txt"
    /// servers_file = "validservers.txt"
    /// batch_size = 25
    /// timeout = 200
    /// greppable = true
    ///
    #[must_use]
    pub fn read(custom_config_path: Option<PathBuf>) -> Self {
        let mut content = String::new();
        let config_path = custom_config_path.unwrap_or_else(default_config_path);
        if config_path.exists() {
            content = fs::read_to_string(config_path).unwrap_or_default();
        }

        match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                println!("Found {e} in configuration file.\nAborting scan.\n");
                std::process::exit(1);
            }
        }
    }
}

/// Constructs default path to config toml
#[must_use]
pub fn default_config_path() -> PathBuf {
    let Some(mut config_path) = dirs::home_dir() else {
        panic!("Could not infer config file path.");
    };
    config_path.push(".sourcescan.toml");
    config_path
}
