use clap::Parser;

use crate::regions::DEFAULT_REGION;

/// Runs the fixed Item API test suite against a battle.net region host.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Region host the requests are sent to
    #[arg(short, long, default_value = DEFAULT_REGION)]
    pub region: String,

    /// API key appended to every request as the `apikey` query parameter
    #[arg(short, long)]
    pub api_key: Option<String>,

    /// Only run tests whose name contains this substring
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}

#[cfg(test)]
mod test {
    use clap::Parser;

    use crate::cli::Cli;
    use crate::regions::DEFAULT_REGION;
    use crate::regions::RegionTable;

    #[test]
    fn default_region_is_in_the_bundled_table() {
        let cli = Cli::parse_from(["itemproof"]);

        assert_eq!(cli.region, DEFAULT_REGION);
        assert!(RegionTable::bundled().unwrap().check(&cli.region).is_ok());
    }
}
