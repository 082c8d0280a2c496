use std::path::PathBuf;

use clap::Args;
use serde::Deserialize;
use url::Url;

#[derive(Args, Clone, Debug)]
pub struct Config {
    /// Url of the secretgridd server
    #[arg(long, global = true, env = "SECRETGRID_URL")]
    pub url: Option<Url>,

    /// Config file providing defaults for the flags above
    #[arg(long, global = true, default_value = "secretgrid.toml")]
    pub config: PathBuf,
}

/// Content of the config file
#[derive(Deserialize, Debug, Default)]
pub struct FileConfig {
    pub url: Option<Url>,
}
