use figment::{
    Figment,
    providers::{Format as _, Toml},
};
use rootcause::Report;

use crate::cli_args::{Config, FileConfig};

pub fn get_server_url(config: &Config) -> Result<url::Url, Report> {
    if let Some(url) = &config.url {
        return Ok(url.clone());
    }

    let file: FileConfig = Figment::new()
        .merge(Toml::file(&config.config))
        .extract()?;

    let path = config.config.display();
    file.url.ok_or(rootcause::report!(
        "`--url` required. Set it via `--url`, `SECRETGRID_URL` or `url` in {path}"
    ))
}
