use clap::Args;
use console::style;
use rootcause::{Report, bail};
use serde_json::Value;
use tabled::{Table, Tabled, settings::Style};

use crate::{cli::common, cli_args::Config};

#[derive(Args)]
pub struct LoginArgs {
    /// AWS access key id
    #[arg(long, env = "AWS_ACCESS_KEY_ID")]
    access_key_id: Option<String>,
    /// AWS secret access key
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    secret_access_key: Option<String>,
    /// AWS region of the secrets
    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,
}

/// SQL `LIKE` patterns, e.g. `--name 'prod/%'`.
///
/// Case-insensitive for ASCII. `%` matches any text and `_` any single character,
/// so `--path db_user` also selects `DB_USER` and `dbXuser`.
#[derive(Args)]
pub struct FilterArgs {
    /// Filter by secret name
    #[arg(long)]
    name: Option<String>,
    /// Filter by dotted path
    #[arg(long)]
    path: Option<String>,
    /// Filter by the JSON encoded value (strings include their quotes)
    #[arg(long)]
    value: Option<String>,
}

#[derive(Args)]
pub struct SetArgs {
    /// The new value of every selected leaf
    #[arg(long = "to")]
    new_value: Option<String>,
    /// Parse the new value as JSON (numbers, booleans, null) instead of using it as string
    #[arg(long)]
    json: bool,
    /// Do not ask for confirmation
    #[arg(long, short)]
    yes: bool,
    #[command(flatten)]
    filter: FilterArgs,
}

impl From<FilterArgs> for api::RowFilter {
    fn from(args: FilterArgs) -> Self {
        Self {
            name: args.name,
            path: args.path,
            value: args.value,
        }
    }
}

#[derive(Tabled)]
struct RowView<'a> {
    #[tabled(rename = "secret-name")]
    name: &'a str,
    path: &'a str,
    value: String,
}

impl<'a> From<&'a api::SecretRow> for RowView<'a> {
    fn from(row: &'a api::SecretRow) -> Self {
        Self {
            name: &row.name,
            path: &row.path,
            value: match &row.value {
                Value::String(value) => value.clone(),
                other => other.to_string(),
            },
        }
    }
}

fn print_rows(rows: &[api::SecretRow]) {
    let mut table = Table::new(rows.iter().map(RowView::from));
    table.with(Style::rounded());
    println!("{table}");
}

pub async fn login(config: &Config, args: LoginArgs) -> Result<(), Report> {
    let url = common::get_server_url(config)?;

    let access_key_id = if let Some(id) = args.access_key_id {
        id
    } else {
        inquire::Text::new("AWS access key id:").prompt()?
    };
    let secret_access_key = if let Some(key) = args.secret_access_key {
        key
    } else {
        inquire::Password::new("AWS secret access key:")
            .without_confirmation()
            .prompt()?
    };
    let region = if let Some(region) = args.region {
        region
    } else {
        inquire::Text::new("AWS region:")
            .with_default("eu-central-1")
            .prompt()?
    };

    let response = api::client::login(
        &url,
        &api::LoginRequest {
            access_key_id,
            secret_access_key,
            region,
        },
    )
    .await?;
    log::info!("{}", response.message);
    Ok(())
}

pub async fn list(config: &Config, filter: FilterArgs) -> Result<(), Report> {
    let url = common::get_server_url(config)?;
    let rows = api::client::list(&url, &filter.into()).await?;
    if rows.is_empty() {
        log::info!("No secrets found");
        return Ok(());
    }
    print_rows(&rows);
    Ok(())
}

pub async fn set(config: &Config, args: SetArgs) -> Result<(), Report> {
    let url = common::get_server_url(config)?;
    let filter: api::RowFilter = args.filter.into();
    if filter.is_empty() {
        bail!("Select the rows to change with `--name`, `--path` or `--value`");
    }

    let rows = api::client::list(&url, &filter).await?;
    if rows.is_empty() {
        bail!("No rows match the filter");
    }
    print_rows(&rows);

    let raw = if let Some(value) = args.new_value {
        value
    } else {
        inquire::Text::new("New value:").prompt()?
    };
    let new_value = parse_value(raw, args.json)?;

    let batch = api::group_rows(&rows, &new_value);
    if batch.is_empty() {
        log::info!("Empty value, nothing to do");
        return Ok(());
    }

    if !args.yes {
        let confirm = inquire::Confirm::new(&format!(
            "Set {} leaves in {} secrets to {new_value}?",
            rows.len(),
            batch.len()
        ))
        .with_default(false)
        .prompt()?;
        if !confirm {
            log::info!("Aborting...");
            return Ok(());
        }
    }

    let outcomes = api::client::update(&url, &batch).await?;
    let mut failed = 0;
    for (request, outcome) in batch.iter().zip(&outcomes) {
        if outcome.success {
            println!("{} {}", style("updated").green(), request.secret_name);
        } else {
            failed += 1;
            println!(
                "{} {}: {}",
                style("failed").red(),
                request.secret_name,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
    if failed > 0 {
        bail!("{failed} of {} secrets could not be updated", batch.len());
    }
    Ok(())
}

/// The new value as entered, or as JSON primitive with `--json`
fn parse_value(raw: String, json: bool) -> Result<Value, Report> {
    if !json {
        return Ok(Value::String(raw));
    }
    let value: Value = serde_json::from_str(&raw)?;
    if value.is_object() || value.is_array() {
        bail!("Only strings, numbers, booleans and null can be set");
    }
    Ok(value)
}
