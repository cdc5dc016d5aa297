//! trackr - レポートパイプラインのプロセス入口
//!
//! - `trackr serve [--embedded-worker]`: HTTP API
//! - `trackr worker`: dispatcher だけを回す
//! - `trackr seed <FILE>`: JSON fixture を SQLite に投入
//! - `trackr token <USER_ID>`: 開発用の bearer token を発行

use std::path::PathBuf;

use anyhow::bail;
use clap::{Arg, ArgAction, Command};

mod logging;
mod seed;
mod serve;
mod settings;
mod shutdown;
mod token;
mod wiring;
mod worker;

use crate::settings::Settings;

fn cli() -> Command {
    Command::new("trackr")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Project tracker report pipeline")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .args(settings::global_args())
        .subcommand(
            Command::new("serve").about("Run the HTTP API").arg(
                Arg::new("embedded-worker")
                    .long("embedded-worker")
                    .help("Also run report dispatchers in this process")
                    .action(ArgAction::SetTrue),
            ),
        )
        .subcommand(Command::new("worker").about("Run report dispatchers"))
        .subcommand(
            Command::new("seed")
                .about("Load users, projects and tasks from a JSON fixture")
                .arg(
                    Arg::new("file")
                        .value_name("FILE")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("token")
                .about("Issue a bearer token for local testing")
                .arg(Arg::new("user-id").value_name("USER_ID").required(true))
                .arg(
                    Arg::new("email")
                        .long("email")
                        .value_name("EMAIL")
                        .default_value("dev@example.com"),
                )
                .arg(
                    Arg::new("name")
                        .long("name")
                        .value_name("NAME")
                        .default_value("Developer"),
                )
                .arg(
                    Arg::new("ttl-hours")
                        .long("ttl-hours")
                        .value_name("HOURS")
                        .default_value("24")
                        .value_parser(clap::value_parser!(i64).range(1..)),
                ),
        )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    let settings = Settings::from_matches(&matches)?;
    logging::init(&settings.log_level, settings.log_format)?;

    match matches.subcommand() {
        Some(("serve", sub)) => serve::run(&settings, sub.get_flag("embedded-worker")).await,
        Some(("worker", _)) => worker::run(&settings).await,
        Some(("seed", sub)) => {
            let Some(path) = sub.get_one::<PathBuf>("file") else {
                bail!("seed needs a fixture file");
            };
            seed::run(&settings, path).await
        }
        Some(("token", sub)) => {
            let arg = |id: &str| sub.get_one::<String>(id).map(String::as_str).unwrap_or_default();
            let ttl_hours = sub.get_one::<i64>("ttl-hours").copied().unwrap_or(24);
            token::run(&settings, arg("user-id"), arg("email"), arg("name"), ttl_hours)
        }
        Some((other, _)) => bail!("unknown command: {other}"),
        None => bail!("no command given"),
    }
}
