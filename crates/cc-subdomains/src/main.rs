mod config;
mod error;
mod model;
mod modules;
mod scan;
mod utils;

pub use error::{Error, Result};

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use config::Config;
use model::normalize_domain;
use scan::scan;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{error, info};
use utils::{ensure_dir, log::init_tracing_subscriber};

fn main() -> Result<()> {
    let cli = Command::new(clap::crate_name!())
        .version(clap::crate_version!())
        .about("Find subdomains of a domain in the CommonCrawl index")
        .subcommand(Command::new("modules").about("List all modules"))
        .subcommand(
            Command::new("scan")
                .about("Enumerate the subdomains of a target")
                .arg(
                    Arg::new("target")
                        .help("The domain name to enumerate (e.g. example.com)")
                        .value_name("TARGET")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("limit")
                        .short('l')
                        .long("limit")
                        .help("Query only the N most recent collections")
                        .value_name("N")
                        .value_parser(value_parser!(u64)),
                )
                .arg(
                    Arg::new("concurrency")
                        .short('c')
                        .long("concurrency")
                        .help(format!(
                            "Collections queried at the same time [default: {}]",
                            config::COLLECTIONS_QUERY_CONCURRENCY
                        ))
                        .value_name("N")
                        .value_parser(value_parser!(u64).range(1..)),
                )
                .arg(
                    Arg::new("timeout")
                        .short('t')
                        .long("timeout")
                        .help("Timeout of each HTTP request, in seconds")
                        .value_name("SECS")
                        .value_parser(value_parser!(u64).range(1..)),
                )
                .arg(
                    Arg::new("max-time")
                        .long("max-time")
                        .help("Stop querying after SECS seconds and print what was found")
                        .value_name("SECS")
                        .value_parser(value_parser!(u64).range(1..)),
                )
                .arg(
                    Arg::new("prefilter")
                        .long("prefilter")
                        .action(ArgAction::SetTrue)
                        .help("Skip index lines not mentioning the target before parsing them"),
                )
                .arg(
                    Arg::new("index-url")
                        .long("index-url")
                        .help("URL of the collections list")
                        .value_name("URL")
                        .default_value(config::COLLINFO_URL),
                )
                .arg(
                    Arg::new("logs")
                        .short('s')
                        .long("logs")
                        .action(ArgAction::SetTrue)
                        .help("Save logs into a .log file"),
                ),
        )
        .arg_required_else_help(true)
        .get_matches();

    match cli.subcommand() {
        Some(("modules", _)) => modules::display_all(),
        Some(("scan", args)) => {
            if let Some(target) = args.get_one::<String>("target") {
                let domain = normalize_domain(target)?;

                // create filename
                let timestamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
                let filename = format!("{}", timestamp);

                let save_logs = args.get_flag("logs");
                let output_dir = format!("output/cc-subdomains/{}", domain);
                if save_logs {
                    ensure_dir(output_dir.as_ref())?;
                }
                init_tracing_subscriber(save_logs, output_dir.as_ref(), &filename)?;

                info!("Enumerating {} (run_{})", domain, timestamp);
                let subdomains = match scan(&domain, config_from_args(args)) {
                    Ok(subdomains) => subdomains,
                    Err(err) => {
                        error!("{}", err);
                        return Err(err);
                    }
                };

                println!("Found {} subdomains:", subdomains.len());
                for subdomain in subdomains {
                    println!("{}", subdomain);
                }
            }
        }

        // fallback if a cmd is not handled (should not possible)
        _ => {
            error!("{:12} - Command not handled, exit program", "CLI ERROR");
            return Err(Error::CliUsage("Command not handled".into()));
        }
    }

    Ok(())
}

fn config_from_args(args: &ArgMatches) -> Config {
    let default = Config::default();
    Config {
        collinfo_url: args
            .get_one::<String>("index-url")
            .cloned()
            .unwrap_or(default.collinfo_url),
        limit: args.get_one::<u64>("limit").map(|n| *n as usize),
        concurrency: args
            .get_one::<u64>("concurrency")
            .map(|n| *n as usize)
            .unwrap_or(default.concurrency),
        request_timeout: args
            .get_one::<u64>("timeout")
            .map(|secs| Duration::from_secs(*secs))
            .unwrap_or(default.request_timeout),
        prefilter: args.get_flag("prefilter"),
        max_time: args
            .get_one::<u64>("max-time")
            .map(|secs| Duration::from_secs(*secs)),
    }
}
