pub mod command;
pub mod output;
pub mod short;

use std::{io::IsTerminal, path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::{Parser, Subcommand};
use command::{run_command, Command, MetaOverrides};
use output::OutputFormat;
use tracing::level_filters::LevelFilter;

use crate::{
    config::DEFAULT_CONFIG_PATH,
    error::TrckrError,
    utils::{
        clock::{Clock, DefaultClock},
        dir::create_application_default_path,
        logging::{enable_logging, CLI_PREFIX},
        time::{parse_interval, parse_time},
    },
};

#[derive(Parser, Debug)]
#[command(name = "trckr", version, long_about = None)]
#[command(about = "Simple time tracking from the terminal", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long = "config",
        env = "TRCKR_CONFIG",
        default_value = DEFAULT_CONFIG_PATH,
        help = "Config file. Created when changed with `set` or `init`"
    )]
    config_path: PathBuf,
    #[arg(long, global = true, help = "Context for this command only")]
    context: Option<String>,
    #[arg(long, global = true, help = "User for this command only")]
    user: Option<String>,
    #[arg(long, help = "Enable logging")]
    log: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Add a finished entry")]
    Add {
        #[arg(help = "Start, as HH:MM, HH:MM:SS or MM/DD")]
        from: String,
        #[arg(help = "Stop, as HH:MM, HH:MM:SS or MM/DD")]
        to: String,
        note: Vec<String>,
    },
    #[command(about = "Start the timer. A running timer is stopped first")]
    Start {
        #[arg(help = "Start time, `-` or nothing for now")]
        from: Option<String>,
        note: Vec<String>,
    },
    #[command(about = "Stop the timer")]
    Stop {
        #[arg(help = "Stop time, `-` or nothing for now")]
        to: Option<String>,
    },
    #[command(about = "List entries, clipped to an interval")]
    List {
        #[arg(help = "today, week, month, FROM-TO or `-` for everything")]
        interval: Option<String>,
        #[arg(long, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    #[command(about = "Create the config file")]
    Init {},
    #[command(about = "Set a config property, like defaults.contextid")]
    Set { property: String, value: String },
}

impl Commands {
    fn into_command(
        self,
        overrides: MetaOverrides,
        clock: &dyn Clock,
    ) -> Result<Command, TrckrError> {
        let note = |words: Vec<String>| overrides.clone().with_note(Some(words.join(" ")));
        Ok(match self {
            Commands::Add { from, to, note: words } => {
                let start = parse_time(Some(&from), clock)?;
                let stop = parse_time(Some(&to), clock)?;
                Command::Add {
                    start,
                    stop,
                    meta: note(words),
                }
            }
            Commands::Start { from, note: words } => Command::Start {
                time: parse_time(from.as_deref(), clock)?,
                meta: note(words),
            },
            Commands::Stop { to } => Command::Stop {
                time: parse_time(to.as_deref(), clock)?,
            },
            Commands::List { interval, format } => {
                let (from, to) = parse_interval(interval.as_deref(), clock)?;
                Command::List { from, to, format }
            }
            Commands::Init {} => Command::SetProperty {
                property: "created".into(),
                value: clock.time().format("%Y-%m-%dT%H:%M:%S").to_string(),
            },
            Commands::Set { property, value } => Command::SetProperty { property, value },
        })
    }
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(
        CLI_PREFIX,
        &create_application_default_path()?,
        logging_level,
        args.log,
    )?;

    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let overrides = MetaOverrides::new(args.user, args.context, None);
    let command = args.commands.into_command(overrides, clock.as_ref())?;

    let mut stdout = std::io::stdout().lock();
    let colored = stdout.is_terminal();
    run_command(&args.config_path, command, clock, &mut stdout, colored).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use crate::{
        cli::{
            command::{Command, MetaOverrides},
            output::OutputFormat,
        },
        utils::time::tests::{at, test_clock},
    };

    use super::Args;

    fn parse(argv: &[&str]) -> Command {
        let args = Args::try_parse_from(argv).unwrap();
        args.commands
            .into_command(
                MetaOverrides::new(args.user, args.context, None),
                &test_clock(),
            )
            .unwrap()
    }

    #[test]
    fn test_add_with_overrides() {
        assert_eq!(
            parse(&[
                "trckr", "--context", "review", "add", "09:00", "10:00", "pull", "request"
            ]),
            Command::Add {
                start: at(2024, 1, 3, 9, 0, 0),
                stop: at(2024, 1, 3, 10, 0, 0),
                meta: MetaOverrides {
                    contextid: Some("review".into()),
                    note: Some("pull request".into()),
                    ..Default::default()
                },
            }
        );
    }

    #[test]
    fn test_start_defaults_to_now() {
        assert_eq!(
            parse(&["trckr", "start"]),
            Command::Start {
                time: at(2024, 1, 3, 12, 34, 56),
                meta: MetaOverrides::default(),
            }
        );
        assert_eq!(
            parse(&["trckr", "start", "-", "notes", "--user", "someone"]),
            Command::Start {
                time: at(2024, 1, 3, 12, 34, 56),
                meta: MetaOverrides {
                    userid: Some("someone".into()),
                    note: Some("notes".into()),
                    ..Default::default()
                },
            }
        );
    }

    #[test]
    fn test_list_and_init() {
        assert_eq!(
            parse(&["trckr", "list", "week", "--format", "json"]),
            Command::List {
                from: Some(at(2024, 1, 1, 0, 0, 0)),
                to: Some(at(2024, 1, 7, 23, 59, 59)),
                format: OutputFormat::Json,
            }
        );
        assert_eq!(
            parse(&["trckr", "init"]),
            Command::SetProperty {
                property: "created".into(),
                value: "2024-01-03T12:34:56".into(),
            }
        );
    }

    #[test]
    fn test_bad_time_is_a_parse_error() {
        let args = Args::try_parse_from(["trckr", "stop", "25:99"]).unwrap();
        assert!(args
            .commands
            .into_command(MetaOverrides::default(), &test_clock())
            .is_err());
    }
}
