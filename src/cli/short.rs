//! One letter commands for quick use from a terminal or a keybinding.
//! `t [TIME] [NOTE...]` starts, `s [TIME]` stops, `a <INTERVAL> [NOTE...]` adds and
//! `l [INTERVAL]` lists.

use crate::{
    error::{Result, TrckrError},
    utils::{
        clock::Clock,
        time::{parse_interval, parse_time},
    },
};

use super::{
    command::{Command, MetaOverrides},
    output::OutputFormat,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShortCommand {
    Start,
    Stop,
    Add,
    List,
}

impl ShortCommand {
    const ALL: [ShortCommand; 4] = [Self::Start, Self::Add, Self::Stop, Self::List];

    fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.id() == id)
    }

    fn id(self) -> &'static str {
        match self {
            ShortCommand::Start => "t",
            ShortCommand::Stop => "s",
            ShortCommand::Add => "a",
            ShortCommand::List => "l",
        }
    }
}

/// Printed when the command letter isn't known.
pub fn usage() -> String {
    let ids = ShortCommand::ALL
        .iter()
        .map(|v| v.id())
        .collect::<Vec<_>>()
        .join(", ");
    format!("An efficient way to track time.\nUsage: trckr-short <command> [options]\n- command: {ids}")
}

/// Parses the arguments following the program name.
pub fn parse_args(argv: &[String], clock: &dyn Clock) -> Result<Command> {
    let Some((id, rest)) = argv.split_first() else {
        return Err(TrckrError::CommandNotFound("<none>".into()));
    };
    let command =
        ShortCommand::from_id(id).ok_or_else(|| TrckrError::CommandNotFound(id.clone()))?;
    let first = rest.first().map(String::as_str);
    let note = || {
        let note = rest.get(1..).unwrap_or_default().join(" ");
        MetaOverrides::default().with_note(Some(note))
    };

    match command {
        ShortCommand::Start => Ok(Command::Start {
            time: parse_time(first, clock)?,
            meta: note(),
        }),
        ShortCommand::Stop => Ok(Command::Stop {
            time: parse_time(first, clock)?,
        }),
        ShortCommand::Add => {
            let token = first.ok_or_else(|| TrckrError::parse("", "interval"))?;
            match parse_interval(Some(token), clock)? {
                (Some(start), Some(stop)) => Ok(Command::Add {
                    start,
                    stop,
                    meta: note(),
                }),
                _ => Err(TrckrError::parse(token, "bounded interval")),
            }
        }
        ShortCommand::List => {
            let (from, to) = parse_interval(first, clock)?;
            Ok(Command::List {
                from,
                to,
                format: OutputFormat::Text,
            })
        }
    }
}
