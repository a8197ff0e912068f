use std::{collections::BTreeMap, io::Write, path::Path, sync::Arc};

use chrono::NaiveDateTime;
use tracing::{debug, info, instrument};

use crate::{
    config::{self, extensions::standard_extensions, Backend, ResolvedConfig},
    error::{Result, TrckrError},
    storage::{
        database::EntryStore,
        entities::Meta,
        port::{DocumentPort, JsonFile},
    },
    utils::clock::Clock,
};

use super::output::{print_entries, OutputFormat};

/// Everything trckr can be asked to do, independent of how it was asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start {
        time: NaiveDateTime,
        meta: MetaOverrides,
    },
    Stop {
        time: NaiveDateTime,
    },
    Add {
        start: NaiveDateTime,
        stop: NaiveDateTime,
        meta: MetaOverrides,
    },
    List {
        from: Option<NaiveDateTime>,
        to: Option<NaiveDateTime>,
        format: OutputFormat,
    },
    SetProperty {
        property: String,
        value: String,
    },
}

/// Metadata given for a single command, on top of the configured defaults.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetaOverrides {
    pub userid: Option<String>,
    pub contextid: Option<String>,
    pub note: Option<String>,
}

impl MetaOverrides {
    /// Empty values and `-` mean "use the default".
    pub fn new(userid: Option<String>, contextid: Option<String>, note: Option<String>) -> Self {
        let given = |v: Option<String>| v.filter(|v| !v.is_empty() && v != "-");
        Self {
            userid: given(userid),
            contextid: given(contextid),
            note: given(note),
        }
    }

    pub fn with_note(self, note: Option<String>) -> Self {
        Self::new(self.userid, self.contextid, note)
    }

    /// Merges with `defaults`, given values win.
    pub fn into_meta(self, defaults: &BTreeMap<String, String>) -> Meta {
        let pick = |given: Option<String>, field: &str| {
            given
                .or_else(|| defaults.get(field).cloned())
                .map(Into::into)
        };
        Meta {
            userid: pick(self.userid, "userid"),
            contextid: pick(self.contextid, "contextid"),
            note: pick(self.note, "note"),
        }
    }
}

/// Opens the store the config points to.
pub async fn open_store(config: &ResolvedConfig) -> Result<EntryStore<JsonFile>> {
    let port = match config.database.backend {
        Backend::StructJson if config.database.lock => {
            JsonFile::with_advisory_lock(&config.database.path).await?
        }
        Backend::StructJson => JsonFile::new(&config.database.path),
    };
    EntryStore::open(port).await
}

/// Loads what `command` needs and runs it. Changing the config doesn't need the config to resolve,
/// so a broken config can still be fixed.
#[instrument(skip(clock, out))]
pub async fn run_command(
    config_path: &Path,
    command: Command,
    clock: Arc<dyn Clock>,
    out: &mut impl Write,
    colored: bool,
) -> Result<()> {
    match command {
        Command::SetProperty { property, value } => {
            config::set_property(config_path, &property, &value).await
        }
        command => {
            let raw = config::load(config_path).await?;
            let config = config::resolve(&raw, &standard_extensions(clock))?;
            let mut store = open_store(&config).await?;
            exec(&config, &mut store, command, out, colored).await
        }
    }
}

/// Executes `command` against an open store. Changes are committed before returning.
pub async fn exec<P: DocumentPort>(
    config: &ResolvedConfig,
    store: &mut EntryStore<P>,
    command: Command,
    out: &mut impl Write,
    colored: bool,
) -> Result<()> {
    debug!("Executing {command:?}");
    match command {
        Command::Start { time, meta } => {
            if let Some(stopped) = store.start(time, meta.into_meta(&config.defaults)) {
                info!("Stopped previous timer {} first", stopped.id);
            }
            store.commit().await
        }
        Command::Stop { time } => {
            store.stop(time)?;
            store.commit().await
        }
        Command::Add { start, stop, meta } => {
            store.add(start, stop, meta.into_meta(&config.defaults))?;
            store.commit().await
        }
        Command::List { from, to, format } => {
            let entries = store.select(from, to);
            print_entries(&entries, format, colored, out)
                .map_err(|e| TrckrError::io("<output>", e))
        }
        Command::SetProperty { property, value } => {
            config::set_property(&config.path, &property, &value).await
        }
    }
}
