use std::{env, path::PathBuf, sync::Arc};

use anyhow::Result;
use tracing::error;
use trckr::{
    cli::{command::run_command, short},
    config::DEFAULT_CONFIG_PATH,
    error::TrckrError,
    utils::{
        clock::{Clock, DefaultClock},
        dir::create_application_default_path,
        logging::{enable_logging, SHORT_PREFIX},
        runtime::single_thread_runtime,
    },
};

fn main() -> Result<()> {
    enable_logging(SHORT_PREFIX, &create_application_default_path()?, None, false)?;

    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let config_path = env::var_os("TRCKR_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let argv = env::args().skip(1).collect::<Vec<_>>();

    let runtime = single_thread_runtime()?;
    let result = short::parse_args(&argv, clock.as_ref()).and_then(|command| {
        runtime.block_on(run_command(
            &config_path,
            command,
            clock.clone(),
            &mut std::io::stdout().lock(),
            false,
        ))
    });

    match result {
        Ok(()) => Ok(()),
        Err(e @ TrckrError::CommandNotFound(_)) => {
            println!("{e}\n{}", short::usage());
            Ok(())
        }
        Err(e) => {
            error!("Error running short cli {e:?}");
            println!("{e}");
            Ok(())
        }
    }
}
