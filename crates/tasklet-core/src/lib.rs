pub mod calendar;
pub mod cli;
pub mod config;
pub mod filter;
pub mod preferences;
pub mod render;
pub mod session;
pub mod store;
pub mod task;

use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::io::{
  self,
  BufRead,
  IsTerminal,
  Write
};

use anyhow::Context;
use chrono::{
  Local,
  TimeZone,
  Utc
};
use clap::Parser;
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::config::CalendarZone;
use crate::preferences::{
  FileKeyValueStore,
  KeyValueStore,
  MemoryKeyValueStore
};
use crate::render::Renderer;
use crate::session::{
  Command,
  Outcome,
  Response,
  Session
};
use crate::store::TaskStore;

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting tasklet"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );
  for (key, value) in cfg.iter() {
    trace!(key = %key, value = %value, "effective config");
  }

  let preferences = open_preferences(
    &cfg,
    cli.data.as_deref()
  );

  let now = Utc::now();
  let store = if cli.sample
    || cfg
      .get_bool("sample.tasks")
      .unwrap_or(false)
  {
    TaskStore::with_samples(now)
  } else {
    TaskStore::new()
  };

  let input = SessionInput {
    one_shot: cli
      .rest
      .iter()
      .map(|arg| {
        arg.to_string_lossy().to_string()
      })
      .collect::<Vec<_>>()
      .join(" "),
    script:   cli.script
  };

  match cfg.timezone()? {
    | CalendarZone::Local => {
      let session = Session::new(
        store,
        preferences,
        Local,
        now
      );
      drive(session, &cfg, input)?
    }
    | CalendarZone::Utc => {
      let session = Session::new(
        store,
        preferences,
        Utc,
        now
      );
      drive(session, &cfg, input)?
    }
  }

  info!("done");
  Ok(())
}

/// Opens the on-disk preference store. An unusable data directory only
/// costs persistence: the session falls back to an in-memory store.
fn open_preferences(
  cfg: &config::Config,
  data_override: Option<&Path>
) -> Box<dyn KeyValueStore> {
  let opened =
    config::resolve_data_dir(
      cfg,
      data_override
    )
    .context(
      "failed to resolve data \
       directory"
    )
    .and_then(|dir| {
      FileKeyValueStore::open(&dir)
    });

  match opened {
    | Ok(store) => Box::new(store),
    | Err(err) => {
      warn!(
        error = %format!("{err:#}"),
        "preferences unavailable, \
         keeping them in memory"
      );
      Box::new(
        MemoryKeyValueStore::new()
      )
    }
  }
}

struct SessionInput {
  one_shot: String,
  script:   Option<std::path::PathBuf>
}

#[tracing::instrument(skip_all)]
fn drive<Tz: TimeZone>(
  mut session: Session<Tz>,
  cfg: &config::Config,
  input: SessionInput
) -> anyhow::Result<()> {
  let mut renderer =
    Renderer::new(cfg, session.theme())?;

  if !input.one_shot.trim().is_empty() {
    let command =
      Command::parse(&input.one_shot)?
        .ok_or_else(|| {
          anyhow::anyhow!(
            "nothing to run in: {}",
            input.one_shot
          )
        })?;
    let response =
      session.apply(command)?;
    return renderer
      .print_response(&response);
  }

  let mut reader: Box<dyn BufRead> =
    match &input.script {
      | Some(path) => {
        info!(script = %path.display(), "reading commands from script");
        let file = fs::File::open(path)
          .with_context(|| {
            format!(
              "failed to open {}",
              path.display()
            )
          })?;
        Box::new(io::BufReader::new(file))
      }
      | None => {
        Box::new(io::stdin().lock())
      }
    };
  let interactive = input
    .script
    .is_none()
    && io::stdin().is_terminal();

  renderer.print_response(
    &Response {
      notice:  None,
      outcome: Outcome::Refresh(
        session.snapshot(Utc::now())
      )
    }
  )?;

  let mut line = String::new();
  loop {
    if interactive {
      print!("tasklet> ");
      io::stdout().flush()?;
    }
    line.clear();
    let read = reader
      .read_line(&mut line)
      .context("failed reading input")?;
    if read == 0 {
      debug!("input exhausted");
      break;
    }
    if !execute_line(
      &mut session,
      &mut renderer,
      &line
    )? {
      break;
    }
  }

  Ok(())
}

/// Runs one input line. Returns `false` once the session should stop.
fn execute_line<Tz: TimeZone>(
  session: &mut Session<Tz>,
  renderer: &mut Renderer,
  line: &str
) -> anyhow::Result<bool> {
  let command = match Command::parse(
    line
  ) {
    | Ok(Some(command)) => command,
    | Ok(None) => return Ok(true),
    | Err(err) => {
      warn!(error = %err, "rejected command");
      eprintln!("error: {err:#}");
      return Ok(true);
    }
  };

  let quit = command == Command::Quit;
  match session.apply(command) {
    | Ok(response) => {
      renderer.print_response(&response)?
    }
    | Err(err) => {
      warn!(error = %err, "command failed");
      eprintln!("error: {err:#}");
    }
  }
  Ok(!quit)
}
