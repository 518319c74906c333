//! Raw data sources: the Slurm commands, or recorded command output.

use camino::Utf8PathBuf;
use jobinfo_parsers::run_command_allow_failure;
use thiserror::Error;
use tokio::process::Command;

use crate::{sacct, scontrol, squeue, sstat};

/// Which external system to ask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Accounting,
    LiveStats,
    Queue,
    Node,
}

impl SourceKind {
    pub fn command_name(&self) -> &'static str {
        match self {
            Self::Accounting => "sacct",
            Self::LiveStats => "sstat",
            Self::Queue => "squeue",
            Self::Node => "scontrol",
        }
    }

    fn fixture_file(&self) -> &'static str {
        match self {
            Self::Accounting => "sacct.txt",
            Self::LiveStats => "sstat.txt",
            Self::Queue => "squeue.txt",
            Self::Node => "scontrol.txt",
        }
    }

    fn command_args(&self, identifier: &str) -> Vec<String> {
        match self {
            Self::Accounting => sacct::command_args(identifier),
            Self::LiveStats => sstat::command_args(identifier),
            Self::Queue => squeue::command_args(identifier),
            Self::Node => scontrol::command_args(identifier),
        }
    }
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Could not run {command}: {error}")]
    Unavailable { command: String, error: String },
    #[error("Could not read recorded output {path}: {error}")]
    Fixture { path: Utf8PathBuf, error: String },
}

/// Something that answers one query per call with raw text.
///
/// `Ok(None)` means the query ran but knows nothing about the identifier.
#[allow(async_fn_in_trait)]
pub trait SlurmSource {
    async fn fetch(
        &self,
        kind: SourceKind,
        identifier: &str,
    ) -> Result<Option<String>, SourceError>;
}

fn non_empty(output: String) -> Option<String> {
    if output.trim().is_empty() {
        None
    } else {
        Some(output)
    }
}

/// Runs the real Slurm commands.
#[derive(Debug, Clone, Default)]
pub struct CommandSource;

impl SlurmSource for CommandSource {
    async fn fetch(
        &self,
        kind: SourceKind,
        identifier: &str,
    ) -> Result<Option<String>, SourceError> {
        let name = kind.command_name();
        let args = kind.command_args(identifier);
        tracing::debug!("Running {} {}", name, args.join(" "));

        let mut cmd = Command::new(name);
        cmd.args(&args);

        let stdout = run_command_allow_failure(&mut cmd, name)
            .await
            .map_err(|e| SourceError::Unavailable {
                command: name.to_string(),
                error: e.to_string(),
            })?;

        Ok(non_empty(stdout))
    }
}

/// Answers queries from recorded command output in a directory
/// (`sacct.txt`, `sstat.txt`, `squeue.txt`, `scontrol.txt`), selecting
/// the lines the real command would have printed.
#[derive(Debug, Clone)]
pub struct FixtureSource {
    dir: Utf8PathBuf,
}

impl FixtureSource {
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl SlurmSource for FixtureSource {
    async fn fetch(
        &self,
        kind: SourceKind,
        identifier: &str,
    ) -> Result<Option<String>, SourceError> {
        let path = self.dir.join(kind.fixture_file());
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            // A missing recording is a source with nothing to say
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SourceError::Fixture {
                    path,
                    error: e.to_string(),
                });
            }
        };

        let selected: Vec<&str> = contents
            .lines()
            .filter(|line| fixture_line_matches(kind, line, identifier))
            .collect();

        let selected = match kind {
            // squeue and scontrol print a single line per id
            SourceKind::Queue | SourceKind::Node => selected.into_iter().take(1).collect(),
            _ => selected,
        };

        Ok(non_empty(selected.join("\n")))
    }
}

fn fixture_line_matches(kind: SourceKind, line: &str, identifier: &str) -> bool {
    match kind {
        SourceKind::Accounting => {
            let id = line.split(sacct::SACCT_DELIMITER).next().unwrap_or("");
            if identifier.contains('.') {
                return id == identifier;
            }
            // sacct -j 123 lists the allocation row and every step of it
            id.split('.').next() == Some(identifier)
        }
        SourceKind::LiveStats | SourceKind::Queue => {
            line.split('|').next().map(str::trim) == Some(identifier)
        }
        SourceKind::Node => line
            .split_whitespace()
            .next()
            .and_then(|token| token.strip_prefix("NodeName="))
            == Some(identifier),
    }
}
