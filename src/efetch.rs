use std::fmt::Write as _;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::domain::{Job, Mode, RecordId};
use crate::error::KiraError;

/// Literal efetch prints when NCBI rejects a query.
pub const FAILURE_MARKER: &str = "QUERY FAILURE";

const WAIT_POLL: Duration = Duration::from_millis(50);

/// Raw text returned for one attempt and whether it counts as a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub text: String,
    pub failed: bool,
}

pub trait RecordFetcher: Send + Sync {
    fn fetch(&self, job: &Job) -> Result<FetchOutcome, KiraError>;
}

#[derive(Debug, Clone)]
pub struct EfetchClient {
    program: String,
    timeout: Option<Duration>,
}

impl EfetchClient {
    pub fn new(program: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Fails early when the configured program cannot be found, instead of
    /// discovering it on the first job.
    pub fn ensure_installed(&self) -> Result<PathBuf, KiraError> {
        let path = Path::new(&self.program);
        if path.components().count() > 1 {
            return if path.is_file() {
                Ok(path.to_path_buf())
            } else {
                Err(KiraError::MissingTool(self.program.clone()))
            };
        }
        find_in_path(&self.program).ok_or_else(|| KiraError::MissingTool(self.program.clone()))
    }
}

impl RecordFetcher for EfetchClient {
    fn fetch(&self, job: &Job) -> Result<FetchOutcome, KiraError> {
        let args = job.command_args()?;
        tracing::debug!(program = %self.program, args = ?args, "running efetch");
        let text = run_captured(&self.program, &args, self.timeout)?;
        let failed = is_failure(&text);
        if failed || job.mode != Mode::Papers {
            return Ok(FetchOutcome { text, failed });
        }
        Ok(FetchOutcome {
            text: pubmed_rows(&job.id, &text)?,
            failed,
        })
    }
}

/// Empty or whitespace-only output, or output carrying the failure marker.
pub fn is_failure(text: &str) -> bool {
    text.trim().is_empty() || text.contains(FAILURE_MARKER)
}

/// Extracts `id,pubmed_id` rows from a GenBank flat file.
pub fn pubmed_rows(id: &RecordId, record: &str) -> Result<String, KiraError> {
    let mut rows = String::new();
    for line in record.lines() {
        let trimmed = line.trim();
        if !trimmed.starts_with("PUBMED") {
            continue;
        }
        let pubmed_id = trimmed.split_whitespace().nth(1).ok_or_else(|| {
            KiraError::MalformedPubmedLine {
                id: id.to_string(),
                line: line.to_string(),
            }
        })?;
        let _ = writeln!(rows, "{id},{pubmed_id}");
    }
    Ok(rows)
}

/// Runs `program` and returns stdout followed by stderr as lossy UTF-8.
///
/// Without a timeout this blocks until the child exits. The exit status is
/// not inspected: efetch reports problems in its output.
pub fn run_captured(
    program: &str,
    args: &[String],
    timeout: Option<Duration>,
) -> Result<String, KiraError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| spawn_error(program, err))?;

    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    match timeout {
        None => {
            let status = child
                .wait()
                .map_err(|err| KiraError::Subprocess(err.to_string()))?;
            tracing::debug!(%status, "efetch exited");
        }
        Some(limit) => wait_with_deadline(&mut child, program, limit)?,
    }

    let mut bytes = collect(stdout);
    bytes.extend(collect(stderr));
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn wait_with_deadline(child: &mut Child, program: &str, limit: Duration) -> Result<(), KiraError> {
    let started = Instant::now();
    loop {
        let status = child
            .try_wait()
            .map_err(|err| KiraError::Subprocess(err.to_string()))?;
        if let Some(status) = status {
            tracing::debug!(%status, "efetch exited");
            return Ok(());
        }
        if started.elapsed() >= limit {
            // The reader threads are left to finish on their own; a grandchild
            // may still hold the pipes open.
            let _ = child.kill();
            let _ = child.wait();
            return Err(KiraError::FetchTimeout {
                program: program.to_string(),
                timeout: limit,
            });
        }
        thread::sleep(WAIT_POLL);
    }
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

fn spawn_error(program: &str, err: io::Error) -> KiraError {
    if err.kind() == io::ErrorKind::NotFound {
        KiraError::MissingTool(program.to_string())
    } else {
        KiraError::Subprocess(format!("{program}: {err}"))
    }
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.is_file() {
            return Some(exe);
        }
        let plain = path.join(name);
        if plain.is_file() {
            return Some(plain);
        }
    }
    None
}
