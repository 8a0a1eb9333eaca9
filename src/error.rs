use std::path::PathBuf;
use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum KiraError {
    #[error("unknown mode: {0}")]
    #[diagnostic(help("run `kira-ef --help` to list the supported modes"))]
    UnknownMode(String),

    #[error("invalid record id: {0:?}")]
    InvalidId(String),

    #[error("failed to read id file at {0}")]
    IdFileRead(PathBuf),

    #[error("missing config file at {0}")]
    MissingConfig(PathBuf),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid config value: {0}")]
    InvalidConfig(String),

    #[error("required tool not found: {0}")]
    #[diagnostic(help("install NCBI Entrez Direct or point --efetch at the executable"))]
    MissingTool(String),

    #[error("{program} did not finish within {secs}s", secs = .timeout.as_secs())]
    FetchTimeout { program: String, timeout: Duration },

    #[error("subprocess failed: {0}")]
    Subprocess(String),

    #[error("malformed PUBMED line in record {id}: {line:?}")]
    MalformedPubmedLine { id: String, line: String },

    #[error("mode {0} has no download command")]
    NotDownloadable(String),

    #[error("failed to launch browser {browser}: {message}")]
    BrowserLaunch { browser: String, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("download worker failed: {0}")]
    Worker(String),

    #[error("{failed} of {total} record(s) could not be downloaded")]
    JobsFailed { failed: usize, total: usize },
}
