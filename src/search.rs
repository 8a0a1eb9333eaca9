use std::process::{Command, Stdio};

use crate::error::KiraError;

pub const DEFAULT_SEARCH_URL: &str = "https://www.ncbi.nlm.nih.gov/nuccore/?term=";
pub const DEFAULT_BROWSER: &str = "firefox";

/// Appends the terms to `base`, joined with `+`.
pub fn search_url<S: AsRef<str>>(base: &str, terms: &[S]) -> String {
    let joined = terms
        .iter()
        .map(|term| term.as_ref())
        .collect::<Vec<_>>()
        .join("+");
    format!("{base}{joined}")
}

/// Starts `browser` on `url` and returns without waiting for it. The
/// browser gets its own process group so it outlives this process.
pub fn launch_detached(browser: &str, url: &str) -> Result<u32, KiraError> {
    let mut command = Command::new(browser);
    command
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    let child = command.spawn().map_err(|err| KiraError::BrowserLaunch {
        browser: browser.to_string(),
        message: err.to_string(),
    })?;
    tracing::debug!(pid = child.id(), %url, "browser launched");
    Ok(child.id())
}
