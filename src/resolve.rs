//! Management address lookup for matched records.
//!
//! Lookups go through the [`Resolver`] seam so tests can substitute a fixed
//! table; the production resolver shells out to `host`. Every failure of the
//! lookup command, including a program that cannot be found, is reported per
//! hostname and never stops the run.
use crate::config::ResolverConfig;
use crate::model::CanonicalDataset;
use crate::util::truncate_bytes;
use anyhow::{anyhow, Context, Result};
use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

const RESOLVED_MARKER: &str = "has address";
const MAX_STDERR_BYTES: usize = 512;
/// Extra time allowed for output to drain after the command has exited.
const DRAIN_GRACE: Duration = Duration::from_millis(250);

/// Name resolution capability. `Ok(None)` means the lookup ran but found no address.
pub trait Resolver {
    fn resolve(&self, hostname: &str) -> Result<Option<String>>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveSummary {
    pub attempted: usize,
    pub resolved: usize,
    pub failed: usize,
}

/// Runs the configured lookup command with the hostname as its last argument.
#[derive(Debug, Clone)]
pub struct HostCommandResolver {
    /// Program name as configured; located on `PATH` at each invocation.
    program: String,
    args: Vec<String>,
    timeout: Duration,
    retries: u32,
}

impl HostCommandResolver {
    pub fn from_config(config: &ResolverConfig) -> Result<Self> {
        let mut words = shell_words::split(&config.command)
            .with_context(|| format!("parse resolver command: {}", config.command))?;
        if words.is_empty() {
            return Err(anyhow!("resolver command is empty"));
        }
        let program = words.remove(0);
        Ok(Self {
            program,
            args: words,
            timeout: Duration::from_secs(config.timeout_secs),
            retries: config.retries,
        })
    }

    fn run_once(&self, hostname: &str) -> Result<String> {
        let program = which::which(&self.program)
            .with_context(|| format!("locate resolver program {}", self.program))?;
        let mut child = Command::new(&program)
            .args(&self.args)
            .arg(hostname)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawn resolver {}", program.display()))?;
        // Pipes drain on their own threads so a grandchild holding them open
        // cannot stall the timeout.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let start = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait().context("check resolver status")? {
                break status;
            }
            if start.elapsed() > self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(self.timed_out(hostname));
            }
            std::thread::sleep(Duration::from_millis(25));
        };

        let deadline = start + self.timeout + DRAIN_GRACE;
        let stdout = collect_pipe(&stdout, deadline).ok_or_else(|| self.timed_out(hostname))?;
        if !status.success() {
            let stderr = collect_pipe(&stderr, deadline).unwrap_or_default();
            tracing::debug!(
                hostname,
                %status,
                stderr = %truncate_bytes(&stderr, MAX_STDERR_BYTES),
                "resolver exited unsuccessfully"
            );
        }
        Ok(String::from_utf8_lossy(&stdout).to_string())
    }

    fn timed_out(&self, hostname: &str) -> anyhow::Error {
        anyhow!(
            "resolver timed out after {}s for {hostname}",
            self.timeout.as_secs()
        )
    }
}

/// Read a child pipe to EOF on a background thread.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    if let Some(mut pipe) = pipe {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            let _ = tx.send(buf);
        });
    }
    rx
}

/// Bytes from a [`drain`] thread, or `None` if the pipe is still open at `deadline`.
fn collect_pipe(rx: &Receiver<Vec<u8>>, deadline: Instant) -> Option<Vec<u8>> {
    let wait = deadline.saturating_duration_since(Instant::now()).max(DRAIN_GRACE);
    match rx.recv_timeout(wait) {
        Ok(bytes) => Some(bytes),
        Err(RecvTimeoutError::Disconnected) => Some(Vec::new()),
        Err(RecvTimeoutError::Timeout) => None,
    }
}

impl Resolver for HostCommandResolver {
    fn resolve(&self, hostname: &str) -> Result<Option<String>> {
        let mut last_err = None;
        for attempt in 0..=self.retries {
            match self.run_once(hostname) {
                Ok(stdout) => return Ok(parse_host_output(&stdout)),
                Err(err) => {
                    tracing::debug!(hostname, attempt, "resolver attempt failed: {err:#}");
                    last_err = Some(err);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow!("resolver never ran for {hostname}")))
    }
}

/// First address reported on a `has address` line.
pub fn parse_host_output(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .filter(|line| line.contains(RESOLVED_MARKER))
        .filter_map(|line| line.rsplit(RESOLVED_MARKER).next())
        .map(str::trim)
        .find(|address| !address.is_empty())
        .map(str::to_string)
}

pub fn management_hostname(node: &str, domain: &str) -> String {
    format!("{node}-mgmt.{domain}")
}

/// Resolve every matched record once, in tag order.
pub fn resolve_addresses(
    dataset: &mut CanonicalDataset,
    resolver: &dyn Resolver,
    domain: &str,
) -> ResolveSummary {
    let mut summary = ResolveSummary::default();
    for record in dataset.values_mut() {
        let Some(node) = record.node.as_deref().filter(|node| !node.is_empty()) else {
            continue;
        };
        let hostname = management_hostname(node, domain);
        summary.attempted += 1;
        match resolver.resolve(&hostname) {
            Ok(Some(address)) => {
                tracing::info!(node, %address, "resolved management address");
                record.management_address = Some(address);
                summary.resolved += 1;
            }
            Ok(None) => tracing::warn!(node, %hostname, "no address in resolver output"),
            Err(err) => {
                tracing::warn!(node, %hostname, "resolver failed: {err:#}");
                summary.failed += 1;
            }
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AssetRecord;
    use std::collections::BTreeMap;

    struct TableResolver(BTreeMap<String, String>);

    impl Resolver for TableResolver {
        fn resolve(&self, hostname: &str) -> Result<Option<String>> {
            if hostname.starts_with("broken") {
                return Err(anyhow!("lookup exploded"));
            }
            Ok(self.0.get(hostname).cloned())
        }
    }

    #[test]
    fn parses_first_address_line() {
        let stdout = "n1-mgmt.example.edu is an alias for x.example.edu.\n\
                      x.example.edu has address 10.0.0.5\n\
                      x.example.edu has address 10.0.0.6\n";
        assert_eq!(parse_host_output(stdout), Some("10.0.0.5".to_string()));
    }

    #[test]
    fn no_address_line_yields_none() {
        let stdout = "Host n1-mgmt.example.edu not found: 3(NXDOMAIN)\n";
        assert_eq!(parse_host_output(stdout), None);
        assert_eq!(parse_host_output(""), None);
    }

    #[test]
    fn hostname_uses_mgmt_suffix() {
        assert_eq!(
            management_hostname("node07", "cluster.example.edu"),
            "node07-mgmt.cluster.example.edu"
        );
    }

    #[test]
    fn only_matched_records_are_resolved_and_failures_are_contained() {
        let mut dataset = CanonicalDataset::new();
        let mut a = AssetRecord::new("A1", "2024-01-01");
        a.node = Some("node07".to_string());
        let mut b = AssetRecord::new("B2", "2024-02-02");
        b.node = Some("broken01".to_string());
        let c = AssetRecord::new("C3", "2024-03-03");
        for record in [a, b, c] {
            dataset.insert(record.tag.clone(), record);
        }
        let resolver = TableResolver(BTreeMap::from([(
            "node07-mgmt.example.edu".to_string(),
            "10.0.0.5".to_string(),
        )]));

        let summary = resolve_addresses(&mut dataset, &resolver, "example.edu");

        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.resolved, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(dataset["A1"].management_address.as_deref(), Some("10.0.0.5"));
        assert_eq!(dataset["B2"].management_address, None);
        assert_eq!(dataset["C3"].management_address, None);
    }

    #[test]
    fn command_resolver_reads_stdout() {
        let Ok(sh) = which::which("sh") else {
            return;
        };
        let config = ResolverConfig {
            enabled: true,
            command: format!("{} -c 'echo \"$0 has address 192.0.2.7\"'", sh.display()),
            timeout_secs: 5,
            retries: 0,
        };
        let resolver = HostCommandResolver::from_config(&config).expect("build resolver");
        let address = resolver.resolve("n1-mgmt.example.edu").expect("resolve");
        assert_eq!(address.as_deref(), Some("192.0.2.7"));
    }

    #[test]
    fn command_resolver_times_out() {
        let Ok(sh) = which::which("sh") else {
            return;
        };
        let config = ResolverConfig {
            enabled: true,
            command: format!("{} -c 'sleep 2'", sh.display()),
            timeout_secs: 0,
            retries: 1,
        };
        let resolver = HostCommandResolver::from_config(&config).expect("build resolver");
        let err = resolver.resolve("n1").expect_err("should time out");
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn timeout_holds_when_grandchild_keeps_pipes_open() {
        let Ok(sh) = which::which("sh") else {
            return;
        };
        let config = ResolverConfig {
            enabled: true,
            command: format!("{} -c 'sleep 6; echo x'", sh.display()),
            timeout_secs: 1,
            retries: 0,
        };
        let resolver = HostCommandResolver::from_config(&config).expect("build resolver");

        let start = Instant::now();
        let err = resolver.resolve("n1").expect_err("should time out");

        assert!(err.to_string().contains("timed out"));
        assert!(
            start.elapsed() < Duration::from_secs(4),
            "took {:?}",
            start.elapsed()
        );
    }

    #[test]
    fn missing_program_fails_per_lookup() {
        let config = ResolverConfig {
            enabled: true,
            command: "invsync-no-such-resolver --flag".to_string(),
            timeout_secs: 1,
            retries: 1,
        };
        let resolver = HostCommandResolver::from_config(&config).expect("build resolver");

        let err = resolver.resolve("n1-mgmt.example.edu").expect_err("lookup fails");
        assert!(format!("{err:#}").contains("invsync-no-such-resolver"));

        let mut dataset = CanonicalDataset::new();
        let mut record = AssetRecord::new("A1", "2024-01-01");
        record.node = Some("node07".to_string());
        dataset.insert(record.tag.clone(), record);
        let summary = resolve_addresses(&mut dataset, &resolver, "example.edu");
        assert_eq!(summary.failed, 1);
        assert_eq!(dataset["A1"].management_address, None);
    }
}
