//! Account-request follow-through for the provisioning playbook.
//!
//! Requests arrive from the ticket tracker; each one is provisioned by an
//! external command and, only when that succeeds, its ticket is moved to the
//! waiting state and handed back to the caller's account. The tracker client
//! itself lives outside this crate behind [`TicketTracker`].
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Transition a provisioned ticket is moved to.
pub const WAITING_TRANSITION: &str = "Waiting for customer";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRequest {
    pub first_name: String,
    pub last_name: String,
    /// Research group the account joins.
    pub group: String,
    pub ticket_key: String,
}

impl AccountRequest {
    /// `key=value` pairs handed to the playbook.
    pub fn extra_vars(&self) -> String {
        format!(
            "first={} last={} pirg={} skip_confirmation=false",
            shell_words::quote(&self.first_name),
            shell_words::quote(&self.last_name),
            shell_words::quote(&self.group)
        )
    }
}

/// Creates the account. `Ok(false)` means the tool ran and reported failure.
pub trait Provisioner {
    fn provision(&self, request: &AccountRequest) -> Result<bool>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub id: String,
    pub name: String,
}

pub trait TicketTracker {
    fn transitions(&self, ticket_key: &str) -> Result<Vec<Transition>>;
    fn apply_transition(&self, ticket_key: &str, transition_id: &str) -> Result<()>;
    fn current_account_id(&self) -> Result<String>;
    fn assign(&self, ticket_key: &str, account_id: &str) -> Result<()>;
}

/// Runs a configured command with `--extra-vars` appended.
#[derive(Debug, Clone)]
pub struct CommandProvisioner {
    argv: Vec<String>,
    current_dir: Option<PathBuf>,
}

impl CommandProvisioner {
    pub fn from_command(command: &str, current_dir: Option<PathBuf>) -> Result<Self> {
        let argv = shell_words::split(command)
            .with_context(|| format!("parse provisioning command: {command}"))?;
        if argv.is_empty() {
            return Err(anyhow!("provisioning command is empty"));
        }
        Ok(Self { argv, current_dir })
    }
}

impl Provisioner for CommandProvisioner {
    fn provision(&self, request: &AccountRequest) -> Result<bool> {
        let mut command = Command::new(&self.argv[0]);
        command
            .args(&self.argv[1..])
            .arg("--extra-vars")
            .arg(request.extra_vars())
            .stdin(Stdio::null());
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        let status = command
            .status()
            .with_context(|| format!("run provisioning command: {}", self.argv[0]))?;
        if !status.success() {
            tracing::warn!(ticket = %request.ticket_key, %status, "provisioning command failed");
        }
        Ok(status.success())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Completed,
    ProvisionFailed,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountOutcome {
    pub ticket_key: String,
    pub status: AccountStatus,
}

/// Provision each request and update its ticket on success.
pub fn process_account_requests(
    requests: &[AccountRequest],
    provisioner: &dyn Provisioner,
    tracker: &dyn TicketTracker,
) -> Vec<AccountOutcome> {
    requests
        .iter()
        .map(|request| {
            let status = match process_one(request, provisioner, tracker) {
                Ok(true) => AccountStatus::Completed,
                Ok(false) => AccountStatus::ProvisionFailed,
                Err(err) => {
                    tracing::warn!(ticket = %request.ticket_key, "account request failed: {err:#}");
                    AccountStatus::Error(format!("{err:#}"))
                }
            };
            AccountOutcome {
                ticket_key: request.ticket_key.clone(),
                status,
            }
        })
        .collect()
}

fn process_one(
    request: &AccountRequest,
    provisioner: &dyn Provisioner,
    tracker: &dyn TicketTracker,
) -> Result<bool> {
    let ticket = request.ticket_key.as_str();
    if !provisioner.provision(request)? {
        return Ok(false);
    }
    let transitions = tracker
        .transitions(ticket)
        .with_context(|| format!("list transitions for {ticket}"))?;
    let waiting = transitions
        .iter()
        .find(|transition| transition.name.eq_ignore_ascii_case(WAITING_TRANSITION))
        .ok_or_else(|| anyhow!("no '{WAITING_TRANSITION}' transition for {ticket}"))?;
    tracker
        .apply_transition(ticket, &waiting.id)
        .with_context(|| format!("transition {ticket}"))?;
    let account = tracker.current_account_id().context("look up current account")?;
    tracker
        .assign(ticket, &account)
        .with_context(|| format!("assign {ticket}"))?;
    tracing::info!(ticket, "account provisioned and ticket handed back");
    Ok(true)
}
