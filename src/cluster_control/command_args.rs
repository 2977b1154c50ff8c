//! Argument vectors for the administrative tool.
//!
//! Every flag travels as a single `--flag=value` argument, which is the form
//! the tool itself documents. Credentials are appended only when present.

use chrono::{DateTime, Duration, Local};

use crate::entity::{Cluster, Connection, Credentials, Infobase, Session};

/// Message shown to users while new sessions are denied.
pub const DENIED_MESSAGE: &str = "БАЗА ЗАКРЫТА НА СОЗДАНИЕ РЕЗЕРВНОЙ КОПИИ";

/// Layout of the `--denied-from` / `--denied-to` values.
pub const DENIAL_TIME_FORMAT: &str = "%m-%d-%Y %H:%M:%S";

/// Length of the denial window opened by [`disable_sessions`].
pub const DENIAL_WINDOW_MINUTES: i64 = 60;

struct ArgsBuilder {
    args: Vec<String>,
}

impl ArgsBuilder {
    fn new(entrypoint: &str, words: &[&str]) -> Self {
        let mut args = Vec::with_capacity(words.len() + 8);
        args.push(entrypoint.to_string());
        args.extend(words.iter().map(|w| w.to_string()));
        Self { args }
    }

    fn flag(mut self, name: &str, value: impl AsRef<str>) -> Self {
        self.args.push(format!("--{}={}", name, value.as_ref()));
        self
    }

    fn switch(self, name: &str, on: bool) -> Self {
        self.flag(name, if on { "on" } else { "off" })
    }

    fn credentials(mut self, prefix: &str, cred: Option<&Credentials>) -> Self {
        if let Some(cred) = cred.filter(|c| !c.is_empty()) {
            self = self
                .flag(&format!("{}-user", prefix), &cred.name)
                .flag(&format!("{}-pwd", prefix), &cred.password);
        }
        self
    }

    fn infobase_filter(self, infobase: Option<&Infobase>) -> Self {
        match infobase {
            Some(ib) => self.flag("infobase", &ib.id),
            None => self,
        }
    }

    fn build(self) -> Vec<String> {
        self.args
    }
}

pub fn cluster_list(entrypoint: &str) -> Vec<String> {
    ArgsBuilder::new(entrypoint, &["cluster", "list"]).build()
}

pub fn infobase_list(
    entrypoint: &str,
    cluster: &Cluster,
    cluster_cred: Option<&Credentials>,
) -> Vec<String> {
    ArgsBuilder::new(entrypoint, &["infobase", "summary", "list"])
        .flag("cluster", &cluster.id)
        .credentials("cluster", cluster_cred)
        .build()
}

pub fn session_list(
    entrypoint: &str,
    cluster: &Cluster,
    infobase: Option<&Infobase>,
    cluster_cred: Option<&Credentials>,
) -> Vec<String> {
    ArgsBuilder::new(entrypoint, &["session", "list"])
        .flag("cluster", &cluster.id)
        .infobase_filter(infobase)
        .credentials("cluster", cluster_cred)
        .build()
}

pub fn connection_list(
    entrypoint: &str,
    cluster: &Cluster,
    infobase: Option<&Infobase>,
    cluster_cred: Option<&Credentials>,
) -> Vec<String> {
    ArgsBuilder::new(entrypoint, &["connection", "list"])
        .flag("cluster", &cluster.id)
        .infobase_filter(infobase)
        .credentials("cluster", cluster_cred)
        .build()
}

/// Denies new sessions and scheduled jobs from `now` for
/// [`DENIAL_WINDOW_MINUTES`].
pub fn disable_sessions(
    entrypoint: &str,
    cluster: &Cluster,
    infobase: &Infobase,
    cluster_cred: Option<&Credentials>,
    infobase_cred: Option<&Credentials>,
    lock_code: &str,
    now: DateTime<Local>,
) -> Vec<String> {
    let until = now + Duration::minutes(DENIAL_WINDOW_MINUTES);

    ArgsBuilder::new(entrypoint, &["infobase", "update"])
        .flag("cluster", &cluster.id)
        .flag("infobase", &infobase.id)
        .flag("denied-from", now.format(DENIAL_TIME_FORMAT).to_string())
        .flag("denied-message", DENIED_MESSAGE)
        .flag("denied-to", until.format(DENIAL_TIME_FORMAT).to_string())
        .flag("permission-code", lock_code)
        .switch("scheduled-jobs-deny", true)
        .switch("sessions-deny", true)
        .credentials("cluster", cluster_cred)
        .credentials("infobase", infobase_cred)
        .build()
}

pub fn enable_sessions(
    entrypoint: &str,
    cluster: &Cluster,
    infobase: &Infobase,
    cluster_cred: Option<&Credentials>,
    infobase_cred: Option<&Credentials>,
    lock_code: &str,
) -> Vec<String> {
    ArgsBuilder::new(entrypoint, &["infobase", "update"])
        .flag("cluster", &cluster.id)
        .flag("infobase", &infobase.id)
        .flag("permission-code", lock_code)
        .switch("scheduled-jobs-deny", false)
        .switch("sessions-deny", false)
        .credentials("cluster", cluster_cred)
        .credentials("infobase", infobase_cred)
        .build()
}

pub fn terminate_session(
    entrypoint: &str,
    cluster: &Cluster,
    session: &Session,
    cluster_cred: Option<&Credentials>,
) -> Vec<String> {
    ArgsBuilder::new(entrypoint, &["session", "terminate"])
        .flag("cluster", &cluster.id)
        .flag("session", &session.id)
        .credentials("cluster", cluster_cred)
        .build()
}

pub fn disconnect_connection(
    entrypoint: &str,
    cluster: &Cluster,
    connection: &Connection,
    cluster_cred: Option<&Credentials>,
) -> Vec<String> {
    let mut builder = ArgsBuilder::new(entrypoint, &["connection", "disconnect"])
        .flag("cluster", &cluster.id)
        .flag("connection", &connection.id);
    // the tool refuses to disconnect without the owning process
    if !connection.process_id.is_empty() {
        builder = builder.flag("process", &connection.process_id);
    }
    builder.credentials("cluster", cluster_cred).build()
}
