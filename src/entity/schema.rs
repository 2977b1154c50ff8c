//! Static field tables for the records emitted by the administrative tool.
//!
//! Every record type declares, once, which tool key fills which field and how
//! the raw value is converted. The unmarshaler walks these tables instead of
//! inspecting types at runtime.

use chrono::{DateTime, Utc};

use super::types::{Cluster, Connection, Infobase, Session};

/// Typed accessor to one field of a record.
pub enum Slot<R> {
    Text(fn(&mut R) -> &mut String),
    Integer(fn(&mut R) -> &mut i64),
    Timestamp(fn(&mut R) -> &mut Option<DateTime<Utc>>),
}

/// One row of a record schema: field name, tool key and accessor.
pub struct FieldSpec<R: 'static> {
    pub name: &'static str,
    pub key: &'static str,
    pub slot: Slot<R>,
}

/// A record that can be rebuilt from a block of `key : value` lines.
pub trait Record: Default + PartialEq + Send + 'static {
    /// Human readable name used in logs.
    const KIND: &'static str;

    fn fields() -> &'static [FieldSpec<Self>];

    fn field(key: &str) -> Option<&'static FieldSpec<Self>> {
        Self::fields().iter().find(|f| f.key == key)
    }
}

macro_rules! record_schema {
    (@field $record:ty, $key:literal, $field:ident, Text) => {
        FieldSpec {
            name: stringify!($field),
            key: $key,
            slot: Slot::Text({
                fn slot(r: &mut $record) -> &mut String {
                    &mut r.$field
                }
                slot
            }),
        }
    };
    (@field $record:ty, $key:literal, $field:ident, Integer) => {
        FieldSpec {
            name: stringify!($field),
            key: $key,
            slot: Slot::Integer({
                fn slot(r: &mut $record) -> &mut i64 {
                    &mut r.$field
                }
                slot
            }),
        }
    };
    (@field $record:ty, $key:literal, $field:ident, Timestamp) => {
        FieldSpec {
            name: stringify!($field),
            key: $key,
            slot: Slot::Timestamp({
                fn slot(r: &mut $record) -> &mut Option<DateTime<Utc>> {
                    &mut r.$field
                }
                slot
            }),
        }
    };
    ($record:ty, $kind:literal, { $($key:literal => $field:ident : $slot:ident),* $(,)? }) => {
        impl Record for $record {
            const KIND: &'static str = $kind;

            fn fields() -> &'static [FieldSpec<Self>] {
                const FIELDS: &[FieldSpec<$record>] = &[
                    $(record_schema!(@field $record, $key, $field, $slot)),*
                ];
                FIELDS
            }
        }
    };
}

record_schema!(Cluster, "cluster", {
    "cluster" => id: Text,
    "host" => host: Text,
    "port" => port: Text,
    "name" => name: Text,
    "expiration-timeout" => expiration_timeout: Integer,
    "lifetime-limit" => lifetime_limit: Integer,
    "max-memory-size" => max_memory_size: Integer,
    "max-memory-time-limit" => max_memory_time_limit: Integer,
    "security-level" => security_level: Integer,
    "session-fault-tolerance-level" => session_fault_tolerance_level: Integer,
    "load-balancing-mode" => load_balancing_mode: Integer,
    "errors-count-threshold" => errors_count_threshold: Integer,
    "kill-problem-processes" => kill_problem_processes: Integer,
});

record_schema!(Infobase, "infobase", {
    "infobase" => id: Text,
    "name" => name: Text,
    "descr" => desc: Text,
});

record_schema!(Session, "session", {
    "session" => id: Text,
    "session-id" => session_id: Integer,
    "infobase" => infobase_id: Text,
    "connection" => connection_id: Text,
    "process" => process_id: Text,
    "user-name" => user_name: Text,
    "host" => host: Text,
    "app-id" => app_id: Text,
    "locale" => locale: Text,
    "started-at" => started_at: Timestamp,
    "last-active-at" => last_active_at: Timestamp,
    "hibernate" => hibernate: Text,
    "passive-session-hibernate-time" => passive_session_hibernate_time: Integer,
    "hibernate-session-terminate-time" => hibernate_session_terminate_time: Integer,
    "blocked-by-dbms" => blocked_by_dbms: Integer,
    "blocked-by-ls" => blocked_by_ls: Integer,
    "bytes-all" => bytes_all: Integer,
    "bytes-last-5min" => bytes_last_5min: Integer,
    "calls-all" => calls_all: Integer,
    "calls-last-5min" => calls_last_5min: Integer,
    "dbms-bytes-all" => dbms_bytes_all: Integer,
    "dbms-bytes-last-5min" => dbms_bytes_last_5min: Integer,
    "db-proc-info" => db_proc_info: Text,
    "db-proc-took" => db_proc_took: Integer,
    "db-proc-took-at" => db_proc_took_at: Timestamp,
    "duration-all" => duration_all: Integer,
    "duration-all-dbms" => duration_all_dbms: Integer,
    "duration-current" => duration_current: Integer,
    "duration-current-dbms" => duration_current_dbms: Integer,
    "duration-last-5min" => duration_last_5min: Integer,
    "duration-last-5min-dbms" => duration_last_5min_dbms: Integer,
    "memory-current" => memory_current: Integer,
    "memory-last-5min" => memory_last_5min: Integer,
    "memory-total" => memory_total: Integer,
    "read-current" => read_current: Integer,
    "read-last-5min" => read_last_5min: Integer,
    "read-total" => read_total: Integer,
    "write-current" => write_current: Integer,
    "write-last-5min" => write_last_5min: Integer,
    "write-total" => write_total: Integer,
    "duration-current-service" => duration_current_service: Integer,
    "duration-last-5min-service" => duration_last_5min_service: Integer,
    "duration-all-service" => duration_all_service: Integer,
    "current-service-name" => current_service_name: Text,
    "cpu-time-current" => cpu_time_current: Integer,
    "cpu-time-last-5min" => cpu_time_last_5min: Integer,
    "cpu-time-total" => cpu_time_total: Integer,
    "data-separation" => data_separation: Text,
    "client-ip" => client_ip: Text,
});

record_schema!(Connection, "connection", {
    "connection" => id: Text,
    "conn-id" => conn_id: Integer,
    "infobase" => infobase_id: Text,
    "process" => process_id: Text,
    "host" => host: Text,
    "application" => app_id: Text,
    "connected-at" => connected_at: Timestamp,
    "session-number" => session_number: Integer,
    "blocked-by-ls" => blocked_by_ls: Integer,
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn assert_unique_keys<R: Record>() {
        let mut seen = HashSet::new();
        for f in R::fields() {
            assert!(seen.insert(f.key), "{} declares {} twice", R::KIND, f.key);
            assert_eq!(f.key, f.key.to_lowercase());
        }
    }

    #[test]
    fn schema_keys_are_unique_and_lowercase() {
        assert_unique_keys::<Cluster>();
        assert_unique_keys::<Infobase>();
        assert_unique_keys::<Session>();
        assert_unique_keys::<Connection>();
    }

    #[test]
    fn primary_key_maps_to_id() {
        assert_eq!(Cluster::field("cluster").map(|f| f.name), Some("id"));
        assert_eq!(Infobase::field("infobase").map(|f| f.name), Some("id"));
        assert_eq!(Session::field("session").map(|f| f.name), Some("id"));
        assert_eq!(Connection::field("connection").map(|f| f.name), Some("id"));
        assert!(Cluster::field("ghost").is_none());
    }

    #[test]
    fn slot_writes_the_declared_field() {
        let mut cluster = Cluster::default();
        match Cluster::field("expiration-timeout").map(|f| &f.slot) {
            Some(Slot::Integer(slot)) => *slot(&mut cluster) = 42,
            _ => panic!("expiration-timeout should be an integer field"),
        }
        assert_eq!(cluster.expiration_timeout, 42);
    }
}
