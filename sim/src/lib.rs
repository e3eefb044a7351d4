//! Gridsync Sim - concurrent editing sessions over an unreliable channel.
//!
//! Spawns one tokio task per replica. Each task edits a shared report table
//! and broadcasts its operations through a [`relay::Relay`] that reorders and
//! duplicates deliveries. Once every delivery has landed, each replica
//! resolves its own log and the run reports whether they all agree.

pub mod config;
pub mod error;
pub mod relay;
pub mod report;
pub mod session;

use std::collections::HashSet;
use std::sync::Arc;

use gridsync_engine::{
    value::fields, FieldValue, LogicalClock, Replica, ResolverOptions, Row, Table,
};
use tokio::task::JoinSet;

use crate::config::Config;
use crate::error::Result;
use crate::relay::Relay;
use crate::report::Report;
use crate::session::Session;

/// Base table every session starts from.
pub fn base_table(rows: usize) -> Table {
    (0..rows)
        .map(|i| {
            Row::new(
                format!("row-{i}"),
                fields([
                    ("name", FieldValue::from(format!("item-{i}"))),
                    ("qty", FieldValue::from(0i64)),
                ]),
                0,
                "base",
                LogicalClock::new(),
            )
        })
        .collect()
}

/// Run one simulation to completion.
pub async fn run(config: &Config) -> Result<Report> {
    let seed = config.seed.unwrap_or_else(rand::random);
    let base = base_table(config.rows);
    let relay = Relay::new_shared(config.duplicate_rate, seed);
    let options = ResolverOptions {
        grouping: config.grouping,
    };

    // Register every replica before any edit is broadcast.
    let mut sessions = Vec::with_capacity(config.replicas);
    for i in 0..config.replicas {
        let replica_id = format!("r{i}-{}", session_suffix());
        let replica = Replica::new(replica_id.clone())?.with_options(options);
        let inbox = relay.register(replica_id);
        sessions.push(Session::new(
            replica,
            inbox,
            &base,
            seed.wrapping_add(i as u64 + 1),
        ));
    }

    tracing::info!(
        replicas = relay.replica_count(),
        edits = config.edits,
        seed,
        "starting edit phase"
    );

    let mut tasks = JoinSet::new();
    for session in sessions {
        tasks.spawn(session.edit(config.edits, Arc::clone(&relay)));
    }

    let mut sessions = Vec::with_capacity(config.replicas);
    while let Some(joined) = tasks.join_next().await {
        sessions.push(joined?);
    }

    relay.wait_idle().await;
    for session in &mut sessions {
        session.drain();
    }
    sessions.sort_by(|a, b| a.replica().replica_id().cmp(b.replica().replica_id()));

    let operations = sessions
        .iter()
        .flat_map(|s| s.replica().log().iter().map(|op| op.id.clone()))
        .collect::<HashSet<_>>()
        .len();

    let resolutions: Vec<_> = sessions
        .iter()
        .map(|s| (s.replica().replica_id().clone(), s.resolve(&base)))
        .collect();

    let report = Report::from_resolutions(seed, operations, relay.delivered(), &resolutions);
    if report.converged {
        tracing::info!(
            operations = report.operations,
            conflicts = report.conflicts,
            rows = report.rows,
            "all replicas converged"
        );
    } else {
        tracing::error!(divergent = ?report.divergent, "replicas diverged");
    }
    Ok(report)
}

/// Short random suffix so replica ids are unique per run.
fn session_suffix() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}
