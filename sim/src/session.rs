//! One simulated editing session.
//!
//! A session owns its replica exclusively, so no locking is needed around
//! operation creation, receipt or resolution.

use std::sync::Arc;

use gridsync_engine::{
    value::fields, Change, FieldValue, Operation, Replica, Resolution, RowId, Table, Timestamp,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::relay::{Inbox, Relay};

/// Columns of the simulated report.
const FIELDS: [&str; 4] = ["name", "qty", "price", "shipped"];

#[derive(Debug)]
pub struct Session {
    replica: Replica,
    inbox: Inbox,
    rng: StdRng,
    /// Known row ids, including ones this session may have seen deleted
    rows: Vec<RowId>,
    inserted: usize,
}

impl Session {
    pub fn new(replica: Replica, inbox: Inbox, base: &Table, seed: u64) -> Self {
        Self {
            replica,
            inbox,
            rng: StdRng::seed_from_u64(seed),
            rows: base.rows().map(|r| r.id.clone()).collect(),
            inserted: 0,
        }
    }

    pub fn replica(&self) -> &Replica {
        &self.replica
    }

    /// Perform `edits` random edits, broadcasting each one and pulling
    /// whatever has arrived in between.
    pub async fn edit(mut self, edits: usize, relay: Arc<Relay>) -> Self {
        for _ in 0..edits {
            self.drain();
            let op = self.random_edit();
            relay.broadcast(self.replica.replica_id(), &op);
            tokio::task::yield_now().await;
        }
        tracing::debug!(
            replica = %self.replica.replica_id(),
            ops = self.replica.log().len(),
            "edit phase finished"
        );
        self
    }

    /// Receive everything currently in the inbox. Returns how many
    /// operations were new.
    pub fn drain(&mut self) -> usize {
        let mut fresh = 0;
        while let Ok(op) = self.inbox.try_recv() {
            if !self.rows.contains(&op.target_row_id) {
                self.rows.push(op.target_row_id.clone());
            }
            if self.replica.receive_operation(op) {
                fresh += 1;
            }
        }
        fresh
    }

    /// Resolve this session's log with its replica's options.
    pub fn resolve(&self, base: &Table) -> Resolution {
        self.replica.resolve(base)
    }

    fn random_edit(&mut self) -> Operation {
        let now = wall_clock_ms();
        let roll: f64 = self.rng.gen();

        if self.rows.is_empty() || roll < 0.15 {
            let row_id = format!("{}-new-{}", self.replica.replica_id(), self.inserted);
            self.inserted += 1;
            self.rows.push(row_id.clone());
            let change = Change::insert(fields([
                ("name", FieldValue::from(row_id.as_str())),
                ("qty", FieldValue::from(1i64)),
            ]));
            return self.replica.create_operation(row_id, change, now);
        }

        let row_id = self.rows[self.rng.gen_range(0..self.rows.len())].clone();
        if roll < 0.25 {
            return self.replica.create_operation(row_id, Change::Delete, now);
        }

        let field = FIELDS[self.rng.gen_range(0..FIELDS.len())];
        let value = match field {
            "name" => FieldValue::from(format!("item-{}", self.rng.gen_range(0..100))),
            "shipped" => FieldValue::Boolean(self.rng.gen()),
            _ => FieldValue::Number(f64::from(self.rng.gen_range(0..1000u32))),
        };
        self.replica
            .create_operation(row_id, Change::update(field, value), now)
    }
}

fn wall_clock_ms() -> Timestamp {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
}
