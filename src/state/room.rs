//! The Room - shared membership registry and broadcast fan-out point.
//!
//! All joined sessions live in one map behind a single mutex. Broadcast is
//! enqueue-only: while the lock is held the room does per-member pointer
//! work on mailboxes and nothing else, so delivery latency to healthy
//! recipients does not depend on any peer's transport speed. The raw map is
//! never exposed.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::RoomError;
use crate::protocol;
use crate::state::ids::SessionId;
use crate::state::mailbox::{Mailbox, OverflowPolicy, PushOutcome};

/// A joined participant as the room sees it.
#[derive(Clone)]
pub struct Member {
    pub username: String,
    pub mailbox: Mailbox,
}

/// The shared registry of joined sessions.
pub struct Room {
    members: Mutex<HashMap<SessionId, Member>>,
    policy: OverflowPolicy,
}

impl Room {
    pub fn new(policy: OverflowPolicy) -> Self {
        Self {
            members: Mutex::new(HashMap::new()),
            policy,
        }
    }

    /// Number of joined members.
    pub fn len(&self) -> usize {
        self.members.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Usernames of every member except `exclude`.
    pub fn usernames(&self, exclude: Option<SessionId>) -> Vec<String> {
        self.members
            .lock()
            .iter()
            .filter(|(id, _)| Some(**id) != exclude)
            .map(|(_, member)| member.username.clone())
            .collect()
    }

    /// Admit a member: deliver the roster to the joiner, announce the entry
    /// to everyone else, and insert, all under one lock acquisition. The
    /// roster a joiner receives therefore names exactly the members present
    /// strictly before it.
    ///
    /// Inserting is idempotent by id; an existing entry is overwritten and
    /// its mailbox closed. Returns the number of other members.
    pub fn join(&self, id: SessionId, member: Member) -> Result<usize, RoomError> {
        if member.username.is_empty() {
            return Err(RoomError::InvalidSession);
        }

        let mut members = self.members.lock();
        let others: Vec<String> = members
            .iter()
            .filter(|(other, _)| **other != id)
            .map(|(_, m)| m.username.clone())
            .collect();
        let count = others.len();

        let roster: Arc<str> = protocol::roster(&others).into();
        let _ = member.mailbox.push(roster, self.policy);

        let entry: Arc<str> = protocol::entered(&member.username).into();
        let stalled = self.fan_out(&members, &entry, Some(id));

        if let Some(old) = members.insert(id, member) {
            old.mailbox.close();
        }
        self.evict(&mut members, stalled);
        Ok(count)
    }

    /// Remove a member and, if it was present, announce the departure to the
    /// remaining members under the same lock acquisition. A no-op when the
    /// member is already gone, so duplicate teardown calls announce at most
    /// once. Returns the removed member's username.
    pub fn leave(&self, id: SessionId) -> Option<String> {
        let mut members = self.members.lock();
        let member = members.remove(&id)?;
        member.mailbox.close();

        let line: Arc<str> = protocol::left(&member.username).into();
        let stalled = self.fan_out(&members, &line, None);
        self.evict(&mut members, stalled);
        Some(member.username)
    }

    /// Deliver `line` to every member except `exclude`. Enqueue-only:
    /// returns once every enqueue has been attempted, without waiting for
    /// any transport write.
    pub fn broadcast(&self, line: &str, exclude: Option<SessionId>) {
        let line: Arc<str> = Arc::from(line);
        let mut members = self.members.lock();
        let stalled = self.fan_out(&members, &line, exclude);
        self.evict(&mut members, stalled);
    }

    /// Enqueue `line` on each member's mailbox, returning the members whose
    /// mailbox was full under the disconnect policy.
    fn fan_out(
        &self,
        members: &HashMap<SessionId, Member>,
        line: &Arc<str>,
        exclude: Option<SessionId>,
    ) -> Vec<SessionId> {
        let mut stalled = Vec::new();
        for (id, member) in members.iter() {
            if Some(*id) == exclude {
                continue;
            }
            match member.mailbox.push(Arc::clone(line), self.policy) {
                PushOutcome::Queued | PushOutcome::Closed => {}
                PushOutcome::DroppedOldest => {
                    debug!(%id, "mailbox full, dropped oldest pending line");
                }
                PushOutcome::Full => stalled.push(*id),
            }
        }
        stalled
    }

    /// Remove members whose mailbox overflowed, announcing each departure to
    /// the survivors. An announcement can overflow further mailboxes, so
    /// eviction runs to a fixed point; each step removes a member, bounding
    /// the loop by membership size.
    fn evict(&self, members: &mut HashMap<SessionId, Member>, mut stalled: Vec<SessionId>) {
        while let Some(id) = stalled.pop() {
            let Some(member) = members.remove(&id) else {
                continue;
            };
            member.mailbox.close();
            info!(%id, username = %member.username, "slow consumer evicted");

            let line: Arc<str> = protocol::left(&member.username).into();
            stalled.extend(self.fan_out(members, &line, None));
        }
    }
}
