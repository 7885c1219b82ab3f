//! Low-latency preference fan-out between instances of the same family.
//!
//! Runs next to the storage backend's own change notification. Both paths
//! carry the same logical [`BroadcastMessage`], so receivers apply each field
//! idempotently and duplicates or reordering across paths are harmless.

use serde::{Deserialize, Deserializer, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};

/// Snapshot of preferences. A missing field means "unchanged".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caret_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointer_color: Option<String>,
    #[serde(
        default,
        deserialize_with = "loose_int",
        skip_serializing_if = "Option::is_none"
    )]
    pub pointer_size: Option<i64>,
    #[serde(
        default,
        deserialize_with = "loose_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub pointer_enabled: Option<bool>,
    #[serde(
        default,
        deserialize_with = "loose_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub caret_enabled: Option<bool>,
}

impl BroadcastMessage {
    pub fn is_empty(&self) -> bool {
        self.caret_color.is_none()
            && self.pointer_color.is_none()
            && self.pointer_size.is_none()
            && self.pointer_enabled.is_none()
            && self.caret_enabled.is_none()
    }
}

// Peers may send flags as `true` or `"true"`.
fn loose_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Bool(b) => Some(b),
        serde_json::Value::String(s) => Some(s == "true"),
        _ => None,
    })
}

// Sizes may arrive as numbers or as strings like "14".
fn loose_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        serde_json::Value::String(s) => crate::prefs::parse_leading_int(&s),
        _ => None,
    })
}

/// A best-effort broadcast medium. Payloads are JSON strings.
pub trait BroadcastTransport {
    fn publish(&self, payload: &str) -> anyhow::Result<()>;
    /// Next payload sent by another member, if any is waiting.
    fn try_recv(&self) -> Option<String>;
}

struct Envelope {
    sender: u64,
    payload: String,
}

struct Member {
    id: u64,
    tx: Sender<Envelope>,
}

/// In-process broadcast medium shared by every instance of a family.
#[derive(Clone, Default)]
pub struct BroadcastFamily {
    members: Rc<RefCell<Vec<Member>>>,
    next_id: Rc<Cell<u64>>,
}

impl BroadcastFamily {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&self) -> FamilyEndpoint {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        let (tx, rx) = channel();
        self.members.borrow_mut().push(Member { id, tx });
        FamilyEndpoint {
            id,
            family: self.clone(),
            rx,
        }
    }

    pub fn member_count(&self) -> usize {
        self.members.borrow().len()
    }
}

pub struct FamilyEndpoint {
    id: u64,
    family: BroadcastFamily,
    rx: Receiver<Envelope>,
}

impl FamilyEndpoint {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl BroadcastTransport for FamilyEndpoint {
    fn publish(&self, payload: &str) -> anyhow::Result<()> {
        let mut members = self.family.members.borrow_mut();
        // never deliver back to the sender; forget members that hung up
        members.retain(|m| {
            if m.id == self.id {
                return true;
            }
            m.tx
                .send(Envelope {
                    sender: self.id,
                    payload: payload.to_string(),
                })
                .is_ok()
        });
        Ok(())
    }

    fn try_recv(&self) -> Option<String> {
        loop {
            match self.rx.try_recv() {
                Ok(env) if env.sender == self.id => continue,
                Ok(env) => return Some(env.payload),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return None,
            }
        }
    }
}

impl Drop for FamilyEndpoint {
    fn drop(&mut self) {
        let id = self.id;
        if let Ok(mut members) = self.family.members.try_borrow_mut() {
            members.retain(|m| m.id != id);
        }
    }
}

/// Publish/subscribe front over an optional transport.
///
/// Without a transport `publish` is a no-op and `drain` yields nothing;
/// convergence then relies on the backend's change notification alone.
pub struct ChangeBus {
    transport: Option<Box<dyn BroadcastTransport>>,
}

impl ChangeBus {
    pub fn new(transport: Box<dyn BroadcastTransport>) -> Self {
        Self {
            transport: Some(transport),
        }
    }

    pub fn unavailable() -> Self {
        Self { transport: None }
    }

    pub fn is_available(&self) -> bool {
        self.transport.is_some()
    }

    pub fn publish(&self, message: &BroadcastMessage) {
        let Some(transport) = &self.transport else {
            return;
        };
        let result = serde_json::to_string(message)
            .map_err(anyhow::Error::from)
            .and_then(|payload| transport.publish(&payload));
        if let Err(err) = result {
            tracing::debug!(?err, "broadcast publish failed");
        }
    }

    /// Every message received since the last call, oldest first.
    pub fn drain(&self) -> Vec<BroadcastMessage> {
        let Some(transport) = &self.transport else {
            return Vec::new();
        };
        let mut out = Vec::new();
        while let Some(payload) = transport.try_recv() {
            match serde_json::from_str::<BroadcastMessage>(&payload) {
                Ok(msg) => out.push(msg),
                Err(err) => tracing::debug!(?err, "ignoring malformed broadcast payload"),
            }
        }
        out
    }
}
