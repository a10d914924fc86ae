//! Outbound channel from a server instance to the client of the current exchange

use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::debug;

use crate::mcp::rpc::json_rpc_notification;

/// Handle used by a server instance to push messages ahead of its final response.
///
/// A peer is only valid for the exchange it was created for. Messages sent after the
/// exchange ended, or to a client that only accepts a single JSON reply, are dropped.
#[derive(Debug, Clone)]
pub struct Peer {
    outbound: Option<mpsc::UnboundedSender<Value>>,
}

impl Peer {
    pub fn new(outbound: mpsc::UnboundedSender<Value>) -> Self {
        Self {
            outbound: Some(outbound),
        }
    }

    pub fn detached() -> Self {
        Self { outbound: None }
    }

    pub fn notify(&self, method: &str, params: Value) -> bool {
        let Some(outbound) = self.outbound.as_ref() else {
            debug!(method, "dropping notification for client without event stream");
            return false;
        };

        outbound.send(json_rpc_notification(method, params)).is_ok()
    }

    pub fn notify_progress(&self, token: &Value, progress: u64, total: u64, message: &str) -> bool {
        self.notify(
            "notifications/progress",
            json!({
                "progressToken": token,
                "progress": progress,
                "total": total,
                "message": message,
            }),
        )
    }
}
