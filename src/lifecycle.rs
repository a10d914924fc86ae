//! Teardown of one request's server instance and transport
//!
//! Teardown can be triggered by normal completion, by a failure, or by the client
//! dropping the connection; whichever comes first wins and later triggers are no-ops.

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use tracing::debug;

use crate::{mcp::server::ServerInstance, transport::TransportHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownReason {
    Completed,
    Failed,
    ClientClosed,
}

impl fmt::Display for TeardownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::ClientClosed => "client_closed",
        })
    }
}

#[derive(Clone)]
pub struct Teardown {
    inner: Arc<TeardownInner>,
}

struct TeardownInner {
    torn_down: AtomicBool,
    server: Arc<dyn ServerInstance>,
    transport: TransportHandle,
}

impl Teardown {
    pub fn new(server: Arc<dyn ServerInstance>, transport: TransportHandle) -> Self {
        Self {
            inner: Arc::new(TeardownInner {
                torn_down: AtomicBool::new(false),
                server,
                transport,
            }),
        }
    }

    /// Closes the transport, then the server instance. Returns `false` when teardown
    /// had already happened.
    pub fn run(&self, reason: TeardownReason) -> bool {
        if self.inner.torn_down.swap(true, Ordering::AcqRel) {
            return false;
        }

        self.inner.transport.close();
        self.inner.server.close();
        debug!(%reason, "request torn down");
        true
    }

    #[cfg(test)]
    pub(crate) fn is_torn_down(&self) -> bool {
        self.inner.torn_down.load(Ordering::Acquire)
    }

    /// Returns a guard that tears down with `ClientClosed` if dropped before being
    /// resolved. Created when the exchange starts so a disconnect at any later
    /// point releases the instance.
    pub fn guard(&self) -> TeardownGuard {
        TeardownGuard {
            teardown: Some(self.clone()),
        }
    }
}

#[must_use = "dropping the guard tears the request down as client-closed"]
pub struct TeardownGuard {
    teardown: Option<Teardown>,
}

impl TeardownGuard {
    pub fn complete(mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown.run(TeardownReason::Completed);
        }
    }

    pub fn fail(mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown.run(TeardownReason::Failed);
        }
    }
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown.run(TeardownReason::ClientClosed);
        }
    }
}
