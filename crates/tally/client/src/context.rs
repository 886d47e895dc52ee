//! Connection contexts

use crate::agent::Agent;
use std::fmt;
use std::sync::Arc;
use tally_types::Identity;

/// An agent together with the identity its calls are attributed to.
#[derive(Clone)]
pub struct ConnectionContext {
    identity: Identity,
    agent: Arc<dyn Agent>,
}

impl ConnectionContext {
    pub fn new(agent: Arc<dyn Agent>) -> Self {
        Self {
            identity: agent.identity().clone(),
            agent,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn agent(&self) -> &Arc<dyn Agent> {
        &self.agent
    }
}

impl fmt::Debug for ConnectionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionContext")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}
