use thiserror::Error;

use crate::graph::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("a profile named '{0}' is already registered")]
    DuplicateRegistration(String),
    #[error("event node {0} does not exist")]
    UnknownNode(NodeId),
}
