//! Remote collaborators of the layout pipeline: the image upload endpoint
//! and the analysis/layout agent.

pub mod agent;
pub mod canned;
pub mod error;
pub mod transport;

pub use agent::{HttpAgentClient, LayoutAgent};
pub use canned::CannedAgent;
pub use error::{AgentError, TransportError};
pub use transport::{HttpImageTransport, ImageTransport, InlineTransport, upload_name};
