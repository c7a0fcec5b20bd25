//! Built-in resources.

use beacon_core::ConfigurationError;

use crate::config::ProcessIdentity;
use crate::router::ResourceDescriptor;

mod greeting;
mod server_info;

pub use greeting::Greeting;
pub use server_info::ServerInfo;

pub fn all(identity: &ProcessIdentity) -> Result<Vec<ResourceDescriptor>, ConfigurationError> {
    Ok(vec![
        ResourceDescriptor::new(
            "greeting",
            "Time-of-day greeting for the given name",
            "greeting://{name}",
            Greeting,
        )?
        .with_mime_type("text/plain"),
        ResourceDescriptor::new(
            "server-info",
            "Name and version of this server",
            "info://server",
            ServerInfo::new(identity.clone()),
        )?
        .with_mime_type("application/json"),
    ])
}
