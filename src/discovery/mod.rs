mod error;
mod events;
pub mod registry;
mod retry;
mod session;
mod watcher;

pub use error::DiscoveryError;
pub use events::{RegistryEvent, WatchFired};
pub use registry::{RegistryConn, RegistryConnector, ZookeeperConnector};
pub use retry::{with_retry, RetryPolicy, RetryableOperation, SessionConnect};
pub use session::{DirectorySession, SessionState};
pub use watcher::ServiceWatcher;
