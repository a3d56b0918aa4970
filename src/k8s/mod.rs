pub mod client;
pub mod events;
pub mod filter;
pub mod types;
pub mod watcher;

pub use client::K8sClient;
pub use events::{EventSource, PodEvent, PodEventHandler, Subscription};
pub use filter::LabelFilter;
pub use types::PodInfo;
pub use watcher::PodWatcher;
