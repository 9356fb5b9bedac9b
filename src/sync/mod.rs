mod cache;
mod monitor;
mod outcome;

pub use cache::SyncCache;
pub use monitor::{parse_state, ChannelSignal, ConnectivityMonitor, ConnectivitySignal, Transition};
pub use outcome::{Fetched, FlushOutcome, Submission};
