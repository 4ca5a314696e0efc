mod notifier;
mod poller;

pub use notifier::{BoardEvent, Notifier};
pub use poller::{Poller, attach_poller};
