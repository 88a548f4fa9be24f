pub mod bus;
pub mod types;

pub use bus::{EventBus, Subscription};
pub use types::{ChangeKind, DocumentEvent};
