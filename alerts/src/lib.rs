//! Alert conditions, per-key notification cooldown and delivery.

pub mod condition;
pub mod cooldown;
pub mod definition;
pub mod dispatcher;
pub mod error;
pub mod key;
pub mod transport;

pub use condition::{Condition, ConditionKind, Evaluation};
pub use cooldown::CooldownGate;
pub use definition::{AlertDefinition, AlertSpec};
pub use dispatcher::{DispatchOutcome, Notifier};
pub use error::{ConfigError, EvalError};
pub use key::AlertKey;
pub use transport::{NotificationTransport, TransportError};
