pub mod dispatcher;
pub mod escalation;
pub mod event;
pub mod gateway;
pub mod heuristics;
pub mod tracker;

pub use dispatcher::{PipelineOutcome, UserLocks, WarningLedger, handle_message};
pub use event::{MessageEvent, RuleConfig};
pub use gateway::{ActionGateway, GatewayError};
