//! Realms and routing for Realmgate.
//!
//! Once a client is admitted it lives in a realm. This crate owns what a
//! realm holds and what admitted sessions can do there.
//!
//! # Key types
//!
//! - [`Router`]: the set of realms a server hosts
//! - [`Realm`]: registered procedures plus the joined sessions
//! - [`SessionRegistry`]: session ids and the identities behind them
//! - [`ApplicationComponent`]: the trait for procedures embedded in the router
//! - [`TimeService`]: the built-in component serving `com.timeservice.now`

mod component;
mod error;
mod realm;
mod registry;
mod router;

pub use component::{
    ApplicationComponent, COMPONENT_AUTH_INTERNAL, COMPONENT_AUTHID,
    COMPONENT_AUTHROLE, ComponentSession, TIMESERVICE_NOW, TimeService,
    utc_timestamp,
};
pub use error::RouterError;
pub use realm::{Procedure, Realm};
pub use registry::{MAX_SESSION_ID, SessionRegistry};
pub use router::Router;
