//! Session and authentication state machine.
//!
//! Links provider identities to local users, keeps the signed-in user's
//! effective permissions observable and gates protected routes.

pub mod config;
pub mod guard;
pub mod manager;
pub mod memory_provider;
pub mod notify;
pub mod provider;
pub mod resolve;
pub mod state;

pub use config::SessionConfig;
pub use guard::{GuardDecision, RouteGuard};
pub use manager::{SessionManager, SessionTasks, SignupError, SignupProfile};
pub use memory_provider::InMemoryIdentityProvider;
pub use notify::{MemoryNotifier, Notification, NotificationLevel, Notifier, TracingNotifier};
pub use provider::{
    AuthChangeKind, AuthProviderError, AuthStateChange, AuthSubscription, ExternalIdentity,
    IdentityProvider,
};
pub use resolve::{resolve_local_user, Resolution};
pub use state::{SessionEnd, SessionPhase, SessionState};
