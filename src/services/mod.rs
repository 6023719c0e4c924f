pub mod backend;
pub mod context;
pub mod directory;
pub mod identity_provider;
pub mod locations;
pub mod orgs;
pub mod session;

pub use backend::BackendClient;
pub use context::{OrganizationContext, SwitchOutcome};
pub use directory::OrganizationDirectory;
pub use identity_provider::{
    AuthSession, Credentials, HttpIdentityProvider, IdentityProvider, SignInOutcome,
};
pub use locations::LocationLoader;
pub use orgs::OrganizationService;
pub use session::{SessionEvent, SessionPhase, SessionStore};
