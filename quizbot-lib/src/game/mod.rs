//! Game flow: in-memory round queues, pending registrations and the service
//! that drives a game through its states.

mod registration;
mod service;
mod state;

pub use registration::PendingRegistrations;
pub use service::BuzzOutcome;
pub use service::GameService;
pub use state::Enqueued;
pub use state::RoundQueues;
