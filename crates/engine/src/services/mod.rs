//! Engine services.

pub mod roles;
pub mod sequencer;
pub mod tracker;

pub use roles::{apply_role_plan, AppliedRoles, RoleMutationFailure};
pub use sequencer::{MemberPermit, MemberSequencer};
pub use tracker::{InviteTracker, JoinResolution, LeaveResolution, ReconcileOutcome, TrackingPolicy};
