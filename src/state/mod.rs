//! Shared session state: identities, mailboxes, and the room registry.

pub mod ids;
pub mod mailbox;
pub mod room;
pub mod session;

pub use ids::{IdGenerator, SessionId};
pub use mailbox::{Mailbox, OverflowPolicy, PushOutcome};
pub use room::{Member, Room};
pub use session::{Session, SessionState};
