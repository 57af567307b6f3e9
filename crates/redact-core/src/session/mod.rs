//! The client-side session state machine.

pub mod controller;
pub mod input_mode;
pub mod ledger;
pub mod selection;
pub mod store;

pub use controller::{
    Commit, FollowUpTicket, SessionController, SessionUpdate, SummaryTicket, UpdateReceiver,
    UpdateSender, update_channel,
};
pub use input_mode::{Cleared, InputMode, InputModeArbiter};
pub use ledger::{ConversationLedger, ConversationTurn, Role};
pub use selection::EntitySelectionSet;
pub use store::{Document, SessionStore, SourceKind};
