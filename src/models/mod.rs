//! Stored documents and their transport views.
//!
//! Every stored type keeps native `ObjectId`/BSON datetimes; the matching
//! `*View` type is what handlers serialize.

pub mod bill;
pub mod lead;
pub mod message;
pub mod newsletter;
pub mod project;
pub mod user;

pub use bill::{Bill, BillView, PaymentStatus};
pub use lead::{Lead, LeadView};
pub use message::{Message, MessageView};
pub use newsletter::Subscriber;
pub use project::{Phase, PhaseStatus, Project, ProjectStatus, ProjectView};
pub use user::{Role, User, UserView};
