pub mod document;
pub mod events;
pub mod processed_message;

pub use document::{AuthenticationStatus, Document};
pub use events::{
    AuthenticationCompleted, AuthenticationRequested, DeliveryStatus, DocumentsReady,
    UserTransferred,
};
pub use processed_message::ProcessedMessage;
