//! Domain core for the print-shop chat assistant: participants and messages,
//! the speaker-selection rule, the read-only product catalog, Cloudprinter
//! request payloads, and layered configuration.

pub mod catalog;
pub mod config;
pub mod conversation;
pub mod domain;
pub mod errors;
pub mod turn;

pub use catalog::{Catalog, CatalogError};
pub use conversation::{ConversationError, ConversationState};
pub use domain::message::{Message, ToolCall, ToolResponse};
pub use domain::participant::Participant;
pub use domain::pricing::{
    PricingItem, PricingOption, PricingQuery, PricingRequest, ProductInfoRequest,
};
pub use domain::product::Product;
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use turn::{next_speaker, select_next_speaker, TurnError};
