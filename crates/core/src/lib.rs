//! stimmwerk-core – Gemeinsame Typen und Fehlertypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Stimmwerk-Crates verwendet werden: Identifikationstypen
//! (Newtype-Pattern) und der zentrale Fehler-Enum.

pub mod error;
pub mod logging;
pub mod types;

pub use error::{Result, StimmwerkError};
pub use logging::logging_initialisieren;
pub use types::{KanalId, StreamId, TeilnehmerId};
