//! Stimmwerk Voice
//!
//! Sprachuebertragung oberhalb der Audio-Schicht: Kanal-Mitgliedschaft,
//! Paketierung mit Sequenzer und Medien-Takt, sowie empfangsseitig
//! Jitter-Buffer und Verlust-Verdeckung.
//!
//! Senderichtung: Capture -> Pipeline -> `Paketierer` -> Transport.
//! Empfangsrichtung: Transport -> `JitterBuffer` -> Wiedergabe.

pub mod error;
pub mod jitter;
pub mod kanal;
pub mod paketierer;
pub mod verdeckung;

pub use error::{VoiceError, VoiceResult};
pub use jitter::{JitterBuffer, JitterConfig, JitterStatistik, JitterZustand};
pub use kanal::{KanalRegister, STANDARD_KAPAZITAET};
pub use paketierer::{Paketierer, StreamHandle};
pub use verdeckung::{Verdecker, VerdeckungsStatistik, MAX_WIEDERHOLUNGEN};
