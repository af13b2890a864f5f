//! stimmwerk-protocol – Wire-Format der Voice-Pakete
//!
//! Definiert den binaeren Paket-Header und die Serialisierung fuer den
//! Voice-Transport. Alle anderen Pakettypen des Spiel-Protokolls sind
//! fuer diese Pipeline opak und Sache der aeusseren Netzwerkschicht.

pub mod voice;

pub use voice::{PacketType, VoiceFlags, VoicePacket, VoicePacketHeader, MAX_NUTZDATEN_LAENGE};
