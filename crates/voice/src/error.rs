//! Fehlertypen der Voice-Schicht

use thiserror::Error;

use stimmwerk_core::StimmwerkError;

/// Fehler der Voice-Schicht (Kanaele, Paketierung, Jitter-Buffer)
#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("Kanal ist voll (Kapazitaet {0})")]
    KanalVoll(usize),

    #[error("Teilnehmer ist kein Mitglied des Kanals")]
    KeinMitglied,

    #[error("Stream nicht gefunden: {0}")]
    StreamNichtGefunden(String),

    #[error("Nutzdaten zu gross: {laenge} Bytes (Maximum {maximum})")]
    NutzdatenZuGross { laenge: usize, maximum: usize },

    #[error("Stream bereits geschlossen")]
    StreamGeschlossen,

    #[error("Ungueltige Konfiguration: {0}")]
    Konfiguration(String),
}

pub type VoiceResult<T> = Result<T, VoiceError>;

impl From<VoiceError> for StimmwerkError {
    fn from(e: VoiceError) -> Self {
        match e {
            VoiceError::KanalVoll(_) => StimmwerkError::KanalVoll,
            VoiceError::KeinMitglied => StimmwerkError::KeinMitglied,
            VoiceError::StreamNichtGefunden(s) => StimmwerkError::StreamNichtGefunden(s),
            VoiceError::NutzdatenZuGross { laenge, maximum } => StimmwerkError::UngueltigesPaket(
                format!("Nutzdaten zu gross: {} > {}", laenge, maximum),
            ),
            VoiceError::StreamGeschlossen => {
                StimmwerkError::Intern("Stream bereits geschlossen".into())
            }
            VoiceError::Konfiguration(s) => StimmwerkError::Konfiguration(s),
        }
    }
}
