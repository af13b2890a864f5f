//! Fehlertypen fuer die Audio-Engine

use thiserror::Error;

/// Alle moeglichen Fehler der Audio-Engine
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Audio-Geraet nicht gefunden: {0}")]
    GeraetNichtGefunden(String),

    #[error("Kein Standard-Eingabegeraet verfuegbar")]
    KeinStandardEingabegeraet,

    #[error("Capture laeuft bereits")]
    LaeuftBereits,

    #[error("Operation nur im gestoppten Zustand erlaubt")]
    LaeuftNoch,

    #[error("Capture nicht initialisiert")]
    NichtInitialisiert,

    #[error("Stream-Fehler: {0}")]
    StreamFehler(String),

    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unerwarteter Fehler: {0}")]
    Anyhow(#[from] anyhow::Error),
}

pub type AudioResult<T> = Result<T, AudioError>;

impl From<AudioError> for stimmwerk_core::StimmwerkError {
    fn from(e: AudioError) -> Self {
        match e {
            AudioError::GeraetNichtGefunden(_) | AudioError::KeinStandardEingabegeraet => {
                Self::Geraet(e.to_string())
            }
            AudioError::Konfiguration(msg) => Self::Konfiguration(msg),
            andere => Self::Audio(andere.to_string()),
        }
    }
}
