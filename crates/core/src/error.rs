//! Fehlertypen fuer Stimmwerk
//!
//! Zentraler Fehler-Enum der alle moeglichen Fehlerzustaende abdeckt.
//! Untermodule koennen eigene Fehler definieren und via `#[from]` konvertieren.

use thiserror::Error;

/// Globaler Result-Alias fuer Stimmwerk
pub type Result<T> = std::result::Result<T, StimmwerkError>;

/// Alle moeglichen Fehler im Stimmwerk-System
#[derive(Debug, Error)]
pub enum StimmwerkError {
    // --- Audio & Geraete ---
    #[error("Audiofehler: {0}")]
    Audio(String),

    #[error("Audio-Geraet nicht verfuegbar: {0}")]
    Geraet(String),

    // --- Kanaele & Streams ---
    #[error("Kanal voll: maximale Teilnehmeranzahl erreicht")]
    KanalVoll,

    #[error("Teilnehmer ist kein Mitglied des Kanals")]
    KeinMitglied,

    #[error("Stream nicht gefunden: {0}")]
    StreamNichtGefunden(String),

    // --- Protokoll ---
    #[error("Ungueltiges Paket: {0}")]
    UngueltigesPaket(String),

    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl StimmwerkError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn der Fehler die Session beendet
    ///
    /// Verlustartige Zustaende (Backpressure, Duplikate, Stale) tauchen
    /// hier nicht auf, die werden als Zaehler gefuehrt, nie als Fehler.
    pub fn ist_fatal(&self) -> bool {
        matches!(self, Self::Geraet(_) | Self::Intern(_))
    }
}
