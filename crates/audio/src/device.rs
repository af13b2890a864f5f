//! Geraete-Auswahl
//!
//! Liefert das Standard-Backend der Plattform: mit dem Feature
//! `cpal-backend` die echte Hardware ueber cpal, sonst die
//! Takt-Simulation (headless, CI-tauglich).

use crate::capture::CaptureBackend;

/// Beschreibung eines Eingabegeraets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeraeteInfo {
    pub name: String,
    /// Ob dies das Systemstandard-Geraet ist
    pub standard: bool,
}

impl std::fmt::Display for GeraeteInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.standard {
            write!(f, "{} (Standard)", self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// Erstellt das Standard-Capture-Backend der Plattform
#[cfg(feature = "cpal-backend")]
pub fn standard_backend() -> Box<dyn CaptureBackend> {
    Box::new(crate::cpal_backend::CpalBackend::neu())
}

/// Erstellt das Standard-Capture-Backend der Plattform
#[cfg(not(feature = "cpal-backend"))]
pub fn standard_backend() -> Box<dyn CaptureBackend> {
    Box::new(crate::capture::TaktBackend::neu())
}
