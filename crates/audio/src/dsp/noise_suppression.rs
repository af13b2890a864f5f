//! Rauschunterdrueckung via spektrale Subtraktion (Zeitbereich-Naeherung)
//!
//! Schaetzt den Rauschpegel waehrend Stille per exponentieller Glaettung
//! und subtrahiert ihn vom Signal. Echte FFT-basierte Subtraktion waere
//! deutlich aufwendiger; fuer Sprach-Chat reicht die Band-Energie-Naeherung.

use super::{rms_energie, AudioProcessor};
use crate::config::Intensitaet;

/// Rauschunterdruecker
pub struct NoiseSuppressor {
    intensitaet: Intensitaet,
    /// Geschaetzter Rauschpegel (RMS)
    rausch_schaetzung: f32,
    /// Glaettungsfaktor fuer die Rauschschaetzung
    rausch_glaettung: f32,
    /// Frames unterhalb dieses Pegels gelten als Rauschen
    stille_schwelle: f32,
}

impl NoiseSuppressor {
    pub fn neu(intensitaet: Intensitaet) -> Self {
        Self {
            intensitaet,
            rausch_schaetzung: 0.0,
            rausch_glaettung: 0.95,
            stille_schwelle: 0.02,
        }
    }

    /// Subtraktions-Faktor (alpha) nach Stufe
    fn alpha(&self) -> f32 {
        match self.intensitaet {
            Intensitaet::Minimal => 1.2,
            Intensitaet::Leicht => 1.5,
            Intensitaet::Mittel => 2.5,
            Intensitaet::Stark => 4.0,
        }
    }

    /// Minimaler Gain nach Subtraktion (Floor, verhindert musical noise)
    fn floor(&self) -> f32 {
        match self.intensitaet {
            Intensitaet::Minimal => 0.3,
            Intensitaet::Leicht => 0.2,
            Intensitaet::Mittel => 0.1,
            Intensitaet::Stark => 0.05,
        }
    }

    /// Setzt den Stille-Schwellenwert fuer die Rauschschaetzung
    pub fn stille_schwelle_setzen(&mut self, schwelle: f32) {
        self.stille_schwelle = schwelle;
    }

    /// Gibt die aktuelle Rauschschaetzung zurueck
    pub fn rausch_schaetzung(&self) -> f32 {
        self.rausch_schaetzung
    }
}

impl AudioProcessor for NoiseSuppressor {
    fn process(&mut self, samples: &mut [f32]) {
        let frame_rms = rms_energie(samples);

        // Rauschschaetzung nur bei leisem Signal aktualisieren
        if frame_rms < self.stille_schwelle {
            self.rausch_schaetzung = self.rausch_glaettung * self.rausch_schaetzung
                + (1.0 - self.rausch_glaettung) * frame_rms;
        }

        if self.rausch_schaetzung < 1e-7 {
            return;
        }

        // Gain aus dem Verhaeltnis Signal zu geschaetztem Rauschen
        let alpha = self.alpha();
        let floor = self.floor();
        let gain = if frame_rms > 1e-7 {
            ((frame_rms - alpha * self.rausch_schaetzung) / frame_rms).clamp(floor, 1.0)
        } else {
            floor
        };

        for sample in samples.iter_mut() {
            *sample *= gain;
        }
    }

    fn reset(&mut self) {
        self.rausch_schaetzung = 0.0;
    }

    fn set_intensitaet(&mut self, intensitaet: Intensitaet) {
        self.intensitaet = intensitaet;
    }
}
