//! Voice Activity Detection (VAD)
//!
//! Energie-basierte VAD kombiniert mit Zero-Crossing-Rate. Liefert eine
//! kontinuierliche Wahrscheinlichkeit in [0.0, 1.0] statt einer harten
//! Entscheidung; Schwellenwert und Hysterese wendet der Aufrufer an.
//! Laeuft unabhaengig von der Mutationskette und beobachtet das Signal
//! NACH der Rauschunterdrueckung.

use super::{rms_energie, AudioProcessor};
use crate::config::Intensitaet;

/// Konfiguration fuer die VAD
#[derive(Debug, Clone)]
pub struct VadConfig {
    /// Glaettungsfaktor fuer Energie (0.0 = keine Glaettung)
    pub glaettung: f32,
    /// Referenz-Energie: RMS-Pegel bei dem die Energie-Evidenz 0.5 betraegt
    pub referenz_energie: f32,
    /// ZCR unterhalb derer das Signal voll sprach-plausibel ist
    pub zcr_plausibel: f32,
    /// ZCR oberhalb derer die Plausibilitaet auf das Minimum faellt
    pub zcr_unplausibel: f32,
    /// Minimale ZCR-Plausibilitaet (Rauschen drueckt die Wahrscheinlichkeit,
    /// loescht sie aber nicht komplett – stimmlose Laute haben hohe ZCR)
    pub zcr_minimum: f32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            glaettung: 0.7,
            referenz_energie: 0.02,
            zcr_plausibel: 0.15,
            zcr_unplausibel: 0.5,
            zcr_minimum: 0.2,
        }
    }
}

/// Voice Activity Detector
pub struct Vad {
    config: VadConfig,
    geglaettete_energie: f32,
    letzte_wahrscheinlichkeit: f32,
}

impl Vad {
    pub fn neu(config: VadConfig) -> Self {
        Self {
            config,
            geglaettete_energie: 0.0,
            letzte_wahrscheinlichkeit: 0.0,
        }
    }

    /// Analysiert einen Frame und gibt die Sprach-Wahrscheinlichkeit zurueck.
    /// Veraendert die Samples NICHT (VAD ist rein analytisch).
    pub fn wahrscheinlichkeit(&mut self, samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }

        let energie = rms_energie(samples);
        self.geglaettete_energie = self.config.glaettung * self.geglaettete_energie
            + (1.0 - self.config.glaettung) * energie;

        // Energie-Evidenz: monoton steigend, 0.5 bei referenz_energie
        let e = self.geglaettete_energie;
        let energie_evidenz = e / (e + self.config.referenz_energie);

        // ZCR-Plausibilitaet: Sprache hat moderate ZCR, Breitbandrauschen hohe
        let zcr = zero_crossing_rate(samples);
        let zcr_faktor = if zcr <= self.config.zcr_plausibel {
            1.0
        } else if zcr >= self.config.zcr_unplausibel {
            self.config.zcr_minimum
        } else {
            let t = (zcr - self.config.zcr_plausibel)
                / (self.config.zcr_unplausibel - self.config.zcr_plausibel);
            1.0 - t * (1.0 - self.config.zcr_minimum)
        };

        self.letzte_wahrscheinlichkeit = (energie_evidenz * zcr_faktor).clamp(0.0, 1.0);
        self.letzte_wahrscheinlichkeit
    }

    /// Wahrscheinlichkeit des zuletzt analysierten Frames
    pub fn letzte_wahrscheinlichkeit(&self) -> f32 {
        self.letzte_wahrscheinlichkeit
    }

    /// Gibt die geglaettete Energie zurueck (nuetzlich fuer Kalibrierung)
    pub fn geglaettete_energie(&self) -> f32 {
        self.geglaettete_energie
    }
}

impl AudioProcessor for Vad {
    /// VAD veraendert keine Samples, nur interne Zustandsaktualisierung
    fn process(&mut self, samples: &mut [f32]) {
        self.wahrscheinlichkeit(samples);
    }

    fn reset(&mut self) {
        self.geglaettete_energie = 0.0;
        self.letzte_wahrscheinlichkeit = 0.0;
    }

    /// Die VAD hat keine Intensitaetsstufen; der Schwellenwert liegt beim Aufrufer
    fn set_intensitaet(&mut self, _intensitaet: Intensitaet) {}
}

/// Berechnet die normalisierte Zero-Crossing-Rate
pub fn zero_crossing_rate(samples: &[f32]) -> f32 {
    if samples.len() < 2 {
        return 0.0;
    }
    let durchgaenge = samples
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();
    durchgaenge as f32 / (samples.len() - 1) as f32
}
