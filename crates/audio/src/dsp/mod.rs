//! DSP-Module fuer die Audio-Verarbeitung
//!
//! Alle Filter implementieren das `AudioProcessor` Trait und arbeiten
//! in-place auf f32-Samples im Bereich [-1.0, 1.0]. Die Aktivierung
//! pro Filter steuert die Pipeline anhand der publizierten Config;
//! die Filter selbst kennen nur ihre Intensitaet.

pub mod agc;
pub mod echo_cancel;
pub mod hochpass;
pub mod noise_suppression;
pub mod transient;
pub mod vad;

use crate::config::Intensitaet;

/// Gemeinsames Trait fuer alle Audio-Filter
///
/// Filter verarbeiten Samples in-place und sind Send fuer die Nutzung
/// im Capture-Thread.
pub trait AudioProcessor: Send {
    /// Verarbeitet einen Puffer interleaved Samples in-place
    fn process(&mut self, samples: &mut [f32]);

    /// Setzt den internen Zustand zurueck (Filter-Historie, Schaetzer)
    fn reset(&mut self);

    /// Uebernimmt eine neue Intensitaetsstufe (Hot-Swap pro Frame)
    fn set_intensitaet(&mut self, intensitaet: Intensitaet);
}

/// Berechnet den RMS-Energiewert eines Puffers
pub fn rms_energie(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let summe_quadrate: f32 = samples.iter().map(|s| s * s).sum();
    (summe_quadrate / samples.len() as f32).sqrt()
}
