//! Transienten-Unterdrueckung (Klicks, Knackser, Pops)
//!
//! Letzte Stufe der Pipeline: begrenzt die Anstiegsgeschwindigkeit
//! (Slew-Rate) des Signals pro Kanal. Spruenge, die schneller sind als
//! Sprache physikalisch sein kann, werden auf die maximale Steigung
//! gekappt; normales Sprachmaterial passiert unveraendert.

use super::AudioProcessor;
use crate::config::Intensitaet;

/// Slew-Rate-Limiter pro Kanal
pub struct TransientSuppressor {
    intensitaet: Intensitaet,
    kanaele: usize,
    /// Letzter Ausgangswert pro Kanal
    letzter_wert: Vec<f32>,
}

impl TransientSuppressor {
    pub fn neu(intensitaet: Intensitaet, kanaele: u16) -> Self {
        let kanaele = kanaele.max(1) as usize;
        Self {
            intensitaet,
            kanaele,
            letzter_wert: vec![0.0; kanaele],
        }
    }

    /// Maximal erlaubte Aenderung pro Sample (normalisierte Amplitude)
    fn max_steigung(&self) -> f32 {
        match self.intensitaet {
            Intensitaet::Minimal => 0.5,
            Intensitaet::Leicht => 0.3,
            Intensitaet::Mittel => 0.2,
            Intensitaet::Stark => 0.1,
        }
    }
}

impl AudioProcessor for TransientSuppressor {
    fn process(&mut self, samples: &mut [f32]) {
        let max = self.max_steigung();
        for (i, sample) in samples.iter_mut().enumerate() {
            let kanal = i % self.kanaele;
            let vorher = self.letzter_wert[kanal];
            let delta = *sample - vorher;
            let begrenzt = if delta > max {
                vorher + max
            } else if delta < -max {
                vorher - max
            } else {
                *sample
            };
            self.letzter_wert[kanal] = begrenzt;
            *sample = begrenzt;
        }
    }

    fn reset(&mut self) {
        self.letzter_wert.fill(0.0);
    }

    fn set_intensitaet(&mut self, intensitaet: Intensitaet) {
        self.intensitaet = intensitaet;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn klick_wird_gekappt() {
        let mut ts = TransientSuppressor::neu(Intensitaet::Stark, 1);
        // Einzelner Vollausschlag-Klick in Stille
        let mut samples = vec![0.0f32; 480];
        samples[240] = 1.0;
        ts.process(&mut samples);
        assert!(
            samples[240] <= 0.11,
            "Klick nicht gekappt: {}",
            samples[240]
        );
    }

    #[test]
    fn langsames_signal_unveraendert() {
        let mut ts = TransientSuppressor::neu(Intensitaet::Mittel, 1);
        // 200Hz-Sinus bei 48kHz: maximale Steigung weit unter 0.2/Sample
        let original: Vec<f32> = (0..480)
            .map(|i| (2.0 * std::f32::consts::PI * 200.0 * i as f32 / 48000.0).sin() * 0.5)
            .collect();
        let mut samples = original.clone();
        ts.process(&mut samples);
        for (a, b) in original.iter().zip(samples.iter()) {
            assert!((a - b).abs() < 1e-6, "Langsames Signal veraendert");
        }
    }

    #[test]
    fn stereo_kanaele_getrennt() {
        let mut ts = TransientSuppressor::neu(Intensitaet::Stark, 2);
        // Links Klick, rechts Stille
        let mut samples = vec![0.0f32; 8];
        samples[4] = 1.0; // linker Kanal
        ts.process(&mut samples);
        assert!(samples[4] <= 0.11);
        assert_eq!(samples[5], 0.0, "Rechter Kanal beeinflusst");
    }

    #[test]
    fn reset_loescht_historie() {
        let mut ts = TransientSuppressor::neu(Intensitaet::Mittel, 1);
        let mut samples = vec![0.5f32; 10];
        ts.process(&mut samples);
        ts.reset();
        assert_eq!(ts.letzter_wert[0], 0.0);
    }

    #[test]
    fn minimal_laesst_steile_flanken_durch() {
        let mut minimal = TransientSuppressor::neu(Intensitaet::Minimal, 1);
        let mut stark = TransientSuppressor::neu(Intensitaet::Stark, 1);
        let mut a = vec![0.0f32, 0.4];
        let mut b = vec![0.0f32, 0.4];
        minimal.process(&mut a);
        stark.process(&mut b);
        assert!((a[1] - 0.4).abs() < 1e-6, "Minimal sollte 0.4-Sprung erlauben");
        assert!(b[1] < 0.4, "Stark sollte 0.4-Sprung kappen");
    }
}
