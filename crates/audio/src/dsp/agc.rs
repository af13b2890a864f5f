//! Automatic Gain Control (AGC)
//!
//! Regelt den Eingangspegel auf einen Zielwert. Laeuft bewusst NACH
//! Rauschunterdrueckung und Echo-Cancellation, damit Restrauschen nicht
//! mit hochverstaerkt wird. Enthaelt Attack/Release-Glaettung und einen
//! harten Limiter.

use super::AudioProcessor;
use crate::config::Intensitaet;

/// Konfiguration fuer den AGC
#[derive(Debug, Clone)]
pub struct AgcConfig {
    /// Ziel-Pegel (normalisiert, z.B. 0.1 fuer ca. -20 dBFS)
    pub ziel_pegel: f32,
    /// Maximaler Gain-Faktor
    pub max_gain: f32,
    /// Minimaler Gain-Faktor (verhindert Aufblasen von Stille)
    pub min_gain: f32,
    /// Attack-Koeffizient pro Sample (wie schnell Gain sinkt)
    pub attack_koeff: f32,
    /// Release-Koeffizient pro Sample (wie schnell Gain steigt)
    pub release_koeff: f32,
    /// Limiter-Schwellenwert (Hard Clip)
    pub limiter_schwelle: f32,
}

impl AgcConfig {
    /// Sprach-Konfiguration fuer die gegebene Abtastrate und Intensitaet
    pub fn sprache(sample_rate: f32, intensitaet: Intensitaet) -> Self {
        let max_gain = match intensitaet {
            Intensitaet::Minimal => 4.0,
            Intensitaet::Leicht => 8.0,
            Intensitaet::Mittel => 20.0,
            Intensitaet::Stark => 40.0,
        };
        Self {
            ziel_pegel: 0.1,
            max_gain,
            min_gain: 0.1,
            attack_koeff: Self::zeit_zu_koeff(0.01, sample_rate),
            release_koeff: Self::zeit_zu_koeff(0.15, sample_rate),
            limiter_schwelle: 0.95,
        }
    }

    fn zeit_zu_koeff(zeit_sekunden: f32, sample_rate: f32) -> f32 {
        if zeit_sekunden <= 0.0 {
            return 0.0;
        }
        (-1.0 / (zeit_sekunden * sample_rate)).exp()
    }
}

/// Automatic Gain Control Prozessor
pub struct Agc {
    config: AgcConfig,
    sample_rate: f32,
    aktueller_gain: f32,
}

impl Agc {
    pub fn neu(sample_rate: f32, intensitaet: Intensitaet) -> Self {
        Self {
            config: AgcConfig::sprache(sample_rate, intensitaet),
            sample_rate,
            aktueller_gain: 1.0,
        }
    }

    /// Gibt den aktuellen Gain-Wert zurueck
    pub fn aktueller_gain(&self) -> f32 {
        self.aktueller_gain
    }

    #[cfg(test)]
    fn mit_config(config: AgcConfig) -> Self {
        Self {
            config,
            sample_rate: 48000.0,
            aktueller_gain: 1.0,
        }
    }
}

impl AudioProcessor for Agc {
    fn process(&mut self, samples: &mut [f32]) {
        for sample in samples.iter_mut() {
            let betrag = sample.abs();

            // Gewuenschter Gain fuer dieses Sample
            let gewuenscht = if betrag > 1e-6 {
                (self.config.ziel_pegel / betrag).clamp(self.config.min_gain, self.config.max_gain)
            } else {
                self.config.max_gain
            };

            // Gain glaetten: schnell runter (Attack), langsam hoch (Release)
            if gewuenscht < self.aktueller_gain {
                self.aktueller_gain = self.config.attack_koeff * self.aktueller_gain
                    + (1.0 - self.config.attack_koeff) * gewuenscht;
            } else {
                self.aktueller_gain = self.config.release_koeff * self.aktueller_gain
                    + (1.0 - self.config.release_koeff) * gewuenscht;
            }

            let verstaerkt = *sample * self.aktueller_gain;

            // Hard Limiter
            *sample = verstaerkt.clamp(-self.config.limiter_schwelle, self.config.limiter_schwelle);
        }
    }

    fn reset(&mut self) {
        self.aktueller_gain = 1.0;
    }

    fn set_intensitaet(&mut self, intensitaet: Intensitaet) {
        let gain = self.aktueller_gain;
        self.config = AgcConfig::sprache(self.sample_rate, intensitaet);
        self.aktueller_gain = gain.min(self.config.max_gain);
    }
}
