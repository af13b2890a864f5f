//! Hochpass-Filter
//!
//! Erste Stufe der Pipeline: entfernt DC-Offset und tieffrequenten
//! Trittschall unterhalb des Sprachbandes, bevor die nachgelagerten
//! Schaetzer (Rauschunterdrueckung, VAD) das Signal sehen.
//!
//! Implementiert als Ein-Pol-Hochpass pro Kanal:
//! `y[n] = a * (y[n-1] + x[n] - x[n-1])`

use super::AudioProcessor;
use crate::config::Intensitaet;

/// Konfiguration fuer den Hochpass
#[derive(Debug, Clone)]
pub struct HochpassConfig {
    /// Grenzfrequenz in Hz
    pub grenzfrequenz_hz: f32,
    /// Abtastrate in Hz
    pub sample_rate: f32,
}

impl HochpassConfig {
    /// Grenzfrequenz nach Intensitaetsstufe
    ///
    /// Hoehere Stufen schneiden aggressiver ins untere Sprachband.
    pub fn fuer_intensitaet(intensitaet: Intensitaet, sample_rate: f32) -> Self {
        let grenzfrequenz_hz = match intensitaet {
            Intensitaet::Minimal => 40.0,
            Intensitaet::Leicht => 60.0,
            Intensitaet::Mittel => 90.0,
            Intensitaet::Stark => 140.0,
        };
        Self {
            grenzfrequenz_hz,
            sample_rate,
        }
    }
}

/// Ein-Pol-Hochpass mit getrennter Historie pro Kanal
pub struct Hochpass {
    /// Filterkoeffizient a = 1 / (1 + 2*pi*fc/fs)
    alpha: f32,
    sample_rate: f32,
    kanaele: usize,
    /// Letzter Eingangswert pro Kanal
    x_vorher: Vec<f32>,
    /// Letzter Ausgangswert pro Kanal
    y_vorher: Vec<f32>,
}

impl Hochpass {
    pub fn neu(config: HochpassConfig, kanaele: u16) -> Self {
        let kanaele = kanaele.max(1) as usize;
        Self {
            alpha: Self::koeffizient(config.grenzfrequenz_hz, config.sample_rate),
            sample_rate: config.sample_rate,
            kanaele,
            x_vorher: vec![0.0; kanaele],
            y_vorher: vec![0.0; kanaele],
        }
    }

    fn koeffizient(grenzfrequenz_hz: f32, sample_rate: f32) -> f32 {
        let omega = 2.0 * std::f32::consts::PI * grenzfrequenz_hz / sample_rate;
        1.0 / (1.0 + omega)
    }

    /// Aktueller Filterkoeffizient (fuer Diagnose)
    pub fn alpha(&self) -> f32 {
        self.alpha
    }
}

impl AudioProcessor for Hochpass {
    fn process(&mut self, samples: &mut [f32]) {
        for (i, sample) in samples.iter_mut().enumerate() {
            let kanal = i % self.kanaele;
            let x = *sample;
            let y = self.alpha * (self.y_vorher[kanal] + x - self.x_vorher[kanal]);
            self.x_vorher[kanal] = x;
            self.y_vorher[kanal] = y;
            *sample = y;
        }
    }

    fn reset(&mut self) {
        self.x_vorher.fill(0.0);
        self.y_vorher.fill(0.0);
    }

    fn set_intensitaet(&mut self, intensitaet: Intensitaet) {
        let config = HochpassConfig::fuer_intensitaet(intensitaet, self.sample_rate);
        self.alpha = Self::koeffizient(config.grenzfrequenz_hz, config.sample_rate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard() -> Hochpass {
        Hochpass::neu(
            HochpassConfig::fuer_intensitaet(Intensitaet::Mittel, 48000.0),
            1,
        )
    }

    #[test]
    fn hochpass_entfernt_dc_offset() {
        let mut hp = standard();
        // Konstantes Signal (reiner DC) muss gegen 0 laufen
        let mut samples = vec![0.5f32; 4800];
        hp.process(&mut samples);
        let ende = samples[4799].abs();
        assert!(ende < 0.05, "DC-Anteil nicht entfernt: {}", ende);
    }

    #[test]
    fn hochpass_laesst_sprachband_durch() {
        let mut hp = standard();
        // 1kHz-Sinus bei 48kHz liegt weit ueber der Grenzfrequenz
        let mut samples: Vec<f32> = (0..4800)
            .map(|i| (2.0 * std::f32::consts::PI * 1000.0 * i as f32 / 48000.0).sin() * 0.5)
            .collect();
        let eingangs_rms = super::super::rms_energie(&samples);
        hp.process(&mut samples);
        let ausgangs_rms = super::super::rms_energie(&samples);
        assert!(
            ausgangs_rms > eingangs_rms * 0.9,
            "Sprachband zu stark gedaempft: {} -> {}",
            eingangs_rms,
            ausgangs_rms
        );
    }

    #[test]
    fn hochpass_stereo_kanaele_getrennt() {
        let mut hp = Hochpass::neu(
            HochpassConfig::fuer_intensitaet(Intensitaet::Mittel, 48000.0),
            2,
        );
        // Links DC, rechts 0 – rechts darf nicht vom linken Kanal beeinflusst werden
        let mut samples: Vec<f32> = (0..960)
            .map(|i| if i % 2 == 0 { 0.5 } else { 0.0 })
            .collect();
        hp.process(&mut samples);
        for (i, s) in samples.iter().enumerate() {
            if i % 2 == 1 {
                assert_eq!(*s, 0.0, "Rechter Kanal veraendert bei Index {}", i);
            }
        }
    }

    #[test]
    fn hochpass_reset_loescht_historie() {
        let mut hp = standard();
        let mut samples = vec![0.5f32; 480];
        hp.process(&mut samples);
        hp.reset();
        assert_eq!(hp.x_vorher[0], 0.0);
        assert_eq!(hp.y_vorher[0], 0.0);
    }

    #[test]
    fn intensitaet_veraendert_koeffizient() {
        let mut hp = standard();
        let mittel = hp.alpha();
        hp.set_intensitaet(Intensitaet::Stark);
        assert!(hp.alpha() < mittel, "Stark muss tiefer greifen als Mittel");
    }
}
