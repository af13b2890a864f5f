//! Echo Cancellation (AEC) – Referenzsignal-Subtraktion
//!
//! Die Wiedergabe-Senke speist ihr Ausgangssignal (Far-End-Referenz) in
//! einen begrenzten Ring-Buffer ein; beim Verarbeiten wird eine
//! verzoegerte, skalierte Version davon vom Mikrofonsignal subtrahiert.
//! Die Verzoegerung haengt von der Render/Capture-Schleife der Plattform
//! ab und ist ueber `EchoCancelConfig` kalibrierbar.

use super::AudioProcessor;
use crate::config::Intensitaet;

/// Konfiguration fuer die Echo Cancellation
#[derive(Debug, Clone)]
pub struct EchoCancelConfig {
    /// Maximale Echo-Verzoegerung in Samples (Ring-Buffer-Groesse)
    pub max_delay_samples: usize,
    /// Initiale Verzoegerungs-Schaetzung in Samples
    pub initial_delay_samples: usize,
}

impl Default for EchoCancelConfig {
    fn default() -> Self {
        Self {
            max_delay_samples: 4800, // 100ms bei 48kHz
            initial_delay_samples: 1200, // 25ms
        }
    }
}

/// Echo Canceller mit Far-End-Referenz-Ring-Buffer
pub struct EchoCanceller {
    intensitaet: Intensitaet,
    /// Ring-Buffer fuer das Referenzsignal (Lautsprecher-Output)
    referenz_buffer: Vec<f32>,
    schreib_pos: usize,
    /// Geschaetzte Echo-Verzoegerung in Samples
    verzoegerung: usize,
}

impl EchoCanceller {
    pub fn neu(config: EchoCancelConfig, intensitaet: Intensitaet) -> Self {
        let groesse = config.max_delay_samples.max(1);
        Self {
            intensitaet,
            referenz_buffer: vec![0.0; groesse],
            schreib_pos: 0,
            verzoegerung: config.initial_delay_samples.min(groesse - 1),
        }
    }

    /// Subtraktions-Staerke nach Stufe (0.0..1.0)
    fn staerke(&self) -> f32 {
        match self.intensitaet {
            Intensitaet::Minimal => 0.3,
            Intensitaet::Leicht => 0.5,
            Intensitaet::Mittel => 0.7,
            Intensitaet::Stark => 0.9,
        }
    }

    /// Speist Referenz-Samples (Lautsprecher-Output) in den Ring-Buffer ein.
    ///
    /// Wird von der Wiedergabe-Senke aufgerufen; der Buffer ist begrenzt,
    /// aeltere Samples werden ueberschrieben.
    pub fn referenz_einspeisen(&mut self, samples: &[f32]) {
        for &s in samples {
            self.referenz_buffer[self.schreib_pos] = s;
            self.schreib_pos = (self.schreib_pos + 1) % self.referenz_buffer.len();
        }
    }

    /// Liest ein um `offset` Samples verzoegertes Referenzsample
    fn referenz_sample(&self, offset: usize) -> f32 {
        let laenge = self.referenz_buffer.len();
        let pos = (self.schreib_pos + laenge - 1 - (offset % laenge)) % laenge;
        self.referenz_buffer[pos]
    }

    /// Setzt die geschaetzte Echo-Verzoegerung (Kalibrierung)
    pub fn verzoegerung_setzen(&mut self, samples: usize) {
        self.verzoegerung = samples.min(self.referenz_buffer.len().saturating_sub(1));
    }

    /// Aktuelle Verzoegerungs-Schaetzung in Samples
    pub fn verzoegerung(&self) -> usize {
        self.verzoegerung
    }
}

impl AudioProcessor for EchoCanceller {
    fn process(&mut self, samples: &mut [f32]) {
        let staerke = self.staerke();
        for (i, sample) in samples.iter_mut().enumerate() {
            // Echo-Schaetzung: verzoegertes Referenzsignal
            let echo = self.referenz_sample(self.verzoegerung + i);
            *sample -= echo * staerke;
        }
    }

    fn reset(&mut self) {
        self.referenz_buffer.fill(0.0);
        self.schreib_pos = 0;
    }

    fn set_intensitaet(&mut self, intensitaet: Intensitaet) {
        self.intensitaet = intensitaet;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::rms_energie;

    #[test]
    fn echo_wird_gedaempft() {
        let config = EchoCancelConfig {
            max_delay_samples: 480,
            initial_delay_samples: 0,
        };
        let mut aec = EchoCanceller::neu(config, Intensitaet::Stark);

        // Referenzsignal einspeisen
        let referenz: Vec<f32> = (0..480).map(|i| ((i % 7) as f32 - 3.0) * 0.1).collect();
        aec.referenz_einspeisen(&referenz);

        // Mikrofonsignal = reines Echo derselben Form (rueckwaerts ausgelesen)
        let mut mikro: Vec<f32> = (0..480).map(|i| aec.referenz_sample(i)).collect();
        let vorher = rms_energie(&mikro);
        aec.process(&mut mikro);
        let nachher = rms_energie(&mikro);

        assert!(
            nachher < vorher * 0.5,
            "Echo nicht gedaempft: {} -> {}",
            vorher,
            nachher
        );
    }

    #[test]
    fn ohne_referenz_unveraendert() {
        let mut aec = EchoCanceller::neu(EchoCancelConfig::default(), Intensitaet::Mittel);
        let original = vec![0.3f32; 480];
        let mut samples = original.clone();
        aec.process(&mut samples);
        // Leerer Referenz-Buffer = keine Subtraktion
        assert_eq!(samples, original);
    }

    #[test]
    fn verzoegerung_begrenzt_auf_buffer() {
        let config = EchoCancelConfig {
            max_delay_samples: 100,
            initial_delay_samples: 0,
        };
        let mut aec = EchoCanceller::neu(config, Intensitaet::Mittel);
        aec.verzoegerung_setzen(usize::MAX);
        assert_eq!(aec.verzoegerung(), 99);
    }

    #[test]
    fn reset_loescht_referenz() {
        let mut aec = EchoCanceller::neu(EchoCancelConfig::default(), Intensitaet::Mittel);
        aec.referenz_einspeisen(&[0.5; 960]);
        aec.reset();
        let original = vec![0.3f32; 480];
        let mut samples = original.clone();
        aec.process(&mut samples);
        assert_eq!(samples, original);
    }

    #[test]
    fn staerke_steigt_mit_intensitaet() {
        let leicht = EchoCanceller::neu(EchoCancelConfig::default(), Intensitaet::Leicht);
        let stark = EchoCanceller::neu(EchoCancelConfig::default(), Intensitaet::Stark);
        assert!(leicht.staerke() < stark.staerke());
    }
}
