//! Audio-Processing-Pipeline
//!
//! Feste Filter-Reihenfolge: Hochpass -> Rauschunterdrueckung ->
//! Echo-Cancellation -> AGC -> Transienten-Unterdrueckung. Die
//! Reihenfolge ist Teil des Kontrakts: der Hochpass schuetzt die
//! Schaetzer vor DC/Trittschall, der AGC laeuft nach der Rausch- und
//! Echo-Entfernung damit Restrauschen nicht mit verstaerkt wird.
//!
//! Die VAD laeuft unabhaengig von der Mutationskette und beobachtet
//! das Signal nach der Rauschunterdrueckung.
//!
//! Config-Updates werden lock-frei per Atomic-Pointer-Swap publiziert;
//! jeder `frame_verarbeiten`-Aufruf sieht genau eine vollstaendige Config.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::debug;

use crate::config::{AudioProcessingConfig, GUELTIGE_ABTASTRATEN};
use crate::dsp::agc::Agc;
use crate::dsp::echo_cancel::{EchoCancelConfig, EchoCanceller};
use crate::dsp::hochpass::{Hochpass, HochpassConfig};
use crate::dsp::noise_suppression::NoiseSuppressor;
use crate::dsp::transient::TransientSuppressor;
use crate::dsp::vad::{Vad, VadConfig};
use crate::dsp::AudioProcessor;
use crate::error::{AudioError, AudioResult};

/// Maximale Frame-Groesse in Samples die der Scratch-Buffer fasst
/// (100ms Stereo bei 48kHz). Groessere Puffer gelten als fehlgeformt
/// und werden unveraendert durchgereicht.
const MAX_SCRATCH_SAMPLES: usize = 9600;

/// Skalierung i16 <-> f32 (Potenz von 2, Round-Trip ist exakt)
const PCM_SKALA: f32 = 32768.0;

// ---------------------------------------------------------------------------
// Statistiken
// ---------------------------------------------------------------------------

/// Statistiken der Pipeline (Snapshot)
#[derive(Debug, Clone, Default)]
pub struct PipelineStatistik {
    /// Frames die durch die Filterkette gelaufen sind
    pub frames_verarbeitet: u64,
    /// Frames die unveraendert durchgereicht wurden (fehlgeformt oder alles aus)
    pub frames_durchgereicht: u64,
}

// ---------------------------------------------------------------------------
// ConfigGriff
// ---------------------------------------------------------------------------

/// Griff fuer Config-Updates aus einem anderen Thread
///
/// Publiziert eine neue, validierte Config per Atomic-Swap. Der
/// Verarbeitungs-Thread sieht beim naechsten Frame entweder die alte
/// oder die neue Config, nie einen Mischzustand.
#[derive(Clone)]
pub struct ConfigGriff {
    inner: Arc<ArcSwap<AudioProcessingConfig>>,
}

impl ConfigGriff {
    /// Publiziert eine neue Config (wirksam ab dem naechsten Frame)
    ///
    /// Ungueltige Configs werden abgelehnt; die bisherige bleibt aktiv.
    pub fn aktualisieren(&self, neu: AudioProcessingConfig) -> AudioResult<()> {
        neu.validieren()?;
        self.inner.store(Arc::new(neu));
        Ok(())
    }

    /// Gibt die aktuell publizierte Config zurueck
    pub fn aktuell(&self) -> Arc<AudioProcessingConfig> {
        self.inner.load_full()
    }
}

// ---------------------------------------------------------------------------
// ProcessingPipeline
// ---------------------------------------------------------------------------

/// Verarbeitungs-Pipeline fuer einen Capture-Stream
///
/// Gehoert exklusiv dem verarbeitenden Thread; nur die Config wird von
/// aussen (ueber `ConfigGriff`) mutiert.
pub struct ProcessingPipeline {
    config: Arc<ArcSwap<AudioProcessingConfig>>,
    /// Zuletzt im Hot Path gesehene Config (fuer Intensitaets-Uebernahme)
    letzte_config: Arc<AudioProcessingConfig>,
    kanaele: u16,
    /// Vorallokierter f32-Arbeitspuffer (keine Allokation im Hot Path)
    scratch: Vec<f32>,
    hochpass: Hochpass,
    rauschen: NoiseSuppressor,
    echo: EchoCanceller,
    agc: Agc,
    transient: TransientSuppressor,
    vad: Vad,
    vad_schwelle: f32,
    statistik: PipelineStatistik,
}

impl ProcessingPipeline {
    /// Erstellt und initialisiert eine Pipeline.
    ///
    /// # Fehler
    /// `Konfiguration` bei ungueltiger Abtastrate, Kanalanzahl oder Config.
    pub fn neu(
        config: AudioProcessingConfig,
        sample_rate: u32,
        kanaele: u16,
    ) -> AudioResult<Self> {
        if !GUELTIGE_ABTASTRATEN.contains(&sample_rate) {
            return Err(AudioError::Konfiguration(format!(
                "Abtastrate {} ungueltig (erlaubt: {:?})",
                sample_rate, GUELTIGE_ABTASTRATEN
            )));
        }
        if !(1..=2).contains(&kanaele) {
            return Err(AudioError::Konfiguration(format!(
                "Kanalanzahl {} ungueltig (erlaubt: 1 oder 2)",
                kanaele
            )));
        }
        config.validieren()?;

        let rate_f = sample_rate as f32;
        let geteilt = Arc::new(config);

        Ok(Self {
            hochpass: Hochpass::neu(
                HochpassConfig::fuer_intensitaet(geteilt.hochpass_intensitaet, rate_f),
                kanaele,
            ),
            rauschen: NoiseSuppressor::neu(geteilt.noise_suppression_intensitaet),
            echo: EchoCanceller::neu(EchoCancelConfig::default(), geteilt.echo_cancel_intensitaet),
            agc: Agc::neu(rate_f, geteilt.agc_intensitaet),
            transient: TransientSuppressor::neu(geteilt.transient_intensitaet, kanaele),
            vad: Vad::neu(VadConfig::default()),
            vad_schwelle: geteilt.vad_schwelle,
            letzte_config: Arc::clone(&geteilt),
            config: Arc::new(ArcSwap::new(geteilt)),
            kanaele,
            scratch: vec![0.0; MAX_SCRATCH_SAMPLES],
            statistik: PipelineStatistik::default(),
        })
    }

    /// Gibt einen klonbaren Griff fuer Config-Updates zurueck
    pub fn config_griff(&self) -> ConfigGriff {
        ConfigGriff {
            inner: Arc::clone(&self.config),
        }
    }

    /// Publiziert eine neue Config (Kurzform fuer `config_griff().aktualisieren`)
    pub fn config_aktualisieren(&self, neu: AudioProcessingConfig) -> AudioResult<()> {
        self.config_griff().aktualisieren(neu)
    }

    /// Speist Far-End-Referenz-Samples (Lautsprecher-Output) fuer die
    /// Echo-Cancellation ein. Aufruf durch die Wiedergabe-Senke.
    pub fn referenz_einspeisen(&mut self, samples: &[i16]) {
        // Kleiner Stack-Umweg waere unnoetig: der Referenz-Ring kopiert ohnehin
        for block in samples.chunks(MAX_SCRATCH_SAMPLES) {
            for (ziel, &quelle) in self.scratch.iter_mut().zip(block.iter()) {
                *ziel = quelle as f32 / PCM_SKALA;
            }
            let laenge = block.len();
            let (scratch, _) = self.scratch.split_at(laenge);
            self.echo.referenz_einspeisen(scratch);
        }
    }

    /// Verarbeitet einen Frame in-place durch die Filterkette.
    ///
    /// Synchron und deterministisch; allokiert nicht. Fehlgeformte Puffer
    /// (leer, nicht kanal-teilbar, zu gross) werden unveraendert
    /// durchgereicht statt die Pipeline abzubrechen – Audio-Kontinuitaet
    /// geht vor kosmetischer Verarbeitung.
    ///
    /// Gibt die Anzahl geschriebener Samples zurueck.
    pub fn frame_verarbeiten(&mut self, samples: &mut [i16]) -> AudioResult<usize> {
        let config = self.config.load_full();
        if !Arc::ptr_eq(&config, &self.letzte_config) {
            self.intensitaeten_uebernehmen(&config);
            self.letzte_config = Arc::clone(&config);
        }

        let n = samples.len();
        if n == 0 || n % self.kanaele as usize != 0 || n > self.scratch.len() {
            debug!(samples = n, "Fehlgeformter Puffer, Frame durchgereicht");
            self.statistik.frames_durchgereicht += 1;
            return Ok(n);
        }

        if !config.irgendein_filter_aktiv() {
            // Bit-identisches Durchreichen; VAD beobachtet trotzdem
            for (ziel, &quelle) in self.scratch.iter_mut().zip(samples.iter()) {
                *ziel = quelle as f32 / PCM_SKALA;
            }
            self.vad.wahrscheinlichkeit(&self.scratch[..n]);
            self.statistik.frames_durchgereicht += 1;
            return Ok(n);
        }

        for (ziel, &quelle) in self.scratch.iter_mut().zip(samples.iter()) {
            *ziel = quelle as f32 / PCM_SKALA;
        }

        {
            let arbeit = &mut self.scratch[..n];

            if config.hochpass_aktiv {
                self.hochpass.process(arbeit);
            }
            if config.noise_suppression_aktiv {
                self.rauschen.process(arbeit);
            }

            // VAD beobachtet das Signal nach der Rauschunterdrueckung
            self.vad.wahrscheinlichkeit(arbeit);

            if config.echo_cancel_aktiv {
                self.echo.process(arbeit);
            }
            if config.agc_aktiv {
                self.agc.process(arbeit);
            }
            if config.transient_aktiv {
                self.transient.process(arbeit);
            }
        }

        for (ziel, &quelle) in samples.iter_mut().zip(self.scratch.iter()) {
            *ziel = (quelle * PCM_SKALA).round().clamp(-32768.0, 32767.0) as i16;
        }

        self.statistik.frames_verarbeitet += 1;
        Ok(n)
    }

    /// Analysiert Samples auf Sprachaktivitaet und gibt eine
    /// Wahrscheinlichkeit in [0.0, 1.0] zurueck. Rein analytisch.
    ///
    /// Im normalen Pfad aktualisiert `frame_verarbeiten` die VAD bereits
    /// mit dem rauschunterdrueckten Signal; dieser Einstieg ist fuer
    /// Aufrufer gedacht, die bereits konditioniertes Material haben.
    pub fn sprachaktivitaet(&mut self, samples: &[i16]) -> f32 {
        let n = samples.len().min(self.scratch.len());
        for (ziel, &quelle) in self.scratch.iter_mut().zip(samples[..n].iter()) {
            *ziel = quelle as f32 / PCM_SKALA;
        }
        self.vad.wahrscheinlichkeit(&self.scratch[..n])
    }

    /// Sprach-Wahrscheinlichkeit des zuletzt verarbeiteten Frames
    pub fn letzte_sprachaktivitaet(&self) -> f32 {
        self.vad.letzte_wahrscheinlichkeit()
    }

    /// Gibt zurueck ob der letzte Frame die konfigurierte VAD-Schwelle erreicht
    pub fn spricht(&self) -> bool {
        self.vad.letzte_wahrscheinlichkeit() >= self.vad_schwelle
    }

    /// Gibt die aktuellen Statistiken zurueck
    pub fn statistik(&self) -> &PipelineStatistik {
        &self.statistik
    }

    /// Setzt alle Filterzustaende zurueck (Historie, Schaetzer)
    pub fn reset(&mut self) {
        self.hochpass.reset();
        self.rauschen.reset();
        self.echo.reset();
        self.agc.reset();
        self.transient.reset();
        self.vad.reset();
    }

    /// Uebernimmt die Intensitaetsstufen einer neuen Config
    fn intensitaeten_uebernehmen(&mut self, config: &AudioProcessingConfig) {
        self.hochpass.set_intensitaet(config.hochpass_intensitaet);
        self.rauschen
            .set_intensitaet(config.noise_suppression_intensitaet);
        self.echo.set_intensitaet(config.echo_cancel_intensitaet);
        self.agc.set_intensitaet(config.agc_intensitaet);
        self.transient.set_intensitaet(config.transient_intensitaet);
        self.vad_schwelle = config.vad_schwelle;
        debug!("Neue Processing-Config uebernommen");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Intensitaet;

    fn sinus_i16(amplitude: f32, laenge: usize) -> Vec<i16> {
        (0..laenge)
            .map(|i| {
                ((2.0 * std::f32::consts::PI * 300.0 * i as f32 / 48000.0).sin()
                    * amplitude
                    * PCM_SKALA) as i16
            })
            .collect()
    }

    #[test]
    fn pipeline_ungueltige_abtastrate_abgelehnt() {
        let result = ProcessingPipeline::neu(AudioProcessingConfig::default(), 22050, 1);
        assert!(result.is_err());
    }

    #[test]
    fn pipeline_ungueltige_kanaele_abgelehnt() {
        let result = ProcessingPipeline::neu(AudioProcessingConfig::default(), 48000, 3);
        assert!(result.is_err());
    }

    #[test]
    fn alles_aus_bit_identisch() {
        let mut pipeline =
            ProcessingPipeline::neu(AudioProcessingConfig::alles_aus(), 48000, 1).unwrap();
        let original = sinus_i16(0.5, 960);
        let mut samples = original.clone();
        let n = pipeline.frame_verarbeiten(&mut samples).unwrap();
        assert_eq!(n, 960);
        assert_eq!(samples, original, "Deaktivierte Pipeline muss bit-identisch sein");
        assert_eq!(pipeline.statistik().frames_durchgereicht, 1);
    }

    #[test]
    fn fehlgeformter_puffer_durchgereicht() {
        let mut pipeline =
            ProcessingPipeline::neu(AudioProcessingConfig::default(), 48000, 2).unwrap();
        // Ungerade Sample-Anzahl bei 2 Kanaelen
        let original = vec![1000i16; 961];
        let mut samples = original.clone();
        let n = pipeline.frame_verarbeiten(&mut samples).unwrap();
        assert_eq!(n, 961);
        assert_eq!(samples, original);
        assert_eq!(pipeline.statistik().frames_durchgereicht, 1);
        assert_eq!(pipeline.statistik().frames_verarbeitet, 0);
    }

    #[test]
    fn zu_grosser_puffer_durchgereicht() {
        let mut pipeline =
            ProcessingPipeline::neu(AudioProcessingConfig::default(), 48000, 1).unwrap();
        let original = vec![1000i16; MAX_SCRATCH_SAMPLES + 1];
        let mut samples = original.clone();
        pipeline.frame_verarbeiten(&mut samples).unwrap();
        assert_eq!(samples, original);
    }

    #[test]
    fn aktive_pipeline_veraendert_signal() {
        let mut pipeline =
            ProcessingPipeline::neu(AudioProcessingConfig::default(), 48000, 1).unwrap();
        let original = sinus_i16(0.02, 960);
        let mut samples = original.clone();
        pipeline.frame_verarbeiten(&mut samples).unwrap();
        assert_ne!(samples, original, "AGC sollte leises Signal anheben");
        assert_eq!(pipeline.statistik().frames_verarbeitet, 1);
    }

    #[test]
    fn config_hot_swap_wirkt_ab_naechstem_frame() {
        let mut pipeline =
            ProcessingPipeline::neu(AudioProcessingConfig::alles_aus(), 48000, 1).unwrap();
        let griff = pipeline.config_griff();

        let original = sinus_i16(0.02, 960);
        let mut samples = original.clone();
        pipeline.frame_verarbeiten(&mut samples).unwrap();
        assert_eq!(samples, original);

        griff.aktualisieren(AudioProcessingConfig::default()).unwrap();

        let mut samples = original.clone();
        pipeline.frame_verarbeiten(&mut samples).unwrap();
        assert_ne!(samples, original, "Neue Config muss ab naechstem Frame wirken");
    }

    #[test]
    fn config_update_ungueltig_bisherige_bleibt() {
        let pipeline =
            ProcessingPipeline::neu(AudioProcessingConfig::default(), 48000, 1).unwrap();
        let griff = pipeline.config_griff();

        let kaputt = AudioProcessingConfig {
            vad_schwelle: 2.0,
            ..Default::default()
        };
        assert!(griff.aktualisieren(kaputt).is_err());
        // Bisherige Config unveraendert aktiv
        assert!((griff.aktuell().vad_schwelle - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn config_hot_swap_nebenlaeufig_konsistent() {
        let mut pipeline =
            ProcessingPipeline::neu(AudioProcessingConfig::default(), 48000, 1).unwrap();
        let griff = pipeline.config_griff();

        let schreiber = std::thread::spawn(move || {
            for i in 0..200 {
                let config = if i % 2 == 0 {
                    AudioProcessingConfig::alles_aus()
                } else {
                    AudioProcessingConfig {
                        agc_intensitaet: Intensitaet::Stark,
                        ..Default::default()
                    }
                };
                griff.aktualisieren(config).unwrap();
            }
        });

        let vorlage = sinus_i16(0.1, 960);
        for _ in 0..200 {
            let mut samples = vorlage.clone();
            pipeline.frame_verarbeiten(&mut samples).unwrap();
        }
        schreiber.join().unwrap();

        let stat = pipeline.statistik();
        assert_eq!(stat.frames_verarbeitet + stat.frames_durchgereicht, 200);
    }

    #[test]
    fn vad_beobachtet_ohne_zu_veraendern() {
        let mut pipeline =
            ProcessingPipeline::neu(AudioProcessingConfig::alles_aus(), 48000, 1).unwrap();
        let laut = sinus_i16(0.5, 960);
        let mut samples = laut.clone();
        for _ in 0..20 {
            pipeline.frame_verarbeiten(&mut samples).unwrap();
        }
        assert!(
            pipeline.letzte_sprachaktivitaet() > 0.5,
            "VAD sollte lautes Signal erkennen: {}",
            pipeline.letzte_sprachaktivitaet()
        );
        assert_eq!(samples, laut);
    }

    #[test]
    fn sprachaktivitaet_direkt_aufrufbar() {
        let mut pipeline =
            ProcessingPipeline::neu(AudioProcessingConfig::default(), 48000, 1).unwrap();
        let p_stille = pipeline.sprachaktivitaet(&vec![0i16; 960]);
        assert!(p_stille < 0.1);
    }

    #[test]
    fn referenz_einspeisen_daempft_echo() {
        let config = AudioProcessingConfig {
            hochpass_aktiv: false,
            noise_suppression_aktiv: false,
            echo_cancel_aktiv: true,
            echo_cancel_intensitaet: Intensitaet::Stark,
            agc_aktiv: false,
            transient_aktiv: false,
            ..Default::default()
        };
        let mut pipeline = ProcessingPipeline::neu(config, 48000, 1).unwrap();

        // Konstantes Referenzsignal, Mikrofon hoert dasselbe Echo
        let referenz = vec![8000i16; 4800];
        pipeline.referenz_einspeisen(&referenz);

        let mut mikro = vec![8000i16; 960];
        pipeline.frame_verarbeiten(&mut mikro).unwrap();
        let rest: f64 =
            mikro.iter().map(|&s| (s as f64).abs()).sum::<f64>() / mikro.len() as f64;
        assert!(rest < 4000.0, "Echo nicht gedaempft: {}", rest);
    }
}
