//! Konfigurationstypen fuer Capture und Verarbeitung
//!
//! `AudioCaptureConfig` ist waehrend einer laufenden Session unveraenderlich;
//! Aenderungen erfordern Stop und Neustart. `AudioProcessingConfig` ist
//! hot-swappable und wird lock-frei an die Pipeline publiziert.

use serde::{Deserialize, Serialize};

use crate::error::{AudioError, AudioResult};

/// Zulaessige Abtastraten in Hz
pub const GUELTIGE_ABTASTRATEN: [u32; 4] = [8000, 16000, 44100, 48000];

/// Zulaessige Bit-Tiefen pro Sample
pub const GUELTIGE_BIT_TIEFEN: [u8; 3] = [16, 24, 32];

// ---------------------------------------------------------------------------
// AudioCaptureConfig
// ---------------------------------------------------------------------------

/// Konfiguration fuer den Audio-Capture
///
/// Nach `CaptureDevice::starten` unveraenderlich – das Geraet muss fuer
/// Aenderungen gestoppt und neu gestartet werden.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioCaptureConfig {
    /// Abtastrate in Hz
    pub sample_rate: u32,
    /// Kanalanzahl (1 = Mono, 2 = Stereo)
    pub kanaele: u16,
    /// Bit-Tiefe pro Sample
    pub bits_pro_sample: u8,
    /// Puffer-Groesse in Frames (Samples pro Kanal und Callback)
    pub puffer_frames: usize,
    /// Geraete-Bezeichner (None = Standard-Geraet)
    pub geraet: Option<String>,
    /// AGC beim Capture aktiv
    pub agc_aktiv: bool,
    /// Rauschunterdrueckung beim Capture aktiv
    pub noise_suppression_aktiv: bool,
    /// Echo-Cancellation beim Capture aktiv
    pub echo_cancel_aktiv: bool,
}

impl Default for AudioCaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            kanaele: 1,
            bits_pro_sample: 16,
            puffer_frames: 960, // 20ms bei 48kHz
            geraet: None,
            agc_aktiv: true,
            noise_suppression_aktiv: true,
            echo_cancel_aktiv: true,
        }
    }
}

impl AudioCaptureConfig {
    /// Validiert die Konfiguration gegen die zulaessigen Wertemengen
    pub fn validieren(&self) -> AudioResult<()> {
        if !GUELTIGE_ABTASTRATEN.contains(&self.sample_rate) {
            return Err(AudioError::Konfiguration(format!(
                "Abtastrate {} ungueltig (erlaubt: {:?})",
                self.sample_rate, GUELTIGE_ABTASTRATEN
            )));
        }
        if !(1..=2).contains(&self.kanaele) {
            return Err(AudioError::Konfiguration(format!(
                "Kanalanzahl {} ungueltig (erlaubt: 1 oder 2)",
                self.kanaele
            )));
        }
        if !GUELTIGE_BIT_TIEFEN.contains(&self.bits_pro_sample) {
            return Err(AudioError::Konfiguration(format!(
                "Bit-Tiefe {} ungueltig (erlaubt: {:?})",
                self.bits_pro_sample, GUELTIGE_BIT_TIEFEN
            )));
        }
        if self.puffer_frames == 0 {
            return Err(AudioError::Konfiguration(
                "Puffer-Groesse muss > 0 sein".into(),
            ));
        }
        Ok(())
    }

    /// Dauer eines Capture-Puffers
    pub fn puffer_dauer(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.puffer_frames as f64 / self.sample_rate as f64)
    }

    /// Samples pro Callback (Frames x Kanaele)
    pub fn samples_pro_puffer(&self) -> usize {
        self.puffer_frames * self.kanaele as usize
    }
}

// ---------------------------------------------------------------------------
// Intensitaet
// ---------------------------------------------------------------------------

/// Intensitaetsstufe eines Filters (0–3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Intensitaet {
    /// Stufe 0 – kaum hoerbarer Eingriff
    Minimal = 0,
    /// Stufe 1 – leichter Eingriff
    Leicht = 1,
    /// Stufe 2 – Standardeinstellung
    #[default]
    Mittel = 2,
    /// Stufe 3 – aggressiver Eingriff
    Stark = 3,
}

impl Intensitaet {
    /// Konvertiert eine Stufe 0–3; groessere Werte werden auf 3 begrenzt
    pub fn aus_stufe(stufe: u8) -> Self {
        match stufe {
            0 => Self::Minimal,
            1 => Self::Leicht,
            2 => Self::Mittel,
            _ => Self::Stark,
        }
    }

    /// Numerische Stufe (0–3)
    pub fn stufe(&self) -> u8 {
        *self as u8
    }
}

// ---------------------------------------------------------------------------
// AudioProcessingConfig
// ---------------------------------------------------------------------------

/// Konfiguration der Verarbeitungs-Pipeline
///
/// Jeder Filter hat unabhaengige Aktivierung und Intensitaet. Die Config
/// wird als Ganzes per Atomic-Pointer-Swap publiziert; `frame_verarbeiten`
/// sieht immer entweder die alte oder die neue vollstaendige Config,
/// nie einen Mischzustand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioProcessingConfig {
    /// Hochpass (entfernt DC-Offset und Trittschall)
    pub hochpass_aktiv: bool,
    pub hochpass_intensitaet: Intensitaet,
    /// Rauschunterdrueckung
    pub noise_suppression_aktiv: bool,
    pub noise_suppression_intensitaet: Intensitaet,
    /// Echo-Cancellation
    pub echo_cancel_aktiv: bool,
    pub echo_cancel_intensitaet: Intensitaet,
    /// Automatic Gain Control
    pub agc_aktiv: bool,
    pub agc_intensitaet: Intensitaet,
    /// Transienten-Unterdrueckung (Klicks/Knackser)
    pub transient_aktiv: bool,
    pub transient_intensitaet: Intensitaet,
    /// VAD-Schwellenwert in [0.0, 1.0] – wird vom Aufrufer auf die
    /// kontinuierliche Wahrscheinlichkeit angewendet
    pub vad_schwelle: f32,
}

impl Default for AudioProcessingConfig {
    fn default() -> Self {
        Self {
            hochpass_aktiv: true,
            hochpass_intensitaet: Intensitaet::Mittel,
            noise_suppression_aktiv: true,
            noise_suppression_intensitaet: Intensitaet::Mittel,
            echo_cancel_aktiv: true,
            echo_cancel_intensitaet: Intensitaet::Mittel,
            agc_aktiv: true,
            agc_intensitaet: Intensitaet::Mittel,
            transient_aktiv: true,
            transient_intensitaet: Intensitaet::Mittel,
            vad_schwelle: 0.5,
        }
    }
}

impl AudioProcessingConfig {
    /// Validiert die Konfiguration
    pub fn validieren(&self) -> AudioResult<()> {
        if !(0.0..=1.0).contains(&self.vad_schwelle) {
            return Err(AudioError::Konfiguration(format!(
                "VAD-Schwellenwert {} ausserhalb [0.0, 1.0]",
                self.vad_schwelle
            )));
        }
        Ok(())
    }

    /// Config mit allen Filtern deaktiviert (Frame bleibt bit-identisch)
    pub fn alles_aus() -> Self {
        Self {
            hochpass_aktiv: false,
            noise_suppression_aktiv: false,
            echo_cancel_aktiv: false,
            agc_aktiv: false,
            transient_aktiv: false,
            ..Self::default()
        }
    }

    /// Gibt zurueck ob mindestens ein Filter aktiv ist
    pub fn irgendein_filter_aktiv(&self) -> bool {
        self.hochpass_aktiv
            || self.noise_suppression_aktiv
            || self.echo_cancel_aktiv
            || self.agc_aktiv
            || self.transient_aktiv
    }
}
