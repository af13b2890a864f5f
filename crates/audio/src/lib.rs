//! Stimmwerk Audio
//!
//! Aufnahme und Verarbeitung des lokalen Mikrofonsignals: ein
//! austauschbares Capture-Backend liefert PCM-Frames fester Groesse,
//! die Processing-Pipeline fuehrt sie durch die DSP-Filterkette
//! (Hochpass, Rauschunterdrueckung, Echo-Cancellation, AGC,
//! Transienten-Unterdrueckung) und schaetzt parallel die
//! Sprachaktivitaet.
//!
//! Alles hier ist synchron und echtzeit-tauglich: keine Locks und keine
//! Allokationen im Frame-Pfad.

pub mod capture;
pub mod config;
#[cfg(feature = "cpal-backend")]
pub mod cpal_backend;
pub mod device;
pub mod dsp;
pub mod error;
pub mod frame;
pub mod pipeline;

pub use capture::{CaptureBackend, CaptureDevice, CaptureSteuerung, FrameCallback, TaktBackend};
pub use config::{AudioCaptureConfig, AudioProcessingConfig, Intensitaet};
pub use device::{standard_backend, GeraeteInfo};
pub use error::{AudioError, AudioResult};
pub use frame::AudioFrame;
pub use pipeline::{ConfigGriff, PipelineStatistik, ProcessingPipeline};
