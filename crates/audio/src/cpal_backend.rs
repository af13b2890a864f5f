//! cpal-Hardware-Backend (Feature `cpal-backend`)
//!
//! Betreibt den cpal-Input-Stream in einem eigenen Thread, weil der
//! Stream nicht Send ist. Gelieferte Chunks beliebiger Groesse werden
//! zu Frames fester Puffergroesse akkumuliert, erst dann feuert der
//! Callback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, StreamConfig};
use tracing::{error, info, warn};

use crate::capture::{CaptureBackend, CaptureSteuerung, FrameCallback};
use crate::config::AudioCaptureConfig;
use crate::device::GeraeteInfo;
use crate::error::{AudioError, AudioResult};

/// Hardware-Backend ueber cpal
pub struct CpalBackend {
    aktiv: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl CpalBackend {
    pub fn neu() -> Self {
        Self {
            aktiv: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }

    fn geraet_finden(config: &AudioCaptureConfig) -> AudioResult<cpal::Device> {
        let host = cpal::default_host();
        match &config.geraet {
            Some(name) => host
                .input_devices()
                .map_err(|e| AudioError::StreamFehler(e.to_string()))?
                .find(|d| d.name().map(|n| &n == name).unwrap_or(false))
                .ok_or_else(|| AudioError::GeraetNichtGefunden(name.clone())),
            None => host
                .default_input_device()
                .ok_or(AudioError::KeinStandardEingabegeraet),
        }
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::neu()
    }
}

/// Akkumuliert Chunks zu Frames fester Groesse
struct FrameSammler {
    samples: Vec<i16>,
    ziel_laenge: usize,
    puffer_frames: usize,
    kanaele: u16,
    steuerung: Arc<CaptureSteuerung>,
    callback: FrameCallback,
}

impl FrameSammler {
    fn schieben(&mut self, chunk: &[i16]) {
        for &sample in chunk {
            self.samples.push(sample);
            if self.samples.len() == self.ziel_laenge {
                // Stumm: Frame verwerfen, Callback entfaellt
                if self.steuerung.ist_stumm() {
                    self.samples.clear();
                    continue;
                }
                let lautstaerke = self.steuerung.lautstaerke();
                if lautstaerke < 1.0 {
                    for s in self.samples.iter_mut() {
                        *s = (*s as f32 * lautstaerke) as i16;
                    }
                }
                (self.callback)(&self.samples, self.puffer_frames, self.kanaele);
                self.samples.clear();
            }
        }
    }
}

impl CaptureBackend for CpalBackend {
    fn starten(
        &mut self,
        config: &AudioCaptureConfig,
        steuerung: Arc<CaptureSteuerung>,
        callback: FrameCallback,
    ) -> AudioResult<()> {
        if self.aktiv.load(Ordering::SeqCst) {
            return Err(AudioError::LaeuftBereits);
        }
        self.aktiv.store(true, Ordering::SeqCst);

        let config = config.clone();
        let thread_aktiv = Arc::clone(&self.aktiv);
        let (bereit_tx, bereit_rx) = crossbeam_channel::bounded::<AudioResult<()>>(1);

        // Der cpal-Stream ist nicht Send; er lebt vollstaendig in diesem Thread
        let handle = std::thread::Builder::new()
            .name("stimmwerk-cpal".into())
            .spawn(move || {
                let geraet = match Self::geraet_finden(&config) {
                    Ok(g) => g,
                    Err(e) => {
                        let _ = bereit_tx.send(Err(e));
                        return;
                    }
                };

                let format = match geraet.default_input_config() {
                    Ok(f) => f.sample_format(),
                    Err(e) => {
                        let _ = bereit_tx.send(Err(AudioError::StreamFehler(e.to_string())));
                        return;
                    }
                };

                let stream_config = StreamConfig {
                    channels: config.kanaele,
                    sample_rate: SampleRate(config.sample_rate),
                    buffer_size: cpal::BufferSize::Default,
                };

                let mut sammler = FrameSammler {
                    samples: Vec::with_capacity(config.samples_pro_puffer()),
                    ziel_laenge: config.samples_pro_puffer(),
                    puffer_frames: config.puffer_frames,
                    kanaele: config.kanaele,
                    steuerung,
                    callback,
                };

                // Ein Stream-Fehler (z.B. Geraet entfernt) beendet die
                // Aufnahme-Session; der Thread raeumt den Stream ab
                let fehler_aktiv = Arc::clone(&thread_aktiv);
                let fehler_cb = move |e: cpal::StreamError| {
                    error!(fehler = %e, "cpal-Stream-Fehler, Aufnahme endet");
                    fehler_aktiv.store(false, Ordering::SeqCst);
                };

                let stream = match format {
                    SampleFormat::I16 => geraet.build_input_stream(
                        &stream_config,
                        move |daten: &[i16], _: &cpal::InputCallbackInfo| {
                            sammler.schieben(daten);
                        },
                        fehler_cb,
                        None,
                    ),
                    SampleFormat::F32 => {
                        let mut konvertiert: Vec<i16> = Vec::new();
                        geraet.build_input_stream(
                            &stream_config,
                            move |daten: &[f32], _: &cpal::InputCallbackInfo| {
                                konvertiert.clear();
                                konvertiert.extend(daten.iter().map(|&s| {
                                    (s * 32768.0).round().clamp(-32768.0, 32767.0) as i16
                                }));
                                sammler.schieben(&konvertiert);
                            },
                            fehler_cb,
                            None,
                        )
                    }
                    anderes => {
                        let _ = bereit_tx.send(Err(AudioError::StreamFehler(format!(
                            "Sample-Format {:?} nicht unterstuetzt",
                            anderes
                        ))));
                        return;
                    }
                };

                let stream = match stream {
                    Ok(s) => s,
                    Err(e) => {
                        let _ = bereit_tx.send(Err(AudioError::StreamFehler(e.to_string())));
                        return;
                    }
                };

                if let Err(e) = stream.play() {
                    let _ = bereit_tx.send(Err(AudioError::StreamFehler(e.to_string())));
                    return;
                }
                let _ = bereit_tx.send(Ok(()));
                info!("cpal-Capture gestartet");

                while thread_aktiv.load(Ordering::SeqCst) {
                    std::thread::sleep(Duration::from_millis(20));
                }
                drop(stream);
            })
            .map_err(|e| AudioError::StreamFehler(format!("Thread-Start fehlgeschlagen: {}", e)))?;

        self.thread = Some(handle);

        // Auf Stream-Aufbau warten, damit Fehler synchron gemeldet werden
        match bereit_rx.recv_timeout(Duration::from_secs(5)) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                self.aktiv.store(false, Ordering::SeqCst);
                if let Some(handle) = self.thread.take() {
                    let _ = handle.join();
                }
                Err(e)
            }
            Err(_) => {
                self.aktiv.store(false, Ordering::SeqCst);
                Err(AudioError::StreamFehler(
                    "Zeitueberschreitung beim Stream-Aufbau".into(),
                ))
            }
        }
    }

    fn stoppen(&mut self) -> AudioResult<()> {
        self.aktiv.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                warn!("cpal-Thread mit Panik beendet");
            }
        }
        Ok(())
    }

    fn laeuft(&self) -> bool {
        self.aktiv.load(Ordering::SeqCst)
    }

    fn geraete(&self) -> AudioResult<Vec<GeraeteInfo>> {
        let host = cpal::default_host();
        let standard_name = host
            .default_input_device()
            .and_then(|d| d.name().ok());
        let geraete = host
            .input_devices()
            .map_err(|e| AudioError::StreamFehler(e.to_string()))?
            .filter_map(|d| d.name().ok())
            .map(|name| GeraeteInfo {
                standard: standard_name.as_deref() == Some(name.as_str()),
                name,
            })
            .collect();
        Ok(geraete)
    }
}

impl Drop for CpalBackend {
    fn drop(&mut self) {
        let _ = self.stoppen();
    }
}
