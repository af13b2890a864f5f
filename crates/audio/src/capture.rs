//! Audio-Capture
//!
//! `CaptureDevice` ist die Fassade fuer die Aufnahme: ein austauschbares
//! `CaptureBackend` betreibt den eigentlichen Aufnahme-Thread und liefert
//! Frames fester Groesse ueber einen Callback. Steuerzustand (Stumm,
//! Lautstaerke, Verwurfszaehler) liegt in einer geteilten, atomaren
//! `CaptureSteuerung`, damit der Audio-Thread nie auf ein Lock wartet.
//!
//! Stummschalten haelt den Thread am Leben: der Takt laeuft weiter,
//! aber der Callback wird nicht aufgerufen. Stumme Abschnitte erzeugen
//! so keinen Paketstrom aus Stille-Frames.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use tracing::{debug, info, warn};

use crate::config::AudioCaptureConfig;
use crate::device::GeraeteInfo;
use crate::error::{AudioError, AudioResult};

/// Callback fuer aufgenommene Frames: (Samples interleaved, Frames, Kanaele).
///
/// Wird aus dem Capture-Thread aufgerufen und darf nicht blockieren.
pub type FrameCallback = Box<dyn FnMut(&[i16], usize, u16) + Send + 'static>;

// ---------------------------------------------------------------------------
// CaptureSteuerung
// ---------------------------------------------------------------------------

/// Atomarer Steuerzustand, geteilt zwischen Aufrufer und Capture-Thread
#[derive(Debug)]
pub struct CaptureSteuerung {
    stumm: AtomicBool,
    /// Lautstaerke [0.0, 1.0] als f32-Bits abgelegt
    lautstaerke_bits: AtomicU32,
    /// Frames die wegen vollem Abnehmer verworfen wurden (Drop-Newest)
    verworfene_frames: AtomicU64,
}

impl Default for CaptureSteuerung {
    fn default() -> Self {
        Self {
            stumm: AtomicBool::new(false),
            lautstaerke_bits: AtomicU32::new(1.0f32.to_bits()),
            verworfene_frames: AtomicU64::new(0),
        }
    }
}

impl CaptureSteuerung {
    pub fn ist_stumm(&self) -> bool {
        self.stumm.load(Ordering::Relaxed)
    }

    pub fn stumm_setzen(&self, stumm: bool) {
        self.stumm.store(stumm, Ordering::Relaxed);
    }

    pub fn lautstaerke(&self) -> f32 {
        f32::from_bits(self.lautstaerke_bits.load(Ordering::Relaxed))
    }

    /// Setzt die Lautstaerke, geklemmt auf [0.0, 1.0]
    pub fn lautstaerke_setzen(&self, wert: f32) {
        let geklemmt = wert.clamp(0.0, 1.0);
        self.lautstaerke_bits
            .store(geklemmt.to_bits(), Ordering::Relaxed);
    }

    /// Zaehlt einen verworfenen Frame (Abnehmer-Queue war voll)
    pub fn verworfen_zaehlen(&self) {
        self.verworfene_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn verworfene_frames(&self) -> u64 {
        self.verworfene_frames.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// CaptureBackend
// ---------------------------------------------------------------------------

/// Austauschbares Aufnahme-Backend (Hardware oder Takt-Simulation)
pub trait CaptureBackend: Send {
    /// Startet den Aufnahme-Thread.
    ///
    /// Der Callback wird pro vollem Puffer genau einmal aufgerufen.
    fn starten(
        &mut self,
        config: &AudioCaptureConfig,
        steuerung: Arc<CaptureSteuerung>,
        callback: FrameCallback,
    ) -> AudioResult<()>;

    /// Stoppt den Aufnahme-Thread und wartet auf dessen Ende
    fn stoppen(&mut self) -> AudioResult<()>;

    /// Gibt zurueck ob das Backend gerade aufnimmt
    fn laeuft(&self) -> bool;

    /// Listet die verfuegbaren Eingabegeraete auf
    fn geraete(&self) -> AudioResult<Vec<GeraeteInfo>>;
}

// ---------------------------------------------------------------------------
// TaktBackend
// ---------------------------------------------------------------------------

/// Takt-getriebenes Backend ohne Hardware-Abhaengigkeit.
///
/// Liefert Frames im exakten Puffer-Takt (Instant-basiert, driftfrei).
/// Ohne Einspeisung sind die Frames Stille; ueber `mit_einspeisung`
/// koennen Tests und Loopback-Quellen Sample-Material anliefern. Liegt
/// beim Tick kein Material an, wird Stille geliefert statt zu warten.
pub struct TaktBackend {
    aktiv: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    einspeisung: Option<Receiver<Vec<i16>>>,
}

impl TaktBackend {
    pub fn neu() -> Self {
        Self {
            aktiv: Arc::new(AtomicBool::new(false)),
            thread: None,
            einspeisung: None,
        }
    }

    /// Backend mit Sample-Einspeisung; der Sender-Seite obliegt
    /// Drop-Newest bei vollem Kanal.
    pub fn mit_einspeisung(empfaenger: Receiver<Vec<i16>>) -> Self {
        Self {
            aktiv: Arc::new(AtomicBool::new(false)),
            thread: None,
            einspeisung: Some(empfaenger),
        }
    }
}

impl Default for TaktBackend {
    fn default() -> Self {
        Self::neu()
    }
}

impl CaptureBackend for TaktBackend {
    fn starten(
        &mut self,
        config: &AudioCaptureConfig,
        steuerung: Arc<CaptureSteuerung>,
        mut callback: FrameCallback,
    ) -> AudioResult<()> {
        if self.aktiv.load(Ordering::SeqCst) {
            return Err(AudioError::LaeuftBereits);
        }

        let aktiv = Arc::clone(&self.aktiv);
        aktiv.store(true, Ordering::SeqCst);

        let puffer_frames = config.puffer_frames;
        let kanaele = config.kanaele;
        let samples_pro_puffer = config.samples_pro_puffer();
        let takt = config.puffer_dauer();
        let einspeisung = self.einspeisung.take();

        let thread_aktiv = Arc::clone(&self.aktiv);
        let handle = std::thread::Builder::new()
            .name("stimmwerk-capture".into())
            .spawn(move || {
                let mut samples = vec![0i16; samples_pro_puffer];
                let mut naechster_tick = Instant::now() + takt;

                while thread_aktiv.load(Ordering::SeqCst) {
                    let jetzt = Instant::now();
                    if jetzt < naechster_tick {
                        std::thread::sleep(naechster_tick - jetzt);
                    }
                    naechster_tick += takt;

                    // Material holen oder Stille liefern
                    match einspeisung.as_ref().and_then(|rx| rx.try_recv().ok()) {
                        Some(eingespeist) => {
                            let n = eingespeist.len().min(samples.len());
                            samples[..n].copy_from_slice(&eingespeist[..n]);
                            samples[n..].fill(0);
                        }
                        None => samples.fill(0),
                    }

                    // Stumm: Takt laeuft weiter, Callback entfaellt
                    if steuerung.ist_stumm() {
                        continue;
                    }

                    let lautstaerke = steuerung.lautstaerke();
                    if lautstaerke < 1.0 {
                        for s in samples.iter_mut() {
                            *s = (*s as f32 * lautstaerke) as i16;
                        }
                    }

                    callback(&samples, puffer_frames, kanaele);
                }

                debug!("Capture-Thread beendet");
            })
            .map_err(|e| AudioError::StreamFehler(format!("Thread-Start fehlgeschlagen: {}", e)))?;

        self.thread = Some(handle);
        info!(
            puffer_frames,
            kanaele,
            takt_ms = takt.as_millis() as u64,
            "Takt-Capture gestartet"
        );
        Ok(())
    }

    fn stoppen(&mut self) -> AudioResult<()> {
        self.aktiv.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                warn!("Capture-Thread mit Panik beendet");
            }
        }
        Ok(())
    }

    fn laeuft(&self) -> bool {
        self.aktiv.load(Ordering::SeqCst)
    }

    fn geraete(&self) -> AudioResult<Vec<GeraeteInfo>> {
        Ok(vec![GeraeteInfo {
            name: "Takt-Simulation".to_string(),
            standard: true,
        }])
    }
}

impl Drop for TaktBackend {
    fn drop(&mut self) {
        let _ = self.stoppen();
    }
}

// ---------------------------------------------------------------------------
// CaptureDevice
// ---------------------------------------------------------------------------

/// Fassade fuer die Audio-Aufnahme eines Clients
pub struct CaptureDevice {
    backend: Box<dyn CaptureBackend>,
    config: AudioCaptureConfig,
    steuerung: Arc<CaptureSteuerung>,
    aktiv: bool,
}

impl CaptureDevice {
    /// Erstellt ein Capture-Geraet mit validierter Config
    pub fn neu(backend: Box<dyn CaptureBackend>, config: AudioCaptureConfig) -> AudioResult<Self> {
        config.validieren()?;
        Ok(Self {
            backend,
            config,
            steuerung: Arc::new(CaptureSteuerung::default()),
            aktiv: false,
        })
    }

    /// Startet die Aufnahme.
    ///
    /// # Fehler
    /// `LaeuftBereits` wenn bereits eine Aufnahme laeuft.
    pub fn starten(&mut self, callback: FrameCallback) -> AudioResult<()> {
        if self.aktiv {
            return Err(AudioError::LaeuftBereits);
        }
        self.backend
            .starten(&self.config, Arc::clone(&self.steuerung), callback)?;
        self.aktiv = true;
        Ok(())
    }

    /// Stoppt die Aufnahme. Idempotent: erneutes Stoppen ist ein No-Op.
    pub fn stoppen(&mut self) -> AudioResult<()> {
        if !self.aktiv {
            return Ok(());
        }
        self.backend.stoppen()?;
        self.aktiv = false;
        info!(
            verworfen = self.steuerung.verworfene_frames(),
            "Aufnahme gestoppt"
        );
        Ok(())
    }

    pub fn ist_aktiv(&self) -> bool {
        self.aktiv
    }

    /// Listet die verfuegbaren Eingabegeraete des Backends auf
    pub fn geraete_auflisten(&self) -> AudioResult<Vec<GeraeteInfo>> {
        self.backend.geraete()
    }

    /// Waehlt das Eingabegeraet (None = Systemstandard).
    ///
    /// Der Name wird gegen die Geraeteliste des Backends geprueft.
    /// Nur im gestoppten Zustand erlaubt; ein Geraetewechsel unter
    /// laufender Aufnahme wuerde den Stream abreissen.
    pub fn geraet_setzen(&mut self, geraet: Option<String>) -> AudioResult<()> {
        if self.aktiv {
            return Err(AudioError::LaeuftNoch);
        }
        if let Some(name) = &geraet {
            let bekannt = self.backend.geraete()?.iter().any(|g| &g.name == name);
            if !bekannt {
                return Err(AudioError::GeraetNichtGefunden(name.clone()));
            }
        }
        self.config.geraet = geraet;
        Ok(())
    }

    /// Schaltet die Aufnahme stumm ohne den Thread zu stoppen
    pub fn stumm_setzen(&mut self, stumm: bool) {
        self.steuerung.stumm_setzen(stumm);
        debug!(stumm, "Stummschaltung geaendert");
    }

    pub fn ist_stumm(&self) -> bool {
        self.steuerung.ist_stumm()
    }

    /// Setzt die Eingangs-Lautstaerke, geklemmt auf [0.0, 1.0]
    pub fn lautstaerke_setzen(&mut self, wert: f32) {
        self.steuerung.lautstaerke_setzen(wert);
    }

    pub fn lautstaerke(&self) -> f32 {
        self.steuerung.lautstaerke()
    }

    /// Geteilter Steuerzustand, z.B. fuer Verwurfszaehler des Abnehmers
    pub fn steuerung(&self) -> Arc<CaptureSteuerung> {
        Arc::clone(&self.steuerung)
    }

    pub fn config(&self) -> &AudioCaptureConfig {
        &self.config
    }
}

impl Drop for CaptureDevice {
    fn drop(&mut self) {
        let _ = self.stoppen();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn test_config() -> AudioCaptureConfig {
        AudioCaptureConfig {
            puffer_frames: 480, // 10ms bei 48kHz
            ..Default::default()
        }
    }

    fn geraet() -> CaptureDevice {
        CaptureDevice::neu(Box::new(TaktBackend::neu()), test_config()).unwrap()
    }

    #[test]
    fn start_liefert_frames_im_takt() {
        let mut device = geraet();
        let zeiten: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));
        let zeiten_cb = Arc::clone(&zeiten);

        device
            .starten(Box::new(move |samples, frames, kanaele| {
                assert_eq!(samples.len(), 480);
                assert_eq!(frames, 480);
                assert_eq!(kanaele, 1);
                zeiten_cb.lock().push(Instant::now());
            }))
            .unwrap();

        std::thread::sleep(Duration::from_millis(120));
        device.stoppen().unwrap();

        let zeiten = zeiten.lock();
        assert!(
            zeiten.len() >= 6,
            "Zu wenige Frames in 120ms: {}",
            zeiten.len()
        );
        // Abstand zwischen Callbacks: nominal 10ms, Toleranz eine Pufferdauer
        for paar in zeiten.windows(2) {
            let abstand = paar[1] - paar[0];
            assert!(
                abstand <= Duration::from_millis(20),
                "Callback-Abstand zu gross: {:?}",
                abstand
            );
        }
    }

    #[test]
    fn doppelstart_abgelehnt() {
        let mut device = geraet();
        device.starten(Box::new(|_, _, _| {})).unwrap();
        let zweiter = device.starten(Box::new(|_, _, _| {}));
        assert!(matches!(zweiter, Err(AudioError::LaeuftBereits)));
        device.stoppen().unwrap();
    }

    #[test]
    fn stoppen_ist_idempotent() {
        let mut device = geraet();
        device.starten(Box::new(|_, _, _| {})).unwrap();
        device.stoppen().unwrap();
        device.stoppen().unwrap();
        device.stoppen().unwrap();
        assert!(!device.ist_aktiv());
    }

    #[test]
    fn stoppen_ohne_start_ist_noop() {
        let mut device = geraet();
        device.stoppen().unwrap();
    }

    #[test]
    fn stummschaltung_unterdrueckt_callbacks_ohne_den_thread_zu_stoppen() {
        let mut device = geraet();
        device.stumm_setzen(true);

        let anzahl: Arc<Mutex<usize>> = Arc::new(Mutex::new(0));
        let anzahl_cb = Arc::clone(&anzahl);
        device
            .starten(Box::new(move |_, _, _| {
                *anzahl_cb.lock() += 1;
            }))
            .unwrap();

        // Waehrend der Stummschaltung darf kein Callback kommen
        std::thread::sleep(Duration::from_millis(80));
        assert_eq!(*anzahl.lock(), 0);
        assert!(device.ist_aktiv());

        // Aufheben: der Thread lebt noch und liefert sofort wieder
        device.stumm_setzen(false);
        std::thread::sleep(Duration::from_millis(80));
        device.stoppen().unwrap();
        assert!(*anzahl.lock() >= 3, "Nach dem Aufheben muessen wieder Frames kommen");
    }

    #[test]
    fn einspeisung_erreicht_callback() {
        let (tx, rx) = crossbeam_channel::bounded::<Vec<i16>>(8);
        let mut device =
            CaptureDevice::neu(Box::new(TaktBackend::mit_einspeisung(rx)), test_config()).unwrap();

        let maximum: Arc<Mutex<i16>> = Arc::new(Mutex::new(0));
        let maximum_cb = Arc::clone(&maximum);
        device
            .starten(Box::new(move |samples, _, _| {
                let spitze = samples.iter().copied().max().unwrap_or(0);
                let mut m = maximum_cb.lock();
                *m = (*m).max(spitze);
            }))
            .unwrap();

        for _ in 0..4 {
            let _ = tx.try_send(vec![9000i16; 480]);
        }
        std::thread::sleep(Duration::from_millis(80));
        device.stoppen().unwrap();

        assert_eq!(*maximum.lock(), 9000);
    }

    #[test]
    fn lautstaerke_wird_geklemmt() {
        let mut device = geraet();
        device.lautstaerke_setzen(1.5);
        assert!((device.lautstaerke() - 1.0).abs() < f32::EPSILON);
        device.lautstaerke_setzen(-0.5);
        assert!(device.lautstaerke().abs() < f32::EPSILON);
    }

    #[test]
    fn geraetewechsel_nur_im_stillstand() {
        let mut device = geraet();
        device.starten(Box::new(|_, _, _| {})).unwrap();
        assert!(matches!(
            device.geraet_setzen(Some("Takt-Simulation".into())),
            Err(AudioError::LaeuftNoch)
        ));
        device.stoppen().unwrap();
        device.geraet_setzen(Some("Takt-Simulation".into())).unwrap();
        assert_eq!(device.config().geraet.as_deref(), Some("Takt-Simulation"));
    }

    #[test]
    fn unbekanntes_geraet_abgelehnt() {
        let mut device = geraet();
        assert!(matches!(
            device.geraet_setzen(Some("gibt-es-nicht".into())),
            Err(AudioError::GeraetNichtGefunden(_))
        ));
        // Config bleibt unveraendert, Standard weiter waehlbar
        assert_eq!(device.config().geraet, None);
        device.geraet_setzen(None).unwrap();
    }

    #[test]
    fn verwurfszaehler_zaehlt() {
        let device = geraet();
        let steuerung = device.steuerung();
        steuerung.verworfen_zaehlen();
        steuerung.verworfen_zaehlen();
        assert_eq!(steuerung.verworfene_frames(), 2);
    }
}
