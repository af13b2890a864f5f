//! Verlust-Verdeckung (Packet Loss Concealment)
//!
//! Ersetzt fehlende Frames durch eine ausgeblendete Wiederholung des
//! zuletzt empfangenen Frames. Jeder weitere aufeinanderfolgende
//! Verlust blendet staerker aus; nach `MAX_WIEDERHOLUNGEN` Verlusten
//! in Folge wird Stille geliefert, damit aus einer abgerissenen
//! Verbindung kein stehender Ton wird.

use tracing::trace;

use stimmwerk_audio::AudioFrame;

/// Aufeinanderfolgende Verluste bis auf Stille umgeschaltet wird
pub const MAX_WIEDERHOLUNGEN: u32 = 5;

/// Ausblend-Faktor pro aufeinanderfolgendem Verlust
const FADE: f32 = 0.5;

/// Statistiken der Verdeckung (Snapshot)
#[derive(Debug, Clone, Default)]
pub struct VerdeckungsStatistik {
    /// Regulaer gelieferte Frames
    pub echte_frames: u64,
    /// Durch Wiederholung verdeckte Frames
    pub verdeckte_frames: u64,
    /// Als Stille gelieferte Frames (Verlustserie zu lang)
    pub stille_frames: u64,
}

impl VerdeckungsStatistik {
    /// Anteil verdeckter und stiller Frames an allen gelieferten
    pub fn verlust_rate(&self) -> f64 {
        let gesamt = self.echte_frames + self.verdeckte_frames + self.stille_frames;
        if gesamt == 0 {
            return 0.0;
        }
        (self.verdeckte_frames + self.stille_frames) as f64 / gesamt as f64
    }
}

/// Verdeckt Frame-Verluste eines einzelnen Empfangs-Streams
pub struct Verdecker {
    frames_pro_puffer: usize,
    kanaele: u16,
    letzter_frame: Option<Vec<i16>>,
    verluste_in_folge: u32,
    statistik: VerdeckungsStatistik,
}

impl Verdecker {
    pub fn neu(frames_pro_puffer: usize, kanaele: u16) -> Self {
        Self {
            frames_pro_puffer,
            kanaele: kanaele.max(1),
            letzter_frame: None,
            verluste_in_folge: 0,
            statistik: VerdeckungsStatistik::default(),
        }
    }

    /// Meldet einen regulaer empfangenen Frame und merkt ihn sich als
    /// Wiederholungs-Vorlage
    pub fn echter_frame(&mut self, frame: &AudioFrame) {
        self.letzter_frame = Some(frame.samples().to_vec());
        self.verluste_in_folge = 0;
        self.statistik.echte_frames += 1;
    }

    /// Erzeugt einen Ersatz-Frame fuer einen Verlust.
    ///
    /// Wiederholt den letzten Frame, pro Verlust in Folge um `FADE`
    /// abgesenkt. Ohne Vorlage oder nach `MAX_WIEDERHOLUNGEN`
    /// Verlusten in Folge kommt Stille.
    pub fn verdecken(&mut self) -> AudioFrame {
        self.verluste_in_folge += 1;

        let vorlage = match &self.letzter_frame {
            Some(v) if self.verluste_in_folge <= MAX_WIEDERHOLUNGEN => v,
            _ => {
                self.statistik.stille_frames += 1;
                trace!(verluste = self.verluste_in_folge, "Verdeckung liefert Stille");
                return AudioFrame::stille(self.frames_pro_puffer, self.kanaele);
            }
        };

        let daempfung = FADE.powi(self.verluste_in_folge as i32);
        let samples: Vec<i16> = vorlage
            .iter()
            .map(|&s| (s as f32 * daempfung) as i16)
            .collect();

        self.statistik.verdeckte_frames += 1;
        trace!(
            verluste = self.verluste_in_folge,
            daempfung,
            "Frame verdeckt"
        );
        AudioFrame::neu(samples, self.kanaele)
    }

    /// Verluste seit dem letzten echten Frame
    pub fn verluste_in_folge(&self) -> u32 {
        self.verluste_in_folge
    }

    pub fn statistik(&self) -> &VerdeckungsStatistik {
        &self.statistik
    }

    /// Setzt Vorlage und Verlustzaehler zurueck (Statistik bleibt)
    pub fn reset(&mut self) {
        self.letzter_frame = None;
        self.verluste_in_folge = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vorlage_frame() -> AudioFrame {
        AudioFrame::neu(vec![10000i16; 480], 1)
    }

    #[test]
    fn verdeckung_wiederholt_mit_ausblendung() {
        let mut verdecker = Verdecker::neu(480, 1);
        verdecker.echter_frame(&vorlage_frame());

        let erster = verdecker.verdecken();
        assert_eq!(erster.samples()[0], 5000);

        let zweiter = verdecker.verdecken();
        assert_eq!(zweiter.samples()[0], 2500);
    }

    #[test]
    fn ohne_vorlage_kommt_stille() {
        let mut verdecker = Verdecker::neu(480, 1);
        let frame = verdecker.verdecken();
        assert!(frame.ist_stille());
        assert_eq!(frame.frames(), 480);
        assert_eq!(verdecker.statistik().stille_frames, 1);
    }

    #[test]
    fn lange_verlustserie_wird_stille() {
        let mut verdecker = Verdecker::neu(480, 1);
        verdecker.echter_frame(&vorlage_frame());

        for _ in 0..MAX_WIEDERHOLUNGEN {
            let frame = verdecker.verdecken();
            assert!(!frame.ist_stille());
        }
        let danach = verdecker.verdecken();
        assert!(danach.ist_stille());
    }

    #[test]
    fn echter_frame_setzt_verlustserie_zurueck() {
        let mut verdecker = Verdecker::neu(480, 1);
        verdecker.echter_frame(&vorlage_frame());

        for _ in 0..3 {
            verdecker.verdecken();
        }
        assert_eq!(verdecker.verluste_in_folge(), 3);

        verdecker.echter_frame(&vorlage_frame());
        assert_eq!(verdecker.verluste_in_folge(), 0);
        assert_eq!(verdecker.verdecken().samples()[0], 5000);
    }

    #[test]
    fn verlust_rate_berechnung() {
        let mut verdecker = Verdecker::neu(480, 1);
        assert_eq!(verdecker.statistik().verlust_rate(), 0.0);

        for _ in 0..8 {
            verdecker.echter_frame(&vorlage_frame());
        }
        verdecker.verdecken();
        verdecker.echter_frame(&vorlage_frame());
        verdecker.verdecken();

        let rate = verdecker.statistik().verlust_rate();
        assert!((rate - 0.2).abs() < 1e-9);
    }

    #[test]
    fn reset_verwirft_vorlage() {
        let mut verdecker = Verdecker::neu(480, 1);
        verdecker.echter_frame(&vorlage_frame());
        verdecker.reset();
        assert!(verdecker.verdecken().ist_stille());
    }
}
