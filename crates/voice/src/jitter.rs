//! Jitter-Buffer
//!
//! Ordnet eingehende Voice-Pakete nach Sequenznummer, gleicht
//! Netzwerk-Jitter ueber einen kleinen Vorlauf aus und liefert der
//! Wiedergabe pro Takt genau einen Frame, echt oder verdeckt.
//!
//! Zustandsmaschine:
//!   Leer      – nichts gepuffert, Abrufe liefern Stille
//!   Fuellen   – Vorlauf wird aufgebaut, Abrufe liefern noch Stille
//!   Stabil    – regulaerer Betrieb, Luecken werden verdeckt
//!   Entleeren – Stream-Ende, Restbestand wird ausgeliefert
//!
//! Sequenznummern werden intern entfaltet (64-bit), damit der Wrap bei
//! 2^32 die Ordnung nicht stoert.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use stimmwerk_audio::AudioFrame;
use stimmwerk_protocol::{PacketType, VoicePacket};

use crate::error::{VoiceError, VoiceResult};
use crate::verdeckung::Verdecker;

/// Aufeinanderfolgende Abrufe mit leerem Puffer in Stabil, bevor der
/// Buffer in den Leer-Zustand zurueckfaellt
const MAX_LEERLAUF_ABRUFE: u32 = 25;

/// Konfiguration des Jitter-Buffers
#[derive(Debug, Clone)]
pub struct JitterConfig {
    /// Vorlauf-Tiefe in Frames (Fuellen -> Stabil)
    pub vorlauf_tiefe: usize,
    /// Maximale Puffer-Tiefe; darueber wird vorgespult
    pub max_tiefe: usize,
    /// Frames (Samples pro Kanal) eines Puffers
    pub frames_pro_puffer: usize,
    /// Kanalanzahl der Nutzdaten
    pub kanaele: u16,
}

impl Default for JitterConfig {
    fn default() -> Self {
        Self {
            vorlauf_tiefe: 3,
            max_tiefe: 16,
            frames_pro_puffer: 480,
            kanaele: 1,
        }
    }
}

impl JitterConfig {
    fn validieren(&self) -> VoiceResult<()> {
        if self.vorlauf_tiefe == 0 {
            return Err(VoiceError::Konfiguration(
                "vorlauf_tiefe muss groesser 0 sein".into(),
            ));
        }
        if self.max_tiefe <= self.vorlauf_tiefe {
            return Err(VoiceError::Konfiguration(format!(
                "max_tiefe {} muss groesser als vorlauf_tiefe {} sein",
                self.max_tiefe, self.vorlauf_tiefe
            )));
        }
        if self.frames_pro_puffer == 0 {
            return Err(VoiceError::Konfiguration(
                "frames_pro_puffer muss groesser 0 sein".into(),
            ));
        }
        Ok(())
    }
}

/// Zustand des Jitter-Buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JitterZustand {
    Leer,
    Fuellen,
    Stabil,
    Entleeren,
}

/// Statistiken des Jitter-Buffers (Snapshot)
#[derive(Debug, Clone, Default)]
pub struct JitterStatistik {
    /// Angenommene Daten-Pakete
    pub empfangen: u64,
    /// Verworfene Duplikate
    pub duplikate: u64,
    /// Verworfene Nachzuegler (Sequenz bereits ausgeliefert)
    pub verspaetet: u64,
    /// Regulaer ausgelieferte Frames
    pub geliefert: u64,
    /// Verdeckte (oder stille) Ersatz-Frames
    pub verdeckt: u64,
    /// Beim Vorspulen uebersprungene gepufferte Frames
    pub uebersprungen: u64,
}

/// Jitter-Buffer eines einzelnen Empfangs-Streams
pub struct JitterBuffer {
    config: JitterConfig,
    zustand: JitterZustand,
    /// Gepufferte Frames, nach entfalteter Sequenznummer geordnet
    puffer: BTreeMap<u64, AudioFrame>,
    /// Naechste auszuliefernde entfaltete Sequenznummer
    naechste: Option<u64>,
    /// Hoechste bisher gesehene entfaltete Sequenznummer (Entfaltungs-Referenz)
    hoechste: Option<u64>,
    leerlauf_abrufe: u32,
    verdecker: Verdecker,
    statistik: JitterStatistik,
}

impl JitterBuffer {
    pub fn neu(config: JitterConfig) -> VoiceResult<Self> {
        config.validieren()?;
        let verdecker = Verdecker::neu(config.frames_pro_puffer, config.kanaele);
        Ok(Self {
            config,
            zustand: JitterZustand::Leer,
            puffer: BTreeMap::new(),
            naechste: None,
            hoechste: None,
            leerlauf_abrufe: 0,
            verdecker,
            statistik: JitterStatistik::default(),
        })
    }

    /// Nimmt ein Voice-Paket entgegen.
    ///
    /// Daten-Pakete werden einsortiert; Duplikate und Nachzuegler
    /// (Sequenz bereits ausgeliefert) werden gezaehlt und verworfen.
    /// Ein leeres Daten-Paket mit SPEAKING_STOP markiert das Ende eines
    /// Sprach-Abschnitts (DTX-Pause) und wird nicht einsortiert.
    /// Ein Leave-Paket startet das Entleeren. Join-Pakete sind fuer
    /// den Buffer bedeutungslos.
    pub fn einfuegen(&mut self, paket: &VoicePacket) {
        match paket.header.packet_type {
            PacketType::VoipData => {
                if paket.payload.is_empty() || paket.spricht_stop() {
                    self.sprechpause(paket.header.sequence);
                    return;
                }
            }
            PacketType::VoipChannelLeave => {
                self.entleeren_starten();
                return;
            }
            PacketType::VoipChannelJoin => return,
        }

        let sequenz = self.entfalten(paket.header.sequence);

        if let Some(naechste) = self.naechste {
            if sequenz < naechste {
                self.statistik.verspaetet += 1;
                trace!(sequenz, naechste, "Nachzuegler verworfen");
                return;
            }
        }
        if self.puffer.contains_key(&sequenz) {
            self.statistik.duplikate += 1;
            trace!(sequenz, "Duplikat verworfen");
            return;
        }

        let frame = AudioFrame::aus_bytes(&paket.payload, self.config.kanaele);
        self.puffer.insert(sequenz, frame);
        self.hoechste = Some(self.hoechste.map_or(sequenz, |h| h.max(sequenz)));
        self.statistik.empfangen += 1;
        self.leerlauf_abrufe = 0;

        match self.zustand {
            JitterZustand::Leer => {
                self.zustand = JitterZustand::Fuellen;
                debug!(sequenz, "Jitter-Buffer fuellt sich");
            }
            JitterZustand::Fuellen if self.puffer.len() >= self.config.vorlauf_tiefe => {
                // Auslieferung beginnt beim aeltesten gepufferten Frame
                self.naechste = self.puffer.keys().next().copied();
                self.zustand = JitterZustand::Stabil;
                debug!(tiefe = self.puffer.len(), "Jitter-Buffer stabil");
            }
            _ => {}
        }

        self.tiefe_begrenzen();
    }

    /// Liefert den naechsten Frame fuer die Wiedergabe.
    ///
    /// In Leer und Fuellen kommt Stille (Vorlauf), in Stabil der
    /// erwartete Frame oder ein verdeckter Ersatz, in Entleeren der
    /// Restbestand in Reihenfolge.
    pub fn abrufen(&mut self) -> AudioFrame {
        match self.zustand {
            JitterZustand::Leer | JitterZustand::Fuellen => {
                AudioFrame::stille(self.config.frames_pro_puffer, self.config.kanaele)
            }
            JitterZustand::Stabil => self.stabil_abrufen(),
            JitterZustand::Entleeren => self.entleeren_abrufen(),
        }
    }

    /// Startet das Entleeren (Stream-Ende, keine weiteren Pakete erwartet)
    pub fn entleeren_starten(&mut self) {
        if self.zustand == JitterZustand::Leer && self.puffer.is_empty() {
            return;
        }
        self.zustand = JitterZustand::Entleeren;
        debug!(rest = self.puffer.len(), "Jitter-Buffer entleert");
    }

    pub fn zustand(&self) -> JitterZustand {
        self.zustand
    }

    /// Aktuelle Puffer-Tiefe in Frames
    pub fn tiefe(&self) -> usize {
        self.puffer.len()
    }

    pub fn statistik(&self) -> &JitterStatistik {
        &self.statistik
    }

    fn stabil_abrufen(&mut self) -> AudioFrame {
        // In Stabil ist naechste immer gesetzt
        let erwartet = match self.naechste {
            Some(n) => n,
            None => {
                self.zuruecksetzen();
                return AudioFrame::stille(self.config.frames_pro_puffer, self.config.kanaele);
            }
        };

        if let Some(frame) = self.puffer.remove(&erwartet) {
            self.naechste = Some(erwartet + 1);
            self.verdecker.echter_frame(&frame);
            self.statistik.geliefert += 1;
            self.leerlauf_abrufe = 0;
            return frame;
        }

        // Luecke: Sequenz dauerhaft ueberspringen und verdecken.
        // Trifft der Frame spaeter doch ein, ist er ein Nachzuegler.
        self.naechste = Some(erwartet + 1);
        self.statistik.verdeckt += 1;

        if self.puffer.is_empty() {
            self.leerlauf_abrufe += 1;
            if self.leerlauf_abrufe >= MAX_LEERLAUF_ABRUFE {
                debug!("Stream versiegt, Jitter-Buffer zurueckgesetzt");
                self.zuruecksetzen();
                return AudioFrame::stille(self.config.frames_pro_puffer, self.config.kanaele);
            }
        }

        self.verdecker.verdecken()
    }

    fn entleeren_abrufen(&mut self) -> AudioFrame {
        match self.puffer.keys().next().copied() {
            Some(sequenz) => {
                // Restbestand in Reihenfolge, Luecken interessieren nicht mehr
                let frame = self
                    .puffer
                    .remove(&sequenz)
                    .unwrap_or_else(|| {
                        AudioFrame::stille(self.config.frames_pro_puffer, self.config.kanaele)
                    });
                self.statistik.geliefert += 1;
                if self.puffer.is_empty() {
                    self.zuruecksetzen();
                }
                frame
            }
            None => {
                self.zuruecksetzen();
                AudioFrame::stille(self.config.frames_pro_puffer, self.config.kanaele)
            }
        }
    }

    /// Ende eines Sprach-Abschnitts (DTX-Pause).
    ///
    /// Waehrend der Pause kommen keine Pakete; in die Luecke hinein zu
    /// verdecken wuerde die Sequenz-Achse an der Wiederaufnahme vorbei
    /// laufen lassen. Stattdessen wird der Restbestand regulaer
    /// ausgeliefert und danach neu vorgepuffert. Die Entfaltungs-
    /// Referenz laeuft mit, damit die Wiederaufnahme korrekt einsortiert
    /// wird.
    fn sprechpause(&mut self, sequenz: u32) {
        let entfaltet = self.entfalten(sequenz);
        if let Some(naechste) = self.naechste {
            if entfaltet < naechste {
                self.statistik.verspaetet += 1;
                trace!(sequenz, "Verspaetete Pausen-Markierung verworfen");
                return;
            }
        }
        self.hoechste = Some(self.hoechste.map_or(entfaltet, |h| h.max(entfaltet)));
        self.naechste = None;
        self.leerlauf_abrufe = 0;
        self.verdecker.reset();

        if self.zustand == JitterZustand::Entleeren {
            return;
        }
        if self.puffer.is_empty() {
            self.zustand = JitterZustand::Leer;
        } else {
            self.zustand = JitterZustand::Entleeren;
            debug!(rest = self.puffer.len(), "Sprechpause, Restbestand wird ausgeliefert");
        }
    }

    /// Spult bei zu tiefem Puffer vor: alte Frames verwerfen, damit die
    /// Latenz nicht unbegrenzt waechst
    fn tiefe_begrenzen(&mut self) {
        while self.puffer.len() > self.config.max_tiefe {
            if let Some(aelteste) = self.puffer.keys().next().copied() {
                self.puffer.remove(&aelteste);
                self.naechste = Some(aelteste + 1);
                self.statistik.uebersprungen += 1;
            }
        }
        if self.statistik.uebersprungen > 0 {
            trace!(
                uebersprungen = self.statistik.uebersprungen,
                "Puffer-Tiefe begrenzt"
            );
        }
    }

    /// Entfaltet eine 32-bit Sequenznummer relativ zur hoechsten
    /// bisher gesehenen (kuerzeste Distanz, RTP-Konvention)
    fn entfalten(&self, sequenz: u32) -> u64 {
        match self.hoechste {
            None => u64::from(sequenz),
            Some(referenz) => {
                let referenz_kurz = referenz as u32;
                let delta = i64::from(sequenz.wrapping_sub(referenz_kurz) as i32);
                let kandidat = referenz as i64 + delta;
                kandidat.max(0) as u64
            }
        }
    }

    fn zuruecksetzen(&mut self) {
        self.zustand = JitterZustand::Leer;
        self.puffer.clear();
        self.naechste = None;
        self.hoechste = None;
        self.leerlauf_abrufe = 0;
        self.verdecker.reset();
    }
}
