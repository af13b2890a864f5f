//! Paketierer und Sequenzer
//!
//! Wandelt verarbeitete Audio-Frames in Voice-Pakete: pro Frame genau
//! ein Paket, mit fortlaufender Sequenznummer (zufaelliger Startwert,
//! +1 pro Paket, Ueberlauf per Wrap auf 0) und Medien-Takt-Zeitstempel
//! (Samples pro Kanal seit Stream-Beginn).
//!
//! Der Transportkanal ist begrenzt; bei vollem Kanal wird das neueste
//! Paket verworfen und gezaehlt statt den Audio-Pfad zu blockieren.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use rand::Rng;
use tracing::{debug, info, warn};

use stimmwerk_audio::AudioFrame;
use stimmwerk_core::{KanalId, StreamId, TeilnehmerId};
use stimmwerk_protocol::{VoiceFlags, VoicePacket, MAX_NUTZDATEN_LAENGE};

use crate::error::{VoiceError, VoiceResult};
use crate::kanal::KanalRegister;

/// Kapazitaet des Transportkanals in Paketen (Drop-Newest bei Ueberlauf)
const TRANSPORT_KAPAZITAET: usize = 64;

/// Paketierer fuer ausgehende Voice-Streams eines Clients
pub struct Paketierer {
    register: Arc<KanalRegister>,
}

impl Paketierer {
    pub fn neu(register: Arc<KanalRegister>) -> Self {
        Self { register }
    }

    /// Oeffnet einen Sende-Stream in einem Kanal.
    ///
    /// Die Kanal-Mitgliedschaft muss vorher ueber das `KanalRegister`
    /// bestehen (gepflegt von aussen). Die Frame-Groesse wird hier
    /// validiert: ein Frame muss in ein einzelnes Paket passen, sonst
    /// entsteht gar kein Stream. Erzeugt eine zufaellige
    /// Start-Sequenznummer und sendet ein Join-Paket. Gibt den
    /// Stream-Handle und die Empfangsseite des Transportkanals zurueck.
    ///
    /// # Fehler
    /// `KeinMitglied` wenn der Teilnehmer nicht im Kanal ist;
    /// `NutzdatenZuGross` wenn ein Frame die Paketgrenze sprengt.
    pub fn oeffnen(
        &self,
        kanal: KanalId,
        teilnehmer: TeilnehmerId,
        samples_pro_frame: u32,
        kanaele: u16,
    ) -> VoiceResult<(StreamHandle, Receiver<VoicePacket>)> {
        if samples_pro_frame == 0 {
            return Err(VoiceError::Konfiguration(
                "samples_pro_frame muss groesser 0 sein".into(),
            ));
        }
        if kanaele == 0 {
            return Err(VoiceError::Konfiguration(
                "kanaele muss groesser 0 sein".into(),
            ));
        }
        let frame_bytes = samples_pro_frame as usize * kanaele as usize * 2;
        if frame_bytes > MAX_NUTZDATEN_LAENGE {
            return Err(VoiceError::NutzdatenZuGross {
                laenge: frame_bytes,
                maximum: MAX_NUTZDATEN_LAENGE,
            });
        }
        if !self.register.ist_mitglied(kanal, teilnehmer) {
            return Err(VoiceError::KeinMitglied);
        }

        let (tx, rx) = crossbeam_channel::bounded(TRANSPORT_KAPAZITAET);
        let sequence: u32 = rand::thread_rng().gen();

        let mut handle = StreamHandle {
            stream: StreamId::new(),
            kanal,
            teilnehmer,
            transport: tx,
            sequence,
            timestamp: 0,
            samples_pro_frame,
            spricht: false,
            offen: true,
            verworfene_pakete: Arc::new(AtomicU64::new(0)),
        };

        handle.paket_senden(VoicePacket::neu_join(handle.sequence, handle.timestamp));
        info!(stream = %handle.stream, %kanal, %teilnehmer, "Voice-Stream geoeffnet");

        Ok((handle, rx))
    }
}

/// Handle eines offenen Sende-Streams
pub struct StreamHandle {
    stream: StreamId,
    kanal: KanalId,
    teilnehmer: TeilnehmerId,
    transport: Sender<VoicePacket>,
    sequence: u32,
    /// Medien-Takt in Samples pro Kanal seit Stream-Beginn
    timestamp: u32,
    samples_pro_frame: u32,
    /// Sprech-Zustand fuer die START/STOP-Flanken
    spricht: bool,
    offen: bool,
    verworfene_pakete: Arc<AtomicU64>,
}

impl StreamHandle {
    /// Paketiert einen Frame und legt ihn auf den Transportkanal.
    ///
    /// Sequenznummer +1 (wrapping), Zeitstempel ruecken im Medien-Takt
    /// vor. Das erste Daten-Paket nach einer Pause traegt das
    /// SPEAKING_START-Flag.
    ///
    /// # Fehler
    /// `StreamGeschlossen` nach `schliessen`; `NutzdatenZuGross` wenn
    /// der Frame nicht in ein Paket passt.
    pub fn senden(&mut self, frame: &AudioFrame) -> VoiceResult<()> {
        if !self.offen {
            return Err(VoiceError::StreamGeschlossen);
        }

        let nutzdaten = frame.zu_bytes();
        if nutzdaten.len() > MAX_NUTZDATEN_LAENGE {
            return Err(VoiceError::NutzdatenZuGross {
                laenge: nutzdaten.len(),
                maximum: MAX_NUTZDATEN_LAENGE,
            });
        }

        self.sequence = self.sequence.wrapping_add(1);
        self.timestamp = self.timestamp.wrapping_add(self.samples_pro_frame);

        let flags = if self.spricht {
            0
        } else {
            self.spricht = true;
            VoiceFlags::SPEAKING_START
        };

        self.paket_senden(VoicePacket::neu_data(
            self.sequence,
            self.timestamp,
            flags,
            nutzdaten,
        ));
        Ok(())
    }

    /// Sendet einen Frame nur bei aktiver Sprachaktivitaet (DTX).
    ///
    /// Inaktive Frames werden gar nicht gesendet; beim Uebergang in die
    /// Pause geht einmalig ein leeres Paket mit SPEAKING_STOP raus.
    /// Der Medien-Takt rueckt auch fuer nicht gesendete Frames vor,
    /// damit die Zeitstempel-Achse der Wiedergabeseite stimmt.
    pub fn senden_mit_vad(&mut self, frame: &AudioFrame, aktiv: bool) -> VoiceResult<()> {
        if aktiv {
            return self.senden(frame);
        }
        if !self.offen {
            return Err(VoiceError::StreamGeschlossen);
        }

        self.timestamp = self.timestamp.wrapping_add(self.samples_pro_frame);
        if self.spricht {
            self.spricht = false;
            self.sequence = self.sequence.wrapping_add(1);
            self.paket_senden(VoicePacket::neu_data(
                self.sequence,
                self.timestamp,
                VoiceFlags::SPEAKING_STOP,
                Vec::new(),
            ));
        }
        Ok(())
    }

    /// Schliesst den Stream und meldet ihn per Leave-Paket ab.
    ///
    /// Idempotent: wiederholtes Schliessen ist ein No-Op. Die
    /// Kanal-Mitgliedschaft bleibt bestehen, die pflegt das Register.
    pub fn schliessen(&mut self) {
        if !self.offen {
            return;
        }
        self.offen = false;

        self.sequence = self.sequence.wrapping_add(1);
        self.paket_senden(VoicePacket::neu_leave(self.sequence, self.timestamp));
        info!(
            stream = %self.stream,
            verworfen = self.verworfene_pakete.load(Ordering::Relaxed),
            "Voice-Stream geschlossen"
        );
    }

    pub fn ist_offen(&self) -> bool {
        self.offen
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream
    }

    pub fn kanal(&self) -> KanalId {
        self.kanal
    }

    pub fn teilnehmer(&self) -> TeilnehmerId {
        self.teilnehmer
    }

    /// Aktuelle (zuletzt vergebene) Sequenznummer
    pub fn sequenz(&self) -> u32 {
        self.sequence
    }

    /// Pakete die wegen vollem Transportkanal verworfen wurden
    pub fn verworfene_pakete(&self) -> u64 {
        self.verworfene_pakete.load(Ordering::Relaxed)
    }

    /// Legt ein Paket auf den Transportkanal; Drop-Newest bei Ueberlauf
    fn paket_senden(&mut self, paket: VoicePacket) {
        match self.transport.try_send(paket) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                let gesamt = self.verworfene_pakete.fetch_add(1, Ordering::Relaxed) + 1;
                if gesamt % 100 == 1 {
                    warn!(stream = %self.stream, gesamt, "Transportkanal voll, Paket verworfen");
                }
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!(stream = %self.stream, "Transport-Empfaenger weg, Paket verworfen");
            }
        }
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.schliessen();
    }
}
