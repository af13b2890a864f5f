//! AudioFrame – Werttyp fuer PCM-Puffer
//!
//! Ein Frame besitzt seine Samples exklusiv; zwischen den Pipeline-Stufen
//! wird er per Move uebergeben (Single-Owner-Handoff). Zwei Stufen
//! mutieren nie denselben Frame gleichzeitig.

/// Ein Block interleaved 16-bit PCM-Samples
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    /// Interleaved Samples (Laenge = frames * kanaele)
    samples: Vec<i16>,
    /// Kanalanzahl (1 = Mono, 2 = Stereo)
    kanaele: u16,
}

impl AudioFrame {
    /// Erstellt einen Frame aus interleaved Samples.
    ///
    /// Die Sample-Anzahl muss ein Vielfaches der Kanalanzahl sein,
    /// sonst wird der Rest abgeschnitten.
    pub fn neu(mut samples: Vec<i16>, kanaele: u16) -> Self {
        let kanaele = kanaele.max(1);
        let rest = samples.len() % kanaele as usize;
        if rest != 0 {
            samples.truncate(samples.len() - rest);
        }
        Self { samples, kanaele }
    }

    /// Erstellt einen stillen Frame mit der gegebenen Frame-Anzahl
    pub fn stille(frames: usize, kanaele: u16) -> Self {
        let kanaele = kanaele.max(1);
        Self {
            samples: vec![0i16; frames * kanaele as usize],
            kanaele,
        }
    }

    /// Anzahl der Frames (Samples pro Kanal)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.kanaele as usize
    }

    /// Kanalanzahl
    pub fn kanaele(&self) -> u16 {
        self.kanaele
    }

    /// Interleaved Samples (lesend)
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Interleaved Samples (mutierbar, fuer die verarbeitende Stufe)
    pub fn samples_mut(&mut self) -> &mut [i16] {
        &mut self.samples
    }

    /// Konsumiert den Frame und gibt die Samples zurueck
    pub fn in_samples(self) -> Vec<i16> {
        self.samples
    }

    /// Serialisiert die Samples als little-endian PCM-Bytes (Wire-Nutzdaten)
    pub fn zu_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.samples.len() * 2);
        for s in &self.samples {
            buf.extend_from_slice(&s.to_le_bytes());
        }
        buf
    }

    /// Deserialisiert einen Frame aus little-endian PCM-Bytes.
    ///
    /// Ungerade Byte-Anzahlen werden abgeschnitten.
    pub fn aus_bytes(bytes: &[u8], kanaele: u16) -> Self {
        let samples = bytes
            .chunks_exact(2)
            .map(|paar| i16::from_le_bytes([paar[0], paar[1]]))
            .collect();
        Self::neu(samples, kanaele)
    }

    /// Prueft ob alle Samples 0 sind
    pub fn ist_stille(&self) -> bool {
        self.samples.iter().all(|&s| s == 0)
    }
}
