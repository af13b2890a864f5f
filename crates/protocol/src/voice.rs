//! Voice-Wire-Format
//!
//! Definiert die binaere Paketstruktur fuer die Audio-Uebertragung.
//! Ein Paket traegt genau einen Audio-Frame; Fragmentierung ueber
//! mehrere Pakete gibt es nicht (die Frame-Groesse wird beim Oeffnen
//! eines Streams gegen das Transport-Limit geprueft).
//!
//! ## Paketformat (Header = 14 Bytes, gepackt, kein serde)
//!
//! ```text
//! Offset  Len  Beschreibung
//! ------  ---  -----------
//!  0       2   Gesamtgroesse in Bytes (Header + Nutzdaten, big-endian)
//!  2       2   PacketType (big-endian)
//!  4       4   Sequenznummer (big-endian, monoton pro Stream, wrappt)
//!  8       4   Zeitstempel (big-endian, Media-Clock-Ticks, keine Wanduhr)
//! 12       2   Flags (big-endian)
//! 14+      N   Nutzdaten (rohe Codec-Bytes, fuer uns opak)
//! ```

use std::io;

/// Maximale Nutzdaten-Laenge (1280 Bytes, typisches MTU-Limit fuer Voice)
pub const MAX_NUTZDATEN_LAENGE: usize = 1280;

// ---------------------------------------------------------------------------
// Flags (u16, big-endian)
// ---------------------------------------------------------------------------

/// Bit-Masken fuer das Flags-Feld im Voice-Paket-Header
pub struct VoiceFlags;

impl VoiceFlags {
    /// Beginn einer Sprechsequenz (erstes Paket nach Stille)
    pub const SPEAKING_START: u16 = 0x0001;
    /// Ende einer Sprechsequenz
    pub const SPEAKING_STOP: u16 = 0x0002;
}

// ---------------------------------------------------------------------------
// PacketType
// ---------------------------------------------------------------------------

/// Art des Voice-Paketes
///
/// Alle anderen Werte gehoeren dem aeusseren Spiel-Protokoll und werden
/// von dieser Pipeline nicht interpretiert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum PacketType {
    /// Audio-Nutzdaten eines Streams
    VoipData = 1,
    /// Teilnehmer betritt einen Voice-Kanal
    VoipChannelJoin = 2,
    /// Teilnehmer verlaesst einen Voice-Kanal
    VoipChannelLeave = 3,
}

impl PacketType {
    /// Konvertiert einen u16-Wert in einen `PacketType`.
    pub fn from_u16(wert: u16) -> Option<Self> {
        match wert {
            1 => Some(Self::VoipData),
            2 => Some(Self::VoipChannelJoin),
            3 => Some(Self::VoipChannelLeave),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// VoicePacketHeader
// ---------------------------------------------------------------------------

/// 14-Byte Header eines Voice-Pakets
///
/// Direkte Byte-Serialisierung, kein serde (Performance-kritisch).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoicePacketHeader {
    /// Gesamtgroesse des Pakets in Bytes (Header + Nutzdaten)
    pub size: u16,
    /// Pakettyp
    pub packet_type: PacketType,
    /// Monoton steigende Sequenznummer (genau +1 pro Paket, wrappt bei 2^32)
    pub sequence: u32,
    /// Media-Clock-Zeitstempel (Frame-Zaehler x Samples pro Frame)
    pub timestamp: u32,
    /// Flags-Bitmask (siehe `VoiceFlags`)
    pub flags: u16,
}

impl VoicePacketHeader {
    /// Header-Groesse in Bytes
    pub const SIZE: usize = 14;

    /// Erstellt einen neuen Header; `size` wird aus der Nutzdaten-Laenge
    /// berechnet. Die Laenge wird auf `MAX_NUTZDATEN_LAENGE` geklemmt,
    /// damit das u16-Groessenfeld nie stillschweigend abschneidet
    /// (der Sendepfad haelt die Grenze ohnehin ein).
    pub fn new(
        packet_type: PacketType,
        sequence: u32,
        timestamp: u32,
        flags: u16,
        nutzdaten_laenge: usize,
    ) -> Self {
        let nutzdaten = nutzdaten_laenge.min(MAX_NUTZDATEN_LAENGE);
        Self {
            size: (Self::SIZE + nutzdaten) as u16,
            packet_type,
            sequence,
            timestamp,
            flags,
        }
    }

    /// Serialisiert den Header in ein 14-Byte-Array (big-endian)
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..2].copy_from_slice(&self.size.to_be_bytes());
        buf[2..4].copy_from_slice(&(self.packet_type as u16).to_be_bytes());
        buf[4..8].copy_from_slice(&self.sequence.to_be_bytes());
        buf[8..12].copy_from_slice(&self.timestamp.to_be_bytes());
        buf[12..14].copy_from_slice(&self.flags.to_be_bytes());
        buf
    }

    /// Deserialisiert einen Header aus einem Byte-Slice
    ///
    /// # Fehler
    /// - `InvalidData` wenn das Slice kuerzer als 14 Bytes ist
    /// - `InvalidData` bei unbekanntem PacketType
    pub fn decode(buf: &[u8]) -> io::Result<Self> {
        if buf.len() < Self::SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Header zu kurz: {} Bytes (erwartet {})",
                    buf.len(),
                    Self::SIZE
                ),
            ));
        }

        let size = u16::from_be_bytes([buf[0], buf[1]]);
        let typ_roh = u16::from_be_bytes([buf[2], buf[3]]);
        let packet_type = PacketType::from_u16(typ_roh).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unbekannter PacketType: {}", typ_roh),
            )
        })?;

        let sequence = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let timestamp = u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]);
        let flags = u16::from_be_bytes([buf[12], buf[13]]);

        Ok(Self {
            size,
            packet_type,
            sequence,
            timestamp,
            flags,
        })
    }

    /// Prueft ob ein bestimmtes Flag gesetzt ist
    pub fn hat_flag(&self, flag: u16) -> bool {
        self.flags & flag != 0
    }
}

// ---------------------------------------------------------------------------
// VoicePacket
// ---------------------------------------------------------------------------

/// Vollstaendiges Voice-Paket (Header + Nutzdaten)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoicePacket {
    /// 14-Byte Header
    pub header: VoicePacketHeader,
    /// Rohe Nutzdaten (max. `MAX_NUTZDATEN_LAENGE` Bytes)
    pub payload: Vec<u8>,
}

impl VoicePacket {
    /// Erstellt ein Audio-Daten-Paket
    pub fn neu_data(sequence: u32, timestamp: u32, flags: u16, payload: Vec<u8>) -> Self {
        Self {
            header: VoicePacketHeader::new(
                PacketType::VoipData,
                sequence,
                timestamp,
                flags,
                payload.len(),
            ),
            payload,
        }
    }

    /// Erstellt ein Kanal-Beitritts-Paket (keine Nutzdaten)
    pub fn neu_join(sequence: u32, timestamp: u32) -> Self {
        Self {
            header: VoicePacketHeader::new(PacketType::VoipChannelJoin, sequence, timestamp, 0, 0),
            payload: Vec::new(),
        }
    }

    /// Erstellt ein Kanal-Verlassen-Paket (keine Nutzdaten)
    pub fn neu_leave(sequence: u32, timestamp: u32) -> Self {
        Self {
            header: VoicePacketHeader::new(PacketType::VoipChannelLeave, sequence, timestamp, 0, 0),
            payload: Vec::new(),
        }
    }

    /// Serialisiert das gesamte Paket in einen Byte-Vec
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(VoicePacketHeader::SIZE + self.payload.len());
        buf.extend_from_slice(&self.header.encode());
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Deserialisiert ein Paket aus einem Byte-Slice und validiert es
    ///
    /// # Fehler
    /// - Header-Validierungsfehler (Laenge, PacketType)
    /// - Groesse im Header passt nicht zur tatsaechlichen Paketlaenge
    /// - Nutzdaten ueberschreiten `MAX_NUTZDATEN_LAENGE`
    pub fn decode(buf: &[u8]) -> io::Result<Self> {
        let header = VoicePacketHeader::decode(buf)?;
        let payload_bytes = &buf[VoicePacketHeader::SIZE..];

        if header.size as usize != buf.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Groessenfeld inkonsistent: Header sagt {}, Paket hat {} Bytes",
                    header.size,
                    buf.len()
                ),
            ));
        }

        if payload_bytes.len() > MAX_NUTZDATEN_LAENGE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Nutzdaten zu lang: {} Bytes (Maximum {})",
                    payload_bytes.len(),
                    MAX_NUTZDATEN_LAENGE
                ),
            ));
        }

        Ok(Self {
            header,
            payload: payload_bytes.to_vec(),
        })
    }

    /// Gesamtgroesse des Paketes in Bytes
    pub fn groesse(&self) -> usize {
        VoicePacketHeader::SIZE + self.payload.len()
    }

    /// Prueft ob die Sprachaktivitaet beginnt
    pub fn spricht_start(&self) -> bool {
        self.header.hat_flag(VoiceFlags::SPEAKING_START)
    }

    /// Prueft ob die Sprachaktivitaet endet
    pub fn spricht_stop(&self) -> bool {
        self.header.hat_flag(VoiceFlags::SPEAKING_STOP)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
