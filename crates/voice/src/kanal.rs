//! Kanal-Register
//!
//! Verwaltet die Mitgliedschaft von Teilnehmern in Sprachkanaelen.
//! Beitritt und Austritt sind idempotent: ein wiederholter Beitritt
//! desselben Teilnehmers aendert nichts und belegt keinen zweiten
//! Platz, ein Austritt ohne Mitgliedschaft ist ein No-Op.

use std::collections::HashSet;

use dashmap::DashMap;
use tracing::{debug, info};

use stimmwerk_core::{KanalId, TeilnehmerId};

use crate::error::{VoiceError, VoiceResult};

/// Standard-Kapazitaet eines Sprachkanals
pub const STANDARD_KAPAZITAET: usize = 25;

#[derive(Debug, Default)]
struct Kanal {
    mitglieder: HashSet<TeilnehmerId>,
}

/// Nebenlaeufig nutzbares Register aller Sprachkanaele
pub struct KanalRegister {
    kanaele: DashMap<KanalId, Kanal>,
    kapazitaet: usize,
}

impl KanalRegister {
    pub fn neu() -> Self {
        Self {
            kanaele: DashMap::new(),
            kapazitaet: STANDARD_KAPAZITAET,
        }
    }

    /// Register mit eigener Kanal-Kapazitaet
    pub fn mit_kapazitaet(kapazitaet: usize) -> VoiceResult<Self> {
        if kapazitaet == 0 {
            return Err(VoiceError::Konfiguration(
                "Kanal-Kapazitaet muss groesser 0 sein".into(),
            ));
        }
        Ok(Self {
            kanaele: DashMap::new(),
            kapazitaet,
        })
    }

    /// Fuegt einen Teilnehmer dem Kanal hinzu.
    ///
    /// Idempotent: ist der Teilnehmer bereits Mitglied, passiert nichts
    /// und es wird `false` zurueckgegeben. `true` heisst neu beigetreten.
    ///
    /// # Fehler
    /// `KanalVoll` wenn die Kapazitaet erreicht ist und der Teilnehmer
    /// noch kein Mitglied war.
    pub fn beitreten(&self, kanal: KanalId, teilnehmer: TeilnehmerId) -> VoiceResult<bool> {
        let mut eintrag = self.kanaele.entry(kanal).or_default();

        if eintrag.mitglieder.contains(&teilnehmer) {
            debug!(%kanal, %teilnehmer, "Beitritt ignoriert, bereits Mitglied");
            return Ok(false);
        }
        if eintrag.mitglieder.len() >= self.kapazitaet {
            return Err(VoiceError::KanalVoll(self.kapazitaet));
        }

        eintrag.mitglieder.insert(teilnehmer);
        info!(%kanal, %teilnehmer, anzahl = eintrag.mitglieder.len(), "Teilnehmer beigetreten");
        Ok(true)
    }

    /// Entfernt einen Teilnehmer aus dem Kanal.
    ///
    /// Idempotent: war der Teilnehmer kein Mitglied, passiert nichts.
    /// Leere Kanaele werden aus dem Register entfernt.
    pub fn verlassen(&self, kanal: KanalId, teilnehmer: TeilnehmerId) -> bool {
        let entfernt = match self.kanaele.get_mut(&kanal) {
            Some(mut eintrag) => eintrag.mitglieder.remove(&teilnehmer),
            None => false,
        };

        if entfernt {
            info!(%kanal, %teilnehmer, "Teilnehmer ausgetreten");
            self.kanaele
                .remove_if(&kanal, |_, k| k.mitglieder.is_empty());
        }
        entfernt
    }

    /// Gibt zurueck ob der Teilnehmer Mitglied des Kanals ist
    pub fn ist_mitglied(&self, kanal: KanalId, teilnehmer: TeilnehmerId) -> bool {
        self.kanaele
            .get(&kanal)
            .map(|k| k.mitglieder.contains(&teilnehmer))
            .unwrap_or(false)
    }

    /// Listet die Mitglieder eines Kanals (leere Liste wenn unbekannt)
    pub fn mitglieder(&self, kanal: KanalId) -> Vec<TeilnehmerId> {
        self.kanaele
            .get(&kanal)
            .map(|k| k.mitglieder.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Anzahl der Mitglieder eines Kanals
    pub fn mitglieder_anzahl(&self, kanal: KanalId) -> usize {
        self.kanaele.get(&kanal).map(|k| k.mitglieder.len()).unwrap_or(0)
    }

    /// Listet alle Kanaele mit mindestens einem Mitglied
    pub fn kanaele(&self) -> Vec<KanalId> {
        self.kanaele.iter().map(|e| *e.key()).collect()
    }

    pub fn kapazitaet(&self) -> usize {
        self.kapazitaet
    }
}

impl Default for KanalRegister {
    fn default() -> Self {
        Self::neu()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beitritt_und_austritt() {
        let register = KanalRegister::neu();
        let kanal = KanalId::new();
        let anna = TeilnehmerId::new();

        assert!(register.beitreten(kanal, anna).unwrap());
        assert!(register.ist_mitglied(kanal, anna));
        assert_eq!(register.mitglieder_anzahl(kanal), 1);

        assert!(register.verlassen(kanal, anna));
        assert!(!register.ist_mitglied(kanal, anna));
    }

    #[test]
    fn doppelter_beitritt_ist_idempotent() {
        let register = KanalRegister::neu();
        let kanal = KanalId::new();
        let anna = TeilnehmerId::new();

        assert!(register.beitreten(kanal, anna).unwrap());
        assert!(!register.beitreten(kanal, anna).unwrap());
        assert!(!register.beitreten(kanal, anna).unwrap());
        assert_eq!(register.mitglieder_anzahl(kanal), 1);
    }

    #[test]
    fn austritt_ohne_mitgliedschaft_ist_noop() {
        let register = KanalRegister::neu();
        let kanal = KanalId::new();
        let fremd = TeilnehmerId::new();

        assert!(!register.verlassen(kanal, fremd));
        assert!(!register.verlassen(kanal, fremd));
    }

    #[test]
    fn kapazitaet_wird_eingehalten() {
        let register = KanalRegister::mit_kapazitaet(2).unwrap();
        let kanal = KanalId::new();
        let anna = TeilnehmerId::new();
        let ben = TeilnehmerId::new();
        let carla = TeilnehmerId::new();

        register.beitreten(kanal, anna).unwrap();
        register.beitreten(kanal, ben).unwrap();
        assert!(matches!(
            register.beitreten(kanal, carla),
            Err(VoiceError::KanalVoll(2))
        ));

        // Erneuter Beitritt eines Mitglieds scheitert auch bei vollem Kanal nicht
        assert!(!register.beitreten(kanal, anna).unwrap());
    }

    #[test]
    fn kapazitaet_null_abgelehnt() {
        assert!(KanalRegister::mit_kapazitaet(0).is_err());
    }

    #[test]
    fn leerer_kanal_wird_entfernt() {
        let register = KanalRegister::neu();
        let kanal = KanalId::new();
        let anna = TeilnehmerId::new();

        register.beitreten(kanal, anna).unwrap();
        assert_eq!(register.kanaele().len(), 1);
        register.verlassen(kanal, anna);
        assert!(register.kanaele().is_empty());
    }

    #[test]
    fn mitglieder_liste() {
        let register = KanalRegister::neu();
        let kanal = KanalId::new();
        let anna = TeilnehmerId::new();
        let ben = TeilnehmerId::new();

        register.beitreten(kanal, anna).unwrap();
        register.beitreten(kanal, ben).unwrap();

        let mitglieder = register.mitglieder(kanal);
        assert_eq!(mitglieder.len(), 2);
        assert!(mitglieder.contains(&anna));
        assert!(mitglieder.contains(&ben));
    }

    #[test]
    fn nebenlaeufiger_beitritt_respektiert_kapazitaet() {
        use std::sync::Arc;

        let register = Arc::new(KanalRegister::mit_kapazitaet(10).unwrap());
        let kanal = KanalId::new();

        let mut threads = Vec::new();
        for _ in 0..4 {
            let register = Arc::clone(&register);
            threads.push(std::thread::spawn(move || {
                for _ in 0..10 {
                    let _ = register.beitreten(kanal, TeilnehmerId::new());
                }
            }));
        }
        for t in threads {
            t.join().unwrap();
        }

        assert!(register.mitglieder_anzahl(kanal) <= 10);
    }
}
