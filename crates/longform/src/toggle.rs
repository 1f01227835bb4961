#![forbid(unsafe_code)]

//! The persisted backdrop selector.
//!
//! Which backdrop a reader sees is a preference, remembered under the
//! `"background-type"` key. [`BackdropToggle`] owns the in-memory value
//! and writes through to a [`PrefStore`] on every flip; a store that
//! cannot persist degrades to the in-memory value instead of failing.

use std::fmt;

use longform_backdrop::{Backdrop, ParticleField, SeededRng, StarryField};

use crate::prefs::PrefStore;

/// Preference key the selected backdrop is stored under.
pub const BACKDROP_PREF_KEY: &str = "background-type";

/// Which backdrop variant is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackdropKind {
    /// Drifting particles with proximity links.
    Particle,
    /// Twinkling stars with occasional shooting stars.
    Starry,
}

impl BackdropKind {
    /// The persisted string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Particle => "particle",
            Self::Starry => "starry",
        }
    }

    /// Parse the persisted string form. Unknown strings are `None` so a
    /// damaged preference falls back to the caller's default.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "particle" => Some(Self::Particle),
            "starry" => Some(Self::Starry),
            _ => None,
        }
    }

    /// The other variant.
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Particle => Self::Starry,
            Self::Starry => Self::Particle,
        }
    }

    /// Coin-flip kind for first visits with no stored preference.
    #[must_use]
    pub fn random(rng: &mut SeededRng) -> Self {
        if rng.chance(0.5) {
            Self::Particle
        } else {
            Self::Starry
        }
    }

    /// Construct the scene this kind names.
    #[must_use]
    pub fn build(self) -> Box<dyn Backdrop> {
        match self {
            Self::Particle => Box::new(ParticleField::new()),
            Self::Starry => Box::new(StarryField::new()),
        }
    }
}

impl fmt::Display for BackdropKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backdrop selection with write-through persistence.
#[derive(Debug)]
pub struct BackdropToggle<S> {
    store: S,
    kind: BackdropKind,
}

impl<S: PrefStore> BackdropToggle<S> {
    /// Load the persisted kind from `store`, falling back to `default`
    /// when nothing usable is stored.
    pub fn load(store: S, default: BackdropKind) -> Self {
        let kind = store
            .get(BACKDROP_PREF_KEY)
            .and_then(|value| BackdropKind::parse(&value))
            .unwrap_or(default);
        Self { store, kind }
    }

    /// The active kind.
    #[must_use]
    pub fn kind(&self) -> BackdropKind {
        self.kind
    }

    /// Flip to the other backdrop and persist the choice. A store that
    /// fails to persist is logged and ignored; the flip still happens.
    pub fn toggle(&mut self) -> BackdropKind {
        self.kind = self.kind.flipped();
        if let Err(err) = self.store.set(BACKDROP_PREF_KEY, self.kind.as_str()) {
            tracing::warn!(error = %err, "could not persist backdrop preference");
        }
        self.kind
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::MemoryPrefs;
    use crate::{Error, Result};

    #[test]
    fn string_form_round_trips() {
        for kind in [BackdropKind::Particle, BackdropKind::Starry] {
            assert_eq!(BackdropKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(BackdropKind::parse("neon"), None);
        assert_eq!(BackdropKind::Starry.to_string(), "starry");
    }

    #[test]
    fn toggle_flips_and_persists() {
        let toggle = BackdropToggle::load(MemoryPrefs::new(), BackdropKind::Particle);
        assert_eq!(toggle.kind(), BackdropKind::Particle);

        let mut toggle = toggle;
        assert_eq!(toggle.toggle(), BackdropKind::Starry);
        assert_eq!(
            toggle.store().get(BACKDROP_PREF_KEY),
            Some("starry".to_string())
        );
        assert_eq!(toggle.toggle(), BackdropKind::Particle);
        assert_eq!(
            toggle.store().get(BACKDROP_PREF_KEY),
            Some("particle".to_string())
        );
    }

    #[test]
    fn persisted_kind_wins_over_the_default() {
        let mut prefs = MemoryPrefs::new();
        prefs.set(BACKDROP_PREF_KEY, "starry").unwrap();
        let toggle = BackdropToggle::load(prefs, BackdropKind::Particle);
        assert_eq!(toggle.kind(), BackdropKind::Starry);
    }

    #[test]
    fn damaged_preference_falls_back_to_default() {
        let mut prefs = MemoryPrefs::new();
        prefs.set(BACKDROP_PREF_KEY, "lava-lamp").unwrap();
        let toggle = BackdropToggle::load(prefs, BackdropKind::Starry);
        assert_eq!(toggle.kind(), BackdropKind::Starry);
    }

    #[test]
    fn storage_failure_keeps_the_flip() {
        struct BrokenStore;
        impl PrefStore for BrokenStore {
            fn get(&self, _key: &str) -> Option<String> {
                None
            }
            fn set(&mut self, _key: &str, _value: &str) -> Result<()> {
                Err(Error::Prefs("store is read-only".to_string()))
            }
        }

        let mut toggle = BackdropToggle::load(BrokenStore, BackdropKind::Particle);
        assert_eq!(toggle.toggle(), BackdropKind::Starry);
        assert_eq!(toggle.kind(), BackdropKind::Starry);
    }

    #[test]
    fn random_kind_is_seed_deterministic() {
        let mut a = SeededRng::new(5);
        let mut b = SeededRng::new(5);
        assert_eq!(BackdropKind::random(&mut a), BackdropKind::random(&mut b));

        let mut rng = SeededRng::new(0);
        let kinds: Vec<BackdropKind> =
            (0..64).map(|_| BackdropKind::random(&mut rng)).collect();
        assert!(kinds.contains(&BackdropKind::Particle));
        assert!(kinds.contains(&BackdropKind::Starry));
    }

    #[test]
    fn built_scene_matches_the_kind() {
        assert_eq!(BackdropKind::Particle.build().name(), "particle");
        assert_eq!(BackdropKind::Starry.build().name(), "starry");
    }
}
