//! Per-source effect chains, indexed by the source's slot index.

use log::debug;

use super::handle::EngineHandle;
use crate::error::{AcousticsError, AcousticsResult};

/// Effect handles owned by one source slot.
///
/// Each handle is created the first time the slot is used and survives
/// source teardown; only the table's owner releases them.
#[derive(Debug, Default)]
pub struct SourceEffects {
    pub binaural: Option<EngineHandle>,
    pub direct: Option<EngineHandle>,
    pub convolution: Option<EngineHandle>,
}

impl SourceEffects {
    pub fn is_complete(&self) -> bool {
        self.binaural.is_some() && self.direct.is_some() && self.convolution.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.binaural.is_none() && self.direct.is_none() && self.convolution.is_none()
    }
}

/// Fixed-capacity table of [`SourceEffects`].
#[derive(Debug)]
pub struct SourceEffectTable {
    slots: Vec<SourceEffects>,
}

impl SourceEffectTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| SourceEffects::default()).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn get(&self, index: usize) -> Option<&SourceEffects> {
        self.slots.get(index)
    }

    pub fn slot_mut(&mut self, index: usize) -> AcousticsResult<&mut SourceEffects> {
        let capacity = self.slots.len();
        self.slots
            .get_mut(index)
            .ok_or(AcousticsError::SourceIndex { index, capacity })
    }

    /// Fills the empty handles of slot `index` with `create`.
    ///
    /// Handles already present are kept, so repeated calls are harmless.
    /// A failed constructor leaves the handles built so far in place.
    pub fn ensure(
        &mut self,
        index: usize,
        mut create: impl FnMut(EffectKind) -> AcousticsResult<EngineHandle>,
    ) -> AcousticsResult<&SourceEffects> {
        let slot = self.slot_mut(index)?;
        for kind in EffectKind::ALL {
            let handle = kind.slot(slot);
            if handle.is_none() {
                *handle = Some(create(kind)?);
                debug!("created {} effect for source {index}", kind.name());
            }
        }
        Ok(slot)
    }

    /// Number of slots holding at least one handle.
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|slot| !slot.is_empty()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &SourceEffects)> {
        self.slots.iter().enumerate()
    }
}

/// The three effects a source chain is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    Binaural,
    Direct,
    Convolution,
}

impl EffectKind {
    pub const ALL: [EffectKind; 3] = [EffectKind::Binaural, EffectKind::Direct, EffectKind::Convolution];

    pub fn name(self) -> &'static str {
        match self {
            EffectKind::Binaural => "binaural",
            EffectKind::Direct => "direct sound",
            EffectKind::Convolution => "convolution",
        }
    }

    fn slot(self, effects: &mut SourceEffects) -> &mut Option<EngineHandle> {
        match self {
            EffectKind::Binaural => &mut effects.binaural,
            EffectKind::Direct => &mut effects.direct,
            EffectKind::Convolution => &mut effects.convolution,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_indices_are_rejected() {
        let mut table = SourceEffectTable::new(4);
        assert_eq!(table.capacity(), 4);
        assert!(table.get(4).is_none());
        let err = table.slot_mut(9).unwrap_err();
        assert!(matches!(
            err,
            AcousticsError::SourceIndex {
                index: 9,
                capacity: 4
            }
        ));
    }

    #[test]
    fn new_tables_are_empty() {
        let table = SourceEffectTable::new(8);
        assert_eq!(table.live_count(), 0);
        assert!(table.iter().all(|(_, slot)| slot.is_empty() && !slot.is_complete()));
    }

    #[test]
    fn failing_constructor_is_propagated() {
        let mut table = SourceEffectTable::new(2);
        let err = table
            .ensure(1, |_| {
                Err(AcousticsError::Engine {
                    call: "iplCreateBinauralEffect",
                    status: 1,
                })
            })
            .unwrap_err();
        assert!(matches!(err, AcousticsError::Engine { status: 1, .. }));
        assert_eq!(table.live_count(), 0);
    }
}
