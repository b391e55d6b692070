use super::bond::Bond;
use super::ids::PairGroupId;
use std::fmt;

/// Structural change notifications emitted by a [`Molecule`](super::molecule::Molecule).
///
/// Each structural event (`GroupAdded`, `GroupRemoved`, `BondAdded`,
/// `BondRemoved`) is immediately followed by its aggregate counterpart
/// (`GroupsChanged` or `BondsChanged`).
#[derive(Debug, Clone, PartialEq)]
pub enum MoleculeEvent {
    GroupAdded(PairGroupId),
    GroupRemoved(PairGroupId),
    BondAdded(Bond),
    BondRemoved(Bond),
    GroupsChanged,
    BondsChanged,
}

impl MoleculeEvent {
    fn aggregate(&self) -> Option<MoleculeEvent> {
        match self {
            Self::GroupAdded(_) | Self::GroupRemoved(_) => Some(Self::GroupsChanged),
            Self::BondAdded(_) | Self::BondRemoved(_) => Some(Self::BondsChanged),
            Self::GroupsChanged | Self::BondsChanged => None,
        }
    }
}

pub type MoleculeObserver = Box<dyn Fn(&MoleculeEvent) + Send + Sync>;

/// Synchronous fan-out of [`MoleculeEvent`]s to registered observers.
#[derive(Default)]
pub struct EventDispatcher {
    observers: Vec<MoleculeObserver>,
}

impl EventDispatcher {
    pub fn subscribe(&mut self, observer: MoleculeObserver) {
        self.observers.push(observer);
    }

    pub(crate) fn dispatch(&self, event: MoleculeEvent) {
        if self.observers.is_empty() {
            return;
        }
        let aggregate = event.aggregate();
        self.notify(&event);
        if let Some(aggregate) = aggregate {
            self.notify(&aggregate);
        }
    }

    fn notify(&self, event: &MoleculeEvent) {
        for observer in &self.observers {
            observer(event);
        }
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("observers", &self.observers.len())
            .finish()
    }
}
