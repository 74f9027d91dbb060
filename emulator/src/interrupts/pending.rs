use tracing::debug;

use super::{Deferrability, InterruptClass, MachineInterrupt, Synchrony};

/// Interrupts raised but not serviced yet
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingInterrupts {
    pending: Vec<MachineInterrupt>,
}

impl PendingInterrupts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an interrupt. A pended or broadcast interrupt already pending
    /// for the same class is not recorded twice.
    pub fn raise(&mut self, interrupt: MachineInterrupt) {
        let class = interrupt.class();
        if matches!(interrupt.synchrony(), Synchrony::Pended | Synchrony::Broadcast)
            && self.contains(class)
        {
            debug!(%class, "interrupt already pending");
            return;
        }

        debug!(%interrupt, code = class.code(), "raising interrupt");
        self.pending.push(interrupt);
    }

    /// Remove and return the interrupt to service next, if any.
    ///
    /// This is the eligible interrupt with the lowest class code; deferrable
    /// interrupts are only eligible when `deferrable_enabled` is set. Once
    /// one is selected, every synchronous interrupt of lower priority is
    /// dropped: it belonged to an instruction that will not complete.
    pub fn take_next(&mut self, deferrable_enabled: bool) -> Option<MachineInterrupt> {
        let (index, _) = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, interrupt)| {
                deferrable_enabled
                    || matches!(interrupt.deferrability(), Deferrability::Exigent)
            })
            .min_by_key(|(_, interrupt)| interrupt.class())?;

        let selected = self.pending.remove(index);
        let selected_class = selected.class();
        self.pending.retain(|interrupt| {
            let dropped = matches!(interrupt.synchrony(), Synchrony::Synchronous)
                && interrupt.class() > selected_class;
            if dropped {
                debug!(%interrupt, preempted_by = %selected_class, "dropping pre-empted interrupt");
            }
            !dropped
        });

        Some(selected)
    }

    #[must_use]
    pub fn contains(&self, class: InterruptClass) -> bool {
        self.pending.iter().any(|interrupt| interrupt.class() == class)
    }

    /// Clear every pending interrupt of a class
    pub fn clear(&mut self, class: InterruptClass) {
        self.pending.retain(|interrupt| interrupt.class() != class);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MachineInterrupt> {
        self.pending.iter()
    }
}
