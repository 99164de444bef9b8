//! Bed status state machine.
//!
//! Every change to `Bed::status` goes through [`BedStatus::apply`]. OCCUPIED is
//! entered only by [`BedEvent::Admit`] and left only by [`BedEvent::Discharge`];
//! staff edits ([`BedEvent::Set`]) move between the remaining states:
//!
//! ```text
//!   RESERVED <-> AVAILABLE <-> MAINTENANCE <-> OUT_OF_SERVICE
//!                   ^  |
//!         discharge |  | admit
//!                   |  v
//!                 OCCUPIED  (discharge may also go to MAINTENANCE)
//! ```

use crate::error::IpdError;
use crate::models::BedStatus;

/// Something that wants to change a bed's status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BedEvent {
    /// A patient is admitted to the bed
    Admit,
    /// The open admission on the bed is closed
    Discharge { to_maintenance: bool },
    /// Manual change requested by clinic staff
    Set(BedStatus),
}

impl BedEvent {
    fn target(self) -> BedStatus {
        match self {
            BedEvent::Admit => BedStatus::Occupied,
            BedEvent::Discharge { to_maintenance: true } => BedStatus::Maintenance,
            BedEvent::Discharge { to_maintenance: false } => BedStatus::Available,
            BedEvent::Set(status) => status,
        }
    }
}

impl BedStatus {
    /// Whether staff may move a bed from `self` to `to` by hand.
    pub fn allows_manual(self, to: BedStatus) -> bool {
        use BedStatus::{Available, Maintenance, Occupied, OutOfService, Reserved};

        if self == Occupied || to == Occupied {
            return false;
        }
        if self == to {
            return true;
        }
        matches!(
            (self, to),
            (Available, Reserved)
                | (Reserved, Available)
                | (Available, Maintenance)
                | (Maintenance, Available)
                | (Maintenance, OutOfService)
                | (OutOfService, Maintenance)
        )
    }

    /// Apply an event, returning the new status or the rejected transition.
    pub fn apply(self, event: BedEvent) -> Result<BedStatus, IpdError> {
        let to = event.target();
        let allowed = match event {
            BedEvent::Admit => self == BedStatus::Available,
            BedEvent::Discharge { .. } => self == BedStatus::Occupied,
            BedEvent::Set(_) => self.allows_manual(to),
        };

        if allowed {
            Ok(to)
        } else {
            Err(IpdError::InvalidTransition { from: self, to })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_status() -> impl Strategy<Value = BedStatus> {
        prop::sample::select(BedStatus::ALL.to_vec())
    }

    fn any_event() -> impl Strategy<Value = BedEvent> {
        prop_oneof![
            Just(BedEvent::Admit),
            any::<bool>().prop_map(|to_maintenance| BedEvent::Discharge { to_maintenance }),
            any_status().prop_map(BedEvent::Set),
        ]
    }

    #[test]
    fn admit_requires_available() {
        assert_eq!(BedStatus::Available.apply(BedEvent::Admit).unwrap(), BedStatus::Occupied);
        for status in [BedStatus::Occupied, BedStatus::Reserved, BedStatus::Maintenance, BedStatus::OutOfService] {
            assert!(matches!(
                status.apply(BedEvent::Admit),
                Err(IpdError::InvalidTransition { to: BedStatus::Occupied, .. })
            ));
        }
    }

    #[test]
    fn discharge_returns_bed_to_service() {
        let occupied = BedStatus::Occupied;
        assert_eq!(
            occupied.apply(BedEvent::Discharge { to_maintenance: false }).unwrap(),
            BedStatus::Available
        );
        assert_eq!(
            occupied.apply(BedEvent::Discharge { to_maintenance: true }).unwrap(),
            BedStatus::Maintenance
        );
        assert!(BedStatus::Available.apply(BedEvent::Discharge { to_maintenance: false }).is_err());
    }

    #[test]
    fn out_of_service_is_only_reachable_through_maintenance() {
        assert!(BedStatus::Maintenance.apply(BedEvent::Set(BedStatus::OutOfService)).is_ok());
        assert!(BedStatus::Available.apply(BedEvent::Set(BedStatus::OutOfService)).is_err());
        assert!(BedStatus::Reserved.apply(BedEvent::Set(BedStatus::Maintenance)).is_err());
        assert!(BedStatus::OutOfService.apply(BedEvent::Set(BedStatus::Available)).is_err());
    }

    #[test]
    fn manual_same_status_is_a_no_op() {
        assert_eq!(
            BedStatus::Reserved.apply(BedEvent::Set(BedStatus::Reserved)).unwrap(),
            BedStatus::Reserved
        );
        assert!(BedStatus::Occupied.apply(BedEvent::Set(BedStatus::Occupied)).is_err());
    }

    proptest! {
        #[test]
        fn occupied_is_entered_only_by_admit(from in any_status(), event in any_event()) {
            if let Ok(BedStatus::Occupied) = from.apply(event) {
                prop_assert_eq!(from, BedStatus::Available);
                prop_assert_eq!(event, BedEvent::Admit);
            }
        }

        #[test]
        fn occupied_is_left_only_by_discharge(event in any_event()) {
            if let Ok(to) = BedStatus::Occupied.apply(event) {
                let is_discharge = matches!(event, BedEvent::Discharge { .. });
                prop_assert!(is_discharge);
                prop_assert_ne!(to, BedStatus::Occupied);
            }
        }

        #[test]
        fn manual_transitions_are_symmetric(from in any_status(), to in any_status()) {
            prop_assert_eq!(from.allows_manual(to), to.allows_manual(from));
        }
    }
}
