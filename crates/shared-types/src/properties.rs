//! # Resource Properties
//!
//! Property sets describe a device or accelerator and double as enumeration
//! filters. Every field is optional: on a filter, an unset field matches
//! anything.
//!
//! The parent reference is generic. Locally it is a native token; on the
//! wire it is a `RemoteId`. The broker translates between the two with
//! [`FpgaProperties::try_map_parent`].

use crate::remote_id::RemoteId;
use serde::{Deserialize, Serialize};

/// Kind of resource a token refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    /// The management function of a card.
    Device,
    /// A user-programmable port.
    Accelerator,
}

/// Assignment state of an accelerator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AcceleratorState {
    Assigned,
    Unassigned,
}

/// Property set parameterised over the parent reference type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FpgaProperties<P> {
    /// Token of the owning device, for accelerators.
    pub parent: Option<P>,
    pub object_type: Option<ObjectType>,
    pub segment: Option<u16>,
    pub bus: Option<u8>,
    pub device: Option<u8>,
    pub function: Option<u8>,
    pub socket_id: Option<u8>,
    pub vendor_id: Option<u16>,
    pub device_id: Option<u16>,
    pub subsystem_vendor_id: Option<u16>,
    pub subsystem_device_id: Option<u16>,
    pub object_id: Option<u64>,
    pub guid: Option<[u8; 16]>,
    pub num_errors: Option<u32>,
    pub interface: Option<String>,
    // Device only
    pub num_slots: Option<u32>,
    pub bbs_id: Option<u64>,
    pub bbs_version: Option<(u8, u8, u16)>,
    // Accelerator only
    pub accelerator_state: Option<AcceleratorState>,
    pub num_mmio: Option<u32>,
    pub num_interrupts: Option<u32>,
}

/// Properties as they travel between client and broker.
pub type Properties = FpgaProperties<RemoteId>;

impl<P> Default for FpgaProperties<P> {
    fn default() -> Self {
        Self {
            parent: None,
            object_type: None,
            segment: None,
            bus: None,
            device: None,
            function: None,
            socket_id: None,
            vendor_id: None,
            device_id: None,
            subsystem_vendor_id: None,
            subsystem_device_id: None,
            object_id: None,
            guid: None,
            num_errors: None,
            interface: None,
            num_slots: None,
            bbs_id: None,
            bbs_version: None,
            accelerator_state: None,
            num_mmio: None,
            num_interrupts: None,
        }
    }
}

impl<P> FpgaProperties<P> {
    /// Empty property set, which as a filter matches everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert the parent reference, keeping every other field.
    ///
    /// `f` is only called when a parent is set. The first error aborts the
    /// conversion.
    pub fn try_map_parent<Q, E, F>(self, f: F) -> Result<FpgaProperties<Q>, E>
    where
        F: FnOnce(P) -> Result<Q, E>,
    {
        let parent = match self.parent {
            Some(p) => Some(f(p)?),
            None => None,
        };
        Ok(FpgaProperties {
            parent,
            object_type: self.object_type,
            segment: self.segment,
            bus: self.bus,
            device: self.device,
            function: self.function,
            socket_id: self.socket_id,
            vendor_id: self.vendor_id,
            device_id: self.device_id,
            subsystem_vendor_id: self.subsystem_vendor_id,
            subsystem_device_id: self.subsystem_device_id,
            object_id: self.object_id,
            guid: self.guid,
            num_errors: self.num_errors,
            interface: self.interface,
            num_slots: self.num_slots,
            bbs_id: self.bbs_id,
            bbs_version: self.bbs_version,
            accelerator_state: self.accelerator_state,
            num_mmio: self.num_mmio,
            num_interrupts: self.num_interrupts,
        })
    }

    /// Infallible form of [`Self::try_map_parent`].
    pub fn map_parent<Q, F>(self, f: F) -> FpgaProperties<Q>
    where
        F: FnOnce(P) -> Q,
    {
        match self.try_map_parent::<Q, std::convert::Infallible, _>(|p| Ok(f(p))) {
            Ok(props) => props,
            Err(never) => match never {},
        }
    }
}

impl<P: PartialEq> FpgaProperties<P> {
    /// Whether `self` satisfies every field set on `filter`.
    pub fn matches(&self, filter: &FpgaProperties<P>) -> bool {
        fn field<T: PartialEq>(want: &Option<T>, have: &Option<T>) -> bool {
            match want {
                Some(w) => have.as_ref() == Some(w),
                None => true,
            }
        }

        field(&filter.parent, &self.parent)
            && field(&filter.object_type, &self.object_type)
            && field(&filter.segment, &self.segment)
            && field(&filter.bus, &self.bus)
            && field(&filter.device, &self.device)
            && field(&filter.function, &self.function)
            && field(&filter.socket_id, &self.socket_id)
            && field(&filter.vendor_id, &self.vendor_id)
            && field(&filter.device_id, &self.device_id)
            && field(&filter.subsystem_vendor_id, &self.subsystem_vendor_id)
            && field(&filter.subsystem_device_id, &self.subsystem_device_id)
            && field(&filter.object_id, &self.object_id)
            && field(&filter.guid, &self.guid)
            && field(&filter.num_errors, &self.num_errors)
            && field(&filter.interface, &self.interface)
            && field(&filter.num_slots, &self.num_slots)
            && field(&filter.bbs_id, &self.bbs_id)
            && field(&filter.bbs_version, &self.bbs_version)
            && field(&filter.accelerator_state, &self.accelerator_state)
            && field(&filter.num_mmio, &self.num_mmio)
            && field(&filter.num_interrupts, &self.num_interrupts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accelerator(parent: u64) -> FpgaProperties<u64> {
        FpgaProperties {
            parent: Some(parent),
            object_type: Some(ObjectType::Accelerator),
            bus: Some(0x5e),
            vendor_id: Some(0x8086),
            num_mmio: Some(2),
            ..FpgaProperties::default()
        }
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(accelerator(1).matches(&FpgaProperties::new()));
    }

    #[test]
    fn test_filter_fields_must_all_match() {
        let props = accelerator(1);
        let mut filter = FpgaProperties::new();
        filter.object_type = Some(ObjectType::Accelerator);
        filter.bus = Some(0x5e);
        assert!(props.matches(&filter));

        filter.bus = Some(0x5f);
        assert!(!props.matches(&filter));
    }

    #[test]
    fn test_filter_on_unset_field_rejects() {
        let props = accelerator(1);
        let filter = FpgaProperties {
            num_slots: Some(1),
            ..FpgaProperties::default()
        };
        assert!(!props.matches(&filter));
    }

    #[test]
    fn test_parent_participates_in_match() {
        let filter = FpgaProperties {
            parent: Some(7u64),
            ..FpgaProperties::default()
        };
        assert!(accelerator(7).matches(&filter));
        assert!(!accelerator(8).matches(&filter));
    }

    #[test]
    fn test_map_parent_preserves_fields() {
        let mapped = accelerator(3).map_parent(|p| RemoteId::new(9, p));
        assert_eq!(mapped.parent, Some(RemoteId::new(9, 3)));
        assert_eq!(mapped.bus, Some(0x5e));
        assert_eq!(mapped.num_mmio, Some(2));
    }

    #[test]
    fn test_try_map_parent_propagates_error() {
        let result: Result<FpgaProperties<u64>, &str> =
            accelerator(3).try_map_parent(|_| Err("unknown parent"));
        assert_eq!(result, Err("unknown parent"));

        let no_parent: FpgaProperties<u64> = FpgaProperties::new();
        let mapped: Result<FpgaProperties<u32>, &str> =
            no_parent.try_map_parent(|_| Err("never called"));
        assert!(mapped.is_ok());
    }
}
