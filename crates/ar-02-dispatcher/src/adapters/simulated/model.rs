//! Device model behind the simulated driver.
//!
//! Every card exposes two resources: a management device (FME) and one
//! accelerator port whose parent is the device.

use crate::ports::outbound::LocalProperties;
use ar_01_remote_identity::NativeToken;
use shared_types::{
    AcceleratorState, DeviceHeader, MetricDatatype, MetricInfo, MetricThreshold, MetricType,
    ObjectType, Threshold, UserClock,
};

/// Bytes per MMIO region.
pub const MMIO_REGION_BYTES: usize = 64 * 1024;

/// Largest buffer the simulator will back with memory.
pub const MAX_BUFFER_BYTES: u64 = 64 * 1024 * 1024;

pub const INTEL_VENDOR_ID: u16 = 0x8086;
pub const DEVICE_ID: u16 = 0x0b30;

pub const FME_GUID: [u8; 16] = [
    0xbf, 0xaf, 0x2a, 0xe9, 0x4a, 0x52, 0x46, 0xe3, 0x82, 0xfe, 0x38, 0xf0, 0xf9, 0xe1, 0x77, 0x64,
];

/// Identity of the loopback function loaded at start-up.
pub const DEFAULT_AFU_GUID: [u8; 16] = [
    0xd8, 0x42, 0x4d, 0xc4, 0xa4, 0xa3, 0xc4, 0x13, 0xf8, 0x9e, 0x43, 0x36, 0x83, 0xf9, 0x04, 0x0b,
];

/// Register offsets of the AFU id in port region 0.
pub const AFU_ID_L: usize = 0x8;
pub const AFU_ID_H: usize = 0x10;

// =============================================================================
// SYSFS-LIKE OBJECT TREE
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum SysNode {
    Attribute(String),
    Container(Vec<(String, SysNode)>),
}

impl SysNode {
    fn attr(value: impl Into<String>) -> Self {
        SysNode::Attribute(value.into())
    }

    fn dir(children: Vec<(&str, SysNode)>) -> Self {
        SysNode::Container(
            children
                .into_iter()
                .map(|(name, node)| (name.to_string(), node))
                .collect(),
        )
    }

    pub fn find(&self, path: &[String]) -> Option<&SysNode> {
        match path.split_first() {
            None => Some(self),
            Some((head, rest)) => match self {
                SysNode::Container(children) => children
                    .iter()
                    .find(|(name, _)| name == head)
                    .and_then(|(_, node)| node.find(rest)),
                SysNode::Attribute(_) => None,
            },
        }
    }

    pub fn find_mut(&mut self, path: &[String]) -> Option<&mut SysNode> {
        match path.split_first() {
            None => Some(self),
            Some((head, rest)) => match self {
                SysNode::Container(children) => children
                    .iter_mut()
                    .find(|(name, _)| name == head)
                    .and_then(|(_, node)| node.find_mut(rest)),
                SysNode::Attribute(_) => None,
            },
        }
    }

    /// Name of the `index`-th child of a container.
    pub fn child_name(&self, index: u64) -> Option<&str> {
        match self {
            SysNode::Container(children) => usize::try_from(index)
                .ok()
                .and_then(|i| children.get(i))
                .map(|(name, _)| name.as_str()),
            SysNode::Attribute(_) => None,
        }
    }
}

/// Split `a/b/c` into path components, ignoring empty ones.
pub fn split_path(name: &str) -> Vec<String> {
    name.split('/')
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse an attribute value the way sysfs readers do: `0x` prefix means
/// hex, anything else decimal.
pub fn parse_attr_u64(value: &str) -> Option<u64> {
    let value = value.trim();
    match value.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

pub fn guid_hex(guid: &[u8; 16]) -> String {
    guid.iter().map(|b| format!("{b:02x}")).collect()
}

// =============================================================================
// ERROR REGISTERS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRegister {
    pub name: &'static str,
    pub can_clear: bool,
    pub value: u64,
}

impl ErrorRegister {
    fn new(name: &'static str, can_clear: bool) -> Self {
        Self {
            name,
            can_clear,
            value: 0,
        }
    }
}

// =============================================================================
// RESOURCES
// =============================================================================

/// One enumerable resource: a management device or an accelerator port.
#[derive(Debug)]
pub struct Resource {
    pub card: usize,
    /// Token enumeration hands out for this resource.
    pub canonical: NativeToken,
    pub props: LocalProperties,
    pub errors: Vec<ErrorRegister>,
    pub sysfs: SysNode,
    pub regions: Vec<Vec<u8>>,
    pub open_count: u32,
    pub exclusive: bool,
    pub clock: Option<UserClock>,
    pub perf_counter: u64,
}

impl Resource {
    pub fn device(card: usize, canonical: NativeToken) -> Self {
        let bus = 0x5e + card as u8;
        let props = LocalProperties {
            parent: None,
            object_type: Some(ObjectType::Device),
            segment: Some(0),
            bus: Some(bus),
            device: Some(0),
            function: Some(0),
            socket_id: Some(card as u8),
            vendor_id: Some(INTEL_VENDOR_ID),
            device_id: Some(DEVICE_ID),
            subsystem_vendor_id: Some(INTEL_VENDOR_ID),
            subsystem_device_id: Some(0),
            object_id: Some(0xf5_0000 + ((card as u64) << 8)),
            guid: Some(FME_GUID),
            num_errors: Some(4),
            interface: Some("dfl".to_string()),
            num_slots: Some(1),
            bbs_id: Some(0x0063_0000_2300_0000),
            bbs_version: Some((1, 2, 3)),
            ..Default::default()
        };

        let sysfs = SysNode::dir(vec![
            ("bitstream_id", SysNode::attr("0x630000023000000")),
            ("bitstream_metadata", SysNode::attr("0x1200203")),
            ("ports_num", SysNode::attr("1")),
            (
                "errors",
                SysNode::dir(vec![
                    ("errors", SysNode::attr("0x0")),
                    ("first_error", SysNode::attr("0x0")),
                    ("next_error", SysNode::attr("0x0")),
                    ("pcie0_errors", SysNode::attr("0x0")),
                ]),
            ),
        ]);

        Self {
            card,
            canonical,
            props,
            errors: vec![
                ErrorRegister::new("errors", true),
                ErrorRegister::new("first_error", false),
                ErrorRegister::new("next_error", false),
                ErrorRegister::new("pcie0_errors", true),
            ],
            sysfs,
            regions: vec![vec![0; MMIO_REGION_BYTES]],
            open_count: 0,
            exclusive: false,
            clock: None,
            perf_counter: 0,
        }
    }

    pub fn accelerator(card: usize, canonical: NativeToken, parent: NativeToken) -> Self {
        let bus = 0x5e + card as u8;
        let props = LocalProperties {
            parent: Some(parent),
            object_type: Some(ObjectType::Accelerator),
            segment: Some(0),
            bus: Some(bus),
            device: Some(0),
            function: Some(0),
            socket_id: Some(card as u8),
            vendor_id: Some(INTEL_VENDOR_ID),
            device_id: Some(DEVICE_ID),
            subsystem_vendor_id: Some(INTEL_VENDOR_ID),
            subsystem_device_id: Some(0),
            object_id: Some(0xf5_0001 + ((card as u64) << 8)),
            guid: Some(DEFAULT_AFU_GUID),
            num_errors: Some(2),
            interface: Some("dfl".to_string()),
            accelerator_state: Some(AcceleratorState::Unassigned),
            num_mmio: Some(2),
            num_interrupts: Some(0),
            ..Default::default()
        };

        let sysfs = SysNode::dir(vec![
            ("afu_id", SysNode::attr(guid_hex(&DEFAULT_AFU_GUID))),
            ("power_state", SysNode::attr("0")),
            (
                "errors",
                SysNode::dir(vec![
                    ("errors", SysNode::attr("0x0")),
                    ("first_error", SysNode::attr("0x0")),
                ]),
            ),
            (
                "userclk",
                SysNode::dir(vec![
                    ("frequency", SysNode::attr("312500000")),
                    ("low_frequency", SysNode::attr("156250000")),
                ]),
            ),
        ]);

        let mut resource = Self {
            card,
            canonical,
            props,
            errors: vec![
                ErrorRegister::new("errors", true),
                ErrorRegister::new("first_error", false),
            ],
            sysfs,
            regions: vec![vec![0; MMIO_REGION_BYTES]; 2],
            open_count: 0,
            exclusive: false,
            clock: Some(UserClock {
                high_hz: 312_500_000,
                low_hz: 156_250_000,
            }),
            perf_counter: 0,
        };
        resource.load_afu_id();
        resource
    }

    pub fn is_accelerator(&self) -> bool {
        self.props.object_type == Some(ObjectType::Accelerator)
    }

    /// Current properties, with the assignment state filled in.
    pub fn properties(&self) -> LocalProperties {
        let mut props = self.props.clone();
        if self.is_accelerator() {
            props.accelerator_state = Some(if self.open_count > 0 {
                AcceleratorState::Assigned
            } else {
                AcceleratorState::Unassigned
            });
        }
        props
    }

    pub fn header(&self) -> DeviceHeader {
        let props = &self.props;
        DeviceHeader {
            vendor_id: props.vendor_id.unwrap_or_default(),
            device_id: props.device_id.unwrap_or_default(),
            segment: props.segment.unwrap_or_default(),
            bus: props.bus.unwrap_or_default(),
            device: props.device.unwrap_or_default(),
            function: props.function.unwrap_or_default(),
            interface: props.interface.clone().unwrap_or_default(),
            object_type: props.object_type.unwrap_or(ObjectType::Device),
            object_id: props.object_id.unwrap_or_default(),
            guid: props.guid.unwrap_or_default(),
            subsystem_vendor_id: props.subsystem_vendor_id.unwrap_or_default(),
            subsystem_device_id: props.subsystem_device_id.unwrap_or_default(),
        }
    }

    /// Mirror the loaded GUID into the AFU id registers and sysfs.
    pub fn load_afu_id(&mut self) {
        let guid = self.props.guid.unwrap_or_default();
        if let Some(region) = self.regions.first_mut() {
            region[AFU_ID_H..AFU_ID_H + 8].copy_from_slice(&guid[..8]);
            region[AFU_ID_L..AFU_ID_L + 8].copy_from_slice(&guid[8..]);
        }
        if let Some(SysNode::Attribute(value)) = self.sysfs.find_mut(&["afu_id".to_string()]) {
            *value = guid_hex(&guid);
        }
    }

    /// Zero every register, keeping the AFU id readable.
    pub fn reset_registers(&mut self) {
        for region in &mut self.regions {
            region.fill(0);
        }
        if self.is_accelerator() {
            self.load_afu_id();
        }
    }
}

// =============================================================================
// METRICS
// =============================================================================

pub fn metric_table() -> Vec<MetricInfo> {
    let info = |num: u64,
                group: &str,
                name: &str,
                units: &str,
                datatype: MetricDatatype,
                metric_type: MetricType| MetricInfo {
        metric_num: num,
        metric_guid: [num as u8; 16],
        qualifier_name: format!("{group}:{name}"),
        group_name: group.to_string(),
        metric_name: name.to_string(),
        metric_units: units.to_string(),
        datatype,
        metric_type,
    };
    vec![
        info(
            0,
            "power_mgmt",
            "consumed",
            "watts",
            MetricDatatype::Double,
            MetricType::Power,
        ),
        info(
            1,
            "thermal_mgmt",
            "fpga_die",
            "celsius",
            MetricDatatype::Double,
            MetricType::Thermal,
        ),
        info(
            2,
            "performance",
            "cache_read_hit",
            "counts",
            MetricDatatype::Int,
            MetricType::Performance,
        ),
    ]
}

pub fn threshold_table() -> Vec<MetricThreshold> {
    vec![
        MetricThreshold {
            metric_name: "consumed".to_string(),
            upper_critical: Some(Threshold {
                name: "Upper Critical".to_string(),
                value: 75.0,
            }),
            upper_non_critical: Some(Threshold {
                name: "Upper Non-Critical".to_string(),
                value: 66.0,
            }),
            ..Default::default()
        },
        MetricThreshold {
            metric_name: "fpga_die".to_string(),
            upper_non_recoverable: Some(Threshold {
                name: "Upper Non-Recoverable".to_string(),
                value: 100.0,
            }),
            upper_critical: Some(Threshold {
                name: "Upper Critical".to_string(),
                value: 90.0,
            }),
            ..Default::default()
        },
    ]
}
