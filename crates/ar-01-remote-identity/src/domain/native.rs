//! Native handles issued by the local driver.
//!
//! These never leave the broker process. They are opaque values: the
//! driver gives them out and takes them back, nothing else interprets them.

use std::fmt;

macro_rules! native_handle {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl $name {
            pub const fn raw(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:#x})", stringify!($name), self.0)
            }
        }
    };
}

native_handle!(
    /// A driver token naming an enumerable device or accelerator.
    NativeToken
);
native_handle!(
    /// An open session on a device.
    NativeHandle
);
native_handle!(
    /// A sysfs-like object.
    NativeObject
);
