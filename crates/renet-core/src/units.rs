#![allow(missing_docs)]
//! Types for representing units. Rates and capacities are kept as distinct newtypes so that a
//! link's configured Mbps can never be silently compared against a measured bytes/sec usage.

macro_rules! unit {
    ($name: ident) => {
        #[derive(
            Debug,
            Default,
            Copy,
            Clone,
            PartialOrd,
            PartialEq,
            derive_more::Add,
            derive_more::Sub,
            derive_more::AddAssign,
            derive_more::SubAssign,
            derive_more::Sum,
            serde::Serialize,
            serde::Deserialize,
        )]
        pub struct $name(f64);

        impl $name {
            pub const ZERO: $name = Self::new(0.0);

            pub const fn new(value: f64) -> Self {
                Self(value)
            }

            pub const fn into_f64(self) -> f64 {
                self.0
            }
        }

        impl From<$name> for f64 {
            fn from(val: $name) -> Self {
                val.into_f64()
            }
        }
    };
}

unit!(Mbps);

impl std::fmt::Display for Mbps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}Mbps", self.0)
    }
}

/// Bytes per second: the unit link usage, flow rates, and `desired_rate` are expressed in.
unit!(BytesPerSec);

impl std::fmt::Display for BytesPerSec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}B/s", self.0)
    }
}

impl From<Mbps> for BytesPerSec {
    /// 1 Mbps = 1_000_000 bits/sec = 125_000 bytes/sec.
    fn from(val: Mbps) -> Self {
        Self::new(val.0 * 125_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mbps_to_bytes_per_sec() {
        let bps: BytesPerSec = Mbps::new(1.0).into();
        assert_eq!(bps.into_f64(), 125_000.0);
    }

    #[test]
    fn zero_is_default() {
        assert_eq!(BytesPerSec::default(), BytesPerSec::ZERO);
    }
}
