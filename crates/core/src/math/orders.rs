use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Order in which scale, rotate and translate are composed.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum XformOrder {
    #[default]
    SRT,
    STR,
    RST,
    RTS,
    TSR,
    TRS,
}

/// Axis sequence of an Euler rotation. `XYZ` rotates about X first.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RotationOrder {
    #[default]
    XYZ,
    XZY,
    YXZ,
    YZX,
    ZXY,
    ZYX,
}

/// Local axis that gets aimed at a lookat target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AxisDirection {
    #[serde(rename = "-X")]
    XMinus,
    #[serde(rename = "+X")]
    XPlus,
    #[serde(rename = "-Y")]
    YMinus,
    #[serde(rename = "+Y")]
    YPlus,
    #[default]
    #[serde(rename = "-Z")]
    ZMinus,
    #[serde(rename = "+Z")]
    ZPlus,
}

impl XformOrder {
    pub const ALL: [XformOrder; 6] = [
        XformOrder::SRT,
        XformOrder::STR,
        XformOrder::RST,
        XformOrder::RTS,
        XformOrder::TSR,
        XformOrder::TRS,
    ];

    pub fn name(self) -> &'static str {
        match self {
            XformOrder::SRT => "SRT",
            XformOrder::STR => "STR",
            XformOrder::RST => "RST",
            XformOrder::RTS => "RTS",
            XformOrder::TSR => "TSR",
            XformOrder::TRS => "TRS",
        }
    }

    pub fn index(self) -> i32 {
        self as i32
    }

    pub fn from_index(index: i32) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
    }
}

impl RotationOrder {
    pub const ALL: [RotationOrder; 6] = [
        RotationOrder::XYZ,
        RotationOrder::XZY,
        RotationOrder::YXZ,
        RotationOrder::YZX,
        RotationOrder::ZXY,
        RotationOrder::ZYX,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RotationOrder::XYZ => "XYZ",
            RotationOrder::XZY => "XZY",
            RotationOrder::YXZ => "YXZ",
            RotationOrder::YZX => "YZX",
            RotationOrder::ZXY => "ZXY",
            RotationOrder::ZYX => "ZYX",
        }
    }

    pub fn index(self) -> i32 {
        self as i32
    }

    pub fn from_index(index: i32) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
    }

    /// Component indices in the order the axes are applied.
    pub fn axes(self) -> [usize; 3] {
        match self {
            RotationOrder::XYZ => [0, 1, 2],
            RotationOrder::XZY => [0, 2, 1],
            RotationOrder::YXZ => [1, 0, 2],
            RotationOrder::YZX => [1, 2, 0],
            RotationOrder::ZXY => [2, 0, 1],
            RotationOrder::ZYX => [2, 1, 0],
        }
    }
}

impl AxisDirection {
    pub const ALL: [AxisDirection; 6] = [
        AxisDirection::XMinus,
        AxisDirection::XPlus,
        AxisDirection::YMinus,
        AxisDirection::YPlus,
        AxisDirection::ZMinus,
        AxisDirection::ZPlus,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AxisDirection::XMinus => "-X",
            AxisDirection::XPlus => "+X",
            AxisDirection::YMinus => "-Y",
            AxisDirection::YPlus => "+Y",
            AxisDirection::ZMinus => "-Z",
            AxisDirection::ZPlus => "+Z",
        }
    }

    pub fn index(self) -> i32 {
        self as i32
    }

    pub fn from_index(index: i32) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOrderError {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for ParseOrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for ParseOrderError {}

macro_rules! order_str_impls {
    ($ty:ty, $kind:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $ty {
            type Err = ParseOrderError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if let Some(found) = Self::ALL
                    .iter()
                    .copied()
                    .find(|value| value.name().eq_ignore_ascii_case(trimmed))
                {
                    return Ok(found);
                }
                // Integer form as written by ArgSet::set_int.
                trimmed
                    .parse::<i32>()
                    .ok()
                    .and_then(Self::from_index)
                    .ok_or_else(|| ParseOrderError {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }
    };
}

order_str_impls!(XformOrder, "xform order");
order_str_impls!(RotationOrder, "rotation order");
order_str_impls!(AxisDirection, "axis direction");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_values_are_stable() {
        assert_eq!(XformOrder::SRT.index(), 0);
        assert_eq!(XformOrder::TRS.index(), 5);
        assert_eq!(RotationOrder::ZXY.index(), 4);
        assert_eq!(AxisDirection::XMinus.index(), 0);
        assert_eq!(AxisDirection::ZPlus.index(), 5);
        assert_eq!(XformOrder::from_index(6), None);
        assert_eq!(RotationOrder::from_index(-1), None);
    }

    #[test]
    fn parses_names_and_indices() {
        assert_eq!("zxy".parse::<RotationOrder>(), Ok(RotationOrder::ZXY));
        assert_eq!("3".parse::<XformOrder>(), Ok(XformOrder::RTS));
        assert_eq!("+Y".parse::<AxisDirection>(), Ok(AxisDirection::YPlus));
        assert!(matches!(
            "QRS".parse::<XformOrder>(),
            Err(ParseOrderError { kind: "xform order", .. })
        ));
    }

    #[test]
    fn rotation_axes_cover_every_component() {
        for order in RotationOrder::ALL {
            let mut axes = order.axes();
            axes.sort_unstable();
            assert_eq!(axes, [0, 1, 2], "{order}");
        }
    }
}
