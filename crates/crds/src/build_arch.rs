//! Build architectures reported by iPXE firmware
//!
//! Values match iPXE's `${buildarch}` setting so the firmware can interpolate
//! it straight into a request URL.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Firmware build architecture
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BuildArch {
    #[serde(rename = "arm32")]
    Arm32,
    #[serde(rename = "arm64")]
    Arm64,
    #[serde(rename = "i386")]
    I386,
    #[serde(rename = "x86_64")]
    X86_64,
}

impl BuildArch {
    /// Every supported architecture
    pub const ALL: [BuildArch; 4] = [
        BuildArch::Arm32,
        BuildArch::Arm64,
        BuildArch::I386,
        BuildArch::X86_64,
    ];

    /// The iPXE spelling of this architecture
    pub fn as_str(self) -> &'static str {
        match self {
            BuildArch::Arm32 => "arm32",
            BuildArch::Arm64 => "arm64",
            BuildArch::I386 => "i386",
            BuildArch::X86_64 => "x86_64",
        }
    }
}

impl fmt::Display for BuildArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown architecture name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown build architecture: {0}")]
pub struct UnknownBuildArch(pub String);

impl FromStr for BuildArch {
    type Err = UnknownBuildArch;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BuildArch::ALL
            .into_iter()
            .find(|arch| arch.as_str() == s)
            .ok_or_else(|| UnknownBuildArch(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_every_arch() {
        for arch in BuildArch::ALL {
            assert_eq!(arch.as_str().parse::<BuildArch>(), Ok(arch));
        }
    }

    #[test]
    fn test_parse_unknown_arch() {
        assert_eq!(
            "riscv64".parse::<BuildArch>(),
            Err(UnknownBuildArch("riscv64".to_string()))
        );
    }

    #[test]
    fn test_serde_uses_ipxe_spelling() {
        let json = serde_json::to_string(&BuildArch::X86_64).expect("serialize arch");
        assert_eq!(json, "\"x86_64\"");
    }
}
