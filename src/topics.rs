use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

pub const PC_TO_DEVICE: &str = "pc_to_device";
pub const DEVICE_TO_PC: &str = "device_to_pc";

/// Which end of the link this process plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Pc,
    Device,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pc" | "desktop" => Ok(Role::Pc),
            "device" | "pico" => Ok(Role::Device),
            other => Err(format!("unknown role '{}', expected 'pc' or 'device'", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Pc => write!(f, "pc"),
            Role::Device => write!(f, "device"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub publish: String,
    pub subscribe: String,
}

impl Topics {
    /// Resolves the publish/subscribe pair for a role.
    ///
    /// With `swap` set, a pc takes the device's directions so that two desktop
    /// instances can talk to each other.
    pub fn for_role(unique_id: &str, role: Role, swap: bool) -> Self {
        let to_device = format!("{}/{}", unique_id, PC_TO_DEVICE);
        let to_pc = format!("{}/{}", unique_id, DEVICE_TO_PC);

        let acts_as_device = match role {
            Role::Device => true,
            Role::Pc => swap,
        };

        if acts_as_device {
            Self {
                publish: to_pc,
                subscribe: to_device,
            }
        } else {
            Self {
                publish: to_device,
                subscribe: to_pc,
            }
        }
    }
}
