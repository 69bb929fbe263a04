use serde::{Deserialize, Serialize};

use crate::args::{from_map, ArgsError};
use crate::models::{Capability, JobArguments};

/// Telemetry jobs take no arguments beyond the optional discriminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryArguments {
    #[serde(rename = "type", default)]
    capability: Option<Capability>,
}

impl TelemetryArguments {
    pub(crate) fn decode(args: &JobArguments, capability: Capability) -> Result<Self, ArgsError> {
        let mut decoded: Self = from_map(args)?;
        decoded.capability = Some(capability);
        Ok(decoded)
    }

    pub fn capability(&self) -> Capability {
        self.capability.unwrap_or(Capability::Telemetry)
    }
}
