use serde::{Deserialize, Serialize};

use crate::args::{from_map, ArgsError};
use crate::models::{Capability, JobArguments, ValidationErrors, ViolationKind};

const DEFAULT_MAX_ITEMS: u64 = 10;

/// Arguments for LinkedIn profile lookup and search. `query` is a profile URL
/// for `getprofile` and a free-text search string for `searchbyquery`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileArguments {
    #[serde(rename = "type", default)]
    capability: Option<Capability>,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub max_items: u64,
}

impl ProfileArguments {
    pub(crate) fn decode(args: &JobArguments, capability: Capability) -> Result<Self, ArgsError> {
        let mut decoded: Self = from_map(args)?;
        decoded.capability = Some(capability);
        decoded.set_defaults();
        decoded.validate()?;
        Ok(decoded)
    }

    pub fn capability(&self) -> Capability {
        self.capability.unwrap_or(Capability::SearchByQuery)
    }

    fn set_defaults(&mut self) {
        if self.max_items == 0 {
            self.max_items = DEFAULT_MAX_ITEMS;
        }
    }

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::new();
        if self.query.is_empty() {
            errs.push("query", ViolationKind::Required, "query is required");
        }
        errs.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_query() {
        let args = JobArguments::new();
        let err = ProfileArguments::decode(&args, Capability::GetProfile).unwrap_err();
        assert!(matches!(err, ArgsError::Invalid(_)));
    }
}
