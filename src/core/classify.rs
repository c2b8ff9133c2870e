use crate::model::common::Track;
use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Reason {
    NoItemObject,
    NotPlayable,
    Restriction(String),
    NotInRegion,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::NoItemObject => f.write_str("no_item_object"),
            Reason::NotPlayable => f.write_str("not_playable"),
            Reason::Restriction(code) => write!(f, "restriction:{}", code),
            Reason::NotInRegion => f.write_str("not_in_region"),
        }
    }
}

impl Serialize for Reason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub reasons: Vec<Reason>,
}

impl Classification {
    pub fn unavailable(&self) -> bool {
        !self.reasons.is_empty()
    }
}

pub fn classify(track: Option<&Track>, region: Option<&str>) -> Classification {
    let mut reasons = Vec::new();

    let Some(track) = track else {
        reasons.push(Reason::NoItemObject);
        return Classification { reasons };
    };

    if track.id.as_deref().map_or(true, str::is_empty) {
        reasons.push(Reason::NoItemObject);
    }
    if track.is_playable == Some(false) {
        reasons.push(Reason::NotPlayable);
    }
    if let Some(code) = track.restriction.as_deref().filter(|c| !c.is_empty()) {
        reasons.push(Reason::Restriction(code.to_string()));
    }
    if let (Some(region), Some(markets)) = (region, track.available_markets.as_ref()) {
        if !markets.iter().any(|m| m.eq_ignore_ascii_case(region)) {
            reasons.push(Reason::NotInRegion);
        }
    }

    Classification { reasons }
}
