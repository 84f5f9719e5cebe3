//! Group taxonomy and the priority cascade that assigns it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Experimental arm, in classification priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Track {
    A,
    B,
    C,
}

impl Track {
    pub const PRIORITY: [Track; 3] = [Track::A, Track::B, Track::C];
}

/// Observed compliance sub-status within a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SubStatus {
    Complied,
    NonComplied,
    Unassigned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Group {
    Assigned(Track, SubStatus),
    NoGroupAssigned,
}

impl Group {
    /// Only `A-Complied` farms are paid.
    pub fn payment_eligible(&self) -> bool {
        matches!(self, Group::Assigned(Track::A, SubStatus::Complied))
    }

    /// False for `*-Unassigned` and `NoGroupAssigned`.
    pub fn is_evaluable(&self) -> bool {
        matches!(
            self,
            Group::Assigned(_, SubStatus::Complied | SubStatus::NonComplied)
        )
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Group::Assigned(track, status) => {
                let status = match status {
                    SubStatus::Complied => "Complied",
                    SubStatus::NonComplied => "NonComplied",
                    SubStatus::Unassigned => "Unassigned",
                };
                write!(f, "{track:?}-{status}")
            }
            Group::NoGroupAssigned => f.write_str("NoGroupAssigned"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown group {0:?}")]
pub struct UnknownGroup(pub String);

impl FromStr for Group {
    type Err = UnknownGroup;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_uppercase();
        if key == "NOGROUPASSIGNED" {
            return Ok(Group::NoGroupAssigned);
        }

        let track = match key.chars().next() {
            Some('A') => Track::A,
            Some('B') => Track::B,
            Some('C') => Track::C,
            _ => return Err(UnknownGroup(s.to_string())),
        };
        let status = match &key[1..] {
            "COMPLIED" => SubStatus::Complied,
            "NONCOMPLIED" => SubStatus::NonComplied,
            "UNASSIGNED" => SubStatus::Unassigned,
            _ => return Err(UnknownGroup(s.to_string())),
        };
        Ok(Group::Assigned(track, status))
    }
}

impl From<Group> for String {
    fn from(g: Group) -> Self {
        g.to_string()
    }
}

impl TryFrom<String> for Group {
    type Error = UnknownGroup;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Interpreted flags for one track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackFlags {
    pub treatment: bool,
    pub complied: bool,
    pub non_complied: bool,
}

/// Interpreted registry flags for one farm row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryFlags {
    pub study_participant: bool,
    /// Tracks A, B, C.
    pub tracks: [TrackFlags; 3],
}

/// Priority cascade A → B → C. The first track with a positive treatment
/// flag wins; `Complied` takes precedence over `NonComplied` within it.
pub fn classify(flags: &RegistryFlags) -> Group {
    for (track, f) in Track::PRIORITY.iter().zip(flags.tracks.iter()) {
        if !f.treatment {
            continue;
        }
        let status = if f.complied {
            SubStatus::Complied
        } else if f.non_complied {
            SubStatus::NonComplied
        } else {
            SubStatus::Unassigned
        };
        return Group::Assigned(*track, status);
    }
    Group::NoGroupAssigned
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(a: (bool, bool, bool), b: (bool, bool, bool), c: (bool, bool, bool)) -> RegistryFlags {
        let t = |(treatment, complied, non_complied)| TrackFlags {
            treatment,
            complied,
            non_complied,
        };
        RegistryFlags {
            study_participant: true,
            tracks: [t(a), t(b), t(c)],
        }
    }

    const OFF: (bool, bool, bool) = (false, false, false);

    #[test]
    fn test_a_takes_priority() {
        let f = flags((true, true, false), (true, false, true), (true, true, false));
        assert_eq!(classify(&f), Group::Assigned(Track::A, SubStatus::Complied));
    }

    #[test]
    fn test_falls_through_to_b_and_c() {
        let f = flags(OFF, (true, false, true), OFF);
        assert_eq!(classify(&f), Group::Assigned(Track::B, SubStatus::NonComplied));

        let f = flags((false, true, false), OFF, (true, false, false));
        assert_eq!(classify(&f), Group::Assigned(Track::C, SubStatus::Unassigned));
    }

    #[test]
    fn test_no_group() {
        assert_eq!(classify(&flags(OFF, OFF, OFF)), Group::NoGroupAssigned);
    }

    #[test]
    fn test_complied_wins_over_non_complied() {
        let f = flags((true, true, true), OFF, OFF);
        assert_eq!(classify(&f), Group::Assigned(Track::A, SubStatus::Complied));
    }

    #[test]
    fn test_classification_total_and_deterministic() {
        // Every combination of the nine track flags yields exactly one group,
        // and the same one on a second pass.
        for bits in 0u16..512 {
            let bit = |i: u16| bits & (1 << i) != 0;
            let f = flags(
                (bit(0), bit(1), bit(2)),
                (bit(3), bit(4), bit(5)),
                (bit(6), bit(7), bit(8)),
            );
            let first = classify(&f);
            assert_eq!(first, classify(&f));
            assert_eq!(first.payment_eligible(), first.to_string() == "A-Complied");
        }
    }

    #[test]
    fn test_only_a_complied_is_paid() {
        assert!(Group::Assigned(Track::A, SubStatus::Complied).payment_eligible());
        assert!(!Group::Assigned(Track::B, SubStatus::Complied).payment_eligible());
        assert!(!Group::Assigned(Track::A, SubStatus::NonComplied).payment_eligible());
        assert!(!Group::NoGroupAssigned.payment_eligible());
    }

    #[test]
    fn test_display_parse() {
        for g in [
            Group::Assigned(Track::A, SubStatus::Complied),
            Group::Assigned(Track::B, SubStatus::NonComplied),
            Group::Assigned(Track::C, SubStatus::Unassigned),
            Group::NoGroupAssigned,
        ] {
            assert_eq!(g.to_string().parse::<Group>().unwrap(), g);
        }
        assert_eq!(
            "a complied".parse::<Group>().unwrap(),
            Group::Assigned(Track::A, SubStatus::Complied)
        );
        assert!("D-Complied".parse::<Group>().is_err());
    }
}
