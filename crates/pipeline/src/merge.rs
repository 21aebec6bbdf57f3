use crate::command::{Target, UpdateCommand};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// How distinct commands for the same target within one tick are resolved.
///
/// A dispatcher uses exactly one policy for every target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MergePolicy {
    /// The latest enqueued command for a target replaces earlier ones.
    /// Earlier offsets are discarded, not applied.
    #[default]
    LastWins,
    /// Offsets for the same entity are summed in enqueue order.
    /// Block changes still resolve last-wins.
    Compose,
}

impl fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LastWins => "last_wins",
            Self::Compose => "compose",
        })
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unknown merge policy {0:?}, expected last_wins or compose")]
pub struct ParsePolicyError(pub String);

impl FromStr for MergePolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "last_wins" | "lastwins" => Ok(Self::LastWins),
            "compose" => Ok(Self::Compose),
            _ => Err(ParsePolicyError(s.to_string())),
        }
    }
}

/// A drained batch after dedup and merging.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolved {
    /// At most one command per target, in order of each target's first
    /// appearance in the batch.
    pub commands: Vec<UpdateCommand>,
    /// Commands equal to one seen earlier in the batch.
    pub duplicates: usize,
    /// Distinct commands folded into another command for the same target.
    pub superseded: usize,
}

/// Dedup `batch` by equality, then merge per target under `policy`.
///
/// Dedup runs first, so a repeat of an already-seen command does not
/// count again under [`MergePolicy::Compose`] and does not re-assert itself
/// under [`MergePolicy::LastWins`].
pub fn resolve(batch: Vec<UpdateCommand>, policy: MergePolicy) -> Resolved {
    let mut seen = HashSet::with_capacity(batch.len());
    let mut slots: HashMap<Target, usize> = HashMap::with_capacity(batch.len());
    let mut out = Resolved {
        commands: Vec::with_capacity(batch.len()),
        ..Resolved::default()
    };

    for cmd in batch {
        if !seen.insert(cmd) {
            out.duplicates += 1;
            continue;
        }
        match slots.entry(cmd.target()) {
            Entry::Vacant(v) => {
                v.insert(out.commands.len());
                out.commands.push(cmd);
            }
            Entry::Occupied(o) => {
                let slot = &mut out.commands[*o.get()];
                *slot = match policy {
                    MergePolicy::LastWins => cmd,
                    MergePolicy::Compose => slot.compose(&cmd),
                };
                out.superseded += 1;
            }
        }
    }
    out
}
