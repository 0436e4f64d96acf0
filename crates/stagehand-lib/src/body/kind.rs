//! Body classification
//!
//! Each [`BodyKind`] maps, through a static table, to the capability flags
//! external tools query and to the collection root its bodies live under.

use crate::environment::Environment;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyKind {
    #[default]
    Asset,
    Shot,
    Sequence,
    Set,
    Tool,
    Crowd,
}

/// Capability answers for a kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub shot: bool,
    pub set: bool,
    pub asset: bool,
    pub tool: bool,
    pub crowd_cycle: bool,
}

/// A root directory bodies are provisioned under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Assets,
    Shots,
    Sequences,
    Layouts,
    Tools,
    Crowds,
}

struct KindEntry {
    kind: BodyKind,
    name: &'static str,
    collection: Collection,
    capabilities: Capabilities,
}

const NONE: Capabilities = Capabilities {
    shot: false,
    set: false,
    asset: false,
    tool: false,
    crowd_cycle: false,
};

static KIND_TABLE: [KindEntry; 6] = [
    KindEntry {
        kind: BodyKind::Asset,
        name: "asset",
        collection: Collection::Assets,
        capabilities: Capabilities { asset: true, ..NONE },
    },
    KindEntry {
        kind: BodyKind::Shot,
        name: "shot",
        collection: Collection::Shots,
        capabilities: Capabilities { shot: true, ..NONE },
    },
    KindEntry {
        kind: BodyKind::Sequence,
        name: "sequence",
        collection: Collection::Sequences,
        capabilities: NONE,
    },
    KindEntry {
        kind: BodyKind::Set,
        name: "set",
        collection: Collection::Layouts,
        capabilities: Capabilities { set: true, ..NONE },
    },
    KindEntry {
        kind: BodyKind::Tool,
        name: "tool",
        collection: Collection::Tools,
        capabilities: Capabilities { tool: true, ..NONE },
    },
    KindEntry {
        kind: BodyKind::Crowd,
        name: "crowd",
        collection: Collection::Crowds,
        capabilities: Capabilities {
            crowd_cycle: true,
            ..NONE
        },
    },
];

impl BodyKind {
    pub const ALL: [BodyKind; 6] = [
        BodyKind::Asset,
        BodyKind::Shot,
        BodyKind::Sequence,
        BodyKind::Set,
        BodyKind::Tool,
        BodyKind::Crowd,
    ];

    fn entry(self) -> &'static KindEntry {
        // the table is ordered like the enum
        &KIND_TABLE[self as usize]
    }

    pub fn as_str(self) -> &'static str {
        self.entry().name
    }

    pub fn capabilities(self) -> Capabilities {
        self.entry().capabilities
    }

    pub fn collection(self) -> Collection {
        self.entry().collection
    }

    /// Directory bodies of this kind are created under
    pub fn root(self, env: &Environment) -> &Path {
        self.collection().root(env)
    }
}

impl fmt::Display for BodyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BodyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        let lookup = match lower.as_str() {
            "layout" => "set",
            "crowd_cycle" | "crowdcycle" => "crowd",
            other => other,
        };
        KIND_TABLE
            .iter()
            .find(|entry| entry.name == lookup)
            .map(|entry| entry.kind)
            .ok_or_else(|| format!("unknown body type: {}", s))
    }
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Collection::Assets,
        Collection::Shots,
        Collection::Sequences,
        Collection::Layouts,
        Collection::Tools,
        Collection::Crowds,
    ];

    pub fn root(self, env: &Environment) -> &Path {
        match self {
            Collection::Assets => env.assets_dir(),
            Collection::Shots => env.shots_dir(),
            Collection::Sequences => env.sequences_dir(),
            Collection::Layouts => env.layouts_dir(),
            Collection::Tools => env.tools_dir(),
            Collection::Crowds => env.crowds_dir(),
        }
    }
}
