use crate::body::{BodyKind, Relation};
use crate::element::DEFAULT_NAME;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Stagehand - production asset records and versioning
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Optional log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Project root (default: $STAGEHAND_PROJECT_DIR)
    #[arg(long, value_name = "DIRECTORY", global = true)]
    pub project_dir: Option<PathBuf>,

    /// Acting user (default: $STAGEHAND_USER, then the login name)
    #[arg(long, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Identifies one element of one body
#[derive(Args, Debug, Clone)]
pub struct ElementTarget {
    /// Body type (asset, shot, sequence, set, tool, crowd)
    #[arg(value_name = "TYPE")]
    pub kind: BodyKind,

    /// Body name
    #[arg(value_name = "BODY")]
    pub body: String,

    /// Department (geo, rig, animation, ...)
    #[arg(value_name = "DEPARTMENT")]
    pub department: String,

    /// Element name
    #[arg(long, default_value = DEFAULT_NAME)]
    pub name: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the project directory layout
    Init,

    /// Provision a new body
    Create {
        #[arg(value_name = "TYPE")]
        kind: BodyKind,

        #[arg(value_name = "NAME")]
        name: String,

        /// Free text description
        #[arg(long, short)]
        description: Option<String>,

        /// Duration hint in frames
        #[arg(long)]
        frame_range: Option<i64>,
    },

    /// List bodies of a type, optionally filtered by a record field
    ///
    /// Example: `stagehand list shot --attr frame_range --op '>' --value 100`
    List {
        #[arg(value_name = "TYPE")]
        kind: BodyKind,

        /// Record field to filter on
        #[arg(long, requires_all = ["op", "value"])]
        attr: Option<String>,

        /// Relation (==, !=, <, <=, >, >=, contains)
        #[arg(long)]
        op: Option<Relation>,

        /// Value to compare against (integers and booleans are detected)
        #[arg(long)]
        value: Option<String>,
    },

    /// Show a body's record and elements
    Show {
        #[arg(value_name = "TYPE")]
        kind: BodyKind,

        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Show an element's record and publish history
    Element {
        #[command(flatten)]
        target: ElementTarget,

        /// Create the element if it does not exist
        #[arg(long)]
        create: bool,
    },

    /// Publish a file as the next version of an element
    Publish {
        #[command(flatten)]
        target: ElementTarget,

        /// File to publish (moved into the element unless already there)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Description of the changes
        #[arg(long, short = 'm', default_value = "")]
        comment: String,
    },

    /// Copy an element's current file into the user's work area
    Checkout {
        #[command(flatten)]
        target: ElementTarget,
    },

    /// Replace an element's cache
    Cache {
        #[command(flatten)]
        target: ElementTarget,

        /// Cache file or directory
        #[arg(value_name = "SOURCE")]
        source: PathBuf,

        /// Link to the source instead of copying it
        #[arg(long)]
        reference: bool,
    },

    /// Assign an element to a user
    Assign {
        #[command(flatten)]
        target: ElementTarget,

        /// User to assign
        #[arg(value_name = "USERNAME")]
        assignee: String,
    },

    /// Add a production note or schedule dates to an element
    Note {
        #[command(flatten)]
        target: ElementTarget,

        /// Note text
        #[arg(value_name = "TEXT")]
        text: Option<String>,

        /// Scheduled start date
        #[arg(long)]
        start: Option<String>,

        /// Scheduled end date
        #[arg(long)]
        end: Option<String>,
    },

    /// Manage references between bodies
    Reference {
        #[command(subcommand)]
        action: ReferenceAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ReferenceAction {
    /// Add a reference to an asset, shot or crowd body
    Add {
        #[arg(value_name = "TYPE")]
        kind: BodyKind,

        #[arg(value_name = "BODY")]
        body: String,

        /// Name of the referenced body
        #[arg(value_name = "REFERENCE")]
        reference: String,
    },

    /// Remove a reference
    Remove {
        #[arg(value_name = "TYPE")]
        kind: BodyKind,

        #[arg(value_name = "BODY")]
        body: String,

        #[arg(value_name = "REFERENCE")]
        reference: String,
    },

    /// List a body's references
    List {
        #[arg(value_name = "TYPE")]
        kind: BodyKind,

        #[arg(value_name = "BODY")]
        body: String,
    },
}

/// Interpret a command-line value as a record value
pub fn parse_value(raw: &str) -> toml::Value {
    if let Ok(i) = raw.parse::<i64>() {
        toml::Value::Integer(i)
    } else if let Ok(f) = raw.parse::<f64>() {
        toml::Value::Float(f)
    } else if let Ok(b) = raw.parse::<bool>() {
        toml::Value::Boolean(b)
    } else {
        toml::Value::String(raw.to_string())
    }
}
