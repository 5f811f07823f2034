//! Co-authorship network builder for bibliographic CSV exports.
//!
//! Reads the `Authors` and `Authors with affiliations` columns of one or more
//! export files and produces a `{nodes, links}` graph where each node is an
//! author (keyed by lowercased name) tagged with a country, and each link is
//! one co-authored record.

pub mod error;
pub mod graph;
pub mod input;

pub use error::{GraphError, Result};
pub use graph::{
    extract_country, normalize_author, Graph, GraphBuilder, GraphStats, Link, Node, Pairing,
    DEFAULT_TOP_COUNTRIES, OTHER_COUNTRY, UNKNOWN_COUNTRY,
};
pub use input::{find_input_files, parse_publications, read_publications, Publication};
