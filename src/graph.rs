use std::collections::{HashMap, HashSet};
use std::fs::{create_dir_all, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter, Serializer};
use tracing::{debug, info, warn};

use crate::error::{GraphError, Result};
use crate::input::Publication;

pub const DEFAULT_TOP_COUNTRIES: usize = 10;
pub const OTHER_COUNTRY: &str = "Other";
pub const UNKNOWN_COUNTRY: &str = "Unknown";

const AUTHOR_SEPARATOR: &str = ", ";
const AFFILIATION_SEPARATOR: &str = "; ";
// The link pass splits on a bare comma; normalization trims the leftover space
const LINK_AUTHOR_SEPARATOR: char = ',';

const JSON_INDENT: &[u8] = b"    ";

pub fn normalize_author(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Country is whatever follows the last comma of the affiliation string.
pub fn extract_country(affiliation: &str) -> &str {
    match affiliation.rsplit_once(',') {
        Some((_, country)) => country.trim(),
        None => UNKNOWN_COUNTRY,
    }
}

/// How to pair a record's authors with its affiliations when the counts differ.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Pairing {
    /// Zip up to the shorter list and keep going.
    #[default]
    Truncate,
    Strict,
}

// ====== JSON FORMATTING ======
/// Pretty printer that escapes every non-ASCII character as `\uXXXX`
/// (UTF-16 units, surrogate pairs above the BMP), so names like "Müller"
/// come out as `M\u00fcller`.
struct AsciiPrettyFormatter<'a> {
    inner: PrettyFormatter<'a>,
}

impl<'a> AsciiPrettyFormatter<'a> {
    fn with_indent(indent: &'a [u8]) -> Self {
        Self {
            inner: PrettyFormatter::with_indent(indent),
        }
    }
}

impl Formatter for AsciiPrettyFormatter<'_> {
    fn begin_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_array(writer)
    }

    fn end_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.inner.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object(writer)
    }

    fn end_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.inner.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object_value(writer)
    }

    fn write_string_fragment<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut start = 0;
        for (i, c) in fragment.char_indices() {
            if c.is_ascii() {
                continue;
            }
            writer.write_all(fragment[start..i].as_bytes())?;
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units).iter() {
                write!(writer, "\\u{:04x}", unit)?;
            }
            start = i + c.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

// ====== OUTPUT DOCUMENT ======
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    pub name: String,
    pub country: String,
    pub affiliation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
}

impl Graph {
    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        let mut serializer =
            Serializer::with_formatter(writer, AsciiPrettyFormatter::with_indent(JSON_INDENT));
        self.serialize(&mut serializer)?;
        Ok(())
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_json(&mut buf)?;
        Ok(buf)
    }

    /// Writes the graph to `output_path`, creating its parent directory if needed.
    pub fn save(&self, output_path: &Path) -> Result<()> {
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                create_dir_all(parent)?;
            }
        }

        let mut writer = BufWriter::new(File::create(output_path)?);
        self.write_json(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

// ====== PROCESSING STATISTICS ======
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphStats {
    pub records_read: usize,
    pub records_with_affiliations: usize,
    pub mismatched_records: usize,
    pub author_affiliation_pairs: usize,
    pub distinct_countries: usize,
    pub top_countries: Vec<(String, usize)>,
    pub nodes: usize,
    pub links: usize,
}

// ====== ACCUMULATORS ======
#[derive(Debug)]
struct AuthorEntry {
    name: String,
    country: String,
    affiliation: String,
}

/// Author table keyed by normalized name, iterated in first-insertion order.
#[derive(Debug, Default)]
struct AuthorTable {
    entries: Vec<AuthorEntry>,
    index: HashMap<String, usize>,
}

impl AuthorTable {
    fn record(&mut self, name: String, country: &str, affiliation: &str) {
        match self.index.get(&name) {
            Some(&i) => {
                let entry = &mut self.entries[i];
                entry.country = country.to_string();
                entry.affiliation = affiliation.to_string();
            }
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push(AuthorEntry {
                    name,
                    country: country.to_string(),
                    affiliation: affiliation.to_string(),
                });
            }
        }
    }

    fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }
}

#[derive(Debug, Default)]
struct CountryCounter {
    counts: Vec<(String, usize)>,
    index: HashMap<String, usize>,
}

impl CountryCounter {
    fn increment(&mut self, country: &str) {
        match self.index.get(country) {
            Some(&i) => self.counts[i].1 += 1,
            None => {
                self.index.insert(country.to_string(), self.counts.len());
                self.counts.push((country.to_string(), 1));
            }
        }
    }

    /// Highest counts first; equal counts keep first-seen order.
    fn most_common(&self, n: usize) -> Vec<(String, usize)> {
        let mut ranked = self.counts.clone();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(n);
        ranked
    }

    fn len(&self) -> usize {
        self.counts.len()
    }
}

// ====== GRAPH BUILDER ======
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    top_countries: usize,
    pairing: Pairing,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self {
            top_countries: DEFAULT_TOP_COUNTRIES,
            pairing: Pairing::Truncate,
        }
    }
}

impl GraphBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    /// Countries outside the `n` most frequent are reported as "Other".
    pub fn top_countries(mut self, n: usize) -> Self {
        self.top_countries = n;
        self
    }

    pub fn pairing(mut self, pairing: Pairing) -> Self {
        self.pairing = pairing;
        self
    }

    pub fn build(&self, publications: &[Publication]) -> Result<(Graph, GraphStats)> {
        let mut stats = GraphStats {
            records_read: publications.len(),
            ..Default::default()
        };

        let mut authors = AuthorTable::default();
        let mut countries = CountryCounter::default();

        // First pass: author -> (country, affiliation), last record wins
        for (record, publication) in publications.iter().enumerate() {
            let (Some(author_list), Some(affiliation_list)) = (
                publication.authors.as_deref(),
                publication.authors_with_affiliations.as_deref(),
            ) else {
                continue;
            };
            stats.records_with_affiliations += 1;

            let names: Vec<&str> = author_list.split(AUTHOR_SEPARATOR).collect();
            let affiliations: Vec<&str> = affiliation_list.split(AFFILIATION_SEPARATOR).collect();

            if names.len() != affiliations.len() {
                if self.pairing == Pairing::Strict {
                    return Err(GraphError::MismatchedAffiliations {
                        record: record + 1,
                        authors: names.len(),
                        affiliations: affiliations.len(),
                    });
                }
                stats.mismatched_records += 1;
                warn!(
                    "Record {}: {} authors but {} affiliations, pairing the first {}",
                    record + 1,
                    names.len(),
                    affiliations.len(),
                    names.len().min(affiliations.len())
                );
            }

            for (name, affiliation) in names.iter().zip(&affiliations) {
                let country = extract_country(affiliation);
                authors.record(normalize_author(name), country, affiliation);
                countries.increment(country);
                stats.author_affiliation_pairs += 1;
            }
        }

        let top_countries = countries.most_common(self.top_countries);
        let top_set: HashSet<&str> = top_countries.iter().map(|(c, _)| c.as_str()).collect();
        debug!("Top countries: {:?}", top_countries);

        let nodes: Vec<Node> = authors
            .entries
            .iter()
            .map(|entry| Node {
                name: entry.name.clone(),
                country: if top_set.contains(entry.country.as_str()) {
                    entry.country.clone()
                } else {
                    OTHER_COUNTRY.to_string()
                },
                affiliation: entry.affiliation.clone(),
            })
            .collect();

        // Second pass: every record with authors, affiliations not required
        let mut links = Vec::new();
        for author_list in publications.iter().filter_map(|p| p.authors.as_deref()) {
            let names: Vec<String> = author_list
                .split(LINK_AUTHOR_SEPARATOR)
                .map(normalize_author)
                .collect();

            for (i, source) in names.iter().enumerate() {
                if !authors.contains(source) {
                    continue;
                }
                for target in &names[i + 1..] {
                    if authors.contains(target) {
                        links.push(Link {
                            source: source.clone(),
                            target: target.clone(),
                        });
                    }
                }
            }
        }

        stats.distinct_countries = countries.len();
        stats.top_countries = top_countries;
        stats.nodes = nodes.len();
        stats.links = links.len();

        info!(
            "Built graph with {} nodes and {} links from {} records",
            stats.nodes, stats.links, stats.records_read
        );

        Ok((Graph { nodes, links }, stats))
    }
}
