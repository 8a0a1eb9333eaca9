use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::KiraError;

/// Placeholder substituted with the record id in efetch arguments.
pub const ID_PLACEHOLDER: &str = "{id}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Genome,
    Proteome,
    Orfeome,
    Protein,
    Genbank,
    Gff,
    Papers,
    Search,
}

/// How a downloadable mode invokes efetch and where its output lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeSpec {
    pub args: &'static [&'static str],
    pub extension: &'static str,
    pub aggregate: bool,
    pub description: &'static str,
}

const GENOME: ModeSpec = ModeSpec {
    args: &["-db", "nuccore", "-id", ID_PLACEHOLDER, "-format", "fasta"],
    extension: "fasta",
    aggregate: false,
    description: "nucleotide accession -> genome FASTA",
};

const PROTEOME: ModeSpec = ModeSpec {
    args: &["-db", "nuccore", "-id", ID_PLACEHOLDER, "-format", "fasta_cds_aa"],
    extension: "fasta",
    aggregate: false,
    description: "nucleotide accession -> translated CDS FASTA",
};

const ORFEOME: ModeSpec = ModeSpec {
    args: &["-db", "nuccore", "-id", ID_PLACEHOLDER, "-format", "fasta_cds_na"],
    extension: "fasta",
    aggregate: false,
    description: "nucleotide accession -> CDS nucleotide FASTA",
};

const PROTEIN: ModeSpec = ModeSpec {
    args: &["-db", "protein", "-id", ID_PLACEHOLDER, "-format", "fasta_cds_aa"],
    extension: "fasta",
    aggregate: false,
    description: "protein accession -> protein FASTA",
};

const GENBANK: ModeSpec = ModeSpec {
    args: &["-db", "nuccore", "-id", ID_PLACEHOLDER, "-format", "gb"],
    extension: "fasta",
    aggregate: false,
    description: "nucleotide accession -> GenBank flat file",
};

const GFF: ModeSpec = ModeSpec {
    args: &["-db", "nuccore", "-id", ID_PLACEHOLDER, "-format", "gff3"],
    extension: "gff",
    aggregate: false,
    description: "nucleotide accession -> GFF3 annotation",
};

const PAPERS: ModeSpec = ModeSpec {
    args: &["-db", "nuccore", "-id", ID_PLACEHOLDER, "-format", "gb"],
    extension: "csv",
    aggregate: true,
    description: "nucleotide accession -> id,pubmed_id rows in papers.csv",
};

impl Mode {
    pub const ALL: [Mode; 8] = [
        Mode::Genome,
        Mode::Proteome,
        Mode::Orfeome,
        Mode::Protein,
        Mode::Genbank,
        Mode::Gff,
        Mode::Papers,
        Mode::Search,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Genome => "genome",
            Mode::Proteome => "proteome",
            Mode::Orfeome => "orfeome",
            Mode::Protein => "protein",
            Mode::Genbank => "genbank",
            Mode::Gff => "gff",
            Mode::Papers => "papers",
            Mode::Search => "search",
        }
    }

    /// Command table lookup. `None` only for [`Mode::Search`], which never
    /// goes through efetch.
    pub fn spec(self) -> Option<&'static ModeSpec> {
        match self {
            Mode::Genome => Some(&GENOME),
            Mode::Proteome => Some(&PROTEOME),
            Mode::Orfeome => Some(&ORFEOME),
            Mode::Protein => Some(&PROTEIN),
            Mode::Genbank => Some(&GENBANK),
            Mode::Gff => Some(&GFF),
            Mode::Papers => Some(&PAPERS),
            Mode::Search => None,
        }
    }

    pub fn require_spec(self) -> Result<&'static ModeSpec, KiraError> {
        self.spec()
            .ok_or_else(|| KiraError::NotDownloadable(self.as_str().to_string()))
    }

    pub fn description(self) -> &'static str {
        match self.spec() {
            Some(spec) => spec.description,
            None => "search terms -> NCBI nuccore search in the browser",
        }
    }
}

/// Mode to run for a command line, or `None` when usage help should be
/// printed instead: no mode, an unknown mode, or nothing after the mode.
pub fn invoked_mode(mode: Option<&str>, ids: &[String]) -> Option<Mode> {
    if ids.is_empty() {
        return None;
    }
    mode.and_then(|value| value.parse().ok())
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == value)
            .ok_or_else(|| KiraError::UnknownMode(value.to_string()))
    }
}

/// Accession number or free-text term handed verbatim to efetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id can be used as a file name without leaving the
    /// output directory.
    pub fn is_file_safe(&self) -> bool {
        !self.0.contains(['/', '\\']) && self.0 != "." && self.0 != ".."
    }

    pub fn require_file_safe(&self) -> Result<(), KiraError> {
        if !self.is_file_safe() {
            return Err(KiraError::InvalidId(self.0.clone()));
        }
        Ok(())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.trim().is_empty() {
            return Err(KiraError::InvalidId(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub mode: Mode,
    pub id: RecordId,
}

impl Job {
    pub fn new(mode: Mode, id: RecordId) -> Self {
        Self { mode, id }
    }

    /// Builds one job per id, rejecting the whole batch before anything is
    /// spawned if the mode is not downloadable or any id is invalid. Ids only
    /// need to be file-safe in per-ID modes.
    pub fn batch<I, S>(mode: Mode, ids: I) -> Result<Vec<Job>, KiraError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let spec = mode.require_spec()?;
        ids.into_iter()
            .map(|id| {
                let id: RecordId = id.as_ref().parse()?;
                if !spec.aggregate {
                    id.require_file_safe()?;
                }
                Ok(Job::new(mode, id))
            })
            .collect::<Result<Vec<_>, KiraError>>()
    }

    pub fn spec(&self) -> Result<&'static ModeSpec, KiraError> {
        self.mode.require_spec()
    }

    /// efetch arguments with the id substituted in.
    pub fn command_args(&self) -> Result<Vec<String>, KiraError> {
        Ok(self
            .spec()?
            .args
            .iter()
            .map(|arg| arg.replace(ID_PLACEHOLDER, self.id.as_str()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn every_download_mode_has_a_template_and_extension() {
        for mode in Mode::ALL {
            match mode.spec() {
                Some(spec) => {
                    assert!(spec.args.contains(&ID_PLACEHOLDER), "{mode}");
                    assert!(!spec.extension.is_empty(), "{mode}");
                }
                None => assert_eq!(mode, Mode::Search),
            }
        }
    }

    #[test]
    fn only_papers_aggregates() {
        let aggregated = Mode::ALL
            .into_iter()
            .filter(|mode| mode.spec().map(|spec| spec.aggregate).unwrap_or(false))
            .collect::<Vec<_>>();
        assert_eq!(aggregated, vec![Mode::Papers]);
    }

    #[test]
    fn parse_mode_roundtrips_names() {
        for mode in Mode::ALL {
            assert_eq!(mode.as_str().parse::<Mode>().unwrap(), mode);
        }
        assert_matches!("fasta".parse::<Mode>(), Err(KiraError::UnknownMode(_)));
    }

    #[test]
    fn command_args_substitute_id() {
        let job = Job::new(Mode::Gff, "NC_000913.3".parse().unwrap());
        assert_eq!(
            job.command_args().unwrap(),
            vec!["-db", "nuccore", "-id", "NC_000913.3", "-format", "gff3"]
        );
    }

    #[test]
    fn record_id_rejects_blank() {
        assert_matches!("".parse::<RecordId>(), Err(KiraError::InvalidId(_)));
        assert_matches!("  ".parse::<RecordId>(), Err(KiraError::InvalidId(_)));
        assert!("NC_000001.11".parse::<RecordId>().is_ok());
    }

    #[test]
    fn file_safety_rejects_path_escapes() {
        for value in ["../etc", "a/b", "a\\b", ".", ".."] {
            let id: RecordId = value.parse().unwrap();
            assert!(!id.is_file_safe(), "{value}");
        }
        assert!("NC_000001.11".parse::<RecordId>().unwrap().is_file_safe());
    }

    #[test]
    fn batch_rejects_search() {
        let err = Job::batch(Mode::Search, ["Escherichia"]).unwrap_err();
        assert_matches!(err, KiraError::NotDownloadable(_));
    }
}
