//! FASTA reading using noodles.
//!
//! Files ending in `.gz` or `.bgz` are decompressed on the fly; anything else
//! is read as plain FASTA.

use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::GzDecoder;
use noodles::fasta;

use crate::core::sequence::Sequence;
use crate::parsing::ParseError;
use crate::utils::validation::check_record_limit;

/// Check if the path is a gzipped file
#[allow(clippy::case_sensitive_file_extension_comparisons)] // Already lowercased
fn is_gzipped(path: &Path) -> bool {
    let path_str = path.to_string_lossy().to_lowercase();
    path_str.ends_with(".gz") || path_str.ends_with(".bgz")
}

/// Read every record of a FASTA file.
///
/// The label is the record name, the comment is the description (if any).
/// An empty file yields an empty list.
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, `ParseError::Noodles` if
/// parsing fails, or `ParseError::TooManyRecords` if the limit is exceeded.
pub fn read_sequences(path: &Path) -> Result<Vec<Sequence>, ParseError> {
    let file = std::fs::File::open(path)?;
    if is_gzipped(path) {
        let mut reader = fasta::io::Reader::new(BufReader::new(GzDecoder::new(file)));
        read_records(&mut reader)
    } else {
        let mut reader = fasta::io::Reader::new(BufReader::new(file));
        read_records(&mut reader)
    }
}

/// Read from a noodles FASTA reader
fn read_records<R: BufRead>(reader: &mut fasta::io::Reader<R>) -> Result<Vec<Sequence>, ParseError> {
    let mut sequences = Vec::new();

    for result in reader.records() {
        let record = result
            .map_err(|e| ParseError::Noodles(format!("Failed to parse FASTA record: {e}")))?;

        // Check record limit for DOS protection
        if check_record_limit(sequences.len()).is_some() {
            return Err(ParseError::TooManyRecords(sequences.len()));
        }

        let name = String::from_utf8_lossy(record.name()).to_string();
        let comment = record
            .description()
            .map(|d| String::from_utf8_lossy(d).to_string())
            .unwrap_or_default();
        let residues = String::from_utf8_lossy(record.sequence().as_ref()).to_string();

        sequences.push(Sequence::new(name, comment, residues));
    }

    Ok(sequences)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_sequences() {
        let fasta_content = b">fig|1.1.peg.7 Phenylalanyl-tRNA synthetase\nMKVLA\nAGIV\n>fig|1.2.peg.3\nMSHL\n";

        let mut temp = NamedTempFile::with_suffix(".faa").unwrap();
        temp.write_all(fasta_content).unwrap();
        temp.flush().unwrap();

        let seqs = read_sequences(temp.path()).unwrap();
        assert_eq!(seqs.len(), 2);
        assert_eq!(seqs[0].label(), "fig|1.1.peg.7");
        assert_eq!(seqs[0].comment(), "Phenylalanyl-tRNA synthetase");
        assert_eq!(seqs[0].residues(), "MKVLAAGIV");
        assert_eq!(seqs[1].comment(), "");
        assert_eq!(seqs[1].residues(), "MSHL");
    }

    #[test]
    fn test_read_gzipped() {
        let temp = NamedTempFile::with_suffix(".fa.gz").unwrap();
        {
            let mut encoder = GzEncoder::new(temp.reopen().unwrap(), Compression::default());
            encoder.write_all(b">s1\nACGT\n").unwrap();
            encoder.finish().unwrap();
        }

        let seqs = read_sequences(temp.path()).unwrap();
        assert_eq!(seqs.len(), 1);
        assert_eq!(seqs[0].residues(), "ACGT");
    }

    #[test]
    fn test_empty_file() {
        let temp = NamedTempFile::with_suffix(".faa").unwrap();
        assert!(read_sequences(temp.path()).unwrap().is_empty());
    }
}
