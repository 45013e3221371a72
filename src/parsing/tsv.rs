use std::path::Path;

use crate::core::candidate::GenomeInput;
use crate::core::types::{GenomeId, QualityRating, TaxonId};
use crate::parsing::ParseError;
use crate::utils::validation::check_record_limit;

/// Parse a genome list file with columns: id, name, lineage, score, [flag]
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, or other parse errors
/// if the content is invalid.
pub fn parse_genome_list_file(path: &Path, delimiter: char) -> Result<Vec<GenomeInput>, ParseError> {
    let content = std::fs::read_to_string(path)?;
    parse_genome_list_text(&content, delimiter)
}

/// Parse genome list text with columns: id, name, lineage, score, [flag]
///
/// The lineage column holds taxon ids from root to leaf separated by `;` or
/// `,` (when `,` is not the delimiter). The optional flag is `reference` or
/// `representative`; anything else is ignored.
///
/// # Errors
///
/// Returns `ParseError::InvalidFormat` if lines have fewer than 4 fields or
/// contain invalid taxon ids or scores, or `ParseError::TooManyRecords` if
/// the limit is exceeded.
pub fn parse_genome_list_text(text: &str, delimiter: char) -> Result<Vec<GenomeInput>, ParseError> {
    let mut genomes = Vec::new();
    let mut first_data_line = true;

    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split(delimiter).map(str::trim).collect();

        if first_data_line {
            first_data_line = false;
            let first = fields.first().map(|s| s.to_lowercase()).unwrap_or_default();
            if first == "id" || first == "genome" || first == "genome_id" {
                continue;
            }
        }

        let line_num = i + 1;

        if fields.len() < 4 {
            return Err(ParseError::InvalidFormat(format!(
                "Line {line_num} has fewer than 4 fields"
            )));
        }

        let lineage = parse_lineage(fields[2], delimiter).map_err(|bad| {
            ParseError::InvalidFormat(format!("Invalid taxon id on line {line_num}: '{bad}'"))
        })?;

        let score: f64 = fields[3].parse().map_err(|_| {
            ParseError::InvalidFormat(format!(
                "Invalid score on line {}: '{}'",
                line_num, fields[3]
            ))
        })?;

        let flag = fields.get(4).and_then(|f| QualityRating::from_flag(f));

        if check_record_limit(genomes.len()).is_some() {
            return Err(ParseError::TooManyRecords(genomes.len()));
        }

        genomes.push(GenomeInput {
            id: GenomeId::new(fields[0]),
            name: fields[1].to_string(),
            lineage,
            score,
            flag,
        });
    }

    Ok(genomes)
}

fn parse_lineage(field: &str, delimiter: char) -> Result<Vec<TaxonId>, String> {
    field
        .split(|c: char| c == ';' || (c == ',' && delimiter != ','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<TaxonId>().map_err(|_| s.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_genome_list() {
        let tsv = "id\tname\tlineage\tscore\tflag
83333.1\tEscherichia coli K-12\t2;1224;561;562\t98.5\treference
1280.5\tStaphylococcus aureus\t2,1239,1279,1280\t91
";
        let genomes = parse_genome_list_text(tsv, '\t').unwrap();
        assert_eq!(genomes.len(), 2);
        assert_eq!(genomes[0].id, GenomeId::new("83333.1"));
        assert_eq!(genomes[0].lineage, vec![2, 1224, 561, 562]);
        assert_eq!(genomes[0].flag, Some(QualityRating::Reference));
        assert!((genomes[1].score - 91.0).abs() < f64::EPSILON);
        assert_eq!(genomes[1].lineage, vec![2, 1239, 1279, 1280]);
        assert!(genomes[1].flag.is_none());
    }

    #[test]
    fn test_parse_csv_lineage_semicolons() {
        let csv = "# comment\n1.1,One,2;561,50.0\n";
        let genomes = parse_genome_list_text(csv, ',').unwrap();
        assert_eq!(genomes.len(), 1);
        assert_eq!(genomes[0].lineage, vec![2, 561]);
    }

    #[test]
    fn test_parse_errors_name_line() {
        let err = parse_genome_list_text("1.1\tOne\t2;x\t50\n", '\t').unwrap_err();
        assert!(err.to_string().contains("line 1"));

        let err = parse_genome_list_text("id\tname\n1.1\tOne\n", '\t').unwrap_err();
        assert!(err.to_string().contains("Line 2"));

        let err = parse_genome_list_text("1.1\tOne\t2\thigh\n", '\t').unwrap_err();
        assert!(err.to_string().contains("Invalid score"));
    }

    #[test]
    fn test_empty_list() {
        assert!(parse_genome_list_text("# nothing\n", '\t').unwrap().is_empty());
    }
}
