//! End-to-end tests of the `repgen` binary
//!
//! Each test writes a small provider dump and genome list into a temporary
//! directory and drives the CLI the way a pipeline would.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use repgen::utils::validation::content_hash;

/// Deterministic pseudo-random residues over `alphabet`
fn residues(seed: u64, len: usize, alphabet: &[u8]) -> String {
    let mut state = seed.wrapping_mul(2_862_933_555_777_941_757).wrapping_add(7);
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            alphabet[(state >> 33) as usize % alphabet.len()] as char
        })
        .collect()
}

fn protein(seed: u64) -> String {
    residues(seed, 300, b"ACDEFGHIKLMNPQRSTVWY")
}

fn dna(seed: u64, len: usize) -> String {
    residues(seed, len, b"ACGT")
}

struct Genome {
    id: &'static str,
    protein: String,
    ssu: Vec<String>,
}

/// Write a provider dump and a genome list; returns the genome list path
fn write_inputs(dir: &Path, genomes: &[Genome]) -> std::path::PathBuf {
    let dump = dir.join("dump");
    std::fs::create_dir_all(&dump).unwrap();

    let taxonomy = serde_json::json!([
        {"id": 2, "name": "Bacteria", "rank": "superkingdom"},
        {"id": 561, "name": "Escherichia", "rank": "genus"},
        {"id": 562, "name": "Escherichia coli", "rank": "species", "genetic_code": 11},
    ]);
    std::fs::write(dump.join("taxonomy.json"), taxonomy.to_string()).unwrap();

    let mut features = Vec::new();
    let mut fasta = String::new();
    let mut list = String::from("id\tname\tlineage\tscore\n");
    for (i, g) in genomes.iter().enumerate() {
        let gene = dna(1000 + i as u64, 900);
        fasta.push_str(&format!(">{}.cds\n{gene}\n>{}.prot\n{}\n", g.id, g.id, g.protein));
        features.push(serde_json::json!({
            "feature_id": format!("fig|{}.peg.1", g.id),
            "genome_id": g.id,
            "feature_type": "CDS",
            "product": "Phenylalanyl-tRNA synthetase alpha chain (EC 6.1.1.20)",
            "na_md5": content_hash(&gene),
            "aa_md5": content_hash(&g.protein),
            "na_length": gene.len(),
            "aa_length": g.protein.len(),
        }));
        for (j, ssu) in g.ssu.iter().enumerate() {
            fasta.push_str(&format!(">{}.rna.{j}\n{ssu}\n", g.id));
            features.push(serde_json::json!({
                "feature_id": format!("fig|{}.rna.{}", g.id, j + 1),
                "genome_id": g.id,
                "feature_type": "rRNA",
                "product": "SSU rRNA ## 16S rRNA, small subunit ribosomal RNA",
                "na_md5": content_hash(ssu),
                "na_length": ssu.len(),
            }));
        }
        list.push_str(&format!("{}\tGenome {}\t2;561;562\t{}\n", g.id, g.id, 100 - i));
    }
    std::fs::write(dump.join("features.json"), serde_json::Value::Array(features).to_string()).unwrap();
    std::fs::write(dump.join("sequences.fa"), fasta).unwrap();

    let path = dir.join("genomes.tsv");
    std::fs::write(&path, list).unwrap();
    path
}

fn three_genomes() -> Vec<Genome> {
    let ssu = dna(1, 1500);
    vec![
        Genome {
            id: "1.1",
            protein: protein(1),
            ssu: vec![ssu.clone(), ssu.clone()],
        },
        // Same marker protein as 1.1
        Genome {
            id: "1.2",
            protein: protein(1),
            ssu: vec![ssu.clone(), ssu.clone()],
        },
        Genome {
            id: "1.3",
            protein: protein(3),
            ssu: vec![ssu.clone(), ssu],
        },
    ]
}

fn repgen() -> Command {
    Command::cargo_bin("repgen").unwrap()
}

#[test]
fn test_curate_build_classify() {
    let dir = tempfile::tempdir().unwrap();
    let genomes = write_inputs(dir.path(), &three_genomes());
    let curated = dir.path().join("curated.json");
    let stats = dir.path().join("stats.tsv");

    repgen()
        .args(["curate", "--format", "tsv", "--provider"])
        .arg(dir.path().join("dump"))
        .arg(&genomes)
        .arg("--output")
        .arg(&curated)
        .arg("--stats")
        .arg(&stats)
        .assert()
        .success()
        .stdout(predicate::str::contains("1.1\tGenome 1.1\tnormal"))
        .stdout(predicate::str::contains("1.3"));
    assert!(std::fs::read_to_string(&stats).unwrap().contains("input-genomes\t3"));

    let reps = dir.path().join("reps");
    repgen()
        .args(["build", "-t", "10,100", "--format", "tsv", "--candidates"])
        .arg(&curated)
        .arg("-o")
        .arg(&reps)
        .assert()
        .success()
        .stdout(predicate::str::contains("10\t2\t2\t1"))
        .stdout(predicate::str::contains("100\t2\t2\t1"));
    assert!(reps.join("rep10.json").is_file());
    assert!(reps.join("rep100.json").is_file());

    repgen()
        .args(["sets", "list", "--format", "tsv"])
        .arg(&reps)
        .assert()
        .success()
        .stdout(predicate::str::contains("10\tPheS\t8\t2"));

    repgen()
        .args(["sets", "show", "--format", "tsv"])
        .arg(reps.join("rep100.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("1.1\tfig|1.1.peg.1"))
        .stdout(predicate::str::contains("1.2").not());

    let query = dir.path().join("query.faa");
    std::fs::write(&query, format!(">q1\n{}\n>q2\n{}\n", protein(3), protein(99))).unwrap();
    repgen()
        .args(["classify", "--format", "tsv", "--sets"])
        .arg(&reps)
        .arg(&query)
        .assert()
        .success()
        .stdout(predicate::str::contains("q1\t100\t1.3\t"))
        .stdout(predicate::str::contains("q2\t100\t"));
}

#[test]
fn test_build_from_fasta_with_seed() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.faa");
    std::fs::write(&first, format!(">a\n{}\n", protein(10))).unwrap();
    let second = dir.path().join("second.faa");
    std::fs::write(&second, format!(">b\n{}\n>c\n{}\n", protein(11), protein(10))).unwrap();

    let old = dir.path().join("old");
    repgen()
        .args(["build", "-t", "50", "--encoding", "bin", "--fasta"])
        .arg(&first)
        .arg("-o")
        .arg(&old)
        .assert()
        .success();
    assert!(old.join("rep50.bin").is_file());

    let new = dir.path().join("new");
    repgen()
        .args(["build", "-t", "50", "--format", "json", "--fasta"])
        .arg(&second)
        .arg("--seed")
        .arg(&old)
        .arg("-o")
        .arg(&new)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"representatives\": 2"));

    // "c" repeats the seeded protein of "a", so it is covered
    repgen()
        .args(["sets", "show", "--format", "tsv", "-t", "50"])
        .arg(&new)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("id\tfeature_id\tkmers\tname\na\t"))
        .stdout(predicate::str::contains("\nc\t").not());
}

#[test]
fn test_build_requires_input() {
    let dir = tempfile::tempdir().unwrap();
    repgen()
        .args(["build", "-o"])
        .arg(dir.path())
        .assert()
        .failure();
}

#[test]
fn test_curate_missing_genome_list() {
    let dir = tempfile::tempdir().unwrap();
    repgen()
        .args(["curate", "--provider"])
        .arg(dir.path())
        .arg(dir.path().join("missing.tsv"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("reading genome list"));
}

#[test]
fn test_classify_without_sets_fails() {
    let dir = tempfile::tempdir().unwrap();
    let query = dir.path().join("q.faa");
    std::fs::write(&query, ">q\nMKV\n").unwrap();
    repgen()
        .args(["classify", "--sets"])
        .arg(dir.path())
        .arg(&query)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no rep<threshold> artifacts"));
}
