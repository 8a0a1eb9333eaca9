use camino::Utf8PathBuf;

use kira_efetch::domain::{Job, Mode};
use kira_efetch::store::{PersistTarget, Store};

fn temp_store() -> (tempfile::TempDir, Store) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    (temp, Store::new_with_root(root))
}

#[test]
fn aggregate_appends_in_arrival_order() {
    let (temp, store) = temp_store();
    let target = PersistTarget::for_job(&Job::new(Mode::Papers, "A".parse().unwrap())).unwrap();

    store.persist(&target, "A,1\n").unwrap();
    store.persist(&target, "B,2\n").unwrap();

    let content = std::fs::read_to_string(temp.path().join("papers.csv")).unwrap();
    assert_eq!(content, "A,1\nB,2\n");
}

#[test]
fn per_id_overwrites_previous_content() {
    let (temp, store) = temp_store();
    let job = Job::new(Mode::Genome, "NC_000001".parse().unwrap());
    let target = PersistTarget::for_job(&job).unwrap();

    store.persist(&target, ">old\nAAAA\n").unwrap();
    let path = store.persist(&target, ">new\nCC\n").unwrap();

    assert!(path.ends_with("NC_000001-genome.fasta"));
    let content = std::fs::read_to_string(temp.path().join("NC_000001-genome.fasta")).unwrap();
    assert_eq!(content, ">new\nCC\n");
}

#[test]
fn overwrite_leaves_only_the_record() {
    let (temp, store) = temp_store();
    let target = PersistTarget::for_job(&Job::new(Mode::Gff, "NC_7".parse().unwrap())).unwrap();

    for round in 0..3 {
        store.persist(&target, &format!("##gff-version 3\n#{round}\n")).unwrap();
    }

    let names = std::fs::read_dir(temp.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["NC_7-gff.gff"]);
    let content = std::fs::read_to_string(temp.path().join("NC_7-gff.gff")).unwrap();
    assert_eq!(content, "##gff-version 3\n#2\n");
}

#[test]
fn per_id_names_use_mode_extension() {
    let cases = [
        (Mode::Proteome, "NC_1-proteome.fasta"),
        (Mode::Orfeome, "NC_1-orfeome.fasta"),
        (Mode::Protein, "NC_1-protein.fasta"),
        (Mode::Genbank, "NC_1-genbank.fasta"),
        (Mode::Gff, "NC_1-gff.gff"),
    ];
    for (mode, expected) in cases {
        let target = PersistTarget::for_job(&Job::new(mode, "NC_1".parse().unwrap())).unwrap();
        assert_eq!(target.file_name().as_str(), expected);
    }
}

#[test]
fn missing_root_is_not_created() {
    let (temp, _) = temp_store();
    let root = Utf8PathBuf::from_path_buf(temp.path().join("absent")).unwrap();
    let store = Store::new_with_root(root);
    let target = PersistTarget::for_job(&Job::new(Mode::Genome, "X".parse().unwrap())).unwrap();

    assert!(store.persist(&target, ">X\n").is_err());
    assert!(!temp.path().join("absent").exists());
}
