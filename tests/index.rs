use colourdb::kmer::kmer::{encode_kmer, reverse_complement};
use colourdb::{
    BloomConfig, ColourError, ColourIndex, IndexConfig, KmerMode, KmerRef, StorageConfig,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const KMER: &str = "ACGTTGCATGTCGCATGATGCATGAGAGCTA";

fn config(storage: StorageConfig) -> IndexConfig {
    IndexConfig {
        storage,
        bloom: BloomConfig { num_bits: 1 << 20, num_hashes: 3 },
        ..IndexConfig::default()
    }
}

fn random_kmers(rng: &mut StdRng, n: usize, k: usize) -> Vec<String> {
    (0..n)
        .map(|_| (0..k).map(|_| b"ACGT"[rng.gen_range(0..4)] as char).collect())
        .collect()
}

fn refs(kmers: &[String]) -> Vec<KmerRef<'_>> {
    kmers.iter().map(|k| KmerRef::Seq(k.as_str())).collect()
}

#[test]
fn test_query_one_reports_registered_sample() {
    let index = ColourIndex::in_memory(config(StorageConfig::InMemory)).unwrap();
    assert_eq!(index.add_sample("A").unwrap(), 0);
    assert_eq!(index.add_sample("B").unwrap(), 1);
    assert!(matches!(
        index.add_sample("A"),
        Err(ColourError::AlreadyExists { .. })
    ));
    assert_eq!(index.num_colours().unwrap(), 2);

    index.insert_kmer(KMER.into(), 0, KmerMode::Canonical).unwrap();
    let result = index.query_kmer(KMER.into(), KmerMode::Canonical).unwrap();
    assert_eq!(result.len(), 1);
    assert!(result["A"]);
}

#[test]
fn test_packed_and_text_kmers_agree() {
    let index = ColourIndex::in_memory(config(StorageConfig::InMemory)).unwrap();
    let a = index.add_sample("A").unwrap();
    let rc = reverse_complement(KMER);
    let packed = encode_kmer(&rc).unwrap();
    index.insert_kmer(KmerRef::Packed(packed), a, KmerMode::Canonical).unwrap();

    let colours = index.get_kmer_colours(KMER.into(), KmerMode::Canonical).unwrap();
    assert!(colours.contains(&a));
}

#[test]
fn test_query_many_thresholds() {
    let mut rng = StdRng::seed_from_u64(7);
    let index = ColourIndex::in_memory(config(StorageConfig::InMemory)).unwrap();
    let a = index.add_sample("A").unwrap();
    let b = index.add_sample("B").unwrap();

    let kmers = random_kmers(&mut rng, 40, 31);
    let kmer_refs = refs(&kmers);
    index.insert_kmers(&kmer_refs, a, KmerMode::Canonical).unwrap();
    index.insert_kmers(&kmer_refs[..10], b, KmerMode::Canonical).unwrap();

    let full = index.query_kmers(&kmer_refs, 1.0, KmerMode::Canonical).unwrap();
    assert_eq!(full["A"], 1.0);
    assert!(!full.contains_key("B"));

    let all = index.query_kmers(&kmer_refs, 0.0, KmerMode::Canonical).unwrap();
    assert_eq!(all["A"], 1.0);
    assert!(all["B"] >= 0.25);

    assert!(matches!(
        index.query_kmers(&kmer_refs, 1.1, KmerMode::Canonical),
        Err(ColourError::InvalidThreshold(_))
    ));
    assert!(index.query_kmers(&[], 0.5, KmerMode::Canonical).unwrap().is_empty());
}

#[test]
fn test_batch_colours_are_aligned_with_input() {
    let index = ColourIndex::in_memory(config(StorageConfig::InMemory)).unwrap();
    let a = index.add_sample("A").unwrap();
    index.insert_kmer(KMER.into(), a, KmerMode::Canonical).unwrap();

    let absent = "TTTTTTTTTTTTTTTTTTTTTTTTTTTTTTT";
    let batch: [KmerRef<'_>; 3] = [KMER.into(), absent.into(), KMER.into()];
    let colours = index.get_kmers_colours(&batch, KmerMode::Canonical).unwrap();
    assert_eq!(colours.len(), 3);
    assert!(colours[0].contains(&a));
    assert_eq!(colours[0], colours[2]);
}

#[test]
fn test_invalid_kmers_are_rejected() {
    let index = ColourIndex::in_memory(config(StorageConfig::InMemory)).unwrap();
    let a = index.add_sample("A").unwrap();
    assert!(matches!(
        index.insert_kmer("ACGT".into(), a, KmerMode::Canonical),
        Err(ColourError::InvalidKmer { .. })
    ));
    assert!(matches!(
        index.insert_kmer("ACGTTGCATGTCGCATGATGCATGAGAGCTN".into(), a, KmerMode::Canonical),
        Err(ColourError::InvalidKmer { .. })
    ));
}

fn check_secondary_diffs(storage: StorageConfig) {
    let mut rng = StdRng::seed_from_u64(11);
    let index = ColourIndex::in_memory(config(storage)).unwrap();
    let primary = index.add_sample("primary").unwrap();
    let secondary = index.add_sample("secondary").unwrap();

    let shared = random_kmers(&mut rng, 50, 31);
    let novel = random_kmers(&mut rng, 20, 31);
    index.insert_kmers(&refs(&shared), primary, KmerMode::AsGiven).unwrap();

    // Interleave shared and novel k-mers; the diff must keep input order.
    let mut batch = Vec::new();
    for (i, kmer) in novel.iter().enumerate() {
        batch.push(shared[i].clone());
        batch.push(kmer.clone());
    }
    let diffs = index
        .diff_against_primary(&refs(&batch), primary, KmerMode::AsGiven)
        .unwrap();
    let shared_codes: Vec<u64> = shared.iter().map(|k| encode_kmer(k).unwrap()).collect();
    assert!(diffs.iter().all(|code| !shared_codes.contains(code)));
    let expected: Vec<u64> = novel
        .iter()
        .map(|k| encode_kmer(k).unwrap())
        .filter(|code| diffs.contains(code))
        .collect();
    assert_eq!(diffs, expected);

    let stored = index
        .insert_secondary_kmers(&refs(&batch), primary, secondary, KmerMode::AsGiven)
        .unwrap();
    assert_eq!(stored, diffs.len());
    if stored > 0 {
        let first = index.lookup_primary_secondary_diff(primary, 0).unwrap();
        assert_eq!(encode_kmer(&first), Some(diffs[0]));
    }
    assert!(matches!(
        index.lookup_primary_secondary_diff(primary, stored),
        Err(ColourError::DiffNotFound { .. })
    ));
}

#[test]
fn test_secondary_diffs_in_memory() {
    check_secondary_diffs(StorageConfig::InMemory);
}

#[test]
fn test_secondary_diffs_sharded() {
    check_secondary_diffs(StorageConfig::Sharded { shards: 4 });
}

#[test]
fn test_sharded_set_algebra_matches_in_memory() {
    let mut rng = StdRng::seed_from_u64(3);
    let a_kmers = random_kmers(&mut rng, 2000, 31);
    let mut b_kmers = a_kmers[..1000].to_vec();
    b_kmers.extend(random_kmers(&mut rng, 1000, 31));

    for storage in [StorageConfig::InMemory, StorageConfig::Sharded { shards: 3 }] {
        let index = ColourIndex::in_memory(config(storage)).unwrap();
        let a = index.add_sample("A").unwrap();
        let b = index.add_sample("B").unwrap();
        index.insert_kmers(&refs(&a_kmers), a, KmerMode::Canonical).unwrap();
        index.insert_kmers(&refs(&b_kmers), b, KmerMode::Canonical).unwrap();

        let count_a = index.count_kmers("A").unwrap() as f64;
        assert!((count_a - 2000.0).abs() < 100.0, "count_a = {}", count_a);
        let union = index.kmer_union("A", "B").unwrap() as f64;
        assert!((union - 3000.0).abs() < 150.0, "union = {}", union);
        let jaccard = index.jaccard_index("A", "B").unwrap();
        assert!((jaccard - 1.0 / 3.0).abs() < 0.1, "jaccard = {}", jaccard);
        let distance = index.jaccard_distance("A", "B").unwrap();
        assert!((jaccard + distance - 1.0).abs() < 1e-9);

        assert!(matches!(
            index.jaccard_index("A", "C"),
            Err(ColourError::SampleNotFound { .. })
        ));
    }
}

#[test]
fn test_empty_samples_have_undefined_jaccard() {
    let index = ColourIndex::in_memory(config(StorageConfig::InMemory)).unwrap();
    index.add_sample("A").unwrap();
    index.add_sample("B").unwrap();
    assert_eq!(index.kmer_union("A", "B").unwrap(), 0);
    assert_eq!(index.kmer_intersection("A", "B").unwrap(), 0);
    assert!(matches!(
        index.jaccard_distance("A", "B"),
        Err(ColourError::UndefinedMetric { .. })
    ));
    let metrics = index.compare("A", "B").unwrap();
    assert_eq!(metrics.jaccard_index, None);
}

#[test]
fn test_query_sequence_uses_every_window() {
    let index = ColourIndex::in_memory(config(StorageConfig::InMemory)).unwrap();
    let a = index.add_sample("A").unwrap();
    let sequence = format!("{}GATTACA", KMER);
    let inserted = index.insert_sequence(&sequence, a, KmerMode::Canonical).unwrap();
    assert_eq!(inserted, 8);

    let result = index.query_sequence(&sequence, 1.0, KmerMode::Canonical).unwrap();
    assert_eq!(result["A"], 1.0);
}

fn check_dump_restore(storage: StorageConfig, file_name: &str) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(file_name);

    let index = ColourIndex::in_memory(config(storage.clone())).unwrap();
    let a = index.add_sample("A").unwrap();
    let b = index.add_sample("B").unwrap();
    index.insert_kmer(KMER.into(), a, KmerMode::Canonical).unwrap();
    index
        .insert_primary_secondary_diffs(a, b, &[encode_kmer(KMER).unwrap()])
        .unwrap();
    index.dump(&path).unwrap();

    let restored = ColourIndex::restore(config(storage), &path).unwrap();
    assert_eq!(restored.colours_to_samples().unwrap(), index.colours_to_samples().unwrap());
    assert_eq!(restored.bitcount().unwrap(), index.bitcount().unwrap());
    assert_eq!(restored.lookup_primary_secondary_diff(a, 0).unwrap(), KMER);
    let result = restored.query_kmer(KMER.into(), KmerMode::Canonical).unwrap();
    assert!(result["A"]);
    assert_eq!(restored.add_sample("C").unwrap(), 2);
}

#[test]
fn test_dump_restore_plain() {
    check_dump_restore(StorageConfig::InMemory, "index.json");
}

#[test]
fn test_dump_restore_gzip_sharded() {
    check_dump_restore(StorageConfig::Sharded { shards: 2 }, "index.json.gz");
}

#[test]
fn test_restore_with_other_kmer_size_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.json");
    let index = ColourIndex::in_memory(config(StorageConfig::InMemory)).unwrap();
    index.dump(&path).unwrap();

    let other = IndexConfig { kmer_size: 21, ..config(StorageConfig::InMemory) };
    assert!(matches!(
        ColourIndex::restore(other, &path),
        Err(ColourError::Config { .. })
    ));
}

#[test]
fn test_maintenance_operations() {
    let index = ColourIndex::in_memory(config(StorageConfig::Sharded { shards: 2 })).unwrap();
    let a = index.add_sample("A").unwrap();
    index.insert_kmer(KMER.into(), a, KmerMode::Canonical).unwrap();
    assert!(index.bitcount().unwrap() > 0);
    assert!(index.count_keys().unwrap() >= 1);
    assert!(index.calculate_memory().unwrap() > 0);

    index.delete_all().unwrap();
    assert_eq!(index.bitcount().unwrap(), 0);
    assert!(index.colours_to_samples().unwrap().is_empty());
    assert!(index.query_kmer(KMER.into(), KmerMode::Canonical).unwrap().is_empty());
}
