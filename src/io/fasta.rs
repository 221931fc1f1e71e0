// src/io/fasta.rs
use std::fs::File;
use std::io::{BufRead, BufReader, Result};
use std::path::Path;
use flate2::read::MultiGzDecoder;

fn is_gzipped(path: &Path) -> bool {
    path.extension().map(|ext| ext == "gz").unwrap_or(false)
}

/// Open a FASTA file for reading, handles gzipped files automatically
pub fn open_fasta(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    if is_gzipped(path) {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// A FASTA record with its sequence lines joined
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    pub id: String,
    pub sequence: String,
}

/// Parse every record from a FASTA reader. Lines before the first header are ignored.
pub fn read_records<R: BufRead>(reader: R) -> Result<Vec<FastaRecord>> {
    let mut records = Vec::new();
    let mut current: Option<FastaRecord> = None;

    for line in reader.lines() {
        let line = line?;
        let line = line.trim_end();
        if let Some(header) = line.strip_prefix('>') {
            records.extend(current.take());
            let id = header.split_whitespace().next().unwrap_or("").to_string();
            current = Some(FastaRecord { id, sequence: String::new() });
        } else if let Some(record) = current.as_mut() {
            record.sequence.push_str(line.trim());
        }
    }
    records.extend(current);

    Ok(records)
}

pub fn read_fasta(path: &Path) -> Result<Vec<FastaRecord>> {
    read_records(open_fasta(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::{Cursor, Write};

    #[test]
    fn test_read_records_joins_lines() {
        let input = ">seq1 description\nACGT\nTTGA\n>seq2\nGGCC\n";
        let records = read_records(Cursor::new(input)).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "seq1");
        assert_eq!(records[0].sequence, "ACGTTTGA");
        assert_eq!(records[1].sequence, "GGCC");
    }

    #[test]
    fn test_read_gzipped_fasta() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reads.fa.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        writeln!(encoder, ">r1\nACGTACGT").unwrap();
        encoder.finish().unwrap();

        let records = read_fasta(&path).unwrap();
        assert_eq!(records, vec![FastaRecord { id: "r1".into(), sequence: "ACGTACGT".into() }]);
    }
}
