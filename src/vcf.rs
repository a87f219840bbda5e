//! VCF file processing functionality

use crate::{VariantRecord, VarepError, VarepResult};
use flate2::read::MultiGzDecoder;
use std::collections::{HashMap, VecDeque};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Number of tab-delimited columns a data line must carry: chromosome,
/// position, identifier, reference, alternates, quality, filter, info,
/// format, sample.
pub const VCF_COLUMN_COUNT: usize = 10;

/// INFO key holding the total read coverage at the position.
pub const DEPTH_KEY: &str = "TC";

/// Parse an INFO field of semicolon-separated `key=value` tokens.
///
/// Tokens without `=` are ignored.
pub fn parse_info_field(info: &str) -> HashMap<String, String> {
    info.split(';')
        .filter_map(|token| token.split_once('='))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// Parse one data line into one record per alternate allele.
///
/// The per-allele read counts come from the last colon-delimited token of
/// the sample column, split on commas and aligned positionally with the
/// alternates list. An alternate without a matching count gets 0 reads.
pub fn parse_variant_line(line: &str) -> VarepResult<Vec<VariantRecord>> {
    let fields: Vec<&str> = line.split('\t').collect();

    if fields.len() != VCF_COLUMN_COUNT {
        return Err(VarepError::InvalidVariant(format!(
            "expected {} tab-delimited columns, found {}: {}",
            VCF_COLUMN_COUNT,
            fields.len(),
            line
        )));
    }

    let chrom = fields[0];
    let pos = fields[1]
        .parse::<u32>()
        .map_err(|_| VarepError::InvalidVariant(format!("Invalid position: {}", fields[1])))?;
    let ref_allele = fields[3];
    let alts = fields[4];
    let info = fields[7];
    let sample_info = fields[9];

    let info_data = parse_info_field(info);
    let depth = info_data
        .get(DEPTH_KEY)
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(0);

    let count_tokens: Vec<&str> = sample_info
        .rsplit(':')
        .next()
        .unwrap_or(sample_info)
        .split(',')
        .collect();

    let mut records = Vec::new();
    for (alt_idx, alt) in alts.split(',').enumerate() {
        let alt_reads = match count_tokens.get(alt_idx) {
            Some(token) => token.parse::<u32>().map_err(|_| {
                VarepError::InvalidVariant(format!("Invalid allele read count: {}", token))
            })?,
            None => 0,
        };

        records.push(VariantRecord::new(
            chrom.to_string(),
            pos,
            ref_allele.to_string(),
            alt.to_string(),
            depth,
            alt_reads,
        ));
    }

    Ok(records)
}

/// VCF file reader that handles both compressed and uncompressed files
pub struct VcfReader {
    reader: Box<dyn BufRead>,
}

impl VcfReader {
    pub fn new<P: AsRef<Path>>(path: P) -> VarepResult<Self> {
        let file = File::open(&path)
            .map_err(|_| VarepError::FileNotFound(path.as_ref().to_string_lossy().to_string()))?;

        let reader: Box<dyn BufRead> = if crate::utils::is_gzipped(&path)? {
            let gz_decoder = MultiGzDecoder::new(file);
            Box::new(BufReader::new(gz_decoder))
        } else {
            Box::new(BufReader::new(file))
        };

        Ok(VcfReader { reader })
    }

    pub fn records(&mut self) -> VariantRecordIterator {
        VariantRecordIterator {
            reader: &mut self.reader,
            pending: VecDeque::new(),
        }
    }
}

/// Iterator over expanded variant records, one per alternate allele
pub struct VariantRecordIterator<'a> {
    reader: &'a mut Box<dyn BufRead>,
    pending: VecDeque<VariantRecord>,
}

impl<'a> Iterator for VariantRecordIterator<'a> {
    type Item = VarepResult<VariantRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(record) = self.pending.pop_front() {
            return Some(Ok(record));
        }

        let mut line = String::new();

        loop {
            line.clear();
            match self.reader.read_line(&mut line) {
                Ok(0) => return None, // EOF
                Ok(_) => {
                    let line = line.trim_end();
                    if line.starts_with('#') {
                        continue; // Skip header lines
                    }
                    if line.is_empty() {
                        continue; // Skip empty lines
                    }

                    match parse_variant_line(line) {
                        Ok(records) => {
                            self.pending.extend(records);
                            if let Some(record) = self.pending.pop_front() {
                                return Some(Ok(record));
                            }
                        }
                        Err(e) => return Some(Err(e)),
                    }
                }
                Err(e) => return Some(Err(VarepError::Io(e))),
            }
        }
    }
}

/// Read all variant records from a file.
///
/// The first malformed line aborts the read; there is no per-line recovery.
pub fn read_variant_records<P: AsRef<Path>>(path: P) -> VarepResult<Vec<VariantRecord>> {
    let mut reader = VcfReader::new(path)?;

    let mut records = Vec::new();
    for record in reader.records() {
        records.push(record?);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_info_field() {
        let info = parse_info_field("TC=100;AB=0.5;SOMATIC");
        assert_eq!(info.get("TC"), Some(&"100".to_string()));
        assert_eq!(info.get("AB"), Some(&"0.5".to_string()));
        assert_eq!(info.get("SOMATIC"), None);
    }

    #[test]
    fn test_parse_variant_line_single_alt() {
        let line = "chr1\t100\t.\tA\tT\t.\tPASS\tTC=10\tGT:AD\t0/1:3";
        let records = parse_variant_line(line).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].chrom, "chr1");
        assert_eq!(records[0].pos, 100);
        assert_eq!(records[0].ref_allele, "A");
        assert_eq!(records[0].alt_allele, "T");
        assert_eq!(records[0].depth, 10);
        assert_eq!(records[0].alt_reads, 3);
        assert_eq!(records[0].percent_alt_reads, 30.0);
        assert_eq!(records[0].percent_ref_reads, 70.0);
    }

    #[test]
    fn test_parse_variant_line_multi_alt() {
        let line = "chr1\t100\t.\tG\tA,T\t.\tPASS\tTC=10\tGT:AD\t1/2:3,7";
        let records = parse_variant_line(line).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].alt_allele, "A");
        assert_eq!(records[0].alt_reads, 3);
        assert_eq!(records[0].percent_alt_reads, 30.0);
        assert_eq!(records[0].percent_ref_reads, 70.0);
        assert_eq!(records[1].alt_allele, "T");
        assert_eq!(records[1].alt_reads, 7);
        assert_eq!(records[1].percent_alt_reads, 70.0);
        assert_eq!(records[1].percent_ref_reads, 30.0);
    }

    #[test]
    fn test_parse_variant_line_zero_depth() {
        let line = "chr1\t100\t.\tA\tT\t.\tPASS\tAB=0.5\tGT:AD\t0/1:3";
        let records = parse_variant_line(line).unwrap();

        assert_eq!(records[0].depth, 0);
        assert_eq!(records[0].percent_alt_reads, 0.0);
        assert_eq!(records[0].percent_ref_reads, 0.0);
    }

    #[test]
    fn test_parse_variant_line_malformed_depth_defaults_to_zero() {
        let line = "chr1\t100\t.\tA\tT\t.\tPASS\tTC=high\tGT:AD\t0/1:3";
        let records = parse_variant_line(line).unwrap();

        assert_eq!(records[0].depth, 0);
        assert_eq!(records[0].percent_alt_reads, 0.0);
    }

    #[test]
    fn test_parse_variant_line_more_alts_than_counts() {
        let line = "chr1\t100\t.\tG\tA,T,C\t.\tPASS\tTC=10\tGT:AD\t1/2:3,7";
        let records = parse_variant_line(line).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[2].alt_allele, "C");
        assert_eq!(records[2].alt_reads, 0);
        assert_eq!(records[2].percent_alt_reads, 0.0);
        assert_eq!(records[2].percent_ref_reads, 100.0);
    }

    #[test]
    fn test_parse_variant_line_wrong_column_count() {
        let line = "chr1\t100\t.\tA\tT\t.\tPASS\tTC=10";
        assert!(parse_variant_line(line).is_err());
    }

    #[test]
    fn test_read_variant_records() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "##fileformat=VCFv4.2").unwrap();
        writeln!(
            temp_file,
            "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tSAMPLE"
        )
        .unwrap();
        writeln!(temp_file, "chr1\t100\t.\tA\tT\t.\tPASS\tTC=30\tGT:AD\t0/1:12").unwrap();
        writeln!(
            temp_file,
            "chr2\t200\t.\tG\tC,A\t.\tPASS\tTC=40\tGT:AD\t1/2:10,20"
        )
        .unwrap();

        let records = read_variant_records(temp_file.path()).unwrap();
        assert_eq!(records.len(), 3); // One single-alt line + one two-alt line

        assert_eq!(records[0].chrom, "chr1");
        assert_eq!(records[0].alt_allele, "T");
        assert_eq!(records[0].alt_reads, 12);

        assert_eq!(records[1].chrom, "chr2");
        assert_eq!(records[1].alt_allele, "C");
        assert_eq!(records[1].alt_reads, 10);

        assert_eq!(records[2].chrom, "chr2");
        assert_eq!(records[2].alt_allele, "A");
        assert_eq!(records[2].alt_reads, 20);
    }

    #[test]
    fn test_read_variant_records_malformed_line_is_fatal() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "chr1\t100\t.\tA\tT\t.\tPASS\tTC=30\tGT:AD\t0/1:12").unwrap();
        writeln!(temp_file, "chr2\t200\tA\tT").unwrap();

        assert!(read_variant_records(temp_file.path()).is_err());
    }
}
