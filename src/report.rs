//! Report assembly and CSV serialization

use crate::utils::has_extension;
use crate::{Annotation, VariantRecord, VarepError, VarepResult};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Output columns, in order: the variant record fields followed by the
/// annotation fields.
pub const REPORT_COLUMNS: [&str; 14] = [
    "chrom",
    "pos",
    "ref",
    "alt",
    "depth",
    "alt_reads",
    "percent_alt_reads",
    "percent_ref_reads",
    "gene_name",
    "variant_effect",
    "minor_allele",
    "minor_allele_frequency",
    "somatic",
    "id",
];

/// One output row: a variant record merged with its annotation.
#[derive(Debug, Clone)]
pub struct ReportRow {
    pub record: VariantRecord,
    pub annotation: Annotation,
}

impl ReportRow {
    /// Merge a record with its lookup result. A failed lookup (`None`)
    /// yields blank annotation fields.
    pub fn new(record: VariantRecord, annotation: Option<Annotation>) -> Self {
        Self {
            record,
            annotation: annotation.unwrap_or_default(),
        }
    }

    /// Flatten into CSV field values, aligned with `REPORT_COLUMNS`.
    pub fn to_record(&self) -> Vec<String> {
        vec![
            self.record.chrom.clone(),
            self.record.pos.to_string(),
            self.record.ref_allele.clone(),
            self.record.alt_allele.clone(),
            self.record.depth.to_string(),
            self.record.alt_reads.to_string(),
            self.record.percent_alt_reads.to_string(),
            self.record.percent_ref_reads.to_string(),
            self.annotation.gene_name.clone(),
            self.annotation.variant_effect.clone(),
            self.annotation.minor_allele.clone(),
            self.annotation.minor_allele_frequency.clone(),
            self.annotation.somatic.clone(),
            self.annotation.id.clone(),
        ]
    }
}

/// Write the accumulated rows as a CSV report with a header line.
///
/// Zero rows is an error; nothing is written in that case.
pub fn write_report(rows: &[ReportRow], output_path: &Path) -> VarepResult<()> {
    if rows.is_empty() {
        return Err(VarepError::EmptyReport(
            "no variant records were extracted, refusing to write an empty report".to_string(),
        ));
    }

    let file = File::create(output_path)?;
    let writer: Box<dyn Write> = if has_extension(output_path, "gz") {
        Box::new(GzEncoder::new(file, Compression::default()))
    } else {
        Box::new(file)
    };

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(REPORT_COLUMNS)?;

    for row in rows {
        csv_writer.write_record(row.to_record())?;
    }

    csv_writer.flush()?;
    Ok(())
}
