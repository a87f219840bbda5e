//! # varep - Annotated Variant Report Generator
//!
//! Converts VCF variant call records into an annotated CSV report by
//! combining local file parsing with remote variant-effect lookups against
//! the Ensembl VEP REST service.

pub mod report;
pub mod utils;
pub mod vcf;
pub mod vep;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// A single variant call expanded to one alternate allele, with read-depth
/// statistics derived from the source line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantRecord {
    pub chrom: String,
    pub pos: u32,
    pub ref_allele: String,
    pub alt_allele: String,
    pub depth: u32,
    pub alt_reads: u32,
    pub percent_alt_reads: f64,
    pub percent_ref_reads: f64,
}

impl VariantRecord {
    /// Build a record for one alternate allele, computing allele-fraction
    /// percentages. Both percentages are 0 when depth is 0.
    pub fn new(
        chrom: String,
        pos: u32,
        ref_allele: String,
        alt_allele: String,
        depth: u32,
        alt_reads: u32,
    ) -> Self {
        let (percent_alt_reads, percent_ref_reads) = if depth == 0 {
            (0.0, 0.0)
        } else {
            let depth_f = depth as f64;
            (
                alt_reads as f64 / depth_f * 100.0,
                (depth_f - alt_reads as f64) / depth_f * 100.0,
            )
        };

        Self {
            chrom,
            pos,
            ref_allele,
            alt_allele,
            depth,
            alt_reads,
            percent_alt_reads,
            percent_ref_reads,
        }
    }
}

/// Summary of a VEP lookup for one variant.
///
/// `Default` is the all-blank annotation written when the lookup fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub gene_name: String,
    pub variant_effect: String,
    pub minor_allele: String,
    pub minor_allele_frequency: String,
    /// "1" when any co-located variant was flagged somatic, otherwise "".
    pub somatic: String,
    /// Somatic catalog id when somatic, else the population rsid.
    pub id: String,
}

/// Error types for the varep library
#[derive(Debug, thiserror::Error)]
pub enum VarepError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid variant format: {0}")]
    InvalidVariant(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Empty report: {0}")]
    EmptyReport(String),
}

pub type VarepResult<T> = Result<T, VarepError>;
