//! CLI binary for varep - converts a VCF file into an annotated CSV report

use clap::Parser;
use env_logger::Env;
use std::path::PathBuf;
use varep_rs::{
    report::{write_report, ReportRow},
    utils::{ensure_parent_dirs, log_progress, validate_file_readable, Timer},
    vcf::read_variant_records,
    vep::{VepClient, DEFAULT_VEP_URL},
    VarepError, VarepResult,
};

#[derive(Parser)]
#[command(name = "varep")]
#[command(about = "Annotated variant report generator for VCF files")]
#[command(long_about = "
varep reads variant calls from a VCF file, expands multi-allelic records
into one row per alternate allele, computes read-depth percentages from the
INFO TC field and the per-allele read counts in the sample column, and looks
each variant up against the Ensembl VEP REST service.

The output is a CSV report with one row per alternate allele, combining the
extracted record fields with gene, consequence and known-variant annotation.
Variants whose lookup fails (service unreachable or a non-success HTTP
status) keep their record fields and get blank annotation columns.

Each variant is annotated with one synchronous request; large inputs are
bounded by service latency. Writing the report with a .gz extension
compresses the output.
")]
struct Args {
    /// Path to the input VCF file
    #[arg(value_name = "INPUT_VCF")]
    input_vcf: PathBuf,

    /// Path to the output CSV report
    #[arg(value_name = "OUTPUT_CSV")]
    output: PathBuf,

    /// Base URL of the VEP region endpoint
    #[arg(long, value_name = "URL", default_value = DEFAULT_VEP_URL)]
    vep_url: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Force overwrite of output file if it exists
    #[arg(short, long)]
    force: bool,
}

fn run() -> VarepResult<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_secs()
        .init();

    log::info!("Starting varep report generation");
    log::info!("Input VCF: {:?}", args.input_vcf);
    log::info!("Output report: {:?}", args.output);
    log::info!("VEP endpoint: {}", args.vep_url);

    // Validate input file
    validate_file_readable(&args.input_vcf)?;

    // Check if output file exists and handle accordingly
    if args.output.exists() && !args.force {
        return Err(VarepError::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!(
                "Output file {:?} already exists. Use --force to overwrite.",
                args.output
            ),
        )));
    }

    ensure_parent_dirs(&args.output)?;

    // Step 1: Extract variant records
    let _timer = Timer::new("Reading VCF variants");
    let records = read_variant_records(&args.input_vcf)?;
    log::info!("Read {} variant records from VCF file", records.len());

    // Step 2: Annotate each record with one blocking VEP lookup
    let _timer = Timer::new("Annotating variants");
    let client = VepClient::new(&args.vep_url)?;

    let total = records.len();
    let mut rows = Vec::with_capacity(total);
    let mut annotated_count = 0usize;

    for (idx, record) in records.into_iter().enumerate() {
        let annotation = client.annotate(&record)?;
        if annotation.is_some() {
            annotated_count += 1;
        }
        rows.push(ReportRow::new(record, annotation));
        log_progress(idx + 1, total, "Annotating variants");
    }

    if total > 0 {
        let blank_count = total - annotated_count;
        log::info!("Annotation summary:");
        log::info!(
            "  Annotated: {} ({:.1}%)",
            annotated_count,
            (annotated_count as f64 / total as f64) * 100.0
        );
        log::info!(
            "  Blank (lookup failed): {} ({:.1}%)",
            blank_count,
            (blank_count as f64 / total as f64) * 100.0
        );
    }

    // Step 3: Write the report; zero extracted records is an error here
    let _timer = Timer::new("Writing report");
    write_report(&rows, &args.output)?;

    log::info!("Report written to: {:?}", args.output);
    log::info!("Report generation completed successfully");

    Ok(())
}

/// Handle application errors and provide user-friendly messages
fn handle_error(error: VarepError) -> ! {
    match error {
        VarepError::FileNotFound(path) => {
            eprintln!("Error: File not found: {}", path);
            eprintln!("Please check that the file exists and is readable.");
        }
        VarepError::InvalidVariant(msg) => {
            eprintln!("Error: Invalid variant data: {}", msg);
            eprintln!("Please check that your VCF file is properly formatted.");
        }
        VarepError::EmptyReport(msg) => {
            eprintln!("Error: {}", msg);
            eprintln!("Please check that the input VCF contains data lines.");
        }
        VarepError::Http(ref e) => {
            eprintln!("Error: HTTP client error: {}", e);
            eprintln!("Please check the VEP endpoint URL.");
        }
        VarepError::Json(ref e) => {
            eprintln!("Error: Invalid VEP response: {}", e);
            eprintln!("The annotation service answered with a malformed body.");
        }
        VarepError::Io(ref e) => {
            eprintln!("Error: I/O error: {}", e);
            eprintln!("Please check file permissions and disk space.");
        }
        VarepError::Csv(ref e) => {
            eprintln!("Error: CSV processing error: {}", e);
            eprintln!("Please check the output file format.");
        }
    }
    std::process::exit(1);
}

fn main() {
    if let Err(e) = run() {
        handle_error(e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_args_require_both_paths() {
        assert!(Args::try_parse_from(["varep"]).is_err());
        assert!(Args::try_parse_from(["varep", "input.vcf"]).is_err());
        assert!(Args::try_parse_from(["varep", "input.vcf", "out.csv", "extra"]).is_err());

        let args = Args::try_parse_from(["varep", "input.vcf", "out.csv"]).unwrap();
        assert_eq!(args.input_vcf, PathBuf::from("input.vcf"));
        assert_eq!(args.output, PathBuf::from("out.csv"));
        assert_eq!(args.vep_url, DEFAULT_VEP_URL);
    }

    #[test]
    fn test_extract_and_write_without_annotation() {
        let mut vcf_file = NamedTempFile::new().unwrap();
        writeln!(vcf_file, "##fileformat=VCFv4.2").unwrap();
        writeln!(
            vcf_file,
            "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tSAMPLE"
        )
        .unwrap();
        writeln!(
            vcf_file,
            "chr1\t100\t.\tA\tT,G\t.\tPASS\tTC=20\tGT:AD\t1/2:5,15"
        )
        .unwrap();

        let records = read_variant_records(vcf_file.path()).unwrap();
        assert_eq!(records.len(), 2);

        let rows: Vec<ReportRow> = records
            .into_iter()
            .map(|record| ReportRow::new(record, None))
            .collect();

        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("report.csv");
        write_report(&rows, &output).unwrap();

        let content = std::fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3); // header + two alternate alleles
        assert!(lines[1].starts_with("chr1,100,A,T,20,5,25,75"));
        assert!(lines[2].starts_with("chr1,100,A,G,20,15,75,25"));
    }

    #[test]
    fn test_empty_vcf_produces_no_report() {
        let mut vcf_file = NamedTempFile::new().unwrap();
        writeln!(vcf_file, "##fileformat=VCFv4.2").unwrap();
        writeln!(
            vcf_file,
            "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tSAMPLE"
        )
        .unwrap();

        let records = read_variant_records(vcf_file.path()).unwrap();
        assert!(records.is_empty());

        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("report.csv");
        let result = write_report(&[], &output);

        assert!(result.is_err());
        assert!(!output.exists());
    }
}
