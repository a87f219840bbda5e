//! HTTP client for the Ensembl VEP REST service

use crate::{Annotation, VariantRecord, VarepResult};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::time::Duration;

/// Default VEP region endpoint (GRCh37 assembly).
pub const DEFAULT_VEP_URL: &str = "http://grch37.rest.ensembl.org/vep/human/region";

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Single-variant request payload in the VEP region notation.
#[derive(Debug, Serialize)]
struct VepRequest {
    variants: Vec<String>,
}

/// One result element from the VEP region endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct VepResponse {
    #[serde(default)]
    pub transcript_consequences: Vec<TranscriptConsequence>,

    pub most_severe_consequence: Option<String>,

    #[serde(default)]
    pub colocated_variants: Vec<ColocatedVariant>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptConsequence {
    pub gene_symbol: Option<String>,
}

/// A known variant co-located with the queried one.
///
/// `somatic` and `minor_allele_freq` are left dynamic: the service emits
/// them as numbers, but older releases used strings.
#[derive(Debug, Clone, Deserialize)]
pub struct ColocatedVariant {
    pub id: Option<String>,

    #[serde(default)]
    pub somatic: Option<Value>,

    pub minor_allele: Option<String>,

    pub minor_allele_freq: Option<Value>,
}

impl Annotation {
    /// Summarize one VEP result element.
    ///
    /// Gene symbols are deduplicated and joined in sorted order. When the
    /// co-located variant list holds several somatic (or several
    /// non-somatic) entries, the last one wins.
    pub fn from_vep(result: &VepResponse) -> Self {
        let gene_names: BTreeSet<&str> = result
            .transcript_consequences
            .iter()
            .filter_map(|consequence| consequence.gene_symbol.as_deref())
            .collect();
        let gene_name = gene_names.into_iter().collect::<Vec<_>>().join(", ");

        let variant_effect = result.most_severe_consequence.clone().unwrap_or_default();

        let mut somatic = String::new();
        let mut somatic_id = String::new();
        let mut rsid = String::new();
        let mut minor_allele = String::new();
        let mut minor_allele_frequency = String::new();

        for variant in &result.colocated_variants {
            if value_is_truthy(variant.somatic.as_ref()) {
                somatic = "1".to_string();
                somatic_id = variant.id.clone().unwrap_or_default();
            } else {
                rsid = variant.id.clone().unwrap_or_default();
                minor_allele = variant.minor_allele.clone().unwrap_or_default();
                minor_allele_frequency = variant
                    .minor_allele_freq
                    .as_ref()
                    .map(value_to_string)
                    .unwrap_or_default();
            }
        }

        let id = if somatic.is_empty() { rsid } else { somatic_id };

        Annotation {
            gene_name,
            variant_effect,
            minor_allele,
            minor_allele_frequency,
            somatic,
            id,
        }
    }
}

fn value_is_truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().map(|n| n != 0.0).unwrap_or(false),
        Some(Value::String(text)) => !text.is_empty(),
        _ => false,
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// HTTP client for the VEP region endpoint.
pub struct VepClient {
    client: Client,
    base_url: String,
}

impl VepClient {
    /// Create a new VEP client for the given endpoint URL.
    pub fn new(base_url: &str) -> VarepResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    /// Look up one variant, returning `None` when the service is
    /// unreachable or answers with a non-success status. The caller writes
    /// a blank annotation in that case and carries on.
    pub fn annotate(&self, record: &VariantRecord) -> VarepResult<Option<Annotation>> {
        let notation = format!(
            "{} {} . {} {} . . .",
            record.chrom, record.pos, record.ref_allele, record.alt_allele
        );
        let payload = VepRequest {
            variants: vec![notation.clone()],
        };

        let response = match self
            .client
            .post(&self.base_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&payload)
            .send()
        {
            Ok(response) => response,
            Err(e) => {
                log::warn!("VEP request failed for {}: {}", notation, e);
                return Ok(None);
            }
        };

        if !response.status().is_success() {
            log::warn!("VEP returned HTTP {} for {}", response.status(), notation);
            return Ok(None);
        }

        let body = match response.text() {
            Ok(body) => body,
            Err(e) => {
                log::warn!("Failed to read VEP response for {}: {}", notation, e);
                return Ok(None);
            }
        };

        let results: Vec<VepResponse> = serde_json::from_str(&body)?;
        Ok(results.first().map(Annotation::from_vep))
    }
}
