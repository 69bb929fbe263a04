use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::Job;
use crate::services::sealer::{SealError, Sealer};

const NONCE_SUFFIX_LEN: usize = 99;
const NONCE_ALPHABET: &[u8] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ!@#$%^&*()_+";

/// A sealed job request as it travels on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealedJobRequest {
    pub encrypted_job: String,
}

/// A sealed result together with the request it answers. The result can only
/// be recovered by a holder of both halves, since the nonce that keys the
/// result lives inside the sealed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealedResultPair {
    pub encrypted_result: String,
    pub encrypted_request: String,
}

/// Builds and verifies sealed job requests and results.
pub struct JobEnvelope {
    sealer: Arc<Sealer>,
}

impl JobEnvelope {
    pub fn new(sealer: Arc<Sealer>) -> Self {
        Self { sealer }
    }

    /// Sign a job: compute a checksum over its serialized form, attach a nonce
    /// of checksum plus a long random suffix, re-serialize and seal under the
    /// master key. The emitted envelope's embedded job always carries its own
    /// nonce.
    pub fn sign(&self, job: &mut Job) -> Result<SealedJobRequest, EnvelopeError> {
        let serialized = serde_json::to_vec(job)?;
        let checksum = Sha256::digest(&serialized);

        job.nonce = format!("{:x}-{}", checksum, random_suffix(NONCE_SUFFIX_LEN));

        let sealed = serde_json::to_vec(job)?;
        Ok(SealedJobRequest {
            encrypted_job: self.sealer.seal(&sealed)?,
        })
    }

    /// Unseal a request with the master key and decode the job.
    pub fn open(&self, request: &SealedJobRequest) -> Result<Job, EnvelopeError> {
        let plaintext = self.sealer.unseal(&request.encrypted_job)?;
        Ok(serde_json::from_slice(&plaintext)?)
    }

    /// Seal result data under the one-time key derived from the job's nonce.
    pub fn seal_result(&self, nonce: &str, data: &[u8]) -> Result<String, EnvelopeError> {
        Ok(Sealer::seal_with_key(nonce, data)?)
    }

    /// Recover a result's plaintext from a sealed request/result pair: the
    /// request is unsealed to recover the nonce, which then unseals the
    /// result. The nonce is never transmitted in the clear.
    pub fn unveil(&self, pair: &SealedResultPair) -> Result<Vec<u8>, EnvelopeError> {
        let request = SealedJobRequest {
            encrypted_job: pair.encrypted_request.clone(),
        };
        let job = self.open(&request)?;
        Ok(Sealer::unseal_with_key(&job.nonce, &pair.encrypted_result)?)
    }
}

fn random_suffix(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| NONCE_ALPHABET[rng.gen_range(0..NONCE_ALPHABET.len())] as char)
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("sealing error: {0}")]
    Seal(#[from] SealError),

    #[error("malformed job payload: {0}")]
    Decode(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobArguments, JobType};
    use base64::Engine;

    fn envelope() -> JobEnvelope {
        let key = base64::engine::general_purpose::STANDARD.encode([3u8; 32]);
        JobEnvelope::new(Arc::new(Sealer::new(&key).unwrap()))
    }

    fn sample_job() -> Job {
        let mut args = JobArguments::new();
        args.insert("url".into(), serde_json::json!("https://example.com"));
        let mut job = Job::new(JobType::Web, args);
        job.worker_id = "miner1".into();
        job
    }

    #[test]
    fn sign_open_round_trip() {
        let envelope = envelope();
        let mut job = sample_job();
        let sealed = envelope.sign(&mut job).unwrap();

        assert!(!job.nonce.is_empty());

        let opened = envelope.open(&sealed).unwrap();
        assert_eq!(opened.job_type, job.job_type);
        assert_eq!(opened.arguments, job.arguments);
        assert_eq!(opened.worker_id, "miner1");
        assert_eq!(opened.nonce, job.nonce);
    }

    #[test]
    fn nonce_is_unique_per_signing() {
        let envelope = envelope();
        let mut a = sample_job();
        let mut b = sample_job();
        envelope.sign(&mut a).unwrap();
        envelope.sign(&mut b).unwrap();
        assert_ne!(a.nonce, b.nonce);
    }

    #[test]
    fn unveil_recovers_result_plaintext() {
        let envelope = envelope();
        let mut job = sample_job();
        let sealed_request = envelope.sign(&mut job).unwrap();

        let sealed_result = envelope.seal_result(&job.nonce, b"result bytes").unwrap();

        let pair = SealedResultPair {
            encrypted_result: sealed_result,
            encrypted_request: sealed_request.encrypted_job,
        };
        assert_eq!(envelope.unveil(&pair).unwrap(), b"result bytes");
    }

    #[test]
    fn unveil_fails_with_foreign_request() {
        let envelope = envelope();
        let mut job = sample_job();
        envelope.sign(&mut job).unwrap();
        let sealed_result = envelope.seal_result(&job.nonce, b"result bytes").unwrap();

        // A different signed request carries a different nonce.
        let mut other = sample_job();
        let other_request = envelope.sign(&mut other).unwrap();

        let pair = SealedResultPair {
            encrypted_result: sealed_result,
            encrypted_request: other_request.encrypted_job,
        };
        assert!(envelope.unveil(&pair).is_err());
    }

    #[test]
    fn open_rejects_wrong_master_key() {
        let envelope_a = envelope();
        let key_b = base64::engine::general_purpose::STANDARD.encode([4u8; 32]);
        let envelope_b = JobEnvelope::new(Arc::new(Sealer::new(&key_b).unwrap()));

        let mut job = sample_job();
        let sealed = envelope_a.sign(&mut job).unwrap();
        assert!(envelope_b.open(&sealed).is_err());
    }
}
