use {
    crate::domain::error::EngineError,
    hmac::{Hmac, Mac},
    sha2::Sha256,
    subtle::ConstantTimeEq,
};

type HmacSha256 = Hmac<Sha256>;

/// Future timestamps are accepted within this skew.
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Parsed `Stripe-Signature` header: `t=<unix>,v1=<hex>[,v1=<hex>...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    /// Stripe sends one `v1` per active secret while a secret is being rolled.
    pub v1: Vec<Vec<u8>>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> Result<Self, EngineError> {
        let mut timestamp = None;
        let mut v1 = Vec::new();

        for part in header.split(',') {
            let Some((key, value)) = part.trim().split_once('=') else {
                return Err(EngineError::Authentication(
                    "malformed Stripe-Signature header".into(),
                ));
            };
            match key {
                "t" => {
                    timestamp = Some(value.parse::<i64>().map_err(|_| {
                        EngineError::Authentication("invalid signature timestamp".into())
                    })?);
                }
                "v1" => {
                    // Unparsable entries are skipped; another v1 may still match.
                    if let Ok(bytes) = hex::decode(value) {
                        v1.push(bytes);
                    }
                }
                _ => {}
            }
        }

        let timestamp = timestamp
            .ok_or_else(|| EngineError::Authentication("signature timestamp missing".into()))?;
        if v1.is_empty() {
            return Err(EngineError::Authentication("no v1 signature in header".into()));
        }

        Ok(Self { timestamp, v1 })
    }
}

pub struct SignatureVerifier {
    secret: String,
    tolerance_secs: i64,
}

impl SignatureVerifier {
    pub fn new(secret: impl Into<String>, tolerance_secs: i64) -> Self {
        Self {
            secret: secret.into(),
            tolerance_secs,
        }
    }

    pub fn verify(&self, header: &str, body: &str, now: i64) -> Result<(), EngineError> {
        let header = SignatureHeader::parse(header)?;

        let age = now - header.timestamp;
        if age > self.tolerance_secs {
            return Err(EngineError::Authentication(format!(
                "signature timestamp too old ({age}s)"
            )));
        }
        if age < -MAX_CLOCK_SKEW_SECS {
            return Err(EngineError::Authentication(
                "signature timestamp in the future".into(),
            ));
        }

        let expected = compute(&self.secret, header.timestamp, body)?;
        let matched = header
            .v1
            .iter()
            .any(|sig| sig.len() == expected.len() && bool::from(sig.ct_eq(&expected)));

        if matched {
            Ok(())
        } else {
            Err(EngineError::Authentication("signature mismatch".into()))
        }
    }
}

/// Header value Stripe would send for `body` at `timestamp`.
pub fn sign(secret: &str, timestamp: i64, body: &str) -> Result<String, EngineError> {
    let mac = compute(secret, timestamp, body)?;
    Ok(format!("t={timestamp},v1={}", hex::encode(mac)))
}

fn compute(secret: &str, timestamp: i64, body: &str) -> Result<Vec<u8>, EngineError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| EngineError::Authentication(format!("bad signing secret: {e}")))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}
