//! AWS Signature Version 4 for JSON POST requests.
//!
//! Only what the log service needs: POST to the endpoint root with an empty
//! query string and a JSON body. Signed headers are `content-type`, `host`,
//! `x-amz-date`, `x-amz-target` and, for temporary credentials,
//! `x-amz-security-token`.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::error::{ClientError, ClientResult};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Access key material used to sign requests.
#[derive(Clone)]
pub struct SigningCredentials<'a> {
    /// Access key id
    pub access_key_id: &'a str,
    /// Secret access key
    pub secret_access_key: &'a str,
    /// Session token for temporary credentials
    pub session_token: Option<&'a str>,
}

/// The parts of a request that go into the signature.
pub struct SignableRequest<'a> {
    /// `host[:port]` as sent in the Host header
    pub host: &'a str,
    /// Absolute path, usually `/`
    pub path: &'a str,
    /// Content-Type header value
    pub content_type: &'a str,
    /// X-Amz-Target header value
    pub target: &'a str,
    /// Request body
    pub payload: &'a [u8],
}

/// Signer bound to one region and service.
#[derive(Debug, Clone)]
pub struct SigV4Signer {
    region: String,
    service: String,
}

impl SigV4Signer {
    /// Create a signer for `service` in `region`
    pub fn new(region: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            service: service.into(),
        }
    }

    /// Headers to add to the request: `x-amz-date`, optional
    /// `x-amz-security-token`, and `authorization`.
    pub fn sign(
        &self,
        credentials: &SigningCredentials<'_>,
        request: &SignableRequest<'_>,
        now: DateTime<Utc>,
    ) -> ClientResult<Vec<(&'static str, String)>> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();

        let mut headers: Vec<(&str, String)> = vec![
            ("content-type", request.content_type.to_string()),
            ("host", request.host.to_string()),
            ("x-amz-date", amz_date.clone()),
        ];
        if let Some(token) = credentials.session_token {
            headers.push(("x-amz-security-token", token.to_string()));
        }
        headers.push(("x-amz-target", request.target.to_string()));
        headers.sort_by(|a, b| a.0.cmp(b.0));

        let canonical_headers: String = headers
            .iter()
            .map(|(k, v)| format!("{}:{}\n", k, v.trim()))
            .collect();
        let signed_headers = headers.iter().map(|(k, _)| *k).collect::<Vec<_>>().join(";");

        let canonical_request = format!(
            "POST\n{}\n\n{}\n{}\n{}",
            request.path,
            canonical_headers,
            signed_headers,
            hex_sha256(request.payload)
        );

        let scope = format!("{}/{}/{}/aws4_request", date, self.region, self.service);
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            amz_date,
            scope,
            hex_sha256(canonical_request.as_bytes())
        );

        let key = signing_key(credentials.secret_access_key, &date, &self.region, &self.service)?;
        let signature = hex::encode(hmac(&key, string_to_sign.as_bytes())?);

        let authorization = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, credentials.access_key_id, scope, signed_headers, signature
        );

        let mut out = vec![("x-amz-date", amz_date)];
        if let Some(token) = credentials.session_token {
            out.push(("x-amz-security-token", token.to_string()));
        }
        out.push(("authorization", authorization));
        Ok(out)
    }
}

/// Derive the per-day signing key.
pub fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> ClientResult<Vec<u8>> {
    let k_date = hmac(format!("AWS4{}", secret).as_bytes(), date.as_bytes())?;
    let k_region = hmac(&k_date, region.as_bytes())?;
    let k_service = hmac(&k_region, service.as_bytes())?;
    hmac(&k_service, b"aws4_request")
}

fn hmac(key: &[u8], data: &[u8]) -> ClientResult<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| ClientError::SignatureError(format!("HMAC error: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn hex_sha256(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn credentials() -> SigningCredentials<'static> {
        SigningCredentials {
            access_key_id: "AKIDEXAMPLE",
            secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            session_token: None,
        }
    }

    fn request(payload: &[u8]) -> SignableRequest<'_> {
        SignableRequest {
            host: "logs.us-east-1.amazonaws.com",
            path: "/",
            content_type: "application/x-amz-json-1.1",
            target: "Logs_20140328.PutLogEvents",
            payload,
        }
    }

    #[test]
    fn test_signing_key_matches_published_example() {
        let key = signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20120215",
            "us-east-1",
            "iam",
        )
        .unwrap();

        assert_eq!(
            hex::encode(key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn test_authorization_header_shape() {
        let signer = SigV4Signer::new("us-east-1", "logs");
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();

        let headers = signer.sign(&credentials(), &request(b"{}"), now).unwrap();

        assert_eq!(headers[0], ("x-amz-date", "20240115T100000Z".to_string()));
        let auth = &headers.last().unwrap().1;
        assert!(auth.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240115/us-east-1/logs/aws4_request, "
        ));
        assert!(auth.contains("SignedHeaders=content-type;host;x-amz-date;x-amz-target, "));
        let signature = auth.rsplit("Signature=").next().unwrap();
        assert_eq!(signature.len(), 64);
    }

    #[test]
    fn test_signature_depends_on_payload() {
        let signer = SigV4Signer::new("us-east-1", "logs");
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();

        let a = signer.sign(&credentials(), &request(b"{\"a\":1}"), now).unwrap();
        let b = signer.sign(&credentials(), &request(b"{\"a\":2}"), now).unwrap();
        let again = signer.sign(&credentials(), &request(b"{\"a\":1}"), now).unwrap();

        assert_ne!(a.last(), b.last());
        assert_eq!(a.last(), again.last());
    }

    #[test]
    fn test_session_token_is_signed() {
        let signer = SigV4Signer::new("eu-west-1", "logs");
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        let creds = SigningCredentials {
            session_token: Some("FQoGZXIvYXdzE"),
            ..credentials()
        };

        let headers = signer.sign(&creds, &request(b"{}"), now).unwrap();

        assert!(headers
            .iter()
            .any(|(k, v)| *k == "x-amz-security-token" && v == "FQoGZXIvYXdzE"));
        assert!(headers
            .last()
            .unwrap()
            .1
            .contains("SignedHeaders=content-type;host;x-amz-date;x-amz-security-token;x-amz-target"));
    }
}
