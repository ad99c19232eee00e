//! Dual-key JWT decode: primary key first, rotation key on signature
//! mismatch. Only the primary key signs; both are accepted on decode.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Validation, decode, encode};

use crate::error::TokenError;
use crate::types::Claims;

pub struct KeyRing {
    primary_encoding: EncodingKey,
    primary_decoding: DecodingKey,
    rotate_decoding: DecodingKey,
}

impl KeyRing {
    pub fn from_base64(primary_b64: &str, rotate_b64: &str) -> Result<Self, TokenError> {
        let primary_bytes = BASE64
            .decode(primary_b64)
            .map_err(|_| TokenError::TokenChanged)?;
        let rotate_bytes = BASE64
            .decode(rotate_b64)
            .map_err(|_| TokenError::TokenChanged)?;

        Ok(Self {
            primary_encoding: EncodingKey::from_secret(&primary_bytes),
            primary_decoding: DecodingKey::from_secret(&primary_bytes),
            rotate_decoding: DecodingKey::from_secret(&rotate_bytes),
        })
    }

    /// Decodes with the primary key; on any decode error other than
    /// expiry, retries once with the rotation key before giving up.
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let validation = Validation::new(Algorithm::HS256);

        match decode::<Claims>(token, &self.primary_decoding, &validation) {
            Ok(data) => Ok(data.claims),
            Err(primary_err) => {
                if primary_err.kind() == &jsonwebtoken::errors::ErrorKind::ExpiredSignature {
                    return Err(TokenError::TokenExpired);
                }

                match decode::<Claims>(token, &self.rotate_decoding, &validation) {
                    Ok(data) => Ok(data.claims),
                    Err(rotate_err) => {
                        if rotate_err.kind() == &jsonwebtoken::errors::ErrorKind::ExpiredSignature {
                            Err(TokenError::TokenExpired)
                        } else {
                            Err(TokenError::TokenChanged)
                        }
                    }
                }
            }
        }
    }

    /// Signs a fresh token with the primary key only.
    pub fn encode(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&jsonwebtoken::Header::new(Algorithm::HS256), claims, &self.primary_encoding)
            .map_err(|_| TokenError::TokenChanged)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn key_b64(byte: u8) -> String {
        BASE64.encode([byte; 32])
    }

    #[test]
    fn decodes_with_primary_key() {
        let keys = KeyRing::from_base64(&key_b64(1), &key_b64(2)).unwrap();
        let claims = Claims { sub: "42".into(), exp: (Utc::now() + Duration::days(1)).timestamp() };
        let token = keys.encode(&claims).unwrap();

        let decoded = keys.decode(&token).unwrap();
        assert_eq!(decoded.sub, "42");
    }

    #[test]
    fn decodes_rotation_signed_token_after_swap() {
        let old_primary = key_b64(1);
        let old_rotate = key_b64(2);
        let signer = KeyRing::from_base64(&old_rotate, &old_primary).unwrap();
        let claims = Claims { sub: "7".into(), exp: (Utc::now() + Duration::days(1)).timestamp() };
        let token = signer.encode(&claims).unwrap();

        // Verifier still has old_primary as primary, old_rotate as rotate key.
        let verifier = KeyRing::from_base64(&old_primary, &old_rotate).unwrap();
        let decoded = verifier.decode(&token).unwrap();
        assert_eq!(decoded.sub, "7");
    }

    #[test]
    fn expired_token_reports_token_expired() {
        let keys = KeyRing::from_base64(&key_b64(1), &key_b64(2)).unwrap();
        let claims = Claims { sub: "1".into(), exp: (Utc::now() - Duration::hours(1)).timestamp() };
        let token = keys.encode(&claims).unwrap();

        let err = keys.decode(&token).unwrap_err();
        assert!(matches!(err, TokenError::TokenExpired));
    }

    #[test]
    fn garbage_token_reports_token_changed() {
        let keys = KeyRing::from_base64(&key_b64(1), &key_b64(2)).unwrap();
        let err = keys.decode("not-a-jwt").unwrap_err();
        assert!(matches!(err, TokenError::TokenChanged));
    }
}
