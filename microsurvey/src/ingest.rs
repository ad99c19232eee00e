//! Google Forms response ingestion: decrypts the opaque answer-form
//! identifier into `(question_id, user_id, survey_id)` and hands the
//! answer to the orchestrator as an `ANSWER(k)` event.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::SurveyError;

/// Decrypted identifier carried by an inbound Google Forms payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RoutedAnswer {
    pub user_id: i64,
    pub survey_id: i64,
    pub question_id: u8,
}

/// Raw inbound payload: a base64 nonce||ciphertext blob plus the free-text
/// answer.
#[derive(Debug, Clone)]
pub struct FormResponsePayload {
    pub encrypted_identifier: String,
    pub answer_text: String,
}

pub trait PayloadDecryptor: Send + Sync {
    fn decrypt(&self, encrypted_identifier: &str) -> Result<RoutedAnswer, SurveyError>;
}

/// AES-256-GCM decryptor: the identifier is `base64(nonce(12) || ciphertext)`,
/// decrypting to a JSON-encoded [`RoutedAnswer`].
pub struct AesGcmDecryptor {
    cipher: Aes256Gcm,
}

impl AesGcmDecryptor {
    pub fn new(key: &SecretString) -> Result<Self, SurveyError> {
        let key_bytes = BASE64
            .decode(key.expose_secret())
            .map_err(|e| SurveyError::Decrypt(format!("bad key encoding: {e}")))?;
        let cipher = Aes256Gcm::new_from_slice(&key_bytes)
            .map_err(|e| SurveyError::Decrypt(format!("bad key length: {e}")))?;
        Ok(Self { cipher })
    }
}

impl PayloadDecryptor for AesGcmDecryptor {
    fn decrypt(&self, encrypted_identifier: &str) -> Result<RoutedAnswer, SurveyError> {
        let blob = BASE64
            .decode(encrypted_identifier)
            .map_err(|e| SurveyError::Decrypt(format!("bad base64: {e}")))?;

        if blob.len() < 12 {
            return Err(SurveyError::Decrypt("payload shorter than nonce".into()));
        }
        let (nonce_bytes, ciphertext) = blob.split_at(12);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| SurveyError::Decrypt(e.to_string()))?;

        serde_json::from_slice(&plaintext).map_err(|e| SurveyError::Malformed(e.to_string()))
    }
}

/// Decrypts `payload.encrypted_identifier` and routes it to a
/// [`RoutedAnswer`] plus the raw answer text, for the caller to feed into
/// `SurveyOrchestrator::receive_answer`.
pub fn decrypt_and_route(
    decryptor: &dyn PayloadDecryptor,
    payload: &FormResponsePayload,
) -> Result<(RoutedAnswer, String), SurveyError> {
    let routed = decryptor.decrypt(&payload.encrypted_identifier)?;
    Ok((routed, payload.answer_text.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeDecryptor(RoutedAnswer);

    impl PayloadDecryptor for FakeDecryptor {
        fn decrypt(&self, _encrypted_identifier: &str) -> Result<RoutedAnswer, SurveyError> {
            Ok(self.0)
        }
    }

    #[test]
    fn decrypt_and_route_pairs_identifier_with_answer_text() {
        let decryptor = FakeDecryptor(RoutedAnswer { user_id: 1, survey_id: 2, question_id: 3 });
        let payload = FormResponsePayload {
            encrypted_identifier: "irrelevant-for-fake".into(),
            answer_text: "Strongly agree".into(),
        };

        let (routed, answer) = decrypt_and_route(&decryptor, &payload).unwrap();
        assert_eq!(routed.question_id, 3);
        assert_eq!(answer, "Strongly agree");
    }
}
