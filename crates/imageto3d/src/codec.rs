//! Base64 transport encoding for uploaded images and returned models

use crate::types::Result;
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Encode raw bytes for the `image` field of a submission
pub fn encode_for_upload(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode a `model_base64` payload
///
/// Decoding is strict: characters outside the standard alphabet, missing
/// padding or a bad final quantum fail with `CorruptArtifact`.
pub fn decode_artifact(text: &str) -> Result<Vec<u8>> {
    Ok(STANDARD.decode(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GenerateError;

    #[test]
    fn test_encode_known_values() {
        assert_eq!(encode_for_upload(b""), "");
        assert_eq!(encode_for_upload(b"f"), "Zg==");
        assert_eq!(encode_for_upload(b"fo"), "Zm8=");
        assert_eq!(encode_for_upload(b"foo"), "Zm9v");
        assert_eq!(encode_for_upload(&[0x67, 0x6c, 0x54, 0x46]), "Z2xURg==");
    }

    #[test]
    fn test_round_trip() {
        let samples: [Vec<u8>; 4] = [
            Vec::new(),
            vec![0x00],
            (0..=255u8).collect(),
            b"glTF\x02\x00\x00\x00".repeat(97),
        ];

        for bytes in samples {
            assert_eq!(decode_artifact(&encode_for_upload(&bytes)).unwrap(), bytes);
        }
    }

    #[test]
    fn test_rejects_bad_alphabet() {
        let err = decode_artifact("!!!not-base64!!!").unwrap_err();
        assert!(matches!(err, GenerateError::CorruptArtifact(_)));
    }

    #[test]
    fn test_rejects_bad_padding() {
        assert!(matches!(
            decode_artifact("Zg="),
            Err(GenerateError::CorruptArtifact(_))
        ));
        assert!(matches!(
            decode_artifact("Zg"),
            Err(GenerateError::CorruptArtifact(_))
        ));
        assert!(matches!(
            decode_artifact("Z"),
            Err(GenerateError::CorruptArtifact(_))
        ));
    }
}
