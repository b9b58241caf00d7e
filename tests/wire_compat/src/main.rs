fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use vidingest_protocol::{
        ApiError, ConfirmUploadRequest, ConfirmUploadResponse, NegotiateUploadRequest,
        NegotiateUploadResponse, UploadMode, parse_api_payload,
    };

    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    fn read_fixture(name: &str) -> Vec<u8> {
        let path = fixtures_dir().join(name);
        fs::read(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
    }

    fn load_fixture(name: &str) -> serde_json::Value {
        serde_json::from_slice(&read_fixture(name))
            .unwrap_or_else(|e| panic!("failed to parse fixture {name}: {e}"))
    }

    /// Deserializes a fixture, re-serializes it and compares the JSON values
    /// (object key order does not matter).
    fn roundtrip_test<T>(name: &str) -> T
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));
        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  backend: {fixture}\n  client:  {reserialized}"
        );
        parsed
    }

    /// Like [`roundtrip_test`], but the listed timestamp fields are compared
    /// as instants: the backend writes milliseconds, chrono drops zero ones.
    fn roundtrip_with_timestamps<T>(name: &str, timestamps: &[&str]) -> T
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let mut fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let mut reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));

        for key in timestamps {
            let instant = |value: Option<serde_json::Value>| {
                let text = value.unwrap_or_else(|| panic!("{name}: missing {key}"));
                let text = text.as_str().unwrap_or_else(|| panic!("{name}: {key} is not a string"));
                chrono::DateTime::parse_from_rfc3339(text)
                    .unwrap_or_else(|e| panic!("{name}: bad {key} {text:?}: {e}"))
            };
            let backend = instant(fixture.as_object_mut().unwrap().remove(*key));
            let client = instant(reserialized.as_object_mut().unwrap().remove(*key));
            assert_eq!(backend, client, "{key} mismatch for {name}");
        }
        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  backend: {fixture}\n  client:  {reserialized}"
        );
        parsed
    }

    #[test]
    fn negotiate_request_with_digest() {
        let req = roundtrip_test::<NegotiateUploadRequest>("negotiate_request_verified.json");
        let digest = req.sha256hex.unwrap();
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn negotiate_request_without_digest() {
        let req = roundtrip_test::<NegotiateUploadRequest>("negotiate_request_fallback.json");
        assert!(req.sha256hex.is_none());
        // 2 GiB exceeds u32; the size must survive as u64.
        assert_eq!(req.file_size, 2 * 1024 * 1024 * 1024);
    }

    #[test]
    fn negotiate_response_flat() {
        let resp = roundtrip_with_timestamps::<NegotiateUploadResponse>(
            "negotiate_response.json",
            &["expiresAt"],
        );
        assert_eq!(resp.mode, Some(UploadMode::Verified));
        assert_eq!(
            resp.expires_at.map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)),
            Some("2025-06-01T12:15:00.000Z".to_string())
        );
        assert!(resp.upload_url.contains("X-Amz-Signature"));
    }

    #[test]
    fn negotiate_response_envelope_matches_flat() {
        let wrapped: NegotiateUploadResponse =
            parse_api_payload(&read_fixture("negotiate_response_envelope.json")).unwrap();
        let flat: NegotiateUploadResponse =
            parse_api_payload(&read_fixture("negotiate_response.json")).unwrap();
        assert_eq!(wrapped, flat);
    }

    #[test]
    fn confirm_request() {
        roundtrip_test::<ConfirmUploadRequest>("confirm_request.json");
    }

    #[test]
    fn confirm_response() {
        let resp = roundtrip_test::<ConfirmUploadResponse>("confirm_response.json");
        assert!(resp.is_acknowledged());
    }

    #[test]
    fn error_response() {
        let err = roundtrip_test::<ApiError>("error_response.json");
        assert_eq!(err.success, Some(false));
        assert_eq!(
            ApiError::message_from_body(&read_fixture("error_response.json")).as_deref(),
            Some("quota exceeded")
        );
    }
}
