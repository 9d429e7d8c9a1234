use crate::{error::InvalidImport, status::StatusSnapshot};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

pub const EXPORT_VERSION: u32 = 1;

#[derive(Debug, Serialize)]
struct ExportPayload<'a> {
    #[serde(rename = "v")]
    version: u32,
    state: &'a StatusSnapshot,
}

// Decoded in two steps so a wrong version or shape is reported before the
// individual records are looked at.
#[derive(Debug, Deserialize)]
struct RawPayload {
    #[serde(rename = "v", alias = "version")]
    version: serde_json::Value,
    state: serde_json::Value,
}

/// Compact JSON wrapped in standard base64.
pub fn encode(snapshot: &StatusSnapshot) -> Result<String, serde_json::Error> {
    let payload = ExportPayload {
        version: EXPORT_VERSION,
        state: snapshot,
    };
    let json = serde_json::to_vec(&payload)?;
    Ok(STANDARD.encode(json))
}

pub fn decode(token: &str) -> Result<StatusSnapshot, InvalidImport> {
    let compact: String = token.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(InvalidImport::new("empty token"));
    }
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|err| InvalidImport::new(format!("base64: {err}")))?;
    let payload: RawPayload = serde_json::from_slice(&bytes)
        .map_err(|err| InvalidImport::new(format!("json: {err}")))?;

    if payload.version.as_u64() != Some(u64::from(EXPORT_VERSION)) {
        return Err(InvalidImport::new(format!(
            "unsupported version {}",
            payload.version
        )));
    }
    if !payload.state.is_object() {
        return Err(InvalidImport::new("state is not an object"));
    }

    serde_json::from_value(payload.state)
        .map_err(|err| InvalidImport::new(format!("record: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{EnhancementTier, PotentialTier, StatusRecord};

    fn encode_raw(json: &str) -> String {
        STANDARD.encode(json.as_bytes())
    }

    #[test]
    fn round_trips_empty_snapshot() {
        let snapshot = StatusSnapshot::new();
        assert_eq!(decode(&encode(&snapshot).unwrap()).unwrap(), snapshot);
    }

    #[test]
    fn round_trips_maxed_snapshot() {
        let mut snapshot = StatusSnapshot::new();
        for id in ["1001", "1002", "ssj-goku"] {
            snapshot.insert(
                id.to_string(),
                StatusRecord {
                    owned: true,
                    enhancement: EnhancementTier::max(),
                    potential: PotentialTier::max(),
                },
            );
        }
        snapshot.insert("1003".to_string(), StatusRecord::default());
        assert_eq!(decode(&encode(&snapshot).unwrap()).unwrap(), snapshot);
    }

    #[test]
    fn token_is_printable_ascii() {
        let mut snapshot = StatusSnapshot::new();
        snapshot.insert("ünit".to_string(), StatusRecord::default());
        let token = encode(&snapshot).unwrap();
        assert!(token.bytes().all(|b| b.is_ascii_graphic()));
    }

    #[test]
    fn rejects_other_versions() {
        let err = decode(&encode_raw(r#"{"v":2,"state":{}}"#)).unwrap_err();
        assert!(err.reason().contains("version"));
        assert!(decode(&encode_raw(r#"{"v":"1","state":{}}"#)).is_err());
        assert!(decode(&encode_raw(r#"{"state":{}}"#)).is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(decode("definitely not a token!").is_err());
        assert!(decode("").is_err());
        assert!(decode(&encode_raw("[1,2,3]")).is_err());
        assert!(decode(&encode_raw(r#"{"v":1,"state":[]}"#)).is_err());
        assert!(decode(&encode_raw(r#"{"v":1,"state":{"a":{"pot":9}}}"#)).is_err());
    }

    #[test]
    fn error_message_is_uniform() {
        let garbage = decode("???").unwrap_err();
        let version = decode(&encode_raw(r#"{"v":2,"state":{}}"#)).unwrap_err();
        assert_eq!(garbage.to_string(), version.to_string());
    }

    #[test]
    fn accepts_browser_tokens_and_wrapped_input() {
        let token = encode_raw(concat!(
            r#"{"v":1,"state":{"1":{"owned":true,"eza":2,"pot":4},"#,
            r#""2":{"owned":false,"eza":0,"pot":0}}}"#,
        ));
        let (head, tail) = token.split_at(token.len() / 2);
        let wrapped = format!("  {head}\n{tail}\n");
        let snapshot = decode(&wrapped).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot["1"].owned);
        assert_eq!(snapshot["1"].enhancement.value(), 2);
        assert_eq!(snapshot["1"].potential.value(), 4);

        let aliased = decode(&encode_raw(r#"{"version":1,"state":{}}"#)).unwrap();
        assert!(aliased.is_empty());
    }
}
