//! The `{_i, _t, _c, _x}` OPACK envelope shared by requests, responses, and
//! events (§4.7).

use companion_opack::Value;

/// The `_t` discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MsgType {
    Event,
    Request,
    Response,
}

impl MsgType {
    fn to_i64(self) -> i64 {
        match self {
            Self::Event => 1,
            Self::Request => 2,
            Self::Response => 3,
        }
    }

    fn from_i64(n: i64) -> Option<Self> {
        match n {
            1 => Some(Self::Event),
            2 => Some(Self::Request),
            3 => Some(Self::Response),
            _ => None,
        }
    }
}

/// A decoded `{_i, _t, _c, _x}` envelope.
pub(crate) struct Envelope {
    pub(crate) identifier: String,
    pub(crate) msg_type: MsgType,
    pub(crate) content: Value,
    pub(crate) xid: Option<u32>,
}

/// Build a request envelope: `{_i: identifier, _t: 2, _c: content, _x: xid}`.
pub(crate) fn build_request(identifier: &str, content: Value, xid: u32) -> Value {
    Value::map([
        ("_i", Value::string(identifier)),
        ("_t", Value::Int(MsgType::Request.to_i64())),
        ("_c", content),
        (
            "_x",
            Value::UInt {
                width: 4,
                value: u64::from(xid),
            },
        ),
    ])
}

/// Decode a `{_i, _t, _c, _x}` envelope from an inbound OPACK map.
///
/// `_x` is absent on events, which have no transaction id to correlate.
pub(crate) fn decode(value: &Value) -> Option<Envelope> {
    let identifier = value.get("_i")?.as_str()?.to_string();
    let msg_type = MsgType::from_i64(value.get("_t")?.as_i64()?)?;
    let content = value.get("_c").cloned().unwrap_or(Value::Null);
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    let xid = value.get("_x").and_then(Value::as_i64).map(|x| x as u32);
    Some(Envelope {
        identifier,
        msg_type,
        content,
        xid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trips_through_decode() {
        let content = Value::map([("foo", Value::Int(1))]);
        let request = build_request("_systemInfo", content, 42);
        let envelope = decode(&request).unwrap();
        assert_eq!(envelope.identifier, "_systemInfo");
        assert_eq!(envelope.msg_type, MsgType::Request);
        assert_eq!(envelope.xid, Some(42));
        assert_eq!(envelope.content.get("foo").and_then(Value::as_i64), Some(1));
    }

    #[test]
    fn event_without_xid_decodes_with_none() {
        let event = Value::map([
            ("_i", Value::string("FetchAttentionState")),
            ("_t", Value::Int(1)),
            ("_c", Value::Map(Vec::new())),
        ]);
        let envelope = decode(&event).unwrap();
        assert_eq!(envelope.msg_type, MsgType::Event);
        assert_eq!(envelope.xid, None);
    }

    #[test]
    fn unknown_msg_type_fails_to_decode() {
        let malformed = Value::map([
            ("_i", Value::string("x")),
            ("_t", Value::Int(9)),
            ("_c", Value::Map(Vec::new())),
        ]);
        assert!(decode(&malformed).is_none());
    }
}
