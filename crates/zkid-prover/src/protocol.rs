//! # TEE JSON-RPC Messages
//!
//! Two requests make up a proving exchange:
//!
//! 1. `openpassport_hello` (id 1) carries our ephemeral public key and the
//!    session UUID. The TEE answers with `result.attestation`.
//! 2. `openpassport_submit_request` (id 2) carries the encrypted payload.
//!    The TEE answers with the request UUID the status service will report on.
//!
//! Byte fields travel as JSON arrays of numbers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use zkid_core::SessionId;
use zkid_crypto::EncryptedEnvelope;

pub const JSONRPC_VERSION: &str = "2.0";
pub const HELLO_METHOD: &str = "openpassport_hello";
pub const SUBMIT_METHOD: &str = "openpassport_submit_request";
pub const HELLO_ID: u64 = 1;
pub const SUBMIT_ID: u64 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcRequest<P> {
    pub jsonrpc: String,
    pub method: String,
    pub id: u64,
    pub params: P,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloParams {
    pub user_pubkey: Vec<u8>,
    pub uuid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitParams {
    pub uuid: String,
    pub nonce: Vec<u8>,
    pub cipher_text: Vec<u8>,
    pub auth_tag: Vec<u8>,
}

impl SubmitParams {
    /// Rebuild the envelope on the receiving side.
    pub fn envelope(&self) -> Option<EncryptedEnvelope> {
        Some(EncryptedEnvelope {
            nonce: self.nonce.as_slice().try_into().ok()?,
            cipher_text: self.cipher_text.clone(),
            auth_tag: self.auth_tag.as_slice().try_into().ok()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    pub message: String,
}

/// Any response from the TEE. Exactly one of `result` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default = "jsonrpc_version")]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorObject>,
}

fn jsonrpc_version() -> String {
    JSONRPC_VERSION.to_string()
}

impl RpcResponse {
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            jsonrpc: jsonrpc_version(),
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: u64, code: Option<i64>, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: jsonrpc_version(),
            id: Some(id),
            result: None,
            error: Some(RpcErrorObject {
                code,
                message: message.into(),
            }),
        }
    }
}

/// `result` of the hello response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationResult {
    pub attestation: Vec<u8>,
}

pub fn hello(user_pubkey: &[u8], session_id: SessionId) -> RpcRequest<HelloParams> {
    RpcRequest {
        jsonrpc: jsonrpc_version(),
        method: HELLO_METHOD.to_string(),
        id: HELLO_ID,
        params: HelloParams {
            user_pubkey: user_pubkey.to_vec(),
            uuid: session_id.to_string(),
        },
    }
}

pub fn submit(session_id: SessionId, envelope: &EncryptedEnvelope) -> RpcRequest<SubmitParams> {
    RpcRequest {
        jsonrpc: jsonrpc_version(),
        method: SUBMIT_METHOD.to_string(),
        id: SUBMIT_ID,
        params: SubmitParams {
            uuid: session_id.to_string(),
            nonce: envelope.nonce.to_vec(),
            cipher_text: envelope.cipher_text.clone(),
            auth_tag: envelope.auth_tag.to_vec(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hello_wire_shape() {
        let id = SessionId::new();
        let msg = serde_json::to_value(hello(&[4, 1, 2], id)).unwrap();
        assert_eq!(
            msg,
            json!({
                "jsonrpc": "2.0",
                "method": "openpassport_hello",
                "id": 1,
                "params": { "user_pubkey": [4, 1, 2], "uuid": id.to_string() }
            })
        );
    }

    #[test]
    fn test_submit_carries_envelope_parts() {
        let envelope = EncryptedEnvelope {
            nonce: [7; 12],
            cipher_text: vec![1, 2, 3],
            auth_tag: [9; 16],
        };
        let req = submit(SessionId::new(), &envelope);
        assert_eq!(req.method, SUBMIT_METHOD);
        assert_eq!(req.id, SUBMIT_ID);
        assert_eq!(req.params.nonce.len(), 12);
        assert_eq!(req.params.envelope(), Some(envelope));
    }

    #[test]
    fn test_envelope_rejects_wrong_lengths() {
        let params = SubmitParams {
            uuid: "u".into(),
            nonce: vec![0; 11],
            cipher_text: vec![],
            auth_tag: vec![0; 16],
        };
        assert!(params.envelope().is_none());
    }

    #[test]
    fn test_parse_error_response() {
        let resp: RpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":2,"error":{"code":-32000,"message":"circuit busy"}}"#,
        )
        .unwrap();
        assert_eq!(resp.id, Some(2));
        assert!(resp.result.is_none());
        let err = resp.error.unwrap();
        assert_eq!(err.code, Some(-32000));
        assert_eq!(err.message, "circuit busy");
    }

    #[test]
    fn test_parse_attestation_result() {
        let resp: RpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":{"attestation":[1,2,3]}}"#)
                .unwrap();
        let result: AttestationResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert_eq!(result.attestation, vec![1, 2, 3]);
    }
}
