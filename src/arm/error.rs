use thiserror::Error;

use crate::credential::CredentialError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArmError {
    #[error("credential error: `{0}`")]
    Credential(#[from] CredentialError),
    #[error("error computing the request: `{0}`")]
    Encoder(String),
    #[error("error decoding the response payload: `{0}`")]
    Decoder(String),
    #[error("transport error: `{0}`")]
    Transport(String),
    #[error("resource manager error: Status code: `{status}`, Code: `{code}`, Message: `{message}`")]
    ErrorResponse {
        status: u16,
        code: String,
        message: String,
    },
    #[error("long-running operation ended as `{state}`: `{message}`")]
    OperationFailed { state: String, message: String },
    #[error("long-running operation still running after `{0}` status checks")]
    PollingExhausted(u32),
}
