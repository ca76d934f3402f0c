use std::fmt::Display;

/// Why a verification response could not be read. Every variant fails
/// closed, none of them approves a transaction.
#[derive(Debug)]
pub enum MalformedResponse {
    EmptyBody,
    Undecodable,
    Xml(roxmltree::Error),
    UnexpectedRoot,
    MissingResponseCode,
    BadResponseCode(String),
}

#[derive(Debug)]
pub enum GatewayError {
    Request(reqwest::Error),
    Malformed(MalformedResponse),
}

impl From<reqwest::Error> for GatewayError {
    fn from(value: reqwest::Error) -> Self {
        Self::Request(value)
    }
}

impl From<MalformedResponse> for GatewayError {
    fn from(value: MalformedResponse) -> Self {
        Self::Malformed(value)
    }
}

impl From<roxmltree::Error> for GatewayError {
    fn from(value: roxmltree::Error) -> Self {
        Self::Malformed(MalformedResponse::Xml(value))
    }
}

impl std::error::Error for GatewayError {}

impl Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::Request(e) => write!(f, "http request error: {e}"),
            GatewayError::Malformed(e) => write!(f, "malformed verification response: {e}"),
        }
    }
}

impl Display for MalformedResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MalformedResponse::EmptyBody => f.write_str("empty body"),
            MalformedResponse::Undecodable => f.write_str("body is not percent-encoded utf-8"),
            MalformedResponse::Xml(e) => write!(f, "xml: {e}"),
            MalformedResponse::UnexpectedRoot => f.write_str("missing <response> root element"),
            MalformedResponse::MissingResponseCode => f.write_str("missing response_code field"),
            MalformedResponse::BadResponseCode(value) => {
                write!(f, "response_code is not a number: {value}")
            }
        }
    }
}
