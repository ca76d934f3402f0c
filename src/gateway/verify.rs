use std::collections::HashMap;

use serde::Serialize;

use crate::{
    gateway::{
        MonerisGateway, Result,
        error::MalformedResponse,
        mask::{self, LastFour, MaskPolicy},
    },
    settings::Settings,
};

/// Response codes below this are approvals, the rest are declines. Part of
/// the gateway contract.
const APPROVAL_CEILING: i64 = 50;

/// Everything the gateway reported about a transaction, keyed by the
/// lower-cased element name of the `<response>` children.
#[derive(Debug, Serialize)]
pub struct VerificationValues(HashMap<String, String>);

impl VerificationValues {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn response_code(&self) -> Option<&str> {
        self.get("response_code")
    }

    /// Transaction number assigned by the provider, when it reports one.
    pub fn txn_num(&self) -> Option<&str> {
        self.get("txn_num")
    }
}

/// Definitive answer from the verification endpoint. Transport and parse
/// failures never reach this type, they stay on the error channel.
#[derive(Debug)]
pub enum Verification {
    Approved(VerificationValues),
    Declined(VerificationValues),
}

impl MonerisGateway {
    /// Re-verifies a transaction with a server-to-server call, independent
    /// of anything the browser supplied. Exactly one outbound request, no
    /// retries; reads are idempotent so callers may layer their own.
    pub async fn verify(
        &self,
        settings: &Settings,
        transaction_key: &str,
    ) -> Result<Verification> {
        let url = self.verify_url(settings);
        let form = [
            ("ps_store_id", settings.ps_store_id.as_str()),
            ("hpp_key", settings.hpp_key.as_str()),
            ("transactionKey", transaction_key),
        ];
        tracing::debug!(
            %url,
            transaction_key = %LastFour::mask(transaction_key),
            "Gateway transaction verification request"
        );
        let response = self.client.post(&url).form(&form).send().await?;
        let status = response.status();
        let body = response.text().await?;
        let verification = parse_verification(&body)?;
        let values = match &verification {
            Verification::Approved(values) | Verification::Declined(values) => values,
        };
        tracing::debug!(
            %status,
            data = %mask::secure_serializable(values),
            "Gateway transaction verification response"
        );
        Ok(verification)
    }
}

/// The endpoint answers with a percent-encoded XML document, a flat
/// `<response>` element. Anything that cannot be read as that fails
/// closed.
fn parse_verification(body: &str) -> Result<Verification> {
    if body.trim().is_empty() {
        return Err(MalformedResponse::EmptyBody.into());
    }
    let decoded = urlencoding::decode(body).map_err(|_| MalformedResponse::Undecodable)?;
    let doc = roxmltree::Document::parse(&decoded)?;
    let root = doc.root_element();
    if root.tag_name().name() != "response" {
        return Err(MalformedResponse::UnexpectedRoot.into());
    }
    let values = VerificationValues(
        root.children()
            .filter(|node| node.is_element())
            .map(|node| {
                (
                    node.tag_name().name().to_lowercase(),
                    node.text().unwrap_or_default().to_string(),
                )
            })
            .collect(),
    );
    let code = values
        .response_code()
        .ok_or(MalformedResponse::MissingResponseCode)?;
    let code: i64 = code
        .trim()
        .parse()
        .map_err(|_| MalformedResponse::BadResponseCode(code.to_string()))?;
    if code < APPROVAL_CEILING {
        Ok(Verification::Approved(values))
    } else {
        Ok(Verification::Declined(values))
    }
}

#[cfg(test)]
impl VerificationValues {
    pub fn for_tests(pairs: &[(&str, &str)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}
