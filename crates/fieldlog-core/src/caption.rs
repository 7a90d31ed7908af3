//! Caption parsing for field reports.
//!
//! A report caption carries two meaningful lines: the trouble-ticket
//! identifier on the first non-blank line and the address on the second.
//! Everything after the second line is free commentary and is ignored.

use thiserror::Error;

use crate::district::DistrictVocabulary;

/// Stand-in caption for a photo sent without one.
pub const NO_CAPTION: &str = "(Без подписи)";

/// Validated content of a report caption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFields {
    pub identifier: String,
    pub address: String,
    /// Derived from `address`; empty when no vocabulary entry matches.
    pub district: String,
}

/// A caption that does not carry both required lines.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("caption is missing {}", missing_list(.identifier, .address))]
pub struct CaptionError {
    pub identifier: bool,
    pub address: bool,
}

fn missing_list(identifier: &bool, address: &bool) -> &'static str {
    match (*identifier, *address) {
        (true, true) => "identifier and address",
        (true, false) => "identifier",
        _ => "address",
    }
}

/// Split a caption into `(identifier, address)`.
///
/// Lines are trimmed and blank lines dropped before the first two are taken.
/// Never fails: a missing line comes back as an empty string.
pub fn parse_caption(text: &str) -> (String, String) {
    let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());
    let identifier = lines.next().unwrap_or_default().to_string();
    let address = lines.next().unwrap_or_default().to_string();
    (identifier, address)
}

/// Parse a caption and classify its address, rejecting captions that lack
/// either required field.
pub fn parse_report(
    text: &str,
    vocabulary: &DistrictVocabulary,
) -> Result<ParsedFields, CaptionError> {
    let (identifier, address) = parse_caption(text);
    if identifier.is_empty() || address.is_empty() {
        return Err(CaptionError {
            identifier: identifier.is_empty(),
            address: address.is_empty(),
        });
    }
    let district = vocabulary.classify(&address).to_string();
    Ok(ParsedFields {
        identifier,
        address,
        district,
    })
}
