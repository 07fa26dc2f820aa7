//! Content validation for downloaded artifacts
//!
//! A response is accepted only if its declared `Content-Type` names one of the
//! expected media types and its body starts with the expected signature bytes.
//! Rejection is an ordinary result, not an error: scraping arbitrary URLs
//! routinely lands on HTML landing pages and login walls.

use crate::config::ArtifactConfig;
use crate::transport::HttpResponse;
use std::fmt;

/// Why a response was rejected
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rejection {
    /// The declared content type is missing or not one of the expected types
    ContentType {
        /// The declared value, if any
        declared: Option<String>,
    },
    /// The body does not start with the expected signature
    Signature,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::ContentType { declared: Some(ct) } => {
                write!(f, "response is not the expected format (content-type: {ct})")
            }
            Rejection::ContentType { declared: None } => {
                write!(f, "response is not the expected format (no content-type)")
            }
            Rejection::Signature => {
                write!(f, "content does not start with the expected signature")
            }
        }
    }
}

/// Checks responses against an [`ArtifactConfig`]
#[derive(Clone, Debug)]
pub struct ContentValidator {
    media_types: Vec<String>,
    signature: Vec<u8>,
}

impl ContentValidator {
    /// Build a validator for the given artifact type
    pub fn new(artifact: &ArtifactConfig) -> Self {
        Self {
            media_types: artifact
                .media_types
                .iter()
                .map(|m| m.trim().to_ascii_lowercase())
                .filter(|m| !m.is_empty())
                .collect(),
            signature: artifact.signature.clone(),
        }
    }

    /// Accept or reject a complete response
    pub fn validate(&self, response: &HttpResponse) -> Result<(), Rejection> {
        self.check(response.content_type(), &response.body)
    }

    /// Accept or reject a declared content type and body
    ///
    /// Parameters such as `; charset=binary` are ignored and media types
    /// compare case-insensitively.
    pub fn check(&self, content_type: Option<&str>, body: &[u8]) -> Result<(), Rejection> {
        if !self.media_type_matches(content_type) {
            return Err(Rejection::ContentType {
                declared: content_type.map(str::to_string),
            });
        }
        if !body.starts_with(&self.signature) {
            return Err(Rejection::Signature);
        }
        Ok(())
    }

    fn media_type_matches(&self, content_type: Option<&str>) -> bool {
        let Some(content_type) = content_type else {
            return false;
        };
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        self.media_types.iter().any(|m| *m == essence)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn pdf() -> ContentValidator {
        ContentValidator::new(&ArtifactConfig::pdf())
    }

    #[test]
    fn accepts_pdf_with_signature() {
        assert_eq!(pdf().check(Some("application/pdf"), b"%PDF-1.4\n..."), Ok(()));
    }

    #[test]
    fn ignores_parameters_and_case() {
        assert!(
            pdf()
                .check(Some("Application/PDF; charset=binary"), b"%PDF-1.4")
                .is_ok()
        );
        assert!(pdf().check(Some("application/x-pdf"), b"%PDF").is_ok());
    }

    #[test]
    fn rejects_html_landing_page() {
        let result = pdf().check(Some("text/html; charset=utf-8"), b"<!DOCTYPE html>");
        assert_eq!(
            result,
            Err(Rejection::ContentType {
                declared: Some("text/html; charset=utf-8".to_string())
            })
        );
    }

    #[test]
    fn rejects_missing_content_type() {
        assert!(matches!(
            pdf().check(None, b"%PDF-1.4"),
            Err(Rejection::ContentType { declared: None })
        ));
    }

    #[test]
    fn rejects_wrong_signature_even_with_pdf_content_type() {
        assert_eq!(
            pdf().check(Some("application/pdf"), b"<html>not a pdf</html>"),
            Err(Rejection::Signature)
        );
    }

    #[test]
    fn rejects_empty_and_truncated_bodies() {
        assert_eq!(pdf().check(Some("application/pdf"), b""), Err(Rejection::Signature));
        assert_eq!(pdf().check(Some("application/pdf"), b"%PD"), Err(Rejection::Signature));
    }

    #[test]
    fn does_not_match_media_type_prefixes() {
        assert!(pdf().check(Some("application/pdfx"), b"%PDF").is_err());
    }

    #[test]
    fn other_artifact_types() {
        let zip = ContentValidator::new(&ArtifactConfig::new(
            ["application/zip"],
            b"PK\x03\x04".to_vec(),
            "zip",
        ));
        assert!(zip.check(Some("application/zip"), b"PK\x03\x04rest").is_ok());
        assert_eq!(
            zip.check(Some("application/zip"), b"%PDF"),
            Err(Rejection::Signature)
        );
    }

    #[test]
    fn rejection_messages() {
        assert!(Rejection::Signature.to_string().contains("signature"));
        assert!(
            Rejection::ContentType {
                declared: Some("text/html".into())
            }
            .to_string()
            .contains("text/html")
        );
    }
}
