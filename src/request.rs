//! Signature request: the contact data a single render is built from.
//!
//! A [`SignatureRequest`] is immutable for the duration of a render. It can
//! be built in Rust or deserialized from the camelCase JSON the form
//! produces:
//!
//! ```
//! use firma_renderer::{Brand, SignatureRequest};
//!
//! let request = SignatureRequest::from_json(
//!     r#"{ "brand": "samoo", "name": "Jane Doe", "phone": "123" }"#,
//! ).unwrap();
//!
//! assert_eq!(request.brand, Brand::Samoo);
//! assert_eq!(request.phone(), Some("123"));
//! assert_eq!(request.email(), None);
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::brand::Brand;
use crate::error::{Error, Result};

// ============================================================================
// ImageSource
// ============================================================================

/// A reference to an image the renderer should load.
///
/// Serializes to a plain string. Strings starting with `http://` or
/// `https://` are remote URLs, `data:` strings are embedded data URIs and
/// anything else is a local file path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ImageSource {
    Url(String),
    DataUri(String),
    File(PathBuf),
}

impl ImageSource {
    pub fn parse(source: &str) -> Result<Self> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidSource("empty image reference".into()));
        }
        let lower = trimmed.get(..8).unwrap_or(trimmed).to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Ok(Self::Url(trimmed.to_string()))
        } else if lower.starts_with("data:") {
            Ok(Self::DataUri(trimmed.to_string()))
        } else {
            Ok(Self::File(PathBuf::from(trimmed)))
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Url(_))
    }

    /// Short description for logs. Data URIs are truncated.
    pub fn describe(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::DataUri(uri) => {
                let head: String = uri.chars().take(32).collect();
                format!("{head}… ({} bytes)", uri.len())
            }
            Self::File(path) => path.display().to_string(),
        }
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(s) | Self::DataUri(s) => f.write_str(s),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl FromStr for ImageSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ImageSource {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ImageSource> for String {
    fn from(source: ImageSource) -> Self {
        source.to_string()
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

/// Treats a missing, null or blank image reference as absent.
fn optional_source<'de, D>(deserializer: D) -> std::result::Result<Option<ImageSource>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        Some(s) if !s.trim().is_empty() => ImageSource::parse(&s)
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

// ============================================================================
// SignatureRequest
// ============================================================================

/// Contact data for one signature render.
///
/// Optional text fields hold an empty string when absent; use the accessor
/// methods, which map empty strings to `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct SignatureRequest {
    #[serde(alias = "company")]
    pub brand: Brand,

    #[serde(
        default,
        alias = "photoUrl",
        deserialize_with = "optional_source",
        skip_serializing_if = "Option::is_none"
    )]
    #[cfg_attr(feature = "jsonschema", schemars(with = "Option<String>"))]
    pub photo_source: Option<ImageSource>,

    #[serde(
        default,
        deserialize_with = "optional_source",
        skip_serializing_if = "Option::is_none"
    )]
    #[cfg_attr(feature = "jsonschema", schemars(with = "Option<String>"))]
    pub background_override: Option<ImageSource>,

    pub name: String,

    #[serde(default)]
    pub job_title: String,

    #[serde(default, alias = "areaText")]
    pub department_text: String,

    #[serde(default)]
    pub phone: String,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub website: String,
}

fn non_empty(value: &str) -> Option<&str> {
    if value.is_empty() { None } else { Some(value) }
}

impl SignatureRequest {
    /// Creates a request with only the required fields set.
    pub fn new(brand: Brand, name: impl Into<String>) -> Self {
        Self {
            brand,
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_photo(mut self, source: ImageSource) -> Self {
        self.photo_source = Some(source);
        self
    }

    pub fn with_background(mut self, source: ImageSource) -> Self {
        self.background_override = Some(source);
        self
    }

    pub fn with_job_title(mut self, job_title: impl Into<String>) -> Self {
        self.job_title = job_title.into();
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department_text = department.into();
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = phone.into();
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    pub fn with_website(mut self, website: impl Into<String>) -> Self {
        self.website = website.into();
        self
    }

    pub fn job_title(&self) -> Option<&str> {
        non_empty(&self.job_title)
    }

    pub fn department(&self) -> Option<&str> {
        non_empty(&self.department_text)
    }

    pub fn phone(&self) -> Option<&str> {
        non_empty(&self.phone)
    }

    pub fn email(&self) -> Option<&str> {
        non_empty(&self.email)
    }

    pub fn website(&self) -> Option<&str> {
        non_empty(&self.website)
    }

    /// Checks the one hard requirement: a non-empty name.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidRequest("name must not be empty".into()));
        }
        Ok(())
    }

    /// File name for the exported PNG, e.g. `firma-pentec-jane-doe.png`.
    ///
    /// Every run of whitespace in the name becomes a single hyphen. Leading
    /// and trailing runs are kept, matching what the download link always
    /// produced. Path separators and control characters also become hyphens,
    /// so the name is always a single path component.
    pub fn export_file_name(&self) -> String {
        let mut name = String::with_capacity(self.name.len());
        let mut in_space = false;
        for ch in self.name.to_lowercase().chars() {
            if ch.is_whitespace() {
                if !in_space {
                    name.push('-');
                }
                in_space = true;
            } else if matches!(ch, '/' | '\\') || ch.is_control() {
                name.push('-');
                in_space = false;
            } else {
                name.push(ch);
                in_space = false;
            }
        }
        format!("firma-{}-{}.png", self.brand.slug(), name)
    }

    /// Deserializes and validates a request from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let request: Self = serde_json::from_str(json)?;
        request.validate()?;
        Ok(request)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn source_kinds_are_detected() {
        assert_eq!(
            ImageSource::parse("https://example.com/a.png").unwrap(),
            ImageSource::Url("https://example.com/a.png".into())
        );
        assert_eq!(
            ImageSource::parse("HTTP://example.com/a.png").unwrap(),
            ImageSource::Url("HTTP://example.com/a.png".into())
        );
        assert!(matches!(
            ImageSource::parse("data:image/png;base64,AAAA").unwrap(),
            ImageSource::DataUri(_)
        ));
        assert_eq!(
            ImageSource::parse("assets/avatar.png").unwrap(),
            ImageSource::File(PathBuf::from("assets/avatar.png"))
        );
        assert!(ImageSource::parse("   ").is_err());
    }

    #[test]
    fn empty_fields_are_absent() {
        let request = SignatureRequest::new(Brand::Pentec, "Jane Doe").with_phone("123");
        assert_eq!(request.job_title(), None);
        assert_eq!(request.department(), None);
        assert_eq!(request.phone(), Some("123"));
        assert_eq!(request.email(), None);
        assert_eq!(request.website(), None);
    }

    #[test]
    fn deserializes_original_field_names() {
        let json = r#"{
            "company": "Pentec",
            "photoUrl": "/avatar.png",
            "name": "Jane Doe",
            "jobTitle": "Responsable de Proyectos E-learning",
            "phone": "+34 963 93 74 33",
            "email": "j.doe@pentec.es",
            "website": "www.pentec.es",
            "areaText": "Área de Innovación Digital"
        }"#;

        let request = SignatureRequest::from_json(json).unwrap();
        assert_eq!(request.brand, Brand::Pentec);
        assert_eq!(
            request.photo_source,
            Some(ImageSource::File(PathBuf::from("/avatar.png")))
        );
        assert_eq!(request.department(), Some("Área de Innovación Digital"));
        assert_eq!(request.background_override, None);
    }

    #[test]
    fn blank_photo_is_absent() {
        let request =
            SignatureRequest::from_json(r#"{"brand":"samoo","name":"A","photoSource":""}"#)
                .unwrap();
        assert_eq!(request.photo_source, None);
    }

    #[test]
    fn empty_name_is_rejected() {
        let err = SignatureRequest::from_json(r#"{"brand":"samoo","name":"  "}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn json_uses_camel_case() {
        let request = SignatureRequest::new(Brand::Samoo, "Jane")
            .with_department("R&D")
            .with_photo(ImageSource::Url("https://example.com/p.jpg".into()));
        let json = request.to_json_pretty().unwrap();

        assert!(json.contains("\"departmentText\""));
        assert!(json.contains("\"photoSource\": \"https://example.com/p.jpg\""));
        assert!(!json.contains("backgroundOverride"));
    }

    #[test]
    fn export_file_name_collapses_whitespace() {
        let request = SignatureRequest::new(Brand::Samoo, "Jane   Van\tDoe");
        assert_eq!(request.export_file_name(), "firma-samoo-jane-van-doe.png");

        let request = SignatureRequest::new(Brand::Pentec, "José Pérez");
        assert_eq!(request.export_file_name(), "firma-pentec-josé-pérez.png");
    }

    #[test]
    fn export_file_name_stays_a_single_path_component() {
        let request = SignatureRequest::new(Brand::Pentec, "../../etc/Jane\\Doe");
        let file_name = request.export_file_name();

        assert_eq!(file_name, "firma-pentec-..-..-etc-jane-doe.png");
        let path = std::path::Path::new("out").join(&file_name);
        assert_eq!(path.parent(), Some(std::path::Path::new("out")));
        assert_eq!(path.components().count(), 2);
    }
}
