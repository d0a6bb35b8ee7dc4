use crate::UrlError;
use url::Url;

/// Placeholder replaced by the page offset
pub const START_PLACEHOLDER: &str = "{start}";

/// A validated page URL template
///
/// The template is checked once at start-up; rendering an offset afterwards
/// cannot fail because only digits are substituted.
///
/// # Examples
///
/// ```
/// use pagesweep::url::UrlTemplate;
///
/// let template = UrlTemplate::parse("https://example.com/list?start={start}").unwrap();
/// assert_eq!(template.render(150), "https://example.com/list?start=150");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    raw: String,
}

impl UrlTemplate {
    /// Parses and validates a template
    ///
    /// # Returns
    ///
    /// * `Ok(UrlTemplate)` - The template has a `{start}` placeholder and
    ///   renders to an absolute HTTP(S) URL
    /// * `Err(UrlError)` - Missing placeholder, malformed URL, or unsupported scheme
    pub fn parse(raw: &str) -> Result<Self, UrlError> {
        let raw = raw.trim();

        if !raw.contains(START_PLACEHOLDER) {
            return Err(UrlError::MissingPlaceholder(raw.to_string()));
        }

        let template = Self {
            raw: raw.to_string(),
        };

        let sample = Url::parse(&template.render(0)).map_err(|e| UrlError::Parse(e.to_string()))?;
        if sample.scheme() != "http" && sample.scheme() != "https" {
            return Err(UrlError::InvalidScheme(format!(
                "Only HTTP and HTTPS schemes are supported, got: {}",
                sample.scheme()
            )));
        }

        Ok(template)
    }

    /// Builds the locator of the page at `offset`
    pub fn render(&self, offset: u64) -> String {
        self.raw.replace(START_PLACEHOLDER, &offset.to_string())
    }

    /// Returns the raw template string
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}
