use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error("invalid catalog configuration: {0}")]
    InvalidConfig(String),

    #[error("missing config file arcgis-catalog.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(String),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid ArcGIS URL: {0}")]
    #[diagnostic(help("check that the catalog url points to an ArcGIS REST services directory"))]
    Unreachable(String),

    #[error("ArcGIS request failed: {0}")]
    Http(String),

    #[error("ArcGIS returned status {status} for {url}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },

    #[error("ArcGIS reported error {code} for {url}: {message}")]
    Service {
        url: String,
        code: i64,
        message: String,
    },

    #[error("malformed ArcGIS response from {url}: {message}")]
    Malformed { url: String, message: String },

    #[error(
        "ArcGIS resources must be of type 'Feature Layer' or 'Annotation Layer' (received type: {0})"
    )]
    UnsupportedResourceType(String),

    #[error("download of {url} failed: {message}")]
    Download { url: String, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
