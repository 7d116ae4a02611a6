//! D-Bus client for the external face detection/embedding service.
//!
//! rollcalld never runs inference itself. Detection, landmarking and
//! descriptor extraction happen in the embedding service; descriptors come
//! back as JSON arrays of floats.

use rollcall_core::{AnalyzerError, Descriptor, FaceAnalyzer, Frame};

// `#[zbus::proxy]` generates `EmbedderProxy` (async) and `EmbedderProxyBlocking`.
// Only the async variant is used.
#[zbus::proxy(
    interface = "org.rollcall.Embedder1",
    default_service = "org.rollcall.Embedder1",
    default_path = "/org/rollcall/Embedder1"
)]
trait Embedder {
    /// Load detector and recognizer weights from `uri`.
    async fn load_models(&self, uri: &str) -> zbus::Result<()>;

    /// Descriptor of the most prominent face as a JSON array, or `null`.
    async fn detect_single(&self, width: u32, height: u32, pixels: &[u8]) -> zbus::Result<String>;

    /// Descriptors of every face in the frame as a JSON array of arrays.
    async fn detect_all(&self, width: u32, height: u32, pixels: &[u8]) -> zbus::Result<String>;
}

/// [`FaceAnalyzer`] backed by the embedding service.
pub struct EmbedderClient {
    proxy: EmbedderProxy<'static>,
    model_uri: String,
}

impl EmbedderClient {
    pub async fn connect(conn: &zbus::Connection, model_uri: &str) -> zbus::Result<Self> {
        let proxy = EmbedderProxy::new(conn).await?;
        Ok(Self {
            proxy,
            model_uri: model_uri.to_string(),
        })
    }
}

impl FaceAnalyzer for EmbedderClient {
    async fn load_models(&self) -> Result<(), AnalyzerError> {
        tracing::info!(uri = %self.model_uri, "loading face models");
        self.proxy
            .load_models(&self.model_uri)
            .await
            .map_err(|e| AnalyzerError::ModelLoad(e.to_string()))
    }

    async fn detect_single(&self, image: &Frame) -> Result<Option<Descriptor>, AnalyzerError> {
        let payload = self
            .proxy
            .detect_single(image.width, image.height, &image.data)
            .await
            .map_err(service_error)?;
        parse_single(&payload)
    }

    async fn detect_all(&self, frame: &Frame) -> Result<Vec<Descriptor>, AnalyzerError> {
        let payload = self
            .proxy
            .detect_all(frame.width, frame.height, &frame.data)
            .await
            .map_err(service_error)?;
        parse_all(&payload)
    }
}

fn service_error(err: zbus::Error) -> AnalyzerError {
    AnalyzerError::Service(err.to_string())
}

fn parse_single(payload: &str) -> Result<Option<Descriptor>, AnalyzerError> {
    let descriptor: Option<Descriptor> =
        serde_json::from_str(payload).map_err(|e| AnalyzerError::Decode(e.to_string()))?;
    descriptor.map(non_empty).transpose()
}

fn parse_all(payload: &str) -> Result<Vec<Descriptor>, AnalyzerError> {
    let descriptors: Vec<Descriptor> =
        serde_json::from_str(payload).map_err(|e| AnalyzerError::Decode(e.to_string()))?;
    descriptors.into_iter().map(non_empty).collect()
}

/// A face descriptor always has at least one dimension.
fn non_empty(descriptor: Descriptor) -> Result<Descriptor, AnalyzerError> {
    if descriptor.dim() == 0 {
        return Err(AnalyzerError::Decode("empty descriptor".into()));
    }
    Ok(descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_face() {
        let descriptor = parse_single("[0.25, -0.5, 1.0]").unwrap().unwrap();
        assert_eq!(descriptor.values, vec![0.25, -0.5, 1.0]);
    }

    #[test]
    fn test_parse_single_no_face() {
        assert!(parse_single("null").unwrap().is_none());
    }

    #[test]
    fn test_parse_all() {
        let descriptors = parse_all("[[0.1, 0.2], [0.3, 0.4]]").unwrap();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[1].values, vec![0.3, 0.4]);
        assert!(parse_all("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_malformed_payload() {
        assert!(matches!(parse_all("{\"faces\": 2}"), Err(AnalyzerError::Decode(_))));
        assert!(matches!(parse_single("[\"a\"]"), Err(AnalyzerError::Decode(_))));
    }

    #[test]
    fn test_parse_rejects_empty_descriptor() {
        assert!(matches!(parse_single("[]"), Err(AnalyzerError::Decode(_))));
        assert!(matches!(parse_all("[[]]"), Err(AnalyzerError::Decode(_))));
        assert!(matches!(parse_all("[[0.1, 0.2], []]"), Err(AnalyzerError::Decode(_))));
    }
}
