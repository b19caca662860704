// src/render/block.rs
// =============================================================================
// This module ties parsing, fetching and state together for one code block.
//
// A ReferenceBlock is created from a reference string. It owns:
// - the parsed Reference (where to fetch)
// - the CustomizationOptions (how to label and style it)
// - the FetchResult state, changed only through `reduce`
//
// `load` fetches only when the state allows it (first use, or after reset),
// so calling it again after a fetch is a no-op.
//
// The three outputs consumed by whatever displays the block are bundled in
// RenderedBlock: the code, its title, and the link back to GitHub.
// =============================================================================

use anyhow::Result;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use crate::fetch::{fetch_code, reduce, FetchFailure, FetchMessage, FetchPhase, FetchResult};
use crate::reference::{parse_customization, parse_reference, CustomizationOptions, Reference};

// The clickable link shown under a code block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkDescriptor {
    pub text: String,
    /// The reference string as written
    pub href: String,
    /// Inline CSS; empty when custom styling is requested
    pub style: String,
    pub class_name: String,
}

// Everything a surrounding UI needs to draw a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedBlock {
    pub code: String,
    pub title: String,
    /// Code fence annotation, e.g. ` title="src/file.ts"`
    pub metastring: String,
    pub link: LinkDescriptor,
    pub phase: FetchPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FetchFailure>,
}

#[derive(Debug, Clone)]
pub struct ReferenceBlock {
    source: String,
    reference: Reference,
    customization: CustomizationOptions,
    state: FetchResult,
}

impl ReferenceBlock {
    // Parses a reference string into a block ready to load
    //
    // Fails if the string is not a usable GitHub blob URL.
    pub fn new(source: &str) -> Result<Self> {
        let reference = parse_reference(source)?;
        let customization = parse_customization(source)?;

        Ok(ReferenceBlock {
            source: source.trim().to_string(),
            reference,
            customization,
            state: FetchResult::default(),
        })
    }

    pub fn reference(&self) -> &Reference {
        &self.reference
    }

    pub fn customization(&self) -> &CustomizationOptions {
        &self.customization
    }

    pub fn state(&self) -> &FetchResult {
        &self.state
    }

    // Applies one message through the reducer
    pub fn dispatch(&mut self, message: FetchMessage) {
        self.state = reduce(&self.state, message);
    }

    // Fetches the code if this block hasn't fetched yet
    //
    // Returns the phase the block ends up in.
    pub async fn load(&mut self, client: &Client) -> FetchPhase {
        if !self.state.should_fetch() {
            debug!(url = %self.reference.url, phase = ?self.state.phase(), "skipping fetch");
            return self.state.phase();
        }

        self.dispatch(FetchMessage::Loading);

        let reference = self.reference.clone();
        fetch_code(client, &reference, |message| self.dispatch(message)).await;

        if let Some(error) = &self.state.error {
            warn!(url = %self.reference.url, %error, "failed to fetch referenced code");
        }

        self.state.phase()
    }

    // The block's title: the `title` query parameter if set, else the file path
    pub fn title(&self) -> &str {
        match self.customization.title.as_deref() {
            Some(title) if !title.is_empty() => title,
            _ => &self.reference.title,
        }
    }

    pub fn metastring(&self) -> String {
        format!(" title=\"{}\"", self.title())
    }

    pub fn link(&self) -> LinkDescriptor {
        LinkDescriptor {
            text: self.customization.link_text.clone(),
            href: self.source.clone(),
            style: self.customization.note_styling.to_css(),
            class_name: self.customization.class_name().to_string(),
        }
    }

    pub fn render(&self) -> RenderedBlock {
        RenderedBlock {
            code: self.state.code.clone(),
            title: self.title().to_string(),
            metastring: self.metastring(),
            link: self.link(),
            phase: self.state.phase(),
            error: self.state.error.clone(),
        }
    }
}

// Tests swap the GitHub raw URL for a local mock server
#[cfg(test)]
impl ReferenceBlock {
    pub(crate) fn with_url(mut self, url: String) -> Self {
        self.reference.url = url;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::LineEnd;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // A block whose fetch goes to the mock server instead of GitHub
    fn block_for(server: &MockServer, source: &str) -> ReferenceBlock {
        let block = ReferenceBlock::new(source).unwrap();
        let url = format!("{}/{}", server.uri(), block.reference().title);
        block.with_url(url)
    }

    #[test]
    fn test_title_falls_back_to_path() {
        let block = ReferenceBlock::new("https://github.com/o/r/blob/main/src/file.ts\n").unwrap();
        assert_eq!(block.title(), "src/file.ts");
        assert_eq!(block.metastring(), " title=\"src/file.ts\"");

        let block =
            ReferenceBlock::new("https://github.com/o/r/blob/main/src/file.ts?title=\n").unwrap();
        assert_eq!(block.title(), "src/file.ts");
    }

    #[test]
    fn test_title_override_and_link() {
        let block = ReferenceBlock::new(
            "https://github.com/o/r/blob/main/a.rs?title=Example&customStyling#L2-L3\n",
        )
        .unwrap();
        assert_eq!(block.title(), "Example");
        assert_eq!(block.reference().to_line, LineEnd::Line(2));

        let link = block.link();
        assert_eq!(
            link.href,
            "https://github.com/o/r/blob/main/a.rs?title=Example&customStyling#L2-L3"
        );
        assert_eq!(link.style, "");
        assert_eq!(link.class_name, "github-codeblock-reference-link");
        assert_eq!(link.text, "See full example on GitHub");
    }

    #[test]
    fn test_new_block_is_idle() {
        let block = ReferenceBlock::new("https://github.com/o/r/blob/main/a.rs").unwrap();
        let rendered = block.render();
        assert_eq!(rendered.phase, FetchPhase::Idle);
        assert_eq!(rendered.code, "loading...");
        assert!(!rendered.link.style.is_empty());
    }

    #[test]
    fn test_malformed_reference_fails() {
        assert!(ReferenceBlock::new("no url here").is_err());
    }

    #[tokio::test]
    async fn test_load_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("  x\n  y\n  z\n"))
            .mount(&server)
            .await;

        let mut block = block_for(&server, "https://github.com/o/r/blob/main/f.ts#L1-L2");
        let phase = block.load(&Client::new()).await;

        assert_eq!(phase, FetchPhase::Loaded);
        assert_eq!(block.render().code, "x\ny");
        assert_eq!(block.state().error, None);
    }

    #[tokio::test]
    async fn test_load_failure_keeps_placeholder() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("404: Not Found"))
            .mount(&server)
            .await;

        let mut block = block_for(&server, "https://github.com/o/r/blob/main/missing.ts");
        let phase = block.load(&Client::new()).await;

        assert_eq!(phase, FetchPhase::Failed);
        let rendered = block.render();
        assert_eq!(rendered.code, "loading...");
        assert_eq!(
            rendered.error,
            Some(FetchFailure::Remote {
                status: 404,
                body: "404: Not Found".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_settled_block_does_not_refetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("a"))
            .expect(1)
            .mount(&server)
            .await;

        let client = Client::new();
        let mut block = block_for(&server, "https://github.com/o/r/blob/main/f.ts");
        assert_eq!(block.load(&client).await, FetchPhase::Loaded);
        assert_eq!(block.load(&client).await, FetchPhase::Loaded);
        // MockServer verifies the single request when dropped
    }

    #[tokio::test]
    async fn test_reset_allows_another_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("a"))
            .expect(2)
            .mount(&server)
            .await;

        let client = Client::new();
        let mut block = block_for(&server, "https://github.com/o/r/blob/main/f.ts");
        block.load(&client).await;

        block.dispatch(FetchMessage::Reset);
        assert_eq!(block.state().phase(), FetchPhase::Idle);
        assert_eq!(block.load(&client).await, FetchPhase::Loaded);
    }

    #[tokio::test]
    async fn test_in_flight_block_does_not_refetch() {
        // Unroutable URL: any real request would fail and settle the block
        let mut block = ReferenceBlock::new("https://github.com/o/r/blob/main/f.ts")
            .unwrap()
            .with_url("http://127.0.0.1:9/f.ts".to_string());
        block.dispatch(FetchMessage::Loading);

        assert_eq!(block.load(&Client::new()).await, FetchPhase::Loading);
        assert_eq!(block.state().error, None);
    }
}
