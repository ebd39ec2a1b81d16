//! # feishu2mp
//!
//! Publishing pipeline for documents exported from Feishu/Lark.
//!
//! This library takes Markdown plus the images it references and produces
//! either a downloadable bundle (Markdown or a zip with images) or HTML
//! that can be pasted into the WeChat Official Account editor: no
//! stylesheets, no scripts, no class or id attributes, every style inline.
//!
//! ## Quick Start
//!
//! ```no_run
//! use feishu2mp::{DirectoryImageSource, Publisher};
//!
//! fn main() -> feishu2mp::Result<()> {
//!     let markdown = std::fs::read_to_string("doc.md")?;
//!     let images = DirectoryImageSource::new("./images");
//!
//!     let publisher = Publisher::new().with_theme_file("theme.wechat.json")?;
//!     let html = publisher.publish_html(&markdown, &images);
//!     println!("{}", html);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Inline styling**: Themeable per-tag CSS, loaded from JSON
//! - **Self-contained images**: Fetched images become `data:` URIs
//! - **Download bundles**: Markdown, or a zip with local image files
//! - **CJK support**: Spacing between Chinese/Japanese and Latin text
//! - **JSON export**: Markdown with inlined images for browser clients

pub mod bundle;
pub mod error;
pub mod image;
pub mod render;
pub mod source;
pub mod theme;

// Re-export commonly used types
pub use bundle::{Bundle, BundleEntry, BundleImage, BundleOptions, TokenRewrite};
pub use error::{Error, Result};
pub use image::{
    collect_image_tokens, inline_markdown_images, normalize, validate_https, DataUri,
    ImageReference, ImageRegistry, ImageResolver, ResolveOptions, ResolvedImage,
};
pub use render::{
    CmarkRenderer, FormatOptions, JsonFormat, MarkdownExport, MarkdownRenderer, RenderOptions,
    RestylePipeline,
};
pub use source::{DirectoryImageSource, FetchedImage, ImageSource, MemoryImageSource};
pub use theme::{find_theme_file, Theme, ThemeConfig, ThemeStore, DEFAULT_THEME_FILE};

use std::path::Path;
use std::sync::Arc;

/// Render Markdown to WeChat-ready HTML with the built-in theme.
///
/// Tokens present in `images` are replaced with their final reference;
/// unknown tokens stay in the output untouched.
///
/// # Example
///
/// ```
/// use feishu2mp::{markdown_to_publish_html, ImageRegistry};
///
/// let html = markdown_to_publish_html("# Title", &ImageRegistry::new());
/// assert!(html.starts_with("<h1 style=\""));
/// ```
pub fn markdown_to_publish_html(markdown: &str, images: &ImageRegistry) -> String {
    Publisher::new().render_html(markdown, images)
}

/// Build a download bundle with the default renderer and options.
///
/// Returns `<document_id>.md` when `images` is empty, otherwise
/// `<document_id>.zip` with every image and the rewritten Markdown.
///
/// # Example
///
/// ```
/// use feishu2mp::{build_download_bundle, BundleImage};
///
/// let images = vec![BundleImage::new("boxcnA", "boxcnA.png", vec![0x89, b'P'])];
/// let bundle = build_download_bundle("![](boxcnA)", &images, "doxcn1")?;
/// assert_eq!(bundle.file_name(), "doxcn1.zip");
/// # Ok::<(), feishu2mp::Error>(())
/// ```
pub fn build_download_bundle(
    markdown: &str,
    images: &[BundleImage],
    document_id: &str,
) -> Result<Bundle> {
    Publisher::new().bundle(markdown, images, document_id)
}

/// Builder for publishing documents.
///
/// A publisher owns its theme store; reloading the theme never affects a
/// render already in progress.
///
/// # Example
///
/// ```no_run
/// use feishu2mp::{MemoryImageSource, Publisher, TokenRewrite};
///
/// let source = MemoryImageSource::new().with_image("boxcnA", "a.png", vec![]);
/// let bundle = Publisher::new()
///     .with_auto_space(false)
///     .with_token_rewrite(TokenRewrite::AllOccurrences)
///     .download_bundle("![](boxcnA)", &source, "doxcn1")?;
/// bundle.write_to(".")?;
/// # Ok::<(), feishu2mp::Error>(())
/// ```
pub struct Publisher {
    themes: ThemeStore,
    renderer: Box<dyn MarkdownRenderer>,
    resolver: ImageResolver,
    render_options: RenderOptions,
    bundle_options: BundleOptions,
}

impl Publisher {
    /// Create a publisher with the built-in theme and pulldown-cmark.
    pub fn new() -> Self {
        Self {
            themes: ThemeStore::new(),
            renderer: Box::new(CmarkRenderer::new()),
            resolver: ImageResolver::default(),
            render_options: RenderOptions::default(),
            bundle_options: BundleOptions::default(),
        }
    }

    /// Use a prepared theme.
    pub fn with_theme(self, theme: Theme) -> Self {
        self.themes.replace(Arc::new(theme));
        self
    }

    /// Layer a theme file over the current theme.
    ///
    /// An empty path keeps the current theme.
    pub fn with_theme_file(self, path: impl AsRef<Path>) -> Result<Self> {
        self.themes.load_from(path)?;
        Ok(self)
    }

    /// Use a different Markdown engine.
    pub fn with_renderer(mut self, renderer: impl MarkdownRenderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    /// Enable or disable CJK/Latin auto-spacing in rendered HTML.
    pub fn with_auto_space(mut self, enabled: bool) -> Self {
        self.render_options = self.render_options.with_auto_space(enabled);
        self
    }

    /// Set image resolution options.
    pub fn with_resolve_options(mut self, options: ResolveOptions) -> Self {
        self.resolver = ImageResolver::new(options);
        self
    }

    /// Set how bundle tokens are rewritten.
    pub fn with_token_rewrite(mut self, mode: TokenRewrite) -> Self {
        self.bundle_options = self.bundle_options.with_token_rewrite(mode);
        self
    }

    /// Set all bundle options at once.
    pub fn with_bundle_options(mut self, options: BundleOptions) -> Self {
        self.bundle_options = options;
        self
    }

    /// Reload the theme in place. Failures keep the current theme.
    pub fn load_theme(&self, path: impl AsRef<Path>) -> Result<()> {
        self.themes.load_from(path)
    }

    /// Current theme snapshot.
    pub fn theme(&self) -> Arc<Theme> {
        self.themes.snapshot()
    }

    /// Fetch and resolve every image token referenced by `markdown`.
    pub fn resolve_images<S>(&self, markdown: &str, source: &S) -> ImageRegistry
    where
        S: ImageSource + ?Sized,
    {
        self.resolver
            .resolve_all(source, collect_image_tokens(markdown))
    }

    /// Render Markdown and run the restyling pipeline over the result.
    pub fn render_html(&self, markdown: &str, images: &ImageRegistry) -> String {
        let html = self.renderer.render_html(markdown, &self.render_options);
        RestylePipeline::new(self.themes.snapshot()).process(&html, images)
    }

    /// Resolve images from `source`, then render publishable HTML.
    pub fn publish_html<S>(&self, markdown: &str, source: &S) -> String
    where
        S: ImageSource + ?Sized,
    {
        let images = self.resolve_images(markdown, source);
        self.render_html(markdown, &images)
    }

    /// Assemble a bundle from already fetched images.
    pub fn bundle(&self, markdown: &str, images: &[BundleImage], document_id: &str) -> Result<Bundle> {
        bundle::assemble(
            self.renderer.as_ref(),
            markdown,
            images,
            document_id,
            &self.bundle_options,
        )
    }

    /// Fetch every referenced image from `source` and assemble a bundle.
    ///
    /// Images that cannot be fetched are left out; their tokens stay in
    /// the Markdown.
    pub fn download_bundle<S>(&self, markdown: &str, source: &S, document_id: &str) -> Result<Bundle>
    where
        S: ImageSource + ?Sized,
    {
        let images = bundle::fetch_bundle_images(source, collect_image_tokens(markdown));
        self.bundle(markdown, &images, document_id)
    }

    /// Formatted Markdown with resolved images inlined as `data:` URIs.
    pub fn markdown_export<S>(&self, markdown: &str, source: &S, doc_token: &str) -> MarkdownExport
    where
        S: ImageSource + ?Sized,
    {
        let tokens = collect_image_tokens(markdown);
        let has_images = !tokens.is_empty();
        let images = self.resolver.resolve_all(source, tokens);
        let inlined = inline_markdown_images(markdown, &images);

        MarkdownExport {
            markdown: self.renderer.format_markdown(&inlined),
            doc_token: doc_token.to_string(),
            doc_type: None,
            has_images,
        }
    }
}

impl Default for Publisher {
    fn default() -> Self {
        Self::new()
    }
}
