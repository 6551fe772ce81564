//! Plugin registry lifecycle invariants.

use weft::{
    BidirectionalRenderer, Format, HtmlRenderer, MarkdownRenderer, PluginRegistry, RendererPlugin,
    Renderer, TextRenderer,
};

struct NullPlugin {
    id: String,
    formats: Vec<Format>,
}

impl NullPlugin {
    fn boxed(id: &str, formats: &[Format]) -> Box<Self> {
        Box::new(Self {
            id: id.to_string(),
            formats: formats.to_vec(),
        })
    }
}

impl RendererPlugin for NullPlugin {
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        "null plugin"
    }
    fn version(&self) -> &str {
        "0.0.1"
    }
    fn compatible_formats(&self) -> &[Format] {
        &self.formats
    }
    fn initialize(&mut self, _renderer: &dyn BidirectionalRenderer) -> weft::Result<()> {
        Ok(())
    }
}

#[test]
fn test_plugin_count_matches_register_minus_unregister() {
    let mut registry = PluginRegistry::new();
    let ids = ["a", "b", "c", "d", "e"];
    for id in ids {
        registry
            .register(NullPlugin::boxed(id, &[Format::Markdown]))
            .unwrap();
    }
    assert_eq!(registry.list().len(), 5);

    registry.unregister("b").unwrap();
    registry.unregister("d").unwrap();
    assert_eq!(registry.list().len(), 3);

    registry
        .register(NullPlugin::boxed("f", &[Format::Markdown]))
        .unwrap();
    assert_eq!(registry.list().len(), 4);
}

#[test]
fn test_unregistering_unknown_id_always_fails() {
    let mut registry = PluginRegistry::new();
    assert!(registry.unregister("never-registered").is_err());

    registry
        .register(NullPlugin::boxed("p1", &[Format::Text]))
        .unwrap();
    registry.unregister("p1").unwrap();
    // A second unregister of the same id fails too
    assert!(registry.unregister("p1").is_err());
}

#[test]
fn test_duplicate_registration_scenario() {
    let mut registry = PluginRegistry::new();
    registry
        .register(NullPlugin::boxed("p1", &[Format::Html]))
        .unwrap();

    let error = registry
        .register(NullPlugin::boxed("p1", &[Format::Text]))
        .unwrap_err();
    assert!(error.to_string().contains("already registered"));

    let listed = registry.list();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, "p1");
    // The original registration is untouched
    assert_eq!(listed[0].compatible_formats, vec![Format::Html]);
}

#[test]
fn test_find_compatible_never_leaks_other_formats() {
    let mut registry = PluginRegistry::new();
    registry
        .register(NullPlugin::boxed("md", &[Format::Markdown]))
        .unwrap();
    registry
        .register(NullPlugin::boxed("all", &[
            Format::Markdown,
            Format::Html,
            Format::Text,
            Format::Docx,
        ]))
        .unwrap();
    registry
        .register(NullPlugin::boxed("doc", &[Format::Docx]))
        .unwrap();

    for format in [Format::Html, Format::Markdown, Format::Text, Format::Docx] {
        for plugin in registry.find_compatible(format) {
            assert!(
                plugin.compatible_formats().contains(&format),
                "plugin {} leaked into {format}",
                plugin.id()
            );
        }
    }
    assert_eq!(registry.find_compatible(Format::Markdown).len(), 2);
    assert_eq!(registry.find_compatible(Format::Html).len(), 1);
}

#[test]
fn test_attachment_tracking_across_renderers() {
    let mut registry = PluginRegistry::new();
    registry
        .register(NullPlugin::boxed("multi", &[Format::Markdown, Format::Html]))
        .unwrap();

    let markdown = MarkdownRenderer::new();
    let html = HtmlRenderer::new();
    let text = TextRenderer::new();

    registry.initialize_plugin("multi", &markdown).unwrap();
    registry.initialize_plugin("multi", &html).unwrap();
    // Text is not a compatible format
    assert!(registry.initialize_plugin("multi", &text).is_err());

    assert_eq!(
        registry.plugins_for_renderer(markdown.instance_id()).len(),
        1
    );
    assert_eq!(registry.plugins_for_renderer(html.instance_id()).len(), 1);
    assert!(registry.plugins_for_renderer(text.instance_id()).is_empty());
}

#[test]
fn test_statistics_track_counts_and_timestamps() {
    let mut registry = PluginRegistry::new();
    assert_eq!(registry.statistics().total, 0);
    assert!(registry.statistics().oldest_registration.is_none());

    registry
        .register(NullPlugin::boxed("one", &[Format::Text]))
        .unwrap();
    registry
        .register(NullPlugin::boxed("two", &[Format::Text, Format::Html]))
        .unwrap();

    let renderer = TextRenderer::new();
    registry.initialize_plugin("one", &renderer).unwrap();

    let stats = registry.statistics();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.initialized, 1);
    assert_eq!(stats.by_format.get(&Format::Text), Some(&2));
    assert_eq!(stats.by_format.get(&Format::Html), Some(&1));
    assert!(stats.oldest_registration <= stats.newest_registration);
}
